//! Transform edge: a relation between two spaces, or within one.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::TransformPayload;
use crate::{Error, Result};

/// Weight of ordinary landmark-, field- or function-based edges.
pub const DEFAULT_WEIGHT: f64 = 1.0;
/// Weight of unit conversions; path search prefers them over landmark detours.
pub const UTILITY_WEIGHT: f64 = 0.1;
/// Weight of naming synonyms.
pub const ALIAS_WEIGHT: f64 = 0.0;

/// Semantic role of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Maps `source` into a different space `target`.
    Bridging,
    /// Reflects within `source`; has no target.
    Mirror,
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeType::Bridging => f.write_str("bridging"),
            EdgeType::Mirror => f.write_str("mirror"),
        }
    }
}

/// Traversal direction relative to a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Deduplication key: second registration of the same key is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: String,
    pub target: Option<String>,
    pub edge_type: EdgeType,
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(t) => write!(f, "{} -> {} ({})", self.source, t, self.edge_type),
            None => write!(f, "{} ({})", self.source, self.edge_type),
        }
    }
}

/// A transform edge as submitted to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformEdge {
    pub source: String,
    pub target: Option<String>,
    pub payload: TransformPayload,
    pub edge_type: EdgeType,
    pub weight: f64,
    pub invertible: bool,
}

impl TransformEdge {
    /// Bridging edge with default weight; invertibility follows the payload.
    pub fn bridging(source: impl Into<String>, target: impl Into<String>, payload: TransformPayload) -> Self {
        let invertible = payload.invertible();
        Self {
            source: source.into(),
            target: Some(target.into()),
            payload,
            edge_type: EdgeType::Bridging,
            weight: DEFAULT_WEIGHT,
            invertible,
        }
    }

    /// Mirror edge within `source`.
    pub fn mirror(source: impl Into<String>, payload: TransformPayload) -> Self {
        let invertible = payload.invertible();
        Self {
            source: source.into(),
            target: None,
            payload,
            edge_type: EdgeType::Mirror,
            weight: DEFAULT_WEIGHT,
            invertible,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source: self.source.clone(),
            target: self.target.clone(),
            edge_type: self.edge_type,
        }
    }

    /// Structural checks every registry applies before storing an edge.
    pub fn validate(&self) -> Result<()> {
        if self.source.is_empty() {
            return Err(Error::InvalidEdge("empty source label".into()));
        }
        match (self.edge_type, &self.target) {
            (EdgeType::Bridging, None) => {
                return Err(Error::InvalidEdge(format!("bridging edge from '{}' has no target", self.source)));
            }
            (EdgeType::Bridging, Some(t)) if t.is_empty() => {
                return Err(Error::InvalidEdge(format!("bridging edge from '{}' has an empty target", self.source)));
            }
            (EdgeType::Mirror, Some(t)) => {
                return Err(Error::InvalidEdge(format!("mirror edge on '{}' has a target '{t}'", self.source)));
            }
            _ => {}
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(Error::InvalidEdge(format!("{}: weight {} is not a non-negative number", self.key(), self.weight)));
        }
        if self.invertible && !self.payload.invertible() {
            return Err(Error::InvalidEdge(format!("{}: {} payload cannot be inverted", self.key(), self.payload.kind())));
        }
        Ok(())
    }

    /// The space reached by following this edge from `from`, honouring invertibility.
    pub fn other_end(&self, from: &str) -> Option<&str> {
        let target = self.target.as_deref()?;
        if from == self.source {
            Some(target)
        } else if from == target && self.invertible {
            Some(&self.source)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AffineMatrix;

    #[test]
    fn test_mirror_key_has_no_target() {
        let e = TransformEdge::mirror("A", TransformPayload::Alias);
        assert_eq!(e.key(), EdgeKey { source: "A".into(), target: None, edge_type: EdgeType::Mirror });
        assert!(e.validate().is_ok());
    }

    #[test]
    fn test_bridging_without_target_rejected() {
        let mut e = TransformEdge::bridging("A", "B", TransformPayload::Alias);
        e.target = None;
        assert!(matches!(e.validate(), Err(Error::InvalidEdge(_))));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let e = TransformEdge::bridging("A", "B", TransformPayload::Alias).with_weight(-1.0);
        assert!(e.validate().is_err());
    }

    #[test]
    fn test_other_end_respects_invertibility() {
        let e = TransformEdge::bridging("A", "B", TransformPayload::Affine(AffineMatrix::identity()));
        assert_eq!(e.other_end("A"), Some("B"));
        assert_eq!(e.other_end("B"), Some("A"));

        let mut one_way = e.clone();
        one_way.invertible = false;
        assert_eq!(one_way.other_end("B"), None);
        assert_eq!(one_way.other_end("C"), None);
    }
}
