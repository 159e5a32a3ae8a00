//! # Edge Builder
//!
//! Turns classified artifacts and manual declarations into validated
//! [`TransformEdge`]s with the right weight:
//!
//! | Builder | Payload | Weight |
//! |---------|---------|--------|
//! | `build_simple` / `build_discovered` | landmarks, field, elastix, function | 1.0 |
//! | `build_unit_edge` | diagonal affine (+ offset) | 0.1 |
//! | `build_alias` | identity | 0.0 |
//! | `build_composite` | one edge per stage | 1.0 each |
//!
//! Every builder validates before returning, so a malformed declaration
//! never reaches the registry as a partial edge.

use serde::{Deserialize, Serialize};

use crate::classify::ClassifiedArtifact;
use crate::model::{
    AffineMatrix, EdgeType, TransformEdge, TransformPayload, ALIAS_WEIGHT, UTILITY_WEIGHT,
};
use crate::{Error, Result};

// ============================================================================
// Simple and discovered edges
// ============================================================================

/// Direct 1:1 mapping with default weight.
pub fn build_simple(
    source: &str,
    target: Option<&str>,
    payload: TransformPayload,
    edge_type: EdgeType,
) -> Result<TransformEdge> {
    let edge = match (edge_type, target) {
        (EdgeType::Bridging, Some(t)) => TransformEdge::bridging(source, t, payload),
        (EdgeType::Bridging, None) => {
            return Err(Error::InvalidEdge(format!("bridging edge from '{source}' needs a target")));
        }
        (EdgeType::Mirror, None) => TransformEdge::mirror(source, payload),
        (EdgeType::Mirror, Some(t)) => {
            return Err(Error::InvalidEdge(format!("mirror edge on '{source}' cannot target '{t}'")));
        }
    };
    edge.validate()?;
    Ok(edge)
}

/// Edge for a discovered artifact whose payload has been loaded.
pub fn build_discovered(artifact: &ClassifiedArtifact, payload: TransformPayload) -> Result<TransformEdge> {
    build_simple(&artifact.source, artifact.target.as_deref(), payload, artifact.edge_type)
}

// ============================================================================
// Unit conversion edges
// ============================================================================

/// A diagonal scaling (plus optional offset) between a space and its
/// unit-qualified counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEdgeSpec {
    pub source: String,
    pub target: String,
    pub scale: [f64; 3],
    #[serde(default)]
    pub offset: [f64; 3],
}

impl UnitEdgeSpec {
    /// `{template}raw -> {template}`, scaled by the voxel size.
    pub fn raw_to_native(template: &str, voxel_size: [f64; 3]) -> Self {
        Self {
            source: format!("{template}raw"),
            target: template.to_string(),
            scale: voxel_size,
            offset: [0.0; 3],
        }
    }

    /// `{template}um -> {template}` for a nanometre-native space.
    pub fn micron_to_native(template: &str) -> Self {
        Self {
            source: format!("{template}um"),
            target: template.to_string(),
            scale: [1_000.0; 3],
            offset: [0.0; 3],
        }
    }

    /// Per-axis recalibration between two labels of the same specimen.
    pub fn recalibration(source: &str, target: &str, scale: [f64; 3]) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            scale,
            offset: [0.0; 3],
        }
    }

    pub fn with_offset(mut self, offset: [f64; 3]) -> Self {
        self.offset = offset;
        self
    }
}

/// Low-weight affine bridging edge for a unit conversion.
pub fn build_unit_edge(spec: &UnitEdgeSpec) -> Result<TransformEdge> {
    let matrix = AffineMatrix::scale_offset(spec.scale, spec.offset);
    if !matrix.is_valid() {
        return Err(Error::InvalidEdge(format!(
            "{} -> {}: scale {:?} is not an invertible finite scaling",
            spec.source, spec.target, spec.scale
        )));
    }
    let edge = TransformEdge::bridging(&spec.source, &spec.target, TransformPayload::Affine(matrix))
        .with_weight(UTILITY_WEIGHT);
    edge.validate()?;
    Ok(edge)
}

// ============================================================================
// Aliases
// ============================================================================

/// Zero-cost identity between two names of one physical space.
///
/// A single invertible edge; the engine traverses it both ways.
pub fn build_alias(a: &str, b: &str) -> Result<TransformEdge> {
    if a == b {
        return Err(Error::InvalidEdge(format!("alias of '{a}' to itself")));
    }
    let edge = TransformEdge::bridging(a, b, TransformPayload::Alias).with_weight(ALIAS_WEIGHT);
    edge.validate()?;
    Ok(edge)
}

// ============================================================================
// Composite pipelines
// ============================================================================

/// One hop of a composite pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeStage {
    pub source: String,
    pub target: String,
    pub payload: TransformPayload,
}

impl CompositeStage {
    pub fn new(source: impl Into<String>, target: impl Into<String>, payload: TransformPayload) -> Self {
        Self { source: source.into(), target: target.into(), payload }
    }
}

/// Register each stage as its own edge through synthetic intermediates.
///
/// Stages must chain (`stage[i].target == stage[i + 1].source`) and there
/// must be at least two of them.
pub fn build_composite(stages: &[CompositeStage]) -> Result<Vec<TransformEdge>> {
    if stages.len() < 2 {
        return Err(Error::InvalidEdge(format!("composite needs 2+ stages, got {}", stages.len())));
    }
    for pair in stages.windows(2) {
        if pair[0].target != pair[1].source {
            return Err(Error::InvalidEdge(format!(
                "composite breaks between '{}' and '{}'",
                pair[0].target, pair[1].source
            )));
        }
    }
    stages
        .iter()
        .map(|s| build_simple(&s.source, Some(&s.target), s.payload.clone(), EdgeType::Bridging))
        .collect()
}

/// Labels that exist only to anchor a pipeline (all but the two ends).
pub fn intermediates(stages: &[CompositeStage]) -> impl Iterator<Item = &str> {
    let inner = stages.len().saturating_sub(1);
    stages.iter().take(inner).map(|s| s.target.as_str())
}
