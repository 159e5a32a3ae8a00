//! Manifest export: serialize a populated registry as JSON.
//!
//! The manifest is what an engine without a live registry connection
//! loads: every space, every edge with its payload, and the labels that
//! only exist as edge endpoints (unit-qualified variants, pipeline
//! intermediates).
//!
//! ```text
//! MemoryRegistry → export_manifest() → JSON → engine / inspection
//! ```

use std::collections::BTreeSet;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CoordinateSpace, TransformEdge};
use crate::registry::TransformRegistry;
use crate::Result;

/// Snapshot of a registry's node and edge sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    pub spaces: Vec<CoordinateSpace>,
    pub edges: Vec<TransformEdge>,
    /// Edge endpoints with no registered descriptor, sorted.
    pub endpoint_only: Vec<String>,
}

impl Manifest {
    pub async fn from_registry<R: TransformRegistry>(registry: &R) -> Result<Self> {
        let spaces = registry.spaces().await?;
        let edges = registry.edges().await?;

        let known: BTreeSet<&str> = spaces.iter().map(|s| s.label.as_str()).collect();
        let endpoint_only = edges
            .iter()
            .flat_map(|e| std::iter::once(e.source.as_str()).chain(e.target.as_deref()))
            .filter(|label| !known.contains(label))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect();

        Ok(Self { generated_at: Utc::now(), spaces, edges, endpoint_only })
    }

    pub fn read_from(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Export a registry as a pretty-printed JSON manifest.
pub async fn export_manifest<R: TransformRegistry>(registry: &R, writer: &mut dyn Write) -> Result<()> {
    let manifest = Manifest::from_registry(registry).await?;
    serde_json::to_writer_pretty(&mut *writer, &manifest)?;
    writeln!(writer)?;
    tracing::debug!(spaces = manifest.spaces.len(), edges = manifest.edges.len(), "manifest exported");
    Ok(())
}
