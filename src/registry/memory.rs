//! In-memory transform registry.
//!
//! This is the reference implementation of `TransformRegistry`.
//! It keeps spaces and edges in insertion-ordered vectors with
//! hashbrown indexes, protected by parking_lot RwLocks.
//!
//! ## Limitations
//!
//! - **Single-writer only**: per-table locks mean a space insert and an
//!   edge insert are not atomic together. Registration passes are serial,
//!   so this is fine for its intended use.
//! - **No path search**: the engine proper owns that. `neighbors()` is as
//!   far as this registry goes.
//!
//! Use this registry for:
//! - Testing classification, building and registration order
//! - Exporting a manifest without an engine attached

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::discovery;
use crate::model::{CoordinateSpace, Direction, EdgeKey, TransformEdge};
use crate::Result;
use super::TransformRegistry;

// ============================================================================
// MemoryRegistry
// ============================================================================

/// In-memory transform graph.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    spaces: RwLock<Vec<CoordinateSpace>>,
    /// label → position in `spaces`
    space_index: RwLock<HashMap<String, usize>>,
    edges: RwLock<Vec<TransformEdge>>,
    /// key → position in `edges`
    edge_index: RwLock<HashMap<EdgeKey, usize>>,
    /// label → positions of edges touching it
    adjacency: RwLock<HashMap<String, Vec<usize>>>,
    search_paths: RwLock<Vec<PathBuf>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_edge(&self, edge: TransformEdge) -> Result<bool> {
        edge.validate()?;
        let key = edge.key();

        let mut index = self.inner.edge_index.write();
        if index.contains_key(&key) {
            tracing::trace!(edge = %key, "edge exists, skipped");
            return Ok(false);
        }
        let mut edges = self.inner.edges.write();
        let pos = edges.len();
        index.insert(key, pos);

        let mut adj = self.inner.adjacency.write();
        adj.entry(edge.source.clone()).or_default().push(pos);
        if let Some(target) = &edge.target {
            if *target != edge.source {
                adj.entry(target.clone()).or_default().push(pos);
            }
        }
        edges.push(edge);
        Ok(true)
    }

    fn scan(&self, roots: &[PathBuf]) -> usize {
        let mut added = 0;
        for artifact in discovery::scan_roots(roots) {
            match discovery::resolve(&artifact) {
                Ok(Some(edge)) => match self.insert_edge(edge) {
                    Ok(true) => added += 1,
                    Ok(false) => {}
                    Err(error) => {
                        tracing::warn!(path = %artifact.path.display(), %error, "scan: edge rejected");
                    }
                },
                Ok(None) => {}
                Err(failure) => {
                    tracing::warn!(
                        path = %artifact.path.display(),
                        family = ?artifact.family,
                        stage = ?failure.stage,
                        error = %failure.error,
                        "scan: artifact skipped"
                    );
                }
            }
        }
        added
    }
}

// ============================================================================
// TransformRegistry impl
// ============================================================================

#[async_trait]
impl TransformRegistry for MemoryRegistry {
    // ========================================================================
    // Nodes
    // ========================================================================

    async fn register_templatebrain(&self, space: &CoordinateSpace, skip_existing: bool) -> Result<bool> {
        let mut index = self.inner.space_index.write();
        let mut spaces = self.inner.spaces.write();
        match index.get(&space.label) {
            Some(_) if skip_existing => Ok(false),
            Some(&pos) => {
                spaces[pos] = space.clone();
                Ok(true)
            }
            None => {
                index.insert(space.label.clone(), spaces.len());
                spaces.push(space.clone());
                Ok(true)
            }
        }
    }

    async fn space(&self, label: &str) -> Result<Option<CoordinateSpace>> {
        let index = self.inner.space_index.read();
        Ok(index.get(label).map(|&pos| self.inner.spaces.read()[pos].clone()))
    }

    async fn spaces(&self) -> Result<Vec<CoordinateSpace>> {
        Ok(self.inner.spaces.read().clone())
    }

    // ========================================================================
    // Edges
    // ========================================================================

    async fn register_edge(&self, edge: TransformEdge) -> Result<bool> {
        self.insert_edge(edge)
    }

    async fn edge(&self, key: &EdgeKey) -> Result<Option<TransformEdge>> {
        let index = self.inner.edge_index.read();
        Ok(index.get(key).map(|&pos| self.inner.edges.read()[pos].clone()))
    }

    async fn edges(&self) -> Result<Vec<TransformEdge>> {
        Ok(self.inner.edges.read().clone())
    }

    async fn neighbors(&self, label: &str, direction: Direction) -> Result<Vec<TransformEdge>> {
        let edges = self.inner.edges.read();
        let adj = self.inner.adjacency.read();
        let Some(positions) = adj.get(label) else {
            return Ok(Vec::new());
        };
        Ok(positions
            .iter()
            .map(|&pos| &edges[pos])
            .filter(|e| {
                let outgoing = e.source == label;
                let incoming = e.target.as_deref() == Some(label);
                match direction {
                    Direction::Outgoing => outgoing,
                    Direction::Incoming => incoming,
                    Direction::Both => outgoing || incoming,
                }
            })
            .cloned()
            .collect())
    }

    async fn counts(&self) -> Result<(usize, usize)> {
        Ok((self.inner.spaces.read().len(), self.inner.edges.read().len()))
    }

    // ========================================================================
    // Search paths
    // ========================================================================

    async fn register_search_path(&self, path: &Path, trigger_scan: bool) -> Result<()> {
        {
            let mut paths = self.inner.search_paths.write();
            if !paths.iter().any(|p| p == path) {
                paths.push(path.to_path_buf());
            }
        }
        if trigger_scan {
            self.scan(&[path.to_path_buf()]);
        }
        Ok(())
    }

    async fn search_paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self.inner.search_paths.read().clone())
    }

    async fn scan_paths(&self) -> Result<usize> {
        let roots = self.inner.search_paths.read().clone();
        Ok(self.scan(&roots))
    }
}
