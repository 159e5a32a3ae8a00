//! # Transform Registry Trait
//!
//! This is THE contract between flybrains-rs and the transform engine that
//! stores the graph and later searches it. Registration is idempotent:
//! a second node or edge with an existing key is skipped, never overwritten,
//! and is not an error.
//!
//! ## Implementations
//!
//! | Registry | Module | Description |
//! |----------|--------|-------------|
//! | `MemoryRegistry` | `memory` | In-memory for testing/embedding |

pub mod memory;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::model::{CoordinateSpace, Direction, EdgeKey, TransformEdge};
use crate::Result;

pub use memory::MemoryRegistry;

// ============================================================================
// TransformRegistry Trait
// ============================================================================

/// The registry contract.
///
/// Write operations return `Ok(true)` when something was stored and
/// `Ok(false)` when the key already existed. Errors are reserved for
/// invalid input or an unreachable engine.
#[async_trait]
pub trait TransformRegistry: Send + Sync + 'static {
    // ========================================================================
    // Nodes
    // ========================================================================

    /// Register a template space. With `skip_existing`, an existing label is
    /// left untouched; without it, the descriptor is replaced.
    async fn register_templatebrain(&self, space: &CoordinateSpace, skip_existing: bool) -> Result<bool>;

    /// Look up a space by label.
    async fn space(&self, label: &str) -> Result<Option<CoordinateSpace>>;

    /// All spaces in registration order.
    async fn spaces(&self) -> Result<Vec<CoordinateSpace>>;

    // ========================================================================
    // Edges
    // ========================================================================

    /// Register an edge; first write per (source, target, type) wins.
    async fn register_edge(&self, edge: TransformEdge) -> Result<bool>;

    /// Look up an edge by key.
    async fn edge(&self, key: &EdgeKey) -> Result<Option<TransformEdge>>;

    /// All edges in registration order.
    async fn edges(&self) -> Result<Vec<TransformEdge>>;

    /// Edges touching `label`. Mirror edges count as outgoing.
    async fn neighbors(&self, label: &str, direction: Direction) -> Result<Vec<TransformEdge>>;

    /// (space count, edge count).
    async fn counts(&self) -> Result<(usize, usize)>;

    // ========================================================================
    // Search paths
    // ========================================================================

    /// Add a directory for the registry's own discovery. With
    /// `trigger_scan = false` the scan is deferred to [`scan_paths`].
    ///
    /// [`scan_paths`]: TransformRegistry::scan_paths
    async fn register_search_path(&self, path: &Path, trigger_scan: bool) -> Result<()>;

    /// Registered search paths, in order, without duplicates.
    async fn search_paths(&self) -> Result<Vec<PathBuf>>;

    /// Scan every registered search path. Returns the number of edges added.
    async fn scan_paths(&self) -> Result<usize>;
}
