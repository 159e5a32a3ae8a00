//! # flybrains-rs: Template Space Bridging Graph
//!
//! Catalogs the 3-D template spaces used in Drosophila neuroanatomy and
//! builds the declarative graph of transforms between them. Nodes are
//! coordinate spaces, edges are bridging or mirror transforms. The graph is
//! handed to an external engine that does path search and evaluation; this
//! crate only discovers, classifies and registers.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `TransformRegistry` is the contract between this crate and the engine
//! 2. **Clean DTOs**: `CoordinateSpace`, `TransformEdge`, `TransformPayload` cross all boundaries
//! 3. **No hidden state**: the catalog and the manual declarations are values passed to the driver
//! 4. **Fixed order**: discovered → landmark → composite → unit → mirror → alias, first write wins
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flybrains::{Atlas, RegistrationConfig, TransformRegistry};
//!
//! # async fn example() -> flybrains::Result<()> {
//! let atlas = Atlas::open_memory().await?;
//! let config = RegistrationConfig::from_env()?;
//!
//! let report = atlas.register(&config).await?;
//! println!("{} edges, {} failures", report.edges_registered, report.failures.len());
//!
//! let (spaces, edges) = atlas.registry().counts().await?;
//! println!("{spaces} spaces, {edges} edges");
//! # Ok(())
//! # }
//! ```
//!
//! ## Registries
//!
//! | Registry | Module | Description |
//! |----------|--------|-------------|
//! | `MemoryRegistry` | `registry::memory` | In-memory, for tests and embedding |

use std::path::PathBuf;

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod catalog;
pub mod classify;
pub mod edges;
pub mod declarations;
pub mod discovery;
pub mod config;
pub mod driver;
pub mod registry;
pub mod export;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    CoordinateSpace, Unit, AxisUnits,
    TransformEdge, TransformPayload, EdgeType, EdgeKey, Direction,
    AffineMatrix, LandmarkPairs, CoordinateFunction, ArtifactFamily,
};

// ============================================================================
// Re-exports: Registration
// ============================================================================

pub use catalog::SpaceCatalog;
pub use classify::{ClassifiedArtifact, TokenOrder, classify_artifact};
pub use config::RegistrationConfig;
pub use declarations::{Declarations, LoadedDeclarations};
pub use discovery::ExternalDiscovery;
pub use driver::{RegistrationDriver, RegistrationReport, ArtifactFailure, FailureStage, Step};
pub use registry::{TransformRegistry, MemoryRegistry};

// ============================================================================
// Top-level Atlas handle
// ============================================================================

/// The primary entry point. An `Atlas` wraps a registry and runs
/// registration passes into it.
pub struct Atlas<R: TransformRegistry> {
    registry: R,
    external: ExternalDiscovery,
}

impl<R: TransformRegistry> Atlas<R> {
    /// Create an Atlas over the given registry.
    pub fn with_registry(registry: R) -> Self {
        Self { registry, external: ExternalDiscovery::nat() }
    }

    /// Replace the external search-root discovery.
    pub fn with_external_discovery(mut self, external: ExternalDiscovery) -> Self {
        self.external = external;
        self
    }

    /// Run one full pass with the bundled catalog and the built-in declarations.
    pub async fn register(&self, config: &RegistrationConfig) -> Result<RegistrationReport> {
        let catalog = SpaceCatalog::bundled()?;
        let declarations = Declarations::flybrains();
        let driver = RegistrationDriver::build(&self.registry, config, catalog, &declarations, &self.external)?;
        driver.register().await
    }

    /// Hand every search root to the registry and trigger one scan.
    pub async fn inject_paths(&self, config: &RegistrationConfig) -> Result<usize> {
        let external: &[PathBuf] = if config.external_discovery { self.external.directories() } else { &[] };
        driver::inject_paths(&self.registry, &config.search_roots(external)).await
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }
}

/// In-memory atlas for testing and embedding.
impl Atlas<MemoryRegistry> {
    pub async fn open_memory() -> Result<Self> {
        Ok(Self::with_registry(MemoryRegistry::new()))
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot classify {}: {message}", .path.display())]
    Classification { path: PathBuf, message: String },

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Data integrity error: {0}")]
    Integrity(String),

    #[error("Missing artifact {}: {reason}", .path.display())]
    MissingArtifact { path: PathBuf, reason: String },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
