//! # Discovery
//!
//! Recursive scan of search roots for the two artifact families. Within a
//! root, all `.h5` hits come before all `.list` hits, each sorted by path,
//! so the result depends only on what is on disk. Roots keep their
//! priority order; with the `parallel` feature they are walked on the
//! rayon pool and collected back in that order.
//!
//! A missing root contributes nothing. Unreadable entries below a root are
//! logged and skipped.

pub mod external;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::classify;
use crate::edges;
use crate::model::{ArtifactFamily, TransformEdge};
use crate::Error;

pub use external::ExternalDiscovery;

/// A file or folder found under a search root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredArtifact {
    pub root: PathBuf,
    pub path: PathBuf,
    pub family: ArtifactFamily,
}

/// Where handling of a single artifact stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Classify,
    Load,
    Build,
    Register,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::Classify => "classify",
            FailureStage::Load => "load",
            FailureStage::Build => "build",
            FailureStage::Register => "register",
        };
        f.write_str(s)
    }
}

/// An artifact error tagged with the stage it happened in.
#[derive(Debug)]
pub struct StagedError {
    pub stage: FailureStage,
    pub error: Error,
}

impl StagedError {
    fn at(stage: FailureStage) -> impl FnOnce(Error) -> Self {
        move |error| Self { stage, error }
    }
}

// ============================================================================
// Scanning
// ============================================================================

fn has_extension(path: &Path, family: ArtifactFamily) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(family.extension())
}

/// Scan one root for one family.
pub fn scan_family(root: &Path, family: ArtifactFamily) -> Vec<DiscoveredArtifact> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(root = %root.display(), %error, "unreadable entry skipped");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let file_type = entry.file_type();
        if (file_type.is_file() || file_type.is_dir()) && has_extension(entry.path(), family) {
            found.push(DiscoveredArtifact {
                root: root.to_path_buf(),
                path: entry.into_path(),
                family,
            });
        }
    }
    found
}

/// Scan one root: every family, in family order.
pub fn scan_root(root: &Path) -> Vec<DiscoveredArtifact> {
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "search root missing, skipped");
        return Vec::new();
    }
    ArtifactFamily::ALL
        .into_iter()
        .flat_map(|family| scan_family(root, family))
        .collect()
}

/// Scan roots in priority order.
#[cfg(not(feature = "parallel"))]
pub fn scan_roots(roots: &[PathBuf]) -> Vec<DiscoveredArtifact> {
    roots.iter().flat_map(|root| scan_root(root)).collect()
}

/// Scan roots in parallel; the result keeps root priority order.
#[cfg(feature = "parallel")]
pub fn scan_roots(roots: &[PathBuf]) -> Vec<DiscoveredArtifact> {
    use rayon::prelude::*;

    let per_root: Vec<Vec<DiscoveredArtifact>> = roots.par_iter().map(|root| scan_root(root)).collect();
    per_root.into_iter().flatten().collect()
}

// ============================================================================
// Resolution
// ============================================================================

/// Classify, load and build one artifact.
///
/// `Ok(None)` for excluded housekeeping names.
pub fn resolve(artifact: &DiscoveredArtifact) -> std::result::Result<Option<TransformEdge>, StagedError> {
    let Some(classified) = classify::classify_artifact(&artifact.path, artifact.family)
        .map_err(StagedError::at(FailureStage::Classify))?
    else {
        return Ok(None);
    };
    let payload = classify::load_artifact(&artifact.path, artifact.family)
        .map_err(StagedError::at(FailureStage::Load))?;
    let edge = edges::build_discovered(&classified, payload).map_err(StagedError::at(FailureStage::Build))?;
    Ok(Some(edge))
}
