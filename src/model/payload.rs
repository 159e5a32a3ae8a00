//! Transform payloads, opaque to the graph, meaningful to the engine.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{AffineMatrix, CoordinateFunction, LandmarkPairs};

/// The two on-disk families of discovered registration artifacts.
///
/// They are told apart by extension and have their own naming conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactFamily {
    /// HDF5 displacement-field container (`*.h5`), a single file.
    H5,
    /// CMTK registration folder (`*.list`), a directory.
    Cmtk,
}

impl ArtifactFamily {
    /// Scan order within one search root.
    pub const ALL: [ArtifactFamily; 2] = [ArtifactFamily::H5, ArtifactFamily::Cmtk];

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFamily::H5 => "h5",
            ArtifactFamily::Cmtk => "list",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

impl fmt::Display for ArtifactFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactFamily::H5 => f.write_str("H5"),
            ArtifactFamily::Cmtk => f.write_str("CMTK"),
        }
    }
}

/// A registration file (or folder) of a discovered family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTransform {
    pub family: ArtifactFamily,
    pub path: PathBuf,
}

/// Elastix parameter file plus the files it chains to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElastixTransform {
    pub parameter_file: PathBuf,
    pub companions: SmallVec<[PathBuf; 1]>,
}

/// Geometric mapping carried by an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum TransformPayload {
    Affine(AffineMatrix),
    /// Thin-plate-spline warp defined by landmark pairs.
    Landmarks(LandmarkPairs),
    Field(FieldTransform),
    Elastix(ElastixTransform),
    /// Identity between two labels for the same physical space.
    Alias,
    Function(CoordinateFunction),
}

impl TransformPayload {
    /// Whether the engine may traverse an edge with this payload backwards.
    pub fn invertible(&self) -> bool {
        match self {
            TransformPayload::Affine(_)
            | TransformPayload::Landmarks(_)
            | TransformPayload::Field(_)
            | TransformPayload::Alias => true,
            TransformPayload::Elastix(_) | TransformPayload::Function(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TransformPayload::Affine(_) => "affine",
            TransformPayload::Landmarks(_) => "landmarks",
            TransformPayload::Field(f) => match f.family {
                ArtifactFamily::H5 => "h5",
                ArtifactFamily::Cmtk => "cmtk",
            },
            TransformPayload::Elastix(_) => "elastix",
            TransformPayload::Alias => "alias",
            TransformPayload::Function(_) => "function",
        }
    }

    pub fn as_affine(&self) -> Option<&AffineMatrix> {
        match self {
            TransformPayload::Affine(m) => Some(m),
            _ => None,
        }
    }
}
