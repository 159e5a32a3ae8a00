//! # Artifact Classifier
//!
//! Turns a discovered registration file (or folder) into an edge
//! description from its name alone:
//!
//! | Name | Type | Source | Target |
//! |------|------|--------|--------|
//! | `A_B.h5`, `A_B.list` | bridging | `A` | `B` |
//! | `A_mirror.ext`, `A_imgflip.ext` | mirror | `A` | none |
//! | `orig.list`, `original.list` | excluded | | |
//!
//! Token order is declared per family in [`FamilyHandler`] rather than
//! assumed; both families currently name files source-first. EM spaces
//! whose registrations are fitted in microns get a `um` suffix so the edge
//! lands on the micron-qualified node.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{ArtifactFamily, EdgeType, FieldTransform, TransformPayload};
use crate::{Error, Result};

/// Housekeeping files some CMTK folders carry; never transforms.
pub const EXCLUDED_NAMES: [&str; 2] = ["orig.list", "original.list"];

/// Spaces whose discovered registrations expect micron coordinates.
pub const MICRON_QUALIFIED: [&str; 7] = [
    "FAFB",
    "FAFB14",
    "FLYWIRE",
    "JRCFIB2018F",
    "JRCFIB2022M",
    "MANC",
    "FANC",
];

const MIRROR_TOKENS: [&str; 2] = ["mirror", "imgflip"];

/// Which filename token names the source space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenOrder {
    /// `{source}_{target}.ext`
    SourceFirst,
    /// `{target}_{source}.ext`
    TargetFirst,
}

impl TokenOrder {
    fn assign<'a>(self, first: &'a str, second: &'a str) -> (&'a str, &'a str) {
        match self {
            TokenOrder::SourceFirst => (first, second),
            TokenOrder::TargetFirst => (second, first),
        }
    }
}

/// Closed dispatch entry for one artifact family: naming convention plus loader.
#[derive(Debug, Clone, Copy)]
pub struct FamilyHandler {
    pub family: ArtifactFamily,
    pub token_order: TokenOrder,
    pub loader: fn(&Path) -> Result<TransformPayload>,
}

static H5_HANDLER: FamilyHandler = FamilyHandler {
    family: ArtifactFamily::H5,
    token_order: TokenOrder::SourceFirst,
    loader: load_h5,
};

static CMTK_HANDLER: FamilyHandler = FamilyHandler {
    family: ArtifactFamily::Cmtk,
    token_order: TokenOrder::SourceFirst,
    loader: load_cmtk,
};

pub fn handler(family: ArtifactFamily) -> &'static FamilyHandler {
    match family {
        ArtifactFamily::H5 => &H5_HANDLER,
        ArtifactFamily::Cmtk => &CMTK_HANDLER,
    }
}

/// Result of classifying one artifact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedArtifact {
    pub path: PathBuf,
    pub family: ArtifactFamily,
    pub source: String,
    pub target: Option<String>,
    pub edge_type: EdgeType,
}

/// Append `um` to labels whose discovered registrations are in microns.
pub fn qualify_micron(label: &str) -> String {
    if MICRON_QUALIFIED.contains(&label) {
        format!("{label}um")
    } else {
        label.to_string()
    }
}

pub fn is_excluded(name: &str) -> bool {
    EXCLUDED_NAMES.contains(&name)
}

/// Classify an artifact by its file name.
///
/// Returns `Ok(None)` for excluded housekeeping names and an
/// [`Error::Classification`] for names that do not follow the convention.
pub fn classify_artifact(path: &Path, family: ArtifactFamily) -> Result<Option<ClassifiedArtifact>> {
    let unrecognised = |message: String| Error::Classification { path: path.to_path_buf(), message };

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| unrecognised("no UTF-8 file name".into()))?;
    if is_excluded(name) {
        return Ok(None);
    }

    let suffix = format!(".{}", family.extension());
    let stem = name
        .strip_suffix(suffix.as_str())
        .ok_or_else(|| unrecognised(format!("expected a '{suffix}' {family} artifact")))?;

    let tokens: Vec<&str> = stem.split('_').collect();
    if tokens.len() < 2 || tokens[0].is_empty() || tokens[1].is_empty() {
        return Err(unrecognised(format!("'{stem}' is not of the form A_B or A_mirror")));
    }

    let is_mirror = tokens.iter().any(|t| MIRROR_TOKENS.contains(t));
    let (source, target, edge_type) = if is_mirror {
        if MIRROR_TOKENS.contains(&tokens[0]) {
            return Err(unrecognised(format!("'{stem}' names no space to mirror")));
        }
        (qualify_micron(tokens[0]), None, EdgeType::Mirror)
    } else {
        let (source, target) = handler(family).token_order.assign(tokens[0], tokens[1]);
        (qualify_micron(source), Some(qualify_micron(target)), EdgeType::Bridging)
    };

    Ok(Some(ClassifiedArtifact {
        path: path.to_path_buf(),
        family,
        source,
        target,
        edge_type,
    }))
}

/// Check the artifact on disk and wrap it as a payload.
pub fn load_artifact(path: &Path, family: ArtifactFamily) -> Result<TransformPayload> {
    (handler(family).loader)(path)
}

fn load_h5(path: &Path) -> Result<TransformPayload> {
    if !path.is_file() {
        return Err(Error::MissingArtifact {
            path: path.to_path_buf(),
            reason: "not a regular file".into(),
        });
    }
    Ok(TransformPayload::Field(FieldTransform { family: ArtifactFamily::H5, path: path.to_path_buf() }))
}

fn load_cmtk(path: &Path) -> Result<TransformPayload> {
    if !path.is_dir() {
        return Err(Error::MissingArtifact {
            path: path.to_path_buf(),
            reason: "not a registration folder".into(),
        });
    }
    let has_registration = ["registration", "registration.gz"]
        .iter()
        .any(|f| path.join(f).is_file());
    if !has_registration {
        return Err(Error::MissingArtifact {
            path: path.to_path_buf(),
            reason: "folder has no 'registration' file".into(),
        });
    }
    Ok(TransformPayload::Field(FieldTransform { family: ArtifactFamily::Cmtk, path: path.to_path_buf() }))
}
