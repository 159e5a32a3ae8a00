//! # Manual Declarations
//!
//! The curated edges that no filename scan can find: landmark bridges
//! between EM datasets, landmark mirrors, the FANC ↔ JRCVNC2018F composite
//! pipelines, unit conversions and naming aliases.
//!
//! [`Declarations`] is plain data. [`Declarations::load`] reads every
//! referenced file from the package data directory and builds the edges,
//! grouped by registration step. Any failure there is structural and is
//! returned to the caller rather than skipped.

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::edges::{self, CompositeStage, UnitEdgeSpec};
use crate::model::{
    AcquisitionCorrection, Axis, AxisReflection, CoordinateFunction, CorrectionDirection,
    EdgeType, ElastixTransform, LandmarkColumns, LandmarkPairs, StackFlip, TransformEdge,
    TransformPayload, load_landmarks,
};
use crate::{Error, Result};

// ============================================================================
// Declaration data
// ============================================================================

/// A thin-plate-spline edge read from a landmark table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkDeclaration {
    /// File name under the package data directory.
    pub file: String,
    pub columns: LandmarkColumns,
    pub source: String,
    /// `None` for mirrors.
    pub target: Option<String>,
    /// Divide both sides by this before use (nm table on a voxel space).
    #[serde(default)]
    pub divisor: Option<f64>,
}

impl LandmarkDeclaration {
    pub fn bridge(file: &str, columns: LandmarkColumns, source: &str, target: &str) -> Self {
        Self {
            file: file.into(),
            columns,
            source: source.into(),
            target: Some(target.into()),
            divisor: None,
        }
    }

    pub fn mirror(file: &str, columns: LandmarkColumns, source: &str) -> Self {
        Self {
            file: file.into(),
            columns,
            source: source.into(),
            target: None,
            divisor: None,
        }
    }

    pub fn divided_by(mut self, divisor: f64) -> Self {
        self.divisor = Some(divisor);
        self
    }

    fn edge_type(&self) -> EdgeType {
        if self.target.is_some() { EdgeType::Bridging } else { EdgeType::Mirror }
    }
}

/// Payload of a composite stage before its files are checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StagePayload {
    Function(CoordinateFunction),
    /// Elastix parameter file plus companions, relative to package data.
    Elastix { parameter_file: String, companions: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDeclaration {
    pub source: String,
    pub target: String,
    pub payload: StagePayload,
}

/// One direction of a composite pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeDeclaration {
    pub name: String,
    pub stages: Vec<StageDeclaration>,
}

/// Every manual edge of a registration pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Declarations {
    pub landmark_bridges: Vec<LandmarkDeclaration>,
    pub composites: Vec<CompositeDeclaration>,
    pub unit_edges: Vec<UnitEdgeSpec>,
    pub mirrors: Vec<LandmarkDeclaration>,
    pub aliases: Vec<(String, String)>,
}

// ============================================================================
// Built-in table
// ============================================================================

const FANC_OFFSET_NM: [f64; 3] = [533.2, 533.2, 945.0];
const FANC_VOXEL_NM: [f64; 3] = [430.0, 430.0, 450.0];
const FANC_TEMPLATE_PITCH_NM: [f64; 3] = [300.0, 300.0, 400.0];
const FANC_STACK: StackFlip = StackFlip { slices: 436, pitch: 400.0 };
/// JRCVNC2018F midline, 329 voxels of 0.4 µm.
const JRCVNC2018F_MIDLINE_UM: f64 = 329.0 * 0.4;

fn fanc_correction() -> AcquisitionCorrection {
    AcquisitionCorrection {
        offset: FANC_OFFSET_NM,
        acquisition_pitch: FANC_VOXEL_NM,
        template_pitch: FANC_TEMPLATE_PITCH_NM,
        flip: FANC_STACK,
        output_scale: 1_000.0,
    }
}

fn fanc_stage(source: &str, target: &str, direction: CorrectionDirection) -> StageDeclaration {
    let name = match direction {
        CorrectionDirection::IntoTemplate => "FANCnm_JRCVNC2018F_pre",
        CorrectionDirection::FromTemplate => "JRCVNC2018F_FANCnm_post",
    };
    StageDeclaration {
        source: source.into(),
        target: target.into(),
        payload: StagePayload::Function(CoordinateFunction::Correction {
            name: name.into(),
            correction: fanc_correction(),
            direction,
        }),
    }
}

fn vnc_reflect_stage(source: &str, target: &str) -> StageDeclaration {
    StageDeclaration {
        source: source.into(),
        target: target.into(),
        payload: StagePayload::Function(CoordinateFunction::Reflection {
            name: "JRCVNC2018F_reflect".into(),
            reflection: AxisReflection { axis: Axis::X, plane: JRCVNC2018F_MIDLINE_UM },
        }),
    }
}

fn elastix_stage(source: &str, target: &str, parameter_file: &str, companions: &[&str]) -> StageDeclaration {
    StageDeclaration {
        source: source.into(),
        target: target.into(),
        payload: StagePayload::Elastix {
            parameter_file: parameter_file.into(),
            companions: companions.iter().map(|c| c.to_string()).collect(),
        },
    }
}

impl Declarations {
    /// Nothing declared; discovered artifacts only.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The Drosophila template set.
    pub fn flybrains() -> Self {
        let sym = LandmarkColumns::new(["x", "y", "z"], ["x_sym", "y_sym", "z_sym"]);
        let flip = LandmarkColumns::new(["x_flip", "y_flip", "z_flip"], ["x_mirr", "y_mirr", "z_mirr"]);

        let landmark_bridges = vec![
            LandmarkDeclaration::bridge("FAFB14_symmetrize_landmarks_nm.csv", sym.clone(), "FAFB14", "FAFB14sym"),
            LandmarkDeclaration::bridge("FLYWIRE_symmetrize_landmarks_nm.csv", sym, "FLYWIRE", "FLYWIREsym"),
            LandmarkDeclaration::bridge(
                "maleCNS_brain_FAFB_landmarks_nm.csv",
                LandmarkColumns::new(["fafb_x", "fafb_y", "fafb_z"], ["cns_x", "cns_y", "cns_z"]),
                "FAFB14",
                "JRCFIB2022M",
            ),
            LandmarkDeclaration::bridge(
                "maleCNS_brain_FLYWIRE_landmarks_nm.csv",
                LandmarkColumns::new(["flywire_x", "flywire_y", "flywire_z"], ["cns_x", "cns_y", "cns_z"]),
                "FLYWIRE",
                "JRCFIB2022M",
            ),
            LandmarkDeclaration::bridge(
                "MANC_FANC_landmarks_nm.csv",
                LandmarkColumns::new(["x_manc", "y_manc", "z_manc"], ["x_fanc", "y_fanc", "z_fanc"]),
                "MANC",
                "FANC",
            ),
        ];

        // Elastix is not invertible: each direction is its own chain.
        let composites = vec![
            CompositeDeclaration {
                name: "FANC -> JRCVNC2018F".into(),
                stages: vec![
                    fanc_stage("FANC", "FANCum_fixed", CorrectionDirection::IntoTemplate),
                    elastix_stage("FANCum_fixed", "JRCVNC2018F_reflected", "TransformParameters.FixedFANC.txt", &[]),
                    vnc_reflect_stage("JRCVNC2018F_reflected", "JRCVNC2018F"),
                ],
            },
            CompositeDeclaration {
                name: "JRCVNC2018F -> FANC".into(),
                stages: vec![
                    vnc_reflect_stage("JRCVNC2018F", "JRCVNC2018F_reflected"),
                    elastix_stage(
                        "JRCVNC2018F_reflected",
                        "FANCum_fixed",
                        "TransformParameters.FixedTemplate.Bspline.txt",
                        &["TransformParameters.FixedTemplate.affine.txt"],
                    ),
                    fanc_stage("FANCum_fixed", "FANC", CorrectionDirection::FromTemplate),
                ],
            },
        ];

        let mut unit_edges = Vec::new();
        for template in ["JRCFIB2022M", "MANC", "JRCFIB2018F"] {
            unit_edges.push(UnitEdgeSpec::raw_to_native(template, [8.0, 8.0, 8.0]));
        }
        for template in ["FLYWIRE", "FAFB14"] {
            unit_edges.push(UnitEdgeSpec::raw_to_native(template, [4.0, 4.0, 40.0]));
        }
        unit_edges.push(UnitEdgeSpec::raw_to_native("FANC", [4.3, 4.3, 45.0]));
        // JFRC2 z calibration differs between the two releases.
        unit_edges.push(UnitEdgeSpec::recalibration("JFRC2", "JFRC2010", [1.0, 1.0, 1.0 / 0.622_088_0]));
        for template in ["FAFB14", "FLYWIRE", "MANC", "JRCFIB2018F", "FANC", "JRCFIB2022M"] {
            unit_edges.push(UnitEdgeSpec::micron_to_native(template));
        }

        let mirrors = vec![
            LandmarkDeclaration::mirror("maleCNS_mirror_landmarks_nm.csv", flip.clone(), "JRCFIB2022M"),
            LandmarkDeclaration::mirror("maleCNS_mirror_landmarks_nm.csv", flip.clone(), "JRCFIB2022Mraw").divided_by(8.0),
            LandmarkDeclaration::mirror("FANC_mirror_landmarks.csv", flip.clone(), "FANC"),
            LandmarkDeclaration::mirror("FLYWIRE_mirror_landmarks.csv", flip.clone(), "FLYWIRE"),
            LandmarkDeclaration::mirror("FAFB14_mirror_landmarks.csv", flip.clone(), "FAFB14"),
            LandmarkDeclaration::mirror("FAFB14_mirror_landmarks.csv", flip, "FAFB"),
        ];

        let aliases = [
            ("hemibrain", "JRCFIB2018F"),
            ("hemibrainraw", "JRCFIB2018Fraw"),
            ("hemibrainum", "JRCFIB2018Fum"),
            ("FAFB", "FAFB14"),
            ("FAFBum", "FAFB14um"),
            ("FAFBnm", "FAFB14nm"),
            ("FANC", "FANCnm"),
            ("JRCFIB2022M", "JRCFIB2022Mnm"),
            ("MANC", "MANCnm"),
            ("FLYWIRE", "FLYWIREnm"),
        ]
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        Self { landmark_bridges, composites, unit_edges, mirrors, aliases }
    }

    /// Read every referenced file under `package_data` and build the edges.
    pub fn load(&self, package_data: &Path) -> Result<LoadedDeclarations> {
        let mut tables = TableCache::new(package_data);

        let landmark = self
            .landmark_bridges
            .iter()
            .map(|d| tables.build(d))
            .collect::<Result<Vec<_>>>()?;

        let mut composite = Vec::new();
        let mut intermediates = Vec::new();
        for decl in &self.composites {
            let stages = decl
                .stages
                .iter()
                .map(|s| resolve_stage(package_data, s))
                .collect::<Result<Vec<_>>>()?;
            let built = edges::build_composite(&stages)
                .map_err(|e| Error::Integrity(format!("composite '{}': {e}", decl.name)))?;
            intermediates.extend(edges::intermediates(&stages).map(String::from));
            composite.extend(built);
        }
        intermediates.sort();
        intermediates.dedup();

        let unit = self
            .unit_edges
            .iter()
            .map(edges::build_unit_edge)
            .collect::<Result<Vec<_>>>()?;

        let mirror = self
            .mirrors
            .iter()
            .map(|d| tables.build(d))
            .collect::<Result<Vec<_>>>()?;

        let alias = self
            .aliases
            .iter()
            .map(|(a, b)| edges::build_alias(a, b))
            .collect::<Result<Vec<_>>>()?;

        Ok(LoadedDeclarations { landmark, composite, unit, mirror, alias, intermediates })
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Built manual edges, one list per registration step.
#[derive(Debug, Clone, Default)]
pub struct LoadedDeclarations {
    pub landmark: Vec<TransformEdge>,
    pub composite: Vec<TransformEdge>,
    pub unit: Vec<TransformEdge>,
    pub mirror: Vec<TransformEdge>,
    pub alias: Vec<TransformEdge>,
    /// Synthetic spaces that anchor composite pipelines.
    pub intermediates: Vec<String>,
}

impl LoadedDeclarations {
    pub fn total(&self) -> usize {
        self.landmark.len() + self.composite.len() + self.unit.len() + self.mirror.len() + self.alias.len()
    }
}

/// Landmark tables read once per (file, columns).
struct TableCache<'a> {
    root: &'a Path,
    tables: HashMap<(String, LandmarkColumns), LandmarkPairs>,
}

impl<'a> TableCache<'a> {
    fn new(root: &'a Path) -> Self {
        Self { root, tables: HashMap::new() }
    }

    fn table(&mut self, file: &str, columns: &LandmarkColumns) -> Result<&LandmarkPairs> {
        let key = (file.to_string(), columns.clone());
        if !self.tables.contains_key(&key) {
            let pairs = load_landmarks(&self.root.join(file), columns)?;
            self.tables.insert(key.clone(), pairs);
        }
        self.tables
            .get(&key)
            .ok_or_else(|| Error::Integrity(format!("landmark table '{file}' vanished from cache")))
    }

    fn build(&mut self, decl: &LandmarkDeclaration) -> Result<TransformEdge> {
        let table = self.table(&decl.file, &decl.columns)?;
        let pairs = match decl.divisor {
            Some(d) if d.is_finite() && d != 0.0 => table.divided_by(d),
            Some(d) => return Err(Error::Integrity(format!("{}: invalid divisor {d}", decl.file))),
            None => table.clone(),
        };
        edges::build_simple(
            &decl.source,
            decl.target.as_deref(),
            TransformPayload::Landmarks(pairs),
            decl.edge_type(),
        )
    }
}

fn require_file(root: &Path, file: &str) -> Result<PathBuf> {
    let path = root.join(file);
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::MissingArtifact { path, reason: "declared transform file not found".into() })
    }
}

fn resolve_stage(root: &Path, stage: &StageDeclaration) -> Result<CompositeStage> {
    let payload = match &stage.payload {
        StagePayload::Function(f) => TransformPayload::Function(f.clone()),
        StagePayload::Elastix { parameter_file, companions } => {
            let parameter_file = require_file(root, parameter_file)?;
            let companions = companions
                .iter()
                .map(|c| require_file(root, c))
                .collect::<Result<SmallVec<[PathBuf; 1]>>>()?;
            TransformPayload::Elastix(ElastixTransform { parameter_file, companions })
        }
    };
    Ok(CompositeStage::new(stage.source.clone(), stage.target.clone(), payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UTILITY_WEIGHT;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    fn fixture_package(dir: &Path) {
        let sym = "x,y,z,x_sym,y_sym,z_sym\n0,0,0,1,1,1\n8,8,8,9,9,9\n";
        write(dir, "FAFB14_symmetrize_landmarks_nm.csv", sym);
        write(dir, "FLYWIRE_symmetrize_landmarks_nm.csv", sym);
        write(dir, "maleCNS_brain_FAFB_landmarks_nm.csv", "fafb_x,fafb_y,fafb_z,cns_x,cns_y,cns_z\n1,2,3,4,5,6\n");
        write(dir, "maleCNS_brain_FLYWIRE_landmarks_nm.csv", "flywire_x,flywire_y,flywire_z,cns_x,cns_y,cns_z\n1,2,3,4,5,6\n");
        write(dir, "MANC_FANC_landmarks_nm.csv", "x_manc,y_manc,z_manc,x_fanc,y_fanc,z_fanc\n1,2,3,4,5,6\n");
        let flip = "x_flip,y_flip,z_flip,x_mirr,y_mirr,z_mirr\n8,16,24,80,16,24\n";
        for f in ["maleCNS_mirror_landmarks_nm.csv", "FANC_mirror_landmarks.csv", "FLYWIRE_mirror_landmarks.csv", "FAFB14_mirror_landmarks.csv"] {
            write(dir, f, flip);
        }
        for f in [
            "TransformParameters.FixedFANC.txt",
            "TransformParameters.FixedTemplate.Bspline.txt",
            "TransformParameters.FixedTemplate.affine.txt",
        ] {
            write(dir, f, "(Transform \"BSplineTransform\")\n");
        }
    }

    #[test]
    fn test_flybrains_table_shape() {
        let d = Declarations::flybrains();
        assert_eq!(d.landmark_bridges.len(), 5);
        assert_eq!(d.composites.len(), 2);
        assert_eq!(d.unit_edges.len(), 13);
        assert_eq!(d.mirrors.len(), 6);
        assert_eq!(d.aliases.len(), 10);
    }

    #[test]
    fn test_load_builds_every_step() {
        let dir = tempfile::tempdir().unwrap();
        fixture_package(dir.path());
        let loaded = Declarations::flybrains().load(dir.path()).unwrap();

        assert_eq!(loaded.landmark.len(), 5);
        assert_eq!(loaded.composite.len(), 6);
        assert_eq!(loaded.unit.len(), 13);
        assert_eq!(loaded.mirror.len(), 6);
        assert_eq!(loaded.alias.len(), 10);
        assert_eq!(loaded.total(), 40);
        assert_eq!(loaded.intermediates, vec!["FANCum_fixed".to_string(), "JRCVNC2018F_reflected".to_string()]);
        assert!(loaded.unit.iter().all(|e| e.weight == UTILITY_WEIGHT));
        assert!(loaded.mirror.iter().all(|e| e.target.is_none()));
    }

    #[test]
    fn test_raw_mirror_table_is_in_voxels() {
        let dir = tempfile::tempdir().unwrap();
        fixture_package(dir.path());
        let loaded = Declarations::flybrains().load(dir.path()).unwrap();
        let raw = loaded.mirror.iter().find(|e| e.source == "JRCFIB2022Mraw").unwrap();
        let TransformPayload::Landmarks(pairs) = &raw.payload else { panic!("expected landmarks") };
        assert_eq!(pairs.source()[0], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_elastix_companion_is_required() {
        let dir = tempfile::tempdir().unwrap();
        fixture_package(dir.path());
        std::fs::remove_file(dir.path().join("TransformParameters.FixedTemplate.affine.txt")).unwrap();
        let err = Declarations::flybrains().load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::MissingArtifact { path, .. } if path.ends_with("TransformParameters.FixedTemplate.affine.txt")));
    }

    #[test]
    fn test_missing_landmark_table_is_structural() {
        let dir = tempfile::tempdir().unwrap();
        let err = Declarations::flybrains().load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Integrity(msg) if msg.contains("FAFB14_symmetrize_landmarks_nm.csv")));
    }

    #[test]
    fn test_empty_declarations_load_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Declarations::empty().load(dir.path()).unwrap();
        assert_eq!(loaded.total(), 0);
    }
}
