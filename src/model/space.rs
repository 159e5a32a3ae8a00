//! Coordinate space (template brain), a node of the transform graph.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Physical unit of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Raw voxels or otherwise uncalibrated coordinates.
    Raw,
    Nanometer,
    Micron,
}

impl Unit {
    /// Length of one unit in nanometres, `None` for raw voxels.
    pub fn nanometers(self) -> Option<f64> {
        match self {
            Unit::Raw => None,
            Unit::Nanometer => Some(1.0),
            Unit::Micron => Some(1_000.0),
        }
    }

    /// Label suffix used for the unit-qualified variant of a space.
    pub fn label_suffix(self) -> &'static str {
        match self {
            Unit::Raw => "raw",
            Unit::Nanometer => "nm",
            Unit::Micron => "um",
        }
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "raw" | "voxel" | "voxels" | "pixel" | "pixels" | "dimensionless" => Ok(Unit::Raw),
            "nm" | "nanometer" | "nanometers" | "nanometre" | "nanometres" => Ok(Unit::Nanometer),
            "um" | "µm" | "micron" | "microns" | "micrometer" | "micrometers" => Ok(Unit::Micron),
            other => Err(Error::Config(format!("unknown unit '{other}'"))),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Raw => "voxels",
            Unit::Nanometer => "nm",
            Unit::Micron => "microns",
        };
        f.write_str(s)
    }
}

/// Per-axis units. Axes may differ; an undefined unit is treated as raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UnitsRepr", into = "UnitsRepr")]
pub struct AxisUnits(pub [Unit; 3]);

impl AxisUnits {
    pub const RAW: AxisUnits = AxisUnits([Unit::Raw; 3]);

    pub fn uniform(unit: Unit) -> Self {
        Self([unit; 3])
    }

    pub fn is_uniform(&self) -> bool {
        self.0[0] == self.0[1] && self.0[1] == self.0[2]
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|u| *u == Unit::Raw)
    }
}

impl Default for AxisUnits {
    fn default() -> Self {
        Self::RAW
    }
}

/// On-disk representation: a single unit string, one per axis, or null.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum UnitsRepr {
    Missing(()),
    One(String),
    PerAxis(Vec<String>),
}

impl TryFrom<UnitsRepr> for AxisUnits {
    type Error = Error;

    fn try_from(repr: UnitsRepr) -> Result<Self> {
        match repr {
            UnitsRepr::Missing(()) => Ok(AxisUnits::RAW),
            UnitsRepr::One(s) => Ok(AxisUnits::uniform(s.parse()?)),
            UnitsRepr::PerAxis(v) => {
                if v.len() != 3 {
                    return Err(Error::Config(format!("expected 3 axis units, got {}", v.len())));
                }
                Ok(AxisUnits([v[0].parse()?, v[1].parse()?, v[2].parse()?]))
            }
        }
    }
}

impl From<AxisUnits> for UnitsRepr {
    fn from(units: AxisUnits) -> Self {
        if units.is_uniform() {
            UnitsRepr::One(units.0[0].label_suffix().to_string())
        } else {
            UnitsRepr::PerAxis(units.0.iter().map(|u| u.label_suffix().to_string()).collect())
        }
    }
}

/// A named template space.
///
/// `label` is the graph key and must be unique across the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSpace {
    pub label: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub units: AxisUnits,
    #[serde(default, rename = "voxdims")]
    pub voxel_size: Option<[f64; 3]>,
    #[serde(default, rename = "boundingbox")]
    pub bounding_box: Option<[f64; 6]>,
    #[serde(default)]
    pub dims: Option<[u32; 3]>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
}

impl CoordinateSpace {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            name: None,
            kind: None,
            sex: None,
            units: AxisUnits::RAW,
            voxel_size: None,
            bounding_box: None,
            dims: None,
            description: None,
            doi: None,
        }
    }

    pub fn with_units(mut self, units: AxisUnits) -> Self {
        self.units = units;
        self
    }

    pub fn with_voxel_size(mut self, voxel_size: [f64; 3]) -> Self {
        self.voxel_size = Some(voxel_size);
        self
    }

    pub fn with_bounding_box(mut self, bbox: [f64; 6]) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    pub fn with_dims(mut self, dims: [u32; 3]) -> Self {
        self.dims = Some(dims);
        self
    }

    /// Same descriptor under another label.
    pub fn relabelled(&self, label: impl Into<String>) -> Self {
        Self { label: label.into(), ..self.clone() }
    }

    /// Derive the physical-unit counterpart of a raw-voxel space.
    ///
    /// The bounding box (voxel coordinates, `[xmin, xmax, ymin, ymax, zmin, zmax]`)
    /// is scaled per axis by `voxel_size`; dims stay voxel counts.
    pub fn to_physical(&self, label: impl Into<String>, voxel_size: [f64; 3], unit: Unit) -> Self {
        let bounding_box = self.bounding_box.map(|b| {
            let mut scaled = b;
            for (i, v) in scaled.iter_mut().enumerate() {
                *v *= voxel_size[i / 2];
            }
            scaled
        });
        Self {
            label: label.into(),
            units: AxisUnits::uniform(unit),
            voxel_size: Some(voxel_size),
            bounding_box,
            ..self.clone()
        }
    }
}
