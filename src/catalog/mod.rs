//! # Space Catalog
//!
//! Static metadata for every template space, loaded from a JSON table.
//! The bundled table lives in `data/template_meta.json`; any other table
//! with the same shape can be loaded with [`SpaceCatalog::from_json`].
//!
//! A handful of spaces are derived rather than listed: their geometry is
//! computed from a raw-voxel counterpart (see [`DerivedSpace`]).

use hashbrown::HashMap;

use crate::model::{CoordinateSpace, Unit};
use crate::{Error, Result};

const BUNDLED_META: &str = include_str!("../../data/template_meta.json");

/// A physical-unit space computed from a raw-voxel entry of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSpace {
    pub label: &'static str,
    pub from: &'static str,
    pub voxel_size: [f64; 3],
    pub unit: Unit,
}

/// Derived spaces of the bundled catalog.
pub const BUNDLED_DERIVED: &[DerivedSpace] = &[DerivedSpace {
    label: "MANC",
    from: "MANCraw",
    voxel_size: [8.0, 8.0, 8.0],
    unit: Unit::Nanometer,
}];

/// Ordered, label-unique set of coordinate spaces.
#[derive(Debug, Clone, Default)]
pub struct SpaceCatalog {
    spaces: Vec<CoordinateSpace>,
    index: HashMap<String, usize>,
}

impl SpaceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of space descriptors. Table order is kept.
    pub fn from_json(json: &str) -> Result<Self> {
        let spaces: Vec<CoordinateSpace> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for space in spaces {
            catalog.insert(space)?;
        }
        Ok(catalog)
    }

    /// The bundled table plus its derived spaces.
    pub fn bundled() -> Result<Self> {
        let mut catalog = Self::from_json(BUNDLED_META)?;
        for derived in BUNDLED_DERIVED {
            catalog.derive(derived)?;
        }
        Ok(catalog)
    }

    /// Add a space. Labels are unique; a second entry is an integrity error.
    pub fn insert(&mut self, space: CoordinateSpace) -> Result<()> {
        if space.label.is_empty() {
            return Err(Error::Integrity("space with empty label".into()));
        }
        if self.index.contains_key(&space.label) {
            return Err(Error::Integrity(format!("duplicate space label '{}'", space.label)));
        }
        self.index.insert(space.label.clone(), self.spaces.len());
        self.spaces.push(space);
        Ok(())
    }

    /// Compute and insert a derived space.
    pub fn derive(&mut self, derived: &DerivedSpace) -> Result<()> {
        let raw = self
            .get(derived.from)
            .ok_or_else(|| Error::NotFound(format!("raw space '{}' for '{}'", derived.from, derived.label)))?;
        let space = raw.to_physical(derived.label, derived.voxel_size, derived.unit);
        self.insert(space)
    }

    pub fn get(&self, label: &str) -> Option<&CoordinateSpace> {
        self.index.get(label).map(|&i| &self.spaces[i])
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoordinateSpace> {
        self.spaces.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.spaces.iter().map(|s| s.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AxisUnits;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bundled_catalog_loads() {
        let catalog = SpaceCatalog::bundled().unwrap();
        assert_eq!(catalog.len(), 31);
        assert_eq!(catalog.labels().next(), Some("FCWB"));
        assert_eq!(catalog.labels().last(), Some("MANC"));
        for label in ["JRC2018F", "FAFB14", "FLYWIRE", "JRCFIB2018Fraw", "DmelL1CNS_Seymour"] {
            assert!(catalog.contains(label), "{label} missing");
        }
    }

    #[test]
    fn test_manc_derived_from_raw() {
        let catalog = SpaceCatalog::bundled().unwrap();
        let raw = catalog.get("MANCraw").unwrap();
        let manc = catalog.get("MANC").unwrap();
        assert!(raw.units.is_dimensionless());
        assert_eq!(manc.units, AxisUnits::uniform(Unit::Nanometer));
        assert_eq!(manc.voxel_size, Some([8.0, 8.0, 8.0]));
        let rb = raw.bounding_box.unwrap();
        let mb = manc.bounding_box.unwrap();
        for i in 0..6 {
            assert_eq!(mb[i], rb[i] * 8.0);
        }
        assert_eq!(manc.dims, raw.dims);
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let json = r#"[{"label": "A"}, {"label": "B"}, {"label": "A"}]"#;
        let err = SpaceCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, Error::Integrity(msg) if msg.contains("'A'")));
    }

    #[test]
    fn test_derive_needs_raw_entry() {
        let mut catalog = SpaceCatalog::from_json(r#"[{"label": "A"}]"#).unwrap();
        let missing = DerivedSpace { label: "B", from: "Braw", voxel_size: [1.0; 3], unit: Unit::Micron };
        assert!(matches!(catalog.derive(&missing), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_undefined_units_are_raw() {
        let catalog = SpaceCatalog::from_json(r#"[{"label": "X", "voxdims": [8, 8, 8]}]"#).unwrap();
        assert!(catalog.get("X").unwrap().units.is_dimensionless());
    }
}
