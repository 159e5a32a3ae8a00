//! Landmark correspondences for thin-plate-spline bridges and mirrors.
//!
//! Landmark tables are CSV files with a header row. Each declaration names
//! the three source columns and the three target columns it wants; any other
//! columns (row index, comments) are ignored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Paired source/target points. Both sides have the same, non-zero length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPairs {
    source: Vec<[f64; 3]>,
    target: Vec<[f64; 3]>,
}

impl LandmarkPairs {
    pub fn new(source: Vec<[f64; 3]>, target: Vec<[f64; 3]>) -> Result<Self> {
        if source.len() != target.len() {
            return Err(Error::Integrity(format!(
                "landmark count mismatch: {} source vs {} target",
                source.len(),
                target.len()
            )));
        }
        if source.is_empty() {
            return Err(Error::Integrity("landmark table has no rows".into()));
        }
        if source.iter().chain(&target).flatten().any(|v| !v.is_finite()) {
            return Err(Error::Integrity("landmark table contains non-finite values".into()));
        }
        Ok(Self { source, target })
    }

    pub fn source(&self) -> &[[f64; 3]] {
        &self.source
    }

    pub fn target(&self) -> &[[f64; 3]] {
        &self.target
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Both sides divided by `divisor` (e.g. nm landmarks to 8 nm voxels).
    pub fn divided_by(&self, divisor: f64) -> Self {
        let scale = |pts: &[[f64; 3]]| -> Vec<[f64; 3]> { pts.iter().map(|p| p.map(|v| v / divisor)).collect() };
        Self { source: scale(&self.source), target: scale(&self.target) }
    }
}

/// Column names selecting the source and target x/y/z triples of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LandmarkColumns {
    pub source: [String; 3],
    pub target: [String; 3],
}

impl LandmarkColumns {
    pub fn new(source: [&str; 3], target: [&str; 3]) -> Self {
        Self {
            source: source.map(String::from),
            target: target.map(String::from),
        }
    }
}

/// Read a landmark CSV and pick out the requested columns.
///
/// An unreadable file, missing column, ragged row, unparsable cell or empty
/// table is an [`Error::Integrity`] naming the file.
pub fn load_landmarks(path: &Path, columns: &LandmarkColumns) -> Result<LandmarkPairs> {
    let malformed = |e: csv::Error| Error::Integrity(format!("{}: {e}", path.display()));
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(malformed)?;
    let headers = reader.headers().map_err(malformed)?.clone();

    let position = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            Error::Integrity(format!("{}: missing column '{name}'", path.display()))
        })
    };
    let src_idx = [position(columns.source[0].as_str())?, position(columns.source[1].as_str())?, position(columns.source[2].as_str())?];
    let tgt_idx = [position(columns.target[0].as_str())?, position(columns.target[1].as_str())?, position(columns.target[2].as_str())?];

    let mut source = Vec::new();
    let mut target = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(malformed)?;
        let cell = |i: usize| -> Result<f64> {
            let raw = record.get(i).unwrap_or("");
            raw.parse::<f64>().map_err(|_| {
                Error::Integrity(format!(
                    "{}: row {}: '{}' in column '{}' is not a number",
                    path.display(),
                    row + 1,
                    raw,
                    headers.get(i).unwrap_or("?"),
                ))
            })
        };
        source.push([cell(src_idx[0])?, cell(src_idx[1])?, cell(src_idx[2])?]);
        target.push([cell(tgt_idx[0])?, cell(tgt_idx[1])?, cell(tgt_idx[2])?]);
    }

    LandmarkPairs::new(source, target)
        .map_err(|e| Error::Integrity(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    fn sym_columns() -> LandmarkColumns {
        LandmarkColumns::new(["x", "y", "z"], ["x_sym", "y_sym", "z_sym"])
    }

    #[test]
    fn test_load_selects_named_columns() {
        let f = write_csv(",x,y,z,x_sym,y_sym,z_sym\n0,1,2,3,4,5,6\n1,7,8,9,10,11,12\n");
        let lm = load_landmarks(f.path(), &sym_columns()).unwrap();
        assert_eq!(lm.len(), 2);
        assert_eq!(lm.source()[1], [7.0, 8.0, 9.0]);
        assert_eq!(lm.target()[0], [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_missing_column_is_integrity_error() {
        let f = write_csv("x,y,z,x_sym,y_sym\n1,2,3,4,5\n");
        let err = load_landmarks(f.path(), &sym_columns()).unwrap_err();
        assert!(matches!(err, Error::Integrity(msg) if msg.contains("z_sym")));
    }

    #[test]
    fn test_non_numeric_cell_is_integrity_error() {
        let f = write_csv("x,y,z,x_sym,y_sym,z_sym\n1,2,oops,4,5,6\n");
        let err = load_landmarks(f.path(), &sym_columns()).unwrap_err();
        assert!(matches!(err, Error::Integrity(msg) if msg.contains("oops")));
    }

    #[test]
    fn test_empty_table_rejected() {
        let f = write_csv("x,y,z,x_sym,y_sym,z_sym\n");
        assert!(matches!(load_landmarks(f.path(), &sym_columns()), Err(Error::Integrity(_))));
    }

    #[test]
    fn test_missing_file_is_integrity_error() {
        let err = load_landmarks(Path::new("/nonexistent/landmarks.csv"), &sym_columns()).unwrap_err();
        assert!(matches!(err, Error::Integrity(msg) if msg.contains("landmarks.csv")));
    }

    #[test]
    fn test_divided_by() {
        let lm = LandmarkPairs::new(vec![[8.0, 16.0, 24.0]], vec![[80.0, 0.0, 8.0]]).unwrap();
        let vox = lm.divided_by(8.0);
        assert_eq!(vox.source()[0], [1.0, 2.0, 3.0]);
        assert_eq!(vox.target()[0], [10.0, 0.0, 1.0]);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        assert!(LandmarkPairs::new(vec![[0.0; 3]], vec![]).is_err());
    }
}
