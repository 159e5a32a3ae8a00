//! Classification of real-world artifact names, and scan-order independence.

use std::fs;
use std::path::Path;

use flybrains::classify::{classify_artifact, handler, load_artifact};
use flybrains::discovery::{resolve, scan_root, DiscoveredArtifact};
use flybrains::{ArtifactFamily, EdgeKey, EdgeType, TokenOrder};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// (file name, family, source, target)
const FIXTURES: &[(&str, ArtifactFamily, &str, Option<&str>)] = &[
    // Saalfeld lab / nat.jrcbrains h5 fields
    ("JRC2018F_FAFB.h5", ArtifactFamily::H5, "JRC2018F", Some("FAFBum")),
    ("JRC2018F_JRC2018U.h5", ArtifactFamily::H5, "JRC2018F", Some("JRC2018U")),
    ("JRC2018U_JRCFIB2018F.h5", ArtifactFamily::H5, "JRC2018U", Some("JRCFIB2018Fum")),
    ("JRCVNC2018U_JRCVNC2018F.h5", ArtifactFamily::H5, "JRCVNC2018U", Some("JRCVNC2018F")),
    ("FANC_JRCVNC2018F.h5", ArtifactFamily::H5, "FANCum", Some("JRCVNC2018F")),
    // Jefferis lab CMTK registrations
    ("JFRC2_FCWB.list", ArtifactFamily::Cmtk, "JFRC2", Some("FCWB")),
    ("FCWB_IS2.list", ArtifactFamily::Cmtk, "FCWB", Some("IS2")),
    ("IBNWB_IBN.list", ArtifactFamily::Cmtk, "IBNWB", Some("IBN")),
    ("JFRC2_mirror.list", ArtifactFamily::Cmtk, "JFRC2", None),
    ("FCWB_imgflip.list", ArtifactFamily::Cmtk, "FCWB", None),
    ("MANC_mirror.h5", ArtifactFamily::H5, "MANCum", None),
];

#[test]
fn test_fixture_names() {
    for &(name, family, source, target) in FIXTURES {
        let c = classify_artifact(Path::new(name), family).unwrap().unwrap();
        assert_eq!(c.source, source, "{name}");
        assert_eq!(c.target.as_deref(), target, "{name}");
        let expected = if target.is_some() { EdgeType::Bridging } else { EdgeType::Mirror };
        assert_eq!(c.edge_type, expected, "{name}");
    }
}

#[test]
fn test_both_families_declare_source_first() {
    for family in ArtifactFamily::ALL {
        assert_eq!(handler(family).token_order, TokenOrder::SourceFirst, "{family}");
    }
}

#[test]
fn test_excluded_names_ignore_extension_family() {
    for name in ["orig.list", "original.list"] {
        assert_eq!(classify_artifact(Path::new(name), ArtifactFamily::Cmtk).unwrap(), None);
    }
}

#[test]
fn test_loader_matches_family() {
    let dir = tempfile::tempdir().unwrap();
    let h5 = dir.path().join("JRC2018F_JRC2018U.h5");
    fs::create_dir(&h5).unwrap();
    // A folder with an .h5 name is not a field file.
    assert!(load_artifact(&h5, ArtifactFamily::H5).is_err());
    assert!(resolve(&DiscoveredArtifact {
        root: dir.path().to_path_buf(),
        path: h5,
        family: ArtifactFamily::H5,
    })
    .is_err());
}

fn materialize(root: &Path, order: &[usize]) {
    for &i in order {
        let (name, family, ..) = FIXTURES[i];
        let path = root.join(format!("d{i:02}")).join(name);
        match family {
            ArtifactFamily::H5 => {
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, b"").unwrap();
            }
            ArtifactFamily::Cmtk => {
                fs::create_dir_all(&path).unwrap();
                fs::write(path.join("registration"), b"").unwrap();
            }
        }
    }
}

fn scanned_keys(root: &Path) -> Vec<EdgeKey> {
    scan_root(root)
        .iter()
        .map(|a| resolve(a).unwrap().unwrap().key())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// The scanned sequence does not depend on the order files were created in.
    #[test]
    fn prop_scan_independent_of_creation_order(
        order in Just((0..FIXTURES.len()).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let canonical = tempfile::tempdir().unwrap();
        materialize(canonical.path(), &(0..FIXTURES.len()).collect::<Vec<_>>());
        let shuffled = tempfile::tempdir().unwrap();
        materialize(shuffled.path(), &order);

        let expected = scanned_keys(canonical.path());
        prop_assert_eq!(expected.len(), FIXTURES.len());
        prop_assert_eq!(scanned_keys(shuffled.path()), expected);
    }
}

#[test]
fn test_scan_lists_h5_before_cmtk() {
    let dir = tempfile::tempdir().unwrap();
    materialize(dir.path(), &(0..FIXTURES.len()).collect::<Vec<_>>());
    let families: Vec<_> = scan_root(dir.path()).into_iter().map(|a| a.family).collect();
    let first_cmtk = families.iter().position(|f| *f == ArtifactFamily::Cmtk).unwrap();
    assert!(families[..first_cmtk].iter().all(|f| *f == ArtifactFamily::H5));
    assert!(families[first_cmtk..].iter().all(|f| *f == ArtifactFamily::Cmtk));
}
