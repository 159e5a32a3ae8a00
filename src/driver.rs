//! # Registration Driver
//!
//! `build → register → done`. Building reads the manual declarations and
//! fixes the search roots; registering submits everything to the registry
//! in one fixed order:
//!
//! | Step | Content |
//! |------|---------|
//! | 0 | catalog spaces (skip existing) |
//! | 1 | discovered artifacts, roots in priority order, `.h5` before `.list` |
//! | 2 | landmark bridges |
//! | 3 | composite pipelines |
//! | 4 | unit conversions |
//! | 5 | landmark mirrors |
//! | 6 | aliases |
//!
//! The registry keeps the first edge per (source, target, type), so this
//! order decides every conflict. A failing artifact is recorded in the
//! [`RegistrationReport`] and the pass goes on.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::SpaceCatalog;
use crate::config::RegistrationConfig;
use crate::declarations::{Declarations, LoadedDeclarations};
use crate::discovery::{self, DiscoveredArtifact, ExternalDiscovery};
use crate::model::{ArtifactFamily, TransformEdge};
use crate::registry::TransformRegistry;
use crate::{Error, Result};

pub use crate::discovery::FailureStage;

// ============================================================================
// Report
// ============================================================================

/// Registration step, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Spaces,
    Discovered,
    Landmark,
    Composite,
    Unit,
    Mirror,
    Alias,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::Spaces,
        Step::Discovered,
        Step::Landmark,
        Step::Composite,
        Step::Unit,
        Step::Mirror,
        Step::Alias,
    ];
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Spaces => "spaces",
            Step::Discovered => "discovered",
            Step::Landmark => "landmark",
            Step::Composite => "composite",
            Step::Unit => "unit",
            Step::Mirror => "mirror",
            Step::Alias => "alias",
        };
        f.write_str(s)
    }
}

/// One artifact (or declared edge) that did not make it into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFailure {
    /// File path, or edge key for declared edges.
    pub artifact: String,
    pub family: Option<ArtifactFamily>,
    pub step: Step,
    pub stage: FailureStage,
    pub message: String,
}

/// Per-step tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCount {
    pub step: Step,
    pub registered: usize,
    pub skipped: usize,
}

/// Outcome of one registration pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub roots: Vec<PathBuf>,
    pub spaces_registered: usize,
    pub edges_registered: usize,
    /// Edges whose key was already present.
    pub edges_skipped: usize,
    pub steps: Vec<StepCount>,
    pub failures: Vec<ArtifactFailure>,
}

impl RegistrationReport {
    fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            roots,
            spaces_registered: 0,
            edges_registered: 0,
            edges_skipped: 0,
            steps: Step::ALL
                .into_iter()
                .map(|step| StepCount { step, registered: 0, skipped: 0 })
                .collect(),
            failures: Vec::new(),
        }
    }

    pub fn step(&self, step: Step) -> Option<&StepCount> {
        self.steps.iter().find(|s| s.step == step)
    }

    fn count(&mut self, step: Step, stored: bool) {
        if let Some(s) = self.steps.iter_mut().find(|s| s.step == step) {
            if stored {
                s.registered += 1;
            } else {
                s.skipped += 1;
            }
        }
        match (step, stored) {
            (Step::Spaces, true) => self.spaces_registered += 1,
            (Step::Spaces, false) => {}
            (_, true) => self.edges_registered += 1,
            (_, false) => self.edges_skipped += 1,
        }
    }

    fn fail(&mut self, failure: ArtifactFailure) {
        tracing::warn!(
            artifact = %failure.artifact,
            family = ?failure.family,
            step = %failure.step,
            stage = %failure.stage,
            error = %failure.message,
            "artifact skipped"
        );
        self.failures.push(failure);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ============================================================================
// Driver
// ============================================================================

/// One registration pass over a registry.
pub struct RegistrationDriver<'r, R: TransformRegistry> {
    registry: &'r R,
    catalog: SpaceCatalog,
    declarations: LoadedDeclarations,
    roots: Vec<PathBuf>,
}

impl<'r, R: TransformRegistry> RegistrationDriver<'r, R> {
    /// Load the declarations and fix the search roots.
    ///
    /// Fails on structural problems: an unreadable or malformed landmark
    /// table, a missing declared parameter file, or a composite
    /// intermediate that collides with a catalog space.
    pub fn build(
        registry: &'r R,
        config: &RegistrationConfig,
        catalog: SpaceCatalog,
        declarations: &Declarations,
        external: &ExternalDiscovery,
    ) -> Result<Self> {
        config.ensure_data_home()?;
        let declarations = declarations.load(&config.package_data)?;

        if let Some(clash) = declarations.intermediates.iter().find(|l| catalog.contains(l)) {
            return Err(Error::Integrity(format!(
                "composite intermediate '{clash}' is also a catalog space"
            )));
        }

        let external_roots: &[PathBuf] = if config.external_discovery { external.directories() } else { &[] };
        let roots = config.search_roots(external_roots);
        tracing::debug!(roots = ?roots, edges = declarations.total(), "registration driver built");

        Ok(Self { registry, catalog, declarations, roots })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn catalog(&self) -> &SpaceCatalog {
        &self.catalog
    }

    /// Run the full pass.
    pub async fn register(&self) -> Result<RegistrationReport> {
        let mut report = RegistrationReport::new(self.roots.clone());

        for space in self.catalog.iter() {
            match self.registry.register_templatebrain(space, true).await {
                Ok(stored) => report.count(Step::Spaces, stored),
                Err(e) => report.fail(ArtifactFailure {
                    artifact: space.label.clone(),
                    family: None,
                    step: Step::Spaces,
                    stage: FailureStage::Register,
                    message: e.to_string(),
                }),
            }
        }

        for artifact in discovery::scan_roots(&self.roots) {
            self.register_discovered(&artifact, &mut report).await;
        }

        let declared = [
            (Step::Landmark, &self.declarations.landmark),
            (Step::Composite, &self.declarations.composite),
            (Step::Unit, &self.declarations.unit),
            (Step::Mirror, &self.declarations.mirror),
            (Step::Alias, &self.declarations.alias),
        ];
        for (step, edges) in declared {
            for edge in edges {
                let name = edge.key().to_string();
                self.submit(edge.clone(), step, name, None, &mut report).await;
            }
        }

        report.finished_at = Some(Utc::now());
        tracing::info!(
            spaces = report.spaces_registered,
            edges = report.edges_registered,
            skipped = report.edges_skipped,
            failures = report.failures.len(),
            "registration pass complete"
        );
        Ok(report)
    }

    /// Hand the search roots to the registry and trigger one scan.
    pub async fn inject_paths(&self) -> Result<usize> {
        inject_paths(self.registry, &self.roots).await
    }

    async fn register_discovered(&self, artifact: &DiscoveredArtifact, report: &mut RegistrationReport) {
        let name = artifact.path.display().to_string();
        match discovery::resolve(artifact) {
            Ok(Some(edge)) => self.submit(edge, Step::Discovered, name, Some(artifact.family), report).await,
            Ok(None) => {}
            Err(staged) => report.fail(ArtifactFailure {
                artifact: name,
                family: Some(artifact.family),
                step: Step::Discovered,
                stage: staged.stage,
                message: staged.error.to_string(),
            }),
        }
    }

    async fn submit(
        &self,
        edge: TransformEdge,
        step: Step,
        artifact: String,
        family: Option<ArtifactFamily>,
        report: &mut RegistrationReport,
    ) {
        let key = edge.key();
        match self.registry.register_edge(edge).await {
            Ok(stored) => {
                tracing::debug!(edge = %key, %step, stored, "edge submitted");
                report.count(step, stored);
            }
            Err(e) => report.fail(ArtifactFailure {
                artifact,
                family,
                step,
                stage: FailureStage::Register,
                message: e.to_string(),
            }),
        }
    }
}

/// Register every root with a deferred scan, then scan once.
pub async fn inject_paths<R: TransformRegistry>(registry: &R, roots: &[PathBuf]) -> Result<usize> {
    for root in roots {
        registry.register_search_path(root, false).await?;
    }
    let added = registry.scan_paths().await?;
    tracing::info!(roots = roots.len(), added, "search paths injected");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::external::NAT_PROBES;
    use crate::model::{CoordinateSpace, EdgeType};
    use crate::registry::MemoryRegistry;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn offline() -> ExternalDiscovery {
        ExternalDiscovery::new("/nonexistent/Rscript", NAT_PROBES)
    }

    fn config(home: &std::path::Path) -> RegistrationConfig {
        RegistrationConfig::default()
            .with_data_home(home)
            .with_default_dir(home)
            .with_external_discovery(false)
    }

    fn small_catalog() -> SpaceCatalog {
        SpaceCatalog::from_json(r#"[{"label": "JRC2018F"}, {"label": "JRC2018U"}]"#).unwrap()
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("JRC2018F_JRC2018U.h5"), b"").unwrap();
        fs::write(dir.path().join("garbage.h5"), b"").unwrap();
        fs::create_dir(dir.path().join("JFRC2_FCWB.list")).unwrap();
        fs::create_dir(dir.path().join("orig.list")).unwrap();

        let registry = MemoryRegistry::new();
        let cfg = config(dir.path());
        let driver = RegistrationDriver::build(&registry, &cfg, small_catalog(), &Declarations::empty(), &offline()).unwrap();
        let report = driver.register().await.unwrap();

        assert_eq!(report.spaces_registered, 2);
        assert_eq!(report.edges_registered, 1);
        assert_eq!(report.failures.len(), 2);
        let stages: Vec<_> = report.failures.iter().map(|f| f.stage).collect();
        assert_eq!(stages, vec![FailureStage::Classify, FailureStage::Load]);
        assert!(report.failures.iter().all(|f| f.step == Step::Discovered));
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_declared_edge_after_discovered_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("JFRC2_JFRC2010.h5"), b"").unwrap();

        let mut declarations = Declarations::empty();
        declarations.unit_edges.push(crate::edges::UnitEdgeSpec::recalibration("JFRC2", "JFRC2010", [1.0, 1.0, 2.0]));

        let registry = MemoryRegistry::new();
        let cfg = config(dir.path());
        let driver = RegistrationDriver::build(&registry, &cfg, SpaceCatalog::new(), &declarations, &offline()).unwrap();
        let report = driver.register().await.unwrap();

        assert_eq!(report.step(Step::Discovered).unwrap().registered, 1);
        assert_eq!(report.step(Step::Unit).unwrap().skipped, 1);
        let edges = registry.edges().await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].payload.kind(), "h5");
    }

    #[tokio::test]
    async fn test_intermediate_clash_is_structural() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("p.txt"), b"").unwrap();
        let mut declarations = Declarations::empty();
        declarations.composites.push(crate::declarations::CompositeDeclaration {
            name: "clash".into(),
            stages: vec![
                crate::declarations::StageDeclaration {
                    source: "A".into(),
                    target: "JRC2018F".into(),
                    payload: crate::declarations::StagePayload::Elastix { parameter_file: "p.txt".into(), companions: vec![] },
                },
                crate::declarations::StageDeclaration {
                    source: "JRC2018F".into(),
                    target: "B".into(),
                    payload: crate::declarations::StagePayload::Elastix { parameter_file: "p.txt".into(), companions: vec![] },
                },
            ],
        });
        let registry = MemoryRegistry::new();
        let cfg = config(dir.path()).with_package_data(dir.path());
        let result = RegistrationDriver::build(&registry, &cfg, small_catalog(), &declarations, &offline());
        assert!(matches!(result, Err(Error::Integrity(msg)) if msg.contains("JRC2018F")));
    }

    #[tokio::test]
    async fn test_mirror_artifact_never_creates_mirror_node() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("JRC2018U_mirror.h5"), b"").unwrap();

        let registry = MemoryRegistry::new();
        let cfg = config(dir.path());
        let driver = RegistrationDriver::build(&registry, &cfg, small_catalog(), &Declarations::empty(), &offline()).unwrap();
        driver.register().await.unwrap();

        let edges = registry.edges().await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].edge_type, EdgeType::Mirror);
        assert_eq!(edges[0].target, None);
        assert!(registry.space("mirror").await.unwrap().is_none());
        assert!(registry.neighbors("mirror", crate::model::Direction::Both).await.unwrap().is_empty());
        let labels: Vec<CoordinateSpace> = registry.spaces().await.unwrap();
        assert!(labels.iter().all(|s| s.label != "mirror"));
    }

    #[tokio::test]
    async fn test_inject_paths_defers_scan() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("JRC2018F_JRC2018U.h5"), b"").unwrap();

        let registry = MemoryRegistry::new();
        let cfg = config(dir.path()).with_extra_root("/nonexistent/root");
        let driver = RegistrationDriver::build(&registry, &cfg, small_catalog(), &Declarations::empty(), &offline()).unwrap();
        assert_eq!(driver.inject_paths().await.unwrap(), 1);
        assert_eq!(registry.search_paths().await.unwrap().len(), 2);
    }
}
