//! Registration configuration.
//!
//! Resolution order for the data home:
//! 1. `FLYBRAINS_DATA` environment variable
//! 2. `~/flybrain-data`
//!
//! A leading `~` is expanded with the user's home directory. The data home
//! is created on first use. `FLYBRAINS_PACKAGE_DATA` points at the folder
//! holding the landmark tables and Elastix parameter files of the manual
//! declarations; it defaults to the crate's `data/` directory.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

pub const DATA_HOME_ENV: &str = "FLYBRAINS_DATA";
pub const PACKAGE_DATA_ENV: &str = "FLYBRAINS_PACKAGE_DATA";
pub const DEFAULT_DIR_NAME: &str = "flybrain-data";

/// Everything a registration pass needs to know about the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Explicit data directory, scanned first.
    pub data_home: PathBuf,
    /// Fixed user directory, scanned second when it differs from `data_home`.
    pub default_dir: PathBuf,
    /// Landmark tables and parameter files of the manual declarations.
    pub package_data: PathBuf,
    /// Additional roots, scanned after the default directory.
    pub extra_roots: Vec<PathBuf>,
    /// Ask the R tool chain for more roots.
    pub external_discovery: bool,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        let default_dir = default_dir();
        Self {
            data_home: default_dir.clone(),
            default_dir,
            package_data: bundled_package_data(),
            extra_roots: Vec::new(),
            external_discovery: true,
        }
    }
}

impl RegistrationConfig {
    /// Resolve from the environment and make sure the data home exists.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(home) = std::env::var(DATA_HOME_ENV) {
            if !home.trim().is_empty() {
                config.data_home = expand_home(Path::new(home.trim()));
            }
        }
        if let Ok(data) = std::env::var(PACKAGE_DATA_ENV) {
            if !data.trim().is_empty() {
                config.package_data = expand_home(Path::new(data.trim()));
            }
        }
        config.ensure_data_home()?;
        Ok(config)
    }

    pub fn with_data_home(mut self, path: impl AsRef<Path>) -> Self {
        self.data_home = expand_home(path.as_ref());
        self
    }

    pub fn with_default_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.default_dir = expand_home(path.as_ref());
        self
    }

    pub fn with_package_data(mut self, path: impl AsRef<Path>) -> Self {
        self.package_data = expand_home(path.as_ref());
        self
    }

    pub fn with_extra_root(mut self, path: impl AsRef<Path>) -> Self {
        self.extra_roots.push(expand_home(path.as_ref()));
        self
    }

    pub fn with_external_discovery(mut self, enabled: bool) -> Self {
        self.external_discovery = enabled;
        self
    }

    /// Create the data home if it is absent.
    pub fn ensure_data_home(&self) -> Result<()> {
        if !self.data_home.is_dir() {
            std::fs::create_dir_all(&self.data_home)?;
            tracing::info!(path = %self.data_home.display(), "created data home");
        }
        Ok(())
    }

    /// Search roots in priority order, later duplicates removed:
    /// data home, default directory, extra roots, then `external`.
    pub fn search_roots(&self, external: &[PathBuf]) -> Vec<PathBuf> {
        let candidates = [&self.data_home, &self.default_dir]
            .into_iter()
            .chain(&self.extra_roots)
            .chain(external);
        let mut roots: Vec<PathBuf> = Vec::new();
        for root in candidates {
            let root = expand_home(root);
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        roots
    }
}

fn default_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(DEFAULT_DIR_NAME),
        None => PathBuf::from(DEFAULT_DIR_NAME),
    }
}

fn bundled_package_data() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Replace a leading `~` component with the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home(Path::new("~/flybrain-data")), home.join("flybrain-data"));
        assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));
        assert_eq!(expand_home(Path::new("rel/~")), PathBuf::from("rel/~"));
    }

    #[test]
    fn test_roots_order_and_dedup() {
        let config = RegistrationConfig::default()
            .with_data_home("/data/a")
            .with_default_dir("/data/b")
            .with_extra_root("/data/c")
            .with_extra_root("/data/a");
        let external = vec![PathBuf::from("/r/regfolders"), PathBuf::from("/data/b")];
        assert_eq!(
            config.search_roots(&external),
            vec![
                PathBuf::from("/data/a"),
                PathBuf::from("/data/b"),
                PathBuf::from("/data/c"),
                PathBuf::from("/r/regfolders"),
            ]
        );
    }

    #[test]
    fn test_default_dir_not_repeated() {
        let config = RegistrationConfig::default();
        assert_eq!(config.search_roots(&[]), vec![config.default_dir.clone()]);
    }

    #[test]
    fn test_ensure_data_home_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("nested/flybrain-data");
        let config = RegistrationConfig::default().with_data_home(&home);
        config.ensure_data_home().unwrap();
        assert!(home.is_dir());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RegistrationConfig =
            serde_json::from_str(r#"{"data_home": "/x", "external_discovery": false}"#).unwrap();
        assert_eq!(config.data_home, PathBuf::from("/x"));
        assert!(!config.external_discovery);
        assert!(config.extra_roots.is_empty());
    }
}
