//! Extra search roots reported by the R packages of the nat ecosystem.
//!
//! Each probe runs `Rscript -e <expr>` and reads quoted paths from its
//! stdout. A missing interpreter yields no roots and is logged once at
//! info level. Results are computed once per [`ExternalDiscovery`].

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;

/// nat.templatebrains download folder, nat.flybrains bundled
/// registrations and the nat.jrcbrains h5 folder.
pub const NAT_PROBES: [&str; 3] = [
    "library(rappdirs);file.path(user_data_dir('rpkg-nat.templatebrains', appauthor=NULL), 'regfolders')",
    "regdirs=c('bridgingregistrations', 'mirroringregistrations');system.file('extdata', regdirs, package = 'nat.flybrains')",
    "library(rappdirs);rappdirs::user_data_dir('R/nat.jrcbrains')",
];

#[derive(Debug)]
pub struct ExternalDiscovery {
    program: PathBuf,
    probes: Vec<String>,
    found: OnceLock<Vec<PathBuf>>,
}

impl ExternalDiscovery {
    pub fn new(program: impl Into<PathBuf>, probes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            probes: probes.into_iter().map(Into::into).collect(),
            found: OnceLock::new(),
        }
    }

    /// The three nat probes against `Rscript` on `PATH`.
    pub fn nat() -> Self {
        Self::new("Rscript", NAT_PROBES)
    }

    /// Discovered directories; probes run on first call only.
    pub fn directories(&self) -> &[PathBuf] {
        self.found.get_or_init(|| self.run())
    }

    fn run(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for probe in &self.probes {
            let output = match Command::new(&self.program).arg("-e").arg(probe).output() {
                Ok(output) => output,
                Err(error) if error.kind() == ErrorKind::NotFound => {
                    tracing::info!(program = %self.program.display(), "R interpreter not found, no external search roots");
                    return Vec::new();
                }
                Err(error) => {
                    tracing::debug!(program = %self.program.display(), %error, "probe failed to start");
                    continue;
                }
            };
            if !output.status.success() {
                tracing::debug!(status = %output.status, probe = %probe, "probe exited unsuccessfully");
            }
            for dir in parse_quoted_paths(&String::from_utf8_lossy(&output.stdout)) {
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }
        tracing::debug!(count = dirs.len(), "external search roots");
        dirs
    }
}

fn quoted() -> Option<&'static Regex> {
    static QUOTED: OnceLock<Option<Regex>> = OnceLock::new();
    QUOTED.get_or_init(|| Regex::new(r#""([^"]*)""#).ok()).as_ref()
}

/// Every non-blank quoted string in R's printed output, in order.
///
/// Blank strings (a package that is not installed) are dropped so they
/// never become the current directory.
pub fn parse_quoted_paths(stdout: &str) -> Vec<PathBuf> {
    let Some(re) = quoted() else {
        return Vec::new();
    };
    stdout
        .lines()
        .flat_map(|line| re.captures_iter(line))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
