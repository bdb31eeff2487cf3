//! Run lifecycle.
//!
//! Cleans the install root once, then fetches, indexes, groups and installs
//! every configured package in order. A failing package is logged and the
//! run moves on; only a failed cleanup aborts the run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::descriptor::index_descriptors;
use super::fetcher::{FetchOutcome, Fetcher, NetworkTransport, Transport};
use super::grouping::select_install_targets;
use super::installer::{CleanPolicy, Installer};
use super::types::{AddonError, PackageSource};
use crate::config::Config;

/// Removes temporary fetch paths when dropped.
#[derive(Debug)]
pub struct CleanupGuard {
    paths: Vec<PathBuf>,
}

impl CleanupGuard {
    /// Takes ownership of `paths`.
    #[must_use]
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            match remove_path(path) {
                Ok(()) => debug!("[ADDON-RUN] Removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("[ADDON-RUN] Failed to clean up {}: {}", path.display(), e),
            }
        }
    }
}

fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// A package that could not be installed.
#[derive(Debug)]
pub struct PackageFailure {
    /// Source label.
    pub source: String,
    /// What went wrong.
    pub error: AddonError,
}

/// Summary of one run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Directories removed by the initial cleanup.
    pub cleaned: Vec<PathBuf>,
    /// Directories installed, in order.
    pub installed: Vec<PathBuf>,
    /// Packages that failed.
    pub failures: Vec<PackageFailure>,
}

impl RunReport {
    /// Returns true if every package succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives a full run.
pub struct Orchestrator<T: Transport> {
    sources: Vec<PackageSource>,
    fetcher: Fetcher<T>,
    installer: Installer,
    clean_policy: CleanPolicy,
}

impl Orchestrator<NetworkTransport> {
    /// Creates an orchestrator that uses the network.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::with_transport(config, NetworkTransport::new())
    }
}

impl<T: Transport> Orchestrator<T> {
    /// Creates an orchestrator over a validated configuration.
    #[must_use]
    pub fn with_transport(config: &Config, transport: T) -> Self {
        Self {
            sources: config.addons.clone(),
            fetcher: Fetcher::new(config.download_path.clone(), transport),
            installer: Installer::new(config.addons_path.clone()),
            clean_policy: config.clean_policy(),
        }
    }

    /// Runs cleanup and then every package.
    pub fn run(&self) -> Result<RunReport, AddonError> {
        let cleaned = self.installer.clean_managed(&self.clean_policy)?;
        info!(
            "[ADDON-RUN] Removed {} previously installed director(ies)",
            cleaned.len()
        );

        let mut report = RunReport {
            cleaned,
            ..RunReport::default()
        };

        for source in &self.sources {
            info!("[ADDON-RUN] Processing {}", source.label());
            match self.process(source) {
                Ok(installed) => report.installed.extend(installed),
                Err(error) => {
                    warn!("[ADDON-RUN] Skipping {}: {}", source.label(), error);
                    report.failures.push(PackageFailure {
                        source: source.label(),
                        error,
                    });
                }
            }
        }

        info!(
            "[ADDON-RUN] Done: {} installed, {} failed",
            report.installed.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Fetches and installs one package.
    ///
    /// Temporary paths are removed on every exit path.
    pub fn process(&self, source: &PackageSource) -> Result<Vec<PathBuf>, AddonError> {
        let hydrated = source.hydrate();
        let FetchOutcome { cleanup, result } = self.fetcher.fetch(&hydrated);
        let _guard = CleanupGuard::new(cleanup);

        let work_dir = result?;
        let records = index_descriptors(&work_dir)?;
        let targets = select_install_targets(records);

        let mut installed = Vec::with_capacity(targets.len());
        for target in &targets {
            installed.push(self.installer.install(target)?);
        }
        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_guard_removes_files_and_dirs() {
        let tmp = TempDir::new().expect("temp dir");
        let file = tmp.path().join("a.zip");
        let dir = tmp.path().join("a");
        fs::write(&file, b"zip").expect("write");
        fs::create_dir_all(dir.join("nested")).expect("mkdir");

        drop(CleanupGuard::new(vec![
            file.clone(),
            dir.clone(),
            tmp.path().join("never-created"),
        ]));

        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_cleanup_guard_runs_on_early_return() {
        let tmp = TempDir::new().expect("temp dir");
        let dir = tmp.path().join("work");
        fs::create_dir_all(&dir).expect("mkdir");

        let failing = |paths: Vec<PathBuf>| -> Result<(), AddonError> {
            let _guard = CleanupGuard::new(paths);
            Err(AddonError::NothingToFetch("x".to_string()))
        };

        assert!(failing(vec![dir.clone()]).is_err());
        assert!(!dir.exists());
    }

    #[test]
    fn test_report_is_clean() {
        let mut report = RunReport::default();
        assert!(report.is_clean());
        report.failures.push(PackageFailure {
            source: "x".to_string(),
            error: AddonError::NothingToFetch("x".to_string()),
        });
        assert!(!report.is_clean());
    }
}
