//! Configuration module.
//!
//! Loads the TOML run configuration: the ordered package list, the install
//! and download roots, cleanup rules and logging settings.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::addons::{AddonError, CleanPolicy, PackageSource};
use crate::logging::LogConfig;

/// Default download directory, relative to the install root.
pub const DEFAULT_DOWNLOAD_PATH: &str = ".downloads";

/// Default install root, relative to the working directory.
pub const DEFAULT_ADDONS_PATH: &str = ".";

/// Required basename of the install root.
pub const INSTALL_ROOT_DIR_NAME: &str = "AddOns";

/// Maximum configuration file size (512KB).
const MAX_FILE_SIZE: u64 = 512 * 1024;

/// Example configuration shown by `--help`.
pub const EXAMPLE_CONFIG: &str = r#"# wowaddons configuration
# addons_path = "/games/wow/Interface/AddOns"
# download_path = ".downloads"      # relative to addons_path
# skip_clean_prefixes = ["MyAddon_"]
# legacy_clean = false              # also remove directories without a marker

[log]
level = "info"
file = false
retention_hours = 24

[[addons]]
git = "https://github.com/example/Bagnon.git"

[[addons]]
zip = "https://example.com/files/Questie.zip"
name = "Questie"
"#;

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for temporary downloads.
    #[serde(alias = "DownloadPath")]
    pub download_path: PathBuf,
    /// Install root (the game's `AddOns` directory).
    #[serde(alias = "AddonsPath")]
    pub addons_path: PathBuf,
    /// Extra directory prefixes cleanup never touches.
    #[serde(alias = "SkipCleanPrefixes")]
    pub skip_clean_prefixes: Vec<String>,
    /// Remove unmarked directories during cleanup.
    #[serde(alias = "PrecleanBliz")]
    pub legacy_clean: bool,
    /// Logging settings.
    pub log: LogConfig,
    /// Packages, processed in order.
    #[serde(alias = "Addons")]
    pub addons: Vec<PackageSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_path: PathBuf::from(DEFAULT_DOWNLOAD_PATH),
            addons_path: PathBuf::from(DEFAULT_ADDONS_PATH),
            skip_clean_prefixes: Vec::new(),
            legacy_clean: false,
            log: LogConfig::default(),
            addons: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, AddonError> {
        let metadata = fs::metadata(path).map_err(|e| {
            AddonError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(AddonError::Config(format!(
                "{} is too large (max {} bytes)",
                path.display(),
                MAX_FILE_SIZE
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            AddonError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, AddonError> {
        toml::from_str(content).map_err(|e| AddonError::Config(format!("Parse error: {}", e)))
    }

    /// Makes both roots absolute.
    ///
    /// The install root resolves against `base`; a relative download path
    /// resolves against the install root.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.addons_path = absolutize(base, &self.addons_path);
        self.download_path = absolutize(&self.addons_path, &self.download_path);
    }

    /// Checks everything the pipeline relies on.
    pub fn validate(&self) -> Result<(), AddonError> {
        if self.download_path.as_os_str().is_empty() {
            return Err(AddonError::Config("download_path must not be empty".to_string()));
        }

        if !self.addons_path.is_dir() {
            return Err(AddonError::Config(format!(
                "Addons path {} is not a directory",
                self.addons_path.display()
            )));
        }

        let basename = self
            .addons_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if basename != INSTALL_ROOT_DIR_NAME {
            return Err(AddonError::Config(format!(
                "Addons path {} does not look like an addons path, expecting '{}'",
                self.addons_path.display(),
                INSTALL_ROOT_DIR_NAME
            )));
        }

        if let Some((index, source)) = self
            .addons
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_resolvable())
        {
            return Err(AddonError::UnresolvedSource {
                index,
                label: source.label(),
            });
        }

        Ok(())
    }

    /// Cleanup rules derived from this configuration.
    #[must_use]
    pub fn clean_policy(&self) -> CleanPolicy {
        CleanPolicy::new(&self.skip_clean_prefixes, self.legacy_clean)
    }
}

/// Joins `path` onto `base` when relative and drops `.` components.
fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
