//! Add-on installer.
//!
//! Copies selected package roots into the install root and stamps each one
//! with the marker file. Also removes previously stamped directories before
//! a run.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::grouping::InstallTarget;
use super::types::{AddonError, DEFAULT_SKIP_CLEAN_PREFIXES, MARKER_FILE_NAME};

/// Rules for cleaning the install root.
#[derive(Debug, Clone)]
pub struct CleanPolicy {
    skip_prefixes: Vec<String>,
    legacy_clean: bool,
}

impl Default for CleanPolicy {
    fn default() -> Self {
        Self::new(&[], false)
    }
}

impl CleanPolicy {
    /// Creates a policy from configured prefixes, on top of the defaults.
    #[must_use]
    pub fn new(extra_prefixes: &[String], legacy_clean: bool) -> Self {
        let skip_prefixes = DEFAULT_SKIP_CLEAN_PREFIXES
            .iter()
            .map(|p| (*p).to_string())
            .chain(extra_prefixes.iter().filter(|p| !p.is_empty()).cloned())
            .collect();

        Self {
            skip_prefixes,
            legacy_clean,
        }
    }

    /// Returns true if a directory with this name must never be removed.
    #[must_use]
    pub fn should_skip(&self, name: &str) -> bool {
        name.starts_with('.') || self.skip_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Whether unmarked directories are removed too.
    #[must_use]
    pub fn legacy_clean(&self) -> bool {
        self.legacy_clean
    }
}

/// Returns true if `dir` carries the marker file.
#[must_use]
pub fn is_managed(dir: &Path) -> bool {
    dir.join(MARKER_FILE_NAME).is_file()
}

/// Installs packages into a single install root.
#[derive(Debug, Clone)]
pub struct Installer {
    install_root: PathBuf,
}

impl Installer {
    /// Creates an installer for `install_root`.
    #[must_use]
    pub fn new(install_root: PathBuf) -> Self {
        assert!(
            !install_root.as_os_str().is_empty(),
            "Install root must not be empty"
        );
        Self { install_root }
    }

    /// Returns the install root.
    #[must_use]
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Destination directory for a package name.
    pub fn destination(&self, name: &str) -> Result<PathBuf, AddonError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name == MARKER_FILE_NAME;
        if invalid {
            return Err(AddonError::InvalidPackageName(name.to_string()));
        }
        Ok(self.install_root.join(name))
    }

    /// Replaces the destination for `target` with a fresh copy.
    ///
    /// The marker is written before the copy so that an interrupted install
    /// is still picked up by the next cleanup.
    pub fn install(&self, target: &InstallTarget) -> Result<PathBuf, AddonError> {
        let dest = self.destination(&target.name)?;

        if dest.exists() {
            debug!("[ADDON-INSTALL] Removing existing {}", dest.display());
            fs::remove_dir_all(&dest)?;
        }

        fs::create_dir_all(&dest)?;
        File::create(dest.join(MARKER_FILE_NAME))?;

        debug!(
            "[ADDON-INSTALL] Copying {} to {}",
            target.source_dir.display(),
            dest.display()
        );
        copy_dir_recursive(&target.source_dir, &dest)?;

        info!("[ADDON-INSTALL] Installed {}", target.name);
        Ok(dest)
    }

    /// Removes managed directories from the install root.
    ///
    /// Hidden and skip-listed directories are always kept. Unmarked
    /// directories are only removed when legacy cleanup is enabled.
    pub fn clean_managed(&self, policy: &CleanPolicy) -> Result<Vec<PathBuf>, AddonError> {
        let pre_clean = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| AddonError::PreClean { path, source }
        };

        let entries = fs::read_dir(&self.install_root).map_err(pre_clean(&self.install_root))?;

        let mut removed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(pre_clean(&self.install_root))?;
            let path = entry.path();

            let file_type = entry.file_type().map_err(pre_clean(&path))?;
            if !file_type.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if policy.should_skip(&name) {
                debug!("[ADDON-CLEAN] Keeping skip-listed {}", name);
                continue;
            }
            if !policy.legacy_clean() && !is_managed(&path) {
                debug!("[ADDON-CLEAN] Keeping unmanaged {}", name);
                continue;
            }

            info!("[ADDON-CLEAN] Removing {}", path.display());
            fs::remove_dir_all(&path).map_err(pre_clean(&path))?;
            removed.push(path);
        }

        removed.sort();
        Ok(removed)
    }
}

/// Recursively copies a directory.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}
