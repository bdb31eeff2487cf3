//! Descriptor grouping and install root selection.
//!
//! Only the shallowest descriptors mark install roots; deeper ones belong to
//! bundled libraries. Descriptors sharing a directory are variants of one
//! package for different client versions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::descriptor::DescriptorRecord;
use super::types::AddonError;

/// A directory to install under a canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    /// Directory name under the install root.
    pub name: String,
    /// Directory to copy from.
    pub source_dir: PathBuf,
}

/// Descriptors sharing one containing directory. Never empty.
#[derive(Debug, Clone)]
pub struct DescriptorGroup {
    dir: PathBuf,
    records: Vec<DescriptorRecord>,
}

impl DescriptorGroup {
    /// Shared containing directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Member records.
    #[must_use]
    pub fn records(&self) -> &[DescriptorRecord] {
        &self.records
    }

    /// Resolves the package name for this group.
    ///
    /// A lone descriptor names the package after its file. Several
    /// descriptors must agree once client-version suffixes are stripped.
    pub fn canonical_name(&self) -> Result<String, AddonError> {
        let (first, rest) = self
            .records
            .split_first()
            .ok_or_else(|| AddonError::NoDescriptorsFound(self.dir.clone()))?;

        if rest.is_empty() {
            return Ok(first.name().to_string());
        }

        let expected = first.name_without_client_suffix();
        if let Some(other) = rest
            .iter()
            .find(|r| r.name_without_client_suffix() != expected)
        {
            return Err(AddonError::AmbiguousGroupName {
                dir: self.dir.clone(),
                expected: expected.to_string(),
                found: other.name_without_client_suffix().to_string(),
            });
        }

        Ok(expected.to_string())
    }

    /// Builds the install target for this group.
    pub fn install_target(&self) -> Result<InstallTarget, AddonError> {
        Ok(InstallTarget {
            name: self.canonical_name()?,
            source_dir: self.dir.clone(),
        })
    }
}

/// Keeps only the records at the minimum nesting depth.
#[must_use]
pub fn filter_shallowest(records: Vec<DescriptorRecord>) -> Vec<DescriptorRecord> {
    let Some(min_depth) = records.iter().map(DescriptorRecord::depth).min() else {
        return records;
    };
    debug!("[ADDON-GROUP] Minimum descriptor depth {}", min_depth);

    records
        .into_iter()
        .filter(|r| r.depth() == min_depth)
        .collect()
}

/// Partitions records by containing directory, ordered by directory.
#[must_use]
pub fn group_by_dir(records: Vec<DescriptorRecord>) -> Vec<DescriptorGroup> {
    let mut buckets: BTreeMap<PathBuf, Vec<DescriptorRecord>> = BTreeMap::new();
    for record in records {
        buckets.entry(record.dir().to_path_buf()).or_default().push(record);
    }

    buckets
        .into_iter()
        .map(|(dir, records)| DescriptorGroup { dir, records })
        .collect()
}

/// Selects the install targets for one package.
///
/// Groups with conflicting names are logged and skipped.
#[must_use]
pub fn select_install_targets(records: Vec<DescriptorRecord>) -> Vec<InstallTarget> {
    let groups = group_by_dir(filter_shallowest(records));

    let targets: Vec<InstallTarget> = groups
        .iter()
        .filter_map(|group| match group.install_target() {
            Ok(target) => {
                debug!(
                    "[ADDON-GROUP] {} -> {}",
                    target.source_dir.display(),
                    target.name
                );
                Some(target)
            }
            Err(e) => {
                warn!("[ADDON-GROUP] Skipping group: {}", e);
                None
            }
        })
        .collect();

    if targets.is_empty() {
        warn!(
            "[ADDON-GROUP] None of {} descriptor group(s) could be named",
            groups.len()
        );
    } else {
        info!("[ADDON-GROUP] Selected {} install target(s)", targets.len());
    }
    targets
}
