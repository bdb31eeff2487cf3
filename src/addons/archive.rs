//! Archive extraction.
//!
//! Unpacks downloaded `.zip` and `.tar.gz` archives, preserving the
//! relative directory structure of every entry.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use tracing::debug;

use super::types::{AddonError, strip_query};

/// Supported archive container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// PKZIP archive.
    Zip,
    /// Gzip-compressed tarball.
    TarGz,
}

impl ArchiveFormat {
    /// Classifies a URL or file name by its extension.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = strip_query(url).to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }

    /// File extension used for the downloaded archive.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }
}

/// Extracts `archive` into `dest`, returning the number of entries written.
///
/// Directory entries only create directories. Entries that would land
/// outside `dest` are rejected.
pub fn extract(archive: &Path, dest: &Path, format: ArchiveFormat) -> Result<usize, AddonError> {
    fs::create_dir_all(dest)?;

    let count = match format {
        ArchiveFormat::Zip => extract_zip(archive, dest)?,
        ArchiveFormat::TarGz => extract_tar_gz(archive, dest)?,
    };

    debug!(
        "[ADDON-ARCHIVE] Extracted {} entries from {} to {}",
        count,
        archive.display(),
        dest.display()
    );
    Ok(count)
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<usize, AddonError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| AddonError::Archive(format!("Failed to open {}: {}", archive.display(), e)))?;

    let mut count = 0;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| AddonError::Archive(format!("Failed to read archive entry: {}", e)))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(AddonError::Archive(format!(
                "Entry '{}' escapes the extraction directory",
                entry.name()
            )));
        };
        let outpath = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut entry, &mut outfile)?;
        }
        count += 1;
    }

    Ok(count)
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<usize, AddonError> {
    let file = File::open(archive)?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));

    let entries = tarball
        .entries()
        .map_err(|e| AddonError::Archive(format!("Failed to open {}: {}", archive.display(), e)))?;

    let mut count = 0;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| AddonError::Archive(format!("Failed to read archive entry: {}", e)))?;

        let path = entry
            .path()
            .map_err(|e| AddonError::Archive(format!("Invalid entry path: {}", e)))?
            .into_owned();
        if !is_enclosed(&path) {
            return Err(AddonError::Archive(format!(
                "Entry '{}' escapes the extraction directory",
                path.display()
            )));
        }

        entry.unpack_in(dest)?;
        count += 1;
    }

    Ok(count)
}

/// Returns true if `path` stays inside whatever directory it is joined to.
fn is_enclosed(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
