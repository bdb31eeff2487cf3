//! Add-on type definitions.
//!
//! Core data structures shared by the fetch and install pipeline.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::archive::ArchiveFormat;

/// File name suffix identifying descriptor (table of contents) files.
pub const DESCRIPTOR_EXTENSION: &str = ".toc";

/// Empty file stamped into every directory this tool installs.
pub const MARKER_FILE_NAME: &str = ".wowaddons-managed";

/// Directory name prefixes that cleanup never touches.
pub const DEFAULT_SKIP_CLEAN_PREFIXES: &[&str] = &["Blizzard_"];

/// Client-version suffixes stripped from descriptor names, checked in order.
pub const CLIENT_SUFFIXES: &[&str] = &[
    "_Wrath",
    "_TBC",
    "-tbc",
    "_Vanilla",
    "_Mainline",
    "_Cata",
    "-WOTLKC",
    "-BCC",
    "-Classic",
];

/// Fallback clone directory name when none can be derived from the URL.
const FALLBACK_CLONE_NAME: &str = "package";

/// One configured package to acquire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSource {
    /// Explicit display name, also used as the clone directory name.
    #[serde(default, alias = "Name")]
    pub name: Option<String>,
    /// Version-control repository URL.
    #[serde(default, alias = "Git")]
    pub git: Option<String>,
    /// Archive URL.
    #[serde(default, alias = "Zip")]
    pub zip: Option<String>,
    /// Generic URL, classified by extension when `git` and `zip` are absent.
    #[serde(default, alias = "Url")]
    pub url: Option<String>,
}

/// Where a package comes from once its configuration is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Shallow clone of a repository.
    Repository(String),
    /// Download and extract an archive.
    Archive {
        /// Archive URL.
        url: String,
        /// Container format.
        format: ArchiveFormat,
    },
}

impl PackageSource {
    /// Creates a repository source.
    #[must_use]
    pub fn repository(url: &str) -> Self {
        Self {
            git: Some(url.to_string()),
            ..Self::default()
        }
    }

    /// Creates an archive source.
    #[must_use]
    pub fn archive(url: &str) -> Self {
        Self {
            zip: Some(url.to_string()),
            ..Self::default()
        }
    }

    /// Creates a source from a generic URL.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Self::default()
        }
    }

    /// Sets the explicit name.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Resolves the source kind.
    ///
    /// A repository URL wins over an archive URL; the generic URL is only
    /// consulted when neither is set. Empty strings count as absent.
    #[must_use]
    pub fn kind(&self) -> Option<SourceKind> {
        if let Some(url) = non_empty(&self.git) {
            return Some(SourceKind::Repository(url.to_string()));
        }
        if let Some(url) = non_empty(&self.zip) {
            return Some(SourceKind::Archive {
                url: url.to_string(),
                format: ArchiveFormat::from_url(url).unwrap_or(ArchiveFormat::Zip),
            });
        }

        let url = non_empty(&self.url)?;
        if strip_query(url).to_ascii_lowercase().ends_with(".git") {
            return Some(SourceKind::Repository(url.to_string()));
        }
        ArchiveFormat::from_url(url).map(|format| SourceKind::Archive {
            url: url.to_string(),
            format,
        })
    }

    /// Returns true if a repository or archive can be resolved.
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        self.kind().is_some()
    }

    /// Directory name for a repository clone.
    ///
    /// The explicit name wins; otherwise the last URL path segment with its
    /// extension removed.
    #[must_use]
    pub fn clone_name(&self) -> String {
        if let Some(name) = non_empty(&self.name).map(sanitize_dir_name) {
            if !name.is_empty() {
                return name;
            }
        }

        let derived = match self.kind() {
            Some(SourceKind::Repository(url)) | Some(SourceKind::Archive { url, .. }) => {
                let last = strip_query(&url)
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or("");
                match last.rfind('.') {
                    Some(idx) if idx > 0 => last[..idx].to_string(),
                    _ => last.to_string(),
                }
            }
            None => String::new(),
        };

        let derived = sanitize_dir_name(&derived);
        if derived.is_empty() {
            FALLBACK_CLONE_NAME.to_string()
        } else {
            derived
        }
    }

    /// Human-readable label used in log lines.
    #[must_use]
    pub fn label(&self) -> String {
        non_empty(&self.name)
            .or_else(|| non_empty(&self.git))
            .or_else(|| non_empty(&self.zip))
            .or_else(|| non_empty(&self.url))
            .unwrap_or("<unresolved>")
            .to_string()
    }

    /// Assigns the run-scoped unique identifier.
    #[must_use]
    pub fn hydrate(&self) -> HydratedSource {
        HydratedSource {
            source: self.clone(),
            unique_id: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

/// A package source paired with its run-scoped identifier.
///
/// The identifier only namespaces temporary download paths.
#[derive(Debug, Clone)]
pub struct HydratedSource {
    source: PackageSource,
    unique_id: String,
}

impl HydratedSource {
    /// Returns the configured source.
    #[must_use]
    pub fn source(&self) -> &PackageSource {
        &self.source
    }

    /// Returns the unique identifier.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Resolves the source kind.
    #[must_use]
    pub fn kind(&self) -> Option<SourceKind> {
        self.source.kind()
    }

    /// Directory name for a repository clone.
    #[must_use]
    pub fn clone_name(&self) -> String {
        self.source.clone_name()
    }

    /// Human-readable label used in log lines.
    #[must_use]
    pub fn label(&self) -> String {
        self.source.label()
    }
}

/// Add-on pipeline errors.
#[derive(Debug, Error)]
pub enum AddonError {
    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configured source has neither a repository nor an archive.
    #[error("Source #{index} ({label}) has no repository or archive URL")]
    UnresolvedSource {
        /// Position in the configured list.
        index: usize,
        /// Source label.
        label: String,
    },

    /// Nothing could be fetched for a source.
    #[error("Nothing to fetch for '{0}'")]
    NothingToFetch(String),

    /// Archive download failed.
    #[error("Download of {url} failed: {message}")]
    Fetch {
        /// Requested URL.
        url: String,
        /// Failure description.
        message: String,
    },

    /// Repository clone failed.
    #[error("Clone of {url} failed: {message}")]
    Clone {
        /// Repository URL.
        url: String,
        /// Failure description.
        message: String,
    },

    /// Archive could not be read or extracted.
    #[error("Archive error: {0}")]
    Archive(String),

    /// Walking a fetched tree failed.
    #[error("Failed to walk {root}: {message}")]
    Walk {
        /// Walk root.
        root: PathBuf,
        /// Failure description.
        message: String,
    },

    /// No valid descriptor file in a fetched tree.
    #[error("No descriptor files found under {0}")]
    NoDescriptorsFound(PathBuf),

    /// Descriptors sharing a directory disagree on the package name.
    #[error("Ambiguous package name in {dir}: expected '{expected}', found '{found}'")]
    AmbiguousGroupName {
        /// Shared directory.
        dir: PathBuf,
        /// Name from the first descriptor.
        expected: String,
        /// Conflicting name.
        found: String,
    },

    /// Canonical name cannot be used as a directory name.
    #[error("Invalid package name '{0}'")]
    InvalidPackageName(String),

    /// Cleaning the install root failed.
    #[error("Failed to clean {path}: {source}")]
    PreClean {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl AddonError {
    /// Returns true if the run can continue with the next package.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Config(_) | Self::UnresolvedSource { .. } | Self::PreClean { .. }
        )
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Drops any query string or fragment from a URL.
pub(crate) fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Replaces characters that cannot appear in a single path component.
fn sanitize_dir_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect();

    if cleaned == "." || cleaned == ".." {
        String::new()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_wins_over_archive() {
        let source = PackageSource {
            git: Some("https://example.com/a/Bagnon.git".to_string()),
            zip: Some("https://example.com/Bagnon.zip".to_string()),
            ..PackageSource::default()
        };
        assert_eq!(
            source.kind(),
            Some(SourceKind::Repository(
                "https://example.com/a/Bagnon.git".to_string()
            ))
        );
    }

    #[test]
    fn test_generic_url_classification() {
        let repo = PackageSource::from_url("https://example.com/user/pfUI.git");
        assert!(matches!(repo.kind(), Some(SourceKind::Repository(_))));

        let zip = PackageSource::from_url("https://example.com/files/Questie.zip?raw=1");
        assert_eq!(
            zip.kind(),
            Some(SourceKind::Archive {
                url: "https://example.com/files/Questie.zip?raw=1".to_string(),
                format: ArchiveFormat::Zip,
            })
        );

        let tarball = PackageSource::from_url("https://example.com/Details.tar.gz");
        assert!(matches!(
            tarball.kind(),
            Some(SourceKind::Archive {
                format: ArchiveFormat::TarGz,
                ..
            })
        ));

        let unknown = PackageSource::from_url("https://example.com/readme.html");
        assert!(unknown.kind().is_none());
        assert!(!PackageSource::default().is_resolvable());
    }

    #[test]
    fn test_empty_fields_are_absent() {
        let source = PackageSource {
            git: Some("  ".to_string()),
            zip: Some(String::new()),
            ..PackageSource::default()
        };
        assert!(source.kind().is_none());
    }

    #[test]
    fn test_explicit_zip_without_extension_defaults_to_zip() {
        let source = PackageSource::archive("https://example.com/download?id=42");
        assert!(matches!(
            source.kind(),
            Some(SourceKind::Archive {
                format: ArchiveFormat::Zip,
                ..
            })
        ));
    }

    #[test]
    fn test_clone_name() {
        let derived = PackageSource::repository("https://github.com/user/Bagnon.git");
        assert_eq!(derived.clone_name(), "Bagnon");

        let trailing = PackageSource::repository("https://github.com/user/pfQuest/");
        assert_eq!(trailing.clone_name(), "pfQuest");

        let named = PackageSource::repository("https://github.com/user/x.git").with_name("Atlas Loot");
        assert_eq!(named.clone_name(), "Atlas Loot");

        let unsafe_name = PackageSource::repository("https://h/x.git").with_name("../up");
        assert_eq!(unsafe_name.clone_name(), ".._up");

        let dots = PackageSource::repository("https://h/x.git").with_name("..");
        assert_eq!(dots.clone_name(), "x");

        let bare = PackageSource::repository("https://h/.git");
        assert_eq!(bare.clone_name(), ".git");

        let unnamed = PackageSource::default().with_name("/");
        assert_eq!(unnamed.clone_name(), "_");
        assert_eq!(PackageSource::default().clone_name(), FALLBACK_CLONE_NAME);
    }

    #[test]
    fn test_hydrate_generates_unique_ids() {
        let source = PackageSource::archive("https://example.com/a.zip");
        let first = source.hydrate();
        let second = source.hydrate();
        assert_ne!(first.unique_id(), second.unique_id());
        assert_eq!(first.unique_id().len(), 32);
        assert_eq!(first.source(), &source);
    }

    #[test]
    fn test_label() {
        assert_eq!(PackageSource::default().label(), "<unresolved>");
        assert_eq!(
            PackageSource::archive("https://e.com/a.zip").label(),
            "https://e.com/a.zip"
        );
        assert_eq!(
            PackageSource::archive("https://e.com/a.zip").with_name("A").label(),
            "A"
        );
    }

    #[test]
    fn test_error_recoverability() {
        assert!(AddonError::NothingToFetch("x".to_string()).is_recoverable());
        assert!(AddonError::NoDescriptorsFound(PathBuf::from("/tmp")).is_recoverable());
        assert!(!AddonError::Config("bad".to_string()).is_recoverable());
        assert!(
            !AddonError::PreClean {
                path: PathBuf::from("/x"),
                source: io::Error::other("boom"),
            }
            .is_recoverable()
        );
    }
}
