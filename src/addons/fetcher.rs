//! Package fetching.
//!
//! Resolves a package source into a local working directory, either by
//! shallow-cloning a repository or by downloading and extracting an archive.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::archive;
use super::types::{AddonError, HydratedSource, SourceKind};

/// Timeout for a single archive download.
pub const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(20);

/// Network operations needed by the fetcher.
pub trait Transport {
    /// Downloads `url` into the file at `dest`, returning the bytes written.
    fn download(&self, url: &str, dest: &Path) -> Result<u64, AddonError>;

    /// Shallow-clones the repository at `url` into `dest`.
    fn clone_repository(&self, url: &str, dest: &Path) -> Result<(), AddonError>;
}

/// HTTP downloads through reqwest, clones through the `git` executable.
pub struct NetworkTransport {
    /// HTTP client.
    client: reqwest::blocking::Client,
    /// Git executable.
    git_program: String,
}

impl Default for NetworkTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkTransport {
    /// Creates a transport with the archive timeout applied.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("wowaddons/", env!("CARGO_PKG_VERSION")))
            .timeout(ARCHIVE_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            client,
            git_program: String::from("git"),
        }
    }

    /// Overrides the git executable.
    #[must_use]
    pub fn with_git_program(mut self, program: &str) -> Self {
        assert!(!program.is_empty(), "Git program must not be empty");
        self.git_program = program.to_string();
        self
    }
}

impl Transport for NetworkTransport {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, AddonError> {
        let fetch_error = |message: String| AddonError::Fetch {
            url: url.to_string(),
            message,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fetch_error(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP status {}", response.status())));
        }

        let mut file = File::create(dest)?;
        let written = response
            .copy_to(&mut file)
            .map_err(|e| fetch_error(format!("Failed to read response: {}", e)))?;
        file.flush()?;

        Ok(written)
    }

    fn clone_repository(&self, url: &str, dest: &Path) -> Result<(), AddonError> {
        let output = Command::new(&self.git_program)
            .args(["clone", "--quiet", "--depth", "1", "--no-tags", "--single-branch"])
            .arg(url)
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| AddonError::Clone {
                url: url.to_string(),
                message: format!("Failed to run {}: {}", self.git_program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AddonError::Clone {
                url: url.to_string(),
                message: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        Ok(())
    }
}

/// Result of fetching one package.
///
/// `cleanup` lists every temporary path created, whether or not the fetch
/// succeeded.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Paths to remove once the package has been processed.
    pub cleanup: Vec<PathBuf>,
    /// Working directory to index.
    pub result: Result<PathBuf, AddonError>,
}

/// Fetches packages into a download root.
pub struct Fetcher<T: Transport> {
    download_root: PathBuf,
    transport: T,
}

impl<T: Transport> Fetcher<T> {
    /// Creates a fetcher writing under `download_root`.
    #[must_use]
    pub fn new(download_root: PathBuf, transport: T) -> Self {
        assert!(
            !download_root.as_os_str().is_empty(),
            "Download root must not be empty"
        );
        Self {
            download_root,
            transport,
        }
    }

    /// Returns the download root.
    #[must_use]
    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Fetches `source`.
    pub fn fetch(&self, source: &HydratedSource) -> FetchOutcome {
        let mut cleanup = Vec::new();
        let result = self.fetch_into(source, &mut cleanup);
        if let Err(ref e) = result {
            warn!("[ADDON-FETCH] Failed to fetch {}: {}", source.label(), e);
        }
        FetchOutcome { cleanup, result }
    }

    fn fetch_into(
        &self,
        source: &HydratedSource,
        cleanup: &mut Vec<PathBuf>,
    ) -> Result<PathBuf, AddonError> {
        let kind = source
            .kind()
            .ok_or_else(|| AddonError::NothingToFetch(source.label()))?;

        fs::create_dir_all(&self.download_root)?;
        let work_dir = self.download_root.join(source.unique_id());

        match kind {
            SourceKind::Repository(url) => {
                cleanup.push(work_dir.clone());
                fs::create_dir_all(&work_dir)?;

                let clone_dir = work_dir.join(source.clone_name());
                info!(
                    "[ADDON-FETCH] Cloning {} to {}",
                    url,
                    clone_dir.display()
                );
                self.transport.clone_repository(&url, &clone_dir)?;
                Ok(clone_dir)
            }
            SourceKind::Archive { url, format } => {
                let archive_path = self
                    .download_root
                    .join(format!("{}.{}", source.unique_id(), format.extension()));
                cleanup.push(archive_path.clone());

                info!(
                    "[ADDON-FETCH] Downloading {} to {}",
                    url,
                    archive_path.display()
                );
                let written = self.transport.download(&url, &archive_path)?;
                debug!("[ADDON-FETCH] Wrote {} bytes", written);

                cleanup.push(work_dir.clone());
                archive::extract(&archive_path, &work_dir, format)?;
                info!("[ADDON-FETCH] Extraction complete for {}", source.label());
                Ok(work_dir)
            }
        }
    }
}
