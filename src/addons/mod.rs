//! Add-ons system.
//!
//! Fetches addon packages from repositories or archives, finds the addon
//! roots inside them and installs those into the game's `AddOns` directory.
//!
//! # Architecture
//!
//! - **types**: Core data structures (`PackageSource`, `AddonError`)
//! - **descriptor**: `.toc` parsing and tree indexing
//! - **grouping**: Install root selection and package naming
//! - **installer**: Marker-tracked install and cleanup
//! - **archive**: `.zip` and `.tar.gz` extraction
//! - **fetcher**: Repository clones and archive downloads
//! - **orchestrator**: Per-run lifecycle
//!
//! # Usage
//!
//! ```no_run
//! use wowaddons::addons::Orchestrator;
//! use wowaddons::config::Config;
//!
//! let mut config = Config::load("addons.toml".as_ref())?;
//! config.resolve_paths(&std::env::current_dir()?);
//! config.validate()?;
//! let report = Orchestrator::from_config(&config).run()?;
//! println!("installed {}", report.installed.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod descriptor;
pub mod fetcher;
pub mod grouping;
pub mod installer;
pub mod orchestrator;
mod types;

pub use archive::ArchiveFormat;
pub use descriptor::{DescriptorRecord, index_descriptors, parse_descriptor, sanitize_title};
pub use fetcher::{ARCHIVE_TIMEOUT, FetchOutcome, Fetcher, NetworkTransport, Transport};
pub use grouping::{DescriptorGroup, InstallTarget, select_install_targets};
pub use installer::{CleanPolicy, Installer, is_managed};
pub use orchestrator::{CleanupGuard, Orchestrator, PackageFailure, RunReport};
pub use types::{
    AddonError, CLIENT_SUFFIXES, DEFAULT_SKIP_CLEAN_PREFIXES, DESCRIPTOR_EXTENSION,
    HydratedSource, MARKER_FILE_NAME, PackageSource, SourceKind,
};
