//! wowaddons
//!
//! Fetches game client addons from git repositories or archives and
//! installs them into the client's `AddOns` directory.
//!
//! # Architecture
//!
//! - **Addons Module**: Fetch, descriptor discovery, root selection, install
//! - **Config Module**: TOML run configuration
//! - **Logging Module**: tracing subscriber setup
//!
//! # Usage
//!
//! ```no_run
//! use wowaddons::addons::{Orchestrator, PackageSource};
//! use wowaddons::config::Config;
//!
//! let mut config = Config::default();
//! config.addons_path = "/games/wow/Interface/AddOns".into();
//! config.addons.push(PackageSource::repository("https://github.com/example/Bagnon.git"));
//! config.resolve_paths(&std::env::current_dir().expect("cwd"));
//!
//! let report = Orchestrator::from_config(&config).run().expect("run");
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

pub mod addons;
pub mod config;
pub mod logging;

// Re-export main types
pub use addons::{AddonError, Orchestrator, PackageSource, RunReport};
pub use config::Config;
