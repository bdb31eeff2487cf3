//! wowaddons - Main entry point.
//!
//! Usage: wowaddons --config <FILE> [OPTIONS]
//!
//! Options:
//!   --config <FILE>        TOML configuration file (required)
//!   --addonspath <DIR>     Path to the AddOns directory
//!   --dlpath <DIR>         Download directory (relative to AddOns)
//!   --version, -v          Show version
//!   --help, -h             Show help

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use wowaddons::config::{Config, EXAMPLE_CONFIG};
use wowaddons::{Orchestrator, logging};

/// Current version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "Usage: wowaddons --config <FILE> [--addonspath <DIR>] [--dlpath <DIR>]";

/// Parsed command-line options.
#[derive(Debug, Default, PartialEq, Eq)]
struct CliOptions {
    config: Option<PathBuf>,
    addons_path: Option<PathBuf>,
    download_path: Option<PathBuf>,
    version: bool,
    help: bool,
}

impl CliOptions {
    /// Parses arguments, excluding the program name.
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut options = Self::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
                _ => (arg.as_str(), None),
            };

            let mut value = |name: &str| -> Result<PathBuf, String> {
                inline
                    .clone()
                    .or_else(|| iter.next().cloned())
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
                    .ok_or_else(|| format!("{} requires a value", name))
            };

            match flag {
                "--config" | "-config" => options.config = Some(value("--config")?),
                "--addonspath" | "-addonspath" => {
                    options.addons_path = Some(value("--addonspath")?);
                }
                "--dlpath" | "-dlpath" => options.download_path = Some(value("--dlpath")?),
                "--version" | "-v" => options.version = true,
                "--help" | "-h" => options.help = true,
                other => return Err(format!("Unknown argument: {}", other)),
            }
        }

        Ok(options)
    }

    /// Loads the config file and applies path overrides.
    fn load_config(&self) -> Result<Config, String> {
        let path = self
            .config
            .as_ref()
            .ok_or_else(|| "--config is required".to_string())?;

        let mut config = Config::load(path).map_err(|e| e.to_string())?;
        if let Some(ref addons_path) = self.addons_path {
            config.addons_path = addons_path.clone();
        }
        if let Some(ref download_path) = self.download_path {
            config.download_path = download_path.clone();
        }

        let cwd = env::current_dir().map_err(|e| format!("Cannot read working directory: {}", e))?;
        config.resolve_paths(&cwd);
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let options = match CliOptions::parse(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            return ExitCode::FAILURE;
        }
    };

    if options.version {
        println!("wowaddons v{}", VERSION);
        return ExitCode::SUCCESS;
    }

    if options.help {
        println!("{}\n\nExample configuration:\n\n{}", USAGE, EXAMPLE_CONFIG);
        return ExitCode::SUCCESS;
    }

    let config = match options.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.log) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    match Orchestrator::from_config(&config).run() {
        Ok(report) => {
            for failure in &report.failures {
                eprintln!("Skipped {}: {}", failure.source, failure.error);
            }
            println!(
                "Installed {} addon director(ies), {} package(s) failed",
                report.installed.len(),
                report.failures.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_flags() {
        let options = CliOptions::parse(&args(&[
            "--config",
            "addons.toml",
            "--addonspath=/wow/AddOns",
            "-dlpath",
            "dl",
        ]))
        .expect("parse");

        assert_eq!(options.config, Some(PathBuf::from("addons.toml")));
        assert_eq!(options.addons_path, Some(PathBuf::from("/wow/AddOns")));
        assert_eq!(options.download_path, Some(PathBuf::from("dl")));
        assert!(!options.version);
    }

    #[test]
    fn test_parse_version_and_help() {
        let options = CliOptions::parse(&args(&["-v", "--help"])).expect("parse");
        assert!(options.version);
        assert!(options.help);
    }

    #[test]
    fn test_parse_errors() {
        assert!(CliOptions::parse(&args(&["--config"])).is_err());
        assert!(CliOptions::parse(&args(&["--bogus"])).is_err());
        assert!(CliOptions::parse(&args(&["--dlpath="])).is_err());
    }

    #[test]
    fn test_missing_config_flag() {
        let err = CliOptions::default().load_config().unwrap_err();
        assert!(err.contains("--config"));
    }
}
