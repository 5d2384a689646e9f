//! CLI argument definitions for the Liga console.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use liga_core::config::home_dir;

/// Liga: answer ranking questions about sales plans from a spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "liga", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Workbook holding the plan tables.
    #[arg(short = 'w', long = "workbook")]
    pub workbook: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Treat every input line as a message from this user.
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// Print replies as JSON instead of text.
    #[arg(long = "json")]
    pub json: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > LIGA_CONFIG env var > ~/.liga/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("LIGA_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Data workbook override: --workbook flag > LIGA_WORKBOOK env var.
    ///
    /// `None` means the config file value stands.
    pub fn resolve_workbook(&self) -> Option<PathBuf> {
        if let Some(ref p) = self.workbook {
            return Some(p.clone());
        }
        std::env::var("LIGA_WORKBOOK").ok().map(PathBuf::from)
    }

    /// Resolve the log level: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".liga").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}
