//! Configuration for granary
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Granary - self-hosted file CDN
#[derive(Parser, Debug, Clone)]
#[command(name = "granary")]
#[command(about = "Serves registered domains' files with cache-validation headers")]
pub struct Args {
    /// Address the read path listens on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Base directory for stored files
    #[arg(long, env = "STORAGE_PATH", default_value = "./storage")]
    pub storage_path: PathBuf,

    /// Domain catalog file
    #[arg(long, env = "DOMAINS_CONFIG", default_value = "./configs/domains.json")]
    pub domains_config: PathBuf,

    /// Category catalog file
    #[arg(long, env = "CATEGORIES_CONFIG", default_value = "./configs/categories.json")]
    pub categories_config: PathBuf,

    /// Upload defaults and channel bindings file
    #[arg(long, env = "SETTINGS_PATH", default_value = "./configs/settings.json")]
    pub settings_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.listen.port() == 0 {
            return Err("LISTEN must include a non-zero port".to_string());
        }

        for (name, path) in [
            ("STORAGE_PATH", &self.storage_path),
            ("DOMAINS_CONFIG", &self.domains_config),
            ("CATEGORIES_CONFIG", &self.categories_config),
            ("SETTINGS_PATH", &self.settings_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(format!("{name} must not be empty"));
            }
        }

        Ok(())
    }
}
