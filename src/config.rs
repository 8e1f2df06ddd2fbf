//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILREPACK_CONFIG` (environment variable)
//! 2. `~/.config/mailrepack/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailrepack\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Command-line flags always take precedence over values found here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::package::PackagingMode;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Metadata discovery settings.
    pub loader: LoaderConfig,
    /// Packaging defaults.
    pub packaging: PackagingConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override the directory the log file is written to.
    pub log_dir: Option<PathBuf>,
}

/// Metadata discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// File name prefix of per-account metadata files.
    pub file_prefix: String,
    /// File extension of per-account metadata files (without the dot).
    pub file_extension: String,
}

/// Packaging defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagingConfig {
    /// Mode used when no mode flag is given on the command line.
    pub default_mode: Option<PackagingMode>,
    /// Global message limit used when `--limit` is absent.
    pub limit: Option<u64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            file_prefix: "emails_".to_string(),
            file_extension: "csv".to_string(),
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match parse_config(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Parse a TOML document into a [`Config`].
pub fn parse_config(contents: &str) -> crate::error::Result<Config> {
    toml::from_str::<Config>(contents).map_err(|e| crate::error::RepackError::Config(e.to_string()))
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILREPACK_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailrepack").join("config.toml"))
}

/// Return the directory log files are written to.
pub fn log_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.log_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailrepack")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "info");
        assert_eq!(cfg.loader.file_prefix, "emails_");
        assert_eq!(cfg.loader.file_extension, "csv");
        assert!(cfg.packaging.default_mode.is_none());
        assert!(cfg.packaging.limit.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[packaging]
default_mode = "per-folder"
limit = 250
"#;
        let cfg = parse_config(partial).expect("parse partial");
        assert_eq!(cfg.packaging.default_mode, Some(PackagingMode::PerFolder));
        assert_eq!(cfg.packaging.limit, Some(250));
        assert_eq!(cfg.general.log_level, "info");
        assert_eq!(cfg.loader.file_prefix, "emails_");
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let bad = "[packaging]\ndefault_mode = \"per-planet\"\n";
        assert!(parse_config(bad).is_err());
    }

    #[test]
    fn test_log_dir_override() {
        let mut cfg = Config::default();
        cfg.general.log_dir = Some(PathBuf::from("/var/log/mailrepack"));
        assert_eq!(log_dir(&cfg), PathBuf::from("/var/log/mailrepack"));
    }
}
