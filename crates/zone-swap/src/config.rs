use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pan_api::ApiSettings;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub offline: OfflineConfig,
    /// File the settings were read from; `None` when defaults were used.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable log output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub verify_tls: bool,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            verify_tls: false,
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn settings(&self) -> ApiSettings {
        ApiSettings {
            verify_tls: self.verify_tls,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OfflineConfig {
    /// Prepended to the source file name when the edited copy is written.
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            output_prefix: default_output_prefix(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_output_prefix() -> String {
    "EDITED_BY_SCRIPT_".to_string()
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load settings from a YAML file.
///
/// A missing file is not an error: defaults are returned with no `source`,
/// so the tool runs without any settings file at all. Logging is not set up
/// yet at this point; the caller reports the fallback once it is.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read settings file {}: {e}", path.display()))?;

    let mut config = parse(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse settings file {}: {e}", path.display()))?;
    config.source = Some(path.to_path_buf());
    Ok(config)
}

fn parse(yaml: &str) -> Result<Config, serde_yml::Error> {
    serde_yml::from_str(yaml)
}
