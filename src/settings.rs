use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::{debug, info};
use unauth_gate::{
    load_settings_from_path, BlockPolicy, BlockerConfig, BlockerSettings, RawNumber,
};

const CONFIG_DIR_NAME: &str = "unauth-guard";
const CONFIG_FILE_NAME: &str = "blocker.yaml";

/// Command-line overrides applied on top of the settings file.
#[derive(Args, Clone, Debug, Default)]
pub struct BlockerOverrides {
    /// Blocking policy: threshold or single_strike
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<String>,

    /// Failures tolerated before the client is blocked
    #[arg(long = "max-unauthorized-attempts", value_name = "N")]
    pub max_unauthorized_attempts: Option<String>,

    /// How long a failure is remembered, e.g. "10m" or "1h 30m"
    #[arg(long = "block-duration", value_name = "DURATION")]
    pub block_duration: Option<String>,

    /// Maximum number of clients tracked at once
    #[arg(long = "cache-capacity", value_name = "N")]
    pub cache_capacity: Option<String>,

    /// Block notice sink: stdout, stderr, none or a file path
    #[arg(long, value_name = "TARGET")]
    pub notify: Option<String>,
}

impl BlockerOverrides {
    pub fn apply(&self, settings: &mut BlockerSettings) {
        if let Some(policy) = &self.policy {
            settings.policy = Some(policy.clone());
        }
        if let Some(max) = &self.max_unauthorized_attempts {
            settings.max_unauthorized_attempts = Some(RawNumber::Text(max.clone()));
        }
        if let Some(duration) = &self.block_duration {
            settings.block_duration = Some(duration.clone());
        }
        if let Some(capacity) = &self.cache_capacity {
            settings.cache_capacity = Some(RawNumber::Text(capacity.clone()));
        }
        if let Some(notify) = &self.notify {
            settings.notify = Some(notify.clone());
        }
    }
}

pub fn default_settings_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push(CONFIG_DIR_NAME);
    path.push(CONFIG_FILE_NAME);
    Some(path)
}

/// Load the settings file. An explicit path must exist; the default location
/// is optional and yields empty settings when absent.
pub fn load_settings(explicit: Option<&Path>) -> Result<BlockerSettings> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("settings file {} does not exist", path.display());
        }
        return read_settings(path);
    }

    match default_settings_path() {
        Some(path) if path.exists() => read_settings(&path),
        Some(path) => {
            debug!(path = %path.display(), "No settings file at default location");
            Ok(BlockerSettings::default())
        }
        None => Ok(BlockerSettings::default()),
    }
}

fn read_settings(path: &Path) -> Result<BlockerSettings> {
    let settings = load_settings_from_path(path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    info!(path = %path.display(), "Loaded blocker settings");
    Ok(settings)
}

/// Settings file plus overrides, validated.
pub fn resolve_config(
    explicit: Option<&Path>,
    overrides: &BlockerOverrides,
) -> Result<BlockerConfig> {
    let mut settings = load_settings(explicit)?;
    overrides.apply(&mut settings);
    let config = settings
        .validate()
        .context("invalid blocker configuration")?;
    Ok(config)
}

/// Printable view of a validated configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    pub policy: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_unauthorized_attempts: Option<u32>,
    pub block_duration: String,
    pub cache_capacity: usize,
    pub failure_statuses: Vec<u16>,
    pub notify: String,
}

impl From<&BlockerConfig> for EffectiveConfig {
    fn from(config: &BlockerConfig) -> Self {
        let max_unauthorized_attempts = match config.policy {
            BlockPolicy::Threshold { max_attempts } => Some(max_attempts),
            BlockPolicy::SingleStrike => None,
        };
        Self {
            policy: config.policy.name(),
            max_unauthorized_attempts,
            block_duration: humantime::format_duration(config.block_duration).to_string(),
            cache_capacity: config.cache_capacity,
            failure_statuses: config
                .failure_statuses
                .as_slice()
                .iter()
                .map(|status| status.as_u16())
                .collect(),
            notify: config.notify.to_string(),
        }
    }
}
