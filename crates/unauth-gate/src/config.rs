//! Blocker settings as written by operators and their validated form.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::{BlockPolicy, FailureStatuses};

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Errors surfaced while loading or validating blocker settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize blocker settings: {0}")]
    Deserialize(String),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} is wrong with value: {value} ({reason})")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("unknown directive '{0}', expected 'blocker'")]
    UnknownDirective(String),
    #[error(
        "blocker directive takes <cache_size> <max_unauth_times> <block_duration>, got {0} argument(s)"
    )]
    DirectiveArity(usize),
}

/// Integer field that may be written either as a number or a numeric string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Int(i64),
    Text(String),
}

impl fmt::Display for RawNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawNumber::Int(value) => write!(f, "{value}"),
            RawNumber::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

impl From<i64> for RawNumber {
    fn from(value: i64) -> Self {
        RawNumber::Int(value)
    }
}

/// Settings file contents before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(
        default,
        alias = "max_unauth_times",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_unauthorized_attempts: Option<RawNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_duration: Option<String>,
    #[serde(default, alias = "cache_size", skip_serializing_if = "Option::is_none")]
    pub cache_capacity: Option<RawNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_statuses: Option<Vec<RawNumber>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<String>,
}

/// Where block notices are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotifyTarget {
    Stdout,
    Stderr,
    Discard,
    File(PathBuf),
}

impl NotifyTarget {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "stdout" | "-" => NotifyTarget::Stdout,
            "stderr" => NotifyTarget::Stderr,
            "none" | "discard" => NotifyTarget::Discard,
            path => NotifyTarget::File(PathBuf::from(path)),
        }
    }
}

impl fmt::Display for NotifyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyTarget::Stdout => f.write_str("stdout"),
            NotifyTarget::Stderr => f.write_str("stderr"),
            NotifyTarget::Discard => f.write_str("none"),
            NotifyTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Validated configuration consumed by the gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockerConfig {
    pub policy: BlockPolicy,
    pub block_duration: Duration,
    pub cache_capacity: usize,
    pub failure_statuses: FailureStatuses,
    pub notify: NotifyTarget,
}

impl BlockerConfig {
    pub fn threshold(max_attempts: u32, block_duration: Duration, cache_capacity: usize) -> Self {
        Self {
            policy: BlockPolicy::Threshold { max_attempts },
            block_duration,
            cache_capacity,
            failure_statuses: FailureStatuses::default(),
            notify: NotifyTarget::Stdout,
        }
    }

    pub fn single_strike(block_duration: Duration) -> Self {
        Self {
            policy: BlockPolicy::SingleStrike,
            block_duration,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            failure_statuses: FailureStatuses::default(),
            notify: NotifyTarget::Stdout,
        }
    }

    pub fn with_notify(mut self, notify: NotifyTarget) -> Self {
        self.notify = notify;
        self
    }

    pub fn with_failure_statuses(mut self, statuses: FailureStatuses) -> Self {
        self.failure_statuses = statuses;
        self
    }
}

impl BlockerSettings {
    /// Parse the one-line directive form
    /// `blocker <cache_size> <max_unauth_times> <block_duration>`.
    pub fn from_directive(line: &str) -> Result<Self, ConfigError> {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("blocker") => {}
            Some(other) => return Err(ConfigError::UnknownDirective(other.to_string())),
            None => return Err(ConfigError::UnknownDirective(String::new())),
        }
        let args: Vec<&str> = tokens.collect();
        let [cache_size, max_unauth, duration] = args.as_slice() else {
            return Err(ConfigError::DirectiveArity(args.len()));
        };
        Ok(Self {
            policy: None,
            max_unauthorized_attempts: Some((*max_unauth).into()),
            block_duration: Some(duration.to_string()),
            cache_capacity: Some((*cache_size).into()),
            failure_statuses: None,
            notify: None,
        })
    }

    pub fn validate(&self) -> Result<BlockerConfig, ConfigError> {
        let raw_duration = self
            .block_duration
            .as_deref()
            .ok_or(ConfigError::MissingField("block_duration"))?;
        let block_duration = parse_duration_field("block_duration", raw_duration)?;

        let policy = match self.policy.as_deref().map(str::trim) {
            None => match &self.max_unauthorized_attempts {
                Some(raw) => BlockPolicy::Threshold {
                    max_attempts: parse_max_attempts(raw)?,
                },
                None => BlockPolicy::SingleStrike,
            },
            Some("threshold") => {
                let raw = self
                    .max_unauthorized_attempts
                    .as_ref()
                    .ok_or(ConfigError::MissingField("max_unauthorized_attempts"))?;
                BlockPolicy::Threshold {
                    max_attempts: parse_max_attempts(raw)?,
                }
            }
            Some("single_strike") | Some("single-strike") => {
                if let Some(raw) = &self.max_unauthorized_attempts {
                    return Err(ConfigError::InvalidField {
                        field: "max_unauthorized_attempts",
                        value: raw.to_string(),
                        reason: "not used by the single_strike policy".into(),
                    });
                }
                BlockPolicy::SingleStrike
            }
            Some(other) => {
                return Err(ConfigError::InvalidField {
                    field: "policy",
                    value: other.to_string(),
                    reason: "expected threshold or single_strike".into(),
                })
            }
        };

        let cache_capacity = match &self.cache_capacity {
            Some(raw) => parse_capacity(raw)?,
            None => DEFAULT_CACHE_CAPACITY,
        };

        let failure_statuses = match &self.failure_statuses {
            Some(raw) => parse_failure_statuses(raw)?,
            None => FailureStatuses::default(),
        };

        let notify = self
            .notify
            .as_deref()
            .map(NotifyTarget::parse)
            .unwrap_or(NotifyTarget::Stdout);

        Ok(BlockerConfig {
            policy,
            block_duration,
            cache_capacity,
            failure_statuses,
            notify,
        })
    }
}

fn invalid(field: &'static str, value: impl ToString, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidField {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_duration_field(field: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let duration = humantime::parse_duration(raw.trim()).map_err(|err| invalid(field, raw, err))?;
    if duration.is_zero() {
        return Err(invalid(field, raw, "must be a positive duration"));
    }
    Ok(duration)
}

fn parse_integer(field: &'static str, raw: &RawNumber) -> Result<i64, ConfigError> {
    match raw {
        RawNumber::Int(value) => Ok(*value),
        RawNumber::Text(text) => text.trim().parse::<i64>().map_err(|err| invalid(field, raw, err)),
    }
}

fn parse_max_attempts(raw: &RawNumber) -> Result<u32, ConfigError> {
    const FIELD: &str = "max_unauthorized_attempts";
    let value = parse_integer(FIELD, raw)?;
    u32::try_from(value).map_err(|_| invalid(FIELD, raw, "must be a non-negative integer"))
}

fn parse_capacity(raw: &RawNumber) -> Result<usize, ConfigError> {
    const FIELD: &str = "cache_capacity";
    let value = parse_integer(FIELD, raw)?;
    match usize::try_from(value) {
        Ok(capacity) if capacity > 0 => Ok(capacity),
        _ => Err(invalid(FIELD, raw, "must be a positive integer")),
    }
}

fn parse_failure_statuses(raw: &[RawNumber]) -> Result<FailureStatuses, ConfigError> {
    const FIELD: &str = "failure_statuses";
    if raw.is_empty() {
        return Err(invalid(FIELD, "[]", "at least one status is required"));
    }
    let mut statuses = Vec::with_capacity(raw.len());
    for item in raw {
        let code = parse_integer(FIELD, item)?;
        let status = u16::try_from(code)
            .ok()
            .filter(|code| (400..=599).contains(code))
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| invalid(FIELD, item, "expected a 4xx or 5xx status code"))?;
        statuses.push(status);
    }
    Ok(FailureStatuses::new(statuses))
}

pub fn parse_settings_str(raw: &str) -> Result<BlockerSettings, ConfigError> {
    match serde_json::from_str(raw) {
        Ok(settings) => Ok(settings),
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            ConfigError::Deserialize(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        }),
    }
}

pub fn load_settings_from_reader<R: Read>(mut reader: R) -> Result<BlockerSettings, ConfigError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_settings_str(&buf)
}

pub fn load_settings_from_path(path: impl AsRef<Path>) -> Result<BlockerSettings, ConfigError> {
    let file = File::open(path.as_ref())?;
    load_settings_from_reader(file)
}
