//! Environment variable parsing and env-to-config merging.
//!
//! This module keeps env parsing:
//! - strict (invalid values fail fast)
//! - deterministic (CSV lists normalize to sorted/deduped values)
//! - safe (secret values are redacted in error metadata)

use crate::schema::{ExporterConfig, ValidatedExporterConfig};
use metrics_export_domain::{RateWindow, TimeUnit};
use metrics_export_shared::{ErrorCode, ErrorEnvelope, REDACTED, SecretString, is_secret_key};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Env var: key the sender authenticates with.
pub const ENV_API_KEY: &str = "MEX_API_KEY";
/// Env var: ingest endpoint override.
pub const ENV_OVERRIDE_URI: &str = "MEX_OVERRIDE_URI";
/// Env var: unit rates are reported per.
pub const ENV_RATE_UNIT: &str = "MEX_RATE_UNIT";
/// Env var: unit timer durations are reported in.
pub const ENV_DURATION_UNIT: &str = "MEX_DURATION_UNIT";
/// Env var: harvest period in milliseconds.
pub const ENV_HARVEST_INTERVAL_MS: &str = "MEX_HARVEST_INTERVAL_MS";
/// Env var: final harvest on stop.
pub const ENV_REPORT_ON_STOP: &str = "MEX_REPORT_ON_STOP";
/// Env var: reporter name.
pub const ENV_NAME: &str = "MEX_NAME";
/// Env var: comma-separated rate windows to suppress.
pub const ENV_DISABLED_RATE_WINDOWS: &str = "MEX_DISABLED_RATE_WINDOWS";

const MAX_CSV_ITEMS: usize = 16;

/// Parsed env overrides. `None` means the variable was not set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExporterEnv {
    /// `MEX_API_KEY`.
    pub api_key: Option<SecretString>,
    /// `MEX_OVERRIDE_URI`.
    pub override_uri: Option<Box<str>>,
    /// `MEX_RATE_UNIT`.
    pub rate_unit: Option<TimeUnit>,
    /// `MEX_DURATION_UNIT`.
    pub duration_unit: Option<TimeUnit>,
    /// `MEX_HARVEST_INTERVAL_MS`.
    pub harvest_interval_ms: Option<u64>,
    /// `MEX_REPORT_ON_STOP`.
    pub report_on_stop: Option<bool>,
    /// `MEX_NAME`.
    pub name: Option<Box<str>>,
    /// `MEX_DISABLED_RATE_WINDOWS`.
    pub disabled_rate_windows: Option<Vec<RateWindow>>,
}

impl ExporterEnv {
    /// Parse overrides from an explicit variable map.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            api_key: parse_optional_secret(map, ENV_API_KEY)?,
            override_uri: parse_optional_url_string(map, ENV_OVERRIDE_URI)?,
            rate_unit: parse_optional_time_unit(map, ENV_RATE_UNIT)?,
            duration_unit: parse_optional_time_unit(map, ENV_DURATION_UNIT)?,
            harvest_interval_ms: parse_optional_u64(map, ENV_HARVEST_INTERVAL_MS)?,
            report_on_stop: parse_optional_bool(map, ENV_REPORT_ON_STOP)?,
            name: parse_optional_trimmed_string(map, ENV_NAME)?,
            disabled_rate_windows: parse_optional_csv_rate_windows(map, ENV_DISABLED_RATE_WINDOWS)?,
        })
    }

    /// Parse overrides from the process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in [
            ENV_API_KEY,
            ENV_OVERRIDE_URI,
            ENV_RATE_UNIT,
            ENV_DURATION_UNIT,
            ENV_HARVEST_INTERVAL_MS,
            ENV_REPORT_ON_STOP,
            ENV_NAME,
            ENV_DISABLED_RATE_WINDOWS,
        ] {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_string(), value);
            }
        }

        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: ExporterConfig,
    env: &ExporterEnv,
) -> Result<ValidatedExporterConfig, ErrorEnvelope> {
    let mut config = base;
    if let Some(api_key) = &env.api_key {
        config.api_key = Some(api_key.clone());
    }
    if let Some(uri) = &env.override_uri {
        config.override_uri = Some(uri.clone());
    }
    if let Some(unit) = env.rate_unit {
        config.rate_unit = unit;
    }
    if let Some(unit) = env.duration_unit {
        config.duration_unit = unit;
    }
    if let Some(interval) = env.harvest_interval_ms {
        config.harvest_interval_ms = interval;
    }
    if let Some(report) = env.report_on_stop {
        config.report_on_stop = report;
    }
    if let Some(name) = &env.name {
        config.name = name.clone();
    }
    if let Some(windows) = &env.disabled_rate_windows {
        config.disabled_rate_windows = windows.clone();
    }

    config.validate_and_normalize().map_err(Into::into)
}

/// Typed env parsing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// A secret env var was present but empty after trimming.
    EmptySecret {
        /// Env var name.
        var: &'static str,
    },
    /// Boolean env var had an invalid value.
    InvalidBool {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// URL env var had an invalid value.
    InvalidUrl {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// CSV list exceeds a safety limit.
    CsvTooLarge {
        /// Env var name.
        var: &'static str,
        /// Number of parsed items.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } | Self::EmptySecret { .. } => {
                ErrorCode::new("config", "empty_env_var")
            },
            Self::InvalidBool { .. } => ErrorCode::new("config", "invalid_env_bool"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_env_url"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
            Self::CsvTooLarge { .. } => ErrorCode::new("config", "invalid_env_csv"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } | Self::EmptySecret { var } => {
                write!(formatter, "{var} must be non-empty")
            },
            Self::InvalidBool { var, .. } => write!(formatter, "{var} must be a boolean"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidUrl { var, .. } => write!(formatter, "{var} must be an http(s) URL"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
            Self::CsvTooLarge { var, len, max } => {
                write!(formatter, "{var} is too large ({len} items, max {max})")
            },
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } | EnvParseError::EmptySecret { var } => {
                envelope.with_metadata("env_var", var)
            },
            EnvParseError::InvalidBool { var, value }
            | EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidUrl { var, value }
            | EnvParseError::InvalidEnum { var, value } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", redact_value(var, &value)),
            EnvParseError::CsvTooLarge { var, len, max } => envelope
                .with_metadata("env_var", var)
                .with_metadata("len", len.to_string())
                .with_metadata("max", max.to_string()),
        }
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.into()))
}

fn parse_optional_secret(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretString>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptySecret { var });
    }

    Ok(Some(SecretString::new(trimmed)))
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError::InvalidBool {
            var,
            value: raw.clone(),
        }),
    }
}

fn parse_optional_time_unit(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<TimeUnit>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    TimeUnit::from_str(trimmed)
        .map(Some)
        .map_err(|_| EnvParseError::InvalidEnum {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_url_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    let parsed = Url::parse(trimmed).map_err(|_| EnvParseError::InvalidUrl {
        var,
        value: raw.clone(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(EnvParseError::InvalidUrl {
            var,
            value: raw.clone(),
        });
    }

    Ok(Some(parsed.to_string().into_boxed_str()))
}

/// An empty value clears the list.
fn parse_optional_csv_rate_windows(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Vec<RateWindow>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Some(Vec::new()));
    }

    let items = parse_csv(trimmed);
    if items.len() > MAX_CSV_ITEMS {
        return Err(EnvParseError::CsvTooLarge {
            var,
            len: items.len(),
            max: MAX_CSV_ITEMS,
        });
    }

    let mut windows = items
        .into_iter()
        .map(|item| {
            RateWindow::from_str(item).map_err(|_| EnvParseError::InvalidEnum {
                var,
                value: item.to_owned(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    windows.sort_unstable();
    windows.dedup();
    Ok(Some(windows))
}

fn parse_csv(input: &str) -> Vec<&str> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

fn redact_value(var: &str, value: &str) -> String {
    if is_secret_key(var) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}
