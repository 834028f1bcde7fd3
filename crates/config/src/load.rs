//! Config loading helpers (env + file + overrides).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::{ExporterConfig, ExporterEnv, ValidatedExporterConfig, apply_env_overrides};
use metrics_export_domain::{RateWindow, TimeUnit};
use metrics_export_shared::{ErrorClass, ErrorCode, ErrorEnvelope, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the exporter config from sources using a deterministic precedence order.
///
/// Precedence (highest wins):
/// - env overrides (`ExporterEnv`)
/// - overrides JSON (partial config)
/// - config JSON (file content)
/// - defaults (`ExporterConfig::default()`)
pub fn load_exporter_config_from_sources(
    config_json: Option<&str>,
    overrides_json: Option<&str>,
    env: &ExporterEnv,
) -> Result<ValidatedExporterConfig, ErrorEnvelope> {
    let mut config = match config_json {
        None => ExporterConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        overrides.apply(&mut config);
    }

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the exporter config from an optional file path (`.json` or `.toml`).
pub fn load_exporter_config_from_path(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    env: &ExporterEnv,
) -> Result<ValidatedExporterConfig, ErrorEnvelope> {
    let mut config = match config_path {
        None => ExporterConfig::default(),
        Some(path) => {
            let config_text = read_config_file(path)?;
            let format = detect_config_format(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        overrides.apply(&mut config);
    }

    apply_env_overrides(config, env)
}

/// Load the exporter config from std env and an optional file path.
pub fn load_exporter_config_std_env(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<ValidatedExporterConfig, ErrorEnvelope> {
    let env = ExporterEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_exporter_config_from_path(config_path, overrides_json, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
///
/// The API key is written as a redaction marker.
pub fn to_pretty_json(config: &ExporterConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &ExporterConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<ExporterConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn parse_overrides_json(input: &str) -> Result<ExporterConfigOverrides, ErrorEnvelope> {
    serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid overrides JSON: {error}"),
        )
        .with_metadata("source", "overrides")
    })
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

/// Partial config; `commonAttributes` entries are merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct ExporterConfigOverrides {
    version: Option<u32>,
    name: Option<Box<str>>,
    api_key: Option<String>,
    override_uri: Option<Box<str>>,
    common_attributes: Option<BTreeMap<Box<str>, serde_json::Value>>,
    rate_unit: Option<TimeUnit>,
    duration_unit: Option<TimeUnit>,
    disabled_rate_windows: Option<Vec<RateWindow>>,
    harvest_interval_ms: Option<u64>,
    report_on_stop: Option<bool>,
}

impl ExporterConfigOverrides {
    fn apply(self, config: &mut ExporterConfig) {
        OverrideMapper::set(&mut config.version, self.version);
        OverrideMapper::set(&mut config.name, self.name);
        OverrideMapper::set_opt(&mut config.api_key, self.api_key.map(SecretString::from));
        OverrideMapper::set_opt(&mut config.override_uri, self.override_uri);
        if let Some(attributes) = self.common_attributes {
            config.common_attributes.extend(attributes);
        }
        OverrideMapper::set(&mut config.rate_unit, self.rate_unit);
        OverrideMapper::set(&mut config.duration_unit, self.duration_unit);
        OverrideMapper::set(&mut config.disabled_rate_windows, self.disabled_rate_windows);
        OverrideMapper::set(&mut config.harvest_interval_ms, self.harvest_interval_ms);
        OverrideMapper::set(&mut config.report_on_stop, self.report_on_stop);
    }
}

struct OverrideMapper;

impl OverrideMapper {
    fn set<T>(target: &mut T, value: Option<T>) {
        if let Some(value) = value {
            *target = value;
        }
    }

    fn set_opt<T>(target: &mut Option<T>, value: Option<T>) {
        if value.is_some() {
            *target = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_precedence_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{ "version": 1, "harvestIntervalMs": 10000 }"#;
        let overrides_json = r#"{ "harvestIntervalMs": 20000 }"#;
        let env = ExporterEnv {
            harvest_interval_ms: Some(30_000),
            ..ExporterEnv::default()
        };

        let config =
            load_exporter_config_from_sources(Some(config_json), Some(overrides_json), &env)?;
        assert_eq!(config.harvest_interval_ms, 30_000);

        let config = load_exporter_config_from_sources(
            Some(config_json),
            Some(overrides_json),
            &ExporterEnv::default(),
        )?;
        assert_eq!(config.harvest_interval_ms, 20_000);
        Ok(())
    }

    #[test]
    fn overrides_merge_common_attributes() -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{ "commonAttributes": { "host": "web-1", "zone": "a" } }"#;
        let overrides_json = r#"{ "commonAttributes": { "zone": "b", "canary": true } }"#;

        let config = load_exporter_config_from_sources(
            Some(config_json),
            Some(overrides_json),
            &ExporterEnv::default(),
        )?;
        let keys: Vec<&str> = config.common_attributes.keys().map(AsRef::as_ref).collect();
        assert_eq!(keys, vec!["canary", "host", "zone"]);
        assert_eq!(
            config.common_attributes.get("zone"),
            Some(&serde_json::Value::from("b"))
        );
        Ok(())
    }

    #[test]
    fn serialization_is_deterministic_and_redacted() -> Result<(), Box<dyn std::error::Error>> {
        let env = ExporterEnv {
            api_key: Some(SecretString::new("nr-live-123")),
            ..ExporterEnv::default()
        };
        let config = load_exporter_config_from_sources(None, None, &env)?;
        let first = to_pretty_json(&config)?;
        let second = to_pretty_json(&config)?;
        assert_eq!(first, second);
        assert!(!first.contains("nr-live-123"));

        let toml = to_pretty_toml(&config)?;
        assert!(toml.contains("harvestIntervalMs = 5000"));
        assert!(!toml.contains("nr-live-123"));
        Ok(())
    }

    #[test]
    fn invalid_config_value_overridden_by_valid_env_succeeds()
    -> Result<(), Box<dyn std::error::Error>> {
        // 500ms is below the minimum; env replaces it before validation runs.
        let config_json = r#"{ "harvestIntervalMs": 500 }"#;
        let env = ExporterEnv {
            harvest_interval_ms: Some(2_000),
            ..ExporterEnv::default()
        };

        let config = load_exporter_config_from_sources(Some(config_json), None, &env)?;
        assert_eq!(config.harvest_interval_ms, 2_000);
        Ok(())
    }

    #[test]
    fn valid_config_with_invalid_overrides_fails() -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{ "harvestIntervalMs": 10000 }"#;
        let overrides_json = r#"{ "harvestIntervalMs": }"#;

        let error = load_exporter_config_from_sources(
            Some(config_json),
            Some(overrides_json),
            &ExporterEnv::default(),
        )
        .err()
        .ok_or_else(|| std::io::Error::other("expected overrides error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "invalid_json"));
        assert_eq!(
            error.metadata.get("source").map(String::as_str),
            Some("overrides")
        );
        Ok(())
    }

    #[test]
    fn invalid_config_reports_config_source() -> Result<(), Box<dyn std::error::Error>> {
        let error = load_exporter_config_from_sources(
            Some(r#"{ "unknownField": 1 }"#),
            None,
            &ExporterEnv::default(),
        )
        .err()
        .ok_or_else(|| std::io::Error::other("expected config error"))?;
        assert_eq!(
            error.metadata.get("source").map(String::as_str),
            Some("config")
        );
        Ok(())
    }

    #[test]
    fn format_detection_uses_extension() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(
            detect_config_format(Path::new("exporter.json"))?,
            ConfigFormat::Json
        );
        assert_eq!(
            detect_config_format(Path::new("exporter.TOML"))?,
            ConfigFormat::Toml
        );
        assert_eq!(detect_config_format(Path::new("exporter"))?, ConfigFormat::Json);

        let error = detect_config_format(Path::new("exporter.yaml"))
            .err()
            .ok_or_else(|| std::io::Error::other("expected format error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "unsupported_format"));
        Ok(())
    }

    #[test]
    fn missing_config_file_is_reported() -> Result<(), Box<dyn std::error::Error>> {
        let error = load_exporter_config_from_path(
            Some(Path::new("/definitely/not/here/exporter.json")),
            None,
            &ExporterEnv::default(),
        )
        .err()
        .ok_or_else(|| std::io::Error::other("expected missing file error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "config_file_not_found"));
        Ok(())
    }
}
