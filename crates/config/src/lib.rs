//! # metrics-export-config
//!
//! Exporter configuration schema, validation, and normalization.
//! This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file + overrides).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigSchemaError, DEFAULT_HARVEST_INTERVAL_MS, DEFAULT_REPORTER_NAME,
    ExporterConfig, ValidatedExporterConfig, parse_exporter_config_json,
    parse_exporter_config_toml,
};

pub use env::{
    ENV_API_KEY, ENV_DISABLED_RATE_WINDOWS, ENV_DURATION_UNIT, ENV_HARVEST_INTERVAL_MS, ENV_NAME,
    ENV_OVERRIDE_URI, ENV_RATE_UNIT, ENV_REPORT_ON_STOP, EnvParseError, ExporterEnv,
    apply_env_overrides,
};
pub use load::{
    load_exporter_config_from_path, load_exporter_config_from_sources,
    load_exporter_config_std_env, to_pretty_json, to_pretty_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
