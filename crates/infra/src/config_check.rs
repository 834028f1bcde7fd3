//! Config loading helpers for CLI surfaces.

use crate::InfraResult;
use metrics_export_config::{
    ExporterEnv, ValidatedExporterConfig, load_exporter_config_from_path, to_pretty_json,
};
use metrics_export_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::path::Path;

/// Load and validate the effective config from an env map, a file, and overrides.
pub fn load_effective_config(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> InfraResult<ValidatedExporterConfig> {
    let env = ExporterEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    load_exporter_config_from_path(config_path, overrides_json, &env)
}

/// Load and validate the effective config, returning deterministic pretty JSON.
pub fn load_effective_config_json(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> InfraResult<String> {
    let config = load_effective_config(env, config_path, overrides_json)?;
    to_pretty_json(&config)
}
