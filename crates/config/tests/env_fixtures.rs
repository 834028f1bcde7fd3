//! Integration tests for env parsing and env-to-config merging.

use metrics_export_config::{
    EnvParseError, ExporterEnv, apply_env_overrides, load_exporter_config_from_path,
};
use metrics_export_domain::{RateWindow, TimeUnit};
use metrics_export_shared::{ErrorCode, SecretString};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

fn fixture_path(relative: &str) -> PathBuf {
    workspace_root()
        .join("crates")
        .join("testkit")
        .join("fixtures")
        .join(relative)
}

fn read_env_map(relative: &str) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
    let contents = fs::read_to_string(fixture_path(relative))?;
    Ok(serde_json::from_str(&contents)?)
}

#[test]
fn env_fixtures_merge_into_effective_config() -> Result<(), Box<dyn Error>> {
    let env_map = read_env_map("env/exporter-env.valid.json")?;
    let env = ExporterEnv::from_map(&env_map)?;

    let config = apply_env_overrides(Default::default(), &env)?;

    assert_eq!(
        config.api_key.as_ref().map(SecretString::expose),
        Some("nr-live-fixture")
    );
    assert_eq!(
        config.override_uri.as_deref(),
        Some("http://localhost:8080/ingest")
    );
    assert_eq!(config.rate_unit, TimeUnit::Seconds);
    assert_eq!(config.duration_unit, TimeUnit::Nanoseconds);
    assert_eq!(config.harvest_interval_ms, 60_000);
    assert!(!config.report_on_stop);
    assert!(!config.rate_window_enabled(RateWindow::Mean));
    assert!(!config.rate_window_enabled(RateWindow::OneMinute));
    assert!(config.rate_window_enabled(RateWindow::FiveMinute));

    Ok(())
}

#[test]
fn env_wins_over_config_file() -> Result<(), Box<dyn Error>> {
    let env_map = read_env_map("env/exporter-env.valid.json")?;
    let env = ExporterEnv::from_map(&env_map)?;

    let config = load_exporter_config_from_path(
        Some(&fixture_path("config/exporter-config.valid.json")),
        Some(r#"{ "harvestIntervalMs": 30000 }"#),
        &env,
    )?;

    assert_eq!(config.harvest_interval_ms, 60_000);
    assert_eq!(config.rate_unit, TimeUnit::Seconds);
    assert_eq!(config.name.as_ref(), "checkout-service");
    assert_eq!(
        config.disabled_rate_windows,
        vec![RateWindow::Mean, RateWindow::OneMinute]
    );

    Ok(())
}

#[test]
fn invalid_env_fixture_is_rejected() -> Result<(), Box<dyn Error>> {
    let env_map = read_env_map("env/exporter-env.invalid.json")?;
    let error = ExporterEnv::from_map(&env_map).err();
    assert!(matches!(error, Some(EnvParseError::InvalidUrl { .. })));

    let envelope: metrics_export_shared::ErrorEnvelope = error
        .ok_or_else(|| std::io::Error::other("expected invalid env error"))?
        .into();
    assert_eq!(envelope.code, ErrorCode::new("config", "invalid_env_url"));
    assert_eq!(
        envelope.metadata.get("env_var").map(String::as_str),
        Some("MEX_OVERRIDE_URI")
    );

    Ok(())
}
