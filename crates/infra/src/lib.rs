//! # metrics-export-infra
//!
//! Infrastructure wiring and runtime composition: the exporter builder, the
//! periodic harvest scheduler, and config helpers for CLI surfaces.
//! This crate depends on `app`, `adapters`, `config`, and `shared`.

/// Coordinator builder.
pub mod builder;
/// Config loading helpers used by CLI surfaces.
pub mod config_check;
/// Environment validation helpers used by CLI surfaces.
pub mod env_check;
/// Config-driven exporter wiring.
pub mod runtime;
/// Periodic harvest loop.
pub mod scheduler;

pub use builder::ExporterBuilder;
pub use config_check::{load_effective_config, load_effective_config_json};
pub use env_check::{InfraError, InfraResult, validate_env_parsing};
pub use runtime::ExporterRuntime;
pub use scheduler::{HarvestScheduler, SchedulerSummary};

// Re-export redaction utilities for CLI boundary sanitization
pub use metrics_export_shared::{is_secret_key, redact_if_secret};
pub use tokio_util::sync::CancellationToken;

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_export_adapters::adapters_crate_version;
    use metrics_export_app::app_crate_version;
    use metrics_export_config::config_crate_version;
    use metrics_export_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;
        let mut in_dev_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                in_dev_deps = line == "[dev-dependencies]";
                continue;
            }
            if !(in_deps || in_dev_deps) {
                continue;
            }
            if line.starts_with("metrics-export-") {
                let key = line.split('=').next().unwrap_or("").trim();
                let name = key.split('.').next().unwrap_or("").trim();
                deps.push(name.to_string());
            }
        }

        deps
    }

    #[test]
    fn infra_depends_on_app_adapters_config() {
        let deps = workspace_deps();
        let required = [
            "metrics-export-app",
            "metrics-export-adapters",
            "metrics-export-config",
        ];

        for expected in required {
            assert!(
                deps.iter().any(|dep| dep == expected),
                "missing dependency: {expected}"
            );
        }
    }

    #[test]
    fn infra_can_use_app_adapters_config_shared() {
        assert!(!infra_crate_version().is_empty());
        assert!(!app_crate_version().is_empty());
        assert!(!adapters_crate_version().is_empty());
        assert!(!config_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
