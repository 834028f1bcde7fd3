//! # metrics-export-core
//!
//! Core constants and implementation metadata for the metrics-export workspace.
//!
//! This crate has no dependencies on other workspace crates, making it safe to
//! import anywhere.
//!
//! ## Features
//!
//! - [`implementation_info()`] - Provider and version stamped onto every batch
//! - [`ImplementationInfo`] - Structured implementation metadata

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

/// Attribute key naming the instrumentation provider on every batch.
pub const PROVIDER_ATTRIBUTE: &str = "instrumentation.provider";

/// Attribute key carrying the exporter version on every batch.
pub const VERSION_ATTRIBUTE: &str = "collector.version";

/// Provider value reported under [`PROVIDER_ATTRIBUTE`].
pub const PROVIDER_NAME: &str = "metrics-export";

/// Sentinel used when the package version cannot be determined.
pub const UNKNOWN_VERSION: &str = "Unknown Version";

/// Metadata describing this exporter implementation.
///
/// Values are fixed at compile time and never change while the process runs.
///
/// # Example
///
/// ```
/// use metrics_export_core::implementation_info;
///
/// let info = implementation_info();
/// assert_eq!(info.provider, "metrics-export");
/// assert!(!info.version.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImplementationInfo {
    /// Provider name (`instrumentation.provider`).
    pub provider: &'static str,
    /// Exporter version (`collector.version`), or [`UNKNOWN_VERSION`].
    pub version: &'static str,
    /// Build profile ("debug" or "release").
    pub profile: &'static str,
}

impl ImplementationInfo {
    /// Returns true when the version could not be determined at build time.
    #[must_use]
    pub fn is_unknown_version(&self) -> bool {
        self.version.is_empty() || self.version == UNKNOWN_VERSION
    }
}

/// Returns the implementation metadata of this build.
#[must_use]
pub const fn implementation_info() -> ImplementationInfo {
    ImplementationInfo {
        provider: PROVIDER_NAME,
        version: implementation_version(),
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Returns the package version, falling back to [`UNKNOWN_VERSION`].
#[must_use]
pub const fn implementation_version() -> &'static str {
    match option_env!("CARGO_PKG_VERSION") {
        Some(version) if !version.is_empty() => version,
        _ => UNKNOWN_VERSION,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implementation_info_reports_provider() {
        let info = implementation_info();
        assert_eq!(info.provider, PROVIDER_NAME);
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert!(!info.is_unknown_version());
    }

    #[test]
    fn profile_matches_build() {
        let info = implementation_info();
        if cfg!(debug_assertions) {
            assert_eq!(info.profile, "debug");
        } else {
            assert_eq!(info.profile, "release");
        }
    }

    #[test]
    fn unknown_version_is_detected() {
        let info = ImplementationInfo {
            provider: PROVIDER_NAME,
            version: UNKNOWN_VERSION,
            profile: "debug",
        };
        assert!(info.is_unknown_version());
    }

    #[test]
    fn attribute_keys_are_stable() {
        assert_eq!(PROVIDER_ATTRIBUTE, "instrumentation.provider");
        assert_eq!(VERSION_ATTRIBUTE, "collector.version");
    }
}
