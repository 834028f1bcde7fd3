//! Secret detection and redaction utilities.
//!
//! Used when printing effective configuration and when logging the key an
//! exporter authenticates with.

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if a key/variable name likely refers to a secret.
///
/// # Examples
///
/// ```
/// use metrics_export_shared::is_secret_key;
///
/// assert!(is_secret_key("MEX_API_KEY"));
/// assert!(is_secret_key("apiKey"));
/// assert!(!is_secret_key("MEX_HARVEST_INTERVAL_MS"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    ["KEY", "TOKEN", "SECRET", "PASSWORD", "CREDENTIAL", "AUTH"]
        .iter()
        .any(|marker| key.contains(marker))
}

/// Redacts a value if the key is likely a secret.
///
/// # Examples
///
/// ```
/// use metrics_export_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("MEX_API_KEY", "nr-123"), "[REDACTED]");
/// assert_eq!(redact_if_secret("MEX_RATE_UNIT", "seconds"), "seconds");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// A secret string wrapper that redacts on Display/Debug.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecretString(Box<str>);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<Box<str>>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying secret.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}
