//! Test fixtures for shared error codes and envelopes.

use metrics_export_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of common error codes used in tests.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::invalid_input(),
        ErrorCode::timeout(),
        ErrorCode::io(),
        ErrorCode::internal(),
        ErrorCode::customizer_name_failed(),
        ErrorCode::customizer_attributes_failed(),
        ErrorCode::harvest_in_progress(),
        ErrorCode::harvest_send_failed(),
    ]
}

/// An invalid input error fixture.
pub fn invalid_input_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::invalid_input(), "invalid input")
}

/// A retriable sink failure, as a remote sender would report it.
pub fn sink_unavailable_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::io(), "sink unavailable", ErrorClass::Retriable)
        .with_metadata("endpoint", "memory://sink")
}

/// A retriable timeout error fixture.
pub fn timeout_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::timeout(), "timeout", ErrorClass::Retriable)
}
