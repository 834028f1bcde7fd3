//! Gauge payloads.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Value currently held by a gauge.
///
/// Gauges may hold payloads the exporter cannot represent. Only the numeric
/// variants widen to `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum GaugeValue {
    /// No value is available.
    Absent,
    /// Signed integer.
    Integer(i64),
    /// Unsigned integer.
    Unsigned(u64),
    /// Floating point.
    Float(f64),
    /// Arbitrary-precision decimal.
    Decimal(Decimal),
    /// Text payload.
    Text(String),
    /// Boolean payload.
    Boolean(bool),
}

impl GaugeValue {
    /// Widen numeric payloads to `f64`; `None` for absent or non-numeric values.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        reason = "gauge values are reported as doubles"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Unsigned(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Decimal(value) => value.to_f64(),
            Self::Absent | Self::Text(_) | Self::Boolean(_) => None,
        }
    }

    /// Returns true for variants that widen to `f64`.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Integer(_) | Self::Unsigned(_) | Self::Float(_) | Self::Decimal(_)
        )
    }

    /// Short label for diagnostics.
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Integer(_) => "integer",
            Self::Unsigned(_) => "unsigned",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Boolean(_) => "boolean",
        }
    }
}

impl<T: Into<Self>> From<Option<T>> for GaugeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl From<i64> for GaugeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for GaugeValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u64> for GaugeValue {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl From<f64> for GaugeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Decimal> for GaugeValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<&str> for GaugeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for GaugeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for GaugeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}
