//! Time units, rate windows, and metric kinds.

use metrics_export_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parse failures for unit-like enums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitParseError {
    /// Unrecognized time unit name.
    UnknownTimeUnit {
        /// Raw input.
        input: String,
    },
    /// Unrecognized rate window name.
    UnknownRateWindow {
        /// Raw input.
        input: String,
    },
}

impl fmt::Display for UnitParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTimeUnit { input } => write!(
                formatter,
                "unknown time unit `{input}` (expected nanoseconds..days)"
            ),
            Self::UnknownRateWindow { input } => write!(
                formatter,
                "unknown rate window `{input}` (expected mean_rate, m1_rate, m5_rate, m15_rate)"
            ),
        }
    }
}

impl std::error::Error for UnitParseError {}

impl From<UnitParseError> for ErrorEnvelope {
    fn from(error: UnitParseError) -> Self {
        let (code, input) = match &error {
            UnitParseError::UnknownTimeUnit { input } => ("unknown_time_unit", input.clone()),
            UnitParseError::UnknownRateWindow { input } => ("unknown_rate_window", input.clone()),
        };
        Self::expected(ErrorCode::new("domain", code), error.to_string())
            .with_metadata("input", input)
    }
}

/// Unit of time used to scale rates and durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// 1e-9 seconds.
    Nanoseconds,
    /// 1e-6 seconds.
    Microseconds,
    /// 1e-3 seconds.
    Milliseconds,
    /// One second.
    Seconds,
    /// 60 seconds.
    Minutes,
    /// 3600 seconds.
    Hours,
    /// 86400 seconds.
    Days,
}

impl TimeUnit {
    /// Nanoseconds in one unit.
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        match self {
            Self::Nanoseconds => 1,
            Self::Microseconds => 1_000,
            Self::Milliseconds => 1_000_000,
            Self::Seconds => 1_000_000_000,
            Self::Minutes => 60_000_000_000,
            Self::Hours => 3_600_000_000_000,
            Self::Days => 86_400_000_000_000,
        }
    }

    /// Seconds in one unit.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        reason = "largest unit is 8.64e13 ns, exact in f64"
    )]
    pub const fn as_seconds(self) -> f64 {
        self.as_nanos() as f64 / 1e9
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nanoseconds => "nanoseconds",
            Self::Microseconds => "microseconds",
            Self::Milliseconds => "milliseconds",
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = UnitParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "ns" | "nanos" | "nanosecond" | "nanoseconds" => Ok(Self::Nanoseconds),
            "us" | "micros" | "microsecond" | "microseconds" => Ok(Self::Microseconds),
            "ms" | "millis" | "millisecond" | "milliseconds" => Ok(Self::Milliseconds),
            "s" | "sec" | "second" | "seconds" => Ok(Self::Seconds),
            "m" | "min" | "minute" | "minutes" => Ok(Self::Minutes),
            "h" | "hour" | "hours" => Ok(Self::Hours),
            "d" | "day" | "days" => Ok(Self::Days),
            _ => Err(UnitParseError::UnknownTimeUnit {
                input: input.to_string(),
            }),
        }
    }
}

/// One of the four rate windows a meter exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RateWindow {
    /// Mean rate since creation.
    #[serde(rename = "mean_rate")]
    Mean,
    /// One-minute moving average.
    #[serde(rename = "m1_rate")]
    OneMinute,
    /// Five-minute moving average.
    #[serde(rename = "m5_rate")]
    FiveMinute,
    /// Fifteen-minute moving average.
    #[serde(rename = "m15_rate")]
    FifteenMinute,
}

impl RateWindow {
    /// All windows in emission order.
    pub const ALL: [Self; 4] = [
        Self::Mean,
        Self::OneMinute,
        Self::FiveMinute,
        Self::FifteenMinute,
    ];

    /// Value of the `rate` attribute for this window.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Mean => "mean_rate",
            Self::OneMinute => "m1_rate",
            Self::FiveMinute => "m5_rate",
            Self::FifteenMinute => "m15_rate",
        }
    }
}

impl fmt::Display for RateWindow {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.code())
    }
}

impl FromStr for RateWindow {
    type Err = UnitParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "mean" | "mean_rate" => Ok(Self::Mean),
            "m1" | "m1_rate" => Ok(Self::OneMinute),
            "m5" | "m5_rate" => Ok(Self::FiveMinute),
            "m15" | "m15_rate" => Ok(Self::FifteenMinute),
            _ => Err(UnitParseError::UnknownRateWindow {
                input: input.to_string(),
            }),
        }
    }
}

/// The five kinds of registry metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Cumulative counter.
    Counter,
    /// Point-in-time gauge.
    Gauge,
    /// Sampled distribution.
    Histogram,
    /// Rate meter.
    Meter,
    /// Duration timer.
    Timer,
}

impl MetricKind {
    /// All kinds in harvest order.
    pub const ALL: [Self; 5] = [
        Self::Counter,
        Self::Gauge,
        Self::Histogram,
        Self::Meter,
        Self::Timer,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Meter => "meter",
            Self::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_unit_factors() {
        assert_eq!(TimeUnit::Milliseconds.as_nanos(), 1_000_000);
        assert!((TimeUnit::Minutes.as_seconds() - 60.0).abs() < f64::EPSILON);
        assert!((TimeUnit::Milliseconds.as_seconds() - 0.001).abs() < 1e-12);
    }

    #[test]
    fn time_unit_parses_aliases() {
        assert_eq!("ms".parse::<TimeUnit>(), Ok(TimeUnit::Milliseconds));
        assert_eq!(" Seconds ".parse::<TimeUnit>(), Ok(TimeUnit::Seconds));
        assert!(matches!(
            "fortnights".parse::<TimeUnit>(),
            Err(UnitParseError::UnknownTimeUnit { .. })
        ));
    }

    #[test]
    fn rate_window_codes_round_trip_through_parse() {
        for window in RateWindow::ALL {
            assert_eq!(window.code().parse::<RateWindow>(), Ok(window));
        }
        assert_eq!("m5".parse::<RateWindow>(), Ok(RateWindow::FiveMinute));
    }

    #[test]
    fn parse_errors_convert_to_envelopes() {
        let error = ErrorEnvelope::from(UnitParseError::UnknownRateWindow {
            input: "m2".to_string(),
        });
        assert_eq!(error.code, ErrorCode::new("domain", "unknown_rate_window"));
        assert_eq!(error.metadata.get("input").map(String::as_str), Some("m2"));
    }
}
