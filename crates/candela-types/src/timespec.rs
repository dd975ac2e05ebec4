//! Timeframe unit and compression definitions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Timeframe unit for bar aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Tick-by-tick (every input bar is its own boundary).
    #[default]
    Tick,
    /// Second bars.
    Second,
    /// Minute bars.
    Minute,
    /// Daily bars.
    Day,
    /// ISO-week bars.
    Week,
    /// Calendar-month bars.
    Month,
    /// Calendar-year bars.
    Year,
}

impl TimeUnit {
    /// Returns true for units below one day (tick, second, minute).
    #[must_use]
    pub const fn is_subday(&self) -> bool {
        matches!(self, Self::Tick | Self::Second | Self::Minute)
    }

    /// Returns how many of this unit fit in one day, or None for units
    /// that are not clock-divisible (tick, day and above).
    #[must_use]
    pub const fn per_day(&self) -> Option<u32> {
        match self {
            Self::Second => Some(86_400),
            Self::Minute => Some(1_440),
            Self::Tick | Self::Day | Self::Week | Self::Month | Self::Year => None,
        }
    }

    /// Returns the unit as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tick => "t",
            Self::Second => "s",
            Self::Minute => "m",
            Self::Day => "d",
            Self::Week => "w",
            Self::Month => "mo",
            Self::Year => "y",
        }
    }

    /// Returns all available units.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Tick,
            Self::Second,
            Self::Minute,
            Self::Day,
            Self::Week,
            Self::Month,
            Self::Year,
        ]
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target timeframe: a unit plus a compression factor.
///
/// Compression groups several boundary crossings into one delivered bar,
/// e.g. `m5` delivers one bar per five minutes and `d2` one bar per two
/// trading sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpec {
    /// The timeframe unit.
    pub unit: TimeUnit,
    /// Number of boundary crossings grouped into one delivered bar (>= 1).
    pub compression: u32,
}

impl TimeSpec {
    /// Creates a new timespec. A compression of 0 is treated as 1.
    #[must_use]
    pub const fn new(unit: TimeUnit, compression: u32) -> Self {
        let compression = if compression == 0 { 1 } else { compression };
        Self { unit, compression }
    }

    /// Returns true for units below one day.
    #[must_use]
    pub const fn is_subday(&self) -> bool {
        self.unit.is_subday()
    }

    /// Returns true when clock-edge snapping is possible: the compression
    /// evenly divides the unit's subdivisions of one day.
    ///
    /// When this returns false for a sub-day unit, edge-aware aggregation
    /// degrades to plain tick-count grouping.
    #[must_use]
    pub const fn divides_day(&self) -> bool {
        match self.unit.per_day() {
            Some(per_day) => per_day % self.compression == 0,
            None => false,
        }
    }
}

impl Default for TimeSpec {
    fn default() -> Self {
        Self::new(TimeUnit::Minute, 1)
    }
}

impl std::fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.unit.as_str(), self.compression)
    }
}

impl FromStr for TimeSpec {
    type Err = TimeSpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower.is_empty() {
            return Err(TimeSpecParseError(s.to_string()));
        }

        // Accept "5m" as well as "m5".
        let leading_digits = lower.chars().take_while(char::is_ascii_digit).count();
        let (head, digits) = if leading_digits > 0 {
            let (num, alpha) = lower.split_at(leading_digits);
            (alpha.to_string(), num.to_string())
        } else {
            let split_at = lower
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or(lower.len());
            let (alpha, num) = lower.split_at(split_at);
            (alpha.to_string(), num.to_string())
        };

        let compression = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| TimeSpecParseError(s.to_string()))?
        };
        if compression == 0 {
            return Err(TimeSpecParseError(s.to_string()));
        }

        let unit = match head.as_str() {
            "t" | "tick" | "ticks" => TimeUnit::Tick,
            "s" | "sec" | "second" | "seconds" => TimeUnit::Second,
            "m" | "min" | "minute" | "minutes" => TimeUnit::Minute,
            "d" | "day" | "days" | "daily" => TimeUnit::Day,
            "w" | "week" | "weeks" | "weekly" => TimeUnit::Week,
            "mo" | "month" | "months" | "monthly" => TimeUnit::Month,
            "y" | "year" | "years" | "yearly" => TimeUnit::Year,
            _ => return Err(TimeSpecParseError(s.to_string())),
        };

        Ok(Self { unit, compression })
    }
}

/// Error returned when parsing an invalid timespec string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSpecParseError(String);

impl std::fmt::Display for TimeSpecParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid timespec '{}', expected <unit><compression> such as: t1, s30, m5, d1, w1, mo1, y1",
            self.0
        )
    }
}

impl std::error::Error for TimeSpecParseError {}
