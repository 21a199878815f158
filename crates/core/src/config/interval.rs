//! Human-readable durations for config values.
//!
//! Accepts `"<n> <unit>"` terms (seconds, minutes, hours, days, weeks,
//! singular or plural, repeatable) or a bare integer of seconds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid interval {input:?}: {reason}")]
pub struct ParseIntervalError {
    input: String,
    reason: &'static str,
}

impl ParseIntervalError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// A duration parsed from config text, kept as whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval {
    secs: u64,
}

impl Interval {
    pub fn from_secs(secs: u64) -> Self {
        Self { secs }
    }

    pub fn as_secs(&self) -> u64 {
        self.secs
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} seconds", self.secs)
    }
}

impl FromStr for Interval {
    type Err = ParseIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIntervalError::new(s, "empty"));
        }
        // A bare number is already seconds.
        if let Ok(secs) = trimmed.parse::<u64>() {
            return Ok(Interval::from_secs(secs));
        }

        let mut total: u64 = 0;
        let mut parts = trimmed.split_whitespace();
        while let Some(amount) = parts.next() {
            let amount: u64 = amount
                .parse()
                .map_err(|_| ParseIntervalError::new(s, "expected a number"))?;
            let unit = parts
                .next()
                .ok_or_else(|| ParseIntervalError::new(s, "number without a unit"))?;
            let unit_secs = unit_to_secs(unit)
                .ok_or_else(|| ParseIntervalError::new(s, "unknown unit"))?;
            total = total
                .checked_add(amount.saturating_mul(unit_secs))
                .ok_or_else(|| ParseIntervalError::new(s, "overflow"))?;
        }
        Ok(Interval::from_secs(total))
    }
}

fn unit_to_secs(unit: &str) -> Option<u64> {
    match unit.to_ascii_lowercase().as_str() {
        "second" | "seconds" => Some(1),
        "minute" | "minutes" => Some(60),
        "hour" | "hours" => Some(3600),
        "day" | "days" => Some(86_400),
        "week" | "weeks" => Some(604_800),
        _ => None,
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.secs)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Interval::from_secs(secs)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}
