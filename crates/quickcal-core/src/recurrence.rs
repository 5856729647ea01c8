//! Recurrence policies and their RRULE encoding.
//!
//! The form offers a fixed set of repeat choices. Each choice other than
//! [`Frequency::None`] encodes to exactly one `RRULE:` line bounded by an
//! `UNTIL` timestamp.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How often an event repeats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// The event happens once.
    #[default]
    None,
    /// Every day.
    Daily,
    /// Every Saturday and Sunday.
    WeeklyWeekend,
    /// Monday through Friday.
    WeeklyWeekday,
}

impl Frequency {
    /// All frequencies in selection-index order.
    pub const ALL: [Frequency; 4] = [
        Frequency::None,
        Frequency::Daily,
        Frequency::WeeklyWeekend,
        Frequency::WeeklyWeekday,
    ];

    /// Maps a repeat selector index to a frequency.
    ///
    /// Unknown indices mean "does not repeat".
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(Frequency::None)
    }

    /// Returns the selector index for this frequency.
    pub fn index(self) -> usize {
        match self {
            Self::None => 0,
            Self::Daily => 1,
            Self::WeeklyWeekend => 2,
            Self::WeeklyWeekday => 3,
        }
    }

    /// Returns the short name used on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::WeeklyWeekend => "weekend",
            Self::WeeklyWeekday => "weekday",
        }
    }

    /// Returns `true` if this frequency produces a recurrence rule.
    pub fn repeats(self) -> bool {
        self != Self::None
    }

    fn rule_body(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Daily => Some("FREQ=DAILY"),
            Self::WeeklyWeekend => Some("FREQ=WEEKLY;BYDAY=SA,SU"),
            Self::WeeklyWeekday => Some("FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR"),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "never" | "" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekend" | "weekly-weekend" | "weekends" => Ok(Self::WeeklyWeekend),
            "weekday" | "weekly-weekday" | "weekdays" => Ok(Self::WeeklyWeekday),
            other => Err(format!(
                "unknown repeat '{}': expected none, daily, weekend or weekday",
                other
            )),
        }
    }
}

/// A repeat policy bounded by an end timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceSpec {
    pub frequency: Frequency,
    pub until: DateTime<Utc>,
}

impl RecurrenceSpec {
    pub fn new(frequency: Frequency, until: DateTime<Utc>) -> Self {
        Self { frequency, until }
    }

    /// Encodes the policy as a single `RRULE:` line.
    ///
    /// Returns `None` for [`Frequency::None`].
    pub fn to_rule(&self) -> Option<String> {
        self.frequency
            .rule_body()
            .map(|body| format!("RRULE:{};UNTIL={}", body, format_until(self.until)))
    }
}

/// Renders an `UNTIL` value: UTC, second precision, basic ISO 8601 form.
pub fn format_until<Tz: chrono::TimeZone>(until: DateTime<Tz>) -> String {
    until
        .with_timezone(&Utc)
        .format("%Y%m%dT%H%M%SZ")
        .to_string()
}
