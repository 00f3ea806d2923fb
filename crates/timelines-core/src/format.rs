//! Display formatting shared by the timeline labels, event details and
//! the daily note lookup.

use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  TimeZone
};
use serde::{
  Deserialize,
  Serialize
};

use crate::error::ConfigError;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
pub enum ClockStyle {
  #[default]
  #[serde(rename = "12h")]
  TwelveHour,
  #[serde(rename = "24h")]
  TwentyFourHour
}

impl FromStr for ClockStyle {
  type Err = ConfigError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "12h" | "12" => {
        Ok(Self::TwelveHour)
      }
      | "24h" | "24" => {
        Ok(Self::TwentyFourHour)
      }
      | other => Err(
        ConfigError::InvalidClock(
          other.to_string()
        )
      )
    }
  }
}

/// Fixed set of formatters applied to instants in the dashboard's local
/// calendar.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct DateFormat {
  pub clock: ClockStyle
}

impl DateFormat {
  pub fn new(clock: ClockStyle) -> Self {
    Self {
      clock
    }
  }

  /// `Mon`, `Tue`, ...
  pub fn day_of_week<Tz>(
    &self,
    t: &DateTime<Tz>
  ) -> String
  where
    Tz: TimeZone,
    Tz::Offset: fmt::Display
  {
    t.format("%a").to_string()
  }

  /// `Jan`, `Feb`, ...
  pub fn month<Tz>(
    &self,
    t: &DateTime<Tz>
  ) -> String
  where
    Tz: TimeZone,
    Tz::Offset: fmt::Display
  {
    t.format("%b").to_string()
  }

  /// Short date, e.g. `3/7/26`.
  pub fn date<Tz>(
    &self,
    t: &DateTime<Tz>
  ) -> String
  where
    Tz: TimeZone,
    Tz::Offset: fmt::Display
  {
    t.format("%-m/%-d/%y").to_string()
  }

  pub fn time<Tz>(
    &self,
    t: &DateTime<Tz>
  ) -> String
  where
    Tz: TimeZone,
    Tz::Offset: fmt::Display
  {
    let pattern = match self.clock {
      | ClockStyle::TwelveHour => {
        "%-I:%M %p"
      }
      | ClockStyle::TwentyFourHour => {
        "%H:%M"
      }
    };
    t.format(pattern).to_string()
  }

  /// ISO date key, `YYYY-MM-DD`.
  pub fn timestamp<Tz>(
    &self,
    t: &DateTime<Tz>
  ) -> String
  where
    Tz: TimeZone,
    Tz::Offset: fmt::Display
  {
    t.format("%Y-%m-%d").to_string()
  }

  /// File name of the daily note for the day containing `t`.
  pub fn note_relative_path<Tz>(
    &self,
    t: &DateTime<Tz>
  ) -> String
  where
    Tz: TimeZone,
    Tz::Offset: fmt::Display
  {
    format!("{}.md", self.timestamp(t))
  }
}
