//! Selection and formatting of today's calendar events.

use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  TimeZone,
  Utc
};
use regex::Regex;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  trace
};

use crate::error::ConfigError;
use crate::format::DateFormat;

pub const DEFAULT_EVENT_LIMIT: usize = 4;

/// Renderers cut event titles to this many lines.
pub const TITLE_LINE_LIMIT: usize = 3;

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
pub struct Calendar {
  pub title: String,
  /// Display colour, `#rrggbb`.
  #[serde(default)]
  pub color: String
}

/// One event as handed over by the host calendar.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
pub struct CalendarEvent {
  pub title:    String,
  pub calendar: Calendar,
  #[serde(default)]
  pub all_day:  bool,
  pub start:    DateTime<Utc>,
  pub end:      DateTime<Utc>
}

impl CalendarEvent {
  #[must_use]
  pub fn kind(&self) -> EventKind {
    if self.all_day {
      EventKind::AllDay
    } else {
      EventKind::Timed
    }
  }
}

/// Calendar-name exclusion rule.
#[derive(Debug, Clone)]
pub enum HidePattern {
  Exact(String),
  Regex(Regex)
}

impl HidePattern {
  /// `/.../` compiles as a regular expression, anything else matches a
  /// calendar name exactly after trimming.
  pub fn parse(
    raw: &str
  ) -> Result<Self, ConfigError> {
    let inner = raw
      .strip_prefix('/')
      .and_then(|rest| {
        rest.strip_suffix('/')
      })
      .filter(|_| raw.len() >= 2);

    match inner {
      | Some(expr) => Regex::new(expr)
        .map(Self::Regex)
        .map_err(|err| {
          ConfigError::InvalidPattern {
            pattern: raw.to_string(),
            reason:  err.to_string()
          }
        }),
      | None => {
        Ok(Self::Exact(raw.to_string()))
      }
    }
  }

  #[must_use]
  pub fn matches(
    &self,
    calendar_title: &str
  ) -> bool {
    match self {
      | Self::Exact(name) => {
        name.trim() == calendar_title.trim()
      }
      | Self::Regex(re) => {
        re.is_match(calendar_title)
      }
    }
  }
}

impl FromStr for HidePattern {
  type Err = ConfigError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl fmt::Display for HidePattern {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Self::Exact(name) => {
        write!(f, "{name}")
      }
      | Self::Regex(re) => {
        write!(f, "/{}/", re.as_str())
      }
    }
  }
}

impl PartialEq for HidePattern {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      | (Self::Exact(a), Self::Exact(b)) => {
        a == b
      }
      | (Self::Regex(a), Self::Regex(b)) => {
        a.as_str() == b.as_str()
      }
      | _ => false
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize
)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
  AllDay,
  Timed
}

impl EventKind {
  /// Marker drawn in the calendar colour ahead of the event.
  #[must_use]
  pub fn glyph(self) -> &'static str {
    match self {
      | Self::AllDay => "\u{258D}",
      | Self::Timed => "\u{2B24}"
    }
  }
}

/// An event ready for display.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize
)]
pub struct EventRecord {
  pub kind:   EventKind,
  pub title:  String,
  pub color:  String,
  /// Empty for all-day events, a time range for timed ones.
  pub detail: String
}

/// Filters out hidden calendars and finished events, keeps the first
/// `limit` in the order given and formats them.
#[tracing::instrument(skip_all, fields(events = events.len(), patterns = hide_patterns.len(), limit = limit))]
pub fn select_events<Tz>(
  events: &[CalendarEvent],
  now: &DateTime<Tz>,
  hide_patterns: &[HidePattern],
  limit: usize,
  fmt: &DateFormat
) -> Vec<EventRecord>
where
  Tz: TimeZone,
  Tz::Offset: fmt::Display
{
  let records: Vec<EventRecord> = events
    .iter()
    .filter(|event| {
      let hidden =
        hide_patterns.iter().any(|p| {
          p.matches(&event.calendar.title)
        });
      if hidden {
        trace!(
          calendar = %event.calendar.title,
          title = %event.title,
          "event hidden by pattern"
        );
      }
      !hidden
    })
    .filter(|event| event.end > *now)
    .take(limit)
    .map(|event| {
      format_event(event, now, fmt)
    })
    .collect();

  debug!(
    selected = records.len(),
    "selected calendar events"
  );
  records
}

fn format_event<Tz>(
  event: &CalendarEvent,
  now: &DateTime<Tz>,
  fmt: &DateFormat
) -> EventRecord
where
  Tz: TimeZone,
  Tz::Offset: fmt::Display
{
  let kind = event.kind();
  let detail = match kind {
    | EventKind::AllDay => String::new(),
    | EventKind::Timed => {
      timed_detail(event, now, fmt)
    }
  };

  EventRecord {
    kind,
    title: event.title.clone(),
    color: event.calendar.color.clone(),
    detail
  }
}

/// `9:00 AM-10:00 AM`, `ends 11:00 AM`, `9:00 PM-Sat 1:00 AM`, ...
fn timed_detail<Tz>(
  event: &CalendarEvent,
  now: &DateTime<Tz>,
  fmt: &DateFormat
) -> String
where
  Tz: TimeZone,
  Tz::Offset: fmt::Display
{
  let tz = now.timezone();
  let start =
    event.start.with_timezone(&tz);
  let end = event.end.with_timezone(&tz);
  let today = now.date_naive();

  let mut detail = String::new();
  if start.date_naive() == today {
    detail.push_str(&fmt.time(&start));
    detail.push('-');
  } else {
    detail.push_str("ends ");
  }

  if end.date_naive() != today {
    detail.push_str(&fmt.day_of_week(&end));
    detail.push(' ');
  }

  detail.push_str(&fmt.time(&end));
  detail
}
