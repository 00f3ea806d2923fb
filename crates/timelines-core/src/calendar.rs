//! Calendar arithmetic behind the month and lifespan timelines.

use std::fmt;
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  TimeZone,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  trace,
  warn
};

use crate::error::ConfigError;

const MILLIS_PER_DAY: f64 =
  24.0 * 60.0 * 60.0 * 1000.0;

/// True iff February of `year` has 29 days.
#[must_use]
pub fn is_leap_year(year: i32) -> bool {
  NaiveDate::from_ymd_opt(year, 2, 29)
    .is_some()
}

/// Day count of the 1-indexed `month` in `year`, taken as the day before
/// the first of the following month.
pub fn days_in_month(
  month: u32,
  year: i32
) -> Result<u32, ConfigError> {
  if !(1..=12).contains(&month) {
    return Err(
      ConfigError::InvalidMonth(month)
    );
  }

  let (next_year, next_month) =
    if month == 12 {
      (year.saturating_add(1), 1)
    } else {
      (year, month + 1)
    };

  NaiveDate::from_ymd_opt(
    next_year, next_month, 1
  )
  .and_then(|first| first.pred_opt())
  .map(|last| last.day())
  .ok_or_else(|| {
    ConfigError::InvalidValue {
      key:   "year".to_string(),
      value: year.to_string()
    }
  })
}

/// Simplified ordinal: only 1 and 2 get their own suffix.
#[must_use]
pub fn ordinalize(day: u32) -> String {
  match day {
    | 1 => "1st".to_string(),
    | 2 => "2nd".to_string(),
    | n => format!("{n}th")
  }
}

/// A birth date. The full date is the absolute anchor for whole years;
/// month and day mark the yearly anniversary.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
#[serde(
  try_from = "String",
  into = "String"
)]
pub struct Birthday {
  date: NaiveDate
}

impl Birthday {
  #[must_use]
  pub fn new(date: NaiveDate) -> Self {
    Self {
      date
    }
  }

  #[must_use]
  pub fn date(&self) -> NaiveDate {
    self.date
  }

  #[must_use]
  pub fn month(&self) -> u32 {
    self.date.month()
  }

  #[must_use]
  pub fn day(&self) -> u32 {
    self.date.day()
  }

  /// The anniversary date inside `year`. February 29 overflows into
  /// March 1 on common years.
  #[must_use]
  pub fn anniversary_in(
    &self,
    year: i32
  ) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
      year,
      self.month(),
      self.day()
    )
    .or_else(|| {
      if self.month() == 2
        && self.day() == 29
      {
        NaiveDate::from_ymd_opt(
          year, 3, 1
        )
      } else {
        None
      }
    })
  }
}

/// Moves `date` into `year`, keeping month and day. February 29 lands
/// on March 1 in a common year.
fn shift_year(
  date: NaiveDate,
  year: i32
) -> Option<NaiveDate> {
  date.with_year(year).or_else(|| {
    if date.month() == 2
      && date.day() == 29
    {
      NaiveDate::from_ymd_opt(year, 3, 1)
    } else {
      None
    }
  })
}

impl FromStr for Birthday {
  type Err = ConfigError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    NaiveDate::parse_from_str(
      s.trim(),
      "%Y-%m-%d"
    )
    .map(Self::new)
    .map_err(|_| {
      ConfigError::InvalidBirthday(
        s.to_string()
      )
    })
  }
}

impl TryFrom<String> for Birthday {
  type Error = ConfigError;

  fn try_from(
    value: String
  ) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Birthday> for String {
  fn from(value: Birthday) -> Self {
    value.to_string()
  }
}

impl fmt::Display for Birthday {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{}",
      self.date.format("%Y-%m-%d")
    )
  }
}

/// The two halves of a lifespan age reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeBreakdown {
  /// Years elapsed, read off a raw instant subtraction from the birth
  /// date.
  pub whole_years: i32,
  /// Share of the current year elapsed since the last anniversary.
  pub fraction:    f64
}

impl AgeBreakdown {
  #[must_use]
  pub fn total(&self) -> f64 {
    f64::from(self.whole_years)
      + self.fraction
  }
}

/// Local midnight of `date`. Gaps resolve to the first valid instant
/// after midnight; ambiguous times take the earliest mapping.
pub fn local_midnight<Tz: TimeZone>(
  date: NaiveDate,
  tz: &Tz
) -> anyhow::Result<DateTime<Tz>> {
  let midnight = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| {
      anyhow!(
        "failed to construct midnight \
         for {date}"
      )
    })?;

  for minutes in (0..=180).step_by(15) {
    let candidate = midnight
      + Duration::minutes(minutes);
    match tz
      .from_local_datetime(&candidate)
    {
      | LocalResult::Single(dt) => {
        return Ok(dt);
      }
      | LocalResult::Ambiguous(
        first,
        second
      ) => {
        trace!(%date, "ambiguous local midnight; using earliest");
        return Ok(
          if first <= second {
            first
          } else {
            second
          }
        );
      }
      | LocalResult::None => {
        warn!(
          %date,
          minutes,
          "local midnight falls in a gap; probing later"
        );
      }
    }
  }

  Err(anyhow!(
    "no valid local time near \
     midnight of {date}"
  ))
}

/// Splits the age at `now` into whole years and the fraction of the
/// current year since the last anniversary.
///
/// The two parts come from different anchors: whole years are read from
/// `now - birth` laid onto the Unix epoch, the fraction from the most
/// recent anniversary. Close to an anniversary they can disagree by one
/// year.
#[tracing::instrument(skip_all, fields(birthday = %birthday))]
pub fn age_breakdown<Tz: TimeZone>(
  now: &DateTime<Tz>,
  birthday: &Birthday
) -> anyhow::Result<AgeBreakdown> {
  let tz = now.timezone();
  let year = now.year();

  let anniversary = birthday
    .anniversary_in(year)
    .ok_or_else(|| {
      anyhow!(
        "no anniversary of {birthday} \
         in {year}"
      )
    })?;
  let mut last_birthday =
    local_midnight(anniversary, &tz)?;

  let on_birthday = now.month()
    == birthday.month()
    && now.day() == birthday.day();
  if last_birthday > *now && !on_birthday
  {
    let previous =
      shift_year(anniversary, year - 1)
        .ok_or_else(|| {
          anyhow!(
            "no date {anniversary} \
             in {}",
            year - 1
          )
        })?;
    last_birthday =
      local_midnight(previous, &tz)?;
  }

  let since_last = now
    .clone()
    .signed_duration_since(
      last_birthday
    )
    .num_milliseconds();
  let days_this_year =
    if is_leap_year(year) {
      366.0
    } else {
      365.0
    };
  let fraction = since_last as f64
    / (days_this_year * MILLIS_PER_DAY);

  let born =
    local_midnight(birthday.date(), &tz)?;
  let lived = now
    .clone()
    .signed_duration_since(born)
    .num_milliseconds();
  let as_epoch =
    DateTime::<Utc>::from_timestamp_millis(
      lived
    )
    .context(
      "age out of representable range"
    )?;
  let whole_years =
    (as_epoch.year() - 1970).abs();

  trace!(
    whole_years,
    fraction,
    "computed age breakdown"
  );

  Ok(AgeBreakdown {
    whole_years,
    fraction
  })
}

/// Age in years at `now`, as drawn on the lifespan timeline.
pub fn fractional_age<Tz: TimeZone>(
  now: &DateTime<Tz>,
  birthday: &Birthday
) -> anyhow::Result<f64> {
  age_breakdown(now, birthday)
    .map(|age| age.total())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use chrono_tz::UTC;

  use super::*;

  fn birthday(raw: &str) -> Birthday {
    raw.parse().expect("valid birthday")
  }

  #[test]
  fn days_in_month_matches_gregorian_table()
  {
    let common = [
      31, 28, 31, 30, 31, 30, 31, 31, 30,
      31, 30, 31
    ];
    for (idx, expected) in
      common.iter().enumerate()
    {
      let month = idx as u32 + 1;
      assert_eq!(
        days_in_month(month, 2023),
        Ok(*expected),
        "month {month}"
      );
    }

    assert_eq!(days_in_month(2, 2000), Ok(29));
    assert_eq!(days_in_month(2, 1900), Ok(28));
    assert_eq!(days_in_month(2, 2024), Ok(29));
    assert_eq!(days_in_month(2, 2023), Ok(28));
    assert_eq!(days_in_month(12, 2024), Ok(31));
  }

  #[test]
  fn days_in_month_rejects_bad_month() {
    assert_eq!(
      days_in_month(13, 2024),
      Err(ConfigError::InvalidMonth(13))
    );
    assert!(days_in_month(0, 2024).is_err());
  }

  #[test]
  fn leap_years_follow_gregorian_rule() {
    let years = [1900, 2000, 2023, 2024, 2100];
    let leap: Vec<bool> = years
      .iter()
      .map(|y| is_leap_year(*y))
      .collect();
    assert_eq!(
      leap,
      vec![false, true, false, true, false]
    );
  }

  #[test]
  fn ordinalize_uses_simplified_suffixes()
  {
    assert_eq!(ordinalize(1), "1st");
    assert_eq!(ordinalize(2), "2nd");
    assert_eq!(ordinalize(3), "3th");
    assert_eq!(ordinalize(21), "21th");
    assert_eq!(ordinalize(31), "31th");
  }

  #[test]
  fn leap_day_birthday_overflows_to_march() {
    let b = birthday("2000-02-29");
    assert_eq!(
      b.anniversary_in(2023),
      NaiveDate::from_ymd_opt(2023, 3, 1)
    );
    assert_eq!(
      b.anniversary_in(2024),
      NaiveDate::from_ymd_opt(2024, 2, 29)
    );
  }

  #[test]
  fn rejects_malformed_birthday() {
    assert!(matches!(
      "1970-13-01".parse::<Birthday>(),
      Err(ConfigError::InvalidBirthday(_))
    ));
  }

  #[test]
  fn fractional_age_after_birthday() {
    let now = UTC
      .with_ymd_and_hms(
        2026, 10, 17, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let age = age_breakdown(
      &now,
      &birthday("1970-01-01")
    )
    .expect("age");

    assert_eq!(age.whole_years, 56);
    assert!(
      (age.fraction - 289.5 / 365.0).abs()
        < 1e-9
    );
    assert!(
      (fractional_age(
        &now,
        &birthday("1970-01-01")
      )
      .expect("age")
        - 56.793_150_684)
        .abs()
        < 1e-6
    );
  }

  #[test]
  fn fraction_rolls_back_before_this_years_birthday()
   {
    let now = UTC
      .with_ymd_and_hms(
        2026, 3, 1, 0, 0, 0
      )
      .single()
      .expect("valid now");
    let age = age_breakdown(
      &now,
      &birthday("1980-06-15")
    )
    .expect("age");

    // 2025-06-15 .. 2026-03-01 is 259 days
    assert!(
      (age.fraction - 259.0 / 365.0).abs()
        < 1e-9
    );
  }

  #[test]
  fn leap_day_birthday_rolls_back_from_march_first() {
    // 2025 has no Feb 29, so this year's anniversary is Mar 1. Rolling
    // back keeps Mar 1 even though 2024 is a leap year.
    let now = UTC
      .with_ymd_and_hms(
        2025, 2, 15, 0, 0, 0
      )
      .single()
      .expect("valid now");
    let age = age_breakdown(
      &now,
      &birthday("2000-02-29")
    )
    .expect("age");

    // 2024-03-01 .. 2025-02-15 is 351 days
    assert!(
      (age.fraction - 351.0 / 365.0).abs()
        < 1e-9
    );
  }

  #[test]
  fn shift_year_keeps_month_and_day() {
    let mar1 =
      NaiveDate::from_ymd_opt(2025, 3, 1)
        .expect("valid date");
    assert_eq!(
      shift_year(mar1, 2024),
      NaiveDate::from_ymd_opt(2024, 3, 1)
    );
    let feb29 =
      NaiveDate::from_ymd_opt(2024, 2, 29)
        .expect("valid date");
    assert_eq!(
      shift_year(feb29, 2023),
      NaiveDate::from_ymd_opt(2023, 3, 1)
    );
  }

  #[test]
  fn fraction_is_zero_at_birthday_midnight()
  {
    let now = UTC
      .with_ymd_and_hms(
        2026, 6, 15, 0, 0, 0
      )
      .single()
      .expect("valid now");
    let age = age_breakdown(
      &now,
      &birthday("1980-06-15")
    )
    .expect("age");
    assert_eq!(age.fraction, 0.0);
  }

  #[test]
  fn whole_years_and_anchor_disagree_near_birthday()
   {
    // Half a day before turning 34. The epoch-based year count already
    // reads 34 while the anniversary anchor is still a year back, so the
    // reading is 34.998... rather than 33.998...
    let now = UTC
      .with_ymd_and_hms(
        2024, 6, 30, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let age = age_breakdown(
      &now,
      &birthday("1990-07-01")
    )
    .expect("age");

    assert_eq!(age.whole_years, 34);
    assert!(
      (age.fraction - 365.5 / 366.0).abs()
        < 1e-9
    );
    assert!(age.total() > 34.99);
  }

  #[test]
  fn age_is_stable_across_calls() {
    let now = UTC
      .with_ymd_and_hms(
        2026, 10, 17, 8, 30, 0
      )
      .single()
      .expect("valid now");
    let b = birthday("1985-11-02");
    assert_eq!(
      age_breakdown(&now, &b).expect("age"),
      age_breakdown(&now, &b).expect("age")
    );
  }

  #[test]
  fn midnight_in_dst_gap_moves_forward() {
    // Santiago springs forward at 00:00 on 2024-09-08.
    let tz = chrono_tz::America::Santiago;
    let date =
      NaiveDate::from_ymd_opt(2024, 9, 8)
        .expect("valid date");
    let resolved =
      local_midnight(date, &tz)
        .expect("resolves");
    assert_eq!(resolved.date_naive(), date);
  }
}
