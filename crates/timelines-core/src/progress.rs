//! Elapsed/total readings for the five dashboard timelines.

use std::fmt;

use chrono::{
  DateTime,
  Datelike,
  TimeZone,
  Timelike
};
use serde::ser::SerializeStruct;
use serde::{
  Serialize,
  Serializer
};
use tracing::debug;

use crate::calendar::{
  Birthday,
  days_in_month,
  fractional_age,
  ordinalize
};
use crate::error::ConfigError;
use crate::format::DateFormat;

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize
)]
#[serde(rename_all = "lowercase")]
pub enum TimeScale {
  Week,
  Day,
  Month,
  Year,
  Lifespan
}

/// How far `now` is through one period. `elapsed` and `total` share a
/// unit; only the lifespan reading may run past its total.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUnit {
  pub scale:   TimeScale,
  pub total:   f64,
  pub elapsed: f64,
  pub label:   String
}

impl ProgressUnit {
  /// Share of the bar to fill, clamped to `[0, 1]`. Degenerate totals
  /// give an empty bar.
  #[must_use]
  pub fn fraction(&self) -> f64 {
    if self.total <= 0.0 {
      return 0.0;
    }
    let raw = self.elapsed / self.total;
    if raw.is_finite() {
      raw.clamp(0.0, 1.0)
    } else {
      0.0
    }
  }
}

impl Serialize for ProgressUnit {
  fn serialize<S>(
    &self,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    let mut state = serializer
      .serialize_struct(
        "ProgressUnit",
        5
      )?;
    state
      .serialize_field("scale", &self.scale)?;
    state
      .serialize_field("total", &self.total)?;
    state.serialize_field(
      "elapsed",
      &self.elapsed
    )?;
    state
      .serialize_field("label", &self.label)?;
    state.serialize_field(
      "fraction",
      &self.fraction()
    )?;
    state.end()
  }
}

/// Week, day, month, year and lifespan readings, in that order.
#[tracing::instrument(skip_all, fields(birthday = %birthday, estimated_lifespan = estimated_lifespan))]
pub fn compute_progress_units<Tz>(
  now: &DateTime<Tz>,
  birthday: &Birthday,
  estimated_lifespan: f64,
  fmt: &DateFormat
) -> anyhow::Result<Vec<ProgressUnit>>
where
  Tz: TimeZone,
  Tz::Offset: fmt::Display
{
  if !estimated_lifespan.is_finite()
    || estimated_lifespan <= 0.0
  {
    return Err(
      ConfigError::InvalidLifespan(
        estimated_lifespan
      )
      .into()
    );
  }

  let week = ProgressUnit {
    scale:   TimeScale::Week,
    total:   7.0,
    elapsed: f64::from(
      now.weekday().num_days_from_sunday()
        + 1
    ),
    label:   fmt.day_of_week(now)
  };

  let day = ProgressUnit {
    scale:   TimeScale::Day,
    total:   MINUTES_PER_DAY,
    elapsed: f64::from(
      (now.hour() + 1) * 60 + now.minute()
    ),
    label:   ordinalize(now.day())
  };

  let month = ProgressUnit {
    scale:   TimeScale::Month,
    total:   f64::from(days_in_month(
      now.month(),
      now.year()
    )?),
    elapsed: f64::from(now.day()),
    label:   fmt.month(now)
  };

  let year = ProgressUnit {
    scale:   TimeScale::Year,
    total:   12.0,
    elapsed: f64::from(now.month()),
    label:   format!("{:04}", now.year())
  };

  let age = fractional_age(now, birthday)?;
  let lifespan = ProgressUnit {
    scale:   TimeScale::Lifespan,
    total:   estimated_lifespan,
    elapsed: age,
    label:   format!("{age:.3}")
  };

  let units =
    vec![week, day, month, year, lifespan];
  debug!(
    count = units.len(),
    age,
    "computed progress units"
  );
  Ok(units)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use chrono_tz::UTC;

  use super::*;

  fn units_at(
    y: i32,
    m: u32,
    d: u32,
    h: u32,
    min: u32
  ) -> Vec<ProgressUnit> {
    let now = UTC
      .with_ymd_and_hms(y, m, d, h, min, 0)
      .single()
      .expect("valid now");
    compute_progress_units(
      &now,
      &"1970-01-01"
        .parse()
        .expect("birthday"),
      75.0,
      &DateFormat::default()
    )
    .expect("units")
  }

  #[test]
  fn returns_five_units_in_fixed_order() {
    let units = units_at(2026, 10, 17, 12, 0);
    let scales: Vec<TimeScale> =
      units.iter().map(|u| u.scale).collect();
    assert_eq!(
      scales,
      vec![
        TimeScale::Week,
        TimeScale::Day,
        TimeScale::Month,
        TimeScale::Year,
        TimeScale::Lifespan
      ]
    );
    for unit in &units {
      assert!(unit.elapsed / unit.total >= 0.0);
    }
  }

  #[test]
  fn fills_expected_values() {
    // 2026-10-17 is a Saturday.
    let units = units_at(2026, 10, 17, 12, 0);

    assert_eq!(units[0].total, 7.0);
    assert_eq!(units[0].elapsed, 7.0);
    assert_eq!(units[0].label, "Sat");

    assert_eq!(units[1].total, 1440.0);
    assert_eq!(units[1].elapsed, 780.0);
    assert_eq!(units[1].label, "17th");

    assert_eq!(units[2].total, 31.0);
    assert_eq!(units[2].elapsed, 17.0);
    assert_eq!(units[2].label, "Oct");

    assert_eq!(units[3].total, 12.0);
    assert_eq!(units[3].elapsed, 10.0);
    assert_eq!(units[3].label, "2026");

    assert_eq!(units[4].total, 75.0);
    assert_eq!(units[4].label, "56.793");
  }

  #[test]
  fn sunday_is_first_day_of_week() {
    // 2026-10-18 is a Sunday.
    let units = units_at(2026, 10, 18, 0, 0);
    assert_eq!(units[0].elapsed, 1.0);
    assert_eq!(units[1].label, "18th");
    assert_eq!(units[1].elapsed, 60.0);
  }

  #[test]
  fn february_total_tracks_leap_years() {
    assert_eq!(
      units_at(2024, 2, 10, 9, 0)[2].total,
      29.0
    );
    assert_eq!(
      units_at(2023, 2, 10, 9, 0)[2].total,
      28.0
    );
  }

  #[test]
  fn fraction_is_clamped() {
    let late = units_at(2026, 10, 17, 23, 30);
    assert!(late[1].elapsed > late[1].total);
    assert_eq!(late[1].fraction(), 1.0);

    let over = ProgressUnit {
      scale:   TimeScale::Lifespan,
      total:   75.0,
      elapsed: 80.5,
      label:   "80.500".to_string()
    };
    assert_eq!(over.fraction(), 1.0);

    let empty = ProgressUnit {
      scale:   TimeScale::Lifespan,
      total:   0.0,
      elapsed: 10.0,
      label:   String::new()
    };
    assert_eq!(empty.fraction(), 0.0);
  }

  #[test]
  fn rejects_non_positive_lifespan() {
    let now = UTC
      .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
      .single()
      .expect("valid now");
    let birthday: Birthday =
      "1970-01-01".parse().expect("birthday");
    for lifespan in [0.0, -5.0, f64::NAN] {
      let err = compute_progress_units(
        &now,
        &birthday,
        lifespan,
        &DateFormat::default()
      )
      .expect_err("degenerate lifespan");
      assert!(
        err.downcast_ref::<ConfigError>()
          .is_some()
      );
    }
  }

  #[test]
  fn identical_inputs_give_identical_units()
  {
    assert_eq!(
      units_at(2026, 5, 4, 7, 45),
      units_at(2026, 5, 4, 7, 45)
    );
  }

  #[test]
  fn serializes_fraction() {
    let units = units_at(2026, 10, 17, 12, 0);
    let json = serde_json::to_value(&units[3])
      .expect("serialize");
    assert_eq!(json["scale"], "year");
    assert!(
      (json["fraction"]
        .as_f64()
        .expect("fraction")
        - 10.0 / 12.0)
        .abs()
        < 1e-12
    );
  }
}
