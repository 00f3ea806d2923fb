use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeDelta,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

use crate::calendar::local_midnight;
use crate::error::ConfigError;

pub const TIMEZONE_ENV_VAR: &str =
  "TIMELINES_TIMEZONE";

/// Picks the dashboard timezone: explicit choice, then the environment,
/// then the system zone, then UTC.
#[tracing::instrument]
pub fn resolve_timezone(
  explicit: Option<&str>
) -> Result<Tz, ConfigError> {
  if let Some(raw) = explicit {
    return parse_timezone(raw);
  }

  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
  {
    match parse_timezone(&raw) {
      | Ok(tz) => return Ok(tz),
      | Err(err) => {
        tracing::warn!(
          source = TIMEZONE_ENV_VAR,
          error = %err,
          "ignoring invalid timezone"
        );
      }
    }
  }

  match iana_time_zone::get_timezone() {
    | Ok(name) => {
      match name.parse::<Tz>() {
        | Ok(tz) => {
          tracing::info!(
            timezone = %name,
            "using system timezone"
          );
          return Ok(tz);
        }
        | Err(err) => {
          tracing::warn!(
            timezone = %name,
            error = %err,
            "system timezone unknown to tz database"
          );
        }
      }
    }
    | Err(err) => {
      tracing::warn!(
        error = %err,
        "failed to read system timezone"
      );
    }
  }

  tracing::warn!(
    "falling back to UTC"
  );
  Ok(chrono_tz::UTC)
}

pub fn parse_timezone(
  raw: &str
) -> Result<Tz, ConfigError> {
  let trimmed = raw.trim();
  trimmed.parse::<Tz>().map_err(|_| {
    ConfigError::InvalidTimezone(
      trimmed.to_string()
    )
  })
}

fn to_utc_from_local(
  local_naive: NaiveDateTime,
  tz: &Tz,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in timezone {tz}: \
         {context}"
      ))
    }
  }
}

/// Parses the instant the dashboard is drawn for, relative to `now` and
/// read in `tz`.
#[tracing::instrument(skip(now, tz), fields(input = input))]
pub fn parse_now_expr(
  input: &str,
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<DateTime<Tz>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  let local_today = now
    .with_timezone(tz)
    .date_naive();
  let day_offset = match lower.as_str() {
    | "now" => {
      return Ok(now.with_timezone(tz));
    }
    | "today" => Some(0),
    | "tomorrow" => Some(1),
    | "yesterday" => Some(-1),
    | _ => None
  };
  if let Some(days) = day_offset {
    let date = local_today
      .checked_add_signed(
        TimeDelta::days(days)
      )
      .ok_or_else(|| {
        anyhow!(
          "date out of range: {token}"
        )
      })?;
    return local_midnight(date, tz);
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let duration = match unit {
      | "d" => TimeDelta::try_days(num),
      | "h" => TimeDelta::try_hours(num),
      | "m" => {
        TimeDelta::try_minutes(num)
      }
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ))
      }
    }
    .ok_or_else(|| {
      anyhow!(
        "relative offset out of \
         range: {token}"
      )
    })?;

    let shifted = if sign == "-" {
      now.checked_sub_signed(duration)
    } else {
      now.checked_add_signed(duration)
    }
    .ok_or_else(|| {
      anyhow!(
        "date out of range: {token}"
      )
    })?;
    return Ok(shifted.with_timezone(tz));
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.with_timezone(tz));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return local_midnight(date, tz);
  }

  for fmt in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return to_utc_from_local(
        ndt, tz, fmt
      )
      .map(|utc| utc.with_timezone(tz));
    }
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     +Nd/+Nh/+Nm, RFC3339, \
     YYYY-MM-DD, YYYY-MM-DDTHH:MM, \
     YYYY-MM-DD HH:MM"
  })
}
