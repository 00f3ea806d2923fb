use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::calendar::Birthday;
use crate::datetime::parse_timezone;
use crate::error::ConfigError;
use crate::events::{
  DEFAULT_EVENT_LIMIT,
  HidePattern
};
use crate::format::ClockStyle;
use crate::notes::DEFAULT_EMPTY_TEXT;

pub const CONFIG_ENV_VAR: &str =
  "TIMELINES_CONFIG";
const CONFIG_DIR_NAME: &str = "timelines";
const CONFIG_FILE_NAME: &str =
  "timelines.toml";

/// Configuration as written in `timelines.toml`. Values stay raw until
/// [`Config::validate`] turns them into [`Settings`].
#[derive(
  Debug,
  Clone,
  PartialEq,
  Deserialize
)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub birthday: String,
  pub lifespan: f64,
  pub timezone: Option<String>,
  pub clock:    String,
  pub calendar: CalendarSection,
  pub note:     NoteSection,
  pub display:  DisplaySection,

  #[serde(skip)]
  pub loaded_files: Vec<PathBuf>
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Deserialize
)]
#[serde(default, deny_unknown_fields)]
pub struct CalendarSection {
  pub hide:        Vec<String>,
  pub limit:       usize,
  pub events_file: Option<PathBuf>
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Deserialize
)]
#[serde(default, deny_unknown_fields)]
pub struct NoteSection {
  pub enabled:    bool,
  pub dir:        Option<PathBuf>,
  pub empty_text: String
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Deserialize
)]
#[serde(default, deny_unknown_fields)]
pub struct DisplaySection {
  pub color: bool,
  pub large: bool
}

impl Default for Config {
  fn default() -> Self {
    Self {
      birthday:     "1970-01-01"
        .to_string(),
      lifespan:     75.0,
      timezone:     None,
      clock:        "12h".to_string(),
      calendar:     CalendarSection::default(),
      note:         NoteSection::default(),
      display:      DisplaySection::default(),
      loaded_files: vec![]
    }
  }
}

impl Default for CalendarSection {
  fn default() -> Self {
    Self {
      hide:        vec![
        r"/^\w+ Holidays$/".to_string(),
      ],
      limit:       DEFAULT_EVENT_LIMIT,
      events_file: None
    }
  }
}

impl Default for NoteSection {
  fn default() -> Self {
    Self {
      enabled:    true,
      dir:        None,
      empty_text: DEFAULT_EMPTY_TEXT
        .to_string()
    }
  }
}

impl Default for DisplaySection {
  fn default() -> Self {
    Self {
      color: true,
      large: false
    }
  }
}

/// Daily note settings of a validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSettings {
  pub dir:        PathBuf,
  pub empty_text: String
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
  pub birthday:      Birthday,
  pub lifespan:      f64,
  pub timezone:      Option<Tz>,
  pub clock:         ClockStyle,
  pub hide_patterns: Vec<HidePattern>,
  pub event_limit:   usize,
  pub events_file:   PathBuf,
  pub note:          Option<NoteSettings>,
  pub color:         bool,
  pub large:         bool
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let path =
      resolve_config_path(config_override)?;

    let Some(path) = path else {
      warn!(
        "no config file found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading config");
    Self::load_file(&path)
  }

  #[tracing::instrument]
  pub fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let mut cfg: Config =
      toml::from_str(&text)
        .with_context(|| {
          format!(
            "failed to parse {}",
            path.display()
          )
        })?;
    cfg.loaded_files.push(path);
    Ok(cfg)
  }

  /// Applies `KEY=VALUE` overrides on top of the loaded file.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> Result<(), ConfigError>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      debug!(key = %key, value = %value, "applying override");
      self.set(key.trim(), value.trim())?;
    }
    Ok(())
  }

  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> Result<(), ConfigError> {
    let invalid = || {
      ConfigError::InvalidValue {
        key:   key.to_string(),
        value: value.to_string()
      }
    };

    match key {
      | "birthday" => {
        self.birthday = value.to_string();
      }
      | "lifespan" => {
        self.lifespan = value
          .parse()
          .map_err(|_| invalid())?;
      }
      | "timezone" => {
        self.timezone =
          non_empty(value);
      }
      | "clock" => {
        self.clock = value.to_string();
      }
      | "calendar.hide" => {
        if value.is_empty() {
          self.calendar.hide.clear();
        } else {
          self
            .calendar
            .hide
            .push(value.to_string());
        }
      }
      | "calendar.limit" => {
        self.calendar.limit = value
          .parse()
          .map_err(|_| invalid())?;
      }
      | "calendar.events_file" => {
        self.calendar.events_file =
          non_empty(value)
            .map(PathBuf::from);
      }
      | "note.enabled" => {
        self.note.enabled =
          parse_bool(value)
            .ok_or_else(invalid)?;
      }
      | "note.dir" => {
        self.note.dir = non_empty(value)
          .map(PathBuf::from);
      }
      | "note.empty_text" => {
        self.note.empty_text =
          value.to_string();
      }
      | "display.color" => {
        self.display.color =
          parse_bool(value)
            .ok_or_else(invalid)?;
      }
      | "display.large" => {
        self.display.large =
          parse_bool(value)
            .ok_or_else(invalid)?;
      }
      | other => {
        return Err(
          ConfigError::UnknownKey(
            other.to_string()
          )
        );
      }
    }
    Ok(())
  }

  /// Checks every value and resolves default paths. Degenerate values
  /// fail here rather than during computation.
  #[tracing::instrument(skip(self))]
  pub fn validate(
    &self
  ) -> Result<Settings, ConfigError> {
    let birthday: Birthday =
      self.birthday.parse()?;

    if !self.lifespan.is_finite()
      || self.lifespan <= 0.0
    {
      return Err(
        ConfigError::InvalidLifespan(
          self.lifespan
        )
      );
    }

    if self.calendar.limit == 0 {
      return Err(
        ConfigError::InvalidLimit
      );
    }

    let timezone = self
      .timezone
      .as_deref()
      .map(parse_timezone)
      .transpose()?;
    let clock: ClockStyle =
      self.clock.parse()?;

    let hide_patterns = self
      .calendar
      .hide
      .iter()
      .map(|raw| HidePattern::parse(raw))
      .collect::<Result<Vec<_>, _>>()?;

    let events_file = self
      .calendar
      .events_file
      .as_deref()
      .map(expand_tilde)
      .unwrap_or_else(|| {
        default_data_dir()
          .join("events.json")
      });

    let note = self.note.enabled.then(|| {
      NoteSettings {
        dir:        self
          .note
          .dir
          .as_deref()
          .map(expand_tilde)
          .unwrap_or_else(|| {
            default_data_dir()
              .join("notes")
          }),
        empty_text: self
          .note
          .empty_text
          .clone()
      }
    });

    debug!(
      patterns = hide_patterns.len(),
      note_enabled = note.is_some(),
      "validated config"
    );

    Ok(Settings {
      birthday,
      lifespan: self.lifespan,
      timezone,
      clock,
      hide_patterns,
      event_limit: self.calendar.limit,
      events_file,
      note,
      color: self.display.color,
      large: self.display.large
    })
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if env_path == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      env_path
    )));
  }

  let config_dir = dirs::config_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine config \
         directory"
      )
    })?;
  let candidate = config_dir
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join(CONFIG_DIR_NAME)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn non_empty(s: &str) -> Option<String> {
  if s.is_empty() {
    None
  } else {
    Some(s.to_string())
  }
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}
