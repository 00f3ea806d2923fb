use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "timelines",
    version,
    about = "Timelines: day, month, year and lifespan progress with today's events and to-dos"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Config file (defaults to $TIMELINES_CONFIG or the user config dir)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Config override, repeatable
    #[arg(
        long = "set",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub overrides: Vec<KeyVal>,

    /// Instant to draw the dashboard for (now, today, +2h, 2026-03-07 14:05, ...)
    #[arg(long = "now", default_value = "now")]
    pub now: String,

    /// Timezone of the dashboard calendar
    #[arg(long = "tz")]
    pub tz: Option<String>,

    /// JSON events file
    #[arg(long = "events")]
    pub events: Option<PathBuf>,

    /// Daily notes directory
    #[arg(long = "notes")]
    pub notes: Option<PathBuf>,

    #[arg(long = "json")]
    pub json: bool,

    #[arg(long = "large")]
    pub large: bool,

    #[arg(long = "no-color")]
    pub no_color: bool,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

impl GlobalCli {
    /// Command-line flags expressed as config overrides, applied after
    /// the explicit `--set` values.
    pub fn flag_overrides(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .overrides
            .iter()
            .map(|kv| (kv.key.clone(), kv.value.clone()))
            .collect();

        if let Some(tz) = &self.tz {
            out.push(("timezone".to_string(), tz.clone()));
        }
        if let Some(events) = &self.events {
            out.push(("calendar.events_file".to_string(), events.display().to_string()));
        }
        if let Some(notes) = &self.notes {
            out.push(("note.dir".to_string(), notes.display().to_string()));
        }
        if self.large {
            out.push(("display.large".to_string(), "on".to_string()));
        }
        if self.no_color {
            out.push(("display.color".to_string(), "off".to_string()));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parses_flags_into_overrides() {
        let cli = GlobalCli::parse_from([
            "timelines",
            "-vv",
            "--set",
            "lifespan=80",
            "--tz",
            "Europe/Paris",
            "--notes",
            "/tmp/notes",
            "--no-color",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.now, "now");
        assert_eq!(
            cli.flag_overrides(),
            vec![
                ("lifespan".to_string(), "80".to_string()),
                ("timezone".to_string(), "Europe/Paris".to_string()),
                ("note.dir".to_string(), "/tmp/notes".to_string()),
                ("display.color".to_string(), "off".to_string()),
            ]
        );
    }

    #[test]
    fn keyval_requires_equals() {
        assert!("lifespan".parse::<KeyVal>().is_err());
        assert_eq!(
            " note.enabled = off ".parse::<KeyVal>().expect("keyval"),
            KeyVal {
                key: "note.enabled".to_string(),
                value: "off".to_string(),
            }
        );
    }
}
