pub mod calendar;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod datetime;
pub mod error;
pub mod events;
pub mod format;
pub mod notes;
pub mod progress;
pub mod render;
pub mod sources;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::dashboard::{
  Dashboard,
  DashboardContext
};
use crate::sources::{
  DirNoteStore,
  JsonEventSource
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting timelines"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  info!(
    files = ?cfg.loaded_files,
    "loaded configuration"
  );
  cfg
    .apply_overrides(cli.flag_overrides())
    .context(
      "invalid configuration override"
    )?;
  let settings = cfg
    .validate()
    .context("invalid configuration")?;
  debug!(?settings, "resolved settings");

  let tz = datetime::resolve_timezone(
    settings
      .timezone
      .map(|tz| tz.name())
  )?;
  let now = datetime::parse_now_expr(
    &cli.now,
    Utc::now(),
    &tz
  )?;

  let ctx = DashboardContext::from_settings(
    now, &settings
  );
  let events = JsonEventSource::new(
    settings.events_file.clone()
  );
  let notes = DirNoteStore::new(
    settings
      .note
      .as_ref()
      .map(|note| note.dir.clone())
      .unwrap_or_default()
  );

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;
  let dashboard = runtime.block_on(
    Dashboard::build(
      &ctx, &events, &notes
    )
  )?;

  let renderer = render::Renderer::new(
    settings.color,
    settings.large
  );
  if cli.json {
    renderer.print_json(&dashboard)?;
  } else {
    renderer.print_dashboard(&dashboard)?;
  }

  info!("done");
  Ok(())
}
