//! Host collaborators: where events and daily notes come from.

use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::calendar::local_midnight;
use crate::events::CalendarEvent;

/// Supplies the events of one local day, ordered by start time.
pub trait EventSource {
    fn events_for_day(
        &self,
        day: NaiveDate,
        tz: Tz,
    ) -> impl Future<Output = anyhow::Result<Vec<CalendarEvent>>> + Send;
}

/// File storage holding daily notes, addressed by path relative to the
/// notes root. Files may live remotely until downloaded.
pub trait NoteStore {
    fn exists(&self, relative: &str) -> impl Future<Output = anyhow::Result<bool>> + Send;

    fn is_downloaded(&self, relative: &str) -> impl Future<Output = anyhow::Result<bool>> + Send;

    fn download(&self, relative: &str) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn read_to_string(&self, relative: &str)
    -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// Events stored as a JSON array with RFC 3339 instants.
#[derive(Debug, Clone)]
pub struct JsonEventSource {
    path: PathBuf,
}

impl JsonEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load_all(&self) -> anyhow::Result<Vec<CalendarEvent>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(file = %self.path.display(), "events file not found; no events");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()));
            }
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing events in {}", self.path.display()))
    }
}

impl EventSource for JsonEventSource {
    #[tracing::instrument(skip(self), fields(file = %self.path.display()))]
    async fn events_for_day(&self, day: NaiveDate, tz: Tz) -> anyhow::Result<Vec<CalendarEvent>> {
        let all = self.load_all().await?;
        let total = all.len();
        let events = events_overlapping_day(all, day, tz)?;
        debug!(total, kept = events.len(), "loaded events for day");
        Ok(events)
    }
}

/// Events intersecting the local `day`, stably sorted by start.
pub fn events_overlapping_day(
    events: Vec<CalendarEvent>,
    day: NaiveDate,
    tz: Tz,
) -> anyhow::Result<Vec<CalendarEvent>> {
    let day_start = local_midnight(day, &tz)?;
    let next_day = day
        .checked_add_signed(Duration::days(1))
        .with_context(|| format!("no day after {day}"))?;
    let day_end: DateTime<Tz> = local_midnight(next_day, &tz)?;

    let mut kept: Vec<CalendarEvent> = events
        .into_iter()
        .filter(|event| event.start < day_end && event.end > day_start)
        .collect();
    kept.sort_by_key(|event| event.start);
    Ok(kept)
}

/// Daily notes kept as plain files under a root directory. Everything on
/// disk counts as downloaded.
#[derive(Debug, Clone)]
pub struct DirNoteStore {
    root: PathBuf,
}

impl DirNoteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

impl NoteStore for DirNoteStore {
    async fn exists(&self, relative: &str) -> anyhow::Result<bool> {
        let path = self.resolve(relative);
        tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("failed to check {}", path.display()))
    }

    async fn is_downloaded(&self, _relative: &str) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn download(&self, relative: &str) -> anyhow::Result<()> {
        info!(note = relative, "local note store has nothing to download");
        Ok(())
    }

    async fn read_to_string(&self, relative: &str) -> anyhow::Result<String> {
        let path = self.resolve(relative);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }
}
