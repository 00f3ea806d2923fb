//! One render pass: progress bars, events and note lines computed from a
//! single immutable context.

use anyhow::Context;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info};

use crate::calendar::Birthday;
use crate::config::{NoteSettings, Settings};
use crate::events::{EventRecord, HidePattern, select_events};
use crate::format::DateFormat;
use crate::notes::load_daily_note;
use crate::progress::{ProgressUnit, compute_progress_units};
use crate::sources::{EventSource, NoteStore};

/// Everything a render pass reads. Captured once, never mutated.
#[derive(Debug, Clone)]
pub struct DashboardContext {
    pub now: DateTime<Tz>,
    pub birthday: Birthday,
    pub estimated_lifespan: f64,
    pub hide_patterns: Vec<HidePattern>,
    pub event_limit: usize,
    pub note: Option<NoteSettings>,
    pub format: DateFormat,
}

impl DashboardContext {
    pub fn from_settings(now: DateTime<Tz>, settings: &Settings) -> Self {
        Self {
            now,
            birthday: settings.birthday,
            estimated_lifespan: settings.lifespan,
            hide_patterns: settings.hide_patterns.clone(),
            event_limit: settings.event_limit,
            note: settings.note.clone(),
            format: DateFormat::new(settings.clock),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub date: String,
    pub progress: Vec<ProgressUnit>,
    pub events: Vec<EventRecord>,
    /// `None` when the daily note column is disabled.
    pub notes: Option<Vec<String>>,
}

impl Dashboard {
    /// Computes the timelines and, concurrently, fetches and formats
    /// today's events and note. Host failures abort the pass.
    #[tracing::instrument(skip_all, fields(now = %ctx.now))]
    pub async fn build<E, N>(ctx: &DashboardContext, events: &E, notes: &N) -> anyhow::Result<Self>
    where
        E: EventSource,
        N: NoteStore,
    {
        let progress = compute_progress_units(
            &ctx.now,
            &ctx.birthday,
            ctx.estimated_lifespan,
            &ctx.format,
        )?;

        let fetch_events = async {
            let today = events
                .events_for_day(ctx.now.date_naive(), ctx.now.timezone())
                .await
                .context("failed to fetch today's events")?;
            debug!(count = today.len(), "fetched events");
            Ok::<_, anyhow::Error>(select_events(
                &today,
                &ctx.now,
                &ctx.hide_patterns,
                ctx.event_limit,
                &ctx.format,
            ))
        };

        let fetch_note = async {
            match &ctx.note {
                Some(note) => load_daily_note(notes, &ctx.now, &ctx.format, &note.empty_text)
                    .await
                    .map(Some)
                    .context("failed to load daily note"),
                None => Ok(None),
            }
        };

        let (events, notes) = tokio::try_join!(fetch_events, fetch_note)?;

        info!(
            progress = progress.len(),
            events = events.len(),
            notes = notes.as_ref().map(Vec::len),
            "built dashboard"
        );

        Ok(Self {
            date: ctx.format.timestamp(&ctx.now),
            progress,
            events,
            notes,
        })
    }
}
