//! Daily note to-do extraction.

use std::fmt;

use chrono::{DateTime, TimeZone};
use tracing::{debug, info};

use crate::format::DateFormat;
use crate::sources::NoteStore;

/// Prefix of an open checklist item.
pub const UNCHECKED_MARKER: &str = "- [ ] ";

pub const NOTE_GLYPH: &str = "⧠ ";

pub const ALL_DONE_TEXT: &str = "✅ All done!";

pub const DEFAULT_EMPTY_TEXT: &str = "☀️ Rise and shine!";

pub const NOTE_LINE_LIMIT: usize = 4;

/// Open checklist items of `raw`, at most four, with the marker swapped
/// for a glyph. Never empty: without open items the all-done line is
/// returned.
pub fn extract_lines(raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = raw
        .lines()
        .filter_map(|line| line.strip_prefix(UNCHECKED_MARKER))
        .filter(|rest| !rest.is_empty())
        .take(NOTE_LINE_LIMIT)
        .map(|rest| format!("{NOTE_GLYPH}{rest}"))
        .collect();

    if lines.is_empty() {
        lines.push(ALL_DONE_TEXT.to_string());
    }

    lines
}

/// Reads today's note from `store` and extracts its open items. A note
/// that does not exist yields `empty_text`; store failures propagate.
#[tracing::instrument(skip_all)]
pub async fn load_daily_note<S, Tz>(
    store: &S,
    now: &DateTime<Tz>,
    fmt: &DateFormat,
    empty_text: &str,
) -> anyhow::Result<Vec<String>>
where
    S: NoteStore,
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let relative = fmt.note_relative_path(now);

    if !store.exists(&relative).await? {
        info!(note = %relative, "daily note missing");
        return Ok(vec![empty_text.to_string()]);
    }

    if !store.is_downloaded(&relative).await? {
        debug!(note = %relative, "downloading daily note");
        store.download(&relative).await?;
    }

    let raw = store.read_to_string(&relative).await?;
    let lines = extract_lines(&raw);
    debug!(note = %relative, count = lines.len(), "extracted note lines");
    Ok(lines)
}
