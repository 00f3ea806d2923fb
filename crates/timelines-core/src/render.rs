use std::io::{self, IsTerminal, Write};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::dashboard::Dashboard;
use crate::events::{EventKind, EventRecord, TITLE_LINE_LIMIT};

const BAR_FILLED: char = '█';
const BAR_EMPTY: char = '░';
const COLUMN_GAP: usize = 3;
const ELLIPSIS: char = '…';

/// Column widths of the text dashboard, in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub timeline_width: usize,
    pub calendar_width: usize,
    pub note_width: usize,
}

impl Layout {
    /// Timelines get more room when the note column is hidden; `large`
    /// doubles everything.
    pub fn new(with_notes: bool, large: bool) -> Self {
        let timeline_width = if with_notes { 10 } else { 14 };
        let scale = if large { 2 } else { 1 };
        Self {
            timeline_width: timeline_width * scale,
            calendar_width: 24 * scale,
            note_width: 24 * scale,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    large: bool,
}

impl Renderer {
    /// Colour is only emitted when enabled and stdout is a terminal.
    pub fn new(color: bool, large: bool) -> Self {
        Self {
            color: color && io::stdout().is_terminal(),
            large,
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_dashboard(&self, dashboard: &Dashboard) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_text(&mut out, dashboard)
    }

    #[tracing::instrument(skip_all)]
    pub fn print_json(&self, dashboard: &Dashboard) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, dashboard)?;
        writeln!(out)?;
        Ok(())
    }

    pub fn write_text<W: Write>(&self, mut writer: W, dashboard: &Dashboard) -> anyhow::Result<()> {
        let layout = Layout::new(dashboard.notes.is_some(), self.large);

        let mut columns = vec![
            (self.timeline_column(dashboard, layout.timeline_width), layout.timeline_width),
            (self.calendar_column(&dashboard.events, layout.calendar_width), layout.calendar_width),
        ];
        if let Some(notes) = &dashboard.notes {
            columns.push((note_column(notes, layout.note_width), layout.note_width));
        }

        let height = columns.iter().map(|(lines, _)| lines.len()).max().unwrap_or(0);
        let last = columns.len().saturating_sub(1);

        for row in 0..height {
            let mut line = String::new();
            for (idx, (lines, width)) in columns.iter().enumerate() {
                let cell = lines.get(row).map(String::as_str).unwrap_or("");
                line.push_str(cell);
                if idx != last {
                    let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                    let padding = width.saturating_sub(visible) + COLUMN_GAP;
                    line.push_str(&" ".repeat(padding));
                }
            }
            writeln!(writer, "{}", line.trim_end())?;
        }

        Ok(())
    }

    fn timeline_column(&self, dashboard: &Dashboard, width: usize) -> Vec<String> {
        let mut lines = Vec::with_capacity(dashboard.progress.len() * 2);
        for unit in &dashboard.progress {
            lines.push(unit.label.clone());
            let filled = ((unit.fraction() * width as f64).round() as usize).min(width);
            let bar_filled: String = std::iter::repeat_n(BAR_FILLED, filled).collect();
            let bar_empty: String = std::iter::repeat_n(BAR_EMPTY, width - filled).collect();
            lines.push(format!("{}{}", self.paint(&bar_filled, "93"), self.paint(&bar_empty, "90")));
        }
        lines
    }

    fn calendar_column(&self, events: &[EventRecord], width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        for event in events {
            let glyph = self.paint_hex(event.kind.glyph(), &event.color);
            let title = wrap(&event.title, width.saturating_sub(2), TITLE_LINE_LIMIT);
            match event.kind {
                EventKind::AllDay => {
                    for (idx, part) in title.into_iter().enumerate() {
                        if idx == 0 {
                            lines.push(format!("{glyph} {part}"));
                        } else {
                            lines.push(format!("  {part}"));
                        }
                    }
                }
                EventKind::Timed => {
                    lines.push(format!("{glyph} {}", event.detail));
                    lines.extend(title.into_iter().map(|part| format!("  {part}")));
                }
            }
        }
        lines
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn paint_hex(&self, text: &str, hex: &str) -> String {
        match parse_hex_color(hex) {
            Some((r, g, b)) => self.paint(text, &format!("38;2;{r};{g};{b}")),
            None => text.to_string(),
        }
    }
}

fn note_column(notes: &[String], width: usize) -> Vec<String> {
    notes
        .iter()
        .flat_map(|note| wrap(note, width, TITLE_LINE_LIMIT))
        .collect()
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.trim().strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Word-wraps `text` to `width` cells, keeping at most `max_lines` lines.
/// A cut-off tail is marked with an ellipsis.
fn wrap(text: &str, width: usize, max_lines: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        let word_width = UnicodeWidthStr::width(word);
        let needed = if current.is_empty() { word_width } else { current_width + 1 + word_width };

        if needed <= width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_width = needed;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }

        for ch in word.chars() {
            let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
            if current_width + ch_width > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(ch);
            current_width += ch_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            while UnicodeWidthStr::width(last.as_str()) + 1 > width && last.pop().is_some() {}
            last.push(ELLIPSIS);
        }
    }

    lines
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{ProgressUnit, TimeScale};

    fn sample(notes: Option<Vec<String>>) -> Dashboard {
        Dashboard {
            date: "2026-10-17".to_string(),
            progress: vec![
                ProgressUnit {
                    scale: TimeScale::Week,
                    total: 7.0,
                    elapsed: 7.0,
                    label: "Sat".to_string(),
                },
                ProgressUnit {
                    scale: TimeScale::Year,
                    total: 12.0,
                    elapsed: 6.0,
                    label: "2026".to_string(),
                },
            ],
            events: vec![
                EventRecord {
                    kind: EventKind::AllDay,
                    title: "Holiday".to_string(),
                    color: "#ff0000".to_string(),
                    detail: String::new(),
                },
                EventRecord {
                    kind: EventKind::Timed,
                    title: "Standup".to_string(),
                    color: "#00ff00".to_string(),
                    detail: "9:00 AM-9:15 AM".to_string(),
                },
            ],
            notes,
        }
    }

    fn render(dashboard: &Dashboard) -> Vec<String> {
        let renderer = Renderer { color: false, large: false };
        let mut buf = Vec::new();
        renderer.write_text(&mut buf, dashboard).expect("render");
        String::from_utf8(buf)
            .expect("utf8")
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn renders_three_columns() {
        let lines = render(&sample(Some(vec!["⧠ buy milk".to_string()])));
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Sat"));
        assert!(lines[0].contains("\u{258D} Holiday"));
        assert!(lines[0].ends_with("⧠ buy milk"));
        assert!(lines[1].starts_with("██████████"));
        assert!(lines[1].contains("\u{2B24} 9:00 AM-9:15 AM"));
        assert!(lines[3].starts_with("█████░░░░░"));
    }

    #[test]
    fn wider_bars_without_notes() {
        let lines = render(&sample(None));
        assert!(lines[3].starts_with("███████░░░░░░░"));
        assert!(lines[2].contains("  Standup"));
    }

    #[test]
    fn wrap_respects_width_and_line_limit() {
        assert_eq!(wrap("quarterly planning review", 10, 3), vec!["quarterly", "planning", "review"]);
        let cut = wrap("one two three four five six seven", 9, 3);
        assert_eq!(cut.len(), 3);
        assert!(cut[2].ends_with(ELLIPSIS));
        assert_eq!(wrap("abcdefghij", 4, 3), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#ff9500"), Some((255, 149, 0)));
        assert_eq!(parse_hex_color("orange"), None);
    }
}
