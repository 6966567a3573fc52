// AI
//! 📊 progress.rs: "Are we there yet?" - every pipeline, every time, forever.
//!
//! 🚀 Two bars (read, written) while the migration runs, and a table so comfy it has
//! lumbar support once it's over.
//!
//! ⚠️  Warning: Watching this progress bar will not make it go faster.
//! Neither will refreshing it. We've tried. Science says no.
//!
//! 🧠 Knowledge graph:
//! - [`Progress`] is a cheap clone; every worker on one side of the channel shares one
//! - `advance(count)`: once per flushed batch on the bulk path, once per document on the
//!   file paths
//! - `grow_length(total)`: scroll cursors announce the hit count of their slice, so the bar
//!   learns its own length one slice at a time
//! - [`MigrationSummary`] is what `run()` hands back, and what the CLI prints
//!
//! 🦆 The duck has nothing to do with this module. It's just vibing.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// 🔢 Formats a number with commas for the 3 people in the audience who like readability.
/// "1000000 docs" → "1,000,000 docs" - you're welcome, eyes.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    // -- 🧵 pre-allocate like we know what we're doing (we do, we read the book)
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ Formats a Duration into MM:SS or HH:MM:SS.
/// If it shows HH:MM:SS, you should probably call your mom. It's been a while.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📈 One shared progress counter with a bar attached.
#[derive(Clone)]
pub(crate) struct Progress {
    bar: ProgressBar,
    counted: Arc<AtomicU64>,
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("Progress")
            .field("counted", &self.total())
            .finish()
    }
}

impl Progress {
    /// 🚀 A visible bar, added to the shared multi-bar display.
    pub(crate) fn new(display: &MultiProgress, label: &'static str) -> Self {
        let bar = display.add(ProgressBar::new(0));
        // -- 🎨 cyan because it's classy, blue because it's calm
        if let Ok(style) = ProgressStyle::with_template(
            "{prefix:>8} [{bar:40.cyan/blue}] {human_pos}/{human_len} docs ({per_sec}, {elapsed_precise})",
        ) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_prefix(label);
        Self {
            bar,
            counted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 🙈 Counts, never draws.
    #[cfg(test)]
    pub(crate) fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            counted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn advance(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.counted.fetch_add(count, Ordering::Relaxed);
        self.bar.inc(count);
    }

    /// 📏 Make the bar longer. Each scroll slice learns its total separately.
    pub(crate) fn grow_length(&self, total: u64) {
        self.bar.inc_length(total);
    }

    pub(crate) fn total(&self) -> u64 {
        self.counted.load(Ordering::Relaxed)
    }

    /// ✅ Ring the bell. We made it. (Or we hit EOF. Same energy.)
    pub(crate) fn finish(&self) {
        self.bar.finish();
    }
}

/// 🏁 What a finished migration reports back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationSummary {
    /// 📥 documents the producers pushed onto the channel
    pub documents_read: u64,
    /// 📤 documents the consumers flushed (bulk) or wrote (file)
    pub documents_written: u64,
    /// 📦 bulk requests sent, zero for a file sink
    pub batches: u64,
    /// 🗑️ documents dropped on either side after a rejection
    pub skipped: u64,
    /// ⚠️ producers that stopped before their input ran out
    pub producer_failures: u64,
    pub elapsed: Duration,
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 🍽️ two columns, no borders. minimalists. also the borders looked bad.
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);

        let rows = [
            ("documents read", format_number(self.documents_read)),
            ("documents written", format_number(self.documents_written)),
            ("bulk requests", format_number(self.batches)),
            ("skipped", format_number(self.skipped)),
            ("producers stopped early", format_number(self.producer_failures)),
            ("elapsed", format_duration(self.elapsed)),
        ];
        for (label, value) in rows {
            table.add_row(vec![
                Cell::new(label),
                Cell::new(value).set_alignment(CellAlignment::Right),
            ]);
        }
        write!(f, "{}", table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_big_numbers_get_commas() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn the_one_where_long_migrations_grow_an_hours_column() {
        assert_eq!(format_duration(Duration::from_secs(65)), "01:05");
        assert_eq!(format_duration(Duration::from_secs(3725)), "01:02:05");
    }

    #[test]
    fn the_one_where_clones_share_one_counter() {
        let progress = Progress::hidden();
        let the_clone = progress.clone();
        progress.advance(3);
        the_clone.advance(4);
        the_clone.advance(0);
        assert_eq!(progress.total(), 7);
    }

    #[test]
    fn the_one_where_the_summary_table_says_the_numbers_out_loud() {
        let summary = MigrationSummary {
            documents_read: 12000,
            documents_written: 11999,
            batches: 3,
            skipped: 1,
            producer_failures: 0,
            elapsed: Duration::from_secs(61),
        };
        let rendered = summary.to_string();
        assert!(rendered.contains("12,000"), "{rendered}");
        assert!(rendered.contains("11,999"), "{rendered}");
        assert!(rendered.contains("01:01"), "{rendered}");
    }
}
