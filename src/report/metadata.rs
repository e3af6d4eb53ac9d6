//! Cumulative run metadata and its human-readable summary.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mode::Mode;

/// Counters and timestamps describing a run so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Report entries written.
    pub reports_number: u64,
    /// Report entries describing a mismatch.
    #[serde(default)]
    pub mismatches: u64,
    /// When the run started.
    pub started: DateTime<Utc>,
    /// When the last request finished processing.
    pub finished: Option<DateTime<Utc>>,
    /// Requests processed.
    pub total_played: u64,
    /// Active mode.
    pub mode: Mode,
}

impl RunMetadata {
    /// Fresh metadata for a run starting at `started`.
    #[must_use]
    pub fn new(mode: Mode, started: DateTime<Utc>) -> Self {
        Self { reports_number: 0, mismatches: 0, started, finished: None, total_played: 0, mode }
    }

    /// Requests that did not produce a mismatch.
    #[must_use]
    pub fn successful(&self) -> u64 {
        self.total_played.saturating_sub(self.mismatches)
    }

    /// Multi-line summary of the run recorded in `report_dir`.
    #[must_use]
    pub fn summary_text(&self, report_dir: &Path) -> String {
        let finished = self.finished.unwrap_or(self.started);
        let elapsed = (finished - self.started).to_std().unwrap_or_default().as_secs_f64();
        format!(
            "Summary of '{dir}' recorded in '{mode}' mode:\n\
             \x20   Total requests played: {total}\n\
             \x20       Successful: {ok}\n\
             \x20       Reports generated: {reports}\n\
             \x20   Started at: {started}\n\
             \x20   Finished at: {finished}\n\
             \x20   Elapsed time: {elapsed:.3} sec",
            dir = report_dir.display(),
            mode = self.mode,
            total = self.total_played,
            ok = self.successful(),
            reports = self.reports_number,
            started = self.started.to_rfc2822(),
            finished = finished.to_rfc2822(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-15T14:30:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn summary_lists_counts_and_elapsed_time() {
        let started = started_at();
        let mut meta = RunMetadata::new(Mode::Observe, started);
        meta.total_played = 10;
        meta.reports_number = 3;
        meta.mismatches = 3;
        meta.finished = Some(started + chrono::Duration::milliseconds(2500));

        let text = meta.summary_text(Path::new("reports"));
        assert!(text.contains("'reports' recorded in 'observe' mode"));
        assert!(text.contains("Total requests played: 10"));
        assert!(text.contains("Successful: 7"));
        assert!(text.contains("Reports generated: 3"));
        assert!(text.contains("Elapsed time: 2.500 sec"));
    }

    #[test]
    fn clock_skew_reports_zero_elapsed_time() {
        let started = started_at();
        let mut meta = RunMetadata::new(Mode::Record, started);
        meta.finished = Some(started - chrono::Duration::seconds(3));

        assert!(meta.summary_text(Path::new("reports")).contains("Elapsed time: 0.000 sec"));
    }

    #[test]
    fn json_uses_documented_field_names() {
        let meta = RunMetadata::new(Mode::Playback, Utc::now());
        let json = serde_json::to_value(&meta).unwrap();
        for key in ["reports_number", "started", "finished", "total_played", "mode"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["mode"], "playback");
    }
}
