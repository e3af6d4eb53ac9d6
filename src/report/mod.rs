//! Reporter writing comparison outcomes and run metadata.
//!
//! Each report entry is its own numbered file, written as soon as it is
//! produced, so a long observe session never buffers its results and a
//! killed process still leaves everything reported so far on disk. The
//! metadata file is overwritten after every processed request with the
//! cumulative counters.

pub mod entry;
pub mod metadata;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::Mutex;
use uuid::Uuid;

pub use entry::{ReportEntry, ReportReason};
pub use metadata::RunMetadata;

use crate::error::ReportError;
use crate::mode::Mode;
use crate::ports::Clock;

/// Name of the metadata file inside the report directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Extension of report entry files.
pub const REPORT_EXTENSION: &str = "yaml";

/// Collects report entries and run metadata for one run.
pub struct Reporter {
    directory: PathBuf,
    clock: Arc<dyn Clock>,
    state: Mutex<RunMetadata>,
}

impl Reporter {
    /// Creates a reporter writing into `directory`. The run starts now.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, mode: Mode, clock: Arc<dyn Clock>) -> Self {
        let started = clock.now();
        Self {
            directory: directory.into(),
            clock,
            state: Mutex::new(RunMetadata::new(mode, started)),
        }
    }

    /// Directory receiving the report files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes one report entry under the next sequence number. Write
    /// failures are logged and otherwise ignored.
    pub async fn report(&self, entry: ReportEntry) {
        let index = {
            let mut state = self.state.lock().await;
            state.reports_number += 1;
            if entry.reason.is_mismatch() {
                state.mismatches += 1;
            }
            state.reports_number
        };
        match self.write_entry(index, &entry).await {
            Ok(path) => debug!("Report {:?} saved to {}", entry.reason, path.display()),
            Err(e) => error!("{e}"),
        }
    }

    /// Counts one processed request and rewrites the metadata file. Write
    /// failures are logged and otherwise ignored.
    pub async fn record_metadata(&self) {
        let mut state = self.state.lock().await;
        state.total_played += 1;
        state.finished = Some(self.clock.now());
        if let Err(e) = self.write_metadata(&state).await {
            error!("{e}");
        }
    }

    /// Current cumulative metadata.
    pub async fn snapshot(&self) -> RunMetadata {
        self.state.lock().await.clone()
    }

    /// Writes the final metadata and logs the run summary.
    pub async fn finish(&self) -> RunMetadata {
        let state = self.state.lock().await;
        if let Err(e) = self.write_metadata(&state).await {
            error!("{e}");
        }
        let mut message = format!("Generated {} reports.", state.reports_number);
        if state.reports_number > 0 {
            message.push_str(&format!(" Look to {} for details", self.directory.display()));
        }
        info!("{message}");
        info!("{}", state.summary_text(&self.directory));
        state.clone()
    }

    async fn write_entry(&self, index: u64, entry: &ReportEntry) -> Result<PathBuf, ReportError> {
        let yaml = serde_yaml::to_string(entry)?;
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| ReportError::Io { path: self.directory.clone(), source })?;

        let mut path = self.directory.join(format!("{index:03}.{REPORT_EXTENSION}"));
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let suffix = Uuid::new_v4().simple().to_string();
            path = self.directory.join(format!("{index:03}_{}.{REPORT_EXTENSION}", &suffix[..8]));
        }
        tokio::fs::write(&path, yaml)
            .await
            .map_err(|source| ReportError::Io { path: path.clone(), source })?;
        Ok(path)
    }

    async fn write_metadata(&self, metadata: &RunMetadata) -> Result<(), ReportError> {
        let path = self.directory.join(METADATA_FILE);
        let json = serde_json::to_vec_pretty(metadata)?;
        crate::persist::write_atomic(&path, &json)
            .await
            .map_err(|source| ReportError::Io { path, source })
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").field("directory", &self.directory).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::adapters::manual::ManualClock;
    use crate::model::{Headers, RequestRecord, ResponseRecord};
    use url::Url;

    fn entry(reason: ReportReason) -> ReportEntry {
        let url = Url::parse("http://api.local/x").unwrap();
        let request = RequestRecord::new("GET", &url, Headers::new(), Vec::new()).unwrap();
        let failure = ResponseRecord::upstream_failure("boom");
        let mut entry = ReportEntry::request_mismatch(&request, &failure);
        entry.reason = reason;
        entry
    }

    fn read_metadata(dir: &Path) -> RunMetadata {
        serde_json::from_slice(&std::fs::read(dir.join(METADATA_FILE)).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn entries_are_numbered_sequentially() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::new(dir.path(), Mode::Observe, Arc::new(ManualClock::default()));

        reporter.report(entry(ReportReason::RequestMismatch)).await;
        reporter.report(entry(ReportReason::ResponseMismatch)).await;

        assert!(dir.path().join("001.yaml").exists());
        assert!(dir.path().join("002.yaml").exists());
        let yaml = std::fs::read_to_string(dir.path().join("001.yaml")).unwrap();
        let first: ReportEntry = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(first.reason, ReportReason::RequestMismatch);
        assert!(first.original_response.is_none());
    }

    #[tokio::test]
    async fn existing_entry_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("001.yaml"), "keep me").unwrap();
        let reporter = Reporter::new(dir.path(), Mode::Observe, Arc::new(ManualClock::default()));

        reporter.report(entry(ReportReason::RequestMismatch)).await;

        assert_eq!(std::fs::read_to_string(dir.path().join("001.yaml")).unwrap(), "keep me");
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 2);
    }

    #[tokio::test]
    async fn metadata_tracks_cumulative_state() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let reporter = Reporter::new(dir.path(), Mode::Playback, clock.clone());

        reporter.report(entry(ReportReason::ResponseMatch)).await;
        reporter.record_metadata().await;
        clock.advance(Duration::from_secs(2));
        reporter.report(entry(ReportReason::ResponseMismatch)).await;
        reporter.record_metadata().await;

        let meta = read_metadata(dir.path());
        assert_eq!(meta.total_played, 2);
        assert_eq!(meta.reports_number, 2);
        assert_eq!(meta.mismatches, 1);
        assert_eq!(meta.mode, Mode::Playback);
        assert_eq!(meta.finished.unwrap() - meta.started, chrono::Duration::seconds(2));
    }

    #[tokio::test]
    async fn finish_writes_metadata_even_without_requests() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let reporter = Reporter::new(dir.path().join("run"), Mode::Serve, clock);
        let meta = reporter.finish().await;
        assert_eq!(meta.total_played, 0);
        assert_eq!(read_metadata(&dir.path().join("run")), meta);
    }

    #[tokio::test]
    async fn write_failures_do_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let reporter = Reporter::new(&blocker, Mode::Observe, Arc::new(ManualClock::default()));

        reporter.report(entry(ReportReason::RequestMismatch)).await;
        reporter.record_metadata().await;

        assert_eq!(reporter.snapshot().await.total_played, 1);
    }
}
