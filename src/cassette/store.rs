//! Shared cassette used by concurrently handled requests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use tokio::sync::RwLock;

use super::{Cassette, RecordMode};
use crate::error::CassetteError;
use crate::model::{Interaction, RequestRecord};

/// A cassette behind a single-writer, many-reader lock, bound to the path it
/// is persisted to and the record mode governing appends.
#[derive(Debug)]
pub struct CassetteStore {
    path: PathBuf,
    record_mode: RecordMode,
    cassette: RwLock<Cassette>,
    dirty: AtomicBool,
}

impl CassetteStore {
    /// Wraps an already loaded cassette.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, cassette: Cassette, record_mode: RecordMode) -> Self {
        Self {
            path: path.into(),
            record_mode,
            cassette: RwLock::new(cassette),
            dirty: AtomicBool::new(false),
        }
    }

    /// Path the cassette is loaded from and persisted to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Active record mode.
    #[must_use]
    pub fn record_mode(&self) -> RecordMode {
        self.record_mode
    }

    /// Copy of the first interaction whose request matches.
    pub async fn find_first_match(&self, request: &RequestRecord) -> Option<Interaction> {
        self.cassette.read().await.find_first_match(request).cloned()
    }

    /// Appends to the tail under the store's record mode.
    ///
    /// # Errors
    ///
    /// Returns an error when the record mode does not allow appends.
    pub async fn append(&self, interaction: Interaction) -> Result<(), CassetteError> {
        let mut cassette = self.cassette.write().await;
        cassette.append(interaction, self.record_mode)?;
        self.dirty.store(true, Ordering::Release);
        debug!("Cassette now holds {} interactions", cassette.len());
        Ok(())
    }

    /// Copy of every interaction in recorded order.
    pub async fn interactions(&self) -> Vec<Interaction> {
        self.cassette.read().await.interactions().to_vec()
    }

    /// Number of interactions.
    pub async fn len(&self) -> usize {
        self.cassette.read().await.len()
    }

    /// Whether there are no interactions.
    pub async fn is_empty(&self) -> bool {
        self.cassette.read().await.is_empty()
    }

    /// Persists the cassette if anything was appended since load. Safe to
    /// call more than once.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the cassette fails.
    pub async fn close(&self) -> Result<(), CassetteError> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            info!("Cassette {} unchanged, nothing to save", self.path.display());
            return Ok(());
        }
        let cassette = self.cassette.read().await;
        if let Err(e) = cassette.persist(&self.path).await {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::matching::RequestCriteria;
    use crate::model::{Headers, ResponseRecord};
    use url::Url;

    fn interaction() -> Interaction {
        let url = Url::parse("http://api.local/ping").unwrap();
        Interaction {
            request: RequestRecord::new("GET", &url, Headers::new(), Vec::new()).unwrap(),
            response: ResponseRecord::new(200, "OK", Headers::new(), b"pong".to_vec()),
            offset: Duration::ZERO,
            latency: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn close_writes_only_after_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.yml");
        let store =
            CassetteStore::new(&path, Cassette::new(RequestCriteria::all()), RecordMode::All);

        store.close().await.unwrap();
        assert!(!path.exists());

        store.append(interaction()).await.unwrap();
        store.append(interaction()).await.unwrap();
        store.close().await.unwrap();
        let loaded = Cassette::load(&path, RequestCriteria::all()).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn read_only_store_refuses_appends() {
        let cassette = Cassette::new(RequestCriteria::all());
        let store = CassetteStore::new("unused.yml", cassette, RecordMode::None);
        assert!(store.append(interaction()).await.is_err());
        assert!(store.is_empty().await);
    }
}
