//! Cassette of recorded interactions.
//!
//! A [`Cassette`] is loaded once, looked up many times, appended to in
//! record mode and written back in full. Insertion order is chronology:
//! lookups scan it front to back and playback walks it in order.

pub mod format;
pub mod record_mode;
pub mod store;

use std::path::Path;

use chrono::Utc;
use log::{debug, info};

pub use format::CassetteFile;
pub use record_mode::RecordMode;
pub use store::CassetteStore;

use crate::error::CassetteError;
use crate::matching::{requests_match, RequestCriteria};
use crate::model::{Interaction, RequestRecord};
use format::StoredInteraction;

/// An ordered collection of interactions and the criteria used to match them.
#[derive(Debug, Clone)]
pub struct Cassette {
    interactions: Vec<Interaction>,
    criteria: RequestCriteria,
}

impl Cassette {
    /// Creates an empty cassette.
    #[must_use]
    pub fn new(criteria: RequestCriteria) -> Self {
        Self { interactions: Vec::new(), criteria }
    }

    /// Creates a cassette holding the given interactions in order.
    #[must_use]
    pub fn with_interactions(criteria: RequestCriteria, interactions: Vec<Interaction>) -> Self {
        Self { interactions, criteria }
    }

    /// Loads a cassette that must hold at least one interaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is absent, unreadable, malformed, holds
    /// an invalid interaction or holds none at all.
    pub fn load(path: &Path, criteria: RequestCriteria) -> Result<Self, CassetteError> {
        let cassette = Self::read(path, criteria)?;
        if cassette.is_empty() {
            return Err(CassetteError::Empty(path.to_path_buf()));
        }
        info!("Loaded {} request-response pairs from {}", cassette.len(), path.display());
        Ok(cassette)
    }

    /// Loads a cassette for recording. An absent or empty file yields a
    /// fresh cassette; a malformed one is still an error so it is never
    /// silently overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_empty(path: &Path, criteria: RequestCriteria) -> Result<Self, CassetteError> {
        match Self::read(path, criteria.clone()) {
            Ok(cassette) => {
                let existing = cassette.len();
                info!("Appending to {} with {existing} existing interactions", path.display());
                Ok(cassette)
            }
            Err(CassetteError::Missing(_)) => {
                info!("Starting a new cassette at {}", path.display());
                Ok(Self::new(criteria))
            }
            Err(e) => Err(e),
        }
    }

    fn read(path: &Path, criteria: RequestCriteria) -> Result<Self, CassetteError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CassetteError::Missing(path.to_path_buf()));
            }
            Err(source) => return Err(CassetteError::Read { path: path.to_path_buf(), source }),
        };
        if content.trim().is_empty() {
            return Ok(Self::new(criteria));
        }
        let file: CassetteFile = serde_yaml::from_str(&content)
            .map_err(|source| CassetteError::Parse { path: path.to_path_buf(), source })?;
        let interactions = file
            .interactions
            .iter()
            .enumerate()
            .map(|(index, stored)| {
                stored
                    .to_interaction()
                    .map_err(|source| CassetteError::InvalidInteraction { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { interactions, criteria })
    }

    /// Serializes every interaction in order and atomically replaces `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn persist(&self, path: &Path) -> Result<(), CassetteError> {
        let file = CassetteFile {
            recorded_at: Some(Utc::now()),
            interactions: self.interactions.iter().map(StoredInteraction::from).collect(),
        };
        let yaml = serde_yaml::to_string(&file)?;
        crate::persist::write_atomic(path, yaml.as_bytes())
            .await
            .map_err(|source| CassetteError::Write { path: path.to_path_buf(), source })?;
        info!("Saved {} interactions to {}", self.len(), path.display());
        Ok(())
    }

    /// The first interaction, in recorded order, whose request matches.
    #[must_use]
    pub fn find_first_match(&self, request: &RequestRecord) -> Option<&Interaction> {
        let found =
            self.interactions.iter().find(|i| requests_match(&i.request, request, &self.criteria));
        debug!(
            "Lookup {} {}: {}",
            request.method(),
            request.path(),
            if found.is_some() { "matched" } else { "no match" }
        );
        found
    }

    /// Appends to the tail when the record mode permits it.
    ///
    /// # Errors
    ///
    /// Returns an error when `mode` does not allow appends.
    pub fn append(
        &mut self,
        interaction: Interaction,
        mode: RecordMode,
    ) -> Result<(), CassetteError> {
        mode.check_append()?;
        self.interactions.push(interaction);
        Ok(())
    }

    /// Interactions in recorded order.
    #[must_use]
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Criteria used by [`Cassette::find_first_match`].
    #[must_use]
    pub fn criteria(&self) -> &RequestCriteria {
        &self.criteria
    }

    /// Number of interactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Whether there are no interactions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::RecordError;
    use crate::model::{Headers, ResponseRecord};
    use url::Url;

    fn interaction(path: &str, body: &str) -> Interaction {
        let url = Url::parse(&format!("http://api.local{path}")).unwrap();
        Interaction {
            request: RequestRecord::new("GET", &url, Headers::new(), Vec::new()).unwrap(),
            response: ResponseRecord::new(200, "OK", Headers::new(), body.as_bytes().to_vec()),
            offset: Duration::ZERO,
            latency: Duration::from_millis(10),
        }
    }

    #[test]
    fn first_recorded_match_wins_every_time() {
        let cassette = Cassette::with_interactions(
            RequestCriteria::all(),
            vec![
                interaction("/a", "first"),
                interaction("/b", "other"),
                interaction("/a", "second"),
            ],
        );
        let wanted = interaction("/a", "").request;
        for _ in 0..3 {
            let found = cassette.find_first_match(&wanted).unwrap();
            assert_eq!(found.response.body, b"first");
        }
        assert_eq!(cassette.len(), 3);
    }

    #[test]
    fn no_match_returns_none() {
        let cassette =
            Cassette::with_interactions(RequestCriteria::all(), vec![interaction("/a", "x")]);
        assert!(cassette.find_first_match(&interaction("/zzz", "").request).is_none());
    }

    #[test]
    fn append_follows_record_mode() {
        let mut cassette = Cassette::new(RequestCriteria::all());
        cassette.append(interaction("/a", "1"), RecordMode::All).unwrap();
        cassette.append(interaction("/a", "1"), RecordMode::All).unwrap();
        assert_eq!(cassette.len(), 2);

        assert!(cassette.append(interaction("/a", "1"), RecordMode::None).is_err());
        assert!(cassette.append(interaction("/a", "1"), RecordMode::NewEpisodes).is_err());
        assert_eq!(cassette.len(), 2);
    }

    #[test]
    fn load_rejects_missing_empty_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.yml");
        assert!(matches!(
            Cassette::load(&missing, RequestCriteria::all()),
            Err(CassetteError::Missing(_))
        ));

        let empty = dir.path().join("empty.yml");
        std::fs::write(&empty, "interactions: []\n").unwrap();
        assert!(matches!(
            Cassette::load(&empty, RequestCriteria::all()),
            Err(CassetteError::Empty(_))
        ));

        let broken = dir.path().join("broken.yml");
        std::fs::write(&broken, "interactions: {not: [a list").unwrap();
        assert!(matches!(
            Cassette::load(&broken, RequestCriteria::all()),
            Err(CassetteError::Parse { .. })
        ));
    }

    #[test]
    fn load_names_the_unaddressable_interaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cassette.yml");
        let yaml = "interactions:
  - request: {method: GET, url: 'http://api.local/ok', offset: 0}
    response: {status: {code: 200}, latency: 0}
  - request: {method: GET, url: 'not a url', offset: 0}
    response: {status: {code: 200}, latency: 0}
";
        std::fs::write(&path, yaml).unwrap();

        match Cassette::load(&path, RequestCriteria::all()) {
            Err(CassetteError::InvalidInteraction { index, source }) => {
                assert_eq!(index, 1);
                assert!(matches!(source, RecordError::InvalidUrl { .. }));
            }
            other => panic!("expected an invalid interaction, got {other:?}"),
        }
    }

    #[test]
    fn load_or_empty_starts_fresh_but_keeps_errors() {
        let dir = tempfile::tempdir().unwrap();
        let fresh =
            Cassette::load_or_empty(&dir.path().join("new.yml"), RequestCriteria::all()).unwrap();
        assert!(fresh.is_empty());

        let broken = dir.path().join("broken.yml");
        std::fs::write(&broken, "interactions: 7").unwrap();
        assert!(Cassette::load_or_empty(&broken, RequestCriteria::all()).is_err());
    }

    #[tokio::test]
    async fn persist_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cassette.yml");
        let cassette = Cassette::with_interactions(
            RequestCriteria::all(),
            vec![interaction("/one", "1"), interaction("/two", "2"), interaction("/three", "3")],
        );
        cassette.persist(&path).await.unwrap();

        let loaded = Cassette::load(&path, RequestCriteria::all()).unwrap();
        let paths: Vec<_> = loaded.interactions().iter().map(|i| i.request.path()).collect();
        assert_eq!(paths, vec!["/one", "/two", "/three"]);
        assert_eq!(loaded.interactions(), cassette.interactions());
    }
}
