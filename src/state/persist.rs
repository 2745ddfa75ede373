use crate::state::{BrokenLinkRecord, CrawlTarget, PageRecord};
use crate::url::host_slug;
use crate::PersistenceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Snapshot of a crawl, written on a cadence and read back on resume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub domain: String,
    pub visited_urls: Vec<String>,
    pub to_visit: Vec<CrawlTarget>,
    /// Page records not in the overflow file when the snapshot was taken
    pub page_data: Vec<PageRecord>,
    pub broken_links: Vec<BrokenLinkRecord>,
    /// Visited URLs whose retries were exhausted
    #[serde(default)]
    pub failed_urls: Vec<String>,
    pub last_saved: DateTime<Utc>,
}

/// Reads and writes the state file of one target domain
///
/// The file lives at `<state-dir>/crawl_state_<domain>.json`.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(state_dir: &Path, domain: &str) -> Self {
        Self {
            path: state_dir.join(format!("crawl_state_{}.json", host_slug(domain))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Overwrites the state file
    ///
    /// The snapshot is written to a temporary file which is then renamed
    /// over the old one, so an interrupted save never leaves a torn file.
    pub fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let io_err = |source| PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path).map_err(io_err)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, state).map_err(|source| {
                PersistenceError::Json {
                    path: temp_path.display().to_string(),
                    source,
                }
            })?;
            writer.flush().map_err(io_err)?;
            writer.get_ref().sync_all().map_err(io_err)?;
        }

        std::fs::rename(&temp_path, &self.path).map_err(io_err)?;
        Ok(())
    }

    /// Loads the state file if one exists
    pub fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path).map_err(|source| PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        let state = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            PersistenceError::Json {
                path: self.path.display().to_string(),
                source,
            }
        })?;

        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::records::fixtures::page;
    use tempfile::TempDir;

    fn snapshot() -> PersistedState {
        PersistedState {
            domain: "example.com".to_string(),
            visited_urls: vec![
                "https://example.com/".to_string(),
                "https://example.com/gone".to_string(),
            ],
            to_visit: vec![
                CrawlTarget::new("https://example.com/b", 1),
                CrawlTarget::new("https://example.com/a", 1),
            ],
            page_data: vec![page("https://example.com/", 0)],
            broken_links: vec![BrokenLinkRecord {
                url: "https://example.com/gone".to_string(),
                status: 404,
                depth: 1,
            }],
            failed_urls: vec!["https://example.com/slow".to_string()],
            last_saved: Utc::now(),
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path(), "example.com");
        let state = snapshot();

        store.save(&state).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded, state);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_state_file_name_and_shape() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path(), "example.com");
        store.save(&snapshot()).unwrap();

        assert_eq!(
            store.path(),
            temp_dir.path().join("crawl_state_example.com.json")
        );

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["domain"], "example.com");
        assert_eq!(raw["to_visit"][0][0], "https://example.com/b");
        assert_eq!(raw["to_visit"][0][1], 1);
        assert!(raw["last_saved"].is_string());
    }

    #[test]
    fn test_failed_urls_default_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path(), "example.com");

        let mut raw = serde_json::to_value(snapshot()).unwrap();
        raw.as_object_mut().unwrap().remove("failed_urls");
        std::fs::write(store.path(), raw.to_string()).unwrap();

        assert!(store.load().unwrap().unwrap().failed_urls.is_empty());
    }

    #[test]
    fn test_missing_file_loads_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path(), "example.com");
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_creates_state_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(&temp_dir.path().join("nested/state"), "example.com");
        store.save(&snapshot()).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path(), "example.com");
        std::fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(PersistenceError::Json { .. })));
    }
}
