use crate::state::PageRecord;
use crate::url::host_slug;
use crate::PersistenceError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Disk spillover for page records once the in-memory buffer is full
///
/// The file at `<state-dir>/overflow_<domain>.json` holds one JSON array of
/// page records in completion order. Each spill extends it.
#[derive(Debug)]
pub struct OverflowBuffer {
    path: PathBuf,
    spilled: usize,
}

impl OverflowBuffer {
    pub fn new(state_dir: &Path, domain: &str) -> Self {
        Self {
            path: state_dir.join(format!("overflow_{}.json", host_slug(domain))),
            spilled: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written during this run
    pub fn spilled(&self) -> usize {
        self.spilled
    }

    /// Appends records to the overflow file
    ///
    /// On error the file is left as it was and the caller keeps the records.
    pub fn spill(&mut self, records: &[PageRecord]) -> Result<(), PersistenceError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut all = self.load_all()?;
        all.extend_from_slice(records);
        self.write_all(&all)?;
        self.spilled += records.len();

        tracing::debug!(
            "Spilled {} page records to {} ({} total)",
            records.len(),
            self.path.display(),
            all.len()
        );
        Ok(())
    }

    /// Reads every record in the overflow file; a missing file is empty
    pub fn load_all(&self) -> Result<Vec<PageRecord>, PersistenceError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).map_err(|source| self.io_error(source))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| PersistenceError::Json {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Reads every record and deletes the file
    pub fn drain(&mut self) -> Result<Vec<PageRecord>, PersistenceError> {
        let records = self.load_all()?;
        self.discard()?;
        Ok(records)
    }

    /// Deletes the overflow file if present
    pub fn discard(&mut self) -> Result<(), PersistenceError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|source| self.io_error(source))?;
        }
        self.spilled = 0;
        Ok(())
    }

    fn write_all(&self, records: &[PageRecord]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path).map_err(|source| self.io_error(source))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, records).map_err(|source| {
                PersistenceError::Json {
                    path: temp_path.display().to_string(),
                    source,
                }
            })?;
            writer.flush().map_err(|source| self.io_error(source))?;
        }

        std::fs::rename(&temp_path, &self.path).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
