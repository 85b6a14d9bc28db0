//! File-backed rendezvous store
//!
//! A launched application appends `application % index % url` lines to a
//! shared text file; the host reads the URL back. The file is append-only from
//! the store's point of view: only the connection negotiator removes it, after
//! a successful connect.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::{Error, Result};

/// Field delimiter of a record line
pub const DELIMITER: char = '%';

/// One published endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendezvousRecord {
    pub application: String,
    pub index: u64,
    pub url: String,
}

impl RendezvousRecord {
    /// Parse one line of the rendezvous file
    pub fn parse(line: &str) -> Result<Self> {
        let mut fields = line.trim_end_matches(['\r', '\n']).splitn(3, DELIMITER);
        let (Some(application), Some(index), Some(url)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::InvalidRecord(line.to_string()));
        };
        let index = index
            .trim()
            .parse()
            .map_err(|_| Error::InvalidRecord(line.to_string()))?;

        Ok(Self {
            application: application.to_string(),
            index,
            url: url.trim_end().to_string(),
        })
    }
}

impl fmt::Display for RendezvousRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.application, DELIMITER, self.index, DELIMITER, self.url
        )
    }
}

/// Rendezvous file handle
#[derive(Debug, Clone)]
pub struct RendezvousStore {
    path: PathBuf,
}

impl RendezvousStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append a record for `application`
    ///
    /// The record's index is the running total of `1 + index` over every
    /// earlier record of the same application, `0` for a new file.
    pub fn store(&self, application: &str, url: &str) -> Result<RendezvousRecord> {
        for field in [application, url] {
            if field.contains(DELIMITER) || field.contains('\n') {
                return Err(Error::InvalidRecord(format!(
                    "field '{}' must not contain '{}' or a newline",
                    field, DELIMITER
                )));
            }
        }

        let index = self.next_index(application)?;
        let record = RendezvousRecord {
            application: application.to_string(),
            index,
            url: url.to_string(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // One write per line, so a concurrent reader never sees a torn record
        file.write_all(format!("{}\n", record).as_bytes())?;

        tracing::debug!(path = %self.path.display(), "Stored {}", record);
        Ok(record)
    }

    /// URL of the first record stored for `application`
    ///
    /// `Ok(None)` means nothing is published under that name yet. The file
    /// must exist; a missing file is an [`Error::Io`] with kind `NotFound`.
    pub fn retrieve(&self, application: &str) -> Result<Option<String>> {
        for record in self.records()? {
            if record.application == application {
                return Ok(Some(record.url));
            }
        }
        Ok(None)
    }

    /// Wait for the file to appear, then retrieve
    pub async fn wait_and_retrieve(
        &self,
        application: &str,
        poll_interval: Duration,
    ) -> Result<Option<String>> {
        while !self.exists() {
            tokio::time::sleep(poll_interval).await;
        }
        self.retrieve(application)
    }

    /// All well-formed records in file order
    ///
    /// Lines that do not parse are skipped: the last one may still be in the
    /// middle of being appended.
    pub fn records(&self) -> Result<Vec<RendezvousRecord>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match RendezvousRecord::parse(&line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::debug!(path = %self.path.display(), "Skipping line: {}", e),
            }
        }
        Ok(records)
    }

    /// Remove the backing file if present
    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn next_index(&self, application: &str) -> Result<u64> {
        if !self.exists() {
            return Ok(0);
        }
        Ok(self
            .records()?
            .iter()
            .filter(|r| r.application == application)
            .map(|r| 1 + r.index)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, RendezvousStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RendezvousStore::new(dir.path().join("launcher.txt"));
        (dir, store)
    }

    #[test]
    fn test_first_record_wins() {
        let (_dir, store) = store();
        store.store("App", "rmi://h:1/ri").unwrap();
        store.store("App", "rmi://h:2/ri").unwrap();
        assert_eq!(store.retrieve("App").unwrap().as_deref(), Some("rmi://h:1/ri"));
    }

    #[test]
    fn test_lookup_is_per_application() {
        let (_dir, store) = store();
        store.store("Other", "rmi://h:9/x").unwrap();
        store.store("App", "rmi://h:1/ri").unwrap();
        store.store("Other", "rmi://h:8/x").unwrap();

        assert_eq!(store.retrieve("App").unwrap().as_deref(), Some("rmi://h:1/ri"));
        assert_eq!(store.retrieve("Other").unwrap().as_deref(), Some("rmi://h:9/x"));
        assert_eq!(store.retrieve("Missing").unwrap(), None);
    }

    #[test]
    fn test_index_accumulates() {
        let (_dir, store) = store();
        let indices: Vec<u64> = (0..4)
            .map(|i| store.store("App", &format!("rmi://h:{}/ri", i + 1)).unwrap().index)
            .collect();
        // 0, 1, 1+2, 1+2+4
        assert_eq!(indices, vec![0, 1, 3, 7]);

        assert_eq!(store.store("Fresh", "rmi://h:5/ri").unwrap().index, 0);
    }

    #[test]
    fn test_file_format() {
        let (_dir, store) = store();
        store.store("App", "rmi://localhost:1099/robotrmiservice").unwrap();
        store.store("App", "rmi://localhost:1100/robotrmiservice").unwrap();
        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            content,
            "App%0%rmi://localhost:1099/robotrmiservice\nApp%1%rmi://localhost:1100/robotrmiservice\n"
        );
    }

    #[test]
    fn test_retrieve_requires_file() {
        let (_dir, store) = store();
        match store.retrieve("App") {
            Err(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_delimiter_rejected() {
        let (_dir, store) = store();
        assert!(matches!(
            store.store("A%B", "rmi://h:1/x"),
            Err(Error::InvalidRecord(_))
        ));
        assert!(!store.exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_dir, store) = store();
        store.store("App", "rmi://h:1/ri").unwrap();
        store.remove().unwrap();
        assert!(!store.exists());
        store.remove().unwrap();
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(RendezvousRecord::parse("App%rmi://h:1/x").is_err());
        assert!(RendezvousRecord::parse("App%x%rmi://h:1/x").is_err());
        let record = RendezvousRecord::parse("App%3%rmi://h:1/x  \n").unwrap();
        assert_eq!(record.index, 3);
        assert_eq!(record.url, "rmi://h:1/x");
    }

    #[test]
    fn test_partial_trailing_line_is_skipped() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "App%0%rmi://h:1/ri\nOther%0").unwrap();

        assert_eq!(store.retrieve("App").unwrap().as_deref(), Some("rmi://h:1/ri"));
        assert_eq!(store.retrieve("Other").unwrap(), None);
        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_and_retrieve_polls_for_file() {
        let (_dir, store) = store();
        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            writer.store("App", "rmi://h:1/ri").unwrap();
        });

        let url = store
            .wait_and_retrieve("App", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("rmi://h:1/ri"));
    }
}
