//! JSON Lines log file backend

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{StoreError, VisitorStore};
use crate::diagnostics::{self, Failure};
use crate::record::VisitorRecord;

/// One JSON object per line, appended in arrival order
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl VisitorStore for FileStore {
    async fn append(&self, record: &VisitorRecord) -> Result<(), StoreError> {
        // Encode before opening so a bad record never touches the file
        let mut line = record.to_line()?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<VisitorRecord>, StoreError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Log {} does not exist yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(parse_lines(&contents))
    }
}

/// Decode every non-empty line on its own, skipping the ones that don't parse
fn parse_lines(contents: &[u8]) -> Vec<VisitorRecord> {
    let mut records = Vec::new();

    for (index, raw) in contents.split(|b| *b == b'\n').enumerate() {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                diagnostics::report(Failure::Deserialize, &format!("line {}", index + 1), &e);
                continue;
            }
        };

        match VisitorRecord::from_line(line) {
            Ok(record) => records.push(record),
            Err(e) => diagnostics::report(Failure::Deserialize, &format!("line {}", index + 1), &e),
        }
    }

    records
}
