//! Append-only audit log of detection results.
//!
//! Entries are stored as newline-delimited JSON (JSONL) so moderators can
//! inspect them with ordinary text tools. Appends take an exclusive file
//! lock, so concurrent batch runs can share one log.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::domain::DetectionResult;

/// One logged evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the entry was written
    pub ts: DateTime<Utc>,

    /// Path as given on the command line
    pub input_path: String,

    /// SHA-256 of the input file, if it could be read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_digest: Option<String>,

    pub result: DetectionResult,
}

impl AuditEntry {
    pub fn new(input_path: impl Into<String>, input_digest: Option<String>, result: DetectionResult) -> Self {
        Self {
            ts: Utc::now(),
            input_path: input_path.into(),
            input_digest,
            result,
        }
    }
}

/// File-based audit log using JSONL format
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Open (and create the parent directory of) an audit log
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create audit log directory: {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry under an exclusive lock
    pub async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let json = serde_json::to_string(entry).context("Failed to serialize audit entry")?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open audit log: {}", path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire file lock on audit log")?;

            writeln!(file, "{}", json).context("Failed to write audit entry")?;
            file.flush().context("Failed to flush audit entry")?;

            // Lock is released when file is dropped
            Ok(())
        })
        .await
        .context("Audit log writer panicked")?
    }

    /// Replay all entries in order
    pub async fn replay(&self) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open audit log: {}", self.path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut entries = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse audit entry: {}", line))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// The most recent `limit` entries, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let entries = self.replay().await?;
        Ok(entries.into_iter().rev().take(limit).collect())
    }
}

/// SHA-256 of a file's contents, hex encoded
pub async fn digest_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {} for hashing", path.display()))?;
    Ok(hash_bytes(&bytes))
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentCategory, EvidenceRecord, VersionSpace};
    use tempfile::TempDir;

    fn result(name: &str) -> DetectionResult {
        let mut record =
            EvidenceRecord::new(name, DocumentCategory::Editable, VersionSpace::editable());
        record.reject("test");
        record.finalize()
    }

    #[tokio::test]
    async fn test_append_and_replay_order() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::open(temp.path().join("nested").join("audit.jsonl"))
            .await
            .unwrap();

        for i in 0..3 {
            let name = format!("doc{}.docx", i);
            log.append(&AuditEntry::new(&name, None, result(&name)))
                .await
                .unwrap();
        }

        let entries = log.replay().await.unwrap();
        assert_eq!(entries.len(), 3);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.result.input_file, format!("doc{}.docx", i));
        }

        let recent = log.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].input_path, "doc2.docx");
    }

    #[tokio::test]
    async fn test_replay_missing_log_is_empty() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::open(temp.path().join("audit.jsonl")).await.unwrap();
        assert!(log.replay().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_digest_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "abc").unwrap();

        assert_eq!(
            digest_file(&path).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
