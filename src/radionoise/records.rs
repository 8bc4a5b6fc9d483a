use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Durable witness that a torrent's files were handed to the sorter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentRecord {
    pub hash: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TorrentRecord {
    pub fn new(hash: &str) -> Self {
        let now = Utc::now();
        Self {
            hash: hash.to_string(),
            name: String::new(),
            processed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Keyed by torrent hash; at most one record per hash.
pub trait RecordStore {
    /// Existing record for `hash`, or a fresh unprocessed one that is
    /// persisted before returning.
    fn find_or_create(&mut self, hash: &str) -> Result<TorrentRecord>;
    fn find(&self, hash: &str) -> Result<Option<TorrentRecord>>;
    fn save(&mut self, record: &TorrentRecord) -> Result<()>;
    fn destroy(&mut self, record: &TorrentRecord) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RecordFile {
    schema_version: u32,
    torrents: BTreeMap<String, TorrentRecord>,
}

impl Default for RecordFile {
    fn default() -> Self {
        Self {
            schema_version: 1,
            torrents: BTreeMap::new(),
        }
    }
}

/// JSON document on disk, rewritten atomically after every mutation.
#[derive(Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
    data: RecordFile,
}

impl JsonRecordStore {
    pub fn open(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            RecordFile::default()
        };
        tracing::debug!(
            path = %path.display(),
            records = data.torrents.len(),
            "opened record store"
        );
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn len(&self) -> usize {
        self.data.torrents.len()
    }

    fn persist(&self) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let data = serde_json::to_string_pretty(&self.data)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to stage write in {}", parent.display()))?;
        tmp.write_all(format!("{data}\n").as_bytes())?;
        tmp.persist(&self.path)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl RecordStore for JsonRecordStore {
    fn find_or_create(&mut self, hash: &str) -> Result<TorrentRecord> {
        if let Some(existing) = self.data.torrents.get(hash) {
            return Ok(existing.clone());
        }
        let record = TorrentRecord::new(hash);
        self.data.torrents.insert(hash.to_string(), record.clone());
        self.persist()?;
        Ok(record)
    }

    fn find(&self, hash: &str) -> Result<Option<TorrentRecord>> {
        Ok(self.data.torrents.get(hash).cloned())
    }

    fn save(&mut self, record: &TorrentRecord) -> Result<()> {
        let mut record = record.clone();
        record.updated_at = Utc::now();
        self.data.torrents.insert(record.hash.clone(), record);
        self.persist()
    }

    fn destroy(&mut self, record: &TorrentRecord) -> Result<()> {
        if self.data.torrents.remove(&record.hash).is_none() {
            return Ok(());
        }
        self.persist()
    }
}
