//! In-memory collaborators for the dispatcher and reconciler tests.

use crate::radionoise::records::{RecordStore, TorrentRecord};
use crate::radionoise::sorter::Sorter;
use crate::radionoise::torrent::{DaemonClient, Torrent};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub fn torrent(hash: &str, name: &str, download_dir: &str, status: i64, finished: bool) -> Torrent {
    Torrent::try_new(
        hash.to_string(),
        name.to_string(),
        download_dir.to_string(),
        1.0,
        status,
        finished,
    )
    .expect("known status")
}

#[derive(Debug, Default)]
pub struct FakeDaemon {
    pub torrents: Vec<Torrent>,
    pub fail_fetch_all: bool,
}

impl DaemonClient for FakeDaemon {
    fn fetch_one(&self, hash: &str) -> Result<Option<Torrent>> {
        Ok(self.torrents.iter().find(|t| t.hash == hash).cloned())
    }

    fn fetch_all(&self) -> Result<Vec<Torrent>> {
        if self.fail_fetch_all {
            anyhow::bail!("connection refused");
        }
        Ok(self.torrents.clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub records: BTreeMap<String, TorrentRecord>,
    pub fail_destroy: bool,
}

impl MemoryStore {
    pub fn with_record(hash: &str, processed: bool) -> Self {
        let mut record = TorrentRecord::new(hash);
        record.processed = processed;
        let mut store = Self::default();
        store.records.insert(hash.to_string(), record);
        store
    }
}

impl RecordStore for MemoryStore {
    fn find_or_create(&mut self, hash: &str) -> Result<TorrentRecord> {
        Ok(self
            .records
            .entry(hash.to_string())
            .or_insert_with(|| TorrentRecord::new(hash))
            .clone())
    }

    fn find(&self, hash: &str) -> Result<Option<TorrentRecord>> {
        Ok(self.records.get(hash).cloned())
    }

    fn save(&mut self, record: &TorrentRecord) -> Result<()> {
        self.records.insert(record.hash.clone(), record.clone());
        Ok(())
    }

    fn destroy(&mut self, record: &TorrentRecord) -> Result<()> {
        if self.fail_destroy {
            anyhow::bail!("database is locked");
        }
        self.records.remove(&record.hash);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingSorter {
    pub batches: Vec<Vec<PathBuf>>,
    pub teardowns: usize,
    pub fail: bool,
}

impl Sorter for RecordingSorter {
    fn process(&mut self, files: &[PathBuf]) -> Result<()> {
        if self.fail {
            anyhow::bail!("sorter crashed");
        }
        let mut batch = files.to_vec();
        batch.sort();
        self.batches.push(batch);
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        self.teardowns += 1;
        Ok(())
    }
}
