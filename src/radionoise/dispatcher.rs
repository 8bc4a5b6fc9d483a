use crate::error::RadionoiseError;
use crate::radionoise::collector::collect_staged;
use crate::radionoise::config::Config;
use crate::radionoise::fsops::stage_copy;
use crate::radionoise::records::RecordStore;
use crate::radionoise::scope::in_scope;
use crate::radionoise::sorter::{Sorter, SorterSession};
use crate::radionoise::torrent::DaemonClient;
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AddOutcome {
    pub hash: String,
    pub name: String,
    pub source_path: PathBuf,
    pub staged_path: PathBuf,
    pub dispatched_files: usize,
    pub previously_processed: bool,
}

/// Log a flow-aborting condition the way every fatal path reports it.
pub fn log_fatal(err: &anyhow::Error) {
    let code = err
        .downcast_ref::<RadionoiseError>()
        .map(RadionoiseError::code)
        .unwrap_or("E000_UNEXPECTED");
    tracing::error!(fatal = true, code, "{err:#}");
}

/// Handles one completed torrent: fetch, scope check, stage into the
/// holding directory, hand the staged files to the sorter, mark processed.
pub struct CompletionDispatcher<'a> {
    cfg: &'a Config,
    daemon: &'a dyn DaemonClient,
    store: &'a mut dyn RecordStore,
    sorter: SorterSession<'a>,
}

impl<'a> CompletionDispatcher<'a> {
    pub fn new(
        cfg: &'a Config,
        daemon: &'a dyn DaemonClient,
        store: &'a mut dyn RecordStore,
        sorter: &'a mut dyn Sorter,
    ) -> Self {
        Self {
            cfg,
            daemon,
            store,
            sorter: SorterSession::new(sorter),
        }
    }

    /// Runs the whole flow. The sorter is torn down before returning on
    /// every path, after any fatal condition has been logged.
    pub fn run(mut self, hash: Option<&str>) -> Result<AddOutcome> {
        let result = self.dispatch(hash);
        if let Err(err) = &result {
            log_fatal(err);
        }

        let teardown = self.sorter.finish();
        let outcome = result?;
        teardown?;
        tracing::info!(hash = %outcome.hash, "post-processing done");
        Ok(outcome)
    }

    fn dispatch(&mut self, hash: Option<&str>) -> Result<AddOutcome> {
        let hash = hash
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(RadionoiseError::MissingTorrentHash)?;

        let torrent = self
            .daemon
            .fetch_one(hash)?
            .ok_or_else(|| RadionoiseError::TorrentNotFound(hash.to_string()))?;
        tracing::debug!(
            hash = %torrent.hash,
            name = %torrent.name,
            status = %torrent.status,
            percent_done = torrent.percent_done,
            "fetched torrent"
        );

        if !in_scope(&torrent.download_dir, &self.cfg.scope.scope_marker) {
            return Err(RadionoiseError::OutOfScope {
                name: torrent.name.clone(),
                download_dir: torrent.download_dir.clone(),
                marker: self.cfg.scope.scope_marker.clone(),
            }
            .into());
        }

        let previously_processed = self
            .store
            .find(&torrent.hash)?
            .is_some_and(|record| record.processed);
        if previously_processed {
            tracing::warn!(hash = %torrent.hash, "torrent already processed, dispatching again");
        }

        let source_path = torrent.content_path()?;
        let staged_path = stage_copy(&source_path, &self.cfg.renamer.unsorted)?;
        tracing::info!(
            "copied {} to {}",
            source_path.display(),
            self.cfg.renamer.unsorted.display()
        );

        let files = collect_staged(&staged_path, &self.cfg.scope.extensions)?;
        tracing::info!(count = files.len(), "running sorter on torrent");
        self.sorter.process(&files)?;

        tracing::info!(hash = %torrent.hash, "marking torrent as done");
        let mut record = self.store.find_or_create(&torrent.hash)?;
        record.name = torrent.name.clone();
        record.processed = true;
        self.store.save(&record)?;

        Ok(AddOutcome {
            hash: torrent.hash,
            name: torrent.name,
            source_path,
            staged_path,
            dispatched_files: files.len(),
            previously_processed,
        })
    }
}
