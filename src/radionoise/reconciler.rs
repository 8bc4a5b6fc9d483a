use crate::radionoise::collector::collect;
use crate::radionoise::config::Config;
use crate::radionoise::dispatcher::log_fatal;
use crate::radionoise::fsops::remove_content;
use crate::radionoise::records::RecordStore;
use crate::radionoise::scope::in_scope;
use crate::radionoise::sorter::{Sorter, SorterSession};
use crate::radionoise::torrent::{DaemonClient, Torrent};
use anyhow::Result;
use std::io;

#[derive(Debug, Clone, Default)]
pub struct PurgeOutcome {
    /// Done on the daemon and in scope.
    pub candidates: usize,
    /// Content and record removed.
    pub purged: Vec<String>,
    /// No record, or record not yet processed.
    pub skipped_unconfirmed: usize,
    /// Content was already absent on disk.
    pub already_gone: usize,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub flushed_files: usize,
    pub purge: PurgeOutcome,
}

enum PurgeStep {
    Skipped,
    Purged { already_gone: bool },
}

/// Periodic sweep: flush the holding directory through the sorter, then drop
/// torrents that are done on the daemon and confirmed processed locally.
pub struct SweepReconciler<'a> {
    cfg: &'a Config,
    daemon: &'a dyn DaemonClient,
    store: &'a mut dyn RecordStore,
    sorter: SorterSession<'a>,
}

impl<'a> SweepReconciler<'a> {
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

    /// Both phases, then a single sorter teardown whatever happened.
    pub fn run(mut self) -> Result<SweepOutcome> {
        let result = self.sweep();
        if let Err(err) = &result {
            log_fatal(err);
        }

        let teardown = self.sorter.finish();
        let outcome = result?;
        teardown?;
        tracing::info!(
            flushed = outcome.flushed_files,
            purged = outcome.purge.purged.len(),
            "sweep done"
        );
        Ok(outcome)
    }

    fn sweep(&mut self) -> Result<SweepOutcome> {
        let flushed_files = self.flush()?;
        let purge = self.purge()?;
        Ok(SweepOutcome {
            flushed_files,
            purge,
        })
    }

    /// Sort whatever sits in the holding directory, including files that
    /// never came through `add`.
    fn flush(&mut self) -> Result<usize> {
        let holding = &self.cfg.renamer.unsorted;
        tracing::info!("processing {}", holding.display());
        let files = collect(holding, &self.cfg.scope.extensions)?;
        self.sorter.process(&files)?;
        Ok(files.len())
    }

    fn purge(&mut self) -> Result<PurgeOutcome> {
        tracing::info!("deleting completed and processed torrents");
        let mut out = PurgeOutcome::default();

        let torrents = self.daemon.fetch_all()?;
        for torrent in torrents {
            if !torrent.is_done() || !in_scope(&torrent.download_dir, &self.cfg.scope.scope_marker)
            {
                continue;
            }
            out.candidates += 1;

            match self.purge_one(&torrent) {
                Ok(PurgeStep::Skipped) => out.skipped_unconfirmed += 1,
                Ok(PurgeStep::Purged { already_gone }) => {
                    if already_gone {
                        out.already_gone += 1;
                    }
                    out.purged.push(torrent.hash.clone());
                }
                Err(err) => {
                    tracing::warn!(
                        hash = %torrent.hash,
                        name = %torrent.name,
                        error = %format!("{err:#}"),
                        "purge failed, moving on"
                    );
                    out.failures.push(format!("{}: {err:#}", torrent.hash));
                }
            }
        }

        Ok(out)
    }

    fn purge_one(&mut self, torrent: &Torrent) -> Result<PurgeStep> {
        tracing::debug!(
            "prepping to remove {} ({}) at {}",
            torrent.name,
            torrent.hash,
            torrent.download_dir
        );

        let record = match self.store.find(&torrent.hash)? {
            Some(record) if record.processed => record,
            _ => return Ok(PurgeStep::Skipped),
        };

        let path = torrent.content_path()?;
        let already_gone = match remove_content(&path) {
            Ok(()) => {
                tracing::info!("removed {}", path.display());
                false
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!("{} not found, assuming gone", path.display());
                true
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "failed to remove {}, dropping record anyway",
                    path.display()
                );
                false
            }
        };

        self.store.destroy(&record)?;
        tracing::info!("removed {} from database", torrent.hash);
        Ok(PurgeStep::Purged { already_gone })
    }
}
