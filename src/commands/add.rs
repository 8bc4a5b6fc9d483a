use anyhow::Result;

use crate::commands::CommandReport;
use crate::radionoise::config::Config;
use crate::radionoise::dispatcher::CompletionDispatcher;
use crate::radionoise::lock::RunLock;
use crate::radionoise::records::JsonRecordStore;
use crate::radionoise::sorter::CommandSorter;
use crate::transmission::TransmissionClient;

#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub hash: Option<String>,
}

pub fn run(cfg: &Config, opts: &AddOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("add");
    let _lock = RunLock::acquire(&cfg.lock_path())?;

    let daemon = TransmissionClient::new(&cfg.transmission)?;
    let mut store = JsonRecordStore::open(&cfg.database.path)?;
    let mut sorter = CommandSorter::new(&cfg.renamer.command, &cfg.renamer.args)?;

    let outcome =
        CompletionDispatcher::new(cfg, &daemon, &mut store, &mut sorter).run(opts.hash.as_deref())?;

    report.detail(format!("hash={}", outcome.hash));
    report.detail(format!("name={}", outcome.name));
    report.detail(format!("source={}", outcome.source_path.display()));
    report.detail(format!("staged={}", outcome.staged_path.display()));
    report.detail(format!("dispatched_files={}", outcome.dispatched_files));
    if outcome.previously_processed {
        report.detail("note=torrent was already processed; files dispatched again");
    }
    report.detail(format!("records={}", store.len()));
    Ok(report)
}
