use anyhow::Result;

use crate::commands::CommandReport;
use crate::radionoise::config::Config;
use crate::radionoise::lock::RunLock;
use crate::radionoise::reconciler::SweepReconciler;
use crate::radionoise::records::JsonRecordStore;
use crate::radionoise::sorter::CommandSorter;
use crate::transmission::TransmissionClient;

pub fn run(cfg: &Config) -> Result<CommandReport> {
    let mut report = CommandReport::new("cron");
    let _lock = RunLock::acquire(&cfg.lock_path())?;

    let daemon = TransmissionClient::new(&cfg.transmission)?;
    let mut store = JsonRecordStore::open(&cfg.database.path)?;
    let mut sorter = CommandSorter::new(&cfg.renamer.command, &cfg.renamer.args)?;

    let outcome = SweepReconciler::new(cfg, &daemon, &mut store, &mut sorter).run()?;
    let purge = &outcome.purge;

    report.detail(format!("holding_dir={}", cfg.renamer.unsorted.display()));
    report.detail(format!("flushed_files={}", outcome.flushed_files));
    report.detail(format!("purge.candidates={}", purge.candidates));
    report.detail(format!("purge.removed={}", purge.purged.join(",")));
    report.detail(format!("purge.skipped_unconfirmed={}", purge.skipped_unconfirmed));
    report.detail(format!("purge.already_gone={}", purge.already_gone));
    for failure in &purge.failures {
        report.issue(format!("purge failed: {failure}"));
    }
    report.detail(format!("records={}", store.len()));
    Ok(report)
}
