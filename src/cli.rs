use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, CommandReport};
use crate::logging::{self, LogLevel};
use crate::radionoise::config::load_config;

#[derive(Debug, Parser)]
#[command(
    name = "radionoise",
    version,
    about = "Post-processing for Transmission: stage, sort and purge finished torrents"
)]
struct Cli {
    /// Overrides `[logging] level` and RADIONOISE_LOG_LEVEL.
    #[arg(long, global = true, value_enum)]
    loglevel: Option<LogLevel>,

    /// Config file to read instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Post-process one completed torrent. $TR_TORRENT_HASH can be used in place of HASH.
    Add {
        #[arg(env = "TR_TORRENT_HASH")]
        hash: Option<String>,
    },
    /// Flush the unsorted folder and purge finished torrents that were processed.
    Cron,
}

fn render(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "{}: {}",
        report.command,
        if report.ok { "ok" } else { "failed" }
    );
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        eprintln!("  issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(level) = cli.loglevel {
        cfg.logging.level = level;
    }
    logging::init(cfg.logging.level)?;
    for key in &cfg.unknown_env_keys {
        tracing::warn!(key = %key, "ignoring unknown environment variable");
    }

    let report = match cli.command {
        Command::Add { hash } => {
            commands::add::run(&cfg, &commands::add::AddOptions { hash })?
        }
        Command::Cron => commands::cron::run(&cfg)?,
    };

    render(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!("{} finished with {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
