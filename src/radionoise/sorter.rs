use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// The renaming/sorting engine that decides where video files end up.
pub trait Sorter {
    fn process(&mut self, files: &[PathBuf]) -> Result<()>;
    /// Release whatever the engine holds. Called once per invocation.
    fn teardown(&mut self) -> Result<()>;
}

/// Runs an external sorting program as `<command> <args...> <files...>`.
#[derive(Debug)]
pub struct CommandSorter {
    program: PathBuf,
    args: Vec<String>,
    batches: usize,
    files: usize,
}

fn resolve_program(command: &str) -> Result<PathBuf> {
    let trimmed = command.trim();
    let candidate = Path::new(trimmed);
    if candidate.components().count() > 1 {
        if !candidate.is_file() {
            anyhow::bail!("sorter program does not exist: {}", candidate.display());
        }
        return Ok(candidate.to_path_buf());
    }
    which::which(trimmed).with_context(|| format!("sorter program `{trimmed}` not found in PATH"))
}

impl CommandSorter {
    pub fn new(command: &str, args: &[String]) -> Result<Self> {
        let program = resolve_program(command)?;
        tracing::debug!(program = %program.display(), "resolved sorter program");
        Ok(Self {
            program,
            args: args.to_vec(),
            batches: 0,
            files: 0,
        })
    }
}

impl Sorter for CommandSorter {
    fn process(&mut self, files: &[PathBuf]) -> Result<()> {
        if files.is_empty() {
            tracing::info!("no files to sort");
            return Ok(());
        }

        tracing::info!(count = files.len(), program = %self.program.display(), "running sorter");
        let out = Command::new(&self.program)
            .args(&self.args)
            .args(files)
            .output()
            .with_context(|| format!("failed to run {}", self.program.display()))?;
        if !out.status.success() {
            anyhow::bail!(
                "sorter {} exited with {}\nstdout: {}\nstderr: {}",
                self.program.display(),
                out.status,
                String::from_utf8_lossy(&out.stdout).trim(),
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        for line in String::from_utf8_lossy(&out.stdout).lines() {
            tracing::debug!(sorter = %line);
        }

        self.batches += 1;
        self.files += files.len();
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        tracing::debug!(
            batches = self.batches,
            files = self.files,
            "sorter finished"
        );
        Ok(())
    }
}

/// Borrows a [`Sorter`] for one command and tears it down exactly once,
/// either through [`SorterSession::finish`] or when dropped on an early return.
pub struct SorterSession<'a> {
    sorter: &'a mut dyn Sorter,
    torn_down: bool,
}

impl<'a> SorterSession<'a> {
    pub fn new(sorter: &'a mut dyn Sorter) -> Self {
        Self {
            sorter,
            torn_down: false,
        }
    }

    pub fn process(&mut self, files: &[PathBuf]) -> Result<()> {
        self.sorter.process(files)
    }

    pub fn finish(mut self) -> Result<()> {
        self.torn_down = true;
        self.sorter.teardown()
    }
}

impl Drop for SorterSession<'_> {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Err(err) = self.sorter.teardown() {
            tracing::warn!(error = %format!("{err:#}"), "sorter teardown failed");
        }
    }
}
