//! Subprocess spawning
//!
//! `ProcessSpawner` is the seam between the supervisor and the OS. The
//! production `TokioSpawner` launches real binaries with their combined
//! output appended to a log file; tests substitute their own spawner to make
//! specific fallback tiers fail.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// A fully-built command line plus its output redirection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Append stdout + stderr here; discarded when `None`
    pub log_file: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            log_file: None,
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program_name())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Launches OS processes
pub trait ProcessSpawner: Send + Sync {
    fn spawn(&self, spec: &CommandSpec) -> std::io::Result<Child>;
}

/// Spawns real processes via `tokio::process`
#[derive(Debug, Default, Clone)]
pub struct TokioSpawner;

impl ProcessSpawner for TokioSpawner {
    fn spawn(&self, spec: &CommandSpec) -> std::io::Result<Child> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match &spec.log_file {
            Some(path) => {
                let log = open_log(path)?;
                let log_err = log.try_clone()?;
                cmd.stdout(Stdio::from(log)).stderr(Stdio::from(log_err));
            }
            None => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = %spec.display(), "Spawning process");
        cmd.spawn()
    }
}

fn open_log(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
