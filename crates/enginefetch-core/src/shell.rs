//! Filesystem and process capability used by the acquirer.
//!
//! # Design
//! - All side effects outside the network go through [`ShellRunner`] so the acquisition
//!   flow can run against an in-memory double.
//! - `SystemShell` runs commands in a fixed working directory; file paths are used as given.
//! - Removing a missing file is not an error, matching `rm -f`.

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::CandidateError;

/// External command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl ShellCommand {
    /// Start building an invocation of `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl Display for ShellCommand {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.program)?;
        for arg in &self.args {
            write!(formatter, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    #[must_use]
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// A command only counts as successful when it exits zero and writes nothing to stderr.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.code == Some(0) && self.stderr.trim().is_empty()
    }
}

/// Side-effecting operations the acquirer depends on.
pub trait ShellRunner: Send + Sync {
    /// Run a command to completion and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot be spawned.
    fn run(&self, command: &ShellCommand) -> io::Result<CommandOutput>;

    /// Whether `path` is an existing regular file.
    fn exists(&self, path: &Path) -> bool;

    /// Copy `from` to `to`, overwriting the destination.
    ///
    /// # Errors
    ///
    /// Returns an error when the source is unreadable or the destination unwritable.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove `path`; a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when an existing file cannot be removed.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Write `contents` to `path`, replacing any previous file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Read the full contents of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create `path` and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error when a directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// [`ShellRunner`] backed by the real filesystem and process table.
#[derive(Debug, Clone)]
pub struct SystemShell {
    working_dir: PathBuf,
}

impl SystemShell {
    /// Run commands from `working_dir`.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

impl ShellRunner for SystemShell {
    fn run(&self, command: &ShellCommand) -> io::Result<CommandOutput> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&self.working_dir)
            .output()?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}

/// Commit hash and branch a git reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommit {
    /// Full commit hash.
    pub hash: String,
    /// Abbreviated ref name of the branch.
    pub branch: String,
}

/// Resolve `reference` to a hash and branch with `git rev-parse`.
///
/// # Errors
///
/// Returns [`CandidateError::RefResolutionFailed`] when either lookup cannot run,
/// fails, or prints nothing.
pub fn resolve_commit<R>(shell: &R, reference: &str) -> Result<ResolvedCommit, CandidateError>
where
    R: ShellRunner + ?Sized,
{
    let hash = rev_parse(
        shell,
        reference,
        ShellCommand::new("git").arg("rev-parse").arg(reference),
    )?;
    let branch = rev_parse(
        shell,
        reference,
        ShellCommand::new("git")
            .arg("rev-parse")
            .arg("--abbrev-ref")
            .arg(reference),
    )?;
    Ok(ResolvedCommit { hash, branch })
}

fn rev_parse<R>(shell: &R, reference: &str, command: ShellCommand) -> Result<String, CandidateError>
where
    R: ShellRunner + ?Sized,
{
    let failed = |reason: String| CandidateError::RefResolutionFailed {
        reference: reference.to_string(),
        reason,
    };
    let output = shell
        .run(&command)
        .map_err(|err| failed(format!("`{command}` could not start: {err}")))?;
    if !output.succeeded() {
        return Err(failed(format!(
            "`{command}` failed ({}): {}",
            output
                .code
                .map_or_else(|| "signal".to_string(), |code| format!("exit {code}")),
            output.stderr.trim()
        )));
    }
    let value = output.stdout.trim();
    if value.is_empty() {
        return Err(failed(format!("`{command}` printed nothing")));
    }
    Ok(value.to_string())
}
