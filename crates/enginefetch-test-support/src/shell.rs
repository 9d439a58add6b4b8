//! In-memory [`ShellRunner`] with scripted `git rev-parse` answers.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use enginefetch_core::{CommandOutput, ShellCommand, ShellRunner};

#[derive(Default)]
struct State {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    commands: Vec<ShellCommand>,
}

/// Shell double backed by a map of paths to contents.
///
/// Commits registered with [`FakeShell::with_commit`] resolve through
/// `git rev-parse <ref>` and `git rev-parse --abbrev-ref <ref>`; any other reference
/// fails the way git does outside a repository or past the history of a shallow clone.
#[derive(Default)]
pub struct FakeShell {
    state: Mutex<State>,
    commits: BTreeMap<String, (String, String)>,
    read_only: BTreeSet<PathBuf>,
}

impl FakeShell {
    /// Empty filesystem with no resolvable commits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file.
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl AsRef<[u8]>) -> Self {
        self.lock()
            .files
            .insert(path.into(), contents.as_ref().to_vec());
        self
    }

    /// Make `reference` resolve to `hash` on `branch`.
    #[must_use]
    pub fn with_commit(
        mut self,
        reference: impl Into<String>,
        hash: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        self.commits
            .insert(reference.into(), (hash.into(), branch.into()));
        self
    }

    /// Reject writes and copies into `dir`.
    #[must_use]
    pub fn with_read_only_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.read_only.insert(dir.into());
        self
    }

    /// Contents of `path`, if present.
    #[must_use]
    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// Snapshot of every file.
    #[must_use]
    pub fn files(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        self.lock().files.clone()
    }

    /// Directories created so far.
    #[must_use]
    pub fn dirs(&self) -> BTreeSet<PathBuf> {
        self.lock().dirs.clone()
    }

    /// Commands run so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<ShellCommand> {
        self.lock().commands.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self, path: &Path) -> io::Result<()> {
        if self.read_only.iter().any(|dir| path.starts_with(dir)) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is read-only", path.display()),
            ));
        }
        Ok(())
    }

    fn rev_parse(&self, args: &[String]) -> CommandOutput {
        let (abbrev, reference) = match args {
            [flag, reference] if flag == "--abbrev-ref" => (true, reference),
            [reference] => (false, reference),
            _ => return CommandOutput::failure(129, "usage: git rev-parse"),
        };
        match self.commits.get(reference) {
            Some((_, branch)) if abbrev => CommandOutput::success(format!("{branch}\n")),
            Some((hash, _)) => CommandOutput::success(format!("{hash}\n")),
            None => CommandOutput {
                code: Some(128),
                stdout: format!("{reference}\n"),
                stderr: format!(
                    "fatal: ambiguous argument '{reference}': unknown revision or path not in the working tree."
                ),
            },
        }
    }
}

impl ShellRunner for FakeShell {
    fn run(&self, command: &ShellCommand) -> io::Result<CommandOutput> {
        self.lock().commands.push(command.clone());
        match (command.program.as_str(), command.args.split_first()) {
            ("git", Some((subcommand, rest))) if subcommand == "rev-parse" => {
                Ok(self.rev_parse(rest))
            }
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not available", command.program),
            )),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check_writable(to)?;
        let mut state = self.lock();
        let contents = state.files.get(from).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", from.display()),
            )
        })?;
        state.files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if self.exists(path) {
            self.check_writable(path)?;
        }
        self.lock().files.remove(path);
        Ok(())
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.check_writable(path)?;
        self.lock()
            .files
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.file(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
        })
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.lock().dirs.insert(path.to_path_buf());
        Ok(())
    }
}
