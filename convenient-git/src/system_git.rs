//! [`ChangeProbe`] backed by the system `git` binary.

use crate::{ChangeProbe, GitError, GitResult, PathFilter};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Runs `git` in a repository working directory.
///
/// Each call spawns one blocking process with no timeout. There is no retry.
#[derive(Debug, Clone)]
pub struct SystemGit {
    repo_dir: PathBuf,
    filter: PathFilter,
    program: OsString,
}

impl SystemGit {
    /// Probe the repository at `repo_dir`, keeping only paths accepted by
    /// `filter`.
    pub fn new(repo_dir: impl AsRef<Path>, filter: PathFilter) -> Self {
        Self {
            repo_dir: repo_dir.as_ref().to_path_buf(),
            filter,
            program: OsString::from("git"),
        }
    }

    /// Use a different git executable.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Repository working directory.
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn run(&self, args: &[&str]) -> GitResult<String> {
        let command = format!("git {}", args.join(" "));

        let mut cmd = Command::new(&self.program);
        // Unquoted output so non-ASCII paths survive filtering.
        cmd.current_dir(&self.repo_dir)
            .args(["-c", "core.quotepath=off"])
            .args(args);

        debug!("Running: {:?}", cmd);

        let output = cmd.output().map_err(|source| GitError::Spawn {
            command: command.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| GitError::InvalidOutput(command))
    }
}

impl ChangeProbe for SystemGit {
    fn changed_paths(&self, merge_base: &str) -> GitResult<Vec<String>> {
        let output = self.run(&["diff", "--name-only", "--merge-base", merge_base, "--"])?;
        let paths = self.filter.select_all(&output);
        debug!(
            "{} changed paths under {} since {}",
            paths.len(),
            self.filter.prefix(),
            merge_base
        );
        Ok(paths)
    }

    fn resolve_ref(&self, reference: &str) -> GitResult<String> {
        let revision = format!("{reference}^{{commit}}");
        let output = self.run(&["rev-parse", "--verify", &revision])?;
        let hash = output.trim();
        if hash.is_empty() {
            return Err(GitError::EmptyRevision(reference.to_string()));
        }
        debug!("Resolved {} to {}", reference, hash);
        Ok(hash.to_string())
    }
}
