//! Subprocess helpers shared by the git, gcrypt and gpg adapters.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::SyncError;

/// Captured result of a finished subprocess
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Combined stdout/stderr, trimmed, for error messages
    pub fn message(&self) -> String {
        let mut message = String::new();
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();

        if !stdout.is_empty() {
            message.push_str(stdout);
        }
        if !stderr.is_empty() {
            if !message.is_empty() {
                message.push('\n');
            }
            message.push_str(stderr);
        }
        if message.is_empty() {
            message = match self.code {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            };
        }
        message
    }
}

/// Run `program` with `args` and capture its output
///
/// A spawn failure because the program does not exist is reported as
/// [`SyncError::DependencyMissing`]. A non-zero exit is *not* an error here;
/// callers decide what a failed status means for their operation.
pub fn run<I, S>(program: &str, args: I) -> Result<CommandOutput, SyncError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args);

    debug!(?command, "running");

    let output = command.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SyncError::DependencyMissing(format!("{} is not installed or not on PATH", program))
        } else {
            SyncError::StorageFailure(format!("Failed to run {}: {}", program, e))
        }
    })?;

    let result = CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(program, code = ?result.code, "finished");

    Ok(result)
}

/// Locate an executable on `PATH`
pub fn find_program(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
