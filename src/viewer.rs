//! Open a converted page in the platform's default viewer

use crate::session::SessionError;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Launch the system opener for `path` and return without waiting for it.
///
/// The path is passed as a single argument, never through a shell.
pub fn open_in_viewer(path: &Path) -> Result<(), SessionError> {
    if !path.exists() {
        return Err(SessionError::NotFound(path.to_path_buf()));
    }

    let mut command = opener_command(path);
    command.stdout(Stdio::null()).stderr(Stdio::null());

    debug!(path = %path.display(), program = ?command.get_program(), "opening viewer");
    command
        .spawn()
        .map(|_| ())
        .map_err(|source| SessionError::Viewer {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(target_os = "macos")]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("open");
    command.arg("--").arg(path);
    command
}

#[cfg(target_os = "windows")]
fn opener_command(path: &Path) -> Command {
    // The empty string is the window title `start` expects first
    let mut command = Command::new("cmd");
    command.args(["/C", "start", ""]).arg(path);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(path);
    command
}

/// Whether an error means no opener program is installed
pub fn is_missing_opener(err: &SessionError) -> bool {
    matches!(err, SessionError::Viewer { source, .. } if source.kind() == io::ErrorKind::NotFound)
}
