use crate::command::ExitCode;
use std::env as stdenv;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

/// Search path used when `PATH` is not set, matching what `execvp` falls back to.
const DEFAULT_SEARCH_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// State of one interactive shell session.
///
/// The session holds:
/// - the running flag that keeps the read-eval loop alive until `exit`;
/// - the return code of the most recently completed pipeline or built-in.
///
/// The working directory is not copied here: `cd` changes the real process
/// directory and everything else asks the OS for it.
#[derive(Debug, Clone)]
pub struct Session {
    running: bool,
    last_status: ExitCode,
}

impl Session {
    /// Start a fresh session: running, with a last return code of 0.
    pub fn new() -> Self {
        Self {
            running: true,
            last_status: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ask the read-eval loop to stop after the current line.
    pub fn request_exit(&mut self) {
        self.running = false;
    }

    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    pub fn record_status(&mut self, status: ExitCode) {
        self.last_status = status;
    }

    /// The process working directory.
    pub fn current_dir(&self) -> io::Result<PathBuf> {
        stdenv::current_dir()
    }

    /// Directories searched for external programs, from `PATH`.
    pub fn search_path(&self) -> OsString {
        stdenv::var_os("PATH").unwrap_or_else(|| OsString::from(DEFAULT_SEARCH_PATH))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
