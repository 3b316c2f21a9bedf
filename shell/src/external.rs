use crate::builtin::BuiltinKind;
use crate::command::ExitCode;
use std::ffi::OsStr;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Status reported for a name that resolves to nothing, as POSIX shells do.
pub const STATUS_NOT_FOUND: ExitCode = 127;
/// Status reported for a file that exists but cannot be executed.
pub const STATUS_NOT_EXECUTABLE: ExitCode = 126;

/// What a pipeline stage's program name refers to, decided once before anything runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A directive handled inside the shell process.
    Builtin(BuiltinKind),
    /// An executable found on disk.
    External(PathBuf),
    /// Nothing matched; the stage reports "command not found".
    Unresolved,
}

/// Classify a program name against the built-in table and then the search path.
pub fn resolve(search_paths: &OsStr, name: &str) -> Resolution {
    if let Some(kind) = BuiltinKind::from_name(name) {
        return Resolution::Builtin(kind);
    }
    match find_command_path(search_paths, Path::new(name)) {
        Some(path) => Resolution::External(path),
        None => Resolution::Unresolved,
    }
}

/// How one pipeline stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// The process exited normally with this code.
    Exited(ExitCode),
    /// The process was terminated by this signal.
    Signaled(i32),
    /// The program name did not resolve, so nothing was spawned.
    NotFound,
    /// The program was found but the OS refused to execute it.
    NotExecutable,
}

impl StageStatus {
    /// Numeric status as a shell would report it in `$?`.
    pub fn code(self) -> ExitCode {
        match self {
            StageStatus::Exited(code) => code,
            StageStatus::Signaled(signal) => 128 + signal,
            StageStatus::NotFound => STATUS_NOT_FOUND,
            StageStatus::NotExecutable => STATUS_NOT_EXECUTABLE,
        }
    }
}

impl From<ExitStatus> for StageStatus {
    fn from(exit_status: ExitStatus) -> Self {
        match (exit_status.code(), exit_status.signal()) {
            (Some(code), _) => StageStatus::Exited(code),
            (None, Some(signal)) => StageStatus::Signaled(signal),
            (None, None) => StageStatus::Exited(-1),
        }
    }
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Empty name: returns `None`.
/// - Any name containing a `/` (absolute, `./foo`, `bin/sh`): returned as-is if it exists.
///   Whether it can actually be executed is left to the spawn.
/// - Single path component: search each directory in `search_paths` (PATH) and return the
///   first regular file with an execute bit, skipping non-executable matches like `execvp`.
pub fn find_command_path(search_paths: &OsStr, path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(x), None) if !path.is_absolute() && !path.starts_with(".") => {
            find_in_path(search_paths, x.as_os_str())
        }
        _ => find_by_path(path).map(Path::to_path_buf),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| is_executable_file(candidate))
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

fn is_executable_file(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
