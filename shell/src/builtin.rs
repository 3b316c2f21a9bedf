use crate::command::ExitCode;
use crate::session::Session;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::Write;
use tracing::debug;

/// Directives the shell executes in its own process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Exit,
    Cd,
    Rc,
    Dragon,
}

impl BuiltinKind {
    /// Map a program name onto a built-in, if it is one.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            n if n == Exit::name() => Some(BuiltinKind::Exit),
            n if n == Cd::name() => Some(BuiltinKind::Cd),
            n if n == ReturnCode::name() => Some(BuiltinKind::Rc),
            n if n == Dragon::name() => Some(BuiltinKind::Dragon),
            _ => None,
        }
    }

    /// Parse `args` for this built-in and run it.
    ///
    /// Errors raised by the built-in itself are written to `stderr` and turned into
    /// status 1, so a failing `cd` never escapes into the read-eval loop.
    pub fn run(
        self,
        args: &[String],
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        debug!(builtin = ?self, ?args, "running built-in");
        match self {
            BuiltinKind::Exit => dispatch::<Exit>(args, stdout, stderr, session),
            BuiltinKind::Cd => dispatch::<Cd>(args, stdout, stderr, session),
            BuiltinKind::Rc => dispatch::<ReturnCode>(args, stdout, stderr, session),
            BuiltinKind::Dragon => dispatch::<Dragon>(args, stdout, stderr, session),
        }
    }
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "exit".
    fn name() -> &'static str;

    /// Executes the command against the session.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

fn dispatch<T: BuiltinCommand>(
    args: &[String],
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    session: &mut Session,
) -> Result<ExitCode> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let cmd = match T::from_args(&[T::name()], &args) {
        Ok(cmd) => cmd,
        Err(EarlyExit { output, status }) => {
            // `--help` lands here with a successful status.
            return Ok(match status {
                Ok(()) => {
                    writeln!(stdout, "{}", output.trim_end())?;
                    0
                }
                Err(()) => {
                    writeln!(stderr, "{}", output.trim_end())?;
                    1
                }
            });
        }
    };

    match cmd.execute(stdout, session) {
        Ok(code) => Ok(code),
        Err(e) => {
            writeln!(stderr, "{:#}", e)?;
            Ok(1)
        }
    }
}

#[derive(FromArgs)]
/// Leave the shell.
struct Exit {
    #[argh(positional, greedy)]
    /// ignored; accepted so that `exit 0` still exits.
    _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        session.request_exit();
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// Without a target the directory is left unchanged.
struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let Some(target) = self.target else {
            return Ok(0);
        };
        env::set_current_dir(&target).with_context(|| format!("cd: {}", target))?;
        if let Ok(cwd) = session.current_dir() {
            debug!(cwd = %cwd.display(), "changed directory");
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the return code of the last command.
struct ReturnCode {}

impl BuiltinCommand for ReturnCode {
    fn name() -> &'static str {
        "rc"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        writeln!(stdout, "{}", session.last_status())?;
        Ok(0)
    }
}

const DRAGON: &str = r#"
                  __====-_  _-====__
            _--^^^#####//      \\#####^^^--_
         _-^##########// (    ) \\##########^-_
        -############//  |\^^/|  \\############-
      _/############//   (@::@)   \\############\_
     /#############((     \\//     ))#############\
    -###############\\    (%%)    //###############-
   -#################\\  / "" \  //#################-
  -###################\\/      \//###################-
 _#/|##########/\######(   /\   )######/\##########|\#_
 |/ |#/\#/\#/\/  \#/\##\  |  |  /##/\#/  \/\#/\#/\#| \|
 `  |/  V  V  `   V  \#\| |  | |/#/  V   '  V  V  \|  '
    `   `  `      `   / | |  | | \   '      '  '   '
                     (  | |  | |  )
                    __\ | |  | | /__
                   (vvv(VVV)(VVV)vvv)
"#;

#[derive(FromArgs)]
/// Print a dragon.
struct Dragon {}

impl BuiltinCommand for Dragon {
    fn name() -> &'static str {
        "dragon"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        stdout.write_all(DRAGON.trim_start_matches('\n').as_bytes())?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lock_current_dir;
    use std::env as stdenv;
    use std::fs;

    fn run(kind: BuiltinKind, args: &[&str], session: &mut Session) -> (ExitCode, String, String) {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = kind.run(&args, &mut out, &mut err, session).unwrap();
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_from_name() {
        assert_eq!(BuiltinKind::from_name("exit"), Some(BuiltinKind::Exit));
        assert_eq!(BuiltinKind::from_name("cd"), Some(BuiltinKind::Cd));
        assert_eq!(BuiltinKind::from_name("rc"), Some(BuiltinKind::Rc));
        assert_eq!(BuiltinKind::from_name("dragon"), Some(BuiltinKind::Dragon));
        assert_eq!(BuiltinKind::from_name("pwd"), None);
        assert_eq!(BuiltinKind::from_name("EXIT"), None);
    }

    #[test]
    fn test_exit_stops_session() {
        let mut session = Session::new();
        let (code, out, _) = run(BuiltinKind::Exit, &[], &mut session);
        assert_eq!(code, 0);
        assert!(out.is_empty());
        assert!(!session.is_running());
    }

    #[test]
    fn test_rc_prints_last_status() {
        let mut session = Session::new();
        session.record_status(42);
        let (code, out, _) = run(BuiltinKind::Rc, &[], &mut session);
        assert_eq!(code, 0);
        assert_eq!(out, "42\n");
    }

    #[test]
    fn test_dragon_draws_to_stdout() {
        let mut session = Session::new();
        session.record_status(5);
        let (code, out, err) = run(BuiltinKind::Dragon, &[], &mut session);
        assert_eq!(code, 0);
        assert!(err.is_empty());
        assert!(out.contains('@') && out.contains('%'));
        assert!(out.ends_with('\n'));
        assert_eq!(session.last_status(), 5);
        assert!(session.is_running());
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let canonical_temp = fs::canonicalize(temp.path()).expect("canonicalize failed");
        let orig = stdenv::current_dir().unwrap();

        let mut session = Session::new();
        let target = canonical_temp.to_string_lossy().to_string();
        let (code, _, err) = run(BuiltinKind::Cd, &[&target], &mut session);

        let new_cwd = fs::canonicalize(stdenv::current_dir().unwrap()).unwrap();
        let session_cwd = fs::canonicalize(session.current_dir().unwrap()).unwrap();
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(code, 0, "unexpected error output: {}", err);
        assert_eq!(new_cwd, canonical_temp);
        assert_eq!(session_cwd, canonical_temp);
    }

    #[test]
    fn test_cd_without_target_is_noop() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();

        let mut session = Session::new();
        let (code, out, err) = run(BuiltinKind::Cd, &[], &mut session);

        assert_eq!(code, 0);
        assert!(out.is_empty() && err.is_empty());
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();

        let mut session = Session::new();
        let name = format!("nonexistent_dir_for_dsh_test_{}", std::process::id());
        let (code, _, err) = run(BuiltinKind::Cd, &[&name], &mut session);

        assert_eq!(code, 1);
        assert!(err.starts_with(&format!("cd: {}:", name)), "got {:?}", err);
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_rejects_extra_arguments() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();

        let mut session = Session::new();
        let (code, _, err) = run(BuiltinKind::Cd, &["/tmp", "/"], &mut session);

        assert_eq!(code, 1);
        assert!(!err.is_empty());
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_help_goes_to_stdout() {
        let mut session = Session::new();
        let (code, out, _) = run(BuiltinKind::Cd, &["--help"], &mut session);
        assert_eq!(code, 0);
        assert!(out.contains("Usage: cd"));
    }
}
