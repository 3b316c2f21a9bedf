//! End-to-end runs of the `dsh` binary with a script on its standard input.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn run_dsh(args: &[&str], script: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_dsh"))
        .args(args)
        .arg("--no-history")
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start dsh");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(script.as_bytes())
        .expect("failed to write script");

    child.wait_with_output().expect("dsh did not finish")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_exit_prints_farewell_and_summary() {
    let output = run_dsh(&[], "exit\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "exiting...\ncmd loop returned 0\n");
}

#[test]
fn test_end_of_input_exits_cleanly() {
    let output = run_dsh(&[], "echo first\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "first\nexiting...\ncmd loop returned 0\n");
}

#[test]
fn test_pipelines_share_the_terminal() {
    let output = run_dsh(
        &[],
        "echo HELLO | tr A-Z a-z\n\
         printf \"a\\nb\\nc\\n\" | grep -v b | wc -l\n\
         echo test | cat | cat | cat | cat | cat | cat | cat\n\
         exit\n",
    );
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().map(str::trim).collect();
    assert_eq!(
        lines,
        ["hello", "2", "test", "exiting...", "cmd loop returned 0"]
    );
}

#[test]
fn test_warnings_and_errors_keep_the_loop_alive() {
    let output = run_dsh(
        &[],
        "\n\
         c1 | c2 | c3 | c4 | c5 | c6 | c7 | c8 | c9\n\
         no_such_program_for_dsh\n\
         rc\n\
         exit\n",
    );
    assert_eq!(
        stdout(&output),
        "warning: no commands provided\n\
         error: piping limited to 8 commands\n\
         127\n\
         exiting...\n\
         cmd loop returned 0\n"
    );
    assert!(stderr(&output).contains("dsh: no_such_program_for_dsh: command not found"));
}

#[test]
fn test_cd_affects_later_commands() {
    let output = run_dsh(&[], "cd /\npwd\ncd\npwd\nexit\n");
    assert_eq!(stdout(&output), "/\n/\nexiting...\ncmd loop returned 0\n");
}

#[test]
fn test_quoted_arguments_reach_the_program_intact() {
    let output = run_dsh(&[], "echo \"a   b\" 'c|d'\nexit\n");
    assert_eq!(stdout(&output), "a   b c|d\nexiting...\ncmd loop returned 0\n");
}

#[test]
fn test_parse_only_mode() {
    let output = run_dsh(&["--parse-only"], "cmda1 a1 a2 | cmda2 a3 a4 | cmd3\n");
    assert_eq!(
        stdout(&output),
        "PARSED COMMAND LINE - TOTAL COMMANDS 3\n\
         <1> cmda1 [a1 a2]\n\
         <2> cmda2 [a3 a4]\n\
         <3> cmd3\n\
         exiting...\n\
         cmd loop returned 0\n"
    );
}

#[test]
fn test_parse_only_mode_still_exits() {
    let output = run_dsh(&["--parse-only"], "cmd\nexit\ncmd_after\n");
    assert_eq!(
        stdout(&output),
        "PARSED COMMAND LINE - TOTAL COMMANDS 1\n\
         <1> cmd\n\
         exiting...\n\
         cmd loop returned 0\n"
    );
}

#[test]
fn test_custom_pipeline_limit() {
    let output = run_dsh(&["--max-commands", "2"], "echo a | cat | cat\nexit\n");
    assert!(stdout(&output).starts_with("error: piping limited to 2 commands\n"));
}

#[test]
fn test_zero_pipeline_limit_is_rejected() {
    let output = run_dsh(&["--max-commands", "0"], "");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("max commands per pipeline must be at least 1"));
}
