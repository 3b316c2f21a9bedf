//! Runs a resolved pipeline as a set of concurrently executing child processes.

use crate::command::{ExitCode, PipelineIo};
use crate::external::{Resolution, StageStatus};
use crate::parser::{CommandSpec, Pipeline};
use crate::pipes::PipeSet;
use nix::errno::Errno;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

/// Failures that abort a whole pipeline attempt. Per-stage lookup failures are not
/// errors; they are reported through [`StageStatus`].
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("cannot create pipe: {0}")]
    Pipe(#[from] nix::Error),
    #[error("cannot spawn `{name}` (stage {position}): {source}")]
    Spawn {
        name: String,
        position: usize,
        source: io::Error,
    },
    #[error("cannot wait for `{name}` (stage {position}): {source}")]
    Wait {
        name: String,
        position: usize,
        source: io::Error,
    },
}

/// Exit status of one pipeline stage, keyed by its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub position: usize,
    pub name: String,
    pub status: StageStatus,
}

/// The statuses of every stage of a finished pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    stages: Vec<StageResult>,
}

impl PipelineOutcome {
    pub fn stages(&self) -> &[StageResult] {
        &self.stages
    }

    /// The pipeline's overall status: that of the last stage only.
    pub fn status(&self) -> ExitCode {
        self.stages.last().map_or(0, |stage| stage.status.code())
    }

    /// Stages that never ran because their program could not be started.
    pub fn failed_to_start(&self) -> impl Iterator<Item = &StageResult> {
        self.stages.iter().filter(|stage| {
            matches!(
                stage.status,
                StageStatus::NotFound | StageStatus::NotExecutable
            )
        })
    }
}

enum Launch {
    Running(Child),
    Failed(StageStatus),
}

/// Spawn every stage of `pipeline`, connect them with pipes and wait for all of them.
///
/// `resolved` holds one [`Resolution`] per stage. Stages that resolved to a built-in are
/// treated as lookup failures: built-ins only run on their own, never inside a pipe.
///
/// Each stage's pipe ends are moved into its spawn request and closed in the parent as
/// soon as the spawn returns, whether or not it succeeded. A stage that cannot be started
/// therefore still closes its ends, so its neighbours see end-of-file instead of
/// blocking forever.
pub fn execute(
    pipeline: &Pipeline,
    resolved: &[Resolution],
    io: PipelineIo,
) -> Result<PipelineOutcome, ExecError> {
    debug_assert_eq!(pipeline.len(), resolved.len());

    let last = pipeline.len() - 1;
    let mut pipes = PipeSet::for_stages(pipeline.len())?;
    debug!(stages = pipeline.len(), pipes = pipes.len(), "starting pipeline");
    let PipelineIo { stdin, stdout } = io;
    let mut first_stdin = Some(stdin);
    let mut last_stdout = Some(stdout);

    let mut launched: Vec<(usize, Launch)> = Vec::with_capacity(pipeline.len());
    let mut spawn_error = None;

    for (index, (spec, resolution)) in pipeline.commands().iter().zip(resolved).enumerate() {
        let stage_stdin = match index {
            0 => first_stdin.take().map(|s| s.stdio()),
            _ => pipes.stdin_for(index).map(Stdio::from),
        };
        let stage_stdout = match index {
            i if i == last => last_stdout.take().map(|s| s.stdio()),
            _ => pipes.stdout_for(index).map(Stdio::from),
        };

        match spawn_stage(spec, resolution, stage_stdin, stage_stdout) {
            Ok(launch) => launched.push((index, launch)),
            Err(source) => {
                warn!(name = spec.name(), position = index + 1, %source, "spawn failed");
                spawn_error = Some(ExecError::Spawn {
                    name: spec.name().to_string(),
                    position: index + 1,
                    source,
                });
                break;
            }
        }
    }

    // Close every end the parent still holds before blocking on the children.
    drop(pipes);
    drop(first_stdin);
    drop(last_stdout);

    let stages = wait_all(pipeline, launched);
    if let Some(err) = spawn_error {
        return Err(err);
    }
    let stages = stages?;
    debug!(?stages, "pipeline finished");
    Ok(PipelineOutcome { stages })
}

/// Start one stage. Lookup failures come back as `Launch::Failed`; only resource-level
/// spawn errors are returned as `Err`.
///
/// The `Command` owns the stage's `Stdio` handles and is dropped when this function
/// returns, which is what closes the parent's copies of the pipe ends.
fn spawn_stage(
    spec: &CommandSpec,
    resolution: &Resolution,
    stdin: Option<Stdio>,
    stdout: Option<Stdio>,
) -> io::Result<Launch> {
    let path = match resolution {
        Resolution::External(path) => path,
        Resolution::Builtin(_) | Resolution::Unresolved => {
            return Ok(Launch::Failed(StageStatus::NotFound));
        }
    };

    let mut cmd = Command::new(path);
    cmd.arg0(spec.name()).args(spec.args());
    if let Some(stdin) = stdin {
        cmd.stdin(stdin);
    }
    if let Some(stdout) = stdout {
        cmd.stdout(stdout);
    }

    match cmd.spawn() {
        Ok(child) => {
            debug!(name = spec.name(), pid = child.id(), "spawned stage");
            Ok(Launch::Running(child))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Launch::Failed(StageStatus::NotFound)),
        Err(e) if is_not_executable(&e) => Ok(Launch::Failed(StageStatus::NotExecutable)),
        Err(e) => Err(e),
    }
}

/// The file exists but the OS refuses to run it, e.g. it lacks the execute bit or is not
/// in a format the kernel can load.
fn is_not_executable(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
        || err.raw_os_error() == Some(Errno::ENOEXEC as i32)
}

/// Reap every child that was started, in pipeline order. All children are waited for even
/// if one wait fails, so none are left as zombies.
fn wait_all(
    pipeline: &Pipeline,
    launched: Vec<(usize, Launch)>,
) -> Result<Vec<StageResult>, ExecError> {
    let mut stages = Vec::with_capacity(launched.len());
    let mut first_error = None;

    for (index, launch) in launched {
        let name = pipeline.commands()[index].name().to_string();
        let status = match launch {
            Launch::Failed(status) => status,
            Launch::Running(mut child) => match child.wait() {
                Ok(exit_status) => StageStatus::from(exit_status),
                Err(source) => {
                    first_error.get_or_insert(ExecError::Wait {
                        name: name.clone(),
                        position: index + 1,
                        source,
                    });
                    continue;
                }
            },
        };
        stages.push(StageResult {
            position: index + 1,
            name,
            status,
        });
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(stages),
    }
}
