use crate::builtin::BuiltinKind;
use crate::command::{ExitCode, PipelineIo};
use crate::config::{DumpMode, ShellConfig};
use crate::executor::{self, PipelineOutcome};
use crate::external::{self, Resolution, StageStatus};
use crate::parser::{self, ParsingError, Pipeline};
use crate::session::Session;
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, Stderr, Stdout, Write};
use tracing::{debug, warn};

/// Something the read-eval loop can pull command lines from.
pub trait LineSource {
    /// Returns the next line without its line terminator, or `None` at end of input.
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive input through `rustyline`.
///
/// When stdin is not a terminal, rustyline reads plain lines and prints no prompt, so the
/// same source also serves piped input.
pub struct LineEditor {
    editor: DefaultEditor,
    history: bool,
}

impl LineEditor {
    pub fn new(history: bool) -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            history,
        })
    }
}

impl LineSource for LineEditor {
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>> {
        loop {
            match self.editor.readline(prompt) {
                Ok(line) => {
                    if self.history && !line.trim().is_empty() {
                        self.editor.add_history_entry(line.as_str())?;
                    }
                    return Ok(Some(line));
                }
                // Ctrl-C discards the current line only.
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Lines read from any buffered reader, without prompting.
pub struct ScriptedLines<R> {
    reader: R,
}

impl<R: BufRead> ScriptedLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ScriptedLines<R> {
    fn next_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

type PipelineIoFactory = Box<dyn FnMut() -> io::Result<PipelineIo>>;

/// The read-eval loop: parses each line, dispatches built-ins, runs pipelines and keeps
/// the [`Session`] up to date.
///
/// Shell messages go to `out` and `err`. External commands write wherever the pipeline
/// I/O factory points them, which is the shell's own terminal by default.
pub struct Interpreter<O: Write = Stdout, E: Write = Stderr> {
    config: ShellConfig,
    session: Session,
    out: O,
    err: E,
    pipeline_io: PipelineIoFactory,
}

impl Interpreter<Stdout, Stderr> {
    /// An interpreter attached to the process's standard streams.
    pub fn new(config: ShellConfig) -> Self {
        Self::with_streams(config, io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Interpreter<O, E> {
    pub fn with_streams(config: ShellConfig, out: O, err: E) -> Self {
        Self {
            config,
            session: Session::new(),
            out,
            err,
            pipeline_io: Box::new(|| Ok(PipelineIo::inherit())),
        }
    }

    /// Replace where external pipelines read their input from and write their output to.
    /// The factory is called once per pipeline.
    pub fn with_pipeline_io(
        mut self,
        factory: impl FnMut() -> io::Result<PipelineIo> + 'static,
    ) -> Self {
        self.pipeline_io = Box::new(factory);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn output(&self) -> &O {
        &self.out
    }

    pub fn errors(&self) -> &E {
        &self.err
    }

    /// Read and evaluate lines until `exit` or end of input.
    ///
    /// Prints the farewell message once and returns the loop's own status, which is 0 for
    /// both ways of leaving.
    pub fn repl<S: LineSource>(&mut self, source: &mut S) -> Result<ExitCode> {
        while self.session.is_running() {
            let Some(line) = source.next_line(&self.config.prompt)? else {
                debug!("end of input");
                break;
            };
            self.eval_line(&line)?;
        }

        writeln!(self.out, "exiting...")?;
        self.out.flush()?;
        Ok(0)
    }

    /// Evaluate one command line.
    ///
    /// Malformed lines and failing commands are reported and never returned as errors;
    /// `Err` only means the shell's own output streams failed.
    pub fn eval_line(&mut self, line: &str) -> Result<()> {
        let pipeline = match parser::parse_line(line, self.config.max_commands) {
            Ok(pipeline) => pipeline,
            Err(ParsingError::NoCommands) => {
                writeln!(self.out, "warning: {}", ParsingError::NoCommands)?;
                return Ok(());
            }
            Err(err) => {
                writeln!(self.out, "error: {}", err)?;
                return Ok(());
            }
        };

        // A lone `exit` always ends the loop, even when nothing else is executed.
        let lone_exit = pipeline.is_single()
            && BuiltinKind::from_name(pipeline.first().name()) == Some(BuiltinKind::Exit);
        if !lone_exit {
            if self.config.dump != DumpMode::Off {
                writeln!(self.out, "{}", pipeline)?;
            }
            if self.config.dump == DumpMode::ParseOnly {
                return Ok(());
            }
        }

        let search_path = self.session.search_path();
        let resolved: Vec<Resolution> = pipeline
            .commands()
            .iter()
            .map(|cmd| external::resolve(&search_path, cmd.name()))
            .collect();

        if let (true, Resolution::Builtin(kind)) = (pipeline.is_single(), &resolved[0]) {
            let status = kind.run(
                pipeline.first().args(),
                &mut self.out,
                &mut self.err,
                &mut self.session,
            )?;
            self.session.record_status(status);
            return Ok(());
        }

        // Children share our terminal; anything we buffered must land first.
        self.out.flush()?;
        match self.run_pipeline(&pipeline, &resolved) {
            Ok(outcome) => {
                self.report_failed_stages(&outcome)?;
                debug!(status = outcome.status(), "pipeline status");
                self.session.record_status(outcome.status());
            }
            Err(err) => {
                warn!(%err, "pipeline aborted");
                writeln!(self.out, "error: command execution failed: {:#}", err)?;
                self.session.record_status(1);
            }
        }
        Ok(())
    }

    fn run_pipeline(&mut self, pipeline: &Pipeline, resolved: &[Resolution]) -> Result<PipelineOutcome> {
        let io = (self.pipeline_io)()?;
        Ok(executor::execute(pipeline, resolved, io)?)
    }

    fn report_failed_stages(&mut self, outcome: &PipelineOutcome) -> Result<()> {
        for stage in outcome.failed_to_start() {
            let reason = match stage.status {
                StageStatus::NotExecutable => "cannot execute",
                _ => "command not found",
            };
            writeln!(self.err, "dsh: {}: {}", stage.name, reason)?;
        }
        Ok(())
    }
}
