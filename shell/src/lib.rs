//! `dsh`, a small interactive command shell.
//!
//! A line typed at the prompt goes through three steps:
//!
//! 1. [`lexer`] splits it into words and pipe separators, honouring double and single
//!    quotes;
//! 2. [`parser`] groups the words into a [`Pipeline`] of at most
//!    [`DEFAULT_MAX_COMMANDS`] commands (configurable);
//! 3. the [`Interpreter`] either runs a lone built-in (`exit`, `cd`, `rc`, `dragon`)
//!    in-process or hands the pipeline to [`executor`], which starts one child per stage,
//!    connects neighbours with pipes and reports the status of the last stage.
//!
//! The public modules expose the pieces for reuse; most callers only need
//! [`Interpreter`], [`ShellConfig`] and a [`LineSource`].

mod builtin;
pub mod command;
pub mod config;
pub mod executor;
pub mod external;
mod interpreter;
pub mod lexer;
pub mod parser;
mod pipes;
pub mod session;

pub use builtin::BuiltinKind;
pub use command::{ExitCode, PipelineIo};
pub use config::{DEFAULT_PROMPT, DumpMode, ShellConfig};
pub use interpreter::{Interpreter, LineEditor, LineSource, ScriptedLines};
pub use parser::{DEFAULT_MAX_COMMANDS, Pipeline};
