use crate::parser::DEFAULT_MAX_COMMANDS;
use anyhow::{Result, bail};

/// Prompt printed before each line when reading from a terminal.
pub const DEFAULT_PROMPT: &str = "dsh3> ";

/// What the read-eval loop does with a successfully parsed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpMode {
    /// Execute the pipeline without printing its structure.
    #[default]
    Off,
    /// Print the parsed pipeline, then execute it.
    BeforeExecute,
    /// Print the parsed pipeline and execute nothing.
    ParseOnly,
}

/// Options for one shell instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub prompt: String,
    pub max_commands: usize,
    pub dump: DumpMode,
    /// Keep a line-editor history of entered lines.
    pub history: bool,
}

impl ShellConfig {
    /// Reject settings the loop cannot work with.
    pub fn validate(self) -> Result<Self> {
        if self.max_commands == 0 {
            bail!("max commands per pipeline must be at least 1");
        }
        Ok(self)
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_commands: DEFAULT_MAX_COMMANDS,
            dump: DumpMode::Off,
            history: true,
        }
    }
}
