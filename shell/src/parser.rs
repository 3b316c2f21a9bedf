use crate::lexer::{self, LexingError, Token};
use std::fmt;
use thiserror::Error;

/// Default upper bound on the number of commands in one pipeline.
pub const DEFAULT_MAX_COMMANDS: usize = 8;

/// One stage of a pipeline: the program name followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    name: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Builds a command from its name and arguments.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// A non-empty, ordered sequence of commands connected by pipes.
///
/// Only [`construct_pipeline`] creates pipelines, so `commands` always holds at least one
/// element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    commands: Vec<CommandSpec>,
}

impl Pipeline {
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn first(&self) -> &CommandSpec {
        &self.commands[0]
    }

    /// Whether this pipeline consists of a single command and needs no pipes.
    pub fn is_single(&self) -> bool {
        self.commands.len() == 1
    }
}

/// Diagnostic dump of a parsed line.
///
/// ```text
/// PARSED COMMAND LINE - TOTAL COMMANDS 2
/// <1> cmda1 [a1 a2]
/// <2> cmd3
/// ```
impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PARSED COMMAND LINE - TOTAL COMMANDS {}", self.len())?;
        for (index, cmd) in self.commands.iter().enumerate() {
            write!(f, "\n<{}> {}", index + 1, cmd.name)?;
            if !cmd.args.is_empty() {
                write!(f, " [{}]", cmd.args.join(" "))?;
            }
        }
        Ok(())
    }
}

/// Errors that can occur while turning a line into a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    /// The line was empty or contained only whitespace. Not a real error.
    #[error("no commands provided")]
    NoCommands,
    /// More pipe-separated commands than the configured limit.
    #[error("piping limited to {limit} commands")]
    TooManyCommands { limit: usize },
    /// A pipe separator with nothing on one side, e.g. `| cmd`, `cmd |` or `a || b`.
    /// The position is 1-based.
    #[error("empty command at position {position} of the pipeline")]
    EmptyCommand { position: usize },
    /// The tokenizer rejected the line.
    #[error(transparent)]
    Lexing(#[from] LexingError),
}

/// Groups tokens into a [`Pipeline`], splitting on [`Token::Pipe`].
///
/// The number of groups is checked against `limit` before their contents, so an
/// over-long line is always reported as such.
pub fn construct_pipeline(tokens: Vec<Token>, limit: usize) -> Result<Pipeline, ParsingError> {
    if tokens.is_empty() {
        return Err(ParsingError::NoCommands);
    }

    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        match token {
            Token::Pipe => groups.push(std::mem::take(&mut current)),
            Token::Word(word) => current.push(word),
        }
    }
    groups.push(current);

    if groups.len() > limit {
        return Err(ParsingError::TooManyCommands { limit });
    }

    let commands = groups
        .into_iter()
        .enumerate()
        .map(|(index, group)| {
            let mut words = group.into_iter();
            match words.next() {
                Some(name) => Ok(CommandSpec::new(name, words.collect())),
                None => Err(ParsingError::EmptyCommand {
                    position: index + 1,
                }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Pipeline { commands })
}

/// Tokenizes and builds a pipeline from one raw input line.
pub fn parse_line(line: &str, limit: usize) -> Result<Pipeline, ParsingError> {
    let tokens = lexer::split_into_tokens(line)?;
    construct_pipeline(tokens, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Pipeline, ParsingError> {
        parse_line(line, DEFAULT_MAX_COMMANDS)
    }

    fn names(p: &Pipeline) -> Vec<&str> {
        p.commands().iter().map(|c| c.name()).collect()
    }

    #[test]
    fn test_single_command_with_args() {
        let p = parse("cmd_args a1 a2 -a3 --a4").unwrap();
        assert!(p.is_single());
        assert_eq!(p.first().name(), "cmd_args");
        assert_eq!(p.first().args(), ["a1", "a2", "-a3", "--a4"]);
    }

    #[test]
    fn test_mixed_pipe_spacing() {
        let p = parse("pipe1|pipe2 |pipe3 pipe4| pipe5").unwrap();
        assert_eq!(names(&p), ["pipe1", "pipe2", "pipe3", "pipe5"]);
        assert_eq!(p.commands()[2].args(), ["pipe4"]);
    }

    #[test]
    fn test_blank_line_is_no_commands() {
        assert_eq!(parse(""), Err(ParsingError::NoCommands));
        assert_eq!(parse("   \t "), Err(ParsingError::NoCommands));
    }

    #[test]
    fn test_pipe_limit() {
        let eight = "c1 | c2 | c3 | c4 | c5 | c6 | c7 | c8";
        assert_eq!(parse(eight).unwrap().len(), 8);

        let nine = "c1 | c2 | c3 | c4 | c5 | c6 | c7 | c8 | c9";
        assert_eq!(
            parse(nine),
            Err(ParsingError::TooManyCommands { limit: 8 })
        );
        assert_eq!(
            parse_line("a | b | c", 2).unwrap_err().to_string(),
            "piping limited to 2 commands"
        );
    }

    #[test]
    fn test_empty_groups_are_malformed() {
        assert_eq!(parse("| cmd"), Err(ParsingError::EmptyCommand { position: 1 }));
        assert_eq!(parse("cmd |"), Err(ParsingError::EmptyCommand { position: 2 }));
        assert_eq!(parse("a || b"), Err(ParsingError::EmptyCommand { position: 2 }));
        assert_eq!(parse("|"), Err(ParsingError::EmptyCommand { position: 1 }));
    }

    #[test]
    fn test_quoted_empty_argument_is_kept() {
        let p = parse(r#"printf "%s|" "" x"#).unwrap();
        assert!(p.is_single());
        assert_eq!(p.first().args(), ["%s|", "", "x"]);
    }

    #[test]
    fn test_lexing_errors_pass_through() {
        assert!(matches!(
            parse("echo 'open"),
            Err(ParsingError::Lexing(LexingError::UnterminatedQuote { .. }))
        ));
    }

    #[test]
    fn test_dump_format() {
        let p = parse("cmda1 a1 a2 | cmda2 a3 a4 | cmd3").unwrap();
        assert_eq!(
            p.to_string(),
            "PARSED COMMAND LINE - TOTAL COMMANDS 3\n\
             <1> cmda1 [a1 a2]\n\
             <2> cmda2 [a3 a4]\n\
             <3> cmd3"
        );
    }
}
