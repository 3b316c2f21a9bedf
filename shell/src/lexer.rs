//! A module implementing lexical analysis (tokenization) of a single command line.

use thiserror::Error;

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word with its quotes already stripped. May be empty when it came from `""` or `''`.
    Word(String),
    /// The pipe operator, `|`.
    Pipe,
}

impl Token {
    /// Shorthand used by tests and callers that build token streams by hand.
    pub fn word(s: impl Into<String>) -> Self {
        Token::Word(s.into())
    }
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unterminated {quote} quote starting at offset {offset}")]
    UnterminatedQuote { quote: char, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    /// Inside a quoted span opened by the given character at the given byte offset.
    ReadingQuote(char, usize),
}

struct LexingFSM<'a> {
    input: &'a str,
    state: LexingState,
    buffer: String,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a str) -> Self {
        LexingFSM {
            input: line,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    /// Runs the state machine over the whole line.
    ///
    /// `ReadingWord` means a token is pending even when the buffer is empty, which is
    /// how `""` survives as an empty argument.
    fn make_tokens(mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        for (offset, ch) in self.input.char_indices() {
            match self.state {
                LexingState::Start => self.handle_start(ch, offset, &mut out),
                LexingState::ReadingWord => self.handle_word(ch, offset, &mut out),
                LexingState::ReadingQuote(quote, _) => self.handle_quote(ch, quote),
            }
        }

        match self.state {
            LexingState::ReadingQuote(quote, offset) => {
                Err(LexingError::UnterminatedQuote { quote, offset })
            }
            LexingState::ReadingWord => {
                self.finish_word(&mut out);
                Ok(out)
            }
            LexingState::Start => Ok(out),
        }
    }

    fn handle_start(&mut self, ch: char, offset: usize, out: &mut Vec<Token>) {
        match ch {
            c if c.is_whitespace() => {}
            '|' => out.push(Token::Pipe),
            '"' | '\'' => self.state = LexingState::ReadingQuote(ch, offset),
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, offset: usize, out: &mut Vec<Token>) {
        match ch {
            c if c.is_whitespace() => self.finish_word(out),
            '|' => {
                self.finish_word(out);
                out.push(Token::Pipe);
            }
            '"' | '\'' => self.state = LexingState::ReadingQuote(ch, offset),
            c => self.buffer.push(c),
        }
    }

    fn handle_quote(&mut self, ch: char, quote: char) {
        if ch == quote {
            self.state = LexingState::ReadingWord;
        } else {
            self.buffer.push(ch);
        }
    }

    fn finish_word(&mut self, out: &mut Vec<Token>) {
        out.push(Token::Word(std::mem::take(&mut self.buffer)));
        self.state = LexingState::Start;
    }
}

/// The main entry point function to perform lexical analysis.
///
/// Whitespace outside quotes separates words and never produces empty tokens; quoted
/// spans keep their content verbatim and may join adjacent unquoted text.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    LexingFSM::new(line).make_tokens()
}
