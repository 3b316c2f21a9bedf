use std::io::{self, Read, Write};
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Abstraction over a readable input stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Read` and `Into<Stdio>`
/// (e.g. `File`), so tests can feed a pipeline from a file.
pub trait Stdin: Read {
    /// Convert this input into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Read + Into<Stdio>> Stdin for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// Abstraction over a writable output stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Write` and `Into<Stdio>`
/// (e.g. `std::io::Stdout` or `File`).
pub trait Stdout: Write {
    /// Convert this output into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// The shell's own standard input, handed to the first stage as-is.
pub struct InheritedStdin;

// Only `stdio()` is used to launch children; `Read` is here for the `Stdin` supertrait.
impl Read for InheritedStdin {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().read(buf)
    }
}

impl Stdin for InheritedStdin {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// Where a pipeline reads from and writes to at its two outer ends.
///
/// The first stage's stdin comes from `stdin`, the last stage's stdout goes to `stdout`.
/// Everything in between is connected with pipes by the executor.
pub struct PipelineIo {
    pub stdin: Box<dyn Stdin>,
    pub stdout: Box<dyn Stdout>,
}

impl PipelineIo {
    pub fn new(stdin: Box<dyn Stdin>, stdout: Box<dyn Stdout>) -> Self {
        Self { stdin, stdout }
    }

    /// Both ends attached to the shell's own terminal streams.
    pub fn inherit() -> Self {
        Self::new(Box::new(InheritedStdin), Box::new(io::stdout()))
    }
}
