//! Ownership of the pipes that connect adjacent pipeline stages.
//!
//! Every descriptor lives in an [`OwnedFd`], so it is closed exactly once: either by the
//! child-spawn machinery after it has been duplicated onto the child's stdin/stdout, or by
//! `Drop` when the parent no longer needs it. All pipes are created close-on-exec, so a
//! child only ever keeps the two ends installed as its standard streams.

use std::os::fd::OwnedFd;

/// One pipe between stage `i` (writer) and stage `i + 1` (reader).
#[derive(Debug)]
pub struct PipeEndpoint {
    read: Option<OwnedFd>,
    write: Option<OwnedFd>,
}

impl PipeEndpoint {
    /// Create a new close-on-exec pipe.
    pub fn open() -> nix::Result<Self> {
        let (read, write) = cloexec_pipe()?;
        Ok(Self {
            read: Some(read),
            write: Some(write),
        })
    }

    /// Hand out the read end. Returns `None` if it was already taken.
    pub fn take_read(&mut self) -> Option<OwnedFd> {
        self.read.take()
    }

    /// Hand out the write end. Returns `None` if it was already taken.
    pub fn take_write(&mut self) -> Option<OwnedFd> {
        self.write.take()
    }
}

/// The N-1 pipes of an N-stage pipeline, indexed by stage boundary.
#[derive(Debug, Default)]
pub struct PipeSet {
    pipes: Vec<PipeEndpoint>,
}

impl PipeSet {
    /// Allocate the pipes for a pipeline of `stages` commands.
    ///
    /// If allocation fails part way, the pipes created so far are closed before the error
    /// is returned.
    pub fn for_stages(stages: usize) -> nix::Result<Self> {
        let pipes = (1..stages)
            .map(|_| PipeEndpoint::open())
            .collect::<nix::Result<Vec<_>>>()?;
        Ok(Self { pipes })
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Read end feeding stage `stage`, i.e. the read end of pipe `stage - 1`.
    pub fn stdin_for(&mut self, stage: usize) -> Option<OwnedFd> {
        let index = stage.checked_sub(1)?;
        self.pipes.get_mut(index)?.take_read()
    }

    /// Write end fed by stage `stage`, i.e. the write end of pipe `stage`.
    pub fn stdout_for(&mut self, stage: usize) -> Option<OwnedFd> {
        self.pipes.get_mut(stage)?.take_write()
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "illumos",
    target_os = "solaris"
))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "illumos",
    target_os = "solaris"
)))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{FcntlArg, FdFlag, fcntl};

    let (read, write) = nix::unistd::pipe()?;
    for fd in [&read, &write] {
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read, write))
}
