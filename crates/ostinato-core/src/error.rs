//! Error types for ostinato-core.

use crate::state::{State, Stream};
use thiserror::Error;

/// Error type for PCM engine operations.
///
/// Flow errors (`WouldBlock`, `Underrun`, `Overrun`) are expected during
/// normal streaming and are recovered by the caller; everything else is a
/// configuration, state, or transport failure. [`Error::errno`] exposes the
/// conventional negative POSIX code for callers bridging to C-style APIs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    Invalid(&'static str),

    #[error("empty configuration space")]
    EmptySpace,

    #[error("{op} called in state {state}")]
    BadState { op: &'static str, state: State },

    #[error("playback underrun")]
    Underrun,

    #[error("capture overrun")]
    Overrun,

    #[error("operation would block")]
    WouldBlock,

    #[error("not supported by back-end: {0}")]
    NotSupported(&'static str),

    #[error("out of memory")]
    NoMemory,

    #[error("unknown PCM name: {0}")]
    NotFound(String),

    #[error("no back-end registered for type: {0}")]
    NoBackend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The xrun error for a stream direction.
    pub fn xrun(stream: Stream) -> Self {
        match stream {
            Stream::Playback => Error::Underrun,
            Stream::Capture => Error::Overrun,
        }
    }

    /// True for under/over-run errors.
    pub fn is_xrun(&self) -> bool {
        matches!(self, Error::Underrun | Error::Overrun)
    }

    /// The conventional negative POSIX error code for this error.
    pub fn errno(&self) -> i32 {
        match self {
            Error::Invalid(_) | Error::EmptySpace => -libc_consts::EINVAL,
            Error::BadState { .. } => -libc_consts::EBADFD,
            Error::Underrun | Error::Overrun => -libc_consts::EPIPE,
            Error::WouldBlock => -libc_consts::EAGAIN,
            Error::NotSupported(_) => -libc_consts::ENOSYS,
            Error::NoMemory => -libc_consts::ENOMEM,
            Error::NotFound(_) => -libc_consts::ENOENT,
            Error::NoBackend(_) => -libc_consts::ENXIO,
            Error::Io(e) => e.raw_os_error().map(|n| -n).unwrap_or(-libc_consts::EIO),
        }
    }
}

/// Linux errno values, so the mapping needs no libc dependency.
mod libc_consts {
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const ENXIO: i32 = 6;
    pub const EAGAIN: i32 = 11;
    pub const ENOMEM: i32 = 12;
    pub const EINVAL: i32 = 22;
    pub const EPIPE: i32 = 32;
    pub const ENOSYS: i32 = 38;
    pub const EBADFD: i32 = 77;
}
