//! Error taxonomy for negotiation, enumeration and transfer

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::header::Role;
use crate::protocol::MAX_NAME_LEN;

pub type Result<T, E = TransferError> = std::result::Result<T, E>;

/// Why the 8-byte header exchange did not produce a usable session.
#[derive(Debug, Error)]
pub enum NegotiateError {
    #[error("check headers: the header of the second party is not correct ({0:?})")]
    Malformed([u8; 8]),

    #[error("check headers: the second party is also the {0}")]
    SameRole(Role),

    #[error("check headers: the second party has a new incompatible version ({remote} > {local})")]
    RemoteNewer { local: u16, remote: u16 },

    #[error("check headers: the second party has an old incompatible version ({remote} < {local})")]
    RemoteOlder { local: u16, remote: u16 },

    #[error("check headers: failed to receive or send the header")]
    Io(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Negotiate(#[from] NegotiateError),

    #[error("prepare {count} files to send: {}", path.display())]
    Enumerate {
        count: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("prepare {count} files to send: {} is not valid UTF-8", path.display())]
    NonUtf8Name { count: usize, path: PathBuf },

    #[error("{op} {}", path.display())]
    File {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("stream i/o failed")]
    Stream(#[source] io::Error),

    #[error("invalid file name on the wire: {0:?}")]
    InvalidName(String),

    #[error("file name length {0} exceeds {MAX_NAME_LEN} bytes")]
    NameTooLong(u64),

    #[error("{} shrank while sending: announced {expected} bytes, {missing} missing", path.display())]
    SizeChanged {
        path: PathBuf,
        expected: u64,
        missing: u64,
    },

    #[error("chunk size must be positive")]
    ZeroChunkSize,
}

impl TransferError {
    pub(crate) fn file(op: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| TransferError::File { op, path, source }
    }
}

/// Buffer-size string rejected by [`crate::buffer::parse_buffer_size`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufSizeError {
    #[error("buf size: wrong format {0:?}, use {{num}}[K/M/G]")]
    WrongFormat(String),

    #[error("buf size: must be greater than zero")]
    Zero,

    #[error("buf size: size too large {0:?}")]
    TooLarge(String),
}
