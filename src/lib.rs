//! pft - file transfer over a single duplex byte stream
//!
//! A sender and a receiver exchange an 8-byte role/version header, then the
//! sender streams one length-prefixed frame per file and a terminator frame.
//! The stream can be anything `Read + Write`: a socket, a pipe, or a
//! compressing wrapper.

pub mod buffer;
pub mod cli;
pub mod config;
pub mod error;
pub mod fs_enum;
pub mod header;
pub mod logger;
pub mod net;
pub mod pipe;
pub mod progress;
pub mod protocol;
pub mod protocol_core;
pub mod recv;
pub mod send;

pub use error::{NegotiateError, Result, TransferError};
pub use fs_enum::{flatten, FileEntry};
pub use header::{negotiate, Header, Role, RECEIVER_HEADER, SENDER_HEADER};
pub use progress::{NoProgress, ProgressSink};
pub use recv::{negotiate_and_receive, receive_files};
pub use send::{negotiate_and_send, send_files, TransferStats};
