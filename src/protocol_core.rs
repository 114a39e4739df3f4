//! Frame codec shared by the sender and the receiver
//!
//! Pure encode/decode of the 16-byte length pair that precedes every file and
//! of the terminator sentinel. No I/O happens here.

use crate::error::{Result, TransferError};
use crate::protocol::{FRAME_HEADER_LEN, MAX_NAME_LEN};

/// Name length and file size announced ahead of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub name_len: u64,
    pub file_size: u64,
}

impl FrameHeader {
    /// End of session. The size field is written as zero and ignored on read.
    pub const TERMINATOR: FrameHeader = FrameHeader {
        name_len: 0,
        file_size: 0,
    };

    pub fn new(name: &str, file_size: u64) -> Self {
        Self {
            name_len: name.len() as u64,
            file_size,
        }
    }

    /// Build frame header (16 bytes)
    /// Format: NAME_LEN (8, BE) | FILE_SIZE (8, BE)
    pub fn encode(&self) -> [u8; FRAME_HEADER_LEN] {
        let mut buf = [0u8; FRAME_HEADER_LEN];
        buf[0..8].copy_from_slice(&self.name_len.to_be_bytes());
        buf[8..16].copy_from_slice(&self.file_size.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8; FRAME_HEADER_LEN]) -> Self {
        let mut name_len = [0u8; 8];
        let mut file_size = [0u8; 8];
        name_len.copy_from_slice(&buf[0..8]);
        file_size.copy_from_slice(&buf[8..16]);
        Self {
            name_len: u64::from_be_bytes(name_len),
            file_size: u64::from_be_bytes(file_size),
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.name_len == 0
    }

    /// Reject name lengths a receiver should never allocate for.
    pub fn checked_name_len(&self) -> Result<usize> {
        if self.name_len > MAX_NAME_LEN {
            return Err(TransferError::NameTooLong(self.name_len));
        }
        Ok(self.name_len as usize)
    }
}

/// Reduce a wire name to the component a receiver writes to.
///
/// Directory parts are dropped: `"docs/a/b.txt"` lands as `"b.txt"`, and
/// trailing slashes are ignored (`"docs/"` lands as `"docs"`). Names whose
/// final component cannot be a plain file name are rejected.
pub fn wire_file_name(name: &str) -> Result<&str> {
    let trimmed = name.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let bad = last.is_empty()
        || last == "."
        || last == ".."
        || last.contains('\0')
        || (cfg!(windows) && (last.contains('\\') || last.contains(':')));
    if bad {
        return Err(TransferError::InvalidName(name.to_string()));
    }
    Ok(last)
}
