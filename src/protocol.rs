//! Shared protocol constants for the pft wire format
//!
//! ```text
//! Session    := Header(8) Frame* Terminator
//! Header     := magic(3) role(1) version(3 ASCII digits) term(1)
//! Frame      := nameLen(8) fileSize(8) name(nameLen) content(fileSize)
//! Terminator := nameLen(8)=0 fileSize(8)=<ignored>
//! ```
//!
//! All integers are big-endian.

// Session header
pub const HEADER_LEN: usize = 8;
pub const MAGIC: &[u8; 3] = b"pft";
pub const VERSION: u16 = 5;
pub const HEADER_TERM: u8 = b'\n';

// Role bytes (header[3])
pub const ROLE_SENDER: u8 = b's';
pub const ROLE_RECEIVER: u8 = b'r';

// Per-file length pair: name length (8) | file size (8)
pub const FRAME_HEADER_LEN: usize = 16;

// Upper bound for a wire name - prevents huge allocations from a hostile peer
pub const MAX_NAME_LEN: u64 = 4096;

// Suffix of the in-progress file on the receiving side
pub const TMP_SUFFIX: &str = ".pft_tmp";

// Defaults used by the binary
pub const DEFAULT_BUF_SIZE: &str = "1M";

// zstd level used by --zstd (fast end of the scale)
pub const ZSTD_LEVEL: i32 = 1;
