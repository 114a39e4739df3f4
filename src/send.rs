//! Sender side: stream a flattened file list as frames.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, TransferError};
use crate::fs_enum::{flatten, FileEntry};
use crate::header::{negotiate, SENDER_HEADER};
use crate::progress::{Percent, ProgressSink};
use crate::protocol::MAX_NAME_LEN;
use crate::protocol_core::FrameHeader;

/// Statistics for one finished session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    pub files: u64,
    pub bytes: u64,
}

impl TransferStats {
    pub fn add_file(&mut self, bytes: u64) {
        self.files += 1;
        self.bytes += bytes;
    }
}

/// Enumerate `paths`, negotiate as sender, then stream every file.
///
/// The stream is borrowed; closing it stays with the caller.
pub fn negotiate_and_send<P, S>(
    paths: &[P],
    stream: &mut S,
    chunk_size: usize,
    progress: &mut dyn ProgressSink,
) -> Result<TransferStats>
where
    P: AsRef<Path>,
    S: Read + Write + ?Sized,
{
    if chunk_size == 0 {
        return Err(TransferError::ZeroChunkSize);
    }
    let entries = flatten(paths)?;
    negotiate(&SENDER_HEADER, stream)?;
    send_files(&entries, stream, chunk_size, progress)
}

/// Write one frame per entry followed by the terminator frame.
///
/// Fails fast: the first open/stat/read/write error ends the session.
pub fn send_files<S>(
    entries: &[FileEntry],
    stream: &mut S,
    chunk_size: usize,
    progress: &mut dyn ProgressSink,
) -> Result<TransferStats>
where
    S: Write + ?Sized,
{
    if chunk_size == 0 {
        return Err(TransferError::ZeroChunkSize);
    }
    info!(files = entries.len(), "started sending");

    let mut buf = vec![0u8; chunk_size];
    let mut stats = TransferStats::default();
    for entry in entries {
        let sent = send_one(entry, stream, &mut buf, progress)?;
        stats.add_file(sent);
    }

    stream
        .write_all(&FrameHeader::TERMINATOR.encode())
        .and_then(|_| stream.flush())
        .map_err(TransferError::Stream)?;

    info!(files = stats.files, bytes = stats.bytes, "finished sending");
    Ok(stats)
}

fn send_one<S>(
    entry: &FileEntry,
    stream: &mut S,
    buf: &mut [u8],
    progress: &mut dyn ProgressSink,
) -> Result<u64>
where
    S: Write + ?Sized,
{
    let path = entry.open_path.as_path();
    let name = entry.send_name.as_str();
    if name.is_empty() {
        return Err(TransferError::InvalidName(name.to_string()));
    }
    if name.len() as u64 > MAX_NAME_LEN {
        return Err(TransferError::NameTooLong(name.len() as u64));
    }

    let mut file = File::open(path).map_err(TransferError::file("open", path))?;
    let size = file
        .metadata()
        .map_err(TransferError::file("stat", path))?
        .len();

    stream
        .write_all(&FrameHeader::new(name, size).encode())
        .and_then(|_| stream.write_all(name.as_bytes()))
        .map_err(TransferError::Stream)?;

    progress.file_started(name, size);
    let mut pct = Percent::new(size);
    let mut remaining = size;
    if let Some(p) = pct.update(remaining) {
        progress.progress(name, p);
    }

    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = match file.read(&mut buf[..want]) {
            Ok(0) => {
                return Err(TransferError::SizeChanged {
                    path: path.to_path_buf(),
                    expected: size,
                    missing: remaining,
                })
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::file("read", path)(e)),
        };
        stream.write_all(&buf[..n]).map_err(TransferError::Stream)?;
        remaining -= n as u64;
        if let Some(p) = pct.update(remaining) {
            progress.progress(name, p);
        }
    }

    progress.file_done(name, size);
    debug!(name, size, "sent");
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use std::fs;
    use tempfile::TempDir;

    fn entry(dir: &TempDir, name: &str, body: &[u8]) -> FileEntry {
        let p = dir.path().join(name.replace('/', "_"));
        fs::write(&p, body).unwrap();
        FileEntry {
            open_path: p,
            send_name: name.to_string(),
        }
    }

    #[test]
    fn test_wire_bytes_for_two_files() {
        let tmp = TempDir::new().unwrap();
        let entries = vec![entry(&tmp, "d/one", b"hello"), entry(&tmp, "two", b"")];

        let mut wire = Vec::new();
        let stats = send_files(&entries, &mut wire, 2, &mut NoProgress).unwrap();
        assert_eq!(stats, TransferStats { files: 2, bytes: 5 });

        let mut expected = Vec::new();
        expected.extend_from_slice(&5u64.to_be_bytes());
        expected.extend_from_slice(&5u64.to_be_bytes());
        expected.extend_from_slice(b"d/one");
        expected.extend_from_slice(b"hello");
        expected.extend_from_slice(&3u64.to_be_bytes());
        expected.extend_from_slice(&0u64.to_be_bytes());
        expected.extend_from_slice(b"two");
        expected.extend_from_slice(&[0u8; 16]);
        assert_eq!(wire, expected);
    }

    #[test]
    fn test_no_files_is_terminator_only() {
        let mut wire = Vec::new();
        let stats = send_files(&[], &mut wire, 4096, &mut NoProgress).unwrap();
        assert_eq!(stats, TransferStats::default());
        assert_eq!(wire, vec![0u8; 16]);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut wire = Vec::new();
        assert!(matches!(
            send_files(&[], &mut wire, 0, &mut NoProgress),
            Err(TransferError::ZeroChunkSize)
        ));
        assert!(wire.is_empty());
    }

    #[test]
    fn test_missing_file_aborts_before_its_frame() {
        let tmp = TempDir::new().unwrap();
        let good = entry(&tmp, "good", b"1234");
        let gone = FileEntry {
            open_path: tmp.path().join("gone"),
            send_name: "gone".to_string(),
        };

        let mut wire = Vec::new();
        let err = send_files(&[good, gone], &mut wire, 1024, &mut NoProgress).unwrap_err();
        assert!(matches!(err, TransferError::File { op: "open", .. }));
        // first frame went out, no terminator
        assert_eq!(wire.len(), 16 + 4 + 4);
    }

    #[test]
    fn test_write_failure_is_stream_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let tmp = TempDir::new().unwrap();
        let e = entry(&tmp, "x", b"data");
        let err = send_files(&[e], &mut Broken, 16, &mut NoProgress).unwrap_err();
        assert!(matches!(err, TransferError::Stream(_)));
    }

    #[test]
    fn test_progress_reaches_100() {
        #[derive(Default)]
        struct Seen(Vec<u8>);
        impl ProgressSink for Seen {
            fn progress(&mut self, _: &str, p: u8) {
                self.0.push(p);
            }
        }

        let tmp = TempDir::new().unwrap();
        let e = entry(&tmp, "big", &vec![7u8; 1000]);
        let mut seen = Seen::default();
        send_files(&[e], &mut io::sink(), 10, &mut seen).unwrap();
        assert_eq!(seen.0.first(), Some(&0));
        assert_eq!(seen.0.last(), Some(&100));
        assert_eq!(seen.0.len(), 101);
    }
}
