//! Receiver side: parse frames and publish each file atomically.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{bail, Context};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Result, TransferError};
use crate::header::{negotiate, RECEIVER_HEADER};
use crate::progress::{Percent, ProgressSink};
use crate::protocol::{FRAME_HEADER_LEN, TMP_SUFFIX};
use crate::protocol_core::{wire_file_name, FrameHeader};
use crate::send::TransferStats;

/// Scratch file for one incoming file: `<final>.XXXXXX.pft_tmp` in the
/// destination directory. Unlinked on drop unless persisted.
fn temp_for(dest_dir: &Path, file_name: &str) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(&format!("{file_name}."))
        .suffix(TMP_SUFFIX)
        .tempfile_in(dest_dir)
}

/// Negotiate as receiver, then accept files into `dest_dir` until the
/// terminator frame arrives.
///
/// Takes ownership of the stream: it is closed on return, success or failure.
pub fn negotiate_and_receive<S>(
    dest_dir: &Path,
    mut stream: S,
    chunk_size: usize,
    progress: &mut dyn ProgressSink,
) -> Result<TransferStats>
where
    S: Read + Write,
{
    if chunk_size == 0 {
        return Err(TransferError::ZeroChunkSize);
    }
    negotiate(&RECEIVER_HEADER, &mut stream)?;
    let res = receive_files(dest_dir, &mut stream, chunk_size, progress);
    drop(stream);
    res
}

/// Frame loop without the handshake.
pub fn receive_files<S>(
    dest_dir: &Path,
    stream: &mut S,
    chunk_size: usize,
    progress: &mut dyn ProgressSink,
) -> Result<TransferStats>
where
    S: Read + ?Sized,
{
    if chunk_size == 0 {
        return Err(TransferError::ZeroChunkSize);
    }
    info!(dest = %dest_dir.display(), "started receiving");

    let mut buf = vec![0u8; chunk_size];
    let mut stats = TransferStats::default();
    loop {
        let mut raw = [0u8; FRAME_HEADER_LEN];
        stream.read_exact(&mut raw).map_err(TransferError::Stream)?;
        let hdr = FrameHeader::decode(&raw);
        if hdr.is_terminator() {
            break;
        }

        let mut name = vec![0u8; hdr.checked_name_len()?];
        stream.read_exact(&mut name).map_err(TransferError::Stream)?;
        let name = String::from_utf8(name)
            .map_err(|e| TransferError::InvalidName(String::from_utf8_lossy(e.as_bytes()).into_owned()))?;

        let bytes = receive_one(dest_dir, &name, hdr.file_size, stream, &mut buf, progress)?;
        stats.add_file(bytes);
    }

    info!(files = stats.files, bytes = stats.bytes, "finished receiving");
    Ok(stats)
}

fn receive_one<S>(
    dest_dir: &Path,
    wire_name: &str,
    size: u64,
    stream: &mut S,
    buf: &mut [u8],
    progress: &mut dyn ProgressSink,
) -> Result<u64>
where
    S: Read + ?Sized,
{
    let file_name = wire_file_name(wire_name)?;
    let final_path = dest_dir.join(file_name);

    let mut tmp = temp_for(dest_dir, file_name).map_err(TransferError::file("create", dest_dir))?;

    progress.file_started(file_name, size);
    let mut pct = Percent::new(size);
    let mut remaining = size;
    if let Some(p) = pct.update(remaining) {
        progress.progress(file_name, p);
    }

    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = match stream.read(&mut buf[..want]) {
            Ok(0) => {
                return Err(TransferError::Stream(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream closed with {remaining} bytes of {wire_name} outstanding"),
                )))
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::Stream(e)),
        };
        if let Err(e) = tmp.write_all(&buf[..n]) {
            return Err(TransferError::file("write", tmp.path())(e));
        }
        remaining -= n as u64;
        if let Some(p) = pct.update(remaining) {
            progress.progress(file_name, p);
        }
    }

    tmp.persist(&final_path)
        .map_err(|e| TransferError::file("rename", &final_path)(e.error))?;
    progress.file_done(file_name, size);
    debug!(name = wire_name, path = %final_path.display(), size, "received");
    Ok(size)
}

/// Make sure `dir` can receive files, creating it when asked to.
///
/// An empty path means the current directory.
pub fn ensure_dest_dir(dir: &Path, create: bool) -> anyhow::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    match fs::metadata(dir) {
        Ok(md) if md.is_dir() => Ok(()),
        Ok(_) => bail!("check {:?} dir existence: not a directory", dir),
        Err(e) if e.kind() == io::ErrorKind::NotFound && create => {
            fs::create_dir_all(dir)
                .with_context(|| format!("check {:?} dir existence: create failed", dir))?;
            info!(dir = %dir.display(), "created directory");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("check {:?} dir existence", dir)),
    }
}
