use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Result, TransferError};

// Flatten user-supplied files and directories into the ordered list the sender streams

/// One file to transfer: where to read it and what to call it on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub open_path: PathBuf,
    /// `/`-joined, relative to the parent of the user-supplied path
    pub send_name: String,
}

/// Expand `paths` into files, recursing into directories.
///
/// ```text
/// /a/b/c.d  ->  c.d
/// /e/g/f    ->  f/a.c, f/b.d, f/g/n
/// ```
///
/// Order is input order, then directory-read order depth-first within each
/// directory (no sorting). Symlinks are followed; a symlink whose target is
/// missing is skipped with a warning. Any other filesystem error aborts.
pub fn flatten<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<FileEntry>> {
    let count = paths.len();
    let mut entries = Vec::with_capacity(count);
    for p in paths {
        add_tree(p.as_ref(), count, &mut entries)?;
    }
    Ok(entries)
}

fn add_tree(root: &Path, count: usize, out: &mut Vec<FileEntry>) -> Result<()> {
    let root_name = root_name(root, count)?;

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                if err.depth() > 0 {
                    if let Some(p) = err.path() {
                        if is_broken_symlink(p) {
                            warn!(path = %p.display(), "ignore broken symlink");
                            continue;
                        }
                    }
                }
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                return Err(TransferError::Enumerate {
                    count,
                    path,
                    source: err.into(),
                });
            }
        };

        let ft = entry.file_type();
        if ft.is_dir() {
            continue;
        }
        if !ft.is_file() {
            warn!(path = %entry.path().display(), "skip special file");
            continue;
        }

        let rel = entry.path().strip_prefix(root).unwrap_or(Path::new(""));
        let send_name = send_name(root_name.as_deref(), rel, entry.path(), count)?;
        out.push(FileEntry {
            open_path: entry.into_path(),
            send_name,
        });
    }
    Ok(())
}

/// Wire name of the user-supplied path itself (`None` for a filesystem root).
fn root_name(root: &Path, count: usize) -> Result<Option<String>> {
    let name = match root.file_name() {
        Some(n) => n.to_os_string(),
        // ".", ".." and the like: name the directory they resolve to
        None => {
            let canonical = fs::canonicalize(root).map_err(|source| TransferError::Enumerate {
                count,
                path: root.to_path_buf(),
                source,
            })?;
            match canonical.file_name() {
                Some(n) => n.to_os_string(),
                None => return Ok(None),
            }
        }
    };
    name.into_string()
        .map(Some)
        .map_err(|_| TransferError::NonUtf8Name {
            count,
            path: root.to_path_buf(),
        })
}

fn send_name(root_name: Option<&str>, rel: &Path, full: &Path, count: usize) -> Result<String> {
    let mut parts: Vec<&str> = root_name.into_iter().collect();
    for component in rel.components() {
        if let Component::Normal(s) = component {
            let s = s.to_str().ok_or_else(|| TransferError::NonUtf8Name {
                count,
                path: full.to_path_buf(),
            })?;
            parts.push(s);
        }
    }
    Ok(parts.join("/"))
}

fn is_broken_symlink(path: &Path) -> bool {
    let is_link = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    is_link && fs::metadata(path).is_err()
}
