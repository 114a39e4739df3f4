use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::header::Role;
use crate::progress::ProgressSink;

/// Append-only plain-text journal of one or more sessions.
///
/// Each line is `[timestamp] EVENT key=value ...`. Write failures are
/// swallowed; the journal must never abort a transfer.
pub struct TextLogger {
    file: File,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: f })
    }

    fn line(&mut self, s: &str) {
        let _ = writeln!(self.file, "[{}] {}", Utc::now().to_rfc3339(), s);
    }

    pub fn session_start(&mut self, role: Role, peer: &str) {
        self.line(&format!("START role={role} peer={peer}"));
    }

    pub fn error(&mut self, msg: &str) {
        self.line(&format!("ERROR msg={msg}"));
    }

    pub fn done(&mut self, files: u64, bytes: u64, seconds: f64) {
        self.line(&format!("DONE files={files} bytes={bytes} seconds={seconds:.3}"));
    }
}

impl ProgressSink for TextLogger {
    fn file_started(&mut self, name: &str, size: u64) {
        self.line(&format!("FILE name={name} size={size}"));
    }

    fn file_done(&mut self, name: &str, bytes: u64) {
        self.line(&format!("COPY name={name} bytes={bytes}"));
    }
}
