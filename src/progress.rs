//! Per-file progress reporting
//!
//! The transfer loops only ever tell a sink "this file, this percentage".
//! Rendering is up to the sink: terminal bars, a journal, or nothing.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

pub trait ProgressSink {
    fn file_started(&mut self, _name: &str, _size: u64) {}
    fn progress(&mut self, _name: &str, _percent: u8) {}
    fn file_done(&mut self, _name: &str, _bytes: u64) {}
}

pub struct NoProgress;
impl ProgressSink for NoProgress {}

impl<T: ProgressSink + ?Sized> ProgressSink for &mut T {
    fn file_started(&mut self, name: &str, size: u64) {
        (**self).file_started(name, size)
    }
    fn progress(&mut self, name: &str, percent: u8) {
        (**self).progress(name, percent)
    }
    fn file_done(&mut self, name: &str, bytes: u64) {
        (**self).file_done(name, bytes)
    }
}

impl<T: ProgressSink + ?Sized> ProgressSink for Box<T> {
    fn file_started(&mut self, name: &str, size: u64) {
        (**self).file_started(name, size)
    }
    fn progress(&mut self, name: &str, percent: u8) {
        (**self).progress(name, percent)
    }
    fn file_done(&mut self, name: &str, bytes: u64) {
        (**self).file_done(name, bytes)
    }
}

impl<T: ProgressSink> ProgressSink for Option<T> {
    fn file_started(&mut self, name: &str, size: u64) {
        if let Some(s) = self {
            s.file_started(name, size)
        }
    }
    fn progress(&mut self, name: &str, percent: u8) {
        if let Some(s) = self {
            s.progress(name, percent)
        }
    }
    fn file_done(&mut self, name: &str, bytes: u64) {
        if let Some(s) = self {
            s.file_done(name, bytes)
        }
    }
}

/// Fan out to two sinks (e.g. bars + journal)
impl<A: ProgressSink, B: ProgressSink> ProgressSink for (A, B) {
    fn file_started(&mut self, name: &str, size: u64) {
        self.0.file_started(name, size);
        self.1.file_started(name, size);
    }
    fn progress(&mut self, name: &str, percent: u8) {
        self.0.progress(name, percent);
        self.1.progress(name, percent);
    }
    fn file_done(&mut self, name: &str, bytes: u64) {
        self.0.file_done(name, bytes);
        self.1.file_done(name, bytes);
    }
}

/// Integer completion percentage of one file, reported only on change.
#[derive(Debug)]
pub struct Percent {
    size: u64,
    last: Option<u8>,
}

impl Percent {
    pub fn new(size: u64) -> Self {
        Self { size, last: None }
    }

    /// Feed the number of bytes still outstanding; returns the new
    /// percentage when it differs from the last one reported.
    pub fn update(&mut self, remaining: u64) -> Option<u8> {
        let pct = if self.size == 0 {
            100
        } else {
            let left = u128::from(remaining.min(self.size)) * 100 / u128::from(self.size);
            (100 - left) as u8
        };
        if self.last == Some(pct) {
            return None;
        }
        self.last = Some(pct);
        Some(pct)
    }
}

/// One indicatif bar per file, 0..=100.
pub struct FileBars {
    multi: MultiProgress,
    style: ProgressStyle,
    current: Option<ProgressBar>,
}

impl FileBars {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let style = ProgressStyle::default_bar()
            .template("{msg:40!} [{bar:30.green/blue}] {pos:>3}% {bytes_per_sec}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        Self {
            multi: MultiProgress::with_draw_target(target),
            style,
            current: None,
        }
    }
}

impl Default for FileBars {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for FileBars {
    fn file_started(&mut self, name: &str, _size: u64) {
        let pb = self.multi.add(ProgressBar::new(100));
        pb.set_style(self.style.clone());
        pb.set_message(name.to_string());
        if let Some(prev) = self.current.replace(pb) {
            prev.finish();
        }
    }

    fn progress(&mut self, _name: &str, percent: u8) {
        if let Some(pb) = &self.current {
            pb.set_position(u64::from(percent));
        }
    }

    fn file_done(&mut self, _name: &str, _bytes: u64) {
        if let Some(pb) = self.current.take() {
            pb.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_reports_changes_only() {
        let mut p = Percent::new(1000);
        assert_eq!(p.update(1000), Some(0));
        assert_eq!(p.update(1000), None);
        assert_eq!(p.update(999), Some(1));
        assert_eq!(p.update(995), None);
        assert_eq!(p.update(990), None);
        assert_eq!(p.update(989), Some(2));
        assert_eq!(p.update(500), Some(50));
        assert_eq!(p.update(0), Some(100));
        assert_eq!(p.update(0), None);
    }

    #[test]
    fn test_percent_is_monotonic() {
        let mut p = Percent::new(7919);
        let mut seen = Vec::new();
        let mut remaining = 7919u64;
        while remaining > 0 {
            remaining = remaining.saturating_sub(13);
            if let Some(v) = p.update(remaining) {
                seen.push(v);
            }
        }
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn test_percent_empty_file() {
        let mut p = Percent::new(0);
        assert_eq!(p.update(0), Some(100));
        assert_eq!(p.update(0), None);
    }

    #[test]
    fn test_percent_large_file_does_not_overflow() {
        let mut p = Percent::new(u64::MAX);
        assert_eq!(p.update(u64::MAX), Some(0));
        assert_eq!(p.update(0), Some(100));
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);
    impl ProgressSink for Recorder {
        fn file_started(&mut self, name: &str, size: u64) {
            self.0.push(format!("start {name} {size}"));
        }
        fn progress(&mut self, name: &str, percent: u8) {
            self.0.push(format!("{name} {percent}"));
        }
    }

    #[test]
    fn test_tee_forwards_to_both() {
        let mut tee = (Recorder::default(), Recorder::default());
        tee.file_started("a", 3);
        tee.progress("a", 100);
        tee.file_done("a", 3);
        assert_eq!(tee.0 .0, vec!["start a 3", "a 100"]);
        assert_eq!(tee.0 .0, tee.1 .0);
    }

    #[test]
    fn test_hidden_bars_accept_events() {
        let mut bars = FileBars::hidden();
        bars.file_started("x.bin", 10);
        bars.progress("x.bin", 40);
        bars.file_done("x.bin", 10);
        assert!(bars.current.is_none());
    }
}
