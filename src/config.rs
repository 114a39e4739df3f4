use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::protocol::DEFAULT_BUF_SIZE;

/// Persistent defaults; every field can be overridden on the command line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub buf_size: String,  // {num}[K/M/G]
    pub compress: bool,    // --zstd
    pub create_dest: bool, // --create
    pub progress: bool,    // per-file bars on stderr
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buf_size: DEFAULT_BUF_SIZE.to_string(),
            compress: false,
            create_dest: false,
            progress: true,
        }
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(windows)]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("pft");
        }
    }
    // Unix-like default
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join("pft");
    }
    PathBuf::from(".pft")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    /// A missing file means defaults; an unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let p = path.map(Path::to_path_buf).unwrap_or_else(config_path);
        match std::fs::read_to_string(&p) {
            Ok(data) => Self::from_toml(&data)
                .with_context(|| format!("parse config {}", p.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("read config {}", p.display())),
        }
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = Config::from_toml("compress = true\nbuf_size = \"64K\"\n").unwrap();
        assert_eq!(cfg.buf_size, "64K");
        assert!(cfg.compress);
        assert!(!cfg.create_dest);
        assert!(cfg.progress);
    }

    #[test]
    fn test_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::load(Some(&tmp.path().join("none.toml"))).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let p = tmp.path().join("bad.toml");
        std::fs::write(&p, "compress = \"yes please\"").unwrap();
        let err = Config::load(Some(&p)).unwrap_err();
        assert!(format!("{err:#}").contains("parse config"));
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let text = Config::default().to_toml().unwrap();
        assert!(text.contains("buf_size = \"1M\""));
        assert_eq!(Config::from_toml(&text).unwrap(), Config::default());
    }
}
