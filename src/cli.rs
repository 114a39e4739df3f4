//! Command-line definitions for the `pft` binary

use clap::{ArgGroup, Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::net::Endpoint;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "pft - send files and directories over a single TCP connection"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (default: ~/.config/pft/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Warnings only, no progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send files and directories to the peer
    Send {
        #[command(flatten)]
        conn: ConnOpts,

        /// Files or directories to send
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Receive files into a directory
    Recv {
        #[command(flatten)]
        conn: ConnOpts,

        /// Create the destination directory if it does not exist
        #[arg(short = 'c', long)]
        create: bool,

        /// Destination directory
        #[arg(default_value = ".")]
        dest: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// Options shared by `send` and `recv`
#[derive(Debug, Clone, ClapArgs)]
#[command(group(ArgGroup::new("endpoint").required(true).args(["connect", "listen"])))]
pub struct ConnOpts {
    /// Dial the peer (host:port)
    #[arg(long)]
    pub connect: Option<String>,

    /// Wait for the peer on this address (host:port)
    #[arg(long)]
    pub listen: Option<String>,

    /// Chunk size per read/write: {num}[K/M/G]
    #[arg(short = 'b', long = "buf")]
    pub buf_size: Option<String>,

    /// Compress the stream with zstd (both ends must agree)
    #[arg(long)]
    pub zstd: bool,

    /// Append a plain-text journal of the session to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

impl ConnOpts {
    pub fn endpoint(&self) -> Endpoint {
        match (&self.connect, &self.listen) {
            (Some(addr), _) => Endpoint::Connect(addr.clone()),
            (None, Some(bind)) => Endpoint::Listen(bind.clone()),
            // clap's required group guarantees one of the two
            (None, None) => Endpoint::Listen("0.0.0.0:0".to_string()),
        }
    }
}
