//! pft - point-to-point file transfer
//!
//! One side sends, the other receives; either side may dial or listen.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pft::buffer::parse_buffer_size;
use pft::cli::{Args, Command, ConnOpts};
use pft::config::Config;
use pft::logger::TextLogger;
use pft::net::{self, Transport};
use pft::progress::FileBars;
use pft::recv::ensure_dest_dir;
use pft::{negotiate_and_receive, negotiate_and_send, Role, TransferStats};

/// Per-run settings after merging CLI over config
struct Session {
    chunk_size: usize,
    compress: bool,
    bars: Option<FileBars>,
    journal: Option<TextLogger>,
}

impl Session {
    fn new(config: &Config, conn: &ConnOpts, quiet: bool) -> Result<Self> {
        let buf = conn.buf_size.as_deref().unwrap_or(&config.buf_size);
        let chunk_size = parse_buffer_size(buf)?;
        let journal = match &conn.log_file {
            Some(p) => Some(
                TextLogger::new(p).with_context(|| format!("open log file {}", p.display()))?,
            ),
            None => None,
        };
        Ok(Self {
            chunk_size,
            compress: conn.zstd || config.compress,
            bars: (config.progress && !quiet).then(FileBars::new),
            journal,
        })
    }

    fn connect(&mut self, conn: &ConnOpts, role: Role) -> Result<Transport> {
        let stream = net::open(&conn.endpoint())?;
        let peer = peer_name(&stream);
        if let Some(j) = self.journal.as_mut() {
            j.session_start(role, &peer);
        }
        info!(%peer, %role, compress = self.compress, chunk_size = self.chunk_size, "connected");
        Transport::new(stream, self.compress).context("set up zstd stream")
    }

    fn report(&mut self, res: pft::Result<TransferStats>, start: Instant) -> Result<TransferStats> {
        let secs = start.elapsed().as_secs_f64();
        match res {
            Ok(stats) => {
                if let Some(j) = self.journal.as_mut() {
                    j.done(stats.files, stats.bytes, secs);
                }
                info!(
                    files = stats.files,
                    bytes = stats.bytes,
                    "done in {:.1}s ({:.1} MB/s)",
                    secs,
                    stats.bytes as f64 / secs.max(1e-9) / 1_048_576.0
                );
                Ok(stats)
            }
            Err(e) => {
                let e = anyhow::Error::from(e);
                if let Some(j) = self.journal.as_mut() {
                    j.error(&format!("{e:#}"));
                }
                Err(e)
            }
        }
    }
}

fn peer_name(stream: &TcpStream) -> String {
    stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "pft=debug"
    } else if quiet {
        "pft=warn"
    } else {
        "pft=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_send(config: &Config, conn: &ConnOpts, paths: &[PathBuf], quiet: bool) -> Result<()> {
    let mut session = Session::new(config, conn, quiet)?;
    let mut transport = session.connect(conn, Role::Sender)?;

    let start = Instant::now();
    let res = negotiate_and_send(
        paths,
        &mut transport,
        session.chunk_size,
        &mut (&mut session.bars, &mut session.journal),
    );
    session.report(res, start)?;
    transport.close().context("close connection")?;
    Ok(())
}

fn run_recv(config: &Config, conn: &ConnOpts, dest: &Path, create: bool, quiet: bool) -> Result<()> {
    ensure_dest_dir(dest, create || config.create_dest)?;
    let mut session = Session::new(config, conn, quiet)?;
    let transport = session.connect(conn, Role::Receiver)?;

    let start = Instant::now();
    let res = negotiate_and_receive(
        dest,
        transport,
        session.chunk_size,
        &mut (&mut session.bars, &mut session.journal),
    );
    session.report(res, start)?;
    Ok(())
}

fn main() -> Result<()> {
    // Set up Ctrl-C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        // Exit immediately with 130 (128 + SIGINT)
        std::process::exit(130);
    })
    .expect("Error setting Ctrl-C handler");

    let args = Args::parse();
    init_logging(args.verbose, args.quiet);
    let config = Config::load(args.config.as_deref())?;

    match &args.command {
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::Send { conn, paths } => run_send(&config, conn, paths, args.quiet),
        Command::Recv { conn, create, dest } => {
            run_recv(&config, conn, dest, *create, args.quiet)
        }
    }
}
