use anyhow::{Context, Result};
use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use tracing::info;

use crate::protocol::ZSTD_LEVEL;

// Connection setup for the binary. The transfer core only sees `Read + Write`.

/// Which side of the TCP connection this process takes.
/// Independent of the sender/receiver role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Connect(String),
    Listen(String),
}

/// Dial, or listen and accept exactly one connection.
pub fn open(endpoint: &Endpoint) -> Result<TcpStream> {
    let stream = match endpoint {
        Endpoint::Connect(addr) => {
            TcpStream::connect(addr).with_context(|| format!("connect {}", addr))?
        }
        Endpoint::Listen(bind) => {
            let listener = TcpListener::bind(bind).with_context(|| format!("bind {}", bind))?;
            info!(%bind, "listening");
            let (stream, peer) = listener.accept().context("accept")?;
            info!(%peer, "conn from");
            stream
        }
    };
    tune_socket(&stream);
    Ok(stream)
}

// Disable Nagle: the header exchange is two tiny writes
fn tune_socket(stream: &TcpStream) {
    let _ = stream.set_nodelay(true);
}

/// Duplex zstd layer: compress what we write, decompress what we read.
///
/// `flush` ends the current zstd block so the peer can decode everything
/// written so far; the core flushes after the header and the terminator.
pub struct ZstdStream<R: Read, W: Write> {
    reader: zstd::stream::read::Decoder<'static, BufReader<R>>,
    writer: zstd::stream::write::Encoder<'static, W>,
}

impl<R: Read, W: Write> ZstdStream<R, W> {
    pub fn new(reader: R, writer: W) -> io::Result<Self> {
        Ok(Self {
            reader: zstd::stream::read::Decoder::new(reader)?,
            writer: zstd::stream::write::Encoder::new(writer, ZSTD_LEVEL)?,
        })
    }

    /// Write the end of the zstd frame and hand back the raw writer.
    pub fn finish(self) -> io::Result<W> {
        self.writer.finish()
    }
}

impl<R: Read, W: Write> Read for ZstdStream<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl<R: Read, W: Write> Write for ZstdStream<R, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// A connected TCP stream, optionally compressed.
pub enum Transport {
    Plain(TcpStream),
    Zstd(ZstdStream<TcpStream, TcpStream>),
}

impl Transport {
    pub fn new(stream: TcpStream, compress: bool) -> io::Result<Self> {
        if compress {
            let reader = stream.try_clone()?;
            Ok(Transport::Zstd(ZstdStream::new(reader, stream)?))
        } else {
            Ok(Transport::Plain(stream))
        }
    }

    /// Finish any compression frame and half-close our direction.
    pub fn close(self) -> io::Result<()> {
        let stream = match self {
            Transport::Plain(s) => s,
            Transport::Zstd(z) => z.finish()?,
        };
        match stream.shutdown(Shutdown::Write) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.read(buf),
            Transport::Zstd(z) => z.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.write(buf),
            Transport::Zstd(z) => z.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(s) => s.flush(),
            Transport::Zstd(z) => z.flush(),
        }
    }
}
