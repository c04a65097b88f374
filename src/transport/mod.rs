//! Transport: a reliable ordered byte stream over TCP, optionally wrapped
//! in TLS (§4.2). No framing — the telnet engine owns that.

mod tls;

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{TransportError, TransportResult};

pub use tls::{SecLevel, VerifyMode};

/// TLS posture requested for a connection.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub seclevel: SecLevel,
    pub verify: VerifyMode,
    pub ca_bundle_path: Option<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self { seclevel: SecLevel::default(), verify: VerifyMode::default(), ca_bundle_path: None }
    }
}

enum Stream {
    Plain(TcpStream),
    Tls(tls::TlsStream),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            Stream::Tls(s) => s.flush(),
        }
    }
}

/// The outcome of a bounded [`Transport::read`].
pub enum ReadOutcome {
    Data(Vec<u8>),
    Closed,
    Timeout,
}

/// A connected transport: TCP, optionally TLS-wrapped.
pub struct Transport {
    stream: Stream,
    host: String,
    port: u16,
}

impl Transport {
    /// Default port for a given TLS posture: 992 for TLS, 23 for plain.
    pub fn default_port(use_tls: bool) -> u16 {
        if use_tls {
            992
        } else {
            23
        }
    }

    pub fn connect(host: &str, port: u16, tls: Option<&TlsConfig>) -> TransportResult<Self> {
        let address = format!("{host}:{port}");
        let tcp = TcpStream::connect(&address).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                TransportError::Timeout { host: host.to_string(), port, timeout_ms: 0 }
            } else {
                TransportError::ConnectionRefused { host: host.to_string(), port }
            }
        })?;
        tcp.set_nodelay(true).ok();

        let stream = match tls {
            Some(cfg) => Stream::Tls(tls::TlsStream::connect(tcp, host, cfg)?),
            None => Stream::Plain(tcp),
        };

        log::info!("transport connected to {host}:{port} (tls={})", tls.is_some());
        Ok(Self { stream, host: host.to_string(), port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Read up to `n` bytes, waiting at most `timeout`. A short read is
    /// still `Data` (the caller loops as needed); `Closed` means EOF;
    /// `Timeout` means the deadline elapsed with nothing available.
    pub fn read(&mut self, n: usize, timeout: Duration) -> TransportResult<ReadOutcome> {
        self.set_read_timeout(Some(timeout))?;
        let mut buf = vec![0u8; n.max(1)];
        match self.stream.read(&mut buf) {
            Ok(0) => Ok(ReadOutcome::Closed),
            Ok(count) => {
                buf.truncate(count);
                Ok(ReadOutcome::Data(buf))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                Ok(ReadOutcome::Timeout)
            }
            Err(e) => Err(TransportError::ConnectionLost { reason: e.to_string() }),
        }
    }

    pub fn write(&mut self, bytes: &[u8]) -> TransportResult<()> {
        self.stream
            .write_all(bytes)
            .map_err(|e| TransportError::ConnectionLost { reason: e.to_string() })
    }

    pub fn close(&mut self) {
        log::info!("transport closing {}:{}", self.host, self.port);
        if let Stream::Plain(tcp) = &self.stream {
            let _ = tcp.shutdown(std::net::Shutdown::Both);
        }
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> TransportResult<()> {
        let result = match &self.stream {
            Stream::Plain(s) => s.set_read_timeout(timeout),
            Stream::Tls(s) => s.set_read_timeout(timeout),
        };
        result.map_err(|e| TransportError::ConnectionLost { reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_follows_tls_posture() {
        assert_eq!(Transport::default_port(true), 992);
        assert_eq!(Transport::default_port(false), 23);
    }
}
