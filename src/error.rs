//! Error types for the TN3270(E) engine.
//!
//! Errors are grouped by the subsystem that raises them (transport,
//! negotiation, protocol interpretation, local input-rule violations,
//! codec) and rolled up into a single top-level [`Error`] that callers can
//! match on. Protocol-level failures are terminal for a session; input-rule
//! violations are local and advisory (§7 of the design).

use std::fmt;
use std::io;
use std::error::Error as StdError;

/// Top-level error type for engine operations.
#[derive(Debug)]
pub enum Error {
    /// TCP/TLS failure. Terminal: the session moves to `Closed`.
    Transport(TransportError),
    /// The host refused a mandatory TN3270(E) option. Terminal.
    Negotiation(NegotiationError),
    /// Malformed command/order/structured field. Terminal: keyboard is
    /// locked, a negative response is sent if RESPONSES was negotiated,
    /// and the session closes.
    Protocol(ProtocolError),
    /// Local presentation-space editing rule violation. Advisory: the
    /// session stays open and the caller may retry.
    Input(InputError),
    /// An outbound character has no representation in the active code
    /// page and no substitution was configured.
    Encode(EncodeError),
    /// A `wait` deadline elapsed. Non-fatal.
    Timeout,
    /// The operation was attempted on a session that has already closed.
    SessionClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "transport error: {e}"),
            Error::Negotiation(e) => write!(f, "negotiation error: {e}"),
            Error::Protocol(e) => write!(f, "protocol error: {e}"),
            Error::Input(e) => write!(f, "input error: {e}"),
            Error::Encode(e) => write!(f, "encode error: {e}"),
            Error::Timeout => write!(f, "operation timed out"),
            Error::SessionClosed => write!(f, "session is closed"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Transport(e) => Some(e),
            Error::Negotiation(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Input(e) => Some(e),
            Error::Encode(e) => Some(e),
            Error::Timeout | Error::SessionClosed => None,
        }
    }
}

/// Transport-level failures (§4.2).
#[derive(Debug)]
pub enum TransportError {
    ConnectionRefused { host: String, port: u16 },
    Timeout { host: String, port: u16, timeout_ms: u64 },
    DnsResolution { host: String },
    ConnectionLost { reason: String },
    Tls { message: String },
    InvalidAddress { address: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectionRefused { host, port } => {
                write!(f, "connection refused by {host}:{port}")
            }
            TransportError::Timeout { host, port, timeout_ms } => {
                write!(f, "connection to {host}:{port} timed out after {timeout_ms}ms")
            }
            TransportError::DnsResolution { host } => write!(f, "could not resolve {host}"),
            TransportError::ConnectionLost { reason } => write!(f, "connection lost: {reason}"),
            TransportError::Tls { message } => write!(f, "TLS error: {message}"),
            TransportError::InvalidAddress { address } => write!(f, "invalid address: {address}"),
        }
    }
}

impl StdError for TransportError {}

/// Telnet/TN3270E negotiation failures (§4.3).
#[derive(Debug)]
pub enum NegotiationError {
    /// A required option (BINARY, END-OF-RECORD) was refused by the host.
    RequiredOptionRefused { option: String },
    /// A subnegotiation payload could not be parsed.
    MalformedSubnegotiation { option: String, data: Vec<u8> },
    /// An unexpected message arrived for the current negotiation phase.
    UnexpectedState { phase: &'static str, detail: String },
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::RequiredOptionRefused { option } => {
                write!(f, "required telnet option {option} was refused")
            }
            NegotiationError::MalformedSubnegotiation { option, data } => {
                write!(f, "malformed subnegotiation for option {option} ({} bytes)", data.len())
            }
            NegotiationError::UnexpectedState { phase, detail } => {
                write!(f, "unexpected negotiation state in {phase}: {detail}")
            }
        }
    }
}

impl StdError for NegotiationError {}

/// Data-stream interpretation failures (§4.5).
#[derive(Debug)]
pub enum ProtocolError {
    InvalidCommandCode { code: u8 },
    InvalidOrderCode { code: u8 },
    IncompleteData { expected: usize, received: usize },
    InvalidStructuredField { field_type: u16, reason: String },
    InvalidAddress { raw: u16 },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::InvalidCommandCode { code } => {
                write!(f, "unrecognized command code 0x{code:02X}")
            }
            ProtocolError::InvalidOrderCode { code } => {
                write!(f, "unrecognized order code 0x{code:02X}")
            }
            ProtocolError::IncompleteData { expected, received } => {
                write!(f, "incomplete data stream: expected {expected} bytes, got {received}")
            }
            ProtocolError::InvalidStructuredField { field_type, reason } => {
                write!(f, "invalid structured field 0x{field_type:04X}: {reason}")
            }
            ProtocolError::InvalidAddress { raw } => {
                write!(f, "invalid buffer address encoding 0x{raw:04X}")
            }
        }
    }
}

impl StdError for ProtocolError {}

/// Local presentation-space input-rule violations (§4.4).
#[derive(Debug)]
pub enum InputError {
    ProtectedField { address: usize },
    NumericOnly { address: usize, byte: u8 },
    FieldFull { address: usize },
    KeyboardLocked,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::ProtectedField { address } => {
                write!(f, "position {address} is in a protected field")
            }
            InputError::NumericOnly { address, byte } => {
                write!(f, "position {address} requires numeric input, got 0x{byte:02X}")
            }
            InputError::FieldFull { address } => write!(f, "no room left in field at {address}"),
            InputError::KeyboardLocked => write!(f, "keyboard is locked"),
        }
    }
}

impl StdError for InputError {}

/// Codec translation failures (§4.1).
#[derive(Debug)]
pub enum EncodeError {
    Unmappable { ch: char, codepage: &'static str },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Unmappable { ch, codepage } => {
                write!(f, "character {ch:?} has no representation in code page {codepage}")
            }
        }
    }
}

impl StdError for EncodeError {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<NegotiationError> for Error {
    fn from(e: NegotiationError) -> Self {
        Error::Negotiation(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<InputError> for Error {
    fn from(e: InputError) -> Self {
        Error::Input(e)
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Error::Encode(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut => Error::Transport(TransportError::ConnectionLost {
                reason: "timed out".to_string(),
            }),
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                Error::Transport(TransportError::ConnectionLost { reason: e.to_string() })
            }
            _ => Error::Transport(TransportError::ConnectionLost { reason: e.to_string() }),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
pub type TransportResult<T> = std::result::Result<T, TransportError>;
pub type NegotiationResult<T> = std::result::Result<T, NegotiationError>;
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
pub type InputResult<T> = std::result::Result<T, InputError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_transport_error() {
        let e = Error::Transport(TransportError::ConnectionRefused {
            host: "mainframe".into(),
            port: 23,
        });
        assert_eq!(e.to_string(), "transport error: connection refused by mainframe:23");
    }

    #[test]
    fn input_error_round_trips_through_top_level() {
        let inner = InputError::ProtectedField { address: 42 };
        let outer: Error = inner.into();
        assert!(matches!(outer, Error::Input(InputError::ProtectedField { address: 42 })));
    }

    #[test]
    fn io_timeout_maps_to_transport_error() {
        let io_err = io::Error::from(io::ErrorKind::TimedOut);
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Transport(TransportError::ConnectionLost { .. })));
    }
}
