//! A TN3270(E) terminal engine: telnet/TN3270E negotiation (RFC 854/855,
//! RFC 885, RFC 2355), EBCDIC codec, and 3270 data-stream interpretation,
//! wired together behind a cooperative [`session::Session`] controller.

/// EBCDIC code page translation.
pub mod codec;

/// Error types for every subsystem, rolled up into one top-level `Error`.
pub mod error;

/// Property-bag session configuration with env var overlay and JSON
/// persistence.
pub mod config;

/// TCP/TLS transport.
pub mod transport;

/// Telnet option negotiation, RFC 885 record framing, and TN3270E
/// subnegotiation.
pub mod telnet;

/// IBM 3270 data stream interpreter: presentation space, fields, commands
/// and orders.
pub mod lib3270;

/// Session lifecycle: connect, negotiate, and drive keyboard/AID input
/// against a bound connection.
pub mod session;

pub use error::{Error, Result};
pub use session::{Session, SessionEvent, SessionHandle, SessionState};
