//! IBM 3270 data stream interpreter (RFC 1205, RFC 2355).
//!
//! The 3270 protocol is block-oriented: the host writes a whole screen's
//! worth of buffer addresses, field attributes, and orders in one command,
//! and the terminal replies with whatever the operator typed into the
//! unprotected fields. This module owns that side of things — presentation
//! space, field table, command/order interpretation — once telnet
//! negotiation has handed off a clean byte stream.
//!
//! - [`codes`] - command codes, order codes, AID keys, attribute bits
//! - [`field`] - field attribute and extended-attribute tracking
//! - [`display`] - the presentation space (buffer, cursor, fields)
//! - [`protocol`] - data stream parsing and command processing

pub mod codes;
pub mod display;
pub mod field;
pub mod protocol;

pub use codes::*;
pub use display::{Display3270, ScreenSize};
pub use field::*;
pub use protocol::ProtocolProcessor3270;