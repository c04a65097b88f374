//! Telnet engine: RFC 854/855 option negotiation, RFC 885 end-of-record
//! framing, and the TN3270E subnegotiation and record header (RFC 2355).
//!
//! Consolidates what the host split across two places (a generic telnet
//! layer and a duplicate, TN5250-flavored negotiator): one option table,
//! one state machine, one record assembler.

mod tn3270e;

use std::collections::HashSet;

use crate::error::{NegotiationError, NegotiationResult};

pub use tn3270e::{DataType, Function, Tn3270eHeader};

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
/// End-of-record marker (RFC 885). Distinct from the EndOfRecord *option*
/// number below; this is the command byte that follows IAC in the data
/// stream once the option is active.
pub const EOR: u8 = 239;
pub const SE: u8 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelnetOption {
    Binary,
    Echo,
    SuppressGoAhead,
    TerminalType,
    /// Option 25, per RFC 885 — not 19, which some older codebases confuse
    /// with the Logout option.
    EndOfRecord,
    Tn3270e,
}

impl TelnetOption {
    fn code(self) -> u8 {
        match self {
            TelnetOption::Binary => 0,
            TelnetOption::Echo => 1,
            TelnetOption::SuppressGoAhead => 3,
            TelnetOption::TerminalType => 24,
            TelnetOption::EndOfRecord => 25,
            TelnetOption::Tn3270e => 40,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TelnetOption::Binary),
            1 => Some(TelnetOption::Echo),
            3 => Some(TelnetOption::SuppressGoAhead),
            24 => Some(TelnetOption::TerminalType),
            25 => Some(TelnetOption::EndOfRecord),
            40 => Some(TelnetOption::Tn3270e),
            _ => None,
        }
    }
}

/// Where the session sits in the negotiation sequence (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Offering,
    NegotiatingTtype,
    NegotiatingTn3270e,
    Active,
    Closing,
    Closed,
}

/// A single assembled record: the bytes between two EOR markers, with the
/// TN3270E header split out if the option is active.
#[derive(Debug, Clone)]
pub struct Record {
    pub header: Option<Tn3270eHeader>,
    pub payload: Vec<u8>,
}

/// Negotiates telnet options and TN3270E device/function subnegotiation,
/// and assembles EOR-delimited records out of the raw byte stream.
pub struct Engine {
    phase: Phase,
    terminal_type: String,
    local_will: HashSet<TelnetOption>,
    peer_will: HashSet<TelnetOption>,
    device_type: Option<String>,
    functions: Vec<Function>,
    input: Vec<u8>,
    record_buf: Vec<u8>,
    send_seq: u16,
}

impl Engine {
    pub fn new(terminal_type: impl Into<String>) -> Self {
        Self {
            phase: Phase::Offering,
            terminal_type: terminal_type.into(),
            local_will: HashSet::new(),
            peer_will: HashSet::new(),
            device_type: None,
            functions: Vec::new(),
            input: Vec::new(),
            record_buf: Vec::new(),
            send_seq: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn device_type(&self) -> Option<&str> {
        self.device_type.as_deref()
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    fn tn3270e_active(&self) -> bool {
        self.local_will.contains(&TelnetOption::Tn3270e) && self.peer_will.contains(&TelnetOption::Tn3270e)
    }

    /// Bytes to send as soon as the transport connects: announce the
    /// options the terminal itself supports. The host may already be
    /// sending its own DO/WILL bytes concurrently; `receive` reconciles
    /// whichever order they arrive in.
    pub fn initial_offer(&mut self) -> Vec<u8> {
        self.phase = Phase::NegotiatingTtype;
        let mut out = Vec::new();
        for opt in [TelnetOption::Binary, TelnetOption::EndOfRecord, TelnetOption::TerminalType, TelnetOption::Tn3270e] {
            out.extend_from_slice(&[IAC, WILL, opt.code()]);
        }
        out
    }

    /// Feed newly-read transport bytes in. Returns bytes to write back
    /// (negotiation replies) and any complete records assembled along
    /// the way.
    pub fn receive(&mut self, data: &[u8]) -> NegotiationResult<(Vec<u8>, Vec<Record>)> {
        self.input.extend_from_slice(data);
        let mut out = Vec::new();
        let mut records = Vec::new();
        let mut pos = 0;

        while pos < self.input.len() {
            if self.input[pos] != IAC {
                self.record_buf.push(self.input[pos]);
                pos += 1;
                continue;
            }

            let Some(&cmd) = self.input.get(pos + 1) else { break };
            match cmd {
                IAC => {
                    // Escaped data byte 0xFF.
                    self.record_buf.push(IAC);
                    pos += 2;
                }
                EOR => {
                    let payload = std::mem::take(&mut self.record_buf);
                    records.push(self.split_record(payload)?);
                    pos += 2;
                }
                WILL | WONT | DO | DONT => {
                    let Some(&opt_code) = self.input.get(pos + 2) else { break };
                    if let Some(reply) = self.handle_negotiation(cmd, opt_code) {
                        out.extend_from_slice(&reply);
                    }
                    pos += 3;
                }
                SB => {
                    let Some(end) = find_sb_end(&self.input[pos..]) else { break };
                    let sub = self.input[pos + 2..pos + end - 2].to_vec();
                    out.extend_from_slice(&self.handle_subnegotiation(&sub)?);
                    pos += end;
                }
                _ => {
                    log::warn!("telnet: ignoring unknown IAC command 0x{cmd:02X}");
                    pos += 2;
                }
            }
        }

        self.input.drain(0..pos);
        self.advance_phase();
        Ok((out, records))
    }

    fn split_record(&self, payload: Vec<u8>) -> NegotiationResult<Record> {
        if !self.tn3270e_active() {
            return Ok(Record { header: None, payload });
        }
        if payload.len() < 5 {
            return Err(NegotiationError::MalformedSubnegotiation {
                option: "TN3270E record".into(),
                data: payload,
            });
        }
        let header = Tn3270eHeader::parse(&payload[..5]);
        Ok(Record { header: Some(header), payload: payload[5..].to_vec() })
    }

    /// Wrap an outbound 3270 data stream in a TN3270E header (if active)
    /// and EOR-delimit it, escaping any literal 0xFF bytes.
    pub fn frame_outbound(&mut self, data_type: DataType, payload: &[u8]) -> Vec<u8> {
        let mut framed = Vec::new();
        if self.tn3270e_active() {
            self.send_seq = self.send_seq.wrapping_add(1);
            framed.extend_from_slice(&Tn3270eHeader { data_type, request_flag: 0, response_flag: 0, seq_number: self.send_seq }.encode());
        }
        for &b in payload {
            framed.push(b);
            if b == IAC {
                framed.push(IAC);
            }
        }
        framed.extend_from_slice(&[IAC, EOR]);
        framed
    }

    fn handle_negotiation(&mut self, cmd: u8, opt_code: u8) -> Option<Vec<u8>> {
        let Some(opt) = TelnetOption::from_code(opt_code) else {
            return Some(match cmd {
                WILL => vec![IAC, DONT, opt_code],
                DO => vec![IAC, WONT, opt_code],
                _ => return None,
            });
        };

        match cmd {
            WILL => {
                self.peer_will.insert(opt);
                None
            }
            WONT => {
                self.peer_will.remove(&opt);
                None
            }
            DO => {
                self.local_will.insert(opt);
                None
            }
            DONT => {
                self.local_will.remove(&opt);
                None
            }
            _ => None,
        }
    }

    fn handle_subnegotiation(&mut self, sub: &[u8]) -> NegotiationResult<Vec<u8>> {
        let Some(&opt_code) = sub.first() else { return Ok(Vec::new()) };
        match TelnetOption::from_code(opt_code) {
            Some(TelnetOption::TerminalType) => Ok(self.handle_ttype_subnegotiation(&sub[1..])),
            Some(TelnetOption::Tn3270e) => {
                let (reply, device_type, functions) = tn3270e::handle_subnegotiation(&sub[1..], &self.terminal_type)?;
                if let Some(dt) = device_type {
                    self.device_type = Some(dt);
                }
                if let Some(fns) = functions {
                    self.functions = fns;
                }
                Ok(reply)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn handle_ttype_subnegotiation(&self, data: &[u8]) -> Vec<u8> {
        const SEND: u8 = 1;
        const IS: u8 = 0;
        if data.first() == Some(&SEND) {
            let mut out = vec![IAC, SB, TelnetOption::TerminalType.code(), IS];
            out.extend_from_slice(self.terminal_type.as_bytes());
            out.extend_from_slice(&[IAC, SE]);
            out
        } else {
            Vec::new()
        }
    }

    fn advance_phase(&mut self) {
        if self.phase == Phase::Closed || self.phase == Phase::Closing {
            return;
        }
        let core_ready = self.local_will.contains(&TelnetOption::Binary)
            && self.peer_will.contains(&TelnetOption::Binary)
            && self.local_will.contains(&TelnetOption::EndOfRecord)
            && self.peer_will.contains(&TelnetOption::EndOfRecord);

        self.phase = if !core_ready {
            Phase::NegotiatingTtype
        } else if self.tn3270e_active() && self.device_type.is_none() {
            Phase::NegotiatingTn3270e
        } else {
            Phase::Active
        };
    }

    pub fn begin_closing(&mut self) {
        self.phase = Phase::Closing;
    }

    pub fn mark_closed(&mut self) {
        self.phase = Phase::Closed;
    }
}

fn find_sb_end(buf: &[u8]) -> Option<usize> {
    let mut i = 2;
    while i + 1 < buf.len() {
        if buf[i] == IAC && buf[i + 1] == SE {
            return Some(i + 2);
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiates_binary_and_eor_from_do_will() {
        let mut engine = Engine::new("IBM-3278-2-E");
        let _ = engine.initial_offer();
        let host_bytes = [
            IAC, DO, TelnetOption::Binary.code(),
            IAC, WILL, TelnetOption::Binary.code(),
            IAC, DO, TelnetOption::EndOfRecord.code(),
            IAC, WILL, TelnetOption::EndOfRecord.code(),
        ];
        let (_, records) = engine.receive(&host_bytes).unwrap();
        assert!(records.is_empty());
        assert_eq!(engine.phase(), Phase::Active);
    }

    #[test]
    fn responds_to_terminal_type_send() {
        let mut engine = Engine::new("IBM-3278-2-E");
        let sub = [IAC, SB, TelnetOption::TerminalType.code(), 1, IAC, SE];
        let (out, _) = engine.receive(&sub).unwrap();
        assert!(out.windows(b"IBM-3278-2-E".len()).any(|w| w == b"IBM-3278-2-E"));
    }

    #[test]
    fn assembles_record_on_eor() {
        let mut engine = Engine::new("IBM-3278-2-E");
        let data = [b'h', b'i', IAC, EOR];
        let (_, records) = engine.receive(&data).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload, b"hi");
        assert!(records[0].header.is_none());
    }

    #[test]
    fn escaped_iac_byte_survives_into_record() {
        let mut engine = Engine::new("IBM-3278-2-E");
        let data = [0x41, IAC, IAC, 0x42, IAC, EOR];
        let (_, records) = engine.receive(&data).unwrap();
        assert_eq!(records[0].payload, vec![0x41, IAC, 0x42]);
    }

    #[test]
    fn unknown_option_is_refused() {
        let mut engine = Engine::new("IBM-3278-2-E");
        let (out, _) = engine.receive(&[IAC, WILL, 99]).unwrap();
        assert_eq!(out, vec![IAC, DONT, 99]);
    }
}
