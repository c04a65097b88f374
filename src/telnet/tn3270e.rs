//! TN3270E subnegotiation (RFC 2355): device-type and functions exchange,
//! and the 5-byte record header. The host's negotiator used its own
//! subcommand numbering that didn't match the RFC (its REQUEST and REASON
//! both claimed value 5); this follows the RFC's opcode assignment.

use super::{IAC, SB, SE};
use crate::error::{NegotiationError, NegotiationResult};

const OP_CONNECT: u8 = 1;
const OP_DEVICE_TYPE: u8 = 2;
const OP_FUNCTIONS: u8 = 3;
const OP_IS: u8 = 4;
const OP_REASON: u8 = 5;
const OP_REJECT: u8 = 6;
const OP_REQUEST: u8 = 7;
const OP_SEND: u8 = 8;

const TN3270E_OPTION: u8 = 40;

/// A function the terminal or host may offer in the FUNCTIONS exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    BindImage,
    DataStreamCtl,
    Responses,
    ScsCtlCodes,
    Sysreq,
}

impl Function {
    fn code(self) -> u8 {
        match self {
            Function::BindImage => 0,
            Function::DataStreamCtl => 1,
            Function::Responses => 2,
            Function::ScsCtlCodes => 3,
            Function::Sysreq => 4,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Function::BindImage),
            1 => Some(Function::DataStreamCtl),
            2 => Some(Function::Responses),
            3 => Some(Function::ScsCtlCodes),
            4 => Some(Function::Sysreq),
            _ => None,
        }
    }
}

/// TN3270E data-stream record type, the first byte of the 5-byte header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    ThreeTwoSeventyData,
    ScsData,
    Response,
    BindImage,
    Unbind,
    NvtData,
    Request,
    SscpLuData,
    PrintEoj,
}

impl DataType {
    fn code(self) -> u8 {
        match self {
            DataType::ThreeTwoSeventyData => 0,
            DataType::ScsData => 1,
            DataType::Response => 2,
            DataType::BindImage => 3,
            DataType::Unbind => 4,
            DataType::NvtData => 5,
            DataType::Request => 6,
            DataType::SscpLuData => 7,
            DataType::PrintEoj => 8,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            1 => DataType::ScsData,
            2 => DataType::Response,
            3 => DataType::BindImage,
            4 => DataType::Unbind,
            5 => DataType::NvtData,
            6 => DataType::Request,
            7 => DataType::SscpLuData,
            8 => DataType::PrintEoj,
            _ => DataType::ThreeTwoSeventyData,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tn3270eHeader {
    pub data_type: DataType,
    pub request_flag: u8,
    pub response_flag: u8,
    pub seq_number: u16,
}

impl Tn3270eHeader {
    pub fn parse(bytes: &[u8]) -> Self {
        Self {
            data_type: DataType::from_code(bytes[0]),
            request_flag: bytes[1],
            response_flag: bytes[2],
            seq_number: u16::from_be_bytes([bytes[3], bytes[4]]),
        }
    }

    pub fn encode(&self) -> [u8; 5] {
        let seq = self.seq_number.to_be_bytes();
        [self.data_type.code(), self.request_flag, self.response_flag, seq[0], seq[1]]
    }
}

fn sb_wrap(body: &[u8]) -> Vec<u8> {
    let mut out = vec![IAC, SB, TN3270E_OPTION];
    out.extend_from_slice(body);
    out.extend_from_slice(&[IAC, SE]);
    out
}

/// Handle a TN3270E subnegotiation (the bytes after the option number,
/// before the trailing IAC SE). Returns bytes to send in reply, plus the
/// negotiated device type / function set when this exchange settled them.
pub fn handle_subnegotiation(
    data: &[u8],
    terminal_type: &str,
) -> NegotiationResult<(Vec<u8>, Option<String>, Option<Vec<Function>>)> {
    let Some(&op) = data.first() else { return Ok((Vec::new(), None, None)) };
    let body = &data[1..];

    match op {
        OP_SEND if body.first() == Some(&OP_DEVICE_TYPE) => {
            let reply = sb_wrap(&device_type_request(terminal_type));
            Ok((reply, None, None))
        }
        OP_DEVICE_TYPE if body.first() == Some(&OP_IS) => {
            let name_bytes = &body[1..];
            let name = String::from_utf8_lossy(name_bytes).to_string();
            log::info!("tn3270e: host confirmed device type {name}");
            // Follow with a FUNCTIONS REQUEST advertising what we support.
            let supported = [Function::BindImage, Function::Responses];
            let mut fn_body = vec![OP_REQUEST];
            fn_body.extend(supported.iter().map(|f| f.code()));
            let reply = sb_wrap(&prefix(OP_FUNCTIONS, &fn_body));
            Ok((reply, Some(name), None))
        }
        OP_DEVICE_TYPE if body.first() == Some(&OP_REJECT) => {
            Err(NegotiationError::RequiredOptionRefused { option: "TN3270E DEVICE-TYPE".into() })
        }
        OP_FUNCTIONS if matches!(body.first(), Some(&OP_IS) | Some(&OP_REQUEST)) => {
            let accepted: Vec<Function> = body[1..].iter().filter_map(|&c| Function::from_code(c)).collect();
            if body.first() == Some(&OP_REQUEST) {
                // Host asked what we support; echo back IS with the same list.
                let mut fn_body = vec![OP_IS];
                fn_body.extend(accepted.iter().map(|f| f.code()));
                let reply = sb_wrap(&prefix(OP_FUNCTIONS, &fn_body));
                Ok((reply, None, Some(accepted)))
            } else {
                Ok((Vec::new(), None, Some(accepted)))
            }
        }
        OP_CONNECT => {
            let reply = sb_wrap(&device_type_request(terminal_type));
            Ok((reply, None, None))
        }
        _ => {
            log::debug!("tn3270e: ignoring subnegotiation opcode 0x{op:02X}");
            Ok((Vec::new(), None, None))
        }
    }
}

fn prefix(op: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![op];
    out.extend_from_slice(body);
    out
}

fn device_type_request(terminal_type: &str) -> Vec<u8> {
    let mut body = vec![OP_DEVICE_TYPE, OP_REQUEST];
    body.extend_from_slice(terminal_type.as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_type_is_settles_the_name_and_requests_functions() {
        let mut msg = vec![OP_DEVICE_TYPE, OP_IS];
        msg.extend_from_slice(b"IBM-3278-2-E");
        let (reply, device_type, functions) = handle_subnegotiation(&msg, "IBM-3278-2-E").unwrap();
        assert_eq!(device_type.as_deref(), Some("IBM-3278-2-E"));
        assert!(functions.is_none());
        assert!(!reply.is_empty());
    }

    #[test]
    fn device_type_reject_is_an_error() {
        let msg = vec![OP_DEVICE_TYPE, OP_REJECT];
        assert!(handle_subnegotiation(&msg, "IBM-3278-2-E").is_err());
    }

    #[test]
    fn functions_request_echoes_is_with_same_list() {
        let msg = vec![OP_FUNCTIONS, OP_REQUEST, Function::Responses.code(), Function::BindImage.code()];
        let (reply, _, functions) = handle_subnegotiation(&msg, "IBM-3278-2-E").unwrap();
        let functions = functions.unwrap();
        assert!(functions.contains(&Function::Responses));
        assert!(functions.contains(&Function::BindImage));
        assert!(!reply.is_empty());
    }

    #[test]
    fn header_round_trips() {
        let header = Tn3270eHeader { data_type: DataType::Response, request_flag: 0, response_flag: 2, seq_number: 513 };
        let encoded = header.encode();
        assert_eq!(Tn3270eHeader::parse(&encoded), header);
    }
}
