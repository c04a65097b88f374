//! 3270 Protocol Implementation
//!
//! This module implements the core 3270 data stream parsing and command processing
//! following RFC 1205 and RFC 2355 specifications.
//!
//! Telnet option negotiation (including the TN3270E subnegotiation) is owned
//! entirely by [`crate::telnet`]; this module only ever sees clean 3270
//! command/order/structured-field bytes handed to it after negotiation
//! completes.

#![allow(dead_code)] // Complete TN3270 protocol implementation

use super::codes::*;
use super::display::{Display3270, ScreenSize, addressing};
use super::field::{ExtendedAttributes, FieldAttribute};
use crate::codec::{self, CodePage};

/// 3270 Protocol Processor
///
/// Handles parsing and processing of 3270 data streams, including
/// commands, orders, and structured fields.
#[derive(Debug)]
pub struct ProtocolProcessor3270 {
    /// Current state of the processor
    state: ProcessorState,

    /// Display buffer for the terminal
    display: Display3270,

    /// Use 14-bit addressing (for larger screens)
    use_14bit_addressing: bool,

    /// Screen size an Erase/Write Alternate command switches to
    alternate_size: ScreenSize,

    /// AID of the most recent operator action, threaded into Read Modified
    /// responses in place of the key that triggered the read.
    last_aid: AidKey,
}

/// Processor state
#[derive(Debug, Clone, PartialEq)]
enum ProcessorState {
    /// Ready to process commands
    Ready,

    /// Processing a command
    Processing,

    /// Pending Read Buffer response
    PendingReadBuffer,

    /// Pending Read Modified response
    PendingReadModified,

    /// Pending Read Modified All response
    PendingReadModifiedAll,

    /// Pending Query Reply response to a Read Partition Query/QueryList
    PendingQueryReply,
}

impl ProtocolProcessor3270 {
    /// Create a new protocol processor
    pub fn new() -> Self {
        Self {
            state: ProcessorState::Ready,
            display: Display3270::new(),
            use_14bit_addressing: false,
            alternate_size: ScreenSize::Model3,
            last_aid: AidKey::NoAid,
        }
    }

    /// Enable or disable 14-bit addressing
    pub fn set_14bit_addressing(&mut self, enabled: bool) {
        self.use_14bit_addressing = enabled;
    }

    /// Set the screen size an Erase/Write Alternate command resizes to.
    pub fn set_alternate_size(&mut self, size: ScreenSize) {
        self.alternate_size = size;
    }

    /// Record the AID of the key that will trigger the next Read Modified.
    pub fn set_aid(&mut self, aid: AidKey) {
        self.last_aid = aid;
    }

    /// Process a 3270 data stream
    ///
    /// Parses and executes commands from the host, updating the display buffer.
    pub fn process_data(&mut self, data: &[u8], display: &mut Display3270) -> Result<(), String> {
        if data.is_empty() {
            return Ok(());
        }

        let mut parser = DataStreamParser::new(data, self.use_14bit_addressing, self.alternate_size);
        let pending_state = parser.parse(display)?;
        if let Some(state) = pending_state {
            self.state = state;
        }
        Ok(())
    }

    /// Process a 3270 data stream using internal display
    pub fn process_data_internal(&mut self, data: &[u8]) -> Result<(), String> {
        if data.is_empty() {
            return Ok(());
        }

        let mut parser = DataStreamParser::new(data, self.use_14bit_addressing, self.alternate_size);
        let pending_state = parser.parse(&mut self.display)?;
        if let Some(state) = pending_state {
            self.state = state;
        }
        Ok(())
    }

    /// Whatever response is due given the processor's pending state: a Read
    /// Buffer/Read Modified/Read Modified All reply, or `None` if the host
    /// hasn't asked for one.
    pub fn generate_response(&mut self) -> Option<Vec<u8>> {
        let response = match self.state {
            ProcessorState::PendingReadBuffer => {
                Some(self.create_read_buffer_response(&self.display, self.last_aid))
            }
            ProcessorState::PendingReadModified => {
                Some(self.create_read_modified_response(&self.display, self.last_aid))
            }
            ProcessorState::PendingReadModifiedAll => {
                Some(self.create_read_modified_all_response(&self.display, self.last_aid))
            }
            ProcessorState::PendingQueryReply => {
                Some(self.build_query_reply(&self.display))
            }
            _ => None,
        };
        if response.is_some() {
            self.state = ProcessorState::Ready;
        }
        response
    }

    pub fn reset(&mut self) {
        self.state = ProcessorState::Ready;
        self.display.clear();
    }

    /// Create a Read Buffer response
    ///
    /// Returns the entire display buffer contents with AID and cursor address.
    pub fn create_read_buffer_response(&self, display: &Display3270, aid: AidKey) -> Vec<u8> {
        let mut response = Vec::new();

        response.push(aid.to_u8());

        let cursor_addr = display.cursor_address();
        let (b1, b2) = if self.use_14bit_addressing {
            addressing::encode_14bit_address(cursor_addr)
        } else {
            addressing::encode_12bit_address(cursor_addr)
        };
        response.push(b1);
        response.push(b2);

        // Walk the buffer left to right, emitting an SF order (rather than
        // the raw attribute byte) at each field-attribute position so the
        // host can tell field boundaries apart from plain data on the wire.
        let buffer = display.get_buffer_data();
        for (idx, &ch) in buffer.iter().enumerate() {
            if let Some(field) = display.field_manager().fields().iter().find(|f| f.address as usize == idx) {
                response.push(ORDER_SF);
                response.push(field.base_attr);
            } else {
                response.push(ch);
            }
        }

        response
    }

    /// Create a Read Modified response
    ///
    /// Returns only fields with their MDT bit set, with AID and cursor address.
    pub fn create_read_modified_response(&self, display: &Display3270, aid: AidKey) -> Vec<u8> {
        display.get_modified_data(aid.to_u8(), self.use_14bit_addressing, false)
    }

    /// Create a Read Modified All response
    ///
    /// Returns every unprotected field regardless of MDT, with AID and
    /// cursor address.
    pub fn create_read_modified_all_response(&self, display: &Display3270, aid: AidKey) -> Vec<u8> {
        display.get_modified_data(aid.to_u8(), self.use_14bit_addressing, true)
    }

    /// Encode field data for transmission in 3270 format
    /// Returns encoded field data with buffer addresses and field contents
    pub fn encode_field_data(&self, field_data: &[(u16, String)]) -> Vec<u8> {
        let mut encoded = Vec::new();

        for (address, content) in field_data {
            encoded.push(ORDER_SBA);

            let (b1, b2) = if self.use_14bit_addressing {
                addressing::encode_14bit_address(*address)
            } else {
                addressing::encode_12bit_address(*address)
            };
            encoded.push(b1);
            encoded.push(b2);

            if let Ok(bytes) = codec::encode(content, CodePage::Cp037, Some(0x40)) {
                encoded.extend(bytes);
            }
        }

        encoded
    }

    /// Send input fields with Read Modified response format
    pub fn send_input_fields(&self, display: &Display3270, aid: AidKey, modified_fields: &[(u16, String)]) -> Vec<u8> {
        let mut response = Vec::new();

        response.push(aid.to_u8());

        let cursor_addr = display.cursor_address();
        let (b1, b2) = if self.use_14bit_addressing {
            addressing::encode_14bit_address(cursor_addr)
        } else {
            addressing::encode_12bit_address(cursor_addr)
        };
        response.push(b1);
        response.push(b2);

        let field_data = self.encode_field_data(modified_fields);
        response.extend_from_slice(&field_data);

        response
    }

    /// Send field data with AID key and pending input
    pub fn send_field_input(&self, display: &Display3270, aid: AidKey, pending_input: &[u8]) -> Vec<u8> {
        let mut response = Vec::new();

        response.push(aid.to_u8());

        let cursor_addr = display.cursor_address();
        let (b1, b2) = if self.use_14bit_addressing {
            addressing::encode_14bit_address(cursor_addr)
        } else {
            addressing::encode_12bit_address(cursor_addr)
        };
        response.push(b1);
        response.push(b2);

        response.extend_from_slice(pending_input);

        response
    }

    /// Get modified fields from display for transmission
    /// Returns list of (address, content) tuples for modified fields
    pub fn get_modified_fields(&self, display: &Display3270) -> Vec<(u16, String)> {
        let mut modified_fields = Vec::new();

        let fields = display.field_manager().modified_fields();

        for field in fields {
            let start_addr = field.address + 1; // Skip field attribute byte
            let end_addr = start_addr + field.length as u16;

            let mut content = String::new();
            for addr in start_addr..end_addr.min(display.buffer_size() as u16) {
                if let Some(ch) = display.read_char_at(addr) {
                    let decoded = codec::decode_byte(ch, CodePage::Cp037);
                    if decoded != '\0' {
                        content.push(decoded);
                    }
                }
            }

            if !content.trim().is_empty() {
                modified_fields.push((field.address, content));
            }
        }

        modified_fields
    }

    /// Build an outbound Query Reply structured field describing this
    /// terminal's own capabilities, for use as the response to a Read
    /// Partition Query / Query List request. This is the terminal
    /// describing itself, not the inbound parsing the host's Query Reply
    /// would need (see [`DataStreamParser::process_query_reply`]).
    pub fn build_query_reply(&self, display: &Display3270) -> Vec<u8> {
        let mut items = Vec::new();
        push_query_item(&mut items, 0x81, &[display.rows() as u8, display.cols() as u8]);
        push_query_item(&mut items, 0x84, &[COLOR_DEFAULT]);
        push_query_item(&mut items, 0x83, &[HIGHLIGHT_DEFAULT]);
        push_query_item(&mut items, 0x86, &[0x00]); // single implicit partition

        let mut out = Vec::new();
        out.push(AID_STRUCTURED_FIELD);
        let length = (4 + items.len()) as u16;
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&SF_QUERY_REPLY.to_be_bytes());
        out.extend_from_slice(&items);
        out
    }
}

fn push_query_item(out: &mut Vec<u8>, query_type: u8, data: &[u8]) {
    out.push(query_type);
    out.push(data.len() as u8);
    out.extend_from_slice(data);
}

impl Default for ProtocolProcessor3270 {
    fn default() -> Self {
        Self::new()
    }
}

/// Data stream parser for 3270 protocol
struct DataStreamParser<'a> {
    data: &'a [u8],
    pos: usize,
    use_14bit_addressing: bool,
    alternate_size: ScreenSize,
    /// Set by an Insert Cursor order; applied to the display once the
    /// enclosing Write command finishes, so a later SBA in the same stream
    /// can't clobber it.
    pending_cursor: Option<u16>,
}

impl<'a> DataStreamParser<'a> {
    /// Create a new parser
    fn new(data: &'a [u8], use_14bit_addressing: bool, alternate_size: ScreenSize) -> Self {
        Self {
            data,
            pos: 0,
            use_14bit_addressing,
            alternate_size,
            pending_cursor: None,
        }
    }

    /// Parse the data stream
    fn parse(&mut self, display: &mut Display3270) -> Result<Option<ProcessorState>, String> {
        let mut pending_state = None;
        while self.pos < self.data.len() {
            let cmd_byte = self.data[self.pos];
            self.pos += 1;

            if let Some(command) = CommandCode::from_u8(cmd_byte) {
                if let Some(state) = self.process_command(command, display)? {
                    pending_state = Some(state);
                }
            } else {
                return Err(format!("Unknown command code: 0x{cmd_byte:02X}"));
            }
        }

        Ok(pending_state)
    }

    /// Process a command
    fn process_command(&mut self, command: CommandCode, display: &mut Display3270) -> Result<Option<ProcessorState>, String> {
        match command {
            CommandCode::Write => {
                self.process_write(display, false, false)?;
                Ok(None)
            }
            CommandCode::EraseWrite => {
                self.process_write(display, true, false)?;
                Ok(None)
            }
            CommandCode::EraseWriteAlternate => {
                self.process_write(display, true, true)?;
                Ok(None)
            }
            CommandCode::ReadBuffer => Ok(Some(ProcessorState::PendingReadBuffer)),
            CommandCode::ReadModified => Ok(Some(ProcessorState::PendingReadModified)),
            CommandCode::ReadModifiedAll => Ok(Some(ProcessorState::PendingReadModifiedAll)),
            CommandCode::EraseAllUnprotected => {
                self.process_erase_all_unprotected(display)?;
                Ok(None)
            }
            CommandCode::WriteStructuredField => {
                self.process_write_structured_field(display)
            }
            CommandCode::Nop => Ok(None),
        }
    }

    /// Process Write, Erase/Write, or Erase/Write Alternate command
    fn process_write(&mut self, display: &mut Display3270, erase: bool, alternate: bool) -> Result<(), String> {
        // KEYBOARD LOCK STATE MACHINE: Lock keyboard at start of Write command
        // The keyboard will remain locked until WCC_RESTORE bit unlocks it
        display.lock_keyboard();

        if self.pos >= self.data.len() {
            return Err("Missing WCC byte".to_string());
        }

        let wcc = self.data[self.pos];
        self.pos += 1;

        // Erase/Write Alternate switches to the negotiated alternate screen
        // size before anything else is processed; a plain erase just wipes
        // the current one.
        if alternate {
            display.resize(self.alternate_size);
        } else if erase {
            display.clear();
        }

        if (wcc & WCC_RESET) != 0 {
            display.field_manager_mut().reset_mdt();
        }

        if (wcc & WCC_START_PRINTER) != 0 {
            log::debug!("WCC start-printer bit set; printer sessions are not modeled");
        }

        if (wcc & WCC_ALARM) != 0 {
            display.set_alarm(true);
        }

        // KEYBOARD LOCK STATE MACHINE: Unlock keyboard if WCC_RESTORE bit is set
        if (wcc & WCC_RESTORE) != 0 {
            display.unlock_keyboard();
        }

        if (wcc & WCC_RESET_MDT) != 0 {
            display.field_manager_mut().reset_mdt();
        }

        self.pending_cursor = None;

        while self.pos < self.data.len() {
            let byte = self.data[self.pos];

            if let Some(order) = OrderCode::from_u8(byte) {
                self.pos += 1;
                self.process_order(order, display)?;
            } else {
                display.write_char(byte);
                self.pos += 1;
            }
        }

        if let Some(addr) = self.pending_cursor.take() {
            display.set_cursor(addr);
        }

        Ok(())
    }

    /// Process an order
    fn process_order(&mut self, order: OrderCode, display: &mut Display3270) -> Result<(), String> {
        match order {
            OrderCode::StartField => self.process_start_field(display),
            OrderCode::StartFieldExtended => self.process_start_field_extended(display),
            OrderCode::SetBufferAddress => self.process_set_buffer_address(display),
            OrderCode::SetAttribute => self.process_set_attribute(display),
            OrderCode::ModifyField => self.process_modify_field(display),
            OrderCode::InsertCursor => self.process_insert_cursor(display),
            OrderCode::ProgramTab => self.process_program_tab(display),
            OrderCode::RepeatToAddress => self.process_repeat_to_address(display),
            OrderCode::EraseUnprotectedToAddress => self.process_erase_unprotected_to_address(display),
            OrderCode::GraphicEscape => self.process_graphic_escape(display),
        }
    }

    /// Process Start Field (SF) order
    fn process_start_field(&mut self, display: &mut Display3270) -> Result<(), String> {
        if self.pos >= self.data.len() {
            return Err("Missing field attribute byte".to_string());
        }

        let attr_byte = self.data[self.pos];
        self.pos += 1;

        let current_addr = display.cursor_address();
        let field_attr = FieldAttribute::new(current_addr, attr_byte);
        display.set_field_attribute(current_addr, field_attr);

        display.set_cursor(current_addr + 1);

        Ok(())
    }

    /// Process Start Field Extended (SFE) order
    fn process_start_field_extended(&mut self, display: &mut Display3270) -> Result<(), String> {
        if self.pos >= self.data.len() {
            return Err("Missing SFE count byte".to_string());
        }

        let count = self.data[self.pos] as usize;
        self.pos += 1;

        if self.pos + (count * 2) > self.data.len() {
            return Err("Insufficient data for SFE attributes".to_string());
        }

        let mut base_attr = 0u8;
        let mut extended_attrs = ExtendedAttributes::new();

        for _ in 0..count {
            let attr_type = self.data[self.pos];
            let attr_value = self.data[self.pos + 1];
            self.pos += 2;

            match attr_type {
                XA_3270 => base_attr = attr_value,
                XA_HIGHLIGHTING => extended_attrs.highlighting = Some(attr_value),
                XA_FOREGROUND => extended_attrs.foreground_color = Some(attr_value),
                XA_BACKGROUND => extended_attrs.background_color = Some(attr_value),
                XA_CHARSET => extended_attrs.charset = Some(attr_value),
                XA_VALIDATION => extended_attrs.validation = Some(attr_value),
                XA_OUTLINING => extended_attrs.outlining = Some(attr_value),
                XA_TRANSPARENCY => extended_attrs.transparency = Some(attr_value),
                _ => log::debug!("unknown SFE attribute type: 0x{attr_type:02X}"),
            }
        }

        let current_addr = display.cursor_address();
        let field_attr = FieldAttribute::new_extended(current_addr, base_attr, extended_attrs);
        display.set_field_attribute(current_addr, field_attr);

        display.set_cursor(current_addr + 1);

        Ok(())
    }

    /// Process Set Buffer Address (SBA) order
    fn process_set_buffer_address(&mut self, display: &mut Display3270) -> Result<(), String> {
        let address = self.read_buffer_address()?;
        display.set_cursor(address);
        Ok(())
    }

    /// Process Set Attribute (SA) order. Unlike SFE, SA doesn't start a new
    /// field — it amends the extended attributes of whatever field the
    /// cursor is currently inside.
    fn process_set_attribute(&mut self, display: &mut Display3270) -> Result<(), String> {
        if self.pos + 1 >= self.data.len() {
            return Err("Insufficient data for SA order".to_string());
        }

        let attr_type = self.data[self.pos];
        let attr_value = self.data[self.pos + 1];
        self.pos += 2;

        let cursor = display.cursor_address();
        if let Some(field) = display.field_manager_mut().find_field_at_mut(cursor) {
            match attr_type {
                XA_ALL => field.extended_attrs = ExtendedAttributes::new(),
                XA_3270 => field.base_attr = attr_value,
                XA_HIGHLIGHTING => field.extended_attrs.highlighting = Some(attr_value),
                XA_FOREGROUND => field.extended_attrs.foreground_color = Some(attr_value),
                XA_BACKGROUND => field.extended_attrs.background_color = Some(attr_value),
                XA_CHARSET => field.extended_attrs.charset = Some(attr_value),
                XA_VALIDATION => field.extended_attrs.validation = Some(attr_value),
                XA_OUTLINING => field.extended_attrs.outlining = Some(attr_value),
                XA_TRANSPARENCY => field.extended_attrs.transparency = Some(attr_value),
                _ => log::debug!("unknown SA attribute type: 0x{attr_type:02X}"),
            }
        }

        Ok(())
    }

    /// Process Modify Field (MF) order
    fn process_modify_field(&mut self, display: &mut Display3270) -> Result<(), String> {
        if self.pos >= self.data.len() {
            return Err("Missing MF count byte".to_string());
        }

        let count = self.data[self.pos] as usize;
        self.pos += 1;

        if self.pos + (count * 2) > self.data.len() {
            return Err("Insufficient data for MF attributes".to_string());
        }

        let cursor = display.cursor_address();
        let pairs: Vec<(u8, u8)> = (0..count)
            .map(|i| (self.data[self.pos + i * 2], self.data[self.pos + i * 2 + 1]))
            .collect();
        self.pos += count * 2;

        if let Some(field) = display.field_manager_mut().find_field_at_mut(cursor) {
            for (attr_type, attr_value) in pairs {
                match attr_type {
                    XA_3270 => field.base_attr = attr_value,
                    XA_HIGHLIGHTING => field.extended_attrs.highlighting = Some(attr_value),
                    XA_FOREGROUND => field.extended_attrs.foreground_color = Some(attr_value),
                    XA_BACKGROUND => field.extended_attrs.background_color = Some(attr_value),
                    XA_CHARSET => field.extended_attrs.charset = Some(attr_value),
                    XA_VALIDATION => field.extended_attrs.validation = Some(attr_value),
                    XA_OUTLINING => field.extended_attrs.outlining = Some(attr_value),
                    XA_TRANSPARENCY => field.extended_attrs.transparency = Some(attr_value),
                    _ => log::debug!("unknown MF attribute type: 0x{attr_type:02X}"),
                }
            }
        }

        Ok(())
    }

    /// Process Insert Cursor (IC) order — records the current buffer
    /// address as where the cursor should land once the enclosing Write
    /// command finishes.
    fn process_insert_cursor(&mut self, display: &mut Display3270) -> Result<(), String> {
        self.pending_cursor = Some(display.cursor_address());
        Ok(())
    }

    /// Process Program Tab (PT) order. If the cursor sits inside an
    /// unprotected field, the remainder of that field is nulled before
    /// tabbing to the next unprotected field.
    fn process_program_tab(&mut self, display: &mut Display3270) -> Result<(), String> {
        display.null_to_field_end();
        display.tab_to_next_field();
        Ok(())
    }

    /// Process Repeat to Address (RA) order. The repeat character may
    /// itself be Graphic-Escape-prefixed, in which case it's decoded
    /// through the APL code page rather than the session's normal one.
    fn process_repeat_to_address(&mut self, display: &mut Display3270) -> Result<(), String> {
        let target_address = self.read_buffer_address()?;

        if self.pos >= self.data.len() {
            return Err("Missing character for RA order".to_string());
        }

        let mut ch = self.data[self.pos];
        self.pos += 1;
        let mut via_ge = false;

        if ch == ORDER_GE {
            if self.pos >= self.data.len() {
                return Err("Missing character after GE in RA order".to_string());
            }
            ch = self.data[self.pos];
            self.pos += 1;
            via_ge = true;
        }

        if via_ge {
            display.repeat_to_address_via_ge(ch, target_address);
        } else {
            display.repeat_to_address(ch, target_address);
        }

        Ok(())
    }

    /// Process Erase Unprotected to Address (EUA) order
    fn process_erase_unprotected_to_address(&mut self, display: &mut Display3270) -> Result<(), String> {
        let target_address = self.read_buffer_address()?;
        display.erase_unprotected_to_address(target_address);
        Ok(())
    }

    /// Process Graphic Escape (GE) order. The following byte is an APL
    /// graphic character, decoded through CP310 rather than the session's
    /// normal code page.
    fn process_graphic_escape(&mut self, display: &mut Display3270) -> Result<(), String> {
        if self.pos >= self.data.len() {
            return Err("Missing character for GE order".to_string());
        }

        let ch = self.data[self.pos];
        self.pos += 1;

        display.write_char_via_ge(ch);

        Ok(())
    }

    /// Process Erase All Unprotected command
    fn process_erase_all_unprotected(&mut self, display: &mut Display3270) -> Result<(), String> {
        display.clear_unprotected();
        display.unlock_keyboard();
        if let Some(addr) = display.first_unprotected_address() {
            display.set_cursor(addr);
        }
        Ok(())
    }

    /// Process Write Structured Field command
    fn process_write_structured_field(&mut self, display: &mut Display3270) -> Result<Option<ProcessorState>, String> {
        let mut pending_state = None;
        while self.pos < self.data.len() {
            if self.pos + 2 > self.data.len() {
                return Err("Insufficient data for structured field length".to_string());
            }
            let length = u16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]) as usize;
            self.pos += 2;

            if length < 4 {
                return Err("Invalid structured field length".to_string());
            }

            if self.pos + 2 > self.data.len() {
                return Err("Insufficient data for structured field type".to_string());
            }
            let sf_type = u16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]);
            self.pos += 2;

            let data_len = length - 4;
            if self.pos + data_len > self.data.len() {
                return Err("Insufficient data for structured field content".to_string());
            }
            let sf_data = &self.data[self.pos..self.pos + data_len];
            self.pos += data_len;

            if let Some(state) = self.process_structured_field(sf_type, sf_data, display)? {
                pending_state = Some(state);
            }
        }

        Ok(pending_state)
    }

    /// Process a structured field. Most are either data the terminal just
    /// absorbs (Outbound 3270DS, an inbound Query Reply echo) or partition
    /// housekeeping this terminal doesn't model beyond the single implicit
    /// partition; Read Partition Query/QueryList is the one that needs an
    /// outbound reply queued.
    fn process_structured_field(&mut self, sf_type: u16, sf_data: &[u8], _display: &mut Display3270) -> Result<Option<ProcessorState>, String> {
        match sf_type {
            SF_QUERY_REPLY => {
                self.process_query_reply(sf_data)?;
                Ok(None)
            }
            SF_READ_PARTITION => match sf_data.first() {
                Some(&RP_QUERY) | Some(&RP_QUERY_LIST) => Ok(Some(ProcessorState::PendingQueryReply)),
                _ => Ok(None),
            },
            SF_OUTBOUND_3270DS => Ok(None),
            _ => {
                log::debug!("unhandled structured field type: 0x{sf_type:04X}");
                Ok(None)
            }
        }
    }

    /// Parse an inbound Query Reply structured field — the host describing
    /// what it expects of the terminal. The terminal's own capabilities are
    /// advertised separately via [`ProtocolProcessor3270::build_query_reply`].
    fn process_query_reply(&mut self, sf_data: &[u8]) -> Result<(), String> {
        let mut pos = 0;
        while pos < sf_data.len() {
            if pos + 1 > sf_data.len() {
                break;
            }
            let query_type = sf_data[pos];
            pos += 1;

            if pos + 1 > sf_data.len() {
                break;
            }
            let length = sf_data[pos] as usize;
            pos += 1;

            if pos + length > sf_data.len() {
                break;
            }
            let query_data = &sf_data[pos..pos + length];
            pos += length;

            match query_type {
                0x81 if query_data.len() >= 2 => {
                    log::debug!(
                        "host usable area: {}x{}",
                        query_data[0],
                        query_data[1]
                    );
                }
                _ => log::debug!("query reply type 0x{query_type:02X} ({} bytes)", query_data.len()),
            }
        }

        Ok(())
    }

    /// Read a buffer address (12-bit or 14-bit)
    fn read_buffer_address(&mut self) -> Result<u16, String> {
        if self.pos + 1 >= self.data.len() {
            return Err("Insufficient data for buffer address".to_string());
        }

        let byte1 = self.data[self.pos];
        let byte2 = self.data[self.pos + 1];
        self.pos += 2;

        let address = if self.use_14bit_addressing {
            addressing::decode_14bit_address(byte1, byte2)
        } else {
            addressing::decode_12bit_address(byte1, byte2)
        };

        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_creation() {
        let processor = ProtocolProcessor3270::new();
        assert_eq!(processor.state, ProcessorState::Ready);
    }

    #[test]
    fn test_write_command_with_wcc() {
        let mut processor = ProtocolProcessor3270::new();
        let mut display = Display3270::new();

        let data = vec![
            CMD_WRITE,
            WCC_RESTORE,
            0xC1,
            0xC2,
        ];

        let result = processor.process_data(&data, &mut display);
        assert!(result.is_ok());
        assert!(!display.is_keyboard_locked());
    }

    #[test]
    fn test_erase_write_command() {
        let mut processor = ProtocolProcessor3270::new();
        let mut display = Display3270::new();

        display.write_char(0xC1);

        let data = vec![
            CMD_ERASE_WRITE,
            0x00,
        ];

        let result = processor.process_data(&data, &mut display);
        assert!(result.is_ok());

        assert_eq!(display.cursor_address(), 0);
    }

    #[test]
    fn test_erase_write_alternate_resizes_display() {
        let mut processor = ProtocolProcessor3270::new();
        processor.set_alternate_size(ScreenSize::Model4);
        let mut display = Display3270::new();
        assert_eq!(display.screen_size(), ScreenSize::Model2);

        let data = vec![CMD_ERASE_WRITE_ALTERNATE, 0x00];
        let result = processor.process_data(&data, &mut display);
        assert!(result.is_ok());
        assert_eq!(display.screen_size(), ScreenSize::Model4);
    }

    #[test]
    fn test_set_buffer_address_order() {
        let mut processor = ProtocolProcessor3270::new();
        let mut display = Display3270::new();

        let (b1, b2) = addressing::encode_12bit_address(100);
        let data = vec![
            CMD_WRITE,
            0x00,
            ORDER_SBA,
            b1, b2,
        ];

        let result = processor.process_data(&data, &mut display);
        assert!(result.is_ok());
        assert_eq!(display.cursor_address(), 100);
    }

    #[test]
    fn test_start_field_order() {
        let mut processor = ProtocolProcessor3270::new();
        let mut display = Display3270::new();

        let data = vec![
            CMD_WRITE,
            0x00,
            ORDER_SF,
            ATTR_PROTECTED | ATTR_NUMERIC,
        ];

        let result = processor.process_data(&data, &mut display);
        assert!(result.is_ok());

        assert_eq!(display.field_manager().fields().len(), 1);
    }

    #[test]
    fn test_insert_cursor_order_positions_cursor_after_write() {
        let mut processor = ProtocolProcessor3270::new();
        let mut display = Display3270::new();

        let (b1, b2) = addressing::encode_12bit_address(50);
        let data = vec![
            CMD_WRITE,
            0x00,
            ORDER_SBA, b1, b2,
            ORDER_IC,
            ORDER_SBA, 0x40, 0x40, // jump elsewhere afterwards
        ];

        processor.process_data(&data, &mut display).unwrap();
        assert_eq!(display.cursor_address(), 50);
    }

    #[test]
    fn test_set_attribute_updates_current_field() {
        let mut processor = ProtocolProcessor3270::new();
        let mut display = Display3270::new();

        let data = vec![
            CMD_WRITE,
            0x00,
            ORDER_SF, 0x00,
            ORDER_SA, XA_HIGHLIGHTING, HIGHLIGHT_BLINK,
        ];

        processor.process_data(&data, &mut display).unwrap();
        let field = display.field_manager().find_field_at(1).unwrap();
        assert_eq!(field.extended_attrs.highlighting, Some(HIGHLIGHT_BLINK));
    }

    #[test]
    fn test_repeat_to_address_with_graphic_escape_prefix() {
        let mut processor = ProtocolProcessor3270::new();
        let mut display = Display3270::new();

        let (b1, b2) = addressing::encode_12bit_address(3);
        let data = vec![
            CMD_WRITE,
            0x00,
            ORDER_RA, b1, b2, ORDER_GE, 0xAD,
        ];

        processor.process_data(&data, &mut display).unwrap();
        assert_eq!(display.read_char_at(0), Some(0xAD));
    }

    #[test]
    fn test_erase_all_unprotected_resets_cursor_to_first_unprotected_field() {
        let mut processor = ProtocolProcessor3270::new();
        let mut display = Display3270::new();

        let data = vec![
            CMD_WRITE,
            0x00,
            ORDER_SF, 0x00, // unprotected field at 0
            0xC1,
        ];
        processor.process_data(&data, &mut display).unwrap();
        display.set_cursor(500);

        processor.process_data(&[CMD_ERASE_ALL_UNPROTECTED], &mut display).unwrap();
        assert_eq!(display.cursor_address(), 1);
        assert!(!display.is_keyboard_locked());
    }

    #[test]
    fn test_read_buffer_response() {
        let processor = ProtocolProcessor3270::new();
        let display = Display3270::new();

        let response = processor.create_read_buffer_response(&display, AidKey::Enter);

        assert!(response.len() >= 3);
        assert_eq!(response[0], AID_ENTER);
    }

    #[test]
    fn test_read_modified_response_carries_threaded_aid() {
        let processor = ProtocolProcessor3270::new();
        let display = Display3270::new();

        let response = processor.create_read_modified_response(&display, AidKey::PF3);
        assert_eq!(response[0], AID_PF3);
    }

    #[test]
    fn test_read_partition_query_triggers_query_reply_response() {
        let mut processor = ProtocolProcessor3270::new();
        let mut display = Display3270::new();

        // WSF: length=5, SFID 0x01 (Read Partition, implicit partition 0x00), type Query
        let data = vec![CMD_WRITE_STRUCTURED_FIELD, 0x00, 0x05, 0x01, 0x00, RP_QUERY];
        processor.process_data(&data, &mut display).unwrap();

        let response = processor.generate_response().expect("query reply queued");
        assert_eq!(response[0], AID_STRUCTURED_FIELD);
        assert!(response.windows(2).any(|w| w == [24, 80]));
    }

    #[test]
    fn test_build_query_reply_advertises_screen_size() {
        let processor = ProtocolProcessor3270::new();
        let display = Display3270::new();

        let reply = processor.build_query_reply(&display);
        assert_eq!(reply[0], AID_STRUCTURED_FIELD);
        // SFID high byte for Query Reply sits right after length+type header
        assert!(reply.windows(2).any(|w| w == [24, 80]));
    }
}
