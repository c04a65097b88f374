//! TN3270 Display Buffer Management
//!
//! This module handles the 3270 display buffer which manages the screen state

#![allow(dead_code)] // Complete TN3270 display implementation
//! handling screen buffer operations, cursor management, and buffer addressing.

use super::codes::ORDER_SBA;
use super::field::{FieldAttribute, FieldManager};
use crate::codec::{self, CodePage};

use serde::{Deserialize, Serialize};

/// Standard 3270 screen sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenSize {
    /// Model 2: 24 rows x 80 columns (1920 characters)
    Model2,
    /// Model 3: 32 rows x 80 columns (2560 characters)
    Model3,
    /// Model 4: 43 rows x 80 columns (3440 characters)
    Model4,
    /// Model 5: 27 rows x 132 columns (3564 characters)
    Model5,
}

impl ScreenSize {
    /// Get the number of rows for this screen size
    pub fn rows(&self) -> usize {
        match self {
            Self::Model2 => 24,
            Self::Model3 => 32,
            Self::Model4 => 43,
            Self::Model5 => 27,
        }
    }
    
    /// Get the number of columns for this screen size
    pub fn cols(&self) -> usize {
        match self {
            Self::Model2 => 80,
            Self::Model3 => 80,
            Self::Model4 => 80,
            Self::Model5 => 132,
        }
    }
    
    /// Get the total buffer size (rows * cols)
    pub fn buffer_size(&self) -> usize {
        self.rows() * self.cols()
    }
    
    /// Convert buffer address to (row, col) coordinates
    pub fn address_to_coords(&self, address: u16) -> (usize, usize) {
        let addr = address as usize;
        let cols = self.cols();
        let row = addr / cols;
        let col = addr % cols;
        (row, col)
    }
    
    /// Convert (row, col) coordinates to buffer address
    pub fn coords_to_address(&self, row: usize, col: usize) -> u16 {
        ((row * self.cols()) + col) as u16
    }
}

/// Cell in the display buffer
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayCell {
    /// Character data (EBCDIC)
    pub char_data: u8,

    /// Field attribute (if this is a field attribute position)
    pub is_field_attr: bool,

    /// Extended attribute data
    pub extended_attr: u8,

    /// Set when this character arrived via a Graphic Escape order — it is
    /// drawn through the APL code page (CP310) rather than the session's
    /// normal one.
    pub via_ge: bool,
}

/// 3270 Display Buffer
///
/// Manages the screen buffer for a 3270 terminal, including character data,
/// field attributes, cursor position, and buffer addressing.
#[derive(Debug)]
pub struct Display3270 {
    /// Current screen size
    screen_size: ScreenSize,
    
    /// Display buffer (character and attribute data)
    buffer: Vec<DisplayCell>,
    
    /// Current cursor position (buffer address)
    cursor_address: u16,
    
    /// Field manager for tracking fields
    field_manager: FieldManager,
    
    /// Keyboard locked state
    keyboard_locked: bool,
    
    /// Alarm state
    alarm: bool,
}

impl Display3270 {
    /// Create a new display with Model 2 (24x80) size
    pub fn new() -> Self {
        Self::with_size(ScreenSize::Model2)
    }
    
    /// Create a new display with specified screen size
    pub fn with_size(size: ScreenSize) -> Self {
        let buffer_size = size.buffer_size();
        Self {
            screen_size: size,
            buffer: vec![DisplayCell::default(); buffer_size],
            cursor_address: 0,
            field_manager: FieldManager::new(),
            keyboard_locked: true,
            alarm: false,
        }
    }
    
    /// Get the current screen size
    pub fn screen_size(&self) -> ScreenSize {
        self.screen_size
    }
    
    /// Get the number of rows
    pub fn rows(&self) -> usize {
        self.screen_size.rows()
    }
    
    /// Get the number of columns
    pub fn cols(&self) -> usize {
        self.screen_size.cols()
    }
    
    /// Get the buffer size
    pub fn buffer_size(&self) -> usize {
        self.screen_size.buffer_size()
    }
    
    /// Clear the entire display buffer
    pub fn clear(&mut self) {
        for cell in &mut self.buffer {
            *cell = DisplayCell::default();
        }
        self.cursor_address = 0;
        self.field_manager.clear();
    }
    
    /// Clear all unprotected fields and reset their MDT bits (Erase/Write WCC
    /// bit 6, and the EAU command).
    pub fn clear_unprotected(&mut self) {
        let buffer_len = self.buffer.len().max(1);
        for field in self.field_manager.fields_mut() {
            if !field.is_protected() {
                // Data cells run from one past the attribute byte through
                // the rest of the field; the attribute byte itself is left
                // alone.
                let data_start = (field.address as usize + 1) % buffer_len;
                let data_len = field.length.saturating_sub(1);
                for offset in 0..data_len {
                    let addr = (data_start + offset) % buffer_len;
                    self.buffer[addr].char_data = 0x00;
                    self.buffer[addr].via_ge = false;
                }
                field.set_modified(false);
            }
        }
    }

    /// Buffer address of the first unprotected field's first data position,
    /// wrapping from the top of the buffer. `None` if the screen has no
    /// unprotected field.
    pub fn first_unprotected_address(&self) -> Option<u16> {
        let buffer_len = self.buffer_size() as u16;
        self.field_manager
            .fields()
            .iter()
            .find(|f| !f.is_protected())
            .map(|f| (f.address + 1) % buffer_len)
    }

    /// Resize the display in place, discarding its contents. Used for Erase/
    /// Write Alternate, which may switch to the negotiated alternate screen
    /// size.
    pub fn resize(&mut self, size: ScreenSize) {
        self.screen_size = size;
        self.buffer = vec![DisplayCell::default(); size.buffer_size()];
        self.cursor_address = 0;
        self.field_manager.clear();
    }
    
    /// Set cursor position using buffer address
    pub fn set_cursor(&mut self, address: u16) {
        if (address as usize) < self.buffer.len() {
            self.cursor_address = address;
        }
    }
    
    /// Get current cursor position
    pub fn cursor_address(&self) -> u16 {
        self.cursor_address
    }
    
    /// Get cursor position as (row, col)
    pub fn cursor_position(&self) -> (usize, usize) {
        self.screen_size.address_to_coords(self.cursor_address)
    }
    
    /// Write a character at the current cursor position
    /// This also marks the field as modified if writing to an unprotected field
    pub fn write_char(&mut self, ch: u8) {
        self.write_char_ge(ch, false);
    }

    /// Write a character that arrived via a Graphic Escape order, so it
    /// renders through the APL code page instead of the session's normal one.
    pub fn write_char_via_ge(&mut self, ch: u8) {
        self.write_char_ge(ch, true);
    }

    fn write_char_ge(&mut self, ch: u8, via_ge: bool) {
        let addr = self.cursor_address as usize;
        if addr < self.buffer.len() {
            self.buffer[addr].char_data = ch;
            self.buffer[addr].via_ge = via_ge;

            // Mark the field as modified if this is user input in an unprotected field
            if let Some(field) = self.field_manager.find_field_at_mut(self.cursor_address) {
                if !field.is_protected() {
                    field.set_modified(true);
                }
            }

            self.cursor_address = ((addr + 1) % self.buffer.len()) as u16;
        }
    }
    
    /// Write a character at a specific buffer address
    /// This also marks the field as modified if writing to an unprotected field
    pub fn write_char_at(&mut self, address: u16, ch: u8) {
        let addr = address as usize;
        if addr < self.buffer.len() {
            self.buffer[addr].char_data = ch;
            
            // Mark the field as modified if this is user input in an unprotected field
            if let Some(field) = self.field_manager.find_field_at_mut(address) {
                if !field.is_protected() {
                    field.set_modified(true);
                }
            }
        }
    }
    
    /// Read a character from a specific buffer address
    pub fn read_char_at(&self, address: u16) -> Option<u8> {
        let addr = address as usize;
        if addr < self.buffer.len() {
            Some(self.buffer[addr].char_data)
        } else {
            None
        }
    }
    
    /// Set a field attribute at a specific buffer address
    pub fn set_field_attribute(&mut self, address: u16, attr: FieldAttribute) {
        let addr = address as usize;
        if addr < self.buffer.len() {
            self.buffer[addr].is_field_attr = true;
            self.buffer[addr].char_data = attr.base_attr;
        }
        self.field_manager.add_field(attr);
        self.rebuild_fields();
    }

    /// Recompute every field's length against the live buffer size. Fields
    /// only know their start address when a field attribute order runs; the
    /// directory is rebuilt lazily here rather than threading a length
    /// through every SF/SFE call site.
    fn rebuild_fields(&mut self) {
        let buffer_size = self.buffer.len();
        if let Err(e) = self.field_manager.calculate_field_lengths(buffer_size) {
            log::warn!("field length rebuild failed: {e}");
        }
    }
    
    /// Get the field manager
    pub fn field_manager(&self) -> &FieldManager {
        &self.field_manager
    }
    
    /// Get mutable field manager
    pub fn field_manager_mut(&mut self) -> &mut FieldManager {
        &mut self.field_manager
    }
    
    /// Find the next unprotected field after the current cursor position
    /// Returns the address of the first position after the field attribute
    pub fn find_next_unprotected_field(&self) -> Option<u16> {
        let current_addr = self.cursor_address;
        let buffer_size = self.buffer_size() as u16;
        
        // Search for next unprotected field, wrapping around if necessary
        for offset in 1..buffer_size {
            let test_addr = (current_addr + offset) % buffer_size;
            
            // Check if this address has a field attribute
            if self.buffer[test_addr as usize].is_field_attr {
                // Check if field is unprotected
                if let Some(field) = self.field_manager.find_field_at(test_addr) {
                    if !field.is_protected() {
                        // Return position after field attribute
                        return Some((test_addr + 1) % buffer_size);
                    }
                }
            }
        }
        
        None
    }
    
    /// Null out the remainder of the field the cursor currently sits in, if
    /// that field is unprotected. Part of Program Tab behavior: the order
    /// clears what's left of the current field before moving to the next
    /// unprotected one.
    pub fn null_to_field_end(&mut self) {
        let cursor = self.cursor_address;
        let buffer_len = self.buffer.len();
        if let Some(field) = self.field_manager.find_field_at(cursor) {
            if field.is_protected() {
                return;
            }
            let field_end = (field.address as usize + field.length) % buffer_len.max(1);
            let mut addr = cursor as usize;
            while addr != field_end {
                self.buffer[addr].char_data = 0x00;
                addr = (addr + 1) % buffer_len;
            }
        }
    }

    /// Tab to the next unprotected field (Program Tab behavior)
    pub fn tab_to_next_field(&mut self) -> bool {
        if let Some(next_addr) = self.find_next_unprotected_field() {
            self.cursor_address = next_addr;
            true
        } else {
            false
        }
    }
    
    /// Repeat a character to a target address
    pub fn repeat_to_address(&mut self, ch: u8, target_address: u16) {
        self.repeat_to_address_ge(ch, target_address, false);
    }

    /// Repeat to a target address with the repeat character decoded through
    /// the APL code page (Graphic Escape-prefixed RA order).
    pub fn repeat_to_address_via_ge(&mut self, ch: u8, target_address: u16) {
        self.repeat_to_address_ge(ch, target_address, true);
    }

    /// Repeats from the cursor up to, but not including, `target_address`,
    /// wrapping around the buffer as needed. When the target equals the
    /// current address the repeat runs a full lap, filling the entire
    /// buffer before stopping back where it started.
    fn repeat_to_address_ge(&mut self, ch: u8, target_address: u16, via_ge: bool) {
        let len = self.buffer.len();
        if len == 0 {
            return;
        }
        let target = target_address as usize % len;
        let mut addr = self.cursor_address as usize % len;
        loop {
            self.buffer[addr].char_data = ch;
            self.buffer[addr].via_ge = via_ge;
            addr = (addr + 1) % len;
            if addr == target {
                break;
            }
        }
        self.cursor_address = target as u16;
    }

    /// Erase unprotected data from the cursor up to, but not including,
    /// `target_address`, wrapping around the buffer as needed — same
    /// addressing semantics as [`Display3270::repeat_to_address`].
    pub fn erase_unprotected_to_address(&mut self, target_address: u16) {
        let len = self.buffer.len();
        if len == 0 {
            return;
        }
        let target = target_address as usize % len;
        let mut addr = self.cursor_address as usize % len;
        loop {
            if !self.buffer[addr].is_field_attr {
                self.buffer[addr].char_data = 0x00;
            }
            addr = (addr + 1) % len;
            if addr == target {
                break;
            }
        }
        self.cursor_address = target as u16;
    }
    
    /// Lock the keyboard
    pub fn lock_keyboard(&mut self) {
        self.keyboard_locked = true;
    }
    
    /// Unlock the keyboard
    pub fn unlock_keyboard(&mut self) {
        self.keyboard_locked = false;
    }
    
    /// Check if keyboard is locked
    pub fn is_keyboard_locked(&self) -> bool {
        self.keyboard_locked
    }
    
    /// Set alarm state
    pub fn set_alarm(&mut self, alarm: bool) {
        self.alarm = alarm;
    }
    
    /// Check if alarm is set
    pub fn is_alarm(&self) -> bool {
        self.alarm
    }
    
    
    /// Get a specific row as a string
    pub fn get_row(&self, row: usize) -> Option<String> {
        if row >= self.rows() {
            return None;
        }
        
        let cols = self.cols();
        let start = row * cols;
        let end = start + cols;
        
        let mut result = String::new();
        for i in start..end {
            if i < self.buffer.len() {
                let cell = &self.buffer[i];
                if cell.is_field_attr {
                    result.push('█');
                } else {
                    let ch = self.decode_cell(cell);
                    result.push(if ch.is_ascii_graphic() || ch == ' ' {
                        ch
                    } else {
                        '.'
                    });
                }
            }
        }
        
        Some(result)
    }

    /// Decode a cell's character byte through the appropriate code page —
    /// CP310 (APL graphics) for characters that arrived via Graphic Escape,
    /// CP037 otherwise.
    fn decode_cell(&self, cell: &DisplayCell) -> char {
        let page = if cell.via_ge { CodePage::Cp310 } else { CodePage::Cp037 };
        codec::decode_byte(cell.char_data, page)
    }

    /// Get the entire buffer as raw bytes
    pub fn get_buffer_data(&self) -> Vec<u8> {
        self.buffer.iter().map(|cell| cell.char_data).collect()
    }
    
    /// Get modified field data for Read Modified / Read Modified All.
    ///
    /// `aid` is the Attention Identifier of the key that triggered the read
    /// (Enter, a PF/PA key, Clear); the caller threads it through from
    /// whatever generated the read request. `use_14bit` selects the wire
    /// address encoding, matching whatever mode negotiation settled on.
    /// `include_all` is Read Modified All's behavior: every unprotected
    /// field is sent regardless of its MDT bit, rather than only fields the
    /// operator actually changed.
    pub fn get_modified_data(&self, aid: u8, use_14bit: bool, include_all: bool) -> Vec<u8> {
        let mut data = Vec::new();

        data.push(aid);

        let (c1, c2) = encode_address(self.cursor_address, use_14bit);
        data.push(c1);
        data.push(c2);

        let buffer_len = self.buffer.len().max(1);
        let fields = if include_all {
            self.field_manager.unprotected_fields()
        } else {
            self.field_manager.modified_fields()
        };

        for field in fields {
            // Field data starts one past the attribute byte itself; length
            // covers the attribute byte plus the data cells up to the next
            // field (or buffer end).
            let data_start = (field.address as usize + 1) % buffer_len;
            let data_len = field.length.saturating_sub(1);

            let (b1, b2) = encode_address(data_start as u16, use_14bit);
            data.push(ORDER_SBA);
            data.push(b1);
            data.push(b2);

            for offset in 0..data_len {
                let addr = (data_start + offset) % buffer_len;
                let ch = self.buffer[addr].char_data;
                if ch != 0x00 {  // Don't include null characters
                    data.push(ch);
                }
            }
        }

        data
    }
}

fn encode_address(address: u16, use_14bit: bool) -> (u8, u8) {
    if use_14bit {
        addressing::encode_14bit_address(address)
    } else {
        addressing::encode_12bit_address(address)
    }
}

impl std::fmt::Display for Display3270 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cols = self.cols();

        for (i, cell) in self.buffer.iter().enumerate() {
            if i > 0 && i % cols == 0 {
                writeln!(f)?;
            }

            if cell.is_field_attr {
                write!(f, "█")?;
            } else {
                let ch = self.decode_cell(cell);
                let out_ch = if ch.is_ascii_graphic() || ch == ' ' { ch } else { '.' };
                write!(f, "{out_ch}")?;
            }
        }

        Ok(())
    }
}

impl Default for Display3270 {
    fn default() -> Self {
        Self::new()
    }
}

/// Buffer addressing utilities for 3270
pub mod addressing {
    /// Decode a 12-bit buffer address from two bytes
    ///
    /// 3270 uses a special encoding for buffer addresses where each byte
    /// represents 6 bits of the address.
    pub fn decode_12bit_address(byte1: u8, byte2: u8) -> u16 {
        let high = decode_address_byte(byte1) as u16;
        let low = decode_address_byte(byte2) as u16;
        (high << 6) | low
    }
    
    /// Decode a 14-bit buffer address from two bytes
    ///
    /// Extended addressing mode for larger screens.
    pub fn decode_14bit_address(byte1: u8, byte2: u8) -> u16 {
        let high = ((byte1 & 0x3F) as u16) << 8;
        let low = byte2 as u16;
        high | low
    }
    
    /// Encode a 12-bit buffer address to two bytes
    pub fn encode_12bit_address(address: u16) -> (u8, u8) {
        let high = ((address >> 6) & 0x3F) as u8;
        let low = (address & 0x3F) as u8;
        (encode_address_byte(high), encode_address_byte(low))
    }
    
    /// Encode a 14-bit buffer address to two bytes
    pub fn encode_14bit_address(address: u16) -> (u8, u8) {
        let high = ((address >> 8) & 0x3F) as u8;
        let low = (address & 0xFF) as u8;
        (high, low)
    }
    
    /// Decode a single address byte (6 bits)
    fn decode_address_byte(byte: u8) -> u8 {
        match byte {
            0x40..=0x4F => byte - 0x40,      // 0-15
            0x50..=0x5F => byte - 0x50 + 16, // 16-31
            0x60..=0x6F => byte - 0x60 + 32, // 32-47
            0x70..=0x7F => byte - 0x70 + 48, // 48-63
            0xC0..=0xCF => byte - 0xC0,      // 0-15 (alternate)
            0xD0..=0xDF => byte - 0xD0 + 16, // 16-31 (alternate)
            0xE0..=0xEF => byte - 0xE0 + 32, // 32-47 (alternate)
            0xF0..=0xFF => byte - 0xF0 + 48, // 48-63 (alternate)
            _ => 0,
        }
    }
    
    /// Encode a 6-bit value to an address byte
    fn encode_address_byte(value: u8) -> u8 {
        match value & 0x3F {
            0..=15 => 0x40 + value,
            16..=31 => 0x50 + (value - 16),
            32..=47 => 0x60 + (value - 32),
            48..=63 => 0x70 + (value - 48),
            _ => 0x40,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_size_model2() {
        let size = ScreenSize::Model2;
        assert_eq!(size.rows(), 24);
        assert_eq!(size.cols(), 80);
        assert_eq!(size.buffer_size(), 1920);
    }

    #[test]
    fn test_screen_size_coords() {
        let size = ScreenSize::Model2;
        assert_eq!(size.address_to_coords(0), (0, 0));
        assert_eq!(size.address_to_coords(80), (1, 0));
        assert_eq!(size.address_to_coords(81), (1, 1));
        
        assert_eq!(size.coords_to_address(0, 0), 0);
        assert_eq!(size.coords_to_address(1, 0), 80);
        assert_eq!(size.coords_to_address(1, 1), 81);
    }

    #[test]
    fn test_display_creation() {
        let display = Display3270::new();
        assert_eq!(display.rows(), 24);
        assert_eq!(display.cols(), 80);
        assert_eq!(display.cursor_address(), 0);
    }

    #[test]
    fn test_display_write_char() {
        let mut display = Display3270::new();
        display.write_char(0xC1); // EBCDIC 'A'
        assert_eq!(display.cursor_address(), 1);
        assert_eq!(display.read_char_at(0), Some(0xC1));
    }

    #[test]
    fn test_display_cursor_position() {
        let mut display = Display3270::new();
        display.set_cursor(81); // Row 1, Col 1
        let (row, col) = display.cursor_position();
        assert_eq!(row, 1);
        assert_eq!(col, 1);
    }

    #[test]
    fn test_addressing_12bit() {
        use addressing::*;
        
        let (b1, b2) = encode_12bit_address(100);
        let decoded = decode_12bit_address(b1, b2);
        assert_eq!(decoded, 100);
    }

    #[test]
    fn test_addressing_14bit() {
        use addressing::*;
        
        let (b1, b2) = encode_14bit_address(3000);
        let decoded = decode_14bit_address(b1, b2);
        assert_eq!(decoded, 3000);
    }
}