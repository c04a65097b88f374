//! IBM code page 037 (US/Canada EBCDIC), the default 3278 code page.

/// EBCDIC byte -> Unicode scalar, indexed by byte value. Total: every
/// entry is populated.
pub(super) const TO_UNICODE: [char; 256] = [
    // 0x00-0x0F
    '\x00', '\x01', '\x02', '\x03', '\u{009C}', '\t', '\u{0086}', '\x7F',
    '\u{0097}', '\u{008D}', '\u{008E}', '\x0B', '\x0C', '\r', '\x0E', '\x0F',
    // 0x10-0x1F
    '\x10', '\x11', '\x12', '\x13', '\u{009D}', '\u{0085}', '\x08', '\u{0087}',
    '\x18', '\x19', '\u{0092}', '\u{008F}', '\x1C', '\x1D', '\x1E', '\x1F',
    // 0x20-0x2F
    '\u{0080}', '\u{0081}', '\u{0082}', '\u{0083}', '\u{0084}', '\n', '\x17', '\x1B',
    '\u{0088}', '\u{0089}', '\u{008A}', '\u{008B}', '\u{008C}', '\x05', '\x06', '\x07',
    // 0x30-0x3F
    '\u{0090}', '\u{0091}', '\x16', '\u{0093}', '\u{0094}', '\u{0095}', '\u{0096}', '\x04',
    '\u{0098}', '\u{0099}', '\u{009A}', '\u{009B}', '\x14', '\x15', '\u{009E}', '\x1A',
    // 0x40-0x4F
    ' ', '\u{00A0}', '\u{00E2}', '\u{00E4}', '\u{00E0}', '\u{00E1}', '\u{00E3}', '\u{00E5}',
    '\u{00E7}', '\u{00F1}', '\u{00A2}', '.', '<', '(', '+', '|',
    // 0x50-0x5F
    '&', '\u{00E9}', '\u{00EA}', '\u{00EB}', '\u{00E8}', '\u{00ED}', '\u{00EE}', '\u{00EF}',
    '\u{00EC}', '\u{00DF}', '!', '$', '*', ')', ';', '\u{00AC}',
    // 0x60-0x6F
    '-', '/', '\u{00C2}', '\u{00C4}', '\u{00C0}', '\u{00C1}', '\u{00C3}', '\u{00C5}',
    '\u{00C7}', '\u{00D1}', '\u{00A6}', ',', '%', '_', '>', '?',
    // 0x70-0x7F
    '\u{00F8}', '\u{00C9}', '\u{00CA}', '\u{00CB}', '\u{00C8}', '\u{00CD}', '\u{00CE}', '\u{00CF}',
    '\u{00CC}', '`', ':', '#', '@', '\'', '=', '"',
    // 0x80-0x8F
    '\u{00D8}', 'a', 'b', 'c', 'd', 'e', 'f', 'g',
    'h', 'i', '\u{00AB}', '\u{00BB}', '\u{00F0}', '\u{00FD}', '\u{00FE}', '\u{00B1}',
    // 0x90-0x9F
    '\u{00B0}', 'j', 'k', 'l', 'm', 'n', 'o', 'p',
    'q', 'r', '\u{00AA}', '\u{00BA}', '\u{00E6}', '\u{00B8}', '\u{00C6}', '\u{00A4}',
    // 0xA0-0xAF
    '\u{00B5}', '~', 's', 't', 'u', 'v', 'w', 'x',
    'y', 'z', '\u{00A1}', '\u{00BF}', '\u{00D0}', '\u{00DD}', '\u{00DE}', '\u{00AE}',
    // 0xB0-0xBF
    '^', '\u{00A3}', '\u{00A5}', '\u{00B7}', '\u{00A9}', '\u{00A7}', '\u{00B6}', '\u{00BC}',
    '\u{00BD}', '\u{00BE}', '[', ']', '\u{00AF}', '\u{00A8}', '\u{00B4}', '\u{00D7}',
    // 0xC0-0xCF
    '{', 'A', 'B', 'C', 'D', 'E', 'F', 'G',
    'H', 'I', '\u{00AD}', '\u{00F4}', '\u{00F6}', '\u{00F2}', '\u{00F3}', '\u{00F5}',
    // 0xD0-0xDF
    '}', 'J', 'K', 'L', 'M', 'N', 'O', 'P',
    'Q', 'R', '\u{00B9}', '\u{00FB}', '\u{00FC}', '\u{00F9}', '\u{00FA}', '\u{00FF}',
    // 0xE0-0xEF
    '\\', '\u{00F7}', 'S', 'T', 'U', 'V', 'W', 'X',
    'Y', 'Z', '\u{00B2}', '\u{00D4}', '\u{00D6}', '\u{00D2}', '\u{00D3}', '\u{00D5}',
    // 0xF0-0xFF
    '0', '1', '2', '3', '4', '5', '6', '7',
    '8', '9', '\u{00B3}', '\u{00DB}', '\u{00DC}', '\u{00D9}', '\u{00DA}', '\u{009F}',
];

pub(super) fn from_unicode(ch: char) -> Option<u8> {
    Some(match ch {
        '\x00'..='\x03' => ch as u8,
        '\x04' => 0x37,
        '\x05' => 0x2D,
        '\x06' => 0x2E,
        '\x07' => 0x2F,
        '\x08' => 0x16,
        '\t' => 0x05,
        '\n' => 0x25,
        '\x0B' => 0x0B,
        '\x0C' => 0x0C,
        '\r' => 0x0D,
        '\x0E' => 0x0E,
        '\x0F' => 0x0F,
        '\x10'..='\x13' => ch as u8,
        '\x14' => 0x3C,
        '\x15' => 0x3D,
        '\x16' => 0x32,
        '\x17' => 0x26,
        '\x18' => 0x18,
        '\x19' => 0x19,
        '\x1A' => 0x3F,
        '\x1B' => 0x27,
        '\x1C'..='\x1F' => ch as u8,
        '\x7F' => 0x07,

        ' ' => 0x40,
        '!' => 0x5A,
        '"' => 0x7F,
        '#' => 0x7B,
        '$' => 0x5B,
        '%' => 0x6C,
        '&' => 0x50,
        '\'' => 0x7D,
        '(' => 0x4D,
        ')' => 0x5D,
        '*' => 0x5C,
        '+' => 0x4E,
        ',' => 0x6B,
        '-' => 0x60,
        '.' => 0x4B,
        '/' => 0x61,

        '0'..='9' => 0xF0 + (ch as u8 - b'0'),

        ':' => 0x7A,
        ';' => 0x5E,
        '<' => 0x4C,
        '=' => 0x7E,
        '>' => 0x6E,
        '?' => 0x6F,
        '@' => 0x7C,

        'A'..='I' => 0xC1 + (ch as u8 - b'A'),
        'J'..='R' => 0xD1 + (ch as u8 - b'J'),
        'S'..='Z' => 0xE2 + (ch as u8 - b'S'),

        '[' => 0xBA,
        '\\' => 0xE0,
        ']' => 0xBB,
        '^' => 0xB0,
        '_' => 0x6D,
        '`' => 0x79,

        'a'..='i' => 0x81 + (ch as u8 - b'a'),
        'j'..='r' => 0x91 + (ch as u8 - b'j'),
        's'..='z' => 0xA2 + (ch as u8 - b's'),

        '{' => 0xC0,
        '|' => 0x4F,
        '}' => 0xD0,
        '~' => 0xA1,

        '\u{0080}' => 0x20, '\u{0081}' => 0x21, '\u{0082}' => 0x22, '\u{0083}' => 0x23,
        '\u{0084}' => 0x24, '\u{0085}' => 0x15, '\u{0086}' => 0x06, '\u{0087}' => 0x17,
        '\u{0088}' => 0x28, '\u{0089}' => 0x29, '\u{008A}' => 0x2A, '\u{008B}' => 0x2B,
        '\u{008C}' => 0x2C, '\u{008D}' => 0x09, '\u{008E}' => 0x0A, '\u{008F}' => 0x1B,
        '\u{0090}' => 0x30, '\u{0091}' => 0x31, '\u{0092}' => 0x1A, '\u{0093}' => 0x33,
        '\u{0094}' => 0x34, '\u{0095}' => 0x35, '\u{0096}' => 0x36, '\u{0097}' => 0x08,
        '\u{0098}' => 0x38, '\u{0099}' => 0x39, '\u{009A}' => 0x3A, '\u{009B}' => 0x3B,
        '\u{009C}' => 0x04, '\u{009D}' => 0x14, '\u{009E}' => 0x3E, '\u{009F}' => 0xFF,
        '\u{00A0}' => 0x41, '\u{00A1}' => 0xAA, '\u{00A2}' => 0x4A, '\u{00A3}' => 0xB1,
        '\u{00A4}' => 0x9F, '\u{00A5}' => 0xB2, '\u{00A6}' => 0x6A, '\u{00A7}' => 0xB5,
        '\u{00A8}' => 0xBD, '\u{00A9}' => 0xB4, '\u{00AA}' => 0x9A, '\u{00AB}' => 0x8A,
        '\u{00AC}' => 0x5F, '\u{00AD}' => 0xCA, '\u{00AE}' => 0xAF, '\u{00AF}' => 0xBC,
        '\u{00B0}' => 0x90, '\u{00B1}' => 0x8F, '\u{00B2}' => 0xEA, '\u{00B3}' => 0xFA,
        '\u{00B4}' => 0xBE, '\u{00B5}' => 0xA0, '\u{00B6}' => 0xB6, '\u{00B7}' => 0xB3,
        '\u{00B8}' => 0x9D, '\u{00B9}' => 0xDA, '\u{00BA}' => 0x9B, '\u{00BB}' => 0x8B,
        '\u{00BC}' => 0xB7, '\u{00BD}' => 0xB8, '\u{00BE}' => 0xB9, '\u{00BF}' => 0xAB,
        '\u{00C0}' => 0x64, '\u{00C1}' => 0x65, '\u{00C2}' => 0x62, '\u{00C3}' => 0x66,
        '\u{00C4}' => 0x63, '\u{00C5}' => 0x67, '\u{00C6}' => 0x9E, '\u{00C7}' => 0x68,
        '\u{00C8}' => 0x74, '\u{00C9}' => 0x71, '\u{00CA}' => 0x72, '\u{00CB}' => 0x73,
        '\u{00CC}' => 0x78, '\u{00CD}' => 0x75, '\u{00CE}' => 0x76, '\u{00CF}' => 0x77,
        '\u{00D0}' => 0xAC, '\u{00D1}' => 0x69, '\u{00D2}' => 0xED, '\u{00D3}' => 0xEE,
        '\u{00D4}' => 0xEB, '\u{00D5}' => 0xEF, '\u{00D6}' => 0xEC, '\u{00D7}' => 0xBF,
        '\u{00D8}' => 0x80, '\u{00D9}' => 0xFD, '\u{00DA}' => 0xFE, '\u{00DB}' => 0xFB,
        '\u{00DC}' => 0xFC, '\u{00DD}' => 0xAD, '\u{00DE}' => 0xAE, '\u{00DF}' => 0x59,
        '\u{00E0}' => 0x44, '\u{00E1}' => 0x45, '\u{00E2}' => 0x42, '\u{00E3}' => 0x46,
        '\u{00E4}' => 0x43, '\u{00E5}' => 0x47, '\u{00E6}' => 0x9C, '\u{00E7}' => 0x48,
        '\u{00E8}' => 0x54, '\u{00E9}' => 0x51, '\u{00EA}' => 0x52, '\u{00EB}' => 0x53,
        '\u{00EC}' => 0x58, '\u{00ED}' => 0x55, '\u{00EE}' => 0x56, '\u{00EF}' => 0x57,
        '\u{00F0}' => 0x8C, '\u{00F1}' => 0x49, '\u{00F2}' => 0xCD, '\u{00F3}' => 0xCE,
        '\u{00F4}' => 0xCB, '\u{00F5}' => 0xCF, '\u{00F6}' => 0xCC, '\u{00F7}' => 0xE1,
        '\u{00F8}' => 0x70, '\u{00F9}' => 0xDD, '\u{00FA}' => 0xDE, '\u{00FB}' => 0xDB,
        '\u{00FC}' => 0xDC, '\u{00FD}' => 0x8D, '\u{00FE}' => 0x8E, '\u{00FF}' => 0xDF,

        _ => return None,
    })
}
