//! EBCDIC to ASCII conversion utilities
//!
//! Screen buffer cells hold EBCDIC (CP037) character codes; keyboard and
//! paste input arrives as ASCII/Unicode. This module provides the CP037
//! mappings in both directions. CP037 (EBCDIC US/Canada) is the code page
//! used by the vast majority of US-English mainframe hosts.

/// EBCDIC CP037 to Unicode translation table
///
/// Maps all 256 EBCDIC code points. Control characters below 0x40 mostly
/// have no printable equivalent and map to their EBCDIC control semantics
/// where one exists.
const EBCDIC_CP037_TO_CHAR: [char; 256] = [
    // 0x00-0x0F
    '\0', '\x01', '\x02', '\x03', '\u{9C}', '\t', '\u{86}', '\x7F',
    '\u{97}', '\u{8D}', '\u{8E}', '\x0B', '\x0C', '\r', '\x0E', '\x0F',
    // 0x10-0x1F
    '\x10', '\x11', '\x12', '\x13', '\u{9D}', '\u{85}', '\x08', '\u{87}',
    '\x18', '\x19', '\u{92}', '\u{8F}', '\x1C', '\x1D', '\x1E', '\x1F',
    // 0x20-0x2F
    '\u{80}', '\u{81}', '\u{82}', '\u{83}', '\u{84}', '\n', '\x17', '\x1B',
    '\u{88}', '\u{89}', '\u{8A}', '\u{8B}', '\u{8C}', '\x05', '\x06', '\x07',
    // 0x30-0x3F
    '\u{90}', '\u{91}', '\x16', '\u{93}', '\u{94}', '\u{95}', '\u{96}', '\x04',
    '\u{98}', '\u{99}', '\u{9A}', '\u{9B}', '\x14', '\x15', '\u{9E}', '\x1A',
    // 0x40-0x4F
    ' ', '\u{A0}', '\u{E2}', '\u{E4}', '\u{E0}', '\u{E1}', '\u{E3}', '\u{E5}',
    '\u{E7}', '\u{F1}', '\u{A2}', '.', '<', '(', '+', '|',
    // 0x50-0x5F
    '&', '\u{E9}', '\u{EA}', '\u{EB}', '\u{E8}', '\u{ED}', '\u{EE}', '\u{EF}',
    '\u{EC}', '\u{DF}', '!', '$', '*', ')', ';', '\u{AC}',
    // 0x60-0x6F
    '-', '/', '\u{C2}', '\u{C4}', '\u{C0}', '\u{C1}', '\u{C3}', '\u{C5}',
    '\u{C7}', '\u{D1}', '\u{A6}', ',', '%', '_', '>', '?',
    // 0x70-0x7F
    '\u{F8}', '\u{C9}', '\u{CA}', '\u{CB}', '\u{C8}', '\u{CD}', '\u{CE}', '\u{CF}',
    '\u{CC}', '`', ':', '#', '@', '\'', '=', '"',
    // 0x80-0x8F
    '\u{D8}', 'a', 'b', 'c', 'd', 'e', 'f', 'g',
    'h', 'i', '\u{AB}', '\u{BB}', '\u{F0}', '\u{FD}', '\u{FE}', '\u{B1}',
    // 0x90-0x9F
    '\u{B0}', 'j', 'k', 'l', 'm', 'n', 'o', 'p',
    'q', 'r', '\u{AA}', '\u{BA}', '\u{E6}', '\u{B8}', '\u{C6}', '\u{A4}',
    // 0xA0-0xAF
    '\u{B5}', '~', 's', 't', 'u', 'v', 'w', 'x',
    'y', 'z', '\u{A1}', '\u{BF}', '\u{D0}', '\u{DD}', '\u{DE}', '\u{AE}',
    // 0xB0-0xBF
    '^', '\u{A3}', '\u{A5}', '\u{B7}', '\u{A9}', '\u{A7}', '\u{B6}', '\u{BC}',
    '\u{BD}', '\u{BE}', '[', ']', '\u{AF}', '\u{A8}', '\u{B4}', '\u{D7}',
    // 0xC0-0xCF
    '{', 'A', 'B', 'C', 'D', 'E', 'F', 'G',
    'H', 'I', '\u{AD}', '\u{F4}', '\u{F6}', '\u{F2}', '\u{F3}', '\u{F5}',
    // 0xD0-0xDF
    '}', 'J', 'K', 'L', 'M', 'N', 'O', 'P',
    'Q', 'R', '\u{B9}', '\u{FB}', '\u{FC}', '\u{F9}', '\u{FA}', '\u{FF}',
    // 0xE0-0xEF
    '\\', '\u{F7}', 'S', 'T', 'U', 'V', 'W', 'X',
    'Y', 'Z', '\u{B2}', '\u{D4}', '\u{D6}', '\u{D2}', '\u{D3}', '\u{D5}',
    // 0xF0-0xFF
    '0', '1', '2', '3', '4', '5', '6', '7',
    '8', '9', '\u{B3}', '\u{DB}', '\u{DC}', '\u{D9}', '\u{DA}', '\u{9F}',
];

/// ASCII to EBCDIC CP037 translation table (0x00-0x7F)
///
/// Characters outside the ASCII range go through `char_to_ebcdic`, which
/// falls back to a reverse scan of the CP037 table.
const ASCII_TO_EBCDIC_CP037: [u8; 128] = [
    // 0x00-0x0F
    0x00, 0x01, 0x02, 0x03, 0x37, 0x2D, 0x2E, 0x2F,
    0x16, 0x05, 0x25, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    // 0x10-0x1F
    0x10, 0x11, 0x12, 0x13, 0x3C, 0x3D, 0x32, 0x26,
    0x18, 0x19, 0x3F, 0x27, 0x1C, 0x1D, 0x1E, 0x1F,
    // 0x20-0x2F:  !"#$%&'()*+,-./
    0x40, 0x5A, 0x7F, 0x7B, 0x5B, 0x6C, 0x50, 0x7D,
    0x4D, 0x5D, 0x5C, 0x4E, 0x6B, 0x60, 0x4B, 0x61,
    // 0x30-0x3F: 0-9:;<=>?
    0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7,
    0xF8, 0xF9, 0x7A, 0x5E, 0x4C, 0x7E, 0x6E, 0x6F,
    // 0x40-0x4F: @A-O
    0x7C, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7,
    0xC8, 0xC9, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6,
    // 0x50-0x5F: P-Z[\]^_
    0xD7, 0xD8, 0xD9, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6,
    0xE7, 0xE8, 0xE9, 0xBA, 0xE0, 0xBB, 0xB0, 0x6D,
    // 0x60-0x6F: `a-o
    0x79, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96,
    // 0x70-0x7F: p-z{|}~ DEL
    0x97, 0x98, 0x99, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6,
    0xA7, 0xA8, 0xA9, 0xC0, 0x4F, 0xD0, 0xA1, 0x07,
];

/// Convert an EBCDIC byte to its Unicode character
pub fn ebcdic_to_char(cc: u8) -> char {
    EBCDIC_CP037_TO_CHAR[cc as usize]
}

/// Convert an EBCDIC byte to a printable ASCII character, substituting
/// a blank for anything without a graphic ASCII representation
pub fn ebcdic_to_display(cc: u8) -> char {
    let ch = ebcdic_to_char(cc);
    if ch.is_ascii_graphic() || ch == ' ' {
        ch
    } else {
        ' '
    }
}

/// Convert a Unicode character to its EBCDIC CP037 byte, if one exists
pub fn char_to_ebcdic(ch: char) -> Option<u8> {
    if ch.is_ascii() {
        return Some(ASCII_TO_EBCDIC_CP037[ch as usize]);
    }
    // Latin-1 and other CP037 residents: reverse-scan the forward table.
    EBCDIC_CP037_TO_CHAR
        .iter()
        .position(|&c| c == ch)
        .map(|p| p as u8)
}
