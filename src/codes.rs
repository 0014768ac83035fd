//! 3270 Protocol Constants and Codes
//!
//! This module contains the IBM 3270 field attribute bits, AID (Attention
//! Identifier) keys, and the handful of EBCDIC control characters the input
//! side of the emulator cares about, as specified in the IBM 3270 Data
//! Stream Programmer's Reference (GA23-0059).

/// Field Attribute Byte Bits
///
/// The attribute byte occupies the buffer cell immediately preceding the
/// field's data and encodes its protection and display properties.
pub const ATTR_PROTECTED: u8 = 0x20; // Bit 5: Protected field
pub const ATTR_NUMERIC: u8 = 0x10; // Bit 4: Numeric-only field
pub const ATTR_DISPLAY: u8 = 0x0C; // Bits 2-3: Display attributes
pub const ATTR_MDT: u8 = 0x01; // Bit 0: Modified Data Tag

/// Display Attribute Values (bits 2-3 of the field attribute)
pub const DISPLAY_NORMAL: u8 = 0x00;
pub const DISPLAY_INTENSIFIED: u8 = 0x08;
pub const DISPLAY_HIDDEN: u8 = 0x0C; // Zero intensity (non-display)

/// Check whether a field attribute byte marks a protected field
pub fn attr_is_protected(attr: u8) -> bool {
    (attr & ATTR_PROTECTED) != 0
}

/// Check whether a field attribute byte marks a numeric-only field
pub fn attr_is_numeric(attr: u8) -> bool {
    (attr & ATTR_NUMERIC) != 0
}

/// Check whether a field attribute byte marks an auto-skip field
///
/// Auto-skip in 3270 is the combination of protected and numeric.
pub fn attr_is_skip(attr: u8) -> bool {
    attr_is_protected(attr) && attr_is_numeric(attr)
}

/// Check whether a field attribute byte marks a hidden field
pub fn attr_is_hidden(attr: u8) -> bool {
    (attr & ATTR_DISPLAY) == DISPLAY_HIDDEN
}

/// EBCDIC characters with special meaning to the input path
pub const EBC_NULL: u8 = 0x00;
pub const EBC_SPACE: u8 = 0x40;
pub const EBC_DUP: u8 = 0x1C; // Duplicate field marker
pub const EBC_FM: u8 = 0x1E; // Field mark
pub const EBC_MINUS: u8 = 0x60;
pub const EBC_PERIOD: u8 = 0x4B;
pub const EBC_0: u8 = 0xF0;
pub const EBC_9: u8 = 0xF9;

/// APL bracket glyphs substituted while pasting in APL mode
pub const EBC_APL_LEFT_BRACKET: u8 = 0xAD;
pub const EBC_APL_RIGHT_BRACKET: u8 = 0xBD;

/// Check whether an EBCDIC character is acceptable in a numeric-only field
/// (digits, minus sign, and decimal point)
pub fn ebc_is_numeric(cc: u8) -> bool {
    (EBC_0..=EBC_9).contains(&cc) || cc == EBC_MINUS || cc == EBC_PERIOD
}

/// AID (Attention Identifier) Keys
///
/// Sent from terminal to host to identify which key generated the read.
pub const AID_NO_AID: u8 = 0x60;
pub const AID_ENTER: u8 = 0x7D;
pub const AID_CLEAR: u8 = 0x6D;
pub const AID_SYSREQ: u8 = 0xF0;

pub const AID_PA1: u8 = 0x6C;
pub const AID_PA2: u8 = 0x6E;
pub const AID_PA3: u8 = 0x6B;

pub const AID_PF1: u8 = 0xF1;
pub const AID_PF2: u8 = 0xF2;
pub const AID_PF3: u8 = 0xF3;
pub const AID_PF4: u8 = 0xF4;
pub const AID_PF5: u8 = 0xF5;
pub const AID_PF6: u8 = 0xF6;
pub const AID_PF7: u8 = 0xF7;
pub const AID_PF8: u8 = 0xF8;
pub const AID_PF9: u8 = 0xF9;
pub const AID_PF10: u8 = 0x7A;
pub const AID_PF11: u8 = 0x7B;
pub const AID_PF12: u8 = 0x7C;
pub const AID_PF13: u8 = 0xC1;
pub const AID_PF14: u8 = 0xC2;
pub const AID_PF15: u8 = 0xC3;
pub const AID_PF16: u8 = 0xC4;
pub const AID_PF17: u8 = 0xC5;
pub const AID_PF18: u8 = 0xC6;
pub const AID_PF19: u8 = 0xC7;
pub const AID_PF20: u8 = 0xC8;
pub const AID_PF21: u8 = 0xC9;
pub const AID_PF22: u8 = 0x4A;
pub const AID_PF23: u8 = 0x4B;
pub const AID_PF24: u8 = 0x4C;

/// Number of PF keys on a 3270 keyboard
pub const PF_COUNT: usize = 24;

/// Number of PA keys on a 3270 keyboard
pub const PA_COUNT: usize = 3;

/// AID codes for PF1 through PF24, indexed by key number minus one
pub const PF_AIDS: [u8; PF_COUNT] = [
    AID_PF1, AID_PF2, AID_PF3, AID_PF4, AID_PF5, AID_PF6, AID_PF7, AID_PF8,
    AID_PF9, AID_PF10, AID_PF11, AID_PF12, AID_PF13, AID_PF14, AID_PF15,
    AID_PF16, AID_PF17, AID_PF18, AID_PF19, AID_PF20, AID_PF21, AID_PF22,
    AID_PF23, AID_PF24,
];

/// AID codes for PA1 through PA3, indexed by key number minus one
pub const PA_AIDS: [u8; PA_COUNT] = [AID_PA1, AID_PA2, AID_PA3];

/// Enum representation of AID keys for type safety at API boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AidKey {
    NoAid,
    Enter,
    Clear,
    SysReq,
    PA(u8),
    PF(u8),
}

impl AidKey {
    /// Convert an AidKey to its protocol byte value
    pub fn to_u8(self) -> u8 {
        match self {
            Self::NoAid => AID_NO_AID,
            Self::Enter => AID_ENTER,
            Self::Clear => AID_CLEAR,
            Self::SysReq => AID_SYSREQ,
            Self::PA(n) => PA_AIDS[(n as usize).saturating_sub(1) % PA_COUNT],
            Self::PF(n) => PF_AIDS[(n as usize).saturating_sub(1) % PF_COUNT],
        }
    }
}
