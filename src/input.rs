//! Paste and typed-string emulation
//!
//! A single-pass character-class state machine that turns a pasted
//! clipboard string or a typed/macro string into buffer writes and key
//! actions. The two modes differ only in what newline, tab, and backslash
//! mean. The machine is an explicit state enum; a character that terminates
//! a numeric escape is pushed back and re-examined in the base state rather
//! than handled by fallthrough.

use crate::codes::{AidKey, EBC_APL_LEFT_BRACKET, EBC_APL_RIGHT_BRACKET};
use crate::ebcdic::char_to_ebcdic;
use crate::error::InputError;
use crate::session::Session;

/// The embedded marker that makes the next character an alternate-glyph
/// (graphic escape) character
const GE_MARKER: char = '\u{1D}';

#[derive(Debug, Clone, PartialEq, Eq)]
enum EmulState {
    Base,
    /// Seen `\`
    Backslash,
    /// Seen `\p`
    BackP,
    /// Collecting digits of `\pfNN`
    BackPF(String),
    /// Collecting digits of `\paN`
    BackPA(String),
    /// Seen `\x`, no digits yet
    BackX,
    /// Collecting hex digits of `\xHH`
    Hex(String),
    /// Collecting octal digits of `\NNN`
    Octal(String),
    /// Next character is an alternate-glyph character
    Ge,
}

impl EmulState {
    fn describe(&self) -> &'static str {
        match self {
            EmulState::Base => "base",
            EmulState::Backslash => "backslash",
            EmulState::BackP => "\\p",
            EmulState::BackPF(_) => "\\pf",
            EmulState::BackPA(_) => "\\pa",
            EmulState::BackX | EmulState::Hex(_) => "\\x",
            EmulState::Octal(_) => "octal",
            EmulState::Ge => "graphic escape",
        }
    }
}

impl Session {
    /// Feed a string through the input emulator.
    ///
    /// Returns the number of unconsumed characters: zero for a fully
    /// delivered string, non-zero when processing stopped early because the
    /// keyboard locked mid-stream or a paste ran out of screen. A string
    /// that ends in the middle of an escape is an error.
    pub fn emulate_input(&mut self, text: &str, pasting: bool) -> Result<usize, InputError> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let start_addr = self.screen.cursor_addr();
        let start_col = self.screen.addr_to_rc(start_addr).1;
        let mut state = EmulState::Base;
        let mut i = 0;

        while i < total {
            if self.keyboard.locked() {
                log::debug!("emulate_input: keyboard locked, {} character(s) left", total - i);
                return Ok(total - i);
            }
            if pasting {
                let cursor = self.screen.cursor_addr();
                if cursor < start_addr {
                    log::debug!("emulate_input: paste wrapped, stopping");
                    return Ok(total - i);
                }
                if self.profile.margined_paste && self.screen.addr_to_rc(cursor).1 < start_col {
                    log::debug!("emulate_input: paste crossed margin, stopping");
                    return Ok(total - i);
                }
            }
            if self.step(&mut state, chars[i], pasting)? {
                i += 1;
            }
        }

        // End of string: numeric escapes with at least one digit complete
        // normally; anything else mid-escape is an error.
        match state {
            EmulState::Base => Ok(0),
            EmulState::BackPF(d) if !d.is_empty() => {
                self.finish_pf(&d)?;
                Ok(0)
            }
            EmulState::BackPA(d) if !d.is_empty() => {
                self.finish_pa(&d)?;
                Ok(0)
            }
            EmulState::Hex(d) if !d.is_empty() => {
                self.deliver_ebc(u8::from_str_radix(&d, 16).unwrap_or(0));
                Ok(0)
            }
            EmulState::Octal(d) if !d.is_empty() => {
                self.deliver_ebc(u8::from_str_radix(&d, 8).unwrap_or(0));
                Ok(0)
            }
            other => Err(InputError::UnfinishedEscape {
                state: other.describe().to_string(),
            }),
        }
    }

    /// Process one character; returns whether it was consumed (false means
    /// push-back: re-examine the same character in the new state)
    fn step(&mut self, state: &mut EmulState, c: char, pasting: bool) -> Result<bool, InputError> {
        match state.clone() {
            EmulState::Base => {
                match c {
                    '\r' => {} // CR of a CRLF pair; ignored in both modes
                    '\n' => {
                        if pasting {
                            self.key_newline();
                        } else {
                            self.key_aid(AidKey::Enter);
                        }
                    }
                    '\t' | '\u{B}' | '\u{C}' if pasting => {
                        self.deliver_char(' ', false);
                    }
                    '\t' => self.key_tab(),
                    '\u{C}' => self.key_aid(AidKey::Clear),
                    '\u{8}' => self.key_left(),
                    '\\' if !pasting => *state = EmulState::Backslash,
                    GE_MARKER => *state = EmulState::Ge,
                    '[' if pasting && self.profile.apl_mode => {
                        self.deliver_ebc_ge(EBC_APL_LEFT_BRACKET);
                    }
                    ']' if pasting && self.profile.apl_mode => {
                        self.deliver_ebc_ge(EBC_APL_RIGHT_BRACKET);
                    }
                    _ => self.deliver_char(c, false),
                }
                Ok(true)
            }
            EmulState::Backslash => {
                *state = EmulState::Base;
                match c {
                    'n' => self.key_aid(AidKey::Enter),
                    'b' => self.key_left(),
                    'f' => self.key_aid(AidKey::Clear),
                    'r' => self.key_newline(),
                    't' => self.key_tab(),
                    'p' => *state = EmulState::BackP,
                    'x' => *state = EmulState::BackX,
                    '0'..='7' => *state = EmulState::Octal(c.to_string()),
                    // Any other escaped character is delivered literally.
                    _ => self.deliver_char(c, false),
                }
                Ok(true)
            }
            EmulState::BackP => {
                match c {
                    'f' | 'F' => *state = EmulState::BackPF(String::new()),
                    'a' | 'A' => *state = EmulState::BackPA(String::new()),
                    _ => {
                        log::warn!("emulate_input: unknown escape \\p{c}");
                        *state = EmulState::Base;
                    }
                }
                Ok(true)
            }
            EmulState::BackPF(mut digits) => {
                if c.is_ascii_digit() && digits.len() < 2 {
                    digits.push(c);
                    *state = EmulState::BackPF(digits);
                    Ok(true)
                } else if digits.is_empty() {
                    Err(InputError::UnfinishedEscape {
                        state: "\\pf".to_string(),
                    })
                } else {
                    self.finish_pf(&digits)?;
                    *state = EmulState::Base;
                    Ok(false)
                }
            }
            EmulState::BackPA(mut digits) => {
                if c.is_ascii_digit() && digits.len() < 2 {
                    digits.push(c);
                    *state = EmulState::BackPA(digits);
                    Ok(true)
                } else if digits.is_empty() {
                    Err(InputError::UnfinishedEscape {
                        state: "\\pa".to_string(),
                    })
                } else {
                    self.finish_pa(&digits)?;
                    *state = EmulState::Base;
                    Ok(false)
                }
            }
            EmulState::BackX => {
                if c.is_ascii_hexdigit() {
                    *state = EmulState::Hex(c.to_string());
                    Ok(true)
                } else {
                    Err(InputError::UnfinishedEscape {
                        state: "\\x".to_string(),
                    })
                }
            }
            EmulState::Hex(mut digits) => {
                if c.is_ascii_hexdigit() && digits.len() < 2 {
                    digits.push(c);
                    *state = EmulState::Hex(digits);
                    Ok(true)
                } else {
                    self.deliver_ebc(u8::from_str_radix(&digits, 16).unwrap_or(0));
                    *state = EmulState::Base;
                    Ok(false)
                }
            }
            EmulState::Octal(mut digits) => {
                if ('0'..='7').contains(&c) && digits.len() < 3 {
                    digits.push(c);
                    *state = EmulState::Octal(digits);
                    Ok(true)
                } else {
                    self.deliver_ebc(u8::from_str_radix(&digits, 8).unwrap_or(0));
                    *state = EmulState::Base;
                    Ok(false)
                }
            }
            EmulState::Ge => {
                *state = EmulState::Base;
                self.deliver_char(c, true);
                Ok(true)
            }
        }
    }

    fn finish_pf(&mut self, digits: &str) -> Result<(), InputError> {
        let n: usize = digits.parse().unwrap_or(0);
        if self.key_pf(n) {
            Ok(())
        } else {
            Err(InputError::BadKeyNumber { kind: "PF", number: n })
        }
    }

    fn finish_pa(&mut self, digits: &str) -> Result<(), InputError> {
        let n: usize = digits.parse().unwrap_or(0);
        if self.key_pa(n) {
            Ok(())
        } else {
            Err(InputError::BadKeyNumber { kind: "PA", number: n })
        }
    }

    /// Deliver one ordinary character to the buffer, or to the host in
    /// NVT mode
    fn deliver_char(&mut self, ch: char, ge: bool) {
        if self.connection.in_nvt() {
            let mut buf = [0u8; 4];
            let bytes = ch.encode_utf8(&mut buf).as_bytes().to_vec();
            self.connection.send_nvt(&bytes);
            return;
        }
        match char_to_ebcdic(ch) {
            Some(cc) => {
                self.key_char(cc, ge);
            }
            None => {
                log::warn!("emulate_input: no EBCDIC mapping for {ch:?}");
                self.ring_bell();
            }
        }
    }

    /// Deliver a literal EBCDIC code (from `\xHH` / `\NNN`)
    fn deliver_ebc(&mut self, cc: u8) {
        if self.connection.in_nvt() {
            self.connection.send_nvt(&[cc]);
            return;
        }
        self.key_char(cc, false);
    }

    fn deliver_ebc_ge(&mut self, cc: u8) {
        self.key_char(cc, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionState, HostEvent};
    use crate::ebcdic::ebcdic_to_char;
    use crate::session::Session;

    fn screen_text(s: &Session, from: usize, len: usize) -> String {
        (from..from + len)
            .map(|a| ebcdic_to_char(s.screen.cell(a).cc))
            .collect()
    }

    #[test]
    fn test_plain_string_equivalent_to_keystrokes() {
        let mut a = Session::test_session();
        let mut b = Session::test_session();
        a.emulate_input("hello 123", false).unwrap();
        for ch in "hello 123".chars() {
            b.key_typed(ch, false);
        }
        assert_eq!(screen_text(&a, 0, 9), screen_text(&b, 0, 9));
        assert_eq!(a.screen.cursor_addr(), b.screen.cursor_addr());
    }

    #[test]
    fn test_typed_newline_sends_enter_and_stops() {
        let mut s = Session::test_session();
        s.set_3270_for_test();
        let left = s.emulate_input("ab\\nc", false).unwrap();
        assert_eq!(left, 1);
        assert_eq!(screen_text(&s, 0, 2), "ab");
        assert_eq!(
            s.connection.take_outbound(),
            vec![HostEvent::Aid(crate::codes::AID_ENTER)]
        );
    }

    #[test]
    fn test_nvt_mode_continues_past_enter() {
        let mut s = Session::test_session();
        s.connection.set_state(ConnectionState::Nvt { line_mode: false });
        let left = s.emulate_input("ab\\nc", false).unwrap();
        assert_eq!(left, 0);
        assert_eq!(
            s.connection.take_outbound(),
            vec![HostEvent::NvtData(b"ab\rc".to_vec())]
        );
    }

    #[test]
    fn test_escapes() {
        let mut s = Session::test_session();
        // \t tabs to the next field; with no fields that is address 0,
        // so build a simple formatted screen.
        s.screen.set_field_attr(9, 0);
        s.screen.set_cursor(0);
        s.emulate_input("ab\\tcd", false).unwrap();
        assert_eq!(screen_text(&s, 0, 2), "ab");
        assert_eq!(screen_text(&s, 10, 2), "cd");
    }

    #[test]
    fn test_escaped_quote_and_backslash_literal() {
        let mut s = Session::test_session();
        s.emulate_input("a\\\"b\\\\c", false).unwrap();
        assert_eq!(screen_text(&s, 0, 5), "a\"b\\c");
    }

    #[test]
    fn test_hex_and_octal_escapes() {
        let mut s = Session::test_session();
        s.emulate_input("\\xC1\\301", false).unwrap();
        assert_eq!(s.screen.cell(0).cc, 0xC1);
        assert_eq!(s.screen.cell(1).cc, 0o301);
    }

    #[test]
    fn test_hex_escape_pushback() {
        let mut s = Session::test_session();
        // One hex digit followed by a non-hex character: the byte is
        // emitted and the character re-examined.
        s.emulate_input("\\xFz", false).unwrap();
        assert_eq!(s.screen.cell(0).cc, 0x0F);
        assert_eq!(ebcdic_to_char(s.screen.cell(1).cc), 'z');
    }

    #[test]
    fn test_pf_escape() {
        let mut s = Session::test_session();
        s.set_3270_for_test();
        let left = s.emulate_input("\\pf12x", false).unwrap();
        // PF locks the keyboard, stranding the trailing character.
        assert_eq!(left, 1);
        assert_eq!(
            s.connection.take_outbound(),
            vec![HostEvent::Aid(crate::codes::AID_PF12)]
        );
    }

    #[test]
    fn test_pf_out_of_range_is_error() {
        let mut s = Session::test_session();
        s.set_3270_for_test();
        assert!(matches!(
            s.emulate_input("\\pf25", false),
            Err(InputError::BadKeyNumber { kind: "PF", number: 25 })
        ));
    }

    #[test]
    fn test_trailing_backslash_is_error() {
        let mut s = Session::test_session();
        assert!(matches!(
            s.emulate_input("ab\\", false),
            Err(InputError::UnfinishedEscape { .. })
        ));
    }

    #[test]
    fn test_trailing_pf_digits_complete() {
        let mut s = Session::test_session();
        s.set_3270_for_test();
        assert_eq!(s.emulate_input("\\pf3", false).unwrap(), 0);
        assert_eq!(
            s.connection.take_outbound(),
            vec![HostEvent::Aid(crate::codes::AID_PF3)]
        );
    }

    #[test]
    fn test_paste_backslash_is_literal() {
        let mut s = Session::test_session();
        s.emulate_input("a\\nb", true).unwrap();
        assert_eq!(screen_text(&s, 0, 4), "a\\nb");
    }

    #[test]
    fn test_paste_newline_moves_to_next_line() {
        let mut s = Session::test_session();
        s.emulate_input("ab\ncd", true).unwrap();
        assert_eq!(screen_text(&s, 0, 2), "ab");
        assert_eq!(screen_text(&s, 80, 2), "cd");
    }

    #[test]
    fn test_paste_tab_inserts_blank() {
        let mut s = Session::test_session();
        s.emulate_input("a\tb", true).unwrap();
        assert_eq!(screen_text(&s, 0, 3), "a b");
    }

    #[test]
    fn test_paste_stops_on_wraparound() {
        let mut s = Session::test_session();
        let last = s.screen.len() - 2;
        s.screen.set_cursor(last);
        let left = s.emulate_input("abcdef", true).unwrap();
        // Two characters fit before the cursor wraps to the top.
        assert_eq!(left, 4);
    }

    #[test]
    fn test_margined_paste_stops_left_of_margin() {
        let mut s = Session::test_session();
        s.profile.margined_paste = true;
        s.screen.set_cursor(s.screen.rc_to_addr(0, 10));
        let left = s.emulate_input("ab\ncd", true).unwrap();
        // The newline moves to column 0 of the next line, which is left of
        // the column-10 margin.
        assert_eq!(left, 2);
        assert_eq!(screen_text(&s, s.screen.rc_to_addr(0, 10), 2), "ab");
    }

    #[test]
    fn test_apl_bracket_mapping() {
        let mut s = Session::test_session();
        s.profile.apl_mode = true;
        s.emulate_input("[x]", true).unwrap();
        assert_eq!(s.screen.cell(0).cc, EBC_APL_LEFT_BRACKET);
        assert_eq!(s.screen.cell(0).cs, crate::screen::CS_GE);
        assert_eq!(s.screen.cell(2).cc, EBC_APL_RIGHT_BRACKET);
    }

    #[test]
    fn test_ge_marker() {
        let mut s = Session::test_session();
        s.emulate_input("a\u{1D}b", false).unwrap();
        assert_eq!(s.screen.cell(1).cs, crate::screen::CS_GE);
    }

    #[test]
    fn test_lock_mid_stream_returns_remainder() {
        let mut s = Session::test_session();
        s.screen.set_field_attr(9, 0);
        s.screen.set_field_attr(12, crate::codes::ATTR_PROTECTED);
        s.screen.set_cursor(10);
        // Third character hits the protected field; the operator error
        // locks the keyboard and the rest is returned unconsumed.
        let left = s.emulate_input("abcd", false).unwrap();
        assert_eq!(left, 1);
        assert!(s.keyboard.oerr_pending());
    }
}
