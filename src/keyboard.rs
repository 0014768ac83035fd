//! Keyboard lock state machine and field-aware input
//!
//! All local input is gated by a bitmask of lock reasons: while any bit is
//! set, discrete actions are deferred to the typeahead queue and bulk input
//! stops. Character insertion honors field protection, numeric-only fields,
//! insert/reverse modes, blank fill, and field overflow, and marks the
//! field's MDT bit on success.

use bitflags::bitflags;

use crate::codes::{
    attr_is_numeric, attr_is_protected, attr_is_skip, ebc_is_numeric, AidKey, EBC_DUP, EBC_FM,
    EBC_NULL, EBC_SPACE, PA_COUNT, PF_COUNT,
};
use crate::ebcdic::char_to_ebcdic;
use crate::error::OperatorError;
use crate::events::TimerId;
use crate::screen::{CS_BASE, CS_GE};
use crate::session::{Session, TimerPurpose};
use crate::typeahead::{TaDrop, TypeaheadEntry};

bitflags! {
    /// Reasons the keyboard is locked; input is permitted only when the
    /// mask is empty
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LockFlags: u16 {
        /// Connected but no host data seen yet
        const AWAITING_FIRST = 0x0001;
        /// Operator error: input into a protected field
        const OERR_PROTECTED = 0x0002;
        /// Operator error: non-numeric input into a numeric field
        const OERR_NUMERIC = 0x0004;
        /// Operator error: field overflow
        const OERR_OVERFLOW = 0x0008;
        /// Host-initiated unlock pending its settle timer
        const DEFERRED_UNLOCK = 0x0010;
        /// AID sent, waiting for the host to respond
        const TWAIT = 0x0020;
        /// No connection
        const NOT_CONNECTED = 0x0040;
        /// Display is scrolled back
        const SCROLLED = 0x0080;

        const OERR_ANY = Self::OERR_PROTECTED.bits()
            | Self::OERR_NUMERIC.bits()
            | Self::OERR_OVERFLOW.bits();
        /// Bits a host-initiated reset replaces with a deferred unlock
        const WAIT_BITS = Self::AWAITING_FIRST.bits() | Self::TWAIT.bits();
        /// Bits that park a script or macro. NOT_CONNECTED and SCROLLED are
        /// excluded so scripts can run (and reconnect) while disconnected;
        /// AWAITING_FIRST is excluded so a login macro starts before the
        /// host's first write and synchronizes with Wait instead.
        const SCRIPT_WAIT = Self::OERR_ANY.bits()
            | Self::TWAIT.bits()
            | Self::DEFERRED_UNLOCK.bits();
    }
}

/// Outcome of a single input operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    /// Applied to the buffer
    Done,
    /// Keyboard locked; queued to typeahead (or dropped)
    Deferred,
    /// Refused with an operator error
    Rejected(OperatorError),
}

/// Keyboard state: the lock mask plus the input modes
#[derive(Debug)]
pub struct Keyboard {
    lock: LockFlags,
    pub insert_mode: bool,
    pub reverse_mode: bool,
    pub(crate) unlock_timer: Option<TimerId>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            lock: LockFlags::NOT_CONNECTED,
            insert_mode: false,
            reverse_mode: false,
            unlock_timer: None,
        }
    }

    pub fn locked(&self) -> bool {
        !self.lock.is_empty()
    }

    /// Whether a script or macro statement must wait before proceeding
    pub fn script_locked(&self) -> bool {
        self.lock.intersects(LockFlags::SCRIPT_WAIT)
    }

    /// Whether a node already parked in a keyboard-unlock wait may resume.
    /// Stricter than `script_locked`: a parked wait also holds through the
    /// await-first-write lock.
    pub fn kbwait_locked(&self) -> bool {
        self.lock
            .intersects(LockFlags::SCRIPT_WAIT | LockFlags::AWAITING_FIRST)
    }

    pub fn lock_flags(&self) -> LockFlags {
        self.lock
    }

    pub fn oerr_pending(&self) -> bool {
        self.lock.intersects(LockFlags::OERR_ANY)
    }

    /// Set lock bits; logs only on actual change
    pub fn set_lock(&mut self, bits: LockFlags, reason: &str) {
        let new = self.lock | bits;
        if new != self.lock {
            log::debug!("keyboard lock {:?} -> {:?} ({reason})", self.lock, new);
            self.lock = new;
        }
    }

    /// Clear lock bits; returns true when the mask transitioned to empty
    pub fn clear_lock(&mut self, bits: LockFlags, reason: &str) -> bool {
        let was_locked = self.locked();
        let new = self.lock & !bits;
        if new != self.lock {
            log::debug!("keyboard lock {:?} -> {:?} ({reason})", self.lock, new);
            self.lock = new;
        }
        was_locked && !self.locked()
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Defer a discrete action until the keyboard unlocks. Drops (with a
    /// logged reason) rather than queues when no replay could ever happen.
    pub fn enq_ta(&mut self, action: &str, args: &[&str]) -> Result<(), TaDrop> {
        let drop = if !self.connection.connected() {
            Some(TaDrop::NotConnected)
        } else if self.keyboard.oerr_pending() {
            Some(TaDrop::OperatorError)
        } else if self.keyboard.lock_flags().contains(LockFlags::SCROLLED) {
            Some(TaDrop::ScrollLocked)
        } else if !self.profile.typeahead {
            Some(TaDrop::Disabled)
        } else {
            None
        };
        if let Some(reason) = drop {
            log::debug!("typeahead: dropping {action}: {reason}");
            return Err(reason);
        }
        self.typeahead.push(TypeaheadEntry::new(action, args));
        Ok(())
    }

    /// Replay one queued action if the keyboard is unlocked; returns
    /// whether anything ran
    pub fn run_ta(&mut self) -> bool {
        if self.keyboard.locked() {
            return false;
        }
        let entry = match self.typeahead.pop() {
            Some(e) => e,
            None => return false,
        };
        let args: Vec<&str> = entry.args.iter().map(String::as_str).collect();
        if let Err(e) = crate::actions::run_action(
            self,
            &entry.action,
            &args,
            crate::actions::Cause::Typeahead,
        ) {
            log::warn!("typeahead replay of {} failed: {e}", entry.action);
        }
        true
    }

    /// The keyboard lock cleared: replay typeahead and resume any waiting
    /// script or macro
    pub(crate) fn lock_cleared(&mut self) {
        while self.run_ta() {}
        self.sms_continue();
    }

    /// Set lock bits on behalf of the data-stream decoder or transport
    pub fn kybd_set_lock(&mut self, bits: LockFlags, reason: &str) {
        self.keyboard.set_lock(bits, reason);
    }

    /// Clear lock bits; a transition to fully unlocked replays typeahead
    /// and resumes the script stack
    pub fn kybd_clear_lock(&mut self, bits: LockFlags, reason: &str) {
        if self.keyboard.clear_lock(bits, reason) {
            self.lock_cleared();
        }
    }

    /// Raise an operator error: lock the keyboard if configured to, ring
    /// the bell otherwise
    fn operator_error(&mut self, err: OperatorError) -> KeyResult {
        log::debug!("operator error: {err}");
        if self.profile.oerr_lock {
            let bit = match err {
                OperatorError::Protected => LockFlags::OERR_PROTECTED,
                OperatorError::Numeric => LockFlags::OERR_NUMERIC,
                OperatorError::Overflow => LockFlags::OERR_OVERFLOW,
            };
            self.kybd_set_lock(bit, "operator error");
        } else {
            self.ring_bell();
        }
        KeyResult::Rejected(err)
    }

    /// Keyboard reset.
    ///
    /// Explicit (operator-initiated) reset clears every lock bit at once.
    /// Implicit (host-initiated) reset while waiting on the host instead
    /// replaces the wait bits with a deferred unlock and a settle timer, so
    /// the screen is not unlocked before the host has really finished.
    pub fn kybd_reset(&mut self, explicit: bool) {
        self.compose.reset();

        if !explicit
            && self
                .keyboard
                .lock_flags()
                .intersects(LockFlags::WAIT_BITS | LockFlags::DEFERRED_UNLOCK)
        {
            if let Some(id) = self.keyboard.unlock_timer.take() {
                self.cancel_timer(id);
            }
            self.keyboard.lock = LockFlags::DEFERRED_UNLOCK;
            let delay = self.profile.unlock_delay_ms;
            self.keyboard.unlock_timer =
                Some(self.register_timer(delay, TimerPurpose::DeferredUnlock));
            return;
        }

        self.keyboard.insert_mode = false;
        if let Some(id) = self.keyboard.unlock_timer.take() {
            self.cancel_timer(id);
        }
        let mut cleared = self.keyboard.lock_flags();
        if !self.connection.connected() {
            cleared.remove(LockFlags::NOT_CONNECTED);
        }
        self.kybd_clear_lock(cleared, "reset");
    }

    /// The deferred-unlock settle timer expired
    pub(crate) fn deferred_unlock_expired(&mut self) {
        self.keyboard.unlock_timer = None;
        self.kybd_clear_lock(LockFlags::DEFERRED_UNLOCK, "deferred unlock");
    }

    /// Connection state changed under us
    pub fn kybd_connect(&mut self, connected: bool) {
        if connected {
            self.keyboard.lock = LockFlags::AWAITING_FIRST;
        } else {
            self.typeahead.flush();
            if let Some(id) = self.keyboard.unlock_timer.take() {
                self.cancel_timer(id);
            }
            self.keyboard.lock = LockFlags::NOT_CONNECTED;
        }
    }

    /// Host data arrived; the await-first lock no longer applies
    pub(crate) fn kybd_first_output(&mut self) {
        self.kybd_clear_lock(LockFlags::AWAITING_FIRST, "host output");
    }

    /// Insert one typed character, honoring compose state and the lock
    pub fn key_typed(&mut self, ch: char, ge: bool) -> KeyResult {
        if self.keyboard.locked() {
            let mut buf = [0u8; 4];
            let s: &str = ch.encode_utf8(&mut buf);
            let _ = self.enq_ta("Key", &[s]);
            return KeyResult::Deferred;
        }
        let mut ch = ch;
        if self.compose.active() {
            use crate::compose::ComposeResult;
            match self.compose.feed(ch) {
                ComposeResult::Captured => return KeyResult::Done,
                ComposeResult::NoMatch => {
                    self.ring_bell();
                    return KeyResult::Done;
                }
                ComposeResult::Composed(out) => ch = out,
            }
        }
        if self.connection.in_nvt() {
            let mut buf = [0u8; 4];
            let bytes = ch.encode_utf8(&mut buf).as_bytes().to_vec();
            self.connection.send_nvt(&bytes);
            return KeyResult::Done;
        }
        match char_to_ebcdic(ch) {
            Some(cc) => self.key_char(cc, ge),
            None => {
                log::warn!("no EBCDIC mapping for {ch:?}");
                self.ring_bell();
                KeyResult::Done
            }
        }
    }

    /// Field-aware insertion of one EBCDIC character at the cursor
    pub fn key_char(&mut self, cc: u8, ge: bool) -> KeyResult {
        let mut baddr = self.screen.cursor_addr();
        let start_addr = baddr;
        let fa = self.screen.field_attr_at(baddr);

        if self.screen.cell(baddr).fa
            || fa.map(|(_, attr)| attr_is_protected(attr)).unwrap_or(false)
        {
            return self.operator_error(OperatorError::Protected);
        }
        if let Some((_, attr)) = fa {
            if attr_is_numeric(attr) && !ebc_is_numeric(cc) {
                return self.operator_error(OperatorError::Numeric);
            }
        }

        let reverse = self.keyboard.reverse_mode;
        let insert = self.keyboard.insert_mode;
        let mut no_room = false;

        if reverse || (insert && self.screen.cell(baddr).cc != EBC_NULL) {
            // Find room: the next null, or (in blank-fill mode) a trailing
            // run of blanks reaching the end of the field.
            let mut null_addr: Option<usize> = None;
            let mut blank_run: Option<usize> = None;
            let mut xaddr = baddr;
            loop {
                let cell = *self.screen.cell(xaddr);
                if cell.fa {
                    break;
                }
                if cell.cc == EBC_NULL {
                    null_addr = Some(xaddr);
                    break;
                }
                if self.profile.blank_fill && cell.cc == EBC_SPACE {
                    if blank_run.is_none() {
                        blank_run = Some(xaddr);
                    }
                } else {
                    blank_run = None;
                }
                xaddr = self.screen.inc_addr(xaddr);
                if xaddr == baddr {
                    break;
                }
            }
            let room = null_addr.or_else(|| blank_run.map(|_| self.screen.dec_addr(xaddr)));
            match room {
                Some(end) => {
                    // Shift the run right by one to open a hole at the
                    // cursor; handles the wrap past address 0.
                    self.screen.shift_right(baddr, end);
                }
                None => {
                    if insert {
                        return self.operator_error(OperatorError::Overflow);
                    }
                    no_room = true;
                }
            }
        }

        // Blank-fill: convert leading nulls between the field start and the
        // cursor into blanks, stopping at a backward line wrap that yields
        // no further nulls.
        if self.profile.blank_fill {
            if let Some((faddr, _)) = fa {
                let cols = self.screen.cols();
                let mut xaddr = baddr;
                let mut found_since_wrap = true;
                loop {
                    if xaddr % cols == 0 {
                        if !found_since_wrap {
                            break;
                        }
                        found_since_wrap = false;
                    }
                    xaddr = self.screen.dec_addr(xaddr);
                    if xaddr == faddr || self.screen.cell(xaddr).fa {
                        break;
                    }
                    if self.screen.cell(xaddr).cc == EBC_NULL {
                        self.screen.write_cell(xaddr, EBC_SPACE, CS_BASE);
                        found_since_wrap = true;
                    } else {
                        break;
                    }
                }
            }
        }

        if no_room {
            loop {
                baddr = self.screen.inc_addr(baddr);
                if self.screen.cell(baddr).fa {
                    break;
                }
            }
        } else {
            let cs = if ge { CS_GE } else { CS_BASE };
            self.screen.write_cell(baddr, cc, cs);
            let cell = self.screen.cell_mut(baddr);
            cell.fg = 0;
            cell.gr = 0;
            if !reverse {
                baddr = self.screen.inc_addr(baddr);
            }
        }

        // Auto-skip: a protected-numeric field after the new position is
        // skipped entirely; otherwise just step over attribute cells.
        if self.screen.cell(baddr).fa {
            if attr_is_skip(self.screen.cell(baddr).cc) {
                baddr = self.screen.next_unprotected(baddr).unwrap_or(0);
            } else {
                while self.screen.cell(baddr).fa {
                    baddr = self.screen.inc_addr(baddr);
                }
            }
        }
        self.screen.set_cursor(baddr);
        self.screen.set_mdt(start_addr);
        KeyResult::Done
    }

    /// Send an attention key: lock for the host's response and queue the
    /// AID for transmission. Clear also wipes the screen.
    pub fn key_aid(&mut self, aid: AidKey) {
        if self.connection.in_nvt() {
            match aid {
                AidKey::Enter => self.connection.send_nvt(b"\r"),
                AidKey::Clear => self.connection.send_nvt(b"\x0c"),
                _ => log::debug!("{aid:?} ignored in NVT mode"),
            }
            return;
        }
        self.keyboard.insert_mode = false;
        if aid == AidKey::Clear {
            self.screen.clear();
        }
        self.kybd_set_lock(LockFlags::TWAIT, "AID");
        self.output_wait_needed = true;
        self.connection.send_aid(aid.to_u8());
    }

    /// PF key by number. The original accepts any key up to and including
    /// the table size and rejects only strictly greater.
    pub fn key_pf(&mut self, n: usize) -> bool {
        if n < 1 || n > PF_COUNT {
            return false;
        }
        self.key_aid(AidKey::PF(n as u8));
        true
    }

    /// PA key by number, same bounds rule as `key_pf`
    pub fn key_pa(&mut self, n: usize) -> bool {
        if n < 1 || n > PA_COUNT {
            return false;
        }
        self.key_aid(AidKey::PA(n as u8));
        true
    }

    /// Move to the first data position of the next unprotected field
    pub fn key_tab(&mut self) {
        let next = self
            .screen
            .next_unprotected(self.screen.cursor_addr())
            .unwrap_or(0);
        self.screen.set_cursor(next);
    }

    /// Move to the first data position of the previous unprotected field
    pub fn key_backtab(&mut self) {
        let prev = self
            .screen
            .prev_unprotected(self.screen.cursor_addr())
            .unwrap_or(0);
        self.screen.set_cursor(prev);
    }

    /// Home: the first unprotected position on the screen
    pub fn key_home(&mut self) {
        if !self.screen.is_formatted() {
            self.screen.set_cursor(0);
            return;
        }
        let len = self.screen.len();
        let home = self.screen.next_unprotected(len - 1).unwrap_or(0);
        self.screen.set_cursor(home);
    }

    /// Move to the first input position of the next line
    pub fn key_newline(&mut self) {
        let cols = self.screen.cols();
        let cursor = self.screen.cursor_addr();
        let mut baddr = (cursor + cols) % self.screen.len();
        baddr -= baddr % cols;
        if self.screen.cell(baddr).fa || self.screen.protected_at(baddr) {
            baddr = self.screen.next_unprotected(baddr).unwrap_or(0);
        }
        self.screen.set_cursor(baddr);
    }

    pub fn key_left(&mut self) {
        let addr = self.screen.dec_addr(self.screen.cursor_addr());
        self.screen.set_cursor(addr);
    }

    pub fn key_right(&mut self) {
        let addr = self.screen.inc_addr(self.screen.cursor_addr());
        self.screen.set_cursor(addr);
    }

    pub fn key_up(&mut self) {
        let len = self.screen.len();
        let addr = (self.screen.cursor_addr() + len - self.screen.cols()) % len;
        self.screen.set_cursor(addr);
    }

    pub fn key_down(&mut self) {
        let addr = (self.screen.cursor_addr() + self.screen.cols()) % self.screen.len();
        self.screen.set_cursor(addr);
    }

    /// Place the cursor at (row, col), origin 0
    pub fn key_move_cursor(&mut self, row: usize, col: usize) -> bool {
        if row >= self.screen.rows() || col >= self.screen.cols() {
            return false;
        }
        let addr = self.screen.rc_to_addr(row, col);
        self.screen.set_cursor(addr);
        true
    }

    /// Delete the character under the cursor, closing the field leftward
    pub fn key_delete(&mut self) -> KeyResult {
        let baddr = self.screen.cursor_addr();
        if self.screen.cell(baddr).fa || self.screen.protected_at(baddr) {
            return self.operator_error(OperatorError::Protected);
        }
        let end = self.screen.next_field_attr(baddr).unwrap_or(baddr);
        let last = self.screen.dec_addr(end);
        if last != baddr {
            let n = self.screen.len();
            let count = (last + n - baddr) % n;
            self.screen.copy_range(self.screen.inc_addr(baddr), baddr, count);
        }
        self.screen.write_cell(last, EBC_NULL, CS_BASE);
        self.screen.set_mdt(baddr);
        KeyResult::Done
    }

    /// Destructive backspace: step left, then delete
    pub fn key_erase(&mut self) -> KeyResult {
        let baddr = self.screen.cursor_addr();
        let fa = self.screen.field_attr_at(baddr);
        if self.screen.cell(baddr).fa
            || fa.map(|(_, attr)| attr_is_protected(attr)).unwrap_or(false)
        {
            return self.operator_error(OperatorError::Protected);
        }
        // At the very start of a field there is nothing to erase.
        if let Some((faddr, _)) = fa {
            if self.screen.inc_addr(faddr) == baddr {
                return KeyResult::Done;
            }
        }
        self.key_left();
        self.key_delete()
    }

    /// Null the field from the cursor to its end
    pub fn key_erase_eof(&mut self) -> KeyResult {
        let baddr = self.screen.cursor_addr();
        if self.screen.cell(baddr).fa || self.screen.protected_at(baddr) {
            return self.operator_error(OperatorError::Protected);
        }
        let mut xaddr = baddr;
        if self.screen.is_formatted() {
            while !self.screen.cell(xaddr).fa {
                self.screen.write_cell(xaddr, EBC_NULL, CS_BASE);
                xaddr = self.screen.inc_addr(xaddr);
            }
        } else {
            loop {
                self.screen.write_cell(xaddr, EBC_NULL, CS_BASE);
                xaddr = self.screen.inc_addr(xaddr);
                if xaddr == 0 {
                    break;
                }
            }
        }
        self.screen.set_mdt(baddr);
        KeyResult::Done
    }

    /// Clear every unprotected field and home the cursor
    pub fn key_erase_input(&mut self) {
        if !self.screen.is_formatted() {
            self.screen.clear();
            return;
        }
        let len = self.screen.len();
        let mut addr = 0;
        let mut protected = self.screen.protected_at(0);
        for _ in 0..len {
            let cell = *self.screen.cell(addr);
            if cell.fa {
                protected = attr_is_protected(cell.cc);
            } else if !protected {
                self.screen.write_cell(addr, EBC_NULL, CS_BASE);
            }
            addr = self.screen.inc_addr(addr);
        }
        self.screen.reset_mdt();
        self.key_home();
    }

    /// DUP key: mark the field and skip to the next one
    pub fn key_dup(&mut self) -> KeyResult {
        match self.key_char(EBC_DUP, false) {
            KeyResult::Done => {
                self.key_tab();
                KeyResult::Done
            }
            other => other,
        }
    }

    /// Field-mark key
    pub fn key_fieldmark(&mut self) -> KeyResult {
        self.key_char(EBC_FM, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{ATTR_NUMERIC, ATTR_PROTECTED};
    use crate::session::Session;

    fn formatted_session() -> Session {
        let mut s = Session::test_session();
        // Field attribute at 9, unprotected field data from 10, protected
        // field attribute at 30.
        s.screen.set_field_attr(9, 0);
        s.screen.set_field_attr(30, ATTR_PROTECTED);
        s.screen.set_cursor(10);
        s
    }

    #[test]
    fn test_simple_insert_advances_cursor() {
        let mut s = Session::test_session();
        s.screen.set_cursor(5);
        assert_eq!(s.key_typed('X', false), KeyResult::Done);
        assert_eq!(s.screen.cell(5).cc, char_to_ebcdic('X').unwrap());
        assert_eq!(s.screen.cursor_addr(), 6);
    }

    #[test]
    fn test_protected_field_rejected_buffer_unchanged() {
        let mut s = formatted_session();
        s.screen.set_cursor(31);
        let before = s.screen.cell(31).cc;
        assert_eq!(
            s.key_typed('A', false),
            KeyResult::Rejected(OperatorError::Protected)
        );
        assert_eq!(s.screen.cell(31).cc, before);
        assert!(s.keyboard.oerr_pending());
    }

    #[test]
    fn test_attribute_cell_rejected() {
        let mut s = formatted_session();
        s.screen.set_cursor(9);
        assert_eq!(
            s.key_typed('A', false),
            KeyResult::Rejected(OperatorError::Protected)
        );
    }

    #[test]
    fn test_numeric_field_rejects_alpha() {
        let mut s = Session::test_session();
        s.screen.set_field_attr(9, ATTR_NUMERIC);
        s.screen.set_cursor(10);
        assert_eq!(
            s.key_typed('A', false),
            KeyResult::Rejected(OperatorError::Numeric)
        );
        assert_eq!(s.screen.cell(10).cc, EBC_NULL);
        // Reset, then digits and the sign characters are fine.
        s.kybd_reset(true);
        assert_eq!(s.key_typed('7', false), KeyResult::Done);
        assert_eq!(s.key_typed('-', false), KeyResult::Done);
        assert_eq!(s.key_typed('.', false), KeyResult::Done);
    }

    #[test]
    fn test_insert_mode_shifts_right() {
        let mut s = formatted_session();
        for ch in "AB".chars() {
            s.key_typed(ch, false);
        }
        s.screen.set_cursor(10);
        s.keyboard.insert_mode = true;
        assert_eq!(s.key_typed('X', false), KeyResult::Done);
        let text: String = (10..13).map(|a| crate::ebcdic::ebcdic_to_char(s.screen.cell(a).cc)).collect();
        assert_eq!(text, "XAB");
    }

    #[test]
    fn test_insert_overflow_rejected_and_unchanged() {
        let mut s = Session::test_session();
        s.screen.set_field_attr(9, 0);
        s.screen.set_field_attr(13, 0); // field holds addresses 10..=12
        s.screen.set_cursor(10);
        for ch in "ABC".chars() {
            s.key_typed(ch, false);
        }
        s.screen.set_cursor(10);
        s.keyboard.insert_mode = true;
        let before: Vec<u8> = (10..13).map(|a| s.screen.cell(a).cc).collect();
        assert_eq!(
            s.key_typed('X', false),
            KeyResult::Rejected(OperatorError::Overflow)
        );
        let after: Vec<u8> = (10..13).map(|a| s.screen.cell(a).cc).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_reverse_mode_overwrites_when_full() {
        let mut s = Session::test_session();
        s.profile.oerr_lock = false;
        s.screen.set_field_attr(9, 0);
        s.screen.set_field_attr(13, 0);
        s.screen.set_cursor(10);
        for ch in "ABC".chars() {
            s.key_typed(ch, false);
        }
        s.screen.set_cursor(10);
        s.keyboard.reverse_mode = true;
        // No room: the character is not written and the cursor skips the field.
        assert_eq!(s.key_typed('X', false), KeyResult::Done);
        assert_eq!(s.screen.cell(10).cc, char_to_ebcdic('A').unwrap());
    }

    #[test]
    fn test_mdt_set_on_insert() {
        let mut s = formatted_session();
        s.key_typed('A', false);
        assert_ne!(s.screen.cell(9).cc & crate::codes::ATTR_MDT, 0);
    }

    #[test]
    fn test_locked_keyboard_defers_to_typeahead() {
        let mut s = Session::test_session();
        s.connect_for_test();
        s.kybd_set_lock(LockFlags::TWAIT, "test");
        assert_eq!(s.key_typed('A', false), KeyResult::Deferred);
        assert_eq!(s.typeahead.len(), 1);
        assert_eq!(s.screen.cell(0).cc, EBC_NULL);
    }

    #[test]
    fn test_typeahead_replays_in_order_on_unlock() {
        let mut s = Session::test_session();
        s.connect_for_test();
        s.kybd_set_lock(LockFlags::TWAIT, "test");
        for ch in "abc".chars() {
            s.key_typed(ch, false);
        }
        assert_eq!(s.typeahead.len(), 3);
        s.kybd_clear_lock(LockFlags::TWAIT, "test");
        let text: String = (0..3).map(|a| crate::ebcdic::ebcdic_to_char(s.screen.cell(a).cc)).collect();
        assert_eq!(text, "abc");
        assert!(s.typeahead.is_empty());
    }

    #[test]
    fn test_explicit_reset_clears_all() {
        let mut s = Session::test_session();
        s.connect_for_test();
        s.kybd_set_lock(LockFlags::TWAIT | LockFlags::OERR_PROTECTED, "test");
        s.kybd_reset(true);
        assert!(!s.keyboard.locked());
    }

    #[test]
    fn test_implicit_reset_defers_unlock() {
        let mut s = Session::test_session();
        s.connect_for_test();
        s.kybd_set_lock(LockFlags::TWAIT, "test");
        s.kybd_reset(false);
        assert!(s
            .keyboard
            .lock_flags()
            .contains(LockFlags::DEFERRED_UNLOCK));
        assert!(s.keyboard.unlock_timer.is_some());
        // Timer expiry finishes the unlock.
        let id = s.keyboard.unlock_timer.unwrap();
        s.handle_timer(id);
        assert!(!s.keyboard.locked());
    }

    #[test]
    fn test_pf_bounds_quirk() {
        let mut s = Session::test_session();
        s.connect_for_test();
        s.set_3270_for_test();
        assert!(s.key_pf(24));
        assert!(!s.key_pf(25));
        assert!(!s.key_pf(0));
        assert!(s.key_pa(3));
        assert!(!s.key_pa(4));
    }

    #[test]
    fn test_auto_skip_after_fill() {
        let mut s = Session::test_session();
        // Unprotected field 10..=11, then an auto-skip field, then another
        // unprotected field at 20.
        s.screen.set_field_attr(9, 0);
        s.screen.set_field_attr(12, ATTR_PROTECTED | ATTR_NUMERIC);
        s.screen.set_field_attr(19, 0);
        s.screen.set_cursor(10);
        s.key_typed('A', false);
        s.key_typed('B', false);
        assert_eq!(s.screen.cursor_addr(), 20);
    }

    #[test]
    fn test_delete_closes_field() {
        let mut s = formatted_session();
        for ch in "ABC".chars() {
            s.key_typed(ch, false);
        }
        s.screen.set_cursor(10);
        s.key_delete();
        let text: String = (10..13).map(|a| crate::ebcdic::ebcdic_to_char(s.screen.cell(a).cc)).collect();
        assert_eq!(&text[..2], "BC");
        assert_eq!(s.screen.cell(12).cc, EBC_NULL);
    }

    #[test]
    fn test_erase_at_field_start_is_noop() {
        let mut s = formatted_session();
        s.key_typed('A', false);
        s.screen.set_cursor(10);
        assert_eq!(s.key_erase(), KeyResult::Done);
        assert_eq!(s.screen.cell(10).cc, char_to_ebcdic('A').unwrap());
    }

    #[test]
    fn test_erase_eof() {
        let mut s = formatted_session();
        for ch in "ABCD".chars() {
            s.key_typed(ch, false);
        }
        s.screen.set_cursor(12);
        s.key_erase_eof();
        assert_eq!(s.screen.cell(10).cc, char_to_ebcdic('A').unwrap());
        assert_eq!(s.screen.cell(12).cc, EBC_NULL);
        assert_eq!(s.screen.cell(13).cc, EBC_NULL);
    }

    #[test]
    fn test_erase_input_clears_unprotected_only() {
        let mut s = Session::test_session();
        s.screen.set_field_attr(9, 0);
        s.screen.set_field_attr(30, ATTR_PROTECTED);
        s.screen.write_cell(31, 0xC1, CS_BASE);
        s.screen.set_cursor(10);
        s.key_typed('A', false);
        s.key_erase_input();
        assert_eq!(s.screen.cell(10).cc, EBC_NULL);
        assert_eq!(s.screen.cell(31).cc, 0xC1);
        assert_eq!(s.screen.cursor_addr(), 10);
    }

    #[test]
    fn test_newline_lands_on_unprotected() {
        let mut s = Session::test_session();
        s.screen.set_field_attr(79, ATTR_PROTECTED); // second row starts protected
        s.screen.set_field_attr(90, 0);
        s.screen.set_cursor(5);
        s.key_newline();
        assert_eq!(s.screen.cursor_addr(), 91);
    }

    #[test]
    fn test_clear_key_wipes_screen_and_locks() {
        let mut s = Session::test_session();
        s.connect_for_test();
        s.set_3270_for_test();
        s.key_typed('A', false);
        s.key_aid(AidKey::Clear);
        assert_eq!(s.screen.cell(0).cc, EBC_NULL);
        assert!(s.keyboard.lock_flags().contains(LockFlags::TWAIT));
        assert!(!s.connection.take_outbound().is_empty());
    }
}
