//! Integration tests for field-aware input, paste emulation, compose, and
//! typeahead
//!
//! These exercise the documented input properties end to end through the
//! public session API.

use proptest::prelude::*;

use tn3270r::actions::{run_action, Cause};
use tn3270r::codes::{
    ATTR_MDT, ATTR_NUMERIC, ATTR_PROTECTED, DISPLAY_HIDDEN, DISPLAY_INTENSIFIED, EBC_NULL,
};
use tn3270r::connection::{ConnectionState, HostEvent};
use tn3270r::ebcdic::ebcdic_to_char;
use tn3270r::events::ManualEvents;
use tn3270r::keyboard::{KeyResult, LockFlags};
use tn3270r::{Profile, Session};

fn connected_session() -> Session {
    let events = ManualEvents::new();
    let mut session = Session::new(Profile::default(), Box::new(events.clone()));
    session.connect("testhost");
    session.notify_host_output();
    session
}

fn screen_text(session: &Session, from: usize, len: usize) -> String {
    (from..from + len)
        .map(|a| ebcdic_to_char(session.screen.cell(a).cc))
        .collect()
}

#[test]
fn protected_fields_never_mutate() {
    // Every protected attribute combination rejects input identically.
    for attr in [
        ATTR_PROTECTED,
        ATTR_PROTECTED | ATTR_NUMERIC,
        ATTR_PROTECTED | DISPLAY_INTENSIFIED,
        ATTR_PROTECTED | DISPLAY_HIDDEN,
    ] {
        let mut session = connected_session();
        session.screen.set_field_attr(9, attr);
        session.screen.set_cursor(15);
        let before: Vec<u8> = (0..session.screen.len())
            .map(|a| session.screen.cell(a).cc)
            .collect();
        let result = session.key_typed('A', false);
        assert!(matches!(result, KeyResult::Rejected(_)), "attr {attr:02x}");
        let after: Vec<u8> = (0..session.screen.len())
            .map(|a| session.screen.cell(a).cc)
            .collect();
        assert_eq!(before, after, "attr {attr:02x} mutated the buffer");
    }
}

#[test]
fn numeric_field_scenario() {
    // Numeric field containing no data, cursor at field start, 'A' typed:
    // numeric error, buffer unchanged.
    let mut session = connected_session();
    session.screen.set_field_attr(9, ATTR_NUMERIC);
    session.screen.set_cursor(10);
    let result = session.key_typed('A', false);
    assert!(matches!(result, KeyResult::Rejected(_)));
    assert_eq!(session.screen.cell(10).cc, EBC_NULL);
    // The MDT bit did not get set either.
    assert_eq!(session.screen.cell(9).cc & ATTR_MDT, 0);
}

#[test]
fn unformatted_insert_scenario() {
    // Unformatted screen, insert mode off, cursor at 5: 'X' lands at 5,
    // cursor advances to 6, nothing shifts.
    let mut session = connected_session();
    session.screen.set_cursor(5);
    assert_eq!(session.key_typed('X', false), KeyResult::Done);
    assert_eq!(ebcdic_to_char(session.screen.cell(5).cc), 'X');
    assert_eq!(session.screen.cursor_addr(), 6);
    assert_eq!(session.screen.cell(6).cc, EBC_NULL);
}

#[test]
fn insert_overflow_versus_reverse() {
    // A full field: insert mode errors and leaves the buffer alone;
    // reverse mode overwrites nothing and skips past the field.
    let build = || {
        let mut session = connected_session();
        session.screen.set_field_attr(9, 0);
        session.screen.set_field_attr(13, ATTR_PROTECTED);
        session.screen.set_cursor(10);
        for ch in "ABC".chars() {
            session.key_typed(ch, false);
        }
        session.kybd_reset(true);
        session.screen.set_cursor(10);
        session
    };

    let mut insert = build();
    insert.keyboard.insert_mode = true;
    let before = screen_text(&insert, 10, 3);
    assert!(matches!(
        insert.key_typed('X', false),
        KeyResult::Rejected(_)
    ));
    assert_eq!(screen_text(&insert, 10, 3), before);

    let mut reverse = build();
    reverse.keyboard.reverse_mode = true;
    assert_eq!(reverse.key_typed('X', false), KeyResult::Done);
    assert_eq!(screen_text(&reverse, 10, 3), before);
}

#[test]
fn typed_enter_stops_in_3270_but_not_nvt() {
    let mut session = connected_session();
    session.set_connection_state(ConnectionState::Mode3270);
    let left = session.emulate_input("ab\\nc", false).unwrap();
    assert_eq!(left, 1);
    assert_eq!(screen_text(&session, 0, 2), "ab");

    let mut nvt = connected_session();
    nvt.set_connection_state(ConnectionState::Nvt { line_mode: false });
    let left = nvt.emulate_input("ab\\nc", false).unwrap();
    assert_eq!(left, 0);
    assert_eq!(
        nvt.connection.take_outbound(),
        vec![HostEvent::NvtData(b"ab\rc".to_vec())]
    );
}

#[test]
fn typeahead_replays_in_submission_order() {
    let mut session = connected_session();
    session.kybd_set_lock(LockFlags::TWAIT, "test");
    for arg in ["x", "y", "z"] {
        session.enq_ta("Key", &[arg]).unwrap();
    }
    assert_eq!(session.typeahead.len(), 3);

    // None run while locked; the unlock drains them in FIFO order.
    assert!(!session.run_ta());
    session.kybd_reset(true);
    assert!(session.typeahead.is_empty());
    assert_eq!(screen_text(&session, 0, 3), "xyz");
}

#[test]
fn typeahead_drops_when_disconnected() {
    let events = ManualEvents::new();
    let mut session = Session::new(Profile::default(), Box::new(events.clone()));
    assert!(session.enq_ta("Key", &["x"]).is_err());
    assert!(session.typeahead.is_empty());
}

#[test]
fn compose_pair_matches_either_order() {
    for (first, second) in [('n', '~'), ('~', 'n')] {
        let mut session = connected_session();
        run_action(&mut session, "Compose", &[], Cause::Interactive).unwrap();
        session.key_typed(first, false);
        session.key_typed(second, false);
        // CP037 0x49 is n-tilde.
        assert_eq!(session.screen.cell(0).cc, 0x49);
        assert_eq!(session.bell_count(), 0);
    }
}

#[test]
fn compose_unregistered_pair_rings_bell() {
    let mut session = connected_session();
    run_action(&mut session, "Compose", &[], Cause::Interactive).unwrap();
    session.key_typed('n', false);
    session.key_typed('q', false);
    assert_eq!(session.bell_count(), 1);
    assert_eq!(session.screen.cell(0).cc, EBC_NULL);
}

#[test]
fn deferred_unlock_timer_resumes_input() {
    let events = ManualEvents::new();
    let mut session = Session::new(Profile::default(), Box::new(events.clone()));
    session.connect("testhost");
    session.set_connection_state(ConnectionState::Mode3270);
    session.notify_host_output();

    run_action(&mut session, "Enter", &[], Cause::Interactive).unwrap();
    assert!(session.keyboard.locked());
    session.key_typed('z', false);
    assert_eq!(session.typeahead.len(), 1);

    // Host restores the keyboard: deferred unlock, then the settle timer
    // releases the queued character.
    session.host_keyboard_restore();
    let timer = events.pop_timer().unwrap();
    session.handle_timer(timer);
    assert!(!session.keyboard.locked());
    assert_eq!(ebcdic_to_char(session.screen.cell(0).cc), 'z');
}

#[test]
fn pf24_accepted_pf25_rejected() {
    // The PF bounds check rejects only numbers strictly greater than the
    // table size; PF24 is the last real key.
    let mut session = connected_session();
    session.set_connection_state(ConnectionState::Mode3270);
    assert!(session.key_pf(24));
    session.kybd_reset(true);
    assert!(!session.key_pf(25));
    assert!(!session.key_pf(0));
}

proptest! {
    #[test]
    fn emulated_string_matches_sequential_keystrokes(
        text in "[a-zA-Z0-9 ,.:;?+-]{0,60}"
    ) {
        // For printable, escape-free input, emulate_input on an
        // unformatted screen is exactly sequential single-character
        // insertion.
        let mut emulated = connected_session();
        let mut typed = connected_session();
        let left = emulated.emulate_input(&text, false).unwrap();
        prop_assert_eq!(left, 0);
        for ch in text.chars() {
            typed.key_typed(ch, false);
        }
        prop_assert_eq!(
            screen_text(&emulated, 0, text.len().max(1)),
            screen_text(&typed, 0, text.len().max(1))
        );
        prop_assert_eq!(emulated.screen.cursor_addr(), typed.screen.cursor_addr());
    }

    #[test]
    fn paste_never_panics_and_reports_leftover(
        text in "[ -~\t\n]{0,120}",
        start in 0usize..1920
    ) {
        let mut session = connected_session();
        session.screen.set_cursor(start);
        let left = session.emulate_input(&text, true).unwrap();
        prop_assert!(left <= text.chars().count());
    }
}
