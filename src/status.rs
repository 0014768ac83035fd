//! Script status-line formatting
//!
//! After every script command the engine emits one line of eleven
//! space-separated status fields, a timing field, and a terminal `ok` or
//! `error` line. Existing script clients parse this format positionally, so
//! its well-formedness is an invariant: fields are never omitted and never
//! contain embedded spaces.

use std::time::Duration;

use crate::session::Session;

/// The eleven-field status line
///
/// Fields: keyboard (U/L/E), screen formatting (F/U), cursor field
/// protection (U/P), connect status (`C(host)`/N), emulator mode
/// (I/L/C/P/N), model number, rows, columns, cursor row, cursor column,
/// window id.
pub fn format_status(session: &Session) -> String {
    let kybd = if session.keyboard.oerr_pending() {
        'E'
    } else if session.keyboard.locked() {
        'L'
    } else {
        'U'
    };
    let formatted = if session.screen.is_formatted() { 'F' } else { 'U' };
    let protection = if session.screen.protected_at(session.screen.cursor_addr()) {
        'P'
    } else {
        'U'
    };
    let connect = if session.connection.connected() {
        format!("C({})", session.connection.host().unwrap_or("?"))
    } else {
        "N".to_string()
    };
    let (row, col) = session.screen.addr_to_rc(session.screen.cursor_addr());

    format!(
        "{kybd} {formatted} {protection} {connect} {mode} {model} {rows} {cols} {row} {col} 0x0",
        mode = session.connection.mode_char(),
        model = session.profile.model,
        rows = session.screen.rows(),
        cols = session.screen.cols(),
    )
}

/// The timing field: `secs.millis` when a measurement is available and
/// timing display is enabled, `-` otherwise
pub fn format_timing(elapsed: Option<Duration>) -> String {
    match elapsed {
        Some(d) => format!("{}.{:03}", d.as_secs(), d.subsec_millis()),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionState;
    use crate::session::Session;

    #[test]
    fn test_status_line_has_twelve_fields_with_timing() {
        let s = Session::test_session();
        let status = format_status(&s);
        assert_eq!(status.split(' ').count(), 11);
        let full = format!("{status} {}", format_timing(None));
        assert_eq!(full.split(' ').count(), 12);
    }

    #[test]
    fn test_status_reflects_session_state() {
        let mut s = Session::test_session();
        s.connection.set_state(ConnectionState::Mode3270);
        s.screen.set_cursor(s.screen.rc_to_addr(2, 5));
        let status = format_status(&s);
        let fields: Vec<&str> = status.split(' ').collect();
        assert_eq!(fields[0], "U");
        assert_eq!(fields[1], "U"); // unformatted
        assert_eq!(fields[3], "C(testhost)");
        assert_eq!(fields[4], "I");
        assert_eq!(fields[5], "2");
        assert_eq!(fields[6], "24");
        assert_eq!(fields[7], "80");
        assert_eq!(fields[8], "2");
        assert_eq!(fields[9], "5");
        assert_eq!(fields[10], "0x0");
    }

    #[test]
    fn test_status_disconnected() {
        let mut s = Session::test_session();
        s.disconnect();
        let status = format_status(&s);
        let fields: Vec<&str> = status.split(' ').collect();
        assert_eq!(fields[0], "L"); // locked: not connected
        assert_eq!(fields[3], "N");
        assert_eq!(fields[4], "N");
    }

    #[test]
    fn test_timing_format() {
        assert_eq!(format_timing(None), "-");
        assert_eq!(
            format_timing(Some(Duration::from_millis(1234))),
            "1.234"
        );
        assert_eq!(format_timing(Some(Duration::from_millis(5))), "0.005");
    }
}
