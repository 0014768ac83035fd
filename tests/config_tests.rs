//! Profile persistence tests

use tn3270r::events::ManualEvents;
use tn3270r::{Profile, Session};

#[test]
fn profile_round_trips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");

    let mut profile = Profile::default();
    profile.model = 4;
    profile.blank_fill = true;
    profile.unlock_delay_ms = 500;
    profile.compose_map = Some("a + e = X".to_string());
    profile.login_macro = Some("Wait(30, 3270Mode)".to_string());
    profile.save(&path).unwrap();

    let loaded = Profile::load(&path).unwrap();
    assert_eq!(loaded, profile);
}

#[test]
fn missing_profile_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nonexistent.json");
    assert!(Profile::load(&path).is_err());
}

#[test]
fn malformed_profile_reports_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");
    std::fs::write(&path, "{not json").unwrap();
    let err = Profile::load(&path).unwrap_err();
    assert!(err.to_string().contains("profile.json"));
}

#[test]
fn profile_compose_map_reaches_the_session() {
    let mut profile = Profile::default();
    profile.compose_map = Some("a + b = Z".to_string());
    let mut session = Session::new(profile, Box::new(ManualEvents::new()));
    session.connect("testhost");
    session.notify_host_output();

    session.compose.trigger();
    session.key_typed('a', false);
    session.key_typed('b', false);
    assert_eq!(tn3270r::ebcdic::ebcdic_to_char(session.screen.cell(0).cc), 'Z');
}

#[test]
fn bad_compose_map_disables_composition_nonfatally() {
    let mut profile = Profile::default();
    profile.compose_map = Some("complete garbage".to_string());
    let mut session = Session::new(profile, Box::new(ManualEvents::new()));
    session.connect("testhost");
    session.notify_host_output();

    session.compose.trigger();
    // Composition is off: the characters insert normally.
    session.key_typed('a', false);
    session.key_typed('b', false);
    assert_eq!(tn3270r::ebcdic::ebcdic_to_char(session.screen.cell(0).cc), 'a');
    assert_eq!(tn3270r::ebcdic::ebcdic_to_char(session.screen.cell(1).cc), 'b');
}
