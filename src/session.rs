//! The session context
//!
//! One `Session` owns everything that was process-global in classic
//! emulators: the screen buffer, the keyboard lock mask, the typeahead
//! queue, the compose state, the connection status, and the script stack.
//! The external transport and event loop drive it through the public
//! methods; there is exactly one logical thread of control.

use std::collections::HashMap;

use crate::compose::Compose;
use crate::config::Profile;
use crate::connection::{Connection, ConnectionState};
use crate::events::{EventProvider, TimerId};
use crate::keyboard::Keyboard;
use crate::screen::Screen;
use crate::script::{NodeId, ScriptStack};
use crate::typeahead::TypeaheadQueue;

/// What a registered one-shot timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPurpose {
    /// The keyboard's deferred-unlock settle timer
    DeferredUnlock,
    /// A Wait condition's timeout
    ScriptWait(NodeId),
    /// An Expect pattern's timeout
    ExpectTimeout(NodeId),
}

/// A complete emulator session
pub struct Session {
    pub profile: Profile,
    pub screen: Screen,
    pub keyboard: Keyboard,
    pub typeahead: TypeaheadQueue,
    pub compose: Compose,
    pub connection: Connection,
    pub scripts: ScriptStack,
    pub(crate) events: Box<dyn EventProvider>,
    pub(crate) timers: HashMap<TimerId, TimerPurpose>,
    /// Data lines produced by the currently-executing command
    pub(crate) pending_data: Vec<String>,
    /// Output with no script to carry it
    pub(crate) console: Vec<String>,
    /// Saved screen image for Snap
    pub(crate) snapshot: Option<Screen>,
    /// Something was sent to the host and its output has not arrived yet
    pub(crate) output_wait_needed: bool,
    /// A file transfer is in progress (driven by the transfer subsystem)
    pub(crate) ft_active: bool,
    bell_rings: u64,
    #[cfg(test)]
    pub(crate) test_events: Option<crate::events::ManualEvents>,
}

impl Session {
    pub fn new(profile: Profile, events: Box<dyn EventProvider>) -> Self {
        let screen = Screen::new(profile.rows(), profile.cols());
        let compose = Compose::from_map_source(profile.compose_map.as_deref());
        Self {
            profile,
            screen,
            keyboard: Keyboard::new(),
            typeahead: TypeaheadQueue::new(),
            compose,
            connection: Connection::new(),
            scripts: ScriptStack::new(),
            events,
            timers: HashMap::new(),
            pending_data: Vec::new(),
            console: Vec::new(),
            snapshot: None,
            output_wait_needed: false,
            ft_active: false,
            bell_rings: 0,
            #[cfg(test)]
            test_events: None,
        }
    }

    /// The transport established a connection. The keyboard stays locked
    /// until the host's first write; a configured login macro starts here.
    pub fn connect(&mut self, host: &str) {
        log::info!("connected to {host}");
        self.connection.set_host(Some(host.to_string()));
        self.connection.set_state(ConnectionState::Connected);
        self.typeahead.flush();
        self.compose.reset();
        self.kybd_connect(true);
        if let Some(text) = self.profile.login_macro.clone() {
            self.push_login_macro(&text);
        }
        self.sms_continue();
    }

    /// The connection dropped (or was closed). Typeahead is flushed, all
    /// lock bits give way to not-connected, and login nodes are popped.
    pub fn disconnect(&mut self) {
        if self.connection.state() == &ConnectionState::Disconnected {
            return;
        }
        log::info!("disconnected");
        self.sms_disconnect();
        self.kybd_connect(false);
        self.connection.set_state(ConnectionState::Disconnected);
        self.connection.set_host(None);
        self.connection.clear_nvt_saved();
        self.output_wait_needed = false;
        self.sms_continue();
    }

    /// Negotiation progress reported by the transport (3270 mode, NVT
    /// mode, SSCP). Releases scripts waiting on a mode.
    pub fn set_connection_state(&mut self, state: ConnectionState) {
        self.connection.set_state(state);
        self.sms_continue();
    }

    /// The host restored the keyboard (write with keyboard-restore)
    pub fn host_keyboard_restore(&mut self) {
        self.kybd_reset(false);
    }

    /// Register a one-shot timer with the event provider
    pub(crate) fn register_timer(&mut self, delay_ms: u64, purpose: TimerPurpose) -> TimerId {
        let id = self.events.add_timer(delay_ms);
        self.timers.insert(id, purpose);
        id
    }

    /// Cancel a timer before it fires
    pub(crate) fn cancel_timer(&mut self, id: TimerId) {
        self.events.cancel_timer(id);
        self.timers.remove(&id);
    }

    /// A timer registered by this session expired
    pub fn handle_timer(&mut self, id: TimerId) {
        match self.timers.remove(&id) {
            Some(TimerPurpose::DeferredUnlock) => self.deferred_unlock_expired(),
            Some(TimerPurpose::ScriptWait(node)) => self.sms_wait_timeout(node),
            Some(TimerPurpose::ExpectTimeout(node)) => self.sms_expect_timeout(node),
            None => log::debug!("stale timer {id:?} ignored"),
        }
    }

    /// Ring the terminal bell (operator errors, failed compositions)
    pub fn ring_bell(&mut self) {
        self.bell_rings += 1;
        log::debug!("bell");
    }

    pub fn bell_count(&self) -> u64 {
        self.bell_rings
    }

    /// Emit one line of action output (`data:` in script replies)
    pub fn action_output(&mut self, line: &str) {
        self.pending_data.push(line.to_string());
    }

    /// Drain output that had no script to carry it
    pub fn take_console(&mut self) -> Vec<String> {
        std::mem::take(&mut self.console)
    }
}

#[cfg(test)]
impl Session {
    /// A connected, unlocked Model 2 session driven by manual events
    pub(crate) fn test_session() -> Session {
        let events = crate::events::ManualEvents::new();
        let mut session = Session::new(Profile::default(), Box::new(events.clone()));
        session.test_events = Some(events);
        session.connect_for_test();
        session
    }

    pub(crate) fn connect_for_test(&mut self) {
        self.connection.set_host(Some("testhost".to_string()));
        self.connection.set_state(ConnectionState::Connected);
        self.kybd_connect(true);
        self.kybd_first_output();
    }

    pub(crate) fn set_3270_for_test(&mut self) {
        self.connection.set_state(ConnectionState::Mode3270);
    }

    pub(crate) fn set_nvt_for_test(&mut self) {
        self.connection.set_state(ConnectionState::Nvt { line_mode: false });
    }

    pub(crate) fn manual_events(&self) -> crate::events::ManualEvents {
        self.test_events.clone().expect("test session has manual events")
    }
}
