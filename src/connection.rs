//! Connection status tracking
//!
//! The network transport lives outside this crate; it drives the state held
//! here and drains the outbound event queue. The core only ever asks the
//! questions defined on `Connection` (connected, which emulation mode) and
//! records what it wants transmitted (AIDs, NVT characters).

use std::collections::VecDeque;

/// How much recently-received NVT-mode host output is retained for
/// pattern matching (`Expect`)
pub const NVT_SAVE_SIZE: usize = 4096;

/// Connection/negotiation state, driven by the external transport
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Socket being established (half-connected)
    Pending,
    /// Connected, emulation mode not yet negotiated
    Connected,
    /// NVT (ANSI) mode, character-at-a-time or line mode
    Nvt { line_mode: bool },
    /// Full 3270 data-stream mode
    Mode3270,
    /// SSCP-LU mode
    Sscp,
}

/// What the core wants sent to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// An attention key was pressed; the transport owns the read-modified
    /// data stream that accompanies it
    Aid(u8),
    /// Characters to transmit in NVT mode
    NvtData(Vec<u8>),
}

/// Connection status provider and outbound event queue
#[derive(Debug, Default)]
pub struct Connection {
    state: ConnectionState,
    host: Option<String>,
    nvt_ring: VecDeque<u8>,
    outbound: Vec<HostEvent>,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Transition driven by the transport layer
    pub fn set_state(&mut self, state: ConnectionState) {
        if state != self.state {
            log::debug!("connection state: {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    pub fn set_host(&mut self, host: Option<String>) {
        self.host = host;
    }

    pub fn connected(&self) -> bool {
        !matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Pending
        )
    }

    pub fn half_connected(&self) -> bool {
        self.state == ConnectionState::Pending
    }

    pub fn in_3270(&self) -> bool {
        self.state == ConnectionState::Mode3270
    }

    pub fn in_nvt(&self) -> bool {
        matches!(self.state, ConnectionState::Nvt { .. })
    }

    pub fn in_sscp(&self) -> bool {
        self.state == ConnectionState::Sscp
    }

    /// Record an AID for transmission
    pub fn send_aid(&mut self, aid: u8) {
        log::debug!("sending AID 0x{aid:02X}");
        self.outbound.push(HostEvent::Aid(aid));
    }

    /// Record NVT-mode characters for transmission
    pub fn send_nvt(&mut self, data: &[u8]) {
        if let Some(HostEvent::NvtData(buf)) = self.outbound.last_mut() {
            buf.extend_from_slice(data);
        } else {
            self.outbound.push(HostEvent::NvtData(data.to_vec()));
        }
    }

    /// Drain everything queued for the transport
    pub fn take_outbound(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.outbound)
    }

    /// Store a received NVT-mode byte in the pattern-match ring
    pub fn save_nvt_byte(&mut self, byte: u8) {
        if self.nvt_ring.len() == NVT_SAVE_SIZE {
            self.nvt_ring.pop_front();
        }
        self.nvt_ring.push_back(byte);
    }

    /// The retained NVT output, oldest byte first
    pub fn nvt_saved(&self) -> (&[u8], &[u8]) {
        self.nvt_ring.as_slices()
    }

    /// Search the retained NVT output for a byte pattern
    pub fn nvt_contains(&self, pattern: &[u8]) -> bool {
        if pattern.is_empty() {
            return true;
        }
        let buf: Vec<u8> = self.nvt_ring.iter().copied().collect();
        buf.windows(pattern.len()).any(|w| w == pattern)
    }

    /// Forget retained NVT output (reconnect, Expect completion)
    pub fn clear_nvt_saved(&mut self) {
        self.nvt_ring.clear();
    }

    /// Single-character emulator mode for the script status line
    pub fn mode_char(&self) -> char {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Pending => 'N',
            ConnectionState::Connected | ConnectionState::Sscp => 'P',
            ConnectionState::Nvt { line_mode: true } => 'L',
            ConnectionState::Nvt { line_mode: false } => 'C',
            ConnectionState::Mode3270 => 'I',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_queries() {
        let mut c = Connection::new();
        assert!(!c.connected());
        assert_eq!(c.mode_char(), 'N');

        c.set_state(ConnectionState::Pending);
        assert!(c.half_connected());
        assert!(!c.connected());

        c.set_state(ConnectionState::Mode3270);
        assert!(c.connected());
        assert!(c.in_3270());
        assert_eq!(c.mode_char(), 'I');

        c.set_state(ConnectionState::Nvt { line_mode: false });
        assert!(c.in_nvt());
        assert_eq!(c.mode_char(), 'C');
    }

    #[test]
    fn test_outbound_aid() {
        let mut c = Connection::new();
        c.send_aid(0x7D);
        assert_eq!(c.take_outbound(), vec![HostEvent::Aid(0x7D)]);
        assert!(c.take_outbound().is_empty());
    }

    #[test]
    fn test_nvt_data_coalesces() {
        let mut c = Connection::new();
        c.send_nvt(b"ab");
        c.send_nvt(b"c");
        assert_eq!(c.take_outbound(), vec![HostEvent::NvtData(b"abc".to_vec())]);
    }

    #[test]
    fn test_nvt_ring_search() {
        let mut c = Connection::new();
        for b in b"login: " {
            c.save_nvt_byte(*b);
        }
        assert!(c.nvt_contains(b"ogin:"));
        assert!(!c.nvt_contains(b"password"));
        c.clear_nvt_saved();
        assert!(!c.nvt_contains(b"ogin:"));
    }

    #[test]
    fn test_nvt_ring_bounded() {
        let mut c = Connection::new();
        for i in 0..(NVT_SAVE_SIZE + 100) {
            c.save_nvt_byte((i % 251) as u8);
        }
        let (a, b) = c.nvt_saved();
        assert_eq!(a.len() + b.len(), NVT_SAVE_SIZE);
    }
}
