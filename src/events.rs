//! Event notification providers
//!
//! The core is single-threaded and cooperative: all waiting is expressed as
//! a state value plus a one-shot timer or input-readiness watch registered
//! here. `PollEvents` is the real provider used by the binary, built on
//! `poll(2)`; `ManualEvents` is a deterministic provider for tests, where
//! the test itself decides when a timer fires.

use std::cell::RefCell;
use std::collections::HashSet;
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Handle to a registered one-shot timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Handle to a registered input-readiness watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// Something the provider observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A one-shot timer expired
    Timer(TimerId),
    /// A watched file descriptor became readable
    Input(WatchId),
}

/// Timer and input-watch registration
///
/// Timers are single-shot and cancelable; a component that goes away early
/// must cancel any timer it owns so a stale callback never fires against
/// freed state.
pub trait EventProvider {
    fn add_timer(&mut self, delay_ms: u64) -> TimerId;
    fn cancel_timer(&mut self, id: TimerId);
    fn add_input_watch(&mut self, fd: RawFd) -> WatchId;
    fn remove_input_watch(&mut self, id: WatchId);
}

#[derive(Debug, Default)]
struct PollInner {
    next_id: u64,
    timers: Vec<(Instant, TimerId)>,
    watches: Vec<(WatchId, RawFd)>,
}

/// `poll(2)`-backed provider; cheaply cloneable handle
#[derive(Debug, Clone, Default)]
pub struct PollEvents {
    inner: Rc<RefCell<PollInner>>,
}

impl PollEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing is registered, i.e. `poll` would never return
    pub fn is_idle(&self) -> bool {
        let inner = self.inner.borrow();
        inner.timers.is_empty() && inner.watches.is_empty()
    }

    /// Block until a timer expires or a watched descriptor is readable,
    /// returning everything that became ready
    pub fn poll(&self) -> Vec<Event> {
        let (timeout_ms, fds): (i32, Vec<(WatchId, RawFd)>) = {
            let inner = self.inner.borrow();
            let timeout = inner
                .timers
                .iter()
                .map(|(deadline, _)| {
                    deadline
                        .saturating_duration_since(Instant::now())
                        .as_millis()
                        .min(i32::MAX as u128) as i32
                })
                .min()
                .unwrap_or(-1);
            (timeout, inner.watches.clone())
        };

        let mut ready = Vec::new();
        if !fds.is_empty() {
            let mut pollfds: Vec<libc::pollfd> = fds
                .iter()
                .map(|(_, fd)| libc::pollfd {
                    fd: *fd,
                    events: libc::POLLIN,
                    revents: 0,
                })
                .collect();
            let rc = unsafe {
                libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, timeout_ms)
            };
            if rc > 0 {
                for (i, pfd) in pollfds.iter().enumerate() {
                    if pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
                        ready.push(Event::Input(fds[i].0));
                    }
                }
            }
        } else if timeout_ms >= 0 {
            std::thread::sleep(Duration::from_millis(timeout_ms as u64));
        }

        let now = Instant::now();
        let mut inner = self.inner.borrow_mut();
        let mut expired = Vec::new();
        inner.timers.retain(|(deadline, id)| {
            if *deadline <= now {
                expired.push(Event::Timer(*id));
                false
            } else {
                true
            }
        });
        ready.extend(expired);
        ready
    }
}

impl EventProvider for PollEvents {
    fn add_timer(&mut self, delay_ms: u64) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = TimerId(inner.next_id);
        let deadline = Instant::now() + Duration::from_millis(delay_ms);
        inner.timers.push((deadline, id));
        id
    }

    fn cancel_timer(&mut self, id: TimerId) {
        self.inner.borrow_mut().timers.retain(|(_, t)| *t != id);
    }

    fn add_input_watch(&mut self, fd: RawFd) -> WatchId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = WatchId(inner.next_id);
        inner.watches.push((id, fd));
        id
    }

    fn remove_input_watch(&mut self, id: WatchId) {
        self.inner.borrow_mut().watches.retain(|(w, _)| *w != id);
    }
}

#[derive(Debug, Default)]
struct ManualInner {
    next_id: u64,
    pending: Vec<(TimerId, u64)>,
    cancelled: HashSet<TimerId>,
    watches: Vec<(WatchId, RawFd)>,
}

/// Deterministic provider for tests: timers never fire on their own, the
/// test pops them and delivers expiry itself
#[derive(Debug, Clone, Default)]
pub struct ManualEvents {
    inner: Rc<RefCell<ManualInner>>,
}

impl ManualEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently pending (not fired, not cancelled) timers
    pub fn pending_timers(&self) -> Vec<(TimerId, u64)> {
        self.inner.borrow().pending.clone()
    }

    /// Remove and return the earliest-registered pending timer
    pub fn pop_timer(&self) -> Option<TimerId> {
        let mut inner = self.inner.borrow_mut();
        if inner.pending.is_empty() {
            None
        } else {
            Some(inner.pending.remove(0).0)
        }
    }

    /// Whether a timer was explicitly cancelled
    pub fn was_cancelled(&self, id: TimerId) -> bool {
        self.inner.borrow().cancelled.contains(&id)
    }

    /// Currently registered input watches
    pub fn watches(&self) -> Vec<(WatchId, RawFd)> {
        self.inner.borrow().watches.clone()
    }
}

impl EventProvider for ManualEvents {
    fn add_timer(&mut self, delay_ms: u64) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = TimerId(inner.next_id);
        inner.pending.push((id, delay_ms));
        id
    }

    fn cancel_timer(&mut self, id: TimerId) {
        let mut inner = self.inner.borrow_mut();
        inner.pending.retain(|(t, _)| *t != id);
        inner.cancelled.insert(id);
    }

    fn add_input_watch(&mut self, fd: RawFd) -> WatchId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = WatchId(inner.next_id);
        inner.watches.push((id, fd));
        id
    }

    fn remove_input_watch(&mut self, id: WatchId) {
        self.inner.borrow_mut().watches.retain(|(w, _)| *w != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_timer_lifecycle() {
        let mut ev = ManualEvents::new();
        let t1 = ev.add_timer(350);
        let t2 = ev.add_timer(5000);
        assert_eq!(ev.pending_timers().len(), 2);

        ev.cancel_timer(t1);
        assert!(ev.was_cancelled(t1));
        assert_eq!(ev.pop_timer(), Some(t2));
        assert_eq!(ev.pop_timer(), None);
    }

    #[test]
    fn test_manual_watch_lifecycle() {
        let mut ev = ManualEvents::new();
        let w = ev.add_input_watch(0);
        assert_eq!(ev.watches().len(), 1);
        ev.remove_input_watch(w);
        assert!(ev.watches().is_empty());
    }

    #[test]
    fn test_poll_timer_expires() {
        let mut ev = PollEvents::new();
        let t = ev.add_timer(1);
        let events = ev.poll();
        assert!(events.contains(&Event::Timer(t)));
        assert!(ev.is_idle());
    }

    #[test]
    fn test_poll_cancelled_timer_never_fires() {
        let mut ev = PollEvents::new();
        let t = ev.add_timer(1);
        ev.cancel_timer(t);
        assert!(ev.is_idle());
    }
}
