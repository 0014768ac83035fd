//! Script and macro engine
//!
//! Concurrently-nested executors (strings, macros, commands, keymap
//! actions, idle commands, child processes, and the stdin/stdout peer) live
//! on one stack; the top is the innermost, currently-executing node. The
//! engine is a pure resume loop: `sms_continue` inspects the top node's
//! state, returns if it cannot proceed, and otherwise dispatches to the
//! runner for the node's kind. All waiting is a state value plus a timer or
//! watch registration; nothing blocks.

use std::io::{Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::process::{Child, Command, Stdio};
use std::time::Instant;

use crate::actions::{self, Cause};
use crate::error::ActionError;
use crate::events::{TimerId, WatchId};
use crate::session::{Session, TimerPurpose};
use crate::status::{format_status, format_timing};

pub type NodeId = u64;

/// Default Expect timeout when the caller gives none
const EXPECT_DEFAULT_MS: u64 = 30_000;

/// What kind of executor a stack node is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Buffered text fed through the input emulator
    String,
    /// Action-call statements executed one at a time
    Macro,
    /// A one-shot command sequence (e.g. from the command line)
    Command,
    /// An action sequence bound to a key
    KeymapAction,
    /// A command scheduled to run while the host is idle
    IdleCommand,
    /// A spawned child process speaking the line protocol
    ChildScript,
    /// The stdin/stdout peer speaking the line protocol
    PeerScript,
}

impl ScriptKind {
    fn is_macro_like(self) -> bool {
        matches!(
            self,
            ScriptKind::Macro
                | ScriptKind::Command
                | ScriptKind::KeymapAction
                | ScriptKind::IdleCommand
        )
    }

    fn is_process(self) -> bool {
        matches!(self, ScriptKind::ChildScript | ScriptKind::PeerScript)
    }
}

/// Execution state of a stack node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    /// Between commands, waiting for input text
    Idle,
    /// Input buffered but no complete command yet
    Incomplete,
    /// Able to run now
    Running,
    /// Waiting for the keyboard to unlock
    KbWait,
    /// Waiting for a connection to complete
    ConnectWait,
    /// Waiting for a file transfer to finish
    FtWait,
    /// Explicitly paused until ContinueScript
    Paused,
    /// Waiting for NVT (ANSI) mode
    AnsiWait,
    /// Waiting for 3270 mode
    Wait3270,
    /// Waiting for host output
    OutputWait,
    /// Waiting for host output to snapshot
    SnapOutputWait,
    /// Waiting for the connection to drop
    DisconnectWait,
    /// Waiting for a timer alone
    TimeWait,
    /// Waiting for an Expect pattern match
    Expecting,
    /// Finished; pop at the next resume
    Closing,
}

impl ScriptState {
    fn is_waiting(self) -> bool {
        !matches!(
            self,
            ScriptState::Idle | ScriptState::Incomplete | ScriptState::Running | ScriptState::Closing
        )
    }
}

/// Where a process node's input comes from
pub enum ScriptReader {
    ChildStdout(std::process::ChildStdout),
    Stdin,
}

impl ScriptReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            ScriptReader::ChildStdout(r) => r.read(buf),
            ScriptReader::Stdin => std::io::stdin().read(buf),
        }
    }
}

/// One stack node
pub struct ScriptNode {
    pub id: NodeId,
    pub kind: ScriptKind,
    pub state: ScriptState,
    /// Success of the current command; becomes the propagated flag on pop
    pub success: bool,
    /// Inherited by children; a failed login forces a disconnect and a
    /// disconnect pops login nodes
    pub is_login: bool,
    buf: String,
    dptr: usize,
    output: Option<Box<dyn Write>>,
    child: Option<Child>,
    reader: Option<ScriptReader>,
    reader_fd: Option<RawFd>,
    watch: Option<WatchId>,
    wait_timer: Option<TimerId>,
    expect_pattern: Option<Vec<u8>>,
    command_pending: bool,
    start: Option<Instant>,
    idle_cancelled: bool,
}

impl ScriptNode {
    fn new(id: NodeId, kind: ScriptKind, buf: String, is_login: bool) -> Self {
        Self {
            id,
            kind,
            state: ScriptState::Running,
            success: true,
            is_login,
            buf,
            dptr: 0,
            output: None,
            child: None,
            reader: None,
            reader_fd: None,
            watch: None,
            wait_timer: None,
            expect_pattern: None,
            command_pending: false,
            start: None,
            idle_cancelled: false,
        }
    }
}

/// The stack itself, plus the resume-loop reentrancy guard
pub struct ScriptStack {
    nodes: Vec<ScriptNode>,
    next_id: NodeId,
    /// Guard: `sms_continue` must not re-enter from a callback its own
    /// actions trigger
    continuing: bool,
}

impl ScriptStack {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            next_id: 0,
            continuing: false,
        }
    }

    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn top(&self) -> Option<&ScriptNode> {
        self.nodes.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut ScriptNode> {
        self.nodes.last_mut()
    }

    pub fn find(&self, id: NodeId) -> Option<&ScriptNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut ScriptNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn alloc_id(&mut self) -> NodeId {
        self.next_id += 1;
        self.next_id
    }
}

impl Default for ScriptStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the backslash escapes accepted in Expect patterns
fn unescape_pattern(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('\\') => out.push(b'\\'),
            Some('x') => {
                let mut hex = String::new();
                while hex.len() < 2 {
                    match chars.peek() {
                        Some(h) if h.is_ascii_hexdigit() => {
                            hex.push(*h);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                if let Ok(b) = u8::from_str_radix(&hex, 16) {
                    out.push(b);
                }
            }
            Some(other) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => out.push(b'\\'),
        }
    }
    out
}

impl Session {
    /// Push a string node (the String action, keymap strings)
    pub fn push_string_node(&mut self, text: &str) -> NodeId {
        self.push_plain(ScriptKind::String, text)
    }

    /// Push a macro node
    pub fn push_macro_node(&mut self, text: &str) -> NodeId {
        self.push_plain(ScriptKind::Macro, text)
    }

    /// Push a one-shot command node
    pub fn push_command_node(&mut self, text: &str) -> NodeId {
        self.push_plain(ScriptKind::Command, text)
    }

    /// Push a keymap-action node
    pub fn push_keymap_node(&mut self, text: &str) -> NodeId {
        self.push_plain(ScriptKind::KeymapAction, text)
    }

    /// Push an idle-command node
    pub fn push_idle_node(&mut self, text: &str) -> NodeId {
        self.push_plain(ScriptKind::IdleCommand, text)
    }

    /// Push the login macro configured for this host
    pub fn push_login_macro(&mut self, text: &str) -> NodeId {
        let id = self.push_plain(ScriptKind::Macro, text);
        if let Some(node) = self.scripts.find_mut(id) {
            node.is_login = true;
        }
        id
    }

    fn push_plain(&mut self, kind: ScriptKind, text: &str) -> NodeId {
        let is_login = self.scripts.top().map(|t| t.is_login).unwrap_or(false);
        let id = self.scripts.alloc_id();
        log::debug!("sms: push {kind:?} #{id}");
        self.suspend_top_watch();
        self.scripts
            .nodes
            .push(ScriptNode::new(id, kind, text.to_string(), is_login));
        id
    }

    /// Push the stdin/stdout peer node
    pub fn push_peer(
        &mut self,
        output: Box<dyn Write>,
        reader: Option<(RawFd, ScriptReader)>,
    ) -> NodeId {
        let id = self.scripts.alloc_id();
        log::debug!("sms: push peer #{id}");
        self.suspend_top_watch();
        let mut node = ScriptNode::new(id, ScriptKind::PeerScript, String::new(), false);
        node.state = ScriptState::Idle;
        node.output = Some(output);
        if let Some((fd, r)) = reader {
            node.reader = Some(r);
            node.reader_fd = Some(fd);
            node.watch = Some(self.events.add_input_watch(fd));
        }
        self.scripts.nodes.push(node);
        id
    }

    /// Spawn a child process and push its script node. The child writes
    /// commands on its stdout and reads replies on its stdin.
    pub fn sms_push_child(&mut self, cmd: &str, args: &[&str]) -> Result<(), ActionError> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| ActionError::Io {
                action: "Script",
                source: e,
            })?;
        let stdin = child.stdin.take().ok_or_else(|| ActionError::Failed {
            action: "Script",
            reason: "no pipe to child".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ActionError::Failed {
            action: "Script",
            reason: "no pipe from child".to_string(),
        })?;
        let fd = stdout.as_raw_fd();

        let is_login = self.scripts.top().map(|t| t.is_login).unwrap_or(false);
        let id = self.scripts.alloc_id();
        log::debug!("sms: push child #{id} ({cmd})");
        self.suspend_top_watch();
        let mut node = ScriptNode::new(id, ScriptKind::ChildScript, String::new(), is_login);
        node.state = ScriptState::Idle;
        node.output = Some(Box::new(stdin));
        node.reader = Some(ScriptReader::ChildStdout(stdout));
        node.reader_fd = Some(fd);
        node.watch = Some(self.events.add_input_watch(fd));
        node.child = Some(child);
        self.scripts.nodes.push(node);
        Ok(())
    }

    /// A pushed node preempts the previous receiver's input subscription
    fn suspend_top_watch(&mut self) {
        if let Some(top) = self.scripts.top_mut() {
            if let Some(watch) = top.watch.take() {
                self.events.remove_input_watch(watch);
            }
        }
    }

    /// Whether the peer node is still on the stack
    pub fn has_peer(&self) -> bool {
        self.scripts
            .nodes
            .iter()
            .any(|n| n.kind == ScriptKind::PeerScript)
    }

    /// Append raw input text to a process node and resume the engine
    pub fn sms_feed(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.scripts.find_mut(id) {
            node.buf.push_str(text);
            if matches!(node.state, ScriptState::Idle | ScriptState::Incomplete) {
                node.state = ScriptState::Running;
            }
        }
        self.sms_continue();
    }

    /// A watched descriptor became readable: pull input from it
    pub fn on_input_ready(&mut self, watch: WatchId) {
        let idx = match self
            .scripts
            .nodes
            .iter()
            .position(|n| n.watch == Some(watch))
        {
            Some(i) => i,
            None => return,
        };
        let id = self.scripts.nodes[idx].id;
        let mut reader = match self.scripts.nodes[idx].reader.take() {
            Some(r) => r,
            None => return,
        };
        let mut buf = [0u8; 4096];
        let result = reader.read(&mut buf);
        self.scripts.nodes[idx].reader = Some(reader);
        match result {
            Ok(0) => {
                log::debug!("sms: #{id} end of input");
                self.scripts.nodes[idx].state = ScriptState::Closing;
                self.sms_continue();
            }
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                self.sms_feed(id, &text);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => {
                log::warn!("sms: #{id} read error: {e}");
                self.scripts.nodes[idx].state = ScriptState::Closing;
                self.sms_continue();
            }
        }
    }

    /// The resume loop. Reentrant calls (from actions the loop itself
    /// dispatches) return immediately; the outer invocation picks up any
    /// state they changed.
    pub fn sms_continue(&mut self) {
        if self.scripts.continuing {
            return;
        }
        self.scripts.continuing = true;
        loop {
            let (id, kind, state) = match self.scripts.top() {
                Some(top) => (top.id, top.kind, top.state),
                None => break,
            };
            let proceed = match state {
                ScriptState::Idle | ScriptState::Incomplete | ScriptState::Paused => false,
                ScriptState::Running => true,
                // A string node types through the full lock mask; other
                // executors wait out the unlock-relevant bits.
                ScriptState::KbWait => {
                    if kind == ScriptKind::String {
                        !self.keyboard.locked()
                    } else {
                        !self.keyboard.kbwait_locked()
                    }
                }
                ScriptState::ConnectWait => {
                    self.connection.in_3270()
                        || self.connection.in_nvt()
                        || self.connection.in_sscp()
                }
                ScriptState::FtWait => !self.ft_active,
                ScriptState::AnsiWait => self.connection.in_nvt(),
                ScriptState::Wait3270 => self.connection.in_3270(),
                ScriptState::DisconnectWait => !self.connection.connected(),
                ScriptState::OutputWait
                | ScriptState::SnapOutputWait
                | ScriptState::TimeWait
                | ScriptState::Expecting => false,
                ScriptState::Closing => {
                    self.sms_pop();
                    continue;
                }
            };
            if !proceed {
                break;
            }
            self.sms_wait_satisfied(id);
            let progressed = if kind == ScriptKind::String {
                self.run_string()
            } else if kind.is_macro_like() {
                self.run_macro()
            } else {
                self.run_script()
            };
            if !progressed {
                break;
            }
        }
        self.scripts.continuing = false;
        // Anything a pure macro produced with no script to report to goes
        // to the console.
        if self.scripts.is_empty() && !self.pending_data.is_empty() {
            let data = std::mem::take(&mut self.pending_data);
            for line in data {
                self.console.push(line);
            }
        }
    }

    /// A wait completed normally: cancel its timer and mark runnable
    fn sms_wait_satisfied(&mut self, id: NodeId) {
        let timer = match self.scripts.find_mut(id) {
            Some(node) => {
                node.state = ScriptState::Running;
                node.expect_pattern = None;
                node.wait_timer.take()
            }
            None => None,
        };
        if let Some(timer) = timer {
            self.cancel_timer(timer);
        }
    }

    /// Mark the current command failed and flag every idle-command node so
    /// its scheduled host-idle command is suppressed
    pub(crate) fn sms_fail_current(&mut self, id: NodeId) {
        if let Some(node) = self.scripts.find_mut(id) {
            node.success = false;
        }
        for node in &mut self.scripts.nodes {
            if node.kind == ScriptKind::IdleCommand {
                node.idle_cancelled = true;
            }
        }
    }

    /// Pop the top node: cancel its resources, propagate failure one level,
    /// cascade a keyboard wait, and restore the new top's input watch
    pub(crate) fn sms_pop(&mut self) {
        let mut node = match self.scripts.nodes.pop() {
            Some(n) => n,
            None => return,
        };
        log::debug!("sms: pop {:?} #{}", node.kind, node.id);
        if let Some(timer) = node.wait_timer.take() {
            self.cancel_timer(timer);
        }
        if let Some(watch) = node.watch.take() {
            self.events.remove_input_watch(watch);
        }
        if let Some(child) = node.child.as_mut() {
            match child.try_wait() {
                Ok(Some(status)) => log::debug!("sms: child exited: {status}"),
                Ok(None) => log::debug!("sms: child still running after pop"),
                Err(e) => log::warn!("sms: child wait failed: {e}"),
            }
        }
        if node.kind == ScriptKind::IdleCommand && node.idle_cancelled {
            log::warn!("idle command cancelled after an error elsewhere in the session");
        }
        if !node.success {
            if let Some(top) = self.scripts.top_mut() {
                top.success = false;
            }
        }
        if let Some(top) = self.scripts.top_mut() {
            // The child's actions may have left the keyboard locked; the
            // parent implicitly waits for the unlock before resuming.
            if self.keyboard.kbwait_locked() && top.state == ScriptState::Running {
                top.state = ScriptState::KbWait;
            }
            if top.kind.is_process()
                && top.state == ScriptState::Idle
                && top.watch.is_none()
            {
                if let Some(fd) = top.reader_fd {
                    top.watch = Some(self.events.add_input_watch(fd));
                }
            }
        }
    }

    /// Feed a string node's remaining text through the input emulator
    fn run_string(&mut self) -> bool {
        let (id, text) = match self.scripts.top() {
            Some(top) => (top.id, top.buf[top.dptr..].to_string()),
            None => return true,
        };
        if text.is_empty() {
            self.sms_pop();
            return true;
        }
        if self.keyboard.locked() {
            if let Some(top) = self.scripts.top_mut() {
                top.state = ScriptState::KbWait;
            }
            return true;
        }
        match self.emulate_input(&text, false) {
            Ok(0) => {
                self.sms_pop();
            }
            Ok(left) => {
                // Locked mid-stream: keep the unconsumed tail and wait.
                let consumed_chars = text.chars().count() - left;
                let offset = text
                    .char_indices()
                    .nth(consumed_chars)
                    .map(|(i, _)| i)
                    .unwrap_or(text.len());
                if let Some(top) = self.scripts.top_mut() {
                    top.dptr += offset;
                    top.state = ScriptState::KbWait;
                }
            }
            Err(e) => {
                log::warn!("sms: string error: {e}");
                self.pending_data.push(e.to_string());
                self.sms_fail_current(id);
                self.sms_pop();
            }
        }
        true
    }

    /// Execute one action-call statement of a macro-like node
    fn run_macro(&mut self) -> bool {
        let (id, rest) = match self.scripts.top() {
            Some(top) => (top.id, top.buf[top.dptr..].to_string()),
            None => return true,
        };
        if self.keyboard.script_locked() {
            if let Some(top) = self.scripts.top_mut() {
                top.state = ScriptState::KbWait;
            }
            return true;
        }
        match actions::parse_action_call(&rest) {
            Ok(None) => {
                self.sms_pop();
            }
            Ok(Some((name, args, used))) => {
                if let Some(top) = self.scripts.top_mut() {
                    top.dptr += used;
                    // Each statement starts fresh; a child's propagated
                    // failure is visible between statements but does not
                    // stick to this node's own outcome.
                    top.success = true;
                }
                let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
                if let Err(e) = actions::run_action(self, &name, &arg_refs, Cause::Script) {
                    log::warn!("sms: macro statement failed: {e}");
                    self.pending_data.push(e.to_string());
                    self.sms_fail_current(id);
                    if self.scripts.top().map(|t| t.id) == Some(id) {
                        self.sms_pop();
                    }
                }
            }
            Err(e) => {
                log::warn!("sms: macro syntax error: {e}");
                self.pending_data.push(e.to_string());
                self.sms_fail_current(id);
                self.sms_pop();
            }
        }
        true
    }

    /// Pull one newline-terminated command from a process node, execute it,
    /// and emit the structured reply once it completes
    fn run_script(&mut self) -> bool {
        loop {
            let id = match self.scripts.top() {
                Some(top) => top.id,
                None => return true,
            };
            let owed = {
                let top = self.scripts.top().unwrap();
                top.command_pending && top.state == ScriptState::Running
            };
            if owed {
                self.script_reply(id);
            }
            let line = {
                let top = self.scripts.top_mut().unwrap();
                match top.buf[top.dptr..].find('\n') {
                    Some(rel) => {
                        let line = top.buf[top.dptr..top.dptr + rel]
                            .trim_end_matches('\r')
                            .to_string();
                        top.dptr += rel + 1;
                        Some(line)
                    }
                    None => {
                        top.buf.drain(..top.dptr);
                        top.dptr = 0;
                        top.state = if top.buf.is_empty() {
                            ScriptState::Idle
                        } else {
                            ScriptState::Incomplete
                        };
                        None
                    }
                }
            };
            let line = match line {
                Some(l) => l,
                None => return true,
            };
            {
                let top = self.scripts.top_mut().unwrap();
                top.state = ScriptState::Running;
                top.success = true;
                top.start = Some(Instant::now());
                top.command_pending = true;
            }
            match actions::parse_action_call(&line) {
                Ok(None) => {}
                Ok(Some((name, args, _))) => {
                    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
                    if let Err(e) = actions::run_action(self, &name, &arg_refs, Cause::Script) {
                        self.pending_data.push(e.to_string());
                        self.sms_fail_current(id);
                    }
                }
                Err(e) => {
                    self.pending_data.push(e.to_string());
                    self.sms_fail_current(id);
                }
            }
            if self.scripts.top().map(|t| t.id) != Some(id) {
                // The command pushed a child; the reply waits for it.
                return true;
            }
            match self.scripts.top().unwrap().state {
                ScriptState::Running => {
                    if self.keyboard.script_locked() {
                        // The command locked the keyboard (an AID, say);
                        // the reply is owed once the host unlocks it.
                        self.scripts.top_mut().unwrap().state = ScriptState::KbWait;
                        return true;
                    }
                    self.script_reply(id);
                }
                ScriptState::Closing => {
                    self.script_reply(id);
                    return true;
                }
                _ => return true, // waiting: reply deferred
            }
        }
    }

    /// Emit `data:` lines, the status line with timing, and `ok`/`error`
    fn script_reply(&mut self, id: NodeId) {
        let data = std::mem::take(&mut self.pending_data);
        let status = format_status(self);
        let show_timing = self.profile.show_timing;
        let node = match self.scripts.find_mut(id) {
            Some(n) => n,
            None => return,
        };
        let timing = if show_timing {
            node.start.map(|s| s.elapsed())
        } else {
            None
        };
        let verdict = if node.success { "ok" } else { "error" };
        node.command_pending = false;
        node.start = None;

        let mut reply = String::new();
        for line in &data {
            reply.push_str("data: ");
            reply.push_str(line);
            reply.push('\n');
        }
        reply.push_str(&status);
        reply.push(' ');
        reply.push_str(&format_timing(timing));
        reply.push('\n');
        reply.push_str(verdict);
        reply.push('\n');

        match node.output.as_mut() {
            Some(out) => {
                if let Err(e) = out.write_all(reply.as_bytes()).and_then(|_| out.flush()) {
                    log::warn!("sms: reply write failed: {e}");
                }
            }
            None => {
                for line in reply.lines() {
                    self.console.push(line.to_string());
                }
            }
        }
    }

    /// The Wait action: `Wait([timeout,] condition)`
    pub(crate) fn sms_wait(&mut self, args: &[&str]) -> Result<(), ActionError> {
        let id = match self.scripts.top() {
            Some(top) => top.id,
            None => {
                return Err(ActionError::Failed {
                    action: "Wait",
                    reason: "no script or macro to wait in".to_string(),
                })
            }
        };
        let (timeout_ms, condition) = match args.len() {
            0 => (None, "inputfield".to_string()),
            1 => match args[0].parse::<f64>() {
                Ok(secs) => (Some((secs * 1000.0) as u64), "inputfield".to_string()),
                Err(_) => (None, args[0].to_ascii_lowercase()),
            },
            2 => {
                let secs: f64 = args[0].parse().map_err(|_| ActionError::BadArgument {
                    action: "Wait",
                    argument: args[0].to_string(),
                    reason: "not a number".to_string(),
                })?;
                (Some((secs * 1000.0) as u64), args[1].to_ascii_lowercase())
            }
            _ => {
                return Err(ActionError::ArgCount {
                    action: "Wait",
                    expected: "0, 1, or 2".to_string(),
                    got: args.len(),
                })
            }
        };

        let state = match condition.as_str() {
            "output" => {
                if !self.output_wait_needed {
                    return Ok(());
                }
                ScriptState::OutputWait
            }
            "3270" | "3270mode" => {
                if self.connection.in_3270() {
                    return Ok(());
                }
                ScriptState::Wait3270
            }
            "nvtmode" | "ansi" | "nvt" => {
                if self.connection.in_nvt() {
                    return Ok(());
                }
                ScriptState::AnsiWait
            }
            "disconnect" => {
                if !self.connection.connected() {
                    return Ok(());
                }
                ScriptState::DisconnectWait
            }
            "unlock" => {
                if !self.keyboard.kbwait_locked() {
                    return Ok(());
                }
                ScriptState::KbWait
            }
            "inputfield" => {
                if !self.connection.connected() {
                    ScriptState::ConnectWait
                } else if self.keyboard.kbwait_locked() {
                    ScriptState::KbWait
                } else {
                    return Ok(());
                }
            }
            other => {
                return Err(ActionError::BadArgument {
                    action: "Wait",
                    argument: other.to_string(),
                    reason: "unknown wait condition".to_string(),
                })
            }
        };

        if let Some(node) = self.scripts.find_mut(id) {
            node.state = state;
        }
        if let Some(ms) = timeout_ms {
            let timer = self.register_timer(ms, TimerPurpose::ScriptWait(id));
            if let Some(node) = self.scripts.find_mut(id) {
                node.wait_timer = Some(timer);
            }
        }
        Ok(())
    }

    /// The Expect action: match a pattern in recently received NVT output
    pub(crate) fn sms_expect(&mut self, args: &[&str]) -> Result<(), ActionError> {
        let id = match self.scripts.top() {
            Some(top) => top.id,
            None => {
                return Err(ActionError::Failed {
                    action: "Expect",
                    reason: "no script or macro to wait in".to_string(),
                })
            }
        };
        if args.is_empty() || args.len() > 2 {
            return Err(ActionError::ArgCount {
                action: "Expect",
                expected: "1 or 2".to_string(),
                got: args.len(),
            });
        }
        if !self.connection.in_nvt() {
            return Err(ActionError::Failed {
                action: "Expect",
                reason: "only valid in NVT mode".to_string(),
            });
        }
        let pattern = unescape_pattern(args[0]);
        let timeout_ms = match args.get(1) {
            Some(t) => {
                let secs: f64 = t.parse().map_err(|_| ActionError::BadArgument {
                    action: "Expect",
                    argument: t.to_string(),
                    reason: "not a number".to_string(),
                })?;
                (secs * 1000.0) as u64
            }
            None => EXPECT_DEFAULT_MS,
        };
        if self.connection.nvt_contains(&pattern) {
            self.connection.clear_nvt_saved();
            return Ok(());
        }
        let timer = self.register_timer(timeout_ms, TimerPurpose::ExpectTimeout(id));
        if let Some(node) = self.scripts.find_mut(id) {
            node.state = ScriptState::Expecting;
            node.expect_pattern = Some(pattern);
            node.wait_timer = Some(timer);
        }
        Ok(())
    }

    /// Bytes received from the host in NVT mode: store them for Expect and
    /// check the pending pattern incrementally
    pub fn nvt_input(&mut self, data: &[u8]) {
        for &b in data {
            self.connection.save_nvt_byte(b);
        }
        let matched = match self.scripts.top() {
            Some(top) if top.state == ScriptState::Expecting => top
                .expect_pattern
                .as_ref()
                .map(|p| self.connection.nvt_contains(p))
                .unwrap_or(false),
            _ => false,
        };
        if matched {
            self.connection.clear_nvt_saved();
            if let Some(top) = self.scripts.top_mut() {
                top.state = ScriptState::Running;
                top.expect_pattern = None;
            }
        }
        self.notify_host_output();
    }

    /// A Wait timer expired before its condition was met
    pub(crate) fn sms_wait_timeout(&mut self, id: NodeId) {
        let (kind, is_login) = match self.scripts.find_mut(id) {
            Some(node) => {
                node.wait_timer = None;
                node.expect_pattern = None;
                node.state = ScriptState::Running;
                (node.kind, node.is_login)
            }
            None => return,
        };
        log::warn!("sms: #{id} wait timed out");
        self.sms_fail_current(id);
        if is_login {
            // A failed login is not recoverable; drop the connection.
            self.disconnect();
            self.sms_continue();
            return;
        }
        if kind.is_macro_like() || kind == ScriptKind::String {
            if self.scripts.top().map(|t| t.id) == Some(id) {
                self.sms_pop();
            }
        }
        self.sms_continue();
    }

    /// An Expect timer expired with no match
    pub(crate) fn sms_expect_timeout(&mut self, id: NodeId) {
        self.sms_wait_timeout(id);
    }

    /// Abort: unwind the whole stack, signaling child processes first
    pub fn sms_abort(&mut self) {
        log::info!("sms: abort, unwinding {} node(s)", self.scripts.depth());
        while let Some(top) = self.scripts.nodes.last_mut() {
            if let Some(child) = top.child.as_mut() {
                let pid = child.id() as libc::pid_t;
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }
            self.sms_pop();
        }
    }

    /// CloseScript([status]): finish the current script node
    pub(crate) fn sms_close_script(&mut self, args: &[&str]) -> Result<(), ActionError> {
        if args.len() > 1 {
            return Err(ActionError::ArgCount {
                action: "CloseScript",
                expected: "0 or 1".to_string(),
                got: args.len(),
            });
        }
        let failed = match args.first() {
            Some(code) => code.parse::<i32>().unwrap_or(0) != 0,
            None => false,
        };
        let node = self
            .scripts
            .nodes
            .iter_mut()
            .rev()
            .find(|n| n.kind.is_process())
            .ok_or_else(|| ActionError::Failed {
                action: "CloseScript",
                reason: "no script to close".to_string(),
            })?;
        if failed {
            node.success = false;
        }
        node.state = ScriptState::Closing;
        Ok(())
    }

    /// PauseScript: stop replying until ContinueScript
    pub(crate) fn sms_pause_script(&mut self) -> Result<(), ActionError> {
        let node = self
            .scripts
            .nodes
            .iter_mut()
            .rev()
            .find(|n| n.kind.is_process())
            .ok_or_else(|| ActionError::Failed {
                action: "PauseScript",
                reason: "no script to pause".to_string(),
            })?;
        node.state = ScriptState::Paused;
        Ok(())
    }

    /// ContinueScript([text]): resume a paused script, optionally handing
    /// it a data line
    pub(crate) fn sms_continue_script(&mut self, args: &[&str]) -> Result<(), ActionError> {
        if args.len() > 1 {
            return Err(ActionError::ArgCount {
                action: "ContinueScript",
                expected: "0 or 1".to_string(),
                got: args.len(),
            });
        }
        let id = self
            .scripts
            .nodes
            .iter()
            .rev()
            .find(|n| n.state == ScriptState::Paused)
            .map(|n| n.id)
            .ok_or_else(|| ActionError::Failed {
                action: "ContinueScript",
                reason: "no paused script".to_string(),
            })?;
        if let Some(text) = args.first() {
            self.pending_data.push(text.to_string());
        }
        if let Some(node) = self.scripts.find_mut(id) {
            node.state = ScriptState::Running;
        }
        Ok(())
    }

    /// Execute(cmd): run a shell command, its stdout becoming data lines
    pub(crate) fn sms_execute(&mut self, cmd: &str) -> Result<(), ActionError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .output()
            .map_err(|e| ActionError::Io {
                action: "Execute",
                source: e,
            })?;
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            self.action_output(line);
        }
        if output.status.success() {
            Ok(())
        } else {
            Err(ActionError::Failed {
                action: "Execute",
                reason: format!("command exited with {}", output.status),
            })
        }
    }

    /// Snap: save the screen image, read it back, or wait for output first
    pub(crate) fn sms_snap(&mut self, args: &[&str]) -> Result<(), ActionError> {
        match args.first().map(|a| a.to_ascii_lowercase()).as_deref() {
            None | Some("save") => {
                self.snapshot = Some(self.screen.clone());
                Ok(())
            }
            Some("ascii") => {
                let rest: Vec<&str> = args[1..].to_vec();
                actions::emit_screen_text(self, &rest, "Snap", false, true)
            }
            Some("ebcdic") => {
                let rest: Vec<&str> = args[1..].to_vec();
                actions::emit_screen_text(self, &rest, "Snap", true, true)
            }
            Some("wait") => {
                let id = match self.scripts.top() {
                    Some(top) => top.id,
                    None => {
                        return Err(ActionError::Failed {
                            action: "Snap",
                            reason: "no script or macro to wait in".to_string(),
                        })
                    }
                };
                if args.len() != 2 || !args[1].eq_ignore_ascii_case("output") {
                    return Err(ActionError::BadArgument {
                        action: "Snap",
                        argument: args.get(1).unwrap_or(&"").to_string(),
                        reason: "expected Snap(Wait,Output)".to_string(),
                    });
                }
                if !self.output_wait_needed {
                    self.snapshot = Some(self.screen.clone());
                    return Ok(());
                }
                if let Some(node) = self.scripts.find_mut(id) {
                    node.state = ScriptState::SnapOutputWait;
                }
                Ok(())
            }
            Some(other) => Err(ActionError::BadArgument {
                action: "Snap",
                argument: other.to_string(),
                reason: "unknown Snap keyword".to_string(),
            }),
        }
    }

    /// Host output arrived (3270 write or NVT data): release output waits
    /// and the await-first lock
    pub fn notify_host_output(&mut self) {
        self.output_wait_needed = false;
        if let Some(top) = self.scripts.top_mut() {
            match top.state {
                ScriptState::OutputWait => top.state = ScriptState::Running,
                ScriptState::SnapOutputWait => {
                    top.state = ScriptState::Running;
                    self.snapshot = Some(self.screen.clone());
                }
                _ => {}
            }
        }
        self.kybd_first_output();
        self.sms_continue();
    }

    /// A disconnect pops login nodes and releases disconnect waits
    pub(crate) fn sms_disconnect(&mut self) {
        while self
            .scripts
            .top()
            .map(|t| t.is_login)
            .unwrap_or(false)
        {
            self.sms_pop();
        }
    }
}
