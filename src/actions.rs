//! Action dispatch
//!
//! Every operation the emulator can perform is reachable through a named
//! action: keyboard keys, cursor movement, scripting verbs. Macros, scripts
//! and the typeahead queue all call through the same ordered table. Lookup
//! is case-insensitive with unambiguous-prefix matching: an exact match
//! wins, otherwise a unique prefix, otherwise the name is an error.

use crate::codes::AidKey;
use crate::error::ActionError;
use crate::keyboard::KeyResult;
use crate::session::Session;

/// Where an action invocation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// Direct operator input
    Interactive,
    /// Replay from the typeahead queue
    Typeahead,
    /// A script or macro node
    Script,
}

pub type ActionFn = fn(&mut Session, &[&str], Cause) -> Result<(), ActionError>;

/// One entry of the dispatch table
pub struct ActionDef {
    pub name: &'static str,
    pub func: ActionFn,
}

/// The ordered action table. Order matters only for documentation; lookup
/// is by name.
pub static ACTIONS: &[ActionDef] = &[
    ActionDef { name: "Abort", func: action_abort },
    ActionDef { name: "Ascii", func: action_ascii },
    ActionDef { name: "BackSpace", func: action_backspace },
    ActionDef { name: "BackTab", func: action_backtab },
    ActionDef { name: "Clear", func: action_clear },
    ActionDef { name: "CloseScript", func: action_close_script },
    ActionDef { name: "Compose", func: action_compose },
    ActionDef { name: "Connect", func: action_connect },
    ActionDef { name: "ContinueScript", func: action_continue_script },
    ActionDef { name: "Delete", func: action_delete },
    ActionDef { name: "Disconnect", func: action_disconnect },
    ActionDef { name: "Down", func: action_down },
    ActionDef { name: "Dup", func: action_dup },
    ActionDef { name: "Ebcdic", func: action_ebcdic },
    ActionDef { name: "Enter", func: action_enter },
    ActionDef { name: "Erase", func: action_erase },
    ActionDef { name: "EraseEOF", func: action_erase_eof },
    ActionDef { name: "EraseInput", func: action_erase_input },
    ActionDef { name: "Execute", func: action_execute },
    ActionDef { name: "Expect", func: action_expect },
    ActionDef { name: "FieldMark", func: action_fieldmark },
    ActionDef { name: "Home", func: action_home },
    ActionDef { name: "Insert", func: action_insert },
    ActionDef { name: "Key", func: action_key },
    ActionDef { name: "Left", func: action_left },
    ActionDef { name: "Macro", func: action_macro },
    ActionDef { name: "MoveCursor", func: action_move_cursor },
    ActionDef { name: "Newline", func: action_newline },
    ActionDef { name: "PA", func: action_pa },
    ActionDef { name: "PauseScript", func: action_pause_script },
    ActionDef { name: "PF", func: action_pf },
    ActionDef { name: "Query", func: action_query },
    ActionDef { name: "Reset", func: action_reset },
    ActionDef { name: "Right", func: action_right },
    ActionDef { name: "Script", func: action_script },
    ActionDef { name: "Snap", func: action_snap },
    ActionDef { name: "String", func: action_string },
    ActionDef { name: "Tab", func: action_tab },
    ActionDef { name: "ToggleInsert", func: action_toggle_insert },
    ActionDef { name: "Up", func: action_up },
    ActionDef { name: "Wait", func: action_wait },
];

/// Resolve an action name: exact case-insensitive match first, then a
/// unique prefix; anything else is an error
pub fn lookup(name: &str) -> Result<&'static ActionDef, ActionError> {
    let lower = name.to_ascii_lowercase();
    if let Some(def) = ACTIONS
        .iter()
        .find(|d| d.name.to_ascii_lowercase() == lower)
    {
        return Ok(def);
    }
    let matches: Vec<&ActionDef> = ACTIONS
        .iter()
        .filter(|d| d.name.to_ascii_lowercase().starts_with(&lower))
        .collect();
    match matches.len() {
        0 => Err(ActionError::Unknown {
            name: name.to_string(),
        }),
        1 => Ok(matches[0]),
        _ => Err(ActionError::Ambiguous {
            name: name.to_string(),
            candidates: matches.iter().map(|d| d.name.to_string()).collect(),
        }),
    }
}

/// Look up and run an action
pub fn run_action(
    session: &mut Session,
    name: &str,
    args: &[&str],
    cause: Cause,
) -> Result<(), ActionError> {
    let def = lookup(name)?;
    log::debug!("action {}({}) [{cause:?}]", def.name, args.join(", "));
    (def.func)(session, args, cause)
}

/// Parse one action call from the front of `input`.
///
/// Accepted syntax: `Name`, `Name(arg, arg, ...)`, or `Name arg arg ...`
/// (the bare form extends to the end of the line). Double-quoted arguments
/// support backslash escapes. Returns the name, the arguments, and the byte
/// offset just past the consumed text; `None` when only whitespace remains.
pub fn parse_action_call(
    input: &str,
) -> Result<Option<(String, Vec<String>, usize)>, ActionError> {
    let bytes = input.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() && (bytes[pos] as char).is_whitespace() {
        pos += 1;
    }
    if pos >= bytes.len() {
        return Ok(None);
    }

    let name_start = pos;
    while pos < bytes.len() {
        let c = bytes[pos] as char;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            pos += 1;
        } else {
            break;
        }
    }
    if pos == name_start {
        let found = input[pos..].chars().next().unwrap_or(' ');
        return Err(ActionError::Syntax {
            message: format!("expected action name at '{found}'"),
        });
    }
    let name = input[name_start..pos].to_string();

    // Skip spaces (not newlines) between the name and its arguments.
    while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
        pos += 1;
    }

    let mut args = Vec::new();
    if pos < bytes.len() && bytes[pos] == b'(' {
        pos += 1;
        loop {
            while pos < bytes.len() && (bytes[pos] as char).is_whitespace() {
                pos += 1;
            }
            if pos >= bytes.len() {
                return Err(ActionError::Syntax {
                    message: format!("missing ')' in call to {name}"),
                });
            }
            if bytes[pos] == b')' {
                pos += 1;
                break;
            }
            let (arg, next) = parse_argument(input, pos, &[b',', b')'])?;
            args.push(arg);
            pos = next;
            if pos < bytes.len() && bytes[pos] == b',' {
                pos += 1;
            }
        }
    } else {
        // Bare form: space-separated arguments to end of line.
        while pos < bytes.len() && bytes[pos] != b'\n' {
            if bytes[pos] == b' ' || bytes[pos] == b'\t' || bytes[pos] == b'\r' {
                pos += 1;
                continue;
            }
            let (arg, next) = parse_argument(input, pos, &[b' ', b'\t', b'\n', b'\r'])?;
            args.push(arg);
            pos = next;
        }
    }

    Ok(Some((name, args, pos)))
}

/// Parse one argument starting at `pos`: quoted with escapes, or bare up to
/// (not including) a terminator
fn parse_argument(
    input: &str,
    mut pos: usize,
    terminators: &[u8],
) -> Result<(String, usize), ActionError> {
    let bytes = input.as_bytes();
    let mut out = String::new();
    if bytes[pos] == b'"' {
        pos += 1;
        loop {
            if pos >= bytes.len() {
                return Err(ActionError::Syntax {
                    message: "unterminated quoted argument".to_string(),
                });
            }
            match bytes[pos] {
                b'"' => {
                    pos += 1;
                    break;
                }
                b'\\' if pos + 1 < bytes.len() => {
                    let esc = bytes[pos + 1] as char;
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        // Unknown escapes pass through for the input
                        // emulator to interpret.
                        _ => {
                            out.push('\\');
                            out.push(esc);
                        }
                    }
                    pos += 2;
                }
                _ => {
                    let ch = input[pos..].chars().next().unwrap_or(' ');
                    out.push(ch);
                    pos += ch.len_utf8();
                }
            }
        }
        Ok((out, pos))
    } else {
        let start = pos;
        while pos < bytes.len() && !terminators.contains(&bytes[pos]) {
            pos += 1;
        }
        Ok((input[start..pos].trim().to_string(), pos))
    }
}

fn arg_count(action: &'static str, args: &[&str], expected: &str, ok: bool) -> Result<(), ActionError> {
    if ok {
        Ok(())
    } else {
        Err(ActionError::ArgCount {
            action,
            expected: expected.to_string(),
            got: args.len(),
        })
    }
}

fn key_outcome(action: &'static str, result: KeyResult) -> Result<(), ActionError> {
    match result {
        KeyResult::Rejected(err) => Err(ActionError::Failed {
            action,
            reason: err.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Defer a locked-keyboard action to the typeahead queue. Returns true when
/// the caller should stop (the action was queued or dropped).
fn defer_if_locked(session: &mut Session, name: &str, args: &[&str]) -> bool {
    if session.keyboard.locked() {
        let _ = session.enq_ta(name, args);
        true
    } else {
        false
    }
}

fn action_enter(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Enter", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Enter", args) {
        return Ok(());
    }
    s.key_aid(AidKey::Enter);
    Ok(())
}

fn action_clear(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Clear", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Clear", args) {
        return Ok(());
    }
    s.key_aid(AidKey::Clear);
    Ok(())
}

fn action_pf(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("PF", args, "1", args.len() == 1)?;
    let n: usize = args[0].parse().map_err(|_| ActionError::BadArgument {
        action: "PF",
        argument: args[0].to_string(),
        reason: "not a number".to_string(),
    })?;
    if defer_if_locked(s, "PF", args) {
        return Ok(());
    }
    if s.key_pf(n) {
        Ok(())
    } else {
        Err(ActionError::Failed {
            action: "PF",
            reason: format!("no such key: PF{n}"),
        })
    }
}

fn action_pa(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("PA", args, "1", args.len() == 1)?;
    let n: usize = args[0].parse().map_err(|_| ActionError::BadArgument {
        action: "PA",
        argument: args[0].to_string(),
        reason: "not a number".to_string(),
    })?;
    if defer_if_locked(s, "PA", args) {
        return Ok(());
    }
    if s.key_pa(n) {
        Ok(())
    } else {
        Err(ActionError::Failed {
            action: "PA",
            reason: format!("no such key: PA{n}"),
        })
    }
}

fn action_reset(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Reset", args, "0", args.is_empty())?;
    s.kybd_reset(true);
    Ok(())
}

fn action_key(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Key", args, "1 or more", !args.is_empty())?;
    for &arg in args {
        if let Some(hex) = arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
            let cc = u8::from_str_radix(hex, 16).map_err(|_| ActionError::BadArgument {
                action: "Key",
                argument: arg.to_string(),
                reason: "bad hex code".to_string(),
            })?;
            if defer_if_locked(s, "Key", &[arg]) {
                continue;
            }
            key_outcome("Key", s.key_char(cc, false))?;
        } else {
            let mut chars = arg.chars();
            let ch = chars.next().ok_or_else(|| ActionError::BadArgument {
                action: "Key",
                argument: arg.to_string(),
                reason: "empty".to_string(),
            })?;
            if chars.next().is_some() {
                return Err(ActionError::BadArgument {
                    action: "Key",
                    argument: arg.to_string(),
                    reason: "expected a single character".to_string(),
                });
            }
            key_outcome("Key", s.key_typed(ch, false))?;
        }
    }
    Ok(())
}

fn action_string(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("String", args, "1 or more", !args.is_empty())?;
    let text = args.concat();
    s.push_string_node(&text);
    s.sms_continue();
    Ok(())
}

fn action_macro(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Macro", args, "1", args.len() == 1)?;
    s.push_macro_node(args[0]);
    s.sms_continue();
    Ok(())
}

fn action_tab(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Tab", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Tab", args) {
        return Ok(());
    }
    s.key_tab();
    Ok(())
}

fn action_backtab(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("BackTab", args, "0", args.is_empty())?;
    if defer_if_locked(s, "BackTab", args) {
        return Ok(());
    }
    s.key_backtab();
    Ok(())
}

fn action_home(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Home", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Home", args) {
        return Ok(());
    }
    s.key_home();
    Ok(())
}

fn action_newline(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Newline", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Newline", args) {
        return Ok(());
    }
    s.key_newline();
    Ok(())
}

fn action_left(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Left", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Left", args) {
        return Ok(());
    }
    s.key_left();
    Ok(())
}

fn action_right(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Right", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Right", args) {
        return Ok(());
    }
    s.key_right();
    Ok(())
}

fn action_up(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Up", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Up", args) {
        return Ok(());
    }
    s.key_up();
    Ok(())
}

fn action_down(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Down", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Down", args) {
        return Ok(());
    }
    s.key_down();
    Ok(())
}

fn action_move_cursor(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("MoveCursor", args, "2", args.len() == 2)?;
    let parse = |a: &str| -> Result<usize, ActionError> {
        a.parse().map_err(|_| ActionError::BadArgument {
            action: "MoveCursor",
            argument: a.to_string(),
            reason: "not a number".to_string(),
        })
    };
    let row = parse(args[0])?;
    let col = parse(args[1])?;
    if defer_if_locked(s, "MoveCursor", args) {
        return Ok(());
    }
    if s.key_move_cursor(row, col) {
        Ok(())
    } else {
        Err(ActionError::Failed {
            action: "MoveCursor",
            reason: format!("({row}, {col}) is off the screen"),
        })
    }
}

fn action_backspace(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("BackSpace", args, "0", args.is_empty())?;
    if defer_if_locked(s, "BackSpace", args) {
        return Ok(());
    }
    s.key_left();
    Ok(())
}

fn action_erase(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Erase", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Erase", args) {
        return Ok(());
    }
    key_outcome("Erase", s.key_erase())
}

fn action_delete(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Delete", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Delete", args) {
        return Ok(());
    }
    key_outcome("Delete", s.key_delete())
}

fn action_erase_eof(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("EraseEOF", args, "0", args.is_empty())?;
    if defer_if_locked(s, "EraseEOF", args) {
        return Ok(());
    }
    key_outcome("EraseEOF", s.key_erase_eof())
}

fn action_erase_input(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("EraseInput", args, "0", args.is_empty())?;
    if defer_if_locked(s, "EraseInput", args) {
        return Ok(());
    }
    s.key_erase_input();
    Ok(())
}

fn action_dup(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Dup", args, "0", args.is_empty())?;
    if defer_if_locked(s, "Dup", args) {
        return Ok(());
    }
    key_outcome("Dup", s.key_dup())
}

fn action_fieldmark(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("FieldMark", args, "0", args.is_empty())?;
    if defer_if_locked(s, "FieldMark", args) {
        return Ok(());
    }
    key_outcome("FieldMark", s.key_fieldmark())
}

fn action_insert(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Insert", args, "0", args.is_empty())?;
    s.keyboard.insert_mode = true;
    Ok(())
}

fn action_toggle_insert(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("ToggleInsert", args, "0", args.is_empty())?;
    s.keyboard.insert_mode = !s.keyboard.insert_mode;
    Ok(())
}

fn action_compose(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Compose", args, "0", args.is_empty())?;
    s.compose.trigger();
    Ok(())
}

fn action_connect(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Connect", args, "1", args.len() == 1)?;
    if s.connection.connected() {
        return Err(ActionError::Failed {
            action: "Connect",
            reason: "already connected".to_string(),
        });
    }
    s.connect(args[0]);
    Ok(())
}

fn action_disconnect(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Disconnect", args, "0", args.is_empty())?;
    s.disconnect();
    Ok(())
}

fn action_ascii(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    emit_screen_text(s, args, "Ascii", false, false)
}

fn action_ebcdic(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    emit_screen_text(s, args, "Ebcdic", true, false)
}

/// Shared body of Ascii/Ebcdic and their Snap(...) forms
pub(crate) fn emit_screen_text(
    s: &mut Session,
    args: &[&str],
    action: &'static str,
    hex: bool,
    from_snapshot: bool,
) -> Result<(), ActionError> {
    let screen = if from_snapshot {
        match s.snapshot.clone() {
            Some(snap) => snap,
            None => {
                return Err(ActionError::Failed {
                    action,
                    reason: "no saved screen image".to_string(),
                })
            }
        }
    } else {
        s.screen.clone()
    };
    let parse = |a: &str| -> Result<usize, ActionError> {
        a.parse().map_err(|_| ActionError::BadArgument {
            action,
            argument: a.to_string(),
            reason: "not a number".to_string(),
        })
    };
    let lines: Vec<String> = match args.len() {
        0 => (0..screen.rows())
            .map(|r| render_row(&screen, r, 0, screen.cols(), hex))
            .collect(),
        1 => {
            // Length from the cursor position.
            let len = parse(args[0])?;
            let (row, col) = screen.addr_to_rc(screen.cursor_addr());
            vec![render_linear(&screen, screen.rc_to_addr(row, col), len, hex)]
        }
        3 => {
            let (row, col, len) = (parse(args[0])?, parse(args[1])?, parse(args[2])?);
            vec![render_linear(&screen, screen.rc_to_addr(row, col), len, hex)]
        }
        4 => {
            let (row, col, nrows, ncols) =
                (parse(args[0])?, parse(args[1])?, parse(args[2])?, parse(args[3])?);
            (row..(row + nrows).min(screen.rows()))
                .map(|r| render_row(&screen, r, col, ncols, hex))
                .collect()
        }
        _ => {
            return Err(ActionError::ArgCount {
                action,
                expected: "0, 1, 3, or 4".to_string(),
                got: args.len(),
            })
        }
    };
    for line in lines {
        s.action_output(&line);
    }
    Ok(())
}

fn render_row(screen: &crate::screen::Screen, row: usize, col: usize, ncols: usize, hex: bool) -> String {
    if hex {
        let end = (col + ncols).min(screen.cols());
        (col..end)
            .map(|c| format!("{:02x}", screen.cell(screen.rc_to_addr(row, c)).cc))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        screen
            .region_text(row, col, 1, ncols)
            .pop()
            .unwrap_or_default()
    }
}

fn render_linear(screen: &crate::screen::Screen, addr: usize, len: usize, hex: bool) -> String {
    let mut parts = Vec::with_capacity(len);
    let mut a = addr;
    for _ in 0..len.min(screen.len()) {
        if hex {
            parts.push(format!("{:02x}", screen.cell(a).cc));
        } else {
            parts.push(
                crate::ebcdic::ebcdic_to_display(screen.cell(a).cc).to_string(),
            );
        }
        a = screen.inc_addr(a);
    }
    parts.join(if hex { " " } else { "" })
}

fn action_query(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    let (row, col) = s.screen.addr_to_rc(s.screen.cursor_addr());
    let all: Vec<(&str, String)> = vec![
        ("Cursor", format!("{row} {col}")),
        ("Formatted", if s.screen.is_formatted() { "F".into() } else { "U".into() }),
        ("Host", s.connection.host().unwrap_or("").to_string()),
        ("Model", s.profile.model.to_string()),
        ("ScreenSize", format!("{} {}", s.screen.rows(), s.screen.cols())),
    ];
    match args.len() {
        0 => {
            for (k, v) in &all {
                s.action_output(&format!("{k}: {v}"));
            }
            Ok(())
        }
        1 => {
            let want = args[0].to_ascii_lowercase();
            match all.iter().find(|(k, _)| k.to_ascii_lowercase() == want) {
                Some((_, v)) => {
                    s.action_output(v);
                    Ok(())
                }
                None => Err(ActionError::BadArgument {
                    action: "Query",
                    argument: args[0].to_string(),
                    reason: "unknown keyword".to_string(),
                }),
            }
        }
        _ => Err(ActionError::ArgCount {
            action: "Query",
            expected: "0 or 1".to_string(),
            got: args.len(),
        }),
    }
}

fn action_wait(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    s.sms_wait(args)
}

fn action_expect(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    s.sms_expect(args)
}

fn action_script(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Script", args, "1 or more", !args.is_empty())?;
    s.sms_push_child(args[0], &args[1..])
}

fn action_execute(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Execute", args, "1", args.len() == 1)?;
    s.sms_execute(args[0])
}

fn action_snap(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    s.sms_snap(args)
}

fn action_abort(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("Abort", args, "0", args.is_empty())?;
    s.sms_abort();
    Ok(())
}

fn action_close_script(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    s.sms_close_script(args)
}

fn action_pause_script(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    arg_count("PauseScript", args, "0", args.is_empty())?;
    s.sms_pause_script()
}

fn action_continue_script(s: &mut Session, args: &[&str], _cause: Cause) -> Result<(), ActionError> {
    s.sms_continue_script(args)
}
