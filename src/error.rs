//! Error types for the 3270 input and scripting core
//!
//! This module provides structured error types for keyboard input, string
//! emulation, and the script/macro engine, with a clear split between
//! operator errors (user-visible, non-fatal) and script errors (reported on
//! the script output channel).

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Operator errors raised by field-aware input
///
/// These are the classic 3270 "X" conditions: they either ring the bell or
/// lock the keyboard until an explicit Reset, depending on configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorError {
    /// Input attempted into a protected field or onto a field attribute
    Protected,
    /// Non-numeric character typed into a numeric-only field
    Numeric,
    /// No room left in the field for an insert-mode character
    Overflow,
}

impl fmt::Display for OperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorError::Protected => write!(f, "protected field"),
            OperatorError::Numeric => write!(f, "numeric field"),
            OperatorError::Overflow => write!(f, "field overflow"),
        }
    }
}

impl StdError for OperatorError {}

/// Errors from the paste/typed-string parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The string ended in the middle of a backslash escape
    UnfinishedEscape { state: String },
    /// A `\pf`/`\pa` escape named a key outside the keyboard's range
    BadKeyNumber { kind: &'static str, number: usize },
    /// A character has no EBCDIC equivalent in the active code page
    Untranslatable { ch: char },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::UnfinishedEscape { state } => {
                write!(f, "string ends in incomplete escape ({state})")
            }
            InputError::BadKeyNumber { kind, number } => {
                write!(f, "no such key: {kind}{number}")
            }
            InputError::Untranslatable { ch } => {
                write!(f, "character {ch:?} has no EBCDIC equivalent")
            }
        }
    }
}

impl StdError for InputError {}

/// Errors from action-name lookup and action execution
#[derive(Debug)]
pub enum ActionError {
    /// No action matches the given name or prefix
    Unknown { name: String },
    /// More than one action matches an abbreviated name
    Ambiguous { name: String, candidates: Vec<String> },
    /// Malformed action-call syntax
    Syntax { message: String },
    /// Wrong number of arguments
    ArgCount { action: &'static str, expected: String, got: usize },
    /// An argument could not be interpreted
    BadArgument { action: &'static str, argument: String, reason: String },
    /// The action executed and failed
    Failed { action: &'static str, reason: String },
    /// A child process or pipe could not be created
    Io { action: &'static str, source: io::Error },
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::Unknown { name } => write!(f, "unknown action: {name}"),
            ActionError::Ambiguous { name, candidates } => {
                write!(f, "ambiguous action name {name}: matches {}", candidates.join(", "))
            }
            ActionError::Syntax { message } => write!(f, "syntax error: {message}"),
            ActionError::ArgCount { action, expected, got } => {
                write!(f, "{action}: expected {expected} argument(s), got {got}")
            }
            ActionError::BadArgument { action, argument, reason } => {
                write!(f, "{action}: bad argument '{argument}': {reason}")
            }
            ActionError::Failed { action, reason } => write!(f, "{action}: {reason}"),
            ActionError::Io { action, source } => write!(f, "{action}: {source}"),
        }
    }
}

impl StdError for ActionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ActionError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Configuration load/save errors
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file could not be read or written
    File { path: String, source: io::Error },
    /// Configuration file could not be parsed
    Parse { path: String, message: String },
    /// A composite (compose-key) map entry is malformed
    CompositeEntry { entry: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::File { path, source } => {
                write!(f, "config file {path}: {source}")
            }
            ConfigError::Parse { path, message } => {
                write!(f, "config file {path}: {message}")
            }
            ConfigError::CompositeEntry { entry } => {
                write!(f, "bad composite map entry: '{entry}'")
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::File { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_error_display() {
        assert_eq!(OperatorError::Protected.to_string(), "protected field");
        assert_eq!(OperatorError::Numeric.to_string(), "numeric field");
        assert_eq!(OperatorError::Overflow.to_string(), "field overflow");
    }

    #[test]
    fn test_action_error_display() {
        let err = ActionError::Ambiguous {
            name: "E".to_string(),
            candidates: vec!["Enter".to_string(), "Erase".to_string()],
        };
        assert_eq!(err.to_string(), "ambiguous action name E: matches Enter, Erase");
    }
}
