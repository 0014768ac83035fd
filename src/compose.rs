//! Compose-key translation
//!
//! Two-keystroke composition: after the compose trigger, the next two
//! character keys are looked up (in either order) in the composite table
//! and replaced by a single output character. Any completed or failed
//! composition returns the machine to idle.

use once_cell::sync::Lazy;

use crate::error::ConfigError;

/// A table of `(key1, key2) -> output` pairs, matched in either order
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeMap {
    pairs: Vec<(char, char, char)>,
}

impl CompositeMap {
    /// Parse a resource-style map: one `a + b = c` entry per line, blank
    /// lines and `!`-prefixed comment lines ignored
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut pairs = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('!') {
                continue;
            }
            let entry = || ConfigError::CompositeEntry {
                entry: line.to_string(),
            };
            let (lhs, out) = line.split_once('=').ok_or_else(entry)?;
            let (k1, k2) = lhs.split_once('+').ok_or_else(entry)?;
            let k1 = single_char(k1).ok_or_else(entry)?;
            let k2 = single_char(k2).ok_or_else(entry)?;
            let out = single_char(out).ok_or_else(entry)?;
            pairs.push((k1, k2, out));
        }
        Ok(Self { pairs })
    }

    /// Whether a character appears in any pair
    pub fn participates(&self, ch: char) -> bool {
        self.pairs.iter().any(|(a, b, _)| *a == ch || *b == ch)
    }

    /// Look up a pair in either order
    pub fn lookup(&self, k1: char, k2: char) -> Option<char> {
        self.pairs
            .iter()
            .find(|(a, b, _)| (*a == k1 && *b == k2) || (*a == k2 && *b == k1))
            .map(|(_, _, out)| *out)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn single_char(s: &str) -> Option<char> {
    let s = s.trim();
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Built-in composites, used when the profile supplies no map
static DEFAULT_COMPOSITES: Lazy<CompositeMap> = Lazy::new(|| {
    CompositeMap::parse(
        "a + ' = \u{E1}\n\
         e + ' = \u{E9}\n\
         i + ' = \u{ED}\n\
         o + ' = \u{F3}\n\
         u + ' = \u{FA}\n\
         a + ` = \u{E0}\n\
         e + ` = \u{E8}\n\
         a + ^ = \u{E2}\n\
         e + ^ = \u{EA}\n\
         a + \" = \u{E4}\n\
         o + \" = \u{F6}\n\
         u + \" = \u{FC}\n\
         n + ~ = \u{F1}\n\
         c + , = \u{E7}\n\
         c + / = \u{A2}\n\
         s + s = \u{DF}",
    )
    .unwrap_or(CompositeMap { pairs: Vec::new() })
});

/// Composition progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposeState {
    #[default]
    Idle,
    /// Trigger seen, first key pending
    Composing,
    /// First key captured, waiting for its partner
    FirstKey(char),
}

/// What `feed` did with a character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeResult {
    /// Character captured as the first key of a pair
    Captured,
    /// Pair complete; insert the substituted character
    Composed(char),
    /// Character matches nothing; ring the bell
    NoMatch,
}

/// The compose-key state machine
#[derive(Debug)]
pub struct Compose {
    state: ComposeState,
    map: Option<CompositeMap>,
}

impl Compose {
    /// Build from an optional profile-supplied map. A malformed map
    /// disables composition for the session rather than failing startup.
    pub fn from_map_source(source: Option<&str>) -> Self {
        let map = match source {
            None => Some(DEFAULT_COMPOSITES.clone()),
            Some(text) => match CompositeMap::parse(text) {
                Ok(map) => Some(map),
                Err(e) => {
                    log::warn!("compose disabled: {e}");
                    None
                }
            },
        };
        Self {
            state: ComposeState::Idle,
            map,
        }
    }

    pub fn state(&self) -> ComposeState {
        self.state
    }

    /// Whether a composition is in progress
    pub fn active(&self) -> bool {
        self.state != ComposeState::Idle
    }

    /// The compose trigger key
    pub fn trigger(&mut self) {
        if self.map.is_some() {
            self.state = ComposeState::Composing;
        } else {
            log::debug!("compose trigger ignored: no composite table");
        }
    }

    /// Reset to idle (keyboard reset, failed composition)
    pub fn reset(&mut self) {
        self.state = ComposeState::Idle;
    }

    /// Offer a character key to an in-progress composition.
    /// Must only be called while `active()`.
    pub fn feed(&mut self, ch: char) -> ComposeResult {
        let map = match &self.map {
            Some(map) => map,
            None => {
                self.state = ComposeState::Idle;
                return ComposeResult::NoMatch;
            }
        };
        match self.state {
            ComposeState::Idle => ComposeResult::NoMatch,
            ComposeState::Composing => {
                if map.participates(ch) {
                    self.state = ComposeState::FirstKey(ch);
                    ComposeResult::Captured
                } else {
                    self.state = ComposeState::Idle;
                    ComposeResult::NoMatch
                }
            }
            ComposeState::FirstKey(first) => {
                self.state = ComposeState::Idle;
                match map.lookup(first, ch) {
                    Some(out) => ComposeResult::Composed(out),
                    None => ComposeResult::NoMatch,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_map() {
        let map = CompositeMap::parse("a + e = X\n! comment\n\nc + , = Y").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.lookup('a', 'e'), Some('X'));
        assert_eq!(map.lookup('e', 'a'), Some('X'));
        assert_eq!(map.lookup('a', 'a'), None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(CompositeMap::parse("a e = X").is_err());
        assert!(CompositeMap::parse("ab + e = X").is_err());
        assert!(CompositeMap::parse("a + e").is_err());
    }

    #[test]
    fn test_compose_either_order() {
        let mut compose = Compose::from_map_source(Some("a + ' = \u{E1}"));
        compose.trigger();
        assert_eq!(compose.feed('a'), ComposeResult::Captured);
        assert_eq!(compose.feed('\''), ComposeResult::Composed('\u{E1}'));
        assert!(!compose.active());

        compose.trigger();
        assert_eq!(compose.feed('\''), ComposeResult::Captured);
        assert_eq!(compose.feed('a'), ComposeResult::Composed('\u{E1}'));
    }

    #[test]
    fn test_compose_no_match_resets() {
        let mut compose = Compose::from_map_source(Some("a + ' = \u{E1}"));
        compose.trigger();
        assert_eq!(compose.feed('z'), ComposeResult::NoMatch);
        assert!(!compose.active());

        compose.trigger();
        compose.feed('a');
        assert_eq!(compose.feed('z'), ComposeResult::NoMatch);
        assert!(!compose.active());
    }

    #[test]
    fn test_bad_map_disables_composition() {
        let mut compose = Compose::from_map_source(Some("garbage"));
        compose.trigger();
        assert!(!compose.active());
    }

    #[test]
    fn test_default_table_loads() {
        let mut compose = Compose::from_map_source(None);
        compose.trigger();
        assert_eq!(compose.feed('n'), ComposeResult::Captured);
        assert_eq!(compose.feed('~'), ComposeResult::Composed('\u{F1}'));
    }
}
