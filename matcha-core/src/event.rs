//! Input events delivered to component handlers

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent};

use crate::keys::{key_matches, parse_key_string};

/// How the dispatch engine picks the node an event starts bubbling from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    /// Starts at the focused component (or the root)
    Keyboard,
    /// Starts at the deepest node under the pointer
    Pointer,
    /// Starts at the root
    Other,
}

/// The event payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Keyboard event
    Key(KeyEvent),
    /// Mouse click/drag/move event
    Mouse(MouseEvent),
    /// Scroll event with position and delta
    Scroll { column: u16, row: u16, delta: isize },
    /// Terminal resize
    Resize(u16, u16),
    /// Bracketed paste
    Paste(String),
    /// The terminal window gained focus
    FocusGained,
    /// The terminal window lost focus
    FocusLost,
    /// Clipboard contents delivered by the terminal
    Clipboard(Vec<u8>),
    /// Periodic timer tick
    Tick,
    /// An error reported by the input source
    Error(String),
    /// A wake-up posted by the host
    Interrupt,
}

impl EventKind {
    /// Get the routing class for this event kind
    pub fn class(&self) -> EventClass {
        match self {
            EventKind::Key(_) | EventKind::Paste(_) => EventClass::Keyboard,
            EventKind::Mouse(_) | EventKind::Scroll { .. } => EventClass::Pointer,
            _ => EventClass::Other,
        }
    }

    /// Pointer position in screen coordinates, for pointer-class events
    pub fn position(&self) -> Option<(u16, u16)> {
        match self {
            EventKind::Mouse(mouse) => Some((mouse.column, mouse.row)),
            EventKind::Scroll { column, row, .. } => Some((*column, *row)),
            _ => None,
        }
    }

    /// The key event, if this is a key press or repeat
    pub fn key(&self) -> Option<&KeyEvent> {
        match self {
            EventKind::Key(key) if key.kind != KeyEventKind::Release => Some(key),
            _ => None,
        }
    }

    /// The typed character of a plain (or shifted) key press
    pub fn char(&self) -> Option<char> {
        let key = self.key()?;
        match key.code {
            KeyCode::Char(c) if (key.modifiers - KeyModifiers::SHIFT).is_empty() => Some(c),
            _ => None,
        }
    }

    /// Check a key press against a key string like `"q"` or `"ctrl+p"`
    ///
    /// Character keys are compared case-insensitively. Returns `false`
    /// for unparsable key strings.
    pub fn is_key(&self, key_str: &str) -> bool {
        match (self.key(), parse_key_string(key_str)) {
            (Some(key), Some(expected)) => key_matches(&expected, key),
            _ => false,
        }
    }

    /// Ctrl+C, the conventional interrupt chord
    pub fn is_ctrl_c(&self) -> bool {
        self.key().is_some_and(|key| {
            key.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{char_key, ctrl_key, key, mouse_down};
    use crossterm::event::KeyEventState;

    #[test]
    fn test_event_class() {
        assert_eq!(EventKind::Key(key("a")).class(), EventClass::Keyboard);
        assert_eq!(EventKind::Paste("x".into()).class(), EventClass::Keyboard);
        assert_eq!(mouse_down(1, 2).class(), EventClass::Pointer);
        assert_eq!(
            EventKind::Scroll {
                column: 0,
                row: 0,
                delta: 1
            }
            .class(),
            EventClass::Pointer
        );
        assert_eq!(EventKind::Resize(80, 24).class(), EventClass::Other);
        assert_eq!(EventKind::Tick.class(), EventClass::Other);
        assert_eq!(EventKind::FocusLost.class(), EventClass::Other);
    }

    #[test]
    fn test_position() {
        assert_eq!(mouse_down(3, 4).position(), Some((3, 4)));
        assert_eq!(EventKind::Key(key("a")).position(), None);
    }

    #[test]
    fn test_is_key() {
        let event = EventKind::Key(key("ctrl+p"));
        assert!(event.is_key("ctrl+p"));
        assert!(!event.is_key("p"));
        assert!(!event.is_key("not-a-key"));

        let upper = EventKind::Key(char_key('Q'));
        assert!(upper.is_key("q"));
    }

    #[test]
    fn test_release_is_not_a_key_press() {
        let mut release = key("a");
        release.kind = KeyEventKind::Release;
        release.state = KeyEventState::empty();
        let event = EventKind::Key(release);
        assert!(event.key().is_none());
        assert!(!event.is_key("a"));
    }

    #[test]
    fn test_char() {
        assert_eq!(EventKind::Key(key("x")).char(), Some('x'));
        assert_eq!(EventKind::Key(key("shift+x")).char(), Some('x'));
        assert_eq!(EventKind::Key(ctrl_key('x')).char(), None);
        assert_eq!(EventKind::Key(key("enter")).char(), None);
    }

    #[test]
    fn test_ctrl_c() {
        assert!(EventKind::Key(ctrl_key('c')).is_ctrl_c());
        assert!(!EventKind::Key(key("c")).is_ctrl_c());
    }
}
