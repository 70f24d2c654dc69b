//! Key string parsing for handlers and tests
//!
//! Key strings are lowercase chords joined by `+`, e.g. `"q"`, `"esc"`,
//! `"ctrl+p"`, `"shift+tab"`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent {
        code,
        modifiers,
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}

fn named_key(name: &str) -> Option<KeyCode> {
    let code = match name {
        "esc" | "escape" => KeyCode::Esc,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "backspace" => KeyCode::Backspace,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "delete" => KeyCode::Delete,
        "insert" => KeyCode::Insert,
        "space" => KeyCode::Char(' '),
        f if f.len() > 1 && f.starts_with('f') => {
            let n: u8 = f[1..].parse().ok()?;
            if !(1..=12).contains(&n) {
                return None;
            }
            KeyCode::F(n)
        }
        c if c.chars().count() == 1 => KeyCode::Char(c.chars().next()?),
        _ => return None,
    };
    Some(code)
}

/// Parse a key string like "q", "esc", "ctrl+p", "shift+tab" into a KeyEvent
pub fn parse_key_string(key_str: &str) -> Option<KeyEvent> {
    let key_str = key_str.trim().to_lowercase();

    if key_str.is_empty() {
        return None;
    }

    // A lone "+" is the plus key, not a separator
    if key_str == "+" {
        return Some(press(KeyCode::Char('+'), KeyModifiers::empty()));
    }

    if key_str == "shift+tab" || key_str == "backtab" {
        return Some(press(KeyCode::BackTab, KeyModifiers::SHIFT));
    }

    let parts: Vec<&str> = key_str.split('+').collect();
    let (key_part, modifier_parts) = parts.split_last()?;

    let mut modifiers = KeyModifiers::empty();
    for part in modifier_parts {
        match part.trim() {
            "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
            "shift" => modifiers |= KeyModifiers::SHIFT,
            "alt" => modifiers |= KeyModifiers::ALT,
            _ => {}
        }
    }

    let code = named_key(key_part.trim())?;
    if code == KeyCode::BackTab {
        modifiers |= KeyModifiers::SHIFT;
    }

    Some(press(code, modifiers))
}

/// Compare a parsed key string against an incoming key event
///
/// Ignores kind and state; character keys compare case-insensitively and
/// tolerate the SHIFT modifier terminals report for uppercase letters.
pub fn key_matches(expected: &KeyEvent, actual: &KeyEvent) -> bool {
    match (&expected.code, &actual.code) {
        (KeyCode::Char(want), KeyCode::Char(got)) => {
            let same_char = want.to_lowercase().eq(got.to_lowercase());
            let relevant = !KeyModifiers::SHIFT;
            same_char && (expected.modifiers & relevant) == (actual.modifiers & relevant)
        }
        _ => expected.code == actual.code && expected.modifiers == actual.modifiers,
    }
}

/// Format a key string for display (e.g., "ctrl+p" -> "^P", "q" -> "Q", "tab" -> "Tab")
pub fn format_key_for_display(key_str: &str) -> String {
    let key_str = key_str.trim().to_lowercase();

    if key_str == "shift+tab" || key_str == "backtab" {
        return "Shift+Tab".to_string();
    }

    let parts: Vec<&str> = key_str.split('+').collect();
    let Some((key_part, modifier_parts)) = parts.split_last() else {
        return key_str;
    };

    let mut display = String::new();
    for part in modifier_parts {
        match part.trim() {
            "ctrl" | "control" => display.push('^'),
            "shift" => display.push_str("Shift+"),
            "alt" => display.push_str("Alt+"),
            _ => {}
        }
    }

    match *key_part {
        "esc" | "escape" => display.push_str("Esc"),
        "enter" | "return" => display.push_str("Enter"),
        "pageup" => display.push_str("PgUp"),
        "pagedown" => display.push_str("PgDn"),
        "delete" => display.push_str("Del"),
        "insert" => display.push_str("Ins"),
        "tab" | "backspace" | "up" | "down" | "left" | "right" | "home" | "end" | "space" => {
            let mut chars = key_part.chars();
            if let Some(first) = chars.next() {
                display.extend(first.to_uppercase());
                display.push_str(chars.as_str());
            }
        }
        f if f.len() > 1 && f.starts_with('f') && f[1..].parse::<u8>().is_ok() => {
            display.push_str(&f.to_uppercase());
        }
        other => display.extend(other.chars().flat_map(char::to_uppercase)),
    }

    display
}
