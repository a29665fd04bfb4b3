//! Key values and the key-spec syntax used in config files.
//!
//! A spec is either a single character (`"n"`, `"<"`) or a bracketed name
//! (`"<enter>"`, `"<c-c>"`, `"<pgdown>"`).

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Char(char),
    Ctrl(char),
    Enter,
    Esc,
    Space,
    Tab,
    BackTab,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
}

const NAMED: &[(&str, Key)] = &[
    ("enter", Key::Enter),
    ("esc", Key::Esc),
    ("space", Key::Space),
    ("tab", Key::Tab),
    ("backtab", Key::BackTab),
    ("backspace", Key::Backspace),
    ("up", Key::Up),
    ("down", Key::Down),
    ("left", Key::Left),
    ("right", Key::Right),
    ("pgup", Key::PageUp),
    ("pgdown", Key::PageDown),
    ("home", Key::Home),
    ("end", Key::End),
];

impl Key {
    pub fn parse(spec: &str) -> Option<Key> {
        let mut chars = spec.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(if c == ' ' { Key::Space } else { Key::Char(c) });
        }

        let name = spec.strip_prefix('<')?.strip_suffix('>')?.to_ascii_lowercase();
        if let Some(rest) = name.strip_prefix("c-") {
            let mut chars = rest.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => Some(Key::Ctrl(c)),
                _ => None,
            };
        }
        NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, key)| *key)
    }

    /// Parses a comma-separated key sequence such as `"j,j,<enter>"`.
    /// A lone `","` entry is written as `<comma>`.
    pub fn parse_sequence(seq: &str) -> Result<Vec<Key>, String> {
        seq.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "<comma>" => Ok(Key::Char(',')),
                _ => Key::parse(s).ok_or_else(|| format!("invalid key '{s}'")),
            })
            .collect()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::Ctrl(c) => write!(f, "<c-{c}>"),
            named => {
                let name = NAMED
                    .iter()
                    .find(|(_, key)| key == named)
                    .map(|(n, _)| *n)
                    .unwrap_or("?");
                write!(f, "<{name}>")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_specs() {
        assert_eq!(Key::parse("n"), Some(Key::Char('n')));
        assert_eq!(Key::parse("<"), Some(Key::Char('<')));
        assert_eq!(Key::parse(" "), Some(Key::Space));
        assert_eq!(Key::parse("<enter>"), Some(Key::Enter));
        assert_eq!(Key::parse("<Esc>"), Some(Key::Esc));
        assert_eq!(Key::parse("<c-c>"), Some(Key::Ctrl('c')));
        assert_eq!(Key::parse("<c-1>"), None);
        assert_eq!(Key::parse("<bogus>"), None);
        assert_eq!(Key::parse(""), None);
    }

    #[test]
    fn test_display_matches_config_syntax() {
        for spec in ["q", "<enter>", "<space>", "<c-r>", "<pgdown>", ">"] {
            assert_eq!(Key::parse(spec).map(|k| k.to_string()).as_deref(), Some(spec));
        }
    }

    #[test]
    fn test_parse_sequence() {
        let keys = Key::parse_sequence("j, j,<enter>,<comma>").unwrap();
        assert_eq!(keys, vec![Key::Char('j'), Key::Char('j'), Key::Enter, Key::Char(',')]);
        assert!(Key::parse_sequence("j,<nope>").is_err());
    }
}
