//! Addon and binary-module descriptor parsing.
//!
//! An addon pack carries an `addon.conf` entry with a small text grammar:
//!
//! ```text
//! addonDef {
//!     "0x<hex checksum>"
//!     ...
//! }
//! mapDef "<relative map path>" {
//!     "<key>" "<value>"
//!     ...
//! }
//! ```
//!
//! A single `addonDef` block lists the checksums of packs this addon
//! depends on; any number of `mapDef` blocks describe bundled playable
//! content. Parse failure anywhere discards the whole descriptor, so no
//! partial addon state is ever retained.

use std::collections::HashMap;

use tracing::warn;

use crate::error::{PakError, Result};

/// One `mapDef` block: a map path plus its key/value dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDecl {
    pub path: String,
    pub keys: HashMap<String, String>,
}

/// Parsed contents of an `addon.conf` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddonDescriptor {
    /// Checksums of the packs this addon depends on. All of them must be
    /// active for the addon's content to be meaningful.
    pub depends: Vec<u32>,
    /// Extra playable content bundled in the addon.
    pub map_decls: Vec<MapDecl>,
}

impl AddonDescriptor {
    /// Parse descriptor text. Any syntax error aborts and nothing of the
    /// partially built descriptor survives.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lexer = Lexer::new(text);

        if !lexer.skip_until_word("addonDef") {
            return Err(PakError::MalformedDescriptor("no addonDef block".into()));
        }
        match lexer.next() {
            Some(Token::Open) => {}
            _ => return Err(PakError::MalformedDescriptor("expected { after addonDef".into())),
        }

        let mut descriptor = Self::default();
        loop {
            match lexer.next() {
                Some(Token::Close) => break,
                Some(Token::Str(s)) => descriptor.depends.push(parse_checksum(&s)?),
                Some(_) => {
                    return Err(PakError::MalformedDescriptor(
                        "expected quoted checksum string".into(),
                    ));
                }
                None => {
                    return Err(PakError::MalformedDescriptor(
                        "unexpected end of addonDef block".into(),
                    ));
                }
            }
        }

        while lexer.skip_until_word("mapDef") {
            let path = match lexer.next() {
                Some(Token::Str(s)) => s,
                _ => return Err(PakError::MalformedDescriptor("expected map path".into())),
            };
            match lexer.next() {
                Some(Token::Open) => {}
                _ => return Err(PakError::MalformedDescriptor("expected { after map path".into())),
            }

            let mut keys = HashMap::new();
            loop {
                let key = match lexer.next() {
                    Some(Token::Close) => break,
                    Some(Token::Str(s)) => s,
                    Some(_) => {
                        return Err(PakError::MalformedDescriptor(
                            "expected quoted key string".into(),
                        ));
                    }
                    None => {
                        return Err(PakError::MalformedDescriptor(
                            "unexpected end of mapDef block".into(),
                        ));
                    }
                };
                let value = match lexer.next() {
                    Some(Token::Str(s)) => s,
                    _ => {
                        return Err(PakError::MalformedDescriptor(
                            "expected quoted value string".into(),
                        ));
                    }
                };
                if keys.insert(key.clone(), value).is_some() {
                    warn!("mapDef key '{key}' already defined");
                }
            }
            descriptor.map_decls.push(MapDecl { path, keys });
        }

        Ok(descriptor)
    }
}

/// Parse a `binary.conf` entry: a whitespace-separated list of platform
/// ids. Non-numeric tokens are skipped; the marker's mere presence is what
/// classifies the pack as binary.
pub fn parse_binary_marker(text: &str) -> Vec<u32> {
    let mut lexer = Lexer::new(text);
    let mut ids = Vec::new();
    while let Some(token) = lexer.next() {
        if let Token::Word(w) = token
            && let Ok(id) = w.parse::<u32>()
        {
            ids.push(id);
        }
    }
    ids
}

fn parse_checksum(s: &str) -> Result<u32> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(hex, 16)
        .map_err(|_| PakError::MalformedDescriptor(format!("could not parse checksum '{s}'")))
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Str(String),
    Word(String),
}

/// Minimal tokenizer for the descriptor grammar: braces, quoted strings,
/// bare words; `//` and `/* */` comments are skipped.
struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
        }
    }

    fn next(&mut self) -> Option<Token> {
        loop {
            let c = *self.chars.peek()?;
            if c.is_whitespace() {
                self.chars.next();
            } else if c == '/' {
                let mut probe = self.chars.clone();
                probe.next();
                match probe.peek() {
                    Some('/') => self.skip_line_comment(),
                    Some('*') => self.skip_block_comment(),
                    _ => break,
                }
            } else {
                break;
            }
        }

        match self.chars.next()? {
            '{' => Some(Token::Open),
            '}' => Some(Token::Close),
            '"' => {
                let mut s = String::new();
                for c in self.chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    s.push(c);
                }
                Some(Token::Str(s))
            }
            first => {
                let mut w = String::from(first);
                while let Some(&c) = self.chars.peek() {
                    if c.is_whitespace() || c == '{' || c == '}' || c == '"' {
                        break;
                    }
                    w.push(c);
                    self.chars.next();
                }
                Some(Token::Word(w))
            }
        }
    }

    fn skip_until_word(&mut self, word: &str) -> bool {
        while let Some(token) = self.next() {
            if matches!(&token, Token::Word(w) if w == word) {
                return true;
            }
        }
        false
    }

    fn skip_line_comment(&mut self) {
        for c in self.chars.by_ref() {
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.chars.next(); // '/'
        self.chars.next(); // '*'
        let mut prev = '\0';
        for c in self.chars.by_ref() {
            if prev == '*' && c == '/' {
                break;
            }
            prev = c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_depends_and_map_decls() {
        let text = r#"
            // sample addon
            addonDef {
                "0xdeadbeef"
                "12ab34cd"
            }
            mapDef "maps/foo.map" {
                "name" "Foo"
                "players" "4"
            }
            mapDef "maps/bar.map" {
            }
        "#;
        let descriptor = AddonDescriptor::parse(text).unwrap();
        assert_eq!(descriptor.depends, vec![0xdeadbeef, 0x12ab34cd]);
        assert_eq!(descriptor.map_decls.len(), 2);
        assert_eq!(descriptor.map_decls[0].path, "maps/foo.map");
        assert_eq!(descriptor.map_decls[0].keys["name"], "Foo");
        assert!(descriptor.map_decls[1].keys.is_empty());
    }

    #[test]
    fn empty_depends_block_is_valid() {
        let descriptor = AddonDescriptor::parse("addonDef { }").unwrap();
        assert!(descriptor.depends.is_empty());
        assert!(descriptor.map_decls.is_empty());
    }

    #[test]
    fn missing_addon_def_fails() {
        assert!(AddonDescriptor::parse("mapDef \"m\" { }").is_err());
    }

    #[test]
    fn unquoted_checksum_fails() {
        assert!(AddonDescriptor::parse("addonDef { 0xdeadbeef }").is_err());
    }

    #[test]
    fn bad_checksum_fails() {
        assert!(AddonDescriptor::parse("addonDef { \"zzz\" }").is_err());
    }

    #[test]
    fn unterminated_map_def_fails() {
        let text = "addonDef { } mapDef \"m\" { \"k\" \"v\"";
        assert!(AddonDescriptor::parse(text).is_err());
    }

    #[test]
    fn value_must_be_string() {
        let text = "addonDef { } mapDef \"m\" { \"k\" v }";
        assert!(AddonDescriptor::parse(text).is_err());
    }

    #[test]
    fn comments_are_skipped() {
        let text = "/* header */ addonDef { // one dep\n \"0x1\" }";
        let descriptor = AddonDescriptor::parse(text).unwrap();
        assert_eq!(descriptor.depends, vec![1]);
    }

    #[test]
    fn binary_marker_collects_platform_ids() {
        assert_eq!(parse_binary_marker("0 2\n5"), vec![0, 2, 5]);
        assert_eq!(parse_binary_marker("// none\n"), Vec::<u32>::new());
        assert_eq!(parse_binary_marker("1 linux 3"), vec![1, 3]);
    }
}
