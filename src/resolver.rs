//! Character and mnemonic resolution against the loaded key tables.
//!
//! Characters are classified into a code name (`ASCII_41`, `ISO_8859_1_E9`,
//! `UNICODE_20AC`), the code is looked up in the layout overlay, and each key
//! the overlay lists is resolved to a byte through the base table (then the
//! overlay, for layouts that define their own keys).
//!
//! Mnemonics (`ENTER`, `ESCAPE`, `VOLUMEUP`) resolve through `KEY_<word>` in
//! the base table, a fixed alias chain, and finally the first character of
//! the word.

use crate::error::LineError;
use crate::tables::{KeyTables, Symbol};

/// Classify a character into the code name used by layout tables.
pub fn char_code(c: char) -> String {
    let cp = c as u32;
    if cp < 128 {
        format!("ASCII_{:X}", cp)
    } else if cp < 256 {
        format!("ISO_8859_1_{:X}", cp)
    } else {
        format!("UNICODE_{:X}", cp)
    }
}

/// Fixed mnemonic aliases. Each target is retried as `KEY_<target>`.
pub fn alias(word: &str) -> Option<&'static str> {
    let target = match word {
        "ESCAPE" => "ESC",
        "DEL" => "DELETE",
        "BREAK" => "PAUSE",
        "CONTROL" => "CTRL",
        "DOWNARROW" => "DOWN",
        "UPARROW" => "UP",
        "LEFTARROW" => "LEFT",
        "RIGHTARROW" => "RIGHT",
        "MENU" => "APP",
        "WINDOWS" => "GUI",
        "PLAY" | "PAUSE" => "MEDIA_PLAY_PAUSE",
        "STOP" => "MEDIA_STOP",
        "MUTE" => "MEDIA_MUTE",
        "VOLUMEUP" => "MEDIA_VOLUME_INC",
        "VOLUMEDOWN" => "MEDIA_VOLUME_DEC",
        "SCROLLLOCK" => "SCROLL_LOCK",
        "NUMLOCK" => "NUM_LOCK",
        "CAPSLOCK" => "CAPS_LOCK",
        _ => return None,
    };
    Some(target)
}

/// Resolves symbols for one compilation. Missing symbols do not fail; they
/// become zero bytes and are queued as warnings for the caller to collect.
#[derive(Debug)]
pub struct Resolver<'t> {
    tables: &'t KeyTables,
    warnings: Vec<String>,
}

impl<'t> Resolver<'t> {
    pub fn new(tables: &'t KeyTables) -> Self {
        Self {
            tables,
            warnings: Vec::new(),
        }
    }

    /// Base table first, then the layout overlay.
    pub fn lookup(&self, name: &str) -> Option<&'t Symbol> {
        self.tables.lookup(name)
    }

    /// A named constant that must exist in the base table, such as a
    /// modifier bit. Absence fails the line.
    pub fn base_byte(&self, name: &str) -> Result<u8, LineError> {
        self.tables
            .base()
            .byte(name)
            .ok_or_else(|| LineError::MissingSymbol {
                name: name.to_string(),
            })
    }

    /// Resolve a character to the bytes that type it on the current layout.
    pub fn resolve_char(&mut self, c: char) -> Vec<u8> {
        let code = char_code(c);
        let tables = self.tables;

        match tables.overlay().get(&code) {
            Some(Symbol::Byte(b)) => vec![*b],
            Some(Symbol::Key(key)) => vec![self.resolve_key(key)],
            Some(Symbol::Keys(keys)) => keys.iter().map(|key| self.resolve_key(key)).collect(),
            None => {
                self.warn(format!("character not found: {}", code));
                vec![0x00]
            }
        }
    }

    /// Resolve an instruction keyword or key argument to a single byte.
    pub fn resolve_mnemonic(&mut self, word: &str) -> Result<u8, LineError> {
        let mut word = word.trim();
        loop {
            if let Some(b) = self.tables.base().byte(&format!("KEY_{}", word)) {
                return Ok(b);
            }
            match alias(word) {
                Some(next) => word = next,
                None => break,
            }
        }

        // Not a known key: type the first character instead, keeping only
        // the key byte of whatever the layout produces for it.
        let first = word.chars().next().ok_or(LineError::EmptyMnemonic)?;
        log::debug!("'{}' is not a key name, resolving '{}' as a character", word, first);
        Ok(self.resolve_char(first).first().copied().unwrap_or(0x00))
    }

    /// Drain the warnings queued since the last call.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    fn resolve_key(&mut self, key: &str) -> u8 {
        match self.lookup(key) {
            Some(Symbol::Byte(b)) => *b,
            Some(_) => {
                self.warn(format!("key {} does not name a byte value", key));
                0x00
            }
            None => {
                self.warn(format!("key not found: {}", key));
                0x00
            }
        }
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}
