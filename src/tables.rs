//! Symbol tables: the base key table and the per-layout overlay.
//!
//! Both tables are flat maps from a symbolic name to a [`Symbol`]. The base
//! table (`default.yml`) holds layout-independent HID usage codes and modifier
//! bits, e.g. `KEY_ENTER: 0x28` or `MODIFIERKEY_SHIFT: 0x02`. The overlay
//! (`us.yml`, `fr.yml`, ...) maps character codes such as `ASCII_41` to the
//! ordered list of keys that produce the character on that layout:
//!
//! ```yaml
//! ASCII_41: [KEY_A, MODIFIERKEY_SHIFT]
//! ASCII_61: [KEY_A]
//! ```
//!
//! Tables may be written as YAML, JSON or TOML; the format is picked from the
//! file extension.

use crate::error::{CompilerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name (without extension) of the base table inside a resource directory.
pub const BASE_TABLE_NAME: &str = "default";

/// A single table value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Symbol {
    /// A literal output byte.
    Byte(u8),
    /// Indirection to one other symbol.
    Key(String),
    /// Indirection to an ordered run of symbols, one output byte each.
    Keys(Vec<String>),
}

impl Symbol {
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Symbol::Byte(b) => Some(*b),
            _ => None,
        }
    }
}

/// Storage format of a table file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Yaml,
    Json,
    Toml,
}

impl TableFormat {
    /// Extensions tried, in order, when looking a table up by name.
    pub const EXTENSIONS: [&'static str; 4] = ["yml", "yaml", "json", "toml"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTable {
    entries: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for assembling tables in memory.
    pub fn with(mut self, name: impl Into<String>, symbol: Symbol) -> Self {
        self.insert(name, symbol);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, symbol: Symbol) {
        self.entries.insert(name.into(), symbol);
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    /// Look up `name` and return it only if it is a literal byte.
    pub fn byte(&self, name: &str) -> Option<u8> {
        self.get(name).and_then(Symbol::as_byte)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a table from text. The error is the parser's message.
    pub fn parse(text: &str, format: TableFormat) -> std::result::Result<Self, String> {
        match format {
            TableFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            TableFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            TableFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        }
    }

    /// Read and parse a table file. The format comes from the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let format = TableFormat::from_path(path).ok_or_else(|| {
            CompilerError::table(&display, "table file must be .yml, .yaml, .json or .toml")
        })?;

        let content = fs::read_to_string(path)
            .map_err(|e| CompilerError::file_not_found(format!("{}: {}", display, e)))?;

        let table = Self::parse(&content, format).map_err(|e| CompilerError::table(&display, e))?;
        log::debug!("Loaded {} symbols from {}", table.len(), display);
        Ok(table)
    }
}

/// The base table and one layout overlay, loaded together.
#[derive(Debug, Clone)]
pub struct KeyTables {
    base: SymbolTable,
    overlay: SymbolTable,
    layout: String,
}

impl KeyTables {
    pub fn new(base: SymbolTable, overlay: SymbolTable, layout: impl Into<String>) -> Self {
        Self {
            base,
            overlay,
            layout: layout.into(),
        }
    }

    /// Load `default.<ext>` and `<layout>.<ext>` from `resource_dir`.
    pub fn load(resource_dir: impl AsRef<Path>, layout: &str) -> Result<Self> {
        validate_layout_name(layout)?;
        let dir = resource_dir.as_ref();

        let base = SymbolTable::load(&find_table_file(dir, BASE_TABLE_NAME)?)?;
        let overlay = SymbolTable::load(&find_table_file(dir, layout)?)?;

        log::info!(
            "Loaded layout '{}' ({} base symbols, {} layout symbols)",
            layout,
            base.len(),
            overlay.len()
        );
        Ok(Self::new(base, overlay, layout))
    }

    pub fn base(&self) -> &SymbolTable {
        &self.base
    }

    pub fn overlay(&self) -> &SymbolTable {
        &self.overlay
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// Base table first, then the overlay.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.base.get(name).or_else(|| self.overlay.get(name))
    }
}

fn validate_layout_name(layout: &str) -> Result<()> {
    let valid = !layout.is_empty()
        && layout
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CompilerError::InvalidLayout {
            name: layout.to_string(),
        })
    }
}

fn find_table_file(dir: &Path, name: &str) -> Result<PathBuf> {
    TableFormat::EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            CompilerError::file_not_found(format!(
                "no table named '{}' in {}",
                name,
                dir.display()
            ))
        })
}
