//! Ducky Script Compiler
//!
//! Compiles line-oriented keystroke scripts into the binary instruction
//! stream read by USB keystroke-injection devices.
//!
//! # Features
//!
//! - `STRING`, `DELAY`, `DEFAULT_DELAY`, `REPEAT`, `REM` and `//` comments
//! - Modifier chords (`CTRL`, `ALT`, `SHIFT`, `GUI`, `CTRL-ALT`, ...)
//! - Named keys with aliases (`ESCAPE`, `UPARROW`, `VOLUMEUP`, ...)
//! - Pluggable keyboard layouts as YAML, JSON or TOML tables
//! - Best-effort compilation: a bad line is reported and skipped
//!
//! # Basic Usage
//!
//! ```no_run
//! use duckyc::{compile_file, Result};
//!
//! fn main() -> Result<()> {
//!     compile_file("payload.txt", "inject.bin")?;
//!     Ok(())
//! }
//! ```
//!
//! # Output Format
//!
//! Every key press is an instruction word of two bytes, the key code and
//! the modifier mask. A word whose first byte is `0x00` is a wait; its
//! second byte is the duration in milliseconds (at most 255, longer waits
//! are chained).

pub mod cli;
pub mod delay;
pub mod error;
pub mod instruction;
pub mod interpreter;
pub mod resolver;
pub mod tables;

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

// Re-export commonly used types and functions
pub use cli::DuckyCli;
pub use delay::{append_delay, encode_delay};
pub use error::{CompilerError, Diagnostic, LineError, Result, Severity};
pub use instruction::{Chord, Command, Instruction, Line};
pub use interpreter::{Compilation, Interpreter, InterpreterState, LineReport, LineResult};
pub use resolver::{alias, char_code, Resolver};
pub use tables::{KeyTables, Symbol, SymbolTable, TableFormat};

/// Compiler version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

pub const DEFAULT_LAYOUT: &str = "us";
pub const DEFAULT_RESOURCE_DIR: &str = "resources";
pub const DEFAULT_OUTPUT: &str = "inject.bin";

/// Compilation options and settings
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Enable debug mode with extra logging
    pub debug_mode: bool,

    /// Keyboard layout, the name of the overlay table
    pub layout: String,

    /// Directory holding `default.*` and the layout tables
    pub resource_dir: PathBuf,

    /// Default delay in effect before the script sets one
    pub default_delay: u32,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            debug_mode: false,
            layout: DEFAULT_LAYOUT.to_string(),
            resource_dir: PathBuf::from(DEFAULT_RESOURCE_DIR),
            default_delay: 0,
        }
    }
}

/// Compilation statistics and metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompilationStats {
    /// Script size in bytes
    pub source_size: u64,

    /// Output size in bytes
    pub output_size: u64,

    /// Lines in the script
    pub line_count: usize,

    /// Instruction bodies executed, repeats included
    pub instruction_count: usize,

    /// Lines abandoned because of an error
    pub failed_lines: usize,

    /// Symbols that could not be resolved
    pub warning_count: usize,

    /// Compilation time in milliseconds
    pub compile_time_ms: u64,
}

impl CompilationStats {
    pub fn from_compilation(compilation: &Compilation, source_size: u64) -> Self {
        Self {
            source_size,
            output_size: compilation.bytes.len() as u64,
            line_count: compilation.line_count,
            instruction_count: compilation.instruction_count,
            failed_lines: compilation.errors().count(),
            warning_count: compilation.warnings().count(),
            compile_time_ms: 0,
        }
    }
}

/// Main compiler entry point with default options
pub fn compile_file(input_path: &str, output_path: &str) -> Result<CompilationStats> {
    compile_file_with_options(input_path, output_path, CompilerOptions::default())
}

/// Compile with custom options
pub fn compile_file_with_options(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
) -> Result<CompilationStats> {
    let start_time = Instant::now();

    if options.debug_mode {
        log::info!("{} v{}", NAME, VERSION);
        log::info!("Compiling '{}' to '{}'...", input_path, output_path);
        log::debug!("Compiler options: {:?}", options);
    }

    if !Path::new(input_path).is_file() {
        return Err(CompilerError::file_not_found(input_path));
    }

    // Tables must load before a single line is compiled
    let tables = KeyTables::load(&options.resource_dir, &options.layout)?;

    let source = fs::read_to_string(input_path)
        .map_err(|e| CompilerError::file_not_found(format!("{}: {}", input_path, e)))?;

    let compilation = compile_source_with_options(&source, &tables, &options);

    fs::write(output_path, &compilation.bytes)?;

    let mut stats = CompilationStats::from_compilation(&compilation, source.len() as u64);
    stats.compile_time_ms = start_time.elapsed().as_millis() as u64;

    if options.debug_mode {
        log::info!("Compilation finished");
        log::info!("Source size: {} bytes", stats.source_size);
        log::info!("Output size: {} bytes", stats.output_size);
        log::info!("Compile time: {}ms", stats.compile_time_ms);
        log::debug!("Full stats: {:?}", stats);
    }

    if stats.failed_lines > 0 {
        log::warn!(
            "{} of {} lines failed to compile",
            stats.failed_lines,
            stats.line_count
        );
    }

    Ok(stats)
}

/// Compile script text with default options. Never fails; see
/// [`Compilation::diagnostics`] for what went wrong.
pub fn compile_source(source: &str, tables: &KeyTables) -> Compilation {
    compile_source_with_options(source, tables, &CompilerOptions::default())
}

/// Compile script text with custom options
pub fn compile_source_with_options(
    source: &str,
    tables: &KeyTables,
    options: &CompilerOptions,
) -> Compilation {
    if options.debug_mode {
        log::debug!("Source length: {} characters", source.len());
        log::debug!("Layout: {}", tables.layout());
    }

    Interpreter::new(tables)
        .with_default_delay(options.default_delay)
        .run(source)
}
