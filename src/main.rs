//! Ducky Script Compiler Binary

use duckyc::{CompilerError, DuckyCli};
use std::process;

fn main() {
    let mut cli = DuckyCli::new();

    match cli.run() {
        Ok(()) => {}
        Err(CompilerError::Io(e)) => {
            eprintln!("IO Error: {}", e);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Compilation failed: {}", e);
            process::exit(1);
        }
    }
}
