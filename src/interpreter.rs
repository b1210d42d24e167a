//! The line interpreter.
//!
//! Scripts are executed one line at a time against an explicit
//! [`InterpreterState`]: the default delay and the last command (the target
//! of `REPEAT`) persist across lines, everything else is per line. A line
//! that fails is reported and abandoned; bytes already appended for it stay
//! in the output and the next line runs as usual.

use crate::delay::append_delay;
use crate::error::{Diagnostic, LineError};
use crate::instruction::{Bare, Chord, Command, Instruction, Line};
use crate::resolver::Resolver;
use crate::tables::KeyTables;

/// State carried from one line to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterState {
    /// Milliseconds appended after every line that does not set its own delay.
    pub default_delay: u32,
    /// Most recent non-`REPEAT` command. `REPEAT` lines never replace it.
    pub last_command: Option<Command>,
}

/// Outcome of one successfully processed line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineReport {
    /// Times the instruction body ran (the count of a `REPEAT`, else 1; 0 for skipped lines).
    pub executed: u32,
    /// Bytes appended, default delay included.
    pub bytes: usize,
    /// The line set or emitted its own delay, so no default delay followed it.
    pub delay_override: bool,
}

pub type LineResult = std::result::Result<LineReport, LineError>;

/// Result of compiling a whole script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compilation {
    pub bytes: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
    /// Lines in the script after line-ending normalization.
    pub line_count: usize,
    /// Instruction bodies executed, repeats included.
    pub instruction_count: usize,
}

impl Compilation {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

#[derive(Debug)]
pub struct Interpreter<'t> {
    resolver: Resolver<'t>,
    state: InterpreterState,
    output: Vec<u8>,
    diagnostics: Vec<Diagnostic>,
    instruction_count: usize,
}

impl<'t> Interpreter<'t> {
    pub fn new(tables: &'t KeyTables) -> Self {
        Self {
            resolver: Resolver::new(tables),
            state: InterpreterState::default(),
            output: Vec::new(),
            diagnostics: Vec::new(),
            instruction_count: 0,
        }
    }

    /// Start with a default delay already in effect.
    pub fn with_default_delay(mut self, ms: u32) -> Self {
        self.state.default_delay = ms;
        self
    }

    pub fn state(&self) -> &InterpreterState {
        &self.state
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Compile a whole script. Never fails; problems end up in the diagnostics.
    pub fn run(mut self, script: &str) -> Compilation {
        let script = script.replace('\r', "");
        let mut line_count = 0;

        for (index, raw) in script.split('\n').enumerate() {
            line_count += 1;
            let number = index + 1;
            if let Ok(report) = self.step(number, raw) {
                log::trace!("Line {}: {:?}", number, report);
            }
        }

        log::debug!(
            "Compiled {} lines into {} bytes ({} diagnostics)",
            line_count,
            self.output.len(),
            self.diagnostics.len()
        );

        Compilation {
            bytes: self.output,
            diagnostics: self.diagnostics,
            line_count,
            instruction_count: self.instruction_count,
        }
    }

    /// Process one line and record whatever it reported under `number`.
    pub fn step(&mut self, number: usize, raw: &str) -> LineResult {
        let result = self.run_line(raw);

        for message in self.resolver.take_warnings() {
            log::warn!("Line {}: {}", number, message);
            self.diagnostics.push(Diagnostic::warning(number, message));
        }
        if let Err(e) = &result {
            log::error!("Line {}: {}", number, e);
            self.diagnostics.push(Diagnostic::error(number, e));
        }
        result
    }

    fn run_line(&mut self, raw: &str) -> LineResult {
        let start = self.output.len();

        let (command, count) = match Line::classify(raw) {
            Line::Blank | Line::Comment => return Ok(LineReport::default()),
            Line::Rem => {
                return Ok(LineReport {
                    delay_override: true,
                    ..LineReport::default()
                })
            }
            Line::Repeat(repeat) => {
                let count = Line::repeat_count(&repeat)?;
                let target = self
                    .state
                    .last_command
                    .clone()
                    .ok_or(LineError::RepeatWithoutInstruction)?;
                (target, count)
            }
            Line::Command(command) => {
                self.state.last_command = Some(command.clone());
                (command, 1)
            }
        };

        let instruction = Instruction::decode(&command)?;
        log::debug!("{:?} x{}", instruction, count);

        for _ in 0..count {
            self.execute(&instruction)?;
            self.instruction_count += 1;
        }

        let delay_override = instruction.overrides_delay();
        if !delay_override {
            append_delay(&mut self.output, self.state.default_delay);
        }

        Ok(LineReport {
            executed: count,
            bytes: self.output.len() - start,
            delay_override,
        })
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<(), LineError> {
        match instruction {
            Instruction::DefaultDelay(ms) => self.state.default_delay = *ms,
            Instruction::Delay(ms) => append_delay(&mut self.output, *ms),
            Instruction::String(text) => self.type_text(text),
            Instruction::Chord { chord, key } => self.press_chord(chord, key.as_deref())?,
            Instruction::Key(word) => {
                let key = self.resolver.resolve_mnemonic(word)?;
                self.output.extend_from_slice(&[key, 0x00]);
            }
        }
        Ok(())
    }

    fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            let bytes = self.resolver.resolve_char(c);
            let odd = bytes.len() % 2 != 0;
            self.output.extend(bytes);
            if odd {
                self.output.push(0x00);
            }
        }
    }

    fn press_chord(&mut self, chord: &Chord, key: Option<&str>) -> Result<(), LineError> {
        if key.is_some() && !chord.takes_key {
            log::debug!("{} with an argument does nothing", chord.name());
            return Ok(());
        }

        let pair = match (key, chord.bare) {
            (Some(word), _) => [
                self.resolver.resolve_mnemonic(word)?,
                self.modifier_mask(chord.modifiers)?,
            ],
            (None, Bare::Press { key, modifiers }) => {
                [self.resolver.base_byte(key)?, self.modifier_mask(modifiers)?]
            }
            (None, Bare::Nothing) => {
                log::debug!("{} without a key does nothing", chord.name());
                return Ok(());
            }
        };
        self.output.extend_from_slice(&pair);
        Ok(())
    }

    fn modifier_mask(&self, names: &[&str]) -> Result<u8, LineError> {
        names
            .iter()
            .try_fold(0u8, |mask, name| Ok(mask | self.resolver.base_byte(name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use crate::tables::{Symbol, SymbolTable};

    fn us_tables() -> KeyTables {
        KeyTables::load(concat!(env!("CARGO_MANIFEST_DIR"), "/resources"), "us").unwrap()
    }

    fn compile(script: &str) -> Compilation {
        let tables = us_tables();
        Interpreter::new(&tables).run(script)
    }

    fn bytes(script: &str) -> Vec<u8> {
        let compilation = compile(script);
        assert!(
            compilation.diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            compilation.diagnostics
        );
        compilation.bytes
    }

    #[test]
    fn test_string_then_enter() {
        // H = KEY_H + shift, i = KEY_I padded, ENTER.
        assert_eq!(bytes("STRING Hi\nENTER"), vec![0x0B, 0x02, 0x0C, 0x00, 0x28, 0x00]);
    }

    #[test]
    fn test_default_delay_applies_after_following_lines() {
        assert_eq!(bytes("DEFAULT_DELAY 100\nENTER"), vec![0x28, 0x00, 0x00, 100]);
        assert_eq!(
            bytes("DEFAULTDELAY 300\nTAB"),
            vec![0x2B, 0x00, 0x00, 0xFF, 0x00, 45]
        );
    }

    #[test]
    fn test_delay_suppresses_default_delay() {
        assert_eq!(bytes("DEFAULT_DELAY 10\nDELAY 300"), vec![0x00, 0xFF, 0x00, 45]);
    }

    #[test]
    fn test_comments_blanks_and_rem_emit_nothing() {
        assert_eq!(
            bytes("DEFAULT_DELAY 10\n// comment\n\nREM note\n   \nENTER"),
            vec![0x28, 0x00, 0x00, 10]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        assert_eq!(bytes("ENTER\r\nTAB\r\n"), vec![0x28, 0x00, 0x2B, 0x00]);
    }

    #[test]
    fn test_repeat_runs_previous_instruction_n_times() {
        let out = bytes("ENTER\nREPEAT 3");
        assert_eq!(out, [0x28, 0x00].repeat(4));
    }

    #[test]
    fn test_repeat_applies_default_delay_once() {
        let out = bytes("DEFAULT_DELAY 5\nTAB\nREPEAT 2");
        assert_eq!(
            out,
            vec![0x2B, 0x00, 0x00, 5, 0x2B, 0x00, 0x2B, 0x00, 0x00, 5]
        );
    }

    #[test]
    fn test_repeat_does_not_replace_its_target() {
        let out = bytes("TAB\nREPEAT 1\nREPEAT 2");
        assert_eq!(out, [0x2B, 0x00].repeat(4));
    }

    #[test]
    fn test_repeat_skips_comments_and_rem() {
        let out = bytes("ENTER\n// no-op\nREM no-op\nREPEAT 1");
        assert_eq!(out, [0x28, 0x00].repeat(2));
    }

    #[test]
    fn test_repeat_zero_executes_nothing() {
        assert_eq!(bytes("ENTER\nREPEAT 0"), vec![0x28, 0x00]);
    }

    #[test]
    fn test_repeat_delay() {
        assert_eq!(bytes("DELAY 10\nREPEAT 2"), [0x00, 10].repeat(3));
    }

    #[test]
    fn test_repeat_as_first_line_fails() {
        let compilation = compile("REPEAT 2\nENTER");
        assert_eq!(compilation.bytes, vec![0x28, 0x00]);

        let errors: Vec<_> = compilation.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[0].message, LineError::RepeatWithoutInstruction.to_string());
    }

    #[test]
    fn test_invalid_numbers_are_line_failures() {
        let compilation = compile("DELAY soon\nREPEAT x\nENTER");
        assert_eq!(compilation.bytes, vec![0x28, 0x00]);
        let lines: Vec<usize> = compilation.errors().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn test_repeating_a_failed_line_fails_again() {
        let compilation = compile("DELAY soon\nREPEAT 2");
        assert!(compilation.bytes.is_empty());
        let lines: Vec<usize> = compilation.errors().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn test_modifier_chords_with_key() {
        assert_eq!(bytes("CTRL c"), vec![0x06, 0x01]);
        assert_eq!(bytes("CONTROL c"), vec![0x06, 0x01]);
        assert_eq!(bytes("ALT F4"), vec![0x3D, 0x04]);
        assert_eq!(bytes("SHIFT TAB"), vec![0x2B, 0x02]);
        assert_eq!(bytes("CTRL-ALT DELETE"), vec![0x4C, 0x05]);
        assert_eq!(bytes("CTRL-SHIFT ESC"), vec![0x29, 0x03]);
        assert_eq!(bytes("COMMAND-OPTION ESCAPE"), vec![0x29, 0x0C]);
        assert_eq!(bytes("ALT-SHIFT a"), vec![0x04, 0x06]);
        assert_eq!(bytes("GUI r"), vec![0x15, 0x08]);
        assert_eq!(bytes("WINDOWS r"), vec![0x15, 0x08]);
        assert_eq!(bytes("COMMAND SPACE"), vec![0x2C, 0x08]);
    }

    #[test]
    fn test_modifier_chords_bare() {
        assert_eq!(bytes("CTRL"), vec![0xE0, 0x00]);
        assert_eq!(bytes("ALT"), vec![0xE2, 0x00]);
        assert_eq!(bytes("SHIFT"), vec![0xE1, 0x00]);
        assert_eq!(bytes("ALT-SHIFT"), vec![0xE2, 0x06]);
        assert_eq!(bytes("ALT-TAB"), vec![0x2B, 0x04]);
        assert_eq!(bytes("GUI"), vec![0x08, 0x00]);
        assert_eq!(bytes("COMMAND"), vec![0xE3, 0x00]);
        assert!(bytes("CTRL-ALT").is_empty());
        assert!(bytes("CTRL-SHIFT").is_empty());
        assert!(bytes("COMMAND-OPTION").is_empty());
    }

    #[test]
    fn test_alt_tab_with_argument_emits_nothing() {
        assert!(bytes("ALT-TAB 3").is_empty());
        assert_eq!(bytes("DEFAULT_DELAY 15\nALT-TAB 3"), vec![0x00, 15]);
    }

    #[test]
    fn test_chord_noop_still_gets_default_delay() {
        assert_eq!(bytes("DEFAULT_DELAY 20\nCTRL-ALT"), vec![0x00, 20]);
    }

    #[test]
    fn test_generic_mnemonics() {
        assert_eq!(bytes("ESCAPE"), vec![0x29, 0x00]);
        assert_eq!(bytes("DOWNARROW"), vec![0x51, 0x00]);
        assert_eq!(bytes("CAPSLOCK"), vec![0x39, 0x00]);
        assert_eq!(bytes("F12"), vec![0x45, 0x00]);
    }

    #[test]
    fn test_string_without_argument_is_empty() {
        assert!(bytes("STRING").is_empty());
    }

    #[test]
    fn test_unknown_character_is_padded_zero_with_warning() {
        let compilation = compile("STRING €\nENTER");
        assert_eq!(compilation.bytes, vec![0x00, 0x00, 0x28, 0x00]);
        assert!(!compilation.has_errors());

        let warnings: Vec<_> = compilation.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 1);
        assert_eq!(warnings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_mnemonic_falls_back_to_zero_and_continues() {
        let base = SymbolTable::new().with("KEY_ENTER", Symbol::Byte(0x28));
        let tables = KeyTables::new(base, SymbolTable::new(), "bare");
        let compilation = Interpreter::new(&tables).run("FOO\nENTER");

        assert_eq!(compilation.bytes, vec![0x00, 0x00, 0x28, 0x00]);
        assert!(!compilation.has_errors());
        assert_eq!(compilation.warnings().count(), 1);
    }

    #[test]
    fn test_missing_modifier_fails_line_only() {
        let base = SymbolTable::new()
            .with("KEY_ENTER", Symbol::Byte(0x28))
            .with("KEY_C", Symbol::Byte(0x06));
        let tables = KeyTables::new(base, SymbolTable::new(), "bare");
        let compilation = Interpreter::new(&tables).run("CTRL C\nENTER");

        assert_eq!(compilation.bytes, vec![0x28, 0x00]);
        let errors: Vec<_> = compilation.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            LineError::MissingSymbol { name: "MODIFIERKEY_CTRL".into() }.to_string()
        );
    }

    #[test]
    fn test_out_of_range_repeat_count() {
        let compilation = compile("ENTER\nREPEAT 99999999999");
        assert_eq!(compilation.bytes, vec![0x28, 0x00]);
        assert!(compilation.has_errors());
    }

    #[test]
    fn test_huge_repeat_fails_only_its_line() {
        let compilation = compile("ENTER\nREPEAT 4294967295\nTAB");
        assert_eq!(compilation.bytes, vec![0x28, 0x00, 0x2B, 0x00]);
        let errors: Vec<&Diagnostic> = compilation.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
        assert!(errors[0].message.contains("out of range"));
    }

    #[test]
    fn test_negative_default_delay_switches_delay_off() {
        assert_eq!(
            bytes("DEFAULT_DELAY 20\nENTER\nDEFAULT_DELAY -1\nENTER\nDELAY -5"),
            vec![0x28, 0x00, 0x00, 20, 0x28, 0x00]
        );
    }

    #[test]
    fn test_state_persists_across_steps() {
        let tables = us_tables();
        let mut interpreter = Interpreter::new(&tables);

        let report = interpreter.step(1, "DEFAULT_DELAY 50").unwrap();
        assert!(report.delay_override);
        assert_eq!(report.bytes, 0);
        assert_eq!(interpreter.state().default_delay, 50);

        let report = interpreter.step(2, "ENTER").unwrap();
        assert_eq!(report.executed, 1);
        assert_eq!(report.bytes, 4);
        assert_eq!(
            interpreter.state().last_command,
            Some(Command { keyword: "ENTER".into(), argument: None })
        );

        let report = interpreter.step(3, "REPEAT 2").unwrap();
        assert_eq!(report.executed, 2);
        assert_eq!(report.bytes, 6);
        assert_eq!(interpreter.output().len(), 10);
    }

    #[test]
    fn test_initial_default_delay() {
        let tables = us_tables();
        let compilation = Interpreter::new(&tables).with_default_delay(7).run("ENTER");
        assert_eq!(compilation.bytes, vec![0x28, 0x00, 0x00, 7]);
    }

    #[test]
    fn test_counts() {
        let compilation = compile("ENTER\nREPEAT 3\n// done\n");
        assert_eq!(compilation.line_count, 4);
        assert_eq!(compilation.instruction_count, 4);
    }

    #[test]
    fn test_empty_script() {
        let compilation = compile("");
        assert!(compilation.bytes.is_empty());
        assert!(compilation.diagnostics.is_empty());
    }
}
