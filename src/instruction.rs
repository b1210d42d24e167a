//! Line classification and instruction decoding

use crate::error::LineError;

pub const COMMENT_PREFIX: &str = "//";

/// Largest count a single `REPEAT` line may ask for.
pub const MAX_REPEAT: u32 = 65_535;

/// A keyword with an optional single-string argument: the line split once on
/// the first space, both halves trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub keyword: String,
    pub argument: Option<String>,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_start();
        let (keyword, argument) = match line.split_once(' ') {
            Some((keyword, rest)) => (keyword, Some(rest.trim())),
            None => (line, None),
        };
        Self {
            keyword: keyword.trim().to_string(),
            argument: argument.filter(|arg| !arg.is_empty()).map(str::to_string),
        }
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    fn required_argument(&self) -> Result<&str, LineError> {
        self.argument()
            .ok_or_else(|| LineError::missing_argument(&self.keyword))
    }

    fn integer_argument(&self) -> Result<i64, LineError> {
        let arg = self.required_argument()?;
        arg.parse()
            .map_err(|_| LineError::invalid_number(&self.keyword, arg))
    }

    /// Milliseconds for `DELAY` and `DEFAULT_DELAY`. Negative values mean no delay.
    fn delay_argument(&self) -> Result<u32, LineError> {
        let ms = self.integer_argument()?.max(0);
        u32::try_from(ms).map_err(|_| LineError::invalid_number(&self.keyword, ms.to_string()))
    }
}

/// What a raw script line is, before anything is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Blank,
    Comment,
    Rem,
    Repeat(Command),
    Command(Command),
}

impl Line {
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if trimmed.is_empty() {
            return Line::Blank;
        }
        if trimmed.starts_with(COMMENT_PREFIX) {
            return Line::Comment;
        }

        let command = Command::parse(trimmed);
        match command.keyword.as_str() {
            "REM" => Line::Rem,
            "REPEAT" => Line::Repeat(command),
            _ => Line::Command(command),
        }
    }

    /// Number of repetitions a `REPEAT` command asks for.
    pub fn repeat_count(command: &Command) -> Result<u32, LineError> {
        let count = command.integer_argument()?;
        if count < 0 {
            return Err(LineError::invalid_number(&command.keyword, count.to_string()));
        }
        match u32::try_from(count) {
            Ok(count) if count <= MAX_REPEAT => Ok(count),
            _ => Err(LineError::RepeatOutOfRange { count }),
        }
    }
}

/// Key pressed when a chord instruction is given no argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bare {
    /// Emit nothing.
    Nothing,
    /// Press `key` (a base table name) while holding `modifiers`.
    Press {
        key: &'static str,
        modifiers: &'static [&'static str],
    },
}

/// A modifier instruction: `CTRL`, `ALT-SHIFT`, `GUI` and friends.
///
/// With an argument the argument is resolved as a mnemonic and paired with
/// the OR of `modifiers`. Without one, `bare` decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    pub keywords: &'static [&'static str],
    pub modifiers: &'static [&'static str],
    pub bare: Bare,
    /// `false` for chords that only exist bare. Given an argument they emit nothing.
    pub takes_key: bool,
}

pub const CHORDS: &[Chord] = &[
    Chord {
        keywords: &["CONTROL", "CTRL"],
        modifiers: &["MODIFIERKEY_CTRL"],
        bare: Bare::Press { key: "KEY_LEFT_CTRL", modifiers: &[] },
        takes_key: true,
    },
    Chord {
        keywords: &["ALT"],
        modifiers: &["MODIFIERKEY_ALT"],
        bare: Bare::Press { key: "KEY_LEFT_ALT", modifiers: &[] },
        takes_key: true,
    },
    Chord {
        keywords: &["SHIFT"],
        modifiers: &["MODIFIERKEY_SHIFT"],
        bare: Bare::Press { key: "KEY_LEFT_SHIFT", modifiers: &[] },
        takes_key: true,
    },
    Chord {
        keywords: &["CTRL-ALT"],
        modifiers: &["MODIFIERKEY_CTRL", "MODIFIERKEY_ALT"],
        bare: Bare::Nothing,
        takes_key: true,
    },
    Chord {
        keywords: &["CTRL-SHIFT"],
        modifiers: &["MODIFIERKEY_CTRL", "MODIFIERKEY_SHIFT"],
        bare: Bare::Nothing,
        takes_key: true,
    },
    Chord {
        keywords: &["COMMAND-OPTION"],
        modifiers: &["MODIFIERKEY_LEFT_GUI", "MODIFIERKEY_ALT"],
        bare: Bare::Nothing,
        takes_key: true,
    },
    Chord {
        keywords: &["ALT-SHIFT"],
        modifiers: &["MODIFIERKEY_LEFT_ALT", "MODIFIERKEY_SHIFT"],
        bare: Bare::Press {
            key: "KEY_LEFT_ALT",
            modifiers: &["MODIFIERKEY_LEFT_ALT", "MODIFIERKEY_SHIFT"],
        },
        takes_key: true,
    },
    Chord {
        keywords: &["ALT-TAB"],
        modifiers: &["MODIFIERKEY_LEFT_ALT"],
        bare: Bare::Press { key: "KEY_TAB", modifiers: &["MODIFIERKEY_LEFT_ALT"] },
        takes_key: false,
    },
    Chord {
        keywords: &["WINDOWS", "GUI"],
        modifiers: &["MODIFIERKEY_LEFT_GUI"],
        bare: Bare::Press { key: "MODIFIERKEY_LEFT_GUI", modifiers: &[] },
        takes_key: true,
    },
    Chord {
        keywords: &["COMMAND"],
        modifiers: &["MODIFIERKEY_LEFT_GUI"],
        bare: Bare::Press { key: "KEY_COMMAND", modifiers: &[] },
        takes_key: true,
    },
];

impl Chord {
    pub fn find(keyword: &str) -> Option<&'static Chord> {
        CHORDS.iter().find(|chord| chord.keywords.contains(&keyword))
    }

    pub fn name(&self) -> &'static str {
        self.keywords[0]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    DefaultDelay(u32),
    Delay(u32),
    /// Type text. `STRING` with no argument types nothing.
    String(String),
    Chord {
        chord: &'static Chord,
        key: Option<String>,
    },
    /// Press a single key named by mnemonic.
    Key(String),
}

impl Instruction {
    pub fn decode(command: &Command) -> Result<Self, LineError> {
        let instruction = match command.keyword.as_str() {
            "DEFAULT_DELAY" | "DEFAULTDELAY" => Instruction::DefaultDelay(command.delay_argument()?),
            "DELAY" => Instruction::Delay(command.delay_argument()?),
            "STRING" => Instruction::String(command.argument().unwrap_or_default().to_string()),
            keyword => match Chord::find(keyword) {
                Some(chord) => Instruction::Chord {
                    chord,
                    key: command.argument.clone(),
                },
                None => Instruction::Key(keyword.to_string()),
            },
        };
        Ok(instruction)
    }

    /// Whether executing this instruction suppresses the trailing default delay.
    pub fn overrides_delay(&self) -> bool {
        matches!(self, Instruction::DefaultDelay(_) | Instruction::Delay(_))
    }
}
