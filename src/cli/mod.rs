// FILE: src/cli/mod.rs

mod config;
mod handlers;

pub use config::ConfigFile;

use crate::error::Result;
use crate::{CompilerOptions, DEFAULT_LAYOUT, DEFAULT_OUTPUT, DEFAULT_RESOURCE_DIR};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

pub struct DuckyCli {
    config: ConfigFile,
    start_time: Instant,
}

impl Default for DuckyCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DuckyCli {
    pub fn new() -> Self {
        Self {
            config: ConfigFile::default(),
            start_time: Instant::now(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let matches = build_cli().get_matches();
        self.run_matches(&matches)
    }

    /// Run with an explicit argument list (the first item is the program name).
    pub fn run_from<I, T>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = build_cli().get_matches_from(args);
        self.run_matches(&matches)
    }

    fn run_matches(&mut self, matches: &ArgMatches) -> Result<()> {
        self.start_time = Instant::now();

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        self.setup_logging(matches.get_count("verbose"));

        let result = handlers::handle_compile_command(self, matches);
        log::debug!("Finished in {}ms", self.start_time.elapsed().as_millis());
        result
    }

    fn setup_logging(&self, verbose_count: u8) {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        // A second init (e.g. repeated run_from calls) is harmless.
        let _ = env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .try_init();
    }

    /// Command line first, then the config file, then built-in defaults.
    pub fn build_compiler_options(&self, matches: &ArgMatches) -> CompilerOptions {
        let layout = matches
            .get_one::<String>("layout")
            .cloned()
            .or_else(|| self.config.layout.clone())
            .unwrap_or_else(|| DEFAULT_LAYOUT.to_string());

        let resource_dir = matches
            .get_one::<String>("resources")
            .cloned()
            .or_else(|| self.config.resources.clone())
            .unwrap_or_else(|| DEFAULT_RESOURCE_DIR.to_string());

        let default_delay = matches
            .get_one::<u32>("default-delay")
            .copied()
            .or(self.config.default_delay)
            .unwrap_or(0);

        CompilerOptions {
            debug_mode: matches.get_count("verbose") > 0,
            layout,
            resource_dir: PathBuf::from(resource_dir),
            default_delay,
        }
    }

    pub fn output_path(&self, matches: &ArgMatches) -> String {
        matches
            .get_one::<String>("output")
            .cloned()
            .or_else(|| self.config.output.clone())
            .unwrap_or_else(|| DEFAULT_OUTPUT.to_string())
    }
}

pub fn build_cli() -> Command {
    Command::new(crate::NAME)
        .version(crate::VERSION)
        .about(crate::DESCRIPTION)
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Ducky Script file")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file (default: inject.bin)"),
        )
        .arg(
            Arg::new("layout")
                .short('l')
                .long("layout")
                .value_name("NAME")
                .help("Keyboard layout: us, fr, ca, ... (default: us)"),
        )
        .arg(
            Arg::new("resources")
                .short('r')
                .long("resources")
                .value_name("DIR")
                .help("Directory with default.yml and layout tables (default: resources)"),
        )
        .arg(
            Arg::new("default-delay")
                .long("default-delay")
                .value_name("MS")
                .value_parser(clap::value_parser!(u32))
                .help("Default delay in effect before the script sets one"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (.json or .toml)")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase verbosity (can be used multiple times)")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .help("Show compilation statistics")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_parser(clap::value_parser!(ReportFormat))
                .default_value("text")
                .help("Statistics format"),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .help("Print a hex listing of the compiled output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("watch")
                .short('w')
                .long("watch")
                .help("Watch the script for changes and recompile")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_input_is_required() {
        let result = build_cli().try_get_matches_from(["duckyc", "-o", "out.bin"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let matches = build_cli()
            .try_get_matches_from(["duckyc", "-i", "payload.txt"])
            .unwrap();
        let cli = DuckyCli::new();
        let options = cli.build_compiler_options(&matches);

        assert_eq!(options.layout, "us");
        assert_eq!(options.resource_dir, PathBuf::from("resources"));
        assert_eq!(options.default_delay, 0);
        assert!(!options.debug_mode);
        assert_eq!(cli.output_path(&matches), "inject.bin");
        assert_eq!(matches.get_one::<ReportFormat>("format"), Some(&ReportFormat::Text));
    }

    #[test]
    fn test_command_line_wins_over_config() {
        let matches = build_cli()
            .try_get_matches_from([
                "duckyc", "--input", "payload.txt", "--layout", "fr", "-vv",
            ])
            .unwrap();
        let cli = DuckyCli {
            config: ConfigFile {
                layout: Some("de".into()),
                resources: Some("/opt/duckyc/layouts".into()),
                output: Some("payload.bin".into()),
                default_delay: Some(25),
            },
            start_time: Instant::now(),
        };
        let options = cli.build_compiler_options(&matches);

        assert_eq!(options.layout, "fr");
        assert_eq!(options.resource_dir, PathBuf::from("/opt/duckyc/layouts"));
        assert_eq!(options.default_delay, 25);
        assert!(options.debug_mode);
        assert_eq!(cli.output_path(&matches), "payload.bin");
    }

    #[test]
    fn test_run_from_compiles_script() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let input = temp_dir.path().join("payload.txt");
        let output = temp_dir.path().join("payload.bin");
        std::fs::write(&input, "ALT-TAB\nDELAY 20\n").unwrap();

        let resources = concat!(env!("CARGO_MANIFEST_DIR"), "/resources");
        DuckyCli::new()
            .run_from([
                "duckyc",
                "-i",
                input.to_str().unwrap(),
                "-o",
                output.to_str().unwrap(),
                "-r",
                resources,
            ])
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), vec![0x2B, 0x04, 0x00, 20]);
    }

    #[test]
    fn test_run_from_missing_input_fails() {
        let result = DuckyCli::new().run_from(["duckyc", "-i", "/nonexistent/payload.txt"]);
        assert!(matches!(result, Err(crate::CompilerError::FileNotFound { .. })));
    }

    #[test]
    fn test_invalid_default_delay_rejected() {
        let result = build_cli().try_get_matches_from([
            "duckyc", "-i", "payload.txt", "--default-delay", "-5",
        ]);
        assert!(result.is_err());
    }
}
