// FILE: src/cli/handlers.rs
use crate::{
    cli::ReportFormat, compile_file_with_options, CompilationStats, CompilerError,
    CompilerOptions, Result,
};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::Instant;

/// Bytes per row of the `--dump` listing.
const DUMP_ROW: usize = 16;

// --- COMPILE ---
pub fn handle_compile_command(cli: &super::DuckyCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = matches
        .get_one::<String>("input")
        .ok_or_else(|| CompilerError::InvalidFormat {
            message: "No input file given".to_string(),
        })?;

    if !Path::new(input_path).exists() {
        return Err(CompilerError::file_not_found(format!(
            "input file '{}' does not exist",
            input_path
        )));
    }

    let output_path = cli.output_path(matches);
    let options = cli.build_compiler_options(matches);

    if matches.get_flag("watch") {
        watch_and_compile(input_path, &output_path, options)
    } else {
        compile_single_file(input_path, &output_path, options, matches)
    }
}

fn compile_single_file(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
    matches: &clap::ArgMatches,
) -> Result<()> {
    println!("🔨 Compiling {} -> {} (layout: {})", input_path, output_path, options.layout);

    let compile_start = Instant::now();
    let stats = compile_file_with_options(input_path, output_path, options)?;
    let compile_time = compile_start.elapsed();

    if stats.failed_lines > 0 {
        println!("⚠️  Compiled with {} failed line(s)", stats.failed_lines);
    } else {
        println!("✅ Compilation successful!");
    }
    println!("   Output: {} bytes", stats.output_size);
    println!("   Time: {:.2}ms", compile_time.as_millis());

    if matches.get_flag("stats") {
        let format = matches
            .get_one::<ReportFormat>("format")
            .copied()
            .unwrap_or(ReportFormat::Text);
        print_stats(&stats, format)?;
    }

    if matches.get_flag("dump") {
        let data = fs::read(output_path)?;
        print!("{}", hex_listing(&data));
    }

    Ok(())
}

fn watch_and_compile(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
) -> Result<()> {
    let script = Path::new(input_path);
    let watch_error = |e: notify::Error| {
        CompilerError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("cannot watch {}: {}", input_path, e),
        ))
    };

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // The receiver only goes away when the loop below has ended.
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )
    .map_err(watch_error)?;
    watcher
        .watch(script, RecursiveMode::NonRecursive)
        .map_err(watch_error)?;

    println!("👀 Watching {} (layout: {}, Ctrl-C to stop)", input_path, options.layout);
    let mut last_source = fs::read(script).ok();
    recompile(input_path, output_path, &options);

    for res in rx {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Watcher error: {}", e);
                continue;
            }
        };
        if !touches_script(&event, script) {
            continue;
        }

        // Editors often emit several events per save.
        let source = fs::read(script).ok();
        if source.is_none() || source == last_source {
            continue;
        }
        last_source = source;
        recompile(input_path, output_path, &options);
    }

    Ok(())
}

fn touches_script(event: &Event, script: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event.paths.iter().any(|path| path.file_name() == script.file_name())
}

fn recompile(input_path: &str, output_path: &str, options: &CompilerOptions) {
    match compile_file_with_options(input_path, output_path, options.clone()) {
        Ok(stats) if stats.failed_lines > 0 => println!("⚠️  {} -> {}", output_path, summary(&stats)),
        Ok(stats) => println!("✅ {} -> {}", output_path, summary(&stats)),
        Err(e) => eprintln!("❌ {}: {}", input_path, e),
    }
}

/// One-line outcome of a compile, e.g. `18 bytes, 1 failed line, 2 missing keys`.
fn summary(stats: &CompilationStats) -> String {
    fn plural(n: u64, what: &str) -> String {
        format!("{} {}{}", n, what, if n == 1 { "" } else { "s" })
    }
    format!(
        "{}, {}, {}",
        plural(stats.output_size, "byte"),
        plural(stats.failed_lines as u64, "failed line"),
        plural(stats.warning_count as u64, "missing key")
    )
}

fn print_stats(stats: &CompilationStats, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(stats).map_err(|e| {
                CompilerError::InvalidFormat {
                    message: format!("JSON serialization error: {}", e),
                }
            })?;
            println!("{}", json);
        }
        ReportFormat::Text => {
            println!("\n📊 Compilation Statistics:");
            println!("   Source size:   {} bytes", stats.source_size);
            println!("   Output size:   {} bytes", stats.output_size);
            println!("   Lines:         {}", stats.line_count);
            println!("   Instructions:  {}", stats.instruction_count);
            println!("   Failed lines:  {}", stats.failed_lines);
            println!("   Missing keys:  {}", stats.warning_count);
            println!("   Compile time:  {}ms", stats.compile_time_ms);
        }
    }
    Ok(())
}

/// Offset-prefixed listing, one instruction word (two bytes) per column.
fn hex_listing(data: &[u8]) -> String {
    let mut listing = String::new();
    for (row, chunk) in data.chunks(DUMP_ROW).enumerate() {
        let words: Vec<String> = chunk.chunks(2).map(hex::encode_upper).collect();
        listing.push_str(&format!("{:08X}  {}\n", row * DUMP_ROW, words.join(" ")));
    }
    listing
}
