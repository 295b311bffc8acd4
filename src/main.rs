use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use rayon::prelude::*;

use lamia_compiler::discovery::{collect_inputs, output_dir_for};
use lamia_compiler::{parse_source, tokenize, CompileOptions, Compiler, Diagnostic, Target};

/// Lamia compiler - turns .lamia sources into HTML5, JavaScript, TypeScript, CSS3 and C++
#[derive(Parser)]
#[command(name = "lamia")]
#[command(about = "Compile Lamia UI sources to web and native targets")]
struct Cli {
    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// More logging; repeat for debug output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a file, or every .lamia file under a directory
    Compile {
        input: PathBuf,

        #[arg(default_value = "./output")]
        output_dir: PathBuf,

        /// Targets to generate (html5, es6, es5, typescript, css3, native, wasm)
        #[arg(short, long = "target", value_delimiter = ',')]
        targets: Vec<String>,

        /// Config file; lamia.json next to the input is used otherwise
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not reuse or store cached outputs
        #[arg(long)]
        no_cache: bool,

        /// Also write <name>.purple.html documentation
        #[arg(long)]
        docs: bool,
    },
    /// Print diagnostics without generating code
    Check { input: PathBuf },
    /// Dump the token stream as JSON
    Tokens { input: PathBuf },
    /// Dump the syntax tree and diagnostics as JSON
    Ast { input: PathBuf },
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOGGING
// ═══════════════════════════════════════════════════════════════════════════════

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let level = record.level().to_string().to_lowercase();
            eprintln!("[lamia] {}: {}", level, record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(quiet: bool, verbose: u8) {
    let level = if quiet {
        log::LevelFilter::Error
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        }
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

fn print_diagnostic(path: &Path, diagnostic: &Diagnostic) {
    eprintln!("{}:{}", path.display(), diagnostic);
}

fn read_source(path: &Path) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading '{}': {}", path.display(), e);
        ExitCode::FAILURE
    })
}

fn resolve_options(
    input: &Path,
    targets: &[String],
    config: Option<PathBuf>,
    no_cache: bool,
    docs: bool,
) -> Result<CompileOptions, String> {
    let config = config.or_else(|| CompileOptions::discover(input));
    let mut options = match &config {
        Some(path) => {
            log::info!("Using config {}", path.display());
            CompileOptions::load(path).map_err(|e| e.to_string())?
        }
        None => CompileOptions::default(),
    };
    if !targets.is_empty() {
        options.targets = targets
            .iter()
            .map(|name| name.parse::<Target>().map_err(|e| e.to_string()))
            .collect::<Result<_, _>>()?;
    }
    if no_cache {
        options.cache = false;
    }
    if docs {
        options.generate_docs = true;
    }
    Ok(options)
}

fn run_compile(
    input: &Path,
    output_dir: &Path,
    options: CompileOptions,
    quiet: bool,
) -> ExitCode {
    if !input.exists() {
        eprintln!("Error: '{}' does not exist", input.display());
        return ExitCode::FAILURE;
    }
    let inputs = collect_inputs(input);
    if inputs.is_empty() {
        eprintln!("Error: no .lamia files found under '{}'", input.display());
        return ExitCode::FAILURE;
    }

    let compiler = Compiler::new(options);
    let outcomes: Vec<bool> = inputs
        .par_iter()
        .map(|file| {
            let destination = output_dir_for(input, file, output_dir);
            match compiler.compile_file(file, &destination, &print_diagnostic) {
                Ok(report) => {
                    for path in &report.written {
                        log::info!("Wrote {}", path.display());
                    }
                    for (_, error) in &report.failed {
                        eprintln!("Error: {}", error);
                    }
                    report.is_success()
                }
                Err(error) => {
                    eprintln!("Error: {}", error);
                    false
                }
            }
        })
        .collect();

    let succeeded = outcomes.iter().filter(|ok| **ok).count();
    if !quiet {
        println!(
            "Compiled {}/{} file(s) into {}",
            succeeded,
            outcomes.len(),
            output_dir.display()
        );
    }
    if succeeded == outcomes.len() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_check(input: &Path) -> ExitCode {
    let compiler = Compiler::new(CompileOptions::default());
    let mut failed = false;
    for file in collect_inputs(input) {
        let source = match read_source(&file) {
            Ok(source) => source,
            Err(_) => {
                failed = true;
                continue;
            }
        };
        let compilation = compiler.analyze(&source);
        for diagnostic in &compilation.diagnostics {
            print_diagnostic(&file, diagnostic);
        }
        failed |= compilation.has_errors() || compilation.root.is_none();
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Command::Compile {
            input,
            output_dir,
            targets,
            config,
            no_cache,
            docs,
        } => {
            let options = match resolve_options(&input, &targets, config, no_cache, docs) {
                Ok(options) => options,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            run_compile(&input, &output_dir, options, cli.quiet)
        }
        Command::Check { input } => run_check(&input),
        Command::Tokens { input } => match read_source(&input) {
            Ok(source) => print_json(&tokenize(&source)),
            Err(code) => code,
        },
        Command::Ast { input } => match read_source(&input) {
            Ok(source) => print_json(&parse_source(&source)),
            Err(code) => code,
        },
    }
}
