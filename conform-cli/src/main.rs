//! Command-line interface for conform
//!
//! Runs the conformance pipeline for every selected grammar and reports progress on stdout.
//!
//! Usage:
//!   conform [--langs `<keys>`] [--jython-dir `<dir>`] [--no-delete] [-q]   - Run the harness
//!   conform --list-grammars                                             - List known grammars
//!
//! Setting `JYTHONDIR` turns on the toolchain preflight; `GITHUB_WORKFLOW` selects the CI
//! IronPython launcher.

mod cli;

use clap::ArgMatches;
use conform::process::{Interrupt, SystemRunner};
use conform::progress::{Progress, Reporter};
use conform::registry::GrammarRegistry;
use conform::toolchain::{expand_home, home_dir};
use conform::{ConformError, Harness, RunOptions, RunSummary, Selection};
use conform_config::{ConformConfig, Loader};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 2;

#[tokio::main]
async fn main() {
    init_logging();
    let matches = cli::command().get_matches();

    let config = load_config(matches.get_one::<PathBuf>("config")).unwrap_or_else(|e| fail(&e));

    if matches.get_flag("list-grammars") {
        println!("Available grammars:");
        println!("{}", render_grammar_list(&config.registry()));
        return;
    }

    let options = run_options(&matches, &config).unwrap_or_else(|e| fail(&e));

    let interrupt = Interrupt::new();
    let watcher = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::debug!("interrupt received");
            watcher.trigger();
        }
    });

    let outcome = tokio::task::spawn_blocking(move || run(&config, &options, &interrupt)).await;
    match outcome {
        Ok(Ok(summary)) => log::debug!("tested: {}", summary.tested.join(", ")),
        Ok(Err(err)) => fail(&err),
        Err(err) => {
            eprintln!("Failed: {}.", err);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

fn run(
    config: &ConformConfig,
    options: &RunOptions,
    interrupt: &Interrupt,
) -> Result<RunSummary, ConformError> {
    let registry = config.registry();
    let harness = Harness::new(&registry, &config.toolchain, &config.workspace);
    harness.run(options, &mut SystemRunner, &mut ConsoleReporter, interrupt)
}

/// Prints every progress event on its own line
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: &Progress) {
        println!("{}", event);
    }
}

/// Defaults, then `~/.config/conform/conform.toml`, then `--config`.
fn load_config(path: Option<&PathBuf>) -> Result<ConformConfig, ConformError> {
    let mut loader = Loader::new().with_user_file();
    if let Some(path) = path {
        loader = loader.with_file(path);
    }
    loader
        .build()
        .map_err(|e| ConformError::Config(e.to_string()))
}

fn run_options(matches: &ArgMatches, config: &ConformConfig) -> Result<RunOptions, ConformError> {
    let jython_dir = match matches.get_one::<PathBuf>("jython-dir") {
        Some(dir) => expand_home(&dir.to_string_lossy()),
        None => expand_home(&config.toolchain.default_jython_dir),
    };
    let root = matches
        .get_one::<PathBuf>("root")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let project_root = std::env::current_dir()
        .map(|cwd| cwd.join(&root))
        .map_err(|e| ConformError::Io {
            context: "read current directory".to_string(),
            source: e,
        })?;
    let langs = matches
        .get_one::<String>("langs")
        .map(String::as_str)
        .unwrap_or("all");

    Ok(RunOptions {
        project_root,
        jython_dir,
        preflight: std::env::var_os("JYTHONDIR").is_some(),
        ci: std::env::var_os("GITHUB_WORKFLOW").is_some(),
        quiet: matches.get_flag("quiet"),
        retain: matches.get_flag("no-delete"),
        selection: Selection::parse(langs),
    })
}

fn render_grammar_list(registry: &GrammarRegistry) -> String {
    registry
        .list_all()
        .iter()
        .map(|g| format!("{:<12} {:<12} {}", g.key, g.name, g.production))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Log to `~/logs/conform.log` when that directory exists, otherwise follow `RUST_LOG`.
fn init_logging() {
    let log_dir = home_dir().map(|home| home.join("logs"));
    if let Some(dir) = log_dir.filter(|dir| dir.is_dir()) {
        if let Ok(file) = File::create(dir.join("conform.log")) {
            env_logger::Builder::new()
                .filter_level(log::LevelFilter::Debug)
                .format(|buf, record| writeln!(buf, "{}", record.args()))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
            return;
        }
    }
    env_logger::init();
}

fn fail(err: &ConformError) -> ! {
    let message = err.to_string();
    eprintln!("Failed: {}.", message.trim_end_matches('.'));
    let code = if err.is_interrupt() {
        EXIT_INTERRUPTED
    } else {
        EXIT_FAILURE
    };
    std::process::exit(code)
}
