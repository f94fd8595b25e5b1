// ABOUTME: Driver: command line, log setup, and the interactive loop

use clap::Parser;
use nanolisp::config::{self, HISTORY_FILE, WELCOME_MESSAGE, WELCOME_SUBTITLE};
use nanolisp::error::Error;
use nanolisp::interp::Interpreter;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;

/// An embeddable Scheme-flavored Lisp interpreter
#[derive(Parser, Debug)]
#[command(name = "nanolisp")]
#[command(version = config::VERSION)]
#[command(about = "A Scheme-flavored Lisp with a fixed-capacity cell heap")]
struct CliArgs {
    /// Log threshold (NOTSET DEBUG_DEEP DEBUG_MID DEBUG INFO WARNING ERROR CRITICAL)
    #[arg(short = 'l', value_name = "LEVEL", default_value = "ERROR")]
    log_level: String,

    /// Evaluate EXPR, print the result, and exit
    #[arg(short = 'e', value_name = "EXPR")]
    expr: Option<String>,
}

/// Maps the interpreter's log level names onto tracing's filter levels.
fn level_filter_for(name: &str) -> LevelFilter {
    match name.to_ascii_uppercase().as_str() {
        "NOTSET" | "DEBUG_DEEP" => LevelFilter::TRACE,
        "DEBUG_MID" | "DEBUG" => LevelFilter::DEBUG,
        "INFO" => LevelFilter::INFO,
        "WARNING" => LevelFilter::WARN,
        "ERROR" | "CRITICAL" => LevelFilter::ERROR,
        _ => LevelFilter::ERROR,
    }
}

fn heap_stats(interp: &Interpreter) -> String {
    format!(
        "heap size: {}, allocated: {}, remaining: {}",
        interp.heap.total_cells(),
        interp.heap.cells_allocated(),
        interp.heap.cells_remaining()
    )
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    tracing_subscriber::fmt()
        .with_max_level(level_filter_for(&args.log_level))
        .with_target(false)
        .init();
    info!("Initializing");

    let mut interp = match Interpreter::new() {
        Ok(interp) => interp,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match args.expr {
        Some(expr) => run_expression(&mut interp, &expr),
        None => run_repl(&mut interp),
    }
}

/// `-e` mode: evaluate one source string, print the result to stdout,
/// report errors on the log stream.
fn run_expression(interp: &mut Interpreter, expr: &str) -> ExitCode {
    debug!("{}", heap_stats(interp));
    match interp.parse_and_eval_all(expr) {
        Ok(result) => {
            println!("{}", interp.heap.to_string(result));
            interp.release_transient(result);
            debug!("{}", heap_stats(interp));
            ExitCode::SUCCESS
        }
        Err(Error::OutOfMemory) => {
            error!("{}", Error::OutOfMemory);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::SUCCESS
        }
    }
}

/// Interactive mode: one expression per line, `==> RESULT`, exit on
/// `(quit)`. History persists across sessions.
fn run_repl(interp: &mut Interpreter) -> ExitCode {
    let rl_config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<(), DefaultHistory> = match Editor::with_config(rl_config) {
        Ok(rl) => rl,
        Err(e) => {
            error!("Failed to initialize line reader: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _ = rl.load_history(HISTORY_FILE);

    println!("\n{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);
    println!("{}\n", heap_stats(interp));

    let mut exit_code = ExitCode::SUCCESS;
    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "(quit)" {
                    break;
                }
                match interp.parse_and_eval_all(line) {
                    Ok(result) => {
                        println!("==> {}", interp.heap.to_string(result));
                        if let Some(r) = result {
                            debug!("{}", interp.heap.dump_node(r));
                        }
                        interp.release_transient(result);
                        debug!("{}", heap_stats(interp));
                    }
                    Err(Error::OutOfMemory) => {
                        // Nothing sensible can run on an exhausted heap.
                        error!("{}", Error::OutOfMemory);
                        exit_code = ExitCode::FAILURE;
                        break;
                    }
                    Err(e) => {
                        println!("ERROR: {e}");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                continue;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(e) => {
                error!("{e}");
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
    exit_code
}
