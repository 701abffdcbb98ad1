use clap::{Arg, ArgAction, Command};
use myth::evaluator::ReturnPropagation;
use myth::runner::{self, RunOptions};
use std::fs;
use std::path::Path;

fn main() {
    init_tracing();

    let matches = Command::new("myth")
        .about("An indentation-sensitive scripting language interpreter")
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("structured-returns")
                .long("structured-returns")
                .help("Let `return` unwind through any nesting depth")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tokens")
                .long("tokens")
                .help("Print the token stream instead of running the script")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let Some(file_path) = matches.get_one::<String>("file") else {
        eprintln!("Error: no script file given");
        std::process::exit(2);
    };

    let return_propagation = if matches.get_flag("structured-returns") {
        ReturnPropagation::Structured
    } else {
        ReturnPropagation::DirectChildren
    };

    let options = RunOptions {
        filename: Some(file_path.clone()),
        return_propagation,
        dump_tokens: matches.get_flag("tokens"),
    };

    run_file(file_path, &options);
}

/// Logging is off unless `RUST_LOG` is set, e.g. `RUST_LOG=myth=debug`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_file(path: &str, options: &RunOptions) {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        std::process::exit(1);
    }

    match fs::read_to_string(path) {
        Ok(source) => {
            if !runner::run(&source, options) {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}
