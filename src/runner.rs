use crate::ast::Program;
use crate::error::MythError;
use crate::evaluator::{Evaluator, ReturnPropagation};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::runtime::{Context, SimpleContext};
use crate::value::{Closure, Value};
use std::io::{self, Write};
use tracing::debug;

/// Settings the driver passes down to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Shown in diagnostics; `None` renders as `<input>`.
    pub filename: Option<String>,
    pub return_propagation: ReturnPropagation,
    /// Print the token stream instead of running the program.
    pub dump_tokens: bool,
}

pub fn parse(source: &str) -> Result<Program, MythError> {
    let lexer = Lexer::new(source)?;
    let mut parser = Parser::new(lexer);
    parser.parse()
}

/// Lexes, parses and evaluates `source` against `context`, returning the
/// program's final value.
pub fn execute(
    source: &str,
    return_propagation: ReturnPropagation,
    context: &mut dyn Context,
) -> Result<Value, MythError> {
    let program = parse(source)?;
    debug!(statements = program.statements.len(), "parsed program");

    let mut closure = Closure::new();
    Evaluator::new(context)
        .with_return_propagation(return_propagation)
        .evaluate_program(&program, &mut closure)
}

/// Runs `source`, printing program output to stdout and diagnostics to
/// stderr. Returns whether the run succeeded.
pub fn run(source: &str, options: &RunOptions) -> bool {
    let filename = options.filename.as_deref();

    if options.dump_tokens {
        return dump_tokens(source, filename);
    }

    let mut context = SimpleContext::new(io::stdout().lock());
    let result = execute(source, options.return_propagation, &mut context);
    if let Err(error) = context.into_inner().flush() {
        eprintln!("Error flushing output: {}", error);
    }

    match result {
        Ok(_) => true,
        Err(error) => {
            error.report(source, filename);
            false
        }
    }
}

fn dump_tokens(source: &str, filename: Option<&str>) -> bool {
    match Lexer::tokenize(source) {
        Ok(tokens) => {
            for token in tokens {
                println!("{}", token);
            }
            true
        }
        Err(error) => {
            error.report(source, filename);
            false
        }
    }
}
