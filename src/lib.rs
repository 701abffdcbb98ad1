// Myth Language Interpreter Library
//
// Core of a small indentation-sensitive scripting language with Python-like
// syntax: an indentation-aware lexer and a tree-walking evaluator over a
// class/instance object model.

// Public modules
pub mod ast;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod runner;
pub mod runtime;
pub mod token;
pub mod value;

// Re-export commonly used items
pub use ast::{Program, Stmt};
pub use error::{ErrorKind, MythError, Span};
pub use evaluator::{Evaluator, Flow, ReturnPropagation};
pub use lexer::Lexer;
pub use parser::Parser;
pub use runtime::{Comparator, Context, NullContext, SimpleContext};
pub use token::{Token, TokenKind};
pub use value::{Class, Closure, Instance, Method, Value};

// Re-export main functions
pub use runner::{execute, run, RunOptions};
