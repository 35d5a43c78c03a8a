//! bracken is a tree-walking interpreter for a small bracket-delimited
//! command language: every construct is a command invocation, commands are
//! first-class values, and containers are shared by reference count with an
//! explicit clone-before-mutate discipline.
//!
//! ```
//! use bracken::Interpreter;
//!
//! let mut interp = Interpreter::new();
//! let output = interp.run("[let! $x 20; echo [+ $x 22]]").unwrap();
//! assert_eq!(output, "42");
//! ```

pub mod ast;
pub mod builtins;
pub mod env;
pub mod hashtable;
pub mod interpreter;
pub mod parser;
pub mod repl;
mod trace;
pub mod value;

pub use ast::{Ast, AstKind, Pos};
pub use builtins::default_env;
pub use env::Env;
pub use interpreter::{evaluate, Interpreter};
pub use parser::parse;
pub use repl::run_repl;
pub use value::{RuntimeError, Signal, Value};
