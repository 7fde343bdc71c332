// Splom DSL Parser Module

pub mod ast;
pub mod expr;
pub mod lexer;
pub mod pipeline;

// Public API re-exports
pub use ast::{Axis, Expr, Modifier, Program};
pub use pipeline::parse_program;
