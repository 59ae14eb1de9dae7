// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>
mod context;
mod expr;
mod io;
mod parse;
mod serialize;
mod solve;
mod system;
mod traversal;

pub use context::{Context, ExprRef, StringRef};
pub use expr::{BooleanExpr, ForEachChild};
pub use io::{load, load_from, save, save_to, BES_MARKER, BES_VERSION};
pub use parse::parse_str;
pub use serialize::SerializableIrNode;
pub use solve::{replace_variable, simplify, solve};
pub use system::{
    collect_variables, BooleanEquation, BooleanEquationSystem, BooleanVariable, FixpointSymbol,
};
pub use traversal::{bottom_up, transform_expr};

/// Errors produced when loading, saving or solving an equation system.
#[derive(Debug, thiserror::Error)]
pub enum BesError {
    #[error("error accessing equation system in {origin} ({err})")]
    Io {
        origin: String,
        err: std::io::Error,
    },
    #[error("failed to parse equation system from {origin}:\n{diagnostics}")]
    Parse { origin: String, diagnostics: String },
    #[error("{origin} does not contain a valid equation system: {msg}")]
    Format { origin: String, msg: String },
    #[error("the equation system is not closed: variable {name} is unbound")]
    NotClosed { name: String },
    #[error("the equation system did not reduce to a constant: {expr}")]
    NotConstant { expr: String },
}
