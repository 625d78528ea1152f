//! Script surface: tokenizer, interpreter stack, operator registry and
//! the run loop.
//!
//! The script layer owns everything the VM core does not: token
//! classification, the dynamically typed stack, the sticky sample
//! configuration, and the dispatch from operation tokens to VM entry
//! points. The VM itself never sees script state; the `sample` operator
//! marshals the sticky configuration into a fresh parameter block per
//! call.

pub mod lexer;
pub mod stack;

mod interp;
mod ops;

pub use interp::Interpreter;
pub use lexer::{Header, Token, Tokenizer};
pub use ops::SampleConfig;
pub use stack::{Cell, DEFAULT_DEPTH, Stack};
