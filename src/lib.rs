//! Three-address code generation.
//!
//! Takes a program that has already been parsed, name resolved and type
//! checked ([`frontend::ast`]) and lowers it into a flat sequence of quads per
//! procedure ([`middle::tac`]). The resulting [`middle::tac::Program`] is what
//! code generation consumes, and its [`Display`](core::fmt::Display) impl is
//! the textual form used when debugging the compiler.

pub mod error;
pub mod frontend;
pub mod index;
pub mod middle;

pub use error::{LoweringError, Violation};
pub use middle::tac::{Program, ast_lowering::lower_program, pretty_print::pretty_print_program};
