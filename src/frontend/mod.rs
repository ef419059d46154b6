//! What the front end hands to code generation: the analyzed AST and the
//! symbols and types attached to it.

pub mod ast;
pub mod intern;
pub mod symbol;
