//! Intermediate representations. The AST is flattened into three-address
//! code here before being handed to a back end.

pub mod tac;
