//! Symbols and data types produced by name and type analysis. Lowering only
//! reads these; it never creates or mutates a symbol.

use std::rc::Rc;

use crate::{
    frontend::intern::InternedSymbol,
    index::{IndexVec, simple_index},
};

simple_index! {
    /// Stable identity of one declaration. Two symbols with the same name in
    /// different scopes have different ids.
    pub struct SymbolId;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Bool,
    String,
    Void,
    Function {
        parameters: Vec<DataType>,
        return_type: Box<DataType>,
    },
}

impl DataType {
    /// Width in bytes of a value of this type once it lives in an operand
    pub fn width(&self) -> usize {
        match self {
            DataType::Void => 0,
            DataType::Int | DataType::Bool | DataType::String | DataType::Function { .. } => 8,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, DataType::Void)
    }

    pub fn function(parameters: Vec<DataType>, return_type: DataType) -> Self {
        DataType::Function {
            parameters,
            return_type: Box::new(return_type),
        }
    }

    pub fn return_type(&self) -> Option<&DataType> {
        match self {
            DataType::Function { return_type, .. } => Some(return_type),
            _ => None,
        }
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Int => write!(f, "int"),
            DataType::Bool => write!(f, "bool"),
            DataType::String => write!(f, "immutable string"),
            DataType::Void => write!(f, "void"),
            DataType::Function {
                parameters,
                return_type,
            } => {
                write!(f, "(")?;
                for (i, parameter) in parameters.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{parameter}")?;
                }
                write!(f, ") -> {return_type}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: InternedSymbol,
    pub ty: DataType,
}

/// Hands out symbols with fresh identities, the way name analysis does while
/// walking declarations.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: IndexVec<SymbolId, Rc<Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, ty: DataType) -> Rc<Symbol> {
        let symbol = Rc::new(Symbol {
            id: self.symbols.next_index(),
            name: InternedSymbol::new(name),
            ty,
        });

        self.symbols.push(symbol.clone());
        symbol
    }

    pub fn get(&self, id: SymbolId) -> Option<&Rc<Symbol>> {
        self.symbols.get(id)
    }
}
