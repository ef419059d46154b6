//! The abstract syntax tree as it looks once name analysis has attached a
//! symbol to every identifier and type analysis has attached a type to every
//! expression. Lowering consumes this form and nothing earlier.

use std::rc::Rc;

use strum::EnumIter;

use crate::frontend::symbol::{DataType, Symbol};

#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Top level declarations in source order
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone)]
pub enum Declaration {
    Variable(VariableDeclaration),
    Function(Box<FunctionDeclaration>),
    /// Only ever produced by the grammar inside a function's parameter list
    Formal(FormalDeclaration),
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub name: Identifier,
}

#[derive(Debug, Clone)]
pub struct FormalDeclaration {
    pub name: Identifier,
}

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub name: Identifier,
    pub formals: Vec<FormalDeclaration>,
    pub body: Vec<Statement>,
}

/// A reference to a declaration by way of its resolved symbol
#[derive(Debug, Clone)]
pub struct Identifier {
    pub symbol: Rc<Symbol>,
}

impl Identifier {
    pub fn new(symbol: &Rc<Symbol>) -> Self {
        Self {
            symbol: symbol.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Statement {
    Declaration(Declaration),
    Assignment {
        destination: Expression,
        source: Expression,
    },
    /// `destination = first maybe second;` assigns one of the two sources,
    /// chosen nondeterministically
    Maybe {
        destination: Expression,
        first: Expression,
        second: Expression,
    },
    PostIncrement(Expression),
    PostDecrement(Expression),
    ToConsole(Expression),
    FromConsole(Expression),
    If {
        condition: Expression,
        body: Vec<Statement>,
    },
    IfElse {
        condition: Expression,
        positive: Vec<Statement>,
        negative: Vec<Statement>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    Call(FunctionCall),
    Return(Option<Expression>),
}

#[derive(Debug, Clone)]
pub struct Expression {
    /// Static type assigned by type analysis
    pub ty: DataType,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    IntLiteral(i64),
    BoolLiteral(bool),
    StringLiteral(String),
    /// Evaluates to an unspecified boolean
    Eh,
    Identifier(Identifier),
    FunctionCall(FunctionCall),
    Unary {
        operator: UnaryOperatorKind,
        operand: Box<Expression>,
    },
    Binary {
        lhs: Box<Expression>,
        operator: BinaryOperatorKind,
        rhs: Box<Expression>,
    },
}

#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub callee: Identifier,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperatorKind {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum BinaryOperatorKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    LogicalAnd,
    LogicalOr,
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEqualTo,
    GreaterThanOrEqualTo,
}

impl BinaryOperatorKind {
    /// The type analysis result for an expression using this operator
    pub fn result_type(self) -> DataType {
        match self {
            BinaryOperatorKind::Add
            | BinaryOperatorKind::Subtract
            | BinaryOperatorKind::Multiply
            | BinaryOperatorKind::Divide => DataType::Int,
            _ => DataType::Bool,
        }
    }
}

/* Shorthand constructors that fill in the type the way type analysis would */

impl Expression {
    pub fn int(value: i64) -> Self {
        Self {
            ty: DataType::Int,
            kind: ExpressionKind::IntLiteral(value),
        }
    }

    pub fn bool(value: bool) -> Self {
        Self {
            ty: DataType::Bool,
            kind: ExpressionKind::BoolLiteral(value),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            ty: DataType::String,
            kind: ExpressionKind::StringLiteral(value.into()),
        }
    }

    pub fn eh() -> Self {
        Self {
            ty: DataType::Bool,
            kind: ExpressionKind::Eh,
        }
    }

    pub fn identifier(symbol: &Rc<Symbol>) -> Self {
        Self {
            ty: symbol.ty.clone(),
            kind: ExpressionKind::Identifier(Identifier::new(symbol)),
        }
    }

    pub fn call(callee: &Rc<Symbol>, arguments: Vec<Expression>) -> Self {
        Self {
            ty: callee.ty.return_type().cloned().unwrap_or(DataType::Void),
            kind: ExpressionKind::FunctionCall(FunctionCall::new(callee, arguments)),
        }
    }

    pub fn unary(operator: UnaryOperatorKind, operand: Expression) -> Self {
        let ty = match operator {
            UnaryOperatorKind::Negate => DataType::Int,
            UnaryOperatorKind::Not => DataType::Bool,
        };

        Self {
            ty,
            kind: ExpressionKind::Unary {
                operator,
                operand: Box::new(operand),
            },
        }
    }

    pub fn binary(lhs: Expression, operator: BinaryOperatorKind, rhs: Expression) -> Self {
        Self {
            ty: operator.result_type(),
            kind: ExpressionKind::Binary {
                lhs: Box::new(lhs),
                operator,
                rhs: Box::new(rhs),
            },
        }
    }
}

impl FunctionCall {
    pub fn new(callee: &Rc<Symbol>, arguments: Vec<Expression>) -> Self {
        Self {
            callee: Identifier::new(callee),
            arguments,
        }
    }
}

impl Declaration {
    pub fn variable(symbol: &Rc<Symbol>) -> Self {
        Declaration::Variable(VariableDeclaration {
            name: Identifier::new(symbol),
        })
    }

    pub fn function(
        symbol: &Rc<Symbol>,
        formals: &[Rc<Symbol>],
        body: Vec<Statement>,
    ) -> Self {
        Declaration::Function(Box::new(FunctionDeclaration {
            name: Identifier::new(symbol),
            formals: formals
                .iter()
                .map(|formal| FormalDeclaration {
                    name: Identifier::new(formal),
                })
                .collect(),
            body,
        }))
    }
}
