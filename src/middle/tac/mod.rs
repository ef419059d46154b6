//! Three-address code. Every instruction is a quadruple with at most one
//! result and two sources. Control flow is expressed purely through labels
//! attached to quads and jumps to those labels; the quad sequence of a
//! procedure is its control flow graph.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use strum::Display;

use crate::{
    frontend::{
        ast::{BinaryOperatorKind, UnaryOperatorKind},
        intern::InternedSymbol,
        symbol::{DataType, Symbol, SymbolId},
    },
    index::{Index, IndexVec, simple_index},
};

pub mod ast_lowering;
pub mod pretty_print;

simple_index! {
    /// Identifies a procedure within its program
    pub struct ProcedureId;
}

simple_index! {
    /// Ordinal of a compiler generated temporary. Only unique within the
    /// procedure that allocated it.
    pub struct TempId;
}

simple_index! {
    /// A jump target, unique across the whole program
    pub struct LabelId;
}

simple_index! {
    /// Handle of an entry in the program's string literal pool
    pub struct StringId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    Int(i64),
    Bool(bool),
    String(StringId),
}

/// Storage belonging to a declared global, local or formal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolOperand {
    pub symbol: SymbolId,
    pub name: InternedSymbol,
    pub width: usize,
}

impl SymbolOperand {
    fn new(symbol: &Symbol) -> Self {
        Self {
            symbol: symbol.id,
            name: symbol.name,
            width: symbol.ty.width(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempOperand {
    pub id: TempId,
    pub width: usize,
}

/// A value reference. Operands are immutable once created, so the width is
/// fixed for the operand's whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Literal { value: LiteralValue, width: usize },
    Symbol(SymbolOperand),
    Temp(TempOperand),
}

impl Operand {
    pub fn width(&self) -> usize {
        match self {
            Operand::Literal { width, .. } => *width,
            Operand::Symbol(symbol) => symbol.width,
            Operand::Temp(temp) => temp.width,
        }
    }
}

impl From<SymbolOperand> for Operand {
    fn from(value: SymbolOperand) -> Self {
        Operand::Symbol(value)
    }
}

impl From<TempOperand> for Operand {
    fn from(value: TempOperand) -> Self {
        Operand::Temp(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum UnaryOperator {
    Neg64,
    Not64,
}

impl From<UnaryOperatorKind> for UnaryOperator {
    fn from(value: UnaryOperatorKind) -> Self {
        match value {
            UnaryOperatorKind::Negate => UnaryOperator::Neg64,
            UnaryOperatorKind::Not => UnaryOperator::Not64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum BinaryOperator {
    Add64,
    Sub64,
    Mult64,
    Div64,
    And64,
    Or64,
    Eq64,
    Neq64,
    Lt64,
    Gt64,
    Lte64,
    Gte64,
}

impl From<BinaryOperatorKind> for BinaryOperator {
    fn from(value: BinaryOperatorKind) -> Self {
        match value {
            BinaryOperatorKind::Add => BinaryOperator::Add64,
            BinaryOperatorKind::Subtract => BinaryOperator::Sub64,
            BinaryOperatorKind::Multiply => BinaryOperator::Mult64,
            BinaryOperatorKind::Divide => BinaryOperator::Div64,
            BinaryOperatorKind::LogicalAnd => BinaryOperator::And64,
            BinaryOperatorKind::LogicalOr => BinaryOperator::Or64,
            BinaryOperatorKind::Equals => BinaryOperator::Eq64,
            BinaryOperatorKind::NotEquals => BinaryOperator::Neq64,
            BinaryOperatorKind::LessThan => BinaryOperator::Lt64,
            BinaryOperatorKind::GreaterThan => BinaryOperator::Gt64,
            BinaryOperatorKind::LessThanOrEqualTo => BinaryOperator::Lte64,
            BinaryOperatorKind::GreaterThanOrEqualTo => BinaryOperator::Gte64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuadKind {
    Assign {
        destination: Operand,
        source: Operand,
    },
    UnaryOperation {
        operator: UnaryOperator,
        destination: Operand,
        operand: Operand,
    },
    BinaryOperation {
        operator: BinaryOperator,
        destination: Operand,
        lhs: Operand,
        rhs: Operand,
    },
    /// Jumps to `target` when `condition` is zero, falls through otherwise
    IfZero {
        condition: Operand,
        target: LabelId,
    },
    Goto {
        target: LabelId,
    },
    Nop,
    Call {
        callee: SymbolId,
        name: InternedSymbol,
    },
    /// Passes the argument at the 1-based `position` of the next call
    SetArg {
        position: usize,
        operand: Operand,
    },
    /// Copies the incoming argument at the 1-based `position` into storage
    GetArg {
        position: usize,
        destination: Operand,
    },
    SetRet {
        operand: Operand,
    },
    GetRet {
        destination: Operand,
    },
    /// Transfers control back to the caller
    Return,
    /// Binds `destination` to an unspecified boolean
    Magic {
        destination: Operand,
    },
    Write {
        operand: Operand,
        ty: DataType,
    },
    Read {
        destination: Operand,
        ty: DataType,
    },
}

impl QuadKind {
    /// Label this quad may transfer control to, besides falling through
    pub fn jump_target(&self) -> Option<LabelId> {
        match self {
            QuadKind::IfZero { target, .. } | QuadKind::Goto { target } => Some(*target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    /// Labels marking this quad as a jump target
    pub labels: Vec<LabelId>,
    pub kind: QuadKind,
}

impl Quad {
    pub fn new(kind: QuadKind) -> Self {
        Self {
            labels: Vec::new(),
            kind,
        }
    }

    pub fn add_label(&mut self, label: LabelId) {
        self.labels.push(label);
    }
}

#[derive(Debug)]
pub struct Procedure {
    pub id: ProcedureId,
    pub name: InternedSymbol,
    formals: Vec<SymbolOperand>,
    locals: Vec<SymbolOperand>,
    temps: IndexVec<TempId, TempOperand>,
    quads: Vec<Quad>,
    /// Storage of every formal and local, by declaration
    bindings: HashMap<SymbolId, SymbolOperand>,
}

impl Procedure {
    fn new(id: ProcedureId, name: InternedSymbol) -> Self {
        Self {
            id,
            name,
            formals: Vec::new(),
            locals: Vec::new(),
            temps: IndexVec::new(),
            quads: Vec::new(),
            bindings: HashMap::new(),
        }
    }

    /// Allocates a temporary that no other quad of this procedure has used
    pub fn make_temp(&mut self, width: usize) -> TempOperand {
        let id = self.temps.next_index();
        self.temps.push(TempOperand { id, width });
        TempOperand { id, width }
    }

    pub fn gather_formal(&mut self, symbol: &Symbol) -> SymbolOperand {
        let operand = SymbolOperand::new(symbol);
        self.formals.push(operand);
        self.bindings.insert(symbol.id, operand);
        operand
    }

    pub fn gather_local(&mut self, symbol: &Symbol) -> SymbolOperand {
        let operand = SymbolOperand::new(symbol);
        self.locals.push(operand);
        self.bindings.insert(symbol.id, operand);
        operand
    }

    /// Storage for a formal or local of this procedure
    pub fn symbol_operand(&self, symbol: SymbolId) -> Option<SymbolOperand> {
        self.bindings.get(&symbol).copied()
    }

    pub fn push_quad(&mut self, quad: Quad) {
        self.quads.push(quad);
    }

    pub fn formals(&self) -> &[SymbolOperand] {
        &self.formals
    }

    pub fn locals(&self) -> &[SymbolOperand] {
        &self.locals
    }

    pub fn temps(&self) -> &IndexVec<TempId, TempOperand> {
        &self.temps
    }

    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    /// Every label attached to a quad of this procedure, in quad order
    pub fn defined_labels(&self) -> impl Iterator<Item = LabelId> + '_ {
        self.quads.iter().flat_map(|quad| quad.labels.iter().copied())
    }
}

/// The output of lowering: every procedure plus program wide storage
#[derive(Debug)]
pub struct Program {
    procedures: IndexVec<ProcedureId, Procedure>,
    /// Synthesized entry procedure. Kept in the list but never rendered.
    init: ProcedureId,
    globals: BTreeMap<SymbolId, SymbolOperand>,
    strings: BTreeMap<StringId, String>,
    next_label_id: LabelId,
    next_string_id: StringId,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    pub fn new() -> Self {
        let mut program = Self {
            procedures: IndexVec::new(),
            init: ProcedureId::new(0),
            globals: BTreeMap::new(),
            strings: BTreeMap::new(),
            next_label_id: LabelId::default(),
            next_string_id: StringId::default(),
        };

        program.init = program.make_procedure(InternedSymbol::new("init"));
        program
    }

    pub fn make_procedure(&mut self, name: InternedSymbol) -> ProcedureId {
        let id = self.procedures.next_index();
        self.procedures.push(Procedure::new(id, name))
    }

    pub fn make_label(&mut self) -> LabelId {
        self.next_label_id.post_increment()
    }

    /// Binds storage for a global. A second call for the same symbol replaces
    /// the first binding; name analysis never lets that happen.
    pub fn gather_global(&mut self, symbol: &Symbol) -> SymbolOperand {
        let operand = SymbolOperand::new(symbol);

        if self.globals.insert(symbol.id, operand).is_some() {
            tracing::warn!(
                global = %symbol.name,
                "global declared twice, keeping the latest binding"
            );
        }

        operand
    }

    /// Allocates a fresh string literal handle. Equal strings are not merged.
    pub fn make_string(&mut self, text: &str) -> Operand {
        let id = self.next_string_id.post_increment();
        self.strings.insert(id, text.to_owned());

        Operand::Literal {
            value: LiteralValue::String(id),
            width: DataType::String.width(),
        }
    }

    pub fn global(&self, symbol: SymbolId) -> Option<SymbolOperand> {
        self.globals.get(&symbol).copied()
    }

    pub fn globals(&self) -> impl Iterator<Item = &SymbolOperand> {
        self.globals.values()
    }

    pub fn global_operands(&self) -> Vec<Operand> {
        self.globals.values().copied().map(Operand::from).collect()
    }

    pub fn string(&self, id: StringId) -> Option<&str> {
        self.strings.get(&id).map(String::as_str)
    }

    pub fn strings(&self) -> impl Iterator<Item = (StringId, &str)> {
        self.strings.iter().map(|(id, text)| (*id, text.as_str()))
    }

    pub fn procedure(&self, id: ProcedureId) -> &Procedure {
        &self.procedures[id]
    }

    pub fn procedure_mut(&mut self, id: ProcedureId) -> &mut Procedure {
        &mut self.procedures[id]
    }

    /// All procedures in declaration order, `init` first
    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.procedures.iter()
    }

    pub fn procedure_named(&self, name: &str) -> Option<&Procedure> {
        self.procedures
            .iter()
            .find(|procedure| procedure.name.value() == name)
    }

    pub fn init(&self) -> &Procedure {
        &self.procedures[self.init]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::symbol::SymbolTable;

    #[test]
    fn init_is_synthesized_first() {
        let program = Program::new();

        assert_eq!(program.init().name.value(), "init");
        assert_eq!(program.procedures().count(), 1);
        assert!(program.init().quads().is_empty());
    }

    #[test]
    fn temps_are_never_reused() {
        let mut program = Program::new();
        let id = program.make_procedure(InternedSymbol::new("f"));
        let procedure = program.procedure_mut(id);

        let a = procedure.make_temp(8);
        let b = procedure.make_temp(8);
        let c = procedure.make_temp(0);

        assert_eq!(a.id.index(), 0);
        assert_eq!(b.id.index(), 1);
        assert_eq!(c.id.index(), 2);
        assert_eq!(c.width, 0);
        assert_eq!(procedure.temps().len(), 3);
    }

    #[test]
    fn temp_numbering_is_per_procedure_and_labels_are_program_wide() {
        let mut program = Program::new();
        let f = program.make_procedure(InternedSymbol::new("f"));
        let g = program.make_procedure(InternedSymbol::new("g"));

        let f_temp = program.procedure_mut(f).make_temp(8);
        let g_temp = program.procedure_mut(g).make_temp(8);
        assert_eq!(f_temp.id, g_temp.id);

        let first = program.make_label();
        let second = program.make_label();
        assert_ne!(first, second);
        assert_eq!(second.index(), first.index() + 1);
    }

    #[test]
    fn strings_are_not_deduplicated() {
        let mut program = Program::new();

        let a = program.make_string("hello");
        let b = program.make_string("hello");

        assert_ne!(a, b);
        assert_eq!(a.width(), 8);

        let texts = program.strings().map(|(_, text)| text).collect::<Vec<_>>();
        assert_eq!(texts, ["hello", "hello"]);
    }

    #[test]
    fn string_handles_resolve_to_their_text() {
        let mut program = Program::new();

        let texts = ["hello", "", "hello", "a \"quoted\" line"];
        let handles = texts.map(|text| program.make_string(text));

        for (handle, text) in handles.iter().zip(texts) {
            let Operand::Literal {
                value: LiteralValue::String(id),
                ..
            } = handle
            else {
                panic!("make_string returned {handle:?}");
            };

            assert_eq!(program.string(*id), Some(text));
        }

        assert_eq!(program.string(StringId::new(texts.len())), None);
    }

    #[test]
    fn regathering_a_global_overwrites_it() {
        let mut symbols = SymbolTable::new();
        let x = symbols.declare("x", DataType::Int);
        let mut program = Program::new();

        program.gather_global(&x);
        program.gather_global(&x);

        assert_eq!(program.globals().count(), 1);
        assert_eq!(
            program.global(x.id).map(|operand| operand.width),
            Some(8)
        );
        assert_eq!(program.global_operands().len(), 1);
    }

    #[test]
    fn formals_and_locals_keep_declaration_order() {
        let mut symbols = SymbolTable::new();
        let a = symbols.declare("a", DataType::Int);
        let b = symbols.declare("b", DataType::Bool);
        let c = symbols.declare("c", DataType::String);

        let mut program = Program::new();
        let id = program.make_procedure(InternedSymbol::new("f"));
        let procedure = program.procedure_mut(id);

        procedure.gather_formal(&b);
        procedure.gather_formal(&a);
        procedure.gather_local(&c);

        let formals = procedure
            .formals()
            .iter()
            .map(|formal| formal.name.value())
            .collect::<Vec<_>>();
        assert_eq!(formals, ["b", "a"]);
        assert_eq!(procedure.locals()[0].name.value(), "c");
        assert!(procedure.symbol_operand(c.id).is_some());
    }
}
