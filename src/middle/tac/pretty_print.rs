use colored::Colorize;
use itertools::Itertools;

use crate::{index::Index, middle::tac};

/// Minimum width of the label column in front of each quad
const LABEL_COLUMN_WIDTH: usize = 8;

/// Writes the colored rendering of `program` to stdout
pub fn pretty_print_program(program: &tac::Program) {
    print!("{program}");
}

impl tac::Program {
    /// The plain text rendering of the program, free of terminal escapes
    pub fn render(&self) -> String {
        strip_ansi_escapes::strip_str(self.to_string())
    }
}

impl tac::Procedure {
    pub fn render(&self) -> String {
        strip_ansi_escapes::strip_str(self.to_string())
    }
}

impl core::fmt::Display for tac::Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", "[BEGIN GLOBALS]".magenta())?;

        for global in self.globals() {
            writeln!(
                f,
                "{} {}",
                global.name.value().green(),
                format!("(global var of {} bytes)", global.width).white()
            )?;
        }

        for (id, text) in self.strings() {
            writeln!(f, "{} {text}", string_handle(id).purple())?;
        }

        writeln!(f, "{}", "[END GLOBALS]".magenta())?;

        let init = self.init().id;
        for procedure in self.procedures().filter(|procedure| procedure.id != init) {
            write!(f, "{procedure}")?;
        }

        Ok(())
    }
}

impl core::fmt::Display for tac::Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{}",
            format!("[BEGIN {} LOCALS]", self.name.value()).magenta()
        )?;

        for formal in self.formals() {
            writeln!(
                f,
                "{} {}",
                formal.name.value().green(),
                format!("(formal arg of {} bytes)", formal.width).white()
            )?;
        }

        for local in self.locals() {
            writeln!(
                f,
                "{} {}",
                local.name.value().green(),
                format!("(local var of {} bytes)", local.width).white()
            )?;
        }

        for temp in self.temps() {
            writeln!(
                f,
                "{} {}",
                temp_name(temp.id).yellow(),
                format!("(tmp var of {} bytes)", temp.width).white()
            )?;
        }

        writeln!(
            f,
            "{}",
            format!("[END {} LOCALS]", self.name.value()).magenta()
        )?;

        for quad in self.quads() {
            writeln!(f, "{quad}")?;
        }

        Ok(())
    }
}

impl core::fmt::Display for tac::Quad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let column = self
            .labels
            .iter()
            .map(|label| format!("{label}: "))
            .join("");

        // Pad on the plain text, escapes would throw the width off
        let padding = LABEL_COLUMN_WIDTH.saturating_sub(column.len());

        write!(
            f,
            "{}{}{}",
            column.bright_red(),
            " ".repeat(padding),
            self.kind
        )
    }
}

impl core::fmt::Display for tac::QuadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            tac::QuadKind::Assign {
                destination,
                source,
            } => write!(f, "{destination} {} {source}", ":=".white()),
            tac::QuadKind::UnaryOperation {
                operator,
                destination,
                operand,
            } => write!(
                f,
                "{destination} {} {} {operand}",
                ":=".white(),
                operator.to_string().cyan()
            ),
            tac::QuadKind::BinaryOperation {
                operator,
                destination,
                lhs,
                rhs,
            } => write!(
                f,
                "{destination} {} {lhs} {} {rhs}",
                ":=".white(),
                operator.to_string().cyan()
            ),
            tac::QuadKind::IfZero { condition, target } => write!(
                f,
                "{} {condition} {} {}",
                "IFZ".cyan(),
                "GOTO".cyan(),
                target.to_string().blue()
            ),
            tac::QuadKind::Goto { target } => {
                write!(f, "{} {}", "goto".cyan(), target.to_string().blue())
            }
            tac::QuadKind::Nop => write!(f, "{}", "nop".cyan()),
            tac::QuadKind::Call { name, .. } => {
                write!(f, "{} {}", "call".cyan(), name.value().blue())
            }
            tac::QuadKind::SetArg { position, operand } => write!(
                f,
                "{} {} {operand}",
                "setarg".cyan(),
                position.to_string().purple()
            ),
            tac::QuadKind::GetArg {
                position,
                destination,
            } => write!(
                f,
                "{} {} {destination}",
                "getarg".cyan(),
                position.to_string().purple()
            ),
            tac::QuadKind::SetRet { operand } => write!(f, "{} {operand}", "setret".cyan()),
            tac::QuadKind::GetRet { destination } => {
                write!(f, "{} {destination}", "getret".cyan())
            }
            tac::QuadKind::Return => write!(f, "{}", "return".cyan()),
            tac::QuadKind::Magic { destination } => {
                write!(f, "{destination} {} {}", ":=".white(), "MAGIC".cyan())
            }
            tac::QuadKind::Write { operand, .. } => write!(f, "{} {operand}", "WRITE".cyan()),
            tac::QuadKind::Read { destination, .. } => {
                write!(f, "{} {destination}", "READ".cyan())
            }
        }
    }
}

impl core::fmt::Display for tac::Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            tac::Operand::Literal { value, .. } => write!(f, "{}", value.to_string().purple()),
            tac::Operand::Symbol(symbol) => {
                write!(f, "{}", format!("[{}]", symbol.name.value()).green())
            }
            tac::Operand::Temp(temp) => {
                write!(f, "{}", format!("[{}]", temp_name(temp.id)).yellow())
            }
        }
    }
}

impl core::fmt::Display for tac::LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            tac::LiteralValue::Int(value) => write!(f, "{value}"),
            tac::LiteralValue::Bool(value) => write!(f, "{}", u8::from(*value)),
            tac::LiteralValue::String(id) => write!(f, "{}", string_handle(*id)),
        }
    }
}

impl core::fmt::Display for tac::LabelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lbl_{}", self.index())
    }
}

fn temp_name(id: tac::TempId) -> String {
    format!("tmp{}", id.index())
}

fn string_handle(id: tac::StringId) -> String {
    format!("str_{}", id.index())
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::{
        frontend::{intern::InternedSymbol, symbol::{DataType, SymbolTable}},
        middle::tac::{BinaryOperator, LiteralValue, Operand, Program, Quad, QuadKind},
    };

    #[test]
    fn operands_render_with_brackets_for_storage() {
        let mut symbols = SymbolTable::new();
        let total = symbols.declare("total", DataType::Int);

        let mut program = Program::new();
        let global = program.gather_global(&total);
        let handle = program.make_string("hi");

        let rendered = [
            Operand::from(global),
            handle,
            Operand::Literal {
                value: LiteralValue::Bool(true),
                width: 8,
            },
            Operand::Literal {
                value: LiteralValue::Int(-3),
                width: 8,
            },
        ]
        .iter()
        .map(|operand| strip_ansi_escapes::strip_str(operand.to_string()))
        .collect::<Vec<_>>();

        assert_eq!(rendered, ["[total]", "str_0", "1", "-3"]);
    }

    #[test]
    fn label_column_is_padded() {
        let mut program = Program::new();
        let id = program.make_procedure(InternedSymbol::new("pad"));
        let short = program.make_label();
        let labels = (0..10).map(|_| program.make_label()).collect::<Vec<_>>();

        let procedure = program.procedure_mut(id);
        let temp = procedure.make_temp(8);

        let mut first = Quad::new(QuadKind::Nop);
        first.add_label(short);
        procedure.push_quad(first);

        let mut second = Quad::new(QuadKind::BinaryOperation {
            operator: BinaryOperator::Mult64,
            destination: temp.into(),
            lhs: Operand::Literal {
                value: LiteralValue::Int(2),
                width: 8,
            },
            rhs: Operand::Literal {
                value: LiteralValue::Int(3),
                width: 8,
            },
        });
        second.add_label(labels[9]);
        procedure.push_quad(second);

        procedure.push_quad(Quad::new(QuadKind::Return));

        assert_eq!(
            procedure.render(),
            indoc! {"
                [BEGIN pad LOCALS]
                tmp0 (tmp var of 8 bytes)
                [END pad LOCALS]
                lbl_0:  nop
                lbl_10: [tmp0] := 2 MULT64 3
                        return
            "}
        );
    }

    #[test]
    fn init_is_not_rendered() {
        let mut program = Program::new();
        program.make_procedure(InternedSymbol::new("main"));
        program.make_string("a string");

        assert_eq!(
            program.render(),
            indoc! {"
                [BEGIN GLOBALS]
                str_0 a string
                [END GLOBALS]
                [BEGIN main LOCALS]
                [END main LOCALS]
            "}
        );
    }
}
