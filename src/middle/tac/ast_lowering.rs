//! Lowers the analyzed AST into three-address code.
//!
//! Expressions are flattened bottom up: operands are computed (and their quads
//! emitted) before the quad consuming them, and every intermediate value gets
//! its own temporary. Statements are lowered top to bottom so emission order
//! is program order. Structured control flow becomes `IFZ`/`goto` quads
//! targeting labels placed on `nop`s.

use crate::{
    error::{LoweringError, Violation, violation},
    frontend::{
        ast::{self, BinaryOperatorKind, ExpressionKind, Statement},
        symbol::DataType,
    },
    middle::tac::{
        LabelId, LiteralValue, Operand, Procedure, ProcedureId, Program, Quad, QuadKind,
    },
};

/// Lowers a whole program. Each top level declaration is lowered in source
/// order; the first violation aborts the pass and no program is returned.
pub fn lower_program(program: &ast::Program) -> Result<Program, LoweringError> {
    let mut ir = Program::new();

    for declaration in &program.declarations {
        lower_global_declaration(&mut ir, declaration)?;
    }

    tracing::debug!(
        procedures = ir.procedures().count(),
        globals = ir.globals().count(),
        strings = ir.strings().count(),
        "lowered program"
    );

    Ok(ir)
}

fn lower_global_declaration(
    ir: &mut Program,
    declaration: &ast::Declaration,
) -> Result<(), LoweringError> {
    match declaration {
        ast::Declaration::Variable(variable) => {
            ir.gather_global(&variable.name.symbol);
            Ok(())
        }
        ast::Declaration::Function(function) => lower_function(ir, function),
        ast::Declaration::Formal(formal) => Err(violation!(Violation::FormalAtGlobalScope(
            formal.name.symbol.name
        ))),
    }
}

fn lower_function(
    ir: &mut Program,
    function: &ast::FunctionDeclaration,
) -> Result<(), LoweringError> {
    let procedure = ir.make_procedure(function.name.symbol.name);
    let mut cx = ProcedureLoweringContext {
        program: ir,
        procedure,
    };

    for formal in &function.formals {
        cx.procedure_mut().gather_formal(&formal.name.symbol);
    }

    // Arguments arrive by position and are copied into the formals' storage
    // before anything in the body runs
    let formals = cx.procedure().formals().to_vec();
    for (i, formal) in formals.into_iter().enumerate() {
        cx.emit(QuadKind::GetArg {
            position: i + 1,
            destination: formal.into(),
        });
    }

    cx.lower_block(&function.body)?;

    let procedure = cx.procedure();
    tracing::debug!(
        procedure = %procedure.name,
        quads = procedure.quads().len(),
        temps = procedure.temps().len(),
        "lowered procedure"
    );

    Ok(())
}

/// `+` and `/` evaluate their right operand first, every other binary
/// operator evaluates left to right
fn evaluates_rhs_first(operator: BinaryOperatorKind) -> bool {
    matches!(
        operator,
        BinaryOperatorKind::Add | BinaryOperatorKind::Divide
    )
}

struct ProcedureLoweringContext<'ir> {
    program: &'ir mut Program,
    procedure: ProcedureId,
}

impl ProcedureLoweringContext<'_> {
    fn procedure(&self) -> &Procedure {
        self.program.procedure(self.procedure)
    }

    fn procedure_mut(&mut self) -> &mut Procedure {
        self.program.procedure_mut(self.procedure)
    }

    fn emit(&mut self, kind: QuadKind) {
        self.procedure_mut().push_quad(Quad::new(kind));
    }

    fn make_temp(&mut self, width: usize) -> Operand {
        self.procedure_mut().make_temp(width).into()
    }

    /// Labels are numbered program wide even though they are only ever
    /// targeted from within one procedure
    fn make_label(&mut self) -> LabelId {
        self.program.make_label()
    }

    /// Marks the next position in the quad stream with `label`
    fn place_label(&mut self, label: LabelId) {
        let mut quad = Quad::new(QuadKind::Nop);
        quad.add_label(label);

        tracing::trace!(
            procedure = %self.procedure().name,
            label = ?label,
            "placed label"
        );

        self.procedure_mut().push_quad(quad);
    }

    fn lower_block(&mut self, statements: &[Statement]) -> Result<(), LoweringError> {
        for statement in statements {
            self.lower_statement(statement)?;
        }

        Ok(())
    }

    fn lower_statement(&mut self, statement: &Statement) -> Result<(), LoweringError> {
        match statement {
            Statement::Declaration(declaration) => self.lower_local_declaration(declaration)?,
            Statement::Assignment {
                destination,
                source,
            } => {
                let destination = self.flatten_expression(destination)?;
                let source = self.flatten_expression(source)?;

                self.emit(QuadKind::Assign {
                    destination,
                    source,
                });
            }
            Statement::Maybe {
                destination,
                first,
                second,
            } => {
                let else_label = self.make_label();
                let end_label = self.make_label();

                let condition = self.make_temp(DataType::Bool.width());
                self.emit(QuadKind::Magic {
                    destination: condition,
                });
                self.emit(QuadKind::IfZero {
                    condition,
                    target: else_label,
                });

                let destination = self.flatten_expression(destination)?;
                let source = self.flatten_expression(first)?;
                self.emit(QuadKind::Assign {
                    destination,
                    source,
                });
                self.emit(QuadKind::Goto { target: end_label });

                self.place_label(else_label);
                let source = self.flatten_expression(second)?;
                self.emit(QuadKind::Assign {
                    destination,
                    source,
                });

                self.place_label(end_label);
            }
            Statement::PostIncrement(target) => {
                self.lower_step(target, BinaryOperatorKind::Add)?
            }
            Statement::PostDecrement(target) => {
                self.lower_step(target, BinaryOperatorKind::Subtract)?
            }
            Statement::ToConsole(expression) => {
                let operand = self.flatten_expression(expression)?;

                self.emit(QuadKind::Write {
                    operand,
                    ty: expression.ty.clone(),
                });
            }
            Statement::FromConsole(expression) => {
                let destination = self.flatten_expression(expression)?;

                self.emit(QuadKind::Read {
                    destination,
                    ty: expression.ty.clone(),
                });
            }
            Statement::If { condition, body } => {
                let condition = self.flatten_expression(condition)?;
                let exit_label = self.make_label();

                self.emit(QuadKind::IfZero {
                    condition,
                    target: exit_label,
                });
                self.lower_block(body)?;
                self.place_label(exit_label);
            }
            Statement::IfElse {
                condition,
                positive,
                negative,
            } => {
                let condition = self.flatten_expression(condition)?;
                let else_label = self.make_label();
                let exit_label = self.make_label();

                self.emit(QuadKind::IfZero {
                    condition,
                    target: else_label,
                });
                self.lower_block(positive)?;
                self.emit(QuadKind::Goto { target: exit_label });

                self.place_label(else_label);
                self.lower_block(negative)?;
                self.place_label(exit_label);
            }
            Statement::While { condition, body } => {
                let head_label = self.make_label();
                let exit_label = self.make_label();

                self.place_label(head_label);
                let condition = self.flatten_expression(condition)?;
                self.emit(QuadKind::IfZero {
                    condition,
                    target: exit_label,
                });
                self.lower_block(body)?;
                self.emit(QuadKind::Goto { target: head_label });
                self.place_label(exit_label);
            }
            Statement::Call(call) => {
                // Any return value is fetched into a temp and dropped
                self.lower_call(call)?;
            }
            Statement::Return(value) => {
                if let Some(value) = value {
                    let operand = self.flatten_expression(value)?;
                    self.emit(QuadKind::SetRet { operand });
                }

                self.emit(QuadKind::Return);
            }
        }

        Ok(())
    }

    fn lower_local_declaration(
        &mut self,
        declaration: &ast::Declaration,
    ) -> Result<(), LoweringError> {
        match declaration {
            ast::Declaration::Variable(variable) => {
                self.procedure_mut().gather_local(&variable.name.symbol);
            }
            ast::Declaration::Formal(formal) => {
                self.procedure_mut().gather_formal(&formal.name.symbol);
            }
            ast::Declaration::Function(function) => {
                return Err(violation!(Violation::FunctionAtLocalScope(
                    function.name.symbol.name
                )));
            }
        }

        Ok(())
    }

    /// `target++` and `target--`
    fn lower_step(
        &mut self,
        target: &ast::Expression,
        operator: BinaryOperatorKind,
    ) -> Result<(), LoweringError> {
        let target_operand = self.flatten_expression(target)?;
        let temp = self.make_temp(target.ty.width());

        self.emit(QuadKind::BinaryOperation {
            operator: operator.into(),
            destination: temp,
            lhs: target_operand,
            rhs: Operand::Literal {
                value: LiteralValue::Int(1),
                width: DataType::Int.width(),
            },
        });
        self.emit(QuadKind::Assign {
            destination: target_operand,
            source: temp,
        });

        Ok(())
    }

    /// Lowers `expression` into a single operand, emitting the quads that
    /// compute it
    fn flatten_expression(&mut self, expression: &ast::Expression) -> Result<Operand, LoweringError> {
        let width = expression.ty.width();

        let operand = match &expression.kind {
            ExpressionKind::IntLiteral(value) => Operand::Literal {
                value: LiteralValue::Int(*value),
                width,
            },
            ExpressionKind::BoolLiteral(value) => Operand::Literal {
                value: LiteralValue::Bool(*value),
                width,
            },
            ExpressionKind::StringLiteral(text) => self.program.make_string(text),
            ExpressionKind::Eh => {
                let destination = self.make_temp(width);
                self.emit(QuadKind::Magic { destination });
                destination
            }
            ExpressionKind::Identifier(identifier) => self.lookup(identifier)?,
            ExpressionKind::FunctionCall(call) => self
                .lower_call(call)?
                .ok_or_else(|| violation!(Violation::VoidValue(call.callee.symbol.name)))?,
            ExpressionKind::Unary { operator, operand } => {
                let operand = self.flatten_expression(operand)?;
                let destination = self.make_temp(width);

                self.emit(QuadKind::UnaryOperation {
                    operator: (*operator).into(),
                    destination,
                    operand,
                });
                destination
            }
            ExpressionKind::Binary { lhs, operator, rhs } => {
                let (lhs, rhs) = if evaluates_rhs_first(*operator) {
                    let rhs = self.flatten_expression(rhs)?;
                    let lhs = self.flatten_expression(lhs)?;
                    (lhs, rhs)
                } else {
                    let lhs = self.flatten_expression(lhs)?;
                    let rhs = self.flatten_expression(rhs)?;
                    (lhs, rhs)
                };
                let destination = self.make_temp(width);

                self.emit(QuadKind::BinaryOperation {
                    operator: (*operator).into(),
                    destination,
                    lhs,
                    rhs,
                });
                destination
            }
        };

        Ok(operand)
    }

    /// Emits the calling sequence for `call`. Returns the temporary holding
    /// the result, or `None` if the callee returns void.
    fn lower_call(&mut self, call: &ast::FunctionCall) -> Result<Option<Operand>, LoweringError> {
        let callee = &call.callee.symbol;
        let Some(return_type) = callee.ty.return_type() else {
            return Err(violation!(Violation::NotAFunction(callee.name)));
        };

        let arguments = call
            .arguments
            .iter()
            .map(|argument| self.flatten_expression(argument))
            .collect::<Result<Vec<_>, _>>()?;

        for (i, operand) in arguments.into_iter().enumerate() {
            self.emit(QuadKind::SetArg {
                position: i + 1,
                operand,
            });
        }

        self.emit(QuadKind::Call {
            callee: callee.id,
            name: callee.name,
        });

        if return_type.is_void() {
            return Ok(None);
        }

        let destination = self.make_temp(return_type.width());
        self.emit(QuadKind::GetRet { destination });

        Ok(Some(destination))
    }

    /// Storage already bound for an identifier. Formals and locals shadow
    /// globals; nothing is allocated here.
    fn lookup(&self, identifier: &ast::Identifier) -> Result<Operand, LoweringError> {
        let symbol = &identifier.symbol;

        self.procedure()
            .symbol_operand(symbol.id)
            .or_else(|| self.program.global(symbol.id))
            .map(Operand::from)
            .ok_or_else(|| violation!(Violation::UnboundIdentifier(symbol.name)))
    }
}
