//! The explicit-control machine.
//!
//! Evaluation state is four pieces: the agenda (pending work, LIFO),
//! the stash (intermediate values, LIFO), the current environment
//! frame, and the choice-point stack for non-deterministic search. One
//! [`Machine::step`] processes exactly one agenda item; drivers in the
//! scheduler decide how many steps to take before yielding.
//!
//! Because the machine never calls into itself through the host stack,
//! recursion depth in the evaluated program costs agenda entries, not
//! host stack frames, and the whole state can be cloned for
//! continuations and choice points or parked indefinitely between
//! steps.

mod apply;
mod control;

pub use control::{ControlItem, Instruction};

use smallvec::SmallVec;

use rill_ir::{
    ExprId, ExprKind, Name, SharedArena, SharedInterner, Span, StmtId, StmtKind, StmtRange,
};

use crate::environment::{AssignError, Frame, LookupError};
use crate::errors::{
    self, condition_type, misplaced_control, redeclaration, EvalError,
};
use crate::guard::{GuardOptions, RunawayGuard};
use crate::nondet::ChoicePoint;
use crate::operators::{evaluate_binary, evaluate_unary};
use crate::Value;

/// Outcome of one machine step.
#[derive(Clone, Debug, PartialEq)]
pub enum StepEvent {
    /// More work remains.
    Continue,
    /// The program requested a suspension at the given call site.
    Paused(Span),
    /// The agenda is empty; this is the program's value.
    Done(Value),
    /// Non-deterministic search ran out of alternatives.
    Exhausted,
}

/// The evaluator state machine.
pub struct Machine {
    pub(crate) arena: SharedArena,
    pub(crate) interner: SharedInterner,
    pub(crate) agenda: Vec<ControlItem>,
    pub(crate) stash: Vec<Value>,
    pub(crate) env: Frame,
    pub(crate) choices: Vec<ChoicePoint>,
    pub(crate) guard: RunawayGuard,
}

impl Machine {
    /// Create a machine poised to evaluate `program` in `globals`.
    pub fn new(
        arena: SharedArena,
        interner: SharedInterner,
        globals: Frame,
        program: ExprId,
        guard: GuardOptions,
    ) -> Self {
        Machine {
            arena,
            interner,
            agenda: vec![ControlItem::Node(program)],
            stash: Vec::new(),
            env: globals,
            choices: Vec::new(),
            guard: RunawayGuard::new(guard),
        }
    }

    /// Process one agenda item.
    pub fn step(&mut self) -> Result<StepEvent, EvalError> {
        self.guard.check_sizes(self.agenda.len(), self.stash.len())?;
        let Some(item) = self.agenda.pop() else {
            let value = self.stash.pop().unwrap_or(Value::Undefined);
            return Ok(StepEvent::Done(value));
        };
        match item {
            ControlItem::Node(id) => self.step_node(id),
            ControlItem::Stmt(id) => self.step_stmt(id),
            ControlItem::Instr(instr) => self.step_instr(instr),
        }
    }

    /// Span of the next syntax node (expression or statement) the
    /// machine would process, for breakpoint matching. `None` when the
    /// next item is a synthesized instruction or the agenda is empty.
    pub fn next_span(&self) -> Option<Span> {
        match self.agenda.last() {
            Some(ControlItem::Node(id)) => Some(self.arena.get_expr(*id).span),
            Some(ControlItem::Stmt(id)) => Some(self.arena.get_stmt(*id).span),
            _ => None,
        }
    }

    /// Current agenda depth; sampled by tests asserting tail-call
    /// boundedness.
    pub fn agenda_depth(&self) -> usize {
        self.agenda.len()
    }

    // Node expansion

    fn step_node(&mut self, id: ExprId) -> Result<StepEvent, EvalError> {
        let expr = *self.arena.get_expr(id);
        let span = expr.span;
        match expr.kind {
            ExprKind::Number(bits) => self.stash.push(Value::Number(f64::from_bits(bits))),
            ExprKind::Text(name) => {
                let text = self.interner.lookup(name);
                self.stash.push(Value::text(text));
            }
            ExprKind::Bool(b) => self.stash.push(Value::Bool(b)),
            ExprKind::Undefined => self.stash.push(Value::Undefined),
            ExprKind::Ident(name) => {
                let value = self.env.lookup(name).map_err(|e| match e {
                    LookupError::Unbound => errors::unbound_name(self.name_text(name), span),
                    LookupError::Uninitialized => {
                        errors::uninitialized_access(self.name_text(name), span)
                    }
                })?;
                self.stash.push(value);
            }
            ExprKind::Unary { op, operand } => {
                self.agenda
                    .push(ControlItem::Instr(Instruction::ApplyUnary { op, span }));
                self.agenda.push(ControlItem::Node(operand));
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.agenda
                    .push(ControlItem::Instr(Instruction::ApplyBinary { op, span }));
                // Left operand evaluates first: push it last.
                self.agenda.push(ControlItem::Node(rhs));
                self.agenda.push(ControlItem::Node(lhs));
            }
            ExprKind::Conditional {
                test,
                then_branch,
                else_branch,
            } => {
                let test_span = self.arena.get_expr(test).span;
                self.agenda.push(ControlItem::Instr(Instruction::Branch {
                    then_branch,
                    else_branch,
                    span: test_span,
                }));
                self.agenda.push(ControlItem::Node(test));
            }
            ExprKind::Call { callee, args } => {
                let arena = self.arena.clone();
                let args = arena.get_exprs(args);
                self.agenda.push(ControlItem::Instr(Instruction::Apply {
                    argc: args.len(),
                    span,
                }));
                // Callee first, then arguments left to right.
                for &arg in args.iter().rev() {
                    self.agenda.push(ControlItem::Node(arg));
                }
                self.agenda.push(ControlItem::Node(callee));
            }
            ExprKind::Lambda { name, params, body } => {
                self.stash
                    .push(Value::closure(name, params, body, self.env.clone()));
            }
            ExprKind::Block(range) => self.enter_block(range)?,
            ExprKind::While { test, body } => {
                let test_span = self.arena.get_expr(test).span;
                self.agenda.push(ControlItem::Instr(Instruction::LoopMarker {
                    stash_height: self.stash.len(),
                }));
                self.agenda.push(ControlItem::Instr(Instruction::WhileTest {
                    test,
                    body,
                    span: test_span,
                }));
                self.agenda.push(ControlItem::Node(test));
            }
            ExprKind::Break => return self.unwind_break(span),
            ExprKind::Continue => return self.unwind_continue(span),
            ExprKind::Return(value) => {
                self.agenda
                    .push(ControlItem::Instr(Instruction::ReturnSignal(span)));
                match value {
                    Some(e) => self.agenda.push(ControlItem::Node(e)),
                    None => self
                        .agenda
                        .push(ControlItem::Instr(Instruction::PushUndefined)),
                }
            }
            ExprKind::Assign { target, value } => {
                self.agenda.push(ControlItem::Instr(Instruction::AssignTo {
                    name: target,
                    span,
                }));
                self.agenda.push(ControlItem::Node(value));
            }
        }
        Ok(StepEvent::Continue)
    }

    fn step_stmt(&mut self, id: StmtId) -> Result<StepEvent, EvalError> {
        let stmt = *self.arena.get_stmt(id);
        match stmt.kind {
            StmtKind::Expr(e) => self.agenda.push(ControlItem::Node(e)),
            StmtKind::Let {
                name,
                init,
                constant,
            } => {
                self.agenda
                    .push(ControlItem::Instr(Instruction::Declare { name, constant }));
                self.agenda.push(ControlItem::Node(init));
            }
            StmtKind::Func { name, params, body } => {
                // Function declarations close over the frame they are
                // declared in and bind as constants.
                let closure = Value::closure(name, params, body, self.env.clone());
                self.env.init(name, closure, true);
                self.stash.push(Value::Undefined);
            }
        }
        Ok(StepEvent::Continue)
    }

    // Instruction execution

    fn step_instr(&mut self, instr: Instruction) -> Result<StepEvent, EvalError> {
        match instr {
            Instruction::ApplyBinary { op, span } => {
                let rhs = self.pop_value();
                let lhs = self.pop_value();
                let result = evaluate_binary(op, &lhs, &rhs).map_err(|e| e.with_span(span))?;
                self.stash.push(result);
            }
            Instruction::ApplyUnary { op, span } => {
                let operand = self.pop_value();
                let result = evaluate_unary(op, &operand).map_err(|e| e.with_span(span))?;
                self.stash.push(result);
            }
            Instruction::Branch {
                then_branch,
                else_branch,
                span,
            } => match self.pop_value() {
                Value::Bool(true) => self.agenda.push(ControlItem::Node(then_branch)),
                Value::Bool(false) => match else_branch {
                    Some(e) => self.agenda.push(ControlItem::Node(e)),
                    None => self.stash.push(Value::Undefined),
                },
                other => return Err(condition_type(other.type_name().to_owned(), span)),
            },
            Instruction::Apply { argc, span } => return self.apply(argc, span),
            Instruction::RestoreEnv(frame) => self.env = frame,
            Instruction::FrameMarker { .. } | Instruction::LoopMarker { .. } => {}
            Instruction::WhileTest { test, body, span } => {
                self.guard.on_loop_test(span, &self.env)?;
                match self.pop_value() {
                    Value::Bool(true) => {
                        self.agenda.push(ControlItem::Instr(Instruction::WhileTest {
                            test,
                            body,
                            span,
                        }));
                        self.agenda.push(ControlItem::Node(test));
                        self.agenda.push(ControlItem::Instr(Instruction::LoopIterEnd {
                            stash_height: self.stash.len(),
                        }));
                        self.agenda.push(ControlItem::Node(body));
                    }
                    Value::Bool(false) => self.stash.push(Value::Undefined),
                    other => return Err(condition_type(other.type_name().to_owned(), span)),
                }
            }
            Instruction::LoopIterEnd { stash_height } => self.stash.truncate(stash_height),
            Instruction::ReturnSignal(span) => return self.unwind_return(span),
            Instruction::Declare { name, constant } => {
                let value = self.pop_value();
                self.env.init(name, value, constant);
                self.stash.push(Value::Undefined);
            }
            Instruction::AssignTo { name, span } => {
                // The assigned value stays on the stash as the
                // expression's value.
                let value = self.stash.last().cloned().unwrap_or(Value::Undefined);
                self.env.assign(name, value).map_err(|e| match e {
                    AssignError::Constant => {
                        errors::constant_reassignment(self.name_text(name), span)
                    }
                    AssignError::Unbound => errors::unbound_name(self.name_text(name), span),
                    AssignError::Uninitialized => {
                        errors::uninitialized_access(self.name_text(name), span)
                    }
                })?;
            }
            Instruction::PopStash => {
                let _ = self.pop_value();
            }
            Instruction::PushUndefined => self.stash.push(Value::Undefined),
        }
        Ok(StepEvent::Continue)
    }

    // Blocks

    fn enter_block(&mut self, range: StmtRange) -> Result<(), EvalError> {
        if range.is_empty() {
            self.stash.push(Value::Undefined);
            return Ok(());
        }
        // Hoist every declared name as unassigned before any statement
        // runs; duplicates surface here, at the offending statement.
        let arena = self.arena.clone();
        let child = self.env.extend();
        for stmt in arena.get_stmts(range) {
            if let Some(name) = stmt.kind.declared_name() {
                child
                    .declare(name)
                    .map_err(|_| redeclaration(self.name_text(name), stmt.span))?;
            }
        }
        self.push_restore(self.env.clone());
        self.env = child;

        // The block's value is the last statement's; the separators
        // discard earlier statement values.
        let ids: SmallVec<[StmtId; 8]> = range.iter().collect();
        let mut first = true;
        for &id in ids.iter().rev() {
            if first {
                first = false;
            } else {
                self.agenda.push(ControlItem::Instr(Instruction::PopStash));
            }
            self.agenda.push(ControlItem::Stmt(id));
        }
        Ok(())
    }

    // Unwinding

    fn unwind_break(&mut self, span: Span) -> Result<StepEvent, EvalError> {
        loop {
            match self.agenda.pop() {
                Some(ControlItem::Instr(Instruction::LoopMarker { stash_height })) => {
                    // Operands of expressions abandoned by the jump are
                    // dropped along with their pending instructions.
                    self.stash.truncate(stash_height);
                    self.stash.push(Value::Undefined);
                    return Ok(StepEvent::Continue);
                }
                Some(ControlItem::Instr(Instruction::RestoreEnv(frame))) => self.env = frame,
                Some(ControlItem::Instr(Instruction::FrameMarker { .. })) | None => {
                    return Err(misplaced_control("break", span));
                }
                Some(_) => {}
            }
        }
    }

    fn unwind_continue(&mut self, span: Span) -> Result<StepEvent, EvalError> {
        loop {
            if let Some(ControlItem::Instr(Instruction::LoopIterEnd { stash_height })) =
                self.agenda.last()
            {
                // Stop just above the iteration end, dropping operands
                // of abandoned expressions; the stand-in body value is
                // for the iteration end to discard.
                let height = *stash_height;
                self.stash.truncate(height);
                self.stash.push(Value::Undefined);
                return Ok(StepEvent::Continue);
            }
            match self.agenda.pop() {
                Some(ControlItem::Instr(Instruction::RestoreEnv(frame))) => self.env = frame,
                Some(ControlItem::Instr(Instruction::FrameMarker { .. })) | None => {
                    return Err(misplaced_control("continue", span));
                }
                Some(_) => {}
            }
        }
    }

    fn unwind_return(&mut self, span: Span) -> Result<StepEvent, EvalError> {
        let value = self.pop_value();
        loop {
            match self.agenda.pop() {
                Some(ControlItem::Instr(Instruction::FrameMarker { stash_height })) => {
                    // Drop operands of expressions abandoned inside the
                    // call before delivering its value.
                    self.stash.truncate(stash_height);
                    self.stash.push(value);
                    return Ok(StepEvent::Continue);
                }
                Some(ControlItem::Instr(Instruction::RestoreEnv(frame))) => self.env = frame,
                Some(_) => {}
                None => return Err(misplaced_control("return", span)),
            }
        }
    }

    // Helpers

    /// Push an environment-restore instruction, collapsing adjacent
    /// restores: if the top is already a restore, executing both in a
    /// row would leave only the deeper one's effect.
    pub(crate) fn push_restore(&mut self, env: Frame) {
        if let Some(ControlItem::Instr(Instruction::RestoreEnv(_))) = self.agenda.last() {
            return;
        }
        self.agenda
            .push(ControlItem::Instr(Instruction::RestoreEnv(env)));
    }

    /// Pop the stash. The push/pop discipline of the instruction set
    /// guarantees a value is present; the fallback is unreachable.
    pub(crate) fn pop_value(&mut self) -> Value {
        self.stash.pop().unwrap_or(Value::Undefined)
    }

    pub(crate) fn name_text(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }
}
