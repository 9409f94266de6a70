//! Call dispatch: closures, builtins, machine primitives, and
//! continuation invocation.
//!
//! The stash holds the callee below its arguments in evaluation order;
//! the apply instruction pops all of them and dispatches on the
//! callee's tag. The continuation-capture, choice, filter, and pause
//! primitives are intercepted here rather than called through the
//! native convention, because they manipulate the machine itself.

use smallvec::{smallvec, SmallVec};

use rill_ir::{Name, Span};

use crate::errors::{arity_mismatch, condition_type, non_callable, EvalError};
use crate::nondet::{ChoicePoint, Snapshot};
use crate::value::{BuiltinKind, BuiltinValue, ClosureValue, ContinuationValue};
use crate::Value;

use super::{ControlItem, Instruction, Machine, StepEvent};

/// Argument buffer; most calls have few arguments.
type Args = SmallVec<[Value; 4]>;

impl Machine {
    pub(crate) fn apply(&mut self, argc: usize, span: Span) -> Result<StepEvent, EvalError> {
        let mut args: Args = SmallVec::with_capacity(argc);
        for _ in 0..argc {
            args.push(self.pop_value());
        }
        args.reverse();
        let callee = self.pop_value();
        self.apply_callable(callee, args, span)
    }

    fn apply_callable(
        &mut self,
        callee: Value,
        args: Args,
        span: Span,
    ) -> Result<StepEvent, EvalError> {
        match callee {
            Value::Closure(closure) => self.apply_closure(&closure, &args, span),
            Value::Builtin(builtin) => self.apply_builtin(&builtin, args, span),
            Value::Continuation(continuation) => {
                self.invoke_continuation(&continuation, &args);
                Ok(StepEvent::Continue)
            }
            other => Err(non_callable(other.type_name().to_owned(), span)),
        }
    }

    fn apply_closure(
        &mut self,
        closure: &ClosureValue,
        args: &[Value],
        span: Span,
    ) -> Result<StepEvent, EvalError> {
        let arena = self.arena.clone();
        let params = arena.get_params(closure.params);
        if params.len() != args.len() {
            return Err(arity_mismatch(
                self.closure_label(closure.name),
                params.len(),
                args.len(),
                span,
            ));
        }
        self.guard.on_call(span, args)?;

        // Tail-call elimination: when nothing remains between here and
        // the enclosing call boundary but environment restores and a
        // pending return, this call can reuse that boundary instead of
        // stacking a new one. The elided restores are safe to drop:
        // the boundary's own restore below it survives.
        if !self.elide_tail_frames() {
            self.push_restore(self.env.clone());
            self.agenda.push(ControlItem::Instr(Instruction::FrameMarker {
                stash_height: self.stash.len(),
            }));
        }

        let frame = closure.env.extend();
        for (param, value) in params.iter().zip(args) {
            frame.define(*param, value.clone(), false);
        }
        self.env = frame;
        self.agenda.push(ControlItem::Node(closure.body));
        Ok(StepEvent::Continue)
    }

    fn apply_builtin(
        &mut self,
        builtin: &BuiltinValue,
        args: Args,
        span: Span,
    ) -> Result<StepEvent, EvalError> {
        if let Some(expected) = builtin.arity {
            if expected != args.len() {
                return Err(arity_mismatch(builtin.name, expected, args.len(), span));
            }
        }
        match &builtin.kind {
            BuiltinKind::Native(f) => {
                let result = f(&args).map_err(|e| e.with_span(span))?;
                self.stash.push(result);
                Ok(StepEvent::Continue)
            }
            BuiltinKind::CallCc => {
                // Capture after the apply popped its operands: the
                // snapshot is exactly "what happens with this call's
                // value".
                let receiver = args.into_iter().next().unwrap_or(Value::Undefined);
                let captured = Value::Continuation(std::rc::Rc::new(ContinuationValue {
                    agenda: self.agenda.clone(),
                    stash: self.stash.clone(),
                    env: self.env.clone(),
                }));
                self.apply_callable(receiver, smallvec![captured], span)
            }
            BuiltinKind::Amb => {
                if args.is_empty() {
                    return self.backtrack();
                }
                let mut remaining: Vec<Value> = args.into_vec();
                let first = remaining.remove(0);
                tracing::debug!(
                    alternatives = remaining.len() + 1,
                    "recording choice point"
                );
                self.choices.push(ChoicePoint {
                    remaining,
                    snapshot: Snapshot {
                        agenda: self.agenda.clone(),
                        stash: self.stash.clone(),
                        env: self.env.clone(),
                    },
                });
                self.stash.push(first);
                Ok(StepEvent::Continue)
            }
            BuiltinKind::Require => match args.first() {
                Some(Value::Bool(true)) => {
                    self.stash.push(Value::Undefined);
                    Ok(StepEvent::Continue)
                }
                Some(Value::Bool(false)) => self.backtrack(),
                Some(other) => Err(condition_type(other.type_name().to_owned(), span)),
                None => Err(arity_mismatch(builtin.name, 1, 0, span)),
            },
            BuiltinKind::Pause => {
                // The pause call's value is the absence marker; the
                // machine is left resumable at the very next step.
                self.stash.push(Value::Undefined);
                Ok(StepEvent::Paused(span))
            }
        }
    }

    /// Replace the machine's state with fresh clones of the captured
    /// snapshot and deliver the argument as the captured point's value.
    ///
    /// Invocation arity is deliberately unchecked: zero arguments
    /// deliver the absence marker, extras are ignored.
    fn invoke_continuation(&mut self, continuation: &ContinuationValue, args: &[Value]) {
        self.agenda = continuation.agenda.clone();
        self.stash = continuation.stash.clone();
        self.env = continuation.env.clone();
        self.stash
            .push(args.first().cloned().unwrap_or(Value::Undefined));
    }

    /// Drop agenda items above the enclosing call boundary when they
    /// are only restores and a pending return. Returns whether a
    /// boundary was found and reused.
    fn elide_tail_frames(&mut self) -> bool {
        let mut keep = self.agenda.len();
        while keep > 0 {
            match &self.agenda[keep - 1] {
                ControlItem::Instr(
                    Instruction::RestoreEnv(_) | Instruction::ReturnSignal(_),
                ) => keep -= 1,
                ControlItem::Instr(Instruction::FrameMarker { .. }) => {
                    self.agenda.truncate(keep);
                    return true;
                }
                _ => return false,
            }
        }
        false
    }

    fn closure_label(&self, name: Name) -> &'static str {
        if name == Name::EMPTY {
            "<lambda>"
        } else {
            self.name_text(name)
        }
    }
}
