//! Typed runtime errors for the evaluator.
//!
//! Each error carries a structured [`EvalErrorKind`], the source span of
//! the offending node ([`Span::DUMMY`] when the error was synthesized by
//! an instruction with no direct source mapping), and an optional
//! remediation hint surfaced in verbose mode.
//!
//! Factory functions are the construction surface: they populate the
//! kind and hint together so call sites never assemble message text by
//! hand. The first runtime error aborts the whole run; nothing in the
//! language can catch it.

use std::fmt;

use rill_ir::Span;

use crate::Value;

/// Result of a single evaluation.
pub type EvalResult = Result<Value, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// A name was declared twice in the same frame.
    Redeclaration { name: String },
    /// A name is absent from every frame in the chain.
    UnboundName { name: String },
    /// A name exists but its declaration has not executed yet
    /// (temporal-dead-zone violation).
    UninitializedAccess { name: String },
    /// Assignment to a `const` binding.
    ConstantReassignment { name: String },
    /// Operator applied to operands of the wrong kind.
    OperandType {
        op: &'static str,
        expected: &'static str,
        got: String,
    },
    /// Conditional or loop test evaluated to a non-boolean.
    ConditionType { got: String },
    /// Call with the wrong number of arguments.
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
    /// Call target is not a function, builtin, or continuation.
    NonCallable { got: String },
    /// `break`/`continue` outside a loop, or `return` outside a
    /// function (reaches the machine only on unvalidated trees).
    MisplacedControl { what: &'static str },
    /// The runaway guard flagged a likely-infinite computation.
    InfiniteLoopSuspected { trace: String },
    /// Cooperative cancellation was requested.
    Interrupted,
    /// The `error` builtin was invoked by the program.
    UserRaised { message: String },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalErrorKind::Redeclaration { name } => {
                write!(f, "name '{name}' is already declared in this scope")
            }
            EvalErrorKind::UnboundName { name } => {
                write!(f, "name '{name}' is not declared")
            }
            EvalErrorKind::UninitializedAccess { name } => {
                write!(f, "name '{name}' is used before its declaration has run")
            }
            EvalErrorKind::ConstantReassignment { name } => {
                write!(f, "cannot assign to constant '{name}'")
            }
            EvalErrorKind::OperandType { op, expected, got } => {
                write!(f, "operator '{op}' expects {expected}, got {got}")
            }
            EvalErrorKind::ConditionType { got } => {
                write!(f, "condition must be a boolean, got {got}")
            }
            EvalErrorKind::Arity {
                name,
                expected,
                got,
            } => {
                write!(f, "'{name}' expects {expected} argument(s), got {got}")
            }
            EvalErrorKind::NonCallable { got } => {
                write!(f, "value of kind {got} is not callable")
            }
            EvalErrorKind::MisplacedControl { what } => {
                write!(f, "'{what}' used outside its enclosing construct")
            }
            EvalErrorKind::InfiniteLoopSuspected { trace } => {
                write!(f, "computation does not appear to terminate: {trace}")
            }
            EvalErrorKind::Interrupted => f.write_str("evaluation was interrupted"),
            EvalErrorKind::UserRaised { message } => write!(f, "error: {message}"),
        }
    }
}

/// A runtime error with source position and optional remediation hint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub span: Span,
    pub hint: Option<&'static str>,
}

impl EvalError {
    /// Create an error with an unknown source position.
    pub fn new(kind: EvalErrorKind) -> Self {
        EvalError {
            kind,
            span: Span::DUMMY,
            hint: None,
        }
    }

    /// Attach a span if the error does not yet carry one.
    ///
    /// Builtins construct errors without position information; the
    /// machine fills in the call site before surfacing them.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_dummy() {
            self.span = span;
        }
        self
    }

    fn hinted(mut self, hint: &'static str) -> Self {
        self.hint = Some(hint);
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.span)
    }
}

impl std::error::Error for EvalError {}

// Factory functions

pub fn redeclaration(name: &str, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::Redeclaration {
        name: name.to_owned(),
    })
    .with_span(span)
    .hinted("rename the binding or remove the duplicate declaration")
}

pub fn unbound_name(name: &str, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::UnboundName {
        name: name.to_owned(),
    })
    .with_span(span)
    .hinted("declare the name with 'let' or 'const' before using it")
}

pub fn uninitialized_access(name: &str, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::UninitializedAccess {
        name: name.to_owned(),
    })
    .with_span(span)
    .hinted("move the use after the declaration statement")
}

pub fn constant_reassignment(name: &str, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::ConstantReassignment {
        name: name.to_owned(),
    })
    .with_span(span)
    .hinted("declare the binding with 'let' if it must change")
}

pub fn operand_type(op: &'static str, expected: &'static str, got: String) -> EvalError {
    EvalError::new(EvalErrorKind::OperandType { op, expected, got })
        .hinted("check the operand kinds against the operator table")
}

pub fn condition_type(got: String, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::ConditionType { got })
        .with_span(span)
        .hinted("tests must evaluate to true or false, not a truthy value")
}

pub fn arity_mismatch(name: &str, expected: usize, got: usize, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::Arity {
        name: name.to_owned(),
        expected,
        got,
    })
    .with_span(span)
    .hinted("adjust the call to pass the declared number of arguments")
}

pub fn non_callable(got: String, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::NonCallable { got })
        .with_span(span)
        .hinted("only functions, builtins, and continuations can be applied")
}

pub fn misplaced_control(what: &'static str, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::MisplacedControl { what }).with_span(span)
}

pub fn infinite_loop_suspected(trace: String, span: Span) -> EvalError {
    EvalError::new(EvalErrorKind::InfiniteLoopSuspected { trace })
        .with_span(span)
        .hinted("check the recursion or loop for a missing progress step")
}

pub fn interrupted() -> EvalError {
    EvalError::new(EvalErrorKind::Interrupted)
}

pub fn user_raised(message: String) -> EvalError {
    EvalError::new(EvalErrorKind::UserRaised { message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_span_fills_only_dummy() {
        let err = unbound_name("x", Span::new(3, 4));
        assert_eq!(err.span, Span::new(3, 4));
        let err = err.with_span(Span::new(10, 20));
        assert_eq!(err.span, Span::new(3, 4));
    }

    #[test]
    fn display_includes_position() {
        let err = redeclaration("a", Span::new(5, 6));
        let msg = format!("{err}");
        assert!(msg.contains("'a'"));
        assert!(msg.contains("5..6"));
    }

    #[test]
    fn builtin_errors_start_without_position() {
        let err = operand_type("+", "two numbers or two texts", "boolean".to_owned());
        assert!(err.span.is_dummy());
        assert!(format!("{err}").contains("<unknown>"));
    }

    #[test]
    fn factories_carry_hints() {
        assert!(uninitialized_access("x", Span::DUMMY).hint.is_some());
        assert!(interrupted().hint.is_none());
    }
}
