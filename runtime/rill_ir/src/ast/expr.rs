//! Expression nodes.
//!
//! All children are arena indices, not boxes. Floats are stored as raw
//! bits so that nodes stay `Eq + Hash`.

use std::fmt;

use super::operators::{BinaryOp, UnaryOp};
use crate::{ExprId, ExprRange, Name, ParamRange, Span, Spanned, StmtRange};

/// Expression node.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}", self.kind, self.span)
    }
}

impl Spanned for Expr {
    fn span(&self) -> Span {
        self.span
    }
}

/// Expression variants, covering the fixed grammar the runtime
/// consumes from the parsing collaborator.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExprKind {
    /// Number literal, stored as `f64` bits for `Hash`.
    Number(u64),

    /// Text literal (interned).
    Text(Name),

    /// Boolean literal.
    Bool(bool),

    /// The absence marker literal.
    Undefined,

    /// Name reference.
    Ident(Name),

    /// Unary operation: `-x`, `!x`.
    Unary { op: UnaryOp, operand: ExprId },

    /// Binary operation: `a + b`. Left operand evaluates first.
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },

    /// Conditional: `test ? then : else` / `if (test) ... else ...`.
    /// `else_branch` of `None` yields the absence marker.
    Conditional {
        test: ExprId,
        then_branch: ExprId,
        else_branch: Option<ExprId>,
    },

    /// Call: operator evaluates first, then operands left-to-right.
    Call { callee: ExprId, args: ExprRange },

    /// Function or lambda form. `name` is `Name::EMPTY` for anonymous
    /// lambdas and carries the declared name otherwise (diagnostics).
    Lambda {
        name: Name,
        params: ParamRange,
        body: ExprId,
    },

    /// Block: introduces a fresh scope; value is the last statement's
    /// value, or the absence marker when empty.
    Block(StmtRange),

    /// While loop; value is always the absence marker.
    While { test: ExprId, body: ExprId },

    /// Break out of the nearest enclosing loop.
    Break,

    /// Continue with the nearest enclosing loop's next iteration.
    Continue,

    /// Return from the nearest enclosing function.
    Return(Option<ExprId>),

    /// Assignment to an already-declared name; value is the assigned
    /// value.
    Assign { target: Name, value: ExprId },
}
