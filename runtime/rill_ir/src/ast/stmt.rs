//! Statement nodes for block bodies.

use std::fmt;

use crate::{ExprId, Name, ParamRange, Span, Spanned};

/// Statement node.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }

    /// Expression statement.
    pub fn expr(expr: ExprId, span: Span) -> Self {
        Stmt::new(StmtKind::Expr(expr), span)
    }

    /// `let` declaration statement.
    pub fn let_decl(name: Name, init: ExprId, span: Span) -> Self {
        Stmt::new(
            StmtKind::Let {
                name,
                init,
                constant: false,
            },
            span,
        )
    }

    /// `const` declaration statement.
    pub fn const_decl(name: Name, init: ExprId, span: Span) -> Self {
        Stmt::new(
            StmtKind::Let {
                name,
                init,
                constant: true,
            },
            span,
        )
    }
}

impl fmt::Debug for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}", self.kind, self.span)
    }
}

impl Spanned for Stmt {
    fn span(&self) -> Span {
        self.span
    }
}

/// Statement kinds.
///
/// All three declaration forms hoist their name into the enclosing
/// block's frame as unassigned at block entry; the binding becomes
/// readable only once the declaration statement itself executes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum StmtKind {
    /// Expression statement.
    Expr(ExprId),

    /// Variable declaration: `let x = init` / `const x = init`.
    Let {
        name: Name,
        init: ExprId,
        constant: bool,
    },

    /// Function declaration: `function f(params) body`. Binds `f` as a
    /// constant closure over the enclosing environment.
    Func {
        name: Name,
        params: ParamRange,
        body: ExprId,
    },
}

impl StmtKind {
    /// The name this statement declares in its block, if any.
    pub fn declared_name(self) -> Option<Name> {
        match self {
            StmtKind::Expr(_) => None,
            StmtKind::Let { name, .. } | StmtKind::Func { name, .. } => Some(name),
        }
    }
}
