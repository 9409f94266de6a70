//! Arena allocation for the flat syntax tree.
//!
//! The arena owns four contiguous arrays: expression nodes, statement
//! nodes, a side list of expression IDs (call arguments), and a side
//! list of parameter names. A program is an [`ExprId`] plus a shared
//! reference to the arena that allocated it; IDs are only meaningful
//! within their originating arena.
//!
//! The `alloc_*` methods double as a tree-building surface for
//! embedders and tests, since source-text parsing lives outside this
//! workspace.

use std::sync::Arc;

use crate::{
    BinaryOp, Expr, ExprId, ExprKind, ExprRange, Name, ParamRange, Span, Stmt, StmtId, StmtKind,
    StmtRange, UnaryOp,
};

/// Arena of syntax nodes.
#[derive(Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    expr_lists: Vec<ExprId>,
    params: Vec<Name>,
}

/// Shared, immutable arena handle.
///
/// Closures capture their body IDs; continuations capture whole agenda
/// copies. Both may outlive the scope that built the tree, so the
/// evaluator holds the arena through this shared handle.
pub type SharedArena = Arc<ExprArena>;

impl ExprArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze the arena into a shared handle.
    pub fn into_shared(self) -> SharedArena {
        Arc::new(self)
    }

    // Allocation

    /// Allocate an expression node.
    pub fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId::new(u32::try_from(self.exprs.len()).unwrap_or(u32::MAX));
        self.exprs.push(Expr::new(kind, span));
        id
    }

    /// Allocate a contiguous run of statements (a block body).
    ///
    /// Ranges hold at most `u16::MAX` statements; longer blocks are a
    /// malformed input from the parsing collaborator.
    pub fn alloc_stmts(&mut self, stmts: Vec<Stmt>) -> StmtRange {
        let start = u32::try_from(self.stmts.len()).unwrap_or(u32::MAX);
        let len = u16::try_from(stmts.len()).unwrap_or(u16::MAX);
        self.stmts.extend(stmts);
        StmtRange { start, len }
    }

    /// Allocate a call-argument list.
    pub fn alloc_exprs(&mut self, ids: &[ExprId]) -> ExprRange {
        let start = u32::try_from(self.expr_lists.len()).unwrap_or(u32::MAX);
        let len = u16::try_from(ids.len()).unwrap_or(u16::MAX);
        self.expr_lists.extend_from_slice(ids);
        ExprRange { start, len }
    }

    /// Allocate a parameter-name list.
    pub fn alloc_params(&mut self, names: &[Name]) -> ParamRange {
        let start = u32::try_from(self.params.len()).unwrap_or(u32::MAX);
        let len = u16::try_from(names.len()).unwrap_or(u16::MAX);
        self.params.extend_from_slice(names);
        ParamRange { start, len }
    }

    // Access

    /// Get an expression node.
    #[inline]
    pub fn get_expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    /// Get a statement node.
    #[inline]
    pub fn get_stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    /// Get the statements of a block body.
    #[inline]
    pub fn get_stmts(&self, range: StmtRange) -> &[Stmt] {
        &self.stmts[range.start as usize..range.start as usize + range.len()]
    }

    /// Get a call-argument list.
    #[inline]
    pub fn get_exprs(&self, range: ExprRange) -> &[ExprId] {
        &self.expr_lists[range.start as usize..range.start as usize + range.len()]
    }

    /// Get a parameter-name list.
    #[inline]
    pub fn get_params(&self, range: ParamRange) -> &[Name] {
        &self.params[range.start as usize..range.start as usize + range.len()]
    }

    /// Number of expression nodes allocated.
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    // Convenience constructors (embedder/test surface)

    /// Number literal node.
    pub fn number(&mut self, value: f64, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Number(value.to_bits()), span)
    }

    /// Text literal node.
    pub fn text(&mut self, name: Name, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Text(name), span)
    }

    /// Boolean literal node.
    pub fn boolean(&mut self, value: bool, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Bool(value), span)
    }

    /// Absence-marker literal node.
    pub fn undefined(&mut self, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Undefined, span)
    }

    /// Name reference node.
    pub fn ident(&mut self, name: Name, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Ident(name), span)
    }

    /// Unary operation node.
    pub fn unary(&mut self, op: UnaryOp, operand: ExprId, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Unary { op, operand }, span)
    }

    /// Binary operation node.
    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Binary { op, lhs, rhs }, span)
    }

    /// Conditional node.
    pub fn conditional(
        &mut self,
        test: ExprId,
        then_branch: ExprId,
        else_branch: Option<ExprId>,
        span: Span,
    ) -> ExprId {
        self.alloc_expr(
            ExprKind::Conditional {
                test,
                then_branch,
                else_branch,
            },
            span,
        )
    }

    /// Call node.
    pub fn call(&mut self, callee: ExprId, args: &[ExprId], span: Span) -> ExprId {
        let args = self.alloc_exprs(args);
        self.alloc_expr(ExprKind::Call { callee, args }, span)
    }

    /// Anonymous lambda node.
    pub fn lambda(&mut self, params: &[Name], body: ExprId, span: Span) -> ExprId {
        let params = self.alloc_params(params);
        self.alloc_expr(
            ExprKind::Lambda {
                name: Name::EMPTY,
                params,
                body,
            },
            span,
        )
    }

    /// Block node.
    pub fn block(&mut self, stmts: Vec<Stmt>, span: Span) -> ExprId {
        let range = self.alloc_stmts(stmts);
        self.alloc_expr(ExprKind::Block(range), span)
    }

    /// While-loop node.
    pub fn while_loop(&mut self, test: ExprId, body: ExprId, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::While { test, body }, span)
    }

    /// Assignment node.
    pub fn assign(&mut self, target: Name, value: ExprId, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Assign { target, value }, span)
    }

    /// Break node.
    pub fn break_expr(&mut self, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Break, span)
    }

    /// Continue node.
    pub fn continue_expr(&mut self, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Continue, span)
    }

    /// Return node.
    pub fn ret(&mut self, value: Option<ExprId>, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Return(value), span)
    }

    /// Function declaration statement.
    pub fn func_stmt(&mut self, name: Name, params: &[Name], body: ExprId, span: Span) -> Stmt {
        let params = self.alloc_params(params);
        Stmt::new(StmtKind::Func { name, params, body }, span)
    }
}
