//! Flat AST types using arena allocation.
//!
//! - No `Box<Expr>`: children are `ExprId(u32)` indices
//! - Contiguous arrays for cache locality
//! - Every node carries a [`Span`](crate::Span) for error reporting

mod expr;
mod operators;
mod stmt;

pub use expr::{Expr, ExprKind};
pub use operators::{BinaryOp, UnaryOp};
pub use stmt::{Stmt, StmtKind};
