//! Rill IR - syntax tree types for the Rill runtime.
//!
//! This crate is the surface the explicit-control evaluator consumes
//! from its parsing/validation collaborators:
//! - [`Span`] for source locations
//! - [`Name`] / [`StringInterner`] for interned identifiers
//! - Flat AST nodes ([`Expr`], [`Stmt`]) with arena allocation
//!
//! # Design
//!
//! - **Intern everything**: strings become `Name(u32)`
//! - **Flatten everything**: no `Box<Expr>`, children are `ExprId(u32)`
//!   indices into an [`ExprArena`]
//!
//! Floats are stored as bits so every node stays `Eq + Hash`.

mod arena;
mod ast;
mod expr_id;
mod interner;
mod name;
mod span;

pub use arena::{ExprArena, SharedArena};
pub use ast::{BinaryOp, Expr, ExprKind, Stmt, StmtKind, UnaryOp};
pub use expr_id::{ExprId, ExprRange, ParamRange, StmtId, StmtRange};
pub use interner::{SharedInterner, StringInterner};
pub use name::Name;
pub use span::{Span, Spanned};
