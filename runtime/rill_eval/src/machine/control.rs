//! Agenda items: syntax nodes and synthesized instructions.
//!
//! The machine never recurses on the host stack. Evaluating a node
//! pushes smaller work items back on the agenda; instructions are the
//! continuations of partially-evaluated nodes (apply this operator,
//! branch on that test, restore the previous environment).
//!
//! Everything here is `Clone`: continuations and choice points snapshot
//! whole agendas structurally.

use rill_ir::{BinaryOp, ExprId, Name, Span, StmtId, UnaryOp};

use crate::environment::Frame;

/// One agenda entry.
#[derive(Clone, Debug)]
pub enum ControlItem {
    /// Evaluate an expression node.
    Node(ExprId),
    /// Execute a statement node.
    Stmt(StmtId),
    /// Execute a synthesized instruction.
    Instr(Instruction),
}

/// Synthesized machine instruction.
///
/// Instructions that can fail carry the span of the node that
/// synthesized them, so errors point at source even though the node
/// itself has already been popped.
#[derive(Clone, Debug)]
pub enum Instruction {
    /// Pop two operands, apply the operator, push the result.
    ApplyBinary { op: BinaryOp, span: Span },

    /// Pop one operand, apply the operator, push the result.
    ApplyUnary { op: UnaryOp, span: Span },

    /// Pop the test value and queue the taken branch. `span` is the
    /// test expression's, for condition-type errors.
    Branch {
        then_branch: ExprId,
        else_branch: Option<ExprId>,
        span: Span,
    },

    /// Pop `argc` arguments and the callee, then dispatch the call.
    Apply { argc: usize, span: Span },

    /// Switch the machine back to a previously-active environment.
    RestoreEnv(Frame),

    /// Call boundary: `return` unwinds to here, truncating the stash
    /// back to the recorded height; reaching it normally is a no-op.
    FrameMarker { stash_height: usize },

    /// Loop boundary: `break` unwinds through here, truncating the
    /// stash back to the recorded height; reaching it normally is a
    /// no-op (the loop value was already pushed).
    LoopMarker { stash_height: usize },

    /// Pop the test value; re-queue the next iteration when true, push
    /// the loop's value (the absence marker) when false.
    WhileTest {
        test: ExprId,
        body: ExprId,
        span: Span,
    },

    /// End of one loop iteration: restore the stash to the recorded
    /// height, discarding the body's value. `continue` unwinds to just
    /// above here.
    LoopIterEnd { stash_height: usize },

    /// Unwind to the nearest enclosing call boundary, carrying the
    /// stash top as the call's value.
    ReturnSignal(Span),

    /// Execute a declaration: pop the initializer value and initialize
    /// the binding in the current frame, then push the statement's
    /// value (the absence marker). Cannot fail; duplicates were caught
    /// at block entry.
    Declare { name: Name, constant: bool },

    /// Assign the stash top (kept in place, it is the expression's
    /// value) to the nearest declaring frame.
    AssignTo { name: Name, span: Span },

    /// Discard the stash top (statement separator).
    PopStash,

    /// Push the absence marker.
    PushUndefined,
}
