//! Explicit-control evaluator and scheduler for the Rill runtime.
//!
//! The evaluator is a state machine over an explicit agenda (pending
//! work) and stash (intermediate values) instead of host-stack
//! recursion. That one decision buys everything the runtime promises:
//! unbounded tail recursion, first-class continuations (clone the
//! state), non-deterministic backtracking (clone it at a choice), and
//! cooperative scheduling (stop stepping whenever the driver says so).
//!
//! Embedders build programs against [`rill_ir::ExprArena`], construct a
//! [`Runtime`], and drive runs through [`RunOptions`] / [`RunState`]:
//!
//! ```
//! use rill_eval::{RunOptions, Runtime, Value};
//! use rill_ir::{ExprArena, SharedInterner, Span};
//!
//! let mut arena = ExprArena::new();
//! let one = arena.number(1.0, Span::new(0, 1));
//! let two = arena.number(2.0, Span::new(4, 5));
//! let sum = arena.binary(rill_ir::BinaryOp::Add, one, two, Span::new(0, 5));
//!
//! let runtime = Runtime::new(arena.into_shared(), SharedInterner::new());
//! let state = runtime.run(sum, RunOptions::default());
//! assert_eq!(state.finished(), Some(&Value::number(3.0)));
//! ```

pub mod builtins;
pub mod environment;
pub mod errors;
pub mod guard;
pub mod machine;
pub mod nondet;
pub mod operators;
pub mod scheduler;
pub mod value;


pub use environment::{Frame, Slot};
pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use guard::GuardOptions;
pub use machine::{ControlItem, Instruction, Machine, StepEvent};
pub use scheduler::{Driver, InterruptFlag, RunOptions, RunState, Runtime};
pub use value::{BuiltinKind, NativeFn, Value};
