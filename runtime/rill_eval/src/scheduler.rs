//! Drivers: policies for how many steps to run before yielding.
//!
//! The machine knows what a step is; a driver decides when to stop
//! taking them. All drivers are plain polling loops over
//! [`Machine::step`], so suspension never needs host coroutines: a
//! suspended run is just the machine parked inside a [`RunState`]
//! variant, resumable later from any thread's turn (the machine itself
//! stays on one thread).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use rill_ir::{ExprId, SharedArena, SharedInterner, Span};

use crate::builtins;
use crate::environment::Frame;
use crate::errors::{interrupted, EvalError};
use crate::guard::GuardOptions;
use crate::machine::{Machine, StepEvent};
use crate::Value;

/// Shared cooperative-cancellation flag, checked between steps.
///
/// Safe to set from any thread; the run observes it at the next step
/// boundary and aborts with an interruption error.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the run holding this flag.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Re-arm the flag for another run.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Stepping policy.
#[derive(Clone, Debug)]
pub enum Driver {
    /// Run at most `step_budget` steps per turn, then suspend.
    TimeSliced { step_budget: u64 },
    /// Run until completion, an error, a breakpoint span is about to be
    /// evaluated, or the program pauses itself.
    RunToPause { breakpoints: Vec<Span> },
    /// Enumerate non-deterministic solutions one resume at a time.
    Backtracking,
}

/// Options for one run.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub driver: Driver,
    pub guard: GuardOptions,
    pub interrupt: Option<InterruptFlag>,
}

impl Default for RunOptions {
    /// Run to completion with the default guard and no breakpoints.
    fn default() -> Self {
        RunOptions {
            driver: Driver::RunToPause {
                breakpoints: Vec::new(),
            },
            guard: GuardOptions::default(),
            interrupt: None,
        }
    }
}

impl RunOptions {
    pub fn new(driver: Driver) -> Self {
        RunOptions {
            driver,
            ..RunOptions::default()
        }
    }

    #[must_use]
    pub fn with_guard(mut self, guard: GuardOptions) -> Self {
        self.guard = guard;
        self
    }

    #[must_use]
    pub fn with_interrupt(mut self, flag: InterruptFlag) -> Self {
        self.interrupt = Some(flag);
        self
    }
}

/// A parked, resumable run.
pub struct Suspension {
    pub(crate) machine: Machine,
    pub(crate) options: RunOptions,
}

/// Where a run stands after a turn.
pub enum RunState {
    /// The program produced this value.
    Finished(Value),
    /// The run aborted; nothing in the language catches errors.
    Errored(EvalError),
    /// The step budget ran out; resume to continue.
    SuspendedBudget(Box<Suspension>),
    /// A breakpoint or explicit pause was hit at `at`.
    SuspendedBreakpoint { paused: Box<Suspension>, at: Span },
    /// One non-deterministic solution (`None` before the first turn);
    /// resume to search for the next.
    SuspendedSolution {
        paused: Box<Suspension>,
        solution: Option<Value>,
    },
}

impl RunState {
    /// The final value, if the run finished.
    pub fn finished(&self) -> Option<&Value> {
        match self {
            RunState::Finished(v) => Some(v),
            _ => None,
        }
    }

    /// The error, if the run aborted.
    pub fn errored(&self) -> Option<&EvalError> {
        match self {
            RunState::Errored(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Debug for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Finished(v) => write!(f, "Finished({v:?})"),
            RunState::Errored(e) => write!(f, "Errored({e})"),
            RunState::SuspendedBudget(_) => f.write_str("SuspendedBudget"),
            RunState::SuspendedBreakpoint { at, .. } => {
                write!(f, "SuspendedBreakpoint(at {at})")
            }
            RunState::SuspendedSolution { solution, .. } => {
                write!(f, "SuspendedSolution({solution:?})")
            }
        }
    }
}

/// Embedding entry point: owns the syntax arena, the interner, and the
/// pre-populated global frame.
pub struct Runtime {
    arena: SharedArena,
    interner: SharedInterner,
    globals: Frame,
}

impl Runtime {
    /// Create a runtime with the standard builtins installed.
    pub fn new(arena: SharedArena, interner: SharedInterner) -> Self {
        let globals = Frame::global();
        builtins::install(&globals, &interner);
        Runtime {
            arena,
            interner,
            globals,
        }
    }

    /// Install an additional global binding (embedder hook).
    pub fn define_global(&self, name: &str, value: Value) {
        self.globals.define(self.interner.intern(name), value, true);
    }

    /// Start a run. Suspended states are continued with
    /// [`Runtime::resume`].
    pub fn run(&self, program: ExprId, options: RunOptions) -> RunState {
        let machine = Machine::new(
            self.arena.clone(),
            self.interner.clone(),
            self.globals.clone(),
            program,
            options.guard.clone(),
        );
        if matches!(options.driver, Driver::Backtracking) {
            // The enumeration protocol: the first turn yields no
            // solution, each resume searches for the next one.
            tracing::debug!("search primed");
            return RunState::SuspendedSolution {
                paused: Box::new(Suspension { machine, options }),
                solution: None,
            };
        }
        drive(machine, options, false)
    }

    /// Continue a suspended run. Terminal states pass through
    /// unchanged.
    pub fn resume(&self, state: RunState) -> RunState {
        match state {
            RunState::SuspendedBudget(suspension) => {
                drive(suspension.machine, suspension.options, false)
            }
            // Skip the breakpoint we are standing on, or stepping would
            // never get past it.
            RunState::SuspendedBreakpoint { paused, .. } => {
                drive(paused.machine, paused.options, true)
            }
            RunState::SuspendedSolution { paused, solution } => {
                let mut machine = paused.machine;
                if solution.is_some() {
                    // The previous solution consumed the machine's
                    // state; rewind to the next untried alternative.
                    match machine.backtrack() {
                        Ok(StepEvent::Exhausted) => {
                            return RunState::Finished(Value::Undefined);
                        }
                        Ok(_) => {}
                        Err(e) => return RunState::Errored(e),
                    }
                }
                drive(machine, paused.options, false)
            }
            terminal => terminal,
        }
    }
}

/// The shared polling loop all drivers run on.
fn drive(mut machine: Machine, options: RunOptions, mut at_breakpoint: bool) -> RunState {
    let mut budget = match options.driver {
        Driver::TimeSliced { step_budget } => Some(step_budget),
        _ => None,
    };
    let breakpoints: Option<FxHashSet<Span>> = match &options.driver {
        Driver::RunToPause { breakpoints } if !breakpoints.is_empty() => {
            Some(breakpoints.iter().copied().collect())
        }
        _ => None,
    };
    let enumerating = matches!(options.driver, Driver::Backtracking);
    let interrupt = options.interrupt.clone();

    loop {
        if let Some(flag) = &interrupt {
            if flag.is_set() {
                tracing::debug!("run interrupted, discarding machine state");
                return RunState::Errored(interrupted());
            }
        }
        if let Some(remaining) = &mut budget {
            if *remaining == 0 {
                tracing::debug!("step budget exhausted, suspending");
                return RunState::SuspendedBudget(Box::new(Suspension { machine, options }));
            }
            *remaining -= 1;
        }
        if let Some(spans) = &breakpoints {
            if let Some(span) = machine.next_span() {
                if spans.contains(&span) && !at_breakpoint {
                    tracing::debug!(%span, "breakpoint hit, suspending");
                    return RunState::SuspendedBreakpoint {
                        paused: Box::new(Suspension { machine, options }),
                        at: span,
                    };
                }
            }
        }
        at_breakpoint = false;

        match machine.step() {
            Ok(StepEvent::Continue) => {}
            Ok(StepEvent::Paused(span)) => {
                tracing::debug!(%span, "program paused itself");
                return RunState::SuspendedBreakpoint {
                    paused: Box::new(Suspension { machine, options }),
                    at: span,
                };
            }
            Ok(StepEvent::Done(value)) => {
                return if enumerating {
                    tracing::debug!("solution found, suspending enumeration");
                    RunState::SuspendedSolution {
                        paused: Box::new(Suspension { machine, options }),
                        solution: Some(value),
                    }
                } else {
                    RunState::Finished(value)
                };
            }
            Ok(StepEvent::Exhausted) => return RunState::Finished(Value::Undefined),
            Err(e) => return RunState::Errored(e),
        }
    }
}
