//! Choice points for non-deterministic search.
//!
//! A choice point is a machine snapshot plus the alternatives not yet
//! tried at it. Backtracking restores the most recent point that still
//! has an alternative; restoring clones the snapshot, so a point can be
//! revisited once per remaining alternative without decay.
//!
//! Side effects are not undone: environment frames are shared by
//! reference, so assignments made on an abandoned branch stay visible
//! after backtracking. Only control state (agenda, stash, frame
//! pointer) rewinds.

use crate::environment::Frame;
use crate::errors::EvalError;
use crate::machine::{ControlItem, Machine, StepEvent};
use crate::Value;

/// Structural copy of the machine's control state.
pub(crate) struct Snapshot {
    pub agenda: Vec<ControlItem>,
    pub stash: Vec<Value>,
    pub env: Frame,
}

/// A recorded fork in the search space.
pub(crate) struct ChoicePoint {
    /// Alternatives not yet delivered, in source order.
    pub remaining: Vec<Value>,
    pub snapshot: Snapshot,
}

impl Machine {
    /// Rewind to the most recent choice point with an untried
    /// alternative and deliver it; [`StepEvent::Exhausted`] when the
    /// whole search space is spent.
    pub(crate) fn backtrack(&mut self) -> Result<StepEvent, EvalError> {
        loop {
            match self.choices.last_mut() {
                None => {
                    tracing::debug!("search space exhausted");
                    return Ok(StepEvent::Exhausted);
                }
                Some(point) if point.remaining.is_empty() => {
                    self.choices.pop();
                }
                Some(point) => {
                    let next = point.remaining.remove(0);
                    tracing::debug!(
                        alternatives_left = point.remaining.len(),
                        "backtracking to previous choice point"
                    );
                    self.agenda = point.snapshot.agenda.clone();
                    self.stash = point.snapshot.stash.clone();
                    self.env = point.snapshot.env.clone();
                    self.stash.push(next);
                    return Ok(StepEvent::Continue);
                }
            }
        }
    }
}
