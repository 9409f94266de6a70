//! Environment model: frames of three-state binding slots.
//!
//! Frames form a singly-linked parent chain. A child frame holds a
//! shared reference to its parent; the parent lives as long as its
//! longest-living child, closure, or continuation. This is why frames
//! are reference-counted rather than stack-allocated: a captured
//! continuation may alias a frame long after the call that created it
//! has returned.
//!
//! All chain walks are iterative. The evaluator never recurses on the
//! host stack, and neither does its environment.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rill_ir::Name;

use crate::Value;

/// State of one binding slot.
///
/// A name is `Unassigned` from block entry (name hoisting) until its
/// declaration statement executes; reading or assigning it in that
/// window is a temporal-dead-zone violation.
#[derive(Clone, Debug)]
pub enum Slot {
    /// Declared but not yet initialized.
    Unassigned,
    /// Mutable binding.
    Assigned(Value),
    /// Immutable binding.
    Constant(Value),
}

/// Error from [`Frame::declare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclareError {
    /// The name already exists in this exact frame.
    AlreadyDeclared,
}

/// Error from [`Frame::lookup`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// Absent from every frame in the chain.
    Unbound,
    /// Found, but the declaration has not executed yet.
    Uninitialized,
}

/// Error from [`Frame::assign`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignError {
    /// Nearest declaring slot is a constant.
    Constant,
    /// Absent from every frame in the chain.
    Unbound,
    /// Found, but the declaration has not executed yet.
    Uninitialized,
}

/// Single-threaded reference-counted interior mutability wrapper.
///
/// Enforces that all frame allocations go through factory methods, and
/// makes it explicit that frames are `Rc`-shared, never `Arc`-shared:
/// there is exactly one active stepper at a time, so no locking.
#[repr(transparent)]
pub struct LocalFrame<T>(Rc<RefCell<T>>);

impl<T> LocalFrame<T> {
    fn alloc(value: T) -> Self {
        LocalFrame(Rc::new(RefCell::new(value)))
    }

    /// Borrow the inner value immutably.
    #[inline]
    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.0.borrow()
    }

    /// Borrow the inner value mutably.
    #[inline]
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Whether two handles alias the same frame.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for LocalFrame<T> {
    #[inline]
    fn clone(&self) -> Self {
        LocalFrame(Rc::clone(&self.0))
    }
}

/// Contents of one frame.
pub struct FrameData {
    slots: FxHashMap<Name, Slot>,
    parent: Option<Frame>,
}

/// Shared handle to a frame in the environment chain.
pub type Frame = LocalFrame<FrameData>;

impl Frame {
    /// Create a parentless frame (the global frame).
    pub fn global() -> Frame {
        LocalFrame::alloc(FrameData {
            slots: FxHashMap::default(),
            parent: None,
        })
    }

    /// Create a child frame; used on function call and block entry.
    #[must_use]
    pub fn extend(&self) -> Frame {
        LocalFrame::alloc(FrameData {
            slots: FxHashMap::default(),
            parent: Some(self.clone()),
        })
    }

    /// Declare a name in this exact frame as `Unassigned` (hoisting).
    ///
    /// A name is declared at most once per frame; a duplicate is a
    /// redeclaration error, never a silent shadow.
    pub fn declare(&self, name: Name) -> Result<(), DeclareError> {
        let mut data = self.borrow_mut();
        if data.slots.contains_key(&name) {
            return Err(DeclareError::AlreadyDeclared);
        }
        data.slots.insert(name, Slot::Unassigned);
        Ok(())
    }

    /// Directly install a binding in this frame.
    ///
    /// Used for parameter binding and for pre-populating the global
    /// frame with builtins; bypasses hoisting.
    pub fn define(&self, name: Name, value: Value, constant: bool) {
        let slot = if constant {
            Slot::Constant(value)
        } else {
            Slot::Assigned(value)
        };
        self.borrow_mut().slots.insert(name, slot);
    }

    /// Execute a declaration: transition this frame's slot to its
    /// initialized state.
    ///
    /// Unconditional by design: a continuation may re-enter the same
    /// declaration statement, which re-initializes the same slot.
    /// Duplicate *declarations* are caught by [`Frame::declare`] at
    /// block entry.
    pub fn init(&self, name: Name, value: Value, constant: bool) {
        self.define(name, value, constant);
    }

    /// Look a name up, walking the parent chain outward.
    pub fn lookup(&self, name: Name) -> Result<Value, LookupError> {
        let mut current = self.clone();
        loop {
            let parent = {
                let data = current.borrow();
                if let Some(slot) = data.slots.get(&name) {
                    return match slot {
                        Slot::Assigned(v) | Slot::Constant(v) => Ok(v.clone()),
                        Slot::Unassigned => Err(LookupError::Uninitialized),
                    };
                }
                data.parent.clone()
            };
            match parent {
                Some(p) => current = p,
                None => return Err(LookupError::Unbound),
            }
        }
    }

    /// Assign to the nearest frame declaring `name`.
    pub fn assign(&self, name: Name, value: Value) -> Result<(), AssignError> {
        let mut current = self.clone();
        loop {
            let parent = {
                let mut data = current.borrow_mut();
                if let Some(slot) = data.slots.get_mut(&name) {
                    return match slot {
                        Slot::Assigned(_) => {
                            *slot = Slot::Assigned(value);
                            Ok(())
                        }
                        Slot::Constant(_) => Err(AssignError::Constant),
                        Slot::Unassigned => Err(AssignError::Uninitialized),
                    };
                }
                data.parent.clone()
            };
            match parent {
                Some(p) => current = p,
                None => return Err(AssignError::Unbound),
            }
        }
    }

    /// Number of bindings in this frame alone.
    pub fn local_len(&self) -> usize {
        self.borrow().slots.len()
    }

    /// Visit every binding visible from this frame, innermost first.
    ///
    /// Shadowed outer bindings are still visited; callers that need
    /// lexical visibility must track seen names themselves. Used by the
    /// runaway guard to fingerprint loop state.
    pub fn for_each_binding(&self, mut f: impl FnMut(Name, &Slot)) {
        let mut current = self.clone();
        loop {
            let parent = {
                let data = current.borrow();
                for (name, slot) in &data.slots {
                    f(*name, slot);
                }
                data.parent.clone()
            };
            match parent {
                Some(p) => current = p,
                None => return,
            }
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.borrow();
        write!(
            f,
            "Frame(slots={}, parent={})",
            data.slots.len(),
            if data.parent.is_some() { "yes" } else { "no" }
        )
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;

    fn name(raw: u32) -> Name {
        Name::from_raw(raw)
    }

    #[test]
    fn declare_then_init_then_lookup() {
        let frame = Frame::global();
        let x = name(1);
        frame.declare(x).unwrap();
        assert_eq!(frame.lookup(x), Err(LookupError::Uninitialized));
        frame.init(x, Value::number(1.0), false);
        assert_eq!(frame.lookup(x).unwrap(), Value::number(1.0));
    }

    #[test]
    fn duplicate_declaration_in_same_frame_fails() {
        let frame = Frame::global();
        let x = name(1);
        frame.declare(x).unwrap();
        assert_eq!(frame.declare(x), Err(DeclareError::AlreadyDeclared));
    }

    #[test]
    fn same_name_in_child_frame_shadows() {
        let parent = Frame::global();
        let x = name(1);
        parent.define(x, Value::number(1.0), false);
        let child = parent.extend();
        child.declare(x).unwrap();
        child.init(x, Value::number(2.0), false);
        assert_eq!(child.lookup(x).unwrap(), Value::number(2.0));
        assert_eq!(parent.lookup(x).unwrap(), Value::number(1.0));
    }

    #[test]
    fn tdz_shadow_never_falls_back_to_outer_binding() {
        let parent = Frame::global();
        let x = name(1);
        parent.define(x, Value::number(5.0), false);
        let child = parent.extend();
        child.declare(x).unwrap();
        // Declared-but-unassigned in the child: the outer binding must
        // not leak through.
        assert_eq!(child.lookup(x), Err(LookupError::Uninitialized));
    }

    #[test]
    fn assign_walks_to_declaring_frame() {
        let parent = Frame::global();
        let x = name(1);
        parent.define(x, Value::number(1.0), false);
        let child = parent.extend();
        child.assign(x, Value::number(9.0)).unwrap();
        assert_eq!(parent.lookup(x).unwrap(), Value::number(9.0));
    }

    #[test]
    fn assign_to_constant_fails() {
        let frame = Frame::global();
        let c = name(1);
        frame.define(c, Value::number(1.0), true);
        assert_eq!(
            frame.assign(c, Value::number(2.0)),
            Err(AssignError::Constant)
        );
    }

    #[test]
    fn assign_to_undeclared_fails() {
        let frame = Frame::global();
        assert_eq!(
            frame.assign(name(7), Value::number(1.0)),
            Err(AssignError::Unbound)
        );
    }

    #[test]
    fn assign_in_dead_zone_fails() {
        let frame = Frame::global();
        let x = name(1);
        frame.declare(x).unwrap();
        assert_eq!(
            frame.assign(x, Value::number(1.0)),
            Err(AssignError::Uninitialized)
        );
    }

    #[test]
    fn frames_are_shared_not_copied() {
        let parent = Frame::global();
        let x = name(1);
        parent.define(x, Value::number(1.0), false);
        let child_a = parent.extend();
        let child_b = parent.extend();
        child_a.assign(x, Value::number(3.0)).unwrap();
        assert_eq!(child_b.lookup(x).unwrap(), Value::number(3.0));
    }

    #[test]
    fn continuation_reentry_may_reinit() {
        let frame = Frame::global();
        let x = name(1);
        frame.declare(x).unwrap();
        frame.init(x, Value::number(1.0), true);
        // Re-executing the declaration (continuation re-entry) is
        // allowed even for constants.
        frame.init(x, Value::number(2.0), true);
        assert_eq!(frame.lookup(x).unwrap(), Value::number(2.0));
    }
}
