//! Heuristic detection of runaway computations.
//!
//! The guard watches for state that stops advancing: a call site
//! re-entered over and over with identical argument values, or a loop
//! head re-tested with an unchanged environment fingerprint. Both are
//! strong signals that no progress is being made. Hard caps on agenda
//! and stash depth catch the remaining case, unbounded non-tail
//! recursion, before it exhausts host memory.
//!
//! Deep but terminating computation must never trip the heuristic:
//! changing arguments or changing bindings reset the repeat counters,
//! and the caps sit far above any reasonable working depth.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

use rill_ir::{Name, Span};

use crate::environment::{Frame, Slot};
use crate::errors::{infinite_loop_suspected, EvalError};
use crate::Value;

/// Guard tuning knobs.
#[derive(Clone, Debug)]
pub struct GuardOptions {
    pub enabled: bool,
    /// Identical-state repetitions tolerated at one site before the
    /// run is flagged.
    pub repeat_threshold: u32,
    /// Hard cap on agenda depth.
    pub max_agenda: usize,
    /// Hard cap on stash depth.
    pub max_stash: usize,
}

impl Default for GuardOptions {
    fn default() -> Self {
        GuardOptions {
            enabled: true,
            repeat_threshold: 10_000,
            max_agenda: 262_144,
            max_stash: 262_144,
        }
    }
}

impl GuardOptions {
    /// Guard that never fires.
    pub fn disabled() -> Self {
        GuardOptions {
            enabled: false,
            ..GuardOptions::default()
        }
    }
}

struct SiteRecord {
    fingerprint: u64,
    count: u32,
}

/// Per-run guard state.
pub struct RunawayGuard {
    options: GuardOptions,
    calls: FxHashMap<Span, SiteRecord>,
    loops: FxHashMap<Span, SiteRecord>,
}

impl RunawayGuard {
    pub fn new(options: GuardOptions) -> Self {
        RunawayGuard {
            options,
            calls: FxHashMap::default(),
            loops: FxHashMap::default(),
        }
    }

    /// Enforce the agenda/stash hard caps. Called every step.
    pub fn check_sizes(&self, agenda: usize, stash: usize) -> Result<(), EvalError> {
        if !self.options.enabled {
            return Ok(());
        }
        if agenda > self.options.max_agenda {
            return Err(infinite_loop_suspected(
                format!(
                    "pending-work depth exceeded {} items (unbounded recursion?)",
                    self.options.max_agenda
                ),
                Span::DUMMY,
            ));
        }
        if stash > self.options.max_stash {
            return Err(infinite_loop_suspected(
                format!(
                    "operand depth exceeded {} values (unbounded recursion?)",
                    self.options.max_stash
                ),
                Span::DUMMY,
            ));
        }
        Ok(())
    }

    /// Record a closure call; flags the site once it has been
    /// re-entered with identical arguments past the threshold.
    pub fn on_call(&mut self, site: Span, args: &[Value]) -> Result<(), EvalError> {
        // A dummy span would alias every synthesized site together.
        if !self.options.enabled || site.is_dummy() {
            return Ok(());
        }
        let fingerprint = fingerprint_args(args);
        let count = bump(&mut self.calls, site, fingerprint);
        if count > self.options.repeat_threshold {
            return Err(infinite_loop_suspected(
                format!("call at {site} re-entered {count} times with identical arguments"),
                site,
            ));
        }
        Ok(())
    }

    /// Record a loop-head test; flags the loop once its environment
    /// fingerprint has repeated past the threshold.
    pub fn on_loop_test(&mut self, site: Span, env: &Frame) -> Result<(), EvalError> {
        if !self.options.enabled || site.is_dummy() {
            return Ok(());
        }
        let fingerprint = fingerprint_env(env);
        let count = bump(&mut self.loops, site, fingerprint);
        if count > self.options.repeat_threshold {
            return Err(infinite_loop_suspected(
                format!("loop at {site} re-tested {count} times without any binding changing"),
                site,
            ));
        }
        Ok(())
    }
}

/// Increment the site's repeat counter, resetting it whenever the
/// fingerprint moves.
fn bump(records: &mut FxHashMap<Span, SiteRecord>, site: Span, fingerprint: u64) -> u32 {
    let record = records.entry(site).or_insert(SiteRecord {
        fingerprint,
        count: 0,
    });
    if record.fingerprint == fingerprint {
        record.count += 1;
    } else {
        record.fingerprint = fingerprint;
        record.count = 1;
    }
    record.count
}

fn fingerprint_args(args: &[Value]) -> u64 {
    let mut hasher = FxHasher::default();
    args.len().hash(&mut hasher);
    for value in args {
        hash_value(&mut hasher, value);
    }
    hasher.finish()
}

/// Fingerprint of every binding lexically visible from `env`.
///
/// Entries are sorted by name so that map iteration order cannot leak
/// into the fingerprint.
fn fingerprint_env(env: &Frame) -> u64 {
    let mut seen: FxHashSet<Name> = FxHashSet::default();
    let mut entries: Vec<(Name, u64)> = Vec::new();
    env.for_each_binding(|name, slot| {
        if seen.insert(name) {
            let mut hasher = FxHasher::default();
            match slot {
                Slot::Unassigned => hasher.write_u8(0),
                Slot::Assigned(v) | Slot::Constant(v) => hash_value(&mut hasher, v),
            }
            entries.push((name, hasher.finish()));
        }
    });
    entries.sort_unstable_by_key(|(name, _)| *name);
    let mut hasher = FxHasher::default();
    for (name, value_hash) in entries {
        name.raw().hash(&mut hasher);
        value_hash.hash(&mut hasher);
    }
    hasher.finish()
}

/// Shallow value fingerprint: primitives by content, shared payloads by
/// identity. Matches the strict-equality notion of "same value".
fn hash_value(hasher: &mut FxHasher, value: &Value) {
    match value {
        Value::Number(n) => {
            hasher.write_u8(1);
            n.to_bits().hash(hasher);
        }
        Value::Text(s) => {
            hasher.write_u8(2);
            s.as_ref().hash(hasher);
        }
        Value::Bool(b) => {
            hasher.write_u8(3);
            b.hash(hasher);
        }
        Value::Undefined => hasher.write_u8(4),
        Value::Null => hasher.write_u8(5),
        Value::Pair(p) => {
            hasher.write_u8(6);
            (Rc::as_ptr(p) as usize).hash(hasher);
        }
        Value::Closure(c) => {
            hasher.write_u8(7);
            (Rc::as_ptr(c) as usize).hash(hasher);
        }
        Value::Builtin(b) => {
            hasher.write_u8(8);
            (Rc::as_ptr(b) as usize).hash(hasher);
        }
        Value::Continuation(k) => {
            hasher.write_u8(9);
            (Rc::as_ptr(k) as usize).hash(hasher);
        }
    }
}
