//! String interner for identifier storage.
//!
//! Interned strings live for the lifetime of the process (the runtime
//! keeps one interner per embedding), so storage leaks the string data
//! once and hands out `&'static str` views.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::Name;

struct InternerInner {
    /// Map from string content to index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents, indexed by `Name`.
    strings: Vec<&'static str>,
}

/// Interner mapping identifier text to compact [`Name`] handles.
///
/// Index 0 is always the empty string, matching [`Name::EMPTY`].
pub struct StringInterner {
    inner: RwLock<InternerInner>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned.
    pub fn new() -> Self {
        let empty: &'static str = "";
        let mut map = FxHashMap::default();
        map.insert(empty, 0);
        StringInterner {
            inner: RwLock::new(InternerInner {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Intern a string, returning its handle.
    ///
    /// Repeated interning of the same content returns the same `Name`.
    pub fn intern(&self, text: &str) -> Name {
        if let Some(&idx) = self.inner.read().map.get(text) {
            return Name::from_raw(idx);
        }
        let mut inner = self.inner.write();
        // Re-check under the write lock: another caller may have won.
        if let Some(&idx) = inner.map.get(text) {
            return Name::from_raw(idx);
        }
        let leaked: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let idx = u32::try_from(inner.strings.len()).unwrap_or(u32::MAX);
        inner.strings.push(leaked);
        inner.map.insert(leaked, idx);
        Name::from_raw(idx)
    }

    /// Resolve a handle back to its string content.
    ///
    /// Returns the empty string for handles this interner never issued.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.inner
            .read()
            .strings
            .get(name.index())
            .copied()
            .unwrap_or("")
    }

    /// Number of interned strings (including the pre-interned empty string).
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Whether the interner holds only the pre-interned empty string.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a [`StringInterner`].
#[derive(Clone, Default)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    /// Create a fresh shared interner.
    pub fn new() -> Self {
        SharedInterner(Arc::new(StringInterner::new()))
    }
}

impl std::ops::Deref for SharedInterner {
    type Target = StringInterner;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("factorial");
        let b = interner.intern("factorial");
        assert_eq!(a, b);
        assert_eq!(interner.lookup(a), "factorial");
    }

    #[test]
    fn distinct_strings_get_distinct_names() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let y = interner.intern("y");
        assert_ne!(x, y);
        assert_eq!(interner.lookup(x), "x");
        assert_eq!(interner.lookup(y), "y");
    }

    #[test]
    fn empty_string_is_pre_interned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert!(interner.is_empty());
    }

    #[test]
    fn unknown_name_resolves_to_empty() {
        let interner = StringInterner::new();
        assert_eq!(interner.lookup(Name::from_raw(999)), "");
    }

    #[test]
    fn shared_interner_aliases_storage() {
        let shared = SharedInterner::new();
        let clone = shared.clone();
        let name = shared.intern("display");
        assert_eq!(clone.lookup(name), "display");
    }
}
