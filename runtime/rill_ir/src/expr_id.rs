//! Arena indices for the flat syntax tree.
//!
//! Nodes reference children through `u32` indices instead of boxes:
//! the tree is a set of contiguous arrays inside [`ExprArena`], and a
//! node handle is 4 bytes with O(1) equality.
//!
//! [`ExprArena`]: crate::ExprArena

use std::fmt;

/// Index of an expression node in the arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    /// Invalid expression ID (sentinel value).
    pub const INVALID: ExprId = ExprId(u32::MAX);

    /// Create a new `ExprId`.
    #[inline]
    pub const fn new(index: u32) -> Self {
        ExprId(index)
    }

    /// Index into the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this is a valid ID.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "ExprId({})", self.0)
        } else {
            write!(f, "ExprId::INVALID")
        }
    }
}

impl Default for ExprId {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Index of a statement node in the arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct StmtId(u32);

impl StmtId {
    /// Create a new `StmtId`.
    #[inline]
    pub const fn new(index: u32) -> Self {
        StmtId(index)
    }

    /// Index into the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StmtId({})", self.0)
    }
}

/// Contiguous run of statements in the arena (a block body).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StmtRange {
    pub start: u32,
    pub len: u16,
}

impl StmtRange {
    /// Empty range.
    pub const EMPTY: StmtRange = StmtRange { start: 0, len: 0 };

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.len as usize
    }

    /// Iterate the statement IDs in source order.
    pub fn iter(self) -> impl DoubleEndedIterator<Item = StmtId> + ExactSizeIterator {
        (self.start..self.start + u32::from(self.len)).map(StmtId::new)
    }
}

/// Contiguous run of expression IDs in the arena's side list (call args).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ExprRange {
    pub start: u32,
    pub len: u16,
}

impl ExprRange {
    /// Empty range.
    pub const EMPTY: ExprRange = ExprRange { start: 0, len: 0 };

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.len as usize
    }
}

/// Contiguous run of parameter names in the arena's side list.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ParamRange {
    pub start: u32,
    pub len: u16,
}

impl ParamRange {
    /// Empty range.
    pub const EMPTY: ParamRange = ParamRange { start: 0, len: 0 };

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.len as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_expr_id() {
        assert!(!ExprId::INVALID.is_valid());
        assert!(ExprId::new(0).is_valid());
        assert_eq!(ExprId::default(), ExprId::INVALID);
    }

    #[test]
    fn stmt_range_iteration() {
        let range = StmtRange { start: 3, len: 2 };
        let ids: Vec<_> = range.iter().collect();
        assert_eq!(ids, vec![StmtId::new(3), StmtId::new(4)]);
        assert_eq!(range.len(), 2);
        assert!(StmtRange::EMPTY.is_empty());
    }
}
