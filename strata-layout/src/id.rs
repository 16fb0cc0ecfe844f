//! Short integer identifiers for layout entities.
//!
//! Locality groups, families, and columns are each addressed on disk by a
//! small positive integer scoped to their parent. IDs are assigned by the
//! layout compiler, stay stable across layout updates, and are never
//! recycled within a layout's lifetime except through explicit deletion.

use std::fmt;

use rustc_hash::FxHashMap;

/// Positive integer short identifier for a locality group, family, or
/// column within its scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnId(i32);

impl ColumnId {
    /// Wraps a raw identifier. Callers must pass a positive value.
    pub fn new(id: i32) -> Self {
        assert!(id >= 1, "column IDs are positive, got {id}");
        ColumnId(id)
    }

    /// The raw integer value.
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bidirectional mapping between entity IDs and primary names within one
/// scope (the columns of a family, the families of a locality group, or
/// the locality groups of a table).
///
/// The mapping is bijective once a layout is frozen; during construction
/// the builders use [`IdNameMap::insert`]'s return value to detect ID
/// collisions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdNameMap {
    by_id: FxHashMap<ColumnId, String>,
    by_name: FxHashMap<String, ColumnId>,
}

impl IdNameMap {
    /// Binds `id` to `name`. Returns the name previously bound to `id`, if
    /// any; the caller treats that as a collision.
    pub(crate) fn insert(&mut self, id: ColumnId, name: String) -> Option<String> {
        let previous = self.by_id.insert(id, name.clone());
        if let Some(stale) = &previous {
            self.by_name.remove(stale);
        }
        self.by_name.insert(name, id);
        previous
    }

    /// The primary name bound to `id`.
    pub fn name(&self, id: ColumnId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// The ID bound to the primary name `name`.
    pub fn id(&self, name: &str) -> Option<ColumnId> {
        self.by_name.get(name).copied()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the map holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterates over `(id, primary name)` bindings in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (ColumnId, &str)> + '_ {
        self.by_id.iter().map(|(&id, name)| (id, name.as_str()))
    }

    pub(crate) fn name_to_id(&self) -> &FxHashMap<String, ColumnId> {
        &self.by_name
    }
}

/// Hands out the smallest positive IDs not yet taken among siblings.
///
/// The scan counter persists across calls, so pending entities submitted in
/// declaration order receive increasing IDs even when deletion left holes
/// behind the counter. Allocation is deterministic and reproducible: the
/// same descriptor always yields the same IDs.
pub(crate) struct IdAllocator {
    next: i32,
}

impl IdAllocator {
    pub(crate) fn new() -> Self {
        Self { next: 1 }
    }

    /// The smallest ID at or above the counter that is absent from `used`.
    pub(crate) fn next_free(&mut self, used: &IdNameMap) -> ColumnId {
        loop {
            let candidate = ColumnId::new(self.next);
            self.next += 1;
            if used.name(candidate).is_none() {
                return candidate;
            }
        }
    }
}
