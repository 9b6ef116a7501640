//! Interned 1-based file identifiers for the compact build-info encoding.

use std::num::NonZeroU32;

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// A 1-based index into the build-info `fileNames` array.
///
/// Id `0` is reserved as "absent", which the `NonZeroU32` representation
/// enforces: deserializing a zero id fails.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(NonZeroU32);

impl FileId {
    /// Creates a `FileId` from a raw 1-based index, returning `None` for zero.
    pub fn from_raw(index: u32) -> Option<Self> {
        NonZeroU32::new(index).map(Self)
    }

    /// Returns the raw 1-based index of this identifier.
    pub fn as_raw(self) -> u32 {
        self.0.get()
    }

    /// Returns the 0-based position of this file in the `fileNames` array.
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

// SAFETY: the interner hands out dense 0-based indices; `FileId` stores them
// shifted by one so `into_usize` and `try_from_usize` are exact inverses and
// `try_from_usize` rejects indices whose shifted value does not fit in `u32`.
unsafe impl lasso::Key for FileId {
    fn into_usize(self) -> usize {
        self.index()
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        let shifted = u32::try_from(int).ok()?.checked_add(1)?;
        NonZeroU32::new(shifted).map(FileId)
    }
}

/// Assigns [`FileId`]s to file names in first-use order.
///
/// Backed by [`lasso::ThreadedRodeo`] so that interning the same name twice
/// yields the same id without allocating.
pub struct FileIdInterner {
    rodeo: ThreadedRodeo<FileId>,
}

impl FileIdInterner {
    /// Creates a new empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns a file name, returning its id. The first name interned gets id 1.
    pub fn intern(&self, name: &str) -> FileId {
        self.rodeo.get_or_intern(name)
    }

    /// Returns the id of an already-interned name.
    pub fn get(&self, name: &str) -> Option<FileId> {
        self.rodeo.get(name)
    }

    /// Returns the number of interned names.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Returns `true` if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }

    /// Returns every interned name ordered by id.
    pub fn names(&self) -> Vec<String> {
        (0..self.rodeo.len())
            .filter_map(|index| <FileId as lasso::Key>::try_from_usize(index))
            .map(|id| self.rodeo.resolve(&id).to_string())
            .collect()
    }
}

impl Default for FileIdInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_one_based_in_first_use_order() {
        let interner = FileIdInterner::new();
        let a = interner.intern("./a.ts");
        let b = interner.intern("./b.ts");
        assert_eq!(a.as_raw(), 1);
        assert_eq!(b.as_raw(), 2);
        assert_eq!(interner.intern("./a.ts"), a);
        assert_eq!(interner.names(), vec!["./a.ts", "./b.ts"]);
    }

    #[test]
    fn zero_is_reserved() {
        assert!(FileId::from_raw(0).is_none());
        assert!(serde_json::from_str::<FileId>("0").is_err());
    }

    #[test]
    fn index_is_zero_based() {
        let id = FileId::from_raw(3).unwrap();
        assert_eq!(id.index(), 2);
    }

    #[test]
    fn serde_as_plain_number() {
        let id = FileId::from_raw(7).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: FileId = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn get_without_interning() {
        let interner = FileIdInterner::new();
        assert!(interner.get("./missing.ts").is_none());
        assert!(interner.is_empty());
    }
}
