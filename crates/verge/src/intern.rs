//! Attribute-name interning.
//!
//! Every slot, field and definition name is stored once and referred to by a
//! [`StringId`]. Shape nodes key their tables by `StringId`, so resolving an
//! attribute never hashes the name more than once.

use ahash::AHashMap;

/// Index into the interner's storage.
///
/// Uses `u32` to save space; four billion distinct attribute names is more
/// than any program will produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct StringId(u32);

impl StringId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interner for attribute and definition names.
///
/// Names are never removed: the interner lives as long as the context that
/// owns it.
#[derive(Debug, Default)]
pub struct Interns {
    strings: Vec<Box<str>>,
    lookup: AHashMap<Box<str>, StringId>,
}

impl Interns {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning the existing id if it was seen before.
    pub fn intern(&mut self, name: &str) -> StringId {
        if let Some(&id) = self.lookup.get(name) {
            return id;
        }
        let id = StringId(u32::try_from(self.strings.len()).unwrap_or(u32::MAX));
        self.strings.push(name.into());
        self.lookup.insert(name.into(), id);
        id
    }

    /// Returns the id for `name` without interning it.
    ///
    /// A name that was never interned cannot be present in any shape, so
    /// lookups use this to short-circuit.
    #[must_use]
    pub fn get_id(&self, name: &str) -> Option<StringId> {
        self.lookup.get(name).copied()
    }

    /// Returns the string for an interned id.
    #[must_use]
    pub fn get_str(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_twice_returns_same_id() {
        let mut interns = Interns::new();
        let a = interns.intern("append");
        let b = interns.intern("len");
        assert_eq!(interns.intern("append"), a);
        assert_ne!(a, b);
        assert_eq!(interns.get_str(b), "len");
        assert_eq!(interns.get_id("missing"), None);
        assert_eq!(interns.len(), 2);
    }
}
