//! Shape maps (hidden classes).
//!
//! A shape is a node in a per-context trie of attribute layouts. Each node maps
//! attribute names to slot indices; extending a node with a name yields the
//! canonical child node for that name, so every object that receives the same
//! attribute names in the same order ends up sharing one node.
//!
//! Nodes are arena-allocated in a [`ShapeTable`] and never freed, which keeps
//! [`ShapeId`]s stable for the life of the context.

use ahash::AHashMap;

use crate::intern::StringId;

/// Index of a node in the [`ShapeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u32);

impl ShapeId {
    /// The root node with no attributes; every table starts with it.
    pub const EMPTY: Self = Self(0);

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single node of the shape trie.
///
/// `index_map` holds the full layout (copied from the parent on creation), not
/// just the last name, so [`ShapeTable::find`] is a single hash lookup.
#[derive(Debug, Default)]
struct ShapeNode {
    index_map: AHashMap<StringId, u32>,
    names: Vec<StringId>,
    extensions: AHashMap<StringId, ShapeId>,
}

/// Arena of shape nodes owned by one context.
///
/// Mutation goes through `&mut self`, so the create-if-absent step in
/// [`extend`](Self::extend) can never race: two extensions of the same node
/// with the same name always observe the same cache.
#[derive(Debug)]
pub struct ShapeTable {
    nodes: Vec<ShapeNode>,
}

impl Default for ShapeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeTable {
    /// Creates a table containing only [`ShapeId::EMPTY`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![ShapeNode::default()],
        }
    }

    /// Returns the slot index of `name` in `shape`, if the shape contains it.
    ///
    /// Only the node's own table is consulted; superclasses and overrides are
    /// the caller's business.
    #[inline]
    #[must_use]
    pub fn find(&self, shape: ShapeId, name: StringId) -> Option<usize> {
        self.nodes[shape.index()].index_map.get(&name).map(|&i| i as usize)
    }

    /// Returns the canonical child of `shape` extended by `name`.
    ///
    /// The first call builds the child by copying the parent's layout and
    /// appending `name` at the next index; later calls with the same
    /// `(shape, name)` return the identical node. Extending with a name the
    /// shape already holds is a logic error in the caller (slots would
    /// diverge from the layout), so it is checked in debug builds.
    pub fn extend(&mut self, shape: ShapeId, name: StringId) -> ShapeId {
        if let Some(&child) = self.nodes[shape.index()].extensions.get(&name) {
            return child;
        }
        debug_assert!(
            self.find(shape, name).is_none(),
            "extending a shape with an attribute it already holds"
        );
        let parent = &self.nodes[shape.index()];
        let mut index_map = parent.index_map.clone();
        let mut names = parent.names.clone();
        index_map.insert(name, u32::try_from(names.len()).unwrap_or(u32::MAX));
        names.push(name);

        let child = ShapeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(ShapeNode {
            index_map,
            names,
            extensions: AHashMap::new(),
        });
        self.nodes[shape.index()].extensions.insert(name, child);
        child
    }

    /// Number of attributes laid out by `shape`.
    #[must_use]
    pub fn len(&self, shape: ShapeId) -> usize {
        self.nodes[shape.index()].names.len()
    }

    /// Attribute names of `shape` in slot order.
    #[must_use]
    pub fn names(&self, shape: ShapeId) -> &[StringId] {
        &self.nodes[shape.index()].names
    }

    /// Total number of nodes ever created, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
