//! Heap arena for boxed objects.
//!
//! Every runtime value lives in the context's [`Heap`] and is referred to by a
//! copyable [`HeapId`]. Each entry is a [`HeapValue`]: the shared slot
//! component (class, shape, slots) plus a kind-specific [`HeapData`] payload.
//!
//! Objects are never freed before the heap is dropped; identity comparison is
//! `HeapId` equality.

use std::{any::Any, collections::BTreeMap, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    exception::ExceptionData,
    resource::{ResourceError, ResourceLimits},
    shape::ShapeId,
    types::{Class, DictKey, Function, Module, Partial},
};

/// Identity of a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapId(u32);

impl HeapId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Payload for objects owned by extension modules.
///
/// The payload is dropped together with the heap, which is where a native
/// resource (compiled pattern, file handle, ...) is released.
pub trait NativeData: Any + fmt::Debug {
    /// Short name of the payload kind, used in heap statistics.
    fn kind_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// Kind-specific part of a boxed object.
///
/// The set of kinds is closed; extension modules use [`HeapData::Native`].
#[derive(Debug, strum::IntoStaticStr)]
pub enum HeapData {
    /// A plain instance with no payload beyond its slots.
    Object,
    Class(Class),
    Module(Module),
    Function(Function),
    Partial(Partial),
    Int(i64),
    Str(Rc<str>),
    List(Vec<HeapId>),
    /// Elements keyed by their hash key, in insertion order.
    Set(IndexMap<DictKey, HeapId>),
    /// `(key, value)` pairs keyed by the key's hash key, in insertion order.
    Dict(IndexMap<DictKey, (HeapId, HeapId)>),
    Exception(ExceptionData),
    Native(Box<dyn NativeData>),
}

/// A boxed object: class, slot layout, slot values and payload.
///
/// `slots.len()` always equals the number of attributes laid out by `shape`.
#[derive(Debug)]
pub struct HeapValue {
    pub(crate) class: HeapId,
    pub(crate) shape: ShapeId,
    pub(crate) slots: Vec<HeapId>,
    pub(crate) data: HeapData,
}

impl HeapValue {
    /// The object's class.
    #[must_use]
    pub fn class(&self) -> HeapId {
        self.class
    }

    #[must_use]
    pub fn shape(&self) -> ShapeId {
        self.shape
    }

    #[must_use]
    pub fn data(&self) -> &HeapData {
        &self.data
    }
}

/// Snapshot of heap occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub live_objects: usize,
    /// Live objects per payload kind (`"Object"`, `"List"`, ...).
    pub objects_by_kind: BTreeMap<&'static str, usize>,
}

/// Arena holding every object of a context.
#[derive(Debug, Default)]
pub struct Heap {
    values: Vec<HeapValue>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new object with an empty slot layout.
    ///
    /// # Arguments
    /// * `class` - The new object's class
    /// * `data` - Kind-specific payload
    /// * `limits` - Allocation limit to enforce
    pub fn allocate(&mut self, class: HeapId, data: HeapData, limits: &ResourceLimits) -> Result<HeapId, ResourceError> {
        limits.check_allocation(self.values.len())?;
        let id = self.next_id();
        self.values.push(HeapValue {
            class,
            shape: ShapeId::EMPTY,
            slots: Vec::new(),
            data,
        });
        Ok(id)
    }

    /// The id the next allocation will receive.
    ///
    /// Used during bootstrap, where the first classes are their own metaclass's
    /// instances before the metaclass exists.
    #[must_use]
    pub(crate) fn next_id(&self) -> HeapId {
        HeapId(u32::try_from(self.values.len()).unwrap_or(u32::MAX))
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: HeapId) -> &HeapValue {
        &self.values[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapValue {
        &mut self.values[id.index()]
    }

    #[inline]
    #[must_use]
    pub fn data(&self, id: HeapId) -> &HeapData {
        &self.values[id.index()].data
    }

    #[inline]
    pub fn data_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self.values[id.index()].data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let mut objects_by_kind = BTreeMap::new();
        for value in &self.values {
            let kind = match &value.data {
                HeapData::Native(native) => native.kind_name(),
                other => other.into(),
            };
            *objects_by_kind.entry(kind).or_insert(0) += 1;
        }
        HeapStats {
            live_objects: self.values.len(),
            objects_by_kind,
        }
    }
}
