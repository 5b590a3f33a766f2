//! Extension modules implemented in Rust.
//!
//! Extension modules are registered when the context is created but stay
//! uninitialized until first imported, so their classes and functions are
//! only built when a program asks for them.

use crate::{
    context::Context,
    exception::RunResult,
    heap::{HeapData, HeapId, NativeData},
};

pub(crate) mod pcre;

/// Registers every extension module with `ctx`.
pub(crate) fn register_extensions(ctx: &mut Context) -> RunResult<()> {
    pcre::register(ctx)?;
    Ok(())
}

impl Context {
    /// Borrows the native payload of `id` as a `T`, if it holds one.
    #[must_use]
    pub fn native_ref<T: NativeData>(&self, id: HeapId) -> Option<&T> {
        match self.heap.data(id) {
            HeapData::Native(data) => data.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}
