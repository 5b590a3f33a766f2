//! Boundaries to the bytecode collaborators.
//!
//! The object model never decodes bytecode. Applying a bytecode function goes
//! through the attached [`Engine`]; resolving a bytecode offset to source
//! positions goes through the attached [`SourceMap`]. Both are optional: a
//! context with only native code needs neither.

use std::fmt;

use crate::{
    args::ArgValues,
    context::Context,
    exception::{RunResult, SrcLocation},
    heap::HeapId,
    pump::Producer,
};

/// Executes bytecode functions.
///
/// Methods take `&self` because the engine is shared: bytecode calls native
/// code, which may call back into bytecode. Implementations keep mutable
/// state behind their own interior mutability.
pub trait Engine: fmt::Debug {
    /// Runs `func` to completion and returns its result.
    ///
    /// # Arguments
    /// * `func` - A Function whose entry point is a bytecode offset
    /// * `args` - Positional arguments, receiver first for bound functions
    fn apply(&self, ctx: &mut Context, func: HeapId, args: ArgValues) -> RunResult<HeapId>;

    /// Starts `func` as a generator, returning the producer for its series.
    fn apply_pump(&self, ctx: &mut Context, func: HeapId, args: ArgValues) -> RunResult<Box<dyn Producer>>;
}

/// Resolves bytecode offsets to source positions.
pub trait SourceMap: fmt::Debug {
    /// Source locations for the instruction at `pc` in a module's bytecode.
    ///
    /// # Arguments
    /// * `mod_id` - Id of the module that owns `bytecode`
    /// * `bytecode` - The module's bytecode blob
    /// * `pc` - Byte offset of the instruction
    fn src_locations(&self, mod_id: &str, bytecode: &[u8], pc: usize) -> Vec<SrcLocation>;
}
