//! Partial applications: a function with its receiver and leading arguments fixed.

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::RunResult,
    heap::{HeapData, HeapId},
};

/// Payload of a partial application.
///
/// Applying it calls `func` with `receiver`, then `args`, then the caller's
/// arguments.
#[derive(Debug, Clone)]
pub struct Partial {
    pub(crate) receiver: HeapId,
    pub(crate) func: HeapId,
    pub(crate) args: Vec<HeapId>,
}

impl Partial {
    #[must_use]
    pub fn receiver(&self) -> HeapId {
        self.receiver
    }

    #[must_use]
    pub fn func(&self) -> HeapId {
        self.func
    }

    #[must_use]
    pub fn args(&self) -> &[HeapId] {
        &self.args
    }

    /// Receiver followed by the stored arguments.
    pub(crate) fn leading_args(&self) -> Vec<HeapId> {
        let mut leading = Vec::with_capacity(self.args.len() + 1);
        leading.push(self.receiver);
        leading.extend_from_slice(&self.args);
        leading
    }
}

impl Context {
    /// Creates a partial application of `func` to `receiver` and `args`.
    pub fn new_partial(&mut self, receiver: HeapId, func: HeapId, args: Vec<HeapId>) -> RunResult<HeapId> {
        let class = self.builtin(BuiltinId::PARTIAL_APPLICATION_CLASS)?;
        self.allocate(class, HeapData::Partial(Partial { receiver, func, args }))
    }

    #[must_use]
    pub fn partial_data(&self, id: HeapId) -> Option<&Partial> {
        match self.heap.data(id) {
            HeapData::Partial(partial) => Some(partial),
            _ => None,
        }
    }
}

pub(crate) fn bootstrap(ctx: &mut Context) -> RunResult<()> {
    let class = ctx.builtin(BuiltinId::PARTIAL_APPLICATION_CLASS)?;
    ctx.add_method(class, "to_str", partial_to_str)?;
    Ok(())
}

fn partial_to_str(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (partial, rest) = args.split_receiver("Partial_Application.to_str", ctx)?;
    rest.check_zero_args("Partial_Application.to_str", ctx)?;
    let Some(func) = ctx.partial_data(partial).map(|p| p.func) else {
        return Err(ctx.type_error("Partial_Application", partial));
    };
    let path = ctx.path(func, None)?;
    ctx.new_str(&format!("<Partial_Application of {path}>"))
}
