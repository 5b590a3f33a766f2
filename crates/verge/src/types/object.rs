//! Methods of `Object`, the root of every class hierarchy.

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::RunResult,
    heap::{HeapData, HeapId},
    object::CompareOp,
};

pub(crate) fn bootstrap(ctx: &mut Context) -> RunResult<()> {
    let object_class = ctx.builtin(BuiltinId::OBJECT_CLASS)?;
    let builtins_mod = ctx.builtin(BuiltinId::BUILTINS_MODULE)?;
    let new_func = ctx.new_native_func("new_Object", false, new_object, builtins_mod)?;
    ctx.set_constructor(object_class, new_func)?;

    ctx.add_method(object_class, "init", object_init)?;
    ctx.add_method(object_class, "to_str", object_to_str)?;
    ctx.add_method(object_class, "==", object_eq)?;
    ctx.add_method(object_class, "!=", object_neq)?;
    ctx.add_method(object_class, "get_slot", object_get_slot)?;
    ctx.add_method(object_class, "find_slot", object_find_slot)?;
    ctx.add_method(object_class, "set_slot", object_set_slot)?;
    Ok(())
}

impl Context {
    /// Allocates an instance of `class` with payload `data`, then applies its `init` to `args`.
    ///
    /// This is the tail of every builtin constructor.
    pub(crate) fn construct(&mut self, class: HeapId, data: HeapData, args: ArgValues) -> RunResult<HeapId> {
        let obj = self.allocate(class, data)?;
        self.call_method(obj, "init", args)?;
        Ok(obj)
    }
}

/// The generic constructor: a plain instance of the class, initialized.
fn new_object(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Object.new", ctx)?;
    ctx.construct(class, HeapData::Object, rest)
}

/// Accepts and ignores any arguments.
fn object_init(ctx: &mut Context, _args: ArgValues) -> RunResult<HeapId> {
    Ok(ctx.null())
}

fn object_to_str(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (obj, rest) = args.split_receiver("Object.to_str", ctx)?;
    rest.check_zero_args("Object.to_str", ctx)?;
    let class_name = ctx.class_name_of(obj);
    ctx.new_str(&format!("<{class_name}@{obj}>"))
}

/// Identity comparison.
fn object_eq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (obj, rest) = args.split_receiver("Object.==", ctx)?;
    let other = rest.get_one_arg("Object.==", ctx)?;
    Ok(ctx.sentinel(obj == other))
}

fn object_neq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (obj, rest) = args.split_receiver("Object.!=", ctx)?;
    let other = rest.get_one_arg("Object.!=", ctx)?;
    let equal = ctx.compare(CompareOp::Eq, obj, other)?;
    Ok(ctx.sentinel(!equal))
}

fn object_get_slot(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (obj, rest) = args.split_receiver("Object.get_slot", ctx)?;
    let name = rest.get_one_arg("Object.get_slot", ctx)?;
    let name = ctx.expect_str(name)?;
    ctx.get_slot(obj, &name)
}

fn object_find_slot(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (obj, rest) = args.split_receiver("Object.find_slot", ctx)?;
    let name = rest.get_one_arg("Object.find_slot", ctx)?;
    let name = ctx.expect_str(name)?;
    Ok(ctx.find_slot(obj, &name)?.unwrap_or_else(|| ctx.fail()))
}

fn object_set_slot(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (obj, rest) = args.split_receiver("Object.set_slot", ctx)?;
    let (name, value) = rest.get_two_args("Object.set_slot", ctx)?;
    let name = ctx.expect_str(name)?;
    ctx.set_slot(obj, &name, value);
    Ok(ctx.null())
}
