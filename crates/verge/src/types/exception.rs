//! The `Exception` class and the `Exceptions` module.
//!
//! Every exception kind the runtime raises has a class in `Exceptions`,
//! arranged as [`ExcKind::parent`] describes. The root `Exception` class is
//! the builtin one, shared with `Builtins`.

use std::rc::Rc;

use strum::IntoEnumIterator;

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::{CallSite, ExcKind, ExceptionData, RunResult, SrcLocation},
    heap::{HeapData, HeapId},
    pump::{Producer, VecProducer},
};

pub(crate) fn bootstrap(ctx: &mut Context) -> RunResult<()> {
    let class = ctx.builtin(BuiltinId::EXCEPTION_CLASS)?;
    let builtins_mod = ctx.builtin(BuiltinId::BUILTINS_MODULE)?;
    ctx.set_exception_class(ExcKind::Exception, class);
    let new_func = ctx.new_native_func("new_Exception", false, new_exception, builtins_mod)?;
    ctx.set_constructor(class, new_func)?;

    ctx.add_method(class, "init", exception_init)?;
    ctx.add_method(class, "to_str", exception_to_str)?;
    ctx.add_producer_method(class, "iter_call_chain", exception_iter_call_chain)?;

    let names: Vec<&'static str> = ExcKind::iter().map(Into::into).collect();
    let module = ctx.new_native_module("Exceptions", "Exceptions", "", &names, None)?;
    ctx.set_builtin(BuiltinId::EXCEPTIONS_MODULE, module);
    ctx.set_defn(module, ExcKind::Exception.into(), class)?;
    for kind in ExcKind::iter() {
        let Some(parent) = kind.parent() else {
            continue;
        };
        let parent = ctx.exception_class(parent)?;
        let name: &'static str = kind.into();
        let kind_class = ctx.new_class(name, vec![parent], None, Some(module))?;
        ctx.set_exception_class(kind, kind_class);
        ctx.set_defn(module, name, kind_class)?;
    }
    Ok(())
}

impl Context {
    /// Renders an exception as `ClassName: message`.
    ///
    /// A String message is used as is, any other message through its
    /// `to_str`; a missing message renders as the empty string.
    pub fn exception_to_str(&mut self, exc: HeapId) -> RunResult<String> {
        let class_name = self.class_name_of(exc);
        let msg: Rc<str> = match self.own_slot(exc, "msg") {
            None => Rc::from(""),
            Some(msg) => match self.str_value(msg) {
                Some(s) => s,
                None => self.to_str(msg)?,
            },
        };
        Ok(format!("{class_name}: {msg}"))
    }

    /// Attaches the call chain of a propagating exception, innermost frame first.
    ///
    /// Called by the execution engine; the object model never builds call chains.
    pub fn set_call_chain(&mut self, exc: HeapId, chain: Vec<CallSite>) -> RunResult<()> {
        if !matches!(self.heap.data(exc), HeapData::Exception(_)) {
            return Err(self.type_error("Exception", exc));
        }
        if let HeapData::Exception(data) = self.heap.data_mut(exc) {
            data.call_chain = Some(chain);
        }
        Ok(())
    }

    /// The call chain attached to an exception, if any.
    #[must_use]
    pub fn call_chain(&self, exc: HeapId) -> Option<&[CallSite]> {
        match self.heap.data(exc) {
            HeapData::Exception(data) => data.call_chain(),
            _ => None,
        }
    }

    /// `[mod_id, src_offset, len]` Lists for one call-chain frame.
    ///
    /// Uses the source map when one is attached, otherwise the frame's own
    /// source offset with an unknown length.
    fn src_infos(&mut self, site: CallSite) -> RunResult<HeapId> {
        let Some(module) = self.func_data(site.func).map(|func| func.pc.module()) else {
            return Err(self.type_error("Func", site.func));
        };
        let mut locations = self.pc_to_src_locations(module, site.pc)?;
        if locations.is_empty() {
            let mod_id = self.module_mut(module)?.id.to_string();
            locations.push(SrcLocation {
                mod_id,
                src_offset: site.src_offset,
                len: 0,
            });
        }
        let mut infos = Vec::with_capacity(locations.len());
        for loc in locations {
            let mod_id = self.new_str(&loc.mod_id)?;
            let offset = self.new_int(loc.src_offset as i64)?;
            let len = self.new_int(loc.len as i64)?;
            infos.push(self.new_list(vec![mod_id, offset, len])?);
        }
        self.new_list(infos)
    }
}

/// `Exception.new(msg := "")`, also the inherited constructor of every exception class.
fn new_exception(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Exception.new", ctx)?;
    ctx.construct(class, HeapData::Exception(ExceptionData::default()), rest)
}

fn exception_init(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (exc, rest) = args.split_receiver("Exception.init", ctx)?;
    let msg = match rest.as_slice() {
        [] => ctx.new_str("")?,
        _ => rest.get_one_arg("Exception.init", ctx)?,
    };
    ctx.set_slot(exc, "msg", msg);
    Ok(ctx.null())
}

fn exception_to_str(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (exc, rest) = args.split_receiver("Exception.to_str", ctx)?;
    rest.check_zero_args("Exception.to_str", ctx)?;
    let s = ctx.exception_to_str(exc)?;
    ctx.new_str(&s)
}

/// Yields `[func, src_infos]` per frame, innermost first. An exception
/// without a call chain yields nothing.
fn exception_iter_call_chain(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    let (exc, rest) = args.split_receiver("Exception.iter_call_chain", ctx)?;
    rest.check_zero_args("Exception.iter_call_chain", ctx)?;
    if !matches!(ctx.heap.data(exc), HeapData::Exception(_)) {
        return Err(ctx.type_error("Exception", exc));
    }
    let sites = ctx.call_chain(exc).map(<[CallSite]>::to_vec).unwrap_or_default();
    let mut frames = Vec::with_capacity(sites.len());
    for site in sites {
        let infos = ctx.src_infos(site)?;
        frames.push(ctx.new_list(vec![site.func, infos])?);
    }
    Ok(Box::new(VecProducer::new(frames)))
}
