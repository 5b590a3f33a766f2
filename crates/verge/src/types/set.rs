//! `Set`: an insertion-ordered collection of distinct elements.
//!
//! Ints and Strings are distinct by value, every other object by identity
//! (see [`DictKey`]).

use indexmap::IndexMap;

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::{ExcKind, RunError, RunResult},
    heap::{HeapData, HeapId},
    pump::Producer,
    types::DictKey,
};

pub(crate) fn bootstrap(ctx: &mut Context) -> RunResult<()> {
    let class = ctx.builtin(BuiltinId::SET_CLASS)?;
    let builtins_mod = ctx.builtin(BuiltinId::BUILTINS_MODULE)?;
    let new_func = ctx.new_native_func("new_Set", false, new_set, builtins_mod)?;
    ctx.set_constructor(class, new_func)?;

    ctx.add_method(class, "add", set_add)?;
    ctx.add_method(class, "extend", set_extend)?;
    ctx.add_method(class, "find", set_find)?;
    ctx.add_method(class, "remove", set_remove)?;
    ctx.add_method(class, "discard", set_discard)?;
    ctx.add_method(class, "len", set_len)?;
    ctx.add_method(class, "to_str", set_to_str)?;
    ctx.add_method(class, "==", set_eq)?;
    ctx.add_method(class, "!=", set_neq)?;
    ctx.add_producer_method(class, "iter", set_iter)?;
    Ok(())
}

impl Context {
    fn set_mut(&mut self, set: HeapId) -> RunResult<&mut IndexMap<DictKey, HeapId>> {
        if !matches!(self.heap.data(set), HeapData::Set(_)) {
            return Err(self.type_error("Set", set));
        }
        match self.heap.data_mut(set) {
            HeapData::Set(elems) => Ok(elems),
            _ => Err(RunError::internal("set payload changed kind")),
        }
    }

    /// Adds `elem` to a Set. Adding an element already present keeps the
    /// original element and its position.
    pub fn set_add(&mut self, set: HeapId, elem: HeapId) -> RunResult<()> {
        let key = self.dict_key(elem);
        self.set_mut(set)?.entry(key).or_insert(elem);
        Ok(())
    }

    /// Whether a Set holds an element equal to `elem`.
    #[must_use]
    pub fn set_contains(&self, set: HeapId, elem: HeapId) -> bool {
        match self.heap.data(set) {
            HeapData::Set(elems) => elems.contains_key(&self.dict_key(elem)),
            _ => false,
        }
    }

    /// The elements of a Set in insertion order.
    pub fn set_elems(&mut self, set: HeapId) -> RunResult<Vec<HeapId>> {
        Ok(self.set_mut(set)?.values().copied().collect())
    }

    fn set_elem_at(&self, set: HeapId, index: usize) -> Option<HeapId> {
        match self.heap.data(set) {
            HeapData::Set(elems) => elems.get_index(index).map(|(_, &elem)| elem),
            _ => None,
        }
    }

    fn set_extend(&mut self, set: HeapId, source: HeapId) -> RunResult<()> {
        let values = match self.list_items(source) {
            Some(items) => items.to_vec(),
            None => self.iterate(source)?.collect(self)?,
        };
        for value in values {
            self.set_add(set, value)?;
        }
        Ok(())
    }
}

/// `Set.new(source := [])`.
fn new_set(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Set.new", ctx)?;
    let set = ctx.allocate(class, HeapData::Set(IndexMap::new()))?;
    if !rest.is_empty() {
        let source = rest.get_one_arg("Set.new", ctx)?;
        ctx.set_extend(set, source)?;
    }
    ctx.call_method(set, "init", ArgValues::new())?;
    Ok(set)
}

fn set_add(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (set, rest) = args.split_receiver("Set.add", ctx)?;
    let elem = rest.get_one_arg("Set.add", ctx)?;
    ctx.set_add(set, elem)?;
    Ok(ctx.null())
}

fn set_extend(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (set, rest) = args.split_receiver("Set.extend", ctx)?;
    let source = rest.get_one_arg("Set.extend", ctx)?;
    ctx.set_extend(set, source)?;
    Ok(ctx.null())
}

/// The stored element equal to the argument, or Fail.
fn set_find(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (set, rest) = args.split_receiver("Set.find", ctx)?;
    let elem = rest.get_one_arg("Set.find", ctx)?;
    let key = ctx.dict_key(elem);
    let found = ctx.set_mut(set)?.get(&key).copied();
    Ok(found.unwrap_or_else(|| ctx.fail()))
}

fn set_remove(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (set, rest) = args.split_receiver("Set.remove", ctx)?;
    let elem = rest.get_one_arg("Set.remove", ctx)?;
    let key = ctx.dict_key(elem);
    if ctx.set_mut(set)?.shift_remove(&key).is_none() {
        let shown = ctx.to_str(elem)?;
        return Err(ctx.raise(ExcKind::Key_Exception, format!("Key {shown} not found.")));
    }
    Ok(ctx.null())
}

/// Like `remove`, but an absent element is not an error.
fn set_discard(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (set, rest) = args.split_receiver("Set.discard", ctx)?;
    let elem = rest.get_one_arg("Set.discard", ctx)?;
    let key = ctx.dict_key(elem);
    ctx.set_mut(set)?.shift_remove(&key);
    Ok(ctx.null())
}

fn set_len(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (set, rest) = args.split_receiver("Set.len", ctx)?;
    rest.check_zero_args("Set.len", ctx)?;
    let len = ctx.set_mut(set)?.len();
    ctx.new_int(len as i64)
}

fn set_to_str(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (set, rest) = args.split_receiver("Set.to_str", ctx)?;
    rest.check_zero_args("Set.to_str", ctx)?;
    let mut out = String::from("Set{");
    for (i, elem) in ctx.set_elems(set)?.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&ctx.to_str(elem)?);
    }
    out.push('}');
    ctx.new_str(&out)
}

/// Two sets are equal when they hold the same keys, regardless of order.
fn set_equality(ctx: &mut Context, args: &ArgValues, name: &str) -> RunResult<bool> {
    let (set, rest) = args.split_receiver(name, ctx)?;
    let other = rest.get_one_arg(name, ctx)?;
    ctx.set_mut(set)?;
    let (HeapData::Set(a), HeapData::Set(b)) = (ctx.heap.data(set), ctx.heap.data(other)) else {
        return Ok(false);
    };
    Ok(a.len() == b.len() && a.keys().all(|key| b.contains_key(key)))
}

fn set_eq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let equal = set_equality(ctx, &args, "Set.==")?;
    Ok(ctx.sentinel(equal))
}

fn set_neq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let equal = set_equality(ctx, &args, "Set.!=")?;
    Ok(ctx.sentinel(!equal))
}

/// Walks a set's elements by insertion index.
#[derive(Debug)]
struct SetIter {
    set: HeapId,
    next: usize,
}

impl Producer for SetIter {
    fn resume(&mut self, ctx: &mut Context) -> RunResult<Option<HeapId>> {
        let elem = ctx.set_elem_at(self.set, self.next);
        self.next += 1;
        Ok(elem)
    }
}

fn set_iter(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    let (set, rest) = args.split_receiver("Set.iter", ctx)?;
    rest.check_zero_args("Set.iter", ctx)?;
    ctx.set_mut(set)?;
    Ok(Box::new(SetIter { set, next: 0 }))
}
