//! `Dict`: an insertion-ordered mapping.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::{ExcKind, RunError, RunResult},
    heap::{HeapData, HeapId},
    pump::Producer,
};

/// Hash key of a Set element or Dict key.
///
/// Ints and Strings compare by value so that two separately boxed `1`s are
/// the same key. Every other object is keyed by its identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    Int(i64),
    Str(Rc<str>),
    Ref(HeapId),
}

type Entries = IndexMap<DictKey, (HeapId, HeapId)>;

pub(crate) fn bootstrap(ctx: &mut Context) -> RunResult<()> {
    let class = ctx.builtin(BuiltinId::DICT_CLASS)?;
    let builtins_mod = ctx.builtin(BuiltinId::BUILTINS_MODULE)?;
    let new_func = ctx.new_native_func("new_Dict", false, new_dict, builtins_mod)?;
    ctx.set_constructor(class, new_func)?;

    ctx.add_method(class, "get", dict_get)?;
    ctx.add_method(class, "find", dict_find)?;
    ctx.add_method(class, "set", dict_set)?;
    ctx.add_method(class, "del", dict_del)?;
    ctx.add_method(class, "extend", dict_extend)?;
    ctx.add_method(class, "len", dict_len)?;
    ctx.add_method(class, "to_str", dict_to_str)?;
    ctx.add_method(class, "==", dict_eq)?;
    ctx.add_method(class, "!=", dict_neq)?;
    ctx.add_producer_method(class, "iter", dict_iter)?;
    ctx.add_producer_method(class, "iter_keys", dict_iter_keys)?;
    ctx.add_producer_method(class, "iter_vals", dict_iter_vals)?;
    Ok(())
}

impl Context {
    fn dict_mut(&mut self, dict: HeapId) -> RunResult<&mut Entries> {
        if !matches!(self.heap.data(dict), HeapData::Dict(_)) {
            return Err(self.type_error("Dict", dict));
        }
        match self.heap.data_mut(dict) {
            HeapData::Dict(entries) => Ok(entries),
            _ => Err(RunError::internal("dict payload changed kind")),
        }
    }

    /// Binds `key` to `value`. Rebinding an existing key keeps its position.
    pub fn dict_set(&mut self, dict: HeapId, key: HeapId, value: HeapId) -> RunResult<()> {
        let hash_key = self.dict_key(key);
        self.dict_mut(dict)?.insert(hash_key, (key, value));
        Ok(())
    }

    /// The value bound to `key`, if any.
    pub fn dict_find(&mut self, dict: HeapId, key: HeapId) -> RunResult<Option<HeapId>> {
        let hash_key = self.dict_key(key);
        Ok(self.dict_mut(dict)?.get(&hash_key).map(|&(_, value)| value))
    }

    /// The `(key, value)` pairs of a Dict in insertion order.
    pub fn dict_entries(&mut self, dict: HeapId) -> RunResult<Vec<(HeapId, HeapId)>> {
        Ok(self.dict_mut(dict)?.values().copied().collect())
    }

    fn dict_entry_at(&self, dict: HeapId, index: usize) -> Option<(HeapId, HeapId)> {
        match self.heap.data(dict) {
            HeapData::Dict(entries) => entries.get_index(index).map(|(_, &entry)| entry),
            _ => None,
        }
    }
}

/// `Dict.new(source := Dict{})`.
fn new_dict(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Dict.new", ctx)?;
    let dict = ctx.allocate(class, HeapData::Dict(IndexMap::new()))?;
    if !rest.is_empty() {
        let source = rest.get_one_arg("Dict.new", ctx)?;
        for (key, value) in ctx.dict_entries(source)? {
            ctx.dict_set(dict, key, value)?;
        }
    }
    ctx.call_method(dict, "init", ArgValues::new())?;
    Ok(dict)
}

fn key_error(ctx: &mut Context, key: HeapId) -> RunError {
    match ctx.to_str(key) {
        Ok(shown) => ctx.raise(ExcKind::Key_Exception, format!("Key {shown} not found.")),
        Err(err) => err,
    }
}

fn dict_get(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (dict, rest) = args.split_receiver("Dict.get", ctx)?;
    let key = rest.get_one_arg("Dict.get", ctx)?;
    match ctx.dict_find(dict, key)? {
        Some(value) => Ok(value),
        None => Err(key_error(ctx, key)),
    }
}

/// The value bound to the key, or Fail.
fn dict_find(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (dict, rest) = args.split_receiver("Dict.find", ctx)?;
    let key = rest.get_one_arg("Dict.find", ctx)?;
    Ok(ctx.dict_find(dict, key)?.unwrap_or_else(|| ctx.fail()))
}

fn dict_set(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (dict, rest) = args.split_receiver("Dict.set", ctx)?;
    let (key, value) = rest.get_two_args("Dict.set", ctx)?;
    ctx.dict_set(dict, key, value)?;
    Ok(ctx.null())
}

fn dict_del(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (dict, rest) = args.split_receiver("Dict.del", ctx)?;
    let key = rest.get_one_arg("Dict.del", ctx)?;
    let hash_key = ctx.dict_key(key);
    if ctx.dict_mut(dict)?.shift_remove(&hash_key).is_none() {
        return Err(key_error(ctx, key));
    }
    Ok(ctx.null())
}

/// Copies every entry of another Dict into this one.
fn dict_extend(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (dict, rest) = args.split_receiver("Dict.extend", ctx)?;
    let source = rest.get_one_arg("Dict.extend", ctx)?;
    for (key, value) in ctx.dict_entries(source)? {
        ctx.dict_set(dict, key, value)?;
    }
    Ok(ctx.null())
}

fn dict_len(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (dict, rest) = args.split_receiver("Dict.len", ctx)?;
    rest.check_zero_args("Dict.len", ctx)?;
    let len = ctx.dict_mut(dict)?.len();
    ctx.new_int(len as i64)
}

fn dict_to_str(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (dict, rest) = args.split_receiver("Dict.to_str", ctx)?;
    rest.check_zero_args("Dict.to_str", ctx)?;
    let mut out = String::from("Dict{");
    for (i, (key, value)) in ctx.dict_entries(dict)?.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&ctx.to_str(key)?);
        out.push_str(" : ");
        out.push_str(&ctx.to_str(value)?);
    }
    out.push('}');
    ctx.new_str(&out)
}

/// Same keys, and each pair of values equal through `==`.
fn dict_equality(ctx: &mut Context, args: &ArgValues, name: &str) -> RunResult<bool> {
    let (dict, rest) = args.split_receiver(name, ctx)?;
    let other = rest.get_one_arg(name, ctx)?;
    let entries = ctx.dict_entries(dict)?;
    let HeapData::Dict(others) = ctx.heap.data(other) else {
        return Ok(false);
    };
    if entries.len() != others.len() {
        return Ok(false);
    }
    for (key, value) in entries {
        let Some(other_value) = ctx.dict_find(other, key)? else {
            return Ok(false);
        };
        if !ctx.equals(value, other_value)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn dict_eq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let equal = dict_equality(ctx, &args, "Dict.==")?;
    Ok(ctx.sentinel(equal))
}

fn dict_neq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let equal = dict_equality(ctx, &args, "Dict.!=")?;
    Ok(ctx.sentinel(!equal))
}

// =============================================================================
// Producers
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum DictYield {
    Pairs,
    Keys,
    Values,
}

/// Walks a dict's entries by insertion index.
#[derive(Debug)]
struct DictIter {
    dict: HeapId,
    next: usize,
    yields: DictYield,
}

impl Producer for DictIter {
    fn resume(&mut self, ctx: &mut Context) -> RunResult<Option<HeapId>> {
        let Some((key, value)) = ctx.dict_entry_at(self.dict, self.next) else {
            return Ok(None);
        };
        self.next += 1;
        let out = match self.yields {
            DictYield::Pairs => ctx.new_list(vec![key, value])?,
            DictYield::Keys => key,
            DictYield::Values => value,
        };
        Ok(Some(out))
    }
}

fn dict_producer(ctx: &mut Context, args: &ArgValues, name: &str, yields: DictYield) -> RunResult<Box<dyn Producer>> {
    let (dict, rest) = args.split_receiver(name, ctx)?;
    rest.check_zero_args(name, ctx)?;
    ctx.dict_mut(dict)?;
    Ok(Box::new(DictIter { dict, next: 0, yields }))
}

fn dict_iter(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    dict_producer(ctx, &args, "Dict.iter", DictYield::Pairs)
}

fn dict_iter_keys(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    dict_producer(ctx, &args, "Dict.iter_keys", DictYield::Keys)
}

fn dict_iter_vals(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    dict_producer(ctx, &args, "Dict.iter_vals", DictYield::Values)
}
