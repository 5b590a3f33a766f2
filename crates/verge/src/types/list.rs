//! `List`: a mutable sequence.
//!
//! List producers hold the list's identity and an index, not a copy of its
//! items, so they observe mutations made while the series is being pumped.

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::{ExcKind, RunError, RunResult},
    heap::{HeapData, HeapId},
    pump::Producer,
    types::{translate_index, translate_slice},
};

pub(crate) fn bootstrap(ctx: &mut Context) -> RunResult<()> {
    let class = ctx.builtin(BuiltinId::LIST_CLASS)?;
    let builtins_mod = ctx.builtin(BuiltinId::BUILTINS_MODULE)?;
    let new_func = ctx.new_native_func("new_List", false, new_list, builtins_mod)?;
    ctx.set_constructor(class, new_func)?;

    ctx.add_method(class, "to_str", list_to_str)?;
    ctx.add_method(class, "len", list_len)?;
    ctx.add_method(class, "append", list_append)?;
    ctx.add_method(class, "extend", list_extend)?;
    ctx.add_method(class, "get", list_get)?;
    ctx.add_method(class, "set", list_set)?;
    ctx.add_method(class, "insert", list_insert)?;
    ctx.add_method(class, "pop", list_pop)?;
    ctx.add_method(class, "del", list_del)?;
    ctx.add_method(class, "get_slice", list_get_slice)?;
    ctx.add_method(class, "+", list_add)?;
    ctx.add_method(class, "==", list_eq)?;
    ctx.add_method(class, "!=", list_neq)?;
    ctx.add_producer_method(class, "iter", list_iter)?;
    ctx.add_producer_method(class, "riter", list_riter)?;
    ctx.add_producer_method(class, "find", list_find)?;
    ctx.add_producer_method(class, "find_index", list_find_index)?;
    Ok(())
}

impl Context {
    fn list_mut(&mut self, list: HeapId) -> RunResult<&mut Vec<HeapId>> {
        if self.list_items(list).is_none() {
            return Err(self.type_error("List", list));
        }
        match self.heap.data_mut(list) {
            HeapData::List(items) => Ok(items),
            _ => Err(RunError::internal("list payload changed kind")),
        }
    }

    /// Appends `value` to a List.
    pub fn list_append(&mut self, list: HeapId, value: HeapId) -> RunResult<()> {
        self.list_mut(list)?.push(value);
        Ok(())
    }

    /// Appends every value `source` produces: a List's items directly, anything
    /// else through its `iter` method.
    pub fn list_extend(&mut self, list: HeapId, source: HeapId) -> RunResult<()> {
        let values = match self.list_items(source) {
            Some(items) => items.to_vec(),
            None => self.iterate(source)?.collect(self)?,
        };
        self.list_mut(list)?.extend(values);
        Ok(())
    }

    fn list_len_of(&self, list: HeapId) -> usize {
        self.list_items(list).map_or(0, <[HeapId]>::len)
    }

    fn list_item(&self, list: HeapId, index: usize) -> Option<HeapId> {
        self.list_items(list).and_then(|items| items.get(index).copied())
    }
}

/// `List.new(source := [])`.
fn new_list(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("List.new", ctx)?;
    let list = ctx.allocate(class, HeapData::List(Vec::new()))?;
    if !rest.is_empty() {
        let source = rest.get_one_arg("List.new", ctx)?;
        ctx.list_extend(list, source)?;
    }
    ctx.call_method(list, "init", ArgValues::new())?;
    Ok(list)
}

/// Decodes the receiver of a List method, returning its current length.
fn receiver(ctx: &mut Context, args: &ArgValues, name: &str) -> RunResult<(HeapId, usize, ArgValues)> {
    let (list, rest) = args.split_receiver(name, ctx)?;
    let Some(len) = ctx.list_items(list).map(<[HeapId]>::len) else {
        return Err(ctx.type_error("List", list));
    };
    Ok((list, len, rest))
}

fn list_to_str(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (list, _, rest) = receiver(ctx, &args, "List.to_str")?;
    rest.check_zero_args("List.to_str", ctx)?;
    let items = ctx.expect_list(list)?;
    let mut out = String::from("[");
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&ctx.to_str(item)?);
    }
    out.push(']');
    ctx.new_str(&out)
}

fn list_len(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (_, len, rest) = receiver(ctx, &args, "List.len")?;
    rest.check_zero_args("List.len", ctx)?;
    ctx.new_int(len as i64)
}

fn list_append(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (list, rest) = args.split_receiver("List.append", ctx)?;
    let value = rest.get_one_arg("List.append", ctx)?;
    ctx.list_append(list, value)?;
    Ok(ctx.null())
}

fn list_extend(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (list, rest) = args.split_receiver("List.extend", ctx)?;
    let source = rest.get_one_arg("List.extend", ctx)?;
    ctx.list_extend(list, source)?;
    Ok(ctx.null())
}

fn list_get(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (list, len, rest) = receiver(ctx, &args, "List.get")?;
    let index = rest.get_one_arg("List.get", ctx)?;
    let index = ctx.expect_int(index)?;
    let i = translate_index(ctx, index, len)?;
    Ok(ctx.list_mut(list)?[i])
}

fn list_set(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (list, len, rest) = receiver(ctx, &args, "List.set")?;
    let (index, value) = rest.get_two_args("List.set", ctx)?;
    let index = ctx.expect_int(index)?;
    let i = translate_index(ctx, index, len)?;
    ctx.list_mut(list)?[i] = value;
    Ok(ctx.null())
}

/// `List.insert(i, value)`: `i` may equal the length, which appends.
fn list_insert(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (list, len, rest) = receiver(ctx, &args, "List.insert")?;
    let (index, value) = rest.get_two_args("List.insert", ctx)?;
    let index = ctx.expect_int(index)?;
    let i = if index == len as i64 {
        len
    } else {
        translate_index(ctx, index, len)?
    };
    ctx.list_mut(list)?.insert(i, value);
    Ok(ctx.null())
}

fn list_pop(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (list, rest) = args.split_receiver("List.pop", ctx)?;
    rest.check_zero_args("List.pop", ctx)?;
    let popped = ctx.list_mut(list)?.pop();
    match popped {
        Some(value) => Ok(value),
        None => Err(ctx.raise(ExcKind::Bounds_Exception, "Can't pop from an empty list.")),
    }
}

fn list_del(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (list, len, rest) = receiver(ctx, &args, "List.del")?;
    let index = rest.get_one_arg("List.del", ctx)?;
    let index = ctx.expect_int(index)?;
    let i = translate_index(ctx, index, len)?;
    ctx.list_mut(list)?.remove(i);
    Ok(ctx.null())
}

fn list_get_slice(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (list, len, rest) = receiver(ctx, &args, "List.get_slice")?;
    let (start, end) = translate_slice(ctx, &rest, len, "List.get_slice")?;
    let items = ctx.list_mut(list)?[start..end].to_vec();
    ctx.new_list(items)
}

fn list_add(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (list, _, rest) = receiver(ctx, &args, "List.+")?;
    let other = rest.get_one_arg("List.+", ctx)?;
    let mut items = ctx.expect_list(list)?;
    items.extend(ctx.expect_list(other)?);
    ctx.new_list(items)
}

/// Element-wise equality through each element's `==`.
fn list_equality(ctx: &mut Context, args: &ArgValues, name: &str) -> RunResult<bool> {
    let (list, len, rest) = receiver(ctx, args, name)?;
    let other = rest.get_one_arg(name, ctx)?;
    if ctx.list_items(other).map(<[HeapId]>::len) != Some(len) {
        return Ok(false);
    }
    for i in 0..len {
        let (Some(a), Some(b)) = (ctx.list_item(list, i), ctx.list_item(other, i)) else {
            return Ok(false);
        };
        if !ctx.equals(a, b)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn list_eq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let equal = list_equality(ctx, &args, "List.==")?;
    Ok(ctx.sentinel(equal))
}

fn list_neq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let equal = list_equality(ctx, &args, "List.!=")?;
    Ok(ctx.sentinel(!equal))
}

// =============================================================================
// Producers
// =============================================================================

/// Walks a list between two indices in either direction.
///
/// `next` is the next index to yield for ascending walks and one past it for
/// descending walks. The list's current length bounds every step.
#[derive(Debug)]
struct ListIter {
    list: HeapId,
    next: usize,
    stop: usize,
    reverse: bool,
}

impl Producer for ListIter {
    fn resume(&mut self, ctx: &mut Context) -> RunResult<Option<HeapId>> {
        if self.reverse {
            while self.next > self.stop {
                self.next -= 1;
                if let Some(item) = ctx.list_item(self.list, self.next) {
                    return Ok(Some(item));
                }
            }
            return Ok(None);
        }
        if self.next >= self.stop.min(ctx.list_len_of(self.list)) {
            return Ok(None);
        }
        let item = ctx.list_item(self.list, self.next);
        self.next += 1;
        Ok(item)
    }
}

fn list_iter(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    let (list, len, rest) = receiver(ctx, &args, "List.iter")?;
    let (start, end) = translate_slice(ctx, &rest, len, "List.iter")?;
    Ok(Box::new(ListIter {
        list,
        next: start,
        stop: end,
        reverse: false,
    }))
}

fn list_riter(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    let (list, len, rest) = receiver(ctx, &args, "List.riter")?;
    let (start, end) = translate_slice(ctx, &rest, len, "List.riter")?;
    Ok(Box::new(ListIter {
        list,
        next: end,
        stop: start,
        reverse: true,
    }))
}

/// Yields each element (or its index) equal to `target`, left to right.
#[derive(Debug)]
struct ListFind {
    list: HeapId,
    target: HeapId,
    pos: usize,
    yield_index: bool,
}

impl Producer for ListFind {
    fn resume(&mut self, ctx: &mut Context) -> RunResult<Option<HeapId>> {
        while let Some(item) = ctx.list_item(self.list, self.pos) {
            let at = self.pos;
            self.pos += 1;
            if ctx.equals(item, self.target)? {
                let value = if self.yield_index { ctx.new_int(at as i64)? } else { item };
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

fn list_find(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    let (list, _, rest) = receiver(ctx, &args, "List.find")?;
    let target = rest.get_one_arg("List.find", ctx)?;
    Ok(Box::new(ListFind {
        list,
        target,
        pos: 0,
        yield_index: false,
    }))
}

fn list_find_index(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    let (list, _, rest) = receiver(ctx, &args, "List.find_index")?;
    let target = rest.get_one_arg("List.find_index", ctx)?;
    Ok(Box::new(ListFind {
        list,
        target,
        pos: 0,
        yield_index: true,
    }))
}
