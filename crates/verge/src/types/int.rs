//! `Number` and `Int`.
//!
//! Ints are 64-bit. Arithmetic is checked: overflow and division by zero
//! raise `Number_Exception`. Division and modulo round towards negative
//! infinity.

use num_integer::Integer;

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::{ExcKind, RunError, RunResult},
    heap::{HeapData, HeapId},
    object::CompareOp,
    pump::Producer,
};

pub(crate) fn bootstrap(ctx: &mut Context) -> RunResult<()> {
    let int_class = ctx.builtin(BuiltinId::INT_CLASS)?;
    let builtins_mod = ctx.builtin(BuiltinId::BUILTINS_MODULE)?;
    let new_func = ctx.new_native_func("new_Int", false, new_int, builtins_mod)?;
    ctx.set_constructor(int_class, new_func)?;

    ctx.add_method(int_class, "+", int_add)?;
    ctx.add_method(int_class, "-", int_sub)?;
    ctx.add_method(int_class, "*", int_mul)?;
    ctx.add_method(int_class, "/", int_div)?;
    ctx.add_method(int_class, "%", int_mod)?;
    ctx.add_method(int_class, "idiv", int_div)?;
    ctx.add_method(int_class, "==", int_eq)?;
    ctx.add_method(int_class, "!=", int_neq)?;
    ctx.add_method(int_class, "<", int_lt)?;
    ctx.add_method(int_class, "<=", int_le)?;
    ctx.add_method(int_class, ">", int_gt)?;
    ctx.add_method(int_class, ">=", int_ge)?;
    ctx.add_method(int_class, "to_str", int_to_str)?;
    ctx.add_method(int_class, "hash", int_hash)?;
    ctx.add_producer_method(int_class, "iter_to", int_iter_to)?;
    Ok(())
}

/// `Int.new(value := 0)`: copies an Int or parses a String.
fn new_int(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Int.new", ctx)?;
    let value = match rest.as_slice() {
        [] => 0,
        _ => {
            let arg = rest.get_one_arg("Int.new", ctx)?;
            match ctx.heap.data(arg) {
                HeapData::Int(i) => *i,
                HeapData::Str(s) => {
                    let s = s.clone();
                    parse_int(ctx, &s)?
                }
                _ => return Err(ctx.type_error("Int or String", arg)),
            }
        }
    };
    ctx.construct(class, HeapData::Int(value), ArgValues::new())
}

pub(crate) fn parse_int(ctx: &mut Context, s: &str) -> RunResult<i64> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| ctx.raise(ExcKind::Number_Exception, format!("Invalid integer '{s}'.")))
}

/// Decodes `(self, other)` for a binary Int method.
fn int_operands(ctx: &mut Context, args: &ArgValues, name: &str) -> RunResult<(i64, i64)> {
    let (receiver, rest) = args.split_receiver(name, ctx)?;
    let other = rest.get_one_arg(name, ctx)?;
    Ok((ctx.expect_int(receiver)?, ctx.expect_int(other)?))
}

fn overflow(ctx: &mut Context, op: &str, a: i64, b: i64) -> RunError {
    ctx.raise(ExcKind::Number_Exception, format!("Overflow in {a} {op} {b}."))
}

fn int_add(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (a, b) = int_operands(ctx, &args, "Int.+")?;
    match a.checked_add(b) {
        Some(r) => ctx.new_int(r),
        None => Err(overflow(ctx, "+", a, b)),
    }
}

fn int_sub(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (a, b) = int_operands(ctx, &args, "Int.-")?;
    match a.checked_sub(b) {
        Some(r) => ctx.new_int(r),
        None => Err(overflow(ctx, "-", a, b)),
    }
}

fn int_mul(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (a, b) = int_operands(ctx, &args, "Int.*")?;
    match a.checked_mul(b) {
        Some(r) => ctx.new_int(r),
        None => Err(overflow(ctx, "*", a, b)),
    }
}

fn int_div(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (a, b) = int_operands(ctx, &args, "Int./")?;
    if b == 0 {
        return Err(ctx.raise(ExcKind::Number_Exception, "Division by zero."));
    }
    if a == i64::MIN && b == -1 {
        return Err(overflow(ctx, "/", a, b));
    }
    ctx.new_int(Integer::div_floor(&a, &b))
}

fn int_mod(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (a, b) = int_operands(ctx, &args, "Int.%")?;
    if b == 0 {
        return Err(ctx.raise(ExcKind::Number_Exception, "Modulo by zero."));
    }
    if b == -1 {
        return ctx.new_int(0);
    }
    ctx.new_int(Integer::mod_floor(&a, &b))
}

/// Equality never raises: a non-Int operand is simply unequal.
fn int_equality(ctx: &mut Context, args: &ArgValues, name: &str) -> RunResult<bool> {
    let (receiver, rest) = args.split_receiver(name, ctx)?;
    let other = rest.get_one_arg(name, ctx)?;
    let a = ctx.expect_int(receiver)?;
    Ok(ctx.int_value(other) == Some(a))
}

fn int_eq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let equal = int_equality(ctx, &args, "Int.==")?;
    Ok(ctx.sentinel(equal))
}

fn int_neq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let equal = int_equality(ctx, &args, "Int.!=")?;
    Ok(ctx.sentinel(!equal))
}

fn int_ordering(ctx: &mut Context, args: &ArgValues, op: CompareOp) -> RunResult<HeapId> {
    let name = format!("Int.{op}");
    let (a, b) = int_operands(ctx, args, &name)?;
    Ok(ctx.sentinel(op.holds(&a, &b)))
}

fn int_lt(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    int_ordering(ctx, &args, CompareOp::Lt)
}

fn int_le(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    int_ordering(ctx, &args, CompareOp::Le)
}

fn int_gt(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    int_ordering(ctx, &args, CompareOp::Gt)
}

fn int_ge(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    int_ordering(ctx, &args, CompareOp::Ge)
}

fn int_to_str(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (receiver, rest) = args.split_receiver("Int.to_str", ctx)?;
    rest.check_zero_args("Int.to_str", ctx)?;
    let value = ctx.expect_int(receiver)?;
    ctx.new_str(&value.to_string())
}

fn int_hash(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (receiver, rest) = args.split_receiver("Int.hash", ctx)?;
    rest.check_zero_args("Int.hash", ctx)?;
    let value = ctx.expect_int(receiver)?;
    ctx.new_int(value)
}

/// Counts from `next` towards `to` (exclusive) in steps of `step`.
#[derive(Debug)]
struct IntRange {
    next: i64,
    to: i64,
    step: i64,
}

impl Producer for IntRange {
    fn resume(&mut self, ctx: &mut Context) -> RunResult<Option<HeapId>> {
        let more = if self.step > 0 { self.next < self.to } else { self.next > self.to };
        if !more {
            return Ok(None);
        }
        let value = self.next;
        match self.next.checked_add(self.step) {
            Some(next) => self.next = next,
            None => self.next = self.to,
        }
        Ok(Some(ctx.new_int(value)?))
    }
}

/// `Int.iter_to(to, step := 1)`.
fn int_iter_to(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    let (receiver, rest) = args.split_receiver("Int.iter_to", ctx)?;
    let (to, step) = rest.get_one_two_args("Int.iter_to", ctx)?;
    let from = ctx.expect_int(receiver)?;
    let to = ctx.expect_int(to)?;
    let step = match step {
        Some(step) => ctx.expect_int(step)?,
        None => 1,
    };
    if step == 0 {
        return Err(ctx.raise(ExcKind::Parameters_Exception, "Int.iter_to step must not be 0."));
    }
    Ok(Box::new(IntRange { next: from, to, step }))
}
