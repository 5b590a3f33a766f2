//! `String`: immutable text indexed by character.

use std::rc::Rc;

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::{ExcKind, RunResult},
    heap::{HeapData, HeapId},
    object::CompareOp,
    pump::Producer,
    types::{int::parse_int, translate_index, translate_slice},
};

pub(crate) fn bootstrap(ctx: &mut Context) -> RunResult<()> {
    let class = ctx.builtin(BuiltinId::STRING_CLASS)?;
    let builtins_mod = ctx.builtin(BuiltinId::BUILTINS_MODULE)?;
    let new_func = ctx.new_native_func("new_String", false, new_string, builtins_mod)?;
    ctx.set_constructor(class, new_func)?;

    ctx.add_method(class, "+", str_add)?;
    ctx.add_method(class, "*", str_mul)?;
    ctx.add_method(class, "==", str_eq)?;
    ctx.add_method(class, "!=", str_neq)?;
    ctx.add_method(class, "<", str_lt)?;
    ctx.add_method(class, "<=", str_le)?;
    ctx.add_method(class, ">", str_gt)?;
    ctx.add_method(class, ">=", str_ge)?;
    ctx.add_method(class, "len", str_len)?;
    ctx.add_method(class, "get", str_get)?;
    ctx.add_method(class, "get_slice", str_get_slice)?;
    ctx.add_method(class, "int_val", str_int_val)?;
    ctx.add_method(class, "lower_cased", str_lower_cased)?;
    ctx.add_method(class, "upper_cased", str_upper_cased)?;
    ctx.add_method(class, "prefixed_by", str_prefixed_by)?;
    ctx.add_method(class, "suffixed_by", str_suffixed_by)?;
    ctx.add_method(class, "split", str_split)?;
    ctx.add_method(class, "stripped", str_stripped)?;
    ctx.add_method(class, "replaced", str_replaced)?;
    ctx.add_method(class, "hash", str_hash)?;
    ctx.add_method(class, "to_str", str_to_str)?;
    ctx.add_producer_method(class, "iter", str_iter)?;
    ctx.add_producer_method(class, "find", str_find)?;
    ctx.add_producer_method(class, "find_index", str_find_index)?;
    ctx.add_producer_method(class, "rfind_index", str_rfind_index)?;
    Ok(())
}

/// `String.new(obj := "")`: the string form of `obj`.
fn new_string(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("String.new", ctx)?;
    let text: Rc<str> = match rest.as_slice() {
        [] => Rc::from(""),
        _ => {
            let obj = rest.get_one_arg("String.new", ctx)?;
            match ctx.str_value(obj) {
                Some(s) => s,
                None => ctx.to_str(obj)?,
            }
        }
    };
    ctx.construct(class, HeapData::Str(text), ArgValues::new())
}

/// Decodes the receiver of a String method.
fn receiver(ctx: &mut Context, args: &ArgValues, name: &str) -> RunResult<(Rc<str>, ArgValues)> {
    let (receiver, rest) = args.split_receiver(name, ctx)?;
    Ok((ctx.expect_str(receiver)?, rest))
}

/// Decodes `(self, other)` where both must be Strings.
fn str_operands(ctx: &mut Context, args: &ArgValues, name: &str) -> RunResult<(Rc<str>, Rc<str>)> {
    let (s, rest) = receiver(ctx, args, name)?;
    let other = rest.get_one_arg(name, ctx)?;
    Ok((s, ctx.expect_str(other)?))
}

fn str_add(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (a, b) = str_operands(ctx, &args, "String.+")?;
    let mut joined = String::with_capacity(a.len() + b.len());
    joined.push_str(&a);
    joined.push_str(&b);
    ctx.new_str(&joined)
}

fn str_mul(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, rest) = receiver(ctx, &args, "String.*")?;
    let count = rest.get_one_arg("String.*", ctx)?;
    let count = ctx.expect_int(count)?;
    let repeated = usize::try_from(count)
        .ok()
        .and_then(|n| s.len().checked_mul(n).map(|bytes| (n, bytes)));
    let Some((count, bytes)) = repeated else {
        return Err(ctx.raise(
            ExcKind::Number_Exception,
            format!("Can't repeat a string {count} times."),
        ));
    };
    ctx.limits().check_large_result(bytes)?;
    ctx.new_str(&s.repeat(count))
}

/// Equality never raises: a non-String operand is simply unequal.
fn str_equality(ctx: &mut Context, args: &ArgValues, name: &str) -> RunResult<bool> {
    let (s, rest) = receiver(ctx, args, name)?;
    let other = rest.get_one_arg(name, ctx)?;
    Ok(ctx.str_value(other).is_some_and(|o| *o == *s))
}

fn str_eq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let equal = str_equality(ctx, &args, "String.==")?;
    Ok(ctx.sentinel(equal))
}

fn str_neq(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let equal = str_equality(ctx, &args, "String.!=")?;
    Ok(ctx.sentinel(!equal))
}

fn str_ordering(ctx: &mut Context, args: &ArgValues, op: CompareOp) -> RunResult<HeapId> {
    let name = format!("String.{op}");
    let (a, b) = str_operands(ctx, args, &name)?;
    Ok(ctx.sentinel(op.holds(&*a, &*b)))
}

fn str_lt(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    str_ordering(ctx, &args, CompareOp::Lt)
}

fn str_le(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    str_ordering(ctx, &args, CompareOp::Le)
}

fn str_gt(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    str_ordering(ctx, &args, CompareOp::Gt)
}

fn str_ge(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    str_ordering(ctx, &args, CompareOp::Ge)
}

fn str_len(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, rest) = receiver(ctx, &args, "String.len")?;
    rest.check_zero_args("String.len", ctx)?;
    ctx.new_int(s.chars().count() as i64)
}

fn str_get(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, rest) = receiver(ctx, &args, "String.get")?;
    let index = rest.get_one_arg("String.get", ctx)?;
    let index = ctx.expect_int(index)?;
    let chars: Vec<char> = s.chars().collect();
    let i = translate_index(ctx, index, chars.len())?;
    ctx.new_str(chars[i].encode_utf8(&mut [0; 4]))
}

fn str_get_slice(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, rest) = receiver(ctx, &args, "String.get_slice")?;
    let chars: Vec<char> = s.chars().collect();
    let (start, end) = translate_slice(ctx, &rest, chars.len(), "String.get_slice")?;
    let slice: String = chars[start..end].iter().collect();
    ctx.new_str(&slice)
}

fn str_int_val(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, rest) = receiver(ctx, &args, "String.int_val")?;
    rest.check_zero_args("String.int_val", ctx)?;
    let value = parse_int(ctx, &s)?;
    ctx.new_int(value)
}

fn str_lower_cased(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, rest) = receiver(ctx, &args, "String.lower_cased")?;
    rest.check_zero_args("String.lower_cased", ctx)?;
    ctx.new_str(&s.to_lowercase())
}

fn str_upper_cased(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, rest) = receiver(ctx, &args, "String.upper_cased")?;
    rest.check_zero_args("String.upper_cased", ctx)?;
    ctx.new_str(&s.to_uppercase())
}

fn str_prefixed_by(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, prefix) = str_operands(ctx, &args, "String.prefixed_by")?;
    Ok(ctx.sentinel(s.starts_with(&*prefix)))
}

fn str_suffixed_by(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, suffix) = str_operands(ctx, &args, "String.suffixed_by")?;
    Ok(ctx.sentinel(s.ends_with(&*suffix)))
}

fn str_split(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, sep) = str_operands(ctx, &args, "String.split")?;
    if sep.is_empty() {
        return Err(ctx.raise(ExcKind::Parameters_Exception, "Separator must not be empty."));
    }
    let mut parts = Vec::new();
    for part in s.split(&*sep) {
        parts.push(ctx.new_str(part)?);
    }
    ctx.new_list(parts)
}

fn str_stripped(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, rest) = receiver(ctx, &args, "String.stripped")?;
    rest.check_zero_args("String.stripped", ctx)?;
    ctx.new_str(s.trim())
}

fn str_replaced(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, rest) = receiver(ctx, &args, "String.replaced")?;
    let (old, new) = rest.get_two_args("String.replaced", ctx)?;
    let old = ctx.expect_str(old)?;
    let new = ctx.expect_str(new)?;
    if old.is_empty() {
        return Err(ctx.raise(ExcKind::Parameters_Exception, "Can't replace an empty string."));
    }
    ctx.new_str(&s.replace(&*old, &new))
}

fn str_hash(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, rest) = receiver(ctx, &args, "String.hash")?;
    rest.check_zero_args("String.hash", ctx)?;
    let state = ahash::RandomState::with_seeds(0x243f_6a88, 0x85a3_08d3, 0x1319_8a2e, 0x0370_7344);
    ctx.new_int(state.hash_one(&*s) as i64)
}

/// The quoted, escaped form of the string.
fn str_to_str(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (s, rest) = receiver(ctx, &args, "String.to_str")?;
    rest.check_zero_args("String.to_str", ctx)?;
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    ctx.new_str(&quoted)
}

// =============================================================================
// Producers
// =============================================================================

/// Yields each character as a one-character String.
#[derive(Debug)]
struct StrIter {
    chars: Vec<char>,
    pos: usize,
}

impl Producer for StrIter {
    fn resume(&mut self, ctx: &mut Context) -> RunResult<Option<HeapId>> {
        let Some(&c) = self.chars.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;
        Ok(Some(ctx.new_str(c.encode_utf8(&mut [0; 4]))?))
    }
}

fn str_iter(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    let (s, rest) = receiver(ctx, &args, "String.iter")?;
    rest.check_zero_args("String.iter", ctx)?;
    Ok(Box::new(StrIter {
        chars: s.chars().collect(),
        pos: 0,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchYield {
    Match,
    Index,
}

/// Finds every (possibly overlapping) occurrence of `needle` in `hay`.
///
/// Forward searches walk `pos` up from 0; reverse searches walk it down from
/// the last candidate position. `pos` always holds the next candidate.
#[derive(Debug)]
struct StrSearch {
    hay: Vec<char>,
    needle: Vec<char>,
    needle_str: Rc<str>,
    pos: usize,
    /// Number of candidate positions not yet examined, for reverse searches.
    remaining: usize,
    reverse: bool,
    yields: SearchYield,
}

impl StrSearch {
    fn new(hay: &str, needle: Rc<str>, reverse: bool, yields: SearchYield) -> Self {
        let hay: Vec<char> = hay.chars().collect();
        let needle_chars: Vec<char> = needle.chars().collect();
        let candidates = (hay.len() + 1).saturating_sub(needle_chars.len());
        Self {
            pos: if reverse { candidates.saturating_sub(1) } else { 0 },
            remaining: candidates,
            hay,
            needle: needle_chars,
            needle_str: needle,
            reverse,
            yields,
        }
    }

    fn next_match(&mut self) -> Option<usize> {
        while self.remaining > 0 {
            let at = self.pos;
            self.remaining -= 1;
            if self.reverse {
                self.pos = self.pos.saturating_sub(1);
            } else {
                self.pos += 1;
            }
            if self.hay[at..at + self.needle.len()] == self.needle[..] {
                return Some(at);
            }
        }
        None
    }
}

impl Producer for StrSearch {
    fn resume(&mut self, ctx: &mut Context) -> RunResult<Option<HeapId>> {
        let Some(at) = self.next_match() else {
            return Ok(None);
        };
        let value = match self.yields {
            SearchYield::Index => ctx.new_int(at as i64)?,
            SearchYield::Match => ctx.new_str(&self.needle_str)?,
        };
        Ok(Some(value))
    }
}

fn search(ctx: &mut Context, args: &ArgValues, name: &str, reverse: bool, yields: SearchYield) -> RunResult<Box<dyn Producer>> {
    let (s, needle) = str_operands(ctx, args, name)?;
    Ok(Box::new(StrSearch::new(&s, needle, reverse, yields)))
}

/// Yields each occurrence of the argument, left to right.
fn str_find(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    search(ctx, &args, "String.find", false, SearchYield::Match)
}

/// Yields the index of each occurrence of the argument, left to right.
fn str_find_index(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    search(ctx, &args, "String.find_index", false, SearchYield::Index)
}

/// Yields the index of each occurrence of the argument, right to left.
fn str_rfind_index(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    search(ctx, &args, "String.rfind_index", true, SearchYield::Index)
}
