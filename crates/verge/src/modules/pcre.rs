//! The `PCRE` module: regular expressions.
//!
//! Patterns are compiled with `.` matching newlines and `^`/`$` matching at
//! line boundaries. All positions exposed to programs are character indices.
//!
//! **Module definitions:**
//! - `compile(s)`: compile `s` into a `Pattern`, raising `PCRE_Exception` if it is invalid
//! - `Pattern`: `match(s, start := 0)` (anchored at `start`) and `search(s, start := 0)`,
//!   both returning a `Match` or Fail
//! - `Match`: `get(i)` (text of group `i`, Fail if it did not participate) and
//!   `get_indexes(i)` (`[start, end]` of group `i`)
//! - `PCRE_Exception`

use std::{any::Any, rc::Rc};

use regex::{Regex, RegexBuilder};

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::{ExcKind, RunResult},
    heap::{HeapData, HeapId, NativeData},
    types::translate_index,
};

const MODULE_ID: &str = "PCRE";

/// A compiled pattern, the payload of `Pattern` instances.
#[derive(Debug)]
struct CompiledPattern {
    regex: Regex,
}

impl NativeData for CompiledPattern {
    fn kind_name(&self) -> &'static str {
        "Pattern"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The result of a successful match, the payload of `Match` instances.
///
/// `spans` holds the byte range of every group, group 0 being the whole
/// match; `None` marks a group that did not participate.
#[derive(Debug)]
struct MatchData {
    subject: Rc<str>,
    spans: Vec<Option<(usize, usize)>>,
}

impl NativeData for MatchData {
    fn kind_name(&self) -> &'static str {
        "Match"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) fn register(ctx: &mut Context) -> RunResult<()> {
    ctx.new_native_module(
        "PCRE",
        MODULE_ID,
        "",
        &["PCRE_Exception", "Pattern", "Match", "compile"],
        Some(init),
    )?;
    Ok(())
}

/// Builds the module's classes on first import.
fn init(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let module = args.get_one_arg("PCRE.init", ctx)?;
    let object_class = ctx.builtin(BuiltinId::OBJECT_CLASS)?;

    let user_exception = ctx.exception_class(ExcKind::User_Exception)?;
    let exc_class = ctx.new_class("PCRE_Exception", vec![user_exception], None, Some(module))?;
    ctx.set_defn(module, "PCRE_Exception", exc_class)?;

    let pattern_class = ctx.new_class("Pattern", vec![object_class], None, Some(module))?;
    ctx.add_method(pattern_class, "match", pattern_match)?;
    ctx.add_method(pattern_class, "search", pattern_search)?;
    ctx.set_defn(module, "Pattern", pattern_class)?;

    let match_class = ctx.new_class("Match", vec![object_class], None, Some(module))?;
    ctx.add_method(match_class, "get", match_get)?;
    ctx.add_method(match_class, "get_indexes", match_get_indexes)?;
    ctx.set_defn(module, "Match", match_class)?;

    ctx.add_module_func(module, "compile", compile)?;
    Ok(ctx.null())
}

/// Reads one of this module's definitions.
fn defn(ctx: &mut Context, name: &str) -> RunResult<HeapId> {
    let module = ctx.import_module(MODULE_ID)?;
    ctx.get_defn(module, name)
}

/// `compile(s)`.
fn compile(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let pattern = args.get_one_arg("PCRE.compile", ctx)?;
    let pattern = ctx.expect_str(pattern)?;
    let regex = match RegexBuilder::new(&pattern)
        .dot_matches_new_line(true)
        .multi_line(true)
        .build()
    {
        Ok(regex) => regex,
        Err(err) => {
            let exc_class = defn(ctx, "PCRE_Exception")?;
            return Err(ctx.raise_class(exc_class, format!("Invalid pattern '{pattern}': {err}")));
        }
    };
    let pattern_class = defn(ctx, "Pattern")?;
    ctx.construct(
        pattern_class,
        HeapData::Native(Box::new(CompiledPattern { regex })),
        ArgValues::new(),
    )
}

fn pattern_match(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    match_or_search(ctx, &args, "Pattern.match", true)
}

fn pattern_search(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    match_or_search(ctx, &args, "Pattern.search", false)
}

fn match_or_search(ctx: &mut Context, args: &ArgValues, name: &str, anchored: bool) -> RunResult<HeapId> {
    let (pattern, rest) = args.split_receiver(name, ctx)?;
    let (subject, start) = rest.get_one_two_args(name, ctx)?;
    let Some(regex) = ctx.native_ref::<CompiledPattern>(pattern).map(|p| p.regex.clone()) else {
        return Err(ctx.type_error("Pattern", pattern));
    };
    let subject = ctx.expect_str(subject)?;
    let start = match start {
        Some(start) => {
            let start = ctx.expect_int(start)?;
            let num_chars = subject.chars().count();
            let index = if start == num_chars as i64 {
                num_chars
            } else {
                translate_index(ctx, start, num_chars)?
            };
            subject.char_indices().nth(index).map_or(subject.len(), |(byte, _)| byte)
        }
        None => 0,
    };

    let Some(caps) = regex.captures_at(&subject, start) else {
        return Ok(ctx.fail());
    };
    if anchored && caps.get(0).is_some_and(|m| m.start() != start) {
        return Ok(ctx.fail());
    }
    let spans = (0..caps.len())
        .map(|i| caps.get(i).map(|m| (m.start(), m.end())))
        .collect();
    let match_class = defn(ctx, "Match")?;
    ctx.construct(
        match_class,
        HeapData::Native(Box::new(MatchData { subject, spans })),
        ArgValues::new(),
    )
}

/// Decodes `(self, i)` for a Match method, returning the subject and the byte
/// span of group `i`.
///
/// Negative group indices count from the end over the whole match plus every
/// capture group.
fn group_span(ctx: &mut Context, args: &ArgValues, name: &str) -> RunResult<(Rc<str>, Option<(usize, usize)>)> {
    let (m, rest) = args.split_receiver(name, ctx)?;
    let index = rest.get_one_arg(name, ctx)?;
    let index = ctx.expect_int(index)?;
    let Some((subject, spans)) = ctx
        .native_ref::<MatchData>(m)
        .map(|data| (Rc::clone(&data.subject), data.spans.clone()))
    else {
        return Err(ctx.type_error("Match", m));
    };
    let i = translate_index(ctx, index, spans.len())?;
    Ok((subject, spans[i]))
}

fn match_get(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    match group_span(ctx, &args, "Match.get")? {
        (subject, Some((start, end))) => ctx.new_str(&subject[start..end]),
        (_, None) => Ok(ctx.fail()),
    }
}

/// `[start, end]` of a group as character indices, or Fail.
fn match_get_indexes(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (subject, Some((start, end))) = group_span(ctx, &args, "Match.get_indexes")? else {
        return Ok(ctx.fail());
    };
    let start_char = subject[..start].chars().count();
    let end_char = start_char + subject[start..end].chars().count();
    let start = ctx.new_int(start_char as i64)?;
    let end = ctx.new_int(end_char as i64)?;
    ctx.new_list(vec![start, end])
}
