/// Tests for the `PCRE` extension module.
use pretty_assertions::assert_eq;
use verge::{ArgValues, Context, ContextOptions, ExcKind, HeapId, RunResult};

fn new_ctx() -> Context {
    Context::new(ContextOptions::default()).unwrap()
}

fn compile(ctx: &mut Context, pattern: &str) -> RunResult<HeapId> {
    let module = ctx.import_module("PCRE")?;
    let compile = ctx.get_defn(module, "compile")?;
    let pattern = ctx.new_str(pattern)?;
    ctx.apply(compile, ArgValues::from([pattern]))
}

/// Applies `pattern.search(subject)` or `pattern.match(subject)`, with an optional start.
fn run(ctx: &mut Context, pattern: HeapId, method: &str, subject: &str, start: Option<i64>) -> HeapId {
    let subject = ctx.new_str(subject).unwrap();
    let mut args = ArgValues::from([subject]);
    if let Some(start) = start {
        args.push(ctx.new_int(start).unwrap());
    }
    ctx.call_method(pattern, method, args).unwrap()
}

fn group(ctx: &mut Context, m: HeapId, i: i64) -> RunResult<HeapId> {
    let i = ctx.new_int(i)?;
    ctx.call_method(m, "get", ArgValues::from([i]))
}

fn group_str(ctx: &mut Context, m: HeapId, i: i64) -> String {
    let text = group(ctx, m, i).unwrap();
    ctx.str_value(text).unwrap().to_string()
}

fn indexes(ctx: &mut Context, m: HeapId, i: i64) -> Vec<i64> {
    let i = ctx.new_int(i).unwrap();
    let span = ctx.call_method(m, "get_indexes", ArgValues::from([i])).unwrap();
    let items = ctx.list_items(span).unwrap().to_vec();
    items.iter().map(|&v| ctx.int_value(v).unwrap()).collect()
}

// =============================================================================
// Module loading
// =============================================================================

/// The module is registered at startup but only populated on import.
#[test]
fn module_is_lazy() {
    let mut ctx = new_ctx();
    let module = ctx.find_module("PCRE").unwrap();
    assert!(!ctx.module_data(module).unwrap().is_initialized());
    let err = ctx.get_defn(module, "compile").unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Unassigned_Var_Exception));

    ctx.import_module("PCRE").unwrap();
    assert!(ctx.module_data(module).unwrap().is_initialized());
    let pattern_class = ctx.get_defn(module, "Pattern").unwrap();
    assert_eq!(ctx.path(pattern_class, None).unwrap(), "PCRE::Pattern");
}

/// Compiled patterns are instances of `Pattern` with a native payload.
#[test]
fn compile_builds_pattern() {
    let mut ctx = new_ctx();
    let pattern = compile(&mut ctx, "b+").unwrap();
    let module = ctx.find_module("PCRE").unwrap();
    let pattern_class = ctx.get_defn(module, "Pattern").unwrap();
    assert_eq!(ctx.class_of(pattern), pattern_class);
    assert_eq!(ctx.heap_stats().objects_by_kind.get("Pattern"), Some(&1));
}

/// An invalid pattern raises `PCRE_Exception`, a kind of `User_Exception`.
#[test]
fn invalid_pattern_raises() {
    let mut ctx = new_ctx();
    let err = compile(&mut ctx, "(").unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::User_Exception));
    let described = ctx.describe_error(&err);
    assert!(described.starts_with("PCRE_Exception: Invalid pattern '(':"), "{described}");
}

// =============================================================================
// Matching
// =============================================================================

/// `search` finds the leftmost match; groups are read with `get` and `get_indexes`.
#[test]
fn search_and_groups() {
    let mut ctx = new_ctx();
    let pattern = compile(&mut ctx, "(b+)(c)").unwrap();
    let m = run(&mut ctx, pattern, "search", "abbbcd", None);
    assert_eq!(group_str(&mut ctx, m, 0), "bbbc");
    assert_eq!(group_str(&mut ctx, m, 1), "bbb");
    assert_eq!(group_str(&mut ctx, m, -1), "c");
    assert_eq!(indexes(&mut ctx, m, 0), vec![1, 5]);
    assert_eq!(indexes(&mut ctx, m, 2), vec![4, 5]);

    let none = run(&mut ctx, pattern, "search", "xyz", None);
    assert!(ctx.is_fail(none));
}

/// `match` only succeeds at the start position.
#[test]
fn match_is_anchored() {
    let mut ctx = new_ctx();
    let pattern = compile(&mut ctx, "b+").unwrap();
    let at_zero = run(&mut ctx, pattern, "match", "abbc", None);
    assert!(ctx.is_fail(at_zero));
    let at_one = run(&mut ctx, pattern, "match", "abbc", Some(1));
    assert_eq!(group_str(&mut ctx, at_one, 0), "bb");

    let searched = run(&mut ctx, pattern, "search", "abbc", Some(3));
    assert!(ctx.is_fail(searched));
    let at_end = run(&mut ctx, pattern, "search", "abbc", Some(4));
    assert!(ctx.is_fail(at_end));
}

/// A group that did not participate reads as Fail; out-of-range groups raise.
#[test]
fn missing_groups() {
    let mut ctx = new_ctx();
    let pattern = compile(&mut ctx, "(a)(x)?").unwrap();
    let m = run(&mut ctx, pattern, "search", "ab", None);
    let skipped = group(&mut ctx, m, 2).unwrap();
    assert!(ctx.is_fail(skipped));

    let err = group(&mut ctx, m, 3).unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Bounds_Exception));
}

/// Positions are character indices, both in and out.
#[test]
fn positions_are_chars() {
    let mut ctx = new_ctx();
    let pattern = compile(&mut ctx, "é+").unwrap();
    let m = run(&mut ctx, pattern, "search", "héé!é", None);
    assert_eq!(indexes(&mut ctx, m, 0), vec![1, 3]);

    let later = run(&mut ctx, pattern, "search", "héé!é", Some(3));
    assert_eq!(indexes(&mut ctx, later, 0), vec![4, 5]);

    let from_end = run(&mut ctx, pattern, "search", "héé!é", Some(-1));
    assert_eq!(indexes(&mut ctx, from_end, 0), vec![4, 5]);
}

/// `^` matches after newlines and `.` matches newlines.
#[test]
fn multi_line_and_dot_all() {
    let mut ctx = new_ctx();
    let line_start = compile(&mut ctx, "^b").unwrap();
    let m = run(&mut ctx, line_start, "search", "a\nb", None);
    assert_eq!(indexes(&mut ctx, m, 0), vec![2, 3]);

    let across = compile(&mut ctx, "a.b").unwrap();
    let m = run(&mut ctx, across, "search", "a\nb", None);
    assert_eq!(group_str(&mut ctx, m, 0), "a\nb");
}
