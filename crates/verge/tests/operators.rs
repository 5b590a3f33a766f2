/// Tests for operator dispatch: the equality sentinel law, the primitive fast
/// path and overriding operators in subclasses.
use std::str::FromStr;

use pretty_assertions::assert_eq;
use verge::{ArgValues, BinaryOp, BuiltinId, CompareOp, Context, ContextOptions, ExcKind, HeapId, RunResult};

fn new_ctx() -> Context {
    Context::new(ContextOptions::default()).unwrap()
}

// =============================================================================
// Sentinels
// =============================================================================

/// Operator methods return Null for success and Fail for failure.
#[test]
fn equality_returns_sentinels() {
    let mut ctx = new_ctx();
    let a = ctx.new_int(3).unwrap();
    let b = ctx.new_int(3).unwrap();
    let c = ctx.new_int(4).unwrap();
    let eq = ctx.call_method(a, "==", ArgValues::from([b])).unwrap();
    let ne = ctx.call_method(a, "==", ArgValues::from([c])).unwrap();
    assert!(ctx.is_null(eq));
    assert!(ctx.is_fail(ne));

    let s = ctx.new_str("x").unwrap();
    let t = ctx.new_str("x").unwrap();
    let eq = ctx.call_method(s, "==", ArgValues::from([t])).unwrap();
    let ne = ctx.call_method(s, "!=", ArgValues::from([t])).unwrap();
    assert!(ctx.is_null(eq));
    assert!(ctx.is_fail(ne));
}

/// `==` and `!=` always disagree.
#[test]
fn eq_and_ne_are_complementary() {
    let mut ctx = new_ctx();
    let values = [
        ctx.new_int(1).unwrap(),
        ctx.new_int(2).unwrap(),
        ctx.new_str("1").unwrap(),
        ctx.new_object().unwrap(),
    ];
    for &a in &values {
        for &b in &values {
            let eq = ctx.compare(CompareOp::Eq, a, b).unwrap();
            let ne = ctx.compare(CompareOp::Ne, a, b).unwrap();
            assert_eq!(eq, !ne);
        }
    }
}

/// Comparing across kinds is unequal, not an error; ordering across kinds raises.
#[test]
fn mixed_kind_comparisons() {
    let mut ctx = new_ctx();
    let one = ctx.new_int(1).unwrap();
    let text = ctx.new_str("1").unwrap();
    assert!(!ctx.equals(one, text).unwrap());
    assert!(!ctx.equals(text, one).unwrap());

    let err = ctx.compare(CompareOp::Lt, one, text).unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Type_Exception));
    assert_eq!(
        ctx.describe_error(&err),
        "Type_Exception: Expected instance of Int, not instance of String."
    );
}

/// Ordering on Ints and Strings.
#[test]
fn ordering() {
    let mut ctx = new_ctx();
    let one = ctx.new_int(1).unwrap();
    let two = ctx.new_int(2).unwrap();
    assert!(ctx.compare(CompareOp::Lt, one, two).unwrap());
    assert!(ctx.compare(CompareOp::Ge, two, one).unwrap());
    assert!(!ctx.compare(CompareOp::Gt, one, two).unwrap());

    let abc = ctx.new_str("abc").unwrap();
    let abd = ctx.new_str("abd").unwrap();
    assert!(ctx.compare(CompareOp::Le, abc, abd).unwrap());
    let result = ctx.call_method(abd, "<", ArgValues::from([abc])).unwrap();
    assert!(ctx.is_fail(result));
}

/// Plain objects compare by identity.
#[test]
fn objects_compare_by_identity() {
    let mut ctx = new_ctx();
    let a = ctx.new_object().unwrap();
    let b = ctx.new_object().unwrap();
    assert!(ctx.equals(a, a).unwrap());
    assert!(!ctx.equals(a, b).unwrap());
}

// =============================================================================
// Overrides
// =============================================================================

fn always_equal(ctx: &mut Context, _args: ArgValues) -> RunResult<HeapId> {
    Ok(ctx.null())
}

/// A subclass overriding `==` is dispatched to even when both operands hold Ints.
#[test]
fn subclass_override_skips_fast_path() {
    let mut ctx = new_ctx();
    let module = ctx.new_native_module("Test", "test", "", &[], None).unwrap();
    let int_class = ctx.builtin(BuiltinId::INT_CLASS).unwrap();
    let my_int = ctx.new_class("My_Int", vec![int_class], None, Some(module)).unwrap();
    ctx.add_method(my_int, "==", always_equal).unwrap();

    let five = ctx.new_int(5).unwrap();
    let six = ctx.new_int(6).unwrap();
    let a = ctx.instantiate(my_int, ArgValues::from([five])).unwrap();
    let b = ctx.instantiate(my_int, ArgValues::from([six])).unwrap();
    assert_eq!(ctx.int_value(a), Some(5));
    assert!(ctx.equals(a, b).unwrap());

    assert!(ctx.compare(CompareOp::Lt, a, b).unwrap());
}

// =============================================================================
// Arithmetic
// =============================================================================

/// `binary_op` applies the left operand's operator method.
#[test]
fn binary_ops() {
    let mut ctx = new_ctx();
    let two = ctx.new_int(2).unwrap();
    let three = ctx.new_int(3).unwrap();
    let sum = ctx.binary_op(BinaryOp::Add, two, three).unwrap();
    assert_eq!(ctx.int_value(sum), Some(5));
    let product = ctx.binary_op(BinaryOp::Mul, two, three).unwrap();
    assert_eq!(ctx.int_value(product), Some(6));
    let diff = ctx.binary_op(BinaryOp::Sub, two, three).unwrap();
    assert_eq!(ctx.int_value(diff), Some(-1));

    let ab = ctx.new_str("ab").unwrap();
    let repeated = ctx.binary_op(BinaryOp::Mul, ab, three).unwrap();
    assert_eq!(&*ctx.str_value(repeated).unwrap(), "ababab");
    let joined = ctx.binary_op(BinaryOp::Add, ab, ab).unwrap();
    assert_eq!(&*ctx.str_value(joined).unwrap(), "abab");

    let err = ctx.binary_op(BinaryOp::Add, two, ab).unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Type_Exception));
}

/// An object without the operator method raises `Slot_Exception`.
#[test]
fn missing_operator_raises() {
    let mut ctx = new_ctx();
    let obj = ctx.new_object().unwrap();
    let one = ctx.new_int(1).unwrap();
    let err = ctx.binary_op(BinaryOp::Add, obj, one).unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Slot_Exception));
}

/// Operator enums convert to and from their method names.
#[test]
fn operator_names() {
    assert_eq!(CompareOp::from_str("<=").unwrap(), CompareOp::Le);
    assert_eq!(CompareOp::Ne.to_string(), "!=");
    assert_eq!(BinaryOp::from_str("%").unwrap(), BinaryOp::Mod);
    let name: &'static str = BinaryOp::Div.into();
    assert_eq!(name, "/");
    assert!(CompareOp::from_str("=<").is_err());
}
