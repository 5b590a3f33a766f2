/// Tests for classes: field lookup order, constructor resolution,
/// instantiation, membership and conformance.
use pretty_assertions::assert_eq;
use verge::{
    ArgValues, BuiltinId, Context, ContextOptions, ExcKind, HeapData, HeapId, ResourceError, ResourceLimits, RunError,
    RunResult,
};

fn new_ctx() -> Context {
    Context::new(ContextOptions::default()).unwrap()
}

fn object_class(ctx: &Context) -> HeapId {
    ctx.builtin(BuiltinId::OBJECT_CLASS).unwrap()
}

/// A native module to hang test classes and functions off.
fn test_module(ctx: &mut Context) -> HeapId {
    ctx.new_native_module("Test", "test", "", &[], None).unwrap()
}

fn class_with_field(ctx: &mut Context, name: &str, supers: Vec<HeapId>, field: &str, value: i64) -> HeapId {
    let class = ctx.new_class(name, supers, None, None).unwrap();
    let value = ctx.new_int(value).unwrap();
    ctx.set_field(class, field, value).unwrap();
    class
}

// =============================================================================
// Field lookup
// =============================================================================

/// The leftmost superclass providing a field wins.
#[test]
fn leftmost_super_wins() {
    let mut ctx = new_ctx();
    let object = object_class(&ctx);
    let a = class_with_field(&mut ctx, "A", vec![object], "greet", 1);
    let b = class_with_field(&mut ctx, "B", vec![object], "greet", 2);
    let c = ctx.new_class("C", vec![a, b], None, None).unwrap();
    let found = ctx.find_field(c, "greet").unwrap();
    assert_eq!(ctx.int_value(found), Some(1));

    let d = ctx.new_class("D", vec![b, a], None, None).unwrap();
    let found = ctx.find_field(d, "greet").unwrap();
    assert_eq!(ctx.int_value(found), Some(2));
}

/// Lookup is depth-first: a shared base reached through the left branch is
/// searched before the right branch.
#[test]
fn diamond_is_depth_first() {
    let mut ctx = new_ctx();
    let object = object_class(&ctx);
    let base = class_with_field(&mut ctx, "Base", vec![object], "f", 1);
    let left = ctx.new_class("Left", vec![base], None, None).unwrap();
    let right = class_with_field(&mut ctx, "Right", vec![base], "f", 2);
    let bottom = ctx.new_class("Bottom", vec![left, right], None, None).unwrap();
    let found = ctx.find_field(bottom, "f").unwrap();
    assert_eq!(ctx.int_value(found), Some(1));
}

/// Builds `levels` levels of diamonds: every class of a level inherits from
/// both classes of the level above.
fn diamond_ladder(ctx: &mut Context, base: HeapId, levels: usize) -> HeapId {
    let (mut left, mut right) = (base, base);
    for level in 0..levels {
        let next_left = ctx.new_class(&format!("L{level}"), vec![left, right], None, None).unwrap();
        let next_right = ctx.new_class(&format!("R{level}"), vec![left, right], None, None).unwrap();
        (left, right) = (next_left, next_right);
    }
    ctx.new_class("Bottom", vec![left, right], None, None).unwrap()
}

/// Deep diamond hierarchies expand each class once, so misses and negative
/// membership checks finish quickly and hits keep depth-first order.
#[test]
fn diamond_ladder_is_searched_once() {
    let mut ctx = new_ctx();
    let object = object_class(&ctx);
    let base = class_with_field(&mut ctx, "Base", vec![object], "f", 1);
    let bottom = diamond_ladder(&mut ctx, base, 48);
    let unrelated = ctx.new_class("Unrelated", vec![object], None, None).unwrap();
    let required = class_with_field(&mut ctx, "Required", vec![object], "missing", 0);

    assert_eq!(ctx.find_field(bottom, "missing"), None);
    let found = ctx.find_field(bottom, "f").unwrap();
    assert_eq!(ctx.int_value(found), Some(1));
    assert!(ctx.has_field(bottom, "f"));
    assert!(!ctx.has_field(bottom, "missing"));

    let obj = ctx.instantiate(bottom, ArgValues::new()).unwrap();
    assert!(!ctx.has_slot(obj, "missing"));
    assert!(ctx.is_instance(base, obj));
    assert!(!ctx.is_instance(unrelated, obj));

    let protocol = diamond_ladder(&mut ctx, required, 48);
    assert!(!ctx.conformed_by(protocol, obj));
    assert!(ctx.conformed_by(base, obj));
}

/// Own fields shadow inherited ones and keep definition order.
#[test]
fn own_fields_shadow_inherited() {
    let mut ctx = new_ctx();
    let object = object_class(&ctx);
    let base = class_with_field(&mut ctx, "Base", vec![object], "f", 1);
    let sub = class_with_field(&mut ctx, "Sub", vec![base], "f", 2);
    let g = ctx.new_int(3).unwrap();
    ctx.set_field(sub, "g", g).unwrap();
    let found = ctx.find_field(sub, "f").unwrap();
    assert_eq!(ctx.int_value(found), Some(2));
    assert_eq!(ctx.field_names(sub), vec!["f", "g"]);
}

/// A missing field raises `Field_Exception` through `get_field`.
#[test]
fn missing_field_raises() {
    let mut ctx = new_ctx();
    let object = object_class(&ctx);
    let err = ctx.get_field(object, "nope").unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Field_Exception));
    assert_eq!(
        ctx.describe_error(&err),
        "Field_Exception: No such field 'nope' in class 'Object'."
    );
}

// =============================================================================
// Constructors
// =============================================================================

fn make_plain(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, _rest) = args.split_receiver("make_plain", ctx)?;
    ctx.allocate(class, HeapData::Object)
}

fn make_other(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, _rest) = args.split_receiver("make_other", ctx)?;
    ctx.allocate(class, HeapData::Object)
}

/// A class without constructor-bearing superclasses gets Object's constructor.
#[test]
fn default_constructor_is_generic() {
    let mut ctx = new_ctx();
    let object = object_class(&ctx);
    let generic = ctx.class_data(object).unwrap().new_func();
    let class = ctx.new_class("Plain", vec![object], None, None).unwrap();
    assert!(generic.is_some());
    assert_eq!(ctx.class_data(class).unwrap().new_func(), generic);
}

/// A specific constructor beats the generic one whatever the superclass order.
#[test]
fn specific_constructor_beats_generic() {
    let mut ctx = new_ctx();
    let module = test_module(&mut ctx);
    let object = object_class(&ctx);
    let ctor = ctx.new_native_func("make_plain", false, make_plain, module).unwrap();
    let generic = ctx.new_class("Generic", vec![object], None, None).unwrap();
    let specific = ctx.new_class("Specific", vec![object], Some(ctor), None).unwrap();

    let left = ctx.new_class("L", vec![generic, specific], None, None).unwrap();
    let right = ctx.new_class("R", vec![specific, generic], None, None).unwrap();
    assert_eq!(ctx.class_data(left).unwrap().new_func(), Some(ctor));
    assert_eq!(ctx.class_data(right).unwrap().new_func(), Some(ctor));
}

/// Two different specific constructors cannot be combined.
#[test]
fn conflicting_constructors_raise() {
    let mut ctx = new_ctx();
    let module = test_module(&mut ctx);
    let object = object_class(&ctx);
    let ctor_a = ctx.new_native_func("make_plain", false, make_plain, module).unwrap();
    let ctor_b = ctx.new_native_func("make_other", false, make_other, module).unwrap();
    let a = ctx.new_class("A", vec![object], Some(ctor_a), None).unwrap();
    let b = ctx.new_class("B", vec![object], Some(ctor_b), None).unwrap();

    let err = ctx.new_class("C", vec![a, b], None, None).unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Metaclass_Exception));

    let same = ctx.new_class("Same", vec![a, a], None, None).unwrap();
    assert_eq!(ctx.class_data(same).unwrap().new_func(), Some(ctor_a));
}

/// Builtin subclasses inherit the builtin constructor.
#[test]
fn subclass_of_list_builds_lists() {
    let mut ctx = new_ctx();
    let list_class = ctx.builtin(BuiltinId::LIST_CLASS).unwrap();
    let my_list = ctx.new_class("My_List", vec![list_class], None, None).unwrap();
    let instance = ctx.instantiate(my_list, ArgValues::new()).unwrap();
    assert_eq!(ctx.class_of(instance), my_list);
    assert_eq!(ctx.list_items(instance), Some(&[][..]));
    assert!(ctx.is_instance(list_class, instance));
}

// =============================================================================
// Instantiation
// =============================================================================

fn point_init(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (point, rest) = args.split_receiver("Point.init", ctx)?;
    let (x, y) = rest.get_two_args("Point.init", ctx)?;
    ctx.set_slot(point, "x", x);
    ctx.set_slot(point, "y", y);
    Ok(ctx.null())
}

/// The generic constructor allocates and passes the arguments to `init`.
#[test]
fn instantiate_runs_init() {
    let mut ctx = new_ctx();
    let module = test_module(&mut ctx);
    let object = object_class(&ctx);
    let point = ctx.new_class("Point", vec![object], None, Some(module)).unwrap();
    ctx.add_method(point, "init", point_init).unwrap();

    let x = ctx.new_int(3).unwrap();
    let y = ctx.new_int(4).unwrap();
    let p = ctx.instantiate(point, ArgValues::from([x, y])).unwrap();
    assert_eq!(ctx.class_of(p), point);
    assert_eq!(ctx.own_slot(p, "x"), Some(x));
    assert_eq!(ctx.own_slot(p, "y"), Some(y));

    let q = ctx.apply(point, ArgValues::from([y, x])).unwrap();
    assert_eq!(ctx.own_slot(q, "x"), Some(y));
}

/// `Class.new(name)` builds a class whose only superclass is Object.
#[test]
fn class_new_defaults_supers() {
    let mut ctx = new_ctx();
    let class_class = ctx.builtin(BuiltinId::CLASS_CLASS).unwrap();
    let object = object_class(&ctx);
    let name = ctx.new_str("Dynamic").unwrap();
    let class = ctx.call_method(class_class, "new", ArgValues::from([name])).unwrap();
    assert_eq!(ctx.class_of(class), class_class);
    assert_eq!(ctx.class_data(class).unwrap().name(), "Dynamic");
    assert_eq!(ctx.class_data(class).unwrap().supers(), &[object]);

    let instance = ctx.instantiate(class, ArgValues::new()).unwrap();
    assert!(ctx.is_instance(class, instance));
}

/// Records the arguments `init` received on the new class.
fn tagged_init(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Meta.init", ctx)?;
    let tags = ctx.new_list(rest.as_slice().to_vec())?;
    ctx.set_slot(class, "tags", tags);
    Ok(ctx.null())
}

/// A metaclass's `init` sees only the arguments after the container.
#[test]
fn class_new_passes_trailing_args_to_init() {
    let mut ctx = new_ctx();
    let module = test_module(&mut ctx);
    let class_class = ctx.builtin(BuiltinId::CLASS_CLASS).unwrap();
    let object = object_class(&ctx);
    let meta = ctx.new_class("Meta", vec![class_class], None, Some(module)).unwrap();
    ctx.add_method(meta, "init", tagged_init).unwrap();

    let name = ctx.new_str("Tagged").unwrap();
    let supers = ctx.new_list(vec![object]).unwrap();
    let null = ctx.null();
    let tag = ctx.new_int(42).unwrap();
    let class = ctx.instantiate(meta, ArgValues::from([name, supers, null, tag])).unwrap();
    assert_eq!(ctx.class_of(class), meta);
    assert_eq!(ctx.class_data(class).unwrap().name(), "Tagged");
    let tags = ctx.own_slot(class, "tags").unwrap();
    assert_eq!(ctx.list_items(tags).unwrap().to_vec(), vec![tag]);

    let name = ctx.new_str("Untagged").unwrap();
    let plain = ctx.instantiate(meta, ArgValues::from([name, supers, null])).unwrap();
    let tags = ctx.own_slot(plain, "tags").unwrap();
    assert_eq!(ctx.list_items(tags).unwrap().to_vec(), Vec::<HeapId>::new());
}

// =============================================================================
// Membership
// =============================================================================

/// `is_instance` follows the whole superclass graph.
#[test]
fn is_instance_walks_supers() {
    let mut ctx = new_ctx();
    let i = ctx.new_int(1).unwrap();
    let int_class = ctx.builtin(BuiltinId::INT_CLASS).unwrap();
    let number = ctx.builtin(BuiltinId::NUMBER_CLASS).unwrap();
    let string = ctx.builtin(BuiltinId::STRING_CLASS).unwrap();
    let object = object_class(&ctx);
    assert!(ctx.is_instance(int_class, i));
    assert!(ctx.is_instance(number, i));
    assert!(ctx.is_instance(object, i));
    assert!(!ctx.is_instance(string, i));

    let yes = ctx.call_method(number, "instantiated", ArgValues::from([i])).unwrap();
    let no = ctx.call_method(string, "instantiated", ArgValues::from([i])).unwrap();
    assert!(ctx.is_null(yes));
    assert!(ctx.is_fail(no));
}

/// Conformance is structural: every declared field must be a slot of the object.
#[test]
fn conformed_by_checks_fields() {
    let mut ctx = new_ctx();
    let object = object_class(&ctx);
    let proto = class_with_field(&mut ctx, "Has_X", vec![object], "x", 0);
    let sub = class_with_field(&mut ctx, "Has_X_Y", vec![proto], "y", 0);
    let obj = ctx.new_object().unwrap();
    assert!(!ctx.conformed_by(proto, obj));

    let one = ctx.new_int(1).unwrap();
    ctx.set_slot(obj, "x", one);
    assert!(ctx.conformed_by(proto, obj));
    assert!(!ctx.conformed_by(sub, obj));

    ctx.set_slot(obj, "y", one);
    assert!(ctx.conformed_by(sub, obj));
}

/// Instances conform to their own class without any slots.
#[test]
fn instances_conform_trivially() {
    let mut ctx = new_ctx();
    let object = object_class(&ctx);
    let proto = class_with_field(&mut ctx, "Has_X", vec![object], "x", 0);
    let instance = ctx.instantiate(proto, ArgValues::new()).unwrap();
    assert!(ctx.conformed_by(proto, instance));
}

// =============================================================================
// Depth limit and paths
// =============================================================================

/// Creating a class deeper than the configured limit is a resource error.
#[test]
fn inheritance_depth_is_bounded() {
    let options = ContextOptions {
        limits: ResourceLimits::new().max_inheritance_depth(5),
    };
    let mut ctx = Context::new(options).unwrap();
    let mut parent = object_class(&ctx);
    for name in ["D2", "D3", "D4", "D5"] {
        parent = ctx.new_class(name, vec![parent], None, None).unwrap();
    }
    let err = ctx.new_class("D6", vec![parent], None, None).unwrap_err();
    assert_eq!(
        err,
        RunError::Resource(ResourceError::InheritanceDepth { limit: 5, depth: 6 })
    );
}

/// Paths join module members with `::` and nested members with `.`.
#[test]
fn nested_class_path() {
    let mut ctx = new_ctx();
    let builtins = ctx.builtin(BuiltinId::BUILTINS_MODULE).unwrap();
    let object = object_class(&ctx);
    let outer = ctx.new_class("Outer", vec![object], None, Some(builtins)).unwrap();
    let inner = ctx.new_class("Inner", vec![object], None, Some(outer)).unwrap();
    assert_eq!(ctx.path(inner, None).unwrap(), "Builtins::Outer.Inner");
    assert_eq!(ctx.path(inner, Some(builtins)).unwrap(), "Outer.Inner");

    let shown = ctx.to_str(inner).unwrap();
    assert_eq!(&*shown, "<Class Inner>");
}
