/// Tests for modules: definition tables, lazy initialization, the module
/// registry and bytecode modules driven by an attached engine.
use std::{cell::RefCell, rc::Rc};

use pretty_assertions::assert_eq;
use verge::{
    ArgValues, BuiltinId, BytecodeFunc, CompiledModule, Context, ContextOptions, Engine, ExcKind, FnProducer, HeapId,
    Producer, RecordingTracer, RunError, RunResult, TraceEvent,
};

fn new_ctx() -> Context {
    Context::new(ContextOptions::default()).unwrap()
}

fn count_of(ctx: &Context, module: HeapId) -> i64 {
    ctx.own_slot(module, "count").and_then(|c| ctx.int_value(c)).unwrap_or(0)
}

fn bump_count(ctx: &mut Context, module: HeapId) -> RunResult<()> {
    let count = count_of(ctx, module);
    let next = ctx.new_int(count + 1)?;
    ctx.set_slot(module, "count", next);
    Ok(())
}

fn counting_init(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let module = args.get_one_arg("Counting.init", ctx)?;
    bump_count(ctx, module)?;
    let answer = ctx.new_int(42)?;
    ctx.set_defn(module, "answer", answer)?;
    Ok(ctx.null())
}

fn failing_init(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let module = args.get_one_arg("Failing.init", ctx)?;
    bump_count(ctx, module)?;
    Err(ctx.raise(ExcKind::User_Exception, "not today"))
}

// =============================================================================
// Definitions
// =============================================================================

/// Declared-but-unassigned and undeclared names raise different exceptions.
#[test]
fn unassigned_and_missing_definitions() {
    let mut ctx = new_ctx();
    let module = ctx.new_native_module("Geo", "geo", "", &["area", "perimeter"], None).unwrap();

    let err = ctx.get_defn(module, "area").unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Unassigned_Var_Exception));
    assert_eq!(
        ctx.describe_error(&err),
        "Unassigned_Var_Exception: Definition 'area' unassigned in 'Geo'."
    );

    let err = ctx.get_defn(module, "volume").unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Mod_Defn_Exception));
    assert_eq!(
        ctx.describe_error(&err),
        "Mod_Defn_Exception: Definition 'volume' not found in 'Geo'."
    );

    let value = ctx.new_int(1).unwrap();
    ctx.set_defn(module, "area", value).unwrap();
    assert_eq!(ctx.get_defn(module, "area").unwrap(), value);
    assert!(ctx.set_defn(module, "volume", value).is_err());
    assert!(ctx.has_defn(module, "perimeter"));
    assert!(!ctx.has_defn(module, "volume"));
    assert_eq!(ctx.defn_names(module), vec!["area", "perimeter"]);
}

/// `iter_defns` yields `[name, value]` for assigned definitions only.
#[test]
fn iter_defns_skips_unassigned() {
    let mut ctx = new_ctx();
    let module = ctx.new_native_module("Abc", "abc", "", &["a", "b", "c"], None).unwrap();
    let one = ctx.new_int(1).unwrap();
    let three = ctx.new_int(3).unwrap();
    ctx.set_defn(module, "a", one).unwrap();
    ctx.set_defn(module, "c", three).unwrap();

    let iter = ctx.get_slot(module, "iter_defns").unwrap();
    let pairs = ctx.apply_pump(iter, ArgValues::new()).unwrap().collect(&mut ctx).unwrap();
    let mut seen = Vec::new();
    for pair in pairs {
        let items = ctx.list_items(pair).unwrap().to_vec();
        let name = ctx.str_value(items[0]).unwrap().to_string();
        seen.push((name, ctx.int_value(items[1]).unwrap()));
    }
    assert_eq!(seen, vec![(String::from("a"), 1), (String::from("c"), 3)]);
}

/// The builtin modules declare their classes and sentinels.
#[test]
fn builtin_modules() {
    let mut ctx = new_ctx();
    let builtins = ctx.builtin(BuiltinId::BUILTINS_MODULE).unwrap();
    let int_class = ctx.builtin(BuiltinId::INT_CLASS).unwrap();
    assert_eq!(ctx.get_defn(builtins, "Int").unwrap(), int_class);
    assert_eq!(ctx.get_defn(builtins, "fail").unwrap(), ctx.fail());
    assert_eq!(ctx.find_module("Builtins"), Some(builtins));

    let exceptions = ctx.builtin(BuiltinId::EXCEPTIONS_MODULE).unwrap();
    let key_exception = ctx.exception_class(ExcKind::Key_Exception).unwrap();
    assert_eq!(ctx.get_defn(exceptions, "Key_Exception").unwrap(), key_exception);
    assert_eq!(&*ctx.to_str(exceptions).unwrap(), "<Module Exceptions>");
}

// =============================================================================
// Import
// =============================================================================

/// The initializer runs on the first import only.
#[test]
fn import_runs_init_once() {
    let mut ctx = new_ctx();
    let module = ctx
        .new_native_module("Counting", "counting", "", &["answer"], Some(counting_init))
        .unwrap();
    assert!(!ctx.module_data(module).unwrap().is_initialized());

    ctx.import(module).unwrap();
    ctx.import(module).unwrap();
    assert_eq!(ctx.import_module("counting").unwrap(), module);
    assert_eq!(count_of(&ctx, module), 1);
    assert!(ctx.module_data(module).unwrap().is_initialized());

    let answer = ctx.get_defn(module, "answer").unwrap();
    assert_eq!(ctx.int_value(answer), Some(42));
}

/// A failing initializer leaves the module uninitialized and is retried.
#[test]
fn failed_init_is_retried() {
    let mut ctx = new_ctx();
    let module = ctx.new_native_module("Failing", "failing", "", &[], Some(failing_init)).unwrap();

    let err = ctx.import(module).unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::User_Exception));
    assert!(!ctx.module_data(module).unwrap().is_initialized());

    assert!(ctx.import(module).is_err());
    assert_eq!(count_of(&ctx, module), 2);
}

/// Importing an unknown module id raises `Import_Exception`.
#[test]
fn unknown_module_raises() {
    let mut ctx = new_ctx();
    let err = ctx.import_module("nowhere").unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Import_Exception));
    assert_eq!(ctx.describe_error(&err), "Import_Exception: Unknown module 'nowhere'.");
}

/// A module id can be registered once; a second module under the same id is
/// rejected and the first stays registered.
#[test]
fn duplicate_module_id_raises() {
    let mut ctx = new_ctx();
    let first = ctx.new_native_module("Geo", "geo", "", &["area"], None).unwrap();
    let err = ctx.new_native_module("Geo2", "geo", "", &[], None).unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Import_Exception));
    assert_eq!(
        ctx.describe_error(&err),
        "Import_Exception: Module 'geo' is already registered."
    );
    assert_eq!(ctx.find_module("geo"), Some(first));

    let err = ctx.new_native_module("Builtins", "Builtins", "", &[], None).unwrap_err();
    assert!(ctx.is_exception(&err, ExcKind::Import_Exception));
    assert_eq!(ctx.find_module("Builtins"), Some(ctx.builtin(BuiltinId::BUILTINS_MODULE).unwrap()));
}

/// A successful import is traced once.
#[test]
fn import_is_traced() {
    let mut ctx = Context::with_tracer(ContextOptions::default(), Box::new(RecordingTracer::new())).unwrap();
    let module = ctx
        .new_native_module("Counting", "counting", "", &["answer"], Some(counting_init))
        .unwrap();
    ctx.import(module).unwrap();
    ctx.import(module).unwrap();

    let tracer = ctx.tracer().as_any().downcast_ref::<RecordingTracer>().unwrap();
    let imports = tracer
        .events()
        .iter()
        .filter(|event| matches!(event, TraceEvent::ModuleImported { name } if name == "Counting"))
        .count();
    assert_eq!(imports, 1);
}

// =============================================================================
// Bytecode modules
// =============================================================================

/// Engine that records applied function names and pumps `1, 2, 3`.
#[derive(Debug, Default)]
struct MockEngine {
    calls: RefCell<Vec<String>>,
}

impl Engine for MockEngine {
    fn apply(&self, ctx: &mut Context, func: HeapId, _args: ArgValues) -> RunResult<HeapId> {
        let name = ctx.func_data(func).unwrap().name().to_owned();
        self.calls.borrow_mut().push(name);
        Ok(ctx.null())
    }

    fn apply_pump(&self, _ctx: &mut Context, _func: HeapId, _args: ArgValues) -> RunResult<Box<dyn Producer>> {
        let mut n = 0;
        Ok(Box::new(FnProducer::new(move |ctx: &mut Context| {
            n += 1;
            if n > 3 {
                return Ok(None);
            }
            ctx.new_int(n).map(Some)
        })))
    }
}

fn compiled(init_offset: Option<usize>) -> CompiledModule {
    CompiledModule {
        bytecode: vec![0; 16],
        name: String::from("Bc_Mod"),
        id: String::from("bc_mod"),
        src_path: String::from("bc_mod.cv"),
        defn_names: vec![String::from("f")],
        num_consts: 2,
        init_offset,
        ..CompiledModule::default()
    }
}

fn bytecode_func(name: &str) -> BytecodeFunc {
    BytecodeFunc {
        name: name.to_owned(),
        is_bound: false,
        offset: 4,
        num_params: 0,
        num_vars: 0,
        closure: None,
    }
}

/// A bytecode initializer is run through the engine on import.
#[test]
fn bytecode_init_goes_through_engine() {
    let mut ctx = new_ctx();
    let engine = Rc::new(MockEngine::default());
    ctx.set_engine(engine.clone());
    let module = ctx.new_bc_module(compiled(Some(0))).unwrap();
    ctx.import_module("bc_mod").unwrap();
    ctx.import(module).unwrap();
    assert_eq!(*engine.calls.borrow(), vec!["$$init$$"]);

    let path = ctx.get_slot(module, "src_path").unwrap();
    assert_eq!(&*ctx.str_value(path).unwrap(), "bc_mod.cv");
}

/// Without an engine, a bytecode initializer fails and the import can be retried.
#[test]
fn bytecode_init_without_engine() {
    let mut ctx = new_ctx();
    let module = ctx.new_bc_module(compiled(Some(0))).unwrap();
    let err = ctx.import(module).unwrap_err();
    assert!(matches!(err, RunError::Internal(_)));
    assert!(!ctx.module_data(module).unwrap().is_initialized());

    ctx.set_engine(Rc::new(MockEngine::default()));
    ctx.import(module).unwrap();
    assert!(ctx.module_data(module).unwrap().is_initialized());
}

/// Bytecode functions apply and pump through the engine.
#[test]
fn bytecode_functions_use_engine() {
    let mut ctx = new_ctx();
    let engine = Rc::new(MockEngine::default());
    ctx.set_engine(engine.clone());
    let module = ctx.new_bc_module(compiled(None)).unwrap();
    let f = ctx.new_bytecode_func(bytecode_func("f"), module).unwrap();
    ctx.set_defn(module, "f", f).unwrap();

    let result = ctx.apply(f, ArgValues::new()).unwrap();
    assert!(ctx.is_null(result));
    assert_eq!(*engine.calls.borrow(), vec!["f"]);

    let mut pump = ctx.apply_pump(f, ArgValues::new()).unwrap();
    let mut values = Vec::new();
    loop {
        let value = pump.next_value(&mut ctx).unwrap();
        if ctx.is_fail(value) {
            break;
        }
        values.push(ctx.int_value(value).unwrap());
    }
    assert_eq!(values, vec![1, 2, 3]);
    assert_eq!(ctx.path(f, None).unwrap(), "Bc_Mod::f");
}

/// Bytecode functions cannot live in native modules.
#[test]
fn bytecode_func_needs_bytecode_module() {
    let mut ctx = new_ctx();
    let module = ctx.new_native_module("Native", "native", "", &[], None).unwrap();
    let err = ctx.new_bytecode_func(bytecode_func("g"), module).unwrap_err();
    assert!(matches!(err, RunError::Internal(_)));
}

/// The constant cache starts empty and is bounded by the module's constant count.
#[test]
fn constant_cache() {
    let mut ctx = new_ctx();
    let module = ctx.new_bc_module(compiled(None)).unwrap();
    assert_eq!(ctx.get_const(module, 1).unwrap(), None);

    let value = ctx.new_str("cached").unwrap();
    ctx.set_const(module, 1, value).unwrap();
    assert_eq!(ctx.get_const(module, 1).unwrap(), Some(value));
    assert!(ctx.get_const(module, 2).is_err());
    assert!(ctx.set_const(module, 2, value).is_err());
}
