//! The interpreter context.
//!
//! A [`Context`] owns everything one interpreter instance needs: the heap, the
//! shape table, the name interner, the builtin registry, the module registry,
//! the tracer and the attached collaborators. There is no process-wide state;
//! two contexts never share objects.
//!
//! [`Context::new`] bootstraps the builtin classes and modules in dependency
//! order, so a freshly created context is ready to run code.

use std::rc::Rc;

use ahash::AHashMap;

use crate::{
    builtins::{BuiltinId, NUM_BUILTINS},
    engine::{Engine, SourceMap},
    exception::{ExcKind, ExceptionData, RunError, RunResult},
    heap::{Heap, HeapData, HeapId, HeapStats},
    intern::Interns,
    modules,
    resource::{ContextOptions, ResourceLimits},
    shape::ShapeTable,
    tracer::{NoopTracer, ObjectTracer},
    types::{self, Class, DictKey},
};

/// State of one interpreter instance.
#[derive(Debug)]
pub struct Context {
    pub(crate) heap: Heap,
    pub(crate) shapes: ShapeTable,
    pub(crate) interns: Interns,
    limits: ResourceLimits,
    builtins: [Option<HeapId>; NUM_BUILTINS],
    null: HeapId,
    fail: HeapId,
    exc_classes: AHashMap<ExcKind, HeapId>,
    modules: AHashMap<Rc<str>, HeapId>,
    tracer: Box<dyn ObjectTracer>,
    engine: Option<Rc<dyn Engine>>,
    source_map: Option<Rc<dyn SourceMap>>,
}

impl Context {
    /// Creates and bootstraps a context with the no-op tracer.
    pub fn new(options: ContextOptions) -> RunResult<Self> {
        Self::with_tracer(options, Box::new(NoopTracer))
    }

    /// Creates and bootstraps a context reporting to `tracer`.
    pub fn with_tracer(options: ContextOptions, tracer: Box<dyn ObjectTracer>) -> RunResult<Self> {
        let placeholder = Heap::new().next_id();
        let mut ctx = Self {
            heap: Heap::new(),
            shapes: ShapeTable::new(),
            interns: Interns::new(),
            limits: options.limits,
            builtins: [None; NUM_BUILTINS],
            null: placeholder,
            fail: placeholder,
            exc_classes: AHashMap::new(),
            modules: AHashMap::new(),
            tracer,
            engine: None,
            source_map: None,
        };
        ctx.bootstrap()?;
        Ok(ctx)
    }

    /// Builds the builtin classes and modules.
    ///
    /// `Object` and `Class` are created first and made instances of `Class`;
    /// the sentinels follow so every later step can return them. The
    /// remaining core classes exist before the `Builtins` module, which must
    /// exist before any function, since functions locate their module through
    /// their container.
    fn bootstrap(&mut self) -> RunResult<()> {
        let object_class = self.heap.next_id();
        self.allocate(
            object_class,
            HeapData::Class(Class::new(Rc::from("Object"), Vec::new(), None, 1)),
        )?;
        let class_class = self.allocate(
            object_class,
            HeapData::Class(Class::new(Rc::from("Class"), vec![object_class], None, 2)),
        )?;
        self.heap.get_mut(object_class).class = class_class;
        self.heap.get_mut(class_class).class = class_class;
        self.set_builtin(BuiltinId::OBJECT_CLASS, object_class);
        self.set_builtin(BuiltinId::CLASS_CLASS, class_class);

        self.null = self.allocate(object_class, HeapData::Object)?;
        self.fail = self.allocate(object_class, HeapData::Object)?;
        self.set_builtin(BuiltinId::NULL_OBJ, self.null);
        self.set_builtin(BuiltinId::FAIL_OBJ, self.fail);

        let core = [
            ("Module", BuiltinId::MODULE_CLASS),
            ("Func", BuiltinId::FUNC_CLASS),
            ("Partial_Application", BuiltinId::PARTIAL_APPLICATION_CLASS),
            ("String", BuiltinId::STRING_CLASS),
            ("Number", BuiltinId::NUMBER_CLASS),
            ("List", BuiltinId::LIST_CLASS),
            ("Set", BuiltinId::SET_CLASS),
            ("Dict", BuiltinId::DICT_CLASS),
            ("Exception", BuiltinId::EXCEPTION_CLASS),
        ];
        for (name, id) in core {
            let class = self.new_class(name, vec![object_class], None, None)?;
            self.set_builtin(id, class);
        }
        let number_class = self.builtin(BuiltinId::NUMBER_CLASS)?;
        let int_class = self.new_class("Int", vec![number_class], None, None)?;
        self.set_builtin(BuiltinId::INT_CLASS, int_class);

        let mut defn_names: Vec<&str> = vec!["Object", "Class", "Int"];
        defn_names.extend(core.iter().map(|(name, _)| *name));
        defn_names.extend(["null", "fail"]);
        let builtins_mod = self.new_native_module("Builtins", "Builtins", "", &defn_names, None)?;
        self.module_mut(builtins_mod)?.initialized = true;
        self.set_builtin(BuiltinId::BUILTINS_MODULE, builtins_mod);

        let mut classes = vec![("Object", object_class), ("Class", class_class), ("Int", int_class)];
        for (name, id) in core {
            classes.push((name, self.builtin(id)?));
        }
        for (name, class) in classes {
            self.set_slot(class, "container", builtins_mod);
            self.set_defn(builtins_mod, name, class)?;
        }
        self.set_defn(builtins_mod, "null", self.null)?;
        self.set_defn(builtins_mod, "fail", self.fail)?;

        types::object::bootstrap(self)?;
        types::class::bootstrap(self)?;
        types::module::bootstrap(self)?;
        types::function::bootstrap(self)?;
        types::partial::bootstrap(self)?;
        types::int::bootstrap(self)?;
        types::str::bootstrap(self)?;
        types::list::bootstrap(self)?;
        types::set::bootstrap(self)?;
        types::dict::bootstrap(self)?;
        types::exception::bootstrap(self)?;

        modules::register_extensions(self)?;
        Ok(())
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// The `Null` sentinel.
    #[inline]
    #[must_use]
    pub fn null(&self) -> HeapId {
        self.null
    }

    /// The `Fail` sentinel.
    #[inline]
    #[must_use]
    pub fn fail(&self) -> HeapId {
        self.fail
    }

    #[inline]
    #[must_use]
    pub fn is_null(&self, id: HeapId) -> bool {
        id == self.null
    }

    #[inline]
    #[must_use]
    pub fn is_fail(&self, id: HeapId) -> bool {
        id == self.fail
    }

    /// `Null` for true, `Fail` for false.
    #[inline]
    #[must_use]
    pub fn sentinel(&self, success: bool) -> HeapId {
        if success { self.null } else { self.fail }
    }

    /// Returns a populated builtin registry entry.
    pub fn builtin(&self, id: BuiltinId) -> RunResult<HeapId> {
        self.builtins[id.index()].ok_or_else(|| {
            let name: &'static str = id.into();
            RunError::internal(format!("builtin {name} is not available"))
        })
    }

    pub(crate) fn set_builtin(&mut self, id: BuiltinId, value: HeapId) {
        self.builtins[id.index()] = Some(value);
    }

    /// The class the runtime uses for exceptions of `kind`.
    pub fn exception_class(&self, kind: ExcKind) -> RunResult<HeapId> {
        self.exc_classes
            .get(&kind)
            .copied()
            .ok_or_else(|| RunError::internal(format!("exception class {kind} raised before bootstrap")))
    }

    pub(crate) fn set_exception_class(&mut self, kind: ExcKind, class: HeapId) {
        self.exc_classes.insert(kind, class);
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    /// Attaches the engine that executes bytecode functions.
    pub fn set_engine(&mut self, engine: Rc<dyn Engine>) {
        self.engine = Some(engine);
    }

    pub(crate) fn engine(&mut self) -> RunResult<Rc<dyn Engine>> {
        self.engine
            .clone()
            .ok_or_else(|| RunError::internal("bytecode function applied with no engine attached"))
    }

    /// Attaches the source map used to resolve bytecode offsets.
    pub fn set_source_map(&mut self, source_map: Rc<dyn SourceMap>) {
        self.source_map = Some(source_map);
    }

    pub(crate) fn source_map(&self) -> Option<Rc<dyn SourceMap>> {
        self.source_map.clone()
    }

    pub(crate) fn tracer_mut(&mut self) -> &mut dyn ObjectTracer {
        self.tracer.as_mut()
    }

    /// The tracer this context reports to.
    #[must_use]
    pub fn tracer(&self) -> &dyn ObjectTracer {
        self.tracer.as_ref()
    }

    #[must_use]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    #[must_use]
    pub fn shapes(&self) -> &ShapeTable {
        &self.shapes
    }

    // =========================================================================
    // Modules
    // =========================================================================

    /// Adds a module to the registry under its id, which must not be taken.
    pub(crate) fn register_module(&mut self, id: Rc<str>, module: HeapId) {
        let previous = self.modules.insert(id, module);
        debug_assert!(previous.is_none(), "module id registered twice");
    }

    /// Looks up a registered module by id without initializing it.
    #[must_use]
    pub fn find_module(&self, id: &str) -> Option<HeapId> {
        self.modules.get(id).copied()
    }

    /// Looks up a registered module by id and makes sure it is initialized.
    pub fn import_module(&mut self, id: &str) -> RunResult<HeapId> {
        let Some(module) = self.find_module(id) else {
            return Err(self.raise(ExcKind::Import_Exception, format!("Unknown module '{id}'.")));
        };
        self.import(module)?;
        Ok(module)
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocates a new boxed object of `class`.
    pub fn allocate(&mut self, class: HeapId, data: HeapData) -> RunResult<HeapId> {
        Ok(self.heap.allocate(class, data, &self.limits)?)
    }

    pub fn new_int(&mut self, value: i64) -> RunResult<HeapId> {
        let class = self.builtin(BuiltinId::INT_CLASS)?;
        self.allocate(class, HeapData::Int(value))
    }

    pub fn new_str(&mut self, value: &str) -> RunResult<HeapId> {
        let class = self.builtin(BuiltinId::STRING_CLASS)?;
        self.allocate(class, HeapData::Str(Rc::from(value)))
    }

    pub fn new_list(&mut self, items: Vec<HeapId>) -> RunResult<HeapId> {
        let class = self.builtin(BuiltinId::LIST_CLASS)?;
        self.allocate(class, HeapData::List(items))
    }

    pub fn new_set(&mut self, elems: &[HeapId]) -> RunResult<HeapId> {
        let class = self.builtin(BuiltinId::SET_CLASS)?;
        let set = self.allocate(class, HeapData::Set(indexmap::IndexMap::new()))?;
        for &elem in elems {
            self.set_add(set, elem)?;
        }
        Ok(set)
    }

    pub fn new_dict(&mut self, entries: &[(HeapId, HeapId)]) -> RunResult<HeapId> {
        let class = self.builtin(BuiltinId::DICT_CLASS)?;
        let dict = self.allocate(class, HeapData::Dict(indexmap::IndexMap::new()))?;
        for &(key, value) in entries {
            self.dict_set(dict, key, value)?;
        }
        Ok(dict)
    }

    /// A plain instance of Object with no slots.
    pub fn new_object(&mut self) -> RunResult<HeapId> {
        let class = self.builtin(BuiltinId::OBJECT_CLASS)?;
        self.allocate(class, HeapData::Object)
    }

    // =========================================================================
    // Payload access
    // =========================================================================

    #[must_use]
    pub fn int_value(&self, id: HeapId) -> Option<i64> {
        match self.heap.data(id) {
            HeapData::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn str_value(&self, id: HeapId) -> Option<Rc<str>> {
        match self.heap.data(id) {
            HeapData::Str(s) => Some(Rc::clone(s)),
            _ => None,
        }
    }

    #[must_use]
    pub fn list_items(&self, id: HeapId) -> Option<&[HeapId]> {
        match self.heap.data(id) {
            HeapData::List(items) => Some(items),
            _ => None,
        }
    }

    /// The class of any object.
    #[inline]
    #[must_use]
    pub fn class_of(&self, id: HeapId) -> HeapId {
        self.heap.get(id).class
    }

    /// Name of the class of `id`, for error messages.
    #[must_use]
    pub fn class_name_of(&self, id: HeapId) -> Rc<str> {
        match self.heap.data(self.class_of(id)) {
            HeapData::Class(class) => Rc::clone(&class.name),
            _ => Rc::from("?"),
        }
    }

    /// Builds the `Type_Exception` for an argument of the wrong kind.
    pub(crate) fn type_error(&mut self, expected: &str, got: HeapId) -> RunError {
        let got = self.class_name_of(got);
        self.raise(
            ExcKind::Type_Exception,
            format!("Expected instance of {expected}, not instance of {got}."),
        )
    }

    pub fn expect_int(&mut self, id: HeapId) -> RunResult<i64> {
        match self.int_value(id) {
            Some(i) => Ok(i),
            None => Err(self.type_error("Int", id)),
        }
    }

    pub fn expect_str(&mut self, id: HeapId) -> RunResult<Rc<str>> {
        match self.str_value(id) {
            Some(s) => Ok(s),
            None => Err(self.type_error("String", id)),
        }
    }

    /// Copies out the items of a List, raising for any other kind.
    pub fn expect_list(&mut self, id: HeapId) -> RunResult<Vec<HeapId>> {
        match self.list_items(id) {
            Some(items) => Ok(items.to_vec()),
            None => Err(self.type_error("List", id)),
        }
    }

    /// Hash key used by Set and Dict: Int and String by value, others by identity.
    #[must_use]
    pub fn dict_key(&self, id: HeapId) -> DictKey {
        match self.heap.data(id) {
            HeapData::Int(i) => DictKey::Int(*i),
            HeapData::Str(s) => DictKey::Str(Rc::clone(s)),
            _ => DictKey::Ref(id),
        }
    }

    // =========================================================================
    // Exceptions
    // =========================================================================

    /// Creates an exception of `kind` and returns it as a raised error.
    ///
    /// If the exception object itself cannot be allocated, the allocation
    /// error is returned instead.
    pub fn raise(&mut self, kind: ExcKind, msg: impl Into<String>) -> RunError {
        let msg = msg.into();
        match self.new_exception(kind, &msg) {
            Ok(exc) => RunError::Raised(exc),
            Err(err) => err,
        }
    }

    /// Creates an exception object of `kind` with message `msg`.
    pub fn new_exception(&mut self, kind: ExcKind, msg: &str) -> RunResult<HeapId> {
        let class = self.exception_class(kind)?;
        self.new_exception_of(class, msg)
    }

    /// Creates an exception of an arbitrary exception class and returns it as a raised error.
    pub fn raise_class(&mut self, class: HeapId, msg: impl Into<String>) -> RunError {
        let msg = msg.into();
        match self.new_exception_of(class, &msg) {
            Ok(exc) => RunError::Raised(exc),
            Err(err) => err,
        }
    }

    /// Creates an instance of the exception class `class` with message `msg`.
    pub fn new_exception_of(&mut self, class: HeapId, msg: &str) -> RunResult<HeapId> {
        let msg_obj = self.new_str(msg)?;
        let exc = self.allocate(class, HeapData::Exception(ExceptionData::default()))?;
        self.set_slot(exc, "msg", msg_obj);
        let class_name = self.class_name_of(exc);
        self.tracer.on_raise(&class_name, msg);
        Ok(exc)
    }

    /// Whether `err` is a raised exception that is an instance of `kind`'s class.
    #[must_use]
    pub fn is_exception(&self, err: &RunError, kind: ExcKind) -> bool {
        match (err, self.exc_classes.get(&kind)) {
            (RunError::Raised(exc), Some(&class)) => self.is_instance(class, *exc),
            _ => false,
        }
    }

    /// Renders an error as the exception line plus one line per call-chain frame.
    pub fn describe_error(&mut self, err: &RunError) -> String {
        let RunError::Raised(exc) = err else {
            return err.to_string();
        };
        let exc = *exc;
        let mut out = match self.exception_to_str(exc) {
            Ok(s) => s,
            Err(inner) => format!("<unprintable exception: {inner}>"),
        };
        let frames = match self.heap.data(exc) {
            HeapData::Exception(data) => data.call_chain.clone().unwrap_or_default(),
            _ => Vec::new(),
        };
        for site in frames {
            let path = self
                .path(site.func, None)
                .unwrap_or_else(|_| String::from("<unknown>"));
            out.push_str("\n  at ");
            out.push_str(&path);
        }
        out
    }
}
