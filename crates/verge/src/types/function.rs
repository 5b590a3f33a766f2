//! Functions, application and path naming.
//!
//! A function's entry point is either native Rust code (a plain function or a
//! producer) or a bytecode offset executed by the attached engine. Every
//! entry point also names the module the function belongs to, which is found
//! by walking `container` slots outwards from where the function is defined.

use std::rc::Rc;

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::{ExcKind, RunError, RunResult},
    heap::{HeapData, HeapId},
    pump::{OnceProducer, Producer, Pump},
};

/// Native function body: receives the receiver (for bound functions) followed by the arguments.
pub type NativeFn = fn(&mut Context, ArgValues) -> RunResult<HeapId>;

/// Native generator body: returns the producer for the series.
pub type NativeProducerFn = fn(&mut Context, ArgValues) -> RunResult<Box<dyn Producer>>;

/// Entry point of a function.
#[derive(Debug, Clone, Copy)]
pub enum Pc {
    Native { module: HeapId, func: NativeFn },
    NativeProducer { module: HeapId, func: NativeProducerFn },
    Bytecode { module: HeapId, offset: usize },
}

impl Pc {
    /// The module the entry point belongs to.
    #[must_use]
    pub fn module(&self) -> HeapId {
        match self {
            Self::Native { module, .. } | Self::NativeProducer { module, .. } | Self::Bytecode { module, .. } => *module,
        }
    }
}

/// Payload of a function object.
#[derive(Debug)]
pub struct Function {
    pub(crate) name: Rc<str>,
    /// Bound functions are methods: slot lookup wraps them with their receiver.
    pub(crate) is_bound: bool,
    pub(crate) pc: Pc,
    pub(crate) num_params: usize,
    pub(crate) num_vars: usize,
    /// Variables captured from the enclosing scope, for bytecode closures.
    pub(crate) closure: Option<Vec<Option<HeapId>>>,
}

impl Function {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.is_bound
    }

    #[must_use]
    pub fn pc(&self) -> Pc {
        self.pc
    }

    #[must_use]
    pub fn num_params(&self) -> usize {
        self.num_params
    }

    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    #[must_use]
    pub fn closure(&self) -> Option<&[Option<HeapId>]> {
        self.closure.as_deref()
    }
}

/// Description of a bytecode function, as produced by the engine.
#[derive(Debug, Clone)]
pub struct BytecodeFunc {
    pub name: String,
    pub is_bound: bool,
    pub offset: usize,
    pub num_params: usize,
    pub num_vars: usize,
    pub closure: Option<Vec<Option<HeapId>>>,
}

impl Context {
    #[must_use]
    pub fn func_data(&self, id: HeapId) -> Option<&Function> {
        match self.heap.data(id) {
            HeapData::Function(func) => Some(func),
            _ => None,
        }
    }

    pub(crate) fn is_bound_func(&self, id: HeapId) -> bool {
        self.func_data(id).is_some_and(|func| func.is_bound)
    }

    fn new_func(&mut self, func: Function, container: HeapId) -> RunResult<HeapId> {
        let class = self.builtin(BuiltinId::FUNC_CLASS)?;
        let id = self.allocate(class, HeapData::Function(func))?;
        self.set_slot(id, "container", container);
        Ok(id)
    }

    /// Creates a native function defined inside `container`.
    pub fn new_native_func(&mut self, name: &str, is_bound: bool, func: NativeFn, container: HeapId) -> RunResult<HeapId> {
        let module = self.enclosing_module(container)?;
        self.new_func(
            Function {
                name: Rc::from(name),
                is_bound,
                pc: Pc::Native { module, func },
                num_params: 0,
                num_vars: 0,
                closure: None,
            },
            container,
        )
    }

    /// Creates a native generator function defined inside `container`.
    pub fn new_native_producer(
        &mut self,
        name: &str,
        is_bound: bool,
        func: NativeProducerFn,
        container: HeapId,
    ) -> RunResult<HeapId> {
        let module = self.enclosing_module(container)?;
        self.new_func(
            Function {
                name: Rc::from(name),
                is_bound,
                pc: Pc::NativeProducer { module, func },
                num_params: 0,
                num_vars: 0,
                closure: None,
            },
            container,
        )
    }

    /// Creates a bytecode function defined inside `container`.
    pub fn new_bytecode_func(&mut self, desc: BytecodeFunc, container: HeapId) -> RunResult<HeapId> {
        let module = self.enclosing_module(container)?;
        if self.module_data(module).is_some_and(|m| m.bytecode.is_none()) {
            return Err(RunError::internal("bytecode function defined in a native module"));
        }
        self.new_func(
            Function {
                name: Rc::from(desc.name.as_str()),
                is_bound: desc.is_bound,
                pc: Pc::Bytecode {
                    module,
                    offset: desc.offset,
                },
                num_params: desc.num_params,
                num_vars: desc.num_vars,
                closure: desc.closure,
            },
            container,
        )
    }

    /// Adds a native method to `class`.
    pub fn add_method(&mut self, class: HeapId, name: &str, func: NativeFn) -> RunResult<HeapId> {
        let method = self.new_native_func(name, true, func, class)?;
        self.set_field(class, name, method)?;
        Ok(method)
    }

    /// Adds a native generator method to `class`.
    pub fn add_producer_method(&mut self, class: HeapId, name: &str, func: NativeProducerFn) -> RunResult<HeapId> {
        let method = self.new_native_producer(name, true, func, class)?;
        self.set_field(class, name, method)?;
        Ok(method)
    }

    /// Adds an unbound native function to `module` as a definition.
    pub fn add_module_func(&mut self, module: HeapId, name: &str, func: NativeFn) -> RunResult<HeapId> {
        let function = self.new_native_func(name, false, func, module)?;
        self.set_defn(module, name, function)?;
        Ok(function)
    }

    /// Follows `container` slots from `start` until a module is reached.
    fn enclosing_module(&self, start: HeapId) -> RunResult<HeapId> {
        let mut current = start;
        loop {
            if matches!(self.heap.data(current), HeapData::Module(_)) {
                return Ok(current);
            }
            match self.own_slot(current, "container") {
                Some(next) if !self.is_null(next) => current = next,
                _ => return Err(RunError::internal("function container chain does not reach a module")),
            }
        }
    }

    // =========================================================================
    // Application
    // =========================================================================

    /// Applies `callable` to `args`.
    ///
    /// Functions run their entry point; a native generator applied this way
    /// returns its first value (or `Fail`). Partial applications prepend
    /// their receiver and stored arguments. Classes are instantiated.
    pub fn apply(&mut self, callable: HeapId, args: ArgValues) -> RunResult<HeapId> {
        match self.heap.data(callable) {
            HeapData::Function(func) => match func.pc {
                Pc::Native { func, .. } => func(self, args),
                Pc::NativeProducer { func, .. } => {
                    let mut pump = Pump::new(func(self, args)?);
                    pump.next_value(self)
                }
                Pc::Bytecode { .. } => {
                    let engine = self.engine()?;
                    engine.apply(self, callable, args)
                }
            },
            HeapData::Partial(partial) => {
                let func = partial.func;
                let args = args.prepended(&partial.leading_args());
                self.apply(func, args)
            }
            HeapData::Class(_) => self.instantiate(callable, args),
            _ => Err(self.apply_error(callable)),
        }
    }

    /// Applies `callable` in a generator context, returning a pump over its series.
    ///
    /// Ordinary functions produce a one-value series holding their result.
    pub fn apply_pump(&mut self, callable: HeapId, args: ArgValues) -> RunResult<Pump> {
        let producer: Box<dyn Producer> = match self.heap.data(callable) {
            HeapData::Function(func) => match func.pc {
                Pc::Native { func, .. } => Box::new(OnceProducer(Some(func(self, args)?))),
                Pc::NativeProducer { func, .. } => func(self, args)?,
                Pc::Bytecode { .. } => {
                    let engine = self.engine()?;
                    engine.apply_pump(self, callable, args)?
                }
            },
            HeapData::Partial(partial) => {
                let func = partial.func;
                let args = args.prepended(&partial.leading_args());
                return self.apply_pump(func, args);
            }
            HeapData::Class(_) => Box::new(OnceProducer(Some(self.instantiate(callable, args)?))),
            _ => return Err(self.apply_error(callable)),
        };
        Ok(Pump::new(producer))
    }

    /// Pumps `obj.iter()`, the generic way to walk a container.
    pub fn iterate(&mut self, obj: HeapId) -> RunResult<Pump> {
        let iter = self.get_slot(obj, "iter")?;
        self.apply_pump(iter, ArgValues::new())
    }

    fn apply_error(&mut self, callable: HeapId) -> RunError {
        let class_name = self.class_name_of(callable);
        self.raise(
            ExcKind::Apply_Exception,
            format!("Do not know how to apply instance of '{class_name}'."),
        )
    }

    // =========================================================================
    // Paths
    // =========================================================================

    /// Qualified name of a class, function or module.
    ///
    /// Walks `container` slots outwards until `stop_at` or an object without
    /// a container. Segments are joined with `::` after a module and `.`
    /// after anything else.
    pub fn path(&mut self, obj: HeapId, stop_at: Option<HeapId>) -> RunResult<String> {
        if Some(obj) == stop_at {
            return Ok(String::new());
        }
        let name = match self.heap.data(obj) {
            HeapData::Class(class) => Rc::clone(&class.name),
            HeapData::Function(func) => Rc::clone(&func.name),
            HeapData::Module(module) => Rc::clone(&module.name),
            _ => return Err(self.type_error("Class, Func or Module", obj)),
        };
        let container = match self.own_slot(obj, "container") {
            Some(c) if !self.is_null(c) && Some(c) != stop_at => c,
            _ => return Ok(name.to_string()),
        };
        let sep = if matches!(self.heap.data(container), HeapData::Module(_)) {
            "::"
        } else {
            "."
        };
        let prefix = self.path(container, stop_at)?;
        Ok(format!("{prefix}{sep}{name}"))
    }
}

// =============================================================================
// Builtin methods
// =============================================================================

pub(crate) fn bootstrap(ctx: &mut Context) -> RunResult<()> {
    let func_class = ctx.builtin(BuiltinId::FUNC_CLASS)?;
    ctx.add_method(func_class, "to_str", func_to_str)?;
    ctx.add_method(func_class, "path", func_path)?;
    Ok(())
}

fn func_to_str(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (func, rest) = args.split_receiver("Func.to_str", ctx)?;
    rest.check_zero_args("Func.to_str", ctx)?;
    let path = ctx.path(func, None)?;
    ctx.new_str(&format!("<Func {path}>"))
}

fn func_path(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (func, rest) = args.split_receiver("Func.path", ctx)?;
    let stop_at = match rest.as_slice() {
        [] => None,
        _ => Some(rest.get_one_arg("Func.path", ctx)?),
    };
    let path = ctx.path(func, stop_at)?;
    ctx.new_str(&path)
}
