//! Modules: fixed top-level namespaces with lazy initialization.
//!
//! A module's top-level names are resolved to closure indices once, when the
//! module is built; the closure array never grows. Reading a definition
//! distinguishes a name the module does not declare (`Mod_Defn_Exception`)
//! from one it declares but has not assigned yet (`Unassigned_Var_Exception`).
//!
//! The first [`import`](Context::import) runs the module's initializer with the
//! module as its argument; later imports do nothing.

use std::rc::Rc;

use ahash::AHashMap;

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::{ExcKind, RunError, RunResult, SrcLocation},
    heap::{HeapData, HeapId},
    intern::StringId,
    pump::{Producer, VecProducer},
    types::function::{BytecodeFunc, NativeFn},
};

/// Payload of a module object.
#[derive(Debug)]
pub struct Module {
    pub(crate) name: Rc<str>,
    pub(crate) id: Rc<str>,
    pub(crate) src_path: Rc<str>,
    /// Present only for modules loaded from bytecode.
    pub(crate) bytecode: Option<Rc<[u8]>>,
    pub(crate) imports: Vec<Rc<str>>,
    /// Name to closure index; fixed at construction.
    pub(crate) tlvars: AHashMap<StringId, usize>,
    pub(crate) defn_names: Vec<StringId>,
    pub(crate) closure: Vec<Option<HeapId>>,
    pub(crate) consts: Vec<Option<HeapId>>,
    pub(crate) init_func: Option<HeapId>,
    pub(crate) initialized: bool,
}

impl Module {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn src_path(&self) -> &str {
        &self.src_path
    }

    #[must_use]
    pub fn bytecode(&self) -> Option<&[u8]> {
        self.bytecode.as_deref()
    }

    #[must_use]
    pub fn imports(&self) -> &[Rc<str>] {
        &self.imports
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// A module as delivered by the bytecode loader.
#[derive(Debug, Clone, Default)]
pub struct CompiledModule {
    pub bytecode: Vec<u8>,
    pub name: String,
    pub id: String,
    pub src_path: String,
    /// Ids of the modules this one imports.
    pub imports: Vec<String>,
    /// Top-level names, in closure order.
    pub defn_names: Vec<String>,
    pub num_consts: usize,
    /// Bytecode offset of the module's initializer, if it has one.
    pub init_offset: Option<usize>,
}

impl Context {
    #[must_use]
    pub fn module_data(&self, id: HeapId) -> Option<&Module> {
        match self.heap.data(id) {
            HeapData::Module(module) => Some(module),
            _ => None,
        }
    }

    pub(crate) fn module_mut(&mut self, id: HeapId) -> RunResult<&mut Module> {
        if self.module_data(id).is_none() {
            return Err(self.type_error("Module", id));
        }
        match self.heap.data_mut(id) {
            HeapData::Module(module) => Ok(module),
            _ => Err(RunError::internal("module payload changed kind")),
        }
    }

    /// Allocates and registers a module, raising `Import_Exception` if its id is taken.
    fn alloc_module(&mut self, module: Module) -> RunResult<HeapId> {
        if self.find_module(&module.id).is_some() {
            return Err(self.raise(
                ExcKind::Import_Exception,
                format!("Module '{}' is already registered.", module.id),
            ));
        }
        let class = self.builtin(BuiltinId::MODULE_CLASS)?;
        let id = Rc::clone(&module.id);
        let module = self.allocate(class, HeapData::Module(module))?;
        self.register_module(id, module);
        Ok(module)
    }

    fn tlvars(&mut self, names: &[&str]) -> (AHashMap<StringId, usize>, Vec<StringId>) {
        let mut tlvars = AHashMap::with_capacity(names.len());
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let id = self.interns.intern(name);
            let next = ids.len();
            tlvars.entry(id).or_insert_with(|| {
                ids.push(id);
                next
            });
        }
        (tlvars, ids)
    }

    /// Creates a module implemented in Rust and registers it under `id`.
    ///
    /// # Arguments
    /// * `name` - Module name, used in paths and messages
    /// * `id` - Registry key used by [`import_module`](Context::import_module)
    /// * `src_path` - Source path reported through the `src_path` slot
    /// * `defn_names` - Every top-level name the module will define
    /// * `init` - Initializer run by the first import, receiving the module
    pub fn new_native_module(
        &mut self,
        name: &str,
        id: &str,
        src_path: &str,
        defn_names: &[&str],
        init: Option<NativeFn>,
    ) -> RunResult<HeapId> {
        let (tlvars, defn_names) = self.tlvars(defn_names);
        let num_defns = defn_names.len();
        let module = self.alloc_module(Module {
            name: Rc::from(name),
            id: Rc::from(id),
            src_path: Rc::from(src_path),
            bytecode: None,
            imports: Vec::new(),
            tlvars,
            defn_names,
            closure: vec![None; num_defns],
            consts: Vec::new(),
            init_func: None,
            initialized: init.is_none(),
        })?;
        if let Some(init) = init {
            let init_func = self.new_native_func("init", false, init, module)?;
            self.module_mut(module)?.init_func = Some(init_func);
        }
        Ok(module)
    }

    /// Creates a module from loader output and registers it under its id.
    pub fn new_bc_module(&mut self, compiled: CompiledModule) -> RunResult<HeapId> {
        let names: Vec<&str> = compiled.defn_names.iter().map(String::as_str).collect();
        let (tlvars, defn_names) = self.tlvars(&names);
        let num_defns = defn_names.len();
        let module = self.alloc_module(Module {
            name: Rc::from(compiled.name.as_str()),
            id: Rc::from(compiled.id.as_str()),
            src_path: Rc::from(compiled.src_path.as_str()),
            bytecode: Some(Rc::from(compiled.bytecode)),
            imports: compiled.imports.iter().map(|s| Rc::from(s.as_str())).collect(),
            tlvars,
            defn_names,
            closure: vec![None; num_defns],
            consts: vec![None; compiled.num_consts],
            init_func: None,
            initialized: compiled.init_offset.is_none(),
        })?;
        if let Some(offset) = compiled.init_offset {
            let init_func = self.new_bytecode_func(
                BytecodeFunc {
                    name: String::from("$$init$$"),
                    is_bound: false,
                    offset,
                    num_params: 1,
                    num_vars: 0,
                    closure: None,
                },
                module,
            )?;
            self.module_mut(module)?.init_func = Some(init_func);
        }
        Ok(module)
    }

    /// Initializes `module` if it has not been initialized yet.
    ///
    /// The module is marked initialized before its initializer runs, so an
    /// import cycle reaching it again sees it as done. If the initializer
    /// fails the mark is cleared and a later import retries.
    pub fn import(&mut self, module: HeapId) -> RunResult<()> {
        let entry = self.module_mut(module)?;
        if entry.initialized {
            return Ok(());
        }
        entry.initialized = true;
        let init_func = entry.init_func;
        let name = Rc::clone(&entry.name);
        if let Some(init_func) = init_func
            && let Err(err) = self.apply(init_func, ArgValues::from([module]))
        {
            self.module_mut(module)?.initialized = false;
            return Err(err);
        }
        self.tracer_mut().on_module_imported(&name);
        Ok(())
    }

    /// Closure index of `name`, raising `Mod_Defn_Exception` if the module does not declare it.
    fn defn_index(&mut self, module: HeapId, name: &str) -> RunResult<usize> {
        let module_name = Rc::clone(&self.module_mut(module)?.name);
        let index = self
            .interns
            .get_id(name)
            .and_then(|id| self.module_data(module).and_then(|m| m.tlvars.get(&id).copied()));
        match index {
            Some(i) => Ok(i),
            None => Err(self.raise(
                ExcKind::Mod_Defn_Exception,
                format!("Definition '{name}' not found in '{module_name}'."),
            )),
        }
    }

    /// Reads a top-level definition.
    pub fn get_defn(&mut self, module: HeapId, name: &str) -> RunResult<HeapId> {
        let index = self.defn_index(module, name)?;
        let entry = self.module_mut(module)?;
        match entry.closure[index] {
            Some(value) => Ok(value),
            None => {
                let module_name = Rc::clone(&entry.name);
                Err(self.raise(
                    ExcKind::Unassigned_Var_Exception,
                    format!("Definition '{name}' unassigned in '{module_name}'."),
                ))
            }
        }
    }

    /// Assigns a top-level definition. The name must be declared by the module.
    pub fn set_defn(&mut self, module: HeapId, name: &str, value: HeapId) -> RunResult<()> {
        let index = self.defn_index(module, name)?;
        self.module_mut(module)?.closure[index] = Some(value);
        Ok(())
    }

    /// Whether the module declares `name`, assigned or not.
    #[must_use]
    pub fn has_defn(&self, module: HeapId, name: &str) -> bool {
        let Some(id) = self.interns.get_id(name) else {
            return false;
        };
        self.module_data(module).is_some_and(|m| m.tlvars.contains_key(&id))
    }

    /// Declared top-level names in closure order.
    #[must_use]
    pub fn defn_names(&self, module: HeapId) -> Vec<String> {
        self.module_data(module).map_or_else(Vec::new, |m| {
            m.defn_names
                .iter()
                .map(|&id| self.interns.get_str(id).to_owned())
                .collect()
        })
    }

    /// Reads the constant cached at `index`, if it has been built.
    pub fn get_const(&mut self, module: HeapId, index: usize) -> RunResult<Option<HeapId>> {
        let entry = self.module_mut(module)?;
        match entry.consts.get(index) {
            Some(value) => Ok(*value),
            None => Err(RunError::internal(format!("constant {index} out of range"))),
        }
    }

    /// Caches a built constant at `index`.
    pub fn set_const(&mut self, module: HeapId, index: usize, value: HeapId) -> RunResult<()> {
        let entry = self.module_mut(module)?;
        match entry.consts.get_mut(index) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(RunError::internal(format!("constant {index} out of range"))),
        }
    }

    /// Source locations for bytecode offset `pc` in `module`.
    ///
    /// Empty for native modules and when no source map is attached.
    pub fn pc_to_src_locations(&mut self, module: HeapId, pc: usize) -> RunResult<Vec<SrcLocation>> {
        let entry = self.module_mut(module)?;
        let (Some(bytecode), id) = (entry.bytecode.clone(), Rc::clone(&entry.id)) else {
            return Ok(Vec::new());
        };
        Ok(self
            .source_map()
            .map(|map| map.src_locations(&id, &bytecode, pc))
            .unwrap_or_default())
    }
}

// =============================================================================
// Builtin methods
// =============================================================================

pub(crate) fn bootstrap(ctx: &mut Context) -> RunResult<()> {
    let class = ctx.builtin(BuiltinId::MODULE_CLASS)?;
    ctx.add_method(class, "get_defn", module_get_defn)?;
    ctx.add_method(class, "set_defn", module_set_defn)?;
    ctx.add_method(class, "path", module_path)?;
    ctx.add_method(class, "to_str", module_to_str)?;
    ctx.add_producer_method(class, "iter_defns", module_iter_defns)?;
    Ok(())
}

fn module_get_defn(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (module, rest) = args.split_receiver("Module.get_defn", ctx)?;
    let name = rest.get_one_arg("Module.get_defn", ctx)?;
    let name = ctx.expect_str(name)?;
    ctx.get_defn(module, &name)
}

fn module_set_defn(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (module, rest) = args.split_receiver("Module.set_defn", ctx)?;
    let (name, value) = rest.get_two_args("Module.set_defn", ctx)?;
    let name = ctx.expect_str(name)?;
    ctx.set_defn(module, &name, value)?;
    Ok(ctx.null())
}

fn module_path(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (module, rest) = args.split_receiver("Module.path", ctx)?;
    rest.check_zero_args("Module.path", ctx)?;
    let path = ctx.path(module, None)?;
    ctx.new_str(&path)
}

fn module_to_str(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (module, rest) = args.split_receiver("Module.to_str", ctx)?;
    rest.check_zero_args("Module.to_str", ctx)?;
    let name = ctx.module_mut(module)?.name.clone();
    ctx.new_str(&format!("<Module {name}>"))
}

/// Yields `[name, value]` for every assigned definition, in closure order.
fn module_iter_defns(ctx: &mut Context, args: ArgValues) -> RunResult<Box<dyn Producer>> {
    let (module, rest) = args.split_receiver("Module.iter_defns", ctx)?;
    rest.check_zero_args("Module.iter_defns", ctx)?;
    let entry = ctx.module_mut(module)?;
    let assigned: Vec<(StringId, HeapId)> = entry
        .defn_names
        .iter()
        .zip(&entry.closure)
        .filter_map(|(&name, value)| value.map(|v| (name, v)))
        .collect();
    let mut pairs = Vec::with_capacity(assigned.len());
    for (name, value) in assigned {
        let name = ctx.interns.get_str(name).to_owned();
        let name = ctx.new_str(&name)?;
        pairs.push(ctx.new_list(vec![name, value])?);
    }
    Ok(Box::new(VecProducer::new(pairs)))
}
