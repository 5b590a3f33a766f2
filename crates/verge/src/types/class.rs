//! Classes: fields, multiple inheritance and constructor resolution.
//!
//! A class keeps its own fields in a shape-indexed array, exactly like an
//! object's slots. Looking a field up searches the class itself, then each
//! superclass in declaration order, depth-first, and the first hit wins. A
//! class reachable along several paths is expanded only the first time it is
//! reached, which cannot change the first hit.
//!
//! Each class resolves its constructor once, at creation. The constructor is
//! the function that `new` dispatches to with the class as first argument.

use std::rc::Rc;

use ahash::AHashSet;

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::{ExcKind, RunError, RunResult},
    heap::{HeapData, HeapId},
    intern::StringId,
    shape::ShapeId,
};

/// Payload of a class object.
#[derive(Debug)]
pub struct Class {
    pub(crate) name: Rc<str>,
    /// Fixed at creation.
    pub(crate) supers: Vec<HeapId>,
    pub(crate) fields_shape: ShapeId,
    pub(crate) fields: Vec<HeapId>,
    /// Resolved constructor, `None` until bootstrap gives Object one.
    pub(crate) new_func: Option<HeapId>,
    /// Length of the longest superclass chain including this class.
    pub(crate) depth: usize,
}

impl Class {
    pub(crate) fn new(name: Rc<str>, supers: Vec<HeapId>, new_func: Option<HeapId>, depth: usize) -> Self {
        Self {
            name,
            supers,
            fields_shape: ShapeId::EMPTY,
            fields: Vec::new(),
            new_func,
            depth,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn supers(&self) -> &[HeapId] {
        &self.supers
    }

    #[must_use]
    pub fn new_func(&self) -> Option<HeapId> {
        self.new_func
    }
}

impl Context {
    /// Returns the class payload of `id`, if it is a class.
    #[must_use]
    pub fn class_data(&self, id: HeapId) -> Option<&Class> {
        match self.heap.data(id) {
            HeapData::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Creates a class whose metaclass is the builtin `Class`.
    ///
    /// # Arguments
    /// * `name` - Class name
    /// * `supers` - Superclasses, searched left to right
    /// * `new_func` - Explicit constructor; when `None` it is resolved from `supers`
    /// * `container` - Module or class the new class is defined in
    pub fn new_class(
        &mut self,
        name: &str,
        supers: Vec<HeapId>,
        new_func: Option<HeapId>,
        container: Option<HeapId>,
    ) -> RunResult<HeapId> {
        let metaclass = self.builtin(BuiltinId::CLASS_CLASS)?;
        self.new_class_of(metaclass, name, supers, new_func, container)
    }

    /// Creates a class that is an instance of `metaclass`.
    pub fn new_class_of(
        &mut self,
        metaclass: HeapId,
        name: &str,
        supers: Vec<HeapId>,
        new_func: Option<HeapId>,
        container: Option<HeapId>,
    ) -> RunResult<HeapId> {
        let mut depth = 0;
        for &sup in &supers {
            match self.class_data(sup) {
                Some(class) => depth = depth.max(class.depth),
                None => return Err(self.type_error("Class", sup)),
            }
        }
        depth += 1;
        self.limits().check_inheritance_depth(depth)?;

        let new_func = match new_func {
            Some(func) => Some(func),
            None => self.resolve_constructor(name, &supers)?.or_else(|| self.generic_constructor()),
        };
        let num_supers = supers.len();
        let class = self.allocate(
            metaclass,
            HeapData::Class(Class::new(Rc::from(name), supers, new_func, depth)),
        )?;
        if let Some(container) = container {
            self.set_slot(class, "container", container);
        }
        self.tracer_mut().on_class_created(name, num_supers);
        Ok(class)
    }

    /// Installs `func` as the constructor of a builtin class.
    pub(crate) fn set_constructor(&mut self, class: HeapId, func: HeapId) -> RunResult<()> {
        match self.heap.data_mut(class) {
            HeapData::Class(class) => {
                class.new_func = Some(func);
                Ok(())
            }
            _ => Err(RunError::internal("constructor installed on a non-class")),
        }
    }

    /// Object's constructor, once bootstrap has installed it.
    fn generic_constructor(&self) -> Option<HeapId> {
        let object_class = self.builtin(BuiltinId::OBJECT_CLASS).ok()?;
        self.class_data(object_class)?.new_func
    }

    /// Picks the constructor a class with `supers` inherits.
    ///
    /// Superclasses are visited in order. The first constructor seen is the
    /// candidate; a different one replaces it if the candidate is Object's
    /// generic constructor, is ignored if it is the generic one itself, and is
    /// a conflict otherwise. Superclasses without a constructor are skipped.
    pub(crate) fn resolve_constructor(&mut self, name: &str, supers: &[HeapId]) -> RunResult<Option<HeapId>> {
        let generic = self.generic_constructor();
        let mut candidate: Option<HeapId> = None;
        for &sup in supers {
            let Some(func) = self.class_data(sup).and_then(|class| class.new_func) else {
                continue;
            };
            match candidate {
                None => candidate = Some(func),
                Some(current) if current == func => {}
                Some(current) if Some(current) == generic => candidate = Some(func),
                Some(_) if Some(func) == generic => {}
                Some(_) => {
                    return Err(self.raise(
                        ExcKind::Metaclass_Exception,
                        format!("Can't resolve the constructor of class '{name}': its superclasses have conflicting constructors."),
                    ));
                }
            }
        }
        Ok(candidate)
    }

    // =========================================================================
    // Fields
    // =========================================================================

    /// Looks `name` up in `class` and then its superclasses, depth-first.
    #[must_use]
    pub fn find_field(&self, class: HeapId, name: &str) -> Option<HeapId> {
        let id = self.interns.get_id(name)?;
        self.find_field_id(class, id)
    }

    fn find_field_id(&self, class: HeapId, name: StringId) -> Option<HeapId> {
        self.find_field_in(class, name, &mut AHashSet::new())
    }

    fn find_field_in(&self, class: HeapId, name: StringId, seen: &mut AHashSet<HeapId>) -> Option<HeapId> {
        if !seen.insert(class) {
            return None;
        }
        let data = self.class_data(class)?;
        if let Some(i) = self.shapes.find(data.fields_shape, name) {
            return Some(data.fields[i]);
        }
        data.supers.iter().find_map(|&sup| self.find_field_in(sup, name, seen))
    }

    /// Whether `class` or any superclass defines `name`.
    #[must_use]
    pub fn has_field(&self, class: HeapId, name: &str) -> bool {
        self.find_field(class, name).is_some()
    }

    /// Like [`find_field`](Self::find_field), raising `Field_Exception` when absent.
    pub fn get_field(&mut self, class: HeapId, name: &str) -> RunResult<HeapId> {
        if self.class_data(class).is_none() {
            return Err(self.type_error("Class", class));
        }
        match self.find_field(class, name) {
            Some(value) => Ok(value),
            None => {
                let class_name = self.class_data(class).map_or_else(|| Rc::from("?"), |c| Rc::clone(&c.name));
                Err(self.raise(
                    ExcKind::Field_Exception,
                    format!("No such field '{name}' in class '{class_name}'."),
                ))
            }
        }
    }

    /// Binds `name` in the class's own field table.
    pub fn set_field(&mut self, class: HeapId, name: &str, value: HeapId) -> RunResult<()> {
        let Some(shape) = self.class_data(class).map(|c| c.fields_shape) else {
            return Err(self.type_error("Class", class));
        };
        let id = self.interns.intern(name);
        let index = self.shapes.find(shape, id);
        let extended = match index {
            Some(_) => shape,
            None => {
                let before = self.shapes.node_count();
                let extended = self.shapes.extend(shape, id);
                if self.shapes.node_count() != before {
                    self.tracer_mut().on_shape_created(shape, extended, name);
                }
                extended
            }
        };
        let HeapData::Class(class) = self.heap.data_mut(class) else {
            return Err(RunError::internal("class payload changed kind"));
        };
        match index {
            Some(i) => class.fields[i] = value,
            None => {
                class.fields_shape = extended;
                class.fields.push(value);
            }
        }
        Ok(())
    }

    /// Names of the class's own fields in definition order.
    #[must_use]
    pub fn field_names(&self, class: HeapId) -> Vec<String> {
        self.class_data(class).map_or_else(Vec::new, |class| {
            self.shapes
                .names(class.fields_shape)
                .iter()
                .map(|&id| self.interns.get_str(id).to_owned())
                .collect()
        })
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Whether `obj` is an instance of `class` or of one of its subclasses.
    #[must_use]
    pub fn is_instance(&self, class: HeapId, obj: HeapId) -> bool {
        let mut stack = vec![self.class_of(obj)];
        let mut seen = AHashSet::new();
        while let Some(current) = stack.pop() {
            if current == class {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(data) = self.class_data(current) {
                stack.extend(data.supers.iter().rev());
            }
        }
        false
    }

    /// Whether `obj` structurally satisfies `class`.
    ///
    /// Every field name declared by `class` or any superclass must resolve as
    /// a slot on `obj`. Instances of `class` itself conform trivially.
    #[must_use]
    pub fn conformed_by(&self, class: HeapId, obj: HeapId) -> bool {
        if self.class_of(obj) == class {
            return true;
        }
        let mut stack = vec![class];
        let mut seen = AHashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(data) = self.class_data(current) else {
                continue;
            };
            for &name in self.shapes.names(data.fields_shape) {
                if !self.has_slot(obj, self.interns.get_str(name)) {
                    return false;
                }
            }
            stack.extend(data.supers.iter().rev());
        }
        true
    }

    /// Creates an instance of `class` through its resolved constructor.
    pub fn instantiate(&mut self, class: HeapId, args: ArgValues) -> RunResult<HeapId> {
        let Some(data) = self.class_data(class) else {
            return Err(self.type_error("Class", class));
        };
        let (new_func, name) = (data.new_func, Rc::clone(&data.name));
        match new_func {
            Some(new_func) => self.apply(new_func, args.prepended(&[class])),
            None => {
                Err(self.raise(
                    ExcKind::Apply_Exception,
                    format!("Class '{name}' has no constructor."),
                ))
            }
        }
    }
}

// =============================================================================
// Builtin methods
// =============================================================================

pub(crate) fn bootstrap(ctx: &mut Context) -> RunResult<()> {
    let class_class = ctx.builtin(BuiltinId::CLASS_CLASS)?;
    let builtins_mod = ctx.builtin(BuiltinId::BUILTINS_MODULE)?;
    let new_func = ctx.new_native_func("new_Class", false, new_class, builtins_mod)?;
    ctx.set_constructor(class_class, new_func)?;

    ctx.add_method(class_class, "new", class_new)?;
    ctx.add_method(class_class, "to_str", class_to_str)?;
    ctx.add_method(class_class, "instantiated", class_instantiated)?;
    ctx.add_method(class_class, "conformed_by", class_conformed_by)?;
    ctx.add_method(class_class, "get_field", class_get_field)?;
    ctx.add_method(class_class, "find_field", class_find_field)?;
    ctx.add_method(class_class, "set_field", class_set_field)?;
    ctx.add_method(class_class, "path", class_path)?;
    Ok(())
}

/// `Class.new(name, supers := [Object], container := null, ...)`, with the
/// metaclass as receiver. Arguments after the container go to `init`.
fn new_class(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (metaclass, rest) = args.split_receiver("Class.new", ctx)?;
    let (defn_args, init_args) = rest.as_slice().split_at(rest.len().min(3));
    let (name, supers, container) = ArgValues::from(defn_args).get_one_to_three_args("Class.new", ctx)?;
    let name = ctx.expect_str(name)?;
    let supers = match supers {
        Some(list) => ctx.expect_list(list)?,
        None => vec![ctx.builtin(BuiltinId::OBJECT_CLASS)?],
    };
    let container = container.filter(|&c| !ctx.is_null(c));
    let class = ctx.new_class_of(metaclass, &name, supers, None, container)?;
    ctx.call_method(class, "init", ArgValues::from(init_args))?;
    Ok(class)
}

fn class_new(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Class.new", ctx)?;
    ctx.instantiate(class, rest)
}

fn class_to_str(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Class.to_str", ctx)?;
    rest.check_zero_args("Class.to_str", ctx)?;
    let name = ctx.class_data(class).map_or_else(|| Rc::from("?"), |c| Rc::clone(&c.name));
    ctx.new_str(&format!("<Class {name}>"))
}

fn class_instantiated(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Class.instantiated", ctx)?;
    let obj = rest.get_one_arg("Class.instantiated", ctx)?;
    Ok(ctx.sentinel(ctx.is_instance(class, obj)))
}

fn class_conformed_by(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Class.conformed_by", ctx)?;
    let obj = rest.get_one_arg("Class.conformed_by", ctx)?;
    Ok(ctx.sentinel(ctx.conformed_by(class, obj)))
}

fn class_get_field(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Class.get_field", ctx)?;
    let name = rest.get_one_arg("Class.get_field", ctx)?;
    let name = ctx.expect_str(name)?;
    ctx.get_field(class, &name)
}

fn class_find_field(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Class.find_field", ctx)?;
    let name = rest.get_one_arg("Class.find_field", ctx)?;
    let name = ctx.expect_str(name)?;
    Ok(ctx.find_field(class, &name).unwrap_or_else(|| ctx.fail()))
}

fn class_set_field(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Class.set_field", ctx)?;
    let (name, value) = rest.get_two_args("Class.set_field", ctx)?;
    let name = ctx.expect_str(name)?;
    ctx.set_field(class, &name, value)?;
    Ok(ctx.null())
}

fn class_path(ctx: &mut Context, args: ArgValues) -> RunResult<HeapId> {
    let (class, rest) = args.split_receiver("Class.path", ctx)?;
    let stop_at = match rest.as_slice() {
        [] => None,
        _ => Some(rest.get_one_arg("Class.path", ctx)?),
    };
    let path = ctx.path(class, stop_at)?;
    ctx.new_str(&path)
}
