//! The slot protocol and generic operator dispatch.
//!
//! Attribute lookup on any boxed object goes, in order, through:
//!
//! 1. the object's own slots, located through its shape;
//! 2. the kind-specific override hook, which computes read-only attributes
//!    such as a class's `name` or a module's `src_path`;
//! 3. the field chain of the object's class.
//!
//! A bound function found this way is returned wrapped in a partial
//! application carrying the receiver.
//!
//! Operators are ordinary methods named `==`, `<`, `+` and so on. The
//! dispatch helpers here look the operator up as a slot on the left operand
//! and apply it to the right one.

use std::rc::Rc;

use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    args::ArgValues,
    builtins::BuiltinId,
    context::Context,
    exception::{ExcKind, RunResult},
    heap::{HeapData, HeapId},
    intern::StringId,
};

/// Comparison operators, named by their method names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum CompareOp {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

impl CompareOp {
    pub(crate) fn holds<T: PartialOrd + ?Sized>(self, a: &T, b: &T) -> bool {
        match self {
            Self::Eq => a == b,
            Self::Ne => a != b,
            Self::Lt => a < b,
            Self::Le => a <= b,
            Self::Gt => a > b,
            Self::Ge => a >= b,
        }
    }
}

/// Arithmetic operators, named by their method names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
}

/// A computed attribute, materialized into an object only when read.
enum Pseudo {
    Id(HeapId),
    Str(Rc<str>),
    List(Vec<HeapId>),
}

impl Context {
    // =========================================================================
    // Slots
    // =========================================================================

    /// Looks `name` up in the object's own slots only.
    #[must_use]
    pub fn own_slot(&self, obj: HeapId, name: &str) -> Option<HeapId> {
        let id = self.interns.get_id(name)?;
        self.own_slot_id(obj, id)
    }

    pub(crate) fn own_slot_id(&self, obj: HeapId, name: StringId) -> Option<HeapId> {
        let value = self.heap.get(obj);
        self.shapes.find(value.shape, name).map(|i| value.slots[i])
    }

    /// Resolves `name` without wrapping bound functions.
    pub fn find_slot_raw(&mut self, obj: HeapId, name: &str) -> RunResult<Option<HeapId>> {
        if let Some(value) = self.own_slot(obj, name) {
            return Ok(Some(value));
        }
        if let Some(value) = self.slot_override(obj, name)? {
            return Ok(Some(value));
        }
        let class = self.class_of(obj);
        Ok(self.find_field(class, name))
    }

    /// Resolves `name`, returning `None` when it is absent.
    ///
    /// A bound function is returned as a partial application of it to `obj`.
    pub fn find_slot(&mut self, obj: HeapId, name: &str) -> RunResult<Option<HeapId>> {
        match self.find_slot_raw(obj, name)? {
            Some(value) if self.is_bound_func(value) => Ok(Some(self.new_partial(obj, value, Vec::new())?)),
            other => Ok(other),
        }
    }

    /// Resolves `name`, raising `Slot_Exception` when it is absent.
    pub fn get_slot(&mut self, obj: HeapId, name: &str) -> RunResult<HeapId> {
        match self.find_slot(obj, name)? {
            Some(value) => Ok(value),
            None => {
                let class_name = self.class_name_of(obj);
                Err(self.raise(
                    ExcKind::Slot_Exception,
                    format!("No such slot '{name}' in instance of '{class_name}'."),
                ))
            }
        }
    }

    /// Whether `name` resolves on `obj`, through the same order as [`get_slot`](Self::get_slot).
    #[must_use]
    pub fn has_slot(&self, obj: HeapId, name: &str) -> bool {
        self.own_slot(obj, name).is_some()
            || self.has_override(obj, name)
            || self.find_field(self.class_of(obj), name).is_some()
    }

    /// Binds `name` to `value` in the object's own slots.
    ///
    /// An existing slot is overwritten in place; otherwise the object moves
    /// to the canonical extension of its shape and the value is appended.
    pub fn set_slot(&mut self, obj: HeapId, name: &str, value: HeapId) {
        let id = self.interns.intern(name);
        let shape = self.heap.get(obj).shape;
        if let Some(i) = self.shapes.find(shape, id) {
            self.heap.get_mut(obj).slots[i] = value;
            return;
        }
        let before = self.shapes.node_count();
        let extended = self.shapes.extend(shape, id);
        if self.shapes.node_count() != before {
            self.tracer_mut().on_shape_created(shape, extended, name);
        }
        let entry = self.heap.get_mut(obj);
        entry.shape = extended;
        entry.slots.push(value);
        debug_assert_eq!(entry.slots.len(), self.shapes.len(extended));
    }

    /// Names of the object's own slots, in the order they were first set.
    #[must_use]
    pub fn slot_names(&self, obj: HeapId) -> Vec<String> {
        self.shapes
            .names(self.heap.get(obj).shape)
            .iter()
            .map(|&id| self.interns.get_str(id).to_owned())
            .collect()
    }

    fn has_override(&self, obj: HeapId, name: &str) -> bool {
        if name == "instance_of" {
            return true;
        }
        match self.heap.data(obj) {
            HeapData::Class(_) => matches!(name, "name" | "supers"),
            HeapData::Module(_) => matches!(name, "name" | "src_path" | "mod_id"),
            HeapData::Function(_) => matches!(name, "name" | "is_bound"),
            _ => false,
        }
    }

    /// Kind-specific computed attributes.
    fn slot_override(&mut self, obj: HeapId, name: &str) -> RunResult<Option<HeapId>> {
        let pseudo = match (self.heap.data(obj), name) {
            (_, "instance_of") => Pseudo::Id(self.class_of(obj)),
            (HeapData::Class(class), "name") => Pseudo::Str(Rc::clone(&class.name)),
            (HeapData::Class(class), "supers") => Pseudo::List(class.supers.clone()),
            (HeapData::Module(module), "name") => Pseudo::Str(Rc::clone(&module.name)),
            (HeapData::Module(module), "src_path") => Pseudo::Str(Rc::clone(&module.src_path)),
            (HeapData::Module(module), "mod_id") => Pseudo::Str(Rc::clone(&module.id)),
            (HeapData::Function(func), "name") => Pseudo::Str(Rc::clone(&func.name)),
            (HeapData::Function(func), "is_bound") => Pseudo::Id(self.sentinel(func.is_bound)),
            _ => return Ok(None),
        };
        let value = match pseudo {
            Pseudo::Id(id) => id,
            Pseudo::Str(s) => self.new_str(&s)?,
            Pseudo::List(items) => self.new_list(items)?,
        };
        Ok(Some(value))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Looks up method `name` on `obj` and applies it.
    pub fn call_method(&mut self, obj: HeapId, name: &str, args: ArgValues) -> RunResult<HeapId> {
        let method = self.get_slot(obj, name)?;
        self.apply(method, args)
    }

    /// Applies `obj.to_str()`, requiring a String result.
    pub fn to_str(&mut self, obj: HeapId) -> RunResult<Rc<str>> {
        let s = self.call_method(obj, "to_str", ArgValues::new())?;
        self.expect_str(s)
    }

    /// Evaluates `a op b`, mapping `Fail` to false and anything else to true.
    pub fn compare(&mut self, op: CompareOp, a: HeapId, b: HeapId) -> RunResult<bool> {
        if let Some(result) = self.compare_primitive(op, a, b)? {
            return Ok(result);
        }
        let result = self.call_method(a, op.into(), ArgValues::from([b]))?;
        Ok(!self.is_fail(result))
    }

    /// `a == b` through the `==` method.
    pub fn equals(&mut self, a: HeapId, b: HeapId) -> RunResult<bool> {
        self.compare(CompareOp::Eq, a, b)
    }

    /// Evaluates `a op b` by applying the operator method of `a`.
    pub fn binary_op(&mut self, op: BinaryOp, a: HeapId, b: HeapId) -> RunResult<HeapId> {
        self.call_method(a, op.into(), ArgValues::from([b]))
    }

    /// Compares two plain Ints or two plain Strings without a method call.
    ///
    /// Only exact instances of the builtin classes qualify, so a subclass
    /// overriding an operator is always dispatched to.
    fn compare_primitive(&self, op: CompareOp, a: HeapId, b: HeapId) -> RunResult<Option<bool>> {
        let (class_a, class_b) = (self.class_of(a), self.class_of(b));
        if class_a != class_b {
            return Ok(None);
        }
        let result = match (self.heap.data(a), self.heap.data(b)) {
            (HeapData::Int(x), HeapData::Int(y)) if class_a == self.builtin(BuiltinId::INT_CLASS)? => {
                Some(op.holds(x, y))
            }
            (HeapData::Str(x), HeapData::Str(y)) if class_a == self.builtin(BuiltinId::STRING_CLASS)? => {
                Some(op.holds(&**x, &**y))
            }
            _ => None,
        };
        Ok(result)
    }
}
