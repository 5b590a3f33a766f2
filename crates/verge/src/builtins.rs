//! Builtin registry identifiers.
//!
//! The numbering is shared with compiled bytecode and native code, which
//! refer to builtins by index, so it must not change. Entries that have no
//! counterpart in this runtime (VM atom definitions, threads, floats, ...)
//! keep their numbers and are simply never populated.

use strum::{EnumCount, IntoStaticStr};

/// Number of builtin registry entries.
pub const NUM_BUILTINS: usize = 41;

/// Index into the context's builtin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, IntoStaticStr)]
#[repr(u8)]
#[expect(non_camel_case_types, reason = "names mirror the registry constants used by compiled code")]
pub enum BuiltinId {
    NULL_OBJ = 0,
    FAIL_OBJ = 1,

    ATOM_DEF_OBJECT = 2,
    SLOTS_ATOM_DEF = 3,
    CLASS_ATOM_DEF = 4,
    VM_ATOM_DEF = 5,
    THREAD_ATOM_DEF = 6,
    FUNC_ATOM_DEF = 7,
    STRING_ATOM_DEF = 8,
    CON_STACK_ATOM_DEF = 9,
    LIST_ATOM_DEF = 10,
    DICT_ATOM_DEF = 11,
    MODULE_ATOM_DEF = 12,
    INT_ATOM_DEF = 13,
    UNIQUE_ATOM_DEF = 14,
    CLOSURE_ATOM_DEF = 15,
    PARTIAL_APPLICATION_ATOM_DEF = 16,
    EXCEPTION_ATOM_DEF = 17,
    SET_ATOM_DEF = 18,

    OBJECT_CLASS = 19,
    CLASS_CLASS = 20,
    VM_CLASS = 21,
    THREAD_CLASS = 22,
    FUNC_CLASS = 23,
    STRING_CLASS = 24,
    CON_STACK_CLASS = 25,
    LIST_CLASS = 26,
    DICT_CLASS = 27,
    MODULE_CLASS = 28,
    INT_CLASS = 29,
    CLOSURE_CLASS = 30,
    PARTIAL_APPLICATION_CLASS = 31,
    EXCEPTION_CLASS = 32,
    SET_CLASS = 33,
    NUMBER_CLASS = 34,

    BUILTINS_MODULE = 35,
    C_FILE_MODULE = 36,
    EXCEPTIONS_MODULE = 37,
    SYS_MODULE = 38,

    FLOAT_ATOM_DEF = 39,
    FLOAT_CLASS = 40,
}

impl BuiltinId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

const _: () = assert!(BuiltinId::COUNT == NUM_BUILTINS);
