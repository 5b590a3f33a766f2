//! Builtin classes.
//!
//! Each module holds the payload type of one object kind (where it has one),
//! the `Context` operations on it, and the `bootstrap` function that installs
//! the class's constructor and methods.

pub mod class;
pub mod dict;
pub mod exception;
pub mod function;
mod index;
pub mod int;
pub mod list;
pub mod module;
pub mod object;
pub mod partial;
pub mod set;
pub mod str;

pub use class::Class;
pub use dict::DictKey;
pub use function::{BytecodeFunc, Function, NativeFn, NativeProducerFn, Pc};
pub use module::{CompiledModule, Module};
pub use partial::Partial;

pub(crate) use index::{translate_index, translate_slice};
