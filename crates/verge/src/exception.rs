//! Runtime errors.
//!
//! Failures in the object model fall into three groups:
//!
//! * raised exceptions: an Exception instance on the heap, visible to and
//!   catchable by the running program ([`RunError::Raised`]);
//! * internal errors: interpreter bugs or a missing collaborator
//!   ([`RunError::Internal`]);
//! * resource errors: a configured limit was hit ([`RunError::Resource`]).
//!
//! Absence, no-match and end-of-sequence are not errors at all; they are
//! reported with the `Fail` sentinel.

use std::{borrow::Cow, fmt};

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{heap::HeapId, resource::ResourceError};

pub type RunResult<T> = Result<T, RunError>;

/// Error produced by an object-model operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// An exception object was raised.
    Raised(HeapId),
    /// The interpreter itself is in an inconsistent state.
    Internal(Cow<'static, str>),
    /// A resource limit was exceeded.
    Resource(ResourceError),
}

impl From<ResourceError> for RunError {
    fn from(err: ResourceError) -> Self {
        Self::Resource(err)
    }
}

impl RunError {
    pub(crate) fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raised(exc) => write!(f, "exception object {exc}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::Resource(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RunError {}

/// Exception classes the runtime raises itself.
///
/// The string form of each variant is the class name in the `Exceptions`
/// module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[expect(non_camel_case_types, reason = "names are the exception class names")]
pub enum ExcKind {
    Exception,
    Internal_Exception,
    User_Exception,
    Apply_Exception,
    Bounds_Exception,
    Field_Exception,
    Import_Exception,
    Key_Exception,
    Metaclass_Exception,
    Mod_Defn_Exception,
    Number_Exception,
    Parameters_Exception,
    Slot_Exception,
    Type_Exception,
    Unassigned_Var_Exception,
}

impl ExcKind {
    /// The kind this kind's class directly inherits from, `None` for the root.
    #[must_use]
    pub fn parent(self) -> Option<Self> {
        match self {
            Self::Exception => None,
            Self::Internal_Exception | Self::User_Exception => Some(Self::Exception),
            _ => Some(Self::Internal_Exception),
        }
    }

    /// Whether `self` is `other` or one of its descendants.
    #[must_use]
    pub fn is_subclass_of(self, other: Self) -> bool {
        let mut kind = Some(self);
        while let Some(k) = kind {
            if k == other {
                return true;
            }
            kind = k.parent();
        }
        false
    }
}

/// Source position resolved from a bytecode offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcLocation {
    /// Id of the module the source text belongs to.
    pub mod_id: String,
    pub src_offset: usize,
    pub len: usize,
}

/// One frame of an exception's call chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// The function executing in this frame.
    pub func: HeapId,
    /// Bytecode offset within the function's module.
    pub pc: usize,
    /// Source offset of the instruction, used when no source map is attached.
    pub src_offset: usize,
}

/// Payload of an Exception instance.
///
/// The call chain is absent until the execution engine attaches one when the
/// exception propagates; innermost frame first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionData {
    pub(crate) call_chain: Option<Vec<CallSite>>,
}

impl ExceptionData {
    #[must_use]
    pub fn call_chain(&self) -> Option<&[CallSite]> {
        self.call_chain.as_deref()
    }
}
