//! Resource limits for a context.
//!
//! The object model has no garbage collector, so a host embedding untrusted
//! programs bounds the arena size instead. Limits are checked at allocation
//! and at class creation; exceeding one yields [`ResourceError`] rather than
//! an exception object, because allocating the exception may be the very thing
//! that failed.

use std::fmt;

/// Default bound on the length of a superclass chain.
pub const MAX_INHERITANCE_DEPTH: usize = 256;

/// Default bound, in bytes, on a single value built by repetition.
pub const MAX_RESULT_BYTES: usize = 1 << 30;

/// Limits applied to a single context.
///
/// Deserializable so hosts can load it from their own configuration files.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum number of live heap objects, `None` for unbounded.
    pub max_objects: Option<usize>,
    /// Maximum inheritance depth of a class (a class without superclasses has depth 1).
    pub max_inheritance_depth: usize,
    /// Maximum size in bytes of a value whose size is known before it is built,
    /// such as a repeated String.
    pub max_result_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_objects: None,
            max_inheritance_depth: MAX_INHERITANCE_DEPTH,
            max_result_bytes: MAX_RESULT_BYTES,
        }
    }
}

impl ResourceLimits {
    /// Limits with no object cap and the default inheritance depth.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_objects(mut self, limit: usize) -> Self {
        self.max_objects = Some(limit);
        self
    }

    #[must_use]
    pub fn max_inheritance_depth(mut self, limit: usize) -> Self {
        self.max_inheritance_depth = limit;
        self
    }

    #[must_use]
    pub fn max_result_bytes(mut self, limit: usize) -> Self {
        self.max_result_bytes = limit;
        self
    }

    pub(crate) fn check_allocation(&self, count: usize) -> Result<(), ResourceError> {
        match self.max_objects {
            Some(limit) if count >= limit => Err(ResourceError::Allocation {
                limit,
                count: count + 1,
            }),
            _ => Ok(()),
        }
    }

    /// Rejects a result of `estimated_bytes` before any memory is reserved for it.
    pub(crate) fn check_large_result(&self, estimated_bytes: usize) -> Result<(), ResourceError> {
        if estimated_bytes > self.max_result_bytes {
            Err(ResourceError::Memory {
                limit: self.max_result_bytes,
                used: estimated_bytes,
            })
        } else {
            Ok(())
        }
    }

    pub(crate) fn check_inheritance_depth(&self, depth: usize) -> Result<(), ResourceError> {
        if depth > self.max_inheritance_depth {
            Err(ResourceError::InheritanceDepth {
                limit: self.max_inheritance_depth,
                depth,
            })
        } else {
            Ok(())
        }
    }
}

/// Error returned when a resource limit is exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Maximum number of heap objects exceeded.
    Allocation { limit: usize, count: usize },
    /// A class would be nested deeper than the configured bound.
    InheritanceDepth { limit: usize, depth: usize },
    /// A single value would be larger than the configured bound.
    Memory { limit: usize, used: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { limit, count } => {
                write!(f, "allocation limit exceeded: {count} > {limit}")
            }
            Self::InheritanceDepth { limit, depth } => {
                write!(f, "inheritance depth exceeded: {depth} > {limit}")
            }
            Self::Memory { limit, used } => {
                write!(f, "memory limit exceeded: {used} bytes > {limit} bytes")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Options for constructing a [`Context`](crate::Context).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    pub limits: ResourceLimits,
}
