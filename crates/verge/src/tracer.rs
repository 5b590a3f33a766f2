//! Object-model tracing.
//!
//! The [`ObjectTracer`] trait defines hook points at the events that shape the
//! runtime's layout: new shape nodes, class creation, module initialization,
//! raised exceptions and exhausted pumps. All hooks default to no-ops.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | No-op (default) |
//! | [`StderrTracer`] | Human-readable log to stderr |
//! | [`RecordingTracer`] | Event recording for tests and post-mortem analysis |
//!
//! ```ignore
//! let ctx = Context::with_tracer(ContextOptions::default(), Box::new(StderrTracer::new()))?;
//! ```

use std::{any::Any, fmt};

use crate::shape::ShapeId;

/// Trace event recorded by [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A new shape node was created by extending `parent` with `name`.
    ShapeCreated {
        parent: ShapeId,
        child: ShapeId,
        name: String,
    },
    /// A class was created.
    ClassCreated {
        name: String,
        /// Number of direct superclasses.
        supers: usize,
    },
    /// A module's initializer completed.
    ModuleImported { name: String },
    /// An exception object was raised by the runtime.
    Raised { class_name: String, message: String },
    /// A pump series reached its end.
    PumpExhausted,
}

/// Trait for object-model tracing.
///
/// Implementations only override the hooks they care about. The context owns
/// its tracer as a `Box<dyn ObjectTracer>`; use [`as_any`](Self::as_any) to get
/// a concrete tracer back (e.g. to read a [`RecordingTracer`]'s events).
pub trait ObjectTracer: fmt::Debug {
    /// Called when `extend` creates a node that did not exist before.
    ///
    /// Cache hits are not reported.
    ///
    /// # Arguments
    /// * `parent` - The node that was extended
    /// * `child` - The newly created node
    /// * `name` - The attribute appended to the layout
    #[inline(always)]
    fn on_shape_created(&mut self, _parent: ShapeId, _child: ShapeId, _name: &str) {}

    /// Called after a class has been created and its constructor resolved.
    #[inline(always)]
    fn on_class_created(&mut self, _name: &str, _supers: usize) {}

    /// Called after a module's initializer has run successfully.
    #[inline(always)]
    fn on_module_imported(&mut self, _name: &str) {}

    /// Called when the runtime raises an exception object.
    ///
    /// # Arguments
    /// * `class_name` - Name of the exception's class
    /// * `message` - The message passed to the exception
    #[inline(always)]
    fn on_raise(&mut self, _class_name: &str, _message: &str) {}

    /// Called when a pump series is exhausted.
    #[inline(always)]
    fn on_pump_exhausted(&mut self) {}

    /// Upcast for downcasting to a concrete tracer.
    fn as_any(&self) -> &dyn Any;
}

// =============================================================================
// NoopTracer
// =============================================================================

/// Tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl ObjectTracer for NoopTracer {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// StderrTracer
// =============================================================================

/// Human-readable event log written to stderr.
///
/// `limit` caps the number of lines written so a tight loop creating shapes
/// cannot flood the terminal.
#[derive(Debug, Clone)]
pub struct StderrTracer {
    written: usize,
    limit: Option<usize>,
}

impl Default for StderrTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            written: 0,
            limit: None,
        }
    }

    /// Stops logging after `limit` lines.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            written: 0,
            limit: Some(limit),
        }
    }

    fn log(&mut self, args: fmt::Arguments<'_>) {
        if self.limit.is_some_and(|limit| self.written >= limit) {
            return;
        }
        self.written += 1;
        eprintln!("[verge] {args}");
    }
}

impl ObjectTracer for StderrTracer {
    fn on_shape_created(&mut self, parent: ShapeId, child: ShapeId, name: &str) {
        self.log(format_args!(
            "shape {} -> {} (+{name})",
            parent.index(),
            child.index()
        ));
    }

    fn on_class_created(&mut self, name: &str, supers: usize) {
        self.log(format_args!("class {name} ({supers} supers)"));
    }

    fn on_module_imported(&mut self, name: &str) {
        self.log(format_args!("imported {name}"));
    }

    fn on_raise(&mut self, class_name: &str, message: &str) {
        self.log(format_args!("raise {class_name}: {message}"));
    }

    fn on_pump_exhausted(&mut self) {
        self.log(format_args!("pump exhausted"));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// RecordingTracer
// =============================================================================

/// Tracer that records every event in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }
}

impl ObjectTracer for RecordingTracer {
    fn on_shape_created(&mut self, parent: ShapeId, child: ShapeId, name: &str) {
        self.events.push(TraceEvent::ShapeCreated {
            parent,
            child,
            name: name.to_owned(),
        });
    }

    fn on_class_created(&mut self, name: &str, supers: usize) {
        self.events.push(TraceEvent::ClassCreated {
            name: name.to_owned(),
            supers,
        });
    }

    fn on_module_imported(&mut self, name: &str) {
        self.events.push(TraceEvent::ModuleImported { name: name.to_owned() });
    }

    fn on_raise(&mut self, class_name: &str, message: &str) {
        self.events.push(TraceEvent::Raised {
            class_name: class_name.to_owned(),
            message: message.to_owned(),
        });
    }

    fn on_pump_exhausted(&mut self) {
        self.events.push(TraceEvent::PumpExhausted);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
