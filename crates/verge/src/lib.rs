#![doc = include_str!("../../../README.md")]

mod args;
mod builtins;
mod context;
mod engine;
mod exception;
mod heap;
mod intern;
mod modules;
mod object;
mod pump;
mod resource;
mod shape;
pub mod tracer;
mod types;

pub use crate::{
    args::ArgValues,
    builtins::{BuiltinId, NUM_BUILTINS},
    context::Context,
    engine::{Engine, SourceMap},
    exception::{CallSite, ExcKind, ExceptionData, RunError, RunResult, SrcLocation},
    heap::{Heap, HeapData, HeapId, HeapStats, HeapValue, NativeData},
    intern::StringId,
    object::{BinaryOp, CompareOp},
    pump::{FnProducer, Producer, Pump},
    resource::{ContextOptions, MAX_INHERITANCE_DEPTH, MAX_RESULT_BYTES, ResourceError, ResourceLimits},
    shape::{ShapeId, ShapeTable},
    tracer::{NoopTracer, ObjectTracer, RecordingTracer, StderrTracer, TraceEvent},
    types::{BytecodeFunc, Class, CompiledModule, DictKey, Function, Module, NativeFn, NativeProducerFn, Partial, Pc},
};
