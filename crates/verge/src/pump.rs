//! The generator/pump protocol.
//!
//! A [`Producer`] yields a lazy series of values one at a time. A [`Pump`]
//! drives one producer through one single-pass series: each call to
//! [`Pump::next_value`] returns the next value, or `Fail` once the series has
//! ended, and keeps returning `Fail` afterwards. A consumer may stop early;
//! dropping the pump drops the producer and whatever it holds.
//!
//! Builtin producers are explicit state machines (an index walking a list, a
//! search position in a string). [`FnProducer`] lets a closure serve as a
//! producer, which is how callback-driven series and engine-backed generators
//! plug in.

use std::fmt;

use crate::{context::Context, exception::RunResult, heap::HeapId};

/// A resumable source of values.
pub trait Producer {
    /// Produces the next value, or `None` when the series is over.
    ///
    /// After returning `None` or an error the producer is dropped and never
    /// resumed again.
    fn resume(&mut self, ctx: &mut Context) -> RunResult<Option<HeapId>>;
}

/// Producer backed by a closure.
pub struct FnProducer<F>(F);

impl<F> FnProducer<F>
where
    F: FnMut(&mut Context) -> RunResult<Option<HeapId>>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Producer for FnProducer<F>
where
    F: FnMut(&mut Context) -> RunResult<Option<HeapId>>,
{
    fn resume(&mut self, ctx: &mut Context) -> RunResult<Option<HeapId>> {
        (self.0)(ctx)
    }
}

/// Producer yielding a single value, used when an ordinary function is pumped.
#[derive(Debug)]
pub(crate) struct OnceProducer(pub(crate) Option<HeapId>);

impl Producer for OnceProducer {
    fn resume(&mut self, _ctx: &mut Context) -> RunResult<Option<HeapId>> {
        Ok(self.0.take())
    }
}

/// Producer over a precomputed list of values.
#[derive(Debug)]
pub(crate) struct VecProducer {
    values: std::vec::IntoIter<HeapId>,
}

impl VecProducer {
    pub(crate) fn new(values: Vec<HeapId>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }
}

impl Producer for VecProducer {
    fn resume(&mut self, _ctx: &mut Context) -> RunResult<Option<HeapId>> {
        Ok(self.values.next())
    }
}

/// Driver for one pass over a producer's series.
pub struct Pump {
    producer: Option<Box<dyn Producer>>,
}

impl fmt::Debug for Pump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pump").field("exhausted", &self.is_exhausted()).finish()
    }
}

impl Pump {
    #[must_use]
    pub fn new(producer: Box<dyn Producer>) -> Self {
        Self {
            producer: Some(producer),
        }
    }

    /// Whether the series has ended.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.producer.is_none()
    }

    /// Returns the next value of the series, or `Fail` once it has ended.
    ///
    /// An error from the producer also ends the series.
    pub fn next_value(&mut self, ctx: &mut Context) -> RunResult<HeapId> {
        let Some(producer) = self.producer.as_mut() else {
            return Ok(ctx.fail());
        };
        match producer.resume(ctx) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => {
                self.producer = None;
                ctx.tracer_mut().on_pump_exhausted();
                Ok(ctx.fail())
            }
            Err(err) => {
                self.producer = None;
                Err(err)
            }
        }
    }

    /// Drains the series, returning every value in order.
    pub fn collect(mut self, ctx: &mut Context) -> RunResult<Vec<HeapId>> {
        let mut values = Vec::new();
        loop {
            let value = self.next_value(ctx)?;
            if self.is_exhausted() {
                return Ok(values);
            }
            values.push(value);
        }
    }
}
