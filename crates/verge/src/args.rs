//! Argument vectors for native functions.

use smallvec::SmallVec;

use crate::{
    context::Context,
    exception::{ExcKind, RunResult},
    heap::HeapId,
};

/// Positional arguments passed to a function.
///
/// Most calls pass a receiver plus at most three arguments, which fit inline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgValues(SmallVec<[HeapId; 4]>);

impl ArgValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[HeapId] {
        &self.0
    }

    pub fn push(&mut self, arg: HeapId) {
        self.0.push(arg);
    }

    /// Returns a copy with `leading` inserted before the existing arguments.
    #[must_use]
    pub fn prepended(&self, leading: &[HeapId]) -> Self {
        let mut args = SmallVec::with_capacity(leading.len() + self.0.len());
        args.extend_from_slice(leading);
        args.extend_from_slice(&self.0);
        Self(args)
    }

    /// Checks that zero arguments were passed.
    pub fn check_zero_args(&self, name: &str, ctx: &mut Context) -> RunResult<()> {
        self.check_count(name, 0, 0, ctx)
    }

    /// Checks that exactly one argument was passed, returning it.
    pub fn get_one_arg(&self, name: &str, ctx: &mut Context) -> RunResult<HeapId> {
        self.check_count(name, 1, 1, ctx)?;
        Ok(self.0[0])
    }

    /// Checks that exactly two arguments were passed, returning them.
    pub fn get_two_args(&self, name: &str, ctx: &mut Context) -> RunResult<(HeapId, HeapId)> {
        self.check_count(name, 2, 2, ctx)?;
        Ok((self.0[0], self.0[1]))
    }

    /// Checks that one or two arguments were passed.
    pub fn get_one_two_args(&self, name: &str, ctx: &mut Context) -> RunResult<(HeapId, Option<HeapId>)> {
        self.check_count(name, 1, 2, ctx)?;
        Ok((self.0[0], self.0.get(1).copied()))
    }

    /// Checks that between one and three arguments were passed.
    pub fn get_one_to_three_args(
        &self,
        name: &str,
        ctx: &mut Context,
    ) -> RunResult<(HeapId, Option<HeapId>, Option<HeapId>)> {
        self.check_count(name, 1, 3, ctx)?;
        Ok((self.0[0], self.0.get(1).copied(), self.0.get(2).copied()))
    }

    /// Splits off the receiver of a method call.
    ///
    /// Bound methods are always applied with their receiver first, so an
    /// empty vector here means the method was applied by hand without one.
    pub fn split_receiver(&self, name: &str, ctx: &mut Context) -> RunResult<(HeapId, Self)> {
        match self.0.split_first() {
            Some((&receiver, rest)) => Ok((receiver, Self(SmallVec::from_slice(rest)))),
            None => Err(ctx.raise(
                ExcKind::Parameters_Exception,
                format!("{name} applied without a receiver."),
            )),
        }
    }

    fn check_count(&self, name: &str, min: usize, max: usize, ctx: &mut Context) -> RunResult<()> {
        let count = self.0.len();
        if (min..=max).contains(&count) {
            return Ok(());
        }
        let expected = if min == max {
            format!("{min}")
        } else {
            format!("{min} to {max}")
        };
        let plural = if max == 1 { "" } else { "s" };
        Err(ctx.raise(
            ExcKind::Parameters_Exception,
            format!("{name} expected {expected} argument{plural}, got {count}."),
        ))
    }
}

impl From<Vec<HeapId>> for ArgValues {
    fn from(args: Vec<HeapId>) -> Self {
        Self(SmallVec::from_vec(args))
    }
}

impl From<&[HeapId]> for ArgValues {
    fn from(args: &[HeapId]) -> Self {
        Self(SmallVec::from_slice(args))
    }
}

impl<const N: usize> From<[HeapId; N]> for ArgValues {
    fn from(args: [HeapId; N]) -> Self {
        Self(args.iter().copied().collect())
    }
}

impl FromIterator<HeapId> for ArgValues {
    fn from_iter<I: IntoIterator<Item = HeapId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
