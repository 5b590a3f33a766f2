//! Index and slice bounds shared by the sequence types.

use crate::{
    args::ArgValues,
    context::Context,
    exception::{ExcKind, RunResult},
    heap::HeapId,
};

/// Resolves a possibly negative index against a sequence of `len` elements.
///
/// Negative indices count from the end. Anything outside `0..len` raises
/// `Bounds_Exception`.
pub(crate) fn translate_index(ctx: &mut Context, index: i64, len: usize) -> RunResult<usize> {
    let len_i = len as i64;
    let resolved = if index < 0 { index + len_i } else { index };
    if (0..len_i).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(ctx.raise(ExcKind::Bounds_Exception, format!("Index {index} out of bounds.")))
    }
}

/// Resolves the optional `(start, end)` arguments of a slicing method.
///
/// Both bounds may be negative and may equal `len`. A missing start is 0 and
/// a missing end is `len`; a start past the end raises `Bounds_Exception`.
pub(crate) fn translate_slice(ctx: &mut Context, args: &ArgValues, len: usize, name: &str) -> RunResult<(usize, usize)> {
    let (start, end) = match args.as_slice() {
        [] => (None, None),
        [start] => (Some(*start), None),
        [start, end] => (Some(*start), Some(*end)),
        _ => {
            let (start, end) = args.get_two_args(name, ctx)?;
            (Some(start), Some(end))
        }
    };
    let start = match start {
        Some(start) => slice_bound(ctx, start, len)?,
        None => 0,
    };
    let end = match end {
        Some(end) => slice_bound(ctx, end, len)?,
        None => len,
    };
    if start > end {
        return Err(ctx.raise(
            ExcKind::Bounds_Exception,
            format!("Slice start {start} is after its end {end}."),
        ));
    }
    Ok((start, end))
}

fn slice_bound(ctx: &mut Context, bound: HeapId, len: usize) -> RunResult<usize> {
    let index = ctx.expect_int(bound)?;
    if index == len as i64 {
        return Ok(len);
    }
    translate_index(ctx, index, len)
}
