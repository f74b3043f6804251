//! Stack growth for the recursive generator.
//!
//! Expression nesting is unbounded, so every recursive `generate` call runs
//! through [`ensure_sufficient_stack`]. On native targets this grows the
//! stack with `stacker` once less than [`RED_ZONE`] remains; on `wasm32` it
//! calls straight through.

/// Grow when less than this much stack remains.
#[cfg(not(target_arch = "wasm32"))]
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
#[cfg(not(target_arch = "wasm32"))]
const STACK_GROWTH: usize = 2 * 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_GROWTH, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
