//! Stack safety utilities for deep recursion.
//!
//! Prevents stack overflow when walking deeply nested expression trees (GEP
//! chains flattened into nested `StructElement`/`ArrayElement`, long cast
//! chains, deeply nested `IfExpr`/`SwitchExpr` bodies) by dynamically growing
//! the stack when needed.
//!
//! # Platform Support
//!
//! - **Native targets**: uses the `stacker` crate to grow the stack on demand.
//! - **WASM targets**: no-op passthrough (WASM has its own stack management).
//!
//! # Usage
//!
//! Wrap recursive calls that could overflow with [`ensure_sufficient_stack`]:
//!
//! ```text
//! fn emit_expr(&mut self, id: ExprId) {
//!     ensure_sufficient_stack(|| {
//!         // ... recursive visitor dispatch ...
//!     })
//! }
//! ```

/// Minimum stack space to keep available (100KB red zone).
///
/// If less than this amount remains, we'll grow the stack.
#[cfg(not(target_arch = "wasm32"))]
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
#[cfg(not(target_arch = "wasm32"))]
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Ensure sufficient stack space is available before executing `f`.
///
/// If the remaining stack is below the red zone threshold, this will
/// allocate additional stack space before calling `f`. This prevents stack
/// overflow in deeply recursive code paths such as the emitter's visitor
/// dispatch or the GEP-flattening recursive builder.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM version - just call directly (WASM has its own stack management).
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests;
