//! Newtype index handles into the Program's pools.
//!
//! Per the ownership model: all allocations live in flat `Vec`-backed pools;
//! references between nodes are non-owning `u32` indices rather than
//! `Box`/`Rc`. This makes cyclic *references* (e.g. a goto targeting a block
//! that later references it back) trivial to represent without unsafe code,
//! while keeping ownership itself acyclic.

use std::fmt;

macro_rules! index_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[must_use]
            pub fn new(index: u32) -> Self {
                Self(index)
            }

            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

index_handle!(
    /// Handle to an interned `Type` in the Program's type pool.
    TypeId
);
index_handle!(
    /// Handle to an `Expr` node in the Program's expression pool.
    ExprId
);
index_handle!(
    /// Handle to a `Block` within a `Func`.
    BlockId
);
index_handle!(
    /// Handle to a `Func` in the Program.
    FuncId
);
index_handle!(
    /// Handle to a `GlobalValue` in the Program.
    GlobalId
);

/// Opaque identity assigned to a distinct value in the source LLVM module
/// (an instruction result, a function argument, a global, a constant).
///
/// The core itself never inspects the identity of an LLVM value -- it only
/// needs an injective key to implement the "LLVM value -> Expression" map
/// from §3 Invariant 2. The reader/pass-pipeline layer (which does
/// understand `llvm-ir` types) is responsible for assigning these
/// consistently, typically by interning the value's pointer identity within
/// the borrowed module.
index_handle!(
    /// Stable key standing in for an LLVM value's identity.
    IrValueId
);

/// A contiguous run of child expressions stored in `Program`'s flat
/// expression-list pool (call arguments, aggregate-initializer values,
/// switch case bodies are stored out-of-line via [`crate::program::ExprListId`]
/// rather than this range, since those need per-entry metadata).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ExprRange {
    pub start: u32,
    pub len: u32,
}

impl ExprRange {
    #[must_use]
    pub fn empty() -> Self {
        Self { start: 0, len: 0 }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn as_range(self) -> std::ops::Range<usize> {
        self.start as usize..(self.start + self.len) as usize
    }
}
