//! The Expression IR: a closed sum type of C-level expressions/statements.
//!
//! Grounded on the original llvm2c `Expr` hierarchy (reconstructed from
//! `writer/ExprWriter.cpp`'s exhaustive `visit` overloads) and on the
//! teacher's arena-of-indices pattern in `sigil_ir::arena::ExprArena` (flat
//! `Vec` storage, `ExprId` newtype handles, no `Box<Expr>`). Unlike the
//! teacher's AST (which is read-only after parsing), these nodes are
//! constructed incrementally across the Pass Pipeline and some are deleted
//! in place (`DeleteUnusedVariables`), so the pool supports tombstoning a
//! block's expression list without touching the node pool itself.

use crate::ids::{BlockId, ExprId, ExprRange, TypeId};

/// A call's callee: either a direct symbol reference or an indirect
/// function-pointer expression (possibly wrapped in casts, which
/// `no_func_casts` strips at emission time).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum CallTarget {
    Direct(String),
    Indirect(ExprId),
}

/// C relational operators selected by an LLVM `icmp`/`fcmp` predicate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// One inline-asm operand constraint/expression pair.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct AsmOperand {
    pub constraint: String,
    pub expr: Option<ExprId>,
}

/// The closed set of Expression/statement variants. Adding a variant here
/// must be matched in every visitor (`bclift_emit`'s emitter,
/// `bclift_passes`'s simplifier) -- both use exhaustive `match` rather than
/// wildcard arms for exactly this reason.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ExprKind {
    // --- Leaf ---
    /// A bare identifier or literal constant's textual form.
    Value { name: String },
    GlobalValue { name: String },
    /// Declaration line for an `alloca`; `slot` is the `Value` leaf that
    /// subsequent references resolve to.
    StackAlloc { slot: ExprId },
    AggregateInitializer { values: ExprRange },

    // --- Unary ---
    Ref { expr: ExprId },
    Deref { expr: ExprId },
    /// Cast to the node's own `ty`.
    Cast { expr: ExprId },
    /// Only the last index is ever printed; earlier ones exist for
    /// structural completeness during simplification.
    ExtractValue { indices: ExprRange },
    Ret { expr: Option<ExprId> },

    // --- Binary arithmetic/bit ---
    Add { left: ExprId, right: ExprId },
    Sub { left: ExprId, right: ExprId },
    Mul { left: ExprId, right: ExprId },
    Div { left: ExprId, right: ExprId },
    Rem { left: ExprId, right: ExprId },
    And { left: ExprId, right: ExprId },
    Or { left: ExprId, right: ExprId },
    Xor { left: ExprId, right: ExprId },
    Shl { left: ExprId, right: ExprId },
    Ashr { left: ExprId, right: ExprId },
    /// Operands are coerced to unsigned of the same width during
    /// `CreateExpressions`, per §4.4; the emitter additionally re-casts
    /// an originally-signed left operand, per scenario 5.
    Lshr {
        left: ExprId,
        right: ExprId,
        left_was_signed: bool,
    },

    // --- Comparison / logical ---
    /// `unsigned` mirrors `Lshr::left_was_signed`: set when the source
    /// `icmp` predicate was one of the `u`-prefixed ones, so the emitter
    /// re-casts both operands to unsigned before comparing.
    Cmp {
        left: ExprId,
        right: ExprId,
        op: CmpOp,
        unsigned: bool,
    },
    LogicalAnd { lhs: ExprId, rhs: ExprId },
    LogicalOr { lhs: ExprId, rhs: ExprId },

    // --- Addressing ---
    ArrayElement { base: ExprId, index: ExprId },
    /// `.` or `->` chosen by pointer-ness of `base`'s type at emission.
    StructElement {
        base: ExprId,
        struct_ty: TypeId,
        field: usize,
    },
    ArrowExpr {
        base: ExprId,
        struct_ty: TypeId,
        field: usize,
    },
    /// `*(((ptr_type)(pointer)) + offset)`; collapses to `pointer` alone
    /// when `offset` is a literal zero.
    PointerShift {
        pointer: ExprId,
        offset: ExprId,
        ptr_type: TypeId,
    },
    /// Flattened during `CreateExpressions` into nested `StructElement`/
    /// `ArrayElement`; only the last index is ever emitted directly.
    GepExpr { indices: ExprRange },

    // --- Control ---
    IfExpr {
        cmp: ExprId,
        true_block: BlockId,
        false_block: BlockId,
    },
    SwitchExpr {
        cmp: ExprId,
        cases: Vec<(i64, BlockId)>,
        default: Option<BlockId>,
    },
    GotoExpr { target: BlockId },
    Select { cmp: ExprId, left: ExprId, right: ExprId },
    CallExpr { callee: CallTarget, args: ExprRange },
    /// A sequence of statements; each is terminated with `;\n` at emission
    /// except `IfExpr`/`GotoExpr`/`SwitchExpr`, which provide their own.
    ExprList { items: ExprRange },
    AsmExpr {
        instruction: String,
        outputs: Vec<AsmOperand>,
        inputs: Vec<AsmOperand>,
        clobbers: String,
    },

    // --- Assignment ---
    AssignExpr { left: ExprId, right: ExprId },
}

impl ExprKind {
    /// True for bare identifiers, literals, and parenthesized forms; the
    /// Emitter wraps a child in parens iff `!is_simple`.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        matches!(self, ExprKind::Value { .. } | ExprKind::GlobalValue { .. })
    }
}

/// An `Expr` node: its variant plus the C type it evaluates to (computed
/// once at construction and immutable thereafter, per §3).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeId,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, ty: TypeId) -> Self {
        Self { kind, ty }
    }

    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.kind.is_simple()
    }
}

/// Flat pool owning every allocated `Expr`, plus the flat storage backing
/// `ExprRange`-typed children (call args, aggregate values, GEP/extract
/// indices, `ExprList` items). Mirrors `sigil_ir::arena::ExprArena`'s
/// split between a node `Vec` and several auxiliary list `Vec`s, adapted
/// down to the single list shape this IR actually needs.
#[derive(Default)]
pub struct ExprPool {
    nodes: Vec<Expr>,
    lists: Vec<ExprId>,
}

impl ExprPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `add_ownership`: transfers ownership of `expr` into the pool and
    /// returns a stable, non-owning handle.
    pub fn add_ownership(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(expr);
        id
    }

    #[must_use]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.nodes[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a contiguous list of expression children, returning the
    /// range that indexes them in [`Self::get_list`].
    pub fn alloc_list(&mut self, items: impl IntoIterator<Item = ExprId>) -> ExprRange {
        let start = u32::try_from(self.lists.len()).unwrap_or(u32::MAX);
        let before = self.lists.len();
        self.lists.extend(items);
        let len = u32::try_from(self.lists.len() - before).unwrap_or(u32::MAX);
        ExprRange { start, len }
    }

    #[must_use]
    pub fn get_list(&self, range: ExprRange) -> &[ExprId] {
        &self.lists[range.as_range()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TypeId;
    use pretty_assertions::assert_eq;

    fn dummy_ty() -> TypeId {
        TypeId::new(0)
    }

    #[test]
    fn alloc_and_get_expr_roundtrip() {
        let mut pool = ExprPool::new();
        let id = pool.add_ownership(Expr::new(
            ExprKind::Value {
                name: "x".to_string(),
            },
            dummy_ty(),
        ));
        assert!(pool.get(id).is_simple());
    }

    #[test]
    fn value_and_global_are_simple_everything_else_is_not() {
        let v = Expr::new(ExprKind::Value { name: "x".into() }, dummy_ty());
        let g = Expr::new(ExprKind::GlobalValue { name: "g".into() }, dummy_ty());
        let add = Expr::new(
            ExprKind::Add {
                left: ExprId::new(0),
                right: ExprId::new(0),
            },
            dummy_ty(),
        );
        assert!(v.is_simple());
        assert!(g.is_simple());
        assert!(!add.is_simple());
    }

    #[test]
    fn list_allocation_preserves_order() {
        let mut pool = ExprPool::new();
        let a = pool.add_ownership(Expr::new(ExprKind::Value { name: "a".into() }, dummy_ty()));
        let b = pool.add_ownership(Expr::new(ExprKind::Value { name: "b".into() }, dummy_ty()));
        let range = pool.alloc_list([a, b]);
        assert_eq!(pool.get_list(range), &[a, b]);
    }
}
