//! `Func`, `Block`, and `GlobalValue` entities (§3 "Entities").

use rustc_hash::FxHashSet;

use crate::ids::{BlockId, ExprId, FuncId, TypeId};

/// A translated C-level basic block.
///
/// `do_inline` is set by the `BlockLayout` pass (§4.4 step 4) once the
/// single-predecessor analysis has run; before that pass runs it is
/// `false` and every block prints as a labeled `goto` target.
#[derive(Clone, Debug)]
pub struct Block {
    pub label: String,
    pub expressions: Vec<ExprId>,
    pub do_inline: bool,
}

impl Block {
    #[must_use]
    pub fn new(label: String) -> Self {
        Self {
            label,
            expressions: Vec::new(),
            do_inline: false,
        }
    }

    pub fn push(&mut self, expr: ExprId) {
        self.expressions.push(expr);
    }

    /// Remove the first occurrence of `expr`, used by `DeleteUnusedVariables`
    /// to excise an eliminated `StackAlloc`/`AssignExpr` pair in place.
    pub fn remove(&mut self, expr: ExprId) {
        if let Some(pos) = self.expressions.iter().position(|&e| e == expr) {
            self.expressions.remove(pos);
        }
    }
}

/// Flat pool of every `Block` across every `Func`, so `GotoExpr`/`SwitchExpr`
/// can hold a plain [`BlockId`] without being scoped to a particular `Func`.
#[derive(Default)]
pub struct BlockPool {
    blocks: Vec<Block>,
}

impl BlockPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, block: Block) -> BlockId {
        let id = BlockId::new(u32::try_from(self.blocks.len()).unwrap_or(u32::MAX));
        self.blocks.push(block);
        id
    }

    #[must_use]
    pub fn get(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn get_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }
}

/// A translated function: signature plus an ordered sequence of blocks.
pub struct Func {
    pub name: String,
    pub ret: TypeId,
    /// Parameter types paired with the `Value` leaf `ExprId` each parameter
    /// name resolves to.
    pub params: Vec<(TypeId, ExprId)>,
    pub variadic: bool,
    pub blocks: Vec<BlockId>,
    pub is_declaration: bool,
    /// Variable names recovered from `llvm.dbg.declare` metadata matching
    /// `var[0-9]+`, registered so synthesized `var<N>` names never collide
    /// (§4.4 step 3).
    pub metadata_var_names: FxHashSet<String>,
}

impl Func {
    #[must_use]
    pub fn new(name: String, ret: TypeId, params: Vec<(TypeId, ExprId)>, variadic: bool) -> Self {
        Self {
            name,
            ret,
            params,
            variadic,
            blocks: Vec::new(),
            is_declaration: false,
            metadata_var_names: FxHashSet::default(),
        }
    }

    pub fn add_metadata_var_name(&mut self, name: String) {
        self.metadata_var_names.insert(name);
    }
}

#[derive(Default)]
pub struct FuncPool {
    funcs: Vec<Func>,
}

impl FuncPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, func: Func) -> FuncId {
        let id = FuncId::new(u32::try_from(self.funcs.len()).unwrap_or(u32::MAX));
        self.funcs.push(func);
        id
    }

    #[must_use]
    pub fn get(&self, id: FuncId) -> &Func {
        &self.funcs[id.index()]
    }

    pub fn get_mut(&mut self, id: FuncId) -> &mut Func {
        &mut self.funcs[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (FuncId, &Func)> {
        self.funcs
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncId::new(u32::try_from(i).unwrap_or(u32::MAX)), f))
    }
}

/// A global variable: name, type, optional initializer, and the
/// `init_emitted` flag that guards multi-pass emission (reset by
/// `EmitPrepass`, §4.4 step 8).
pub struct GlobalValue {
    pub name: String,
    pub ty: TypeId,
    pub initializer: Option<ExprId>,
    pub init_emitted: bool,
}

impl GlobalValue {
    #[must_use]
    pub fn new(name: String, ty: TypeId, initializer: Option<ExprId>) -> Self {
        Self {
            name,
            ty,
            initializer,
            init_emitted: false,
        }
    }
}
