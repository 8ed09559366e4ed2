//! The Program container: owns every allocated `Type`/`Expr`/`Block`/`Func`
//! node, indexes the LLVM-value <-> Expression map, and tracks which passes
//! have completed.
//!
//! Grounded on the original llvm2c `Program` (`core/Program.cpp`,
//! `Program.h`): `addOwnership`/`getExpr`/`addExpr`/`getFunction`/
//! `addFunction`/`isPassCompleted`/`addPass`/`addUnion` map 1:1 onto methods
//! here, translated from `std::vector<std::unique_ptr<T>>` + raw-pointer
//! maps into arena pools + `u32` handles, per the teacher's
//! `sigil_ir::arena::ExprArena` convention.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::expr::{Expr, ExprPool};
use crate::func::{Block, BlockPool, Func, FuncPool, GlobalValue};
use crate::ids::{BlockId, ExprId, FuncId, GlobalId, IrValueId, TypeId};
use crate::types::TypeTranslator;
use bclift_diag::DecompileError;

/// Passes, in mandatory order (§4.4). Each variant names the pass it
/// records as complete.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PassKind {
    CreateFunctions,
    CreateExpressions,
    FindMetadataFunctionNames,
    BlockLayout,
    SimplifyExpressions,
    DeleteUnusedVariables,
    RefDeref,
    EmitPrepass,
}

impl PassKind {
    /// The pass whose completion this pass asserts as a precondition, if
    /// any. `EmitPrepass` depends transitively on everything but is only
    /// required to follow `RefDeref` directly, since it is idempotent and
    /// may re-run before each emission.
    #[must_use]
    pub fn prerequisite(self) -> Option<PassKind> {
        match self {
            PassKind::CreateFunctions => None,
            PassKind::CreateExpressions => Some(PassKind::CreateFunctions),
            PassKind::FindMetadataFunctionNames => Some(PassKind::CreateFunctions),
            PassKind::BlockLayout => Some(PassKind::CreateExpressions),
            PassKind::SimplifyExpressions => Some(PassKind::BlockLayout),
            PassKind::DeleteUnusedVariables => Some(PassKind::CreateExpressions),
            PassKind::RefDeref => Some(PassKind::SimplifyExpressions),
            PassKind::EmitPrepass => Some(PassKind::RefDeref),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PassKind::CreateFunctions => "CreateFunctions",
            PassKind::CreateExpressions => "CreateExpressions",
            PassKind::FindMetadataFunctionNames => "FindMetadataFunctionNames",
            PassKind::BlockLayout => "BlockLayout",
            PassKind::SimplifyExpressions => "SimplifyExpressions",
            PassKind::DeleteUnusedVariables => "DeleteUnusedVariables",
            PassKind::RefDeref => "RefDeref",
            PassKind::EmitPrepass => "EmitPrepass",
        }
    }
}

pub struct Program {
    pub types: TypeTranslator,
    pub exprs: ExprPool,
    pub blocks: BlockPool,
    pub funcs: FuncPool,
    pub declarations: Vec<FuncId>,
    pub globals: Vec<GlobalValue>,

    func_by_name: FxHashMap<String, FuncId>,
    value_map: FxHashMap<IrValueId, ExprId>,
    global_refs: FxHashMap<IrValueId, ExprId>,
    global_var_names: FxHashSet<String>,
    unnamed_struct_cache: FxHashMap<IrValueId, TypeId>,

    passes: FxHashSet<PassKind>,
    union_count: u32,

    /// Set when a `CallExpr` to `llvm.stacksave`/`llvm.stackrestore` was
    /// elided, for downstream diagnostics (§4.4 step 2).
    pub stack_ignored: bool,
    /// Set when any function uses C varargs, guiding a `#include <stdarg.h>`
    /// at the top of emitted output (§6).
    pub has_var_arg: bool,
}

impl Program {
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: TypeTranslator::new(),
            exprs: ExprPool::new(),
            blocks: BlockPool::new(),
            funcs: FuncPool::new(),
            declarations: Vec::new(),
            globals: Vec::new(),
            func_by_name: FxHashMap::default(),
            value_map: FxHashMap::default(),
            global_refs: FxHashMap::default(),
            global_var_names: FxHashSet::default(),
            unnamed_struct_cache: FxHashMap::default(),
            passes: FxHashSet::default(),
            union_count: 0,
            stack_ignored: false,
            has_var_arg: false,
        }
    }

    // --- ownership ---

    pub fn add_ownership(&mut self, expr: Expr) -> ExprId {
        self.exprs.add_ownership(expr)
    }

    pub fn alloc_block(&mut self, block: Block) -> BlockId {
        self.blocks.alloc(block)
    }

    // --- LLVM value <-> Expression map (§3 Invariant 2: injective after CreateExpressions) ---

    #[must_use]
    pub fn get_expr(&self, value: IrValueId) -> Option<ExprId> {
        self.value_map.get(&value).copied()
    }

    pub fn add_expr(&mut self, value: IrValueId, expr: ExprId) {
        self.value_map.insert(value, expr);
    }

    // --- functions ---

    pub fn add_function(&mut self, func: Func) -> FuncId {
        let name = func.name.clone();
        let id = self.funcs.alloc(func);
        self.func_by_name.insert(name, id);
        id
    }

    #[must_use]
    pub fn get_function_by_name(&self, name: &str) -> Option<FuncId> {
        self.func_by_name.get(name).copied()
    }

    // --- globals ---

    pub fn add_global(&mut self, global: GlobalValue, value: IrValueId, reference: ExprId) -> GlobalId {
        let id = GlobalId::new(u32::try_from(self.globals.len()).unwrap_or(u32::MAX));
        self.globals.push(global);
        self.global_refs.insert(value, reference);
        self.global_var_names
            .insert(self.globals[id.index()].name.clone());
        id
    }

    /// `get_global_var`: the canonical reference expression for a global.
    #[must_use]
    pub fn get_global_ref(&self, value: IrValueId) -> Option<ExprId> {
        self.global_refs.get(&value).copied()
    }

    #[must_use]
    pub fn global_var_names(&self) -> &FxHashSet<String> {
        &self.global_var_names
    }

    // --- structs (unnamed-struct identity cache keyed on the source LLVM type) ---

    #[must_use]
    pub fn cached_unnamed_struct(&self, key: IrValueId) -> Option<TypeId> {
        self.unnamed_struct_cache.get(&key).copied()
    }

    pub fn cache_unnamed_struct(&mut self, key: IrValueId, ty: TypeId) {
        self.unnamed_struct_cache.insert(key, ty);
    }

    // --- unions ---

    /// `add_union`: synthesize a fresh union over `subtypes`, naming it
    /// `u<N>` from a monotonic, never-reused counter (§3 Invariant 4).
    pub fn add_union(&mut self, subtypes: &[TypeId]) -> TypeId {
        self.union_count += 1;
        let name = format!("u{}", self.union_count);
        self.types.intern_union(name, subtypes)
    }

    // --- passes ---

    #[must_use]
    pub fn is_pass_completed(&self, pass: PassKind) -> bool {
        self.passes.contains(&pass)
    }

    /// Record `pass` complete. Asserting the prerequisite here (rather than
    /// only in each pass's own entry point) means every caller gets the
    /// same precondition enforcement for free.
    pub fn add_pass(&mut self, pass: PassKind) -> Result<(), DecompileError> {
        if let Some(prereq) = pass.prerequisite() {
            if !self.is_pass_completed(prereq) {
                return Err(DecompileError::PassPrecondition {
                    pass: pass.name(),
                    missing: prereq.name(),
                });
            }
        }
        self.passes.insert(pass);
        Ok(())
    }

    /// Hard-fail if `pass` has not completed; every pass implementation
    /// calls this on entry per §4.4 "Every pass asserts its prerequisites".
    pub fn require_pass(&self, pass: PassKind) -> Result<(), DecompileError> {
        if self.is_pass_completed(pass) {
            Ok(())
        } else {
            Err(DecompileError::PassPrecondition {
                pass: "<caller>",
                missing: pass.name(),
            })
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pass_precondition_violation_is_an_error() {
        let mut p = Program::new();
        let err = p.add_pass(PassKind::CreateExpressions).unwrap_err();
        match err {
            DecompileError::PassPrecondition { pass, missing } => {
                assert_eq!(pass, "CreateExpressions");
                assert_eq!(missing, "CreateFunctions");
            }
            _ => panic!("wrong error variant"),
        }
    }

    #[test]
    fn passes_are_monotone_once_recorded() {
        let mut p = Program::new();
        p.add_pass(PassKind::CreateFunctions).unwrap();
        assert!(p.is_pass_completed(PassKind::CreateFunctions));
        p.add_pass(PassKind::CreateExpressions).unwrap();
        assert!(p.is_pass_completed(PassKind::CreateExpressions));
    }

    #[test]
    fn union_names_are_monotonic() {
        let mut p = Program::new();
        let int_ty = p.types.intern_integer(32).unwrap();
        let a = p.add_union(&[int_ty]);
        let b = p.add_union(&[int_ty]);
        assert_eq!(p.types.to_string_of(a), "union u1");
        assert_eq!(p.types.to_string_of(b), "union u2");
    }
}
