//! Pass 5: resolve deferred PHI assignments, then run a peephole
//! simplification sweep over every block (§4.4 step 5).
//!
//! PHI resolution is grounded in the standard "out of SSA" lowering: each
//! incoming `(value, predecessor block)` pair becomes an explicit
//! assignment to the PHI's slot variable, inserted at the end of the named
//! predecessor block, just before its terminator. This has to wait until
//! every block in the function has been walked once (a back-edge
//! predecessor, e.g. a loop latch, is often visited *after* the block
//! holding the PHI), which is why `CreateExpressions` only allocates the
//! slot and defers resolution here via `create_expressions::PendingPhi`.
//!
//! The peephole rules themselves are grounded in §4.4 step 5: drop a cast
//! whose target type already matches its operand's type, fold `&*x`/`*&x`,
//! and collapse an IR-level `PointerShift` by a literal zero offset down
//! to its pointer operand (the Emitter performs the same collapse at print
//! time for any `PointerShift` its own cast-stripping didn't already
//! remove, but doing it here too keeps the `Program` itself minimal for
//! any pass/tool that inspects it before emission).

use bclift_reader::llvm_ir::Module;
use bclift_stack::ensure_sufficient_stack;

use bclift_diag::DecompileResult;
use bclift_ir::{Expr, ExprId, ExprKind, PassKind, Program};

use crate::create_expressions::{block_id_for, resolve_operand, PendingPhi};
use crate::types_bridge::TypeCache;
use crate::value_keys::ValueKeys;

pub fn run(
    module: &Module,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
    pending_phis: Vec<PendingPhi>,
) -> DecompileResult<()> {
    program.require_pass(PassKind::BlockLayout)?;

    resolve_phis(module, program, cache, keys, pending_phis)?;
    simplify_all_blocks(program)?;

    program.add_pass(PassKind::SimplifyExpressions)
}

fn resolve_phis(
    module: &Module,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
    pending_phis: Vec<PendingPhi>,
) -> DecompileResult<()> {
    for phi in pending_phis {
        let func = module
            .functions
            .iter()
            .find(|f| f.name == phi.func_name)
            .expect("a PendingPhi always names a function that exists in the module");

        for (pred_name, operand) in &phi.incoming {
            let value = resolve_operand(func, operand, program, cache, keys)?;
            let ty = program.exprs.get(phi.slot).ty;
            let assign = program.add_ownership(Expr::new(
                ExprKind::AssignExpr {
                    left: phi.slot,
                    right: value,
                },
                ty,
            ));
            let pred_block = block_id_for(func, program, pred_name);
            insert_before_terminator(program, pred_block, assign);
        }
    }
    Ok(())
}

/// Predecessor blocks that reach a PHI always end in `Br`/`CondBr`/`Switch`
/// (a block ending in `Ret`/`Unreachable` has no successors, so it can
/// never supply a PHI's incoming value), and `CreateExpressions` always
/// pushes that terminator's expression last -- so inserting just before
/// the final entry is always correct.
fn insert_before_terminator(program: &mut Program, block: bclift_ir::BlockId, expr: ExprId) {
    let block = program.blocks.get_mut(block);
    if block.expressions.is_empty() {
        block.expressions.push(expr);
    } else {
        let pos = block.expressions.len() - 1;
        block.expressions.insert(pos, expr);
    }
}

fn simplify_all_blocks(program: &mut Program) -> DecompileResult<()> {
    let block_ids: Vec<bclift_ir::BlockId> = program
        .funcs
        .iter()
        .flat_map(|(_, func)| func.blocks.iter().copied())
        .collect();

    for block_id in block_ids {
        let items = program.blocks.get(block_id).expressions.clone();
        for id in items {
            ensure_sufficient_stack(|| simplify(program, id))?;
        }
    }
    Ok(())
}

fn simplify(program: &mut Program, id: ExprId) -> DecompileResult<()> {
    // Recurse into children first (post-order) so nested redundancies
    // collapse from the inside out.
    match program.exprs.get(id).kind.clone() {
        ExprKind::Ref { expr } => {
            simplify(program, expr)?;
            if let ExprKind::Deref { expr: inner } = program.exprs.get(expr).kind {
                collapse_into(program, id, inner);
            }
        }
        ExprKind::Deref { expr } => {
            simplify(program, expr)?;
            if let ExprKind::Ref { expr: inner } = program.exprs.get(expr).kind {
                collapse_into(program, id, inner);
            }
        }
        ExprKind::Cast { expr } => {
            simplify(program, expr)?;
            if program.exprs.get(expr).ty == program.exprs.get(id).ty {
                collapse_into(program, id, expr);
            }
        }
        ExprKind::PointerShift { pointer, offset, .. } => {
            simplify(program, pointer)?;
            simplify(program, offset)?;
            if is_literal_zero(program, offset) {
                collapse_into(program, id, pointer);
            }
        }
        ExprKind::Add { left, right }
        | ExprKind::Sub { left, right }
        | ExprKind::Mul { left, right }
        | ExprKind::Div { left, right }
        | ExprKind::Rem { left, right }
        | ExprKind::And { left, right }
        | ExprKind::Or { left, right }
        | ExprKind::Xor { left, right }
        | ExprKind::Shl { left, right }
        | ExprKind::Ashr { left, right }
        | ExprKind::Cmp { left, right, .. }
        | ExprKind::LogicalAnd { lhs: left, rhs: right }
        | ExprKind::LogicalOr { lhs: left, rhs: right }
        | ExprKind::ArrayElement { base: left, index: right }
        | ExprKind::AssignExpr { left, right } => {
            simplify(program, left)?;
            simplify(program, right)?;
        }
        ExprKind::Lshr { left, right, .. } => {
            simplify(program, left)?;
            simplify(program, right)?;
        }
        ExprKind::StructElement { base, .. } | ExprKind::ArrowExpr { base, .. } => {
            simplify(program, base)?;
        }
        ExprKind::Select { cmp, left, right } => {
            simplify(program, cmp)?;
            simplify(program, left)?;
            simplify(program, right)?;
        }
        ExprKind::Ret { expr: Some(expr) } => simplify(program, expr)?,
        ExprKind::IfExpr { cmp, .. } => simplify(program, cmp)?,
        ExprKind::SwitchExpr { cmp, .. } => simplify(program, cmp)?,
        ExprKind::CallExpr { callee, args } => {
            if let bclift_ir::CallTarget::Indirect(expr) = callee {
                simplify(program, expr)?;
            }
            for &arg in program.exprs.get_list(args).to_vec().iter() {
                simplify(program, arg)?;
            }
        }
        ExprKind::ExprList { items } => {
            for &item in program.exprs.get_list(items).to_vec().iter() {
                simplify(program, item)?;
            }
        }
        ExprKind::AggregateInitializer { values } => {
            for &value in program.exprs.get_list(values).to_vec().iter() {
                simplify(program, value)?;
            }
        }
        ExprKind::GepExpr { indices } | ExprKind::ExtractValue { indices } => {
            for &link in program.exprs.get_list(indices).to_vec().iter() {
                simplify(program, link)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Overwrite `id`'s node with a copy of `source`'s kind, so every existing
/// reference to `id` transparently observes the simplified form without
/// needing to be rewritten.
fn collapse_into(program: &mut Program, id: ExprId, source: ExprId) {
    let new_kind = program.exprs.get(source).kind.clone();
    program.exprs.get_mut(id).kind = new_kind;
}

fn is_literal_zero(program: &Program, id: ExprId) -> bool {
    matches!(&program.exprs.get(id).kind, ExprKind::Value { name } if name == "0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bclift_ir::{Expr, ExprKind};

    #[test]
    fn double_negation_of_ref_and_deref_collapses() {
        let mut program = Program::new();
        let ty = program.types.intern_integer(32).unwrap();
        let ptr_ty = program.types.intern_pointer(ty);
        let x = program.add_ownership(Expr::new(ExprKind::Value { name: "x".to_string() }, ptr_ty));
        let deref = program.add_ownership(Expr::new(ExprKind::Deref { expr: x }, ty));
        let outer = program.add_ownership(Expr::new(ExprKind::Ref { expr: deref }, ptr_ty));

        simplify(&mut program, outer).unwrap();

        assert_eq!(program.exprs.get(outer).kind, ExprKind::Value { name: "x".to_string() });
    }

    #[test]
    fn pointer_shift_by_literal_zero_collapses_to_pointer() {
        let mut program = Program::new();
        let ty = program.types.intern_integer(8).unwrap();
        let ptr_ty = program.types.intern_pointer(ty);
        let pointer = program.add_ownership(Expr::new(ExprKind::Value { name: "var_p".to_string() }, ptr_ty));
        let offset = program.add_ownership(Expr::new(ExprKind::Value { name: "0".to_string() }, ty));
        let shift = program.add_ownership(Expr::new(
            ExprKind::PointerShift { pointer, offset, ptr_type: ptr_ty },
            ty,
        ));

        simplify(&mut program, shift).unwrap();

        assert_eq!(
            program.exprs.get(shift).kind,
            ExprKind::Value { name: "var_p".to_string() }
        );
    }
}
