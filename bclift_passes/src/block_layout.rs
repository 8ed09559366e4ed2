//! Pass 4: decide which blocks print as an inline continuation of their
//! predecessor versus a labeled `goto` target (§4.4 step 4).
//!
//! A block inlines when it has exactly one predecessor within its function
//! and is not itself the target of any `SwitchExpr` case/default (a switch
//! always needs its targets addressable by label, even a single-predecessor
//! one, so the emitter's case bodies read like ordinary C `case` blocks
//! rather than falling through to a goto). Grounded on the Emitter's own
//! `goto_or_inline` contract (§4.5): every caller already treats
//! `do_inline` as the single source of truth, so this pass only has to
//! populate it correctly once.

use rustc_hash::{FxHashMap, FxHashSet};

use bclift_diag::DecompileResult;
use bclift_ir::{BlockId, ExprKind, PassKind, Program};

pub fn run(program: &mut Program) -> DecompileResult<()> {
    program.require_pass(PassKind::CreateExpressions)?;

    let mut predecessor_count: FxHashMap<BlockId, u32> = FxHashMap::default();
    let mut switch_targets: FxHashSet<BlockId> = FxHashSet::default();

    for (_, func) in program.funcs.iter() {
        for &block_id in &func.blocks {
            let block = program.blocks.get(block_id);
            for &expr_id in &block.expressions {
                match &program.exprs.get(expr_id).kind {
                    ExprKind::GotoExpr { target } => {
                        *predecessor_count.entry(*target).or_insert(0) += 1;
                    }
                    ExprKind::IfExpr { true_block, false_block, .. } => {
                        *predecessor_count.entry(*true_block).or_insert(0) += 1;
                        *predecessor_count.entry(*false_block).or_insert(0) += 1;
                    }
                    ExprKind::SwitchExpr { cases, default, .. } => {
                        for &(_, target) in cases {
                            *predecessor_count.entry(target).or_insert(0) += 1;
                            switch_targets.insert(target);
                        }
                        if let Some(target) = default {
                            *predecessor_count.entry(*target).or_insert(0) += 1;
                            switch_targets.insert(*target);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    for (_, func) in program.funcs.iter() {
        for (i, &block_id) in func.blocks.iter().enumerate() {
            // A function's entry block is always reached by fallthrough,
            // never by an explicit goto, so it has no recorded predecessor
            // count but must never be treated as inlinable into whatever
            // happened to run before it.
            let count = predecessor_count.get(&block_id).copied().unwrap_or(0);
            let inline = i != 0 && count == 1 && !switch_targets.contains(&block_id);
            program.blocks.get_mut(block_id).do_inline = inline;
        }
    }

    program.add_pass(PassKind::BlockLayout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bclift_ir::{Block, Expr, Func};

    #[test]
    fn single_predecessor_non_switch_target_inlines() {
        let mut program = Program::new();
        let ret_ty = program.types.intern_void();
        let entry = program.alloc_block(Block::new("f_entry".to_string()));
        let tail = program.alloc_block(Block::new("f_tail".to_string()));

        let goto = program.add_ownership(Expr::new(ExprKind::GotoExpr { target: tail }, ret_ty));
        program.blocks.get_mut(entry).push(goto);

        let mut func = Func::new("f".to_string(), ret_ty, Vec::new(), false);
        func.blocks.push(entry);
        func.blocks.push(tail);
        program.add_function(func);

        program.add_pass(PassKind::CreateFunctions).unwrap();
        program.add_pass(PassKind::CreateExpressions).unwrap();
        run(&mut program).unwrap();

        assert!(!program.blocks.get(entry).do_inline);
        assert!(program.blocks.get(tail).do_inline);
    }

    #[test]
    fn switch_target_never_inlines_even_with_one_predecessor() {
        let mut program = Program::new();
        let void_ty = program.types.intern_void();
        let int_ty = program.types.intern_integer(32).unwrap();
        let entry = program.alloc_block(Block::new("f_entry".to_string()));
        let case_block = program.alloc_block(Block::new("f_case".to_string()));

        let cmp = program.add_ownership(Expr::new(ExprKind::Value { name: "var0".to_string() }, int_ty));
        let switch = program.add_ownership(Expr::new(
            ExprKind::SwitchExpr {
                cmp,
                cases: vec![(1, case_block)],
                default: None,
            },
            void_ty,
        ));
        program.blocks.get_mut(entry).push(switch);

        let mut func = Func::new("f".to_string(), void_ty, Vec::new(), false);
        func.blocks.push(entry);
        func.blocks.push(case_block);
        program.add_function(func);

        program.add_pass(PassKind::CreateFunctions).unwrap();
        program.add_pass(PassKind::CreateExpressions).unwrap();
        run(&mut program).unwrap();

        assert!(!program.blocks.get(case_block).do_inline);
    }
}
