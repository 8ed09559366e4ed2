//! Pass 6: elide an `alloca` that exists only to be immediately stored
//! into and never read (§4.4 step 6, scenario 6).
//!
//! Grounded on `parser/deleteUnusedVariables.cpp`: the original walks each
//! `alloca`'s LLVM use-list and checks `hasOneUse()` against a single
//! `StoreInst` target. The `llvm-ir` crate keeps no use-list (an
//! instruction doesn't know its users), so this pass reconstructs the same
//! fact by a linear scan: count how many operands across the function
//! reference the alloca's `Name`, and confirm the lone reference is a
//! `Store`'s address operand (not its stored value, which would mean the
//! pointer escapes).

use bclift_reader::llvm_ir::instruction::Store;
use bclift_reader::llvm_ir::{Instruction, Module, Name, Operand};

use bclift_diag::DecompileResult;
use bclift_ir::{BlockId, ExprId, ExprKind, PassKind, Program};

use crate::value_keys::ValueKeys;

pub fn run(module: &Module, program: &mut Program, keys: &mut ValueKeys) -> DecompileResult<()> {
    program.require_pass(PassKind::CreateExpressions)?;

    for func in &module.functions {
        let func_id = program
            .get_function_by_name(&func.name)
            .expect("CreateFunctions registered every function by name");
        let block_ids = program.funcs.get(func_id).blocks.clone();

        let all_instructions: Vec<&Instruction> = func
            .basic_blocks
            .iter()
            .flat_map(|bb| bb.instrs.iter())
            .collect();

        for bb in &func.basic_blocks {
            for inst in &bb.instrs {
                let Instruction::Alloca(alloca) = inst else {
                    continue;
                };
                let dest = &alloca.dest;

                let references: Vec<&Instruction> = all_instructions
                    .iter()
                    .copied()
                    .filter(|candidate| !std::ptr::eq(*candidate, inst))
                    .filter(|candidate| references_name(candidate, dest))
                    .collect();

                let [Instruction::Store(store)] = references.as_slice() else {
                    continue;
                };
                if !is_address_operand(store, dest) || stores_itself(store, dest) {
                    continue;
                }

                let value_id = keys.local(&func.name, dest);
                let Some(slot) = program.get_expr(value_id) else {
                    continue;
                };
                remove_stack_alloc(program, &block_ids, slot);
                remove_assign_to_slot(program, &block_ids, slot);
            }
        }
    }

    program.add_pass(PassKind::DeleteUnusedVariables)
}

fn references_name(inst: &Instruction, name: &Name) -> bool {
    operand_names(inst).into_iter().any(|n| n == name)
}

fn is_address_operand(store: &Store, name: &Name) -> bool {
    matches!(&store.address, Operand::LocalOperand { name: n, .. } if n == name)
}

fn stores_itself(store: &Store, name: &Name) -> bool {
    matches!(&store.value, Operand::LocalOperand { name: n, .. } if n == name)
}

/// Every `Name` referenced by an instruction's operands (not its own
/// destination binding).
fn operand_names(inst: &Instruction) -> Vec<&Name> {
    use Instruction as I;
    let mut names = Vec::new();
    let mut push = |op: &'_ Operand, out: &mut Vec<&Name>| {
        if let Operand::LocalOperand { name, .. } = op {
            out.push(name);
        }
    };
    match inst {
        I::Add(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::Sub(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::Mul(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::UDiv(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::SDiv(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::URem(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::SRem(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::And(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::Or(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::Xor(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::Shl(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::LShr(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::AShr(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::Load(i) => push(&i.address, &mut names),
        I::Store(i) => { push(&i.address, &mut names); push(&i.value, &mut names); }
        I::GetElementPtr(i) => {
            push(&i.address, &mut names);
            for idx in &i.indices {
                push(idx, &mut names);
            }
        }
        I::ICmp(i) => { push(&i.operand0, &mut names); push(&i.operand1, &mut names); }
        I::Select(i) => {
            push(&i.condition, &mut names);
            push(&i.true_value, &mut names);
            push(&i.false_value, &mut names);
        }
        I::Phi(i) => {
            for (op, _) in &i.incoming_values {
                push(op, &mut names);
            }
        }
        I::Call(i) => {
            for (op, _) in &i.arguments {
                push(op, &mut names);
            }
        }
        I::ExtractValue(i) => push(&i.aggregate, &mut names),
        I::BitCast(i) => push(&i.operand, &mut names),
        I::Trunc(i) => push(&i.operand, &mut names),
        I::ZExt(i) => push(&i.operand, &mut names),
        I::SExt(i) => push(&i.operand, &mut names),
        I::PtrToInt(i) => push(&i.operand, &mut names),
        I::IntToPtr(i) => push(&i.operand, &mut names),
        _ => {}
    }
    names
}

fn remove_stack_alloc(program: &mut Program, block_ids: &[BlockId], slot: ExprId) {
    for &block_id in block_ids {
        let target = program
            .blocks
            .get(block_id)
            .expressions
            .iter()
            .copied()
            .find(|&e| matches!(program.exprs.get(e).kind, ExprKind::StackAlloc { slot: s } if s == slot));
        if let Some(expr) = target {
            program.blocks.get_mut(block_id).remove(expr);
            return;
        }
    }
}

fn remove_assign_to_slot(program: &mut Program, block_ids: &[BlockId], slot: ExprId) {
    for &block_id in block_ids {
        let target = program.blocks.get(block_id).expressions.iter().copied().find(|&e| {
            matches!(
                &program.exprs.get(e).kind,
                ExprKind::AssignExpr { left, .. }
                    if matches!(program.exprs.get(*left).kind, ExprKind::Deref { expr } if expr == slot)
            )
        });
        if let Some(expr) = target {
            program.blocks.get_mut(block_id).remove(expr);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bclift_ir::{Block, Expr, Func};

    #[test]
    fn removes_stack_alloc_and_its_sole_store() {
        let mut program = Program::new();
        let int_ty = program.types.intern_integer(32).unwrap();
        let ptr_ty = program.types.intern_pointer(int_ty);

        let slot = program.add_ownership(Expr::new(ExprKind::Value { name: "var_t".to_string() }, int_ty));
        let alloc = program.add_ownership(Expr::new(ExprKind::StackAlloc { slot }, ptr_ty));
        let seven = program.add_ownership(Expr::new(ExprKind::Value { name: "7".to_string() }, int_ty));
        let lvalue = program.add_ownership(Expr::new(ExprKind::Deref { expr: slot }, int_ty));
        let assign = program.add_ownership(Expr::new(
            ExprKind::AssignExpr { left: lvalue, right: seven },
            int_ty,
        ));

        let block_id = program.alloc_block(Block::new("f_entry".to_string()));
        program.blocks.get_mut(block_id).push(alloc);
        program.blocks.get_mut(block_id).push(assign);

        let mut func = Func::new("f".to_string(), int_ty, Vec::new(), false);
        func.blocks.push(block_id);
        program.add_function(func);

        remove_stack_alloc(&mut program, &[block_id], slot);
        remove_assign_to_slot(&mut program, &[block_id], slot);

        assert!(program.blocks.get(block_id).expressions.is_empty());
    }
}
