//! Pass 2: walk every function's instructions in program order and build
//! the matching Expression IR node, per the per-instruction rules of §4.4.
//!
//! Grounded on the original llvm2c instruction-translation switch
//! (reconstructed from the distillation; the excerpt in `original_source/`
//! only keeps `Program.cpp`/the two later passes/`ExprWriter.cpp`, not the
//! instruction-building translation unit) and, for recursion safety, on
//! `bclift_stack::ensure_sufficient_stack` guarding the recursive operand
//! resolver the same way the corpus guards its own deep recursive walks.

use bclift_reader::llvm_ir::function::CallableValue;
use bclift_reader::llvm_ir::instruction::{
    Add, Alloca, And, AShr, BitCast, Call, ExtractValue, GetElementPtr, ICmp, ICmpPredicate, LShr, Load, Mul,
    Or, Phi, SDiv, SRem, Select, Shl, Store, Sub, UDiv, URem, Xor,
};
use bclift_reader::llvm_ir::terminator::Terminator;
use bclift_reader::llvm_ir::{BasicBlock, Constant, Function, Instruction, Module, Name, Operand};
use bclift_stack::ensure_sufficient_stack;

use bclift_diag::{DecompileError, DecompileResult};
use bclift_ir::{BlockId, CallTarget, CmpOp, Expr, ExprId, ExprKind, PassKind, Program};

use crate::types_bridge::{translate_type, TypeCache};
use crate::value_keys::ValueKeys;

/// Intrinsics whose calls are elided entirely rather than translated,
/// per §4.4 step 2 and the open-question note in §9 (debug, lifetime, and
/// invariant intrinsics are conservatively elided).
const ELIDED_INTRINSICS: &[&str] = &[
    "llvm.dbg.declare",
    "llvm.dbg.value",
    "llvm.lifetime.start",
    "llvm.lifetime.end",
    "llvm.invariant.start",
    "llvm.invariant.end",
];

/// A PHI node whose incoming values could not be resolved during the
/// single top-to-bottom walk (a back-edge predecessor may not have been
/// visited yet) and is deferred to `simplify_expressions`, which runs only
/// after every function's blocks are fully populated.
pub(crate) struct PendingPhi {
    pub(crate) func_name: String,
    pub(crate) slot: ExprId,
    pub(crate) incoming: Vec<(Name, Operand)>,
}

pub fn run(
    module: &Module,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
) -> DecompileResult<Vec<PendingPhi>> {
    program.require_pass(PassKind::CreateFunctions)?;

    let mut pending_phis = Vec::new();
    for func in &module.functions {
        ensure_sufficient_stack(|| translate_function(func, program, cache, keys, &mut pending_phis))?;
    }

    program.add_pass(PassKind::CreateExpressions)?;
    Ok(pending_phis)
}

fn translate_function(
    func: &Function,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
    pending_phis: &mut Vec<PendingPhi>,
) -> DecompileResult<()> {
    let func_id = program
        .get_function_by_name(&func.name)
        .expect("CreateFunctions registered every function by name");

    for (bb_index, bb) in func.basic_blocks.iter().enumerate() {
        let block_id = program.funcs.get(func_id).blocks[bb_index];
        for inst in &bb.instrs {
            translate_instruction(func, inst, program, cache, keys, block_id, pending_phis)?;
        }
        translate_terminator(func, bb, program, cache, keys, block_id)?;
    }
    Ok(())
}

fn push(program: &mut Program, block: BlockId, expr: ExprId) {
    program.blocks.get_mut(block).push(expr);
}

pub(crate) fn resolve_operand(
    func: &Function,
    operand: &Operand,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
) -> DecompileResult<ExprId> {
    match operand {
        Operand::LocalOperand { name, .. } => {
            let value_id = keys.local(&func.name, name);
            Ok(program
                .get_expr(value_id)
                .expect("every local value is defined before use in program order"))
        }
        Operand::ConstantOperand(constant) => {
            resolve_constant(&func.name, constant, program, cache, keys)
        }
        Operand::MetadataOperand => Err(DecompileError::UnsupportedFeature {
            feature: "metadata operand".to_string(),
            instruction: "<operand>".to_string(),
            function: func.name.clone(),
        }),
    }
}

/// Resolve a constant into an `Expr`. `context` names whichever function or
/// global the constant was found in, purely for error attribution -- a
/// constant expression never actually depends on an enclosing function.
pub(crate) fn resolve_constant(
    context: &str,
    constant: &Constant,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
) -> DecompileResult<ExprId> {
    match constant {
        Constant::Int { bits, value } => {
            let ty = program.types.intern_integer(*bits)?;
            Ok(program.add_ownership(Expr::new(
                ExprKind::Value {
                    name: value.to_string(),
                },
                ty,
            )))
        }
        Constant::Null(ty) | Constant::AggregateZero(ty) => {
            let translated = translate_type(program, cache, ty)?;
            Ok(program.add_ownership(Expr::new(
                ExprKind::Value { name: "0".to_string() },
                translated,
            )))
        }
        Constant::GlobalReference { name, ty } => {
            let translated = translate_type(program, cache, ty)?;
            let global_name = name.to_string().trim_start_matches('@').to_string();
            let value_id = keys.global(&global_name);
            match program.get_global_ref(value_id) {
                Some(expr) => Ok(expr),
                None => Ok(program.add_ownership(Expr::new(
                    ExprKind::GlobalValue { name: global_name },
                    translated,
                ))),
            }
        }
        other => Err(DecompileError::UnsupportedFeature {
            feature: format!("constant expression {other:?}"),
            instruction: "<constant>".to_string(),
            function: context.to_string(),
        }),
    }
}

/// Build and register a binary-operator node whose result type is the left
/// operand's (every binary instruction handled here is homogeneous: LLVM
/// requires both operands and the result to share one integer type).
fn arith<F>(
    func: &Function,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
    block: BlockId,
    dest: &Name,
    op0: &Operand,
    op1: &Operand,
    build: F,
) -> DecompileResult<()>
where
    F: FnOnce(ExprId, ExprId) -> ExprKind,
{
    let left = resolve_operand(func, op0, program, cache, keys)?;
    let right = resolve_operand(func, op1, program, cache, keys)?;
    let ty = program.exprs.get(left).ty;
    let expr = program.add_ownership(Expr::new(build(left, right), ty));
    let value_id = keys.local(&func.name, dest);
    program.add_expr(value_id, expr);
    push(program, block, expr);
    Ok(())
}

fn translate_instruction(
    func: &Function,
    inst: &Instruction,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
    block: BlockId,
    pending_phis: &mut Vec<PendingPhi>,
) -> DecompileResult<()> {
    match inst {
        Instruction::Alloca(Alloca {
            allocated_type,
            dest,
            ..
        }) => {
            let inner = translate_type(program, cache, allocated_type)?;
            let ptr_ty = program.types.intern_pointer(inner);
            let slot = program.add_ownership(Expr::new(
                ExprKind::Value {
                    name: format!("var_{dest}"),
                },
                inner,
            ));
            let alloc_expr = program.add_ownership(Expr::new(ExprKind::StackAlloc { slot }, ptr_ty));
            let value_id = keys.local(&func.name, dest);
            program.add_expr(value_id, slot);
            push(program, block, alloc_expr);
            Ok(())
        }

        Instruction::Load(Load { address, dest, .. }) => {
            let addr = resolve_operand(func, address, program, cache, keys)?;
            let pointee = pointee_type(program, program.exprs.get(addr).ty);
            let expr = program.add_ownership(Expr::new(ExprKind::Deref { expr: addr }, pointee));
            let value_id = keys.local(&func.name, dest);
            program.add_expr(value_id, expr);
            Ok(())
        }

        Instruction::ExtractValue(ExtractValue {
            aggregate,
            indices,
            dest,
            ..
        }) => {
            // Each index navigates one level into the aggregate, exactly
            // like a multi-index GEP's struct/array hops, except every
            // index here is always a compile-time constant.
            let mut current = resolve_operand(func, aggregate, program, cache, keys)?;
            let mut current_ty = program.exprs.get(current).ty;
            let mut chain = Vec::with_capacity(indices.len());
            for &index in indices {
                let field = usize::try_from(index).unwrap_or(0);
                current = match program.types.get(current_ty).clone() {
                    bclift_ir::Type::Struct { items, .. } | bclift_ir::Type::Union { items, .. } => {
                        let field_ty = items.get(field).map_or(current_ty, |(t, _)| *t);
                        let expr = program.add_ownership(Expr::new(
                            ExprKind::StructElement {
                                base: current,
                                struct_ty: current_ty,
                                field,
                            },
                            field_ty,
                        ));
                        current_ty = field_ty;
                        expr
                    }
                    bclift_ir::Type::Array { element, .. } => {
                        let idx_ty = program.types.intern_integer(32)?;
                        let idx = program.add_ownership(Expr::new(
                            ExprKind::Value { name: index.to_string() },
                            idx_ty,
                        ));
                        let expr = program.add_ownership(Expr::new(
                            ExprKind::ArrayElement { base: current, index: idx },
                            element,
                        ));
                        current_ty = element;
                        expr
                    }
                    _ => {
                        let idx_ty = program.types.intern_integer(32)?;
                        let idx = program.add_ownership(Expr::new(
                            ExprKind::Value { name: index.to_string() },
                            idx_ty,
                        ));
                        program.add_ownership(Expr::new(
                            ExprKind::ArrayElement { base: current, index: idx },
                            current_ty,
                        ))
                    }
                };
                chain.push(current);
            }
            let range = program.exprs.alloc_list(chain);
            let expr = program.add_ownership(Expr::new(ExprKind::ExtractValue { indices: range }, current_ty));
            let value_id = keys.local(&func.name, dest);
            program.add_expr(value_id, expr);
            Ok(())
        }

        Instruction::GetElementPtr(GetElementPtr {
            address,
            indices,
            dest,
            ..
        }) => translate_gep(func, address, indices, dest, program, cache, keys, block),

        Instruction::ICmp(ICmp {
            predicate,
            operand0,
            operand1,
            dest,
            ..
        }) => {
            let left = resolve_operand(func, operand0, program, cache, keys)?;
            let right = resolve_operand(func, operand1, program, cache, keys)?;
            let op = cmp_op(*predicate);
            let unsigned = is_unsigned_predicate(*predicate);
            let bool_ty = program.types.intern_integer(1)?;
            let expr = program.add_ownership(Expr::new(
                ExprKind::Cmp { left, right, op, unsigned },
                bool_ty,
            ));
            let value_id = keys.local(&func.name, dest);
            program.add_expr(value_id, expr);
            push(program, block, expr);
            Ok(())
        }

        Instruction::Shl(Shl { operand0, operand1, dest, .. }) => {
            arith(func, program, cache, keys, block, dest, operand0, operand1, |l, r| {
                ExprKind::Shl { left: l, right: r }
            })
        }

        Instruction::AShr(AShr { operand0, operand1, dest, .. }) => {
            arith(func, program, cache, keys, block, dest, operand0, operand1, |l, r| {
                ExprKind::Ashr { left: l, right: r }
            })
        }

        Instruction::LShr(LShr { operand0, operand1, dest, .. }) => {
            let left = resolve_operand(func, operand0, program, cache, keys)?;
            let right = resolve_operand(func, operand1, program, cache, keys)?;
            let left_was_signed = !matches!(
                program.types.get(program.exprs.get(left).ty),
                bclift_ir::Type::Integer { unsigned: true, .. }
            );
            let result_ty = program.exprs.get(left).ty;
            let expr = program.add_ownership(Expr::new(
                ExprKind::Lshr {
                    left,
                    right,
                    left_was_signed,
                },
                result_ty,
            ));
            let value_id = keys.local(&func.name, dest);
            program.add_expr(value_id, expr);
            push(program, block, expr);
            Ok(())
        }

        Instruction::Select(Select {
            condition,
            true_value,
            false_value,
            dest,
            ..
        }) => {
            let cmp = resolve_operand(func, condition, program, cache, keys)?;
            let left = resolve_operand(func, true_value, program, cache, keys)?;
            let right = resolve_operand(func, false_value, program, cache, keys)?;
            let ty = program.exprs.get(left).ty;
            let expr = program.add_ownership(Expr::new(ExprKind::Select { cmp, left, right }, ty));
            let value_id = keys.local(&func.name, dest);
            program.add_expr(value_id, expr);
            push(program, block, expr);
            Ok(())
        }

        Instruction::Store(Store { address, value, .. }) => {
            let addr = resolve_operand(func, address, program, cache, keys)?;
            let val = resolve_operand(func, value, program, cache, keys)?;
            let pointee = pointee_type(program, program.exprs.get(addr).ty);
            let lvalue = program.add_ownership(Expr::new(ExprKind::Deref { expr: addr }, pointee));
            let expr = program.add_ownership(Expr::new(
                ExprKind::AssignExpr {
                    left: lvalue,
                    right: val,
                },
                pointee,
            ));
            push(program, block, expr);
            Ok(())
        }

        Instruction::Phi(Phi {
            incoming_values,
            dest,
            to_type,
            ..
        }) => {
            let ty = translate_type(program, cache, to_type)?;
            let slot = program.add_ownership(Expr::new(
                ExprKind::Value {
                    name: format!("var_{dest}"),
                },
                ty,
            ));
            let value_id = keys.local(&func.name, dest);
            program.add_expr(value_id, slot);
            pending_phis.push(PendingPhi {
                func_name: func.name.clone(),
                slot,
                incoming: incoming_values
                    .iter()
                    .map(|(operand, block_name)| (block_name.clone(), operand.clone()))
                    .collect(),
            });
            Ok(())
        }

        Instruction::Call(call) => translate_call(func, call, program, cache, keys, block),

        Instruction::Add(Add { operand0, operand1, dest, .. }) => {
            arith(func, program, cache, keys, block, dest, operand0, operand1, |l, r| ExprKind::Add { left: l, right: r })
        }
        Instruction::Sub(Sub { operand0, operand1, dest, .. }) => {
            arith(func, program, cache, keys, block, dest, operand0, operand1, |l, r| ExprKind::Sub { left: l, right: r })
        }
        Instruction::Mul(Mul { operand0, operand1, dest, .. }) => {
            arith(func, program, cache, keys, block, dest, operand0, operand1, |l, r| ExprKind::Mul { left: l, right: r })
        }
        Instruction::UDiv(UDiv { operand0, operand1, dest, .. })
        | Instruction::SDiv(SDiv { operand0, operand1, dest, .. }) => {
            arith(func, program, cache, keys, block, dest, operand0, operand1, |l, r| ExprKind::Div { left: l, right: r })
        }
        Instruction::URem(URem { operand0, operand1, dest, .. })
        | Instruction::SRem(SRem { operand0, operand1, dest, .. }) => {
            arith(func, program, cache, keys, block, dest, operand0, operand1, |l, r| ExprKind::Rem { left: l, right: r })
        }
        Instruction::And(And { operand0, operand1, dest, .. }) => {
            arith(func, program, cache, keys, block, dest, operand0, operand1, |l, r| ExprKind::And { left: l, right: r })
        }
        Instruction::Or(Or { operand0, operand1, dest, .. }) => {
            arith(func, program, cache, keys, block, dest, operand0, operand1, |l, r| ExprKind::Or { left: l, right: r })
        }
        Instruction::Xor(Xor { operand0, operand1, dest, .. }) => {
            arith(func, program, cache, keys, block, dest, operand0, operand1, |l, r| ExprKind::Xor { left: l, right: r })
        }

        Instruction::BitCast(cast) => translate_bitcast(func, cast, program, cache, keys, block),
        Instruction::Trunc(cast) => {
            translate_cast(func, &cast.operand, &cast.to_type, &cast.dest, program, cache, keys, block)
        }
        Instruction::ZExt(cast) => {
            translate_cast(func, &cast.operand, &cast.to_type, &cast.dest, program, cache, keys, block)
        }
        Instruction::SExt(cast) => {
            translate_cast(func, &cast.operand, &cast.to_type, &cast.dest, program, cache, keys, block)
        }
        Instruction::PtrToInt(cast) => {
            translate_cast(func, &cast.operand, &cast.to_type, &cast.dest, program, cache, keys, block)
        }
        Instruction::IntToPtr(cast) => {
            translate_cast(func, &cast.operand, &cast.to_type, &cast.dest, program, cache, keys, block)
        }

        other => Err(DecompileError::UnsupportedFeature {
            feature: format!("{other:?}"),
            instruction: format!("{other:?}"),
            function: func.name.clone(),
        }),
    }
}

fn translate_cast(
    func: &Function,
    source: &Operand,
    to_type: &bclift_reader::llvm_ir::types::Type,
    dest: &Name,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
    block: BlockId,
) -> DecompileResult<()> {
    let inner = resolve_operand(func, source, program, cache, keys)?;
    let ty = translate_type(program, cache, to_type)?;
    let expr = program.add_ownership(Expr::new(ExprKind::Cast { expr: inner }, ty));
    let value_id = keys.local(&func.name, dest);
    program.add_expr(value_id, expr);
    push(program, block, expr);
    Ok(())
}

/// A `bitcast` between two differently-typed pointers is the aliasing
/// pattern `add_union` exists for: the same storage is about to be read
/// through a second, incompatible pointer type, so the cast's target
/// becomes a pointer to a fresh union of both pointee types rather than a
/// bare reinterpretation.
fn translate_bitcast(
    func: &Function,
    cast: &BitCast,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
    block: BlockId,
) -> DecompileResult<()> {
    let inner = resolve_operand(func, &cast.operand, program, cache, keys)?;
    let source_ty = program.exprs.get(inner).ty;
    let target_ty = translate_type(program, cache, &cast.to_type)?;
    let ty = bitcast_target_type(program, source_ty, target_ty);

    let expr = program.add_ownership(Expr::new(ExprKind::Cast { expr: inner }, ty));
    let value_id = keys.local(&func.name, &cast.dest);
    program.add_expr(value_id, expr);
    push(program, block, expr);
    Ok(())
}

/// The type a bitcast to `target_ty` actually carries: a pointer to a fresh
/// union of both pointee types when the bitcast aliases two distinct
/// pointer types, otherwise `target_ty` unchanged.
fn bitcast_target_type(program: &mut Program, source_ty: bclift_ir::TypeId, target_ty: bclift_ir::TypeId) -> bclift_ir::TypeId {
    match (program.types.get(source_ty).clone(), program.types.get(target_ty).clone()) {
        (
            bclift_ir::Type::Pointer { element: from_elem, .. },
            bclift_ir::Type::Pointer { element: to_elem, .. },
        ) if from_elem != to_elem => {
            let union_ty = program.add_union(&[from_elem, to_elem]);
            program.types.intern_pointer(union_ty)
        }
        _ => target_ty,
    }
}

fn cmp_op(predicate: ICmpPredicate) -> CmpOp {
    match predicate {
        ICmpPredicate::EQ => CmpOp::Eq,
        ICmpPredicate::NE => CmpOp::Ne,
        ICmpPredicate::ULT | ICmpPredicate::SLT => CmpOp::Lt,
        ICmpPredicate::ULE | ICmpPredicate::SLE => CmpOp::Le,
        ICmpPredicate::UGT | ICmpPredicate::SGT => CmpOp::Gt,
        ICmpPredicate::UGE | ICmpPredicate::SGE => CmpOp::Ge,
    }
}

/// Whether `predicate` is one of the `u`-prefixed unsigned variants (`EQ`/
/// `NE` carry no signedness of their own and are never unsigned here).
fn is_unsigned_predicate(predicate: ICmpPredicate) -> bool {
    matches!(
        predicate,
        ICmpPredicate::ULT | ICmpPredicate::ULE | ICmpPredicate::UGT | ICmpPredicate::UGE
    )
}

fn pointee_type(program: &Program, ptr_ty: bclift_ir::TypeId) -> bclift_ir::TypeId {
    match program.types.get(ptr_ty) {
        bclift_ir::Type::Pointer { element, .. } => *element,
        _ => ptr_ty,
    }
}

fn translate_gep(
    func: &Function,
    address: &Operand,
    indices: &[Operand],
    dest: &Name,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
    block: BlockId,
) -> DecompileResult<()> {
    let base = resolve_operand(func, address, program, cache, keys)?;

    if indices.len() == 1 {
        let offset = resolve_operand(func, &indices[0], program, cache, keys)?;
        let ptr_type = program.exprs.get(base).ty;
        let expr = program.add_ownership(Expr::new(
            ExprKind::PointerShift {
                pointer: base,
                offset,
                ptr_type,
            },
            pointee_type(program, ptr_type),
        ));
        let value_id = keys.local(&func.name, dest);
        program.add_expr(value_id, expr);
        push(program, block, expr);
        return Ok(());
    }

    // Multi-index GEP: the first index walks the pointee array/pointer
    // level (a whole-element offset, just like the single-index case
    // above -- only safe to drop when it's a literal zero, which
    // `simplify_expressions`'s `PointerShift`-by-zero collapse already
    // handles); every subsequent index walks into a struct field or array
    // element. Each hop is folded into a nested chain; only the final
    // chain link is ever printed (the Emitter reads the last entry of
    // `GepExpr::indices`).
    let ptr_type = program.exprs.get(base).ty;
    let first_offset = resolve_operand(func, &indices[0], program, cache, keys)?;
    let mut current = program.add_ownership(Expr::new(
        ExprKind::PointerShift {
            pointer: base,
            offset: first_offset,
            ptr_type,
        },
        ptr_type,
    ));
    let mut current_ty = pointee_type(program, ptr_type);
    let mut chain = vec![current];
    for index in &indices[1..] {
        match program.types.get(current_ty).clone() {
            bclift_ir::Type::Struct { items, .. } | bclift_ir::Type::Union { items, .. } => {
                let field = match index {
                    Operand::ConstantOperand(c) => match c.as_ref() {
                        Constant::Int { value, .. } => *value as usize,
                        _ => 0,
                    },
                    _ => 0,
                };
                let field_ty = items.get(field).map_or(current_ty, |(t, _)| *t);
                current = program.add_ownership(Expr::new(
                    ExprKind::StructElement {
                        base: current,
                        struct_ty: current_ty,
                        field,
                    },
                    field_ty,
                ));
                current_ty = field_ty;
            }
            bclift_ir::Type::Array { element, .. } => {
                let idx = resolve_operand(func, index, program, cache, keys)?;
                current = program.add_ownership(Expr::new(
                    ExprKind::ArrayElement { base: current, index: idx },
                    element,
                ));
                current_ty = element;
            }
            _ => {
                let idx = resolve_operand(func, index, program, cache, keys)?;
                current = program.add_ownership(Expr::new(
                    ExprKind::ArrayElement { base: current, index: idx },
                    current_ty,
                ));
            }
        }
        chain.push(current);
    }
    let range = program.exprs.alloc_list(chain);
    let gep = program.add_ownership(Expr::new(ExprKind::GepExpr { indices: range }, current_ty));
    let value_id = keys.local(&func.name, dest);
    program.add_expr(value_id, gep);
    push(program, block, gep);
    Ok(())
}

fn translate_call(
    func: &Function,
    call: &Call,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
    block: BlockId,
) -> DecompileResult<()> {
    let callee_name = match &call.function {
        Ok(CallableValue::Func(name)) => Some(name.clone()),
        _ => None,
    };

    if let Some(name) = &callee_name {
        if ELIDED_INTRINSICS.iter().any(|elided| name == elided) {
            return Ok(());
        }
        if name == "llvm.stacksave" || name == "llvm.stackrestore" {
            program.stack_ignored = true;
            return Ok(());
        }
    }

    let mut args = Vec::with_capacity(call.arguments.len());
    for (operand, _attrs) in &call.arguments {
        args.push(resolve_operand(func, operand, program, cache, keys)?);
    }

    if matches!(callee_name.as_deref(), Some("llvm.va_start") | Some("llvm.va_end")) {
        if let Some(first) = args.first_mut() {
            let void_ptr = program.types.intern_pointer(program.types.intern_void());
            *first = program.add_ownership(Expr::new(ExprKind::Cast { expr: *first }, void_ptr));
        }
    }

    let callee = match &call.function {
        Ok(CallableValue::Func(name)) => CallTarget::Direct(name.clone()),
        Ok(CallableValue::Operand(operand)) => {
            CallTarget::Indirect(resolve_operand(func, operand, program, cache, keys)?)
        }
        Err(_) => {
            return Err(DecompileError::UnsupportedFeature {
                feature: "inline assembly call target".to_string(),
                instruction: "call".to_string(),
                function: func.name.clone(),
            })
        }
    };

    let range = program.exprs.alloc_list(args);
    let void_ty = program.types.intern_void();
    let expr = program.add_ownership(Expr::new(ExprKind::CallExpr { callee, args: range }, void_ty));
    if let Some(dest) = &call.dest {
        let value_id = keys.local(&func.name, dest);
        program.add_expr(value_id, expr);
    }
    push(program, block, expr);
    Ok(())
}

fn translate_terminator(
    func: &Function,
    bb: &BasicBlock,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
    block: BlockId,
) -> DecompileResult<()> {
    match &bb.term {
        Terminator::Ret(ret) => {
            let value = match &ret.return_operand {
                Some(operand) => Some(resolve_operand(func, operand, program, cache, keys)?),
                None => None,
            };
            let void_ty = program.types.intern_void();
            let ty = value.map_or(void_ty, |v| program.exprs.get(v).ty);
            let expr = program.add_ownership(Expr::new(ExprKind::Ret { expr: value }, ty));
            push(program, block, expr);
            Ok(())
        }
        Terminator::Br(br) => {
            let target = block_id_for(func, program, &br.dest);
            let expr = program.add_ownership(Expr::new(
                ExprKind::GotoExpr { target },
                program.types.intern_void(),
            ));
            push(program, block, expr);
            Ok(())
        }
        Terminator::CondBr(cond) => {
            let cmp = resolve_operand(func, &cond.condition, program, cache, keys)?;
            let true_block = block_id_for(func, program, &cond.true_dest);
            let false_block = block_id_for(func, program, &cond.false_dest);
            let expr = program.add_ownership(Expr::new(
                ExprKind::IfExpr { cmp, true_block, false_block },
                program.types.intern_void(),
            ));
            push(program, block, expr);
            Ok(())
        }
        Terminator::Switch(switch) => {
            let cmp = resolve_operand(func, &switch.operand, program, cache, keys)?;
            let cases = switch
                .dests
                .iter()
                .map(|(value, dest)| {
                    let case_value = match value.as_ref() {
                        Constant::Int { value, .. } => *value as i64,
                        _ => 0,
                    };
                    (case_value, block_id_for(func, program, dest))
                })
                .collect();
            let default = Some(block_id_for(func, program, &switch.default_dest));
            let expr = program.add_ownership(Expr::new(
                ExprKind::SwitchExpr { cmp, cases, default },
                program.types.intern_void(),
            ));
            push(program, block, expr);
            Ok(())
        }
        Terminator::Unreachable(_) => Ok(()),
        other => Err(DecompileError::UnsupportedFeature {
            feature: format!("{other:?}"),
            instruction: "<terminator>".to_string(),
            function: func.name.clone(),
        }),
    }
}

pub(crate) fn block_id_for(func: &Function, program: &Program, name: &Name) -> BlockId {
    let index = func
        .basic_blocks
        .iter()
        .position(|bb| &bb.name == name)
        .expect("branch target names an existing basic block");
    let func_id = program
        .get_function_by_name(&func.name)
        .expect("CreateFunctions registered every function by name");
    program.funcs.get(func_id).blocks[index]
}

#[cfg(test)]
mod tests {
    use super::{bitcast_target_type, cmp_op, is_unsigned_predicate};
    use bclift_ir::{CmpOp, Program, Type};
    use bclift_reader::llvm_ir::instruction::ICmpPredicate;

    #[test]
    fn bitcast_between_differing_pointer_types_synthesizes_a_union() {
        let mut program = Program::new();
        let int_ty = program.types.intern_integer(32).unwrap();
        let float_ty = program.types.intern_floating(bclift_ir::FloatKind::Float);
        let int_ptr = program.types.intern_pointer(int_ty);
        let float_ptr = program.types.intern_pointer(float_ty);

        let result = bitcast_target_type(&mut program, int_ptr, float_ptr);

        match program.types.get(result) {
            Type::Pointer { element, .. } => {
                assert!(matches!(program.types.get(*element), Type::Union { .. }));
            }
            other => panic!("expected a pointer to a union, got {other:?}"),
        }
    }

    #[test]
    fn bitcast_to_the_same_pointer_type_is_a_plain_cast() {
        let mut program = Program::new();
        let int_ty = program.types.intern_integer(32).unwrap();
        let int_ptr = program.types.intern_pointer(int_ty);

        let result = bitcast_target_type(&mut program, int_ptr, int_ptr);

        assert_eq!(result, int_ptr);
    }

    #[test]
    fn signed_and_unsigned_predicates_share_the_same_c_operator() {
        assert_eq!(cmp_op(ICmpPredicate::ULT), CmpOp::Lt);
        assert_eq!(cmp_op(ICmpPredicate::SLT), CmpOp::Lt);
    }

    #[test]
    fn only_u_prefixed_predicates_are_flagged_unsigned() {
        assert!(is_unsigned_predicate(ICmpPredicate::ULT));
        assert!(is_unsigned_predicate(ICmpPredicate::UGE));
        assert!(!is_unsigned_predicate(ICmpPredicate::SLT));
        assert!(!is_unsigned_predicate(ICmpPredicate::EQ));
        assert!(!is_unsigned_predicate(ICmpPredicate::NE));
    }
}
