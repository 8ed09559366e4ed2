//! Pass 1: allocate a `Func`/`Block` skeleton for every LLVM function and a
//! `GlobalValue` for every global variable, before any instruction is
//! translated.
//!
//! Grounded on `core/Program.cpp`'s constructor loop (which walks
//! `module->functions()` and `module->globals()` up front to populate the
//! Program's lookup tables before the instruction-level passes run).

use bclift_diag::DecompileResult;
use bclift_ir::{Block, Func, GlobalValue, PassKind, Program};
use bclift_reader::llvm_ir::Module;

use crate::create_expressions::resolve_constant;
use crate::types_bridge::{translate_type, TypeCache};
use crate::value_keys::ValueKeys;

pub fn run(
    module: &Module,
    program: &mut Program,
    cache: &mut TypeCache,
    keys: &mut ValueKeys,
) -> DecompileResult<()> {
    for global in &module.global_vars {
        let ty = translate_type(program, cache, &global.ty)?;
        let name = global.name.to_string().trim_start_matches('@').to_string();
        let initializer = match &global.initializer {
            Some(init) => Some(resolve_constant(&name, init.as_ref(), program, cache, keys)?),
            None => None,
        };
        let global_value = GlobalValue::new(name, ty, initializer);
        let value_id = keys.global(&global_value.name);
        let reference = program.add_ownership(bclift_ir::Expr::new(
            bclift_ir::ExprKind::GlobalValue {
                name: global_value.name.clone(),
            },
            ty,
        ));
        program.add_global(global_value, value_id, reference);
    }

    for func in &module.functions {
        let ret = translate_type(program, cache, &func.return_type)?;
        let mut params = Vec::with_capacity(func.parameters.len());
        for (i, param) in func.parameters.iter().enumerate() {
            let param_ty = translate_type(program, cache, &param.ty)?;
            let name = format!("var{i}");
            let value = program.add_ownership(bclift_ir::Expr::new(
                bclift_ir::ExprKind::Value { name },
                param_ty,
            ));
            let value_id = keys.local(&func.name, &param.name);
            program.add_expr(value_id, value);
            params.push((param_ty, value));
        }

        let mut translated = Func::new(func.name.clone(), ret, params, func.is_var_arg);
        if func.is_var_arg {
            program.has_var_arg = true;
        }
        for bb in &func.basic_blocks {
            let label = block_label(&func.name, bb);
            let block_id = program.alloc_block(Block::new(label));
            translated.blocks.push(block_id);
        }
        program.add_function(translated);
    }

    for decl in &module.func_declarations {
        let ret = translate_type(program, cache, &decl.return_type)?;
        let mut params = Vec::with_capacity(decl.parameters.len());
        for (i, param) in decl.parameters.iter().enumerate() {
            let param_ty = translate_type(program, cache, &param.ty)?;
            let name = format!("var{i}");
            let value = program.add_ownership(bclift_ir::Expr::new(
                bclift_ir::ExprKind::Value { name },
                param_ty,
            ));
            params.push((param_ty, value));
        }
        let mut translated = Func::new(decl.name.clone(), ret, params, decl.is_var_arg);
        translated.is_declaration = true;
        let id = program.add_function(translated);
        program.declarations.push(id);
    }

    program.add_pass(PassKind::CreateFunctions)
}

pub fn block_label(func_name: &str, bb: &bclift_reader::llvm_ir::BasicBlock) -> String {
    format!("{func_name}_{}", bb.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bclift_ir::ExprKind;
    use bclift_reader::llvm_ir::Constant;

    #[test]
    fn block_labels_are_function_scoped() {
        let name_a = "f";
        let name_b = "g";
        assert_ne!(
            format!("{name_a}_bb0"),
            format!("{name_b}_bb0"),
        );
    }

    /// Exercises the exact call `run`'s global-processing loop makes:
    /// a global's `Some(initializer)` constant must translate into a real
    /// expression rather than being dropped on the floor.
    #[test]
    fn global_initializer_constant_translates_to_a_value() {
        let mut program = Program::new();
        let mut cache = TypeCache::new();
        let mut keys = ValueKeys::new();

        let initializer = Constant::Int { bits: 32, value: 0 };
        let expr = resolve_constant("c", &initializer, &mut program, &mut cache, &mut keys).unwrap();

        assert_eq!(
            program.exprs.get(expr).kind,
            ExprKind::Value { name: "0".to_string() }
        );
    }
}
