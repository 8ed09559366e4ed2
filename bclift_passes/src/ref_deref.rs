//! Pass 7: choose `.` vs `->` for every struct/union field access, and
//! make a final sweep eliding any address-of/deref pair `SimplifyExpressions`
//! left behind (§4.4 step 7).
//!
//! `CreateExpressions` always builds a GEP's field-access chain as
//! `StructElement` nodes (§ translate_gep), since it only knows the type
//! structure being walked, not whether the base handle at each hop is a raw
//! pointer. That distinction only becomes decidable once every earlier
//! pass (in particular `SimplifyExpressions`, which can change a base
//! expression's effective shape) has run: a `StructElement` whose `base`
//! evaluates to a pointer type is rewritten in place to `ArrowExpr` here,
//! matching ordinary C usage (`p->f` for a pointer, `s.f` for a value).

use bclift_ir::{BlockId, ExprId, ExprKind, PassKind, Program, Type};

pub fn run(program: &mut Program) -> bclift_diag::DecompileResult<()> {
    program.require_pass(PassKind::SimplifyExpressions)?;

    let block_ids: Vec<BlockId> = program
        .funcs
        .iter()
        .flat_map(|(_, func)| func.blocks.iter().copied())
        .collect();

    for block_id in block_ids {
        let items = program.blocks.get(block_id).expressions.clone();
        for id in items {
            normalize(program, id);
        }
    }

    program.add_pass(PassKind::RefDeref)
}

fn normalize(program: &mut Program, id: ExprId) {
    match program.exprs.get(id).kind.clone() {
        ExprKind::StructElement { base, struct_ty, field } => {
            normalize(program, base);
            if is_pointer(program, base) {
                program.exprs.get_mut(id).kind = ExprKind::ArrowExpr { base, struct_ty, field };
            }
        }
        ExprKind::ArrowExpr { base, .. } => normalize(program, base),
        ExprKind::Ref { expr } => {
            normalize(program, expr);
            if let ExprKind::Deref { expr: inner } = program.exprs.get(expr).kind {
                let kind = program.exprs.get(inner).kind.clone();
                program.exprs.get_mut(id).kind = kind;
            }
        }
        ExprKind::Deref { expr } => {
            normalize(program, expr);
            if let ExprKind::Ref { expr: inner } = program.exprs.get(expr).kind {
                let kind = program.exprs.get(inner).kind.clone();
                program.exprs.get_mut(id).kind = kind;
            }
        }
        ExprKind::Cast { expr } => normalize(program, expr),
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
            normalize(program, left);
            normalize(program, right);
        }
        ExprKind::Lshr { left, right, .. } => {
            normalize(program, left);
            normalize(program, right);
        }
        ExprKind::PointerShift { pointer, offset, .. } => {
            normalize(program, pointer);
            normalize(program, offset);
        }
        ExprKind::Select { cmp, left, right } => {
            normalize(program, cmp);
            normalize(program, left);
            normalize(program, right);
        }
        ExprKind::Ret { expr: Some(expr) } => normalize(program, expr),
        ExprKind::IfExpr { cmp, .. } | ExprKind::SwitchExpr { cmp, .. } => normalize(program, cmp),
        ExprKind::CallExpr { callee, args } => {
            if let bclift_ir::CallTarget::Indirect(expr) = callee {
                normalize(program, expr);
            }
            for arg in program.exprs.get_list(args).to_vec() {
                normalize(program, arg);
            }
        }
        ExprKind::ExprList { items } => {
            for item in program.exprs.get_list(items).to_vec() {
                normalize(program, item);
            }
        }
        ExprKind::AggregateInitializer { values } => {
            for value in program.exprs.get_list(values).to_vec() {
                normalize(program, value);
            }
        }
        ExprKind::GepExpr { indices } | ExprKind::ExtractValue { indices } => {
            for link in program.exprs.get_list(indices).to_vec() {
                normalize(program, link);
            }
        }
        _ => {}
    }
}

fn is_pointer(program: &Program, id: ExprId) -> bool {
    matches!(program.types.get(program.exprs.get(id).ty), Type::Pointer { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bclift_ir::Expr;

    #[test]
    fn pointer_base_struct_access_becomes_arrow() {
        let mut program = Program::new();
        let int_ty = program.types.intern_integer(32).unwrap();
        let struct_ty = program.types.create_new_unnamed_struct(vec![(int_ty, "f0".to_string())]);
        let ptr_ty = program.types.intern_pointer(struct_ty);

        let base = program.add_ownership(Expr::new(ExprKind::Value { name: "var_p".to_string() }, ptr_ty));
        let access = program.add_ownership(Expr::new(
            ExprKind::StructElement { base, struct_ty, field: 0 },
            int_ty,
        ));

        normalize(&mut program, access);

        assert!(matches!(program.exprs.get(access).kind, ExprKind::ArrowExpr { .. }));
    }

    #[test]
    fn value_base_struct_access_stays_dot() {
        let mut program = Program::new();
        let int_ty = program.types.intern_integer(32).unwrap();
        let struct_ty = program.types.create_new_unnamed_struct(vec![(int_ty, "f0".to_string())]);

        let base = program.add_ownership(Expr::new(ExprKind::Value { name: "var_s".to_string() }, struct_ty));
        let access = program.add_ownership(Expr::new(
            ExprKind::StructElement { base, struct_ty, field: 0 },
            int_ty,
        ));

        normalize(&mut program, access);

        assert!(matches!(program.exprs.get(access).kind, ExprKind::StructElement { .. }));
    }
}
