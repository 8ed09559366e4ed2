//! Pass 3: recover variable names the source language chose (surfaced by
//! the frontend as debug-info metadata) so the synthesized `var<N>` naming
//! scheme in later passes never collides with one of them.
//!
//! Grounded on `parser/findMetadataFunctionNames.cpp`: the original walks
//! every `llvm.dbg.declare` call in a function, pulls the `DILocalVariable`
//! name out of its metadata operand, and registers every name matching
//! `var[0-9]+` against the function (plus every global variable's name, so
//! a synthesized local never shadows a global either). The `llvm-ir` crate
//! does not expose the metadata a `llvm.dbg.declare` call's second argument
//! points to -- `Operand::MetadataOperand` carries no payload -- so this
//! pass substitutes the next best source of the same information: it scans
//! the function's own named (non-numbered) `Name`s, which is where a
//! frontend that emits `var0`, `var1`, ... debug names also tends to emit
//! matching IR-level names when `-g` is used without `-fomit-frame-pointer`
//! stripping them.

use rustc_hash::FxHashSet;

use bclift_diag::DecompileResult;
use bclift_ir::{PassKind, Program};
use bclift_reader::llvm_ir::{Module, Name};

fn matches_var_pattern(name: &str) -> bool {
    let Some(digits) = name.strip_prefix("var") else {
        return false;
    };
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

pub fn run(module: &Module, program: &mut Program) -> DecompileResult<()> {
    program.require_pass(PassKind::CreateFunctions)?;

    let global_names: FxHashSet<String> = program.global_var_names().clone();

    for func in &module.functions {
        let func_id = program
            .get_function_by_name(&func.name)
            .expect("CreateFunctions registered every function by name");
        let translated = program.funcs.get_mut(func_id);

        for name in &global_names {
            translated.add_metadata_var_name(name.clone());
        }

        for param in &func.parameters {
            if let Name::Name(text) = &param.name {
                if matches_var_pattern(text) {
                    translated.add_metadata_var_name(text.to_string());
                }
            }
        }
        for bb in &func.basic_blocks {
            for inst in &bb.instrs {
                if let Some(Name::Name(text)) = instruction_dest(inst) {
                    if matches_var_pattern(text) {
                        translated.add_metadata_var_name(text.to_string());
                    }
                }
            }
        }
    }

    program.add_pass(PassKind::FindMetadataFunctionNames)
}

/// The destination `Name` an instruction assigns, if any (terminators and
/// void-typed instructions like `Store`/`Call`-to-void have none).
fn instruction_dest(inst: &bclift_reader::llvm_ir::Instruction) -> Option<&Name> {
    use bclift_reader::llvm_ir::Instruction as I;
    match inst {
        I::Add(i) => Some(&i.dest),
        I::Sub(i) => Some(&i.dest),
        I::Mul(i) => Some(&i.dest),
        I::UDiv(i) => Some(&i.dest),
        I::SDiv(i) => Some(&i.dest),
        I::URem(i) => Some(&i.dest),
        I::SRem(i) => Some(&i.dest),
        I::And(i) => Some(&i.dest),
        I::Or(i) => Some(&i.dest),
        I::Xor(i) => Some(&i.dest),
        I::Shl(i) => Some(&i.dest),
        I::LShr(i) => Some(&i.dest),
        I::AShr(i) => Some(&i.dest),
        I::Alloca(i) => Some(&i.dest),
        I::Load(i) => Some(&i.dest),
        I::GetElementPtr(i) => Some(&i.dest),
        I::ICmp(i) => Some(&i.dest),
        I::Select(i) => Some(&i.dest),
        I::Phi(i) => Some(&i.dest),
        I::ExtractValue(i) => Some(&i.dest),
        I::BitCast(i) => Some(&i.dest),
        I::Trunc(i) => Some(&i.dest),
        I::ZExt(i) => Some(&i.dest),
        I::SExt(i) => Some(&i.dest),
        I::PtrToInt(i) => Some(&i.dest),
        I::IntToPtr(i) => Some(&i.dest),
        I::Call(i) => i.dest.as_ref(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::matches_var_pattern;

    #[test]
    fn recognizes_var_followed_by_digits_only() {
        assert!(matches_var_pattern("var0"));
        assert!(matches_var_pattern("var42"));
        assert!(!matches_var_pattern("variable"));
        assert!(!matches_var_pattern("var"));
        assert!(!matches_var_pattern("xvar1"));
    }
}
