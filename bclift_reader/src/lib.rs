//! Loads an LLVM bitcode or textual-IR file into the typed module graph the
//! Pass Pipeline (`bclift_passes`) walks.
//!
//! Grounded on the teacher's reader-adapter convention: a boundary crate
//! exists solely to turn an external parser's result into the fixed shape
//! downstream code expects, and nothing else (compare `sigil_lex`'s wrapping
//! of its hand-written scanner). Here the external parser is the real
//! `llvm-ir` crate (cdisselkoen), which already produces a well-typed
//! `Module`/`Function`/`Instruction` graph -- a second facade trait layer in
//! front of it would just be indirection, so this crate re-exports `llvm_ir`
//! directly and only adds the one thing it doesn't provide: folding a parse
//! failure into the workspace's `DecompileError` taxonomy.

use std::path::Path;

use bclift_diag::{DecompileError, DecompileResult};

pub use llvm_ir;

/// Load a module from a path, dispatching on extension: `.bc` is parsed as
/// bitcode, anything else (conventionally `.ll`) as textual IR.
pub fn load_module(path: &Path) -> DecompileResult<llvm_ir::Module> {
    let path_text = path.display().to_string();
    let is_bitcode = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("bc"))
        .unwrap_or(false);

    tracing::debug!(path = %path_text, bitcode = is_bitcode, "loading LLVM module");

    let result = if is_bitcode {
        llvm_ir::Module::from_bc_path(path)
    } else {
        llvm_ir::Module::from_ir_path(path)
    };

    result.map_err(|message| DecompileError::IrParse {
        path: path_text,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_ir_parse_error() {
        let err = load_module(Path::new("/nonexistent/does-not-exist.ll")).unwrap_err();
        assert!(matches!(err, DecompileError::IrParse { .. }));
    }
}
