//! Pass 8: reset every global's `init_emitted` flag right before emission
//! (§4.4 step 8).
//!
//! A `Program` can be emitted more than once (e.g. the CLI driver emitting
//! to stdout for a preview and then again to the `-o` file), and a global's
//! initializer must only be printed the first time that global is touched
//! by the emitter's per-global walk. Resetting the flag here rather than in
//! the emitter itself keeps `bclift_emit` a pure read of `Program` state,
//! with `Program` mutation confined to the pass pipeline.

use bclift_diag::DecompileResult;
use bclift_ir::{PassKind, Program};

pub fn run(program: &mut Program) -> DecompileResult<()> {
    program.require_pass(PassKind::RefDeref)?;

    for global in &mut program.globals {
        global.init_emitted = false;
    }

    program.add_pass(PassKind::EmitPrepass)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resets_already_emitted_flag() {
        let mut program = Program::new();
        program.globals.push(bclift_ir::GlobalValue {
            name: "g".to_string(),
            ty: program.types.intern_integer(32).unwrap(),
            initializer: None,
            init_emitted: true,
        });

        program.add_pass(PassKind::CreateFunctions).unwrap();
        program.add_pass(PassKind::CreateExpressions).unwrap();
        program.add_pass(PassKind::FindMetadataFunctionNames).unwrap();
        program.add_pass(PassKind::BlockLayout).unwrap();
        program.add_pass(PassKind::SimplifyExpressions).unwrap();
        program.add_pass(PassKind::DeleteUnusedVariables).unwrap();
        program.add_pass(PassKind::RefDeref).unwrap();

        run(&mut program).unwrap();

        assert!(!program.globals[0].init_emitted);
    }
}
