//! The ordered translation pass pipeline (§4.4): turns a loaded
//! `llvm_ir::Module` into a fully populated `bclift_ir::Program`, ready for
//! `bclift_emit`.
//!
//! Each pass is grounded on a distinct translation unit of the original
//! llvm2c tool and enforces its prerequisite via `Program::require_pass`,
//! so running them out of order fails fast with a `DecompileError` rather
//! than silently producing a half-translated `Program`.

mod block_layout;
mod create_expressions;
mod create_functions;
mod delete_unused_variables;
mod emit_prepass;
mod find_metadata_function_names;
mod ref_deref;
mod simplify_expressions;
mod types_bridge;
mod value_keys;

pub use types_bridge::TypeCache;
pub use value_keys::ValueKeys;

use bclift_diag::DecompileResult;
use bclift_ir::Program;
use bclift_reader::llvm_ir::Module;
use tracing::debug;

/// Run every pass over `module` in prerequisite order and return the
/// populated `Program`.
pub fn translate_module(module: &Module) -> DecompileResult<Program> {
    let mut program = Program::new();
    let mut cache = TypeCache::new();
    let mut keys = ValueKeys::new();

    debug!(functions = module.functions.len(), "create_functions");
    create_functions::run(module, &mut program, &mut cache, &mut keys)?;

    debug!("create_expressions");
    let pending_phis = create_expressions::run(module, &mut program, &mut cache, &mut keys)?;

    debug!("find_metadata_function_names");
    find_metadata_function_names::run(module, &mut program)?;

    debug!("block_layout");
    block_layout::run(&mut program)?;

    debug!(pending_phis = pending_phis.len(), "simplify_expressions");
    simplify_expressions::run(module, &mut program, &mut cache, &mut keys, pending_phis)?;

    debug!("delete_unused_variables");
    delete_unused_variables::run(module, &mut program, &mut keys)?;

    debug!("ref_deref");
    ref_deref::run(&mut program)?;

    debug!("emit_prepass");
    emit_prepass::run(&mut program)?;

    Ok(program)
}
