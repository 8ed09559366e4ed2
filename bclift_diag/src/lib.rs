//! Error taxonomy for the LLVM-IR-to-C decompiler core.
//!
//! The core has no source spans to report against — LLVM IR instructions,
//! not source text, are the unit of diagnosis — so this is deliberately
//! lighter than a full `Diagnostic`/`Suggestion` builder: one variant family
//! per row of the error taxonomy, grouped by which pass or component raised
//! it.

use thiserror::Error;

/// All ways a decompilation can fail.
///
/// Name collisions (synthesized name vs. a metadata-recovered name) are
/// *not* a variant here: the taxonomy resolves them by regenerating with the
/// next counter and logging a warning, not by aborting. See
/// `bclift_passes::metadata` for where that warning is emitted.
#[derive(Debug, Error)]
pub enum DecompileError {
    /// The external IR reader rejected the input file.
    #[error("failed to parse LLVM IR from '{path}': {message}")]
    IrParse { path: String, message: String },

    /// The input uses an LLVM IR feature outside the supported subset
    /// (exception-handling intrinsics, SIMD vectors beyond element-wise,
    /// coroutine intrinsics, ...).
    #[error("unsupported IR feature '{feature}' in instruction `{instruction}` of function @{function}")]
    UnsupportedFeature {
        feature: String,
        instruction: String,
        function: String,
    },

    /// A pass ran before one of its declared prerequisites completed. This
    /// is always an implementation bug in pass ordering, never user input.
    #[error("pass '{pass}' requires '{missing}' to have completed first")]
    PassPrecondition {
        pass: &'static str,
        missing: &'static str,
    },

    /// The Type Translator was asked to translate a type outside the
    /// supported subset (e.g. a zero-width integer).
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
}

/// Process exit code for a given error, per the §6 exit-code policy:
/// 0 on success, nonzero on IR-parse failure or pass-precondition violation.
impl DecompileError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            DecompileError::IrParse { .. } => 1,
            DecompileError::UnsupportedFeature { .. } | DecompileError::UnsupportedType(_) => 2,
            DecompileError::PassPrecondition { .. } => 70, // EX_SOFTWARE: internal invariant
        }
    }
}

pub type DecompileResult<T> = Result<T, DecompileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exit_codes_match_taxonomy_policy() {
        let parse = DecompileError::IrParse {
            path: "a.ll".into(),
            message: "bad token".into(),
        };
        assert_eq!(parse.exit_code(), 1);

        let precond = DecompileError::PassPrecondition {
            pass: "DeleteUnusedVariables",
            missing: "CreateExpressions",
        };
        assert_eq!(precond.exit_code(), 70);
    }

    #[test]
    fn display_names_the_offending_instruction_and_function() {
        let err = DecompileError::UnsupportedFeature {
            feature: "coroutine intrinsic".into(),
            instruction: "llvm.coro.begin".into(),
            function: "f".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("llvm.coro.begin"));
        assert!(msg.contains("@f"));
    }
}
