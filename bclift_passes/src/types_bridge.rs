//! Translates `llvm_ir::Type` into the core's `Type` surface (§4.1).
//!
//! Grounded on the mapping rules of the original llvm2c `TypeHandler`
//! (reconstructed from the distillation, since the excerpt in
//! `original_source/` does not include the type-handling translation unit):
//! integer widths round up to the nearest canonical C width, pointer-to-
//! array-of-pointers collapses into one `Pointer` with `is_array_pointer`,
//! and literal (unnamed) struct types get a fresh `anonymous_struct<N>`
//! name on every sighting while named struct types are cached by name so
//! recursive/self-referential structs terminate.

use rustc_hash::FxHashMap;

use bclift_diag::DecompileError;
use bclift_ir::{FloatKind, Program, TypeId};
use bclift_reader::llvm_ir::types::{FPType, Type as IrType};

/// Per-translation cache so a named struct already registered is reused
/// rather than re-walked (breaks recursive-struct infinite loops).
#[derive(Default)]
pub struct TypeCache {
    named_structs: FxHashMap<String, TypeId>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn translate_type(
    program: &mut Program,
    cache: &mut TypeCache,
    ty: &IrType,
) -> Result<TypeId, DecompileError> {
    match ty {
        IrType::VoidType => Ok(program.types.intern_void()),

        IrType::IntegerType { bits } => program.types.intern_integer(*bits),

        IrType::FPType(fp) => {
            let kind = match fp {
                FPType::Half | FPType::BFloat | FPType::Single => FloatKind::Float,
                FPType::Double => FloatKind::Double,
                FPType::X86_FP80 => FloatKind::LongDouble,
                FPType::FP128 | FPType::PPC_FP128 => FloatKind::Fp128,
            };
            Ok(program.types.intern_floating(kind))
        }

        IrType::PointerType { pointee_type, .. } => {
            if let IrType::ArrayType {
                element_type,
                num_elements,
            } = pointee_type.as_ref()
            {
                if let IrType::PointerType { .. } = element_type.as_ref() {
                    let (levels, innermost, sizes) = collapse_array_of_pointers(element_type, *num_elements);
                    let element = translate_type(program, cache, innermost)?;
                    return Ok(program.types.intern_array_pointer(element, levels, sizes));
                }
            }
            // A function type is already its own pointer in this type
            // surface (`Type::Function`'s declarator is `ret (*name)(params)`),
            // so a pointer-to-function LLVM type translates directly to the
            // function type rather than wrapping it in another `Pointer`.
            if let IrType::FuncType { .. } = pointee_type.as_ref() {
                return translate_type(program, cache, pointee_type);
            }
            let element = translate_type(program, cache, pointee_type)?;
            Ok(program.types.intern_pointer(element))
        }

        IrType::ArrayType {
            element_type,
            num_elements,
        } => {
            let is_pointer_array = matches!(element_type.as_ref(), IrType::PointerType { .. });
            let element = translate_type(program, cache, element_type)?;
            Ok(program
                .types
                .intern_array(element, *num_elements as u64, is_pointer_array, None))
        }

        IrType::StructType {
            element_types,
            ..
        } => {
            let mut items = Vec::with_capacity(element_types.len());
            for field_ty in element_types {
                let translated = translate_type(program, cache, field_ty)?;
                let name = program.types.fresh_struct_var_name();
                items.push((translated, name));
            }
            Ok(program.types.create_new_unnamed_struct(items))
        }

        IrType::NamedStructType { name } => {
            if let Some(&id) = cache.named_structs.get(name) {
                return Ok(id);
            }
            let sanitized = name.trim_start_matches("struct.").trim_start_matches("union.");
            let placeholder = program
                .types
                .intern_named_struct(sanitized.to_string(), Vec::new());
            cache.named_structs.insert(name.clone(), placeholder);
            Ok(placeholder)
        }

        IrType::FuncType {
            result_type,
            param_types,
            is_var_arg,
        } => {
            let ret = translate_type(program, cache, result_type)?;
            let mut params = Vec::with_capacity(param_types.len());
            for p in param_types {
                params.push(translate_type(program, cache, p)?);
            }
            Ok(program.types.intern_function(ret, params, *is_var_arg))
        }

        other => Err(DecompileError::UnsupportedType(format!("{other:?}"))),
    }
}

/// Walk through nested `[N x T*]`/pointer wrappers to find the true element
/// type and accumulate pointer depth and bracketed dimension text, per the
/// array-of-pointers collapsing rule (§4.1).
fn collapse_array_of_pointers<'a>(mut element_type: &'a IrType, first_len: usize) -> (u32, &'a IrType, String) {
    let mut levels = 0u32;
    let mut sizes = format!("[{first_len}]");
    loop {
        match element_type {
            IrType::PointerType { pointee_type, .. } => {
                levels += 1;
                if let IrType::ArrayType {
                    element_type: next,
                    num_elements,
                } = pointee_type.as_ref()
                {
                    sizes.push_str(&format!("[{num_elements}]"));
                    element_type = next.as_ref();
                } else {
                    element_type = pointee_type.as_ref();
                    break;
                }
            }
            _ => break,
        }
    }
    (levels.max(1), element_type, sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_type_rounds_to_canonical_width() {
        let mut program = Program::new();
        let mut cache = TypeCache::new();
        let ty = IrType::IntegerType { bits: 24 };
        let id = translate_type(&mut program, &mut cache, &ty).unwrap();
        assert_eq!(program.types.to_string_of(id), "int");
    }

    #[test]
    fn pointer_to_function_type_declares_with_param_list() {
        let mut program = Program::new();
        let mut cache = TypeCache::new();
        let int_ty = IrType::IntegerType { bits: 32 };
        let func_ty = IrType::FuncType {
            result_type: Box::new(int_ty.clone()),
            param_types: vec![int_ty.clone()],
            is_var_arg: false,
        };
        let ptr_ty = IrType::PointerType {
            pointee_type: Box::new(func_ty),
            addr_space: 0,
        };
        let id = translate_type(&mut program, &mut cache, &ptr_ty).unwrap();
        assert_eq!(program.types.declare(id, "cb"), "int (*cb)(int)");
    }

    #[test]
    fn named_struct_is_cached_by_name() {
        let mut program = Program::new();
        let mut cache = TypeCache::new();
        let ty = IrType::NamedStructType {
            name: "struct.Point".to_string(),
        };
        let a = translate_type(&mut program, &mut cache, &ty).unwrap();
        let b = translate_type(&mut program, &mut cache, &ty).unwrap();
        assert_eq!(a, b);
    }
}
