//! The Type Translator: maps LLVM types to C type surface syntax.
//!
//! Grounded on the teacher's `sigil_codegen::c::types::CTypeMapper` (the
//! shape of a type-mapping table with a primitive fast path and a structural
//! fallback) and on the original llvm2c `TypeHandler`, whose C++ behavior
//! (`toString()` / `surroundName()` split, `anonymous_struct<N>` /
//! `structVar<N>` naming) this module reproduces in Rust: a single-owner
//! interning table keyed on structural equality, rather than the teacher's
//! sharded/concurrent `StringInterner` (this translator is single-threaded
//! and batch-oriented per the resource model, so the concurrency machinery
//! would be dead weight).

use rustc_hash::FxHashMap;

use crate::ids::TypeId;
use bclift_diag::DecompileError;

/// C floating-point kinds the translator supports.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FloatKind {
    Float,
    Double,
    LongDouble,
    Fp128,
}

impl FloatKind {
    fn as_str(self) -> &'static str {
        match self {
            FloatKind::Float => "float",
            FloatKind::Double => "double",
            FloatKind::LongDouble => "long double",
            FloatKind::Fp128 => "__float128",
        }
    }
}

/// Array-pointer metadata shared by `Pointer` and pointer-typed `Array`
/// elements: collapsed pointer-to-pointer depth plus the bracketed
/// dimension suffixes used when printing the declarator.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PointerMeta {
    pub levels: u32,
    pub sizes: String,
}

/// The C-surface type sum type. Immutable once interned.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Type {
    Void,
    Integer {
        bits: u32,
        unsigned: bool,
    },
    Floating(FloatKind),
    Pointer {
        element: TypeId,
        levels: u32,
        is_array_pointer: bool,
        sizes: String,
    },
    Array {
        element: TypeId,
        size: u64,
        is_pointer_array: bool,
        pointer: Option<PointerMeta>,
    },
    Struct {
        name: String,
        items: Vec<(TypeId, String)>,
    },
    Union {
        name: String,
        items: Vec<(TypeId, String)>,
    },
    Function {
        ret: TypeId,
        params: Vec<TypeId>,
        variadic: bool,
    },
}

/// Smallest canonical C integer width >= `bits`, rounding non-powers-of-two
/// up. A width of 0 has no canonical C representation and is rejected.
fn canonical_width(bits: u32) -> Result<u32, DecompileError> {
    match bits {
        0 => Err(DecompileError::UnsupportedType(
            "zero-width integer".to_string(),
        )),
        1..=8 => Ok(8),
        9..=16 => Ok(16),
        17..=32 => Ok(32),
        33..=64 => Ok(64),
        65..=128 => Ok(128),
        other => Err(DecompileError::UnsupportedType(format!(
            "integer width {other} exceeds 128 bits"
        ))),
    }
}

fn integer_base_name(canonical_bits: u32) -> &'static str {
    match canonical_bits {
        8 => "char",
        16 => "short",
        32 => "int",
        64 => "long long",
        128 => "__int128",
        _ => unreachable!("canonical_width only returns 8/16/32/64/128"),
    }
}

/// Interning table and name-generation counters for a single translation
/// (scoped to one `Program`, never process-global, per §9 "Global state").
pub struct TypeTranslator {
    pool: Vec<Type>,
    interned: FxHashMap<Type, TypeId>,
    anon_struct_count: u32,
    struct_var_count: u32,
}

impl TypeTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool: Vec::new(),
            interned: FxHashMap::default(),
            anon_struct_count: 0,
            struct_var_count: 0,
        }
    }

    #[must_use]
    pub fn get(&self, id: TypeId) -> &Type {
        &self.pool[id.index()]
    }

    /// Intern a fully-constructed `Type`, returning its handle. Equal types
    /// (by structural equality, §8 Invariant 1) always return the same
    /// handle.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.interned.get(&ty) {
            return id;
        }
        let id = TypeId::new(u32::try_from(self.pool.len()).unwrap_or(u32::MAX));
        self.pool.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    pub fn intern_void(&mut self) -> TypeId {
        self.intern(Type::Void)
    }

    /// `IntegerType(w)`: smallest canonical width >= w, signed by default.
    pub fn intern_integer(&mut self, bits: u32) -> Result<TypeId, DecompileError> {
        let canonical = canonical_width(bits)?;
        Ok(self.intern(Type::Integer {
            bits: canonical,
            unsigned: false,
        }))
    }

    /// Same as [`Self::intern_integer`] but marked unsigned, for operator
    /// contexts that demand it (unsigned comparison predicates, `Lshr`).
    pub fn intern_unsigned_integer(&mut self, bits: u32) -> Result<TypeId, DecompileError> {
        let canonical = canonical_width(bits)?;
        Ok(self.intern(Type::Integer {
            bits: canonical,
            unsigned: true,
        }))
    }

    pub fn intern_floating(&mut self, kind: FloatKind) -> TypeId {
        self.intern(Type::Floating(kind))
    }

    /// Plain pointer to `element`.
    pub fn intern_pointer(&mut self, element: TypeId) -> TypeId {
        self.intern(Type::Pointer {
            element,
            levels: 1,
            is_array_pointer: false,
            sizes: String::new(),
        })
    }

    /// Pointer collapsed from an array-of-pointers element, per §4.1.
    pub fn intern_array_pointer(&mut self, element: TypeId, levels: u32, sizes: String) -> TypeId {
        self.intern(Type::Pointer {
            element,
            levels,
            is_array_pointer: true,
            sizes,
        })
    }

    pub fn intern_array(
        &mut self,
        element: TypeId,
        size: u64,
        is_pointer_array: bool,
        pointer: Option<PointerMeta>,
    ) -> TypeId {
        self.intern(Type::Array {
            element,
            size,
            is_pointer_array,
            pointer,
        })
    }

    /// Register a named (LLVM-identified) struct. `name` should already
    /// have the C-identifier-unsafe prefix stripped by the caller (the
    /// reader adapter, which knows the LLVM naming convention).
    pub fn intern_named_struct(&mut self, name: String, items: Vec<(TypeId, String)>) -> TypeId {
        self.intern(Type::Struct { name, items })
    }

    /// `create_new_unnamed_struct`: allocate a fresh `anonymous_struct<N>`
    /// name and intern the struct. Each call to this with structurally
    /// distinct `items` yields a distinct handle; the counter never reuses a
    /// value even if an earlier anonymous struct is structurally identical,
    /// matching the source's "fresh name, not fresh-if-needed" policy.
    pub fn create_new_unnamed_struct(&mut self, items: Vec<(TypeId, String)>) -> TypeId {
        let name = format!("anonymous_struct{}", self.anon_struct_count);
        self.anon_struct_count += 1;
        self.intern(Type::Struct { name, items })
    }

    /// Synthesize a union over `subtypes`, fields named `ty0, ty1, ...`, with
    /// the given pre-allocated name (`u<N>`; the counter lives on `Program`
    /// since unions are also visible through the LLVM-bitcast alias table).
    pub fn intern_union(&mut self, name: String, subtypes: &[TypeId]) -> TypeId {
        let items = subtypes
            .iter()
            .enumerate()
            .map(|(i, &ty)| (ty, format!("ty{i}")))
            .collect();
        self.intern(Type::Union { name, items })
    }

    pub fn intern_function(&mut self, ret: TypeId, params: Vec<TypeId>, variadic: bool) -> TypeId {
        self.intern(Type::Function {
            ret,
            params,
            variadic,
        })
    }

    /// Fresh `structVar<N>` name for a synthesized field/temporary.
    pub fn fresh_struct_var_name(&mut self) -> String {
        let name = format!("structVar{}", self.struct_var_count);
        self.struct_var_count += 1;
        name
    }

    /// The *base* type text, e.g. `"int"`, `"struct Foo"`, `"int *"`. Does
    /// not include a declared identifier; see [`Self::declare`] for that.
    #[must_use]
    pub fn to_string_of(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Void => "void".to_string(),
            Type::Integer { bits, unsigned } => {
                let base = integer_base_name(*bits);
                if *unsigned {
                    format!("unsigned {base}")
                } else {
                    base.to_string()
                }
            }
            Type::Floating(k) => k.as_str().to_string(),
            Type::Pointer {
                element,
                levels,
                is_array_pointer,
                ..
            } => {
                let base = self.to_string_of(*element);
                if *is_array_pointer {
                    base
                } else {
                    format!("{base} {}", "*".repeat(*levels as usize)).trim_end().to_string()
                }
            }
            Type::Array { element, .. } => self.to_string_of(*element),
            Type::Struct { name, .. } => format!("struct {name}"),
            Type::Union { name, .. } => format!("union {name}"),
            Type::Function { ret, .. } => self.to_string_of(*ret),
        }
    }

    fn array_size_suffix(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Array { size, .. } => format!("[{size}]"),
            _ => String::new(),
        }
    }

    /// The declarator protocol: wraps `id` so that `declare(id)` is a legal
    /// C declaration when preceded by nothing else (callers that want
    /// `"T id"` write `format!("{}{}", translator.to_string_of(ty), translator.surround_name(ty, id))`).
    ///
    /// Arrays append `[N]`; function pointers wrap `(*id)(params)`;
    /// array-of-pointers and pointer-to-array-pointer fields parenthesize
    /// the stars; everything else is a single leading space plus `id`.
    #[must_use]
    pub fn surround_name(&self, id: TypeId, name: &str) -> String {
        match self.get(id) {
            Type::Pointer {
                is_array_pointer: true,
                levels,
                sizes,
                ..
            } => format!(" ({}{name}){sizes}", "*".repeat(*levels as usize)),
            Type::Array {
                is_pointer_array: true,
                pointer: Some(meta),
                ..
            } => {
                let suffix = self.array_size_suffix(id);
                format!(
                    " ({}{name}{suffix}){}",
                    "*".repeat(meta.levels as usize),
                    meta.sizes
                )
            }
            Type::Array { .. } => {
                let suffix = self.array_size_suffix(id);
                format!(" {name}{suffix}")
            }
            Type::Function { ret, params, variadic } => {
                let ret = *ret;
                let params = params.clone();
                let variadic = *variadic;
                let param_list = self.function_param_list(&params, variadic);
                return format!("{} (*{name})({param_list})", self.to_string_of(ret));
            }
            _ => format!(" {name}"),
        }
    }

    fn function_param_list(&self, params: &[TypeId], variadic: bool) -> String {
        if params.is_empty() && !variadic {
            return "void".to_string();
        }
        let mut parts: Vec<String> = params.iter().map(|&p| self.to_string_of(p)).collect();
        if variadic {
            parts.push("...".to_string());
        }
        parts.join(", ")
    }

    /// The bracketed suffix appended after a cast's base type text for
    /// array-pointer and function-pointer targets, e.g. `" (*)[4]"` or
    /// `" (*)(int, int)"`. Empty for every other variant.
    fn cast_suffix_text(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Pointer {
                is_array_pointer: true,
                levels,
                sizes,
                ..
            } => format!(" ({}){sizes}", "*".repeat(*levels as usize)),
            Type::Function { params, variadic, .. } => {
                format!(" (*)({})", self.function_param_list(params, *variadic))
            }
            _ => String::new(),
        }
    }

    /// The text a `CastExpr`/`PointerShift` prints for its target type:
    /// `to_string_of` plus the array-pointer/function-pointer bracket
    /// suffix, e.g. `"int (*)[4]"` for an array-pointer cast target.
    #[must_use]
    pub fn cast_type_text(&self, id: TypeId) -> String {
        format!("{}{}", self.to_string_of(id), self.cast_suffix_text(id))
    }

    /// Full declaration text `"T id"` (or `"ret (*id)(params)"` for function
    /// pointers), routing every declarator through [`Self::surround_name`]
    /// so array-pointer and function-pointer fields are always correct --
    /// the rule the Emitter leans on for every struct field and parameter.
    #[must_use]
    pub fn declare(&self, id: TypeId, name: &str) -> String {
        if matches!(self.get(id), Type::Function { .. }) {
            return self.surround_name(id, name);
        }
        format!("{}{}", self.to_string_of(id), self.surround_name(id, name))
    }

    /// Every interned `Struct`/`Union`, in interning (insertion) order.
    /// A struct's field types are always interned before the struct itself
    /// (callers must translate fields first), so this order is already a
    /// valid emission order -- no separate topological sort is needed.
    pub fn iter_struct_and_union_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.pool.iter().enumerate().filter_map(|(i, ty)| {
            matches!(ty, Type::Struct { .. } | Type::Union { .. })
                .then(|| TypeId::new(u32::try_from(i).unwrap_or(u32::MAX)))
        })
    }
}

impl Default for TypeTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn interns_structurally_equal_integers() {
        let mut t = TypeTranslator::new();
        let a = t.intern_integer(32).unwrap();
        let b = t.intern_integer(32).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rounds_up_nonpow2_widths() {
        let mut t = TypeTranslator::new();
        let id = t.intern_integer(24).unwrap();
        assert_eq!(t.to_string_of(id), "int");
    }

    #[test]
    fn one_bit_integer_maps_to_char() {
        let mut t = TypeTranslator::new();
        let id = t.intern_integer(1).unwrap();
        assert_eq!(t.to_string_of(id), "char");
    }

    #[test]
    fn zero_width_integer_is_rejected() {
        let mut t = TypeTranslator::new();
        assert!(t.intern_integer(0).is_err());
    }

    #[test]
    fn anonymous_struct_names_are_monotonic_and_never_reused() {
        let mut t = TypeTranslator::new();
        let a = t.create_new_unnamed_struct(vec![]);
        let b = t.create_new_unnamed_struct(vec![]);
        assert_eq!(t.to_string_of(a), "struct anonymous_struct0");
        assert_eq!(t.to_string_of(b), "struct anonymous_struct1");
    }

    #[test]
    fn no_parameter_function_declares_void() {
        let mut t = TypeTranslator::new();
        let ret = t.intern_integer(32).unwrap();
        let f = t.intern_function(ret, vec![], false);
        assert_eq!(t.declare(f, "f"), "int (*f)(void)");
    }

    #[test]
    fn array_declarator_appends_bracket_suffix() {
        let mut t = TypeTranslator::new();
        let elem = t.intern_integer(32).unwrap();
        let arr = t.intern_array(elem, 10, false, None);
        assert_eq!(t.declare(arr, "buf"), "int buf[10]");
    }

    #[test]
    fn array_pointer_declarator_parenthesizes_stars() {
        let mut t = TypeTranslator::new();
        let elem = t.intern_integer(32).unwrap();
        let ptr = t.intern_array_pointer(elem, 1, "[4]".to_string());
        assert_eq!(t.declare(ptr, "p"), "int (*p)[4]");
    }
}
