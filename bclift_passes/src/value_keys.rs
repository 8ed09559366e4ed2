//! Assigns stable [`IrValueId`]s to LLVM values.
//!
//! `bclift_ir::Program` deliberately has no notion of `llvm_ir::Name` (it
//! would couple the core to the reader), so this pipeline-local table is
//! where that translation happens: a local value is keyed by
//! `(function name, Name)` since `Name` is only unique within one function's
//! value namespace; a global is keyed by its bare name.

use rustc_hash::FxHashMap;

use bclift_ir::IrValueId;
use bclift_reader::llvm_ir::Name;

#[derive(Default)]
pub struct ValueKeys {
    next: u32,
    local: FxHashMap<(String, Name), IrValueId>,
    global: FxHashMap<String, IrValueId>,
}

impl ValueKeys {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&mut self) -> IrValueId {
        let id = IrValueId::new(self.next);
        self.next += 1;
        id
    }

    /// The stable key for a value local to `func_name`, allocating a fresh
    /// one on first sight.
    pub fn local(&mut self, func_name: &str, name: &Name) -> IrValueId {
        if let Some(&id) = self.local.get(&(func_name.to_string(), name.clone())) {
            return id;
        }
        let id = self.fresh();
        self.local.insert((func_name.to_string(), name.clone()), id);
        id
    }

    /// The stable key for a global (variable, function, or alias) named
    /// `name`.
    pub fn global(&mut self, name: &str) -> IrValueId {
        if let Some(&id) = self.global.get(name) {
            return id;
        }
        let id = self.fresh();
        self.global.insert(name.to_string(), id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_in_same_function_resolves_to_same_id() {
        let mut keys = ValueKeys::new();
        let a = keys.local("f", &Name::Number(0));
        let b = keys.local("f", &Name::Number(0));
        assert_eq!(a, b);
    }

    #[test]
    fn same_number_in_different_functions_resolves_to_different_ids() {
        let mut keys = ValueKeys::new();
        let a = keys.local("f", &Name::Number(0));
        let b = keys.local("g", &Name::Number(0));
        assert_ne!(a, b);
    }
}
