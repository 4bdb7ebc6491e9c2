//! Name mangling
//!
//! Mangled names are the registry keys of the type registry and the symbol
//! names of the emitted module. `main` is always emitted unmangled.

use crate::context::{Interner, Name};
use crate::types::{TypeId, TypeRegistry};

/// Registry key for a struct or enum: the length-prefixed concatenation of
/// the namespace components and the type name. A single component stays
/// bare.
pub fn type_key(interner: &Interner, components: &[Name]) -> String {
    if components.len() == 1 {
        return interner.resolve(components[0]).to_string();
    }
    let mut key = String::new();
    for &component in components {
        let text = interner.resolve(component);
        if text.is_empty() {
            continue;
        }
        key.push_str(&text.len().to_string());
        key.push_str(text);
    }
    key
}

pub fn struct_id(interner: &Interner, components: &[Name]) -> String {
    let key = type_key(interner, components);
    format!("S{}{}", key.len(), key)
}

pub fn enum_id(interner: &Interner, components: &[Name]) -> String {
    let key = type_key(interner, components);
    format!("_E{}{}", key.len(), key)
}

/// Mangle a function: `_F` followed by the length-prefixed non-empty name
/// components, followed by the mangle id of each argument type.
pub fn function(
    interner: &Interner,
    types: &TypeRegistry,
    names: &[Name],
    function_type: TypeId,
) -> String {
    if let Some(&last) = names.last() {
        if interner.resolve(last) == "main" {
            return "main".to_string();
        }
    }

    let mut mangled = String::from("_F");
    for &name in names {
        let text = interner.resolve(name);
        if text.is_empty() {
            continue;
        }
        mangled.push_str(&text.len().to_string());
        mangled.push_str(text);
    }
    if let Some((_, params)) = types.function_parts(function_type) {
        for &param in params {
            mangled.push_str(&types.mangle_id(interner, param));
        }
    }
    mangled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Interner;

    fn setup() -> (Interner, TypeRegistry) {
        let mut interner = Interner::default();
        let types = TypeRegistry::with_builtins(&mut interner);
        (interner, types)
    }

    #[test]
    fn mangle_function_with_namespaces_and_arguments() {
        let (mut interner, mut types) = setup();
        let i8_ = types.get(interner.intern("i8")).unwrap();
        let i8_ptr = types.pointer_to(i8_);
        let fn_ty = types.function_of(types.i32_, vec![types.i32_, i8_ptr]);

        let names = [
            interner.intern("A"),
            interner.intern("B"),
            interner.intern("f"),
        ];
        let mangled = function(&interner, &types, &names, fn_ty);
        assert_eq!(mangled, "_F1A1B1fI32PI8");
        // Idempotent under re-mangling.
        assert_eq!(function(&interner, &types, &names, fn_ty), mangled);
    }

    #[test]
    fn main_is_unmangled() {
        let (mut interner, mut types) = setup();
        let fn_ty = types.function_of(types.i32_, Vec::new());
        let names = [interner.intern("main")];
        assert_eq!(function(&interner, &types, &names, fn_ty), "main");
    }

    #[test]
    fn single_component_type_key_stays_bare() {
        let (mut interner, _) = setup();
        let p = interner.intern("P");
        assert_eq!(type_key(&interner, &[p]), "P");
        assert_eq!(struct_id(&interner, &[p]), "S1P");
    }

    #[test]
    fn qualified_type_key_is_length_prefixed() {
        let (mut interner, _) = setup();
        let components = [interner.intern("X"), interner.intern("P")];
        assert_eq!(type_key(&interner, &components), "1X1P");
        assert_eq!(enum_id(&interner, &components), "_E41X1P");
    }
}
