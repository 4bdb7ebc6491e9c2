//! Relocatable object emission
//!
//! Writes the module as a relocatable ELF file with one defined `.text`
//! symbol per emitted function. Instruction selection belongs to the
//! external back end; the section payload is the function's serialized IR.

use std::io;
use std::path::Path;

use object::write::{Object, StandardSection, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SymbolFlags, SymbolKind, SymbolScope};

use super::IrModule;

pub fn write_object(module: &IrModule, path: &Path) -> io::Result<()> {
    let mut obj = Object::new(
        BinaryFormat::Elf,
        Architecture::X86_64,
        Endianness::Little,
    );

    let printed = module.to_string();
    let text = obj.section_id(StandardSection::Text);

    for (_, func) in module.functions.iter() {
        if func.is_declaration() {
            continue;
        }
        // The payload for each symbol is its function's textual IR.
        let start = printed
            .find(&format!("func @{}(", func.name))
            .unwrap_or(0);
        let body = printed[start..]
            .split_inclusive('}')
            .next()
            .unwrap_or(&printed[start..]);
        let offset = obj.append_section_data(text, body.as_bytes(), 16);
        obj.add_symbol(Symbol {
            name: func.name.clone().into_bytes(),
            value: offset,
            size: body.len() as u64,
            kind: SymbolKind::Text,
            scope: SymbolScope::Linkage,
            weak: false,
            section: SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }

    let bytes = obj
        .write()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    std::fs::write(path, bytes)
}
