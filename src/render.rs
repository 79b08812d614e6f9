//! Deterministic Java skeleton rendering.
//!
//! The built-in decompiler renders a declaration-level view of one parsed
//! class through the current display names: package and type declaration,
//! fields, constructors and methods with typed parameter lists and empty
//! bodies. Identical bytes and identical mapping state always produce
//! byte-identical text, which the token index relies on. Synthetic and
//! bridge members are omitted entirely, so they never receive a token.

use crate::classfile::{
    ACC_ABSTRACT, ACC_FINAL, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC, MemberInfo,
    ParsedClass,
};
use crate::descriptor::{parse_field_descriptor, parse_method_descriptor, ReturnType};
use crate::entry::{ArgumentEntry, Entry};
use crate::error::{Error, Result};
use crate::translate::NameResolver;

/// Fields that appear in a render, in classfile order.
pub(crate) fn rendered_fields(parsed: &ParsedClass) -> Vec<&MemberInfo> {
    parsed
        .fields
        .iter()
        .filter(|f| !f.is_synthetic())
        .collect()
}

/// Methods that appear in a render (constructors included), in classfile
/// order.
pub(crate) fn rendered_methods(parsed: &ParsedClass) -> Vec<&MemberInfo> {
    parsed
        .methods
        .iter()
        .filter(|m| !m.is_synthetic() && m.name != "<clinit>")
        .collect()
}

pub fn render_class(parsed: &ParsedClass, names: &dyn NameResolver) -> Result<String> {
    let resolve = |n: &str| names.class_display_name(n);
    let class_display = names.class_display_name(&parsed.this_class);
    let simple = simple_name(&class_display);

    let mut out = String::new();
    if let Some(pos) = class_display.rfind('/') {
        out.push_str("package ");
        out.push_str(&class_display[..pos].replace('/', "."));
        out.push_str(";\n\n");
    }

    out.push_str(&class_modifiers(parsed));
    out.push_str(if parsed.is_interface() {
        "interface "
    } else {
        "class "
    });
    out.push_str(simple);

    if !parsed.is_interface()
        && let Some(super_class) = &parsed.super_class
        && super_class != "java/lang/Object"
    {
        out.push_str(" extends ");
        out.push_str(simple_name(&resolve(super_class)));
    }
    if !parsed.interfaces.is_empty() {
        out.push_str(if parsed.is_interface() {
            " extends "
        } else {
            " implements "
        });
        let joined: Vec<String> = parsed
            .interfaces
            .iter()
            .map(|i| simple_name(&resolve(i)).to_string())
            .collect();
        out.push_str(&joined.join(", "));
    }
    out.push_str(" {\n");

    let fields = rendered_fields(parsed);
    let methods = rendered_methods(parsed);

    for field in &fields {
        let ty = parse_field_descriptor(&field.descriptor)
            .map_err(|_| bad_descriptor(parsed, &field.descriptor))?;
        out.push_str("    ");
        out.push_str(&member_modifiers(field.access_flags, parsed.is_interface()));
        out.push_str(&ty.render(&resolve));
        out.push(' ');
        out.push_str(&names.display_name(&Entry::Field(parsed.field_entry(field))));
        out.push_str(";\n");
    }
    if !fields.is_empty() && !methods.is_empty() {
        out.push('\n');
    }

    for method in &methods {
        let entry = parsed.method_entry(method);
        let descriptor = parse_method_descriptor(&method.descriptor)
            .map_err(|_| bad_descriptor(parsed, &method.descriptor))?;

        out.push_str("    ");
        out.push_str(&member_modifiers(method.access_flags, parsed.is_interface()));
        if entry.is_constructor() {
            out.push_str(simple);
        } else {
            match &descriptor.return_type {
                ReturnType::Void => out.push_str("void"),
                ReturnType::Type(ty) => out.push_str(&ty.render(&resolve)),
            }
            out.push(' ');
            out.push_str(&names.display_name(&Entry::Method(entry.clone())));
        }

        out.push('(');
        for (index, param) in descriptor.params.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            out.push_str(&param.render(&resolve));
            out.push(' ');
            let argument = ArgumentEntry::new(entry.clone(), index as u16);
            out.push_str(&names.display_name(&Entry::Argument(argument)));
        }
        out.push(')');

        let bodiless = parsed.is_interface() || method.access_flags & ACC_ABSTRACT != 0;
        out.push_str(if bodiless { ";\n" } else { " {}\n" });
    }

    out.push_str("}\n");
    Ok(out)
}

fn bad_descriptor(parsed: &ParsedClass, descriptor: &str) -> Error {
    Error::malformed(
        &parsed.this_class,
        format!("unparsable descriptor {descriptor}"),
    )
}

fn simple_name(binary_name: &str) -> &str {
    binary_name.rsplit('/').next().unwrap_or(binary_name)
}

fn class_modifiers(parsed: &ParsedClass) -> String {
    let mut out = String::new();
    if parsed.access_flags & ACC_PUBLIC != 0 {
        out.push_str("public ");
    }
    if !parsed.is_interface() {
        if parsed.access_flags & ACC_ABSTRACT != 0 {
            out.push_str("abstract ");
        }
        if parsed.access_flags & ACC_FINAL != 0 {
            out.push_str("final ");
        }
    }
    out
}

fn member_modifiers(flags: u16, in_interface: bool) -> String {
    // Interface members carry their modifiers implicitly.
    if in_interface {
        return String::new();
    }
    let mut out = String::new();
    if flags & ACC_PUBLIC != 0 {
        out.push_str("public ");
    } else if flags & ACC_PROTECTED != 0 {
        out.push_str("protected ");
    } else if flags & ACC_PRIVATE != 0 {
        out.push_str("private ");
    }
    if flags & ACC_STATIC != 0 {
        out.push_str("static ");
    }
    if flags & ACC_ABSTRACT != 0 {
        out.push_str("abstract ");
    } else if flags & ACC_FINAL != 0 {
        out.push_str("final ");
    }
    out
}
