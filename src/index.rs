//! Source index construction.
//!
//! Pairs a rendered class text with its parsed bytecode by walking the
//! text's AST: the k-th field/method declaration in the tree corresponds to
//! the k-th rendered (non-synthetic) member of the classfile, so tokens are
//! located structurally and never by name matching. All positions are
//! computed here, once, at decompile time; lookups afterwards are plain map
//! access. Indexing is a pure function of the (bytecode, text) pairing.

use tree_sitter::{Node, Parser};

use crate::classfile::ParsedClass;
use crate::descriptor::{ReturnType, parse_field_descriptor, parse_method_descriptor};
use crate::entry::{ArgumentEntry, ClassEntry, Entry, EntryReference};
use crate::error::{Error, Result};
use crate::render::{rendered_fields, rendered_methods};
use crate::source::{SourceIndex, Token};

/// Builds the token index for `text`, a render of `parsed`.
pub fn index_source(parsed: &ParsedClass, text: &str) -> Result<SourceIndex> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| Error::malformed(&parsed.this_class, format!("grammar: {e}")))?;
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| Error::malformed(&parsed.this_class, "render is not parsable"))?;
    let root = tree.root_node();

    let mut index = SourceIndex::default();
    let class_entry = parsed.entry();

    let mut cursor = root.walk();
    let declaration = root
        .children(&mut cursor)
        .find(|c| matches!(c.kind(), "class_declaration" | "interface_declaration"))
        .ok_or_else(|| mismatch(parsed, "no type declaration in render"))?;

    let name = declaration
        .child_by_field_name("name")
        .ok_or_else(|| mismatch(parsed, "type declaration without a name"))?;
    index.add_declaration(Entry::Class(class_entry.clone()), token_of(&name));

    let mut cursor = declaration.walk();
    for child in declaration.children(&mut cursor) {
        match child.kind() {
            "superclass" => {
                if let Some(super_class) = &parsed.super_class
                    && let Some(ident) = type_identifiers(&child).into_iter().next()
                {
                    index.add_reference(
                        EntryReference::new(class_entry.clone(), ClassEntry::new(super_class)),
                        token_of(&ident),
                    );
                }
            }
            "super_interfaces" | "extends_interfaces" => {
                for (ident, interface) in
                    type_identifiers(&child).into_iter().zip(&parsed.interfaces)
                {
                    index.add_reference(
                        EntryReference::new(class_entry.clone(), ClassEntry::new(interface)),
                        token_of(&ident),
                    );
                }
            }
            "class_body" | "interface_body" => {
                index_members(parsed, &child, &mut index)?;
            }
            _ => {}
        }
    }

    Ok(index)
}

fn index_members(parsed: &ParsedClass, body: &Node<'_>, index: &mut SourceIndex) -> Result<()> {
    let fields = rendered_fields(parsed);
    let methods = rendered_methods(parsed);
    let mut next_field = 0usize;
    let mut next_method = 0usize;

    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        match child.kind() {
            "field_declaration" => {
                let member = fields
                    .get(next_field)
                    .ok_or_else(|| mismatch(parsed, "more field declarations than members"))?;
                next_field += 1;
                let entry = Entry::Field(parsed.field_entry(member));

                if let Some(name) = child
                    .child_by_field_name("declarator")
                    .and_then(|d| d.child_by_field_name("name"))
                {
                    index.add_declaration(entry.clone(), token_of(&name));
                }

                let ty = parse_field_descriptor(&member.descriptor)
                    .map_err(|_| mismatch(parsed, "unparsable field descriptor"))?;
                if let Some(target) = ty.object_name()
                    && let Some(type_node) = child.child_by_field_name("type")
                    && let Some(ident) = type_identifiers(&type_node).into_iter().next()
                {
                    index.add_reference(
                        EntryReference::new(entry, ClassEntry::new(target)),
                        token_of(&ident),
                    );
                }
            }
            "method_declaration" | "constructor_declaration" => {
                let member = methods
                    .get(next_method)
                    .ok_or_else(|| mismatch(parsed, "more method declarations than members"))?;
                next_method += 1;
                let method = parsed.method_entry(member);
                let context = Entry::Method(method.clone());

                if let Some(name) = child.child_by_field_name("name") {
                    index.add_declaration(context.clone(), token_of(&name));
                }

                let descriptor = parse_method_descriptor(&member.descriptor)
                    .map_err(|_| mismatch(parsed, "unparsable method descriptor"))?;

                if child.kind() == "method_declaration"
                    && let ReturnType::Type(ty) = &descriptor.return_type
                    && let Some(target) = ty.object_name()
                    && let Some(type_node) = child.child_by_field_name("type")
                    && let Some(ident) = type_identifiers(&type_node).into_iter().next()
                {
                    index.add_reference(
                        EntryReference::new(context.clone(), ClassEntry::new(target)),
                        token_of(&ident),
                    );
                }

                let Some(params) = child.child_by_field_name("parameters") else {
                    continue;
                };
                let mut param_index = 0usize;
                let mut params_cursor = params.walk();
                for param in params.children(&mut params_cursor) {
                    if param.kind() != "formal_parameter" {
                        continue;
                    }
                    let Some(param_type) = descriptor.params.get(param_index) else {
                        return Err(mismatch(parsed, "more parameters than descriptor slots"));
                    };

                    if let Some(name) = param.child_by_field_name("name") {
                        let argument =
                            ArgumentEntry::new(method.clone(), param_index as u16);
                        index.add_declaration(Entry::Argument(argument), token_of(&name));
                    }
                    if let Some(target) = param_type.object_name()
                        && let Some(type_node) = param.child_by_field_name("type")
                        && let Some(ident) = type_identifiers(&type_node).into_iter().next()
                    {
                        index.add_reference(
                            EntryReference::new(
                                context.clone(),
                                ClassEntry::new(target),
                            ),
                            token_of(&ident),
                        );
                    }
                    param_index += 1;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// All `type_identifier` leaves under `node`, in textual order.
fn type_identifiers<'tree>(node: &Node<'tree>) -> Vec<Node<'tree>> {
    let mut found = Vec::new();
    collect_type_identifiers(node, &mut found);
    found
}

fn collect_type_identifiers<'tree>(node: &Node<'tree>, found: &mut Vec<Node<'tree>>) {
    if node.kind() == "type_identifier" {
        found.push(*node);
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_type_identifiers(&child, found);
    }
}

fn token_of(node: &Node<'_>) -> Token {
    Token::new(node.start_byte(), node.end_byte())
}

fn mismatch(parsed: &ParsedClass, reason: &str) -> Error {
    Error::malformed(&parsed.this_class, reason)
}
