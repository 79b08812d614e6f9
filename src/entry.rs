//! Identity values for bytecode symbols.
//!
//! An [`Entry`] denotes one class, field, method or method argument by its
//! *obfuscated* identity: owning class, member name, descriptor, argument
//! index. Display names live in the translator and are never part of
//! identity, so renaming a symbol does not change which entry denotes it.
//! Equality, hashing and ordering are structural; entries are recreated
//! freely from bytecode and mapping lookups and must compare equal across
//! recreations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A class, identified by its binary name (`com/example/Foo`, inner classes
/// with `$`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassEntry {
    pub name: String,
}

impl ClassEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Name without the package prefix.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Package portion of the binary name, empty for the default package.
    pub fn package(&self) -> &str {
        match self.name.rfind('/') {
            Some(pos) => &self.name[..pos],
            None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldEntry {
    pub owner: ClassEntry,
    pub name: String,
    pub descriptor: String,
}

impl FieldEntry {
    pub fn new(owner: ClassEntry, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodEntry {
    pub owner: ClassEntry,
    pub name: String,
    pub descriptor: String,
}

impl MethodEntry {
    pub fn new(owner: ClassEntry, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

/// A method parameter, identified by owning method plus position.
///
/// Bytecode without debug attributes carries no parameter names, so the
/// default (obfuscated) name is synthesized as `arg{index}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArgumentEntry {
    pub method: MethodEntry,
    pub index: u16,
}

impl ArgumentEntry {
    pub fn new(method: MethodEntry, index: u16) -> Self {
        Self { method, index }
    }

    pub fn default_name(&self) -> String {
        format!("arg{}", self.index)
    }
}

/// The closed set of symbol kinds.
///
/// Every downstream switch (indexing, translation, rendering) matches on
/// this exhaustively; an unhandled kind is a compile error, not a runtime
/// condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entry {
    Class(ClassEntry),
    Field(FieldEntry),
    Method(MethodEntry),
    Argument(ArgumentEntry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Class,
    Field,
    Method,
    Argument,
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Class(_) => EntryKind::Class,
            Entry::Field(_) => EntryKind::Field,
            Entry::Method(_) => EntryKind::Method,
            Entry::Argument(_) => EntryKind::Argument,
        }
    }

    /// The class whose rendering contains this entry's declaration. For a
    /// class entry this is the class itself.
    pub fn containing_class(&self) -> &ClassEntry {
        match self {
            Entry::Class(c) => c,
            Entry::Field(f) => &f.owner,
            Entry::Method(m) => &m.owner,
            Entry::Argument(a) => &a.method.owner,
        }
    }

    /// The original (obfuscated) name, used whenever no mapping exists.
    pub fn name(&self) -> String {
        match self {
            Entry::Class(c) => c.name.clone(),
            Entry::Field(f) => f.name.clone(),
            Entry::Method(m) => m.name.clone(),
            Entry::Argument(a) => a.default_name(),
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Class(c) => write!(f, "class {}", c.name),
            Entry::Field(e) => write!(f, "field {}.{}:{}", e.owner.name, e.name, e.descriptor),
            Entry::Method(e) => write!(f, "method {}.{}{}", e.owner.name, e.name, e.descriptor),
            Entry::Argument(a) => write!(
                f,
                "arg {} of {}.{}{}",
                a.index, a.method.owner.name, a.method.name, a.method.descriptor
            ),
        }
    }
}

impl From<ClassEntry> for Entry {
    fn from(e: ClassEntry) -> Self {
        Entry::Class(e)
    }
}

impl From<FieldEntry> for Entry {
    fn from(e: FieldEntry) -> Self {
        Entry::Field(e)
    }
}

impl From<MethodEntry> for Entry {
    fn from(e: MethodEntry) -> Self {
        Entry::Method(e)
    }
}

impl From<ArgumentEntry> for Entry {
    fn from(e: ArgumentEntry) -> Self {
        Entry::Argument(e)
    }
}

/// One symbol mentioned inside another symbol's declaration.
///
/// `(context, target)` is the lookup key for reference occurrences; the same
/// target used N times inside one context is N tokens under one reference,
/// not N references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryReference {
    pub context: Entry,
    pub target: Entry,
}

impl EntryReference {
    pub fn new(context: impl Into<Entry>, target: impl Into<Entry>) -> Self {
        Self {
            context: context.into(),
            target: target.into(),
        }
    }
}
