//! The obfuscated-identity to display-name table and its rename operations.
//!
//! `display_name` is total: an unmapped entry answers with its original
//! name. `rename` validates the proposed identifier, expands the entry to
//! its propagation set through the inheritance index, checks every affected
//! class for collisions and then applies the whole set under one write
//! lock, so readers never observe a half-applied rename and a failed rename
//! changes nothing.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::descriptor::parse_method_descriptor;
use crate::entry::{ArgumentEntry, ClassEntry, Entry, EntryKind, FieldEntry, MethodEntry};
use crate::error::{Error, Result};
use crate::hierarchy::InheritanceIndex;

/// Resolves the current display name of any entry. Implemented by
/// [`Translator`]; [`NoMappings`] answers with original names only.
pub trait NameResolver: Send + Sync {
    fn display_name(&self, entry: &Entry) -> String;

    fn class_display_name(&self, binary_name: &str) -> String {
        self.display_name(&Entry::Class(ClassEntry::new(binary_name)))
    }
}

/// Identity resolver: every entry keeps its obfuscated name.
pub struct NoMappings;

impl NameResolver for NoMappings {
    fn display_name(&self, entry: &Entry) -> String {
        entry.name()
    }
}

/// Result of a successful rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The entry already displayed this name; nothing changed.
    Unchanged,
    /// The whole propagation set now carries the new name.
    Renamed { entries: Vec<Entry> },
}

/// Serializable copy of the rename table, the load/save boundary for
/// whatever mapping store the caller persists to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSnapshot {
    pub entries: Vec<MappingPair>,
}

impl MappingSnapshot {
    /// Renders the snapshot as JSON for whatever store persists it.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Parses a snapshot produced by [`MappingSnapshot::to_json`]. Names are
    /// not validated here; [`Translator::load`] re-checks them.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingPair {
    pub entry: Entry,
    pub name: String,
}

pub struct Translator {
    hierarchy: Arc<InheritanceIndex>,
    table: RwLock<HashMap<Entry, String>>,
}

impl Translator {
    pub fn new(hierarchy: Arc<InheritanceIndex>) -> Self {
        Self {
            hierarchy,
            table: RwLock::new(HashMap::new()),
        }
    }

    pub fn hierarchy(&self) -> &InheritanceIndex {
        &self.hierarchy
    }

    pub fn mapped_count(&self) -> usize {
        self.table.read().expect("mapping lock poisoned").len()
    }

    pub fn is_mapped(&self, entry: &Entry) -> bool {
        self.table
            .read()
            .expect("mapping lock poisoned")
            .contains_key(entry)
    }

    /// Renames `entry` and its whole override/inheritance chain to
    /// `new_name`, atomically. Renaming to the current display name is a
    /// no-op; a conflict anywhere in the chain rejects the rename and leaves
    /// every name unchanged.
    pub fn rename(&self, entry: &Entry, new_name: &str) -> Result<RenameOutcome> {
        validate_name(entry.kind(), new_name)?;

        let mut table = self.table.write().expect("mapping lock poisoned");
        if display_with(&table, entry) == new_name {
            return Ok(RenameOutcome::Unchanged);
        }

        let set = self.hierarchy.propagation_set(entry);
        let set_keys: HashSet<&Entry> = set.iter().collect();
        for member in &set {
            if let Some(taken_by) = self.find_conflict(&table, &set_keys, member, new_name) {
                return Err(Error::NameConflict {
                    name: new_name.to_string(),
                    taken_by,
                });
            }
        }

        for member in &set {
            table.insert(member.clone(), new_name.to_string());
        }
        debug!(entry = %entry, name = new_name, affected = set.len(), "renamed");
        Ok(RenameOutcome::Renamed { entries: set })
    }

    /// A sibling of the same kind in `member`'s owner that already displays
    /// `new_name`. Methods only collide on identical descriptors; fields,
    /// classes and arguments collide on name alone. Members of the
    /// propagation set itself never conflict with each other.
    fn find_conflict(
        &self,
        table: &HashMap<Entry, String>,
        set: &HashSet<&Entry>,
        member: &Entry,
        new_name: &str,
    ) -> Option<Entry> {
        match member {
            Entry::Class(class) => {
                for name in self.hierarchy.class_names() {
                    if name == class.name {
                        continue;
                    }
                    let other = Entry::Class(ClassEntry::new(name));
                    if display_with(table, &other) == new_name {
                        return Some(other);
                    }
                }
                None
            }
            Entry::Field(field) => {
                let owner = self.hierarchy.class(&field.owner.name)?;
                for candidate in &owner.fields {
                    let other = Entry::Field(FieldEntry::new(
                        owner.entry(),
                        candidate.name.clone(),
                        candidate.descriptor.clone(),
                    ));
                    if set.contains(&other) {
                        continue;
                    }
                    if display_with(table, &other) == new_name {
                        return Some(other);
                    }
                }
                None
            }
            Entry::Method(method) => {
                let owner = self.hierarchy.class(&method.owner.name)?;
                for candidate in &owner.methods {
                    if candidate.descriptor != method.descriptor {
                        continue;
                    }
                    let other = Entry::Method(MethodEntry::new(
                        owner.entry(),
                        candidate.name.clone(),
                        candidate.descriptor.clone(),
                    ));
                    if set.contains(&other) {
                        continue;
                    }
                    if display_with(table, &other) == new_name {
                        return Some(other);
                    }
                }
                None
            }
            Entry::Argument(arg) => {
                let descriptor = parse_method_descriptor(&arg.method.descriptor).ok()?;
                for index in 0..descriptor.params.len() as u16 {
                    if index == arg.index {
                        continue;
                    }
                    let other = Entry::Argument(ArgumentEntry::new(arg.method.clone(), index));
                    if display_with(table, &other) == new_name {
                        return Some(other);
                    }
                }
                None
            }
        }
    }

    /// Copy of the current table, sorted by entry for stable serialization.
    pub fn snapshot(&self) -> MappingSnapshot {
        let table = self.table.read().expect("mapping lock poisoned");
        let mut entries: Vec<MappingPair> = table
            .iter()
            .map(|(entry, name)| MappingPair {
                entry: entry.clone(),
                name: name.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.entry.cmp(&b.entry));
        MappingSnapshot { entries }
    }

    /// Replaces the table with a stored snapshot, re-validating every name.
    pub fn load(&self, snapshot: MappingSnapshot) -> Result<()> {
        for pair in &snapshot.entries {
            validate_name(pair.entry.kind(), &pair.name)?;
        }
        let mut table = self.table.write().expect("mapping lock poisoned");
        table.clear();
        for pair in snapshot.entries {
            table.insert(pair.entry, pair.name);
        }
        Ok(())
    }
}

impl NameResolver for Translator {
    fn display_name(&self, entry: &Entry) -> String {
        let table = self.table.read().expect("mapping lock poisoned");
        display_with(&table, entry)
    }
}

fn display_with(table: &HashMap<Entry, String>, entry: &Entry) -> String {
    table
        .get(entry)
        .cloned()
        .unwrap_or_else(|| entry.name())
}

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "null", "package", "private", "protected", "public", "return",
    "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "try", "void", "volatile", "while",
];

fn valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return false;
    }
    !JAVA_KEYWORDS.contains(&name)
}

/// Class names are binary names: `/`-separated identifier segments. Members
/// and arguments are single identifiers.
fn validate_name(kind: EntryKind, name: &str) -> Result<()> {
    let ok = match kind {
        EntryKind::Class => {
            !name.is_empty() && name.split('/').all(valid_identifier)
        }
        EntryKind::Field | EntryKind::Method | EntryKind::Argument => valid_identifier(name),
    };
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}
