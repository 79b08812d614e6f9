//! Inheritance adjacency over all classes of a provider.
//!
//! Built once per session by parsing every class (in parallel), then queried
//! for the *propagation set* of a member: the entries that must share one
//! display name so overriding stays valid after a rename. Chains only run
//! through classes the provider supplied; an unindexed superclass ends the
//! climb, so two classes whose sole common ancestor is `java/lang/Object`
//! never co-rename. Reachability is an explicit worklist over the adjacency
//! maps, so a malformed hierarchy with cycles terminates instead of
//! recursing forever.

use rayon::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::classfile::{MemberInfo, ParsedClass};
use crate::entry::{Entry, FieldEntry, MethodEntry};
use crate::error::Error;
use crate::provider::{CachingClassProvider, ClassProvider};

/// Parent/child adjacency plus per-class member tables.
#[derive(Debug, Default)]
pub struct InheritanceIndex {
    classes: HashMap<String, Arc<ParsedClass>>,
    parents: HashMap<String, Vec<String>>,
    children: HashMap<String, Vec<String>>,
}

impl InheritanceIndex {
    /// Parses `class_names` through the caching provider and builds the
    /// index. Per-class failures are returned alongside, never silently
    /// dropped.
    pub fn build<P: ClassProvider>(
        provider: &CachingClassProvider<P>,
        class_names: &[String],
    ) -> (Self, Vec<(String, Error)>) {
        let results: Vec<(String, crate::error::Result<Arc<ParsedClass>>)> = class_names
            .par_iter()
            .map(|name| (name.clone(), provider.get(name)))
            .collect();

        let mut index = Self::default();
        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(parsed) => index.insert(parsed),
                Err(err) => {
                    warn!(class = %name, error = %err, "class skipped from hierarchy");
                    failures.push((name, err));
                }
            }
        }
        debug!(
            classes = index.classes.len(),
            failures = failures.len(),
            "inheritance index built"
        );
        (index, failures)
    }

    pub(crate) fn insert(&mut self, parsed: Arc<ParsedClass>) {
        let name = parsed.this_class.clone();
        let mut parents = Vec::new();
        if let Some(super_class) = &parsed.super_class {
            parents.push(super_class.clone());
        }
        parents.extend(parsed.interfaces.iter().cloned());

        for parent in &parents {
            self.children
                .entry(parent.clone())
                .or_default()
                .push(name.clone());
        }
        self.parents.insert(name.clone(), parents);
        self.classes.insert(name, parsed);
    }

    pub fn class(&self, name: &str) -> Option<&Arc<ParsedClass>> {
        self.classes.get(name)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn parents(&self, name: &str) -> &[String] {
        self.parents.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children(&self, name: &str) -> &[String] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every entry that must carry the same display name as `entry`.
    ///
    /// Methods and fields propagate along their override chain: the owner's
    /// declaring ancestors, the descendants overriding those declarations,
    /// and whatever those reach in turn. Constructors, static methods,
    /// private members, classes and arguments rename alone. The result
    /// always contains `entry` itself and is sorted for deterministic
    /// application.
    pub fn propagation_set(&self, entry: &Entry) -> Vec<Entry> {
        let mut set = match entry {
            Entry::Method(method) => {
                if method.is_constructor() || !self.member_overrides(entry) {
                    vec![entry.clone()]
                } else {
                    self.override_chain(&method.owner.name, entry)
                }
            }
            Entry::Field(field) => {
                if !self.member_overrides(entry) {
                    vec![entry.clone()]
                } else {
                    self.override_chain(&field.owner.name, entry)
                }
            }
            Entry::Class(_) | Entry::Argument(_) => vec![entry.clone()],
        };
        if !set.contains(entry) {
            set.push(entry.clone());
        }
        set.sort();
        set.dedup();
        set
    }

    /// Declarations linked to `owner`'s member through actual inheritance.
    ///
    /// Starting from the owner, pulls in every known ancestor that declares
    /// an override-compatible match, every known descendant overriding one
    /// of those declarations, and keeps expanding from each declaration
    /// found. Two classes whose only connection is an unindexed superclass
    /// are never in the same chain: the climb stops where the provider's
    /// knowledge stops, and descent only starts from a declaring class.
    fn override_chain(&self, owner: &str, entry: &Entry) -> Vec<Entry> {
        let mut chain = HashSet::new();
        chain.insert(owner.to_string());
        let mut queue = VecDeque::from([owner.to_string()]);

        while let Some(current) = queue.pop_front() {
            let mut reached = self.declaring_ancestors(&current, entry);
            reached.extend(self.declaring_descendants(&current, entry));
            for class_name in reached {
                if chain.insert(class_name.clone()) {
                    queue.push_back(class_name);
                }
            }
        }

        chain
            .into_iter()
            .filter_map(|class_name| {
                let class = self.classes.get(&class_name)?;
                Some(match entry {
                    Entry::Method(m) => Entry::Method(MethodEntry::new(
                        class.entry(),
                        m.name.clone(),
                        m.descriptor.clone(),
                    )),
                    Entry::Field(f) => Entry::Field(FieldEntry::new(
                        class.entry(),
                        f.name.clone(),
                        f.descriptor.clone(),
                    )),
                    _ => return None,
                })
            })
            .collect()
    }

    /// Ancestors of `name` declaring an override-compatible match for
    /// `entry`. The climb passes through known non-declaring classes (the
    /// member is inherited across the gap) but ends at any class the
    /// provider never supplied.
    fn declaring_ancestors(&self, name: &str, entry: &Entry) -> Vec<String> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(name.to_string());
        let mut queue = VecDeque::from([name.to_string()]);

        while let Some(current) = queue.pop_front() {
            for parent in self.parents(&current) {
                if !self.classes.contains_key(parent) {
                    continue;
                }
                if seen.insert(parent.clone()) {
                    if self.declares_match(parent, entry) {
                        found.push(parent.clone());
                    }
                    queue.push_back(parent.clone());
                }
            }
        }
        found
    }

    /// Descendants of `name` declaring an override-compatible match for
    /// `entry`. Only meaningful when `name` itself declares the member;
    /// callers guarantee that.
    fn declaring_descendants(&self, name: &str, entry: &Entry) -> Vec<String> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(name.to_string());
        let mut queue = VecDeque::from([name.to_string()]);

        while let Some(current) = queue.pop_front() {
            for child in self.children(&current) {
                if !self.classes.contains_key(child) {
                    continue;
                }
                if seen.insert(child.clone()) {
                    if self.declares_match(child, entry) {
                        found.push(child.clone());
                    }
                    queue.push_back(child.clone());
                }
            }
        }
        found
    }

    fn declares_match(&self, class_name: &str, entry: &Entry) -> bool {
        let Some(class) = self.classes.get(class_name) else {
            return false;
        };
        match entry {
            Entry::Method(m) => class.methods.iter().any(|c| {
                c.name == m.name
                    && c.descriptor == m.descriptor
                    && !c.is_static()
                    && !c.is_private()
            }),
            Entry::Field(f) => class
                .fields
                .iter()
                .any(|c| c.name == f.name && c.descriptor == f.descriptor && !c.is_private()),
            _ => false,
        }
    }

    /// Whether the member participates in inheritance at all. Unknown owners
    /// (class never provided) degrade to a standalone rename.
    fn member_overrides(&self, entry: &Entry) -> bool {
        let Some(member) = self.member_info(entry) else {
            return false;
        };
        match entry {
            Entry::Method(_) => !member.is_static() && !member.is_private(),
            Entry::Field(_) => !member.is_private(),
            _ => false,
        }
    }

    fn member_info(&self, entry: &Entry) -> Option<&MemberInfo> {
        let class = self.classes.get(&entry.containing_class().name)?;
        match entry {
            Entry::Method(m) => class
                .methods
                .iter()
                .find(|c| c.name == m.name && c.descriptor == m.descriptor),
            Entry::Field(f) => class
                .fields
                .iter()
                .find(|c| c.name == f.name && c.descriptor == f.descriptor),
            _ => None,
        }
    }

}
