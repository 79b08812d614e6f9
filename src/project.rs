//! Session facade: one provider, one inheritance index, one rename table.
//!
//! `RemapProject` is the surface the presentation layer talks to: it reads
//! `source()` and `display_name()`, writes through `rename()`, and re-reads
//! sources after renames. Sources are rebuilt on demand against the current
//! mapping state and shared as immutable `Arc`s.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::classfile::ParsedClass;
use crate::entry::{ClassEntry, Entry};
use crate::error::{Error, Result};
use crate::hierarchy::InheritanceIndex;
use crate::index::index_source;
use crate::provider::{CachingClassProvider, ClassProvider, DirectoryClassProvider, JarClassProvider};
use crate::render::render_class;
use crate::source::Source;
use crate::translate::{MappingSnapshot, NameResolver, RenameOutcome, Translator};

/// Turns a parsed class into rendered text plus token index. Deterministic
/// for identical bytes and identical mapping state.
pub trait Decompiler: Send + Sync {
    fn decompile(&self, parsed: &ParsedClass, names: &dyn NameResolver) -> Result<Source>;
}

/// The built-in declaration-level decompiler.
pub struct SkeletonDecompiler;

impl Decompiler for SkeletonDecompiler {
    fn decompile(&self, parsed: &ParsedClass, names: &dyn NameResolver) -> Result<Source> {
        let text = render_class(parsed, names)?;
        let index = index_source(parsed, &text)?;
        Ok(Source::new(text, index))
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectStats {
    pub classes_indexed: usize,
    pub classes_cached: usize,
    pub mapped_entries: usize,
    pub load_failures: usize,
}

pub struct RemapProject<P: ClassProvider> {
    provider: Arc<CachingClassProvider<P>>,
    translator: Translator,
    decompiler: Box<dyn Decompiler>,
    load_failures: Vec<(String, Error)>,
}

impl RemapProject<JarClassProvider> {
    /// Opens a jar and indexes every class in it.
    pub fn open_jar(jar_path: impl Into<std::path::PathBuf>) -> Result<Self> {
        let provider = JarClassProvider::new(jar_path);
        let class_names = provider.class_names()?;
        Self::with_provider(provider, class_names)
    }
}

impl RemapProject<DirectoryClassProvider> {
    /// Opens an exploded `.class` tree and indexes every class in it.
    pub fn open_directory(root: impl Into<std::path::PathBuf>) -> Result<Self> {
        let provider = DirectoryClassProvider::new(root);
        let class_names = provider.class_names()?;
        Self::with_provider(provider, class_names)
    }
}

impl<P: ClassProvider> RemapProject<P> {
    /// Builds a project over any byte source; `class_names` is the set to
    /// index for inheritance and conflict detection.
    pub fn with_provider(provider: P, class_names: Vec<String>) -> Result<Self> {
        let provider = Arc::new(CachingClassProvider::new(provider));
        let (hierarchy, load_failures) = InheritanceIndex::build(&provider, &class_names);
        debug!(
            classes = hierarchy.class_count(),
            failures = load_failures.len(),
            "project opened"
        );
        Ok(Self {
            provider,
            translator: Translator::new(Arc::new(hierarchy)),
            decompiler: Box::new(SkeletonDecompiler),
            load_failures,
        })
    }

    /// Swaps in another decompiler implementation.
    pub fn with_decompiler(mut self, decompiler: Box<dyn Decompiler>) -> Self {
        self.decompiler = decompiler;
        self
    }

    /// Decompiles `class_name` against the current mapping state.
    pub fn source(&self, class_name: &str) -> Result<Arc<Source>> {
        let parsed = self.provider.get(class_name)?;
        let source = self.decompiler.decompile(&parsed, &self.translator)?;
        Ok(Arc::new(source))
    }

    pub fn display_name(&self, entry: &Entry) -> String {
        self.translator.display_name(entry)
    }

    pub fn rename(&self, entry: &Entry, new_name: &str) -> Result<RenameOutcome> {
        self.translator.rename(entry, new_name)
    }

    pub fn snapshot(&self) -> MappingSnapshot {
        self.translator.snapshot()
    }

    pub fn load_mappings(&self, snapshot: MappingSnapshot) -> Result<()> {
        self.translator.load(snapshot)
    }

    /// Indexed top-level classes, sorted. Inner classes stay addressable by
    /// exact name through `source()`.
    pub fn classes(&self) -> Vec<ClassEntry> {
        let mut classes: Vec<ClassEntry> = self
            .hierarchy()
            .class_names()
            .filter(|name| !name.contains('$'))
            .map(ClassEntry::new)
            .collect();
        classes.sort();
        classes
    }

    /// Classes that failed to load or parse while the index was built.
    pub fn load_failures(&self) -> &[(String, Error)] {
        &self.load_failures
    }

    pub fn stats(&self) -> ProjectStats {
        ProjectStats {
            classes_indexed: self.hierarchy().class_count(),
            classes_cached: self.provider.cached_classes(),
            mapped_entries: self.translator.mapped_count(),
            load_failures: self.load_failures.len(),
        }
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn hierarchy(&self) -> &InheritanceIndex {
        self.translator.hierarchy()
    }

    pub fn provider(&self) -> &CachingClassProvider<P> {
        &self.provider
    }
}
