//! Class byte sources and the session-scoped parsed-class cache.
//!
//! `JarClassProvider` and `DirectoryClassProvider` hand out raw class bytes;
//! `CachingClassProvider` sits on top and memoizes the parsed representation
//! with single-flight population: concurrent first requests for one class
//! collapse into one underlying load, while unrelated classes load in
//! parallel. The cache is append-only for the session, so the byte source is
//! invoked at most once per class name.

use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::classfile::ParsedClass;
use crate::error::{Error, Result};

/// Source of raw class bytes, keyed by binary class name.
pub trait ClassProvider: Send + Sync {
    /// Returns the class's bytes, or [`Error::ClassNotFound`] when the
    /// provider has no such class.
    fn class_bytes(&self, class_name: &str) -> Result<Vec<u8>>;
}

/// Reads classes out of a jar through a memory map.
#[derive(Debug, Clone)]
pub struct JarClassProvider {
    jar_path: PathBuf,
}

impl JarClassProvider {
    pub fn new(jar_path: impl Into<PathBuf>) -> Self {
        Self {
            jar_path: jar_path.into(),
        }
    }

    pub fn jar_path(&self) -> &Path {
        &self.jar_path
    }

    fn open(&self) -> Result<ZipArchive<Cursor<Mmap>>> {
        let display = self.jar_path.display().to_string();
        let file = File::open(&self.jar_path).map_err(|e| Error::io(&display, &e))?;
        // SAFETY: the file is opened read-only and the map lives only as
        // long as this archive handle.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::io(&display, &e))?;
        ZipArchive::new(Cursor::new(mmap)).map_err(|e| Error::Io {
            path: display,
            message: e.to_string(),
        })
    }

    /// Every class name in the jar, sorted, inner classes included.
    pub fn class_names(&self) -> Result<Vec<String>> {
        let mut archive = self.open()?;
        let mut names = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(|e| Error::Io {
                path: self.jar_path.display().to_string(),
                message: e.to_string(),
            })?;
            let name = entry.name();
            if let Some(class_name) = name.strip_suffix(".class") {
                names.push(class_name.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

impl ClassProvider for JarClassProvider {
    fn class_bytes(&self, class_name: &str) -> Result<Vec<u8>> {
        let mut archive = self.open()?;
        let entry_name = format!("{class_name}.class");
        let mut entry = match archive.by_name(&entry_name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(Error::ClassNotFound(class_name.to_string()));
            }
            Err(e) => {
                return Err(Error::Io {
                    path: self.jar_path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| Error::io(self.jar_path.display().to_string(), &e))?;
        Ok(bytes)
    }
}

/// Reads classes out of an exploded `.class` tree.
#[derive(Debug, Clone)]
pub struct DirectoryClassProvider {
    root: PathBuf,
}

impl DirectoryClassProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Every class name under the root, sorted.
    pub fn class_names(&self) -> Result<Vec<String>> {
        let (tx, rx) = mpsc::channel();

        let walker = ignore::WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .build_parallel();

        walker.run(|| {
            let tx = tx.clone();
            Box::new(move |entry| {
                if let Ok(entry) = entry {
                    let path = entry.path();
                    if path.extension().is_some_and(|e| e == "class") {
                        let _ = tx.send(path.to_path_buf());
                    }
                }
                ignore::WalkState::Continue
            })
        });
        drop(tx);

        let mut names = Vec::new();
        for path in rx {
            if let Ok(rel) = path.strip_prefix(&self.root) {
                let rel = rel.to_string_lossy().replace('\\', "/");
                if let Some(name) = rel.strip_suffix(".class") {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

impl ClassProvider for DirectoryClassProvider {
    fn class_bytes(&self, class_name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(format!("{class_name}.class"));
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::ClassNotFound(class_name.to_string()))
            }
            Err(e) => Err(Error::io(path.display().to_string(), &e)),
        }
    }
}

type CacheCell = Arc<OnceLock<Result<Arc<ParsedClass>>>>;

/// Memoizing, single-flight wrapper over a [`ClassProvider`].
///
/// Each class name gets one cell; the first requester populates it while
/// later concurrent requesters block on the same cell instead of re-reading.
/// Failures are cached too: a session never retries a class.
pub struct CachingClassProvider<P> {
    inner: P,
    cells: Mutex<HashMap<String, CacheCell>>,
}

impl<P: ClassProvider> CachingClassProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of classes resolved (or failed) so far this session.
    pub fn cached_classes(&self) -> usize {
        self.cells.lock().expect("cache lock poisoned").len()
    }

    /// The parsed representation of `class_name`, loading it on first use.
    pub fn get(&self, class_name: &str) -> Result<Arc<ParsedClass>> {
        let cell = {
            let mut cells = self.cells.lock().expect("cache lock poisoned");
            cells.entry(class_name.to_string()).or_default().clone()
        };

        // OnceLock serializes initialization: only the first caller runs the
        // closure, everyone else waits for the stored result.
        cell.get_or_init(|| {
            debug!(class = class_name, "loading class");
            let bytes = self.inner.class_bytes(class_name)?;
            Ok(Arc::new(ParsedClass::parse(class_name, &bytes)?))
        })
        .clone()
    }
}
