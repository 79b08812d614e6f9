//! # class-remapper
//!
//! Symbol identity, source-token indexing and rename propagation for
//! name-obfuscated JVM bytecode.
//!
//! ## Architecture
//!
//! - **entry**: identity values for classes, fields, methods and arguments
//! - **descriptor**: JVM descriptor parsing and Java-source type rendering
//! - **classfile**: minimal classfile parsing into `ParsedClass`
//! - **provider**: jar/directory byte sources and the single-flight cache
//! - **source**: rendered text, token spans and the per-class source index
//! - **render**: deterministic Java skeleton rendering through display names
//! - **index**: source-index construction via tree-sitter AST walking
//! - **hierarchy**: inheritance adjacency and propagation-set computation
//! - **translate**: the rename table, conflict detection and snapshots
//! - **project**: session facade tying provider, translator and decompiler
//! - **error**: the error taxonomy shared by all of the above

pub mod classfile;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod hierarchy;
pub mod index;
pub mod project;
pub mod provider;
pub mod render;
pub mod source;
pub mod translate;
