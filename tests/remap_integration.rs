use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use class_remapper::entry::{
    ArgumentEntry, ClassEntry, Entry, EntryReference, FieldEntry, MethodEntry,
};
use class_remapper::error::Error;
use class_remapper::project::RemapProject;
use class_remapper::translate::{MappingSnapshot, RenameOutcome};

const ACC_PUBLIC: u16 = 0x0001;
const ACC_STATIC: u16 = 0x0008;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "class_remapper_it_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ))
}

fn write_jar(path: &std::path::Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
    use std::io::Write;
    use zip::write::FileOptions;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

/// Minimal classfile emitter, just enough structure for the parser: constant
/// pool with deduplicated UTF-8/class entries, member tables, no attributes.
#[derive(Default)]
struct ClassWriter {
    pool: Vec<Vec<u8>>,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl ClassWriter {
    fn utf8(&mut self, text: &str) -> u16 {
        if let Some(&index) = self.utf8.get(text) {
            return index;
        }
        let mut encoded = vec![1u8];
        encoded.extend_from_slice(&(text.len() as u16).to_be_bytes());
        encoded.extend_from_slice(text.as_bytes());
        self.pool.push(encoded);
        let index = self.pool.len() as u16;
        self.utf8.insert(text.to_string(), index);
        index
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(&index) = self.classes.get(name) {
            return index;
        }
        let utf8 = self.utf8(name);
        let mut encoded = vec![7u8];
        encoded.extend_from_slice(&utf8.to_be_bytes());
        self.pool.push(encoded);
        let index = self.pool.len() as u16;
        self.classes.insert(name.to_string(), index);
        index
    }
}

type Member<'a> = (&'a str, &'a str, u16);

fn class_bytes(
    name: &str,
    super_class: &str,
    interfaces: &[&str],
    fields: &[Member<'_>],
    methods: &[Member<'_>],
) -> Vec<u8> {
    let mut writer = ClassWriter::default();
    let this_index = writer.class(name);
    let super_index = writer.class(super_class);
    let interface_indices: Vec<u16> = interfaces.iter().map(|i| writer.class(i)).collect();

    let encode_members = |writer: &mut ClassWriter, members: &[Member<'_>]| {
        let mut out = Vec::new();
        out.extend_from_slice(&(members.len() as u16).to_be_bytes());
        for (member_name, descriptor, flags) in members {
            let name_index = writer.utf8(member_name);
            let desc_index = writer.utf8(descriptor);
            out.extend_from_slice(&flags.to_be_bytes());
            out.extend_from_slice(&name_index.to_be_bytes());
            out.extend_from_slice(&desc_index.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes()); // no attributes
        }
        out
    };
    let field_table = encode_members(&mut writer, fields);
    let method_table = encode_members(&mut writer, methods);

    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&52u16.to_be_bytes());
    out.extend_from_slice(&((writer.pool.len() + 1) as u16).to_be_bytes());
    for constant in &writer.pool {
        out.extend_from_slice(constant);
    }
    out.extend_from_slice(&ACC_PUBLIC.to_be_bytes());
    out.extend_from_slice(&this_index.to_be_bytes());
    out.extend_from_slice(&super_index.to_be_bytes());
    out.extend_from_slice(&(interface_indices.len() as u16).to_be_bytes());
    for index in interface_indices {
        out.extend_from_slice(&index.to_be_bytes());
    }
    out.extend_from_slice(&field_table);
    out.extend_from_slice(&method_table);
    out.extend_from_slice(&0u16.to_be_bytes()); // no class attributes
    out
}

/// Jar with an override chain and enough members to provoke conflicts:
///   a            { int x; void b(); void taken(); }
///   sub extends a { void b(); widget make(widget, widget); }
///   widget       { }
fn sample_jar(name: &str) -> anyhow::Result<std::path::PathBuf> {
    let jar = temp_dir(name).join("sample.jar");
    let object = "java/lang/Object";
    let a = class_bytes(
        "a",
        object,
        &[],
        &[("x", "I", 0)],
        &[("b", "()V", ACC_PUBLIC), ("taken", "()V", ACC_PUBLIC)],
    );
    let sub = class_bytes(
        "sub",
        "a",
        &[],
        &[],
        &[
            ("b", "()V", ACC_PUBLIC),
            ("make", "(Lwidget;Lwidget;)Lwidget;", ACC_PUBLIC),
        ],
    );
    let widget = class_bytes("widget", object, &[], &[], &[]);
    write_jar(
        &jar,
        &[
            ("a.class", a.as_slice()),
            ("sub.class", sub.as_slice()),
            ("widget.class", widget.as_slice()),
        ],
    )?;
    Ok(jar)
}

fn method(owner: &str, name: &str, descriptor: &str) -> Entry {
    Entry::Method(MethodEntry::new(ClassEntry::new(owner), name, descriptor))
}

#[test]
fn declaration_token_tracks_the_display_name() -> anyhow::Result<()> {
    let jar = sample_jar("decl_token")?;
    let project = RemapProject::open_jar(&jar)?;
    let entry = method("a", "b", "()V");

    let source = project.source("a")?;
    let token = source.index().declaration_token(&entry).unwrap();
    assert_eq!(source.token_text(token), "b");
    assert_eq!(source.token_text(token), project.display_name(&entry));

    project.rename(&entry, "doStuff")?;
    let renamed = project.source("a")?;
    let token = renamed.index().declaration_token(&entry).unwrap();
    assert_eq!(renamed.token_text(token), "doStuff");
    assert!(renamed.text().contains("void doStuff()"));
    assert_ne!(source.content_hash(), renamed.content_hash());
    Ok(())
}

#[test]
fn rename_propagates_across_the_override_chain() -> anyhow::Result<()> {
    let jar = sample_jar("propagation")?;
    let project = RemapProject::open_jar(&jar)?;

    let outcome = project.rename(&method("a", "b", "()V"), "run")?;
    assert!(matches!(outcome, RenameOutcome::Renamed { ref entries } if entries.len() == 2));

    // The override in `sub` follows without a second rename call.
    assert_eq!(project.display_name(&method("sub", "b", "()V")), "run");
    let source = project.source("sub")?;
    let token = source
        .index()
        .declaration_token(&method("sub", "b", "()V"))
        .unwrap();
    assert_eq!(source.token_text(token), "run");
    Ok(())
}

#[test]
fn conflicts_anywhere_in_the_chain_roll_back_everything() -> anyhow::Result<()> {
    let jar = sample_jar("conflict")?;
    let project = RemapProject::open_jar(&jar)?;

    // `taken()V` lives in `a` with the same descriptor as b.
    let err = project.rename(&method("a", "b", "()V"), "taken").unwrap_err();
    assert!(matches!(err, Error::NameConflict { .. }));
    assert_eq!(project.display_name(&method("a", "b", "()V")), "b");
    assert_eq!(project.display_name(&method("sub", "b", "()V")), "b");
    assert_eq!(project.stats().mapped_entries, 0);

    // Renaming to the current name is a no-op, not an error.
    assert_eq!(
        project.rename(&method("a", "b", "()V"), "b")?,
        RenameOutcome::Unchanged
    );
    Ok(())
}

#[test]
fn conflict_in_a_subclass_rolls_back_the_chain() -> anyhow::Result<()> {
    let base = temp_dir("sub_conflict");
    let jar = base.join("sub_conflict.jar");
    let object = "java/lang/Object";
    let a = class_bytes("a", object, &[], &[], &[("b", "()V", ACC_PUBLIC)]);
    let sub = class_bytes(
        "sub",
        "a",
        &[],
        &[],
        &[("b", "()V", ACC_PUBLIC), ("other", "()V", ACC_PUBLIC)],
    );
    write_jar(
        &jar,
        &[("a.class", a.as_slice()), ("sub.class", sub.as_slice())],
    )?;

    let project = RemapProject::open_jar(&jar)?;
    // `a` has no member called `other`; only the propagated `sub.b` collides.
    let err = project.rename(&method("a", "b", "()V"), "other").unwrap_err();
    assert!(
        matches!(err, Error::NameConflict { ref taken_by, .. } if *taken_by == method("sub", "other", "()V"))
    );
    assert_eq!(project.display_name(&method("a", "b", "()V")), "b");
    assert_eq!(project.display_name(&method("sub", "b", "()V")), "b");
    assert_eq!(project.stats().mapped_entries, 0);
    Ok(())
}

#[test]
fn shared_names_in_unrelated_classes_stay_independent() -> anyhow::Result<()> {
    let base = temp_dir("unrelated");
    let jar = base.join("unrelated.jar");
    let object = "java/lang/Object";
    let a = class_bytes("a", object, &[], &[], &[("m", "()V", ACC_PUBLIC)]);
    let c = class_bytes("c", object, &[], &[], &[("m", "()V", ACC_PUBLIC)]);
    write_jar(
        &jar,
        &[("a.class", a.as_slice()), ("c.class", c.as_slice())],
    )?;

    let project = RemapProject::open_jar(&jar)?;
    let outcome = project.rename(&method("a", "m", "()V"), "run")?;
    assert!(matches!(outcome, RenameOutcome::Renamed { ref entries } if entries.len() == 1));
    assert_eq!(project.display_name(&method("a", "m", "()V")), "run");
    // `c` only shares a name with `a.m`; it is not in any override chain.
    assert_eq!(project.display_name(&method("c", "m", "()V")), "m");
    Ok(())
}

#[test]
fn reference_tokens_are_ordered_and_disjoint() -> anyhow::Result<()> {
    let jar = sample_jar("references")?;
    let project = RemapProject::open_jar(&jar)?;
    let source = project.source("sub")?;

    let make = method("sub", "make", "(Lwidget;Lwidget;)Lwidget;");
    let reference = EntryReference::new(make.clone(), ClassEntry::new("widget"));
    let tokens = source.index().reference_tokens(&reference);
    // Return type plus both parameter types.
    assert_eq!(tokens.len(), 3);
    for window in tokens.windows(2) {
        assert!(window[0].end <= window[1].start);
    }
    for token in tokens {
        assert_eq!(source.token_text(*token), "widget");
    }

    // Parameters are declared entries of their own.
    let arg1 = Entry::Argument(ArgumentEntry::new(
        MethodEntry::new(ClassEntry::new("sub"), "make", "(Lwidget;Lwidget;)Lwidget;"),
        1,
    ));
    let token = source.index().declaration_token(&arg1).unwrap();
    assert_eq!(source.token_text(token), "arg1");
    Ok(())
}

#[test]
fn renamed_class_flows_into_other_renders() -> anyhow::Result<()> {
    let jar = sample_jar("class_rename")?;
    let project = RemapProject::open_jar(&jar)?;

    project.rename(&Entry::Class(ClassEntry::new("widget")), "gui/Button")?;
    let source = project.source("sub")?;
    assert!(source.text().contains("Button make(Button arg0, Button arg1)"));

    // The reference key stays the obfuscated identity.
    let make = method("sub", "make", "(Lwidget;Lwidget;)Lwidget;");
    let reference = EntryReference::new(make, ClassEntry::new("widget"));
    let tokens = source.index().reference_tokens(&reference);
    assert_eq!(tokens.len(), 3);
    assert_eq!(source.token_text(tokens[0]), "Button");
    Ok(())
}

#[test]
fn missing_and_malformed_classes_are_distinct() -> anyhow::Result<()> {
    let base = temp_dir("errors");
    let jar = base.join("broken.jar");
    let good = class_bytes("ok", "java/lang/Object", &[], &[], &[]);
    write_jar(
        &jar,
        &[
            ("ok.class", good.as_slice()),
            ("broken.class", b"not a classfile".as_slice()),
        ],
    )?;

    let project = RemapProject::open_jar(&jar)?;
    assert!(matches!(
        project.source("nope").unwrap_err(),
        Error::ClassNotFound(_)
    ));
    assert!(matches!(
        project.source("broken").unwrap_err(),
        Error::MalformedClass { .. }
    ));
    // The broken class was reported, not silently skipped, and did not
    // poison the rest of the jar.
    assert_eq!(project.load_failures().len(), 1);
    assert_eq!(project.load_failures()[0].0, "broken");
    assert!(project.source("ok").is_ok());
    Ok(())
}

#[test]
fn sequential_decompiles_are_bit_identical() -> anyhow::Result<()> {
    let jar = sample_jar("determinism")?;
    let project = RemapProject::open_jar(&jar)?;

    let first = project.source("a")?;
    let second = project.source("a")?;
    assert_eq!(first.text(), second.text());
    assert_eq!(first.content_hash(), second.content_hash());

    let entry = method("a", "b", "()V");
    assert_eq!(
        first.index().declaration_token(&entry),
        second.index().declaration_token(&entry)
    );
    Ok(())
}

#[test]
fn snapshot_survives_a_json_round_trip() -> anyhow::Result<()> {
    let jar = sample_jar("snapshot")?;
    let project = RemapProject::open_jar(&jar)?;
    project.rename(&method("a", "b", "()V"), "run")?;
    project.rename(
        &Entry::Field(FieldEntry::new(ClassEntry::new("a"), "x", "I")),
        "count",
    )?;

    let json = project.snapshot().to_json()?;
    let restored = MappingSnapshot::from_json(&json)?;

    let fresh = RemapProject::open_jar(&jar)?;
    fresh.load_mappings(restored)?;
    assert_eq!(fresh.display_name(&method("sub", "b", "()V")), "run");
    let source = fresh.source("a")?;
    assert!(source.text().contains("int count;"));
    assert_eq!(fresh.snapshot(), project.snapshot());
    Ok(())
}

#[test]
fn project_enumerates_top_level_classes() -> anyhow::Result<()> {
    let base = temp_dir("enumerate");
    let jar = base.join("inner.jar");
    let outer = class_bytes("outer", "java/lang/Object", &[], &[], &[]);
    let inner = class_bytes("outer$inner", "java/lang/Object", &[], &[], &[]);
    write_jar(
        &jar,
        &[
            ("outer.class", outer.as_slice()),
            ("outer$inner.class", inner.as_slice()),
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".as_slice()),
        ],
    )?;

    let project = RemapProject::open_jar(&jar)?;
    assert_eq!(project.classes(), vec![ClassEntry::new("outer")]);
    // Inner classes stay addressable by exact name.
    assert!(project.source("outer$inner").is_ok());
    Ok(())
}

#[test]
fn exploded_class_trees_open_like_jars() -> anyhow::Result<()> {
    let root = temp_dir("directory");
    std::fs::create_dir_all(root.join("pkg"))?;
    let top = class_bytes("top", "java/lang/Object", &[], &[], &[("b", "()V", ACC_PUBLIC)]);
    let nested = class_bytes("pkg/nested", "java/lang/Object", &[], &[], &[]);
    std::fs::write(root.join("top.class"), &top)?;
    std::fs::write(root.join("pkg/nested.class"), &nested)?;

    let project = RemapProject::open_directory(&root)?;
    assert_eq!(
        project.classes(),
        vec![ClassEntry::new("pkg/nested"), ClassEntry::new("top")]
    );
    let source = project.source("pkg/nested")?;
    assert!(source.text().starts_with("package pkg;\n"));
    assert!(project
        .source("top")?
        .index()
        .declaration_token(&method("top", "b", "()V"))
        .is_some());
    Ok(())
}

#[test]
fn static_members_do_not_propagate() -> anyhow::Result<()> {
    let base = temp_dir("statics");
    let jar = base.join("statics.jar");
    let object = "java/lang/Object";
    let a = class_bytes(
        "a",
        object,
        &[],
        &[],
        &[("s", "()V", ACC_PUBLIC | ACC_STATIC)],
    );
    let sub = class_bytes(
        "sub",
        "a",
        &[],
        &[],
        &[("s", "()V", ACC_PUBLIC | ACC_STATIC)],
    );
    write_jar(
        &jar,
        &[("a.class", a.as_slice()), ("sub.class", sub.as_slice())],
    )?;

    let project = RemapProject::open_jar(&jar)?;
    project.rename(&method("a", "s", "()V"), "helper")?;
    assert_eq!(project.display_name(&method("a", "s", "()V")), "helper");
    assert_eq!(project.display_name(&method("sub", "s", "()V")), "s");
    Ok(())
}
