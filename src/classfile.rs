//! Minimal JVM classfile parsing.
//!
//! Extracts exactly what identity resolution needs: the class's own name,
//! its superclass and interfaces, and the field/method tables with access
//! flags. Method bodies, annotations and debug attributes are skipped.
//! Unparsable bytes surface as [`Error::MalformedClass`], which callers must
//! keep distinct from a class that is simply absent.

use crate::entry::{ClassEntry, FieldEntry, MethodEntry};
use crate::error::{Error, Result};

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_ENUM: u16 = 0x4000;

const MAGIC: u32 = 0xCAFE_BABE;

/// One row of the field or method table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub synthetic: bool,
}

impl MemberInfo {
    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.access_flags & ACC_PRIVATE != 0
    }

    pub fn is_bridge(&self) -> bool {
        self.access_flags & ACC_BRIDGE != 0
    }

    /// Compiler-generated members have no textual declaration in a render.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic || self.access_flags & ACC_SYNTHETIC != 0 || self.is_bridge()
    }
}

/// Parsed representation of one class, the unit held by the caching
/// provider. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedClass {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
}

impl ParsedClass {
    /// Parses `bytes`; `name` is the requested class name, used only for
    /// error reporting.
    pub fn parse(name: &str, bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(name, bytes);

        let magic = r.u4()?;
        if magic != MAGIC {
            return Err(Error::malformed(name, format!("bad magic 0x{magic:08x}")));
        }
        let minor_version = r.u2()?;
        let major_version = r.u2()?;

        let pool = ConstantPool::parse(&mut r)?;

        let access_flags = r.u2()?;
        let this_class = pool.class_name(r.u2()?, &r)?;
        let super_index = r.u2()?;
        let super_class = if super_index == 0 {
            None
        } else {
            Some(pool.class_name(super_index, &r)?)
        };

        let interface_count = r.u2()? as usize;
        let mut interfaces = Vec::with_capacity(interface_count);
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(r.u2()?, &r)?);
        }

        let fields = parse_members(&mut r, &pool)?;
        let methods = parse_members(&mut r, &pool)?;
        skip_attributes(&mut r)?;

        Ok(Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
        })
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & ACC_INTERFACE != 0
    }

    pub fn entry(&self) -> ClassEntry {
        ClassEntry::new(self.this_class.clone())
    }

    pub fn field_entry(&self, member: &MemberInfo) -> FieldEntry {
        FieldEntry::new(self.entry(), member.name.clone(), member.descriptor.clone())
    }

    pub fn method_entry(&self, member: &MemberInfo) -> MethodEntry {
        MethodEntry::new(self.entry(), member.name.clone(), member.descriptor.clone())
    }
}

fn parse_members(r: &mut Reader<'_>, pool: &ConstantPool) -> Result<Vec<MemberInfo>> {
    let count = r.u2()? as usize;
    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        let access_flags = r.u2()?;
        let name = pool.utf8(r.u2()?, r)?.to_string();
        let descriptor = pool.utf8(r.u2()?, r)?.to_string();

        let mut synthetic = false;
        let attr_count = r.u2()? as usize;
        for _ in 0..attr_count {
            let attr_name_index = r.u2()?;
            let len = r.u4()? as usize;
            r.skip(len)?;
            if pool.utf8(attr_name_index, r)? == "Synthetic" {
                synthetic = true;
            }
        }

        members.push(MemberInfo {
            access_flags,
            name,
            descriptor,
            synthetic,
        });
    }
    Ok(members)
}

fn skip_attributes(r: &mut Reader<'_>) -> Result<()> {
    let count = r.u2()? as usize;
    for _ in 0..count {
        let _name = r.u2()?;
        let len = r.u4()? as usize;
        r.skip(len)?;
    }
    Ok(())
}

struct Reader<'a> {
    class_name: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(class_name: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            class_name,
            bytes,
            pos: 0,
        }
    }

    fn truncated(&self) -> Error {
        Error::malformed(self.class_name, format!("truncated at offset {}", self.pos))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or_else(|| self.truncated())?;
        if end > self.bytes.len() {
            return Err(self.truncated());
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn u1(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u2(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Constant pool, resolved just far enough to read class and UTF-8 entries.
#[derive(Debug)]
enum Constant {
    Utf8(String),
    Class(u16),
    /// Anything the remapping core never inspects.
    Opaque,
    /// Second slot of a long/double entry.
    Reserved,
}

struct ConstantPool {
    constants: Vec<Constant>,
}

impl ConstantPool {
    fn parse(r: &mut Reader<'_>) -> Result<Self> {
        let count = r.u2()? as usize;
        // Index 0 is unusable per the JVM spec.
        let mut constants = Vec::with_capacity(count);
        constants.push(Constant::Reserved);

        while constants.len() < count {
            let tag = r.u1()?;
            let constant = match tag {
                1 => {
                    let len = r.u2()? as usize;
                    let raw = r.take(len)?;
                    // Modified UTF-8 differs from UTF-8 only for NUL and
                    // supplementary characters; names never contain either.
                    let text = String::from_utf8(raw.to_vec()).map_err(|_| {
                        Error::malformed(r.class_name, "invalid UTF-8 constant")
                    })?;
                    Constant::Utf8(text)
                }
                7 => Constant::Class(r.u2()?),
                3 | 4 => {
                    r.skip(4)?;
                    Constant::Opaque
                }
                5 | 6 => {
                    r.skip(8)?;
                    constants.push(Constant::Opaque);
                    Constant::Reserved
                }
                8 | 16 | 19 | 20 => {
                    r.skip(2)?;
                    Constant::Opaque
                }
                15 => {
                    r.skip(3)?;
                    Constant::Opaque
                }
                9..=12 | 17 | 18 => {
                    r.skip(4)?;
                    Constant::Opaque
                }
                other => {
                    return Err(Error::malformed(
                        r.class_name,
                        format!("unknown constant pool tag {other}"),
                    ));
                }
            };
            constants.push(constant);
        }

        Ok(Self { constants })
    }

    fn utf8(&self, index: u16, r: &Reader<'_>) -> Result<&str> {
        match self.constants.get(index as usize) {
            Some(Constant::Utf8(text)) => Ok(text),
            _ => Err(Error::malformed(
                r.class_name,
                format!("constant {index} is not a UTF-8 entry"),
            )),
        }
    }

    fn class_name(&self, index: u16, r: &Reader<'_>) -> Result<String> {
        match self.constants.get(index as usize) {
            Some(Constant::Class(name_index)) => Ok(self.utf8(*name_index, r)?.to_string()),
            _ => Err(Error::malformed(
                r.class_name,
                format!("constant {index} is not a class entry"),
            )),
        }
    }
}
