//! JVM type and method descriptor parsing plus Java-source rendering.
//!
//! Descriptors stay in obfuscated form inside entry identities; rendering
//! resolves the class names they mention through the current mapping so a
//! renamed class prints with its display name.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    pub fn keyword(self) -> &'static str {
        match self {
            BaseType::Byte => "byte",
            BaseType::Char => "char",
            BaseType::Double => "double",
            BaseType::Float => "float",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::Short => "short",
            BaseType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Base(BaseType),
    /// Binary class name, e.g. `java/lang/String`.
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// The class name this type mentions, if any (array types report their
    /// element class).
    pub fn object_name(&self) -> Option<&str> {
        match self {
            FieldType::Base(_) => None,
            FieldType::Object(name) => Some(name),
            FieldType::Array(elem) => elem.object_name(),
        }
    }

    /// Java source text for this type; `resolve` maps a binary class name to
    /// its current display binary name.
    pub fn render(&self, resolve: &dyn Fn(&str) -> String) -> String {
        match self {
            FieldType::Base(b) => b.keyword().to_string(),
            FieldType::Object(name) => {
                let display = resolve(name);
                display.rsplit('/').next().unwrap_or(&display).to_string()
            }
            FieldType::Array(elem) => format!("{}[]", elem.render(resolve)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Type(FieldType),
}

impl ReturnType {
    pub fn render(&self, resolve: &dyn Fn(&str) -> String) -> String {
        match self {
            ReturnType::Void => "void".to_string(),
            ReturnType::Type(ty) => ty.render(resolve),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub return_type: ReturnType,
}

pub fn parse_field_descriptor(desc: &str) -> Result<FieldType> {
    let mut cursor = Cursor::new(desc);
    let ty = cursor.field_type()?;
    cursor.expect_end()?;
    Ok(ty)
}

pub fn parse_method_descriptor(desc: &str) -> Result<MethodDescriptor> {
    let mut cursor = Cursor::new(desc);
    cursor.expect(b'(')?;

    let mut params = Vec::new();
    while cursor.peek().ok_or_else(|| cursor.err())? != b')' {
        params.push(cursor.field_type()?);
    }
    cursor.expect(b')')?;

    let return_type = if cursor.peek() == Some(b'V') {
        cursor.pos += 1;
        ReturnType::Void
    } else {
        ReturnType::Type(cursor.field_type()?)
    };
    cursor.expect_end()?;

    Ok(MethodDescriptor {
        params,
        return_type,
    })
}

struct Cursor<'a> {
    desc: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(desc: &'a str) -> Self {
        Self { desc, pos: 0 }
    }

    fn err(&self) -> Error {
        Error::InvalidName(self.desc.to_string())
    }

    fn peek(&self) -> Option<u8> {
        self.desc.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.err())
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos == self.desc.len() {
            Ok(())
        } else {
            Err(self.err())
        }
    }

    fn field_type(&mut self) -> Result<FieldType> {
        let b = self.peek().ok_or_else(|| self.err())?;
        self.pos += 1;
        let ty = match b {
            b'B' => FieldType::Base(BaseType::Byte),
            b'C' => FieldType::Base(BaseType::Char),
            b'D' => FieldType::Base(BaseType::Double),
            b'F' => FieldType::Base(BaseType::Float),
            b'I' => FieldType::Base(BaseType::Int),
            b'J' => FieldType::Base(BaseType::Long),
            b'S' => FieldType::Base(BaseType::Short),
            b'Z' => FieldType::Base(BaseType::Boolean),
            b'L' => {
                let rest = &self.desc[self.pos..];
                let end = rest.find(';').ok_or_else(|| self.err())?;
                let name = rest[..end].to_string();
                if name.is_empty() {
                    return Err(self.err());
                }
                self.pos += end + 1;
                FieldType::Object(name)
            }
            b'[' => FieldType::Array(Box::new(self.field_type()?)),
            _ => return Err(self.err()),
        };
        Ok(ty)
    }
}
