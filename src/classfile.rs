/// Class-file decoding: the type, its supertypes, fields and methods.
use std::path::Path;

use crate::error::ClassFileError;
use crate::symbols::{FieldDecl, MethodDecl, Origin, TypeDecl};

/// `0xCAFEBABE`.
const MAGIC: u32 = 0xCAFE_BABE;

/// `ACC_VARARGS` on a method.
const ACC_VARARGS: u16 = 0x0080;

/// `ACC_SYNTHETIC` on a field or method.
const ACC_SYNTHETIC: u16 = 0x1000;

/// Constant pool entries the decoder needs to look at again.
#[derive(Debug, Clone)]
enum Constant {
    /// `CONSTANT_Class` pointing at a UTF-8 entry.
    Class(u16),
    /// Slot 0, the second slot of a long/double, or anything not referenced.
    Other,
    /// `CONSTANT_Utf8`.
    Utf8(String),
}

/// Big-endian cursor over the class bytes.
struct ByteReader<'a> {
    /// The whole class file.
    bytes: &'a [u8],
    /// Next unread offset.
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Take the next `count` bytes.
    ///
    /// # Errors
    ///
    /// Returns `ClassFileError::Truncated` past the end.
    fn take(&mut self, count: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self.position.checked_add(count).ok_or(ClassFileError::Truncated)?;
        let slice = self.bytes.get(self.position..end).ok_or(ClassFileError::Truncated)?;
        self.position = end;
        return Ok(slice);
    }

    /// Read one byte.
    fn u1(&mut self) -> Result<u8, ClassFileError> {
        let [b] = self.take(1)? else {
            return Err(ClassFileError::Truncated);
        };
        return Ok(*b);
    }

    /// Read a big-endian `u16`.
    fn u2(&mut self) -> Result<u16, ClassFileError> {
        let [a, b] = self.take(2)? else {
            return Err(ClassFileError::Truncated);
        };
        return Ok(u16::from_be_bytes([*a, *b]));
    }

    /// Read a big-endian `u32`.
    fn u4(&mut self) -> Result<u32, ClassFileError> {
        let [a, b, c, d] = self.take(4)? else {
            return Err(ClassFileError::Truncated);
        };
        return Ok(u32::from_be_bytes([*a, *b, *c, *d]));
    }

    /// Skip `count` bytes.
    fn skip(&mut self, count: usize) -> Result<(), ClassFileError> {
        self.take(count)?;
        return Ok(());
    }
}

/// Decoded constant pool, indexed from 1.
struct ConstantPool(
    /// Entries; index 0 is a placeholder.
    Vec<Constant>,
);

impl ConstantPool {
    /// Read `count - 1` entries.
    ///
    /// # Errors
    ///
    /// Returns `ClassFileError::BadConstant` for unknown tags or `Truncated`.
    fn read(reader: &mut ByteReader<'_>, count: u16) -> Result<Self, ClassFileError> {
        let mut entries = vec![Constant::Other];
        let mut index: u16 = 1;
        while index < count {
            let tag = reader.u1()?;
            let mut slots: u16 = 1;
            let constant = match tag {
                1 => {
                    let length = usize::from(reader.u2()?);
                    let raw = reader.take(length)?;
                    Constant::Utf8(decode_modified_utf8(raw))
                },
                7 => Constant::Class(reader.u2()?),
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                },
                5 | 6 => {
                    reader.skip(8)?;
                    slots = 2;
                    Constant::Other
                },
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                },
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                },
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                },
                _ => return Err(ClassFileError::BadConstant { index, tag }),
            };
            entries.push(constant);
            if slots == 2 {
                entries.push(Constant::Other);
            }
            index = index.saturating_add(slots);
        }
        return Ok(Self(entries));
    }

    /// The UTF-8 string at `index`.
    fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        return match self.0.get(usize::from(index)) {
            Some(Constant::Utf8(s)) => Ok(s),
            _ => Err(ClassFileError::BadReference {
                expected: "Utf8",
                index,
            }),
        };
    }

    /// The binary name of the class at `index`, dotted.
    fn class_name(&self, index: u16) -> Result<String, ClassFileError> {
        return match self.0.get(usize::from(index)) {
            Some(Constant::Class(name)) => Ok(self.utf8(*name)?.replace('/', ".")),
            _ => Err(ClassFileError::BadReference {
                expected: "Class",
                index,
            }),
        };
    }
}

/// Modified UTF-8 is plain UTF-8 for everything a Java identifier holds in practice.
fn decode_modified_utf8(raw: &[u8]) -> String {
    return String::from_utf8_lossy(raw).into_owned();
}

/// Decode a class file into a type declaration.
///
/// # Errors
///
/// Returns `ClassFileError` when the bytes are not a well-formed class file.
pub fn parse(bytes: &[u8], origin: &Path) -> Result<TypeDecl, ClassFileError> {
    let mut reader = ByteReader { bytes, position: 0 };
    if reader.u4()? != MAGIC {
        return Err(ClassFileError::BadMagic);
    }
    reader.skip(4)?;
    let pool_count = reader.u2()?;
    let pool = ConstantPool::read(&mut reader, pool_count)?;

    let _access = reader.u2()?;
    let binary_name = pool.class_name(reader.u2()?)?;
    let super_index = reader.u2()?;
    let super_class = if super_index == 0 {
        None
    } else {
        Some(pool.class_name(super_index)?)
    };
    let interface_count = reader.u2()?;
    let mut interfaces = Vec::with_capacity(usize::from(interface_count));
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(reader.u2()?)?);
    }

    let mut fields = Vec::new();
    for _ in 0..reader.u2()? {
        let access = reader.u2()?;
        let name = pool.utf8(reader.u2()?)?.to_string();
        let descriptor = pool.utf8(reader.u2()?)?.to_string();
        skip_attributes(&mut reader)?;
        if access & ACC_SYNTHETIC != 0 {
            continue;
        }
        fields.push(FieldDecl {
            name,
            type_name: descriptor_type(&descriptor),
        });
    }

    let mut methods = Vec::new();
    for _ in 0..reader.u2()? {
        let access = reader.u2()?;
        let name = pool.utf8(reader.u2()?)?.to_string();
        let descriptor = pool.utf8(reader.u2()?)?.to_string();
        skip_attributes(&mut reader)?;
        if name.starts_with('<') || access & ACC_SYNTHETIC != 0 {
            continue;
        }
        let (arity, return_type) = method_signature(&descriptor);
        methods.push(MethodDecl {
            arity,
            name,
            return_type,
            varargs: access & ACC_VARARGS != 0,
        });
    }

    return Ok(TypeDecl {
        binary_name,
        fields,
        interfaces,
        methods,
        origin: Origin::Classpath(origin.to_path_buf()),
        super_class,
    });
}

/// Skip an `attributes` table.
fn skip_attributes(reader: &mut ByteReader<'_>) -> Result<(), ClassFileError> {
    for _ in 0..reader.u2()? {
        reader.skip(2)?;
        let length = usize::try_from(reader.u4()?).map_err(|_| ClassFileError::Truncated)?;
        reader.skip(length)?;
    }
    return Ok(());
}

/// Type of a field descriptor: binary name for objects, `[]`-suffixed for
/// arrays of objects, `None` for primitives.
fn descriptor_type(descriptor: &str) -> Option<String> {
    let dimensions = descriptor.chars().take_while(|c| *c == '[').count();
    let element = descriptor.get(dimensions..)?;
    let name = element.strip_prefix('L')?.strip_suffix(';')?;
    return Some(format!("{}{}", name.replace('/', "."), "[]".repeat(dimensions)));
}

/// Parameter count and return type of a method descriptor `(params)ret`.
fn method_signature(descriptor: &str) -> (usize, Option<String>) {
    let Some((params, ret)) = descriptor.strip_prefix('(').and_then(|d| d.split_once(')')) else {
        return (0, None);
    };
    let mut arity = 0_usize;
    let mut chars = params.chars();
    while let Some(c) = chars.next() {
        match c {
            '[' => continue,
            'L' => {
                for inner in chars.by_ref() {
                    if inner == ';' {
                        break;
                    }
                }
                arity = arity.saturating_add(1);
            },
            _ => arity = arity.saturating_add(1),
        }
    }
    return (arity, descriptor_type(ret));
}
