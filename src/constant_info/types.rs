use binrw::{binread, binrw, BinRead, BinResult};

#[derive(Clone, Debug, PartialEq)]
#[binread]
#[br(big)]
pub enum ConstantInfo {
    #[br(magic = 1u8)]
    Utf8(Utf8Constant),
    #[br(magic = 3u8)]
    Integer(IntegerConstant),
    #[br(magic = 4u8)]
    Float(FloatConstant),
    #[br(magic = 5u8)]
    Long(LongConstant),
    #[br(magic = 6u8)]
    Double(DoubleConstant),
    #[br(magic = 7u8)]
    Class(ClassConstant),
    #[br(magic = 8u8)]
    String(StringConstant),
    #[br(magic = 9u8)]
    FieldRef(FieldRefConstant),
    #[br(magic = 10u8)]
    MethodRef(MethodRefConstant),
    #[br(magic = 11u8)]
    InterfaceMethodRef(InterfaceMethodRefConstant),
    #[br(magic = 12u8)]
    NameAndType(NameAndTypeConstant),
    #[br(magic = 15u8)]
    MethodHandle(MethodHandleConstant),
    #[br(magic = 16u8)]
    MethodType(MethodTypeConstant),
    #[br(magic = 17u8)]
    Dynamic(DynamicConstant),
    #[br(magic = 18u8)]
    InvokeDynamic(InvokeDynamicConstant),
    #[br(magic = 19u8)]
    Module(ModuleConstant),
    #[br(magic = 20u8)]
    Package(PackageConstant),
    /// Second slot of a long or double entry. Never read from the stream.
    #[br(magic = 0u8, pre_assert(false))]
    Unusable,
}

impl ConstantInfo {
    /// Long and double entries take up two constant pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, ConstantInfo::Long(_) | ConstantInfo::Double(_))
    }

    /// Name of the entry's tag, for diagnostics.
    pub fn tag_name(&self) -> &'static str {
        match self {
            ConstantInfo::Utf8(_) => "Utf8",
            ConstantInfo::Integer(_) => "Integer",
            ConstantInfo::Float(_) => "Float",
            ConstantInfo::Long(_) => "Long",
            ConstantInfo::Double(_) => "Double",
            ConstantInfo::Class(_) => "Class",
            ConstantInfo::String(_) => "String",
            ConstantInfo::FieldRef(_) => "Fieldref",
            ConstantInfo::MethodRef(_) => "Methodref",
            ConstantInfo::InterfaceMethodRef(_) => "InterfaceMethodref",
            ConstantInfo::NameAndType(_) => "NameAndType",
            ConstantInfo::MethodHandle(_) => "MethodHandle",
            ConstantInfo::MethodType(_) => "MethodType",
            ConstantInfo::Dynamic(_) => "Dynamic",
            ConstantInfo::InvokeDynamic(_) => "InvokeDynamic",
            ConstantInfo::Module(_) => "Module",
            ConstantInfo::Package(_) => "Package",
            ConstantInfo::Unusable => "Unusable",
        }
    }
}

/// Reads `size - 1` pool slots, padding after every long and double entry.
#[binrw::parser(reader, endian)]
pub fn parse_constant_pool(size: u16) -> BinResult<Vec<ConstantInfo>> {
    let slots = (size as usize).saturating_sub(1);
    let mut pool = Vec::with_capacity(slots);
    while pool.len() < slots {
        let entry = ConstantInfo::read_options(reader, endian, ())?;
        let wide = entry.is_wide();
        pool.push(entry);
        if wide {
            pool.push(ConstantInfo::Unusable);
        }
    }
    Ok(pool)
}

#[binread]
#[derive(Clone, Debug, PartialEq)]
#[br(big)]
pub struct Utf8Constant {
    #[br(temp)]
    length: u16,
    #[br(temp, count = length)]
    bytes: Vec<u8>,
    #[br(calc = decode_modified_utf8(&bytes))]
    pub utf8_string: String,
}

impl Utf8Constant {
    pub fn new(value: &str) -> Self {
        Utf8Constant {
            utf8_string: value.to_string(),
        }
    }
}

/// Decodes the class file's "modified UTF-8": NUL is encoded as `C0 80` and
/// supplementary characters as surrogate pairs of three-byte sequences.
pub fn decode_modified_utf8(bytes: &[u8]) -> String {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i] as u16;
        if b0 & 0x80 == 0 {
            units.push(b0);
            i += 1;
        } else if b0 & 0xe0 == 0xc0 && i + 1 < bytes.len() {
            let b1 = bytes[i + 1] as u16;
            units.push(((b0 & 0x1f) << 6) | (b1 & 0x3f));
            i += 2;
        } else if b0 & 0xf0 == 0xe0 && i + 2 < bytes.len() {
            let b1 = bytes[i + 1] as u16;
            let b2 = bytes[i + 2] as u16;
            units.push(((b0 & 0x0f) << 12) | ((b1 & 0x3f) << 6) | (b2 & 0x3f));
            i += 3;
        } else {
            units.push(0xfffd);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct IntegerConstant {
    pub value: i32,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct FloatConstant {
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct LongConstant {
    pub value: i64,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct DoubleConstant {
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct ClassConstant {
    pub name_index: u16,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct StringConstant {
    pub string_index: u16,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct FieldRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct MethodRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct InterfaceMethodRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct NameAndTypeConstant {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct MethodHandleConstant {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct MethodTypeConstant {
    pub descriptor_index: u16,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct DynamicConstant {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct InvokeDynamicConstant {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct ModuleConstant {
    pub name_index: u16,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub struct PackageConstant {
    pub name_index: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_modified_utf8() {
        assert_eq!(decode_modified_utf8(b"hello"), "hello");
        assert_eq!(decode_modified_utf8(&[0x61, 0xc0, 0x80, 0x62]), "a\u{0}b");
        // U+1F600 as a CESU-8 surrogate pair
        let smiley = [0xed, 0xa0, 0xbd, 0xed, 0xb8, 0x80];
        assert_eq!(decode_modified_utf8(&smiley), "\u{1F600}");
    }

    #[test]
    fn test_constant_pool_pads_wide_entries() {
        #[rustfmt::skip]
        let bytes: Vec<u8> = vec![
            5, 0, 0, 0, 0, 0, 0, 0, 42,   // #1 Long 42 (+ #2 unusable)
            1, 0, 2, b'h', b'i',          // #3 Utf8 "hi"
            8, 0, 3,                      // #4 String #3
        ];
        let mut cursor = Cursor::new(bytes);
        let pool = parse_constant_pool(&mut cursor, binrw::Endian::Big, (5,)).unwrap();
        assert_eq!(pool.len(), 4);
        assert_eq!(pool[0], ConstantInfo::Long(LongConstant { value: 42 }));
        assert_eq!(pool[1], ConstantInfo::Unusable);
        assert_eq!(pool[2], ConstantInfo::Utf8(Utf8Constant::new("hi")));
        assert_eq!(pool[3], ConstantInfo::String(StringConstant { string_index: 3 }));
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let mut cursor = Cursor::new(vec![2u8, 0, 0]);
        assert!(ConstantInfo::read_be(&mut cursor).is_err());
    }
}
