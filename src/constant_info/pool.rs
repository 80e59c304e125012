use std::fmt;

use crate::error::{ClassFileError, ClassFileResult};

use super::types::*;

/// How a method handle constant refers to its member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl ReferenceKind {
    pub fn from_tag(tag: u8) -> Option<ReferenceKind> {
        match tag {
            1 => Some(ReferenceKind::GetField),
            2 => Some(ReferenceKind::GetStatic),
            3 => Some(ReferenceKind::PutField),
            4 => Some(ReferenceKind::PutStatic),
            5 => Some(ReferenceKind::InvokeVirtual),
            6 => Some(ReferenceKind::InvokeStatic),
            7 => Some(ReferenceKind::InvokeSpecial),
            8 => Some(ReferenceKind::NewInvokeSpecial),
            9 => Some(ReferenceKind::InvokeInterface),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            ReferenceKind::GetField => 1,
            ReferenceKind::GetStatic => 2,
            ReferenceKind::PutField => 3,
            ReferenceKind::PutStatic => 4,
            ReferenceKind::InvokeVirtual => 5,
            ReferenceKind::InvokeStatic => 6,
            ReferenceKind::InvokeSpecial => 7,
            ReferenceKind::NewInvokeSpecial => 8,
            ReferenceKind::InvokeInterface => 9,
        }
    }

    /// Handle kinds whose target takes a receiver.
    pub fn has_receiver(self) -> bool {
        matches!(
            self,
            ReferenceKind::InvokeVirtual
                | ReferenceKind::InvokeSpecial
                | ReferenceKind::InvokeInterface
        )
    }
}

/// A resolved field, method or interface method reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub class_name: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub interface: bool,
}

/// A resolved method handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodHandleRef<'a> {
    pub kind: ReferenceKind,
    pub member: MemberRef<'a>,
}

/// A resolved invokedynamic call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvokeDynamicRef<'a> {
    pub bootstrap_method_attr_index: u16,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// A loadable literal (the operand of `ldc`, `ldc_w` and `ldc2_w`).
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(String),
}

impl Literal {
    /// Computational category of the literal once loaded on the stack.
    pub fn category(&self) -> u8 {
        match self {
            Literal::Long(_) | Literal::Double(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{}f", v),
            Literal::Long(v) => write!(f, "{}L", v),
            Literal::Double(v) => write!(f, "{}d", v),
            Literal::String(s) => write!(f, "\"{}\"", s),
            Literal::Class(name) => write!(f, "{}.class", name),
        }
    }
}

/// The constant pool of a class, indexed from 1 like the class file itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstantPool {
    entries: Vec<ConstantInfo>,
}

impl ConstantPool {
    pub fn new(entries: Vec<ConstantInfo>) -> Self {
        ConstantPool { entries }
    }

    pub fn builder() -> ConstantPoolBuilder {
        ConstantPoolBuilder::default()
    }

    pub fn entries(&self) -> &[ConstantInfo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> ClassFileResult<&ConstantInfo> {
        (index as usize)
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .ok_or(ClassFileError::BadIndex {
                index,
                size: self.entries.len(),
            })
    }

    pub fn utf8(&self, index: u16) -> ClassFileResult<&str> {
        match self.get(index)? {
            ConstantInfo::Utf8(u) => Ok(&u.utf8_string),
            _ => Err(mismatch(index, "Utf8")),
        }
    }

    /// Resolve a Class constant to its internal name.
    pub fn class_name(&self, index: u16) -> ClassFileResult<&str> {
        match self.get(index)? {
            ConstantInfo::Class(c) => self.utf8(c.name_index),
            _ => Err(mismatch(index, "Class")),
        }
    }

    /// Resolve a NameAndType constant to (name, descriptor).
    pub fn name_and_type(&self, index: u16) -> ClassFileResult<(&str, &str)> {
        match self.get(index)? {
            ConstantInfo::NameAndType(nat) => {
                Ok((self.utf8(nat.name_index)?, self.utf8(nat.descriptor_index)?))
            }
            _ => Err(mismatch(index, "NameAndType")),
        }
    }

    pub fn field_ref(&self, index: u16) -> ClassFileResult<MemberRef<'_>> {
        match self.get(index)? {
            ConstantInfo::FieldRef(r) => {
                self.member(r.class_index, r.name_and_type_index, false)
            }
            _ => Err(mismatch(index, "Fieldref")),
        }
    }

    /// Resolve a plain or interface method reference.
    pub fn method_ref(&self, index: u16) -> ClassFileResult<MemberRef<'_>> {
        match self.get(index)? {
            ConstantInfo::MethodRef(r) => {
                self.member(r.class_index, r.name_and_type_index, false)
            }
            ConstantInfo::InterfaceMethodRef(r) => {
                self.member(r.class_index, r.name_and_type_index, true)
            }
            _ => Err(mismatch(index, "Methodref")),
        }
    }

    fn member(
        &self,
        class_index: u16,
        name_and_type_index: u16,
        interface: bool,
    ) -> ClassFileResult<MemberRef<'_>> {
        let class_name = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(name_and_type_index)?;
        Ok(MemberRef {
            class_name,
            name,
            descriptor,
            interface,
        })
    }

    /// Resolve a loadable constant.
    pub fn literal(&self, index: u16) -> ClassFileResult<Literal> {
        match self.get(index)? {
            ConstantInfo::Integer(c) => Ok(Literal::Int(c.value)),
            ConstantInfo::Float(c) => Ok(Literal::Float(c.value)),
            ConstantInfo::Long(c) => Ok(Literal::Long(c.value)),
            ConstantInfo::Double(c) => Ok(Literal::Double(c.value)),
            ConstantInfo::String(c) => Ok(Literal::String(self.utf8(c.string_index)?.to_string())),
            ConstantInfo::Class(c) => Ok(Literal::Class(self.utf8(c.name_index)?.to_string())),
            _ => Err(mismatch(index, "loadable constant")),
        }
    }

    pub fn method_handle(&self, index: u16) -> ClassFileResult<MethodHandleRef<'_>> {
        match self.get(index)? {
            ConstantInfo::MethodHandle(h) => {
                let kind = ReferenceKind::from_tag(h.reference_kind)
                    .ok_or_else(|| mismatch(index, "MethodHandle"))?;
                let member = match kind {
                    ReferenceKind::GetField
                    | ReferenceKind::GetStatic
                    | ReferenceKind::PutField
                    | ReferenceKind::PutStatic => self.field_ref(h.reference_index)?,
                    _ => self.method_ref(h.reference_index)?,
                };
                Ok(MethodHandleRef { kind, member })
            }
            _ => Err(mismatch(index, "MethodHandle")),
        }
    }

    /// Resolve a MethodType constant to its descriptor.
    pub fn method_type(&self, index: u16) -> ClassFileResult<&str> {
        match self.get(index)? {
            ConstantInfo::MethodType(t) => self.utf8(t.descriptor_index),
            _ => Err(mismatch(index, "MethodType")),
        }
    }

    pub fn invoke_dynamic(&self, index: u16) -> ClassFileResult<InvokeDynamicRef<'_>> {
        match self.get(index)? {
            ConstantInfo::InvokeDynamic(indy) => {
                let (name, descriptor) = self.name_and_type(indy.name_and_type_index)?;
                Ok(InvokeDynamicRef {
                    bootstrap_method_attr_index: indy.bootstrap_method_attr_index,
                    name,
                    descriptor,
                })
            }
            _ => Err(mismatch(index, "InvokeDynamic")),
        }
    }
}

fn mismatch(index: u16, expected: &'static str) -> ClassFileError {
    ClassFileError::TagMismatch { index, expected }
}

/// Assembles a constant pool in memory, returning the index of every added entry.
/// Utf8, Class and NameAndType entries are shared when added twice.
#[derive(Clone, Debug, Default)]
pub struct ConstantPoolBuilder {
    entries: Vec<ConstantInfo>,
}

impl ConstantPoolBuilder {
    fn push(&mut self, entry: ConstantInfo) -> u16 {
        let wide = entry.is_wide();
        self.entries.push(entry);
        let index = self.entries.len() as u16;
        if wide {
            self.entries.push(ConstantInfo::Unusable);
        }
        index
    }

    fn find(&self, entry: &ConstantInfo) -> Option<u16> {
        self.entries
            .iter()
            .position(|e| e == entry)
            .map(|i| i as u16 + 1)
    }

    fn push_shared(&mut self, entry: ConstantInfo) -> u16 {
        match self.find(&entry) {
            Some(index) => index,
            None => self.push(entry),
        }
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        self.push_shared(ConstantInfo::Utf8(Utf8Constant::new(value)))
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.push(ConstantInfo::Integer(IntegerConstant { value }))
    }

    pub fn float(&mut self, value: f32) -> u16 {
        self.push(ConstantInfo::Float(FloatConstant { value }))
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.push(ConstantInfo::Long(LongConstant { value }))
    }

    pub fn double(&mut self, value: f64) -> u16 {
        self.push(ConstantInfo::Double(DoubleConstant { value }))
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let string_index = self.utf8(value);
        self.push(ConstantInfo::String(StringConstant { string_index }))
    }

    pub fn class(&mut self, internal_name: &str) -> u16 {
        let name_index = self.utf8(internal_name);
        self.push_shared(ConstantInfo::Class(ClassConstant { name_index }))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.push_shared(ConstantInfo::NameAndType(NameAndTypeConstant {
            name_index,
            descriptor_index,
        }))
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.push(ConstantInfo::FieldRef(FieldRefConstant {
            class_index,
            name_and_type_index,
        }))
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.push(ConstantInfo::MethodRef(MethodRefConstant {
            class_index,
            name_and_type_index,
        }))
    }

    pub fn interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.push(ConstantInfo::InterfaceMethodRef(InterfaceMethodRefConstant {
            class_index,
            name_and_type_index,
        }))
    }

    pub fn method_handle(&mut self, kind: ReferenceKind, reference_index: u16) -> u16 {
        self.push(ConstantInfo::MethodHandle(MethodHandleConstant {
            reference_kind: kind.tag(),
            reference_index,
        }))
    }

    pub fn method_type(&mut self, descriptor: &str) -> u16 {
        let descriptor_index = self.utf8(descriptor);
        self.push(ConstantInfo::MethodType(MethodTypeConstant { descriptor_index }))
    }

    pub fn invoke_dynamic(&mut self, bootstrap_method_attr_index: u16, name: &str, descriptor: &str) -> u16 {
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.push(ConstantInfo::InvokeDynamic(InvokeDynamicConstant {
            bootstrap_method_attr_index,
            name_and_type_index,
        }))
    }

    pub fn build(self) -> ConstantPool {
        ConstantPool::new(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_one_based() {
        let mut builder = ConstantPool::builder();
        let hello = builder.utf8("hello");
        let pool = builder.build();

        assert_eq!(hello, 1);
        assert_eq!(pool.utf8(1).unwrap(), "hello");
        assert!(matches!(pool.get(0), Err(ClassFileError::BadIndex { index: 0, .. })));
        assert!(matches!(pool.get(2), Err(ClassFileError::BadIndex { index: 2, .. })));
    }

    #[test]
    fn test_wide_entries_take_two_slots() {
        let mut builder = ConstantPool::builder();
        let long = builder.long(7);
        let after = builder.integer(1);
        let pool = builder.build();

        assert_eq!(after, long + 2);
        assert_eq!(pool.literal(long).unwrap(), Literal::Long(7));
        assert_eq!(pool.literal(long).unwrap().category(), 2);
        assert!(matches!(
            pool.literal(long + 1),
            Err(ClassFileError::TagMismatch { .. })
        ));
    }

    #[test]
    fn test_member_references() {
        let mut builder = ConstantPool::builder();
        let field = builder.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
        let method = builder.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
        let iface = builder.interface_method_ref("java/util/List", "size", "()I");
        let pool = builder.build();

        let out = pool.field_ref(field).unwrap();
        assert_eq!(out.class_name, "java/lang/System");
        assert_eq!(out.name, "out");
        assert!(!out.interface);

        assert_eq!(pool.method_ref(method).unwrap().name, "println");
        assert!(pool.method_ref(iface).unwrap().interface);
        assert!(pool.field_ref(method).is_err());
    }

    #[test]
    fn test_shared_entries() {
        let mut builder = ConstantPool::builder();
        let a = builder.class("java/lang/String");
        let b = builder.class("java/lang/String");
        assert_eq!(a, b);
        let s = builder.string("java/lang/String");
        let pool = builder.build();
        assert_eq!(pool.literal(s).unwrap(), Literal::String("java/lang/String".into()));
        assert_eq!(pool.literal(a).unwrap(), Literal::Class("java/lang/String".into()));
    }
}
