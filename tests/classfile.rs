use classfile_decompiler::class_model::ClassModel;
use classfile_decompiler::decompile::opcodes::*;
use classfile_decompiler::decompile::{CodeLocationDecompiler, Element};
use classfile_decompiler::descriptor::JvmType;
use classfile_decompiler::method_info::MethodAccessFlags;
use classfile_decompiler::{parse_class_bytes, parse_class_from_reader, ClassAccessFlags, ClassFileError};

// --- Helpers ---

/// Constant pool serializer, numbering entries from 1.
#[derive(Default)]
struct Pool {
    bytes: Vec<u8>,
    count: u16,
}

impl Pool {
    fn entry(&mut self, tag: u8, body: &[u8]) -> u16 {
        self.bytes.push(tag);
        self.bytes.extend_from_slice(body);
        self.count += 1;
        self.count
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let mut body = (value.len() as u16).to_be_bytes().to_vec();
        body.extend_from_slice(value.as_bytes());
        self.entry(1, &body)
    }

    fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        self.entry(7, &name.to_be_bytes())
    }
}

fn attribute(name: u16, body: &[u8]) -> Vec<u8> {
    let mut bytes = name.to_be_bytes().to_vec();
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

fn u16s(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// ```java
/// public class Greeter {
///     static int answer() {
///         int n = 42;   // 3
///         return n;     // 4
///     }
/// }
/// ```
fn greeter_class() -> Vec<u8> {
    let mut pool = Pool::default();
    let this_class = pool.class("com/example/Greeter");
    let super_class = pool.class("java/lang/Object");
    let method_name = pool.utf8("answer");
    let method_descriptor = pool.utf8("()I");
    let code_name = pool.utf8("Code");
    let lines_name = pool.utf8("LineNumberTable");
    let locals_name = pool.utf8("LocalVariableTable");
    let variable_name = pool.utf8("n");
    let variable_descriptor = pool.utf8("I");
    let source_name = pool.utf8("SourceFile");
    let source_file = pool.utf8("Greeter.java");
    let stack_map_name = pool.utf8("StackMapTable");

    let code = [BIPUSH, 42, ISTORE_0, ILOAD_0, IRETURN];
    let lines = attribute(lines_name, &u16s(&[2, 0, 3, 3, 4]));
    let locals = attribute(
        locals_name,
        &u16s(&[1, 3, 2, variable_name, variable_descriptor, 0]),
    );
    let stack_map = attribute(stack_map_name, &u16s(&[0]));

    let mut code_body = u16s(&[1, 1]);
    code_body.extend_from_slice(&(code.len() as u32).to_be_bytes());
    code_body.extend_from_slice(&code);
    code_body.extend(u16s(&[0, 3]));
    code_body.extend(lines);
    code_body.extend(locals);
    code_body.extend(stack_map);

    let mut bytes = vec![0xca, 0xfe, 0xba, 0xbe];
    bytes.extend(u16s(&[0, 52, pool.count + 1]));
    bytes.extend(&pool.bytes);
    bytes.extend(u16s(&[0x0021, this_class, super_class, 0, 0, 1]));
    bytes.extend(u16s(&[0x0008, method_name, method_descriptor, 1]));
    bytes.extend(attribute(code_name, &code_body));
    bytes.extend(u16s(&[1]));
    bytes.extend(attribute(source_name, &source_file.to_be_bytes()));
    bytes
}

// ---- Container ----

#[test]
fn test_class_model_from_bytes() {
    let class = ClassModel::from_bytes(&greeter_class()).unwrap();
    assert_eq!(class.name, "com/example/Greeter");
    assert_eq!(class.super_name.as_deref(), Some("java/lang/Object"));
    assert_eq!(class.source_file.as_deref(), Some("Greeter.java"));
    assert!(class.access_flags.contains(ClassAccessFlags::PUBLIC));

    let method = class.method("answer", "()I").unwrap();
    assert!(method.access_flags.contains(MethodAccessFlags::STATIC));
    assert_eq!(method.code, vec![BIPUSH, 42, ISTORE_0, ILOAD_0, IRETURN]);
    assert_eq!(method.signature.return_type, JvmType::Int);
    assert_eq!(method.code_range_for_line(3), Some(0..3));
    assert_eq!(method.code_range_for_line(4), Some(3..5));
    assert_eq!(method.local_variable(0, 3).unwrap().name, "n");
}

#[test]
fn test_trailing_bytes_are_tolerated() {
    let mut bytes = greeter_class();
    bytes.extend_from_slice(&[0, 0, 0]);
    assert!(parse_class_bytes(&bytes).is_ok());
}

#[test]
fn test_bad_magic() {
    let mut bytes = greeter_class();
    bytes[0] = 0xcb;
    assert!(matches!(
        parse_class_from_reader(&mut bytes.as_slice()),
        Err(ClassFileError::Binary(_))
    ));
}

#[test]
fn test_truncated_code_attribute() {
    let bytes = greeter_class();
    let class_file = parse_class_bytes(&bytes).unwrap();
    let mut broken = class_file.clone();
    broken.methods[0].attributes[0].info.truncate(6);
    assert!(matches!(
        ClassModel::from_class_file(&broken),
        Err(ClassFileError::Attribute { attribute: "Code" })
    ));
}

// ---- Decompiling a parsed class ----

#[test]
fn test_decompile_lines_of_parsed_class() {
    let class = ClassModel::from_bytes(&greeter_class()).unwrap();
    let decompiler = CodeLocationDecompiler::default();

    assert_eq!(
        decompiler.decompile_location(&class, "answer", 3).unwrap(),
        vec![Element::assign(0, "n", JvmType::Int, Element::int(42))]
    );
    assert_eq!(
        decompiler.decompile_location(&class, "answer", 4).unwrap(),
        vec![Element::return_value(Element::local("n", JvmType::Int, 0))]
    );
}
