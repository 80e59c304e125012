//! Decoded view of a class file: the constant pool, the bootstrap method table and, per
//! method, the code bytes together with the line number, local variable and exception tables.

use std::ops::Range;
use std::sync::Arc;

use log::{debug, warn};

use crate::attribute_info::*;
use crate::constant_info::ConstantPool;
use crate::descriptor::{parse_type_descriptor, JvmType, MethodDescriptor};
use crate::error::{ClassFileError, ClassFileResult};
use crate::method_info::{MethodAccessFlags, MethodInfo};
use crate::types::{ClassAccessFlags, ClassFile};

/// Code sub-attributes that carry nothing the decompiler reads.
static IGNORED_ATTRIBUTES: &[&str] = &[
    "StackMapTable",
    "LocalVariableTypeTable",
    "RuntimeVisibleTypeAnnotations",
    "RuntimeInvisibleTypeAnnotations",
];

#[derive(Clone, Debug)]
pub struct ClassModel {
    pub name: String,
    pub super_name: Option<String>,
    pub source_file: Option<String>,
    pub access_flags: ClassAccessFlags,
    pub constant_pool: Arc<ConstantPool>,
    pub bootstrap_methods: Arc<[BootstrapMethod]>,
    pub methods: Vec<Method>,
}

impl ClassModel {
    pub fn from_bytes(bytes: &[u8]) -> ClassFileResult<ClassModel> {
        let class_file = crate::parse_class_bytes(bytes)?;
        ClassModel::from_class_file(&class_file)
    }

    pub fn from_class_file(class_file: &ClassFile) -> ClassFileResult<ClassModel> {
        let constant_pool = Arc::new(ConstantPool::new(class_file.const_pool.clone()));
        let name = constant_pool.class_name(class_file.this_class)?.to_string();
        let super_name = match class_file.super_class {
            0 => None,
            index => Some(constant_pool.class_name(index)?.to_string()),
        };

        let mut source_file = None;
        let mut bootstrap_methods: Arc<[BootstrapMethod]> = Arc::from(Vec::new());

        for attribute in &class_file.attributes {
            match constant_pool.utf8(attribute.attribute_name_index)? {
                "BootstrapMethods" => {
                    let parsed = parse_attribute(
                        "BootstrapMethods",
                        &attribute.info,
                        bootstrap_methods_attribute_parser,
                    )?;
                    bootstrap_methods = Arc::from(parsed.bootstrap_methods);
                }
                "SourceFile" => {
                    let parsed =
                        parse_attribute("SourceFile", &attribute.info, sourcefile_attribute_parser)?;
                    source_file = Some(constant_pool.utf8(parsed.sourcefile_index)?.to_string());
                }
                _ => {}
            }
        }

        let methods = class_file
            .methods
            .iter()
            .map(|info| Method::from_method_info(&name, info, &constant_pool, &bootstrap_methods))
            .collect::<ClassFileResult<Vec<_>>>()?;

        debug!("loaded class {} with {} methods", name, methods.len());

        Ok(ClassModel {
            name,
            super_name,
            source_file,
            access_flags: class_file.access_flags,
            constant_pool,
            bootstrap_methods,
            methods,
        })
    }

    /// Find a method by name and descriptor.
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Method> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }
}

/// A local variable slot as declared by the LocalVariableTable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalVariable {
    pub name: String,
    pub ty: JvmType,
    pub index: u16,
    pub start_pc: u16,
    pub length: u16,
}

impl LocalVariable {
    /// Whether the variable is in scope at `pc`, i.e. `start_pc <= pc < start_pc + length`.
    pub fn is_live_at(&self, pc: u32) -> bool {
        let start = self.start_pc as u32;
        start <= pc && pc < start + self.length as u32
    }
}

#[derive(Clone, Debug)]
pub struct Method {
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
    pub signature: MethodDescriptor,
    pub access_flags: MethodAccessFlags,
    pub code: Vec<u8>,
    pub line_numbers: Vec<LineNumberTableEntry>,
    pub local_variables: Vec<LocalVariable>,
    pub exception_table: Vec<ExceptionEntry>,
    pub constant_pool: Arc<ConstantPool>,
    pub bootstrap_methods: Arc<[BootstrapMethod]>,
}

impl Method {
    pub fn builder(class_name: &str, name: &str, descriptor: &str) -> MethodBuilder {
        MethodBuilder {
            class_name: class_name.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access_flags: MethodAccessFlags::PUBLIC,
            code: Vec::new(),
            line_numbers: Vec::new(),
            local_variables: Vec::new(),
            exception_table: Vec::new(),
            constant_pool: Arc::new(ConstantPool::default()),
            bootstrap_methods: Arc::from(Vec::new()),
        }
    }

    fn from_method_info(
        class_name: &str,
        info: &MethodInfo,
        constant_pool: &Arc<ConstantPool>,
        bootstrap_methods: &Arc<[BootstrapMethod]>,
    ) -> ClassFileResult<Method> {
        let name = constant_pool.utf8(info.name_index)?;
        let descriptor = constant_pool.utf8(info.descriptor_index)?;

        let mut builder = Method::builder(class_name, name, descriptor)
            .access_flags(info.access_flags)
            .constant_pool(constant_pool.clone())
            .bootstrap_methods(bootstrap_methods.clone());

        for attribute in &info.attributes {
            if constant_pool.utf8(attribute.attribute_name_index)? != "Code" {
                continue;
            }

            let code = parse_attribute("Code", &attribute.info, code_attribute_parser)?;
            builder = builder.code(code.code);
            for entry in code.exception_table {
                builder = builder.exception_handler(entry);
            }

            for sub in &code.attributes {
                match constant_pool.utf8(sub.attribute_name_index)? {
                    "LineNumberTable" => {
                        let table = parse_attribute(
                            "LineNumberTable",
                            &sub.info,
                            line_number_table_attribute_parser,
                        )?;
                        for entry in table.line_number_table {
                            builder = builder.line_number(entry.start_pc, entry.line_number);
                        }
                    }
                    "LocalVariableTable" => {
                        let table = parse_attribute(
                            "LocalVariableTable",
                            &sub.info,
                            local_variable_table_attribute_parser,
                        )?;
                        for entry in table.local_variable_table {
                            let descriptor = constant_pool.utf8(entry.descriptor_index)?;
                            let ty = parse_type_descriptor(descriptor)
                                .ok_or_else(|| ClassFileError::Descriptor(descriptor.to_string()))?;
                            builder = builder.local_variable(
                                entry.index,
                                constant_pool.utf8(entry.name_index)?,
                                ty,
                                entry.start_pc,
                                entry.length,
                            );
                        }
                    }
                    other if IGNORED_ATTRIBUTES.contains(&other) => {}
                    other => warn!("leaving unknown code attribute {} of {}#{} undecoded", other, class_name, name),
                }
            }
        }

        builder.build()
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Compiler-synthesized methods holding the body of a lambda.
    pub fn is_lambda_backing_method(&self) -> bool {
        self.name.starts_with("lambda$")
    }

    /// The variable occupying slot `index` at `pc`. The same slot can be reused by
    /// different variables over different ranges.
    pub fn local_variable(&self, index: u16, pc: u32) -> Option<&LocalVariable> {
        self.local_variables
            .iter()
            .find(|v| v.index == index && v.is_live_at(pc))
    }

    /// Variables holding the method's parameters (excluding `this`), ordered by slot.
    pub fn parameter_variables(&self) -> Vec<&LocalVariable> {
        let first = if self.is_static() { 0 } else { 1 };
        let last = first + self.signature.parameter_slots();
        let mut params: Vec<&LocalVariable> = self
            .local_variables
            .iter()
            .filter(|v| v.start_pc == 0 && v.index >= first && v.index < last)
            .collect();
        params.sort_by_key(|v| v.index);
        params
    }

    pub fn has_line(&self, line: u16) -> bool {
        self.line_numbers.iter().any(|e| e.line_number == line)
    }

    /// Half-open pc range `[from, to)` of the code compiled from `line`.
    pub fn code_range_for_line(&self, line: u16) -> Option<Range<u32>> {
        let from = self
            .line_numbers
            .iter()
            .filter(|e| e.line_number == line)
            .map(|e| e.start_pc as u32)
            .min()?;
        let to = self
            .line_numbers
            .iter()
            .filter(|e| e.line_number != line && e.start_pc as u32 > from)
            .map(|e| e.start_pc as u32)
            .min()
            .unwrap_or(self.code.len() as u32);
        Some(from..to)
    }

    /// The exception table entry whose protected range ends at `pc`. The jump over a
    /// catch block sits at the end of the try range.
    pub fn exception_entry_ending_at(&self, pc: u32) -> Option<&ExceptionEntry> {
        self.exception_table
            .iter()
            .find(|e| e.end_pc as u32 == pc)
    }

    pub fn bootstrap_method(&self, index: u16) -> Option<&BootstrapMethod> {
        self.bootstrap_methods.get(index as usize)
    }
}

/// Assembles [`Method`] metadata without a class file.
#[derive(Clone, Debug)]
pub struct MethodBuilder {
    class_name: String,
    name: String,
    descriptor: String,
    access_flags: MethodAccessFlags,
    code: Vec<u8>,
    line_numbers: Vec<LineNumberTableEntry>,
    local_variables: Vec<LocalVariable>,
    exception_table: Vec<ExceptionEntry>,
    constant_pool: Arc<ConstantPool>,
    bootstrap_methods: Arc<[BootstrapMethod]>,
}

impl MethodBuilder {
    pub fn access_flags(mut self, access_flags: MethodAccessFlags) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn code(mut self, code: Vec<u8>) -> Self {
        self.code = code;
        self
    }

    pub fn line_number(mut self, start_pc: u16, line_number: u16) -> Self {
        self.line_numbers.push(LineNumberTableEntry {
            start_pc,
            line_number,
        });
        self
    }

    pub fn local_variable(mut self, index: u16, name: &str, ty: JvmType, start_pc: u16, length: u16) -> Self {
        self.local_variables.push(LocalVariable {
            name: name.to_string(),
            ty,
            index,
            start_pc,
            length,
        });
        self
    }

    pub fn exception_handler(mut self, entry: ExceptionEntry) -> Self {
        self.exception_table.push(entry);
        self
    }

    pub fn constant_pool(mut self, constant_pool: impl Into<Arc<ConstantPool>>) -> Self {
        self.constant_pool = constant_pool.into();
        self
    }

    pub fn bootstrap_methods(mut self, bootstrap_methods: impl Into<Arc<[BootstrapMethod]>>) -> Self {
        self.bootstrap_methods = bootstrap_methods.into();
        self
    }

    pub fn build(mut self) -> ClassFileResult<Method> {
        let signature = MethodDescriptor::parse(&self.descriptor)?;
        self.line_numbers.sort_by_key(|e| e.start_pc);
        Ok(Method {
            class_name: self.class_name,
            name: self.name,
            descriptor: self.descriptor,
            signature,
            access_flags: self.access_flags,
            code: self.code,
            line_numbers: self.line_numbers,
            local_variables: self.local_variables,
            exception_table: self.exception_table,
            constant_pool: self.constant_pool,
            bootstrap_methods: self.bootstrap_methods,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method() -> Method {
        Method::builder("com/example/Sample", "run", "(IJ)V")
            .code(vec![0; 20])
            .line_number(0, 10)
            .line_number(4, 11)
            .line_number(9, 10)
            .line_number(12, 12)
            .local_variable(0, "this", JvmType::reference("com/example/Sample"), 0, 20)
            .local_variable(1, "a", JvmType::Int, 0, 20)
            .local_variable(2, "b", JvmType::Long, 0, 20)
            .local_variable(4, "x", JvmType::Int, 5, 5)
            .local_variable(4, "s", JvmType::string(), 10, 10)
            .build()
            .unwrap()
    }

    #[test]
    fn test_code_range_for_line() {
        let method = method();
        assert_eq!(method.code_range_for_line(10), Some(0..4));
        assert_eq!(method.code_range_for_line(11), Some(4..9));
        assert_eq!(method.code_range_for_line(12), Some(12..20));
        assert_eq!(method.code_range_for_line(99), None);
        assert!(method.has_line(11));
    }

    #[test]
    fn test_local_variable_is_range_sensitive() {
        let method = method();
        assert_eq!(method.local_variable(4, 5).unwrap().name, "x");
        assert_eq!(method.local_variable(4, 9).unwrap().name, "x");
        assert_eq!(method.local_variable(4, 10).unwrap().name, "s");
        assert!(method.local_variable(4, 4).is_none());
        assert!(method.local_variable(4, 20).is_none());
    }

    #[test]
    fn test_parameter_variables() {
        let method = method();
        let names: Vec<&str> = method
            .parameter_variables()
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(!method.is_static());
        assert!(!method.is_lambda_backing_method());
    }

    #[test]
    fn test_exception_entry_ending_at() {
        let method = Method::builder("A", "m", "()V")
            .exception_handler(ExceptionEntry {
                start_pc: 0,
                end_pc: 8,
                handler_pc: 11,
                catch_type: 0,
            })
            .build()
            .unwrap();
        assert!(method.exception_entry_ending_at(8).is_some());
        assert!(method.exception_entry_ending_at(11).is_none());
    }

    #[test]
    fn test_invalid_descriptor_is_rejected() {
        assert!(matches!(
            Method::builder("A", "m", "(V").build(),
            Err(ClassFileError::Descriptor(_))
        ));
    }
}
