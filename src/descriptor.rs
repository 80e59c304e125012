//! JVM field and method descriptor parsing.

use crate::error::{ClassFileError, ClassFileResult};

/// Represents a JVM type from a descriptor string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum JvmType {
    Int,
    Long,
    Float,
    Double,
    Byte,
    Char,
    Short,
    Boolean,
    Void,
    Reference(String),
    Array(Box<JvmType>),
    /// Type of the `null` literal.
    Null,
}

pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";
pub const JAVA_LANG_STRING: &str = "java/lang/String";
pub const JAVA_LANG_CLASS: &str = "java/lang/Class";

/// Wrapper classes and the primitive each one boxes.
pub static BOX_TYPES: &[(&str, JvmType)] = &[
    ("java/lang/Boolean", JvmType::Boolean),
    ("java/lang/Byte", JvmType::Byte),
    ("java/lang/Character", JvmType::Char),
    ("java/lang/Short", JvmType::Short),
    ("java/lang/Integer", JvmType::Int),
    ("java/lang/Long", JvmType::Long),
    ("java/lang/Float", JvmType::Float),
    ("java/lang/Double", JvmType::Double),
];

impl JvmType {
    pub fn reference(internal_name: &str) -> JvmType {
        JvmType::Reference(internal_name.to_string())
    }

    pub fn string() -> JvmType {
        JvmType::reference(JAVA_LANG_STRING)
    }

    pub fn array_of(component: JvmType) -> JvmType {
        JvmType::Array(Box::new(component))
    }

    /// Resolve the operand of a class constant, which is either an internal name
    /// (`java/lang/String`) or an array descriptor (`[I`, `[Ljava/lang/String;`).
    pub fn from_class_name(name: &str) -> Option<JvmType> {
        if name.starts_with('[') {
            parse_type_descriptor(name)
        } else if name.is_empty() {
            None
        } else {
            Some(JvmType::Reference(name.to_string()))
        }
    }

    /// Returns true if this type occupies two slots on the JVM stack.
    pub fn is_wide(&self) -> bool {
        matches!(self, JvmType::Long | JvmType::Double)
    }

    /// Computational category of a value of this type: 2 for long/double, 1 otherwise.
    pub fn category(&self) -> u8 {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            JvmType::Reference(_) | JvmType::Array(_) | JvmType::Null
        )
    }

    /// Sub-word integral types that the JVM computes on as `int`.
    pub fn is_narrow_integral(&self) -> bool {
        matches!(self, JvmType::Byte | JvmType::Short | JvmType::Char)
    }

    /// Element type if this is an array type.
    pub fn component_type(&self) -> Option<&JvmType> {
        match self {
            JvmType::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// Internal name of a reference type.
    pub fn internal_name(&self) -> Option<&str> {
        match self {
            JvmType::Reference(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the JVM descriptor string for this type.
    pub fn to_descriptor(&self) -> String {
        match self {
            JvmType::Int => "I".into(),
            JvmType::Long => "J".into(),
            JvmType::Float => "F".into(),
            JvmType::Double => "D".into(),
            JvmType::Byte => "B".into(),
            JvmType::Char => "C".into(),
            JvmType::Short => "S".into(),
            JvmType::Boolean => "Z".into(),
            JvmType::Void => "V".into(),
            JvmType::Reference(name) => format!("L{};", name),
            JvmType::Array(inner) => format!("[{}", inner.to_descriptor()),
            JvmType::Null => format!("L{};", JAVA_LANG_OBJECT),
        }
    }

    /// Source-level name, either fully qualified or simple.
    pub fn source_name(&self, simple: bool) -> String {
        match self {
            JvmType::Int => "int".into(),
            JvmType::Long => "long".into(),
            JvmType::Float => "float".into(),
            JvmType::Double => "double".into(),
            JvmType::Byte => "byte".into(),
            JvmType::Char => "char".into(),
            JvmType::Short => "short".into(),
            JvmType::Boolean => "boolean".into(),
            JvmType::Void => "void".into(),
            JvmType::Reference(name) if simple => simple_class_name(name).replace('$', "."),
            JvmType::Reference(name) => internal_to_source_name(name),
            JvmType::Array(inner) => format!("{}[]", inner.source_name(simple)),
            JvmType::Null => "null".into(),
        }
    }

    /// Returns the simple (unqualified) name for display.
    pub fn simple_name(&self) -> String {
        self.source_name(true)
    }
}

/// Parsed method descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub parameters: Vec<JvmType>,
    pub return_type: JvmType,
}

impl MethodDescriptor {
    pub fn parse(desc: &str) -> ClassFileResult<MethodDescriptor> {
        let (parameters, return_type) = parse_method_descriptor(desc)
            .ok_or_else(|| ClassFileError::Descriptor(desc.to_string()))?;
        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }

    pub fn to_descriptor(&self) -> String {
        let params: String = self.parameters.iter().map(|p| p.to_descriptor()).collect();
        format!("({}){}", params, self.return_type.to_descriptor())
    }

    /// Number of local variable slots the parameters occupy.
    pub fn parameter_slots(&self) -> u16 {
        self.parameters.iter().map(|p| p.category() as u16).sum()
    }
}

/// Parse a single type descriptor starting at position `pos` in `desc`.
/// Returns (JvmType, next_position).
pub fn parse_type_at(desc: &str, pos: usize) -> Option<(JvmType, usize)> {
    let bytes = desc.as_bytes();
    if pos >= bytes.len() {
        return None;
    }
    match bytes[pos] {
        b'B' => Some((JvmType::Byte, pos + 1)),
        b'C' => Some((JvmType::Char, pos + 1)),
        b'D' => Some((JvmType::Double, pos + 1)),
        b'F' => Some((JvmType::Float, pos + 1)),
        b'I' => Some((JvmType::Int, pos + 1)),
        b'J' => Some((JvmType::Long, pos + 1)),
        b'S' => Some((JvmType::Short, pos + 1)),
        b'Z' => Some((JvmType::Boolean, pos + 1)),
        b'V' => Some((JvmType::Void, pos + 1)),
        b'L' => {
            let semi = desc[pos + 1..].find(';')?;
            let class_name = &desc[pos + 1..pos + 1 + semi];
            Some((JvmType::Reference(class_name.to_string()), pos + 1 + semi + 1))
        }
        b'[' => {
            let (inner, next) = parse_type_at(desc, pos + 1)?;
            Some((JvmType::Array(Box::new(inner)), next))
        }
        _ => None,
    }
}

/// Parse a full type descriptor string.
pub fn parse_type_descriptor(desc: &str) -> Option<JvmType> {
    match parse_type_at(desc, 0)? {
        (ty, next) if next == desc.len() => Some(ty),
        _ => None,
    }
}

/// Parse a method descriptor, e.g. "(II)V" -> ([Int, Int], Void)
pub fn parse_method_descriptor(desc: &str) -> Option<(Vec<JvmType>, JvmType)> {
    if !desc.starts_with('(') {
        return None;
    }
    let close = desc.find(')')?;
    let mut params = Vec::new();
    let mut pos = 1;
    while pos < close {
        let (ty, next) = parse_type_at(desc, pos)?;
        params.push(ty);
        pos = next;
    }
    let (ret, _) = parse_type_at(desc, close + 1)?;
    Some((params, ret))
}

/// Convert internal class name to source name.
pub fn internal_to_source_name(name: &str) -> String {
    name.replace('/', ".")
}

/// Get just the simple class name from an internal name.
pub fn simple_class_name(name: &str) -> &str {
    match name.rfind('/') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Convert a newarray type code to JvmType.
pub fn newarray_type(atype: u8) -> Option<JvmType> {
    match atype {
        4 => Some(JvmType::Boolean),
        5 => Some(JvmType::Char),
        6 => Some(JvmType::Float),
        7 => Some(JvmType::Double),
        8 => Some(JvmType::Byte),
        9 => Some(JvmType::Short),
        10 => Some(JvmType::Int),
        11 => Some(JvmType::Long),
        _ => None,
    }
}

/// Primitive boxed by a wrapper class, if `class_name` is one.
pub fn unboxed_type(class_name: &str) -> Option<&'static JvmType> {
    BOX_TYPES
        .iter()
        .find(|(name, _)| *name == class_name)
        .map(|(_, ty)| ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        assert_eq!(parse_type_descriptor("I"), Some(JvmType::Int));
        assert_eq!(parse_type_descriptor("J"), Some(JvmType::Long));
        assert_eq!(parse_type_descriptor("D"), Some(JvmType::Double));
        assert_eq!(parse_type_descriptor("V"), Some(JvmType::Void));
        assert_eq!(parse_type_descriptor("Z"), Some(JvmType::Boolean));
        assert_eq!(parse_type_descriptor("II"), None);
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            parse_type_descriptor("Ljava/lang/String;"),
            Some(JvmType::Reference("java/lang/String".into()))
        );
    }

    #[test]
    fn test_parse_array() {
        assert_eq!(
            parse_type_descriptor("[I"),
            Some(JvmType::Array(Box::new(JvmType::Int)))
        );
        assert_eq!(
            JvmType::from_class_name("[Ljava/lang/Object;"),
            Some(JvmType::array_of(JvmType::reference("java/lang/Object")))
        );
        assert_eq!(
            JvmType::from_class_name("java/lang/Object"),
            Some(JvmType::reference("java/lang/Object"))
        );
    }

    #[test]
    fn test_parse_method_descriptor() {
        let desc = MethodDescriptor::parse("(Ljava/lang/String;JI)[B").unwrap();
        assert_eq!(
            desc.parameters,
            vec![JvmType::string(), JvmType::Long, JvmType::Int]
        );
        assert_eq!(desc.return_type, JvmType::array_of(JvmType::Byte));
        assert_eq!(desc.parameter_slots(), 4);

        assert!(MethodDescriptor::parse("II)V").is_err());
    }

    #[test]
    fn test_categories() {
        assert_eq!(JvmType::Long.category(), 2);
        assert_eq!(JvmType::Double.category(), 2);
        assert_eq!(JvmType::Int.category(), 1);
        assert_eq!(JvmType::string().category(), 1);
        assert!(JvmType::Short.is_narrow_integral());
        assert!(!JvmType::Int.is_narrow_integral());
    }

    #[test]
    fn test_source_names() {
        let ty = JvmType::array_of(JvmType::reference("java/util/Map$Entry"));
        assert_eq!(ty.source_name(false), "java.util.Map$Entry[]");
        assert_eq!(ty.source_name(true), "Map.Entry[]");
        assert_eq!(simple_class_name("java/lang/String"), "String");
        assert_eq!(unboxed_type("java/lang/Integer"), Some(&JvmType::Int));
    }
}
