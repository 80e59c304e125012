//! Syntax tree produced by the decompiler.
//!
//! Every node is an [`Element`]: a variant-specific [`ElementKind`] plus [`Metadata`] recording
//! where in the method it came from. Elements are values; rewriting one means building a new
//! element and swapping it in.

use std::fmt;

use crate::constant_info::ReferenceKind;
use crate::descriptor::{JvmType, MethodDescriptor};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    Constant,
    VariableReference,
    FieldReference,
    ArrayLoad,
    BinaryOperator,
    UnaryOperator,
    Compare,
    Cast,
    InstanceOf,
    Increment,
    MethodCall,
    Allocate,
    NewInstance,
    NewArray,
    Lambda,
    VariableAssignment,
    FieldAssignment,
    ArrayStore,
    Return,
    ReturnValue,
    Branch,
    Goto,
    Throw,
}

/// Where an element was produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub line_number: Option<u16>,
    pub program_counter: Option<u32>,
}

impl Metadata {
    pub fn is_stamped(&self) -> bool {
        self.program_counter.is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    /// A class literal such as `String.class`.
    Class(JvmType),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorType {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl OperatorType {
    pub fn token(self) -> &'static str {
        match self {
            OperatorType::Plus => "+",
            OperatorType::Minus => "-",
            OperatorType::Multiply => "*",
            OperatorType::Divide => "/",
            OperatorType::Modulo => "%",
            OperatorType::LeftShift => "<<",
            OperatorType::RightShift => ">>",
            OperatorType::UnsignedRightShift => ">>>",
            OperatorType::And => "&",
            OperatorType::Or => "|",
            OperatorType::Xor => "^",
            OperatorType::Eq => "==",
            OperatorType::Ne => "!=",
            OperatorType::Lt => "<",
            OperatorType::Le => "<=",
            OperatorType::Gt => ">",
            OperatorType::Ge => ">=",
        }
    }

    /// The negated comparison; `None` for arithmetic operators.
    pub fn inverse(self) -> Option<OperatorType> {
        match self {
            OperatorType::Eq => Some(OperatorType::Ne),
            OperatorType::Ne => Some(OperatorType::Eq),
            OperatorType::Lt => Some(OperatorType::Ge),
            OperatorType::Ge => Some(OperatorType::Lt),
            OperatorType::Gt => Some(OperatorType::Le),
            OperatorType::Le => Some(OperatorType::Gt),
            _ => None,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.inverse().is_some()
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            OperatorType::Multiply | OperatorType::Divide | OperatorType::Modulo => 10,
            OperatorType::Plus | OperatorType::Minus => 9,
            OperatorType::LeftShift | OperatorType::RightShift | OperatorType::UnsignedRightShift => 8,
            OperatorType::Lt | OperatorType::Le | OperatorType::Gt | OperatorType::Ge => 7,
            OperatorType::Eq | OperatorType::Ne => 6,
            OperatorType::And => 5,
            OperatorType::Xor => 4,
            OperatorType::Or => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOperatorType {
    Neg,
    Not,
}

impl UnaryOperatorType {
    pub fn token(self) -> &'static str {
        match self {
            UnaryOperatorType::Neg => "-",
            UnaryOperatorType::Not => "!",
        }
    }
}

/// Whether an increment is applied before or after its value is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Affix {
    Prefix,
    Postfix,
    /// Not yet known; must be resolved before the statements are returned.
    Undefined,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocalVariableReference {
    pub name: String,
    pub ty: JvmType,
    pub index: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldReference {
    /// `None` for a static field.
    pub target: Option<Box<Element>>,
    pub declaring_type: JvmType,
    pub field_type: JvmType,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodCall {
    pub target_type: JvmType,
    pub name: String,
    pub signature: MethodDescriptor,
    /// `None` for a static call.
    pub target: Option<Box<Element>>,
    pub args: Vec<Element>,
    pub ty: JvmType,
}

impl MethodCall {
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArrayInitializer {
    pub index: i32,
    pub value: Element,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lambda {
    /// Bound receiver of an instance method reference or of a lambda capturing `this`.
    pub receiver: Option<Box<Element>>,
    pub reference_kind: ReferenceKind,
    pub functional_interface: JvmType,
    pub functional_method: String,
    pub interface_signature: MethodDescriptor,
    pub declaring_class: JvmType,
    pub backing_method: String,
    pub backing_signature: MethodDescriptor,
    /// Captured locals, in the order of the backing method's leading parameters.
    pub enclosed_variables: Vec<LocalVariableReference>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementKind {
    Constant {
        value: ConstantValue,
        ty: JvmType,
    },
    Variable(LocalVariableReference),
    Field(FieldReference),
    ArrayLoad {
        array: Box<Element>,
        index: Box<Element>,
        ty: JvmType,
    },
    BinaryOperator {
        left: Box<Element>,
        op: OperatorType,
        right: Box<Element>,
        ty: JvmType,
    },
    UnaryOperator {
        operand: Box<Element>,
        op: UnaryOperatorType,
        ty: JvmType,
    },
    /// Three-way comparison of longs, floats or doubles (`lcmp`, `fcmpl`, ...).
    Compare {
        left: Box<Element>,
        right: Box<Element>,
    },
    Cast {
        value: Box<Element>,
        ty: JvmType,
    },
    InstanceOf {
        value: Box<Element>,
        ty: JvmType,
    },
    Increment {
        variable: LocalVariableReference,
        delta: i32,
        ty: JvmType,
        affix: Affix,
    },
    MethodCall(MethodCall),
    /// A `new` whose constructor has not been called yet.
    Allocate {
        ty: JvmType,
    },
    NewInstance {
        ty: JvmType,
        signature: MethodDescriptor,
        args: Vec<Element>,
    },
    NewArray {
        ty: JvmType,
        component_type: JvmType,
        length: Box<Element>,
        initializers: Vec<ArrayInitializer>,
    },
    Lambda(Lambda),
    VariableAssignment {
        index: u16,
        name: String,
        ty: JvmType,
        value: Box<Element>,
    },
    FieldAssignment {
        field: FieldReference,
        value: Box<Element>,
    },
    ArrayStore {
        array: Box<Element>,
        index: Box<Element>,
        value: Box<Element>,
    },
    Return,
    ReturnValue {
        value: Box<Element>,
    },
    Branch {
        left: Box<Element>,
        op: OperatorType,
        right: Box<Element>,
        target_pc: u32,
    },
    Goto {
        target_pc: u32,
    },
    Throw {
        value: Box<Element>,
    },
}

/// A node of the decompiled syntax tree.
///
/// Equality is structural and ignores metadata.
#[derive(Clone, Debug)]
pub struct Element {
    pub kind: ElementKind,
    pub meta: Metadata,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl From<ElementKind> for Element {
    fn from(kind: ElementKind) -> Self {
        Element::new(kind)
    }
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Element {
            kind,
            meta: Metadata::default(),
        }
    }

    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = meta;
        self
    }

    pub fn constant(value: ConstantValue, ty: JvmType) -> Self {
        Element::new(ElementKind::Constant { value, ty })
    }

    pub fn int(value: i32) -> Self {
        Element::constant(ConstantValue::Int(value), JvmType::Int)
    }

    pub fn long(value: i64) -> Self {
        Element::constant(ConstantValue::Long(value), JvmType::Long)
    }

    pub fn float(value: f32) -> Self {
        Element::constant(ConstantValue::Float(value), JvmType::Float)
    }

    pub fn double(value: f64) -> Self {
        Element::constant(ConstantValue::Double(value), JvmType::Double)
    }

    pub fn boolean(value: bool) -> Self {
        Element::constant(ConstantValue::Boolean(value), JvmType::Boolean)
    }

    pub fn string(value: &str) -> Self {
        Element::constant(ConstantValue::String(value.to_string()), JvmType::string())
    }

    pub fn null() -> Self {
        Element::constant(ConstantValue::Null, JvmType::Null)
    }

    pub fn local(name: &str, ty: JvmType, index: u16) -> Self {
        Element::new(ElementKind::Variable(LocalVariableReference {
            name: name.to_string(),
            ty,
            index,
        }))
    }

    pub fn binary(left: Element, op: OperatorType, right: Element, ty: JvmType) -> Self {
        Element::new(ElementKind::BinaryOperator {
            left: Box::new(left),
            op,
            right: Box::new(right),
            ty,
        })
    }

    pub fn unary(operand: Element, op: UnaryOperatorType, ty: JvmType) -> Self {
        Element::new(ElementKind::UnaryOperator {
            operand: Box::new(operand),
            op,
            ty,
        })
    }

    pub fn cast(value: Element, ty: JvmType) -> Self {
        Element::new(ElementKind::Cast {
            value: Box::new(value),
            ty,
        })
    }

    pub fn assign(index: u16, name: &str, ty: JvmType, value: Element) -> Self {
        Element::new(ElementKind::VariableAssignment {
            index,
            name: name.to_string(),
            ty,
            value: Box::new(value),
        })
    }

    pub fn return_value(value: Element) -> Self {
        Element::new(ElementKind::ReturnValue {
            value: Box::new(value),
        })
    }

    pub fn element_type(&self) -> ElementType {
        match &self.kind {
            ElementKind::Constant { .. } => ElementType::Constant,
            ElementKind::Variable(_) => ElementType::VariableReference,
            ElementKind::Field(_) => ElementType::FieldReference,
            ElementKind::ArrayLoad { .. } => ElementType::ArrayLoad,
            ElementKind::BinaryOperator { .. } => ElementType::BinaryOperator,
            ElementKind::UnaryOperator { .. } => ElementType::UnaryOperator,
            ElementKind::Compare { .. } => ElementType::Compare,
            ElementKind::Cast { .. } => ElementType::Cast,
            ElementKind::InstanceOf { .. } => ElementType::InstanceOf,
            ElementKind::Increment { .. } => ElementType::Increment,
            ElementKind::MethodCall(_) => ElementType::MethodCall,
            ElementKind::Allocate { .. } => ElementType::Allocate,
            ElementKind::NewInstance { .. } => ElementType::NewInstance,
            ElementKind::NewArray { .. } => ElementType::NewArray,
            ElementKind::Lambda(_) => ElementType::Lambda,
            ElementKind::VariableAssignment { .. } => ElementType::VariableAssignment,
            ElementKind::FieldAssignment { .. } => ElementType::FieldAssignment,
            ElementKind::ArrayStore { .. } => ElementType::ArrayStore,
            ElementKind::Return => ElementType::Return,
            ElementKind::ReturnValue { .. } => ElementType::ReturnValue,
            ElementKind::Branch { .. } => ElementType::Branch,
            ElementKind::Goto { .. } => ElementType::Goto,
            ElementKind::Throw { .. } => ElementType::Throw,
        }
    }

    /// Static type of the value the element produces; `Void` for statements.
    pub fn ty(&self) -> JvmType {
        match &self.kind {
            ElementKind::Constant { ty, .. }
            | ElementKind::ArrayLoad { ty, .. }
            | ElementKind::BinaryOperator { ty, .. }
            | ElementKind::UnaryOperator { ty, .. }
            | ElementKind::Cast { ty, .. }
            | ElementKind::Increment { ty, .. }
            | ElementKind::Allocate { ty }
            | ElementKind::NewInstance { ty, .. }
            | ElementKind::NewArray { ty, .. } => ty.clone(),
            ElementKind::Variable(v) => v.ty.clone(),
            ElementKind::Field(f) => f.field_type.clone(),
            ElementKind::MethodCall(call) => call.ty.clone(),
            ElementKind::Lambda(lambda) => lambda.functional_interface.clone(),
            ElementKind::Compare { .. } => JvmType::Int,
            ElementKind::InstanceOf { .. } => JvmType::Boolean,
            _ => JvmType::Void,
        }
    }

    /// Whether the element produces a value.
    pub fn is_expression(&self) -> bool {
        !matches!(
            self.kind,
            ElementKind::VariableAssignment { .. }
                | ElementKind::FieldAssignment { .. }
                | ElementKind::ArrayStore { .. }
                | ElementKind::Return
                | ElementKind::ReturnValue { .. }
                | ElementKind::Branch { .. }
                | ElementKind::Goto { .. }
                | ElementKind::Throw { .. }
        )
    }

    /// Whether the element may stand on its own as a statement. Pure expressions such
    /// as arithmetic or variable reads may not.
    pub fn is_statement(&self) -> bool {
        !self.is_expression()
            || matches!(
                self.kind,
                ElementKind::MethodCall(_)
                    | ElementKind::Increment { .. }
                    | ElementKind::NewInstance { .. }
            )
    }

    pub fn as_variable(&self) -> Option<&LocalVariableReference> {
        match &self.kind {
            ElementKind::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_method_call(&self) -> Option<&MethodCall> {
        match &self.kind {
            ElementKind::MethodCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_int_constant(&self) -> Option<i32> {
        match &self.kind {
            ElementKind::Constant {
                value: ConstantValue::Int(v),
                ..
            } => Some(*v),
            _ => None,
        }
    }

    /// Direct child elements, in source order.
    pub fn children(&self) -> Vec<&Element> {
        match &self.kind {
            ElementKind::Constant { .. }
            | ElementKind::Variable(_)
            | ElementKind::Increment { .. }
            | ElementKind::Allocate { .. }
            | ElementKind::Return
            | ElementKind::Goto { .. } => Vec::new(),
            ElementKind::Field(f) => f.target.iter().map(|t| t.as_ref()).collect(),
            ElementKind::ArrayLoad { array, index, .. } => vec![array, index],
            ElementKind::BinaryOperator { left, right, .. }
            | ElementKind::Compare { left, right }
            | ElementKind::Branch { left, right, .. } => vec![left, right],
            ElementKind::UnaryOperator { operand, .. } => vec![operand],
            ElementKind::Cast { value, .. }
            | ElementKind::InstanceOf { value, .. }
            | ElementKind::VariableAssignment { value, .. }
            | ElementKind::ReturnValue { value }
            | ElementKind::Throw { value } => vec![value],
            ElementKind::MethodCall(call) => call
                .target
                .iter()
                .map(|t| t.as_ref())
                .chain(call.args.iter())
                .collect(),
            ElementKind::NewInstance { args, .. } => args.iter().collect(),
            ElementKind::NewArray {
                length,
                initializers,
                ..
            } => std::iter::once(length.as_ref())
                .chain(initializers.iter().map(|i| &i.value))
                .collect(),
            ElementKind::Lambda(lambda) => lambda.receiver.iter().map(|r| r.as_ref()).collect(),
            ElementKind::FieldAssignment { field, value } => field
                .target
                .iter()
                .map(|t| t.as_ref())
                .chain(std::iter::once(value.as_ref()))
                .collect(),
            ElementKind::ArrayStore {
                array,
                index,
                value,
            } => vec![array, index, value],
        }
    }

    /// Whether this element or any element below it matches `predicate`.
    pub fn contains(&self, predicate: &dyn Fn(&Element) -> bool) -> bool {
        predicate(self) || self.children().into_iter().any(|c| c.contains(predicate))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
