//! Bytecode to syntax tree decompilation.
//!
//! A [`Decompiler`] reads instructions from a [`CodeReader`] and feeds each one through the
//! handlers of its [`Registry`], which rebuild expressions on a symbolic operand stack and move
//! finished ones into an ordered statement list held by the [`DecompilationState`].
//!
//! ```
//! use classfile_decompiler::constant_info::ConstantPool;
//! use classfile_decompiler::decompile::{decompile, observers, opcodes::*, CodeReader, Element};
//! use classfile_decompiler::descriptor::JvmType;
//! use classfile_decompiler::Method;
//!
//! let code = [BIPUSH, 100, ISTORE_1, ILOAD_1, IRETURN];
//! let method = Method::builder("Sample", "answer", "()I")
//!     .access_flags(classfile_decompiler::method_info::MethodAccessFlags::STATIC)
//!     .code(code.to_vec())
//!     .local_variable(1, "n", JvmType::Int, 2, 3)
//!     .build()
//!     .unwrap();
//!
//! let statements = decompile(&method, CodeReader::from_code(&method.code), observers::ignore()).unwrap();
//! assert_eq!(
//!     statements,
//!     vec![
//!         Element::assign(1, "n", JvmType::Int, Element::int(100)),
//!         Element::return_value(Element::local("n", JvmType::Int, 1)),
//!     ]
//! );
//! ```

mod element;
mod engine;
mod error;
mod handlers;
mod line_numbers;
mod location;
pub mod observers;
pub mod opcodes;
mod reader;
mod registry;
mod state;

pub use self::element::*;
pub use self::engine::{decompile, Decompiler};
pub use self::error::{DecompileError, DecompileResult};
pub use self::line_numbers::LineNumberCounter;
pub use self::location::CodeLocationDecompiler;
pub use self::reader::CodeReader;
pub use self::registry::{Codes, Handler, Predicate, Priority, Registry, RegistryBuilder, Rule, RuleBuilder};
pub use self::state::{DecompilationState, StackedExpression, StackedStatement};
