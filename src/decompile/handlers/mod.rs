//! Instruction handlers. Every module contributes one [`Registry`] covering its slice of the
//! instruction set; [`registry`] merges them into the core table.

mod arrays;
mod booleans;
mod casts;
mod constants;
mod control_flow;
mod fields;
mod increments;
mod invocation;
mod lambdas;
mod operators;
mod stack;
mod variables;

use crate::decompile::element::{Element, ElementType};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::registry::Registry;
use crate::decompile::state::DecompilationState;
use crate::descriptor::JvmType;

pub(crate) fn registry() -> Registry {
    [
        constants::registry(),
        variables::registry(),
        arrays::registry(),
        fields::registry(),
        invocation::registry(),
        operators::registry(),
        casts::registry(),
        increments::registry(),
        stack::registry(),
        control_flow::registry(),
        booleans::registry(),
        lambdas::registry(),
    ]
    .iter()
    .fold(Registry::default(), |merged, module| merged.merge(module))
}

/// Resolve the class constant at `index` to a type.
fn class_type(state: &DecompilationState<'_>, index: u16) -> DecompileResult<JvmType> {
    let name = state.constant_pool().class_name(index)?;
    JvmType::from_class_name(name)
        .ok_or_else(|| DecompileError::format(format!("malformed class name {:?}", name)))
}

fn top_is(state: &DecompilationState<'_>, element_type: ElementType) -> bool {
    state
        .peek_at(0)
        .map_or(false, |e| e.element_type() == element_type)
}

fn is_int(element: &Element, value: i32) -> bool {
    element.as_int_constant() == Some(value) && element.ty() == JvmType::Int
}
