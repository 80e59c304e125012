//! Increment and decrement reconstruction.
//!
//! `iinc` leaves nothing on the stack, so it is first modeled as an [`Affix::Undefined`]
//! increment that a following load resolves: a load of the same variable already below the
//! increment makes it postfix, a load right after it makes it prefix.
//!
//! Byte, short and char variables have no `iinc` form. The compiler emits
//! `load, const 1, add/sub, narrowing cast, store` instead, optionally with an extra load
//! before (postfix) or after (prefix). Only that exact shape is recognized.

use log::debug;

use crate::decompile::element::{
    Affix, Element, ElementKind, LocalVariableReference, OperatorType,
};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::opcodes::*;
use crate::decompile::registry::Registry;
use crate::decompile::state::DecompilationState;
use crate::descriptor::JvmType;

use super::is_int;

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    registry.on(IINC).then(|state, _| {
        let index = state.reader_mut().next_byte()? as u16;
        let delta = state.reader_mut().next_signed_byte()?;
        increment(state, index, delta as i32)
    });

    registry
        .after(IINC)
        .when(|state, _| match (state.peek_at(1), state.peek_at(0)) {
            (Some(below), Some(top)) => undefined_increment_of(top, below),
            _ => false,
        })
        .then(|state, _| {
            let increment = state.pop()?;
            state.pop()?;
            state.push(with_affix(increment, Affix::Postfix)?);
            Ok(())
        });

    registry
        .after(PRIMITIVE_LOADS)
        .when(|state, _| match (state.peek_at(1), state.peek_at(0)) {
            (Some(below), Some(top)) => undefined_increment_of(below, top),
            _ => false,
        })
        .then(|state, _| {
            state.pop()?;
            let increment = state.pop()?;
            state.push(with_affix(increment, Affix::Prefix)?);
            Ok(())
        });

    registry
        .after(INTEGER_LOADS)
        .when(|state, _| {
            let (Some(top), Some(last)) = (state.peek_at(0), state.last_statement(0)) else {
                return false;
            };
            top.as_variable()
                .map_or(false, |v| narrow_increment(last, v).is_some())
        })
        .then(|state, _| {
            let variable = state.pop()?;
            let assignment = state.remove_last_statement()?;
            push_narrow_increment(state, variable, &assignment, Affix::Prefix)
        });

    registry
        .after(INTEGER_STORES)
        .when(|state, _| {
            let (Some(top), Some(last)) = (state.peek_at(0), state.last_statement(0)) else {
                return false;
            };
            top.as_variable()
                .map_or(false, |v| narrow_increment(last, v).is_some())
        })
        .then(|state, _| {
            let assignment = state.remove_last_statement()?;
            let variable = state.pop()?;
            push_narrow_increment(state, variable, &assignment, Affix::Postfix)
        });

    registry.build()
}

/// Model an `iinc` of slot `index` by `delta`.
pub(super) fn increment(state: &mut DecompilationState<'_>, index: u16, delta: i32) -> DecompileResult<()> {
    let variable = state.local_variable(index, state.instruction_pc())?;
    let ty = variable.ty.clone();
    state.push(Element::new(ElementKind::Increment {
        variable,
        delta,
        ty,
        affix: Affix::Undefined,
    }));
    Ok(())
}

/// Whether `increment` is an unresolved increment of the variable `load` reads.
fn undefined_increment_of(increment: &Element, load: &Element) -> bool {
    match (&increment.kind, load.as_variable()) {
        (
            ElementKind::Increment {
                variable,
                affix: Affix::Undefined,
                ..
            },
            Some(loaded),
        ) => variable.index == loaded.index && variable.name == loaded.name,
        _ => false,
    }
}

fn with_affix(increment: Element, affix: Affix) -> DecompileResult<Element> {
    match increment.kind {
        ElementKind::Increment {
            variable, delta, ty, ..
        } => {
            debug!("resolved increment of {} as {:?}", variable.name, affix);
            Ok(Element::new(ElementKind::Increment {
                variable,
                delta,
                ty,
                affix,
            })
            .with_meta(increment.meta))
        }
        _ => Err(DecompileError::illegal_state("expected an increment")),
    }
}

/// Match `variable = (narrow) (variable +/- 1)`, returning the delta and the narrow type.
fn narrow_increment(statement: &Element, variable: &LocalVariableReference) -> Option<(i32, JvmType)> {
    let ElementKind::VariableAssignment { index, value, .. } = &statement.kind else {
        return None;
    };
    let ElementKind::Cast { value: sum, ty } = &value.kind else {
        return None;
    };
    let ElementKind::BinaryOperator { left, op, right, .. } = &sum.kind else {
        return None;
    };
    let delta = match op {
        OperatorType::Plus => 1,
        OperatorType::Minus => -1,
        _ => return None,
    };
    let matches = *index == variable.index
        && ty.is_narrow_integral()
        && left.as_variable() == Some(variable)
        && is_int(right, 1);
    matches.then(|| (delta, ty.clone()))
}

fn push_narrow_increment(
    state: &mut DecompilationState<'_>,
    variable: Element,
    assignment: &Element,
    affix: Affix,
) -> DecompileResult<()> {
    let variable = variable
        .as_variable()
        .cloned()
        .ok_or_else(|| DecompileError::illegal_state("expected a variable"))?;
    let (delta, ty) = narrow_increment(assignment, &variable)
        .ok_or_else(|| DecompileError::illegal_state("expected a narrow increment"))?;
    debug!("narrow increment of {} resolved as {:?}", variable.name, affix);
    state.push(
        Element::new(ElementKind::Increment {
            variable,
            delta,
            ty,
            affix,
        })
        .with_meta(assignment.meta),
    );
    Ok(())
}
