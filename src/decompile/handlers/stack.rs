//! `pop`, `dup` and `swap` families. Each accepted form is listed as the computational
//! categories it expects, top of stack first, and the permutation it produces; anything else is
//! a format error.

use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::opcodes::*;
use crate::decompile::registry::Registry;
use crate::decompile::state::DecompilationState;

/// A stack form: categories from the top down, and the values pushed back afterwards as
/// indices into the popped values (0 is the former top), bottom first.
type Form = (&'static [u8], &'static [usize]);

static DUP_FORMS: &[Form] = &[(&[1], &[0, 0])];
static DUP_X1_FORMS: &[Form] = &[(&[1, 1], &[0, 1, 0])];
static DUP_X2_FORMS: &[Form] = &[(&[1, 1, 1], &[0, 2, 1, 0]), (&[1, 2], &[0, 1, 0])];
static DUP2_FORMS: &[Form] = &[(&[1, 1], &[1, 0, 1, 0]), (&[2], &[0, 0])];
static DUP2_X1_FORMS: &[Form] = &[(&[1, 1, 1], &[1, 0, 2, 1, 0]), (&[2, 1], &[0, 1, 0])];
static DUP2_X2_FORMS: &[Form] = &[
    (&[1, 1, 1, 1], &[1, 0, 3, 2, 1, 0]),
    (&[2, 1, 1], &[0, 2, 1, 0]),
    (&[1, 1, 2], &[1, 0, 2, 1, 0]),
    (&[2, 2], &[0, 1, 0]),
];
static SWAP_FORMS: &[Form] = &[(&[1, 1], &[0, 1])];

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    registry.on(POP).then(|state, code| {
        require(state, code, &[1])?;
        state.reduce()?;
        Ok(())
    });
    registry.on(POP2).then(|state, code| {
        if state.is_stack_compliant_with_computational_categories(&[1, 1]) {
            state.reduce()?;
            state.reduce()?;
            Ok(())
        } else {
            require(state, code, &[2])?;
            state.reduce()?;
            Ok(())
        }
    });

    for (code, forms) in [
        (DUP, DUP_FORMS),
        (DUP_X1, DUP_X1_FORMS),
        (DUP_X2, DUP_X2_FORMS),
        (DUP2, DUP2_FORMS),
        (DUP2_X1, DUP2_X1_FORMS),
        (DUP2_X2, DUP2_X2_FORMS),
        (SWAP, SWAP_FORMS),
    ] {
        registry.on(code).then(move |state, code| shuffle(state, code, forms));
    }

    registry.build()
}

fn require(state: &DecompilationState<'_>, code: u8, categories: &[u8]) -> DecompileResult<()> {
    if state.is_stack_compliant_with_computational_categories(categories) {
        Ok(())
    } else {
        Err(shape_error(state, code))
    }
}

fn shuffle(state: &mut DecompilationState<'_>, code: u8, forms: &[Form]) -> DecompileResult<()> {
    let (categories, order) = forms
        .iter()
        .find(|(categories, _)| state.is_stack_compliant_with_computational_categories(categories))
        .ok_or_else(|| shape_error(state, code))?;

    // popped in push order, so index 0 (the former top) is the last one
    let popped = state.pop_many(categories.len())?;
    for position in order.iter() {
        state.push(popped[popped.len() - 1 - position].clone());
    }
    Ok(())
}

fn shape_error(state: &DecompilationState<'_>, code: u8) -> DecompileError {
    let categories: Vec<u8> = state
        .stacked_expressions()
        .iter()
        .rev()
        .take(4)
        .map(|s| s.expression.ty().category())
        .collect();
    DecompileError::format(format!(
        "{} at pc {} does not accept a stack of categories {:?} (top first)",
        mnemonic(code),
        state.instruction_pc(),
        categories
    ))
}
