use crate::decompile::element::{Element, ElementKind};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::opcodes::*;
use crate::decompile::registry::Registry;
use crate::decompile::state::DecompilationState;

use super::increments;

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    registry.on(ILOAD..=ALOAD).then(|state, _| {
        let index = state.reader_mut().next_byte()? as u16;
        load(state, index)
    });
    registry.on(SHORT_LOADS).then(|state, code| load(state, ((code - ILOAD_0) % 4) as u16));
    registry.on(ISTORE..=ASTORE).then(|state, _| {
        let index = state.reader_mut().next_byte()? as u16;
        store(state, index)
    });
    registry.on(SHORT_STORES).then(|state, code| store(state, ((code - ISTORE_0) % 4) as u16));
    registry.on(WIDE).then(|state, _| {
        let code = state.reader_mut().next_instruction()?;
        let index = state.reader_mut().next_unsigned_short()?;
        match code {
            ILOAD..=ALOAD => load(state, index),
            ISTORE..=ASTORE => store(state, index),
            IINC => {
                let delta = state.reader_mut().next_signed_short()?;
                increments::increment(state, index, delta as i32)
            }
            other => Err(DecompileError::format(format!(
                "unsupported wide instruction {}",
                mnemonic(other)
            ))),
        }
    });

    registry.build()
}

fn load(state: &mut DecompilationState<'_>, index: u16) -> DecompileResult<()> {
    let variable = state.local_variable(index, state.instruction_pc())?;
    state.push(Element::new(ElementKind::Variable(variable)));
    Ok(())
}

/// A store opens the variable's scope, so the slot is looked up at the following instruction
/// first.
fn store(state: &mut DecompilationState<'_>, index: u16) -> DecompileResult<()> {
    let value = state.pop()?;
    let variable = state
        .local_variable(index, state.pc())
        .or_else(|_| state.local_variable(index, state.instruction_pc()))?;
    state.enlist(Element::new(ElementKind::VariableAssignment {
        index,
        name: variable.name,
        ty: variable.ty,
        value: Box::new(value),
    }));
    Ok(())
}
