use log::debug;

use crate::decompile::element::{Element, ElementKind, ElementType};
use crate::decompile::error::DecompileError;
use crate::decompile::opcodes::*;
use crate::decompile::registry::{Priority, Registry};

use super::{class_type, top_is};

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    registry.on(CHECKCAST).then(|state, _| {
        let index = state.reader_mut().next_unsigned_short()?;
        let ty = class_type(state, index)?;
        let value = state.pop()?;
        state.push(Element::cast(value, ty));
        Ok(())
    });
    registry.on(INSTANCEOF).then(|state, _| {
        let index = state.reader_mut().next_unsigned_short()?;
        let ty = class_type(state, index)?;
        let value = state.pop()?;
        state.push(Element::new(ElementKind::InstanceOf {
            value: Box::new(value),
            ty,
        }));
        Ok(())
    });

    // A discarded cast is one the compiler added around a generic call result.
    registry
        .on(POP)
        .with_priority(Priority::High)
        .when(|state, _| top_is(state, ElementType::Cast))
        .then(|state, _| {
            let ElementKind::Cast { value, .. } = state.pop()?.kind else {
                return Err(DecompileError::illegal_state("expected a cast"));
            };
            debug!("unwrapping implicit cast of {}", value.element_type());
            state.push(*value);
            state.reduce()?;
            Ok(())
        });

    registry.build()
}
