use crate::decompile::element::{Element, ElementKind, FieldReference};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::opcodes::*;
use crate::decompile::registry::Registry;
use crate::decompile::state::DecompilationState;
use crate::descriptor::{parse_type_descriptor, JvmType};

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    registry.on([GETSTATIC, GETFIELD]).then(|state, code| {
        let field = field(state, code == GETFIELD)?;
        state.push(Element::new(ElementKind::Field(field)));
        Ok(())
    });
    registry.on([PUTSTATIC, PUTFIELD]).then(|state, code| {
        let value = state.pop()?;
        let field = field(state, code == PUTFIELD)?;
        state.enlist(Element::new(ElementKind::FieldAssignment {
            field,
            value: Box::new(value),
        }));
        Ok(())
    });

    registry.build()
}

/// Resolve the field operand, popping the owning instance unless the field is static.
fn field(state: &mut DecompilationState<'_>, instance: bool) -> DecompileResult<FieldReference> {
    let index = state.reader_mut().next_unsigned_short()?;
    let member = state.constant_pool().field_ref(index)?;
    let field_type = parse_type_descriptor(member.descriptor).ok_or_else(|| {
        DecompileError::format(format!("malformed field descriptor {:?}", member.descriptor))
    })?;
    let target = if instance {
        Some(Box::new(state.pop()?))
    } else {
        None
    };
    Ok(FieldReference {
        target,
        declaring_type: JvmType::reference(member.class_name),
        field_type,
        name: member.name.to_string(),
    })
}
