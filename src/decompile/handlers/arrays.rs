use log::debug;

use crate::decompile::element::{ArrayInitializer, Element, ElementKind, ElementType, FieldReference};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::opcodes::*;
use crate::decompile::registry::{Priority, Registry};
use crate::decompile::state::DecompilationState;
use crate::descriptor::{newarray_type, JvmType};

use super::{class_type, top_is};

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    registry.on(NEWARRAY).then(|state, _| {
        let code = state.reader_mut().next_byte()?;
        let component = newarray_type(code)
            .ok_or_else(|| DecompileError::format(format!("invalid primitive array type {}", code)))?;
        new_array(state, component)
    });
    registry.on(ANEWARRAY).then(|state, _| {
        let index = state.reader_mut().next_unsigned_short()?;
        let component = class_type(state, index)?;
        new_array(state, component)
    });
    // A dup ahead of an initializer only serves the store that follows. Any other dup of a
    // new array (`a = b = new int[0]`) is a real copy.
    registry
        .on(DUP)
        .with_priority(Priority::High)
        .when(|state, _| top_is(state, ElementType::NewArray))
        .then(|state, _| {
            if initializer_follows(state) {
                return Ok(());
            }
            let array = state.peek()?.clone();
            state.push(array);
            Ok(())
        });

    registry.on(ARRAYLENGTH).then(|state, _| {
        let array = state.pop()?;
        state.push(Element::new(ElementKind::Field(FieldReference {
            declaring_type: array.ty(),
            target: Some(Box::new(array)),
            field_type: JvmType::Int,
            name: "length".into(),
        })));
        Ok(())
    });

    registry.on(IALOAD..=SALOAD).then(|state, code| {
        let index = state.pop()?;
        let array = state.pop()?;
        let ty = match code {
            IALOAD => JvmType::Int,
            LALOAD => JvmType::Long,
            FALOAD => JvmType::Float,
            DALOAD => JvmType::Double,
            CALOAD => JvmType::Char,
            SALOAD => JvmType::Short,
            // baload serves boolean and byte arrays alike
            BALOAD => array.ty().component_type().cloned().unwrap_or(JvmType::Byte),
            _ => array.ty().component_type().cloned().ok_or_else(|| {
                DecompileError::format(format!("aaload from non-array type {:?}", array.ty()))
            })?,
        };
        state.push(Element::new(ElementKind::ArrayLoad {
            array: Box::new(array),
            index: Box::new(index),
            ty,
        }));
        Ok(())
    });

    registry.on(IASTORE..=SASTORE).then(|state, _| {
        let value = state.pop()?;
        let index = state.pop()?;
        let array = state.pop()?;
        match array.kind {
            ElementKind::NewArray {
                ty,
                component_type,
                length,
                mut initializers,
            } => {
                let position = index.as_int_constant().ok_or_else(|| {
                    DecompileError::format("array initializer index is not a constant")
                })?;
                initializers.push(ArrayInitializer { index: position, value });
                debug!("array initializer {} folded into new {:?}", position, ty);
                state.push(
                    Element::new(ElementKind::NewArray {
                        ty,
                        component_type,
                        length,
                        initializers,
                    })
                    .with_meta(array.meta),
                );
            }
            kind => state.enlist(Element::new(ElementKind::ArrayStore {
                array: Box::new(Element {
                    kind,
                    meta: array.meta,
                }),
                index: Box::new(index),
                value: Box::new(value),
            })),
        }
        Ok(())
    });

    registry.build()
}

/// Whether the next instruction pushes a constant array index.
fn initializer_follows(state: &mut DecompilationState<'_>) -> bool {
    matches!(
        state.reader_mut().peek_instruction(),
        Ok(ICONST_0..=ICONST_5 | BIPUSH | SIPUSH)
    )
}

fn new_array(state: &mut DecompilationState<'_>, component: JvmType) -> DecompileResult<()> {
    let length = state.pop()?;
    state.push(Element::new(ElementKind::NewArray {
        ty: JvmType::array_of(component.clone()),
        component_type: component,
        length: Box::new(length),
        initializers: Vec::new(),
    }));
    Ok(())
}
