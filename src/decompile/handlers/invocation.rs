use log::debug;

use crate::decompile::element::{Element, ElementKind, MethodCall};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::opcodes::*;
use crate::decompile::registry::{Priority, Registry};
use crate::decompile::state::DecompilationState;
use crate::descriptor::{JvmType, MethodDescriptor};

use super::class_type;

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    registry
        .on([INVOKEVIRTUAL, INVOKESPECIAL, INVOKESTATIC])
        .then(|state, code| invoke(state, code == INVOKESTATIC));
    registry.on(INVOKEINTERFACE).then(|state, _| {
        let index = state.reader_mut().next_unsigned_short()?;
        let count = state.reader_mut().next_byte()?;
        if count == 0 {
            return Err(DecompileError::format("invokeinterface with an argument count of zero"));
        }
        state.reader_mut().next_byte()?;
        call(state, index, false)
    });

    registry.on(NEW).then(|state, _| {
        let index = state.reader_mut().next_unsigned_short()?;
        let ty = class_type(state, index)?;
        let next = state.reader_mut().next_instruction()?;
        if next != DUP {
            return Err(DecompileError::format(format!(
                "expected dup after new {:?}, found {}",
                ty,
                mnemonic(next)
            )));
        }
        state.push(Element::new(ElementKind::Allocate { ty }));
        Ok(())
    });

    registry
        .after(INVOKESPECIAL)
        .with_priority(Priority::High)
        .when(|state, _| state.peek_at(0).map_or(false, is_constructor_of_allocation))
        .then(|state, _| {
            let stacked = state.pop()?;
            let ElementKind::MethodCall(call) = stacked.kind else {
                return Err(DecompileError::illegal_state("expected a constructor call"));
            };
            debug!("collapsing allocation of {:?} into its constructor call", call.ty);
            state.push(
                Element::new(ElementKind::NewInstance {
                    ty: call.ty,
                    signature: call.signature,
                    args: call.args,
                })
                .with_meta(stacked.meta),
            );
            Ok(())
        });

    registry.build()
}

fn is_constructor_of_allocation(element: &Element) -> bool {
    match element.as_method_call() {
        Some(call) => {
            call.is_constructor()
                && matches!(
                    call.target.as_deref().map(|t| &t.kind),
                    Some(ElementKind::Allocate { .. })
                )
        }
        None => false,
    }
}

fn invoke(state: &mut DecompilationState<'_>, is_static: bool) -> DecompileResult<()> {
    let index = state.reader_mut().next_unsigned_short()?;
    call(state, index, is_static)
}

fn call(state: &mut DecompilationState<'_>, index: u16, is_static: bool) -> DecompileResult<()> {
    let member = state.constant_pool().method_ref(index)?;
    let signature = MethodDescriptor::parse(member.descriptor)?;
    let target_type = JvmType::reference(member.class_name);

    let args = state.pop_many(signature.parameters.len())?;
    let target = if is_static {
        None
    } else {
        Some(Box::new(state.pop()?))
    };

    let ty = if member.name == "<init>" {
        target_type.clone()
    } else {
        signature.return_type.clone()
    };

    state.push(Element::new(ElementKind::MethodCall(MethodCall {
        target_type,
        name: member.name.to_string(),
        signature,
        target,
        args,
        ty,
    })));
    Ok(())
}
