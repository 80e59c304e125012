use log::debug;

use crate::decompile::element::{Element, ElementKind, ElementType, OperatorType};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::opcodes::*;
use crate::decompile::registry::{Priority, Registry};
use crate::decompile::state::DecompilationState;
use crate::descriptor::JvmType;

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    registry.on(RETURN).then(|state, _| {
        state.reduce_all()?;
        state.enlist(Element::new(ElementKind::Return));
        Ok(())
    });
    registry.on(IRETURN..=ARETURN).then(|state, code| {
        let value = state.pop()?;
        let ty = value.ty();
        let accepted = match code {
            IRETURN => matches!(
                ty,
                JvmType::Int | JvmType::Boolean | JvmType::Byte | JvmType::Short | JvmType::Char
            ),
            LRETURN => ty == JvmType::Long,
            FRETURN => ty == JvmType::Float,
            DRETURN => ty == JvmType::Double,
            _ => !ty.is_primitive(),
        };
        if !accepted {
            return Err(DecompileError::format(format!(
                "{} cannot return a value of type {:?}",
                mnemonic(code),
                ty
            )));
        }
        state.enlist(Element::return_value(value));
        Ok(())
    });

    registry.on(GOTO).then(|state, _| {
        let offset = state.reader_mut().next_signed_short()?;
        goto(state, offset as i32)
    });
    registry.on(GOTO_W).then(|state, _| {
        let offset = state.reader_mut().next_int()?;
        goto(state, offset)
    });

    // The goto closing a try block: only the protected line is wanted.
    registry
        .after([GOTO, GOTO_W])
        .with_priority(Priority::High)
        .when(|state, _| {
            !state.is_aborted()
                && state
                    .last_statement(0)
                    .map_or(false, |s| s.element_type() == ElementType::Goto)
                && state
                    .method()
                    .exception_entry_ending_at(state.instruction_pc())
                    .map_or(false, |e| e.start_pc as u32 <= state.start_pc())
        })
        .then(|state, _| {
            debug!("leaving try block at pc {}", state.instruction_pc());
            state.remove_last_statement()?;
            state.abort();
            Ok(())
        });

    registry.on(IFEQ..=IFLE).then(|state, code| {
        let left = state.pop()?;
        branch(state, left, compare_operator(code - IFEQ), Element::int(0))
    });
    registry.on(IF_ICMPEQ..=IF_ACMPNE).then(|state, code| {
        let right = state.pop()?;
        let left = state.pop()?;
        let op = match code {
            IF_ACMPEQ => OperatorType::Eq,
            IF_ACMPNE => OperatorType::Ne,
            _ => compare_operator(code - IF_ICMPEQ),
        };
        branch(state, left, op, right)
    });
    registry.on([IFNULL, IFNONNULL]).then(|state, code| {
        let left = state.pop()?;
        let op = if code == IFNULL {
            OperatorType::Eq
        } else {
            OperatorType::Ne
        };
        branch(state, left, op, Element::null())
    });

    registry.on(ATHROW).then(|state, _| {
        let value = state.pop()?;
        state.enlist(Element::new(ElementKind::Throw {
            value: Box::new(value),
        }));
        Ok(())
    });

    registry.build()
}

/// Operator of the `eq, ne, lt, ge, gt, le` sequence shared by both conditional families.
fn compare_operator(position: u8) -> OperatorType {
    match position {
        0 => OperatorType::Eq,
        1 => OperatorType::Ne,
        2 => OperatorType::Lt,
        3 => OperatorType::Ge,
        4 => OperatorType::Gt,
        _ => OperatorType::Le,
    }
}

fn target(state: &DecompilationState<'_>, offset: i32) -> DecompileResult<i64> {
    let target = state.instruction_pc() as i64 + offset as i64;
    if target < 0 {
        return Err(DecompileError::format(format!(
            "jump at pc {} to negative offset {}",
            state.instruction_pc(),
            target
        )));
    }
    Ok(target)
}

fn goto(state: &mut DecompilationState<'_>, offset: i32) -> DecompileResult<()> {
    let target_pc = target(state, offset)?;
    if target_pc < state.start_pc() as i64 {
        debug!("goto {} jumps before the decompiled range", target_pc);
        state.abort();
        return Ok(());
    }
    state.enlist(Element::new(ElementKind::Goto {
        target_pc: target_pc as u32,
    }));
    Ok(())
}

fn branch(state: &mut DecompilationState<'_>, left: Element, op: OperatorType, right: Element) -> DecompileResult<()> {
    let offset = state.reader_mut().next_signed_short()?;
    let target_pc = target(state, offset as i32)? as u32;
    state.enlist(Element::new(ElementKind::Branch {
        left: Box::new(left),
        op,
        right: Box::new(right),
        target_pc,
    }));
    Ok(())
}
