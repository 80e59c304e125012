//! Boolean values the compiler lowered to integers and jumps.

use log::debug;

use crate::decompile::element::{
    Element, ElementKind, ElementType, MethodCall, OperatorType, UnaryOperatorType,
};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::opcodes::*;
use crate::decompile::registry::{Priority, Registry};
use crate::descriptor::JvmType;

use super::is_int;

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    // if (l op r) goto A; iconst_1; goto B; A: iconst_0  =>  l !op r
    registry
        .after(ICONST_0)
        .when(|state, _| {
            state.peek_at(0).map_or(false, |e| is_int(e, 0))
                && state.peek_at(1).map_or(false, |e| is_int(e, 1))
                && state
                    .last_statement(0)
                    .map_or(false, |s| s.element_type() == ElementType::Goto)
                && state
                    .last_statement(1)
                    .map_or(false, |s| s.element_type() == ElementType::Branch)
        })
        .then(|state, _| {
            state.pop()?;
            state.pop()?;
            state.remove_last_statement()?;
            let branch = state.remove_last_statement()?;
            let condition = condition(branch)?;
            debug!("folded branch into boolean {}", condition.element_type());
            state.push(condition);
            Ok(())
        });

    registry
        .after(INTEGER_STORES)
        .with_priority(Priority::Low)
        .when(|state, _| {
            matches!(
                state.last_statement(0).map(|s| &s.kind),
                Some(ElementKind::VariableAssignment { ty: JvmType::Boolean, value, .. }) if boolean_literal(value).is_some()
            )
        })
        .then(|state, _| {
            let index = state.statement_count() - 1;
            let Some(ElementKind::VariableAssignment {
                index: slot,
                name,
                ty,
                value,
            }) = state.last_statement(0).map(|s| s.kind.clone())
            else {
                return Err(DecompileError::illegal_state("expected an assignment"));
            };
            let value = boolean_literal(&value).unwrap_or(*value);
            state.replace_statement(
                index,
                Element::new(ElementKind::VariableAssignment {
                    index: slot,
                    name,
                    ty,
                    value: Box::new(value),
                }),
            )
        });

    registry
        .after(IRETURN)
        .with_priority(Priority::Low)
        .when(|state, _| {
            state.method().signature.return_type == JvmType::Boolean
                && matches!(
                    state.last_statement(0).map(|s| &s.kind),
                    Some(ElementKind::ReturnValue { value }) if boolean_literal(value).is_some()
                )
        })
        .then(|state, _| {
            let index = state.statement_count() - 1;
            let Some(ElementKind::ReturnValue { value }) = state.last_statement(0).map(|s| s.kind.clone()) else {
                return Err(DecompileError::illegal_state("expected a return"));
            };
            let value = boolean_literal(&value).unwrap_or(*value);
            state.replace_statement(index, Element::return_value(value))
        });

    registry
        .after(INVOCATIONS)
        .with_priority(Priority::Low)
        .when(|state, _| {
            state.peek_at(0).map_or(false, |top| match &top.kind {
                ElementKind::MethodCall(call) => has_boolean_literal_argument(&call.signature.parameters, &call.args),
                ElementKind::NewInstance { signature, args, .. } => {
                    has_boolean_literal_argument(&signature.parameters, args)
                }
                _ => false,
            })
        })
        .then(|state, _| {
            let top = state.pop()?;
            let kind = match top.kind {
                ElementKind::MethodCall(call) => ElementKind::MethodCall(MethodCall {
                    args: coerce_arguments(&call.signature.parameters, call.args),
                    ..call
                }),
                ElementKind::NewInstance { ty, signature, args } => ElementKind::NewInstance {
                    args: coerce_arguments(&signature.parameters, args),
                    ty,
                    signature,
                },
                kind => kind,
            };
            state.push(Element { kind, meta: top.meta });
            Ok(())
        });

    registry.build()
}

/// The boolean expression that is true when `branch` is not taken.
fn condition(branch: Element) -> DecompileResult<Element> {
    let ElementKind::Branch { left, op, right, .. } = branch.kind else {
        return Err(DecompileError::illegal_state("expected a branch"));
    };
    let inverse = op
        .inverse()
        .ok_or_else(|| DecompileError::illegal_state(format!("{:?} is not a comparison", op)))?;

    if op == OperatorType::Ne && left.ty() == JvmType::Boolean && is_int(&right, 0) {
        return Ok(Element::unary(*left, UnaryOperatorType::Not, JvmType::Boolean));
    }
    if let ElementKind::Compare { left: l, right: r } = &left.kind {
        if is_int(&right, 0) {
            return Ok(Element::binary(
                (**l).clone(),
                inverse,
                (**r).clone(),
                JvmType::Boolean,
            ));
        }
    }
    Ok(Element::binary(*left, inverse, *right, JvmType::Boolean))
}

fn boolean_literal(value: &Element) -> Option<Element> {
    if is_int(value, 0) {
        Some(Element::boolean(false).with_meta(value.meta))
    } else if is_int(value, 1) {
        Some(Element::boolean(true).with_meta(value.meta))
    } else {
        None
    }
}

fn has_boolean_literal_argument(parameters: &[JvmType], args: &[Element]) -> bool {
    parameters
        .iter()
        .zip(args)
        .any(|(p, a)| *p == JvmType::Boolean && boolean_literal(a).is_some())
}

fn coerce_arguments(parameters: &[JvmType], args: Vec<Element>) -> Vec<Element> {
    args.into_iter()
        .zip(parameters)
        .map(|(arg, p)| match p {
            JvmType::Boolean => boolean_literal(&arg).unwrap_or(arg),
            _ => arg,
        })
        .collect()
}
