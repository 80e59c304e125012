//! `invokedynamic` call sites: lambdas and method references bootstrapped through
//! `LambdaMetafactory`, and string concatenation through `StringConcatFactory`.

use log::debug;

use crate::constant_info::Literal;
use crate::decompile::element::{Element, ElementKind, Lambda, OperatorType};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::opcodes::*;
use crate::decompile::registry::{Priority, Registry};
use crate::decompile::state::DecompilationState;
use crate::descriptor::{JvmType, MethodDescriptor};

const STRING_CONCAT_FACTORY: &str = "java/lang/invoke/StringConcatFactory";

/// Null checks the compiler puts on the receiver of a bound method reference.
static RECEIVER_CHECKS: &[(&str, &str)] = &[
    ("java/util/Objects", "requireNonNull"),
    ("java/lang/Object", "getClass"),
];

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    registry.on(INVOKEDYNAMIC).then(|state, _| {
        let index = state.reader_mut().next_unsigned_short()?;
        // two reserved zero bytes
        state.reader_mut().next_unsigned_short()?;
        invoke_dynamic(state, index)
    });

    registry
        .after(INVOKEDYNAMIC)
        .with_priority(Priority::High)
        .when(|state, _| match (state.peek_at(0), state.last_statement(0)) {
            (Some(top), Some(last)) => is_receiver_check_of(last, top),
            _ => false,
        })
        .then(|state, _| {
            debug!("dropping null check of a method reference receiver");
            state.remove_last_statement()?;
            Ok(())
        });

    registry.build()
}

fn invoke_dynamic(state: &mut DecompilationState<'_>, index: u16) -> DecompileResult<()> {
    let pool = state.constant_pool();
    let call_site = pool.invoke_dynamic(index)?;
    let bootstrap = state
        .method()
        .bootstrap_method(call_site.bootstrap_method_attr_index)
        .ok_or_else(|| {
            DecompileError::unresolved(format!(
                "bootstrap method {} of call site {}",
                call_site.bootstrap_method_attr_index, index
            ))
        })?;
    let factory = pool.method_handle(bootstrap.bootstrap_method_ref)?;
    let site_signature = MethodDescriptor::parse(call_site.descriptor)?;

    if factory.member.class_name == STRING_CONCAT_FACTORY {
        return concatenate(state, &site_signature, &bootstrap.bootstrap_arguments);
    }

    let [functional, backing, _instantiated] = bootstrap.bootstrap_arguments[..] else {
        return Err(DecompileError::format(format!(
            "call site {} has {} bootstrap arguments, expected 3",
            index,
            bootstrap.bootstrap_arguments.len()
        )));
    };
    let interface_signature = MethodDescriptor::parse(pool.method_type(functional)?)?;
    let handle = pool.method_handle(backing)?;
    let backing_signature = MethodDescriptor::parse(handle.member.descriptor)?;

    let captured = site_signature.parameters.len();
    let enclosed = backing_signature
        .parameters
        .len()
        .saturating_sub(interface_signature.parameters.len());
    let receivers = captured.checked_sub(enclosed).filter(|r| *r <= 1).ok_or_else(|| {
        DecompileError::format(format!(
            "call site {} captures {} values for {} enclosed variables",
            index, captured, enclosed
        ))
    })?;

    let enclosed_variables = state
        .pop_many(enclosed)?
        .into_iter()
        .map(|value| match value.kind {
            ElementKind::Variable(variable) => Ok(variable),
            _ => Err(DecompileError::format(format!(
                "lambda captures a {} instead of a variable",
                value.element_type()
            ))),
        })
        .collect::<DecompileResult<Vec<_>>>()?;
    let receiver = match receivers {
        1 => Some(Box::new(state.pop()?)),
        _ => None,
    };

    state.push(Element::new(ElementKind::Lambda(Lambda {
        receiver,
        reference_kind: handle.kind,
        functional_interface: site_signature.return_type,
        functional_method: call_site.name.to_string(),
        interface_signature,
        declaring_class: JvmType::reference(handle.member.class_name),
        backing_method: handle.member.name.to_string(),
        backing_signature,
        enclosed_variables,
    })));
    Ok(())
}

/// Rebuild `makeConcatWithConstants` as a chain of `+`. In the recipe `\u{1}` stands for the
/// next argument and `\u{2}` for the next constant bootstrap argument.
fn concatenate(state: &mut DecompilationState<'_>, signature: &MethodDescriptor, arguments: &[u16]) -> DecompileResult<()> {
    let pool = state.constant_pool();
    let mut values = state.pop_many(signature.parameters.len())?.into_iter();

    let Some((recipe_index, constants)) = arguments.split_first() else {
        // plain makeConcat: arguments only
        let parts: Vec<Element> = values.collect();
        state.push(join(parts));
        return Ok(());
    };
    let Literal::String(recipe) = pool.literal(*recipe_index)? else {
        return Err(DecompileError::format("string concatenation recipe is not a string"));
    };
    let mut constants = constants.iter();

    let mut parts = Vec::new();
    let mut text = String::new();
    for c in recipe.chars() {
        let part = match c {
            '\u{1}' => values
                .next()
                .ok_or_else(|| DecompileError::format("concatenation recipe has too many arguments"))?,
            '\u{2}' => {
                let index = constants
                    .next()
                    .ok_or_else(|| DecompileError::format("concatenation recipe has too many constants"))?;
                match pool.literal(*index)? {
                    Literal::String(s) => Element::string(&s),
                    other => Element::string(&other.to_string()),
                }
            }
            c => {
                text.push(c);
                continue;
            }
        };
        if !text.is_empty() {
            parts.push(Element::string(&std::mem::take(&mut text)));
        }
        parts.push(part);
    }
    if !text.is_empty() {
        parts.push(Element::string(&text));
    }

    state.push(join(parts));
    Ok(())
}

fn join(parts: Vec<Element>) -> Element {
    let mut parts = parts.into_iter();
    let first = parts.next().unwrap_or_else(|| Element::string(""));
    // keep the first operand a string so the chain stays a concatenation
    let first = if first.ty() == JvmType::string() || parts.as_slice().is_empty() {
        first
    } else {
        Element::binary(Element::string(""), OperatorType::Plus, first, JvmType::string())
    };
    parts.fold(first, |left, right| {
        Element::binary(left, OperatorType::Plus, right, JvmType::string())
    })
}

fn is_receiver_check_of(statement: &Element, lambda: &Element) -> bool {
    let ElementKind::Lambda(Lambda {
        receiver: Some(receiver),
        reference_kind,
        ..
    }) = &lambda.kind
    else {
        return false;
    };
    if !reference_kind.has_receiver() {
        return false;
    }
    let Some(call) = statement.as_method_call() else {
        return false;
    };
    let checked = call.target.as_deref().or(call.args.first());
    RECEIVER_CHECKS
        .iter()
        .any(|(class, name)| call.target_type == JvmType::reference(class) && call.name == *name)
        && checked == Some(receiver.as_ref())
}
