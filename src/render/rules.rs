//! The core rendering rules, one or more per element type.

use crate::constant_info::ReferenceKind;
use crate::decompile::{
    Affix, ConstantValue, Element, ElementKind, ElementType, FieldReference, Lambda, MethodCall,
    Priority,
};
use crate::descriptor::{unboxed_type, JvmType};
use crate::render::context::RenderContext;
use crate::render::registry::RenderRegistry;
use crate::render::{RenderError, RenderResult};

pub(crate) fn registry() -> RenderRegistry {
    let mut registry = RenderRegistry::builder();

    registry.on(ElementType::Constant).then(|e, ctx| {
        let ElementKind::Constant { value, .. } = &e.kind else {
            return Err(mismatch(e));
        };
        Ok(constant(value, ctx))
    });
    registry.on(ElementType::VariableReference).then(|e, ctx| {
        let variable = e.as_variable().ok_or_else(|| mismatch(e))?;
        Ok(ctx
            .binding(variable.index)
            .map_or_else(|| variable.name.clone(), str::to_string))
    });
    registry.on(ElementType::FieldReference).then(|e, ctx| {
        let ElementKind::Field(field) = &e.kind else {
            return Err(mismatch(e));
        };
        field_access(field, ctx)
    });
    registry.on(ElementType::ArrayLoad).then(|e, ctx| {
        let ElementKind::ArrayLoad { array, index, .. } = &e.kind else {
            return Err(mismatch(e));
        };
        Ok(format!("{}[{}]", ctx.render_operand(array)?, ctx.render(index)?))
    });

    registry.on(ElementType::BinaryOperator).then(|e, ctx| {
        let ElementKind::BinaryOperator { left, op, right, .. } = &e.kind else {
            return Err(mismatch(e));
        };
        let precedence = op.precedence();
        let left = match &left.kind {
            ElementKind::BinaryOperator { op: inner, .. } if inner.precedence() < precedence => {
                format!("({})", ctx.render(left)?)
            }
            _ => ctx.render(left)?,
        };
        let right = match &right.kind {
            ElementKind::BinaryOperator { op: inner, .. } if inner.precedence() <= precedence => {
                format!("({})", ctx.render(right)?)
            }
            _ => ctx.render(right)?,
        };
        Ok(format!("{} {} {}", left, op.token(), right))
    });
    registry.on(ElementType::UnaryOperator).then(|e, ctx| {
        let ElementKind::UnaryOperator { operand, op, .. } = &e.kind else {
            return Err(mismatch(e));
        };
        Ok(format!("{}{}", op.token(), ctx.render_operand(operand)?))
    });
    registry.on(ElementType::Compare).then(|e, ctx| {
        let ElementKind::Compare { left, right } = &e.kind else {
            return Err(mismatch(e));
        };
        let wrapper = match left.ty() {
            JvmType::Long => "Long",
            JvmType::Float => "Float",
            _ => "Double",
        };
        Ok(format!("{}.compare({}, {})", wrapper, ctx.render(left)?, ctx.render(right)?))
    });
    registry.on(ElementType::Cast).then(|e, ctx| {
        let ElementKind::Cast { value, ty } = &e.kind else {
            return Err(mismatch(e));
        };
        Ok(format!("({}) {}", ctx.type_name(ty), ctx.render_operand(value)?))
    });
    registry.on(ElementType::InstanceOf).then(|e, ctx| {
        let ElementKind::InstanceOf { value, ty } = &e.kind else {
            return Err(mismatch(e));
        };
        Ok(format!("{} instanceof {}", ctx.render_operand(value)?, ctx.type_name(ty)))
    });
    registry.on(ElementType::Increment).then(|e, _| {
        let ElementKind::Increment {
            variable,
            delta,
            affix,
            ..
        } = &e.kind
        else {
            return Err(mismatch(e));
        };
        let name = &variable.name;
        Ok(match (*delta, affix) {
            (1, Affix::Prefix) => format!("++{}", name),
            (1, _) => format!("{}++", name),
            (-1, Affix::Prefix) => format!("--{}", name),
            (-1, _) => format!("{}--", name),
            (d, _) if d < 0 => format!("{} -= {}", name, -(d as i64)),
            (d, _) => format!("{} += {}", name, d),
        })
    });

    registry.on(ElementType::MethodCall).then(|e, ctx| {
        let call = e.as_method_call().ok_or_else(|| mismatch(e))?;
        method_call(call, ctx)
    });
    registry
        .on(ElementType::MethodCall)
        .with_priority(Priority::High)
        .when(|e, _| e.as_method_call().map_or(false, |c| boxed_value(c).is_some()))
        .then(|e, ctx| {
            let call = e.as_method_call().ok_or_else(|| mismatch(e))?;
            let value = boxed_value(call).ok_or_else(|| mismatch(e))?;
            match (call.signature.parameters.first(), value.as_int_constant()) {
                (Some(JvmType::Boolean), Some(0)) => Ok("false".into()),
                (Some(JvmType::Boolean), Some(1)) => Ok("true".into()),
                _ => ctx.render(value),
            }
        });
    registry
        .on(ElementType::MethodCall)
        .with_priority(Priority::High)
        .when(|e, ctx| {
            e.as_method_call()
                .map_or(false, |c| c.name.starts_with("access$") && c.target.is_none())
                && ctx.resolver().is_some()
        })
        .then(|e, ctx| {
            let call = e.as_method_call().ok_or_else(|| mismatch(e))?;
            match accessor(call, ctx) {
                Some(text) => Ok(text),
                None => method_call(call, ctx),
            }
        });

    registry.on(ElementType::Allocate).then(|e, ctx| {
        Ok(format!("new {}<uninitialized>", ctx.type_name(&e.ty())))
    });
    registry.on(ElementType::NewInstance).then(|e, ctx| {
        let ElementKind::NewInstance { ty, args, .. } = &e.kind else {
            return Err(mismatch(e));
        };
        Ok(format!("new {}({})", ctx.type_name(ty), ctx.render_arguments(args)?))
    });
    registry.on(ElementType::NewArray).then(|e, ctx| {
        let ElementKind::NewArray {
            component_type,
            length,
            initializers,
            ..
        } = &e.kind
        else {
            return Err(mismatch(e));
        };
        if initializers.is_empty() {
            let mut base = component_type;
            let mut dimensions = String::new();
            while let Some(inner) = base.component_type() {
                dimensions.push_str("[]");
                base = inner;
            }
            return Ok(format!(
                "new {}[{}]{}",
                ctx.type_name(base),
                ctx.render(length)?,
                dimensions
            ));
        }
        let mut sorted: Vec<_> = initializers.iter().collect();
        sorted.sort_by_key(|i| i.index);
        let values = sorted
            .iter()
            .map(|i| ctx.render(&i.value))
            .collect::<RenderResult<Vec<_>>>()?;
        Ok(format!(
            "new {}[] {{ {} }}",
            ctx.type_name(component_type),
            values.join(", ")
        ))
    });
    registry.on(ElementType::Lambda).then(|e, ctx| {
        let ElementKind::Lambda(lambda) = &e.kind else {
            return Err(mismatch(e));
        };
        if lambda.backing_method.starts_with("lambda$") {
            lambda_body(lambda, ctx)
        } else {
            method_reference(lambda, ctx)
        }
    });

    registry.on(ElementType::VariableAssignment).then(|e, ctx| {
        let ElementKind::VariableAssignment { name, ty, value, .. } = &e.kind else {
            return Err(mismatch(e));
        };
        Ok(format!("{} {} = {}", ctx.type_name(ty), name, ctx.render(value)?))
    });
    registry.on(ElementType::FieldAssignment).then(|e, ctx| {
        let ElementKind::FieldAssignment { field, value } = &e.kind else {
            return Err(mismatch(e));
        };
        Ok(format!("{} = {}", field_access(field, ctx)?, ctx.render(value)?))
    });
    registry.on(ElementType::ArrayStore).then(|e, ctx| {
        let ElementKind::ArrayStore {
            array,
            index,
            value,
        } = &e.kind
        else {
            return Err(mismatch(e));
        };
        Ok(format!(
            "{}[{}] = {}",
            ctx.render_operand(array)?,
            ctx.render(index)?,
            ctx.render(value)?
        ))
    });
    registry.on(ElementType::Return).then(|_, _| Ok("return".to_string()));
    registry.on(ElementType::ReturnValue).then(|e, ctx| {
        let ElementKind::ReturnValue { value } = &e.kind else {
            return Err(mismatch(e));
        };
        Ok(format!("return {}", ctx.render(value)?))
    });
    registry.on(ElementType::Branch).then(|e, ctx| {
        let ElementKind::Branch {
            left,
            op,
            right,
            target_pc,
        } = &e.kind
        else {
            return Err(mismatch(e));
        };
        let (left, right) = match &left.kind {
            ElementKind::Compare { left: l, right: r } if right.as_int_constant() == Some(0) => {
                (ctx.render(l)?, ctx.render(r)?)
            }
            _ => (ctx.render(left)?, ctx.render(right)?),
        };
        Ok(format!("if ({} {} {}) goto {}", left, op.token(), right, target_pc))
    });
    registry.on(ElementType::Goto).then(|e, _| {
        let ElementKind::Goto { target_pc } = &e.kind else {
            return Err(mismatch(e));
        };
        Ok(format!("goto {}", target_pc))
    });
    registry.on(ElementType::Throw).then(|e, ctx| {
        let ElementKind::Throw { value } = &e.kind else {
            return Err(mismatch(e));
        };
        Ok(format!("throw {}", ctx.render(value)?))
    });

    registry.build()
}

fn mismatch(element: &Element) -> RenderError {
    RenderError::Unsupported(element.element_type())
}

fn constant(value: &ConstantValue, ctx: &RenderContext<'_>) -> String {
    match value {
        ConstantValue::Null => "null".into(),
        ConstantValue::Int(v) => v.to_string(),
        ConstantValue::Long(v) => format!("{}L", v),
        ConstantValue::Float(v) if v.is_nan() => "Float.NaN".into(),
        ConstantValue::Float(v) if v.is_infinite() => infinity("Float", v.is_sign_positive()),
        ConstantValue::Float(v) => format!("{:?}F", v),
        ConstantValue::Double(v) if v.is_nan() => "Double.NaN".into(),
        ConstantValue::Double(v) if v.is_infinite() => infinity("Double", v.is_sign_positive()),
        ConstantValue::Double(v) => format!("{:?}", v),
        ConstantValue::Boolean(v) => v.to_string(),
        ConstantValue::String(s) => quote(s),
        ConstantValue::Class(ty) => format!("{}.class", ctx.type_name(ty)),
    }
}

fn infinity(wrapper: &str, positive: bool) -> String {
    let sign = if positive { "POSITIVE" } else { "NEGATIVE" };
    format!("{}.{}_INFINITY", wrapper, sign)
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Whether a static member of `owner` can be written unqualified.
fn is_current_class(owner: &JvmType, ctx: &RenderContext<'_>) -> bool {
    ctx.current_class().is_some() && owner.internal_name() == ctx.current_class()
}

fn qualifier(
    target: Option<&Element>,
    owner: &JvmType,
    ctx: &RenderContext<'_>,
) -> RenderResult<Option<String>> {
    Ok(match target {
        Some(t) if ctx.is_this(t) && ctx.style().omit_this => None,
        Some(t) => Some(ctx.render_operand(t)?),
        None if is_current_class(owner, ctx) => None,
        None => Some(ctx.type_name(owner)),
    })
}

fn field_access(field: &FieldReference, ctx: &RenderContext<'_>) -> RenderResult<String> {
    Ok(match qualifier(field.target.as_deref(), &field.declaring_type, ctx)? {
        Some(q) => format!("{}.{}", q, field.name),
        None => field.name.clone(),
    })
}

fn method_call(call: &MethodCall, ctx: &RenderContext<'_>) -> RenderResult<String> {
    let args = ctx.render_arguments(&call.args)?;
    if call.is_constructor() {
        let target = call.target.as_deref();
        return Ok(match target {
            Some(t) if ctx.is_this(t) && is_current_class(&call.target_type, ctx) => {
                format!("this({})", args)
            }
            Some(t) if ctx.is_this(t) => format!("super({})", args),
            Some(t) => format!("{}.<init>({})", ctx.render_operand(t)?, args),
            None => format!("{}.<init>({})", ctx.type_name(&call.target_type), args),
        });
    }
    Ok(match qualifier(call.target.as_deref(), &call.target_type, ctx)? {
        Some(q) => format!("{}.{}({})", q, call.name, args),
        None => format!("{}({})", call.name, args),
    })
}

/// The value wrapped by a boxing call such as `Integer.valueOf(x)` or unwrapped by an
/// unboxing call such as `x.intValue()`.
fn boxed_value(call: &MethodCall) -> Option<&Element> {
    let primitive = unboxed_type(call.target_type.internal_name()?)?;
    match (&call.target, call.args.as_slice()) {
        (None, [value])
            if call.name == "valueOf" && call.signature.parameters.first() == Some(primitive) =>
        {
            Some(value)
        }
        (Some(target), []) if call.name == format!("{}Value", primitive.source_name(true)) => {
            Some(target)
        }
        _ => None,
    }
}

/// Inline a compiler accessor (`access$000`) as the expression it returns.
fn accessor(call: &MethodCall, ctx: &RenderContext<'_>) -> Option<String> {
    let method = ctx.resolve_method(&call.target_type, &call.name, &call.signature.to_descriptor())?;
    let body = ctx.decompile(method).ok()?;
    let [statement] = body.as_slice() else {
        return None;
    };
    let ElementKind::ReturnValue { value } = &statement.kind else {
        return None;
    };

    let mut bindings = Vec::new();
    let mut slot = if method.is_static() { 0 } else { 1 };
    for (arg, ty) in call.args.iter().zip(&call.signature.parameters) {
        bindings.push((slot, ctx.render_operand(arg).ok()?));
        slot += ty.category() as u16;
    }
    ctx.with_bindings(bindings).render(value).ok()
}

fn method_reference(lambda: &Lambda, ctx: &RenderContext<'_>) -> RenderResult<String> {
    let name = match lambda.reference_kind {
        ReferenceKind::NewInvokeSpecial => "new",
        _ => lambda.backing_method.as_str(),
    };
    let owner = match &lambda.receiver {
        Some(receiver) => ctx.render_operand(receiver)?,
        None => ctx.type_name(&lambda.declaring_class),
    };
    Ok(format!("{}::{}", owner, name))
}

/// Render a synthesized lambda body as `(params) -> expr` or `(params) -> { ... }`.
fn lambda_body(lambda: &Lambda, ctx: &RenderContext<'_>) -> RenderResult<String> {
    let descriptor = lambda.backing_signature.to_descriptor();
    let method = ctx
        .resolve_method(&lambda.declaring_class, &lambda.backing_method, &descriptor)
        .ok_or_else(|| {
            RenderError::UnresolvedMethod(format!(
                "{}#{}{}",
                ctx.type_name(&lambda.declaring_class),
                lambda.backing_method,
                descriptor
            ))
        })?;

    let parameters: Vec<&str> = method
        .parameter_variables()
        .into_iter()
        .skip(lambda.enclosed_variables.len())
        .map(|v| v.name.as_str())
        .collect();
    let head = format!("({}) ->", parameters.join(", "));

    let mut body = ctx.decompile(method)?;
    if matches!(body.last().map(|s| &s.kind), Some(ElementKind::Return)) {
        body.pop();
    }
    match body.as_slice() {
        [] => Ok(format!("{} {{}}", head)),
        [statement] => match &statement.kind {
            ElementKind::ReturnValue { value } => Ok(format!("{} {}", head, ctx.render(value)?)),
            _ if statement.is_expression() => Ok(format!("{} {}", head, ctx.render(statement)?)),
            _ => block(&head, &body, ctx),
        },
        _ => block(&head, &body, ctx),
    }
}

fn block(head: &str, body: &[Element], ctx: &RenderContext<'_>) -> RenderResult<String> {
    Ok(format!(
        "{} {{\n{}\n{}}}",
        head,
        ctx.indented().render_statements(body)?,
        ctx.indent()
    ))
}
