use crate::decompile::element::{Element, ElementKind, OperatorType, UnaryOperatorType};
use crate::decompile::opcodes::*;
use crate::decompile::registry::Registry;
use crate::descriptor::JvmType;

/// Binary arithmetic and logic instructions with their operator and result type.
static BINARY_OPERATORS: &[(u8, OperatorType, JvmType)] = &[
    (IADD, OperatorType::Plus, JvmType::Int),
    (LADD, OperatorType::Plus, JvmType::Long),
    (FADD, OperatorType::Plus, JvmType::Float),
    (DADD, OperatorType::Plus, JvmType::Double),
    (ISUB, OperatorType::Minus, JvmType::Int),
    (LSUB, OperatorType::Minus, JvmType::Long),
    (FSUB, OperatorType::Minus, JvmType::Float),
    (DSUB, OperatorType::Minus, JvmType::Double),
    (IMUL, OperatorType::Multiply, JvmType::Int),
    (LMUL, OperatorType::Multiply, JvmType::Long),
    (FMUL, OperatorType::Multiply, JvmType::Float),
    (DMUL, OperatorType::Multiply, JvmType::Double),
    (IDIV, OperatorType::Divide, JvmType::Int),
    (LDIV, OperatorType::Divide, JvmType::Long),
    (FDIV, OperatorType::Divide, JvmType::Float),
    (DDIV, OperatorType::Divide, JvmType::Double),
    (IREM, OperatorType::Modulo, JvmType::Int),
    (LREM, OperatorType::Modulo, JvmType::Long),
    (FREM, OperatorType::Modulo, JvmType::Float),
    (DREM, OperatorType::Modulo, JvmType::Double),
    (ISHL, OperatorType::LeftShift, JvmType::Int),
    (LSHL, OperatorType::LeftShift, JvmType::Long),
    (ISHR, OperatorType::RightShift, JvmType::Int),
    (LSHR, OperatorType::RightShift, JvmType::Long),
    (IUSHR, OperatorType::UnsignedRightShift, JvmType::Int),
    (LUSHR, OperatorType::UnsignedRightShift, JvmType::Long),
    (IAND, OperatorType::And, JvmType::Int),
    (LAND, OperatorType::And, JvmType::Long),
    (IOR, OperatorType::Or, JvmType::Int),
    (LOR, OperatorType::Or, JvmType::Long),
    (IXOR, OperatorType::Xor, JvmType::Int),
    (LXOR, OperatorType::Xor, JvmType::Long),
];

static CONVERSIONS: &[(u8, JvmType)] = &[
    (I2L, JvmType::Long),
    (I2F, JvmType::Float),
    (I2D, JvmType::Double),
    (L2I, JvmType::Int),
    (L2F, JvmType::Float),
    (L2D, JvmType::Double),
    (F2I, JvmType::Int),
    (F2L, JvmType::Long),
    (F2D, JvmType::Double),
    (D2I, JvmType::Int),
    (D2L, JvmType::Long),
    (D2F, JvmType::Float),
    (I2B, JvmType::Byte),
    (I2C, JvmType::Char),
    (I2S, JvmType::Short),
];

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    for (code, op, ty) in BINARY_OPERATORS {
        let (op, ty) = (*op, ty.clone());
        registry.on(*code).then(move |state, _| {
            let right = state.pop()?;
            let left = state.pop()?;
            state.push(Element::binary(left, op, right, ty.clone()));
            Ok(())
        });
    }

    registry.on(INEG..=DNEG).then(|state, _| {
        let operand = state.pop()?;
        let ty = operand.ty();
        state.push(Element::unary(operand, UnaryOperatorType::Neg, ty));
        Ok(())
    });

    for (code, ty) in CONVERSIONS {
        let ty = ty.clone();
        registry.on(*code).then(move |state, _| {
            let value = state.pop()?;
            state.push(Element::cast(value, ty.clone()));
            Ok(())
        });
    }

    registry.on(LCMP..=DCMPG).then(|state, _| {
        let right = state.pop()?;
        let left = state.pop()?;
        state.push(Element::new(ElementKind::Compare {
            left: Box::new(left),
            right: Box::new(right),
        }));
        Ok(())
    });

    registry.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_model::Method;
    use crate::decompile::reader::CodeReader;
    use crate::decompile::state::DecompilationState;

    #[test]
    fn test_operands_keep_push_order() {
        let method = Method::builder("A", "m", "()V").build().unwrap();
        let registry = registry();
        let mut state = DecompilationState::new(&method, CodeReader::from_code(&[]));
        state.push(Element::int(7));
        state.push(Element::int(2));
        registry.primary(&state, ISUB).unwrap().apply(&mut state, ISUB).unwrap();
        registry.primary(&state, I2L).unwrap().apply(&mut state, I2L).unwrap();
        assert_eq!(
            state.pop().unwrap(),
            Element::cast(
                Element::binary(Element::int(7), OperatorType::Minus, Element::int(2), JvmType::Int),
                JvmType::Long
            )
        );
    }
}
