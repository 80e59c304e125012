use crate::constant_info::Literal;
use crate::decompile::element::{ConstantValue, Element};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::opcodes::*;
use crate::decompile::registry::Registry;
use crate::decompile::state::DecompilationState;
use crate::descriptor::{JvmType, JAVA_LANG_CLASS};

pub(super) fn registry() -> Registry {
    let mut registry = Registry::builder();

    registry.on(NOP).then(|_, _| Ok(()));
    registry.on(ACONST_NULL).then(|state, _| {
        state.push(Element::null());
        Ok(())
    });
    registry.on(ICONST_M1..=ICONST_5).then(|state, code| {
        state.push(Element::int(code as i32 - ICONST_0 as i32));
        Ok(())
    });
    registry.on(LCONST_0..=LCONST_1).then(|state, code| {
        state.push(Element::long((code - LCONST_0) as i64));
        Ok(())
    });
    registry.on(FCONST_0..=FCONST_2).then(|state, code| {
        state.push(Element::float((code - FCONST_0) as f32));
        Ok(())
    });
    registry.on(DCONST_0..=DCONST_1).then(|state, code| {
        state.push(Element::double((code - DCONST_0) as f64));
        Ok(())
    });
    registry.on(BIPUSH).then(|state, _| {
        let value = state.reader_mut().next_signed_byte()?;
        state.push(Element::int(value as i32));
        Ok(())
    });
    registry.on(SIPUSH).then(|state, _| {
        let value = state.reader_mut().next_signed_short()?;
        state.push(Element::int(value as i32));
        Ok(())
    });
    registry.on(LDC).then(|state, _| {
        let index = state.reader_mut().next_byte()? as u16;
        load_constant(state, index, 1)
    });
    registry.on(LDC_W).then(|state, _| {
        let index = state.reader_mut().next_unsigned_short()?;
        load_constant(state, index, 1)
    });
    registry.on(LDC2_W).then(|state, _| {
        let index = state.reader_mut().next_unsigned_short()?;
        load_constant(state, index, 2)
    });

    registry.build()
}

fn load_constant(state: &mut DecompilationState<'_>, index: u16, category: u8) -> DecompileResult<()> {
    let literal = state.constant_pool().literal(index)?;
    if literal.category() != category {
        return Err(DecompileError::format(format!(
            "constant {} at index {} has category {}, expected {}",
            literal,
            index,
            literal.category(),
            category
        )));
    }

    let element = match literal {
        Literal::Int(v) => Element::int(v),
        Literal::Float(v) => Element::float(v),
        Literal::Long(v) => Element::long(v),
        Literal::Double(v) => Element::double(v),
        Literal::String(s) => Element::string(&s),
        Literal::Class(name) => {
            let ty = JvmType::from_class_name(&name)
                .ok_or_else(|| DecompileError::format(format!("malformed class name {:?}", name)))?;
            Element::constant(ConstantValue::Class(ty), JvmType::reference(JAVA_LANG_CLASS))
        }
    };
    state.push(element);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_model::Method;
    use crate::constant_info::ConstantPool;
    use crate::decompile::reader::CodeReader;

    fn run(code: &[u8], pool: ConstantPool) -> DecompileResult<Vec<Element>> {
        let method = Method::builder("A", "m", "()V")
            .constant_pool(pool)
            .build()
            .unwrap();
        let registry = registry();
        let mut state = DecompilationState::new(&method, CodeReader::from_code(code));
        while let Ok(code) = state.next_instruction() {
            registry
                .primary(&state, code)
                .expect("handled")
                .apply(&mut state, code)?;
        }
        Ok(state.stacked_expressions().iter().map(|s| s.expression.clone()).collect())
    }

    #[test]
    fn test_direct_pushes() {
        let stack = run(
            &[ICONST_M1, ICONST_5, BIPUSH, 0x9c, SIPUSH, 0x01, 0x00, LCONST_1, FCONST_2, DCONST_0, ACONST_NULL],
            ConstantPool::default(),
        )
        .unwrap();
        assert_eq!(
            stack,
            vec![
                Element::int(-1),
                Element::int(5),
                Element::int(-100),
                Element::int(256),
                Element::long(1),
                Element::float(2.0),
                Element::double(0.0),
                Element::null(),
            ]
        );
    }

    #[test]
    fn test_pool_constants() {
        let mut pool = ConstantPool::builder();
        let text = pool.string("hi");
        let big = pool.long(1 << 40);
        let class = pool.class("java/util/List");
        let pool = pool.build();

        let stack = run(&[LDC, text as u8, LDC2_W, 0, big as u8, LDC_W, 0, class as u8], pool).unwrap();
        assert_eq!(stack[0], Element::string("hi"));
        assert_eq!(stack[1], Element::long(1 << 40));
        assert_eq!(
            stack[2],
            Element::constant(
                ConstantValue::Class(JvmType::reference("java/util/List")),
                JvmType::reference(JAVA_LANG_CLASS)
            )
        );
    }

    #[test]
    fn test_wrong_width_is_format_error() {
        let mut pool = ConstantPool::builder();
        let big = pool.double(2.5);
        let pool = pool.build();
        assert!(matches!(run(&[LDC, big as u8], pool), Err(DecompileError::Format(_))));
    }
}
