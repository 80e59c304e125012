use rstest::rstest;

use classfile_decompiler::constant_info::ConstantPool;
use classfile_decompiler::decompile::opcodes::*;
use classfile_decompiler::decompile::{
    CodeReader, DecompilationState, DecompileError, DecompileResult, Element, Registry,
};
use classfile_decompiler::Method;

// --- Helpers ---

/// Run `code` through the core primary handlers and return the resulting stack, bottom first.
fn stack_after(method: &Method) -> DecompileResult<Vec<Element>> {
    let registry = Registry::core();
    let mut state = DecompilationState::new(method, CodeReader::from_code(&method.code));
    while let Ok(code) = state.next_instruction() {
        let rule = registry
            .primary(&state, code)
            .unwrap_or_else(|| panic!("no handler for {}", mnemonic(code)));
        rule.apply(&mut state, code)?;
    }
    Ok(state
        .stacked_expressions()
        .iter()
        .map(|s| s.expression.clone())
        .collect())
}

fn method(code: &[u8]) -> Method {
    Method::builder("A", "m", "()V").code(code.to_vec()).build().unwrap()
}

fn i(value: i32) -> Element {
    Element::int(value)
}

fn l(value: i64) -> Element {
    Element::long(value)
}

// ---- Accepted forms ----

#[rstest]
#[case::dup(&[ICONST_1, DUP], vec![i(1), i(1)])]
#[case::dup_x1(&[ICONST_1, ICONST_2, DUP_X1], vec![i(2), i(1), i(2)])]
#[case::dup_x2_narrow(&[ICONST_1, ICONST_2, ICONST_3, DUP_X2], vec![i(3), i(1), i(2), i(3)])]
#[case::dup_x2_wide(&[LCONST_1, ICONST_2, DUP_X2], vec![i(2), l(1), i(2)])]
#[case::dup2_narrow(&[ICONST_1, ICONST_2, DUP2], vec![i(1), i(2), i(1), i(2)])]
#[case::dup2_wide(&[LCONST_1, DUP2], vec![l(1), l(1)])]
#[case::dup2_x1_narrow(&[ICONST_1, ICONST_2, ICONST_3, DUP2_X1], vec![i(2), i(3), i(1), i(2), i(3)])]
#[case::dup2_x1_wide(&[ICONST_1, LCONST_1, DUP2_X1], vec![l(1), i(1), l(1)])]
#[case::dup2_x2_narrow(
    &[ICONST_1, ICONST_2, ICONST_3, ICONST_4, DUP2_X2],
    vec![i(3), i(4), i(1), i(2), i(3), i(4)]
)]
#[case::dup2_x2_wide_top(&[ICONST_1, ICONST_2, LCONST_1, DUP2_X2], vec![l(1), i(1), i(2), l(1)])]
#[case::dup2_x2_wide_bottom(&[LCONST_1, ICONST_2, ICONST_3, DUP2_X2], vec![i(2), i(3), l(1), i(2), i(3)])]
#[case::dup2_x2_both_wide(&[DCONST_1, LCONST_0, DUP2_X2], vec![l(0), Element::double(1.0), l(0)])]
#[case::swap(&[ICONST_1, ICONST_2, SWAP], vec![i(2), i(1)])]
fn test_stack_forms(#[case] code: &[u8], #[case] expected: Vec<Element>) {
    assert_eq!(stack_after(&method(code)).unwrap(), expected);
}

// ---- Rejected shapes ----

#[rstest]
#[case::dup_of_wide(&[LCONST_1, DUP])]
#[case::dup_x1_over_wide(&[LCONST_1, ICONST_1, DUP_X1])]
#[case::dup_x2_of_wide(&[ICONST_1, LCONST_1, DUP_X2])]
#[case::dup_x2_of_wide_over_wide(&[LCONST_0, LCONST_1, DUP_X2])]
#[case::dup2_x1_narrow_over_wide(&[LCONST_1, ICONST_1, DUP2_X1])]
#[case::dup2_x1_wide_over_wide(&[LCONST_0, LCONST_1, DUP2_X1])]
#[case::dup2_x2_split_by_wide(&[ICONST_1, LCONST_1, ICONST_2, DUP2_X2])]
#[case::dup2_x2_narrow_over_wide(&[LCONST_1, ICONST_1, DUP2_X2])]
#[case::swap_with_wide(&[LCONST_1, ICONST_1, SWAP])]
#[case::pop2_of_narrow_over_wide(&[LCONST_1, ICONST_1, POP2])]
#[case::dup2_of_single(&[ICONST_1, DUP2])]
#[case::pop_of_wide(&[LCONST_1, POP])]
#[case::pop2_of_single(&[ICONST_1, POP2])]
fn test_rejected_forms(#[case] code: &[u8]) {
    assert!(matches!(
        stack_after(&method(code)),
        Err(DecompileError::Format(_))
    ));
}

#[test]
fn test_empty_stack_is_illegal_state() {
    assert!(matches!(
        stack_after(&method(&[IADD])),
        Err(DecompileError::IllegalState(_))
    ));
}

// ---- Pops reduce ----

#[test]
fn test_pop2_reduces_two_narrow_values() {
    let mut pool = ConstantPool::builder();
    let next = pool.method_ref("A", "next", "()I");
    let pool = pool.build();
    let [hi, lo] = next.to_be_bytes();

    let method = Method::builder("A", "m", "()V")
        .code(vec![INVOKESTATIC, hi, lo, INVOKESTATIC, hi, lo, POP2])
        .constant_pool(pool)
        .build()
        .unwrap();
    let registry = Registry::core();
    let mut state = DecompilationState::new(&method, CodeReader::from_code(&method.code));
    while let Ok(code) = state.next_instruction() {
        registry.primary(&state, code).unwrap().apply(&mut state, code).unwrap();
    }
    assert_eq!(state.stack_size(), 0);
    assert_eq!(state.statement_count(), 2);
    let pcs: Vec<u32> = state.stacked_statements().iter().map(|s| s.pc).collect();
    assert_eq!(pcs, vec![0, 3]);
}

#[test]
fn test_pop_of_pure_value_is_illegal() {
    assert!(matches!(
        stack_after(&method(&[ICONST_1, POP])),
        Err(DecompileError::IllegalState(_))
    ));
}
