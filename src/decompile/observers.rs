//! Ready-made progress observers for [`Decompiler::decompile`](super::Decompiler::decompile).

use log::{log_enabled, trace, Level};

use crate::decompile::element::Element;
use crate::decompile::state::DecompilationState;
use crate::render::{render, CodeStyle};

/// Observer that does nothing.
pub fn ignore() -> impl FnMut(&mut DecompilationState<'_>) {
    |_| {}
}

/// Log the stack and the statements after every instruction.
pub fn trace() -> impl FnMut(&mut DecompilationState<'_>) {
    |state| {
        if !log_enabled!(Level::Trace) {
            return;
        }
        let stack: Vec<String> = state
            .stacked_expressions()
            .iter()
            .map(|s| describe(&s.expression))
            .collect();
        let statements: Vec<String> = state.statements().map(describe).collect();
        trace!("pc {} stack {:?}", state.pc(), stack);
        trace!("pc {} statements {:?}", state.pc(), statements);
    }
}

/// Run `first`, then `second`.
pub fn chain<A, B>(mut first: A, mut second: B) -> impl FnMut(&mut DecompilationState<'_>)
where
    A: FnMut(&mut DecompilationState<'_>),
    B: FnMut(&mut DecompilationState<'_>),
{
    move |state| {
        first(&mut *state);
        second(&mut *state);
    }
}

fn describe(element: &Element) -> String {
    render(element, &CodeStyle::default()).unwrap_or_else(|_| format!("{:?}", element.kind))
}
