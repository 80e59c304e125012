use log::{debug, trace};

use crate::class_model::Method;
use crate::decompile::element::{Affix, Element, ElementKind, ElementType};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::opcodes::mnemonic;
use crate::decompile::reader::CodeReader;
use crate::decompile::registry::Registry;
use crate::decompile::state::DecompilationState;

/// Runs the instruction loop over one method with a given [`Registry`].
#[derive(Clone, Debug)]
pub struct Decompiler {
    registry: Registry,
}

impl Default for Decompiler {
    fn default() -> Self {
        Decompiler::new(Registry::core())
    }
}

impl Decompiler {
    pub fn new(registry: Registry) -> Self {
        Decompiler { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Decompile from the reader's position until the code ends or `observer` aborts the run.
    ///
    /// The observer is called after every instruction and may inspect the state or call
    /// [`DecompilationState::abort`]. Whatever is left on the stack when the loop ends is
    /// reduced into statements.
    pub fn decompile<F>(
        &self,
        method: &Method,
        reader: CodeReader<'_>,
        mut observer: F,
    ) -> DecompileResult<Vec<Element>>
    where
        F: FnMut(&mut DecompilationState<'_>),
    {
        let mut state = DecompilationState::new(method, reader);
        debug!(
            "decompiling {}#{}{} from pc {}",
            method.class_name,
            method.name,
            method.descriptor,
            state.start_pc()
        );

        while !state.is_aborted() {
            let code = match state.next_instruction() {
                Ok(code) => code,
                Err(DecompileError::EndOfStream) => break,
                Err(e) => return Err(e),
            };
            trace!(
                "{:>5}: {} (stack depth {})",
                state.instruction_pc(),
                mnemonic(code),
                state.stack_size()
            );

            self.step(&mut state, code).map_err(|e| match e {
                DecompileError::EndOfStream => DecompileError::format(format!(
                    "truncated {} at pc {}",
                    mnemonic(code),
                    state.instruction_pc()
                )),
                e => e,
            })?;
            observer(&mut state);
        }

        state.reduce_all()?;
        let statements = state.into_statements();
        verify(&statements)?;
        Ok(statements)
    }

    fn step(&self, state: &mut DecompilationState<'_>, code: u8) -> DecompileResult<()> {
        for rule in self.registry.advisory(code) {
            if rule.matches(state, code) {
                rule.apply(state, code)?;
            }
        }

        match self.registry.primary(state, code) {
            Some(rule) => rule.apply(state, code)?,
            None => {
                return Err(DecompileError::format(format!(
                    "unsupported instruction {} at pc {}",
                    mnemonic(code),
                    state.instruction_pc()
                )))
            }
        }

        for rule in self.registry.corrective(code) {
            if rule.matches(state, code) {
                rule.apply(state, code)?;
            }
        }
        Ok(())
    }
}

/// Decompile with the core handlers.
pub fn decompile<F>(method: &Method, reader: CodeReader<'_>, observer: F) -> DecompileResult<Vec<Element>>
where
    F: FnMut(&mut DecompilationState<'_>),
{
    Decompiler::default().decompile(method, reader, observer)
}

/// Allocations must have met their constructor and every increment must have an affix.
fn verify(statements: &[Element]) -> DecompileResult<()> {
    let unfinished = |e: &Element| {
        e.element_type() == ElementType::Allocate
            || matches!(
                e.kind,
                ElementKind::Increment {
                    affix: Affix::Undefined,
                    ..
                }
            )
    };
    match statements.iter().find(|s| s.contains(&unfinished)) {
        Some(statement) => Err(DecompileError::illegal_state(format!(
            "{} at pc {:?} contains an unfinished allocation or increment",
            statement.element_type(),
            statement.meta.program_counter
        ))),
        None => Ok(()),
    }
}
