//! Decompiling the code of a single source line.

use log::debug;

use crate::class_model::{ClassModel, Method};
use crate::decompile::element::Element;
use crate::decompile::engine::Decompiler;
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::observers;
use crate::decompile::reader::CodeReader;
use crate::decompile::state::DecompilationState;
use crate::descriptor::JvmType;

/// Decompiles the statements of one line of a method.
///
/// The run starts at the first instruction of the line. Once the reader passes the end of the
/// line, a lone value left on the stack (an expression continued on the next line, such as a
/// call chain) is followed until it has been consumed; the run then stops.
#[derive(Clone, Debug, Default)]
pub struct CodeLocationDecompiler {
    decompiler: Decompiler,
}

impl CodeLocationDecompiler {
    pub fn new(decompiler: Decompiler) -> Self {
        CodeLocationDecompiler { decompiler }
    }

    pub fn decompile_location(
        &self,
        class: &ClassModel,
        method_name: &str,
        line: u16,
    ) -> DecompileResult<Vec<Element>> {
        self.decompile_location_with(class, method_name, line, observers::ignore())
    }

    /// Like [`decompile_location`](Self::decompile_location), calling `observer` after the
    /// built-in line tracking on every instruction.
    pub fn decompile_location_with<F>(
        &self,
        class: &ClassModel,
        method_name: &str,
        line: u16,
        observer: F,
    ) -> DecompileResult<Vec<Element>>
    where
        F: FnMut(&mut DecompilationState<'_>),
    {
        let method = class
            .methods_named(method_name)
            .find(|m| m.has_line(line))
            .ok_or_else(|| {
                DecompileError::unresolved(format!(
                    "no method {}#{} covering line {}",
                    class.name, method_name, line
                ))
            })?;
        self.decompile_line(method, line, observer)
    }

    /// Decompile `line` of a known method.
    pub fn decompile_line<F>(&self, method: &Method, line: u16, observer: F) -> DecompileResult<Vec<Element>>
    where
        F: FnMut(&mut DecompilationState<'_>),
    {
        let range = method.code_range_for_line(line).ok_or_else(|| {
            DecompileError::unresolved(format!(
                "line {} is not part of {}#{}",
                line, method.class_name, method.name
            ))
        })?;
        debug!(
            "line {} of {}#{} spans pc {}..{}",
            line, method.class_name, method.name, range.start, range.end
        );

        let mut reader = CodeReader::from_code(&method.code);
        reader.skip(range.start)?;
        self.decompiler.decompile(
            method,
            reader,
            observers::chain(line_end(range.end), observer),
        )
    }
}

/// Stop once the code past `to` has consumed whatever the line left behind.
fn line_end(to: u32) -> impl FnMut(&mut DecompilationState<'_>) {
    let mut exit_stack_size: Option<usize> = None;
    let mut lingering: Option<Element> = None;

    move |state| {
        if state.is_aborted() || state.pc() < to {
            return;
        }
        let size = state.stack_size();
        let exit_size = *exit_stack_size.get_or_insert(size);

        if size == 0 {
            state.abort();
        } else if lingering.is_none() {
            let void = state.peek().map_or(false, |top| top.ty() == JvmType::Void);
            if size == 1 && void {
                // a void call has no value for the next line to pick up
                if state.reduce().is_ok() {
                    state.abort();
                }
            } else if size == 1 {
                lingering = state.peek().ok().cloned();
            }
        } else if size > exit_size || state.last_statement(0) == lingering.as_ref() {
            debug!("line value consumed at pc {}", state.pc());
            // the extra value belongs to the next line
            let _ = state.pop();
            state.abort();
        }
    }
}
