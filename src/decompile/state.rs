//! The symbolic operand stack and the statements reconstructed so far.

use log::debug;

use crate::class_model::Method;
use crate::constant_info::ConstantPool;
use crate::decompile::element::{Affix, Element, ElementKind, LocalVariableReference, Metadata};
use crate::decompile::error::{DecompileError, DecompileResult};
use crate::decompile::line_numbers::LineNumberCounter;
use crate::decompile::reader::CodeReader;

/// An expression on the operand stack, with the pc and version at which it was pushed.
#[derive(Clone, Debug, PartialEq)]
pub struct StackedExpression {
    pub expression: Element,
    pub pc: u32,
    pub version: u64,
}

/// A finalized statement. Statements are kept ordered by `(pc, version)`.
#[derive(Clone, Debug, PartialEq)]
pub struct StackedStatement {
    pub statement: Element,
    pub pc: u32,
    pub version: u64,
}

/// Everything one decompilation run works on: the method, its code reader, the operand stack
/// and the statement list.
///
/// Not meant to be shared between threads; every run owns its own state.
#[derive(Debug)]
pub struct DecompilationState<'a> {
    method: &'a Method,
    reader: CodeReader<'a>,
    line_numbers: LineNumberCounter,
    stack: Vec<StackedExpression>,
    statements: Vec<StackedStatement>,
    version: u64,
    start_pc: u32,
    instruction_pc: u32,
    aborted: bool,
}

impl<'a> DecompilationState<'a> {
    /// Start decompiling at the reader's current position.
    pub fn new(method: &'a Method, reader: CodeReader<'a>) -> Self {
        let start_pc = reader.pc();
        DecompilationState {
            method,
            line_numbers: LineNumberCounter::new(&method.line_numbers),
            reader,
            stack: Vec::new(),
            statements: Vec::new(),
            version: 0,
            start_pc,
            instruction_pc: start_pc,
            aborted: false,
        }
    }

    pub fn method(&self) -> &'a Method {
        self.method
    }

    pub fn constant_pool(&self) -> &'a ConstantPool {
        &self.method.constant_pool
    }

    pub fn reader(&self) -> &CodeReader<'a> {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut CodeReader<'a> {
        &mut self.reader
    }

    /// Read the next instruction code and remember its pc.
    pub fn next_instruction(&mut self) -> DecompileResult<u8> {
        let pc = self.reader.pc();
        let code = self.reader.next_instruction()?;
        self.instruction_pc = pc;
        Ok(code)
    }

    /// Position of the next unread byte.
    pub fn pc(&self) -> u32 {
        self.reader.pc()
    }

    /// Pc of the instruction being handled.
    pub fn instruction_pc(&self) -> u32 {
        self.instruction_pc
    }

    /// Pc the run started at.
    pub fn start_pc(&self) -> u32 {
        self.start_pc
    }

    pub fn line_number(&self) -> Option<u16> {
        self.line_numbers.line_at(self.instruction_pc)
    }

    /// The local variable in slot `index` at `pc`.
    pub fn local_variable(&self, index: u16, pc: u32) -> DecompileResult<LocalVariableReference> {
        let variable = self.method.local_variable(index, pc).ok_or_else(|| {
            DecompileError::unresolved(format!(
                "no local variable in slot {} at pc {} of {}#{}",
                index, pc, self.method.class_name, self.method.name
            ))
        })?;
        Ok(LocalVariableReference {
            name: variable.name.clone(),
            ty: variable.ty.clone(),
            index,
        })
    }

    pub fn push(&mut self, expression: Element) {
        let expression = self.stamp(expression);
        let version = self.next_version();
        self.stack.push(StackedExpression {
            expression,
            pc: self.instruction_pc,
            version,
        });
    }

    pub fn pop(&mut self) -> DecompileResult<Element> {
        self.pop_stacked().map(|s| s.expression)
    }

    pub fn pop_stacked(&mut self) -> DecompileResult<StackedExpression> {
        self.stack
            .pop()
            .ok_or_else(|| DecompileError::illegal_state("pop from an empty stack"))
    }

    /// Pop `count` expressions, returned in push order.
    pub fn pop_many(&mut self, count: usize) -> DecompileResult<Vec<Element>> {
        if count > self.stack.len() {
            return Err(DecompileError::illegal_state(format!(
                "cannot pop {} expressions from a stack of {}",
                count,
                self.stack.len()
            )));
        }
        let at = self.stack.len() - count;
        Ok(self.stack.drain(at..).map(|s| s.expression).collect())
    }

    pub fn peek(&self) -> DecompileResult<&Element> {
        self.stack
            .last()
            .map(|s| &s.expression)
            .ok_or_else(|| DecompileError::illegal_state("peek at an empty stack"))
    }

    /// The expression `depth` entries below the top, `0` being the top.
    pub fn peek_at(&self, depth: usize) -> Option<&Element> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .map(|i| &self.stack[i].expression)
    }

    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    pub fn stacked_expressions(&self) -> &[StackedExpression] {
        &self.stack
    }

    /// Insert below the top of the stack: an `offset` of `0` pushes, `-1` puts the expression
    /// just under the current top.
    pub fn insert(&mut self, offset: isize, expression: Element) -> DecompileResult<()> {
        let index = self.stack.len() as isize + offset;
        if offset > 0 || index < 0 {
            return Err(DecompileError::illegal_state(format!(
                "cannot insert at offset {} into a stack of {}",
                offset,
                self.stack.len()
            )));
        }
        let expression = self.stamp(expression);
        let version = self.next_version();
        self.stack.insert(
            index as usize,
            StackedExpression {
                expression,
                pc: self.instruction_pc,
                version,
            },
        );
        Ok(())
    }

    /// Move the top of the stack into the statement list, at the place its pc belongs.
    /// Returns `false` if the stack was empty.
    pub fn reduce(&mut self) -> DecompileResult<bool> {
        let Some(top) = self.stack.last() else {
            return Ok(false);
        };
        if !top.expression.is_statement() {
            return Err(DecompileError::illegal_state(format!(
                "{} cannot be reduced to a statement",
                top.expression.element_type()
            )));
        }
        let StackedExpression {
            expression,
            pc,
            version,
        } = self.pop_stacked()?;

        let statement = match expression.kind {
            ElementKind::Increment {
                variable,
                delta,
                ty,
                affix: Affix::Undefined,
            } => Element::new(ElementKind::Increment {
                variable,
                delta,
                ty,
                affix: Affix::Postfix,
            })
            .with_meta(expression.meta),
            kind => Element {
                kind,
                meta: expression.meta,
            },
        };

        let at = self
            .statements
            .partition_point(|s| (s.pc, s.version) <= (pc, version));
        self.statements.insert(
            at,
            StackedStatement {
                statement,
                pc,
                version,
            },
        );
        Ok(true)
    }

    /// Reduce until the stack is empty. Returns `false` if it already was.
    pub fn reduce_all(&mut self) -> DecompileResult<bool> {
        let mut reduced = false;
        while self.reduce()? {
            reduced = true;
        }
        Ok(reduced)
    }

    /// Append a statement.
    pub fn enlist(&mut self, statement: Element) {
        let statement = self.stamp(statement);
        let version = self.next_version();
        self.statements.push(StackedStatement {
            statement,
            pc: self.instruction_pc,
            version,
        });
    }

    pub fn statements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.statements.iter().map(|s| &s.statement)
    }

    pub fn stacked_statements(&self) -> &[StackedStatement] {
        &self.statements
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// The statement `depth` entries before the last one, `0` being the last.
    pub fn last_statement(&self, depth: usize) -> Option<&Element> {
        self.statements
            .len()
            .checked_sub(depth + 1)
            .map(|i| &self.statements[i].statement)
    }

    pub fn remove_statement(&mut self, index: usize) -> DecompileResult<Element> {
        if index >= self.statements.len() {
            return Err(DecompileError::illegal_state(format!(
                "no statement at index {} of {}",
                index,
                self.statements.len()
            )));
        }
        Ok(self.statements.remove(index).statement)
    }

    pub fn remove_last_statement(&mut self) -> DecompileResult<Element> {
        match self.statements.len() {
            0 => Err(DecompileError::illegal_state("no statement to remove")),
            len => self.remove_statement(len - 1),
        }
    }

    /// Swap in a rewritten statement, keeping its position.
    pub fn replace_statement(&mut self, index: usize, statement: Element) -> DecompileResult<()> {
        let len = self.statements.len();
        let slot = self.statements.get_mut(index).ok_or_else(|| {
            DecompileError::illegal_state(format!("no statement at index {} of {}", index, len))
        })?;
        let meta = slot.statement.meta;
        slot.statement = statement.with_meta(meta);
        Ok(())
    }

    /// Whether the stack, read from the top down, holds values of the given computational
    /// categories. A stack shorter than `categories` never matches.
    pub fn is_stack_compliant_with_computational_categories(&self, categories: &[u8]) -> bool {
        categories.len() <= self.stack.len()
            && categories
                .iter()
                .zip(self.stack.iter().rev())
                .all(|(category, stacked)| stacked.expression.ty().category() == *category)
    }

    /// Stop the run after the current instruction.
    pub fn abort(&mut self) {
        if !self.aborted {
            debug!("aborting decompilation at pc {}", self.reader.pc());
        }
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn into_statements(self) -> Vec<Element> {
        self.statements.into_iter().map(|s| s.statement).collect()
    }

    fn stamp(&self, element: Element) -> Element {
        if element.meta.is_stamped() {
            return element;
        }
        element.with_meta(Metadata {
            line_number: self.line_number(),
            program_counter: Some(self.instruction_pc),
        })
    }

    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}
