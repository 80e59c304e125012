//! Per-instruction handler table.
//!
//! Each of the 256 instruction codes owns three rule lists:
//!
//! * **primary**: the first rule whose predicate accepts the state handles the instruction,
//! * **advisory**: every matching rule, run before the primary one,
//! * **corrective**: every matching rule, run after the primary one.
//!
//! Lists are ordered by descending [`Priority`]; rules of equal priority keep the order they
//! were declared in. Registries are plain data and compose with [`Registry::merge`].

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::decompile::error::DecompileResult;
use crate::decompile::handlers;
use crate::decompile::state::DecompilationState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Lowest,
    Low,
    #[default]
    Default,
    High,
    Highest,
}

pub type Handler = Arc<dyn Fn(&mut DecompilationState<'_>, u8) -> DecompileResult<()> + Send + Sync>;
pub type Predicate = Arc<dyn Fn(&DecompilationState<'_>, u8) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Rule {
    priority: Priority,
    predicate: Option<Predicate>,
    handler: Handler,
}

impl Rule {
    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn matches(&self, state: &DecompilationState<'_>, code: u8) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(state, code))
    }

    pub fn apply(&self, state: &mut DecompilationState<'_>, code: u8) -> DecompileResult<()> {
        (self.handler)(state, code)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("priority", &self.priority)
            .field("conditional", &self.predicate.is_some())
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    primary: Vec<Rule>,
    advisory: Vec<Rule>,
    corrective: Vec<Rule>,
}

impl Slot {
    fn merged(&self, other: &Slot) -> Slot {
        Slot {
            primary: merge_rules(&self.primary, &other.primary),
            advisory: merge_rules(&self.advisory, &other.advisory),
            corrective: merge_rules(&self.corrective, &other.corrective),
        }
    }
}

fn merge_rules(ours: &[Rule], theirs: &[Rule]) -> Vec<Rule> {
    let mut rules: Vec<Rule> = ours.iter().chain(theirs).cloned().collect();
    sort_rules(&mut rules);
    rules
}

fn sort_rules(rules: &mut [Rule]) {
    // stable, so equal priorities keep declaration order
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
}

/// Immutable instruction handler table.
#[derive(Clone, Debug)]
pub struct Registry {
    slots: Vec<Slot>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            slots: vec![Slot::default(); 256],
        }
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The handlers for the whole instruction set.
    pub fn core() -> Registry {
        handlers::registry()
    }

    /// Union of both registries. On equal priority the receiver's rules come first.
    pub fn merge(&self, other: &Registry) -> Registry {
        Registry {
            slots: self
                .slots
                .iter()
                .zip(&other.slots)
                .map(|(ours, theirs)| ours.merged(theirs))
                .collect(),
        }
    }

    /// The first primary rule accepting the state.
    pub fn primary(&self, state: &DecompilationState<'_>, code: u8) -> Option<&Rule> {
        self.slots[code as usize]
            .primary
            .iter()
            .find(|rule| rule.matches(state, code))
    }

    /// Advisory rules for `code`, highest priority first. Predicates are left to the caller so
    /// that each one sees the state left behind by the rule before it.
    pub fn advisory(&self, code: u8) -> impl Iterator<Item = &Rule> + '_ {
        self.slots[code as usize].advisory.iter()
    }

    /// Corrective rules for `code`, highest priority first.
    pub fn corrective(&self, code: u8) -> impl Iterator<Item = &Rule> + '_ {
        self.slots[code as usize].corrective.iter()
    }

    pub fn has_primary(&self, code: u8) -> bool {
        !self.slots[code as usize].primary.is_empty()
    }
}

/// Instruction codes a rule can be declared for.
pub trait Codes {
    fn codes(self) -> Vec<u8>;
}

impl Codes for u8 {
    fn codes(self) -> Vec<u8> {
        vec![self]
    }
}

impl Codes for RangeInclusive<u8> {
    fn codes(self) -> Vec<u8> {
        self.collect()
    }
}

impl Codes for &[u8] {
    fn codes(self) -> Vec<u8> {
        self.to_vec()
    }
}

impl<const N: usize> Codes for [u8; N] {
    fn codes(self) -> Vec<u8> {
        self.to_vec()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Primary,
    Advisory,
    Corrective,
}

/// Collects rules for a [`Registry`].
///
/// ```
/// use classfile_decompiler::decompile::{opcodes, Priority, Registry};
///
/// let mut builder = Registry::builder();
/// builder.on(opcodes::NOP).then(|_, _| Ok(()));
/// builder
///     .after(opcodes::POP)
///     .with_priority(Priority::Low)
///     .when(|state, _| state.stack_size() == 0)
///     .then(|_, _| Ok(()));
/// let registry = builder.build();
/// assert!(registry.has_primary(opcodes::NOP));
/// ```
#[derive(Debug)]
pub struct RegistryBuilder {
    slots: Vec<Slot>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        RegistryBuilder {
            slots: vec![Slot::default(); 256],
        }
    }
}

impl RegistryBuilder {
    /// Declare the primary handler of the given codes.
    pub fn on(&mut self, codes: impl Codes) -> RuleBuilder<'_> {
        self.rule(codes, Stage::Primary)
    }

    /// Declare an advisory handler.
    pub fn before(&mut self, codes: impl Codes) -> RuleBuilder<'_> {
        self.rule(codes, Stage::Advisory)
    }

    /// Declare a corrective handler.
    pub fn after(&mut self, codes: impl Codes) -> RuleBuilder<'_> {
        self.rule(codes, Stage::Corrective)
    }

    pub fn build(mut self) -> Registry {
        for slot in &mut self.slots {
            sort_rules(&mut slot.primary);
            sort_rules(&mut slot.advisory);
            sort_rules(&mut slot.corrective);
        }
        Registry { slots: self.slots }
    }

    fn rule(&mut self, codes: impl Codes, stage: Stage) -> RuleBuilder<'_> {
        RuleBuilder {
            builder: self,
            codes: codes.codes(),
            stage,
            priority: Priority::Default,
            predicate: None,
        }
    }
}

pub struct RuleBuilder<'b> {
    builder: &'b mut RegistryBuilder,
    codes: Vec<u8>,
    stage: Stage,
    priority: Priority,
    predicate: Option<Predicate>,
}

impl RuleBuilder<'_> {
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&DecompilationState<'_>, u8) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn then<H>(self, handler: H)
    where
        H: Fn(&mut DecompilationState<'_>, u8) -> DecompileResult<()> + Send + Sync + 'static,
    {
        let rule = Rule {
            priority: self.priority,
            predicate: self.predicate,
            handler: Arc::new(handler),
        };
        for code in self.codes {
            let slot = &mut self.builder.slots[code as usize];
            let rules = match self.stage {
                Stage::Primary => &mut slot.primary,
                Stage::Advisory => &mut slot.advisory,
                Stage::Corrective => &mut slot.corrective,
            };
            rules.push(rule.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_model::Method;
    use crate::decompile::element::Element;
    use crate::decompile::reader::CodeReader;

    fn pushes(value: i32) -> impl Fn(&mut DecompilationState<'_>, u8) -> DecompileResult<()> + Send + Sync + 'static {
        move |state, _| {
            state.push(Element::int(value));
            Ok(())
        }
    }

    fn run_primary(registry: &Registry, code: u8, stack: &[i32]) -> Option<i32> {
        let method = Method::builder("A", "m", "()V").build().unwrap();
        let mut state = DecompilationState::new(&method, CodeReader::from_code(&[]));
        for value in stack {
            state.push(Element::int(*value));
        }
        let before = state.stack_size();
        registry.primary(&state, code)?.apply(&mut state, code).unwrap();
        assert_eq!(state.stack_size(), before + 1);
        state.peek().unwrap().as_int_constant()
    }

    #[test]
    fn test_primary_priority_and_predicate() {
        let mut builder = Registry::builder();
        builder.on(0x00).then(pushes(1));
        builder
            .on(0x00)
            .with_priority(Priority::High)
            .when(|state, _| state.stack_size() > 0)
            .then(pushes(2));
        let registry = builder.build();

        assert_eq!(run_primary(&registry, 0x00, &[]), Some(1));
        assert_eq!(run_primary(&registry, 0x00, &[7]), Some(2));
        assert_eq!(run_primary(&registry, 0x01, &[]), None);
    }

    #[test]
    fn test_merge_keeps_receiver_first() {
        let mut ours = Registry::builder();
        ours.on(0x10..=0x11).then(pushes(1));
        ours.after(0x10).with_priority(Priority::Low).then(pushes(10));
        let ours = ours.build();

        let mut theirs = Registry::builder();
        theirs.on(0x10).then(pushes(2));
        theirs.on(0x12).then(pushes(3));
        theirs.after(0x10).then(pushes(20));
        let theirs = theirs.build();

        let merged = ours.merge(&theirs);
        assert_eq!(run_primary(&merged, 0x10, &[]), Some(1));
        assert_eq!(run_primary(&merged, 0x11, &[]), Some(1));
        assert_eq!(run_primary(&merged, 0x12, &[]), Some(3));
        assert_eq!(run_primary(&theirs.merge(&ours), 0x10, &[]), Some(2));

        let priorities: Vec<Priority> = merged.corrective(0x10).map(|r| r.priority()).collect();
        assert_eq!(priorities, vec![Priority::Default, Priority::Low]);
        assert_eq!(merged.advisory(0x10).count(), 0);
    }
}
