use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::decompile::{Element, ElementType, Priority};
use crate::render::context::RenderContext;
use crate::render::{rules, RenderResult};

pub type RenderFn = Arc<dyn Fn(&Element, &RenderContext<'_>) -> RenderResult<String> + Send + Sync>;
pub type RenderPredicate = Arc<dyn Fn(&Element, &RenderContext<'_>) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct RenderRule {
    priority: Priority,
    predicate: Option<RenderPredicate>,
    render: RenderFn,
}

impl RenderRule {
    pub fn matches(&self, element: &Element, context: &RenderContext<'_>) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(element, context))
    }

    pub fn apply(&self, element: &Element, context: &RenderContext<'_>) -> RenderResult<String> {
        (self.render)(element, context)
    }
}

impl fmt::Debug for RenderRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderRule")
            .field("priority", &self.priority)
            .field("conditional", &self.predicate.is_some())
            .finish()
    }
}

/// Rendering rules per element type, highest priority first.
#[derive(Clone, Debug, Default)]
pub struct RenderRegistry {
    rules: HashMap<ElementType, Vec<RenderRule>>,
}

impl RenderRegistry {
    pub fn builder() -> RenderRegistryBuilder {
        RenderRegistryBuilder::default()
    }

    /// Rules for every element type.
    pub fn core() -> RenderRegistry {
        rules::registry()
    }

    /// Union of both registries. On equal priority the receiver's rules come first.
    pub fn merge(&self, other: &RenderRegistry) -> RenderRegistry {
        let mut rules = self.rules.clone();
        for (element_type, theirs) in &other.rules {
            let merged = rules.entry(*element_type).or_default();
            merged.extend(theirs.iter().cloned());
            merged.sort_by(|a, b| b.priority.cmp(&a.priority));
        }
        RenderRegistry { rules }
    }

    pub fn rule_for(&self, element: &Element, context: &RenderContext<'_>) -> Option<&RenderRule> {
        self.rules
            .get(&element.element_type())?
            .iter()
            .find(|rule| rule.matches(element, context))
    }
}

#[derive(Debug, Default)]
pub struct RenderRegistryBuilder {
    rules: HashMap<ElementType, Vec<RenderRule>>,
}

impl RenderRegistryBuilder {
    pub fn on(&mut self, element_type: ElementType) -> RenderRuleBuilder<'_> {
        RenderRuleBuilder {
            builder: self,
            element_type,
            priority: Priority::Default,
            predicate: None,
        }
    }

    pub fn build(mut self) -> RenderRegistry {
        for rules in self.rules.values_mut() {
            rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        }
        RenderRegistry { rules: self.rules }
    }
}

pub struct RenderRuleBuilder<'b> {
    builder: &'b mut RenderRegistryBuilder,
    element_type: ElementType,
    priority: Priority,
    predicate: Option<RenderPredicate>,
}

impl RenderRuleBuilder<'_> {
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Element, &RenderContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn then<R>(self, render: R)
    where
        R: Fn(&Element, &RenderContext<'_>) -> RenderResult<String> + Send + Sync + 'static,
    {
        self.builder
            .rules
            .entry(self.element_type)
            .or_default()
            .push(RenderRule {
                priority: self.priority,
                predicate: self.predicate,
                render: Arc::new(render),
            });
    }
}
