use std::collections::HashMap;

use crate::class_model::{ClassModel, Method};
use crate::decompile::{CodeReader, Decompiler, Element, ElementKind};
use crate::descriptor::JvmType;
use crate::render::registry::RenderRegistry;
use crate::render::{RenderError, RenderResult};

/// How names are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeStyle {
    /// `String` instead of `java.lang.String`.
    pub use_simple_class_names: bool,
    /// `name` instead of `this.name`.
    pub omit_this: bool,
}

impl Default for CodeStyle {
    fn default() -> Self {
        CodeStyle {
            use_simple_class_names: true,
            omit_this: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub indent: String,
    pub style: CodeStyle,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent: "    ".into(),
            style: CodeStyle::default(),
        }
    }
}

impl From<CodeStyle> for RenderConfig {
    fn from(style: CodeStyle) -> Self {
        RenderConfig {
            style,
            ..RenderConfig::default()
        }
    }
}

/// Looks up classes by internal name, e.g. to decompile the body of a lambda.
pub trait ClassResolver {
    fn resolve(&self, internal_name: &str) -> Option<&ClassModel>;
}

impl ClassResolver for ClassModel {
    fn resolve(&self, internal_name: &str) -> Option<&ClassModel> {
        (self.name == internal_name).then_some(self)
    }
}

impl ClassResolver for HashMap<String, ClassModel> {
    fn resolve(&self, internal_name: &str) -> Option<&ClassModel> {
        self.get(internal_name)
    }
}

impl ClassResolver for Vec<ClassModel> {
    fn resolve(&self, internal_name: &str) -> Option<&ClassModel> {
        self.iter().find(|c| c.name == internal_name)
    }
}

/// Renders elements through a [`RenderRegistry`].
#[derive(Clone, Debug)]
pub struct Renderer {
    registry: RenderRegistry,
    decompiler: Decompiler,
    config: RenderConfig,
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new(RenderConfig::default())
    }
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Renderer {
            registry: RenderRegistry::core(),
            decompiler: Decompiler::default(),
            config,
        }
    }

    pub fn with_registry(mut self, registry: RenderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_decompiler(mut self, decompiler: Decompiler) -> Self {
        self.decompiler = decompiler;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn context(&self) -> RenderContext<'_> {
        RenderContext {
            renderer: self,
            indent_level: 0,
            current_class: None,
            resolver: None,
            bindings: Vec::new(),
        }
    }

    pub fn render(&self, element: &Element) -> RenderResult<String> {
        self.context().render(element)
    }

    pub fn render_all(&self, elements: &[Element]) -> RenderResult<String> {
        self.context().render_statements(elements)
    }
}

/// State threaded through one rendering.
#[derive(Clone)]
pub struct RenderContext<'r> {
    renderer: &'r Renderer,
    indent_level: usize,
    current_class: Option<&'r str>,
    resolver: Option<&'r dyn ClassResolver>,
    /// Local slots rendered as other text, used when inlining compiler accessors.
    bindings: Vec<(u16, String)>,
}

impl<'r> RenderContext<'r> {
    /// Render inside `class_name`: its static members are written without qualification.
    pub fn in_class(mut self, class_name: &'r str) -> Self {
        self.current_class = Some(class_name);
        self
    }

    pub fn with_resolver(mut self, resolver: &'r dyn ClassResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn style(&self) -> CodeStyle {
        self.renderer.config.style
    }

    pub fn current_class(&self) -> Option<&'r str> {
        self.current_class
    }

    pub fn resolver(&self) -> Option<&'r dyn ClassResolver> {
        self.resolver
    }

    pub fn decompiler(&self) -> &'r Decompiler {
        &self.renderer.decompiler
    }

    /// One level deeper.
    pub fn indented(&self) -> Self {
        let mut nested = self.clone();
        nested.indent_level += 1;
        nested
    }

    pub fn indent(&self) -> String {
        self.renderer.config.indent.repeat(self.indent_level)
    }

    pub fn with_bindings(&self, bindings: Vec<(u16, String)>) -> Self {
        let mut bound = self.clone();
        bound.bindings = bindings;
        bound
    }

    pub fn binding(&self, index: u16) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(slot, _)| *slot == index)
            .map(|(_, text)| text.as_str())
    }

    pub fn type_name(&self, ty: &JvmType) -> String {
        ty.source_name(self.style().use_simple_class_names)
    }

    pub fn render(&self, element: &Element) -> RenderResult<String> {
        let rule = self
            .renderer
            .registry
            .rule_for(element, self)
            .ok_or(RenderError::Unsupported(element.element_type()))?;
        rule.apply(element, self)
    }

    /// Render a sub-expression, parenthesized unless it binds tighter than any operator.
    pub fn render_operand(&self, element: &Element) -> RenderResult<String> {
        let text = self.render(element)?;
        Ok(match element.kind {
            ElementKind::BinaryOperator { .. }
            | ElementKind::Cast { .. }
            | ElementKind::InstanceOf { .. }
            | ElementKind::Lambda(_) => format!("({})", text),
            _ => text,
        })
    }

    pub fn render_arguments(&self, args: &[Element]) -> RenderResult<String> {
        let args = args
            .iter()
            .map(|a| self.render(a))
            .collect::<RenderResult<Vec<_>>>()?;
        Ok(args.join(", "))
    }

    /// One statement per line, each terminated by `;`.
    pub fn render_statements(&self, statements: &[Element]) -> RenderResult<String> {
        let lines = statements
            .iter()
            .map(|s| Ok(format!("{}{};", self.indent(), self.render(s)?)))
            .collect::<RenderResult<Vec<_>>>()?;
        Ok(lines.join("\n"))
    }

    /// Find a method of another class through the resolver.
    pub fn resolve_method(&self, class: &JvmType, name: &str, descriptor: &str) -> Option<&'r Method> {
        self.resolver?
            .resolve(class.internal_name()?)?
            .method(name, descriptor)
    }

    /// Decompile the whole body of `method`.
    pub fn decompile(&self, method: &Method) -> RenderResult<Vec<Element>> {
        Ok(self
            .decompiler()
            .decompile(method, CodeReader::from_code(&method.code), |_| {})?)
    }

    pub fn is_this(&self, element: &Element) -> bool {
        element.as_variable().map_or(false, |v| v.index == 0 && v.name == "this")
    }
}
