//! Core template types and configuration
//!
//! This module contains the main [`Template`] type, the [`Partial`] values
//! that can be referenced from templates, the [`PartialRegistry`] holding
//! them, and [`TemplateConfig`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use block_template::{Partial, Partials, Template};
//! use serde_json::json;
//!
//! let mut partials = Partials::new();
//! partials.insert("greeting".into(), Partial::function(|p: &serde_json::Value| {
//!     format!("Hello {}", p["name"].as_str().unwrap_or("stranger"))
//! }));
//!
//! let template = Template::new("<p>%{@greeting}</p>", partials)?;
//! assert_eq!(template.render(&json!({"name": "John"}))?, "<p>Hello John</p>");
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use crate::block::Block;
use crate::compiler::{Compiler, DeferredBlock};
use crate::error::{Error, Result};
use crate::renderer::Renderer;

/// Named partials supplied when creating a template
pub type Partials = IndexMap<String, Partial>;

/// A named entry of the partial registry, referenced as `@name`
#[derive(Clone)]
pub enum Partial {
    /// A literal value, substituted like a parameter
    Value(Value),
    /// Called with the render parameters; its result is resolved again
    Function(Rc<dyn Fn(&Value) -> Partial>),
    /// Decides whether a cached block may reuse its output, given the
    /// current and the previous parameters
    Validator(Rc<dyn Fn(&Value, &Value) -> bool>),
    /// A node rendered with the current parameters
    Block(Rc<dyn Block>),
    /// A block extracted from template content, built on first use
    Deferred(Rc<DeferredBlock>),
}

impl Partial {
    pub fn value<V: Into<Value>>(value: V) -> Self {
        Partial::Value(value.into())
    }

    pub fn function<F, R>(function: F) -> Self
    where
        F: Fn(&Value) -> R + 'static,
        R: Into<Partial>,
    {
        Partial::Function(Rc::new(move |params: &Value| function(params).into()))
    }

    pub fn validator<F>(validator: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + 'static,
    {
        Partial::Validator(Rc::new(validator))
    }

    pub fn block<B: Block + 'static>(block: B) -> Self {
        Partial::Block(Rc::new(block))
    }

    /// Short description of the variant, for logs and debug output
    pub fn kind(&self) -> &'static str {
        match self {
            Partial::Value(_) => "value",
            Partial::Function(_) => "function",
            Partial::Validator(_) => "validator",
            Partial::Block(_) => "block",
            Partial::Deferred(_) => "deferred block",
        }
    }
}

impl fmt::Debug for Partial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partial::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Partial::Deferred(block) => f.debug_tuple("Deferred").field(block).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

impl From<Rc<dyn Block>> for Partial {
    fn from(block: Rc<dyn Block>) -> Self {
        Partial::Block(block)
    }
}

macro_rules! impl_partial_from_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Partial {
                fn from(value: $t) -> Self {
                    Partial::Value(value.into())
                }
            }
        )*
    };
}

impl_partial_from_value!(Value, String, &str, bool, i32, i64, u32, u64, usize, f64);

/// Shared registry of partials
///
/// A registry is either owned by a single template or created by the
/// caller and shared by several templates through an `Rc`. Compilation adds
/// the generated `block_<n>` entries and, on first render, the
/// `cached_<name>` slots of cached blocks. Generated names come from a
/// counter owned by the registry, so templates sharing it never collide.
#[derive(Default)]
pub struct PartialRegistry {
    entries: RefCell<Partials>,
    next_block: Cell<usize>,
}

impl PartialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_partials(partials: Partials) -> Self {
        Self {
            entries: RefCell::new(partials),
            next_block: Cell::new(0),
        }
    }

    /// Insert or replace a partial, returning the previous entry
    pub fn insert<S, P>(&self, name: S, partial: P) -> Option<Partial>
    where
        S: Into<String>,
        P: Into<Partial>,
    {
        self.entries.borrow_mut().insert(name.into(), partial.into())
    }

    /// A clone of the named entry
    pub fn get(&self, name: &str) -> Option<Partial> {
        self.entries.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Partial> {
        self.entries.borrow_mut().shift_remove(name)
    }

    /// Entry names in insertion order
    pub fn names(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub(crate) fn next_block_name(&self) -> String {
        let id = self.next_block.get();
        self.next_block.set(id + 1);
        format!("block_{}", id)
    }
}

impl fmt::Debug for PartialRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialRegistry")
            .field("entries", &self.names())
            .field("next_block", &self.next_block.get())
            .finish()
    }
}

/// How a template reaches its registry
///
/// Templates created by callers keep the registry alive. Templates
/// compiled from block content live inside that same registry and only
/// hold a weak handle, so no reference cycle forms.
#[derive(Clone)]
pub(crate) enum RegistryRef {
    Owned(Rc<PartialRegistry>),
    Parent(Weak<PartialRegistry>),
}

impl RegistryRef {
    pub(crate) fn get(&self) -> Result<Rc<PartialRegistry>> {
        match self {
            RegistryRef::Owned(registry) => Ok(Rc::clone(registry)),
            RegistryRef::Parent(registry) => upgrade(registry),
        }
    }
}

pub(crate) fn upgrade(registry: &Weak<PartialRegistry>) -> Result<Rc<PartialRegistry>> {
    registry
        .upgrade()
        .ok_or_else(|| Error::render_static("Partial registry was dropped before rendering"))
}

/// A compiled template
///
/// Construction extracts every block region from the content once; each
/// call to [`Template::render`] then substitutes the remaining inline tags.
/// A template can be rendered any number of times.
///
/// # Tag Syntax
///
/// | Tag                        | Meaning                                   |
/// |----------------------------|-------------------------------------------|
/// | `${path}` / `${path\|f}`   | escaped value, optionally filtered        |
/// | `%{path}` / `%{path\|f}`   | raw value, optionally filtered            |
/// | `%{@name}`                 | partial from the registry                 |
/// | `#{path[:alias]}…#{/path}` | repeat for each element of an array       |
/// | `?{[!]path}…?{/path}`      | conditional, with optional `?{!path}` else |
/// | `_{name:N}…_{/name}`       | indent every line by N spaces             |
/// | `>{name:N}…>{/name}`       | indent every line by N tabs               |
/// | `={name[:valid]}…={/name}` | cache the rendered content by name        |
///
/// # Thread Safety
///
/// Templates are single-threaded: the registry and cached blocks use
/// interior mutability without locking.
pub struct Template {
    pub(crate) content: String,
    pub(crate) registry: RegistryRef,
    pub(crate) config: Rc<TemplateConfig>,
}

impl Template {
    /// Compile `content` with its own registry holding `partials`
    pub fn new<S: Into<String>>(content: S, partials: Partials) -> Result<Self> {
        Self::with_config(content, partials, TemplateConfig::default())
    }

    /// Compile `content` with custom configuration
    pub fn with_config<S: Into<String>>(
        content: S,
        partials: Partials,
        config: TemplateConfig,
    ) -> Result<Self> {
        let registry = Rc::new(PartialRegistry::from_partials(partials));
        Self::compile(content.into(), RegistryRef::Owned(registry), Rc::new(config))
    }

    /// Compile `content` against a registry shared with the caller
    pub fn with_registry<S: Into<String>>(content: S, registry: Rc<PartialRegistry>) -> Result<Self> {
        Self::with_registry_and_config(content, registry, TemplateConfig::default())
    }

    /// Compile `content` against a shared registry with custom configuration
    pub fn with_registry_and_config<S: Into<String>>(
        content: S,
        registry: Rc<PartialRegistry>,
        config: TemplateConfig,
    ) -> Result<Self> {
        Self::compile(content.into(), RegistryRef::Owned(registry), Rc::new(config))
    }

    /// Compile the contents of a file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Self::from_file_with_partials(path, Partials::new())
    }

    /// Compile the contents of a file with partials
    pub fn from_file_with_partials<P: AsRef<std::path::Path>>(
        path: P,
        partials: Partials,
    ) -> Result<Self> {
        let content = read_template_file(path.as_ref())?;
        Self::new(content, partials)
    }

    /// Compile block content into a template sharing its parent's registry
    pub(crate) fn nested(
        content: &str,
        registry: Weak<PartialRegistry>,
        config: Rc<TemplateConfig>,
    ) -> Result<Self> {
        Self::compile(content.to_string(), RegistryRef::Parent(registry), config)
    }

    fn compile(mut content: String, registry: RegistryRef, config: Rc<TemplateConfig>) -> Result<Self> {
        let shared = registry.get()?;
        let extracted = Compiler::extract(&mut content, &shared, &config)?;
        if extracted > 0 {
            log::debug!("extracted {} block(s) from template", extracted);
        }
        Ok(Self {
            content,
            registry,
            config,
        })
    }

    /// Render the template with the given parameters
    pub fn render(&self, params: &Value) -> Result<String> {
        let registry = self.registry.get()?;
        Renderer::new(&self.content, &registry, &self.config).render(params)
    }

    /// Render the template with any serializable data
    pub fn render_data<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        let params = serde_json::to_value(data)?;
        self.render(&params)
    }

    /// Content left after block extraction
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The registry this template resolves partials against
    pub fn registry(&self) -> Option<Rc<PartialRegistry>> {
        self.registry.get().ok()
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }
}

impl Block for Template {
    fn render(&self, params: &Value) -> Result<String> {
        Template::render(self, params)
    }
}

impl FromStr for Template {
    type Err = Error;

    fn from_str(content: &str) -> Result<Self> {
        Self::new(content, Partials::new())
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("content", &self.content)
            .field("config", &self.config)
            .finish()
    }
}

pub(crate) fn read_template_file(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::io(format!(
            "Failed to read template file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Rendering options
///
/// Nested templates compiled from block content inherit the configuration
/// of the template that contains them.
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    pub(crate) strict_paths: bool,
    pub(crate) undefined_text: Cow<'static, str>,
    pub(crate) max_passes: usize,
}

impl TemplateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the render when a placeholder path does not resolve
    pub fn with_strict_paths(mut self, enabled: bool) -> Self {
        self.strict_paths = enabled;
        self
    }

    /// Text substituted for absent and null values
    pub fn with_undefined_text<S: Into<Cow<'static, str>>>(mut self, text: S) -> Self {
        self.undefined_text = text.into();
        self
    }

    /// Upper bound on substitution passes in one render
    ///
    /// Every pass replaces one distinct tag, so the bound only matters for
    /// values that keep producing new tags.
    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes;
        self
    }

    /// Configuration that rejects unresolved placeholder paths
    pub fn strict() -> Self {
        Self::default().with_strict_paths(true)
    }

    // Accessors
    pub fn strict_paths(&self) -> bool {
        self.strict_paths
    }
    pub fn undefined_text(&self) -> &str {
        &self.undefined_text
    }
    pub fn max_passes(&self) -> usize {
        self.max_passes
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            strict_paths: false,
            undefined_text: Cow::Borrowed(""),
            max_passes: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Literal;
    use serde_json::json;

    #[test]
    fn test_template_config_default() {
        let config = TemplateConfig::default();
        assert!(!config.strict_paths());
        assert_eq!(config.undefined_text(), "");
        assert_eq!(config.max_passes(), 10_000);

        let config = TemplateConfig::strict().with_undefined_text("?");
        assert!(config.strict_paths());
        assert_eq!(config.undefined_text(), "?");
    }

    #[test]
    fn test_partial_conversions() {
        assert!(matches!(Partial::from("text"), Partial::Value(Value::String(_))));
        assert!(matches!(Partial::from(3usize), Partial::Value(Value::Number(_))));
        assert!(matches!(Partial::block(Literal::new("x")), Partial::Block(_)));
        assert_eq!(Partial::validator(|_, _| true).kind(), "validator");
    }

    #[test]
    fn test_registry_generates_unique_block_names() {
        let registry = PartialRegistry::new();
        assert_eq!(registry.next_block_name(), "block_0");
        assert_eq!(registry.next_block_name(), "block_1");
    }

    #[test]
    fn test_registry_insert_get_remove() {
        let registry = PartialRegistry::new();
        assert!(registry.insert("a", "first").is_none());
        assert!(registry.insert("a", "second").is_some());
        registry.insert("b", 2);
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(matches!(registry.get("a"), Some(Partial::Value(v)) if v == json!("second")));
        assert!(registry.remove("a").is_some());
        assert!(!registry.contains("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_render_data_from_serializable() {
        #[derive(Serialize)]
        struct Page {
            title: String,
        }

        let template: Template = "<h1>${title}</h1>".parse().unwrap();
        let page = Page {
            title: "Fish & Chips".to_string(),
        };
        assert_eq!(template.render_data(&page).unwrap(), "<h1>Fish &#38; Chips</h1>");
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;

        let file_path = std::env::temp_dir().join("block_template_test_from_file.txt");
        {
            let mut file = std::fs::File::create(&file_path).unwrap();
            file.write_all(b"Hello, %{name}!").unwrap();
        }

        let template = Template::from_file(&file_path).unwrap();
        assert_eq!(template.render(&json!({"name": "file"})).unwrap(), "Hello, file!");

        std::fs::remove_file(&file_path).ok();
    }

    #[test]
    fn test_from_file_nonexistent() {
        let result = Template::from_file("/nonexistent/template.txt");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to read template file"));
    }

    #[test]
    fn test_nested_template_fails_after_registry_dropped() {
        let registry = Rc::new(PartialRegistry::new());
        let nested = Template::nested("%{x}", Rc::downgrade(&registry), Rc::new(TemplateConfig::default()));
        assert!(nested.is_ok());
        let nested = nested.unwrap();
        drop(registry);
        assert!(nested.render(&json!({"x": 1})).is_err());
    }
}
