//! Builder pattern API for constructing Template instances
//!
//! This module provides a fluent API for creating templates from a string or
//! a file, with partials, a shared registry and rendering options.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::types::{read_template_file, Partial, PartialRegistry, Partials, Template, TemplateConfig};

/// Builder for constructing Template instances
///
/// # Examples
///
/// ```rust,ignore
/// use block_template::TemplateBuilder;
/// use serde_json::json;
///
/// let template = TemplateBuilder::new()
///     .from_str("<h1>${@title}</h1>#{items:item}<li>${item}</li>#{/items}")
///     .with_partial("title", "Groceries")
///     .strict()
///     .build()?;
///
/// let output = template.render(&json!({"items": ["milk", "eggs"]}))?;
/// ```
#[derive(Default)]
pub struct TemplateBuilder {
    source: Option<TemplateSource>,
    partials: Partials,
    registry: Option<Rc<PartialRegistry>>,
    config: TemplateConfig,
}

/// Template source for the builder
#[derive(Debug, Clone)]
enum TemplateSource {
    Content(String),
    File(PathBuf),
}

impl TemplateBuilder {
    /// Create a new template builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the template content
    #[allow(clippy::should_implement_trait)]
    pub fn from_str<S: Into<String>>(mut self, content: S) -> Self {
        self.source = Some(TemplateSource::Content(content.into()));
        self
    }

    /// Set the source from a file path, read when the template is built
    pub fn from_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source = Some(TemplateSource::File(path.as_ref().to_path_buf()));
        self
    }

    /// Add a named partial
    pub fn with_partial<S, P>(mut self, name: S, partial: P) -> Self
    where
        S: Into<String>,
        P: Into<Partial>,
    {
        self.partials.insert(name.into(), partial.into());
        self
    }

    /// Add several partials at once
    pub fn with_partials<I>(mut self, partials: I) -> Self
    where
        I: IntoIterator<Item = (String, Partial)>,
    {
        self.partials.extend(partials);
        self
    }

    /// Compile against a registry shared with other templates
    ///
    /// Partials added to the builder are inserted into that registry.
    pub fn with_registry(mut self, registry: Rc<PartialRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a custom template configuration
    pub fn with_config(mut self, config: TemplateConfig) -> Self {
        self.config = config;
        self
    }

    /// Fail renders on unresolved placeholder paths
    pub fn strict(mut self) -> Self {
        self.config = self.config.with_strict_paths(true);
        self
    }

    /// Build the Template instance
    pub fn build(self) -> Result<Template> {
        let source = self.source.ok_or_else(|| {
            Error::config_static("No template source provided. Use from_str() or from_file()")
        })?;

        let content = match source {
            TemplateSource::Content(content) => content,
            TemplateSource::File(path) => read_template_file(&path)?,
        };

        match self.registry {
            Some(registry) => {
                for (name, partial) in self.partials {
                    registry.insert(name, partial);
                }
                Template::with_registry_and_config(content, registry, self.config)
            }
            None => Template::with_config(content, self.partials, self.config),
        }
    }
}
