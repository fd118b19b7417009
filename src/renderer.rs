//! Inline tag rendering
//!
//! After block extraction a template's content only holds inline tags:
//! `${path}` for escaped and `%{path}` for raw substitution, each with an
//! optional `|filter`. The renderer repeatedly takes the first tag left in
//! the content and replaces every occurrence of that exact tag text with its
//! value. Substituted text is scanned again, so partials may carry tags of
//! their own.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::borrow::Cow;

use crate::block::Block;
use crate::error::{Error, Result};
use crate::filters;
use crate::types::{Partial, PartialRegistry, TemplateConfig};
use crate::utils::{escape_cow, indent_before, reindent_continuation};
use crate::value::{resolve, ValueExt, PATH_SEPARATOR};

/// Prefix of tags whose string values are escaped
pub const ESCAPED_PREFIX: char = '$';

/// Prefix of tags whose values are substituted as they are
pub const RAW_PREFIX: char = '%';

/// Leading operator of paths that refer to the partial registry
pub const PARTIAL_OPERATOR: char = '@';

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([$%])\{([^}|]*)(?:\|([^}|]+))?\}").expect("Invalid tag regex")
});

/// Substitutes the inline tags of one template's residual content
pub struct Renderer<'a> {
    content: &'a str,
    registry: &'a PartialRegistry,
    config: &'a TemplateConfig,
}

impl<'a> Renderer<'a> {
    pub fn new(content: &'a str, registry: &'a PartialRegistry, config: &'a TemplateConfig) -> Self {
        Self {
            content,
            registry,
            config,
        }
    }

    /// Render the content with the given parameters
    ///
    /// Fails with a render error when a value contains its own tag or when
    /// substitution does not settle within the configured number of passes.
    pub fn render(&self, params: &Value) -> Result<String> {
        let mut content = self.content.to_string();
        let mut passes = 0;

        while let Some((tag, value)) = self.first_tag(&content, params)? {
            passes += 1;
            if passes > self.config.max_passes() {
                return Err(Error::render_owned(format!(
                    "tag substitution did not settle after {} passes",
                    self.config.max_passes()
                )));
            }
            if value.contains(&tag) {
                return Err(Error::render_owned(format!("tag \"{}\" expands to itself", tag)));
            }
            content = content.replace(&tag, &value);
        }

        Ok(content)
    }

    /// The text of the first tag in `content` and the value it renders to
    fn first_tag(&self, content: &str, params: &Value) -> Result<Option<(String, String)>> {
        let Some(caps) = TAG_REGEX.captures(content) else {
            return Ok(None);
        };
        let Some(tag) = caps.get(0) else {
            return Ok(None);
        };
        let value = self.render_tag(&caps, content, tag.start(), params)?;
        Ok(Some((tag.as_str().to_string(), value)))
    }

    fn render_tag(
        &self,
        caps: &Captures<'_>,
        content: &str,
        start: usize,
        params: &Value,
    ) -> Result<String> {
        let escaped = caps.get(1).map_or(false, |m| m.as_str().starts_with(ESCAPED_PREFIX));
        let path = caps.get(2).map_or("", |m| m.as_str());

        let mut value = lookup(path, params, self.registry)?;
        if value.is_none() && self.config.strict_paths() {
            return Err(Error::render_owned(format!("unresolved path \"{}\"", path)));
        }
        if let Some(filter) = caps.get(3) {
            value = filters::apply(filter.as_str(), value)?;
        }

        let text = match value.as_deref() {
            None | Some(Value::Null) => return Ok(self.config.undefined_text().to_string()),
            Some(Value::String(s)) => {
                let text = if escaped { escape_cow(s) } else { Cow::Borrowed(s.as_str()) };
                reindent_continuation(&text, indent_before(content, start)).into_owned()
            }
            Some(other) => other.to_text().into_owned(),
        };
        Ok(text)
    }
}

/// Resolve a tag path against the params or, with a leading `@`, the registry
///
/// `@name.key` resolves the partial `name` first and walks the rest of the
/// path into its value. A missing partial is an absent value.
pub(crate) fn lookup<'p>(
    path: &str,
    params: &'p Value,
    registry: &PartialRegistry,
) -> Result<Option<Cow<'p, Value>>> {
    let Some(name) = path.strip_prefix(PARTIAL_OPERATOR) else {
        return Ok(resolve(path, params).map(Cow::Borrowed));
    };

    let (head, rest) = match name.split_once(PATH_SEPARATOR) {
        Some((head, rest)) => (head, Some(rest)),
        None => (name, None),
    };
    let Some(partial) = registry.get(head) else {
        log::trace!("partial \"{}\" is not registered", head);
        return Ok(None);
    };

    let value = resolve_partial(partial, params)?;
    Ok(match (value, rest) {
        (Some(value), Some(rest)) => resolve(rest, &value).cloned().map(Cow::Owned),
        (value, None) => value.map(Cow::Owned),
        (None, Some(_)) => None,
    })
}

/// Turn a partial into the value it stands for under `params`
///
/// Functions are called until they yield something else. Blocks render to
/// their output string; deferred blocks are built first.
pub(crate) fn resolve_partial(mut partial: Partial, params: &Value) -> Result<Option<Value>> {
    loop {
        partial = match partial {
            Partial::Value(value) => return Ok(Some(value)),
            Partial::Function(function) => function(params),
            Partial::Block(block) => return block.render(params).map(|s| Some(Value::String(s))),
            Partial::Deferred(deferred) => {
                let node = deferred.node()?;
                return node.render(params).map(|s| Some(Value::String(s)));
            }
            Partial::Validator(_) => {
                return Err(Error::type_static(
                    "a validator partial cannot be rendered as a value",
                ))
            }
        };
    }
}
