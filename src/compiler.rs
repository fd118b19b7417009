//! Block extraction
//!
//! Compilation removes every block region from the template content and
//! leaves a flat residual template. Each region
//! `<prefix>{[!]name[:param]}content<prefix>{/name}` is replaced in place by
//! a raw partial reference `%{@block_<n>}`, and a [`DeferredBlock`] holding
//! the captured [`BlockSpec`] is registered under `block_<n>`. The node is
//! only built when the reference is first rendered.
//!
//! Opening tags without a matching closing tag are not blocks and stay in
//! the output as literal text.

use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::ops::Range;
use std::rc::{Rc, Weak};

use crate::block::{Block, Cached, Conditional, IndentUnit, Indented, Repeating};
use crate::error::{Error, Result};
use crate::renderer::{lookup, resolve_partial, PARTIAL_OPERATOR, RAW_PREFIX};
use crate::types::{upgrade, Partial, PartialRegistry, Template, TemplateConfig};
use crate::value::{is_falsy, resolve, ValueExt};

/// Separator between a block name and its parameter
pub const PARAM_SEPARATOR: char = ':';

/// Negation operator of conditional blocks
pub const NOT_OPERATOR: char = '!';

static BLOCK_OPEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([#?>_=])\{(!)?(([^:}]*)(?::[^}]+)?)\}").expect("Invalid block regex")
});

/// Kind of a block, selected by its prefix character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `#{path[:alias]}`
    Repeating,
    /// `?{[!]path}`
    Conditional,
    /// `>{name:N}`
    TabIndented,
    /// `_{name:N}`
    SpaceIndented,
    /// `={name[:validator]}`
    Cached,
}

impl BlockKind {
    pub fn prefix(self) -> char {
        match self {
            BlockKind::Repeating => '#',
            BlockKind::Conditional => '?',
            BlockKind::TabIndented => '>',
            BlockKind::SpaceIndented => '_',
            BlockKind::Cached => '=',
        }
    }
}

impl TryFrom<char> for BlockKind {
    type Error = Error;

    fn try_from(prefix: char) -> Result<Self> {
        match prefix {
            '#' => Ok(BlockKind::Repeating),
            '?' => Ok(BlockKind::Conditional),
            '>' => Ok(BlockKind::TabIndented),
            '_' => Ok(BlockKind::SpaceIndented),
            '=' => Ok(BlockKind::Cached),
            other => Err(Error::unknown_prefix(other)),
        }
    }
}

/// Everything captured from one block region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpec {
    pub kind: BlockKind,
    /// Opening tag carried the `!` operator
    pub negated: bool,
    /// Text between the operator and the closing brace, `name[:param]`
    pub placeholder: String,
    pub name: String,
    /// Text after the first `:`, up to the next `:`
    pub param: Option<String>,
    pub content: String,
}

impl BlockSpec {
    fn new(kind: BlockKind, negated: bool, placeholder: &str, name: &str, content: &str) -> Self {
        let param = if placeholder.contains(PARAM_SEPARATOR) {
            placeholder.split(PARAM_SEPARATOR).nth(1).map(String::from)
        } else {
            None
        };
        Self {
            kind,
            negated,
            placeholder: placeholder.to_string(),
            name: name.to_string(),
            param,
            content: content.to_string(),
        }
    }
}

pub struct Compiler;

impl Compiler {
    /// Extract every block region of `content` in place
    ///
    /// Returns the number of extracted blocks. Running it again on the
    /// result extracts nothing.
    pub fn extract(
        content: &mut String,
        registry: &Rc<PartialRegistry>,
        config: &Rc<TemplateConfig>,
    ) -> Result<usize> {
        let mut extracted = 0;
        while let Some((range, spec)) = Self::find_block(content)? {
            let name = registry.next_block_name();
            let reference = format!("{}{{{}{}}}", RAW_PREFIX, PARTIAL_OPERATOR, name);
            log::debug!(
                "extracted {:?} block \"{}\" as {}",
                spec.kind,
                spec.placeholder,
                name
            );

            content.replace_range(range, &reference);
            let deferred = DeferredBlock::new(spec, Rc::downgrade(registry), Rc::clone(config));
            registry.insert(name, Partial::Deferred(Rc::new(deferred)));
            extracted += 1;
        }
        Ok(extracted)
    }

    /// Find the leftmost opening tag that has a closing tag after it
    pub fn find_block(content: &str) -> Result<Option<(Range<usize>, BlockSpec)>> {
        let mut position = 0;
        while let Some(caps) = BLOCK_OPEN_REGEX.captures_at(content, position) {
            let (Some(open), Some(prefix), Some(placeholder), Some(name)) =
                (caps.get(0), caps.get(1), caps.get(3), caps.get(4))
            else {
                break;
            };
            let negated = caps.get(2).is_some();

            let closing = format!("{}{{/{}}}", prefix.as_str(), name.as_str());
            if let Some(offset) = content[open.end()..].find(&closing) {
                let content_end = open.end() + offset;
                let prefix_char = prefix.as_str().chars().next().unwrap_or_default();
                let kind = BlockKind::try_from(prefix_char)?;
                let spec = BlockSpec::new(
                    kind,
                    negated,
                    placeholder.as_str(),
                    name.as_str(),
                    &content[open.end()..content_end],
                );
                return Ok(Some((open.start()..content_end + closing.len(), spec)));
            }

            // Prefix characters are ASCII, so the next boundary is one byte on
            position = open.start() + 1;
        }
        Ok(None)
    }
}

/// A block extracted from template content, built on first use
///
/// The built node is memoized, so every later reference renders the same
/// node. Cached blocks additionally share one node per block name through
/// the registry's `cached_<name>` slot.
pub struct DeferredBlock {
    spec: BlockSpec,
    registry: Weak<PartialRegistry>,
    config: Rc<TemplateConfig>,
    built: OnceCell<Rc<dyn Block>>,
}

impl DeferredBlock {
    pub(crate) fn new(
        spec: BlockSpec,
        registry: Weak<PartialRegistry>,
        config: Rc<TemplateConfig>,
    ) -> Self {
        Self {
            spec,
            registry,
            config,
            built: OnceCell::new(),
        }
    }

    pub fn spec(&self) -> &BlockSpec {
        &self.spec
    }

    pub fn is_built(&self) -> bool {
        self.built.get().is_some()
    }

    /// The node for this block, building it on first access
    pub fn node(&self) -> Result<Rc<dyn Block>> {
        self.built.get_or_try_init(|| self.build()).map(Rc::clone)
    }

    fn build(&self) -> Result<Rc<dyn Block>> {
        log::debug!(
            "building {:?} block \"{}\"",
            self.spec.kind,
            self.spec.placeholder
        );
        match self.spec.kind {
            BlockKind::Conditional => self.build_conditional(),
            BlockKind::Repeating => self.build_repeating(),
            BlockKind::TabIndented => self.build_indented(IndentUnit::Tab),
            BlockKind::SpaceIndented => self.build_indented(IndentUnit::Space),
            BlockKind::Cached => self.build_cached(),
        }
    }

    fn nested(&self, content: &str) -> Result<Template> {
        Template::nested(content, self.registry.clone(), Rc::clone(&self.config))
    }

    fn build_conditional(&self) -> Result<Rc<dyn Block>> {
        let spec = &self.spec;
        let else_tag = format!(
            "{}{{{}{}}}",
            BlockKind::Conditional.prefix(),
            if spec.negated { String::new() } else { NOT_OPERATOR.to_string() },
            spec.placeholder
        );
        let mut parts = spec.content.split(else_tag.as_str());
        let on_true = self.nested(parts.next().unwrap_or_default())?;
        let on_false = parts.next().map(|content| self.nested(content)).transpose()?;

        let path = spec.placeholder.clone();
        let negated = spec.negated;
        let registry = self.registry.clone();
        let predicate = move |params: &Value| -> Result<bool> {
            let registry = upgrade(&registry)?;
            let value = lookup(&path, params, &registry)?;
            Ok(is_falsy(value.as_deref()) == negated)
        };

        let conditional = Conditional::try_new(predicate, on_true);
        Ok(match on_false {
            Some(on_false) => Rc::new(conditional.with_else(on_false)),
            None => Rc::new(conditional),
        })
    }

    fn build_repeating(&self) -> Result<Rc<dyn Block>> {
        let body = self.nested(&self.spec.content)?;
        let repeating = Repeating::new(self.spec.name.as_str(), body)
            .with_alias(self.spec.param.clone().unwrap_or_default());
        Ok(Rc::new(repeating))
    }

    fn build_indented(&self, unit: IndentUnit) -> Result<Rc<dyn Block>> {
        let count = self.spec.param.as_deref().map_or(0, parse_indent_level);
        let body = self.nested(&self.spec.content)?;
        Ok(Rc::new(Indented::new(body, unit, count)))
    }

    fn build_cached(&self) -> Result<Rc<dyn Block>> {
        let registry = upgrade(&self.registry)?;
        let slot = format!("cached_{}", self.spec.name);
        if let Some(Partial::Block(node)) = registry.get(&slot) {
            log::trace!("reusing cache slot {}", slot);
            return Ok(node);
        }

        let body = self.nested(&self.spec.content)?;
        let mut cached = Cached::new(body);
        if let Some(path) = self.spec.param.clone() {
            let registry = self.registry.clone();
            cached = cached.with_try_validator(move |params, previous| {
                let registry = upgrade(&registry)?;
                validate(&path, params, previous, &registry)
            });
        }

        let node: Rc<dyn Block> = Rc::new(cached);
        registry.insert(slot, Partial::Block(Rc::clone(&node)));
        Ok(node)
    }
}

impl fmt::Debug for DeferredBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredBlock")
            .field("kind", &self.spec.kind)
            .field("placeholder", &self.spec.placeholder)
            .field("built", &self.is_built())
            .finish()
    }
}

/// Whether a cached block may reuse its output
///
/// `@name` refers to a registry entry: a validator partial is called with
/// the current and previous params, anything else is judged by the
/// truthiness of what it resolves to. A plain path is judged by the
/// truthiness of its value in the current params.
///
/// Unlike conditional blocks, empty arrays and objects count as true here.
fn validate(path: &str, params: &Value, previous: &Value, registry: &PartialRegistry) -> Result<bool> {
    let Some(name) = path.strip_prefix(PARTIAL_OPERATOR) else {
        return Ok(resolve(path, params).map_or(false, ValueExt::is_truthy));
    };
    match registry.get(name) {
        Some(Partial::Validator(validator)) => Ok(validator(params, previous)),
        Some(partial) => Ok(resolve_partial(partial, params)?
            .as_ref()
            .map_or(false, ValueExt::is_truthy)),
        None => Ok(false),
    }
}

/// Leading integer of an indent parameter; anything unparsable or negative is 0
fn parse_indent_level(param: &str) -> usize {
    let trimmed = param.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if negative {
        return 0;
    }
    digits[..end].parse().unwrap_or(0)
}
