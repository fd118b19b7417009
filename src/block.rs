//! Renderable block nodes
//!
//! Every node in a render tree implements the [`Block`] trait: given the
//! parameters of the current render call it produces a string. Compiled
//! [`Template`](crate::Template)s implement it as well, so templates and
//! hand-built nodes can be freely mixed.
//!
//! # Node Types
//!
//! - [`Literal`] - a fixed string
//! - [`Composite`] - children rendered in order and concatenated
//! - [`Conditional`] - one of two children, chosen by a predicate
//! - [`Repeating`] - a body rendered once per element of an array
//! - [`Cached`] - a wrapped node whose output is kept between calls
//! - [`Indented`] - a wrapped node whose output lines are indented
//! - [`Callback`] - a closure producing the output directly
//!
//! # Examples
//!
//! ```rust,ignore
//! use block_template::block::{Block, Composite, Conditional, Literal};
//! use serde_json::json;
//!
//! let block = Composite::new()
//!     .with(Literal::new("merged "))
//!     .with(Literal::new("block contents"))
//!     .with(Conditional::new(|_| true, Literal::new(" are returned")));
//!
//! assert_eq!(block.render(&json!({}))?, "merged block contents are returned");
//! ```
//!
//! # Thread Safety
//!
//! Nodes are not `Send` or `Sync`. [`Cached`] keeps its last output in a
//! `RefCell`; a tree containing cached nodes must not be shared between
//! independent render streams without external synchronization.

use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::utils::indent_lines;
use crate::value::{overlay, resolve};

/// Key under which a repeating block stores its loop context
pub const LOOP_KEY: &str = "loop";

/// Predicate deciding which branch of a [`Conditional`] renders
pub type Predicate = Box<dyn Fn(&Value) -> Result<bool>>;

/// Per-item transform of a [`Repeating`] block: `(item, outer params) -> scope`
pub type Transform = Box<dyn Fn(Value, &Value) -> Value>;

/// Validator of a [`Cached`] block: `(params, previous params) -> still valid`
pub type Validator = Box<dyn Fn(&Value, &Value) -> Result<bool>>;

/// A node that renders to a string
pub trait Block {
    /// Render this node with the given parameters
    fn render(&self, params: &Value) -> Result<String>;
}

impl<B: Block + ?Sized> Block for Box<B> {
    fn render(&self, params: &Value) -> Result<String> {
        (**self).render(params)
    }
}

impl<B: Block + ?Sized> Block for Rc<B> {
    fn render(&self, params: &Value) -> Result<String> {
        (**self).render(params)
    }
}

/// A fixed string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    content: String,
}

impl Literal {
    pub fn new<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

impl Block for Literal {
    fn render(&self, _params: &Value) -> Result<String> {
        Ok(self.content.clone())
    }
}

/// Ordered children rendered with the same parameters and concatenated
#[derive(Default)]
pub struct Composite {
    children: Vec<Box<dyn Block>>,
}

impl Composite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(children: Vec<Box<dyn Block>>) -> Self {
        Self { children }
    }

    /// Append a child, builder style
    pub fn with<B: Block + 'static>(mut self, child: B) -> Self {
        self.children.push(Box::new(child));
        self
    }

    pub fn push<B: Block + 'static>(&mut self, child: B) {
        self.children.push(Box::new(child));
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Block for Composite {
    fn render(&self, params: &Value) -> Result<String> {
        let mut output = String::new();
        for child in &self.children {
            output.push_str(&child.render(params)?);
        }
        Ok(output)
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("children", &self.children.len())
            .finish()
    }
}

/// Renders `on_true` when the predicate holds, `on_false` (or nothing) otherwise
pub struct Conditional {
    predicate: Predicate,
    on_true: Box<dyn Block>,
    on_false: Option<Box<dyn Block>>,
}

impl Conditional {
    pub fn new<P, B>(predicate: P, on_true: B) -> Self
    where
        P: Fn(&Value) -> bool + 'static,
        B: Block + 'static,
    {
        Self::try_new(move |params| Ok(predicate(params)), on_true)
    }

    /// Create a conditional whose predicate may fail
    pub fn try_new<P, B>(predicate: P, on_true: B) -> Self
    where
        P: Fn(&Value) -> Result<bool> + 'static,
        B: Block + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            on_true: Box::new(on_true),
            on_false: None,
        }
    }

    /// Set the block rendered when the predicate does not hold
    pub fn with_else<B: Block + 'static>(mut self, on_false: B) -> Self {
        self.on_false = Some(Box::new(on_false));
        self
    }
}

impl Block for Conditional {
    fn render(&self, params: &Value) -> Result<String> {
        if (self.predicate)(params)? {
            return self.on_true.render(params);
        }
        match &self.on_false {
            Some(block) => block.render(params),
            None => Ok(String::new()),
        }
    }
}

impl fmt::Debug for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conditional")
            .field("has_else", &self.on_false.is_some())
            .finish()
    }
}

/// Renders a body once per element of the array found at `path`
///
/// Each iteration renders with a fresh scope: the outer parameters
/// overlaid with the iteration's keys, plus a loop context under
/// [`LOOP_KEY`]:
///
/// | Key      | Value                  |
/// |----------|------------------------|
/// | `index`  | 0-based position       |
/// | `number` | 1-based position       |
/// | `first`  | `index == 0`           |
/// | `last`   | `index == size - 1`    |
/// | `size`   | number of elements     |
pub struct Repeating {
    path: String,
    body: Box<dyn Block>,
    alias: Option<String>,
    transform: Option<Transform>,
}

impl Repeating {
    pub fn new<S, B>(path: S, body: B) -> Self
    where
        S: Into<String>,
        B: Block + 'static,
    {
        Self {
            path: path.into(),
            body: Box::new(body),
            alias: None,
            transform: None,
        }
    }

    /// Expose each element under `alias` instead of merging it into the scope
    pub fn with_alias<S: Into<String>>(mut self, alias: S) -> Self {
        let alias = alias.into();
        self.alias = if alias.is_empty() { None } else { Some(alias) };
        self
    }

    /// Compute each iteration's scope from the element and the outer params
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value, &Value) -> Value + 'static,
    {
        self.transform = Some(Box::new(transform));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Block for Repeating {
    fn render(&self, params: &Value) -> Result<String> {
        let items = match resolve(&self.path, params) {
            Some(Value::Array(items)) => items,
            Some(_) | None => {
                return Err(Error::type_owned(format!(
                    "\"{}\" is not iterable",
                    self.path
                )))
            }
        };

        let size = items.len();
        let mut output = String::new();
        for (index, item) in items.iter().enumerate() {
            let mut scope = item.clone();
            if let Some(alias) = &self.alias {
                let mut wrapped = Map::new();
                wrapped.insert(alias.clone(), scope);
                scope = Value::Object(wrapped);
            }
            if let Some(transform) = &self.transform {
                scope = transform(scope, params);
            }

            let mut loop_params = overlay(params, &scope);
            loop_params.insert(
                LOOP_KEY.to_string(),
                json!({
                    "index": index,
                    "first": index == 0,
                    "last": index + 1 == size,
                    "number": index + 1,
                    "size": size,
                }),
            );
            output.push_str(&self.body.render(&Value::Object(loop_params))?);
        }
        Ok(output)
    }
}

impl fmt::Debug for Repeating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repeating")
            .field("path", &self.path)
            .field("alias", &self.alias)
            .field("has_transform", &self.transform.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
struct CacheState {
    output: String,
    params: Value,
}

/// Keeps the output of a wrapped node between render calls
///
/// The first render always computes. Later renders reuse the stored output
/// while the validator, called with the current and the previous params,
/// returns `true`. Without a validator the output is computed once.
pub struct Cached {
    inner: Box<dyn Block>,
    validator: Option<Validator>,
    state: RefCell<Option<CacheState>>,
}

impl Cached {
    pub fn new<B: Block + 'static>(inner: B) -> Self {
        Self {
            inner: Box::new(inner),
            validator: None,
            state: RefCell::new(None),
        }
    }

    /// Set the validator deciding whether the stored output is still valid
    pub fn with_validator<F>(self, validator: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + 'static,
    {
        self.with_try_validator(move |params, previous| Ok(validator(params, previous)))
    }

    pub(crate) fn with_try_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<bool> + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Whether an output has been stored
    pub fn is_cached(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Drop the stored output so the next render recomputes
    pub fn invalidate(&self) {
        self.state.borrow_mut().take();
    }
}

impl Block for Cached {
    fn render(&self, params: &Value) -> Result<String> {
        let previous = self.state.borrow().clone();
        let reusable = match &previous {
            Some(state) => match &self.validator {
                Some(validator) => validator(params, &state.params)?,
                None => true,
            },
            None => false,
        };

        let output = match previous {
            Some(state) if reusable => {
                log::trace!("cached block reused");
                state.output
            }
            _ => {
                log::trace!("cached block recomputed");
                self.inner.render(params)?
            }
        };

        *self.state.borrow_mut() = Some(CacheState {
            output: output.clone(),
            params: params.clone(),
        });
        Ok(output)
    }
}

impl fmt::Debug for Cached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cached")
            .field("is_cached", &self.is_cached())
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// Character repeated to form an indent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentUnit {
    Space,
    Tab,
}

impl IndentUnit {
    pub fn as_char(self) -> char {
        match self {
            IndentUnit::Space => ' ',
            IndentUnit::Tab => '\t',
        }
    }

    /// The unit repeated `count` times
    pub fn repeat(self, count: usize) -> String {
        std::iter::repeat(self.as_char()).take(count).collect()
    }
}

/// Prefixes every line of the wrapped node's output, the first included
pub struct Indented {
    inner: Box<dyn Block>,
    unit: IndentUnit,
    count: usize,
}

impl Indented {
    pub fn new<B: Block + 'static>(inner: B, unit: IndentUnit, count: usize) -> Self {
        Self {
            inner: Box::new(inner),
            unit,
            count,
        }
    }

    pub fn spaces<B: Block + 'static>(inner: B, count: usize) -> Self {
        Self::new(inner, IndentUnit::Space, count)
    }

    pub fn tabs<B: Block + 'static>(inner: B, count: usize) -> Self {
        Self::new(inner, IndentUnit::Tab, count)
    }
}

impl Block for Indented {
    fn render(&self, params: &Value) -> Result<String> {
        let content = self.inner.render(params)?;
        Ok(indent_lines(&content, &self.unit.repeat(self.count)))
    }
}

impl fmt::Debug for Indented {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indented")
            .field("unit", &self.unit)
            .field("count", &self.count)
            .finish()
    }
}

/// Output produced by a closure
pub struct Callback {
    callback: Box<dyn Fn(&Value) -> String>,
}

impl Callback {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Value) -> String + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl Block for Callback {
    fn render(&self, params: &Value) -> Result<String> {
        Ok((self.callback)(params))
    }
}
