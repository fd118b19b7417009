//! Text templating with composable render blocks
//!
//! This crate compiles template text into a flat residual template plus a
//! set of lazily built blocks, and renders it against `serde_json::Value`
//! parameters. Blocks repeat content over arrays, render conditionally,
//! indent their output, or cache it between renders. Inline tags substitute
//! escaped or raw values, optionally passed through one filter.
//!
//! # Examples
//!
//! ```rust,ignore
//! use block_template::{Partials, Template};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let template = Template::new(
//!     "<ul>\n#{items:item}    <li>${item|capitalize}</li>\n#{/items}</ul>\
//!      ?{!items}<p>Nothing yet</p>?{/items}",
//!     Partials::new(),
//! )?;
//!
//! let rendered = template.render(&json!({"items": ["milk", "eggs"]}))?;
//! assert_eq!(rendered, "<ul>\n    <li>Milk</li>\n    <li>Eggs</li>\n</ul>");
//! # Ok(())
//! # }
//! ```
//!
//! Blocks can also be composed by hand through the [`Block`] trait; a
//! compiled [`Template`] is itself a block.

pub mod block;
pub mod builder;
pub mod cache;
pub mod compiler;
pub mod error;
pub mod filters;
pub mod renderer;
pub mod types;
pub mod utils;
pub mod value;


// Re-export commonly used types
pub use block::{Block, Cached, Callback, Composite, Conditional, IndentUnit, Indented, Literal, Repeating};
pub use builder::TemplateBuilder;
pub use cache::{CacheConfig, CacheStats, TemplateCache};
pub use error::{Error, Result};
pub use filters::Filter;
pub use types::{Partial, PartialRegistry, Partials, Template, TemplateConfig};
pub use utils::escape;
pub use value::{resolve, ValueExt};

pub use serde_json::{json, Value};
