//! Error handling for block-template
//!
//! This module provides the error type shared by compilation and rendering.
//! All errors implement the standard `std::error::Error` trait and carry the
//! offending token or path in their message.
//!
//! # Error Types
//!
//! - [`Error::SyntaxError`] - Unknown filter names and unknown block prefixes
//! - [`Error::RenderError`] - Rendering failures such as unresolved paths in strict mode
//! - [`Error::TypeError`] - A value of the wrong shape reached a filter or block
//! - [`Error::ConfigError`] - A builder is missing its template source
//! - [`Error::JsonError`] - Serialization of render data failed
//! - [`Error::IoError`] - Reading a template file failed
//!
//! # Usage
//!
//! ```rust,ignore
//! use block_template::{Error, Template};
//! use serde_json::json;
//!
//! let template = Template::new("%{name|shout}", Default::default())?;
//! match template.render(&json!({"name": "Ada"})) {
//!     Ok(output) => println!("{}", output),
//!     Err(Error::SyntaxError(msg)) => println!("Syntax error: {}", msg),
//!     Err(err) => println!("Other error: {}", err),
//! }
//! ```
//!
//! Messages use `Cow<'static, str>` so static messages do not allocate.

use std::borrow::Cow;
use thiserror::Error;

/// Error type for all block-template operations
///
/// There is no recovery path inside the engine: any error aborts the
/// compile or render call that produced it.
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown filter name or block prefix
    ///
    /// Raised when a tag is evaluated (filters) or when a block is
    /// extracted (prefixes).
    #[error("Syntax error: {0}")]
    SyntaxError(Cow<'static, str>),

    /// Rendering could not complete
    #[error("Render error: {0}")]
    RenderError(Cow<'static, str>),

    /// A filter or block received a value of the wrong shape
    ///
    /// For example `|upper` on a number, `|first` on a string, or a
    /// repeating block whose path does not resolve to an array.
    #[error("Type error: {0}")]
    TypeError(Cow<'static, str>),

    /// JSON serialization errors
    ///
    /// Automatically converted from `serde_json::Error` when render data
    /// cannot be turned into a JSON value.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A builder was finished without the settings it needs
    #[error("Configuration error: {0}")]
    ConfigError(Cow<'static, str>),

    /// File system and I/O errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Create a syntax error with a static string
    pub fn syntax_static(msg: &'static str) -> Self {
        Error::SyntaxError(Cow::Borrowed(msg))
    }

    /// Create a syntax error with an owned string
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use block_template::Error;
    ///
    /// let error = Error::syntax_owned(format!("unhandled filter \"{}\"", name));
    /// ```
    pub fn syntax_owned(msg: String) -> Self {
        Error::SyntaxError(Cow::Owned(msg))
    }

    /// Create a render error with a static string
    pub fn render_static(msg: &'static str) -> Self {
        Error::RenderError(Cow::Borrowed(msg))
    }

    /// Create a render error with an owned string
    pub fn render_owned(msg: String) -> Self {
        Error::RenderError(Cow::Owned(msg))
    }

    /// Create a type error with a static string
    pub fn type_static(msg: &'static str) -> Self {
        Error::TypeError(Cow::Borrowed(msg))
    }

    /// Create a type error with an owned string
    pub fn type_owned(msg: String) -> Self {
        Error::TypeError(Cow::Owned(msg))
    }

    /// Create a configuration error with a static string
    pub fn config_static(msg: &'static str) -> Self {
        Error::ConfigError(Cow::Borrowed(msg))
    }

    /// Error for a filter name outside the fixed filter set
    pub fn unknown_filter(name: &str) -> Self {
        Self::syntax_owned(format!("unhandled filter \"{}\"", name))
    }

    /// Error for a block prefix outside the fixed prefix set
    pub fn unknown_prefix(prefix: char) -> Self {
        Self::syntax_owned(format!("unhandled prefix \"{}\"", prefix))
    }

    /// Create an IO error carrying a message
    pub fn io(msg: String) -> Self {
        Error::IoError(std::io::Error::new(std::io::ErrorKind::Other, msg))
    }

    /// Whether this error is a syntax error
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::SyntaxError(_))
    }
}

/// Result type alias for block-template operations
pub type Result<T> = std::result::Result<T, Error>;
