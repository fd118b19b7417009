//! Compiled template cache
//!
//! Compiling a template scans its content for blocks once. Applications that
//! render the same template text repeatedly can keep the compiled result in
//! a [`TemplateCache`] and skip that work on later requests.
//!
//! ```rust,ignore
//! use block_template::TemplateCache;
//! use serde_json::json;
//!
//! let cache = TemplateCache::new();
//! let template = cache.get_or_compile("Hello ${name}")?;
//! assert_eq!(template.render(&json!({"name": "World"}))?, "Hello World");
//!
//! let again = cache.get_or_compile("Hello ${name}")?;
//! assert_eq!(cache.stats().hits, 1);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Result;
use crate::types::{Partials, Template, TemplateConfig};

/// Cache sizing and the configuration templates are compiled with
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries kept before the least recently used one is evicted
    pub max_entries: usize,
    pub template_config: TemplateConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            template_config: TemplateConfig::default(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    template: Rc<Template>,
    last_accessed: u64,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub hit_rate: f64,
    pub entry_count: usize,
    pub max_entries: usize,
}

/// Compiled templates keyed by their content
///
/// Each distinct content string is compiled once and handed out as an
/// `Rc<Template>`. Templates compiled by the cache get their own empty
/// registry; use [`TemplateCache::get_or_compile_with`] to compile with
/// partials.
///
/// Note that a cached template also keeps the state of its cached blocks,
/// so every holder of the `Rc` sees the same `={name}` outputs.
pub struct TemplateCache {
    entries: RefCell<HashMap<String, CacheEntry>>,
    config: CacheConfig,
    clock: Cell<u64>,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl TemplateCache {
    /// Create a new template cache with default settings
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a new template cache with custom configuration
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            config,
            clock: Cell::new(0),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Get the compiled template for `content`, compiling it on a miss
    pub fn get_or_compile(&self, content: &str) -> Result<Rc<Template>> {
        let config = self.config.template_config.clone();
        self.get_or_compile_with(content, |content| {
            Template::with_config(content, Partials::new(), config)
        })
    }

    /// Get the compiled template for `content`, using `compiler` on a miss
    ///
    /// A failed compilation is returned as is and nothing is stored.
    pub fn get_or_compile_with<F>(&self, content: &str, compiler: F) -> Result<Rc<Template>>
    where
        F: FnOnce(&str) -> Result<Template>,
    {
        let now = self.tick();
        if let Some(entry) = self.entries.borrow_mut().get_mut(content) {
            entry.last_accessed = now;
            self.hits.set(self.hits.get() + 1);
            log::trace!("template cache hit ({} bytes)", content.len());
            return Ok(Rc::clone(&entry.template));
        }

        self.misses.set(self.misses.get() + 1);
        log::trace!("template cache miss ({} bytes)", content.len());
        let template = Rc::new(compiler(content)?);

        let mut entries = self.entries.borrow_mut();
        if entries.len() >= self.config.max_entries {
            Self::evict_least_recent(&mut entries);
        }
        entries.insert(
            content.to_string(),
            CacheEntry {
                template: Rc::clone(&template),
                last_accessed: now,
            },
        );
        Ok(template)
    }

    pub fn contains(&self, content: &str) -> bool {
        self.entries.borrow().contains_key(content)
    }

    /// Remove the entry for `content`
    pub fn remove(&self, content: &str) -> Option<Rc<Template>> {
        self.entries
            .borrow_mut()
            .remove(content)
            .map(|entry| entry.template)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Clear all entries and reset the statistics
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
        self.hits.set(0);
        self.misses.set(0);
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.get();
        let misses = self.misses.get();
        CacheStats {
            hits,
            misses,
            hit_rate: if hits + misses > 0 {
                hits as f64 / (hits + misses) as f64
            } else {
                0.0
            },
            entry_count: self.len(),
            max_entries: self.config.max_entries,
        }
    }

    fn tick(&self) -> u64 {
        let now = self.clock.get() + 1;
        self.clock.set(now);
        now
    }

    fn evict_least_recent(entries: &mut HashMap<String, CacheEntry>) {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            log::trace!("evicting cached template ({} bytes)", key.len());
            entries.remove(&key);
        }
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new()
    }
}
