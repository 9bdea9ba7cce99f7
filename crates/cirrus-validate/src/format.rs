//! Named format predicates.
//!
//! A format is a string predicate looked up by name while a schema compiles.
//! The default registry ships these built-ins:
//!
//! | Name | Accepts |
//! |---|---|
//! | `nonEmptyOrBlank` | strings with at least one non-whitespace character |
//! | `nonEmpty` | strings with at least one character |
//! | `email` | `local@domain.tld` shaped addresses |
//! | `uuid` | hyphenated or simple UUIDs |
//! | `date-time` | RFC 3339 timestamps |
//! | `uri` | absolute URIs with a scheme |
//!
//! # Example
//!
//! ```
//! use cirrus_validate::FormatRegistry;
//!
//! let mut formats = FormatRegistry::default();
//! formats.register("lowercase", |s: &str| s.chars().all(|c| !c.is_uppercase()));
//!
//! assert!(formats.check("lowercase", "ada").unwrap());
//! assert!(!formats.check("nonEmptyOrBlank", "   ").unwrap());
//! assert!(formats.check("missing", "x").is_none());
//! ```

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A shared string predicate.
pub type FormatPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Name to predicate mapping consulted at compile time.
#[derive(Clone)]
pub struct FormatRegistry {
    formats: HashMap<String, FormatPredicate>,
}

impl FormatRegistry {
    /// Creates a registry with no formats at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    /// Creates a registry holding the built-in formats.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry
            .register("nonEmptyOrBlank", non_empty_or_blank)
            .register("nonEmpty", non_empty)
            .register("email", is_email)
            .register("uuid", is_uuid)
            .register("date-time", is_date_time)
            .register("uri", is_uri);
        registry
    }

    /// Registers a predicate, replacing any existing one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.insert(name.into(), Arc::new(predicate));
        self
    }

    /// Returns the predicate registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FormatPredicate> {
        self.formats.get(name)
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Runs the named predicate, or returns `None` if it is not registered.
    #[must_use]
    pub fn check(&self, name: &str, value: &str) -> Option<bool> {
        self.formats.get(name).map(|predicate| predicate(value))
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formats.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.names())
            .finish()
    }
}

fn non_empty_or_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

fn non_empty(value: &str) -> bool {
    !value.is_empty()
}

fn is_email(value: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("valid regex"))
        .is_match(value)
}

fn is_uuid(value: &str) -> bool {
    uuid::Uuid::try_parse(value).is_ok()
}

fn is_date_time(value: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(value).is_ok()
}

fn is_uri(value: &str) -> bool {
    static URI: OnceLock<Regex> = OnceLock::new();
    URI.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:[^\s]+$").expect("valid regex"))
        .is_match(value)
}
