//! Collection-name-to-class mapping and resolution.
//!
//! Names resolve through three strategies in fixed priority: the exact-name
//! table, the ordered regex table (first match wins), then the namespace
//! prefix convention. Anything else falls back to the caller's default
//! token. At most one strategy applies per lookup.

use std::collections::HashMap;

use bson::Document;
use regex_lite::Regex;

use crate::error::{OdmError, OdmResult};

/// A mapped class: the type token to construct, plus construction options.
///
/// A definition with no token inherits the default token at resolution
/// time; this lets a mapping attach options to the default type.
#[derive(Debug, Clone, Default)]
pub struct ClassDefinition {
    /// Registered type token, or `None` to use the lookup default.
    pub type_token: Option<String>,
    /// Options handed to the constructed instance and merged into
    /// server-side collection creation.
    pub options: Document,
}

impl ClassDefinition {
    /// Define a class by type token.
    pub fn new(type_token: impl Into<String>) -> Self {
        Self {
            type_token: Some(type_token.into()),
            options: Document::new(),
        }
    }

    /// Attach construction options.
    pub fn with_options(mut self, options: Document) -> Self {
        self.options = options;
        self
    }
}

impl From<&str> for ClassDefinition {
    fn from(type_token: &str) -> Self {
        Self::new(type_token)
    }
}

impl From<String> for ClassDefinition {
    fn from(type_token: String) -> Self {
        Self::new(type_token)
    }
}

/// The outcome of resolving a collection name.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClass {
    /// The type token to look up in the registry.
    pub type_token: String,
    /// Options carried over from the matched definition.
    pub options: Document,
    /// Capture groups from a regex match, empty otherwise.
    pub match_groups: Vec<String>,
}

/// The three mapping tables.
#[derive(Debug, Default)]
pub struct ClassMap {
    exact: HashMap<String, ClassDefinition>,
    regex: Vec<(Regex, ClassDefinition)>,
    prefix: Option<String>,
}

impl ClassMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapping for a collection name or pattern.
    ///
    /// A leading `/` marks the name as a regex pattern (a trailing `/` is
    /// stripped if present); patterns are tried in registration order.
    pub fn map(
        &mut self,
        name_or_pattern: &str,
        definition: impl Into<ClassDefinition>,
    ) -> OdmResult<()> {
        if let Some(pattern) = name_or_pattern.strip_prefix('/') {
            let pattern = pattern.strip_suffix('/').unwrap_or(pattern);
            let regex = Regex::new(pattern).map_err(|e| {
                OdmError::configuration(format!("invalid collection pattern '{}': {}", pattern, e))
            })?;
            self.regex.push((regex, definition.into()));
        } else {
            self.exact
                .insert(name_or_pattern.to_string(), definition.into());
        }
        Ok(())
    }

    /// Register a batch of mappings.
    pub fn map_all<I, N, D>(&mut self, entries: I) -> OdmResult<()>
    where
        I: IntoIterator<Item = (N, D)>,
        N: AsRef<str>,
        D: Into<ClassDefinition>,
    {
        for (name, definition) in entries {
            self.map(name.as_ref(), definition)?;
        }
        Ok(())
    }

    /// Register the namespace prefix used to synthesize tokens for
    /// otherwise unmapped names.
    pub fn map_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = Some(prefix.into());
    }

    /// The configured namespace prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Resolve a collection name to a class.
    ///
    /// Priority is exact match, then regex tables in insertion order, then
    /// the prefix convention, then `default_token`.
    pub fn resolve(&self, name: &str, default_token: &str) -> ResolvedClass {
        if let Some(definition) = self.exact.get(name) {
            return ResolvedClass {
                type_token: definition
                    .type_token
                    .clone()
                    .unwrap_or_else(|| default_token.to_string()),
                options: definition.options.clone(),
                match_groups: Vec::new(),
            };
        }

        for (pattern, definition) in &self.regex {
            if let Some(captures) = pattern.captures(name) {
                let match_groups = (1..captures.len())
                    .map(|i| {
                        captures
                            .get(i)
                            .map(|m| m.as_str().to_string())
                            .unwrap_or_default()
                    })
                    .collect();
                return ResolvedClass {
                    type_token: definition
                        .type_token
                        .clone()
                        .unwrap_or_else(|| default_token.to_string()),
                    options: definition.options.clone(),
                    match_groups,
                };
            }
        }

        if let Some(prefix) = &self.prefix {
            return ResolvedClass {
                type_token: synthesize_token(prefix, name),
                options: Document::new(),
                match_groups: Vec::new(),
            };
        }

        ResolvedClass {
            type_token: default_token.to_string(),
            options: Document::new(),
            match_groups: Vec::new(),
        }
    }
}

/// Synthesize a namespaced type token from a collection name: each
/// dot-separated segment gets its first ASCII character uppercased, and
/// the segments are rejoined under the prefix.
///
/// `"user.profile"` with prefix `"App.Models"` becomes
/// `"App.Models.User.Profile"`.
fn synthesize_token(prefix: &str, name: &str) -> String {
    let segments: Vec<String> = name.split('.').map(capitalize_first).collect();
    format!("{}.{}", prefix, segments.join("."))
}

fn capitalize_first(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    const DEFAULT: &str = "collection";

    #[test]
    fn test_unmapped_name_falls_back_to_default() {
        let map = ClassMap::new();
        let resolved = map.resolve("events", DEFAULT);
        assert_eq!(resolved.type_token, DEFAULT);
        assert!(resolved.options.is_empty());
        assert!(resolved.match_groups.is_empty());
    }

    #[test]
    fn test_exact_match() {
        let mut map = ClassMap::new();
        map.map("users", "app.User").unwrap();
        assert_eq!(map.resolve("users", DEFAULT).type_token, "app.User");
    }

    #[test]
    fn test_exact_definition_without_token_uses_default() {
        let mut map = ClassMap::new();
        map.map(
            "logs",
            ClassDefinition::default().with_options(doc! { "capped": true }),
        )
        .unwrap();

        let resolved = map.resolve("logs", DEFAULT);
        assert_eq!(resolved.type_token, DEFAULT);
        assert_eq!(resolved.options, doc! { "capped": true });
    }

    #[test]
    fn test_exact_wins_over_regex_and_prefix() {
        let mut map = ClassMap::new();
        map.map("users", "app.Exact").unwrap();
        map.map("/^users$/", "app.Pattern").unwrap();
        map.map_prefix("App");

        assert_eq!(map.resolve("users", DEFAULT).type_token, "app.Exact");
    }

    #[test]
    fn test_regex_wins_over_prefix() {
        let mut map = ClassMap::new();
        map.map("/^logs\\./", "app.Log").unwrap();
        map.map_prefix("App");

        assert_eq!(map.resolve("logs.2024", DEFAULT).type_token, "app.Log");
        assert_eq!(map.resolve("metrics", DEFAULT).type_token, "App.Metrics");
    }

    #[test]
    fn test_regex_insertion_order_first_match_wins() {
        let mut map = ClassMap::new();
        map.map("/^shard_/", "app.First").unwrap();
        map.map("/^shard_\\d+$/", "app.Second").unwrap();

        assert_eq!(map.resolve("shard_12", DEFAULT).type_token, "app.First");
    }

    #[test]
    fn test_regex_non_matching_patterns_are_skipped() {
        let mut map = ClassMap::new();
        map.map("/^archive\\./", "app.Archive").unwrap();
        map.map("/^queue_/", "app.Queue").unwrap();

        assert_eq!(map.resolve("queue_jobs", DEFAULT).type_token, "app.Queue");
    }

    #[test]
    fn test_regex_capture_groups_are_attached() {
        let mut map = ClassMap::new();
        map.map("/^logs\\.(\\d{4})\\.(\\d{2})$/", "app.Log").unwrap();

        let resolved = map.resolve("logs.2024.06", DEFAULT);
        assert_eq!(resolved.type_token, "app.Log");
        assert_eq!(resolved.match_groups, vec!["2024", "06"]);
    }

    #[test]
    fn test_regex_definition_without_token_uses_default() {
        let mut map = ClassMap::new();
        map.map(
            "/^tmp_/",
            ClassDefinition::default().with_options(doc! { "temp": true }),
        )
        .unwrap();

        let resolved = map.resolve("tmp_import", DEFAULT);
        assert_eq!(resolved.type_token, DEFAULT);
        assert_eq!(resolved.options, doc! { "temp": true });
    }

    #[test]
    fn test_invalid_pattern_is_a_configuration_error() {
        let mut map = ClassMap::new();
        let err = map.map("/^(unclosed/", "app.Broken").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_prefix_synthesis() {
        let mut map = ClassMap::new();
        map.map_prefix("App.Models");

        assert_eq!(
            map.resolve("user.profile", DEFAULT).type_token,
            "App.Models.User.Profile"
        );
        assert_eq!(
            map.resolve("billing.invoice.line", DEFAULT).type_token,
            "App.Models.Billing.Invoice.Line"
        );
    }

    #[test]
    fn test_prefix_synthesis_keeps_inner_characters() {
        let mut map = ClassMap::new();
        map.map_prefix("Ns");

        assert_eq!(map.resolve("a.b_c", DEFAULT).type_token, "Ns.A.B_c");
    }

    #[test]
    fn test_map_all() {
        let mut map = ClassMap::new();
        map.map_all([("users", "app.User"), ("/^logs\\./", "app.Log")])
            .unwrap();

        assert_eq!(map.resolve("users", DEFAULT).type_token, "app.User");
        assert_eq!(map.resolve("logs.app", DEFAULT).type_token, "app.Log");
    }
}
