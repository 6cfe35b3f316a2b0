//! Bidirectional mapping between tag URIs and small opaque tag identifiers.
//!
//! Pre-populates the well-known failsafe/JSON/core schema tag URIs at
//! fixed ids and registers any other URI the first time it is seen,
//! handing back the same id on every later lookup.

use std::collections::HashMap;

slotmap::new_key_type! {
    /// An opaque small integer identifying a tag URI.
    ///
    /// Two `TagId`s compare equal if and only if they were registered from
    /// the same URI in the same [`TagRegistry`].
    pub struct TagId;
}

/// Bidirectional URI <-> [`TagId`] table.
///
/// A `TagRegistry` is initialized with the well-known failsafe/JSON/core
/// schema tag URIs bound to fixed ids (see the `pub const`-returning
/// accessors below), and registers any further URI on first sight.
#[non_exhaustive]
pub struct TagRegistry {
    ids: slotmap::SlotMap<TagId, String>,
    by_uri: HashMap<String, TagId>,
    non_specific_bang: TagId,
    non_specific_question: TagId,
    str_tag: TagId,
    seq_tag: TagId,
    map_tag: TagId,
    null_tag: TagId,
    bool_tag: TagId,
    int_tag: TagId,
    float_tag: TagId,
    binary_tag: TagId,
    timestamp_tag: TagId,
    omap_tag: TagId,
    pairs_tag: TagId,
    set_tag: TagId,
    merge_tag: TagId,
    value_tag: TagId,
    yaml_tag: TagId,
}

const CORE_SCHEMA_PREFIX: &str = "tag:yaml.org,2002:";

impl TagRegistry {
    /// Create a registry with the well-known tags pre-populated.
    pub fn new() -> Self {
        let mut ids = slotmap::SlotMap::with_key();
        let mut by_uri = HashMap::new();

        // Non-specific tags are not real URIs; they are internal sentinels
        // for "untagged, resolve by content" (`?`) and "untagged, treat as
        // string" (`!`).
        let non_specific_bang = ids.insert(String::from("!"));
        let non_specific_question = ids.insert(String::from("?"));

        macro_rules! well_known {
            ($name:literal) => {{
                let uri = alloc_uri($name);
                let id = ids.insert(uri.clone());
                by_uri.insert(uri, id);
                id
            }};
        }

        let str_tag = well_known!("str");
        let seq_tag = well_known!("seq");
        let map_tag = well_known!("map");
        let null_tag = well_known!("null");
        let bool_tag = well_known!("bool");
        let int_tag = well_known!("int");
        let float_tag = well_known!("float");
        let binary_tag = well_known!("binary");
        let timestamp_tag = well_known!("timestamp");
        let omap_tag = well_known!("omap");
        let pairs_tag = well_known!("pairs");
        let set_tag = well_known!("set");
        let merge_tag = well_known!("merge");
        let value_tag = well_known!("value");
        let yaml_tag = well_known!("yaml");

        TagRegistry {
            ids,
            by_uri,
            non_specific_bang,
            non_specific_question,
            str_tag,
            seq_tag,
            map_tag,
            null_tag,
            bool_tag,
            int_tag,
            float_tag,
            binary_tag,
            timestamp_tag,
            omap_tag,
            pairs_tag,
            set_tag,
            merge_tag,
            value_tag,
            yaml_tag,
        }
    }

    /// Register a tag URI, returning its id. Registering the same URI twice
    /// returns the same id.
    pub fn register(&mut self, uri: impl Into<String>) -> TagId {
        let uri = uri.into();
        if let Some(&id) = self.by_uri.get(&uri) {
            return id;
        }
        let id = self.ids.insert(uri.clone());
        self.by_uri.insert(uri, id);
        id
    }

    /// Look up the URI a tag id was registered with.
    pub fn uri(&self, id: TagId) -> Option<&str> {
        self.ids.get(id).map(String::as_str)
    }

    /// Resolve a `%TAG`-declared handle plus a suffix into a full URI,
    /// using the handle -> prefix mapping in `directives` (per-document
    /// `%TAG` directives, shadowing the process-wide default of `!` ->
    /// empty prefix and `!!` -> `tag:yaml.org,2002:`).
    pub fn resolve<'a>(
        &self,
        handle: &str,
        suffix: &str,
        directives: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Option<String> {
        if handle.is_empty() {
            return Some(suffix.to_owned());
        }
        for (declared_handle, prefix) in directives {
            if declared_handle == handle {
                return Some(format!("{prefix}{suffix}"));
            }
        }
        None
    }

    pub fn non_specific_bang(&self) -> TagId {
        self.non_specific_bang
    }
    pub fn non_specific_question(&self) -> TagId {
        self.non_specific_question
    }
    pub fn str_tag(&self) -> TagId {
        self.str_tag
    }
    pub fn seq_tag(&self) -> TagId {
        self.seq_tag
    }
    pub fn map_tag(&self) -> TagId {
        self.map_tag
    }
    pub fn null_tag(&self) -> TagId {
        self.null_tag
    }
    pub fn bool_tag(&self) -> TagId {
        self.bool_tag
    }
    pub fn int_tag(&self) -> TagId {
        self.int_tag
    }
    pub fn float_tag(&self) -> TagId {
        self.float_tag
    }
    pub fn binary_tag(&self) -> TagId {
        self.binary_tag
    }
    pub fn timestamp_tag(&self) -> TagId {
        self.timestamp_tag
    }
    pub fn omap_tag(&self) -> TagId {
        self.omap_tag
    }
    pub fn pairs_tag(&self) -> TagId {
        self.pairs_tag
    }
    pub fn set_tag(&self) -> TagId {
        self.set_tag
    }
    pub fn merge_tag(&self) -> TagId {
        self.merge_tag
    }
    pub fn value_tag(&self) -> TagId {
        self.value_tag
    }
    pub fn yaml_tag(&self) -> TagId {
        self.yaml_tag
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn alloc_uri(name: &str) -> String {
    format!("{CORE_SCHEMA_PREFIX}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_tags_have_stable_uris() {
        let registry = TagRegistry::new();
        assert_eq!(registry.uri(registry.str_tag()), Some("tag:yaml.org,2002:str"));
        assert_eq!(registry.uri(registry.null_tag()), Some("tag:yaml.org,2002:null"));
        assert_ne!(registry.str_tag(), registry.int_tag());
    }

    #[test]
    fn register_is_idempotent() {
        let mut registry = TagRegistry::new();
        let a = registry.register("tag:example.com,2024:widget");
        let b = registry.register("tag:example.com,2024:widget");
        assert_eq!(a, b);
        assert_eq!(registry.uri(a), Some("tag:example.com,2024:widget"));
    }

    #[test]
    fn resolve_follows_document_directives_then_defaults() {
        let registry = TagRegistry::new();
        let directives = [("!!", "tag:yaml.org,2002:"), ("!e!", "tag:example.com,2024:")];
        assert_eq!(
            registry.resolve("!!", "str", directives),
            Some("tag:yaml.org,2002:str".to_owned())
        );
        assert_eq!(
            registry.resolve("!e!", "widget", directives),
            Some("tag:example.com,2024:widget".to_owned())
        );
        assert_eq!(registry.resolve("!x!", "widget", directives), None);
        assert_eq!(registry.resolve("", "literal", directives), Some("literal".to_owned()));
    }
}
