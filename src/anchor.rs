//! Per-document anchor name -> opaque id table.
//!
//! The core never owns the collaborator's native values, so this table
//! only ever hands out opaque ids, never references into allocated nodes.
//! A collaborator that wants to alias its own values keeps its own map
//! from anchor id to its value type.

use std::collections::HashMap;

slotmap::new_key_type! {
    /// An opaque small integer identifying an anchor within one document.
    pub struct AnchorId;
}

/// Maps anchor names to [`AnchorId`]s for a single document.
///
/// Cleared at `document-end`: anchor ids are never valid across documents.
#[derive(Default)]
pub struct AnchorTable {
    names: slotmap::SlotMap<AnchorId, String>,
    by_name: HashMap<String, AnchorId>,
}

impl AnchorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) an anchor name, returning a fresh id. Redefining
    /// an existing name is legal in YAML; later aliases resolve to the most
    /// recent definition.
    pub fn define(&mut self, name: &str) -> AnchorId {
        let id = self.names.insert(name.to_owned());
        self.by_name.insert(name.to_owned(), id);
        id
    }

    /// Resolve an alias's anchor name to the id it currently refers to.
    pub fn resolve(&self, name: &str) -> Option<AnchorId> {
        self.by_name.get(name).copied()
    }

    /// The source name an id was defined with.
    pub fn name(&self, id: AnchorId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Invalidate every anchor defined so far (called at document-end).
    pub fn clear(&mut self) {
        self.names.clear();
        self.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redefinition_shadows_earlier_alias_target() {
        let mut table = AnchorTable::new();
        let first = table.define("a");
        let second = table.define("a");
        assert_ne!(first, second);
        assert_eq!(table.resolve("a"), Some(second));
    }

    #[test]
    fn clear_invalidates_all_names() {
        let mut table = AnchorTable::new();
        table.define("a");
        table.clear();
        assert_eq!(table.resolve("a"), None);
    }
}
