//! Default-shape templates per (collection, version)

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::{json, Value};

/// Registration table of default-shape documents
///
/// Keyed by (collection, version). Templates are read-only once registered;
/// the sync layer never mutates them.
pub struct SchemaTemplates {
    templates: RwLock<HashMap<(String, String), Value>>,
}

impl SchemaTemplates {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Create a table pre-loaded with the default shapes for the three
    /// built-in collections
    pub fn builtin() -> Self {
        let templates = Self::new();

        templates.register(
            "domains",
            "1",
            json!({
                "version": "1",
                "name": "",
                "plan": "free",
                "settings": {
                    "notifications": true,
                    "public": false
                }
            }),
        );

        templates.register(
            "members",
            "1",
            json!({
                "version": "1",
                "name": "",
                "role": "viewer",
                "avatar": ""
            }),
        );

        templates.register(
            "workboxes",
            "1",
            json!({
                "version": "1",
                "name": "",
                "domain_id": "",
                "domain_name": "",
                "archived": false,
                "layout": {
                    "columns": 3,
                    "compact": false
                }
            }),
        );

        templates
    }

    /// Register the template for a (collection, version) pair
    pub fn register(&self, collection: &str, version: &str, defaults: Value) {
        self.templates
            .write()
            .insert((collection.to_string(), version.to_string()), defaults);
    }

    /// Look up a template; `None` means records of this shape are treated
    /// as already current
    pub fn get(&self, collection: &str, version: &str) -> Option<Value> {
        self.templates
            .read()
            .get(&(collection.to_string(), version.to_string()))
            .cloned()
    }
}

impl Default for SchemaTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}
