use serde::{Deserialize, Serialize};

/// Reconciliation engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Keep runs of spaces visible with alternating non-breaking spaces
    pub visible_whitespace: bool,

    /// Remove children inserted by foreign code into engine-managed elements
    /// even when the element was not marked as externally mutated
    pub remove_foreign_children: bool,

    /// Tag of the mount element when the engine creates it
    pub mount_tag: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            visible_whitespace: true,
            remove_foreign_children: false,
            mount_tag: "div".to_string(),
        }
    }
}
