//! Typed views over decoded update-check payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a plugin update-check request: installed plugins keyed by
/// identifier, plus the identifiers of currently-active plugins. Fields the
/// filter does not touch ride along in `rest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginPayload {
    #[serde(default)]
    pub plugins: Map<String, Value>,
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Body of a theme update-check request: installed themes keyed by slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemePayload {
    #[serde(default)]
    pub themes: Map<String, Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl PluginPayload {
    /// Removes `identifier` from the plugin map and the active list as one
    /// step; a blocked plugin must disappear from both or neither.
    pub fn remove(&mut self, identifier: &str) {
        self.plugins.remove(identifier);
        self.active.retain(|active| active != identifier);
    }
}

impl ThemePayload {
    pub fn remove(&mut self, slug: &str) {
        self.themes.remove(slug);
    }
}
