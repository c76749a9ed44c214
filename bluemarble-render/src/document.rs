//! Persisted template document: the JSON shape written to storage and used
//! for import/export.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::template::ColorUsage;

/// Value of `whoami` in documents this application understands.
pub const APP_TAG: &str = "BlueMarble";

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Version written to `scriptVersion`.
pub const SCRIPT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Storage key under which the whole document is persisted.
pub const STORAGE_KEY: &str = "bmTemplates";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    pub whoami: String,
    #[serde(default)]
    pub script_version: String,
    #[serde(default)]
    pub schema_version: String,
    /// Keyed by `"<sort_id> <author_id>"`.
    #[serde(default)]
    pub templates: BTreeMap<String, StoredTemplate>,
}

/// One template as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTemplate {
    #[serde(default)]
    pub name: String,
    /// `"tx, ty, px, py"`.
    #[serde(default)]
    pub coords: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tile key to `data:image/png;base64,` URL.
    #[serde(default)]
    pub tiles: BTreeMap<String, String>,
    /// `"r,g,b"` or `"other"` to usage.
    #[serde(default)]
    pub palette: BTreeMap<String, ColorUsage>,
}

fn default_true() -> bool {
    true
}

impl TemplateDocument {
    /// A document with no templates, stamped with this build's versions.
    pub fn empty() -> Self {
        Self {
            whoami: APP_TAG.to_string(),
            script_version: SCRIPT_VERSION.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            templates: BTreeMap::new(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        self.whoami == APP_TAG
    }

    /// Parse `json`. Returns `Ok(None)` for a well-formed document written by
    /// another application, without looking at its templates.
    pub fn from_json(json: &str) -> crate::Result<Option<Self>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.get("whoami").and_then(|w| w.as_str()) != Some(APP_TAG) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Split a storage key into `(sort_id, author_id)`.
pub fn parse_storage_key(key: &str) -> Option<(u32, String)> {
    let (sort_id, author_id) = key.split_once(' ')?;
    let sort_id = sort_id.parse().ok()?;
    if author_id.is_empty() {
        return None;
    }
    Some((sort_id, author_id.to_string()))
}
