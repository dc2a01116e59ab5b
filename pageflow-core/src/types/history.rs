//! The persisted history payload.

use crate::types::Stage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a navigation persists into browser history.
///
/// Restored verbatim on back/forward navigation; `prerender` is always
/// saved as `false` because a state restored from history never replays
/// the prerender path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The formatted address of the saved state.
    pub href: String,
    /// Opaque application data carried across save/restore.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Always `false` in persisted entries.
    #[serde(default)]
    pub prerender: bool,
    /// The stage the state had reached when it was saved.
    #[serde(default)]
    pub stage: Option<Stage>,
}

impl HistoryEntry {
    /// Create an entry for an address with no data.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            data: Map::new(),
            prerender: false,
            stage: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_roundtrip() {
        let mut entry = HistoryEntry::new("/articles?page=2");
        entry.data.insert("scroll".to_string(), json!(120));
        entry.stage = Some(Stage::Setup);

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
        assert!(!parsed.prerender);
    }

    #[test]
    fn missing_fields_default() {
        let parsed: HistoryEntry = serde_json::from_str(r#"{"href":"/a"}"#).unwrap();
        assert_eq!(parsed.href, "/a");
        assert!(parsed.data.is_empty());
        assert_eq!(parsed.stage, None);
    }
}
