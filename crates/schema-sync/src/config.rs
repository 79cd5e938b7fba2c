//! Document configuration.

use serde::Deserialize;

/// Decoder limits and commit behavior.
///
/// Every field has a default, so partial configuration sources work:
///
/// ```
/// let config: schema_sync::DocumentConfig =
///     serde_json::from_str(r#"{ "staged_diffs": true }"#).unwrap();
/// assert!(config.staged_diffs);
/// assert_eq!(config.max_string_bytes, 1 << 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Longest string payload the decoder accepts.
    pub max_string_bytes: usize,
    /// Most operations one frame may carry.
    pub max_ops_per_frame: usize,
    /// Apply diffs to a copy and commit only if the whole frame decodes.
    pub staged_diffs: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_string_bytes: 1 << 20,
            max_ops_per_frame: 1 << 20,
            staged_diffs: false,
        }
    }
}
