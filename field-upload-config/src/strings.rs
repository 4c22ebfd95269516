//! Localized message templates shown to the user.

use serde::{Deserialize, Serialize};

/// Placeholder substituted by the `format_*` helpers.
pub const COUNT_PLACEHOLDER: &str = "%n";

/// User-facing strings for the upload control.
///
/// Templates containing `%n` are rendered through the matching `format_*`
/// helper; every occurrence of the placeholder is replaced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadStrings {
    /// Alert shown when a selection exceeds the field's file limit.
    #[serde(default = "crate::defaults::file_limit")]
    pub file_limit: String,

    /// Per-file message for files over the size cap (`%n` = size in MB).
    #[serde(default = "crate::defaults::max_file_size_error")]
    pub max_file_size_error: String,

    /// Inline error when the transfer returned no usable result.
    #[serde(default = "crate::defaults::unknown_upload_error")]
    pub unknown_upload_error: String,

    /// Inline error when the server rejected the upload outright.
    #[serde(default = "crate::defaults::upload_error")]
    pub upload_error: String,

    /// Reason attached to the submit-disable request while a transfer runs.
    #[serde(default = "crate::defaults::upload_in_progress")]
    pub upload_in_progress: String,
}

impl Default for UploadStrings {
    fn default() -> Self {
        Self {
            file_limit: crate::defaults::file_limit(),
            max_file_size_error: crate::defaults::max_file_size_error(),
            unknown_upload_error: crate::defaults::unknown_upload_error(),
            upload_error: crate::defaults::upload_error(),
            upload_in_progress: crate::defaults::upload_in_progress(),
        }
    }
}

impl UploadStrings {
    /// Render the file-limit alert for `limit`.
    pub fn format_file_limit(&self, limit: u32) -> String {
        self.file_limit.replace(COUNT_PLACEHOLDER, &limit.to_string())
    }

    /// Render the max-file-size message. `size_mb` is shown as configured by
    /// the field (it may be fractional or a plain label).
    pub fn format_max_file_size(&self, size_mb: &str) -> String {
        self.max_file_size_error.replace(COUNT_PLACEHOLDER, size_mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_limit_substitutes_every_placeholder() {
        let strings = UploadStrings {
            file_limit: "max %n (%n)".to_string(),
            ..UploadStrings::default()
        };
        assert_eq!(strings.format_file_limit(3), "max 3 (3)");
    }

    #[test]
    fn test_format_max_file_size() {
        let strings = UploadStrings::default();
        assert_eq!(
            strings.format_max_file_size("2"),
            "File exceeds maximum file size. File must be under 2MB."
        );
    }
}
