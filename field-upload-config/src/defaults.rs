//! Default value functions for configuration.
//!
//! Used as `#[serde(default = "crate::defaults::...")]` attributes so that a
//! partial config file only overrides what it names.

/// Base URL of the upload endpoint.
pub fn ajax_url() -> String {
    "/wp-admin/admin-ajax.php".to_string()
}

/// Query action appended to the endpoint.
pub fn upload_action() -> String {
    "nf_fu_upload".to_string()
}

/// How long a completed progress bar stays visible before it is cleared.
pub fn progress_reset_delay_ms() -> u64 {
    1500
}

pub fn file_limit() -> String {
    "You can only upload %n files.".to_string()
}

pub fn max_file_size_error() -> String {
    "File exceeds maximum file size. File must be under %nMB.".to_string()
}

pub fn unknown_upload_error() -> String {
    "There was an unknown error uploading the file.".to_string()
}

pub fn upload_error() -> String {
    "Nonce error, upload failed.".to_string()
}

pub fn upload_in_progress() -> String {
    "File upload in progress.".to_string()
}

/// Upper bound accepted by validation for `progress_reset_delay_ms`.
pub const MAX_PROGRESS_RESET_DELAY_MS: u64 = 60_000;
