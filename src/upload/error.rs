use field_upload_config::UploadStrings;

use crate::field::FieldId;

/// Everything that can go wrong around one field's uploads.
///
/// None of these escape the controller: they are either turned into an
/// `add:error` request, an alert, or returned as an `Abort` decision to the
/// transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// The selection would push the field over its file limit
    #[error("file limit of {limit} exceeded")]
    LimitExceeded { limit: u32 },

    /// The transfer finished without a usable result
    #[error("unknown upload error")]
    UnknownUploadError,

    /// The server answered with its failure sentinel
    #[error("upload rejected by server")]
    UploadError,

    /// One file in the batch failed; carries the message from the transfer
    #[error("{0}")]
    PerFileError(String),

    /// The environment lacks native file-input support
    #[error("file input is not supported; control disabled")]
    ControlDisabled,

    /// A hook fired for a field that was never rendered
    #[error("no upload session for field {0}")]
    UnknownField(FieldId),
}

impl UploadError {
    /// Localized text shown to the user.
    pub fn user_message(&self, strings: &UploadStrings) -> String {
        match self {
            UploadError::LimitExceeded { limit } => strings.format_file_limit(*limit),
            UploadError::UnknownUploadError => strings.unknown_upload_error.clone(),
            UploadError::UploadError => strings.upload_error.clone(),
            UploadError::PerFileError(message) => message.clone(),
            UploadError::ControlDisabled | UploadError::UnknownField(_) => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_come_from_strings() {
        let strings = UploadStrings::default();
        assert_eq!(
            UploadError::LimitExceeded { limit: 3 }.user_message(&strings),
            "You can only upload 3 files."
        );
        assert_eq!(
            UploadError::UnknownUploadError.user_message(&strings),
            strings.unknown_upload_error
        );
        assert_eq!(
            UploadError::PerFileError("too big".into()).user_message(&strings),
            "too big"
        );
        assert_eq!(
            UploadError::UnknownField(FieldId(9)).user_message(&strings),
            "no upload session for field 9"
        );
    }
}
