use std::fmt;

use serde::{Deserialize, Serialize};

use super::kinds::TransferError;

/// Structured error information extracted from MongoDB errors.
///
/// Rendered as JSON when a driver error reaches the CLI boundary.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub(crate) error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) failed_documents: Option<usize>,
}

/// Format MongoDB error messages as pretty JSON wrapped in an `error` field.
///
/// Used by the `Display` implementation of `FerryError::MongoDb`.
pub fn format_mongodb_error(
    f: &mut fmt::Formatter<'_>,
    error: &mongodb::error::Error,
) -> fmt::Result {
    let info = extract_error_info(error);
    let wrapper = serde_json::json!({ "error": info });
    let json_output = serde_json::to_string_pretty(&wrapper).map_err(|_| fmt::Error)?;
    write!(f, "\n{json_output}")
}

/// Extract structured information from a MongoDB error using the driver API.
pub fn extract_error_info(error: &mongodb::error::Error) -> ErrorInfo {
    use mongodb::error::{ErrorKind, WriteFailure};

    let mut info = ErrorInfo::default();

    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            info.error_type = Some("mongo.write_error".to_string());
            info.code = Some(write_error.code);
            info.message = Some(write_error.message.clone());
            info.name = get_error_name(write_error.code);
        }
        ErrorKind::Command(command_error) => {
            info.error_type = Some("mongo.command_error".to_string());
            info.code = Some(command_error.code);
            info.message = Some(command_error.message.clone());
            info.name = get_error_name(command_error.code);
        }
        ErrorKind::InsertMany(insert_error) => {
            info.error_type = Some("mongo.insert_many_error".to_string());

            if let Some(write_errors) = &insert_error.write_errors {
                info.failed_documents = Some(write_errors.len());
                if let Some(first_error) = write_errors.first() {
                    info.code = Some(first_error.code);
                    info.message = Some(first_error.message.clone());
                    info.name = get_error_name(first_error.code);
                }
            } else if let Some(wc_error) = &insert_error.write_concern_error {
                info.code = Some(wc_error.code);
                info.message = Some(wc_error.message.clone());
                info.name = get_error_name(wc_error.code);
            }
        }
        ErrorKind::Authentication { message, .. } => {
            info.error_type = Some("mongo.authentication_error".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::InvalidArgument { message, .. } => {
            info.error_type = Some("mongo.invalid_argument".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::ServerSelection { message, .. } => {
            info.error_type = Some("mongo.server_selection_error".to_string());
            info.message = Some(message.clone());
        }
        _ => {
            info.message = Some(error.to_string());
        }
    }

    if let Some(code) = info.code {
        if code == 11000 || code == 11001 {
            info.message = Some("Duplicate key error".to_string());
        }
    }

    info
}

/// Translate an `insertMany` failure into a partial insert report.
///
/// Inserts are ordered, so the index of the first failed write is the
/// number of documents that reached the server. Returns `None` for any
/// other kind of driver error.
pub fn partial_insert_from(
    error: &mongodb::error::Error,
    batch_len: usize,
) -> Option<TransferError> {
    use mongodb::error::ErrorKind;

    let ErrorKind::InsertMany(insert_error) = error.kind.as_ref() else {
        return None;
    };

    let info = extract_error_info(error);
    let (inserted, failed) = match &insert_error.write_errors {
        Some(write_errors) => {
            let inserted = write_errors.first().map(|e| e.index).unwrap_or(batch_len);
            (inserted, batch_len.saturating_sub(inserted))
        }
        // Write concern failures are reported after every document was applied.
        None => (batch_len, 0),
    };

    Some(TransferError::PartialInsert {
        inserted,
        failed,
        message: info
            .message
            .unwrap_or_else(|| "insertMany failed".to_string()),
    })
}

/// Get a human-readable error name from a MongoDB error code.
fn get_error_name(code: i32) -> Option<String> {
    let name = match code {
        11000 | 11001 => "DuplicateKey",
        13 => "Unauthorized",
        18 => "AuthenticationFailed",
        26 => "NamespaceNotFound",
        50 => "MaxTimeMSExpired",
        121 => "DocumentValidationFailure",
        _ => return None,
    };

    Some(name.to_string())
}
