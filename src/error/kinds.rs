use std::{fmt, io};

use crate::error::mongo::format_mongodb_error;

/// Crate-wide `Result` type using [`FerryError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, FerryError>;

/// Top-level error type for mongo-ferry operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum FerryError {
    /// Connection-related errors.
    Connection(ConnectionError),

    /// A document could not be written as a JSON line.
    Encoding(EncodingError),

    /// A JSON line could not be turned back into a document.
    Decoding(DecodingError),

    /// Batch transfer errors.
    Transfer(TransferError),

    /// Cluster registry errors.
    Registry(RegistryError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Not currently connected to MongoDB.
    NotConnected,

    /// Ping command failed.
    PingFailed(String),
}

/// Errors raised while encoding a document into a JSON line.
#[derive(Debug)]
pub enum EncodingError {
    /// A binary field does not hold UTF-8 text.
    InvalidUtf8Binary { field: String },

    /// NaN or infinite floating point values have no JSON form.
    NonFiniteNumber { field: String },

    /// A date lies outside the range ISO-8601 strings can express.
    DateOutOfRange { field: String, millis: i64 },

    /// The JSON serializer rejected the encoded value.
    Json(serde_json::Error),
}

/// Errors raised while decoding a JSON line into a document.
#[derive(Debug)]
pub enum DecodingError {
    /// The line is not valid JSON.
    InvalidJson { line: u64, message: String },

    /// The line is valid JSON but not an object.
    NotAnObject { line: u64 },

    /// The JSON object could not be represented as BSON.
    InvalidBson { line: u64, message: String },
}

/// Errors raised by the batch transfer engine.
#[derive(Debug)]
pub enum TransferError {
    /// The requested offset skips past every line of the file.
    OffsetBeyondEnd { offset: u64, lines: u64 },

    /// A bulk insert stopped part way through.
    PartialInsert {
        inserted: usize,
        failed: usize,
        message: String,
    },

    /// The destination path cannot hold a JSON Lines file.
    InvalidDestination(String),
}

/// Cluster registry errors.
#[derive(Debug)]
pub enum RegistryError {
    /// Registry file not found.
    FileNotFound(String),

    /// Registry file is not a mapping of alias to URI.
    InvalidFormat(String),

    /// Alias missing from the registry.
    AliasNotFound { alias: String, known: Vec<String> },
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Generic configuration problem.
    Generic(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for FerryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FerryError::Connection(e) => write!(f, "Connection error: {e}"),
            FerryError::Encoding(e) => write!(f, "Encoding error: {e}"),
            FerryError::Decoding(e) => write!(f, "Decoding error: {e}"),
            FerryError::Transfer(e) => write!(f, "Transfer error: {e}"),
            FerryError::Registry(e) => write!(f, "Cluster registry error: {e}"),
            FerryError::Config(e) => write!(f, "Configuration error: {e}"),
            FerryError::Io(e) => write!(f, "I/O error: {e}"),
            FerryError::MongoDb(e) => format_mongodb_error(f, e),
            FerryError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::NotConnected => write!(f, "Not connected to MongoDB"),
            ConnectionError::PingFailed(msg) => write!(f, "Ping failed: {msg}"),
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingError::InvalidUtf8Binary { field } => {
                write!(f, "binary field '{field}' is not valid UTF-8 text")
            }
            EncodingError::NonFiniteNumber { field } => {
                write!(f, "field '{field}' holds a non-finite number")
            }
            EncodingError::DateOutOfRange { field, millis } => {
                write!(f, "date field '{field}' is out of range ({millis} ms)")
            }
            EncodingError::Json(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for DecodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodingError::InvalidJson { line, message } => {
                write!(f, "line {line} is not valid JSON: {message}")
            }
            DecodingError::NotAnObject { line } => {
                write!(f, "line {line} is not a JSON object")
            }
            DecodingError::InvalidBson { line, message } => {
                write!(f, "line {line} cannot be stored as a document: {message}")
            }
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::OffsetBeyondEnd { offset, lines } => write!(
                f,
                "Offset {offset} is greater than the number of lines in the file ({lines})"
            ),
            TransferError::PartialInsert {
                inserted,
                failed,
                message,
            } => write!(
                f,
                "Bulk insert stopped after {inserted} documents ({failed} failed): {message}"
            ),
            TransferError::InvalidDestination(msg) => write!(f, "Invalid destination: {msg}"),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::FileNotFound(path) => write!(f, "Registry file not found: {path}"),
            RegistryError::InvalidFormat(msg) => write!(f, "Invalid registry format: {msg}"),
            RegistryError::AliasNotFound { alias, known } => {
                if known.is_empty() {
                    write!(f, "Cluster '{alias}' not found (registry is empty)")
                } else {
                    write!(
                        f,
                        "Cluster '{alias}' not found. Known clusters: {}",
                        known.join(", ")
                    )
                }
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for FerryError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for EncodingError {}
impl std::error::Error for DecodingError {}
impl std::error::Error for TransferError {}
impl std::error::Error for RegistryError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to FerryError ========================= */

impl From<io::Error> for FerryError {
    fn from(err: io::Error) -> Self {
        FerryError::Io(err)
    }
}

impl From<mongodb::error::Error> for FerryError {
    fn from(err: mongodb::error::Error) -> Self {
        FerryError::MongoDb(err)
    }
}

impl From<ConnectionError> for FerryError {
    fn from(err: ConnectionError) -> Self {
        FerryError::Connection(err)
    }
}

impl From<EncodingError> for FerryError {
    fn from(err: EncodingError) -> Self {
        FerryError::Encoding(err)
    }
}

impl From<DecodingError> for FerryError {
    fn from(err: DecodingError) -> Self {
        FerryError::Decoding(err)
    }
}

impl From<TransferError> for FerryError {
    fn from(err: TransferError) -> Self {
        FerryError::Transfer(err)
    }
}

impl From<RegistryError> for FerryError {
    fn from(err: RegistryError) -> Self {
        FerryError::Registry(err)
    }
}

impl From<ConfigError> for FerryError {
    fn from(err: ConfigError) -> Self {
        FerryError::Config(err)
    }
}

impl From<String> for FerryError {
    fn from(msg: String) -> Self {
        FerryError::Generic(msg)
    }
}

impl From<&str> for FerryError {
    fn from(msg: &str) -> Self {
        FerryError::Generic(msg.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_not_found_lists_known_clusters() {
        let err = FerryError::from(RegistryError::AliasNotFound {
            alias: "prod".to_string(),
            known: vec!["dev".to_string(), "staging".to_string()],
        });
        let msg = err.to_string();
        assert!(msg.contains("'prod'"));
        assert!(msg.contains("dev, staging"));
    }

    #[test]
    fn test_offset_beyond_end_message() {
        let err = TransferError::OffsetBeyondEnd {
            offset: 10,
            lines: 3,
        };
        assert_eq!(
            err.to_string(),
            "Offset 10 is greater than the number of lines in the file (3)"
        );
    }

    #[test]
    fn test_string_conversion_is_generic() {
        let err: FerryError = "boom".into();
        assert!(matches!(err, FerryError::Generic(ref m) if m == "boom"));
    }
}
