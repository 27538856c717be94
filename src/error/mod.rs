//! Error handling for transfer operations.
//!
//! This module provides:
//! - A single crate-wide error type wrapping connection, codec, transfer,
//!   registry and configuration failures
//! - Structured JSON rendering of MongoDB driver errors
//! - Translation of `insertMany` failures into partial insert reports

pub mod kinds;
pub mod mongo;

pub use kinds::{
    ConfigError, ConnectionError, DecodingError, EncodingError, FerryError, RegistryError,
    Result, TransferError,
};
pub use mongo::ErrorInfo;
