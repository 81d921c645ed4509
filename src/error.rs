//! Error types for Melon
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using MelonError
pub type Result<T> = std::result::Result<T, MelonError>;

/// Unified error type for Melon operations
#[derive(Debug, Error)]
pub enum MelonError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Memory Errors
    // -------------------------------------------------------------------------
    #[error("Allocation failed: {0}")]
    AllocationFailed(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // -------------------------------------------------------------------------
    // Capability Errors
    // -------------------------------------------------------------------------
    #[error("Read only: {0}")]
    ReadOnly(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    // -------------------------------------------------------------------------
    // Stream Errors
    // -------------------------------------------------------------------------
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
