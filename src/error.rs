//! Unified error types for the EspWebUI connectivity core.
//!
//! A single `Error` enum that every subsystem converts into, keeping error
//! handling at the cooperative loop uniform.  All variants are `Copy`.
//! There is no exception-style control flow in this core: non-fatal failures
//! are absorbed locally and surfaced through logging or the diagnostics
//! accessors.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the connectivity core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Persisted-config storage failed.
    Storage(StorageError),
    /// Secret-field encryption or decryption failed.
    Secret(SecretError),
    /// A message-bus operation failed.
    Bus(BusError),
    /// Configuration is invalid or could not be applied.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Secret(e) => write!(f, "secret: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The persisted config file does not exist (first boot).
    NotFound,
    /// The file exists but could not be read.
    ReadFailed,
    /// The file could not be created or written.
    WriteFailed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config file not found"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Secret codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretError {
    /// Plaintext exceeds the field's maximum length.
    TooLong,
    /// The stored blob is not valid hex or has odd length.
    Malformed,
    /// Decryption produced bytes that are not valid UTF-8.
    NotUtf8,
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong => write!(f, "plaintext too long"),
            Self::Malformed => write!(f, "malformed blob"),
            Self::NotUtf8 => write!(f, "decrypted data not UTF-8"),
        }
    }
}

impl From<SecretError> for Error {
    fn from(e: SecretError) -> Self {
        Self::Secret(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The inbound command queue is full; the message was dropped.
    QueueFull,
    /// Publish was attempted while the client is not connected.
    NotConnected,
    /// The transport rejected a publish.
    PublishFailed,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "inbound queue full"),
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishFailed => write!(f, "publish failed"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
