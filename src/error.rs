use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for zipvault operations
pub type Result<T> = std::result::Result<T, ZipError>;

/// Unified error type for all archive operations
#[derive(Debug, Error)]
pub enum ZipError {
    // Filesystem projection errors
    #[error("Input path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Output path is not a directory: {}", .0.display())]
    OutputNotADirectory(PathBuf),

    #[error("Output directory does not exist: {}", .0.display())]
    OutputDirectoryMissing(PathBuf),

    #[error("Output file {} already exists", .0.display())]
    OutputExists(PathBuf),

    #[error("Entry name escapes the output directory: {0}")]
    UnsafeEntryName(String),

    // Archive errors
    #[error("Entry name must not be empty")]
    EmptyName,

    #[error("Not a ZIP archive: {0}")]
    NotAZip(String),

    #[error("Wrong or missing password for entry: {0}")]
    WrongPassword(String),

    #[error("Corrupt entry {name}: {reason}")]
    CorruptEntry { name: String, reason: String },

    #[error("Unsupported encryption strength: {0} (expected 1, 2 or 3)")]
    UnsupportedEncryptionStrength(u8),

    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    #[error("Unsupported archive feature: {0}")]
    Unsupported(String),

    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),

    // Configuration errors
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl ZipError {
    pub(crate) fn corrupt(name: &str, reason: impl Into<String>) -> Self {
        ZipError::CorruptEntry {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for ZipError {
    fn from(err: toml::de::Error) -> Self {
        ZipError::Config(err.to_string())
    }
}
