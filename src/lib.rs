//! zipvault: in-memory ZIP archives with optional password protection
//!
//! This library provides:
//! - A ZIP writer and reader over byte buffers (stored and deflated entries)
//! - WinZip AES (128/192/256) and traditional PKWARE encryption
//! - Archive summaries computed from the central directory alone
//! - Projection between the local filesystem and named payloads
//!
//! # Example
//!
//! ```no_run
//! use zipvault::{compress, decompress, ArchiveOptions, Payload};
//!
//! let payloads = vec![Payload::new("data.txt", b"Hello, World!".to_vec())];
//! let archive = compress(&payloads, &ArchiveOptions::with_password("secret"))?;
//!
//! let restored = decompress(&archive, Some("secret"))?;
//! assert_eq!(restored[0].data, b"Hello, World!");
//! # Ok::<(), zipvault::ZipError>(())
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod payload;
pub mod projection;
pub mod service;

pub use archive::{
    summarize, write_archive, AesStrength, ArchiveEntryMetadata, ArchiveMetadata, ArchiveReader,
    ArchiveWriter, CompressionMethod, DosDateTime, EntryDescriptor,
};
pub use config::{ArchiveOptions, EngineConfig, ExtractionOptions, DEFAULT_LEVEL};
pub use error::{Result, ZipError};
pub use payload::Payload;
pub use projection::{gather, scatter, FileRecord, Filesystem, LocalFs};
pub use service::{
    compress, compress_paths_to_file, decompress, decompress_file_to_directory,
    gather_from_paths, inspect, inspect_file, scatter_to_directory,
};
