//! High-level archive operations.
//!
//! The in-memory operations (`compress`, `decompress`, `inspect`) never touch
//! a filesystem; the `*_file` and path variants compose them with the
//! projection layer over the local disk.

use crate::archive::{summarize, write_archive, ArchiveMetadata, ArchiveReader};
use crate::config::{ArchiveOptions, ExtractionOptions};
use crate::error::{Result, ZipError};
use crate::payload::Payload;
use crate::projection::{gather, scatter, Filesystem, LocalFs};
use std::fs;
use std::path::Path;
use tracing::info;

/// Build a ZIP archive from payloads
pub fn compress(payloads: &[Payload], options: &ArchiveOptions) -> Result<Vec<u8>> {
    let archive = write_archive(payloads, options)?;
    info!(
        entries = payloads.len(),
        bytes = archive.len(),
        encrypted = options.password.is_some(),
        "compressed payloads"
    );
    Ok(archive)
}

/// Decode every file entry of an archive, in archive order
pub fn decompress(archive: &[u8], password: Option<&str>) -> Result<Vec<Payload>> {
    let reader = ArchiveReader::open(archive)?;
    let payloads = reader.read_all(password)?;
    info!(
        entries = reader.entry_count(),
        files = payloads.len(),
        "decompressed archive"
    );
    Ok(payloads)
}

/// Summarize an archive from its central directory alone
pub fn inspect(archive: &[u8]) -> Result<ArchiveMetadata> {
    let reader = ArchiveReader::open(archive)?;
    Ok(summarize(&reader))
}

/// Read files and directories from the local disk into payloads
pub fn gather_from_paths<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<Payload>> {
    gather(&LocalFs, inputs)
}

/// Write payloads under a local directory
pub fn scatter_to_directory<P: AsRef<Path>>(
    payloads: &[Payload],
    out_dir: P,
    options: &ExtractionOptions,
) -> Result<Vec<String>> {
    scatter(&LocalFs, payloads, out_dir.as_ref(), options)
}

/// Gather `inputs` and write the archive to `output`
pub fn compress_paths_to_file<P: AsRef<Path>, Q: AsRef<Path>>(
    inputs: &[P],
    output: Q,
    options: &ArchiveOptions,
    overwrite: bool,
) -> Result<ArchiveMetadata> {
    let output = output.as_ref();
    if output.exists() && !overwrite {
        return Err(ZipError::OutputExists(output.to_path_buf()));
    }

    let payloads = gather_from_paths(inputs)?;
    let archive = compress(&payloads, options)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            LocalFs.create_dir_all(parent)?;
        }
    }
    fs::write(output, &archive)?;
    info!(path = %output.display(), bytes = archive.len(), "wrote archive");

    inspect(&archive)
}

/// Extract an archive file into a local directory
pub fn decompress_file_to_directory<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    out_dir: Q,
    options: &ExtractionOptions,
) -> Result<Vec<String>> {
    let archive = read_archive_file(archive_path.as_ref())?;
    let payloads = decompress(&archive, options.password.as_deref())?;
    scatter_to_directory(&payloads, out_dir, options)
}

/// Summarize an archive file
pub fn inspect_file<P: AsRef<Path>>(archive_path: P) -> Result<ArchiveMetadata> {
    let archive = read_archive_file(archive_path.as_ref())?;
    inspect(&archive)
}

fn read_archive_file(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(ZipError::PathNotFound(path.to_path_buf()));
    }
    Ok(fs::read(path)?)
}
