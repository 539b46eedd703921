//! Filesystem projection: turning paths into payloads and back.
//!
//! The archive engine only ever sees [`Payload`]s. This module is the one
//! place that touches a filesystem, through the [`Filesystem`] trait so the
//! gather and scatter rules can be exercised without a real disk.

use crate::config::ExtractionOptions;
use crate::error::{Result, ZipError};
use crate::payload::Payload;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A regular file found under a walked directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the walk root
    pub relative: PathBuf,
    pub size: u64,
}

/// Filesystem capabilities needed by gather and scatter
pub trait Filesystem {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> Result<bool>;

    /// Every regular file below `root`, depth-first in name order
    fn walk_files(&self, root: &Path) -> Result<Vec<FileRecord>>;

    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;
}

/// The local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> Result<bool> {
        Ok(fs::metadata(path)?.is_dir())
    }

    fn walk_files(&self, root: &Path) -> Result<Vec<FileRecord>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry?;
            // Directories, FIFOs, sockets and devices carry no file content
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
                .to_path_buf();
            files.push(FileRecord {
                relative,
                size: entry.metadata()?.len(),
            });
        }

        Ok(files)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        if !fs::metadata(path)?.is_file() {
            return Err(ZipError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            )));
        }
        Ok(fs::read(path)?)
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        Ok(fs::write(path, data)?)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        Ok(fs::create_dir_all(path)?)
    }
}

/// Read input paths into payloads.
///
/// A file becomes one payload named by its base name. A directory
/// contributes every file below it, named `<dir base name>/<relative path>`
/// with `/` separators. Empty directories contribute nothing.
pub fn gather<F: Filesystem, P: AsRef<Path>>(fs: &F, inputs: &[P]) -> Result<Vec<Payload>> {
    let mut payloads = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        if !fs.exists(input) {
            return Err(ZipError::PathNotFound(input.to_path_buf()));
        }

        let base = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        if fs.is_dir(input)? {
            let files = fs.walk_files(input)?;
            debug!(path = %input.display(), files = files.len(), "gathering directory");

            for record in files {
                let relative = slash_path(&record.relative);
                let name = match &base {
                    Some(base) => format!("{}/{}", base, relative),
                    None => relative,
                };
                let data = fs.read(&input.join(&record.relative))?;
                payloads.push(Payload::new(name, data));
            }
        } else {
            let name = base.ok_or_else(|| ZipError::PathNotFound(input.to_path_buf()))?;
            let data = fs.read(input)?;
            payloads.push(Payload::new(name, data));
        }
    }

    Ok(payloads)
}

/// Write payloads under `out_dir`, returning the names of files written.
///
/// Existing files are skipped unless `overwrite_existing` is set. Directory
/// payloads are created but not reported.
pub fn scatter<F: Filesystem>(
    fs: &F,
    payloads: &[Payload],
    out_dir: &Path,
    options: &ExtractionOptions,
) -> Result<Vec<String>> {
    if fs.exists(out_dir) {
        if !fs.is_dir(out_dir)? {
            return Err(ZipError::OutputNotADirectory(out_dir.to_path_buf()));
        }
    } else if options.create_missing_directories {
        fs.create_dir_all(out_dir)?;
    } else {
        return Err(ZipError::OutputDirectoryMissing(out_dir.to_path_buf()));
    }

    let mut written = Vec::with_capacity(payloads.len());

    for payload in payloads {
        let relative = safe_relative_path(&payload.name)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = out_dir.join(&relative);

        if payload.is_directory() {
            fs.create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            if !fs.exists(parent) {
                fs.create_dir_all(parent)?;
            }
        }

        if fs.exists(&target) && !options.overwrite_existing {
            warn!(path = %target.display(), "skipping existing file");
            continue;
        }

        fs.write(&target, &payload.data)?;
        written.push(payload.name.clone());
    }

    debug!(out_dir = %out_dir.display(), files = written.len(), "scatter complete");
    Ok(written)
}

/// Relative path components joined with `/`
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map an entry name to a path that stays under the output directory
fn safe_relative_path(name: &str) -> Result<PathBuf> {
    let unified = name.replace('\\', "/");
    if unified.starts_with('/') {
        return Err(ZipError::UnsafeEntryName(name.to_string()));
    }

    let mut path = PathBuf::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(ZipError::UnsafeEntryName(name.to_string())),
            _ => {
                let mut components = Path::new(segment).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(part)), None) => path.push(part),
                    _ => return Err(ZipError::UnsafeEntryName(name.to_string())),
                }
            }
        }
    }

    Ok(path)
}
