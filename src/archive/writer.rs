use crate::archive::central_directory::CentralDirectoryHeader;
use crate::archive::codec::{encode_entry, EncodedEntry};
use crate::archive::end_record::EndRecord;
use crate::archive::format::{field_u32, MAX_ENTRY_COUNT};
use crate::config::{ArchiveOptions, ResolvedOptions};
use crate::error::{Result, ZipError};
use crate::payload::Payload;
use rayon::prelude::*;
use tracing::debug;

/// Builds a ZIP archive in memory.
///
/// Entries are laid out in the order they are added; the central directory
/// and end record are appended by [`finish`](Self::finish). Nothing is
/// returned until the whole archive is assembled.
pub struct ArchiveWriter {
    buffer: Vec<u8>,
    entries: Vec<CentralDirectoryHeader>,
    options: ResolvedOptions,
}

impl ArchiveWriter {
    /// Create a writer, validating the options once
    pub fn new(options: &ArchiveOptions) -> Result<Self> {
        Ok(Self {
            buffer: Vec::new(),
            entries: Vec::new(),
            options: options.resolve()?,
        })
    }

    /// Add a file entry
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let encoded = encode_entry(name, data, &self.options.encode_settings())?;
        self.append(encoded)
    }

    /// Add an empty directory entry
    pub fn add_directory(&mut self, name: &str) -> Result<()> {
        let mut name = name.to_string();
        if !name.is_empty() && !name.ends_with('/') {
            name.push('/');
        }
        self.add_file(&name, &[])
    }

    /// Add a payload (file or directory, by its name)
    pub fn add_payload(&mut self, payload: &Payload) -> Result<()> {
        self.add_file(&payload.name, &payload.data)
    }

    /// Number of entries added so far
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Lay out an encoded entry at the current offset
    fn append(&mut self, encoded: EncodedEntry) -> Result<()> {
        let offset = self.buffer.len() as u64;

        // Build both headers before writing so a field overflow leaves the
        // buffer untouched
        let local = encoded.local_header()?;
        let central = encoded.central_header(offset)?;

        local.write_to(&mut self.buffer)?;
        self.buffer.extend_from_slice(&encoded.data);
        self.entries.push(central);

        Ok(())
    }

    /// Write the central directory and end record, returning the archive
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.entries.len() >= MAX_ENTRY_COUNT {
            return Err(ZipError::Unsupported(format!(
                "{} entries requires ZIP64",
                self.entries.len()
            )));
        }

        let cd_offset = self.buffer.len() as u64;
        for entry in &self.entries {
            entry.write_to(&mut self.buffer)?;
        }
        let cd_size = self.buffer.len() as u64 - cd_offset;

        let comment = self
            .options
            .comment
            .as_ref()
            .map(|c| c.as_bytes().to_vec())
            .unwrap_or_default();

        let end_record = EndRecord::new(
            self.entries.len() as u16,
            field_u32(cd_size, "central directory")?,
            field_u32(cd_offset, "central directory offset")?,
            comment,
        );
        end_record.write_to(&mut self.buffer)?;

        debug!(
            entries = self.entries.len(),
            bytes = self.buffer.len(),
            "archive assembled"
        );

        Ok(self.buffer)
    }
}

/// Build an archive from payloads in input order.
///
/// Compression and encryption run in parallel per payload; layout is
/// sequential so the output is identical to adding entries one by one.
pub fn write_archive(payloads: &[Payload], options: &ArchiveOptions) -> Result<Vec<u8>> {
    let mut writer = ArchiveWriter::new(options)?;
    let settings = writer.options.encode_settings();

    let encoded = payloads
        .par_iter()
        .map(|payload| encode_entry(&payload.name, &payload.data, &settings))
        .collect::<Result<Vec<_>>>()?;

    for entry in encoded {
        writer.append(entry)?;
    }

    writer.finish()
}
