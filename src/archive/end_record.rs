use crate::archive::format::{
    decode_cp437, field_len, read_bytes, read_u16, read_u32, END_OF_CENTRAL_DIRECTORY_SIGNATURE,
    MAX_FIELD_LENGTH,
};
use crate::error::{Result, ZipError};
use std::io::{Read, Write};
use tracing::debug;

/// End of central directory record size without the comment
pub const END_RECORD_SIZE: usize = 22;

/// End of Central Directory Record (EOCD)
///
/// Located at the very end of the archive, optionally followed only by the
/// archive comment. Readers find it by scanning backwards from the end of the
/// buffer, since the comment makes its offset variable.
///
/// Structure (22 bytes + comment):
/// - Signature: "PK\x05\x06" (4 bytes)
/// - Number of this disk / disk with central directory: uint16 + uint16
/// - Entries on this disk / total entries: uint16 + uint16
/// - Central Directory Size: uint32
/// - Central Directory Offset: uint32
/// - Comment length: uint16, then comment bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndRecord {
    pub disk_number: u16,
    pub disk_with_central_directory: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub central_directory_size: u32,
    pub central_directory_offset: u32,
    pub comment: Vec<u8>,
}

impl EndRecord {
    /// Create a single-disk end record
    pub fn new(
        entry_count: u16,
        central_directory_size: u32,
        central_directory_offset: u32,
        comment: Vec<u8>,
    ) -> Self {
        Self {
            disk_number: 0,
            disk_with_central_directory: 0,
            disk_entries: entry_count,
            total_entries: entry_count,
            central_directory_size,
            central_directory_offset,
            comment,
        }
    }

    /// Write end record to a writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize> {
        let comment_len = field_len(self.comment.len(), "archive comment")?;

        writer.write_all(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes())?;
        writer.write_all(&self.disk_number.to_le_bytes())?;
        writer.write_all(&self.disk_with_central_directory.to_le_bytes())?;
        writer.write_all(&self.disk_entries.to_le_bytes())?;
        writer.write_all(&self.total_entries.to_le_bytes())?;
        writer.write_all(&self.central_directory_size.to_le_bytes())?;
        writer.write_all(&self.central_directory_offset.to_le_bytes())?;
        writer.write_all(&comment_len.to_le_bytes())?;
        writer.write_all(&self.comment)?;

        Ok(END_RECORD_SIZE + self.comment.len())
    }

    /// Read end record from a reader
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        if read_u32(&mut reader)? != END_OF_CENTRAL_DIRECTORY_SIGNATURE {
            return Err(ZipError::NotAZip(
                "invalid end of central directory signature".to_string(),
            ));
        }

        let disk_number = read_u16(&mut reader)?;
        let disk_with_central_directory = read_u16(&mut reader)?;
        let disk_entries = read_u16(&mut reader)?;
        let total_entries = read_u16(&mut reader)?;
        let central_directory_size = read_u32(&mut reader)?;
        let central_directory_offset = read_u32(&mut reader)?;
        let comment_len = read_u16(&mut reader)? as usize;
        let comment = read_bytes(&mut reader, comment_len)?;

        Ok(Self {
            disk_number,
            disk_with_central_directory,
            disk_entries,
            total_entries,
            central_directory_size,
            central_directory_offset,
            comment,
        })
    }

    /// Find the end record by scanning backwards from the end of `data`.
    ///
    /// A candidate signature only counts when its comment length accounts
    /// for exactly the remaining bytes, so signature bytes that happen to
    /// appear inside a comment are skipped. Returns the record and its offset.
    pub fn locate(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < END_RECORD_SIZE {
            return Err(ZipError::NotAZip(format!(
                "{} bytes is too short for an end of central directory record",
                data.len()
            )));
        }

        let last = data.len() - END_RECORD_SIZE;
        let first = last.saturating_sub(MAX_FIELD_LENGTH);
        let signature = END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes();

        // Last record whose comment fits but leaves bytes behind it
        let mut trailing_match = None;

        for offset in (first..=last).rev() {
            if data[offset..offset + 4] != signature {
                continue;
            }
            let comment_len = u16::from_le_bytes([data[offset + 20], data[offset + 21]]) as usize;
            let end = offset + END_RECORD_SIZE + comment_len;
            if end == data.len() {
                let record = Self::read_from(&data[offset..])?;
                return Ok((record, offset));
            }
            if end < data.len() && trailing_match.is_none() {
                trailing_match = Some(offset);
            }
        }

        if let Some(offset) = trailing_match {
            let record = Self::read_from(&data[offset..])?;
            debug!(
                offset,
                trailing = data.len() - offset - END_RECORD_SIZE - record.comment.len(),
                "end record followed by trailing bytes"
            );
            return Ok((record, offset));
        }

        Err(ZipError::NotAZip(
            "end of central directory record not found".to_string(),
        ))
    }

    /// Whether any field carries the ZIP64 marker value
    pub fn is_zip64(&self) -> bool {
        self.disk_entries == u16::MAX
            || self.total_entries == u16::MAX
            || self.central_directory_size == u32::MAX
            || self.central_directory_offset == u32::MAX
    }

    /// Archive comment, if one was stored
    pub fn comment_text(&self) -> Option<String> {
        if self.comment.is_empty() {
            None
        } else {
            // No flag covers the archive comment; take UTF-8 when it parses
            Some(match std::str::from_utf8(&self.comment) {
                Ok(text) => text.to_string(),
                Err(_) => decode_cp437(&self.comment),
            })
        }
    }

    /// Reject layouts this reader does not handle
    pub fn validate(&self) -> Result<()> {
        if self.is_zip64() {
            return Err(ZipError::Unsupported("ZIP64 archives".to_string()));
        }
        if self.disk_number != 0
            || self.disk_with_central_directory != 0
            || self.disk_entries != self.total_entries
        {
            return Err(ZipError::Unsupported("multi-volume archives".to_string()));
        }
        Ok(())
    }
}
