use crate::archive::format::{
    decode_text, field_len, read_bytes, read_u16, read_u32, DosDateTime,
    CENTRAL_DIRECTORY_SIGNATURE, CENTRAL_HEADER_SIZE,
};
use crate::error::{Result, ZipError};
use std::io::{Read, Write};

/// Central directory file header
///
/// One per entry, written after all entry data. Carries everything the
/// local header does plus the entry comment, attributes and the offset of
/// the local header, so listings never need to touch entry data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: Vec<u8>,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
    pub disk_number_start: u16,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader {
    /// Write entry to central directory
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize> {
        let name_len = field_len(self.name.len(), "entry name")?;
        let extra_len = field_len(self.extra.len(), "extra field")?;
        let comment_len = field_len(self.comment.len(), "entry comment")?;
        let (date, time) = self.modified.to_dos();

        writer.write_all(&CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes())?;
        writer.write_all(&self.version_made_by.to_le_bytes())?;
        writer.write_all(&self.version_needed.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        writer.write_all(&self.method.to_le_bytes())?;
        writer.write_all(&time.to_le_bytes())?;
        writer.write_all(&date.to_le_bytes())?;
        writer.write_all(&self.crc32.to_le_bytes())?;
        writer.write_all(&self.compressed_size.to_le_bytes())?;
        writer.write_all(&self.uncompressed_size.to_le_bytes())?;
        writer.write_all(&name_len.to_le_bytes())?;
        writer.write_all(&extra_len.to_le_bytes())?;
        writer.write_all(&comment_len.to_le_bytes())?;
        writer.write_all(&self.disk_number_start.to_le_bytes())?;
        writer.write_all(&self.internal_attributes.to_le_bytes())?;
        writer.write_all(&self.external_attributes.to_le_bytes())?;
        writer.write_all(&self.local_header_offset.to_le_bytes())?;
        writer.write_all(&self.name)?;
        writer.write_all(&self.extra)?;
        writer.write_all(&self.comment)?;

        Ok(self.header_size())
    }

    /// Read entry from central directory
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        if read_u32(&mut reader)? != CENTRAL_DIRECTORY_SIGNATURE {
            return Err(ZipError::NotAZip(
                "invalid central directory entry signature".to_string(),
            ));
        }

        let version_made_by = read_u16(&mut reader)?;
        let version_needed = read_u16(&mut reader)?;
        let flags = read_u16(&mut reader)?;
        let method = read_u16(&mut reader)?;
        let time = read_u16(&mut reader)?;
        let date = read_u16(&mut reader)?;
        let crc32 = read_u32(&mut reader)?;
        let compressed_size = read_u32(&mut reader)?;
        let uncompressed_size = read_u32(&mut reader)?;
        let name_len = read_u16(&mut reader)? as usize;
        let extra_len = read_u16(&mut reader)? as usize;
        let comment_len = read_u16(&mut reader)? as usize;
        let disk_number_start = read_u16(&mut reader)?;
        let internal_attributes = read_u16(&mut reader)?;
        let external_attributes = read_u32(&mut reader)?;
        let local_header_offset = read_u32(&mut reader)?;
        let name = read_bytes(&mut reader, name_len)?;
        let extra = read_bytes(&mut reader, extra_len)?;
        let comment = read_bytes(&mut reader, comment_len)?;

        Ok(Self {
            version_made_by,
            version_needed,
            flags,
            method,
            modified: DosDateTime::from_dos(date, time),
            crc32,
            compressed_size,
            uncompressed_size,
            name,
            extra,
            comment,
            disk_number_start,
            internal_attributes,
            external_attributes,
            local_header_offset,
        })
    }

    pub fn name_lossy(&self) -> String {
        decode_text(&self.name, self.flags)
    }

    /// Entry comment, if one was stored
    pub fn comment_text(&self) -> Option<String> {
        if self.comment.is_empty() {
            None
        } else {
            Some(decode_text(&self.comment, self.flags))
        }
    }

    /// Whether any size or offset field carries the ZIP64 marker
    pub fn needs_zip64(&self) -> bool {
        self.compressed_size == u32::MAX
            || self.uncompressed_size == u32::MAX
            || self.local_header_offset == u32::MAX
    }

    pub fn header_size(&self) -> usize {
        CENTRAL_HEADER_SIZE + self.name.len() + self.extra.len() + self.comment.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::format::{EXTERNAL_ATTR_FILE, VERSION_MADE_BY, VERSION_NEEDED_DEFAULT};

    fn sample() -> CentralDirectoryHeader {
        CentralDirectoryHeader {
            version_made_by: VERSION_MADE_BY,
            version_needed: VERSION_NEEDED_DEFAULT,
            flags: 0,
            method: 8,
            modified: DosDateTime::new(2021, 6, 1, 8, 30, 10).unwrap(),
            crc32: 0xDEAD_BEEF,
            compressed_size: 2000,
            uncompressed_size: 5000,
            name: b"docs/readme.md".to_vec(),
            extra: Vec::new(),
            comment: b"first entry".to_vec(),
            disk_number_start: 0,
            internal_attributes: 0,
            external_attributes: EXTERNAL_ATTR_FILE,
            local_header_offset: 1024,
        }
    }

    #[test]
    fn test_central_header_roundtrip() {
        let header = sample();

        let mut buf = Vec::new();
        let written = header.write_to(&mut buf).unwrap();
        assert_eq!(written, buf.len());
        assert_eq!(written, 46 + 14 + 11);

        let parsed = CentralDirectoryHeader::read_from(&buf[..]).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.comment_text().as_deref(), Some("first entry"));
        assert!(!parsed.needs_zip64());
    }

    #[test]
    fn test_zip64_marker_detected() {
        let mut header = sample();
        header.local_header_offset = u32::MAX;
        assert!(header.needs_zip64());
    }

    #[test]
    fn test_signature_validation() {
        let mut buf = Vec::new();
        sample().write_to(&mut buf).unwrap();
        buf[0] = 0x00;
        assert!(matches!(
            CentralDirectoryHeader::read_from(&buf[..]),
            Err(ZipError::NotAZip(_))
        ));
    }
}
