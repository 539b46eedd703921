use crate::archive::format::{
    decode_text, field_len, read_bytes, read_u16, read_u32, DosDateTime,
    LOCAL_FILE_HEADER_SIGNATURE, LOCAL_HEADER_SIZE,
};
use crate::error::{Result, ZipError};
use std::io::{Read, Write};

/// Local File Header
///
/// Precedes each entry's data in the archive, enabling sequential
/// streaming reads without consulting the central directory.
///
/// Structure (30 bytes + variable fields):
/// - Signature: "PK\x03\x04" (4 bytes)
/// - Version needed: uint16
/// - General purpose flags: uint16
/// - Compression method: uint16
/// - Modified time / date: uint16 + uint16 (MS-DOS)
/// - CRC32: uint32
/// - Compressed size: uint32
/// - Uncompressed size: uint32
/// - Name length / extra length: uint16 + uint16
/// - Name, then extra field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: Vec<u8>,
    pub extra: Vec<u8>,
}

impl LocalFileHeader {
    /// Write local file header to a writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize> {
        let name_len = field_len(self.name.len(), "entry name")?;
        let extra_len = field_len(self.extra.len(), "extra field")?;
        let (date, time) = self.modified.to_dos();

        writer.write_all(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes())?;
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
        writer.write_all(&self.name)?;
        writer.write_all(&self.extra)?;

        Ok(self.header_size())
    }

    /// Read local file header from a reader
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        if read_u32(&mut reader)? != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(ZipError::NotAZip(
                "invalid local file header signature".to_string(),
            ));
        }

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
        let name = read_bytes(&mut reader, name_len)?;
        let extra = read_bytes(&mut reader, extra_len)?;

        Ok(Self {
            version_needed,
            flags,
            method,
            modified: DosDateTime::from_dos(date, time),
            crc32,
            compressed_size,
            uncompressed_size,
            name,
            extra,
        })
    }

    /// Name as text
    pub fn name_lossy(&self) -> String {
        decode_text(&self.name, self.flags)
    }

    /// Calculate the total size of this header when written
    pub fn header_size(&self) -> usize {
        LOCAL_HEADER_SIZE + self.name.len() + self.extra.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::format::{CompressionMethod, VERSION_NEEDED_DEFAULT};

    #[test]
    fn test_local_header_roundtrip() {
        let header = LocalFileHeader {
            version_needed: VERSION_NEEDED_DEFAULT,
            flags: 0,
            method: CompressionMethod::Deflated.as_u16(),
            modified: DosDateTime::new(2023, 12, 19, 16, 0, 0).unwrap(),
            crc32: 0x1234_5678,
            compressed_size: 5000,
            uncompressed_size: 10000,
            name: b"test/file.txt".to_vec(),
            extra: Vec::new(),
        };

        let mut buf = Vec::new();
        let written = header.write_to(&mut buf).unwrap();
        assert_eq!(written, header.header_size());
        assert_eq!(buf.len(), 30 + 13);
        assert_eq!(&buf[..4], b"PK\x03\x04");

        let parsed = LocalFileHeader::read_from(&buf[..]).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.name_lossy(), "test/file.txt");
    }

    #[test]
    fn test_signature_validation() {
        let buf = [0xFFu8; 40];
        let result = LocalFileHeader::read_from(&buf[..]);
        assert!(matches!(result, Err(ZipError::NotAZip(_))));
    }

    #[test]
    fn test_truncated_header() {
        let result = LocalFileHeader::read_from(&b"PK\x03\x04\x14\x00"[..]);
        assert!(matches!(result, Err(ZipError::NotAZip(_))));
    }
}
