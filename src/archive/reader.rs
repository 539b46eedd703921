use crate::archive::central_directory::CentralDirectoryHeader;
use crate::archive::codec::{decode_entry, EntryDescriptor};
use crate::archive::end_record::EndRecord;
use crate::archive::format::{normalize_name, LOCAL_HEADER_SIZE};
use crate::archive::local_entry::LocalFileHeader;
use crate::archive::summary::ArchiveEntryMetadata;
use crate::error::{Result, ZipError};
use crate::payload::Payload;
use std::collections::HashMap;
use std::io::Cursor;
use tracing::debug;

/// Archive reader over an in-memory ZIP with O(1) entry lookup.
///
/// Opening parses only the end record and central directory; entry data
/// is decoded on demand by [`read_entry`](Self::read_entry).
pub struct ArchiveReader<'a> {
    data: &'a [u8],
    end_record: EndRecord,
    entries: Vec<EntryDescriptor>,
    index: HashMap<String, usize>,
}

impl<'a> ArchiveReader<'a> {
    /// Parse the trailer and central directory of `data`
    pub fn open(data: &'a [u8]) -> Result<Self> {
        let (end_record, end_offset) = EndRecord::locate(data)?;
        end_record.validate()?;

        let cd_offset = end_record.central_directory_offset as usize;
        let cd_size = end_record.central_directory_size as usize;
        let cd_end = cd_offset
            .checked_add(cd_size)
            .filter(|&end| end <= end_offset)
            .ok_or_else(|| {
                ZipError::NotAZip(format!(
                    "central directory ({} bytes at {}) lies outside the archive",
                    cd_size, cd_offset
                ))
            })?;

        let entry_count = end_record.total_entries as usize;
        let mut cursor = Cursor::new(&data[cd_offset..cd_end]);
        let mut entries = Vec::with_capacity(entry_count);
        let mut index = HashMap::with_capacity(entry_count);

        for position in 0..entry_count {
            let header = CentralDirectoryHeader::read_from(&mut cursor)?;
            let entry = EntryDescriptor::from_central(&header)?;

            if entry.local_header_offset as usize + LOCAL_HEADER_SIZE > cd_offset {
                return Err(ZipError::NotAZip(format!(
                    "local header of {} at {} lies outside the entry area",
                    entry.name, entry.local_header_offset
                )));
            }

            // First entry wins on duplicate names
            index.entry(entry.name.clone()).or_insert(position);
            entries.push(entry);
        }

        if cursor.position() as usize != cd_size {
            return Err(ZipError::NotAZip(format!(
                "central directory size mismatch: declared {}, parsed {}",
                cd_size,
                cursor.position()
            )));
        }

        debug!(
            entries = entries.len(),
            bytes = data.len(),
            "opened archive"
        );

        Ok(Self {
            data,
            end_record,
            entries,
            index,
        })
    }

    /// Entry descriptors in central directory order
    pub fn entries(&self) -> &[EntryDescriptor] {
        &self.entries
    }

    /// Get number of entries in archive
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Archive comment from the end record
    pub fn comment(&self) -> Option<String> {
        self.end_record.comment_text()
    }

    /// Check if an entry exists in the archive
    pub fn contains(&self, name: &str) -> bool {
        self.get_entry(name).is_some()
    }

    /// Get entry information without reading data
    pub fn get_entry(&self, name: &str) -> Option<&EntryDescriptor> {
        self.index
            .get(name)
            .or_else(|| self.index.get(&normalize_name(name)))
            .map(|&i| &self.entries[i])
    }

    /// Metadata for every entry, directories included, without decoding data
    pub fn list_entries(&self) -> Vec<ArchiveEntryMetadata> {
        self.entries.iter().map(ArchiveEntryMetadata::from).collect()
    }

    /// Decode one entry; `None` for directories
    pub fn read_entry(
        &self,
        entry: &EntryDescriptor,
        password: Option<&str>,
    ) -> Result<Option<Vec<u8>>> {
        if entry.is_directory {
            return Ok(None);
        }
        let stored = self.stored_data(entry)?;
        decode_entry(entry, stored, password)
    }

    /// Decode an entry by name
    pub fn read_file(&self, name: &str, password: Option<&str>) -> Result<Vec<u8>> {
        let entry = self
            .get_entry(name)
            .ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?;
        Ok(self.read_entry(entry, password)?.unwrap_or_default())
    }

    /// Decode every non-directory entry in archive order
    pub fn read_all(&self, password: Option<&str>) -> Result<Vec<Payload>> {
        let mut payloads = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if let Some(data) = self.read_entry(entry, password)? {
                payloads.push(Payload::new(entry.name.clone(), data));
            }
        }
        Ok(payloads)
    }

    /// The entry's stored (compressed, possibly encrypted) bytes
    fn stored_data(&self, entry: &EntryDescriptor) -> Result<&'a [u8]> {
        let offset = entry.local_header_offset as usize;
        let local = LocalFileHeader::read_from(&self.data[offset..])?;

        let start = offset + local.header_size();
        let end = start
            .checked_add(entry.compressed_size as usize)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ZipError::NotAZip(format!(
                    "data of {} extends past the end of the archive",
                    entry.name
                ))
            })?;

        Ok(&self.data[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::writer::write_archive;
    use crate::config::ArchiveOptions;

    fn sample_archive() -> Vec<u8> {
        let payloads = vec![
            Payload::new("readme.txt", b"hello archive".to_vec()),
            Payload::directory("src"),
            Payload::new("src/main.rs", b"fn main() {}\n".repeat(40)),
        ];
        write_archive(&payloads, &ArchiveOptions::default()).unwrap()
    }

    #[test]
    fn test_open_and_list() {
        let bytes = sample_archive();
        let reader = ArchiveReader::open(&bytes).unwrap();

        assert_eq!(reader.entry_count(), 3);
        let names: Vec<_> = reader.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["readme.txt", "src/", "src/main.rs"]);
        assert!(reader.contains("src\\main.rs"));
        assert!(reader.comment().is_none());

        let listing = reader.list_entries();
        assert!(listing[1].is_directory);
        assert_eq!(listing[2].uncompressed_size, 13 * 40);
    }

    #[test]
    fn test_read_entries() {
        let bytes = sample_archive();
        let reader = ArchiveReader::open(&bytes).unwrap();

        assert_eq!(reader.read_file("readme.txt", None).unwrap(), b"hello archive");

        let dir = reader.get_entry("src/").unwrap();
        assert_eq!(reader.read_entry(dir, None).unwrap(), None);

        let all = reader.read_all(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].name, "src/main.rs");
    }

    #[test]
    fn test_missing_entry() {
        let bytes = sample_archive();
        let reader = ArchiveReader::open(&bytes).unwrap();
        assert!(matches!(
            reader.read_file("nope.txt", None),
            Err(ZipError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            ArchiveReader::open(b"hello world, this is not an archive"),
            Err(ZipError::NotAZip(_))
        ));
        assert!(matches!(ArchiveReader::open(&[]), Err(ZipError::NotAZip(_))));
    }

    #[test]
    fn test_central_directory_out_of_bounds() {
        let mut bytes = sample_archive();
        let end = bytes.len() - 22;
        // Point the central directory offset far past the buffer
        bytes[end + 16..end + 20].copy_from_slice(&0x00FF_FFFFu32.to_le_bytes());

        assert!(matches!(
            ArchiveReader::open(&bytes),
            Err(ZipError::NotAZip(_))
        ));
    }

    #[test]
    fn test_truncated_archive() {
        let bytes = sample_archive();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(
            ArchiveReader::open(truncated),
            Err(ZipError::NotAZip(_))
        ));
    }
}
