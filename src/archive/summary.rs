//! Archive-level metadata derived from the central directory.

use crate::archive::codec::EntryDescriptor;
use crate::archive::format::DosDateTime;
use crate::archive::reader::ArchiveReader;
use crate::error::Result;
use serde::Serialize;

/// Per-entry metadata, read from the central directory without decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntryMetadata {
    pub filename: String,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub last_modified: DosDateTime,
    pub is_directory: bool,
    pub is_encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<&EntryDescriptor> for ArchiveEntryMetadata {
    fn from(entry: &EntryDescriptor) -> Self {
        Self {
            filename: entry.name.clone(),
            uncompressed_size: entry.uncompressed_size,
            compressed_size: entry.compressed_size,
            last_modified: entry.modified,
            is_directory: entry.is_directory,
            is_encrypted: entry.is_encrypted(),
            comment: entry.comment.clone(),
        }
    }
}

/// Totals over an archive's entries
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMetadata {
    pub entries: Vec<ArchiveEntryMetadata>,
    /// Sum over non-directory entries
    pub total_uncompressed_size: u64,
    /// Sum over non-directory entries
    pub total_compressed_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_comment: Option<String>,
}

impl ArchiveMetadata {
    /// Aggregate entry metadata
    pub fn from_entries(
        entries: Vec<ArchiveEntryMetadata>,
        archive_comment: Option<String>,
    ) -> Self {
        let (total_uncompressed_size, total_compressed_size) = entries
            .iter()
            .filter(|e| !e.is_directory)
            .fold((0u64, 0u64), |(u, c), e| {
                (
                    u.saturating_add(e.uncompressed_size),
                    c.saturating_add(e.compressed_size),
                )
            });

        Self {
            entries,
            total_uncompressed_size,
            total_compressed_size,
            archive_comment,
        }
    }

    /// `1 - compressed / uncompressed`; exactly 0 for an archive with no data
    pub fn compression_ratio(&self) -> f64 {
        if self.total_uncompressed_size == 0 {
            return 0.0;
        }
        1.0 - self.total_compressed_size as f64 / self.total_uncompressed_size as f64
    }

    /// Number of non-directory entries
    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_directory).count()
    }

    /// Pretty JSON, including the derived ratio
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.insert(
                "compressionRatio".to_string(),
                serde_json::json!(self.compression_ratio()),
            );
        }
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

/// Summarize an opened archive
pub fn summarize(reader: &ArchiveReader<'_>) -> ArchiveMetadata {
    ArchiveMetadata::from_entries(reader.list_entries(), reader.comment())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, size: u64, compressed: u64) -> ArchiveEntryMetadata {
        ArchiveEntryMetadata {
            filename: name.to_string(),
            uncompressed_size: size,
            compressed_size: compressed,
            last_modified: DosDateTime::MIN,
            is_directory: name.ends_with('/'),
            is_encrypted: false,
            comment: None,
        }
    }

    #[test]
    fn test_totals_skip_directories() {
        let metadata = ArchiveMetadata::from_entries(
            vec![
                entry("a.txt", 1000, 250),
                entry("dir/", 0, 0),
                entry("dir/b.txt", 1000, 250),
            ],
            Some("note".to_string()),
        );

        assert_eq!(metadata.total_uncompressed_size, 2000);
        assert_eq!(metadata.total_compressed_size, 500);
        assert_eq!(metadata.file_count(), 2);
        assert!((metadata.compression_ratio() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_zero_size_ratio_is_zero() {
        let metadata = ArchiveMetadata::from_entries(vec![entry("empty.txt", 0, 0)], None);
        assert_eq!(metadata.compression_ratio(), 0.0);

        let empty = ArchiveMetadata::from_entries(Vec::new(), None);
        assert_eq!(empty.compression_ratio(), 0.0);
        assert!(!empty.compression_ratio().is_nan());
    }

    #[test]
    fn test_json_shape() {
        let metadata = ArchiveMetadata::from_entries(vec![entry("a.txt", 10, 10)], None);
        let json = metadata.to_json_pretty().unwrap();
        assert!(json.contains("\"totalUncompressedSize\": 10"));
        assert!(json.contains("\"compressionRatio\""));
        assert!(json.contains("\"isEncrypted\": false"));
        assert!(!json.contains("archiveComment"));
    }
}
