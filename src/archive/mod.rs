mod central_directory;
pub mod codec;
pub mod crypto;
mod end_record;
mod format;
mod local_entry;
mod reader;
mod summary;
mod writer;

pub use central_directory::CentralDirectoryHeader;
pub use codec::{
    decode_entry, encode_entry, EncodeSettings, EncodedEntry, Encryption, EncryptionScheme,
    EntryDescriptor,
};
pub use crypto::winzip_aes::AesStrength;
pub use end_record::{EndRecord, END_RECORD_SIZE};
pub use format::{
    normalize_name, CompressionMethod, DosDateTime, CENTRAL_DIRECTORY_SIGNATURE,
    CENTRAL_HEADER_SIZE, END_OF_CENTRAL_DIRECTORY_SIGNATURE, FLAG_DATA_DESCRIPTOR, FLAG_ENCRYPTED,
    FLAG_UTF8, LOCAL_FILE_HEADER_SIGNATURE, LOCAL_HEADER_SIZE,
};
pub use local_entry::LocalFileHeader;
pub use reader::ArchiveReader;
pub use summary::{summarize, ArchiveEntryMetadata, ArchiveMetadata};
pub use writer::{write_archive, ArchiveWriter};
