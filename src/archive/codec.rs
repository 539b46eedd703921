//! Entry codec: one named payload to and from its stored form.
//!
//! Encoding compresses first, then encrypts. Decoding reverses that and
//! verifies size and CRC against the central directory.

use crate::archive::central_directory::CentralDirectoryHeader;
use crate::archive::crypto::winzip_aes::{self, AesExtraField, AesStrength, VENDOR_VERSION_AE2};
use crate::archive::crypto::{traditional, CryptoError};
use crate::archive::format::{
    field_u32, normalize_name, CompressionMethod, DosDateTime, EXTERNAL_ATTR_DIRECTORY,
    EXTERNAL_ATTR_FILE, FLAG_DATA_DESCRIPTOR, FLAG_ENCRYPTED, FLAG_UTF8, VERSION_MADE_BY,
    VERSION_NEEDED_AES, VERSION_NEEDED_DEFAULT,
};
use crate::archive::local_entry::LocalFileHeader;
use crate::error::{Result, ZipError};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Which password scheme protects an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionScheme {
    /// PKWARE ZipCrypto
    Traditional,
    /// WinZip AES at the given key size
    Aes(AesStrength),
}

/// Password plus scheme, borrowed for the duration of one encode call
#[derive(Clone, Copy)]
pub struct Encryption<'a> {
    pub password: &'a [u8],
    pub scheme: EncryptionScheme,
}

impl std::fmt::Debug for Encryption<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryption")
            .field("password", &"<redacted>")
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// Per-entry encoding parameters
#[derive(Debug, Clone, Copy)]
pub struct EncodeSettings<'a> {
    /// 0 stores, 1-9 deflates with increasing effort
    pub level: u32,
    pub encryption: Option<Encryption<'a>>,
    pub modified: DosDateTime,
}

/// An entry ready to be laid out: header fields plus stored bytes.
///
/// Offsets are not known yet, which keeps encoding independent per entry.
#[derive(Debug, Clone)]
pub struct EncodedEntry {
    pub name: String,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub uncompressed_size: u64,
    pub extra: Vec<u8>,
    pub data: Vec<u8>,
    pub is_directory: bool,
}

impl EncodedEntry {
    pub fn local_header(&self) -> Result<LocalFileHeader> {
        Ok(LocalFileHeader {
            version_needed: self.version_needed,
            flags: self.flags,
            method: self.method,
            modified: self.modified,
            crc32: self.crc32,
            compressed_size: field_u32(self.data.len() as u64, "compressed entry")?,
            uncompressed_size: field_u32(self.uncompressed_size, "entry")?,
            name: self.name.as_bytes().to_vec(),
            extra: self.extra.clone(),
        })
    }

    pub fn central_header(&self, local_header_offset: u64) -> Result<CentralDirectoryHeader> {
        let external_attributes = if self.is_directory {
            EXTERNAL_ATTR_DIRECTORY
        } else {
            EXTERNAL_ATTR_FILE
        };

        Ok(CentralDirectoryHeader {
            version_made_by: VERSION_MADE_BY,
            version_needed: self.version_needed,
            flags: self.flags,
            method: self.method,
            modified: self.modified,
            crc32: self.crc32,
            compressed_size: field_u32(self.data.len() as u64, "compressed entry")?,
            uncompressed_size: field_u32(self.uncompressed_size, "entry")?,
            name: self.name.as_bytes().to_vec(),
            extra: self.extra.clone(),
            comment: Vec::new(),
            disk_number_start: 0,
            internal_attributes: 0,
            external_attributes,
            local_header_offset: field_u32(local_header_offset, "local header offset")?,
        })
    }
}

/// Everything needed to locate and decode one entry, taken from the
/// central directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub name: String,
    pub flags: u16,
    /// Method field as stored (99 for AES entries)
    pub header_method: u16,
    pub aes: Option<AesExtraField>,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub modified: DosDateTime,
    pub local_header_offset: u64,
    pub comment: Option<String>,
    pub is_directory: bool,
}

impl EntryDescriptor {
    pub fn from_central(header: &CentralDirectoryHeader) -> Result<Self> {
        if header.needs_zip64() {
            return Err(ZipError::Unsupported("ZIP64 entries".to_string()));
        }

        let name = normalize_name(&header.name_lossy());
        let is_directory = name.ends_with('/')
            || (header.uncompressed_size == 0 && header.external_attributes & 0x10 != 0);

        Ok(Self {
            aes: AesExtraField::find(&header.extra)?,
            name,
            flags: header.flags,
            header_method: header.method,
            crc32: header.crc32,
            compressed_size: header.compressed_size as u64,
            uncompressed_size: header.uncompressed_size as u64,
            modified: header.modified,
            local_header_offset: header.local_header_offset as u64,
            comment: header.comment_text(),
            is_directory,
        })
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Compression applied to the plaintext
    pub fn compression(&self) -> Result<CompressionMethod> {
        let raw = match (CompressionMethod::from_u16(self.header_method)?, self.aes) {
            (CompressionMethod::Aes, Some(aes)) => aes.method,
            (CompressionMethod::Aes, None) => {
                return Err(ZipError::corrupt(&self.name, "AES method without AES extra field"))
            }
            (method, _) => method.as_u16(),
        };
        match CompressionMethod::from_u16(raw)? {
            CompressionMethod::Aes => Err(ZipError::UnsupportedCompression(raw)),
            method => Ok(method),
        }
    }

    // AE-2 entries carry no CRC
    fn has_crc(&self) -> bool {
        !matches!(self.aes, Some(aes) if aes.vendor_version == VENDOR_VERSION_AE2)
    }

    // Last byte of the ZipCrypto header
    fn check_byte(&self) -> u8 {
        if self.flags & FLAG_DATA_DESCRIPTOR != 0 {
            let (_, time) = self.modified.to_dos();
            (time >> 8) as u8
        } else {
            (self.crc32 >> 24) as u8
        }
    }
}

/// Encode one payload: compress, optionally encrypt, and fill in header fields
pub fn encode_entry(
    name: &str,
    data: &[u8],
    settings: &EncodeSettings<'_>,
) -> Result<EncodedEntry> {
    let name = normalize_name(name);
    if name.is_empty() {
        return Err(ZipError::EmptyName);
    }

    let mut flags = if name.is_ascii() { 0 } else { FLAG_UTF8 };

    if name.ends_with('/') {
        if !data.is_empty() {
            return Err(ZipError::InvalidOption(format!(
                "directory entry {} cannot carry data",
                name
            )));
        }
        return Ok(EncodedEntry {
            name,
            version_needed: VERSION_NEEDED_DEFAULT,
            flags,
            method: CompressionMethod::Stored.as_u16(),
            modified: settings.modified,
            crc32: 0,
            uncompressed_size: 0,
            extra: Vec::new(),
            data: Vec::new(),
            is_directory: true,
        });
    }

    let crc32 = crc32fast::hash(data);
    let (compressed, method) = compress(data, settings.level)?;

    let mut entry = EncodedEntry {
        name,
        version_needed: VERSION_NEEDED_DEFAULT,
        flags,
        method: method.as_u16(),
        modified: settings.modified,
        crc32,
        uncompressed_size: data.len() as u64,
        extra: Vec::new(),
        data: compressed,
        is_directory: false,
    };

    if let Some(encryption) = settings.encryption {
        flags |= FLAG_ENCRYPTED;
        entry.flags = flags;
        match encryption.scheme {
            EncryptionScheme::Traditional => {
                let check_byte = (crc32 >> 24) as u8;
                entry.data = traditional::encrypt(encryption.password, check_byte, &entry.data);
            }
            EncryptionScheme::Aes(strength) => {
                entry.data = winzip_aes::encrypt(encryption.password, strength, &entry.data)
                    .map_err(|e| ZipError::corrupt(&entry.name, e.to_string()))?;
                entry.extra = AesExtraField {
                    vendor_version: VENDOR_VERSION_AE2,
                    strength,
                    method: method.as_u16(),
                }
                .to_bytes();
                entry.method = CompressionMethod::Aes.as_u16();
                entry.version_needed = VERSION_NEEDED_AES;
                entry.crc32 = 0;
            }
        }
    }

    Ok(entry)
}

/// Compress with deflate, falling back to stored when it does not help
fn compress(data: &[u8], level: u32) -> Result<(Vec<u8>, CompressionMethod)> {
    if level == 0 || data.is_empty() {
        return Ok((data.to_vec(), CompressionMethod::Stored));
    }

    let mut encoder = DeflateEncoder::new(
        Vec::with_capacity(data.len() / 2),
        Compression::new(level.min(9)),
    );
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;

    // Use compressed only if it's actually smaller
    if compressed.len() < data.len() {
        Ok((compressed, CompressionMethod::Deflated))
    } else {
        Ok((data.to_vec(), CompressionMethod::Stored))
    }
}

/// Decode one entry's stored bytes back to its payload.
///
/// Returns `None` for directory entries. On encrypted entries every
/// integrity failure after decryption is reported as a wrong password,
/// since a bad key is by far the likeliest cause.
pub fn decode_entry(
    entry: &EntryDescriptor,
    stored: &[u8],
    password: Option<&str>,
) -> Result<Option<Vec<u8>>> {
    if entry.is_directory {
        return Ok(None);
    }

    let method = entry.compression()?;
    let encrypted = entry.is_encrypted();

    let plain_stored = if encrypted {
        let password = password.ok_or_else(|| ZipError::WrongPassword(entry.name.clone()))?;
        decrypt(entry, stored, password.as_bytes())?
    } else {
        stored.to_vec()
    };

    let integrity_error = |reason: String| {
        if encrypted {
            ZipError::WrongPassword(entry.name.clone())
        } else {
            ZipError::corrupt(&entry.name, reason)
        }
    };

    let data = match method {
        CompressionMethod::Stored => plain_stored,
        CompressionMethod::Deflated => inflate(&plain_stored, entry.uncompressed_size)
            .map_err(|e| integrity_error(format!("inflate failed: {}", e)))?,
        CompressionMethod::Aes => return Err(ZipError::UnsupportedCompression(99)),
    };

    if data.len() as u64 != entry.uncompressed_size {
        return Err(integrity_error(format!(
            "size mismatch: expected {}, got {}",
            entry.uncompressed_size,
            data.len()
        )));
    }

    if entry.has_crc() {
        let actual = crc32fast::hash(&data);
        if actual != entry.crc32 {
            return Err(integrity_error(format!(
                "CRC mismatch: expected {:08x}, got {:08x}",
                entry.crc32, actual
            )));
        }
    }

    Ok(Some(data))
}

fn decrypt(entry: &EntryDescriptor, stored: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    let result = match entry.aes {
        Some(aes) => winzip_aes::decrypt(password, aes.strength, stored),
        None => traditional::decrypt(password, entry.check_byte(), stored),
    };

    result.map_err(|err| match err {
        CryptoError::PasswordMismatch | CryptoError::AuthenticationFailed => {
            ZipError::WrongPassword(entry.name.clone())
        }
        CryptoError::Truncated | CryptoError::InvalidKeyLength => {
            ZipError::corrupt(&entry.name, err.to_string())
        }
    })
}

/// Inflate raw deflate data, reading at most one byte past the declared size
fn inflate(data: &[u8], expected_size: u64) -> std::io::Result<Vec<u8>> {
    let capacity = expected_size.min(64 * 1024 * 1024) as usize;
    let mut out = Vec::with_capacity(capacity);
    DeflateDecoder::new(data)
        .take(expected_size.saturating_add(1))
        .read_to_end(&mut out)?;
    Ok(out)
}
