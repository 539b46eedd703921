use crate::error::{Result, ZipError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

/// Local file header signature "PK\x03\x04"
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// Central directory file header signature "PK\x01\x02"
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;

/// End of central directory signature "PK\x05\x06"
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

/// Fixed part of the local file header
pub const LOCAL_HEADER_SIZE: usize = 30;

/// Fixed part of a central directory file header
pub const CENTRAL_HEADER_SIZE: usize = 46;

/// Longest name, extra field or comment a 16-bit length field can describe
pub const MAX_FIELD_LENGTH: usize = u16::MAX as usize;

/// Largest entry count representable without ZIP64
pub const MAX_ENTRY_COUNT: usize = u16::MAX as usize;

/// General purpose flag: entry data is encrypted
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// General purpose flag: sizes and CRC follow the data in a data descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// General purpose flag: name and comment are UTF-8
pub const FLAG_UTF8: u16 = 0x0800;

/// Version needed to extract: deflate and traditional encryption
pub const VERSION_NEEDED_DEFAULT: u16 = 20;

/// Version needed to extract: WinZip AES
pub const VERSION_NEEDED_AES: u16 = 51;

/// Version made by: Unix host, APPNOTE 2.0
pub const VERSION_MADE_BY: u16 = (3 << 8) | 20;

/// Unix mode for regular files in the external attributes (0o100644)
pub const EXTERNAL_ATTR_FILE: u32 = 0o100_644 << 16;

/// Unix mode for directories (0o40755) plus the MS-DOS directory bit
pub const EXTERNAL_ATTR_DIRECTORY: u32 = (0o040_755 << 16) | 0x10;

/// Extra field header ID for WinZip AES
pub const AES_EXTRA_FIELD_ID: u16 = 0x9901;

/// Compression methods supported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CompressionMethod {
    Stored = 0,
    Deflated = 8,
    /// WinZip AES marker; the real method lives in the 0x9901 extra field
    Aes = 99,
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::Stored),
            8 => Ok(Self::Deflated),
            99 => Ok(Self::Aes),
            _ => Err(ZipError::UnsupportedCompression(value)),
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// MS-DOS timestamp as stored in ZIP headers (two-second resolution, 1980-2107)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DosDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DosDateTime {
    /// Earliest representable timestamp, 1980-01-01 00:00:00
    pub const MIN: DosDateTime = DosDateTime {
        year: 1980,
        month: 1,
        day: 1,
        hour: 0,
        minute: 0,
        second: 0,
    };

    /// Build a timestamp, rejecting values the DOS encoding cannot hold
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Result<Self> {
        if !(1980..=2107).contains(&year)
            || !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return Err(ZipError::InvalidOption(format!(
                "timestamp {:04}-{:02}-{:02} {:02}:{:02}:{:02} is outside the DOS range",
                year, month, day, hour, minute, second
            )));
        }
        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second: second & !1,
        })
    }

    /// Current UTC time
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::from_unix_seconds(secs)
    }

    /// Convert Unix seconds (UTC), clamping into the DOS range
    pub fn from_unix_seconds(secs: u64) -> Self {
        let days = (secs / 86_400) as i64;
        let rem = secs % 86_400;
        let (year, month, day) = civil_from_days(days);
        if year < 1980 {
            return Self::MIN;
        }
        if year > 2107 {
            return Self {
                year: 2107,
                month: 12,
                day: 31,
                hour: 23,
                minute: 59,
                second: 58,
            };
        }
        Self {
            year: year as u16,
            month: month as u8,
            day: day as u8,
            hour: (rem / 3600) as u8,
            minute: ((rem % 3600) / 60) as u8,
            second: ((rem % 60) as u8) & !1,
        }
    }

    /// Seconds since the Unix epoch, interpreting the timestamp as UTC
    pub fn to_unix_seconds(&self) -> u64 {
        let days = days_from_civil(self.year as i64, self.month as i64, self.day as i64);
        let secs = days * 86_400
            + self.hour as i64 * 3600
            + self.minute as i64 * 60
            + self.second as i64;
        secs.max(0) as u64
    }

    /// Decode the packed date and time words from a header
    pub fn from_dos(date: u16, time: u16) -> Self {
        Self {
            year: ((date >> 9) & 0x7f) + 1980,
            month: ((date >> 5) & 0x0f) as u8,
            day: (date & 0x1f) as u8,
            hour: ((time >> 11) & 0x1f) as u8,
            minute: ((time >> 5) & 0x3f) as u8,
            second: ((time & 0x1f) * 2) as u8,
        }
    }

    /// Packed (date, time) words for a header
    pub fn to_dos(&self) -> (u16, u16) {
        let date = ((self.year.saturating_sub(1980) & 0x7f) << 9)
            | ((self.month as u16 & 0x0f) << 5)
            | (self.day as u16 & 0x1f);
        let time = ((self.hour as u16 & 0x1f) << 11)
            | ((self.minute as u16 & 0x3f) << 5)
            | ((self.second as u16 / 2) & 0x1f);
        (date, time)
    }
}

impl Default for DosDateTime {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for DosDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

// Proleptic Gregorian day arithmetic relative to 1970-01-01
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = if year >= 0 { year } else { year - 399 } / 400;
    let yoe = year - era * 400;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Normalize path to forward slashes (cross-platform compatibility)
pub fn normalize_name(name: &str) -> String {
    name.replace('\\', "/")
}

/// Upper half of IBM code page 437, the ZIP default for names without the
/// UTF-8 flag
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

/// Decode bytes as code page 437
pub fn decode_cp437(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                CP437_HIGH[(b - 0x80) as usize]
            }
        })
        .collect()
}

/// Decode a stored name or comment: UTF-8 when the entry's flag says so,
/// code page 437 otherwise
pub(crate) fn decode_text(bytes: &[u8], flags: u16) -> String {
    if flags & FLAG_UTF8 != 0 {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        decode_cp437(bytes)
    }
}

// Helper functions for reading primitive types; a short read means the
// structure was cut off, which callers report as a malformed archive
pub(crate) fn read_u16<R: Read>(mut reader: R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf).map_err(truncated)?;
    Ok(u16::from_le_bytes(buf))
}

pub(crate) fn read_u32<R: Read>(mut reader: R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(truncated)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_bytes<R: Read>(mut reader: R, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(truncated)?;
    Ok(buf)
}

fn truncated(err: std::io::Error) -> ZipError {
    ZipError::NotAZip(format!("truncated record: {}", err))
}

/// Convert a length to the 16-bit header field, naming the field on overflow
pub(crate) fn field_len(len: usize, what: &str) -> Result<u16> {
    u16::try_from(len).map_err(|_| {
        ZipError::Unsupported(format!("{} is {} bytes (max {})", what, len, MAX_FIELD_LENGTH))
    })
}

/// Convert a size or offset to the 32-bit header field (no ZIP64)
pub(crate) fn field_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ZipError::Unsupported(format!("{} of {} bytes requires ZIP64", what, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_honours_utf8_flag() {
        assert_eq!(decode_text(b"caf\x82.txt", 0), "café.txt");
        assert_eq!(decode_text("café.txt".as_bytes(), FLAG_UTF8), "café.txt");
        assert_eq!(decode_text(b"plain/name.txt", 0), "plain/name.txt");
        assert_eq!(decode_cp437(&[0x80, 0xE1, 0xFF]), "Çß\u{a0}");
    }

    #[test]
    fn test_compression_method_from_u16() {
        assert_eq!(CompressionMethod::from_u16(0).unwrap(), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from_u16(8).unwrap(), CompressionMethod::Deflated);
        assert_eq!(CompressionMethod::from_u16(99).unwrap(), CompressionMethod::Aes);
        assert!(matches!(
            CompressionMethod::from_u16(12),
            Err(ZipError::UnsupportedCompression(12))
        ));
    }

    #[test]
    fn test_dos_packing() {
        let ts = DosDateTime::new(2024, 2, 29, 13, 45, 31).unwrap();
        assert_eq!(ts.second, 30);

        let (date, time) = ts.to_dos();
        assert_eq!(DosDateTime::from_dos(date, time), ts);
    }

    #[test]
    fn test_unix_conversion() {
        // 2000-03-01 12:00:00 UTC
        let ts = DosDateTime::from_unix_seconds(951_912_000);
        assert_eq!(ts, DosDateTime::new(2000, 3, 1, 12, 0, 0).unwrap());
        assert_eq!(ts.to_unix_seconds(), 951_912_000);

        assert_eq!(DosDateTime::from_unix_seconds(0), DosDateTime::MIN);
        assert_eq!(DosDateTime::MIN.to_unix_seconds(), 315_532_800);
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        assert!(DosDateTime::new(1979, 12, 31, 0, 0, 0).is_err());
        assert!(DosDateTime::new(2020, 13, 1, 0, 0, 0).is_err());
        assert!(DosDateTime::new(2020, 1, 1, 24, 0, 0).is_err());
    }

    #[test]
    fn test_garbage_dos_fields_do_not_panic() {
        let ts = DosDateTime::from_dos(0, 0);
        assert_eq!(ts.month, 0);
        let _ = ts.to_unix_seconds();
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("dir\\sub\\file.txt"), "dir/sub/file.txt");
        assert_eq!(normalize_name("plain.txt"), "plain.txt");
    }
}
