//! Traditional PKWARE encryption (ZipCrypto).
//!
//! Every encrypted entry starts with a 12-byte header of random bytes whose
//! last byte is a check value: the high byte of the entry CRC, or of the DOS
//! modification time when the entry uses a data descriptor.

use super::CryptoError;
use rand::RngCore;

/// Size of the encryption header prepended to entry data
pub const ENCRYPTION_HEADER_SIZE: usize = 12;

const CRC_TABLE: [u32; 256] = build_crc_table();

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                0xEDB8_8320 ^ (crc >> 1)
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

// Raw CRC-32 step without pre/post inversion, as the key schedule requires
fn crc32_step(crc: u32, byte: u8) -> u32 {
    CRC_TABLE[((crc ^ byte as u32) & 0xff) as usize] ^ (crc >> 8)
}

/// The three-word cipher state
#[derive(Clone)]
pub struct ZipCryptoKeys {
    key0: u32,
    key1: u32,
    key2: u32,
}

impl ZipCryptoKeys {
    /// Initialise the state from a password
    pub fn new(password: &[u8]) -> Self {
        let mut keys = Self {
            key0: 0x1234_5678,
            key1: 0x2345_6789,
            key2: 0x3456_7890,
        };
        for &byte in password {
            keys.update(byte);
        }
        keys
    }

    fn update(&mut self, plain: u8) {
        self.key0 = crc32_step(self.key0, plain);
        self.key1 = self
            .key1
            .wrapping_add(self.key0 & 0xff)
            .wrapping_mul(134_775_813)
            .wrapping_add(1);
        self.key2 = crc32_step(self.key2, (self.key1 >> 24) as u8);
    }

    fn stream_byte(&self) -> u8 {
        let temp = (self.key2 | 2) & 0xffff;
        (temp.wrapping_mul(temp ^ 1) >> 8) as u8
    }

    pub fn encrypt_byte(&mut self, plain: u8) -> u8 {
        let cipher = plain ^ self.stream_byte();
        self.update(plain);
        cipher
    }

    pub fn decrypt_byte(&mut self, cipher: u8) -> u8 {
        let plain = cipher ^ self.stream_byte();
        self.update(plain);
        plain
    }
}

/// Encrypt `data`, prepending a fresh header ending in `check_byte`
pub fn encrypt(password: &[u8], check_byte: u8, data: &[u8]) -> Vec<u8> {
    let mut header = [0u8; ENCRYPTION_HEADER_SIZE];
    rand::thread_rng().fill_bytes(&mut header[..ENCRYPTION_HEADER_SIZE - 1]);
    header[ENCRYPTION_HEADER_SIZE - 1] = check_byte;
    encrypt_with_header(password, header, data)
}

/// Encrypt with a caller-supplied header (the last byte is the check byte)
pub fn encrypt_with_header(
    password: &[u8],
    header: [u8; ENCRYPTION_HEADER_SIZE],
    data: &[u8],
) -> Vec<u8> {
    let mut keys = ZipCryptoKeys::new(password);
    let mut out = Vec::with_capacity(ENCRYPTION_HEADER_SIZE + data.len());
    out.extend(header.iter().map(|&b| keys.encrypt_byte(b)));
    out.extend(data.iter().map(|&b| keys.encrypt_byte(b)));
    out
}

/// Decrypt header plus data, verifying the header's check byte
pub fn decrypt(password: &[u8], check_byte: u8, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < ENCRYPTION_HEADER_SIZE {
        return Err(CryptoError::Truncated);
    }

    let mut keys = ZipCryptoKeys::new(password);
    let (header, body) = data.split_at(ENCRYPTION_HEADER_SIZE);

    let mut last = 0u8;
    for &b in header {
        last = keys.decrypt_byte(b);
    }
    if last != check_byte {
        return Err(CryptoError::PasswordMismatch);
    }

    Ok(body.iter().map(|&b| keys.decrypt_byte(b)).collect())
}
