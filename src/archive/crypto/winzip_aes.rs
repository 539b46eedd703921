//! WinZip AES encryption (AE-1 / AE-2).
//!
//! Entry data layout: `salt || password verifier (2) || ciphertext || auth code (10)`.
//! Keys come from PBKDF2-HMAC-SHA1 (1000 rounds) over the password and salt;
//! the ciphertext is AES-CTR with a little-endian counter starting at 1 and
//! is authenticated with HMAC-SHA1 truncated to 10 bytes.

use super::CryptoError;
use crate::archive::format::AES_EXTRA_FIELD_ID;
use crate::error::{Result, ZipError};
use aes::{Aes128, Aes192, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::Sha1;

/// Length of the password verification value
pub const PASSWORD_VERIFIER_LEN: usize = 2;

/// Length of the truncated HMAC-SHA1 authentication code
pub const AUTH_CODE_LEN: usize = 10;

/// PBKDF2 iteration count fixed by the WinZip specification
pub const PBKDF2_ROUNDS: u32 = 1000;

/// AE-1: CRC is stored and must be checked
pub const VENDOR_VERSION_AE1: u16 = 1;

/// AE-2: CRC field is zero, the authentication code covers integrity
pub const VENDOR_VERSION_AE2: u16 = 2;

/// Size of the 0x9901 extra field including its 4-byte header
pub const AES_EXTRA_FIELD_SIZE: usize = 11;

type HmacSha1 = Hmac<Sha1>;

/// Key-size tier, numbered 1 to 3 as in the extra field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AesStrength {
    Aes128 = 1,
    Aes192 = 2,
    Aes256 = 3,
}

impl AesStrength {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Aes128),
            2 => Ok(Self::Aes192),
            3 => Ok(Self::Aes256),
            _ => Err(ZipError::UnsupportedEncryptionStrength(value)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    pub fn salt_len(self) -> usize {
        self.key_len() / 2
    }

    /// Bytes added to the entry data on top of the ciphertext
    pub fn overhead(self) -> usize {
        self.salt_len() + PASSWORD_VERIFIER_LEN + AUTH_CODE_LEN
    }
}

impl Default for AesStrength {
    fn default() -> Self {
        Self::Aes256
    }
}

impl TryFrom<u8> for AesStrength {
    type Error = ZipError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_u8(value)
    }
}

impl From<AesStrength> for u8 {
    fn from(strength: AesStrength) -> u8 {
        strength.as_u8()
    }
}

/// The 0x9901 extra field describing an AES-encrypted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesExtraField {
    pub vendor_version: u16,
    pub strength: AesStrength,
    /// Compression method applied before encryption
    pub method: u16,
}

impl AesExtraField {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(AES_EXTRA_FIELD_SIZE);
        out.extend_from_slice(&AES_EXTRA_FIELD_ID.to_le_bytes());
        out.extend_from_slice(&7u16.to_le_bytes());
        out.extend_from_slice(&self.vendor_version.to_le_bytes());
        out.extend_from_slice(b"AE");
        out.push(self.strength.as_u8());
        out.extend_from_slice(&self.method.to_le_bytes());
        out
    }

    /// Find and parse the AES field among an entry's extra fields
    pub fn find(extra: &[u8]) -> Result<Option<Self>> {
        let mut pos = 0;
        while pos + 4 <= extra.len() {
            let id = u16::from_le_bytes([extra[pos], extra[pos + 1]]);
            let size = u16::from_le_bytes([extra[pos + 2], extra[pos + 3]]) as usize;
            let body = extra.get(pos + 4..pos + 4 + size).ok_or_else(|| {
                ZipError::NotAZip("extra field overruns its declared length".to_string())
            })?;

            if id == AES_EXTRA_FIELD_ID {
                if body.len() < 7 || &body[2..4] != b"AE" {
                    return Err(ZipError::NotAZip("malformed AES extra field".to_string()));
                }
                return Ok(Some(Self {
                    vendor_version: u16::from_le_bytes([body[0], body[1]]),
                    strength: AesStrength::from_u8(body[4])?,
                    method: u16::from_le_bytes([body[5], body[6]]),
                }));
            }
            pos += 4 + size;
        }
        Ok(None)
    }
}

struct DerivedKeys {
    encryption: Vec<u8>,
    authentication: Vec<u8>,
    verifier: [u8; PASSWORD_VERIFIER_LEN],
}

fn derive_keys(password: &[u8], salt: &[u8], strength: AesStrength) -> DerivedKeys {
    let key_len = strength.key_len();
    let mut material = vec![0u8; key_len * 2 + PASSWORD_VERIFIER_LEN];
    pbkdf2::pbkdf2_hmac::<Sha1>(password, salt, PBKDF2_ROUNDS, &mut material);

    let verifier = [material[key_len * 2], material[key_len * 2 + 1]];
    let authentication = material[key_len..key_len * 2].to_vec();
    material.truncate(key_len);

    DerivedKeys {
        encryption: material,
        authentication,
        verifier,
    }
}

fn apply_keystream(key: &[u8], data: &mut [u8]) -> std::result::Result<(), CryptoError> {
    // Counter block is the little-endian integer 1
    let mut iv = [0u8; 16];
    iv[0] = 1;

    match key.len() {
        16 => ctr_xor::<ctr::Ctr128LE<Aes128>>(key, &iv, data),
        24 => ctr_xor::<ctr::Ctr128LE<Aes192>>(key, &iv, data),
        32 => ctr_xor::<ctr::Ctr128LE<Aes256>>(key, &iv, data),
        _ => Err(CryptoError::InvalidKeyLength),
    }
}

fn ctr_xor<C>(key: &[u8], iv: &[u8], data: &mut [u8]) -> std::result::Result<(), CryptoError>
where
    C: KeyIvInit + StreamCipher,
{
    let mut cipher = C::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidKeyLength)?;
    cipher.apply_keystream(data);
    Ok(())
}

fn new_mac(key: &[u8]) -> std::result::Result<HmacSha1, CryptoError> {
    <HmacSha1 as Mac>::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)
}

/// Encrypt `data` with a fresh random salt
pub fn encrypt(
    password: &[u8],
    strength: AesStrength,
    data: &[u8],
) -> std::result::Result<Vec<u8>, CryptoError> {
    let mut salt = vec![0u8; strength.salt_len()];
    rand::thread_rng().fill_bytes(&mut salt);
    encrypt_with_salt(password, strength, &salt, data)
}

/// Encrypt with a caller-supplied salt
pub fn encrypt_with_salt(
    password: &[u8],
    strength: AesStrength,
    salt: &[u8],
    data: &[u8],
) -> std::result::Result<Vec<u8>, CryptoError> {
    if salt.len() != strength.salt_len() {
        return Err(CryptoError::InvalidKeyLength);
    }
    let keys = derive_keys(password, salt, strength);

    let mut out = Vec::with_capacity(data.len() + strength.overhead());
    out.extend_from_slice(salt);
    out.extend_from_slice(&keys.verifier);

    let body_start = out.len();
    out.extend_from_slice(data);
    apply_keystream(&keys.encryption, &mut out[body_start..])?;

    let mut mac = new_mac(&keys.authentication)?;
    mac.update(&out[body_start..]);
    let code = mac.finalize().into_bytes();
    out.extend_from_slice(&code[..AUTH_CODE_LEN]);

    Ok(out)
}

/// Verify and decrypt entry data
pub fn decrypt(
    password: &[u8],
    strength: AesStrength,
    data: &[u8],
) -> std::result::Result<Vec<u8>, CryptoError> {
    if data.len() < strength.overhead() {
        return Err(CryptoError::Truncated);
    }

    let salt_len = strength.salt_len();
    let (salt, rest) = data.split_at(salt_len);
    let (verifier, rest) = rest.split_at(PASSWORD_VERIFIER_LEN);
    let (ciphertext, code) = rest.split_at(rest.len() - AUTH_CODE_LEN);

    let keys = derive_keys(password, salt, strength);
    if verifier != keys.verifier {
        return Err(CryptoError::PasswordMismatch);
    }

    let mut mac = new_mac(&keys.authentication)?;
    mac.update(ciphertext);
    mac.verify_truncated_left(code)
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    let mut plain = ciphertext.to_vec();
    apply_keystream(&keys.encryption, &mut plain)?;
    Ok(plain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_tiers() {
        assert_eq!(AesStrength::from_u8(1).unwrap().key_len(), 16);
        assert_eq!(AesStrength::from_u8(2).unwrap().salt_len(), 12);
        assert_eq!(AesStrength::from_u8(3).unwrap().overhead(), 16 + 2 + 10);
        assert!(matches!(
            AesStrength::from_u8(4),
            Err(ZipError::UnsupportedEncryptionStrength(4))
        ));
        assert_eq!(AesStrength::default(), AesStrength::Aes256);
    }

    #[test]
    fn test_roundtrip_all_strengths() {
        let plaintext = b"The quick brown fox jumps over the lazy dog".repeat(10);

        for strength in [AesStrength::Aes128, AesStrength::Aes192, AesStrength::Aes256] {
            let encrypted = encrypt(b"secret", strength, &plaintext).unwrap();
            assert_eq!(encrypted.len(), plaintext.len() + strength.overhead());

            let decrypted = decrypt(b"secret", strength, &encrypted).unwrap();
            assert_eq!(decrypted, plaintext);
        }
    }

    #[test]
    fn test_wrong_password_rejected() {
        let encrypted = encrypt(b"secret", AesStrength::Aes256, b"payload").unwrap();
        let result = decrypt(b"wrong", AesStrength::Aes256, &encrypted);
        assert!(matches!(
            result,
            Err(CryptoError::PasswordMismatch) | Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let salt = [9u8; 16];
        let mut encrypted =
            encrypt_with_salt(b"secret", AesStrength::Aes256, &salt, b"payload bytes").unwrap();
        encrypted[20] ^= 0xFF;

        assert_eq!(
            decrypt(b"secret", AesStrength::Aes256, &encrypted),
            Err(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(
            decrypt(b"secret", AesStrength::Aes128, &[0u8; 10]),
            Err(CryptoError::Truncated)
        );
    }

    #[test]
    fn test_extra_field_roundtrip() {
        let field = AesExtraField {
            vendor_version: VENDOR_VERSION_AE2,
            strength: AesStrength::Aes192,
            method: 8,
        };
        let bytes = field.to_bytes();
        assert_eq!(bytes.len(), AES_EXTRA_FIELD_SIZE);

        // Preceded by an unrelated extended-timestamp field
        let mut extra = vec![0x55, 0x54, 0x05, 0x00, 0x01, 0, 0, 0, 0];
        extra.extend_from_slice(&bytes);

        assert_eq!(AesExtraField::find(&extra).unwrap(), Some(field));
        assert_eq!(AesExtraField::find(&[]).unwrap(), None);
    }

    #[test]
    fn test_extra_field_overrun() {
        let extra = [0x01, 0x99, 0x20, 0x00, 0x02];
        assert!(AesExtraField::find(&extra).is_err());
    }
}
