//! Typed options for archive creation and extraction.
//!
//! Options arrive from a caller (often as JSON tool arguments or a TOML
//! file), are validated once with [`ArchiveOptions::resolve`], and only the
//! resolved form travels into the engine.

use crate::archive::codec::{EncodeSettings, Encryption, EncryptionScheme};
use crate::archive::crypto::winzip_aes::AesStrength;
use crate::archive::DosDateTime;
use crate::error::{Result, ZipError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default deflate level
pub const DEFAULT_LEVEL: i32 = 5;

/// Options for building an archive
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ArchiveOptions {
    /// 0 stores, 1-9 deflates; out-of-range values are clamped
    pub level: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// 1, 2 or 3 (AES-128/192/256); defaults to 3 when a password is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_strength: Option<u8>,

    /// Archive comment stored in the end of central directory record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Use traditional PKWARE encryption instead of AES
    pub legacy_encryption: bool,

    /// Fixed modification time for every entry; "now" when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DosDateTime>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            password: None,
            encryption_strength: None,
            comment: None,
            legacy_encryption: false,
            modified: None,
        }
    }
}

impl std::fmt::Debug for ArchiveOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveOptions")
            .field("level", &self.level)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("encryption_strength", &self.encryption_strength)
            .field("comment", &self.comment)
            .field("legacy_encryption", &self.legacy_encryption)
            .field("modified", &self.modified)
            .finish()
    }
}

impl ArchiveOptions {
    /// Create options with a password using the default AES-256 tier
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Level clamped into [0, 9]
    pub fn clamped_level(&self) -> u32 {
        self.level.clamp(0, 9) as u32
    }

    /// Validate and resolve into the form the engine consumes
    pub fn resolve(&self) -> Result<ResolvedOptions> {
        let scheme = match (&self.password, self.legacy_encryption) {
            (None, _) => {
                if let Some(strength) = self.encryption_strength {
                    AesStrength::from_u8(strength)?;
                }
                None
            }
            (Some(_), true) => Some(EncryptionScheme::Traditional),
            (Some(_), false) => {
                let strength = match self.encryption_strength {
                    Some(value) => AesStrength::from_u8(value)?,
                    None => AesStrength::default(),
                };
                Some(EncryptionScheme::Aes(strength))
            }
        };

        if let Some(comment) = &self.comment {
            if comment.len() > u16::MAX as usize {
                return Err(ZipError::InvalidOption(format!(
                    "archive comment is {} bytes (max {})",
                    comment.len(),
                    u16::MAX
                )));
            }
        }

        Ok(ResolvedOptions {
            level: self.clamped_level(),
            password: self.password.clone(),
            scheme,
            comment: self.comment.clone(),
            modified: self.modified.unwrap_or_else(DosDateTime::now),
        })
    }
}

/// Validated archive options
#[derive(Clone)]
pub struct ResolvedOptions {
    pub level: u32,
    password: Option<String>,
    pub scheme: Option<EncryptionScheme>,
    pub comment: Option<String>,
    pub modified: DosDateTime,
}

impl ResolvedOptions {
    /// Per-entry settings borrowing the password for one encode pass
    pub fn encode_settings(&self) -> EncodeSettings<'_> {
        let encryption = match (&self.password, self.scheme) {
            (Some(password), Some(scheme)) => Some(Encryption {
                password: password.as_bytes(),
                scheme,
            }),
            _ => None,
        };
        EncodeSettings {
            level: self.level,
            encryption,
            modified: self.modified,
        }
    }
}

/// Options for projecting an archive onto a directory
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Replace files that already exist instead of skipping them
    #[serde(alias = "overwrite")]
    pub overwrite_existing: bool,

    /// Create the output root when it does not exist
    #[serde(alias = "createDirectories")]
    pub create_missing_directories: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            password: None,
            overwrite_existing: false,
            create_missing_directories: true,
        }
    }
}

impl std::fmt::Debug for ExtractionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionOptions")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("overwrite_existing", &self.overwrite_existing)
            .field("create_missing_directories", &self.create_missing_directories)
            .finish()
    }
}

/// Engine-wide defaults, loadable from TOML
///
/// ```toml
/// [archive]
/// level = 9
/// legacyEncryption = false
///
/// [extraction]
/// overwriteExisting = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub archive: ArchiveOptions,
    pub extraction: ExtractionOptions,
}

impl EngineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.archive.resolve()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ArchiveOptions::default();
        assert_eq!(options.level, 5);
        assert_eq!(options.clamped_level(), 5);

        let extraction = ExtractionOptions::default();
        assert!(!extraction.overwrite_existing);
        assert!(extraction.create_missing_directories);
    }

    #[test]
    fn test_level_clamping() {
        let mut options = ArchiveOptions::default();
        options.level = 15;
        assert_eq!(options.clamped_level(), 9);
        options.level = -3;
        assert_eq!(options.clamped_level(), 0);
    }

    #[test]
    fn test_password_defaults_to_aes256() {
        let resolved = ArchiveOptions::with_password("secret").resolve().unwrap();
        assert_eq!(
            resolved.scheme,
            Some(EncryptionScheme::Aes(AesStrength::Aes256))
        );
        assert!(resolved.encode_settings().encryption.is_some());
    }

    #[test]
    fn test_legacy_encryption() {
        let mut options = ArchiveOptions::with_password("secret");
        options.legacy_encryption = true;
        options.encryption_strength = Some(1);
        let resolved = options.resolve().unwrap();
        assert_eq!(resolved.scheme, Some(EncryptionScheme::Traditional));
    }

    #[test]
    fn test_invalid_strength_rejected() {
        let mut options = ArchiveOptions::with_password("secret");
        options.encryption_strength = Some(4);
        assert!(matches!(
            options.resolve(),
            Err(ZipError::UnsupportedEncryptionStrength(4))
        ));

        options.password = None;
        assert!(options.resolve().is_err());
    }

    #[test]
    fn test_no_password_means_no_encryption() {
        let resolved = ArchiveOptions::default().resolve().unwrap();
        assert!(resolved.scheme.is_none());
        assert!(resolved.encode_settings().encryption.is_none());
    }

    #[test]
    fn test_json_arguments() {
        let options: ArchiveOptions = serde_json::from_str(
            r#"{"level": 9, "password": "pw", "encryptionStrength": 2, "comment": "hi"}"#,
        )
        .unwrap();
        assert_eq!(options.level, 9);
        assert_eq!(options.encryption_strength, Some(2));
        assert!(!options.legacy_encryption);

        let extraction: ExtractionOptions =
            serde_json::from_str(r#"{"overwrite": true, "createDirectories": false}"#).unwrap();
        assert!(extraction.overwrite_existing);
        assert!(!extraction.create_missing_directories);
    }

    #[test]
    fn test_debug_redacts_password() {
        let options = ArchiveOptions::with_password("hunter2");
        assert!(!format!("{:?}", options).contains("hunter2"));
    }

    #[test]
    fn test_toml_config() {
        let config = EngineConfig::from_toml_str(
            r#"
            [archive]
            level = 9
            comment = "nightly"

            [extraction]
            overwriteExisting = true
            "#,
        )
        .unwrap();
        assert_eq!(config.archive.level, 9);
        assert_eq!(config.archive.comment.as_deref(), Some("nightly"));
        assert!(config.extraction.overwrite_existing);
        assert!(config.extraction.create_missing_directories);
    }

    #[test]
    fn test_toml_config_rejects_bad_strength() {
        let result = EngineConfig::from_toml_str("[archive]\nencryptionStrength = 7\n");
        assert!(matches!(result, Err(ZipError::UnsupportedEncryptionStrength(7))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("zipvault.toml");
        std::fs::write(&path, "[archive]\nlevel = 0\nlegacyEncryption = true\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.archive.clamped_level(), 0);
        assert!(config.archive.legacy_encryption);

        assert!(matches!(
            EngineConfig::load(dir.path().join("missing.toml")),
            Err(ZipError::Io(_))
        ));
    }
}
