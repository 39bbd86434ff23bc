use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::api::error::SystemError;
use crate::modules::uploader::model::check_component;

/// How the stored filename is chosen. Exactly one strategy applies per upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingStrategy {
    Unique,
    KeepOriginal,
    Default,
}

impl NamingStrategy {
    /// Unique wins over keep-original, which wins over the default name.
    pub fn from_flags(generate_unique_name: bool, keep_original_name: bool) -> Self {
        if generate_unique_name {
            NamingStrategy::Unique
        } else if keep_original_name {
            NamingStrategy::KeepOriginal
        } else {
            NamingStrategy::Default
        }
    }

    pub fn filename(
        self,
        original_filename: &str,
        default_filename: &str,
        extension: &str,
    ) -> Result<String, SystemError> {
        let filename = match self {
            NamingStrategy::Unique => unique_name(extension),
            NamingStrategy::KeepOriginal => original_filename.trim().to_string(),
            NamingStrategy::Default => format!("{default_filename}.{extension}"),
        };
        check_component("filename", &filename)?;
        Ok(filename)
    }
}

/// Hex SHA-256 of a random seed plus the extension.
pub fn unique_name(extension: &str) -> String {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    let digest = Sha256::digest(seed);
    format!("{}.{}", hex::encode(digest), extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_unique_pattern(name: &str, extension: &str) -> bool {
        let Some((hash, ext)) = name.rsplit_once('.') else {
            return false;
        };
        ext == extension && hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn test_unique_wins_over_keep_original() {
        let strategy = NamingStrategy::from_flags(true, true);
        assert_eq!(strategy, NamingStrategy::Unique);

        let name = strategy.filename("holiday.png", "filename", "png").unwrap();
        assert!(is_unique_pattern(&name, "png"), "{name}");
        assert_ne!(name, "holiday.png");
    }

    #[test]
    fn test_unique_names_differ() {
        assert_ne!(unique_name("jpg"), unique_name("jpg"));
    }

    #[test]
    fn test_keep_original_and_default() {
        let keep = NamingStrategy::from_flags(false, true);
        assert_eq!(keep.filename("holiday.png", "filename", "jpg").unwrap(), "holiday.png");

        let default = NamingStrategy::from_flags(false, false);
        assert_eq!(default.filename("holiday.png", "avatar", "jpg").unwrap(), "avatar.jpg");
    }

    #[test]
    fn test_original_name_must_be_a_basename() {
        let keep = NamingStrategy::KeepOriginal;
        for original in ["../../etc/passwd", "nested/dir.png", "..", "", "C:\\evil.png"] {
            let err = keep.filename(original, "filename", "png").unwrap_err();
            assert!(matches!(err, SystemError::InvalidRequest(_)), "{original}");
        }
    }
}
