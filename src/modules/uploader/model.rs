use serde::Deserialize;
use std::path::PathBuf;
use validator::Validate;

use crate::api::error::SystemError;
use crate::constants::Env;
use crate::utils::{
    optional_flag, optional_pixels, optional_string, parse_bound, parse_flag, parse_mime_list,
    parse_size,
};

/// Min/max pixel bounds; `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DimensionBounds {
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

/// Display width band used by resize-to-show.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShowBand {
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    pub max_dimension: u32,
    pub max_alloc: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self { max_dimension: 10_000, max_alloc: 256 * 1024 * 1024 }
    }
}

/// Uploader configuration
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub media_dir: PathBuf,
    pub folder: String,
    pub max_size: u64,
    pub mime_types: Vec<String>,
    pub bounds: DimensionBounds,
    pub show: ShowBand,
    pub resize_to_show: bool,
    pub generate_unique_name: bool,
    pub keep_original_name: bool,
    pub default_filename: String,
    pub max_request_size: u64,
    pub decode_limits: DecodeLimits,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("./web"),
            folder: "uploads".to_string(),
            max_size: 1024 * 1000, // 1024k
            mime_types: Vec::new(),
            bounds: DimensionBounds {
                min_width: Some(150),
                min_height: Some(150),
                max_width: None,
                max_height: None,
            },
            show: ShowBand { min_width: Some(180), max_width: None },
            resize_to_show: true,
            generate_unique_name: false,
            keep_original_name: false,
            default_filename: "filename".to_string(),
            max_request_size: 32 * 1024 * 1024,
            decode_limits: DecodeLimits::default(),
        }
    }
}

impl From<&Env> for UploaderConfig {
    fn from(env: &Env) -> Self {
        Self {
            media_dir: PathBuf::from(&env.media_dir),
            folder: env.media_folder.clone(),
            max_size: env.max_size,
            mime_types: env.mime_types.clone(),
            bounds: DimensionBounds {
                min_width: env.image_min_width,
                min_height: env.image_min_height,
                max_width: env.image_max_width,
                max_height: env.image_max_height,
            },
            show: ShowBand {
                min_width: env.image_show_min_width,
                max_width: env.image_show_max_width,
            },
            resize_to_show: env.image_resize_to_show,
            generate_unique_name: env.generate_unique_name,
            keep_original_name: env.keep_original_name,
            default_filename: env.default_filename.clone(),
            max_request_size: env.max_request_size,
            decode_limits: DecodeLimits {
                max_dimension: env.decode_max_dimension,
                max_alloc: env.decode_max_alloc,
            },
        }
    }
}

/// Per-request overrides sent along with an upload.
///
/// `Some(None)` on a bound means the caller explicitly asked for "unbounded".
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub folder: Option<String>,
    pub max_size: Option<u64>,
    pub mime_types: Option<Vec<String>>,
    pub min_width: Option<Option<u32>>,
    pub min_height: Option<Option<u32>>,
    pub max_width: Option<Option<u32>>,
    pub max_height: Option<Option<u32>>,
    pub show_min_width: Option<Option<u32>>,
    pub show_max_width: Option<Option<u32>>,
    pub resize_to_show: Option<bool>,
    pub generate_unique_name: Option<bool>,
    pub keep_original_name: Option<bool>,
    pub default_filename: Option<String>,
}

impl UploadOptions {
    /// Applies one multipart text field. Unknown fields are ignored and empty
    /// values keep the configured default.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), SystemError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(());
        }

        match name {
            "folder" => self.folder = Some(value.to_string()),
            "maxSize" => self.max_size = Some(parse_size(value)?),
            "mimeTypes" | "mimeTypes[]" => {
                self.mime_types.get_or_insert_with(Vec::new).extend(parse_mime_list(value))
            }
            "imageMinWidth" => self.min_width = Some(parse_bound(value)?),
            "imageMinHeight" => self.min_height = Some(parse_bound(value)?),
            "imageMaxWidth" => self.max_width = Some(parse_bound(value)?),
            "imageMaxHeight" => self.max_height = Some(parse_bound(value)?),
            "imageShowMinWidth" => self.show_min_width = Some(parse_bound(value)?),
            "imageShowMaxWidth" => self.show_max_width = Some(parse_bound(value)?),
            "imageResizeToShow" => self.resize_to_show = Some(parse_flag(value)?),
            "generateUniqueName" => self.generate_unique_name = Some(parse_flag(value)?),
            "keepOriginalName" => self.keep_original_name = Some(parse_flag(value)?),
            "defaultFilename" => self.default_filename = Some(value.to_string()),
            _ => {}
        }
        Ok(())
    }

    pub fn resolve(&self, config: &UploaderConfig) -> UploadSettings {
        UploadSettings {
            folder: self.folder.clone().unwrap_or_else(|| config.folder.clone()),
            max_size: self.max_size.unwrap_or(config.max_size),
            mime_types: self.mime_types.clone().unwrap_or_else(|| config.mime_types.clone()),
            bounds: DimensionBounds {
                min_width: self.min_width.unwrap_or(config.bounds.min_width),
                min_height: self.min_height.unwrap_or(config.bounds.min_height),
                max_width: self.max_width.unwrap_or(config.bounds.max_width),
                max_height: self.max_height.unwrap_or(config.bounds.max_height),
            },
            show: ShowBand {
                min_width: self.show_min_width.unwrap_or(config.show.min_width),
                max_width: self.show_max_width.unwrap_or(config.show.max_width),
            },
            resize_to_show: self.resize_to_show.unwrap_or(config.resize_to_show),
            generate_unique_name: self.generate_unique_name.unwrap_or(config.generate_unique_name),
            keep_original_name: self.keep_original_name.unwrap_or(config.keep_original_name),
            default_filename: self
                .default_filename
                .clone()
                .unwrap_or_else(|| config.default_filename.clone()),
        }
    }
}

/// Effective upload parameters after overrides are applied.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub folder: String,
    pub max_size: u64,
    pub mime_types: Vec<String>,
    pub bounds: DimensionBounds,
    pub show: ShowBand,
    pub resize_to_show: bool,
    pub generate_unique_name: bool,
    pub keep_original_name: bool,
    pub default_filename: String,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub payload: Vec<u8>,
    pub original_filename: String,
    pub mime_type: String,
    pub options: UploadOptions,
}

/// Crop rectangle in preview pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone)]
pub struct CropRequest {
    pub filename: String,
    pub folder: Option<String>,
    pub upload_proportion: f64,
    pub rect: CropRect,
    pub resize_to_show: Option<bool>,
    pub show_min_width: Option<u32>,
}

/// A `{folder}/{filename}` pair below the media root. Both parts are single
/// path components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaLocation {
    folder: String,
    filename: String,
}

impl MediaLocation {
    pub fn new(folder: &str, filename: &str) -> Result<Self, SystemError> {
        if filename.trim().is_empty() {
            return Err(SystemError::invalid_request("Invalid file."));
        }
        check_component("folder", folder)?;
        check_component("filename", filename)?;
        Ok(Self { folder: folder.to_string(), filename: filename.to_string() })
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.folder).join(&self.filename)
    }
}

pub fn check_component(kind: &str, value: &str) -> Result<(), SystemError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(SystemError::invalid_request(format!("Invalid {kind}: '{value}'")));
    }
    Ok(())
}

/// Form body for remove, query string for download.
#[derive(Debug, Deserialize, Validate)]
pub struct FileModel {
    #[serde(default)]
    #[validate(length(min = 1, message = "Invalid file."))]
    pub filename: String,
    #[serde(default, deserialize_with = "optional_string")]
    pub folder: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CropModel {
    #[serde(default)]
    #[validate(length(min = 1, message = "Invalid file."))]
    pub filename: String,
    #[serde(default, deserialize_with = "optional_string")]
    pub folder: Option<String>,
    pub upload_proportion: f64,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default, deserialize_with = "optional_flag")]
    pub crop_resize_to_show: Option<bool>,
    #[serde(default, deserialize_with = "optional_pixels")]
    pub image_show_min_width: Option<u32>,
}

impl From<CropModel> for CropRequest {
    fn from(model: CropModel) -> Self {
        Self {
            filename: model.filename,
            folder: model.folder,
            upload_proportion: model.upload_proportion,
            rect: CropRect { x: model.x, y: model.y, w: model.w, h: model.h },
            resize_to_show: model.crop_resize_to_show,
            show_min_width: model.image_show_min_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_take_precedence() {
        let config = UploaderConfig::default();
        let mut options = UploadOptions::default();
        options.set_field("folder", "avatars").unwrap();
        options.set_field("maxSize", "2M").unwrap();
        options.set_field("imageMinWidth", "null").unwrap();
        options.set_field("imageShowMaxWidth", "640").unwrap();
        options.set_field("imageResizeToShow", "0").unwrap();
        options.set_field("defaultFilename", "").unwrap();

        let settings = options.resolve(&config);

        assert_eq!(settings.folder, "avatars");
        assert_eq!(settings.max_size, 2_000_000);
        assert_eq!(settings.bounds.min_width, None);
        assert_eq!(settings.bounds.min_height, Some(150));
        assert_eq!(settings.show, ShowBand { min_width: Some(180), max_width: Some(640) });
        assert!(!settings.resize_to_show);
        assert_eq!(settings.default_filename, "filename");
    }

    #[test]
    fn test_repeated_mime_fields_accumulate() {
        let mut options = UploadOptions::default();
        options.set_field("mimeTypes[]", "image/png").unwrap();
        options.set_field("mimeTypes[]", "image/gif").unwrap();

        assert_eq!(options.mime_types.unwrap(), vec!["image/png", "image/gif"]);
    }

    #[test]
    fn test_malformed_override_is_rejected() {
        let mut options = UploadOptions::default();
        let err = options.set_field("imageMaxHeight", "tall").unwrap_err();
        assert!(matches!(err, SystemError::InvalidRequest(_)));
    }

    #[test]
    fn test_media_location_rejects_traversal() {
        assert!(MediaLocation::new("uploads", "photo.png").is_ok());
        for (folder, filename) in [
            ("uploads", ""),
            ("uploads", "../etc/passwd"),
            ("uploads", "a/b.png"),
            ("uploads", "a\\b.png"),
            ("..", "photo.png"),
            ("up/loads", "photo.png"),
            ("", "photo.png"),
        ] {
            let err = MediaLocation::new(folder, filename).unwrap_err();
            assert!(matches!(err, SystemError::InvalidRequest(_)), "{folder}/{filename}");
        }
    }
}
