use crate::api::error::SystemError;
use crate::utils::{parse_bound, parse_flag, parse_mime_list, parse_size};

pub const JPEG_QUALITY: u8 = 90;

pub struct Env {
    pub ip: String,
    pub port: u16,
    pub frontend_url: String,
    pub route_prefix: String,
    pub media_dir: String,
    pub media_folder: String,
    pub max_size: u64,
    pub mime_types: Vec<String>,
    pub image_min_width: Option<u32>,
    pub image_min_height: Option<u32>,
    pub image_max_width: Option<u32>,
    pub image_max_height: Option<u32>,
    pub image_show_min_width: Option<u32>,
    pub image_show_max_width: Option<u32>,
    pub image_resize_to_show: bool,
    pub generate_unique_name: bool,
    pub keep_original_name: bool,
    pub default_filename: String,
    pub max_request_size: u64,
    pub decode_max_dimension: u32,
    pub decode_max_alloc: u64,
}

fn var(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

fn with_key<T>(key: &str, parsed: Result<T, SystemError>) -> Result<T, SystemError> {
    parsed.map_err(|e| SystemError::config(format!("{key}: {e}")))
}

impl Env {
    pub fn from_env() -> Result<Self, SystemError> {
        let port = var("PORT", "8080")
            .parse::<u16>()
            .map_err(|_| SystemError::config("PORT must be a valid u16 integer"))?;
        let decode_max_dimension = var("IMAGE_DECODE_MAX_DIMENSION", "10000")
            .parse::<u32>()
            .map_err(|_| SystemError::config("IMAGE_DECODE_MAX_DIMENSION must be a valid u32"))?;

        Ok(Env {
            ip: var("IP", "127.0.0.1"),
            port,
            frontend_url: var("FRONTEND_URL", "http://localhost:5173"),
            route_prefix: var("ROUTE_PREFIX", "/uploader"),
            media_dir: var("MEDIA_DIR", "./web"),
            media_folder: var("MEDIA_FOLDER", "uploads"),
            max_size: with_key("MEDIA_MAX_SIZE", parse_size(&var("MEDIA_MAX_SIZE", "1024k")))?,
            mime_types: parse_mime_list(&var("MEDIA_MIME_TYPES", "")),
            image_min_width: with_key("IMAGE_MIN_WIDTH", parse_bound(&var("IMAGE_MIN_WIDTH", "150")))?,
            image_min_height: with_key(
                "IMAGE_MIN_HEIGHT",
                parse_bound(&var("IMAGE_MIN_HEIGHT", "150")),
            )?,
            image_max_width: with_key("IMAGE_MAX_WIDTH", parse_bound(&var("IMAGE_MAX_WIDTH", "null")))?,
            image_max_height: with_key(
                "IMAGE_MAX_HEIGHT",
                parse_bound(&var("IMAGE_MAX_HEIGHT", "null")),
            )?,
            image_show_min_width: with_key(
                "IMAGE_SHOW_MIN_WIDTH",
                parse_bound(&var("IMAGE_SHOW_MIN_WIDTH", "180")),
            )?,
            image_show_max_width: with_key(
                "IMAGE_SHOW_MAX_WIDTH",
                parse_bound(&var("IMAGE_SHOW_MAX_WIDTH", "null")),
            )?,
            image_resize_to_show: with_key(
                "IMAGE_RESIZE_TO_SHOW",
                parse_flag(&var("IMAGE_RESIZE_TO_SHOW", "true")),
            )?,
            generate_unique_name: with_key(
                "GENERATE_UNIQUE_NAME",
                parse_flag(&var("GENERATE_UNIQUE_NAME", "false")),
            )?,
            keep_original_name: with_key(
                "KEEP_ORIGINAL_NAME",
                parse_flag(&var("KEEP_ORIGINAL_NAME", "false")),
            )?,
            default_filename: var("DEFAULT_FILENAME", "filename"),
            max_request_size: with_key("MAX_REQUEST_SIZE", parse_size(&var("MAX_REQUEST_SIZE", "32Mi")))?,
            decode_max_dimension,
            decode_max_alloc: with_key(
                "IMAGE_DECODE_MAX_ALLOC",
                parse_size(&var("IMAGE_DECODE_MAX_ALLOC", "256Mi")),
            )?,
        })
    }
}
