use serde::Serialize;

/// An image persisted at `{media_dir}/{folder}/{filename}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredImage {
    pub filename: String,
    pub folder: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
}

pub type CropResult = StoredImage;

/// Payload of `uploader:success` and `uploader:filecropped`.
#[derive(Debug, Serialize)]
pub struct ImageEventData {
    pub filename: String,
    pub imagesize: [u32; 2],
}

impl From<StoredImage> for ImageEventData {
    fn from(image: StoredImage) -> Self {
        Self { imagesize: [image.width, image.height], filename: image.filename }
    }
}

#[derive(Debug)]
pub struct Download {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
