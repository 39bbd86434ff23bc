use log::info;
use std::sync::Arc;

use crate::api::error;
use crate::modules::uploader::{
    imaging::{detect_content_type, ImageProcessor},
    model::{CropRequest, MediaLocation, UploadRequest, UploadSettings, UploaderConfig},
    naming::NamingStrategy,
    repository::MediaStore,
    schema::{CropResult, Download, StoredImage},
};

/// Bytes ready to be written plus the facts reported back to the caller.
struct PreparedImage {
    filename: String,
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

#[derive(Clone)]
pub struct UploaderService<S>
where
    S: MediaStore + Send + Sync,
{
    store: Arc<S>,
    config: UploaderConfig,
    processor: ImageProcessor,
}

impl<S> UploaderService<S>
where
    S: MediaStore + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, config: UploaderConfig) -> Self {
        info!("UploaderService initialized, media root {}", config.media_dir.display());
        let processor = ImageProcessor::new(config.decode_limits);
        Self { store, config, processor }
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    fn location(&self, folder: Option<&str>, filename: &str) -> Result<MediaLocation, error::SystemError> {
        MediaLocation::new(folder.unwrap_or(&self.config.folder), filename)
    }

    /// Validate file size and declared MIME type
    fn validate_file(
        size: usize,
        mime_type: &str,
        settings: &UploadSettings,
    ) -> Result<(), error::SystemError> {
        if size as u64 > settings.max_size {
            return Err(error::SystemError::invalid_file(format!(
                "File size of {} bytes exceeds maximum allowed size of {} bytes",
                size, settings.max_size
            )));
        }

        if !settings.mime_types.is_empty() && !settings.mime_types.iter().any(|m| m == mime_type) {
            return Err(error::SystemError::invalid_file(format!(
                "File type '{}' is not allowed",
                mime_type
            )));
        }

        Ok(())
    }

    /// Decode, name, bound-check and optionally resize. Runs on the blocking pool.
    fn prepare(
        processor: ImageProcessor,
        payload: Vec<u8>,
        original_filename: &str,
        settings: &UploadSettings,
    ) -> Result<PreparedImage, error::SystemError> {
        let decoded = processor.decode(&payload)?;
        let dimensions = decoded.dimensions();

        let target = if settings.resize_to_show {
            ImageProcessor::show_size(dimensions, &settings.show)
        } else {
            None
        };
        let extension = match target {
            Some(_) => "jpg",
            None => ImageProcessor::extension(decoded.format),
        };

        let filename = NamingStrategy::from_flags(
            settings.generate_unique_name,
            settings.keep_original_name,
        )
        .filename(original_filename, &settings.default_filename, extension)?;

        ImageProcessor::check_bounds(dimensions, &settings.bounds)?;

        let Some(target) = target else {
            return Ok(PreparedImage {
                filename,
                bytes: payload,
                width: dimensions.0,
                height: dimensions.1,
            });
        };

        processor.check_target(target)?;
        let resized = ImageProcessor::resize(&decoded.image, target);
        let bytes = ImageProcessor::encode_jpeg(&resized)
            .map_err(|e| error::SystemError::Internal(Box::new(e)))?;

        Ok(PreparedImage { filename, bytes, width: resized.width(), height: resized.height() })
    }

    /// Validate an uploaded image and store it under its chosen name
    pub async fn upload(&self, request: UploadRequest) -> Result<StoredImage, error::SystemError> {
        if request.payload.is_empty() || request.original_filename.trim().is_empty() {
            return Err(error::SystemError::MissingFile);
        }

        let settings = request.options.resolve(&self.config);
        Self::validate_file(request.payload.len(), &request.mime_type, &settings)?;

        let processor = self.processor;
        let original_filename = request.original_filename;
        let payload = request.payload;
        let blocking_settings = settings.clone();
        let prepared = tokio::task::spawn_blocking(move || {
            Self::prepare(processor, payload, &original_filename, &blocking_settings)
        })
        .await??;

        let location = MediaLocation::new(&settings.folder, &prepared.filename)?;

        let _guard = self.store.lock(&location).await;
        let size = self.store.write(&location, &prepared.bytes).await?;

        info!(
            "Stored upload {}/{} ({}x{}, {} bytes)",
            location.folder(),
            location.filename(),
            prepared.width,
            prepared.height,
            size
        );

        Ok(StoredImage {
            filename: prepared.filename,
            folder: settings.folder,
            size,
            width: prepared.width,
            height: prepared.height,
        })
    }

    /// Delete a stored file
    pub async fn remove(&self, folder: Option<&str>, filename: &str) -> Result<(), error::SystemError> {
        let location = self.location(folder, filename)?;

        let _guard = self.store.lock(&location).await;
        if !self.store.exists(&location).await? {
            return Err(error::SystemError::not_found(filename.to_string()));
        }
        self.store.remove(&location).await?;

        info!("Removed {}/{}", location.folder(), location.filename());
        Ok(())
    }

    /// Read a stored file for download
    pub async fn download(
        &self,
        folder: Option<&str>,
        filename: &str,
    ) -> Result<Download, error::SystemError> {
        let location = self.location(folder, filename)?;
        if !self.store.exists(&location).await? {
            return Err(error::SystemError::not_found(filename.to_string()));
        }
        let bytes = self.store.read(&location).await?;
        let content_type = detect_content_type(location.filename(), &bytes);

        Ok(Download { filename: location.filename().to_string(), content_type, bytes })
    }

    /// Crop a stored image in place
    pub async fn crop(&self, request: CropRequest) -> Result<CropResult, error::SystemError> {
        let location = self.location(request.folder.as_deref(), &request.filename)?;

        let _guard = self.store.lock(&location).await;
        if !self.store.exists(&location).await? {
            return Err(error::SystemError::not_found(request.filename));
        }

        let source = self.store.read(&location).await?;

        let processor = self.processor;
        let shrink_to = if request.resize_to_show.unwrap_or(self.config.resize_to_show) {
            request.show_min_width.or(self.config.show.min_width)
        } else {
            None
        };
        let (bytes, width, height) = tokio::task::spawn_blocking(move || {
            let decoded = processor
                .decode(&source)
                .map_err(|e| error::SystemError::crop_failed(e.to_string()))?;
            let rect = ImageProcessor::source_rect(
                request.rect,
                request.upload_proportion,
                decoded.dimensions(),
            )?;

            tracing::debug!(
                x = rect.x,
                y = rect.y,
                width = rect.width,
                height = rect.height,
                "Cropping image"
            );

            let mut cropped = ImageProcessor::crop(&decoded.image, rect);
            if let Some(target) = shrink_to
                .and_then(|w| ImageProcessor::shrink_to_width((cropped.width(), cropped.height()), w))
            {
                cropped = ImageProcessor::resize(&cropped, target);
            }

            let bytes = ImageProcessor::encode_jpeg(&cropped)
                .map_err(|e| error::SystemError::crop_failed(e.to_string()))?;
            Ok::<_, error::SystemError>((bytes, cropped.width(), cropped.height()))
        })
        .await??;

        let size = self.store.write(&location, &bytes).await?;

        info!("Cropped {}/{} to {}x{}", location.folder(), location.filename(), width, height);

        Ok(CropResult {
            filename: location.filename().to_string(),
            folder: location.folder().to_string(),
            size,
            width,
            height,
        })
    }
}
