use actix_multipart::{Field, Multipart};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;

use crate::api::error::SystemError;
use crate::api::{error, success};
use crate::modules::uploader::{
    model::{CropModel, FileModel, UploadOptions, UploadRequest},
    repository::MediaStore,
    schema::ImageEventData,
    service::UploaderService,
};
use crate::utils::{ValidatedForm, ValidatedQuery};

/// Reads one multipart field, charging its bytes against the request budget.
async fn read_field(field: &mut Field, remaining: &mut u64) -> Result<Vec<u8>, SystemError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(|_| SystemError::MissingFile)? {
        let len = chunk.len() as u64;
        if len > *remaining {
            return Err(SystemError::invalid_file("request body exceeds the upload ceiling"));
        }
        *remaining -= len;
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Upload file handler
pub async fn upload_file<S>(
    mut payload: Multipart,
    service: web::Data<UploaderService<S>>,
) -> Result<success::Success<ImageEventData>, error::Error>
where
    S: MediaStore + Send + Sync + 'static,
{
    let mut remaining = service.config().max_request_size;
    let mut options = UploadOptions::default();
    let mut file = None;

    while let Some(mut field) = payload.try_next().await.map_err(|_| SystemError::MissingFile)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let original_filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .unwrap_or_default()
                .to_string();
            let mime_type = field
                .content_type()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());

            let bytes = read_field(&mut field, &mut remaining).await?;
            file = Some((original_filename, mime_type, bytes));
            continue;
        }

        let bytes = read_field(&mut field, &mut remaining).await?;
        let value = String::from_utf8(bytes)
            .map_err(|_| SystemError::invalid_request(format!("Field '{name}' is not valid UTF-8")))?;
        options.set_field(&name, &value)?;
    }

    let (original_filename, mime_type, payload) = file.ok_or(SystemError::MissingFile)?;

    let stored = service
        .upload(UploadRequest { payload, original_filename, mime_type, options })
        .await?;

    Ok(success::Success::uploaded(ImageEventData::from(stored)))
}

/// Remove file handler
pub async fn remove_file<S>(
    body: ValidatedForm<FileModel>,
    service: web::Data<UploaderService<S>>,
) -> Result<success::Success<serde_json::Map<String, serde_json::Value>>, error::Error>
where
    S: MediaStore + Send + Sync + 'static,
{
    let FileModel { filename, folder } = body.0;
    service.remove(folder.as_deref(), &filename).await?;
    Ok(success::Success::removed())
}

/// Download file handler
pub async fn download_file<S>(
    query: ValidatedQuery<FileModel>,
    service: web::Data<UploaderService<S>>,
) -> Result<HttpResponse, error::Error>
where
    S: MediaStore + Send + Sync + 'static,
{
    let FileModel { filename, folder } = query.0;
    let download = service.download(folder.as_deref(), &filename).await?;

    Ok(HttpResponse::Ok()
        .content_type(download.content_type)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(download.filename)],
        })
        .body(download.bytes))
}

/// Crop file handler
pub async fn crop_file<S>(
    body: ValidatedForm<CropModel>,
    service: web::Data<UploaderService<S>>,
) -> Result<success::Success<ImageEventData>, error::Error>
where
    S: MediaStore + Send + Sync + 'static,
{
    let result = service.crop(body.0.into()).await?;
    Ok(success::Success::cropped(ImageEventData::from(result)))
}
