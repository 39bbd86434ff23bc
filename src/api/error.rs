use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::borrow::Cow;

use crate::api::success::{UploaderEvent, ERROR_EVENT};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Unprocessable Entity: {0}")]
    UnprocessableEntity(Cow<'static, str>),
    #[error("Internal Server Error: {0}")]
    InternalServer(Cow<'static, str>),
}

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub message: Cow<'static, str>,
}

impl Error {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal_server_error() -> Self {
        Self::InternalServer("Internal Server Error".into())
    }

    fn message(&self) -> &Cow<'static, str> {
        match self {
            Error::BadRequest(msg)
            | Error::NotFound(msg)
            | Error::UnprocessableEntity(msg)
            | Error::InternalServer(msg) => msg,
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InternalServer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(UploaderEvent::new(ERROR_EVENT, ErrorBody { message: self.message().clone() }))
    }
}

/// Failures raised by the intake pipeline and the media store.
#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    #[error("Missing file.")]
    MissingFile,
    #[error("Invalid file: {0}")]
    InvalidFile(Cow<'static, str>),
    #[error("File was not uploaded: {0}")]
    FileNotUploaded(Cow<'static, str>),
    #[error("{0}")]
    ImageTooSmall(Cow<'static, str>),
    #[error("{0}")]
    ImageTooLarge(Cow<'static, str>),
    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),
    #[error("File does not exist: {0}")]
    FileNotFound(Cow<'static, str>),
    #[error("Invalid crop geometry: {0}")]
    InvalidGeometry(Cow<'static, str>),
    #[error("Error on file crop: {0}")]
    CropFailed(Cow<'static, str>),
    #[error("Configuration error: {0}")]
    Config(Cow<'static, str>),
    #[error("Storage I/O error")]
    StorageIo(#[from] std::io::Error),
    #[error("Internal System Error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl SystemError {
    pub fn invalid_file(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidFile(msg.into())
    }

    pub fn not_uploaded(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::FileNotUploaded(msg.into())
    }

    pub fn invalid_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::FileNotFound(msg.into())
    }

    pub fn invalid_geometry(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub fn config(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Config(msg.into())
    }

    pub fn crop_failed(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::CropFailed(msg.into())
    }
}

impl From<tokio::task::JoinError> for SystemError {
    fn from(err: tokio::task::JoinError) -> Self {
        SystemError::Internal(Box::new(err))
    }
}

impl From<SystemError> for Error {
    fn from(value: SystemError) -> Self {
        match value {
            SystemError::MissingFile => Error::bad_request("Missing file."),
            SystemError::InvalidFile(msg) => {
                log::debug!("Rejected upload: {}", msg);
                Error::bad_request("Invalid file.")
            }
            SystemError::FileNotUploaded(msg) => {
                log::debug!("Upload could not be decoded: {}", msg);
                Error::bad_request("File was not uploaded.")
            }
            SystemError::InvalidRequest(msg) => Error::BadRequest(msg),
            SystemError::ImageTooSmall(msg)
            | SystemError::ImageTooLarge(msg)
            | SystemError::InvalidGeometry(msg) => Error::UnprocessableEntity(msg),
            SystemError::FileNotFound(_) => Error::not_found("File does not exist."),
            SystemError::CropFailed(msg) => {
                log::error!("Crop failed: {}", msg);
                Error::InternalServer("Error on file crop.".into())
            }
            _ => {
                log::error!("Internal Server Error: {:?}", value);
                Error::internal_server_error()
            }
        }
    }
}
