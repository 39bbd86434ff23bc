use actix_web::HttpResponse;
use std::borrow::Cow;

pub const SUCCESS_EVENT: &str = "uploader:success";
pub const REMOVED_EVENT: &str = "uploader:fileremoved";
pub const CROPPED_EVENT: &str = "uploader:filecropped";
pub const ERROR_EVENT: &str = "uploader:error";

/// JSON envelope consumed by the uploader front-end widget.
#[derive(serde::Serialize)]
pub struct UploaderEvent<T: serde::Serialize> {
    pub event: Cow<'static, str>,
    pub data: T,
}

impl<T: serde::Serialize> UploaderEvent<T> {
    pub fn new(event: impl Into<Cow<'static, str>>, data: T) -> Self {
        Self { event: event.into(), data }
    }
}

pub struct Success<T: serde::Serialize> {
    pub status: actix_web::http::StatusCode,
    pub body: UploaderEvent<T>,
}

impl<T: serde::Serialize> Success<T> {
    pub fn ok(event: &'static str, data: T) -> Self {
        Self { status: actix_web::http::StatusCode::OK, body: UploaderEvent::new(event, data) }
    }

    pub fn uploaded(data: T) -> Self {
        Self::ok(SUCCESS_EVENT, data)
    }

    pub fn cropped(data: T) -> Self {
        Self::ok(CROPPED_EVENT, data)
    }
}

impl Success<serde_json::Map<String, serde_json::Value>> {
    pub fn removed() -> Self {
        Self::ok(REMOVED_EVENT, serde_json::Map::new())
    }
}

impl<T: serde::Serialize> actix_web::Responder for Success<T> {
    type Body = actix_web::body::BoxBody;

    fn respond_to(self, _req: &actix_web::HttpRequest) -> HttpResponse<Self::Body> {
        HttpResponse::build(self.status).json(self.body)
    }
}
