use actix_web::{web, FromRequest};
use futures_util::future::LocalBoxFuture;
use serde::{de::Deserializer, Deserialize};
use validator::Validate;

use crate::api::error;

/// Parses a byte size such as `1024`, `1024k`, `2M`, `512Ki` or `8Mi`.
///
/// Decimal suffixes (`k`, `M`) are powers of 1000, binary suffixes (`Ki`, `Mi`)
/// powers of 1024.
pub fn parse_size(raw: &str) -> Result<u64, error::SystemError> {
    let raw = raw.trim();
    let (digits, factor) = if let Some(n) = raw.strip_suffix("Ki") {
        (n, 1024)
    } else if let Some(n) = raw.strip_suffix("Mi") {
        (n, 1024 * 1024)
    } else if let Some(n) = raw.strip_suffix('k') {
        (n, 1000)
    } else if let Some(n) = raw.strip_suffix('M') {
        (n, 1000 * 1000)
    } else {
        (raw, 1)
    };

    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(factor))
        .ok_or_else(|| error::SystemError::invalid_request(format!("'{raw}' is not a valid size")))
}

/// Parses a pixel bound; `null` and `none` mean unbounded.
pub fn parse_bound(raw: &str) -> Result<Option<u32>, error::SystemError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| error::SystemError::invalid_request(format!("'{raw}' is not a valid pixel bound")))
}

pub fn parse_flag(raw: &str) -> Result<bool, error::SystemError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => Err(error::SystemError::invalid_request(format!("'{other}' is not a boolean"))),
    }
}

/// Accepts a JSON array, a comma separated list or a single mime type.
pub fn parse_mime_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
            return list.into_iter().map(|m| m.trim().to_string()).filter(|m| !m.is_empty()).collect();
        }
    }
    raw.split(',').map(str::trim).filter(|m| !m.is_empty()).map(str::to_string).collect()
}

/// Form fields arrive as strings; empty ones count as absent.
pub fn optional_flag<'de, D>(de: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Deserialize::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_flag(value).map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn optional_pixels<'de, D>(de: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Deserialize::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<u32>().map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn optional_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Deserialize::deserialize(de)?;
    Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

pub struct ValidatedForm<T>(pub T);

impl<T> FromRequest for ValidatedForm<T>
where
    T: Validate + serde::de::DeserializeOwned + 'static,
{
    type Error = error::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let fut = web::Form::<T>::from_request(req, payload);

        Box::pin(async move {
            let form = fut.await.map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            let model = form.into_inner();
            model.validate().map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            Ok(ValidatedForm(model))
        })
    }
}

pub struct ValidatedQuery<T>(pub T);

impl<T> FromRequest for ValidatedQuery<T>
where
    T: Validate + serde::de::DeserializeOwned + 'static,
{
    type Error = error::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let fut = web::Query::<T>::from_request(req, payload);

        Box::pin(async move {
            let query = fut.await.map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            query.validate().map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            Ok(ValidatedQuery(query.into_inner()))
        })
    }
}
