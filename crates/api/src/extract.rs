//! Request extractors that reject with the API's JSON error body.

use std::collections::HashMap;
use std::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Multipart, Request};
use domain::Upload;
use domain::assets::content_type_for;

use crate::error::ApiError;

/// `Json` that reports malformed bodies as validation errors.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// Parses an id taken from the URL path.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what} id: {raw}")))
}

fn multipart_error(e: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart request: {e}"))
}

/// Text fields and files of a `multipart/form-data` body.
///
/// A part with a file name is a file; its type comes from the part's
/// `Content-Type`, or from the file extension when the client sent none.
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, String>,
    files: Vec<(String, Upload)>,
}

impl Form {
    /// Reads every part of the body.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Form::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let file_type = field.file_name().map(|file_name| {
                field
                    .content_type()
                    .filter(|ct| *ct != "application/octet-stream")
                    .or_else(|| content_type_for(&file_name.to_ascii_lowercase()))
                    .unwrap_or_default()
                    .to_string()
            });
            match file_type {
                Some(content_type) => {
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    form.files.push((name, Upload::new(bytes.to_vec(), &content_type)));
                }
                None => {
                    let text = field.text().await.map_err(multipart_error)?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// A text field, trimmed, or None when missing or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Parses a required text field.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T, ApiError> {
        let raw = self
            .text(name)
            .ok_or_else(|| ApiError::BadRequest(format!("{name} is required")))?;
        raw.parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid {name}: {raw}")))
    }

    /// Removes and returns every file sent under `name`, in order.
    pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
        let (taken, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        taken.into_iter().map(|(_, upload)| upload).collect()
    }

    /// Removes and returns the first file sent under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        let index = self.files.iter().position(|(field, _)| field == name)?;
        Some(self.files.remove(index).1)
    }

    /// Names of file parts nobody took.
    pub fn leftover_files(&self) -> Vec<&str> {
        self.files.iter().map(|(field, _)| field.as_str()).collect()
    }
}
