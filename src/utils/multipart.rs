use std::collections::HashMap;

use actix_multipart::{Field, Multipart, MultipartError};
use futures_util::TryStreamExt;
use tracing::debug;

use super::assets::AssetError;
use crate::error::AppError;

/// Upper bound for a single non-file field.
const MAX_TEXT_FIELD_BYTES: usize = 16 * 1024;
/// Upper bound for the number of parts in one submission.
pub const MAX_FORM_FIELDS: usize = 32;

pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// A parsed `multipart/form-data` submission with at most one file field.
#[derive(Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    pub upload: Option<Upload>,
    /// Set when the file field was present but could not be accepted; the
    /// bytes are dropped, never written anywhere.
    pub upload_error: Option<AssetError>,
}

impl FormData {
    /// Trimmed value, empty when absent.
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(|v| v.trim()).unwrap_or_default()
    }

    /// Trimmed value, `None` when absent or blank.
    pub fn optional(&self, name: &str) -> Option<&str> {
        Some(self.text(name)).filter(|v| !v.is_empty())
    }

    /// Untrimmed value, for secrets where whitespace is significant.
    pub fn raw(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }

    /// HTML checkbox semantics.
    pub fn checked(&self, name: &str) -> bool {
        matches!(self.text(name), "on" | "true" | "1")
    }
}

fn malformed(e: MultipartError) -> AppError {
    debug!(error = %e, "Malformed multipart payload");
    AppError::Validation("The submitted form could not be read".to_string())
}

async fn read_text(field: &mut Field) -> Result<String, AppError> {
    let mut value = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        if value.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::Validation("A form field is too long".to_string()));
        }
        value.extend_from_slice(&chunk);
    }
    String::from_utf8(value)
        .map_err(|_| AppError::Validation("Form fields must be valid UTF-8".to_string()))
}

/// Reads every part of `payload`. The part named `file_field` is collected
/// as an upload of at most `max_bytes`; an empty file part counts as no
/// upload at all.
pub async fn read_form(
    mut payload: Multipart,
    file_field: &str,
    max_bytes: usize,
) -> Result<FormData, AppError> {
    let mut form = FormData::default();
    let mut parts = 0;

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        parts += 1;
        if parts > MAX_FORM_FIELDS {
            debug!(parts, "Multipart payload has too many parts");
            return Err(AppError::Validation(
                "The submitted form has too many fields".to_string(),
            ));
        }
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let is_file = disposition.get_filename().is_some();

        if name != file_field || !is_file {
            let value = read_text(&mut field).await?;
            form.fields.insert(name, value);
            continue;
        }

        let content_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default();

        let mut bytes = Vec::new();
        let mut too_large = false;
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            // keep draining so the rest of the form can still be read
            if too_large || bytes.len() + chunk.len() > max_bytes {
                too_large = true;
                continue;
            }
            bytes.extend_from_slice(&chunk);
        }

        if too_large {
            form.upload = None;
            form.upload_error = Some(AssetError::TooLarge { limit: max_bytes });
        } else if !bytes.is_empty() {
            form.upload = Some(Upload {
                bytes,
                content_type,
            });
        }
    }

    Ok(form)
}
