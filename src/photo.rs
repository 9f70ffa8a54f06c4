use base64::{engine::general_purpose::STANDARD, Engine as _};
use mime_guess::from_path;

use crate::core::errors::ApiError;
use crate::models::models::PhotoUpload;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Encodes an uploaded photo as a `data:<mime>;base64,<payload>` URL.
///
/// The payload is decoded first so a truncated or non-base64 upload is
/// rejected here instead of being stored.
pub fn encode_photo(upload: &PhotoUpload, max_bytes: usize) -> Result<String, ApiError> {
    let (declared_mime, payload) = split_data_url(upload.data.trim());

    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| ApiError::BadRequest("Photo is not valid base64".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Photo is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(ApiError::BadRequest(format!(
            "Photo exceeds the {} byte limit",
            max_bytes
        )));
    }

    let mime = upload
        .content_type
        .as_deref()
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .or(declared_mime)
        .or_else(|| {
            upload
                .file_name
                .as_deref()
                .and_then(|name| from_path(name).first())
                .map(|m| m.essence_str().to_string())
        })
        .ok_or_else(|| ApiError::BadRequest("Photo type is unknown".to_string()))?;

    if !mime.starts_with("image/") {
        return Err(ApiError::BadRequest(format!("Photo must be an image, got {}", mime)));
    }

    Ok(format!("{}{}{}{}", DATA_URL_PREFIX, mime, BASE64_MARKER, STANDARD.encode(&bytes)))
}

fn split_data_url(data: &str) -> (Option<String>, &str) {
    if let Some(rest) = data.strip_prefix(DATA_URL_PREFIX) {
        if let Some(idx) = rest.find(BASE64_MARKER) {
            let mime = &rest[..idx];
            let mime = (!mime.is_empty()).then(|| mime.to_string());
            return (mime, &rest[idx + BASE64_MARKER.len()..]);
        }
    }
    (None, data)
}
