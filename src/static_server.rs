use mime_guess::from_path;
use rust_embed::RustEmbed;
use spin_sdk::http::Response;

use crate::core::errors::ApiError;

#[derive(RustEmbed)]
#[folder = "static"]
pub(crate) struct Assets;

/// Serves embedded assets. The page itself is rendered, never served raw.
pub fn serve_static(path: &str) -> anyhow::Result<Response> {
    let file_path = path.trim_start_matches('/');
    if file_path.is_empty() || file_path == "index.html" {
        return Ok(ApiError::NotFound("No such asset".to_string()).into());
    }

    let Some(file) = Assets::get(file_path) else {
        return Ok(ApiError::NotFound("No such asset".to_string()).into());
    };

    let mime = from_path(file_path).first_or_octet_stream();

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", mime.as_ref())
        .body(file.data.to_vec())
        .build())
}
