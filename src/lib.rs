pub mod config;
pub mod core;
pub mod form;
pub mod handlers;
pub mod logging;
pub mod map;
pub mod models;
pub mod photo;
pub mod posts;
pub mod schema;
pub mod static_server;
pub mod templates;

use spin_sdk::http::{Request, Response};
use tracing::error;

use crate::core::db::FormStore;
use crate::core::errors::ApiError;
use crate::core::kv::KeyValue;

pub use crate::core::kv::MemoryKv;

/// Dispatches one request against `store`. Errors escaping a handler are
/// logged and answered with a 500.
pub fn route<K: KeyValue>(req: Request, store: &FormStore<K>) -> Response {
    let method = req.method().to_string();
    let path = req.path().to_string();

    let result = match (method.as_str(), path.as_str()) {
        ("GET", "/") | ("GET", "/index.html") => handlers::render_page(store),
        ("GET", "/draft") => handlers::get_draft(store),
        ("PUT", "/draft") => handlers::put_draft(req, store),
        ("POST", "/form/events") => handlers::handle_form_event(req, store),
        ("GET", "/posts") => posts::list_posts(store),
        ("GET", "/posts/rows") => posts::list_post_rows(store),
        ("POST", "/posts") => posts::create_post(req, store),
        ("DELETE", p) if p.starts_with("/posts/") => posts::delete_post(req, store),
        ("GET", "/map") => map::open_map(req),
        ("GET", p) => static_server::serve_static(p),
        _ => Ok(ApiError::NotFound("No route found".to_string()).into()),
    };

    match result {
        Ok(resp) => resp,
        Err(e) => {
            error!(error = %e, %method, %path, "handler failed");
            ApiError::InternalError("Internal server error".to_string()).into()
        }
    }
}

// === Component entrypoint ===
#[cfg(target_arch = "wasm32")]
#[spin_sdk::http_component]
fn handle(req: Request) -> anyhow::Result<impl spin_sdk::http::IntoResponse> {
    let store = crate::core::helpers::spin_store()?;
    Ok(route(req, &store))
}
