use serde::Serialize;
use spin_sdk::http::Response;
use spin_sdk::key_value::Store;
use uuid::Uuid;

use crate::core::db::FormStore;

pub fn spin_store() -> anyhow::Result<FormStore<Store>> {
    let store = Store::open_default()
        .map_err(|e| anyhow::anyhow!("Failed to open default KV store: {}", e))?;
    Ok(FormStore::new(store))
}

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

pub fn json_response<T: Serialize>(status: u16, value: &T) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(value)?)
        .build())
}

pub fn html_response(html: String) -> Response {
    Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(html.into_bytes())
        .build()
}

pub fn redirect(location: &str) -> Response {
    Response::builder()
        .status(302)
        .header("Location", location)
        .body(Vec::new())
        .build()
}
