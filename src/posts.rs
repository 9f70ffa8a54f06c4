use serde::Serialize;
use spin_sdk::http::{Request, Response};
use tracing::{error, warn};

use crate::core::db::FormStore;
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, validate_uuid};
use crate::core::kv::KeyValue;
use crate::form::{Effect, FormController, FormView};
use crate::models::models::{Post, SubmitRequest};
use crate::templates::render_rows;

#[derive(Serialize)]
struct Submitted<'a> {
    post: &'a Post,
    view: FormView,
    effects: Vec<Effect>,
}

#[derive(Serialize)]
struct Deleted {
    effects: Vec<Effect>,
}

fn error_response(err: ApiError) -> Response {
    match &err {
        ApiError::InternalError(msg) => error!(%msg, "request failed"),
        other => warn!(error = %other, "request rejected"),
    }
    err.into()
}

pub fn create_post<K: KeyValue>(req: Request, store: &FormStore<K>) -> anyhow::Result<Response> {
    let request: SubmitRequest = match serde_json::from_slice(req.body()) {
        Ok(r) => r,
        Err(e) => return Ok(error_response(ApiError::BadRequest(format!("Invalid post: {}", e)))),
    };

    let mut controller = FormController::load(store)?.with_form_visible(true);
    match controller.submit(request) {
        Ok((post, effects)) => json_response(
            201,
            &Submitted { post: &post, view: controller.view(), effects },
        ),
        Err(e) => Ok(error_response(e)),
    }
}

pub fn list_posts<K: KeyValue>(store: &FormStore<K>) -> anyhow::Result<Response> {
    let posts = store.list_posts()?;
    json_response(200, &posts)
}

/// Table body fragment, one `<tr>` per stored post.
pub fn list_post_rows<K: KeyValue>(store: &FormStore<K>) -> anyhow::Result<Response> {
    let posts = store.list_posts()?;
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(render_rows(&posts).into_bytes())
        .build())
}

pub fn delete_post<K: KeyValue>(req: Request, store: &FormStore<K>) -> anyhow::Result<Response> {
    let path = req.path();
    let post_id = path.split('/').last().unwrap_or("");

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(error_response(ApiError::BadRequest("Post ID required".to_string())));
    }

    let controller = FormController::new(store);
    match controller.delete_post(post_id) {
        Ok(effects) => json_response(200, &Deleted { effects }),
        Err(e) => Ok(error_response(e)),
    }
}
