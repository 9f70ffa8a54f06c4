use serde::{Deserialize, Serialize};
use spin_sdk::http::{Request, Response};
use tracing::warn;

use crate::core::db::FormStore;
use crate::core::errors::ApiError;
use crate::core::helpers::{html_response, json_response};
use crate::core::kv::KeyValue;
use crate::form::{Effect, FormController, FormEvent, FormView};
use crate::models::models::FormDraft;
use crate::templates::render_index;

#[derive(Deserialize, Debug)]
pub struct EventRequest {
    /// Whether the form container is open on the page right now.
    #[serde(default)]
    pub form_visible: bool,
    #[serde(default)]
    pub photo_selected: bool,
    /// Every named field as the page shows it. When present it replaces the
    /// saved draft, so each event writes the whole form.
    #[serde(default)]
    pub values: Option<FormDraft>,
    pub event: FormEvent,
}

#[derive(Serialize, Debug)]
pub struct EventResponse {
    pub view: FormView,
    pub effects: Vec<Effect>,
}

/// `GET /`: the form with the saved draft restored, followed by every post.
pub fn render_page<K: KeyValue>(store: &FormStore<K>) -> anyhow::Result<Response> {
    let controller = FormController::load(store)?;
    let posts = store.list_posts()?;
    let html = render_index(&controller.view(), &posts)?;
    Ok(html_response(html))
}

pub fn get_draft<K: KeyValue>(store: &FormStore<K>) -> anyhow::Result<Response> {
    let draft = store.get_draft()?.unwrap_or_default();
    json_response(200, &draft)
}

/// `PUT /draft`: replaces the saved draft with the posted field map.
pub fn put_draft<K: KeyValue>(req: Request, store: &FormStore<K>) -> anyhow::Result<Response> {
    let draft: FormDraft = match serde_json::from_slice(req.body()) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "rejected draft body");
            return Ok(ApiError::BadRequest("Draft must be an object of strings".to_string()).into());
        }
    };

    let _guard = store.lock_draft()?;
    let mut controller = FormController::new(store);
    controller.replace_values(&draft);
    controller.save_form_data()?;

    json_response(200, &controller.view())
}

/// `POST /form/events`: applies one page event against the page's field
/// snapshot, or the saved draft when the request carries none.
pub fn handle_form_event<K: KeyValue>(req: Request, store: &FormStore<K>) -> anyhow::Result<Response> {
    let request: EventRequest = match serde_json::from_slice(req.body()) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "rejected form event");
            return Ok(ApiError::BadRequest(format!("Invalid event: {}", e)).into());
        }
    };

    let _guard = store.lock_draft()?;
    let controller = match &request.values {
        Some(values) => {
            let mut controller = FormController::new(store);
            controller.replace_values(values);
            controller
        }
        None => FormController::load(store)?,
    };
    let mut controller = controller
        .with_form_visible(request.form_visible)
        .with_photo_selected(request.photo_selected);
    let effects = controller.handle(request.event)?;

    json_response(200, &EventResponse { view: controller.view(), effects })
}
