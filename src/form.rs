//! Form controller: the one place that turns page events into draft writes,
//! post submissions and row updates.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{max_photo_bytes, TOGGLE_LABEL_CANCEL, TOGGLE_LABEL_SHOW};
use crate::core::db::FormStore;
use crate::core::errors::{ApiError, StoreError};
use crate::core::helpers::now_iso;
use crate::core::kv::KeyValue;
use crate::map::map_search_url;
use crate::models::models::{FormDraft, Post, SubmitRequest};
use crate::photo::encode_photo;
use crate::schema::{
    self, check_validity, FieldError, FieldKind, ADDRESS, AREA, CHECKED, INCIDENT_TYPE,
    PEOPLE_COUNT, UNKNOWN_PEOPLE,
};
use crate::templates::render_post_row;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormEvent {
    ToggleForm,
    Input { name: String, value: String },
    IncidentTypeChanged { value: String },
    UnknownPeopleChanged { checked: bool },
    PhotoSelected { selected: bool },
    Clear,
    /// `area` and `address` are the live field values when the page sends
    /// them; otherwise the controller's own values are used.
    OpenMap {
        #[serde(default)]
        area: Option<String>,
        #[serde(default)]
        address: Option<String>,
    },
    CloseMapModal,
}

/// Instructions for the page after an event has been handled.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    OpenUrl { url: String, target: String },
    AppendRow { id: String, html: String },
    RemoveRow { id: String },
    /// Reset the form, then show `values` in it.
    ResetForm { values: FormDraft },
    CloseMapModal,
}

/// Everything the page needs to redraw the form.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub form_visible: bool,
    pub toggle_label: &'static str,
    pub rescue_visible: bool,
    pub people_required: bool,
    pub people_disabled: bool,
    pub submit_enabled: bool,
    pub values: FormDraft,
    pub errors: Vec<FieldError>,
}

pub struct FormController<'a, K> {
    store: &'a FormStore<K>,
    values: FormDraft,
    form_visible: bool,
    photo_selected: bool,
    errors: Vec<FieldError>,
}

impl<'a, K: KeyValue> FormController<'a, K> {
    /// Starts from an empty, hidden form without touching storage.
    pub fn new(store: &'a FormStore<K>) -> Self {
        let mut controller = Self {
            store,
            values: FormDraft::default(),
            form_visible: false,
            photo_selected: false,
            errors: Vec::new(),
        };
        controller.refresh_validity();
        controller
    }

    /// Builds a controller with the persisted draft restored.
    pub fn load(store: &'a FormStore<K>) -> Result<Self, StoreError> {
        let mut controller = Self::new(store);
        controller.load_form_data()?;
        Ok(controller)
    }

    pub fn with_form_visible(mut self, visible: bool) -> Self {
        self.form_visible = visible;
        self
    }

    pub fn with_photo_selected(mut self, selected: bool) -> Self {
        self.photo_selected = selected;
        self.refresh_validity();
        self
    }

    pub fn values(&self) -> &FormDraft {
        &self.values
    }

    pub fn rescue_visible(&self) -> bool {
        schema::rescue_needed(&self.values)
    }

    pub fn people_disabled(&self) -> bool {
        schema::people_unknown(&self.values)
    }

    pub fn people_required(&self) -> bool {
        self.rescue_visible() && !self.people_disabled()
    }

    pub fn submit_enabled(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn view(&self) -> FormView {
        FormView {
            form_visible: self.form_visible,
            toggle_label: if self.form_visible { TOGGLE_LABEL_CANCEL } else { TOGGLE_LABEL_SHOW },
            rescue_visible: self.rescue_visible(),
            people_required: self.people_required(),
            people_disabled: self.people_disabled(),
            submit_enabled: self.submit_enabled(),
            values: self.values.clone(),
            errors: self.errors.clone(),
        }
    }

    pub fn handle(&mut self, event: FormEvent) -> Result<Vec<Effect>, StoreError> {
        debug!(?event, "form event");
        let mut effects = Vec::new();

        match event {
            FormEvent::ToggleForm => {
                self.form_visible = !self.form_visible;
            }
            FormEvent::Input { name, value } => self.set_field(&name, &value),
            FormEvent::IncidentTypeChanged { value } => self.set_field(INCIDENT_TYPE, &value),
            FormEvent::UnknownPeopleChanged { checked } => {
                self.set_field(UNKNOWN_PEOPLE, if checked { CHECKED } else { "" });
            }
            FormEvent::PhotoSelected { selected } => {
                self.photo_selected = selected;
            }
            FormEvent::Clear => {
                self.clear_form();
                effects.push(Effect::ResetForm { values: self.collect_fields() });
            }
            FormEvent::OpenMap { area, address } => {
                let url = map_search_url(
                    area.as_deref().unwrap_or_else(|| self.values.get(AREA).unwrap_or("")),
                    address.as_deref().unwrap_or_else(|| self.values.get(ADDRESS).unwrap_or("")),
                );
                return Ok(vec![Effect::OpenUrl { url, target: "_blank".to_string() }]);
            }
            FormEvent::CloseMapModal => return Ok(vec![Effect::CloseMapModal]),
        }

        self.refresh_validity();
        self.save_form_data()?;
        Ok(effects)
    }

    /// Replaces every draft field with the supplied values.
    pub fn replace_values(&mut self, values: &FormDraft) {
        self.values = FormDraft::default();
        for (name, value) in values.iter() {
            self.set_field(name, value);
        }
        self.refresh_validity();
    }

    /// Mirrors the current field values into storage, overwriting the
    /// previous draft.
    pub fn save_form_data(&self) -> Result<(), StoreError> {
        self.store.set_draft(&self.collect_fields())
    }

    /// Restores persisted values for fields that exist in the form.
    pub fn load_form_data(&mut self) -> Result<(), StoreError> {
        let Some(draft) = self.store.get_draft()? else {
            return Ok(());
        };
        let mut skipped = 0;
        for (name, value) in draft.iter() {
            match schema::field(name) {
                Some(spec) if spec.in_draft() => self.set_field(name, value),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(skipped, "ignored draft keys without a matching field");
        }
        self.refresh_validity();
        Ok(())
    }

    /// Resets every field and disables submit. Storage is left alone.
    pub fn clear_form(&mut self) {
        self.values = FormDraft::default();
        self.photo_selected = false;
        self.refresh_validity();
    }

    /// Stores a post, and only once it is stored resets and hides the form.
    ///
    /// A rejected submission leaves the form state as submitted so the page
    /// can show the errors.
    pub fn submit(&mut self, request: SubmitRequest) -> Result<(Post, Vec<Effect>), ApiError> {
        // Validity is checked on what will be stored, after markup is gone
        let sanitized: FormDraft = request
            .fields
            .iter()
            .map(|(name, value)| {
                let value = match schema::field(name) {
                    Some(spec) if spec.is_free_text() => sanitize_text(value),
                    _ => value.to_string(),
                };
                (name.to_string(), value)
            })
            .collect();
        self.replace_values(&sanitized);
        self.photo_selected = request.photo.is_some();
        self.refresh_validity();
        if !self.errors.is_empty() {
            return Err(ApiError::Invalid(self.errors.clone()));
        }

        let photo = match request.photo.as_ref() {
            Some(upload) => encode_photo(upload, max_photo_bytes())?,
            None => return Err(ApiError::BadRequest("A photo is required".to_string())),
        };

        let fields = self.collect_fields().into_fields();
        let post = self.store.append_post(Post {
            id: String::new(),
            created_at: now_iso(),
            photo,
            fields,
        })?;
        info!(id = %post.id, "incident submitted");

        self.clear_form();
        self.form_visible = false;
        self.save_form_data()?;

        let effects = vec![
            Effect::AppendRow { id: post.id.clone(), html: render_post_row(&post) },
            Effect::ResetForm { values: self.collect_fields() },
        ];
        Ok((post, effects))
    }

    pub fn delete_post(&self, id: &str) -> Result<Vec<Effect>, ApiError> {
        if !self.store.delete_post(id)? {
            return Err(ApiError::NotFound("Post not found".to_string()));
        }
        Ok(vec![Effect::RemoveRow { id: id.to_string() }])
    }

    fn set_field(&mut self, name: &str, value: &str) {
        let Some(spec) = schema::field(name).filter(|s| s.in_draft()) else {
            return;
        };
        if name == PEOPLE_COUNT && self.people_disabled() {
            return;
        }
        if spec.kind == FieldKind::Checkbox {
            if value == CHECKED || value == "true" {
                self.values.set(name, CHECKED);
            } else {
                self.values.remove(name);
            }
        } else {
            self.values.set(name, value);
        }
        if name == UNKNOWN_PEOPLE && self.people_disabled() {
            self.values.set(PEOPLE_COUNT, "");
        }
    }

    /// Flat mapping of the form as a browser would submit it: every text
    /// field present, checked checkboxes only.
    fn collect_fields(&self) -> FormDraft {
        schema::draft_fields()
            .filter_map(|spec| {
                let value = self.values.get(spec.name).unwrap_or("");
                if spec.kind == FieldKind::Checkbox && value != CHECKED {
                    return None;
                }
                Some((spec.name.to_string(), value.to_string()))
            })
            .collect()
    }

    fn refresh_validity(&mut self) {
        self.errors = match check_validity(&self.values, self.photo_selected) {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };
    }
}

fn sanitize_text(text: &str) -> String {
    // Strip all markup; rendering escapes the plain text again
    let cleaned = ammonia::Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string();
    html_escape::decode_html_entities(&cleaned).into_owned()
}
