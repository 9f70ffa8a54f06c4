//! Declarative description of the incident form.
//!
//! One table drives validation, draft persistence and table rendering, so
//! the special cases for `photo` and `mapLink` live here instead of being
//! scattered across handlers.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::config::{INCIDENT_TYPES, MAX_FIELD_LENGTH, RESCUE_NEEDED};
use crate::models::models::FormDraft;

pub const AREA: &str = "area";
pub const ADDRESS: &str = "address";
pub const INCIDENT_TYPE: &str = "incidentType";
pub const PEOPLE_COUNT: &str = "peopleCount";
pub const UNKNOWN_PEOPLE: &str = "unknownPeople";
pub const DESCRIPTION: &str = "description";
pub const MAP_LINK: &str = "mapLink";
pub const PHOTO: &str = "photo";

/// Value submitted by a checked checkbox.
pub const CHECKED: &str = "on";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Select(&'static [&'static str]),
    Number,
    Checkbox,
    Url,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Always,
    Optional,
    /// Required only while the incident type is "Rescue needed".
    WhenRescueNeeded,
}

/// How a stored value is shown in the posts table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRender {
    Text,
    Flag,
    Image,
    Link,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub requirement: Requirement,
    pub render: CellRender,
}

impl FieldSpec {
    /// File inputs cannot be restored, so they never enter the draft.
    pub fn in_draft(&self) -> bool {
        self.kind != FieldKind::File
    }

    pub fn is_free_text(&self) -> bool {
        matches!(self.kind, FieldKind::Text | FieldKind::TextArea)
    }
}

pub const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: AREA,
        label: "Area",
        kind: FieldKind::Text,
        requirement: Requirement::Always,
        render: CellRender::Text,
    },
    FieldSpec {
        name: ADDRESS,
        label: "Address",
        kind: FieldKind::Text,
        requirement: Requirement::Always,
        render: CellRender::Text,
    },
    FieldSpec {
        name: INCIDENT_TYPE,
        label: "Incident type",
        kind: FieldKind::Select(INCIDENT_TYPES),
        requirement: Requirement::Always,
        render: CellRender::Text,
    },
    FieldSpec {
        name: PEOPLE_COUNT,
        label: "People needing rescue",
        kind: FieldKind::Number,
        requirement: Requirement::WhenRescueNeeded,
        render: CellRender::Text,
    },
    FieldSpec {
        name: UNKNOWN_PEOPLE,
        label: "Count unknown",
        kind: FieldKind::Checkbox,
        requirement: Requirement::Optional,
        render: CellRender::Flag,
    },
    FieldSpec {
        name: DESCRIPTION,
        label: "Details",
        kind: FieldKind::TextArea,
        requirement: Requirement::Optional,
        render: CellRender::Text,
    },
    FieldSpec {
        name: MAP_LINK,
        label: "Map",
        kind: FieldKind::Url,
        requirement: Requirement::Optional,
        render: CellRender::Link,
    },
    FieldSpec {
        name: PHOTO,
        label: "Photo",
        kind: FieldKind::File,
        requirement: Requirement::Always,
        render: CellRender::Image,
    },
];

pub fn field(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

pub fn draft_fields() -> impl Iterator<Item = &'static FieldSpec> {
    FIELDS.iter().filter(|f| f.in_draft())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self { field: field.to_string(), message: message.to_string() }
    }
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^https?://[^\s]+$").expect("Regex should compile"))
}

fn count_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[0-9]{1,6}$").expect("Regex should compile"))
}

pub fn rescue_needed(values: &FormDraft) -> bool {
    values.get(INCIDENT_TYPE) == Some(RESCUE_NEEDED)
}

pub fn people_unknown(values: &FormDraft) -> bool {
    values.get(UNKNOWN_PEOPLE) == Some(CHECKED)
}

/// Recomputes form validity the way a browser applies native constraints.
///
/// `photo_selected` stands in for the file input, whose value never reaches
/// the draft.
pub fn check_validity(values: &FormDraft, photo_selected: bool) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    for spec in FIELDS {
        if spec.kind == FieldKind::File {
            if spec.requirement == Requirement::Always && !photo_selected {
                errors.push(FieldError::new(spec.name, "A photo is required"));
            }
            continue;
        }

        // Whitespace satisfies `required`, as in the browser
        let value = values.get(spec.name).unwrap_or("");
        let required = match spec.requirement {
            Requirement::Always => true,
            Requirement::Optional => false,
            Requirement::WhenRescueNeeded => rescue_needed(values) && !people_unknown(values),
        };

        if value.is_empty() {
            if required {
                errors.push(FieldError::new(spec.name, "This field is required"));
            }
            continue;
        }

        if value.chars().count() > MAX_FIELD_LENGTH {
            errors.push(FieldError::new(spec.name, "Value is too long"));
            continue;
        }

        let ok = match spec.kind {
            FieldKind::Select(options) => options.contains(&value),
            FieldKind::Number => count_regex().is_match(value),
            FieldKind::Checkbox => value == CHECKED,
            FieldKind::Url => url_regex().is_match(value),
            FieldKind::Text | FieldKind::TextArea | FieldKind::File => true,
        };
        if !ok {
            let message = match spec.kind {
                FieldKind::Select(_) => "Choose one of the listed options",
                FieldKind::Number => "Enter a whole number",
                FieldKind::Url => "Enter an http(s) link",
                _ => "Invalid value",
            };
            errors.push(FieldError::new(spec.name, message));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
