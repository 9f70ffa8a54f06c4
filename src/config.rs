// === Storage keys ===
pub const DRAFT_KEY: &str = "formData";
pub const POSTS_KEY: &str = "posts";

// === Limits ===
pub const MAX_FIELD_LENGTH: usize = 2000;
pub const DEFAULT_MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

// === Rendering ===
pub const PHOTO_THUMBNAIL_WIDTH: u32 = 100;
pub const MAP_SEARCH_URL: &str = "https://www.google.com/maps/search/?q=";
pub const MAP_LINK_LABEL: &str = "View map";
pub const DELETE_LABEL: &str = "Delete";
pub const TOGGLE_LABEL_SHOW: &str = "Post new incident";
pub const TOGGLE_LABEL_CANCEL: &str = "Cancel posting";

// === Incident types ===
pub const RESCUE_NEEDED: &str = "Rescue needed";
pub const INCIDENT_TYPES: &[&str] = &[
    "Fire",
    "Flooding",
    "Building collapse",
    "Road blocked",
    "Power outage",
    RESCUE_NEEDED,
    "Other",
];

pub fn max_photo_bytes() -> usize {
    std::env::var("INCIDENT_MAX_PHOTO_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_PHOTO_BYTES)
}

pub fn listen_addr() -> String {
    std::env::var("INCIDENT_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:80".to_string())
}
