use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::config::{DELETE_LABEL, MAP_LINK_LABEL, PHOTO_THUMBNAIL_WIDTH};
use crate::form::FormView;
use crate::models::models::Post;
use crate::static_server::Assets;
use crate::schema::{CellRender, FieldKind, FieldSpec, FIELDS, PEOPLE_COUNT, UNKNOWN_PEOPLE};

fn display(visible: bool) -> &'static str {
    if visible {
        "block"
    } else {
        "none"
    }
}

pub fn render_index(view: &FormView, posts: &[Post]) -> anyhow::Result<String> {
    let template = Assets::get("index.html")
        .ok_or_else(|| anyhow::anyhow!("Index template not found"))?
        .data
        .to_vec();
    let template = String::from_utf8(template)?;

    let toggle_label = encode_text(view.toggle_label);
    let fields = render_form_fields(view);
    let head = render_table_head();
    let rows = render_rows(posts);
    let submit_state = if view.submit_enabled { "" } else { r#"disabled class="disabled""# };

    Ok(fill(
        &template,
        &[
            ("toggle_label", toggle_label.as_ref()),
            ("form_display", display(view.form_visible)),
            ("form_fields", fields.as_str()),
            ("submit_state", submit_state),
            ("table_head", head.as_str()),
            ("posts_rows", rows.as_str()),
        ],
    ))
}

/// Single pass over `{{slot}}` markers so inserted user text is never
/// scanned for further markers.
fn fill(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = after[..end].trim();
        match slots.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

fn in_rescue_panel(spec: &FieldSpec) -> bool {
    spec.name == PEOPLE_COUNT || spec.name == UNKNOWN_PEOPLE
}

pub fn render_form_fields(view: &FormView) -> String {
    let mut html = String::new();
    let mut panel_open = false;

    for spec in FIELDS {
        if in_rescue_panel(spec) && !panel_open {
            let _ = write!(
                html,
                r#"<div id="rescueDetails" style="display: {}">"#,
                display(view.rescue_visible)
            );
            panel_open = true;
        } else if !in_rescue_panel(spec) && panel_open {
            html.push_str("</div>");
            panel_open = false;
        }
        html.push_str(&render_field(spec, view));
    }
    if panel_open {
        html.push_str("</div>");
    }

    html
}

fn render_field(spec: &FieldSpec, view: &FormView) -> String {
    let name = spec.name;
    let value = view.values.get(name).unwrap_or("");
    let required = match spec.name {
        PEOPLE_COUNT => view.people_required,
        _ => spec.requirement == crate::schema::Requirement::Always,
    };
    let required = if required { " required" } else { "" };
    let label = format!(r#"<label for="{}">{}</label>"#, name, encode_text(spec.label));

    match spec.kind {
        FieldKind::Text => format!(
            r#"<div class="field">{}<input type="text" id="{}" name="{}" value="{}"{}></div>"#,
            label,
            name,
            name,
            encode_double_quoted_attribute(value),
            required
        ),
        FieldKind::TextArea => format!(
            r#"<div class="field">{}<textarea id="{}" name="{}"{}>{}</textarea></div>"#,
            label,
            name,
            name,
            required,
            encode_text(value)
        ),
        FieldKind::Select(options) => {
            let mut opts = String::from(r#"<option value="">--</option>"#);
            for option in options {
                let selected = if *option == value { " selected" } else { "" };
                let _ = write!(
                    opts,
                    r#"<option value="{}"{}>{}</option>"#,
                    encode_double_quoted_attribute(option),
                    selected,
                    encode_text(option)
                );
            }
            format!(
                r#"<div class="field">{}<select id="{}" name="{}"{}>{}</select></div>"#,
                label, name, name, required, opts
            )
        }
        FieldKind::Number => format!(
            r#"<div class="field">{}<input type="number" min="0" id="{}" name="{}" value="{}"{}{}></div>"#,
            label,
            name,
            name,
            encode_double_quoted_attribute(value),
            required,
            if view.people_disabled { " disabled" } else { "" }
        ),
        FieldKind::Checkbox => format!(
            r#"<div class="field"><input type="checkbox" id="{}" name="{}"{}>{}</div>"#,
            name,
            name,
            if !value.is_empty() { " checked" } else { "" },
            label
        ),
        // The link is pasted by hand after searching, so it lives in the map modal
        FieldKind::Url => format!(
            concat!(
                r#"<div class="field"><button type="button" id="openMapBtn">Search map</button></div>"#,
                r#"<div id="mapModal" class="modal" style="display: {}">"#,
                r#"<span class="close">&times;</span>{}"#,
                r#"<input type="url" id="{}" name="{}" value="{}"{}></div>"#
            ),
            display(!value.is_empty()),
            label,
            name,
            name,
            encode_double_quoted_attribute(value),
            required
        ),
        FieldKind::File => format!(
            r#"<div class="field">{}<input type="file" id="{}" name="{}" accept="image/*"{}></div>"#,
            label, name, name, required
        ),
    }
}

pub fn render_table_head() -> String {
    let mut html = String::from("<tr>");
    for spec in FIELDS {
        let _ = write!(html, "<th>{}</th>", encode_text(spec.label));
    }
    html.push_str("<th></th></tr>");
    html
}

/// One `<tr>` per post: a cell per form field in declaration order and a
/// trailing delete button.
pub fn render_post_row(post: &Post) -> String {
    let id = encode_double_quoted_attribute(&post.id);
    let mut html = format!(r#"<tr data-post-id="{}">"#, id);

    for spec in FIELDS {
        let value = match spec.render {
            CellRender::Image => post.photo.as_str(),
            _ => post.field(spec.name),
        };
        let cell = match spec.render {
            CellRender::Image if !value.is_empty() => format!(
                r#"<img src="{}" width="{}" alt="">"#,
                encode_double_quoted_attribute(value),
                PHOTO_THUMBNAIL_WIDTH
            ),
            CellRender::Link if !value.is_empty() => format!(
                r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                encode_double_quoted_attribute(value),
                MAP_LINK_LABEL
            ),
            CellRender::Flag => (if value.is_empty() { "" } else { "Yes" }).to_string(),
            CellRender::Text => encode_text(value).into_owned(),
            CellRender::Image | CellRender::Link => String::new(),
        };
        let _ = write!(html, "<td>{}</td>", cell);
    }

    let _ = write!(
        html,
        r#"<td><button type="button" class="delete-post" data-post-id="{}">{}</button></td></tr>"#,
        id, DELETE_LABEL
    );
    html
}

pub fn render_rows(posts: &[Post]) -> String {
    posts.iter().map(render_post_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::FormStore;
    use crate::core::kv::MemoryKv;
    use crate::form::{FormController, FormEvent};
    use crate::schema::{AREA, DESCRIPTION, MAP_LINK};
    use std::collections::BTreeMap;

    fn post(map_link: &str) -> Post {
        let mut fields = BTreeMap::new();
        fields.insert(AREA.to_string(), "North".to_string());
        fields.insert(DESCRIPTION.to_string(), "<script>x</script>".to_string());
        fields.insert(MAP_LINK.to_string(), map_link.to_string());
        fields.insert(UNKNOWN_PEOPLE.to_string(), "on".to_string());
        Post {
            id: "p-1".to_string(),
            created_at: String::new(),
            photo: "data:image/png;base64,AAAA".to_string(),
            fields,
        }
    }

    #[test]
    fn test_row_has_one_cell_per_field_plus_delete() {
        let html = render_post_row(&post(""));
        assert_eq!(html.matches("<td>").count(), FIELDS.len() + 1);
        assert!(html.starts_with(r#"<tr data-post-id="p-1">"#));
        assert!(html.contains(r#"data-post-id="p-1">Delete</button>"#));
    }

    #[test]
    fn test_row_special_cells() {
        let html = render_post_row(&post("https://maps.example/x"));
        assert!(html.contains(r#"<img src="data:image/png;base64,AAAA" width="100""#));
        assert!(html.contains(r#"<a href="https://maps.example/x" target="_blank""#));
        assert!(html.contains(">View map</a>"));
        assert!(html.contains("<td>Yes</td>"));
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
    }

    #[test]
    fn test_empty_map_link_renders_empty_cell() {
        let html = render_post_row(&post(""));
        assert!(!html.contains("View map"));
    }

    #[test]
    fn test_rescue_panel_follows_view() {
        let store = FormStore::new(MemoryKv::new());
        let mut controller = FormController::new(&store);
        let hidden = render_form_fields(&controller.view());
        assert!(hidden.contains(r#"<div id="rescueDetails" style="display: none">"#));

        controller
            .handle(FormEvent::IncidentTypeChanged {
                value: crate::config::RESCUE_NEEDED.to_string(),
            })
            .unwrap();
        let shown = render_form_fields(&controller.view());
        assert!(shown.contains(r#"<div id="rescueDetails" style="display: block">"#));
        assert!(shown.contains(r#"id="peopleCount" name="peopleCount" value="" required>"#));
        assert!(shown.contains(r#"<option value="Rescue needed" selected>"#));
    }

    #[test]
    fn test_fill_does_not_rescan_inserted_text() {
        let out = fill("<p>{{a}}</p>{{b}}{{missing}}", &[("a", "{{b}}"), ("b", "B")]);
        assert_eq!(out, "<p>{{b}}</p>B{{missing}}");
    }

    #[test]
    fn test_head_matches_row_width() {
        assert_eq!(render_table_head().matches("<th>").count(), FIELDS.len() + 1);
    }
}
