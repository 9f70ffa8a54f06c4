use incident_board::core::db::FormStore;
use incident_board::{route, MemoryKv};
use serde_json::{json, Value};
use spin_sdk::http::{Method, Request, Response};

const PHOTO_B64: &str = "iVBORw0KGgo=";

fn request(method: Method, uri: &str, body: Option<Value>) -> Request {
    let bytes = body.map(|b| serde_json::to_vec(&b).unwrap()).unwrap_or_default();
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(bytes)
        .build()
}

fn send(store: &FormStore<MemoryKv>, method: Method, uri: &str, body: Option<Value>) -> Response {
    route(request(method, uri, body), store)
}

fn json_body(resp: &Response) -> Value {
    serde_json::from_slice(resp.body()).expect("response should be JSON")
}

fn valid_fields() -> Value {
    json!({
        "area": "North ward",
        "address": "1-2-3 Riverside",
        "incidentType": "Fire",
        "description": "Smoke from a warehouse",
        "mapLink": ""
    })
}

fn submit(store: &FormStore<MemoryKv>, fields: Value) -> Response {
    send(
        store,
        Method::Post,
        "/posts",
        Some(json!({
            "fields": fields,
            "photo": { "file_name": "scene.png", "content_type": "image/png", "data": PHOTO_B64 }
        })),
    )
}

fn event(store: &FormStore<MemoryKv>, event: Value) -> Value {
    let resp = send(
        store,
        Method::Post,
        "/form/events",
        Some(json!({ "form_visible": true, "photo_selected": true, "event": event })),
    );
    assert_eq!(*resp.status(), 200);
    json_body(&resp)
}

#[test]
fn test_full_report_flow() {
    let store = FormStore::new(MemoryKv::new());

    // 1. Fill the form field by field
    event(&store, json!({"type": "input", "name": "area", "value": "North ward"}));
    event(&store, json!({"type": "input", "name": "address", "value": "1-2-3 Riverside"}));
    let result = event(&store, json!({"type": "incident_type_changed", "value": "Fire"}));
    assert_eq!(result["view"]["submit_enabled"], true);

    // 2. Draft survives a reload
    let draft = json_body(&send(&store, Method::Get, "/draft", None));
    assert_eq!(draft["area"], "North ward");
    let page = send(&store, Method::Get, "/", None);
    assert_eq!(*page.status(), 200);
    let html = String::from_utf8(page.body().to_vec()).unwrap();
    assert!(html.contains(r#"id="area" name="area" value="North ward""#));

    // 3. Submit
    let resp = submit(&store, valid_fields());
    assert_eq!(*resp.status(), 201);
    let created = json_body(&resp);
    let id = created["post"]["id"].as_str().unwrap().to_string();
    assert!(created["post"]["photo"].as_str().unwrap().starts_with("data:image/png;base64,"));
    assert_eq!(created["view"]["form_visible"], false);
    assert_eq!(created["effects"][0]["type"], "append_row");
    assert_eq!(created["effects"][1]["type"], "reset_form");

    // 4. Listed and rendered
    let posts = json_body(&send(&store, Method::Get, "/posts", None));
    assert_eq!(posts.as_array().unwrap().len(), 1);
    let rows = send(&store, Method::Get, "/posts/rows", None);
    let rows = String::from_utf8(rows.body().to_vec()).unwrap();
    assert_eq!(rows.matches("<tr ").count(), 1);
    assert!(rows.contains(&id));

    // 5. Delete
    let resp = send(&store, Method::Delete, &format!("/posts/{}", id), None);
    assert_eq!(*resp.status(), 200);
    assert_eq!(json_body(&resp)["effects"][0]["id"], id.as_str());
    let posts = json_body(&send(&store, Method::Get, "/posts", None));
    assert!(posts.as_array().unwrap().is_empty());
}

#[test]
fn test_clear_after_restored_page_resets_to_empty_values() {
    let store = FormStore::new(MemoryKv::new());
    send(&store, Method::Put, "/draft", Some(json!({ "area": "North ward", "unknownPeople": "on" })));
    let page = String::from_utf8(send(&store, Method::Get, "/", None).body().to_vec()).unwrap();
    assert!(page.contains(r#"value="North ward""#));

    let result = event(&store, json!({"type": "clear"}));
    let reset = &result["effects"][0];
    assert_eq!(reset["type"], "reset_form");
    assert_eq!(reset["values"]["area"], "");
    assert!(reset["values"].get("unknownPeople").is_none());

    // What the page shows after the reset is what a reload restores
    let draft = json_body(&send(&store, Method::Get, "/draft", None));
    assert_eq!(draft, reset["values"]);

    let created = json_body(&submit(&store, valid_fields()));
    assert_eq!(created["effects"][1]["values"]["address"], "");
}

#[test]
fn test_event_snapshot_overwrites_whole_draft() {
    let store = FormStore::new(MemoryKv::new());
    event(&store, json!({"type": "input", "name": "description", "value": "stale"}));

    let resp = send(
        &store,
        Method::Post,
        "/form/events",
        Some(json!({
            "form_visible": true,
            "values": { "area": "North", "address": "Main 1" },
            "event": {"type": "input", "name": "address", "value": "Main 1"}
        })),
    );
    assert_eq!(*resp.status(), 200);

    let draft = json_body(&send(&store, Method::Get, "/draft", None));
    assert_eq!(draft["area"], "North");
    assert_eq!(draft["address"], "Main 1");
    assert_eq!(draft["description"], "");
}

#[test]
fn test_concurrent_submits_each_append_one() {
    let store = FormStore::new(MemoryKv::new());
    std::thread::scope(|s| {
        for _ in 0..16 {
            s.spawn(|| assert_eq!(*submit(&store, valid_fields()).status(), 201));
        }
    });
    let posts = json_body(&send(&store, Method::Get, "/posts", None));
    assert_eq!(posts.as_array().unwrap().len(), 16);
}

#[test]
fn test_each_submit_appends_exactly_one() {
    let store = FormStore::new(MemoryKv::new());
    for expected in 1..=3 {
        assert_eq!(*submit(&store, valid_fields()).status(), 201);
        let posts = json_body(&send(&store, Method::Get, "/posts", None));
        assert_eq!(posts.as_array().unwrap().len(), expected);
    }
}

#[test]
fn test_identical_posts_delete_one() {
    let store = FormStore::new(MemoryKv::new());
    let first = json_body(&submit(&store, valid_fields()))["post"]["id"].clone();
    let second = json_body(&submit(&store, valid_fields()))["post"]["id"].clone();

    let resp = send(&store, Method::Delete, &format!("/posts/{}", second.as_str().unwrap()), None);
    assert_eq!(*resp.status(), 200);

    let posts = json_body(&send(&store, Method::Get, "/posts", None));
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["id"], first);
}

#[test]
fn test_submit_validation() {
    let store = FormStore::new(MemoryKv::new());

    let mut missing_address = valid_fields();
    missing_address["address"] = json!("");
    let resp = submit(&store, missing_address);
    assert_eq!(*resp.status(), 422);
    assert_eq!(json_body(&resp)["fields"][0]["field"], "address");

    let resp = send(&store, Method::Post, "/posts", Some(json!({ "fields": valid_fields() })));
    assert_eq!(*resp.status(), 422);

    let resp = send(
        &store,
        Method::Post,
        "/posts",
        Some(json!({
            "fields": valid_fields(),
            "photo": { "file_name": "notes.txt", "data": "aGVsbG8=" }
        })),
    );
    assert_eq!(*resp.status(), 400);

    let posts = json_body(&send(&store, Method::Get, "/posts", None));
    assert!(posts.as_array().unwrap().is_empty());
}

#[test]
fn test_unknown_people_persists_empty_count() {
    let store = FormStore::new(MemoryKv::new());
    let result = event(&store, json!({"type": "incident_type_changed", "value": "Rescue needed"}));
    assert_eq!(result["view"]["people_required"], true);
    assert_eq!(result["view"]["rescue_visible"], true);

    event(&store, json!({"type": "input", "name": "peopleCount", "value": "5"}));
    let result = event(&store, json!({"type": "unknown_people_changed", "checked": true}));
    assert_eq!(result["view"]["people_disabled"], true);
    assert_eq!(result["view"]["people_required"], false);

    let draft = json_body(&send(&store, Method::Get, "/draft", None));
    assert_eq!(draft["peopleCount"], "");
    assert_eq!(draft["unknownPeople"], "on");
}

#[test]
fn test_put_draft_overwrites_and_ignores_unknown_keys() {
    let store = FormStore::new(MemoryKv::new());
    let resp = send(
        &store,
        Method::Put,
        "/draft",
        Some(json!({ "area": "East", "address": "Hill 4", "notAField": "x" })),
    );
    assert_eq!(*resp.status(), 200);

    send(&store, Method::Put, "/draft", Some(json!({ "area": "West" })));
    let draft = json_body(&send(&store, Method::Get, "/draft", None));
    assert_eq!(draft["area"], "West");
    assert_eq!(draft["address"], "");
    assert!(draft.get("notAField").is_none());

    let resp = send(&store, Method::Put, "/draft", Some(json!(["not", "an", "object"])));
    assert_eq!(*resp.status(), 400);
}

#[test]
fn test_map_redirect_and_event() {
    let store = FormStore::new(MemoryKv::new());
    let resp = send(&store, Method::Get, "/map?area=North%20ward&address=Main+1", None);
    assert_eq!(*resp.status(), 302);
    let location = resp.header("location").and_then(|h| h.as_str()).unwrap_or_default();
    assert_eq!(location, "https://www.google.com/maps/search/?q=North%20ward%20Main%201");

    event(&store, json!({"type": "input", "name": "area", "value": "South"}));
    let result = event(&store, json!({"type": "open_map"}));
    assert_eq!(result["effects"][0]["type"], "open_url");
    assert_eq!(result["effects"][0]["target"], "_blank");

    let result = event(&store, json!({"type": "open_map", "area": "East", "address": ""}));
    assert_eq!(result["effects"][0]["url"], "https://www.google.com/maps/search/?q=East%20");
}

#[test]
fn test_corrupt_storage_is_a_server_error() {
    let kv = MemoryKv::new();
    incident_board::core::kv::KeyValue::set(&kv, "posts", b"[{broken").unwrap();
    let store = FormStore::new(kv);
    assert_eq!(*send(&store, Method::Get, "/posts", None).status(), 500);
}

#[test]
fn test_bad_requests() {
    let store = FormStore::new(MemoryKv::new());
    assert_eq!(*send(&store, Method::Delete, "/posts/not-a-uuid", None).status(), 400);
    let missing = format!("/posts/{}", uuid::Uuid::new_v4());
    assert_eq!(*send(&store, Method::Delete, &missing, None).status(), 404);
    assert_eq!(
        *send(&store, Method::Post, "/form/events", Some(json!({"event": {"type": "explode"}}))).status(),
        400
    );
    assert_eq!(*send(&store, Method::Patch, "/posts", None).status(), 404);
}
