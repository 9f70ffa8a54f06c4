use spin_sdk::http::{Request, Response};
use tracing::debug;

use crate::config::MAP_SEARCH_URL;
use crate::core::helpers::redirect;
use crate::core::query_params::{get_string, parse_query_params};

/// Map search URL for the area and address typed into the form.
pub fn map_search_url(area: &str, address: &str) -> String {
    let query = format!("{} {}", area, address);
    format!("{}{}", MAP_SEARCH_URL, urlencoding::encode(&query))
}

/// `GET /map?area=..&address=..` redirects to the map search.
pub fn open_map(req: Request) -> anyhow::Result<Response> {
    let params = parse_query_params(req.uri());
    let area = get_string(&params, "area", Some("")).unwrap_or_default();
    let address = get_string(&params, "address", Some("")).unwrap_or_default();

    let url = map_search_url(&area, &address);
    debug!(%url, "redirecting to map search");
    Ok(redirect(&url))
}
