//! Disguise headers: look like an XHR from juegos.loteriasyapuestas.es itself.

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};

pub const PORTAL_ORIGIN: &str = "https://juegos.loteriasyapuestas.es";
pub const PORTAL_REFERER: &str = "https://juegos.loteriasyapuestas.es/";
pub const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,es-ES;q=0.8,es;q=0.7";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Pairs shared by the HTTP client and the browser page.
pub fn disguise_headers() -> [(&'static str, &'static str); 5] {
    [
        ("Referer", PORTAL_REFERER),
        ("Origin", PORTAL_ORIGIN),
        ("Accept", ACCEPT_JSON),
        ("User-Agent", USER_AGENT),
        ("Accept-Language", ACCEPT_LANGUAGE),
    ]
}

/// Header map for reqwest. Chrome sets sec-fetch-* on its own, reqwest doesn't.
pub fn disguise_header_map() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::REFERER, HeaderValue::from_static(PORTAL_REFERER));
    headers.insert(header::ORIGIN, HeaderValue::from_static(PORTAL_ORIGIN));
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));
    headers.insert(HeaderName::from_static("sec-fetch-mode"), HeaderValue::from_static("cors"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_map_covers_shared_pairs() {
        let map = disguise_header_map();
        for (name, value) in disguise_headers() {
            assert_eq!(map.get(name).and_then(|v| v.to_str().ok()), Some(value), "{name}");
        }
        assert_eq!(map.get("sec-fetch-mode").unwrap(), "cors");
    }
}
