use std::collections::BTreeMap;

use http::header::{HeaderName, ETAG, LAST_MODIFIED};
use http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::net::Response;

/// A cached response as kept in the [`CacheStore`](crate::cache::CacheStore).
///
/// Every field is required when reading back: a stored value missing one, or
/// carrying a wrong type, is not a `CacheEntry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub body: Vec<u8>,
    pub status: u16,
    /// Header values by lower-case name, in received order.
    pub headers: BTreeMap<String, Vec<String>>,
    /// Unix timestamp (seconds) after which the entry is stale.
    pub expires_at: i64,
}

impl CacheEntry {
    /// Captures `response` for storage. Non-UTF-8 header values are dropped.
    pub fn from_response(response: &Response, expires_at: i64) -> Self {
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers.iter() {
            if let Ok(value) = value.to_str() {
                headers.entry(name.as_str().to_string()).or_default().push(value.to_string());
            }
        }

        Self {
            body: response.body.clone(),
            status: response.status,
            headers,
            expires_at,
        }
    }

    /// Reads an entry back from its stored JSON form. Any shape mismatch is
    /// logged and reported as `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("ignoring malformed cache entry: {e}");
                None
            }
        }
    }

    pub fn to_value(&self) -> Option<Value> {
        serde_json::to_value(self).ok()
    }

    pub fn is_fresh_at(&self, now: i64) -> bool {
        self.expires_at > now
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .get(name.as_str())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn etag(&self) -> Option<&str> {
        self.header(&ETAG)
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.header(&LAST_MODIFIED)
    }

    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, values) in &self.headers {
            let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
                continue;
            };
            for value in values {
                if let Ok(value) = HeaderValue::from_str(value) {
                    map.append(name.clone(), value);
                }
            }
        }
        map
    }

    /// Rebuilds the stored response for `url`.
    pub fn to_response(&self, url: Url) -> Response {
        Response::new(url, self.status, self.header_map(), self.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn well_formed_value_reads_back() {
        let value = json!({
            "body": [88],
            "status": 200,
            "headers": {"etag": ["\"v1\""]},
            "expiresAt": 1_700_000_000
        });

        let entry = CacheEntry::from_value(value).unwrap();
        assert_eq!(entry.body, b"X");
        assert_eq!(entry.etag(), Some("\"v1\""));
        assert!(entry.is_fresh_at(1_600_000_000));
        assert!(!entry.is_fresh_at(1_700_000_000));
    }

    #[test]
    fn missing_or_mistyped_fields_are_absent() {
        assert!(CacheEntry::from_value(json!({"body": [], "status": 200, "headers": {}})).is_none());
        assert!(CacheEntry::from_value(json!({"body": [], "status": "200", "headers": {}, "expiresAt": 1})).is_none());
        assert!(CacheEntry::from_value(json!({"body": "X", "status": 200, "headers": {}, "expiresAt": 1})).is_none());
        assert!(CacheEntry::from_value(json!("garbage")).is_none());
    }

    #[test]
    fn multi_valued_headers_survive() {
        let url = Url::parse("https://example.com/").unwrap();
        let mut headers = HeaderMap::new();
        headers.append("vary", HeaderValue::from_static("accept"));
        headers.append("vary", HeaderValue::from_static("cookie"));
        let response = Response::new(url.clone(), 200, headers, b"body".to_vec());

        let entry = CacheEntry::from_response(&response, 10);
        let rebuilt = entry.to_response(url);

        let vary: Vec<_> = rebuilt.headers.get_all("vary").iter().map(|v| v.to_str().unwrap()).collect();
        assert_eq!(vary, vec!["accept", "cookie"]);
        assert_eq!(rebuilt.status_text, "OK");
    }
}
