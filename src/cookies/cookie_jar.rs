//! Cookie jar abstraction and the in-memory implementation.
//!
//! A **cookie jar** holds every cookie a client has accepted. The client asks it
//! for the `Cookie` header before a request and hands it the response headers
//! afterwards so `Set-Cookie` values are ingested.
//!
//! Cookies are keyed by `(name, domain, path)`: storing a cookie with an existing
//! key replaces the old one in place, so header order follows first insertion.
//!
//! Jars are not internally synchronized. Share them through a
//! [`CookieJarHandle`](crate::cookies::CookieJarHandle); every read hands back
//! owned cookies, so a reader never observes a half-applied write.

use crate::clock::unix_now;
use crate::cookies::cookie::parse_response_cookies;
use crate::cookies::Cookie;
use http::HeaderMap;
use url::Url;

/// Storage and matching of cookies.
pub trait CookieJar: Send + Sync {
    /// Stores `cookie`, replacing any cookie with the same name, domain and path.
    fn set_cookie(&mut self, cookie: Cookie);

    /// Returns the unexpired cookies whose domain and path match the request.
    fn get_cookies(&self, domain: &str, path: &str) -> Vec<Cookie>;

    /// Builds the `Cookie` header value (`a=1; b=2`) for a request.
    ///
    /// Secure cookies are skipped unless `secure` is set. Returns an empty
    /// string when nothing matches.
    fn get_cookie_header(&self, domain: &str, path: &str, secure: bool) -> String {
        self.get_cookies(domain, path)
            .iter()
            .filter(|c| secure || !c.secure)
            .map(Cookie::pair)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Drops every expired cookie.
    fn clear_expired(&mut self);

    /// Removes all cookies.
    fn clear(&mut self);

    /// Removes the cookie with the exact key. Returns `true` if one was removed.
    fn remove_cookie(&mut self, name: &str, domain: &str, path: &str) -> bool;

    /// Every stored cookie (expired ones included) in insertion order.
    fn all_cookies(&self) -> Vec<Cookie>;

    /// Ingests all `Set-Cookie` headers received for `url`.
    ///
    /// A malformed header is dropped on its own. Returns the number of cookies stored.
    fn store_response_cookies(&mut self, url: &Url, headers: &HeaderMap) -> usize {
        let cookies = parse_response_cookies(url, headers);
        let count = cookies.len();
        for cookie in cookies {
            self.set_cookie(cookie);
        }
        count
    }

    /// Returns the `Cookie` header value for a request to `url`, if any cookie matches.
    fn get_request_cookies(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?;
        let header = self.get_cookie_header(host, url.path(), url.scheme() == "https");
        if header.is_empty() {
            None
        } else {
            Some(header)
        }
    }
}

/// Default cookie jar. It lives in memory only and performs no persistence.
#[derive(Debug, Clone, Default)]
pub struct DefaultCookieJar {
    /// Cookies in insertion order; at most one per key.
    entries: Vec<Cookie>,
}

impl DefaultCookieJar {
    /// Creates an empty in-memory cookie jar.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CookieJar for DefaultCookieJar {
    fn set_cookie(&mut self, cookie: Cookie) {
        match self.entries.iter_mut().find(|c| c.same_key(&cookie)) {
            Some(existing) => *existing = cookie,
            None => self.entries.push(cookie),
        }
    }

    fn get_cookies(&self, domain: &str, path: &str) -> Vec<Cookie> {
        let now = unix_now();
        self.entries
            .iter()
            .filter(|c| !c.is_expired_at(now))
            .filter(|c| c.matches_domain(domain))
            .filter(|c| c.matches_path(path))
            .cloned()
            .collect()
    }

    fn clear_expired(&mut self) {
        let now = unix_now();
        self.entries.retain(|c| !c.is_expired_at(now));
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn remove_cookie(&mut self, name: &str, domain: &str, path: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|c| !(c.name == name && c.domain == domain && c.path == path));
        self.entries.len() != before
    }

    fn all_cookies(&self) -> Vec<Cookie> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::SET_COOKIE;

    fn far_future() -> i64 {
        unix_now() + 3600
    }

    #[test]
    fn same_key_replaces_in_place() {
        let mut jar = DefaultCookieJar::new();
        jar.set_cookie(Cookie::new("a", "1", "example.com"));
        jar.set_cookie(Cookie::new("b", "2", "example.com"));
        jar.set_cookie(Cookie::new("a", "3", "example.com"));

        assert_eq!(jar.len(), 2);
        assert_eq!(jar.get_cookie_header("example.com", "/", false), "a=3; b=2");
    }

    #[test]
    fn different_path_or_domain_is_a_different_cookie() {
        let mut jar = DefaultCookieJar::new();
        jar.set_cookie(Cookie::new("a", "1", "example.com"));
        jar.set_cookie(Cookie::new("a", "2", "example.com").with_path("/docs"));
        jar.set_cookie(Cookie::new("a", "3", ".example.com"));

        assert_eq!(jar.len(), 3);
    }

    #[test]
    fn get_cookies_applies_domain_asymmetry() {
        let mut jar = DefaultCookieJar::new();
        jar.set_cookie(Cookie::new("wide", "1", ".example.com"));
        jar.set_cookie(Cookie::new("narrow", "2", "example.com"));

        let www: Vec<_> = jar.get_cookies("www.example.com", "/").into_iter().map(|c| c.name).collect();
        assert_eq!(www, vec!["wide"]);

        let apex: Vec<_> = jar.get_cookies("example.com", "/").into_iter().map(|c| c.name).collect();
        assert_eq!(apex, vec!["wide", "narrow"]);
    }

    #[test]
    fn get_cookies_skips_expired() {
        let mut jar = DefaultCookieJar::new();
        jar.set_cookie(Cookie::new("old", "1", "example.com").with_expires(1));
        jar.set_cookie(Cookie::new("gone", "1", "example.com").with_max_age(0));
        jar.set_cookie(Cookie::new("fresh", "1", "example.com").with_expires(far_future()));

        let names: Vec<_> = jar.get_cookies("example.com", "/").into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["fresh"]);
    }

    #[test]
    fn secure_cookies_need_a_secure_request() {
        let mut jar = DefaultCookieJar::new();
        jar.set_cookie(Cookie::new("plain", "1", "example.com"));
        jar.set_cookie(Cookie::new("locked", "2", "example.com").with_secure(true));

        assert_eq!(jar.get_cookie_header("example.com", "/", false), "plain=1");
        assert_eq!(jar.get_cookie_header("example.com", "/", true), "plain=1; locked=2");
    }

    #[test]
    fn header_respects_path() {
        let mut jar = DefaultCookieJar::new();
        jar.set_cookie(Cookie::new("root", "1", "example.com"));
        jar.set_cookie(Cookie::new("docs", "2", "example.com").with_path("/docs"));

        assert_eq!(jar.get_cookie_header("example.com", "/docs/a", false), "root=1; docs=2");
        assert_eq!(jar.get_cookie_header("example.com", "/docsearch", false), "root=1");
    }

    #[test]
    fn clear_expired_and_clear() {
        let mut jar = DefaultCookieJar::new();
        jar.set_cookie(Cookie::new("old", "1", "example.com").with_expires(1));
        jar.set_cookie(Cookie::new("keep", "1", "example.com"));

        jar.clear_expired();
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.all_cookies()[0].name, "keep");

        jar.clear();
        assert!(jar.is_empty());
    }

    #[test]
    fn remove_cookie_by_key() {
        let mut jar = DefaultCookieJar::new();
        jar.set_cookie(Cookie::new("a", "1", "example.com"));

        assert!(!jar.remove_cookie("a", "other.com", "/"));
        assert!(jar.remove_cookie("a", "example.com", "/"));
        assert!(jar.is_empty());
    }

    #[test]
    fn response_round_trip_through_request_header() {
        let mut jar = DefaultCookieJar::new();
        let url = Url::parse("https://shop.example.com/cart/view").unwrap();

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, "session=xyz; Path=/; Secure".parse().unwrap());
        headers.append(SET_COOKIE, "pref=dark; Domain=example.com; Path=/".parse().unwrap());
        headers.append(SET_COOKIE, "=broken".parse().unwrap());

        assert_eq!(jar.store_response_cookies(&url, &headers), 2);

        assert_eq!(
            jar.get_request_cookies(&url).as_deref(),
            Some("session=xyz; pref=dark")
        );

        let insecure = Url::parse("http://shop.example.com/").unwrap();
        assert_eq!(jar.get_request_cookies(&insecure).as_deref(), Some("pref=dark"));

        let sibling = Url::parse("https://blog.example.com/").unwrap();
        assert_eq!(jar.get_request_cookies(&sibling).as_deref(), Some("pref=dark"));

        let foreign = Url::parse("https://example.org/").unwrap();
        assert_eq!(jar.get_request_cookies(&foreign), None);
    }
}
