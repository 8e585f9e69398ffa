//! The [`Cookie`] record, `Set-Cookie` parsing, and the domain/path matching rules.
//!
//! A cookie's `domain` carries its matching mode:
//! - `".example.com"` (leading dot) matches `example.com` and every subdomain.
//! - `"example.com"` (no dot) is host-only and matches exactly that host.
//!
//! Cookies parsed from a `Set-Cookie` header get a dotted domain when the header
//! carries a `Domain` attribute, and the bare request host otherwise.

use crate::clock::unix_now;
use crate::errors::CookieParseError;
use chrono::{DateTime, NaiveDateTime};
use http::header::SET_COOKIE;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// `SameSite` attribute of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    /// Case-insensitive parse of an attribute value. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("strict") {
            Some(SameSite::Strict)
        } else if value.eq_ignore_ascii_case("lax") {
            Some(SameSite::Lax)
        } else if value.eq_ignore_ascii_case("none") {
            Some(SameSite::None)
        } else {
            None
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        };
        f.write_str(s)
    }
}

/// A cookie as held by the jar and written to the cookie file.
///
/// The serialized form matches the on-disk format: camel-cased keys, optional
/// attributes omitted when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Expiry as seconds since the Unix epoch. `None` means a session cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,

    /// Domain scope. A leading dot enables subdomain matching.
    pub domain: String,

    /// Path scope.
    #[serde(default = "root_path")]
    pub path: String,

    /// Only sent over secure (https) requests.
    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub http_only: bool,

    /// Lifetime in seconds as sent by the server. A value `<= 0` means the
    /// cookie is already expired, whatever `expires` says.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

fn root_path() -> String {
    "/".to_string()
}

impl Cookie {
    /// Creates a session cookie scoped to `domain` and path `/`.
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
            domain: domain.into(),
            path: root_path(),
            secure: false,
            http_only: false,
            max_age: None,
            same_site: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_expires(mut self, expires: i64) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// True when the cookie has neither an expiry nor a max-age.
    pub fn is_session(&self) -> bool {
        self.expires.is_none() && self.max_age.is_none()
    }

    /// Expired iff `max_age <= 0`, or `expires` is present and not in the future.
    pub fn is_expired_at(&self, now: i64) -> bool {
        if matches!(self.max_age, Some(age) if age <= 0) {
            return true;
        }
        matches!(self.expires, Some(expires) if expires <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }

    /// Whether this cookie would be sent to `host`.
    pub fn matches_domain(&self, host: &str) -> bool {
        domain_matches(&self.domain, host)
    }

    /// Whether this cookie would be sent for `request_path`.
    pub fn matches_path(&self, request_path: &str) -> bool {
        path_matches(&self.path, request_path)
    }

    /// Two cookies with the same key replace each other in a jar.
    pub fn same_key(&self, other: &Cookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }

    /// Parses a single `Set-Cookie` header value received for `request_url`.
    pub fn parse_set_cookie(header: &str, request_url: &Url) -> Result<Cookie, CookieParseError> {
        Self::parse_set_cookie_at(header, request_url, unix_now())
    }

    /// Same as [`Cookie::parse_set_cookie`] with an explicit clock, so `Max-Age`
    /// can be resolved deterministically.
    pub fn parse_set_cookie_at(header: &str, request_url: &Url, now: i64) -> Result<Cookie, CookieParseError> {
        let mut parts = header.split(';');
        let pair = parts.next().unwrap_or_default().trim();

        let (name, value) = pair.split_once('=').ok_or(CookieParseError::MissingPair)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CookieParseError::EmptyName);
        }

        let host = request_url.host_str().unwrap_or_default().to_ascii_lowercase();
        let mut cookie = Cookie::new(name, value.trim(), host.clone()).with_path(default_path(request_url));
        let mut expires_attr = None;

        for attr in parts {
            let attr = attr.trim();
            if attr.is_empty() {
                continue;
            }
            let (key, val) = match attr.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (attr, ""),
            };

            match key.to_ascii_lowercase().as_str() {
                "expires" => {
                    expires_attr = parse_cookie_date(val);
                    if expires_attr.is_none() {
                        log::debug!("ignoring unparsable Expires attribute {val:?} on cookie {name}");
                    }
                }
                "max-age" => {
                    let age = val
                        .parse::<i64>()
                        .map_err(|_| CookieParseError::InvalidMaxAge(val.to_string()))?;
                    cookie.max_age = Some(age);
                }
                "domain" => {
                    let bare = val.trim_start_matches('.').to_ascii_lowercase();
                    if bare.is_empty() {
                        continue;
                    }
                    let dotted = format!(".{bare}");
                    if !domain_matches(&dotted, &host) {
                        return Err(CookieParseError::DomainMismatch { domain: bare, host });
                    }
                    cookie.domain = dotted;
                }
                "path" => {
                    if val.starts_with('/') {
                        cookie.path = val.to_string();
                    }
                }
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                "samesite" => cookie.same_site = SameSite::parse(val),
                _ => {}
            }
        }

        // Max-Age wins over Expires.
        cookie.expires = match cookie.max_age {
            Some(age) => Some(now.saturating_add(age)),
            None => expires_attr,
        };

        Ok(cookie)
    }

    /// `name=value` as used in a `Cookie` request header.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Parses every `Set-Cookie` header in `headers`.
///
/// Malformed headers are logged and skipped; their siblings are still returned.
pub fn parse_response_cookies(url: &Url, headers: &HeaderMap) -> Vec<Cookie> {
    let mut cookies = Vec::new();

    for header in headers.get_all(SET_COOKIE) {
        let Ok(raw) = header.to_str() else {
            log::warn!("dropping non-ASCII Set-Cookie header from {url}");
            continue;
        };

        match Cookie::parse_set_cookie(raw, url) {
            Ok(cookie) => cookies.push(cookie),
            Err(e) => log::warn!("dropping Set-Cookie from {url}: {e}"),
        }
    }

    cookies
}

/// Domain rule: a dotted domain matches its suffix and all subdomains, a bare
/// domain matches only the identical host.
pub fn domain_matches(cookie_domain: &str, host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = cookie_domain.to_ascii_lowercase();

    match domain.strip_prefix('.') {
        Some("") => false,
        Some(suffix) => host == suffix || host.ends_with(&domain),
        None => host == domain,
    }
}

/// Path rule: `R == P`, or `R` starts with `P` and either `P` ends with `/` or
/// the next character of `R` is `/`.
pub fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }

    match request_path.strip_prefix(cookie_path) {
        Some(rest) => cookie_path.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// Directory of the request path, used when a cookie has no `Path` attribute.
fn default_path(url: &Url) -> String {
    url.path()
        .rsplit_once('/')
        .map_or("/", |(dir, _)| if dir.is_empty() { "/" } else { dir })
        .to_string()
}

/// Parses an `Expires` date in any of the formats servers still send.
fn parse_cookie_date(value: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.timestamp());
    }

    const FORMATS: [&str; 4] = [
        "%a, %d-%b-%Y %H:%M:%S GMT",
        "%A, %d-%b-%y %H:%M:%S GMT",
        "%a, %d-%b-%y %H:%M:%S GMT",
        "%a %b %e %H:%M:%S %Y",
    ];

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.and_utc().timestamp())
}
