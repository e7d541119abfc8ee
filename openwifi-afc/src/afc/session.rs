//! Per-inquiry session credentials.
//!
//! A session is created fresh for every inquiry attempt and dropped once
//! the exchange completes or fails. Nothing here is persisted.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Cookie name to value, ordered so the `Cookie` header is stable.
pub type CookieJar = BTreeMap<String, String>;

/// Credentials obtained from the login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub csrf_token: String,
    pub cookies: CookieJar,
}

impl SessionCredentials {
    pub fn new(csrf_token: String, cookies: CookieJar) -> Self {
        Self {
            csrf_token,
            cookies,
        }
    }

    /// Merge cookies set by a later response, overwriting existing names.
    pub fn merge_cookies(&mut self, cookies: CookieJar) {
        self.cookies.extend(cookies);
    }

    /// Value for the `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        cookie_header(&self.cookies)
    }
}

/// Render a jar as `name=value; name2=value2`.
pub fn cookie_header(cookies: &CookieJar) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extract the `name=value` pair from a `Set-Cookie` header value.
///
/// Attributes (`Path`, `HttpOnly`, ...) are dropped.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().trim_matches('"').to_string()))
}

/// Collect all `Set-Cookie` values of one response into a jar.
pub fn collect_cookies<'a, I>(headers: I) -> CookieJar
where
    I: IntoIterator<Item = &'a str>,
{
    headers.into_iter().filter_map(parse_set_cookie).collect()
}

static INPUT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<input\b[^>]*>").expect("valid input tag pattern"));

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute pattern")
});

/// Find the `value` of the `<input id="csrf_token">` element in a login page.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    for tag in INPUT_TAG.find_iter(html) {
        let mut id = None;
        let mut value = None;

        for caps in ATTRIBUTE.captures_iter(tag.as_str()) {
            let attr_value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();

            match caps[1].to_ascii_lowercase().as_str() {
                "id" => id = Some(attr_value),
                "value" => value = Some(attr_value),
                _ => {}
            }
        }

        if id == Some("csrf_token") {
            return value.filter(|v| !v.is_empty()).map(str::to_string);
        }
    }

    None
}
