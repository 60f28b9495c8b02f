//! Cookie jar merged by name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::fetch::FetchResponse;

/// One parsed `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value, or `None` when the server asked for deletion.
    pub value: Option<String>,
}

/// Parses the name and value out of a `Set-Cookie` header.
///
/// `Max-Age=0` (or negative) and an empty value both mean deletion. Other
/// attributes are ignored.
#[must_use]
pub fn parse_set_cookie(header: &str) -> Option<SetCookie> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = value.trim().trim_matches('"');

    let expired = parts.any(|attr| {
        attr.split_once('=').is_some_and(|(key, v)| {
            key.trim().eq_ignore_ascii_case("max-age") && v.trim().parse::<i64>().is_ok_and(|age| age <= 0)
        })
    });

    Some(SetCookie {
        name: name.to_string(),
        value: (!expired && !value.is_empty()).then(|| value.to_string()),
    })
}

/// Cookies accumulated over a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a cookie, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Gets a cookie value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Applies one `Set-Cookie` header. Returns true if it parsed.
    pub fn merge_set_cookie(&mut self, header: &str) -> bool {
        let Some(cookie) = parse_set_cookie(header) else {
            return false;
        };
        match cookie.value {
            Some(value) => {
                self.cookies.insert(cookie.name, value);
            }
            None => {
                self.cookies.remove(&cookie.name);
            }
        }
        true
    }

    /// Applies every `Set-Cookie` header of a response, in order, so the
    /// last write per name wins. Returns the number applied.
    pub fn merge_response(&mut self, response: &FetchResponse) -> usize {
        response
            .set_cookies()
            .filter(|header| self.merge_set_cookie(header))
            .count()
    }

    /// `Cookie` request header value, or `None` when empty.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Number of cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns true if the jar is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Removes every cookie.
    pub fn clear(&mut self) {
        self.cookies.clear();
    }
}
