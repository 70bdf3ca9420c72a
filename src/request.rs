//! Request model and resource key derivation.
//!
//! A [`ResourceKey`] is the normalized lookup key derived from a request's
//! target. Both content stores are indexed by it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An outgoing HTTP request as seen by the interception layer.
///
/// This is a plain snapshot of the request the host client stack was about to
/// send. The body is carried only so a lookup key can incorporate it in the
/// future; no body matching happens beyond the key.
#[derive(Debug, Clone)]
pub struct StubRequest {
    /// HTTP method (e.g. "GET")
    pub method: String,
    /// Full target URL or a relative target (e.g. "/posts/1")
    pub url: String,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body, if any
    pub body: Option<Vec<u8>>,
}

impl StubRequest {
    /// Create a request with the given method and target.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Convenience constructor for a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Host component of the target, lowercased and without the port.
    ///
    /// Relative targets have no host.
    pub fn host(&self) -> Option<String> {
        let rest = self.url.split_once("://")?.1;
        let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
        let host = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
        let host = host.split(':').next().unwrap_or(host);
        if host.is_empty() {
            None
        } else {
            Some(host.to_lowercase())
        }
    }

    /// Path component of the target, without query or fragment.
    pub fn path(&self) -> String {
        let after_scheme = match self.url.split_once("://") {
            Some((_, rest)) => match rest.find('/') {
                Some(idx) => &rest[idx..],
                None => "/",
            },
            None => self.url.as_str(),
        };
        let no_fragment = after_scheme.split('#').next().unwrap_or(after_scheme);
        let no_query = no_fragment.split('?').next().unwrap_or(no_fragment);
        if no_query.is_empty() {
            "/".to_string()
        } else {
            no_query.to_string()
        }
    }
}

/// Normalized lookup key for a logical resource.
///
/// Derived keys have the shape `"{METHOD} {normalized-target}"`. Keys may also
/// be built directly from a raw string, which is how configuration entries and
/// programmatic registrations address resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Build a key directly from a raw string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Derive the key for a request from its method and normalized target.
    pub fn for_request(request: &StubRequest) -> Self {
        Self(format!(
            "{} {}",
            request.method.to_uppercase(),
            normalize_target(&request.url)
        ))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Normalize a request target so equivalent spellings map to the same key.
///
/// Absolute targets get a lowercased scheme and host, the default port
/// stripped, the fragment removed, and an empty path rewritten to `/`.
/// Relative targets only have the fragment removed.
pub fn normalize_target(target: &str) -> String {
    let target = target.split('#').next().unwrap_or(target);

    let (scheme, rest) = match target.split_once("://") {
        Some((scheme, rest)) => (scheme.to_lowercase(), rest),
        None => return target.to_string(),
    };

    let (authority, tail) = match rest.find(['/', '?']) {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };

    let mut authority = authority.to_lowercase();
    let default_port = match scheme.as_str() {
        "http" => Some(":80"),
        "https" => Some(":443"),
        _ => None,
    };
    if let Some(port) = default_port {
        if let Some(stripped) = authority.strip_suffix(port) {
            authority = stripped.to_string();
        }
    }

    let tail = if tail.is_empty() || tail.starts_with('?') {
        format!("/{}", tail)
    } else {
        tail.to_string()
    };

    format!("{}://{}{}", scheme, authority, tail)
}
