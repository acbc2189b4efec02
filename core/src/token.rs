//! Bearer tokens and the stored-token parse step.
//!
//! # Design
//! Persisted storage holds either a raw token string or a structured JSON
//! value carrying an `access_token` field (plus, after a login, a
//! `refresh_token`). `StoredToken::parse` is the one place that decides
//! which shape a stored value has; everything downstream works with the
//! typed result.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

const ACCESS_FIELDS: [&str; 2] = ["access_token", "accessToken"];
const REFRESH_FIELDS: [&str; 2] = ["refresh_token", "refreshToken"];

/// An access token ready to be sent as `Authorization: Bearer <token>`.
///
/// Construction guarantees the token is usable as a header value.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Accept `raw` if it is usable as a credential: non-empty after
    /// trimming, visible ASCII only, and not the leftovers of a JSON
    /// object or array.
    pub fn new(raw: &str) -> Option<Self> {
        let token = raw.trim();
        if token.is_empty() || token == "null" || token == "undefined" {
            return None;
        }
        if token.starts_with('{') || token.starts_with('[') {
            return None;
        }
        if !token.bytes().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        Some(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The full `Authorization` header value.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// A value read from persisted storage, parsed into its typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub access: BearerToken,
    pub refresh: Option<String>,
}

#[derive(Serialize)]
struct StoredSession<'a> {
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

impl StoredToken {
    pub fn new(access: BearerToken, refresh: Option<String>) -> Self {
        Self { access, refresh }
    }

    /// Parse a stored value. Never fails loudly: anything that is not a
    /// usable token yields `None`.
    ///
    /// - JSON object: the `access_token` (or `accessToken`) field is the
    ///   token; an object without one is unusable.
    /// - JSON string literal: unwrapped and treated as a raw token.
    /// - JSON `null`: unusable.
    /// - Anything else, including malformed JSON: the raw text itself.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(fields)) => {
                let access = first_str(&fields, &ACCESS_FIELDS).and_then(BearerToken::new)?;
                let refresh = first_str(&fields, &REFRESH_FIELDS)
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string);
                Some(Self { access, refresh })
            }
            Ok(Value::String(inner)) => BearerToken::new(&inner).map(Self::raw),
            Ok(Value::Null) => None,
            Ok(_) => BearerToken::new(trimmed).map(Self::raw),
            Err(err) => {
                debug!(error = %err, "stored token is not JSON, using it as a raw token");
                BearerToken::new(trimmed).map(Self::raw)
            }
        }
    }

    fn raw(access: BearerToken) -> Self {
        Self { access, refresh: None }
    }

    /// Serialize into the structured shape `parse` understands.
    pub fn to_storage_value(&self) -> String {
        let session = StoredSession {
            access_token: self.access.as_str(),
            refresh_token: self.refresh.as_deref(),
        };
        // A struct of two strings always serializes.
        serde_json::to_string(&session).unwrap_or_default()
    }
}

fn first_str<'a>(fields: &'a serde_json::Map<String, Value>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| fields.get(*name).and_then(Value::as_str))
}
