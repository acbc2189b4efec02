//! Request interceptor that attaches the stored bearer token.

use std::sync::Arc;

use tracing::trace;

use crate::http::HttpRequest;
use crate::storage::{TokenStorage, ACCESS_TOKEN_KEY};
use crate::token::StoredToken;

pub const AUTHORIZATION: &str = "authorization";

/// Reads the token from storage at the moment a request is intercepted and
/// writes the `Authorization` header. Never blocks on the network, never
/// retries, never looks at responses.
#[derive(Clone)]
pub struct BearerInterceptor {
    storage: Arc<dyn TokenStorage>,
    key: String,
}

impl BearerInterceptor {
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self::with_key(storage, ACCESS_TOKEN_KEY)
    }

    pub fn with_key(storage: Arc<dyn TokenStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The token currently in storage, parsed.
    pub fn current(&self) -> Option<StoredToken> {
        self.storage
            .get(&self.key)
            .and_then(|raw| StoredToken::parse(&raw))
    }

    /// Set `Authorization: Bearer <token>` from storage, or strip any stale
    /// header when storage holds nothing usable.
    pub fn intercept(&self, request: &mut HttpRequest) {
        match self.current() {
            Some(token) => request.set_header(AUTHORIZATION, token.access.header_value()),
            None => {
                trace!(url = %request.url, "no usable token in storage");
                request.remove_header(AUTHORIZATION);
            }
        }
    }
}
