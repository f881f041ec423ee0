//! Gateway Authentication Module
//!
//! Resolves the caller's account from a Bearer API key. Every protected
//! route takes [`RequireAccount`], so a request without a valid key is
//! rejected before its body is read or any model or tool is touched.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};

use ledgerforge_core::AccountContext;

/// Optional header naming the account when a trusted proxy already
/// authenticated the caller.
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// Maps API keys to account identifiers.
#[derive(Debug, Default)]
pub struct ApiKeyAuthenticator {
    keys: HashMap<String, AccountContext>,
    trust_account_header: bool,
}

impl ApiKeyAuthenticator {
    /// Keys with a blank token or account are ignored.
    pub fn new(keys: HashMap<String, String>, trust_account_header: bool) -> Self {
        let keys = keys
            .into_iter()
            .filter(|(token, _)| !token.trim().is_empty())
            .filter_map(|(token, account)| AccountContext::new(account).map(|account| (token, account)))
            .collect();
        Self {
            keys,
            trust_account_header,
        }
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn authenticate(&self, parts: &Parts) -> Option<AccountContext> {
        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.strip_prefix("Bearer "))
            .map(str::trim);

        if let Some(token) = bearer {
            match self.keys.get(token) {
                Some(account) => return Some(account.clone()),
                None => warn!("Rejected unknown API key"),
            }
        }

        if self.trust_account_header {
            let account = parts
                .headers
                .get(ACCOUNT_HEADER)
                .and_then(|val| val.to_str().ok())
                .and_then(|val| AccountContext::new(val.trim()));
            if account.is_some() {
                debug!("Account taken from trusted header");
                return account;
            }
        }
        None
    }
}

/// Extractor yielding the authenticated account.
pub struct RequireAccount(pub AccountContext);

pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireAccount
where
    S: Send + Sync,
    Arc<ApiKeyAuthenticator>: FromRef<S>,
{
    type Rejection = Unauthorized;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = Arc::<ApiKeyAuthenticator>::from_ref(state);
        match authenticator.authenticate(parts) {
            Some(account) => Ok(RequireAccount(account)),
            None => {
                warn!(path = %parts.uri.path(), "Missing or invalid credentials");
                Err(Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/chat");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn authenticator(trust_header: bool) -> ApiKeyAuthenticator {
        let keys = HashMap::from([
            ("key-alpha".to_string(), "acct_alpha".to_string()),
            ("key-blank".to_string(), " ".to_string()),
        ]);
        ApiKeyAuthenticator::new(keys, trust_header)
    }

    #[test]
    fn test_bearer_key_maps_to_account() {
        let auth = authenticator(false);
        assert_eq!(auth.key_count(), 1);
        let account = auth.authenticate(&parts(&[("authorization", "Bearer key-alpha")])).unwrap();
        assert_eq!(account.account_id(), "acct_alpha");
        assert!(auth.authenticate(&parts(&[("authorization", "Bearer nope")])).is_none());
        assert!(auth.authenticate(&parts(&[("authorization", "Basic key-alpha")])).is_none());
        assert!(auth.authenticate(&parts(&[])).is_none());
    }

    #[test]
    fn test_account_header_needs_trust() {
        let header = [(ACCOUNT_HEADER, "acct_proxy")];
        assert!(authenticator(false).authenticate(&parts(&header)).is_none());
        let account = authenticator(true).authenticate(&parts(&header)).unwrap();
        assert_eq!(account.account_id(), "acct_proxy");
        assert!(authenticator(true).authenticate(&parts(&[(ACCOUNT_HEADER, "  ")])).is_none());
    }
}
