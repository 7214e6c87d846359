//! Shared-secret authentication for the webhook endpoint.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use crate::error::GatewayError;

/// Checks the webhook token against the configured secret.
///
/// The token is read from the configured header, or else from an
/// `Authorization: Bearer <token>` header. With no secret configured every
/// call is rejected.
#[derive(Clone)]
pub struct WebhookAuth {
    secret: Option<String>,
    header: String,
}

impl std::fmt::Debug for WebhookAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAuth")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("header", &self.header)
            .finish()
    }
}

impl WebhookAuth {
    /// Creates a checker for `secret` sent in `header`.
    #[must_use]
    pub fn new(secret: Option<String>, header: impl Into<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.trim().is_empty()),
            header: header.into(),
        }
    }

    /// Name of the header the token is expected in.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Verifies the request headers.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] if no secret is configured or
    /// the token is missing or does not match.
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), GatewayError> {
        let provided = self.token_from(headers);
        match (&self.secret, provided) {
            (Some(secret), Some(token)) if token == secret.as_str() => Ok(()),
            (None, _) => {
                tracing::warn!("webhook rejected: no webhook secret configured");
                Err(self.unauthorized())
            }
            _ => {
                tracing::warn!(header = %self.header, "webhook rejected: bad or missing token");
                Err(self.unauthorized())
            }
        }
    }

    fn token_from<'h>(&self, headers: &'h HeaderMap) -> Option<&'h str> {
        let direct = headers
            .get(self.header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|token| !token.is_empty());
        direct.or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| bearer_token(value.trim()))
                .filter(|token| !token.is_empty())
        })
    }

    fn unauthorized(&self) -> GatewayError {
        GatewayError::Unauthorized {
            header: self.header.clone(),
        }
    }
}

/// Token of a `Bearer` credential; the scheme is case-insensitive.
fn bearer_token(credential: &str) -> Option<&str> {
    let (scheme, token) = credential.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn auth() -> WebhookAuth {
        WebhookAuth::new(Some("s3cret".to_string()), "X-Zapier-Token")
    }

    #[test]
    fn accepts_configured_header() {
        assert!(auth().verify(&headers(&[("x-zapier-token", "s3cret")])).is_ok());
    }

    #[test]
    fn accepts_bearer_token() {
        assert!(auth().verify(&headers(&[("authorization", "Bearer s3cret")])).is_ok());
    }

    #[test]
    fn bearer_scheme_ignores_case() {
        assert!(auth().verify(&headers(&[("authorization", "bearer s3cret")])).is_ok());
        assert!(auth().verify(&headers(&[("authorization", "BEARER s3cret")])).is_ok());
    }

    #[test]
    fn rejects_missing_or_wrong_token() {
        assert!(auth().verify(&HeaderMap::new()).is_err());
        assert!(auth().verify(&headers(&[("x-zapier-token", "nope")])).is_err());
        assert!(auth().verify(&headers(&[("authorization", "Basic s3cret")])).is_err());
    }

    #[test]
    fn rejects_everything_without_a_secret() {
        let auth = WebhookAuth::new(Some("  ".to_string()), "X-Zapier-Token");
        let result = auth.verify(&headers(&[("x-zapier-token", "  ")]));
        assert!(matches!(result, Err(GatewayError::Unauthorized { .. })));
    }

    #[test]
    fn debug_redacts_secret() {
        assert!(!format!("{:?}", auth()).contains("s3cret"));
    }
}
