//! Bearer-token extraction. Every API route requires the caller to supply
//! the upstream access token; the service holds no credentials of its own.

use crate::errors::AppError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Per-request credentials pulled from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub token: String,
}

impl AccessContext {
    /// First 20 characters of the token, used to namespace cache keys
    /// per caller without storing the full credential.
    pub fn token_prefix(&self) -> &str {
        let end = self
            .token
            .char_indices()
            .nth(20)
            .map(|(i, _)| i)
            .unwrap_or(self.token.len());
        &self.token[..end]
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AccessContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized("Authorization header must be a Bearer token".to_string())
            })?;

        Ok(AccessContext {
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_prefix_truncates_long_tokens() {
        let ctx = AccessContext {
            token: "abcdefghijklmnopqrstuvwxyz".to_string(),
        };
        assert_eq!(ctx.token_prefix(), "abcdefghijklmnopqrst");
    }

    #[test]
    fn test_token_prefix_short_token_unchanged() {
        let ctx = AccessContext {
            token: "short".to_string(),
        };
        assert_eq!(ctx.token_prefix(), "short");
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let request = axum::http::Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let result = AccessContext::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_bearer_token_extracted() {
        let request = axum::http::Request::builder()
            .header("Authorization", "Bearer secret-token-value")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let ctx = AccessContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(ctx.token, "secret-token-value");
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_rejected() {
        let request = axum::http::Request::builder()
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let result = AccessContext::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
