//! Request extractors.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use cozum_common::AppError;
use cozum_core::Actor;
use cozum_db::entities::user;

use crate::middleware::{AppState, TokenRejection};

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl AuthUser {
    /// The caller as the authorization rules see them.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::from_user(&self.0)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        if let Some(user) = parts.extensions.get::<user::Model>() {
            return Ok(Self(user.clone()));
        }

        match parts.extensions.get::<TokenRejection>() {
            Some(TokenRejection(reason)) => Err(AppError::InvalidToken(reason.clone())),
            None => Err(AppError::Unauthorized),
        }
    }
}

/// Scheme and host the request was addressed to, for building absolute URLs.
#[derive(Debug, Clone)]
pub struct RequestOrigin(pub String);

impl RequestOrigin {
    /// Resolve the origin from proxy headers, falling back to `server_url`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, server_url: &str) -> Self {
        let default_scheme = server_url.split_once("://").map_or("http", |(scheme, _)| scheme);
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map_or(default_scheme, str::trim);

        let host = headers
            .get("x-forwarded-host")
            .or_else(|| headers.get(axum::http::header::HOST))
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|h| !h.is_empty());

        match host {
            Some(host) => Self(format!("{scheme}://{host}")),
            None => Self(server_url.trim_end_matches('/').to_string()),
        }
    }

    /// Make a storage URL absolute. Absolute URLs are returned unchanged.
    #[must_use]
    pub fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        if url.starts_with('/') {
            format!("{}{url}", self.0)
        } else {
            format!("{}/{url}", self.0)
        }
    }
}

impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers, &state.server_url))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_origin_prefers_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("10.0.0.5:8000"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("api.cozumvar.example"));

        let origin = RequestOrigin::from_headers(&headers, "http://localhost:8000");
        assert_eq!(origin.0, "https://api.cozumvar.example");
    }

    #[test]
    fn test_origin_uses_host_with_configured_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("cozumvar.example"));

        let origin = RequestOrigin::from_headers(&headers, "https://cozumvar.example/");
        assert_eq!(origin.0, "https://cozumvar.example");
    }

    #[test]
    fn test_origin_without_host_falls_back() {
        let origin = RequestOrigin::from_headers(&HeaderMap::new(), "https://cozumvar.example/");
        assert_eq!(origin.0, "https://cozumvar.example");
    }

    #[test]
    fn test_absolute() {
        let origin = RequestOrigin("https://cozumvar.example".to_string());
        assert_eq!(
            origin.absolute("/media/reports/a.jpg"),
            "https://cozumvar.example/media/reports/a.jpg"
        );
        assert_eq!(
            origin.absolute("https://cdn.example/a.jpg"),
            "https://cdn.example/a.jpg"
        );
    }
}
