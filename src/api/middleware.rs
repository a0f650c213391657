//! Bearer-token authentication and CORS configuration.
//!
//! Tokens are verified with `jsonwebtoken`, either against the identity
//! provider's published JWKS (RS256) or against a shared HS256 secret. When no
//! verifier is configured every request runs as [`AuthUser::local`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// The caller, as established by the auth middleware.
///
/// Handlers receive it explicitly through `Extension<AuthUser>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Token subject. Used as the course creator.
    pub id: String,
    pub email: Option<String>,
}

impl AuthUser {
    pub const LOCAL_ID: &'static str = "local-user";

    /// Identity used when authentication is disabled.
    pub fn local() -> Self {
        Self {
            id: Self::LOCAL_ID.to_string(),
            email: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Authorization header must use the Bearer scheme")]
    InvalidScheme,

    #[error("Token header has no key id")]
    MissingKeyId,

    #[error("No signing key matches key id {0}")]
    UnknownKey(String),

    #[error("Failed to fetch signing keys: {0}")]
    Jwks(#[from] reqwest::Error),

    #[error("{0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "missing_token"),
            Self::Jwks(_) => (StatusCode::SERVICE_UNAVAILABLE, "jwks_unavailable"),
            _ => (StatusCode::UNAUTHORIZED, "invalid_token"),
        };

        let body = serde_json::json!({ "message": self.to_string(), "code": code });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// Minimum time between two fetches of the provider's key set.
pub const JWKS_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct KeyCache {
    keys: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn find(&self, kid: &str) -> Result<Option<DecodingKey>, AuthError> {
        match self.keys.as_ref().and_then(|set| set.find(kid)) {
            Some(jwk) => Ok(Some(DecodingKey::from_jwk(jwk)?)),
            None => Ok(None),
        }
    }

    fn fetched_within(&self, interval: Duration) -> bool {
        self.fetched_at.is_some_and(|at| at.elapsed() < interval)
    }
}

enum KeySource {
    Jwks {
        url: String,
        client: Client,
        refresh_interval: Duration,
        cache: RwLock<KeyCache>,
    },
    Shared(DecodingKey),
}

/// Verifies bearer tokens and extracts the caller's identity.
pub struct TokenVerifier {
    issuer: Option<String>,
    audience: Option<String>,
    keys: KeySource,
}

impl TokenVerifier {
    /// Verify RS256 tokens against `{issuer}.well-known/jwks.json`.
    ///
    /// The key set is fetched lazily and refetched when a token names a key id
    /// that is not cached, at most once per [`JWKS_REFRESH_INTERVAL`].
    pub fn jwks(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        let issuer = normalize_issuer(issuer.into());
        let url = format!("{}.well-known/jwks.json", issuer);
        Self {
            issuer: Some(issuer),
            audience: Some(audience.into()),
            keys: KeySource::Jwks {
                url,
                client: Client::new(),
                refresh_interval: JWKS_REFRESH_INTERVAL,
                cache: RwLock::new(KeyCache::default()),
            },
        }
    }

    /// Change the minimum time between key set fetches. No effect on a
    /// shared-secret verifier.
    pub fn jwks_refresh_interval(mut self, interval: Duration) -> Self {
        if let KeySource::Jwks {
            refresh_interval, ..
        } = &mut self.keys
        {
            *refresh_interval = interval;
        }
        self
    }

    /// Verify HS256 tokens signed with a shared secret.
    pub fn shared_secret(
        secret: &[u8],
        issuer: Option<String>,
        audience: Option<String>,
    ) -> Self {
        Self {
            issuer: issuer.map(normalize_issuer),
            audience,
            keys: KeySource::Shared(DecodingKey::from_secret(secret)),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let (key, algorithm) = match &self.keys {
            KeySource::Shared(key) => (key.clone(), Algorithm::HS256),
            KeySource::Jwks {
                url,
                client,
                refresh_interval,
                cache,
            } => {
                let kid = decode_header(token)?
                    .kid
                    .ok_or(AuthError::MissingKeyId)?;
                let key = jwk_key(url, client, cache, *refresh_interval, &kid).await?;
                (key, Algorithm::RS256)
            }
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<Claims>(token, &key, &validation)?;
        Ok(AuthUser {
            id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

async fn jwk_key(
    url: &str,
    client: &Client,
    cache: &RwLock<KeyCache>,
    refresh_interval: Duration,
    kid: &str,
) -> Result<DecodingKey, AuthError> {
    let unknown = || AuthError::UnknownKey(kid.to_string());

    {
        let cached = cache.read().await;
        if let Some(key) = cached.find(kid)? {
            return Ok(key);
        }
        if cached.fetched_within(refresh_interval) {
            return Err(unknown());
        }
    }

    let mut cached = cache.write().await;
    // Another request may have refreshed while this one waited for the lock
    if let Some(key) = cached.find(kid)? {
        return Ok(key);
    }
    if cached.fetched_within(refresh_interval) {
        return Err(unknown());
    }

    tracing::debug!(%url, %kid, "Fetching signing keys");
    let fetched = fetch_key_set(client, url).await;
    cached.fetched_at = Some(Instant::now());
    cached.keys = Some(fetched?);

    cached.find(kid)?.ok_or_else(unknown)
}

async fn fetch_key_set(client: &Client, url: &str) -> Result<JwkSet, AuthError> {
    Ok(client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?)
}

fn normalize_issuer(issuer: String) -> String {
    if issuer.ends_with('/') {
        issuer
    } else {
        format!("{}/", issuer)
    }
}

/// Security configuration for the router.
#[derive(Clone, Default)]
pub struct SecurityConfig {
    /// Token verifier. `None` disables authentication.
    pub verifier: Option<Arc<TokenVerifier>>,
    /// Allowed CORS origins. `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl SecurityConfig {
    /// No authentication, permissive CORS (local development and tests).
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_verifier(verifier: TokenVerifier) -> Self {
        Self {
            verifier: Some(Arc::new(verifier)),
            cors_origins: None,
        }
    }

    pub fn cors_origins(mut self, origins: Option<Vec<String>>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let Some(origins) = &self.cors_origins else {
            return CorsLayer::permissive();
        };

        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    }
}

/// Authentication middleware. Attaches an [`AuthUser`] to the request.
pub async fn require_auth(
    State(config): State<SecurityConfig>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let user = match &config.verifier {
        None => AuthUser::local(),
        Some(verifier) => {
            let verified = match bearer_token(request.headers()).map(str::to_owned) {
                Ok(token) => verifier.verify(&token).await,
                Err(e) => Err(e),
            };
            match verified {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!("Rejected request: {}", e);
                    return e.into_response();
                }
            }
        }
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(AuthError::MissingToken),
        None => Err(AuthError::InvalidScheme),
    }
}
