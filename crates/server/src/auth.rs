//! Authentication middleware.
//!
//! Tokens are HS256 JWTs issued by the account service; the gateway only
//! verifies them. The `id` claim is the user id.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

const TOKEN_REQUIRED: &str = "Token diperlukan untuk autentikasi";
const TOKEN_INVALID: &str = "Token tidak valid atau kedaluwarsa";

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value.
    /// The value is truncated to MAX_TRACE_ID_LEN characters and non-printable
    /// characters are removed.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    /// Get the trace ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// JWT claims the gateway reads. Other claims (email, iat) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub exp: u64,
}

/// Authenticated request extension.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

/// Marker left by the middleware when a token was presented but rejected.
#[derive(Clone, Copy, Debug)]
struct InvalidToken;

/// HS256 token verifier.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a token and return its user.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, jsonwebtoken::errors::Error> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(AuthenticatedUser {
            user_id: data.claims.id,
        })
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithm", &"HS256")
            .finish()
    }
}

/// Extract bearer token from Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(v[7..].trim())
            } else {
                None
            }
        })
        .filter(|t| !t.is_empty())
}

/// Extract the `token` cookie.
fn extract_cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == "token" && !value.is_empty())
        .map(|(_, value)| value)
}

/// Find a token in, in order: the Authorization header, the `token` cookie,
/// the `x-access-token` header.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    extract_bearer_token(headers)
        .or_else(|| extract_cookie_token(headers))
        .or_else(|| {
            headers
                .get("x-access-token")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|t| !t.is_empty())
        })
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Authentication middleware that verifies tokens and sets up trace context.
///
/// It never rejects on its own; handlers call [`require_auth`].
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(&req);
    let trace_id_str = trace_id.0.clone();
    req.extensions_mut().insert(trace_id);

    let verified = extract_token(req.headers()).map(|token| state.tokens.verify(token));
    match verified {
        Some(Ok(user)) => {
            req.extensions_mut().insert(user);
        }
        Some(Err(e)) => {
            tracing::debug!(error = %e, "Token verification failed");
            req.extensions_mut().insert(InvalidToken);
        }
        None => {}
    }

    next.run(req)
        .instrument(tracing::info_span!("request", trace_id = %trace_id_str))
        .await
}

/// Require authentication.
///
/// No token at all is 403; a token that failed verification is 401.
pub fn require_auth(req: &Request) -> ApiResult<&AuthenticatedUser> {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>() {
        return Ok(user);
    }
    if req.extensions().get::<InvalidToken>().is_some() {
        Err(ApiError::Unauthorized(TOKEN_INVALID.to_string()))
    } else {
        Err(ApiError::Forbidden(TOKEN_REQUIRED.to_string()))
    }
}

/// Get the trace ID from request extensions.
pub fn get_trace_id(req: &Request) -> Option<&TraceId> {
    req.extensions().get::<TraceId>()
}
