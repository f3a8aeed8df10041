//! Authentication, role and rate-limit middleware

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::store::profiles::Role;

use super::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Audience Supabase stamps on signed-in user tokens
const USER_AUDIENCE: &str = "authenticated";

/// JWT claims from Supabase auth token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Audience
    #[serde(default)]
    pub aud: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Email (if available)
    #[serde(default)]
    pub email: Option<String>,
    /// Database role
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Deserialize)]
struct JwtHeader {
    alg: String,
}

/// Verify an HS256 JWT and extract claims
pub fn verify_jwt(token: &str, secret: &str, now: i64) -> Result<JwtClaims, AuthError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken);
    };

    let header: JwtHeader = URL_SAFE_NO_PAD
        .decode(header_b64)
        .ok()
        .and_then(|raw| serde_json::from_slice(&raw).ok())
        .ok_or(AuthError::InvalidToken)?;
    if header.alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    // Verify signature (HMAC-SHA256, constant time)
    let message = format!("{}.{}", header_b64, payload_b64);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    mac.update(message.as_bytes());

    let provided_signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AuthError::InvalidToken)?;
    mac.verify_slice(&provided_signature)
        .map_err(|_| AuthError::InvalidToken)?;

    // Decode payload
    let payload_json = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AuthError::InvalidToken)?;
    let claims: JwtClaims = serde_json::from_slice(&payload_json)
        .map_err(|_| AuthError::InvalidToken)?;

    if claims.exp < now {
        return Err(AuthError::TokenExpired);
    }

    if claims.aud.as_deref().is_some_and(|aud| aud != USER_AUDIENCE) {
        return Err(AuthError::InvalidAudience);
    }

    Ok(claims)
}

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid audience")]
    InvalidAudience,

    #[error("No staff profile for this account")]
    NoProfile,

    #[error("Too many requests")]
    RateLimited,

    #[error("Could not load profile")]
    ProfileLookup,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::MissingHeader => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::InvalidAudience => StatusCode::UNAUTHORIZED,
            AuthError::NoProfile => StatusCode::FORBIDDEN,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::ProfileLookup => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

/// Authenticated caller, inserted into request extensions by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
    /// Raw bearer token, forwarded so row-level security sees the caller
    pub access_token: String,
    pub claims: JwtClaims,
}

impl AuthenticatedUser {
    /// Reject callers below `minimum`
    pub fn require(&self, minimum: Role) -> Result<(), AppError> {
        if self.role >= minimum {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("requires {} role", minimum)))
        }
    }
}

/// Middleware to require authentication, resolve the caller's role and apply the rate limit
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::MissingHeader)?;
    let token = bearer.token().to_string();

    let claims = verify_jwt(
        &token,
        &state.config.supabase_jwt_secret,
        chrono::Utc::now().timestamp(),
    )?;

    if state.limiter.check_key(&claims.sub).is_err() {
        debug!(user_id = %claims.sub, "Rate limited");
        return Err(AuthError::RateLimited);
    }

    let profile = state
        .profile_store
        .get_profile(claims.sub)
        .await
        .map_err(|e| {
            warn!(user_id = %claims.sub, error = %e, "Profile lookup failed");
            AuthError::ProfileLookup
        })?
        .ok_or(AuthError::NoProfile)?;

    let auth_user = AuthenticatedUser {
        user_id: claims.sub,
        role: profile.role,
        access_token: token,
        claims,
    };

    // Insert into request extensions for handlers to access
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
pub(crate) fn sign_test_token(secret: &str, claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", header, payload).as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{}.{}.{}", header, payload, signature)
}

#[cfg(test)]
pub(crate) fn test_user(role: Role) -> AuthenticatedUser {
    let user_id = Uuid::new_v4();
    AuthenticatedUser {
        user_id,
        role,
        access_token: "user-token".to_string(),
        claims: JwtClaims {
            sub: user_id,
            aud: Some(USER_AUDIENCE.to_string()),
            exp: i64::MAX,
            iat: 0,
            email: None,
            role: Some("authenticated".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "super-secret-jwt-token";
    const NOW: i64 = 1_800_000_000;

    fn claims(exp: i64) -> serde_json::Value {
        json!({
            "sub": "2f1e0c9a-7b11-4a8e-b0d4-6f7c3f2a1d5b",
            "aud": "authenticated",
            "exp": exp,
            "iat": exp - 3600,
            "email": "chef@bistro.example",
            "role": "authenticated"
        })
    }

    #[test]
    fn valid_token_yields_claims() {
        let token = sign_test_token(SECRET, &claims(NOW + 60));
        let verified = verify_jwt(&token, SECRET, NOW).unwrap();
        assert_eq!(verified.sub.to_string(), "2f1e0c9a-7b11-4a8e-b0d4-6f7c3f2a1d5b");
        assert_eq!(verified.email.as_deref(), Some("chef@bistro.example"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_test_token("other-secret", &claims(NOW + 60));
        assert!(matches!(verify_jwt(&token, SECRET, NOW), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign_test_token(SECRET, &claims(NOW - 1));
        assert!(matches!(verify_jwt(&token, SECRET, NOW), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn foreign_audience_is_rejected() {
        let mut body = claims(NOW + 60);
        body["aud"] = json!("service");
        let token = sign_test_token(SECRET, &body);
        assert!(matches!(verify_jwt(&token, SECRET, NOW), Err(AuthError::InvalidAudience)));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for token in ["", "a.b", "a.b.c.d", "not.base64!.sig"] {
            assert!(matches!(verify_jwt(token, SECRET, NOW), Err(AuthError::InvalidToken)));
        }
    }

    #[test]
    fn role_requirements() {
        let user = AuthenticatedUser {
            user_id: Uuid::nil(),
            role: Role::Manager,
            access_token: String::new(),
            claims: serde_json::from_value(claims(NOW)).unwrap(),
        };
        assert!(user.require(Role::Staff).is_ok());
        assert!(user.require(Role::Manager).is_ok());
        assert!(matches!(user.require(Role::Admin), Err(AppError::Forbidden(_))));
    }
}
