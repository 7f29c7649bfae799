//! Authentication: password hashing, signed bearer tokens, middleware.
//!
//! Passwords are stored as `salt$digest` with a per-user random salt and
//! an iterated SHA-256 digest. Access tokens are
//! `base64url(claims).hex(hmac_sha256(secret, claims))`, verified with a
//! constant-time MAC check before the claims are trusted.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Iterations applied to the salted password digest.
const HASH_ITERATIONS: u32 = 100_000;

// =============================================================================
// Password hashing
// =============================================================================

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::rng().random();
    let digest = digest_password(&salt, password);
    format!("{}${}", hex::encode(salt), hex::encode(digest))
}

/// Check a password against a stored `salt$digest` string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(digest_hex) else {
        return false;
    };
    let computed = digest_password(&salt, password);
    // MAC both digests under the same key for a constant-time comparison.
    let mut mac = HmacSha256::new_from_slice(&salt).expect("HMAC can take key of any size");
    mac.update(&computed);
    let computed_tag = mac.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&salt).expect("HMAC can take key of any size");
    mac.update(&expected);
    mac.verify_slice(&computed_tag).is_ok()
}

fn digest_password(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut digest: [u8; 32] = hasher.finalize().into();
    for _ in 1..HASH_ITERATIONS {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(digest);
        digest = hasher.finalize().into();
    }
    digest
}

// =============================================================================
// Access tokens
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    exp: i64,
}

/// Mint a signed access token for the user, valid for `ttl_minutes`.
pub fn issue_token(secret: &[u8], user_id: Uuid, ttl_minutes: i64) -> String {
    let claims = TokenClaims {
        sub: user_id.to_string(),
        exp: Utc::now().timestamp() + ttl_minutes * 60,
    };
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap_or_default());

    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    format!("{}.{}", payload, signature)
}

/// Verify a token's signature and expiry; returns the user id on success.
pub fn verify_token(secret: &[u8], token: &str) -> Option<Uuid> {
    let (payload, signature) = token.split_once('.')?;
    let sig_bytes = hex::decode(signature).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&sig_bytes).ok()?;

    let claims: TokenClaims =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;
    if claims.exp < Utc::now().timestamp() {
        return None;
    }
    Uuid::parse_str(&claims.sub).ok()
}

// =============================================================================
// Middleware
// =============================================================================

/// Middleware that validates Bearer token authentication.
///
/// Extracts the token from `Authorization: Bearer <token>`, verifies the
/// signature and expiry, loads the user, and inserts it into request
/// extensions. Returns 401 if anything is missing or invalid.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized("Missing Authorization header");
    };

    let Some(user_id) = verify_token(state.config.auth.secret_key.as_bytes(), token) else {
        return unauthorized("Invalid bearer token");
    };

    let users = quill_storage::UserRepository::new(std::sync::Arc::clone(&state.database));
    match users.find_by_id(user_id) {
        Ok(Some(user)) if user.is_active => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(_) => unauthorized("User not found"),
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed during auth");
            unauthorized("User not found")
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}
