//! Auth API endpoints.
//!
//! The server side of the sign-in protocol: issue a challenge message for
//! a claimed account, verify a signed message, resolve and revoke
//! sessions. The nonce is consumed atomically before any signature work,
//! so one verify pass burns it whether or not verification succeeds.

use crate::auth::message::{extract_nonce, render_message};
use crate::auth::middleware::{bearer_token, check_rate_limit, AppState, AuthSession};
use crate::auth::nonce::{generate_challenge_nonce, generate_session_token, NONCE_LEN};
use crate::auth::verify::{verify_signature, VerifyError};
use crate::error::AppError;
use crate::models::{
    unix_now, ChallengeRequest, ChallengeResponse, Network, SessionResponse, StoredChallenge,
    StoredSession, VerifyRequest, VerifyResponse,
};
use crate::storage;
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;

/// POST /api/auth/request-message — issue a challenge for an account claim
pub async fn request_message(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Rate limit by IP
    let mut con = state
        .redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| AppError::Internal(format!("Redis connection error: {}", e)))?;

    let rate_limit_key = format!("ratelimit:auth:{}", addr.ip());
    let allowed = check_rate_limit(
        &mut con,
        &rate_limit_key,
        state.config.rate_limit_auth_per_min,
        60,
    )
    .await
    .map_err(|e| AppError::Internal(format!("Rate limit check failed: {}", e)))?;

    validate_evm_address(&req.address)?;
    if req.chain_id == 0 {
        return Err(AppError::BadRequest("Invalid chain id".to_string()));
    }
    // Network is an enum with a single variant today; the match is where
    // the next chain family plugs in.
    match req.network {
        Network::Evm => {}
    }

    if !allowed {
        let mut hasher = std::hash::DefaultHasher::new();
        addr.ip().hash(&mut hasher);
        let ip_hash = format!("{:x}", hasher.finish());
        tracing::warn!(action = "rate_limited", endpoint = "auth/request-message", ip_hash = %ip_hash, "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    // Each call issues a fresh nonce; earlier unconsumed challenges for the
    // same address stay valid until their own expiry.
    let nonce = generate_challenge_nonce();
    let now = unix_now();
    let challenge = StoredChallenge {
        nonce,
        address: req.address,
        chain_id: req.chain_id,
        issued_at: now,
        expires_at: now + state.config.challenge_ttl_secs,
    };

    storage::challenge::store_challenge(&mut con, &challenge, state.config.challenge_ttl_secs)
        .await?;

    let message = render_message(&challenge, &state.config);

    tracing::info!(action = "challenge_issued", address = %challenge.address, chain_id = challenge.chain_id, "Challenge issued");

    Ok(Json(ChallengeResponse { message }))
}

/// POST /api/auth/verify — verify a signed message and create a session
pub async fn verify_message(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut con = state
        .redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| AppError::Internal(format!("Redis connection error: {}", e)))?;

    // The nonce is the only field read from the client's copy of the
    // message; it keys the challenge lookup and nothing more.
    let nonce = extract_nonce(&req.message)
        .ok_or_else(|| AppError::BadRequest("Message has no nonce field".to_string()))?;
    if nonce.len() != NONCE_LEN || !nonce.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::BadRequest("Invalid nonce format".to_string()));
    }

    // Atomic get-and-delete: one verify pass per nonce, success or not.
    // "Not found", "already consumed" and "expired" are deliberately the
    // same answer.
    let challenge = storage::challenge::consume_challenge(&mut con, nonce)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Challenge not found or expired".to_string()))?;

    // Redis TTL already bounds the challenge lifetime; this guards the
    // window where the key outlives its recorded expiry by a second.
    if unix_now() >= challenge.expires_at {
        tracing::warn!(action = "auth_failed", address = %challenge.address, reason = "expired", "Expired challenge");
        return Err(AppError::Unauthorized(
            "Challenge not found or expired".to_string(),
        ));
    }

    // Re-render the canonical message from storage and require byte
    // equality: any edit to address, chain id, timestamps or preamble in
    // the client's copy fails here, before any signature work.
    let canonical = render_message(&challenge, &state.config);
    if canonical != req.message {
        tracing::warn!(action = "auth_failed", address = %challenge.address, reason = "message_tampered", "Submitted message does not match issued challenge");
        return Err(AppError::Unauthorized(
            "Message does not match issued challenge".to_string(),
        ));
    }

    if let Err(err) = verify_signature(&req.message, &req.signature, &challenge.address) {
        tracing::warn!(action = "auth_failed", address = %challenge.address, reason = %err, "Signature verification failed");
        return Err(match err {
            VerifyError::MalformedSignature(_) => AppError::BadRequest(err.to_string()),
            VerifyError::InvalidSignature | VerifyError::AddressMismatch => {
                AppError::Unauthorized(err.to_string())
            }
        });
    }

    // Signature proves control of the claimed address; bind the session to
    // the (address, chain) pair the challenge was issued for.
    let token = generate_session_token();
    let now = unix_now();
    let session = StoredSession {
        token: token.clone(),
        address: challenge.address.clone(),
        chain_id: challenge.chain_id,
        created_at: now,
        expires_at: now + state.config.session_ttl_secs,
    };

    storage::session::store_session(&mut con, &session, state.config.session_ttl_secs).await?;

    tracing::info!(action = "auth_success", address = %session.address, chain_id = session.chain_id, "Wallet authenticated");

    Ok(Json(VerifyResponse {
        token,
        address: session.address,
        chain_id: session.chain_id,
        redirect: state.config.post_login_redirect.clone(),
    }))
}

/// GET /api/auth/session — resolve the caller's current session
pub async fn current_session(
    session: Option<AuthSession>,
) -> Result<impl IntoResponse, AppError> {
    let response = match session {
        Some(s) => SessionResponse {
            authenticated: true,
            address: Some(s.address),
            chain_id: Some(s.chain_id),
            expires_at: Some(s.expires_at),
        },
        None => SessionResponse {
            authenticated: false,
            address: None,
            chain_id: None,
            expires_at: None,
        },
    };

    Ok(Json(response))
}

/// POST /api/auth/logout — revoke the caller's session
///
/// Deletes by bearer token without requiring the session to still
/// resolve, so revoking an already-expired or already-revoked token is a
/// 204 too.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = bearer_token(&headers) {
        let mut con = state
            .redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection error: {}", e)))?;

        let existed = storage::session::delete_session(&mut con, &token).await?;
        if existed {
            tracing::info!(action = "logout", "Session revoked");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Validate an EVM address: 0x followed by 40 hex characters.
fn validate_evm_address(address: &str) -> Result<(), AppError> {
    let hex_part = address
        .strip_prefix("0x")
        .ok_or_else(|| AppError::BadRequest("Invalid address format".to_string()))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::BadRequest("Invalid address format".to_string()));
    }
    Ok(())
}
