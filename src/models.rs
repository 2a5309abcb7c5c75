//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.
//! Storage models represent Redis data structures.

use serde::{Deserialize, Serialize};

/// Chain family a wallet account belongs to.
///
/// Only signature-recovery chains are supported; today that means EVM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Evm,
}

// ============================================================================
// Auth Models
// ============================================================================

/// Request for a challenge message, carrying the connect-time account claim.
///
/// Nothing in this request is trusted until a signature over the issued
/// message verifies against the same address.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeRequest {
    pub address: String,
    pub chain_id: u64,
    pub network: Network,
}

/// Response containing the rendered message to sign.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub message: String,
}

/// Request to verify a signed challenge message.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub message: String,
    pub signature: String, // 0x-prefixed hex, 65 bytes
}

/// Response after successful verification.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub token: String,
    pub address: String,
    pub chain_id: u64,
    /// Where the caller should navigate next; navigation itself is the
    /// caller's decision.
    pub redirect: String,
}

/// Current session lookup result. Anonymous is a 200, not an error.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

// ============================================================================
// Storage Models
// ============================================================================

/// Challenge data as stored in Redis, keyed by nonce.
///
/// Consumed exactly once; the canonical message is re-rendered from these
/// fields at verification time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChallenge {
    pub nonce: String,
    pub address: String,
    pub chain_id: u64,
    pub issued_at: u64,
    pub expires_at: u64,
}

/// Session data as stored in Redis, keyed by token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub address: String,
    pub chain_id: u64,
    pub created_at: u64,
    pub expires_at: u64,
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
