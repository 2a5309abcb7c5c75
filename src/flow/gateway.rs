//! Server-side protocol endpoints as seen by the client flow.

use crate::models::{ChallengeRequest, ChallengeResponse, VerifyRequest, VerifyResponse};
use async_trait::async_trait;

use super::transport::AccountClaim;

/// Ways a server round-trip can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The server answered with an error status.
    #[error("server rejected the request ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// The server could not be reached or answered garbage.
    #[error("network error: {0}")]
    Network(String),
}

/// What a successful verification hands back to the caller.
///
/// `redirect` is a suggestion for where to navigate next; acting on it is
/// the boundary layer's decision, not the protocol's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub token: String,
    pub address: String,
    pub chain_id: u64,
    pub redirect: String,
}

/// The two server calls the sign-in flow makes.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Request a fresh challenge message for a claimed account.
    async fn request_message(&self, claim: &AccountClaim) -> Result<String, GatewayError>;

    /// Submit a signed message; on success the session is created
    /// server-side and its grant returned.
    async fn verify(&self, message: &str, signature: &str) -> Result<SessionGrant, GatewayError>;
}

/// HTTP implementation of [`AuthGateway`] against the walletgate API.
pub struct HttpAuthGateway {
    base_url: String,
    http: reqwest::Client,
}

impl HttpAuthGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Read the `{"error": "..."}` body the server attaches to failures.
    async fn rejection(response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let reason = match response.json::<serde_json::Value>().await {
            Ok(body) => body["error"].as_str().unwrap_or("unknown error").to_string(),
            Err(_) => "unknown error".to_string(),
        };
        GatewayError::Rejected { status, reason }
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn request_message(&self, claim: &AccountClaim) -> Result<String, GatewayError> {
        let request = ChallengeRequest {
            address: claim.address.clone(),
            chain_id: claim.chain_id,
            network: claim.network,
        };

        let response = self
            .http
            .post(format!("{}/api/auth/request-message", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: ChallengeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(body.message)
    }

    async fn verify(&self, message: &str, signature: &str) -> Result<SessionGrant, GatewayError> {
        let request = VerifyRequest {
            message: message.to_string(),
            signature: signature.to_string(),
        };

        let response = self
            .http
            .post(format!("{}/api/auth/verify", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(SessionGrant {
            token: body.token,
            address: body.address,
            chain_id: body.chain_id,
            redirect: body.redirect,
        })
    }
}
