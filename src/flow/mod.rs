//! Client-side sign-in flow.
//!
//! One authentication attempt is a linear sequence of suspending steps:
//! connect the wallet, fetch a challenge, sign it, submit for
//! verification. [`AuthFlow`] drives that sequence as an explicit state
//! machine so callers can observe where an attempt is and why it
//! stopped. Nothing here retries: a failed attempt stays `Failed` until
//! `reset()`, and the next attempt gets a freshly issued challenge.

pub mod gateway;
pub mod transport;

pub use gateway::{AuthGateway, GatewayError, HttpAuthGateway, SessionGrant};
pub use transport::{AccountClaim, TransportError, WalletTransport};

/// Where an authentication attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Connecting,
    ChallengeRequested,
    AwaitingSignature,
    Verifying,
    Authenticated,
    Failed(FlowError),
}

/// Why an attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// `authenticate` was called while a previous attempt's outcome was
    /// still standing; call `reset()` first.
    #[error("a new attempt must start from the idle state")]
    NotIdle,
}

/// State machine driving one sign-in attempt end to end.
///
/// Generic over the wallet transport (extension, relay, hosted popup all
/// share the capability surface) and the server gateway.
pub struct AuthFlow<T, G> {
    transport: T,
    gateway: G,
    state: AttemptState,
}

impl<T: WalletTransport, G: AuthGateway> AuthFlow<T, G> {
    pub fn new(transport: T, gateway: G) -> Self {
        Self {
            transport,
            gateway,
            state: AttemptState::Idle,
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    /// Return to `Idle` so a fresh attempt can start.
    pub fn reset(&mut self) {
        self.state = AttemptState::Idle;
    }

    /// Run one attempt to completion.
    ///
    /// On any failure the state lands in `Failed(reason)` and the error is
    /// returned; the consumed challenge (if one was issued) is already
    /// burnt server-side and a new attempt will get a new one.
    pub async fn authenticate(&mut self) -> Result<SessionGrant, FlowError> {
        if self.state != AttemptState::Idle {
            return Err(FlowError::NotIdle);
        }

        match self.drive().await {
            Ok(grant) => {
                self.state = AttemptState::Authenticated;
                Ok(grant)
            }
            Err(err) => {
                self.state = AttemptState::Failed(err.clone());
                Err(err)
            }
        }
    }

    async fn drive(&mut self) -> Result<SessionGrant, FlowError> {
        self.state = AttemptState::Connecting;

        // Disconnect-before-connect: a lingering connection could belong
        // to a different account than the one about to authenticate, and
        // the challenge must be issued for the account that signs it.
        if self.transport.current_account().is_some() {
            self.transport.disconnect().await?;
        }

        let claim = self.transport.connect().await?;

        self.state = AttemptState::ChallengeRequested;
        let message = self.gateway.request_message(&claim).await?;

        self.state = AttemptState::AwaitingSignature;
        let signature = self.transport.sign(&message).await?;

        self.state = AttemptState::Verifying;
        let grant = self.gateway.verify(&message, &signature).await?;

        Ok(grant)
    }
}
