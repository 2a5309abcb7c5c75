//! Wallet transport capability.
//!
//! A transport is whatever gets the user's wallet to connect and sign:
//! a browser extension speaking provider RPC, a relay-paired mobile
//! wallet, a hosted wallet popup. The sign-in flow never cares which;
//! every connector satisfies the same three-method surface and the
//! protocol on top is identical.

use crate::models::Network;
use async_trait::async_trait;

/// Account identity reported by a wallet at connect time.
///
/// A claim, not a fact: nothing here is trusted until a signature over an
/// issued challenge verifies against the same address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountClaim {
    pub address: String,
    pub chain_id: u64,
    pub network: Network,
}

/// Ways a wallet interaction can fail.
///
/// All of these are recoverable by starting a fresh attempt; none are
/// retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("user rejected the wallet request")]
    UserRejected,

    #[error("no wallet provider available")]
    NoProvider,

    #[error("wallet request timed out")]
    Timeout,
}

/// Capability surface every wallet connector implements.
#[async_trait]
pub trait WalletTransport: Send + Sync {
    /// Prompt the wallet to connect, yielding the claimed account.
    async fn connect(&self) -> Result<AccountClaim, TransportError>;

    /// Present `message` to the wallet for signing; returns the
    /// 0x-prefixed hex signature.
    async fn sign(&self, message: &str) -> Result<String, TransportError>;

    /// Tear down the current connection.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// The account currently connected through this transport, if any.
    fn current_account(&self) -> Option<AccountClaim>;
}
