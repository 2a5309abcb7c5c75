//! Canonical challenge message rendering.
//!
//! The rendered text is what the wallet signs, so it must be a pure
//! function of the challenge fields: verification re-renders the message
//! from the stored challenge and requires byte equality with the text the
//! client submitted. Variable fields are guaranteed newline-free (address
//! and nonce are hex; the relying-party fields are validated at config
//! load), so no field can spill into another line.

use crate::config::Config;
use crate::models::StoredChallenge;
use chrono::{DateTime, SecondsFormat};

/// Render the canonical sign-in message for a challenge.
///
/// Layout follows the EIP-4361 convention: preamble with the relying
/// party and address, a free-text statement, then one `Name: value` line
/// per field.
pub fn render_message(challenge: &StoredChallenge, config: &Config) -> String {
    format!(
        "{domain} wants you to sign in with your Ethereum account:\n\
         {address}\n\
         \n\
         {statement}\n\
         \n\
         URI: {uri}\n\
         Version: 1\n\
         Chain ID: {chain_id}\n\
         Nonce: {nonce}\n\
         Issued At: {issued_at}\n\
         Expiration Time: {expires_at}",
        domain = config.domain,
        address = challenge.address,
        statement = config.statement,
        uri = config.uri,
        chain_id = challenge.chain_id,
        nonce = challenge.nonce,
        issued_at = rfc3339(challenge.issued_at),
        expires_at = rfc3339(challenge.expires_at),
    )
}

/// Pull the nonce field out of a submitted message.
///
/// This is the only field the server reads from the client's copy of the
/// message; everything else is checked by re-rendering from storage.
pub fn extract_nonce(message: &str) -> Option<&str> {
    message.lines().find_map(|line| line.strip_prefix("Nonce: "))
}

fn rfc3339(unix_secs: u64) -> String {
    DateTime::from_timestamp(unix_secs as i64, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}
