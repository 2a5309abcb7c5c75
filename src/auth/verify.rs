//! EVM signature verification by public-key recovery.
//!
//! Wallets sign challenge messages with `personal_sign` (EIP-191): the
//! signed digest is keccak256 of `"\x19Ethereum Signed Message:\n" ++
//! len(message) ++ message`. Verification recovers the secp256k1 public
//! key from the 65-byte r||s||v signature, derives the Ethereum address,
//! and compares it to the claimed address. No mutable state; safe to call
//! from any number of concurrent attempts.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

/// Why a (message, signature, address) triple failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Signature bytes could not be decoded or have the wrong shape.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Well-formed signature from which no public key can be recovered.
    #[error("invalid signature")]
    InvalidSignature,

    /// Recovery succeeded but the signer is not the claimed address.
    #[error("address mismatch")]
    AddressMismatch,
}

/// Keccak256 digest of an EIP-191 personal message.
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n");
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Lowercase 0x-prefixed Ethereum address for a secp256k1 public key.
pub fn ethereum_address(key: &VerifyingKey) -> String {
    // Uncompressed SEC1 encoding is 65 bytes; drop the 0x04 tag byte and
    // keep the last 20 bytes of the keccak digest of the rest.
    let point = key.to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Recover the address that produced `signature_hex` over `message`.
///
/// Accepts the usual wallet encodings: optional `0x` prefix, 65 bytes of
/// r||s||v, with `v` in {0, 1, 27, 28}.
pub fn recover_address(message: &str, signature_hex: &str) -> Result<String, VerifyError> {
    let hex_str = signature_hex
        .strip_prefix("0x")
        .unwrap_or(signature_hex);

    let bytes = hex::decode(hex_str)
        .map_err(|e| VerifyError::MalformedSignature(format!("invalid hex: {}", e)))?;

    if bytes.len() != 65 {
        return Err(VerifyError::MalformedSignature(format!(
            "expected 65 bytes, got {}",
            bytes.len()
        )));
    }

    let v = bytes[64];
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(recovery_byte).ok_or_else(|| {
        VerifyError::MalformedSignature(format!("invalid recovery id: {}", v))
    })?;

    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| VerifyError::MalformedSignature(format!("invalid r/s values: {}", e)))?;

    let digest = eip191_hash(message.as_bytes());
    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|_| VerifyError::InvalidSignature)?;

    Ok(ethereum_address(&key))
}

/// Verify that `signature_hex` over `message` was produced by the key
/// behind `claimed_address`.
///
/// Address comparison is case-insensitive (EIP-55 checksum casing is a
/// display convention, not a distinct identity).
pub fn verify_signature(
    message: &str,
    signature_hex: &str,
    claimed_address: &str,
) -> Result<(), VerifyError> {
    let recovered = recover_address(message, signature_hex)?;

    if !recovered.eq_ignore_ascii_case(claimed_address) {
        return Err(VerifyError::AddressMismatch);
    }

    Ok(())
}
