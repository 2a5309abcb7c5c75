//! Authentication layer: challenge messages, signature recovery, sessions.

pub mod message;
pub mod middleware;
pub mod nonce;
pub mod verify;

pub use message::{extract_nonce, render_message};
pub use middleware::{AppState, AuthSession, check_rate_limit};
pub use nonce::{generate_challenge_nonce, generate_session_token};
pub use verify::{recover_address, verify_signature, VerifyError};
