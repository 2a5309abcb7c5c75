//! Integration tests for the walletgate API.
//!
//! These tests require a running Redis instance (default: redis://127.0.0.1:6379).
//! Set REDIS_URL env var to override.

use k256::ecdsa::SigningKey;
use std::sync::Arc;
use walletgate::auth::middleware::AppState;
use walletgate::auth::verify::{eip191_hash, ethereum_address};
use walletgate::config::Config;
use walletgate::flow::{
    AccountClaim, AttemptState, AuthFlow, HttpAuthGateway, TransportError, WalletTransport,
};
use walletgate::middleware::security_headers;
use walletgate::models::Network;
use walletgate::routes;

/// Helper to get Redis URL from environment or use default.
fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// Generate a secp256k1 keypair plus its Ethereum address for testing.
fn test_wallet() -> (SigningKey, String) {
    let mut seed = [0u8; 32];
    rand::fill(&mut seed);
    let signing_key = SigningKey::from_bytes(&seed.into()).expect("valid random key");
    let address = ethereum_address(signing_key.verifying_key());
    (signing_key, address)
}

/// Sign a message the way a wallet does: EIP-191 digest, r||s||v hex.
fn sign_message(key: &SigningKey, message: &str) -> String {
    let digest = eip191_hash(message.as_bytes());
    let (signature, recovery_id) = key.sign_prehash_recoverable(&digest).unwrap();
    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    format!("0x{}", hex::encode(bytes))
}

fn test_config() -> Config {
    Config {
        domain: "instapay.test".to_string(),
        statement: "Sign in to instapay.test with your wallet.".to_string(),
        uri: "https://instapay.test".to_string(),
        redis_url: redis_url(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        challenge_ttl_secs: 300,
        session_ttl_secs: 900,
        rate_limit_auth_per_min: 1000,
        post_login_redirect: "/user".to_string(),
    }
}

/// Spin up a test server and return its base URL.
async fn spawn_test_server() -> String {
    let config = test_config();

    let redis_client = redis::Client::open(redis_url()).expect("Failed to open Redis");
    redis_client
        .get_multiplexed_async_connection()
        .await
        .expect("Failed to connect to Redis");

    let state = AppState {
        redis: redis_client,
        config: Arc::new(config),
    };

    let app = routes::api_router()
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{}", addr)
}

/// Helper: request a challenge message for an address.
async fn request_message(
    client: &reqwest::Client,
    base_url: &str,
    address: &str,
    chain_id: u64,
) -> reqwest::Response {
    client
        .post(format!("{}/api/auth/request-message", base_url))
        .json(&serde_json::json!({
            "address": address,
            "chain_id": chain_id,
            "network": "evm"
        }))
        .send()
        .await
        .expect("request-message failed")
}

/// Helper: submit a (message, signature) pair for verification.
async fn verify(
    client: &reqwest::Client,
    base_url: &str,
    message: &str,
    signature: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/api/auth/verify", base_url))
        .json(&serde_json::json!({
            "message": message,
            "signature": signature
        }))
        .send()
        .await
        .expect("verify failed")
}

#[tokio::test]
async fn test_full_sign_in_flow() {
    let base_url = spawn_test_server().await;
    let client = reqwest::Client::new();
    let (key, address) = test_wallet();

    // Request a challenge
    let response = request_message(&client, &base_url, &address, 1).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["message"].as_str().unwrap().to_string();

    // The message embeds the claim
    assert!(message.contains(&address));
    assert!(message.contains("\nChain ID: 1\n"));
    assert!(message.starts_with("instapay.test wants you to sign in"));

    // Sign and verify
    let signature = sign_message(&key, &message);
    let response = verify(&client, &base_url, &message, &signature).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["address"], serde_json::json!(address));
    assert_eq!(body["chain_id"], serde_json::json!(1));
    assert_eq!(body["redirect"], serde_json::json!("/user"));

    // The session resolves and is bound to the signing address
    let response = client
        .get(format!("{}/api/auth/session", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["authenticated"], serde_json::json!(true));
    assert_eq!(body["address"], serde_json::json!(address));
    assert_eq!(body["chain_id"], serde_json::json!(1));

    // Replaying the same (message, signature) pair fails: the nonce was
    // consumed by the first verify pass
    let response = verify(&client, &base_url, &message, &signature).await;
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Challenge not found or expired");

    // Logout revokes the session, idempotently
    let response = client
        .post(format!("{}/api/auth/logout", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = client
        .post(format!("{}/api/auth/logout", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    // The session is gone; the lookup is anonymous, not an error
    let response = client
        .get(format!("{}/api/auth/session", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["authenticated"], serde_json::json!(false));
}

#[tokio::test]
async fn test_wrong_key_is_rejected() {
    let base_url = spawn_test_server().await;
    let client = reqwest::Client::new();
    let (_, address) = test_wallet();
    let (other_key, _) = test_wallet();

    let response = request_message(&client, &base_url, &address, 1).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["message"].as_str().unwrap().to_string();

    // Correct message, wrong signer
    let signature = sign_message(&other_key, &message);
    let response = verify(&client, &base_url, &message, &signature).await;
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "address mismatch");

    // The failed pass burnt the nonce: retrying now fails as not-found
    let response = verify(&client, &base_url, &message, &signature).await;
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Challenge not found or expired");
}

#[tokio::test]
async fn test_tampered_message_is_rejected() {
    let base_url = spawn_test_server().await;
    let client = reqwest::Client::new();
    let (key, address) = test_wallet();

    let response = request_message(&client, &base_url, &address, 1).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["message"].as_str().unwrap().to_string();

    // Claim a different chain in the signed text; the nonce still parses
    // but the canonical re-render no longer matches
    let tampered = message.replace("Chain ID: 1", "Chain ID: 137");
    assert_ne!(tampered, message);
    let signature = sign_message(&key, &tampered);

    let response = verify(&client, &base_url, &tampered, &signature).await;
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Message does not match issued challenge");
}

#[tokio::test]
async fn test_unknown_nonce_is_rejected() {
    let base_url = spawn_test_server().await;
    let client = reqwest::Client::new();
    let (key, _) = test_wallet();

    // A well-formed message the server never issued
    let message = "instapay.test wants you to sign in with your Ethereum account:\n\
                   0x0000000000000000000000000000000000000001\n\n\
                   Sign in to instapay.test with your wallet.\n\n\
                   URI: https://instapay.test\n\
                   Version: 1\n\
                   Chain ID: 1\n\
                   Nonce: 00112233445566778899aabbccddeeff\n\
                   Issued At: 2023-11-14T22:13:20Z\n\
                   Expiration Time: 2023-11-14T22:18:20Z";
    let signature = sign_message(&key, message);

    let response = verify(&client, &base_url, message, &signature).await;
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Challenge not found or expired");
}

#[tokio::test]
async fn test_malformed_inputs_are_bad_requests() {
    let base_url = spawn_test_server().await;
    let client = reqwest::Client::new();
    let (_, address) = test_wallet();

    // Bad address format
    let response = request_message(&client, &base_url, "not-an-address", 1).await;
    assert_eq!(response.status(), 400);

    // Chain id zero
    let response = request_message(&client, &base_url, &address, 0).await;
    assert_eq!(response.status(), 400);

    // Message without a nonce field
    let response = verify(&client, &base_url, "no nonce here", "0xabcdef").await;
    assert_eq!(response.status(), 400);

    // Malformed signature over a real challenge
    let response = request_message(&client, &base_url, &address, 1).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["message"].as_str().unwrap().to_string();

    let response = verify(&client, &base_url, &message, "0xdeadbeef").await;
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("malformed signature"));
}

#[tokio::test]
async fn test_concurrent_challenges_are_independent() {
    let base_url = spawn_test_server().await;
    let client = reqwest::Client::new();
    let (key, address) = test_wallet();

    // Two challenges for the same address coexist
    let response = request_message(&client, &base_url, &address, 1).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let first = body["message"].as_str().unwrap().to_string();

    let response = request_message(&client, &base_url, &address, 1).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let second = body["message"].as_str().unwrap().to_string();

    assert_ne!(first, second);

    // Each is independently consumable, in either order
    let response = verify(&client, &base_url, &second, &sign_message(&key, &second)).await;
    assert_eq!(response.status(), 200);

    let response = verify(&client, &base_url, &first, &sign_message(&key, &first)).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_expired_challenge_never_authenticates() {
    let base_url = spawn_test_server().await;
    let client = reqwest::Client::new();
    let (key, address) = test_wallet();

    // Plant a challenge whose recorded expiry is already in the past
    // (its Redis key is still alive, as in the moments after expiry
    // before the TTL reaps it)
    let redis_client = redis::Client::open(redis_url()).unwrap();
    let mut con = redis_client.get_multiplexed_async_connection().await.unwrap();

    let now = walletgate::models::unix_now();
    let challenge = walletgate::models::StoredChallenge {
        nonce: walletgate::auth::nonce::generate_challenge_nonce(),
        address: address.clone(),
        chain_id: 1,
        issued_at: now - 600,
        expires_at: now - 300,
    };
    walletgate::storage::challenge::store_challenge(&mut con, &challenge, 300)
        .await
        .unwrap();

    let message = walletgate::auth::message::render_message(&challenge, &test_config());
    let signature = sign_message(&key, &message);

    // Even a valid signature over the rendered message is rejected
    let response = verify(&client, &base_url, &message, &signature).await;
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Challenge not found or expired");
}

#[tokio::test]
async fn test_session_binds_checksummed_claim_to_signer() {
    let base_url = spawn_test_server().await;
    let client = reqwest::Client::new();
    let (key, address) = test_wallet();

    // Wallets usually report EIP-55 checksummed addresses; the signature
    // still verifies and the session carries the claimed form
    let checksummed = format!("0x{}", address[2..].to_ascii_uppercase());
    let response = request_message(&client, &base_url, &checksummed, 137).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["message"].as_str().unwrap().to_string();

    let response = verify(&client, &base_url, &message, &sign_message(&key, &message)).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["address"], serde_json::json!(checksummed));
    assert_eq!(body["chain_id"], serde_json::json!(137));
}

// ============================================================================
// Client flow over the real server
// ============================================================================

/// Transport backed by a local key: connects instantly, signs honestly.
struct LocalKeyTransport {
    key: SigningKey,
    address: String,
}

impl LocalKeyTransport {
    fn new() -> Self {
        let (key, address) = test_wallet();
        Self { key, address }
    }
}

#[async_trait::async_trait]
impl WalletTransport for LocalKeyTransport {
    async fn connect(&self) -> Result<AccountClaim, TransportError> {
        Ok(AccountClaim {
            address: self.address.clone(),
            chain_id: 1,
            network: Network::Evm,
        })
    }

    async fn sign(&self, message: &str) -> Result<String, TransportError> {
        Ok(sign_message(&self.key, message))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn current_account(&self) -> Option<AccountClaim> {
        None
    }
}

#[tokio::test]
async fn test_auth_flow_end_to_end() {
    let base_url = spawn_test_server().await;

    let transport = LocalKeyTransport::new();
    let address = transport.address.clone();
    let gateway = HttpAuthGateway::new(base_url.clone());
    let mut flow = AuthFlow::new(transport, gateway);

    let grant = flow.authenticate().await.expect("flow should authenticate");
    assert_eq!(*flow.state(), AttemptState::Authenticated);
    assert_eq!(grant.address, address);
    assert_eq!(grant.chain_id, 1);
    assert_eq!(grant.redirect, "/user");

    // The granted token resolves against the session endpoint
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/auth/session", base_url))
        .bearer_auth(&grant.token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["authenticated"], serde_json::json!(true));
    assert_eq!(body["address"], serde_json::json!(address));
}
