use std::env;
use std::net::SocketAddr;

#[derive(Clone)]
pub struct Config {
    // Relying party identity embedded in every challenge message
    pub domain: String,
    pub statement: String,
    pub uri: String,

    // Redis
    pub redis_url: String,

    // Server
    pub bind_addr: SocketAddr,

    // TTLs (in seconds)
    pub challenge_ttl_secs: u64,
    pub session_ttl_secs: u64,

    // Rate limiting
    pub rate_limit_auth_per_min: u32,

    // Where the caller should navigate after a successful sign-in
    pub post_login_redirect: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("domain", &self.domain)
            .field("statement", &self.statement)
            .field("uri", &self.uri)
            .field("redis_url", &"[REDACTED]")
            .field("bind_addr", &self.bind_addr)
            .field("challenge_ttl_secs", &self.challenge_ttl_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("rate_limit_auth_per_min", &self.rate_limit_auth_per_min)
            .field("post_login_redirect", &self.post_login_redirect)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // Relying party domain - required, ends up verbatim in signed messages
        let domain = env::var("APP_DOMAIN")
            .map_err(|_| ConfigError::MissingVar("APP_DOMAIN".to_string()))?;

        if domain.is_empty() {
            return Err(ConfigError::InvalidValue(
                "APP_DOMAIN".to_string(),
                "cannot be empty".to_string(),
            ));
        }
        // The message format is line-oriented and the domain leads the
        // preamble line; whitespace would let it masquerade as more text.
        if domain.chars().any(|c| c.is_whitespace()) {
            return Err(ConfigError::InvalidValue(
                "APP_DOMAIN".to_string(),
                "may not contain whitespace".to_string(),
            ));
        }

        let statement = env::var("APP_STATEMENT")
            .unwrap_or_else(|_| format!("Sign in to {} with your wallet.", domain));
        validate_message_field("APP_STATEMENT", &statement)?;

        let uri = env::var("APP_URI").unwrap_or_else(|_| format!("https://{}", domain));
        validate_message_field("APP_URI", &uri)?;

        // Redis — required to prevent silently running without a nonce store
        let redis_url =
            env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL".to_string()))?;

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        // TTLs
        let challenge_ttl_secs = parse_env_or_default("CHALLENGE_TTL_SECS", 300)?;
        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", 86_400)?;

        if challenge_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "CHALLENGE_TTL_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        // Rate limiting
        let rate_limit_auth_per_min = parse_env_or_default("RATE_LIMIT_AUTH_PER_MIN", 10)?;

        let post_login_redirect =
            env::var("POST_LOGIN_REDIRECT").unwrap_or_else(|_| "/user".to_string());
        validate_message_field("POST_LOGIN_REDIRECT", &post_login_redirect)?;

        Ok(Config {
            domain,
            statement,
            uri,
            redis_url,
            bind_addr,
            challenge_ttl_secs,
            session_ttl_secs,
            rate_limit_auth_per_min,
            post_login_redirect,
        })
    }
}

/// Reject values that would break the line-oriented challenge message format.
fn validate_message_field(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.contains('\n') || value.contains('\r') {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "may not contain line breaks".to_string(),
        ));
    }
    Ok(())
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
