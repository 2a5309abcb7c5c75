//! Session Redis operations.
//!
//! Redis key pattern: `session:{token}` — session record (JSON).
//!
//! Sessions are independent per sign-in: a new token per verified attempt,
//! any number of concurrent sessions per address. Retrieved JSON is
//! zeroized after deserialization (defense for the application's own
//! memory; Redis keeps its own copy).

use crate::models::StoredSession;
use redis::AsyncCommands;
use zeroize::Zeroizing;

/// Store a session with its TTL.
pub async fn store_session<C>(
    con: &mut C,
    session: &StoredSession,
    ttl_secs: u64,
) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("session:{}", session.token);
    let json = serde_json::to_string(session).map_err(|e| {
        redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "JSON serialize",
            e.to_string(),
        ))
    })?;

    con.set_ex::<_, _, ()>(&key, json, ttl_secs).await?;
    Ok(())
}

/// Get a session by token. Side-effect free.
pub async fn get_session<C>(
    con: &mut C,
    token: &str,
) -> Result<Option<StoredSession>, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("session:{}", token);
    let json: Option<String> = con.get(&key).await?;

    match json {
        Some(data) => {
            let zeroizing_data = Zeroizing::new(data);
            let session = serde_json::from_str(&zeroizing_data).map_err(|e| {
                redis::RedisError::from((
                    redis::ErrorKind::TypeError,
                    "JSON deserialize",
                    e.to_string(),
                ))
            })?;
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

/// Delete a session. Idempotent: deleting an absent or expired token is
/// a no-op.
///
/// Returns true if the session existed.
pub async fn delete_session<C>(con: &mut C, token: &str) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("session:{}", token);
    let deleted: i32 = con.del(&key).await?;
    Ok(deleted > 0)
}
