//! Nonce store: single-use challenge Redis operations.
//!
//! Redis key pattern: `challenge:{nonce}` — challenge record (JSON).
//!
//! Keying by nonce rather than address means any number of unconsumed
//! challenges may coexist for the same address; each one is independently
//! consumable exactly once. Expiry is handled by the key TTL, so a
//! challenge that was never consumed simply stops existing — the consume
//! path cannot tell "expired" from "never issued" from "already used",
//! and callers are not supposed to either.

use crate::models::StoredChallenge;
use redis::AsyncCommands;
use zeroize::Zeroizing;

/// Store a freshly issued challenge with its TTL.
pub async fn store_challenge<C>(
    con: &mut C,
    challenge: &StoredChallenge,
    ttl_secs: u64,
) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("challenge:{}", challenge.nonce);
    let json = serde_json::to_string(challenge).map_err(|e| {
        redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "JSON serialize",
            e.to_string(),
        ))
    })?;

    con.set_ex::<_, _, ()>(&key, json, ttl_secs).await?;
    Ok(())
}

/// Get and delete a challenge atomically (single-use nonce).
///
/// Uses a Lua script so two concurrent verify attempts can never both
/// observe the same nonce. The retrieved JSON is zeroized after
/// deserialization.
pub async fn consume_challenge<C>(
    con: &mut C,
    nonce: &str,
) -> Result<Option<StoredChallenge>, redis::RedisError>
where
    C: AsyncCommands,
{
    let key = format!("challenge:{}", nonce);

    // Lua script for atomic GET + DEL
    let script = redis::Script::new(
        r"
        local val = redis.call('GET', KEYS[1])
        if val then
            redis.call('DEL', KEYS[1])
        end
        return val
        ",
    );

    let json: Option<String> = script.key(&key).invoke_async(con).await?;

    match json {
        Some(data) => {
            // Wrap the JSON string in Zeroizing to clear it after use
            let zeroizing_data = Zeroizing::new(data);
            let challenge = serde_json::from_str(&zeroizing_data).map_err(|e| {
                redis::RedisError::from((
                    redis::ErrorKind::TypeError,
                    "JSON deserialize",
                    e.to_string(),
                ))
            })?;
            // zeroizing_data is automatically zeroized when dropped here
            Ok(Some(challenge))
        }
        None => Ok(None),
    }
}
