//! Redis storage layer for challenges and sessions.
//!
//! All functions are async and use redis::AsyncCommands.
//! Data is serialized to JSON for storage in Redis.

pub mod challenge;
pub mod session;
