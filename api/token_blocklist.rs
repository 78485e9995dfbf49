use std::time::{Duration, Instant};

use chrono::Utc;
use moka::future::Cache;
use moka::Expiry;

/// Revoked tokens, each kept until it would have stopped verifying anyway.
/// The value is the unix time (seconds) after which the token is dead.
pub struct TokenBlocklist {
    cache: Cache<String, i64>,
}

impl TokenBlocklist {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().expire_after(UntilTokenDies).build(),
        }
    }

    pub async fn block(&self, token: &str, dies_at: i64) {
        self.cache.insert(token.to_owned(), dies_at).await;
    }

    pub fn is_blocked(&self, token: &str) -> bool {
        self.cache.contains_key(&token.to_owned())
    }
}

impl Default for TokenBlocklist {
    fn default() -> Self {
        Self::new()
    }
}

struct UntilTokenDies;

impl Expiry<String, i64> for UntilTokenDies {
    fn expire_after_create(
        &self,
        _key: &String,
        dies_at: &i64,
        _current_time: Instant,
    ) -> Option<Duration> {
        let left = dies_at.saturating_sub(Utc::now().timestamp()).max(0);
        Some(Duration::from_secs(left as u64))
    }
}
