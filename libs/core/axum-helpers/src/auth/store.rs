use redis::{AsyncCommands, RedisResult, aio::ConnectionManager};

/// Redis keys for issued (`jwt:whitelist:{jti}`) and revoked
/// (`jwt:blacklist:{jti}`) tokens.
#[derive(Clone)]
pub struct RedisAuthStore {
    client: ConnectionManager,
}

fn whitelist_key(jti: &str) -> String {
    format!("jwt:whitelist:{jti}")
}

fn blacklist_key(jti: &str) -> String {
    format!("jwt:blacklist:{jti}")
}

impl RedisAuthStore {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { client: manager }
    }

    pub async fn whitelist(&self, jti: &str, user_id: &str, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.client.clone();
        conn.set_ex::<_, _, ()>(whitelist_key(jti), user_id, ttl_seconds)
            .await
    }

    pub async fn is_whitelisted(&self, jti: &str) -> RedisResult<bool> {
        let mut conn = self.client.clone();
        conn.exists(whitelist_key(jti)).await
    }

    pub async fn blacklist(&self, jti: &str, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.client.clone();
        conn.set_ex::<_, _, ()>(blacklist_key(jti), "1", ttl_seconds)
            .await
    }

    pub async fn is_blacklisted(&self, jti: &str) -> RedisResult<bool> {
        let mut conn = self.client.clone();
        conn.exists(blacklist_key(jti)).await
    }

    pub async fn revoke(&self, jti: &str) -> RedisResult<()> {
        let mut conn = self.client.clone();
        conn.del::<_, ()>(whitelist_key(jti)).await
    }

    /// Removes the whitelist entry and reports whether it was present.
    /// Two concurrent refreshes with one token cannot both succeed.
    pub async fn consume(&self, jti: &str) -> RedisResult<bool> {
        let script = redis::Script::new(
            r"
            if redis.call('exists', KEYS[1]) == 1 then
                redis.call('del', KEYS[1])
                return 1
            else
                return 0
            end
            ",
        );

        let mut conn = self.client.clone();
        let removed: i32 = script
            .key(whitelist_key(jti))
            .invoke_async(&mut conn)
            .await?;
        Ok(removed == 1)
    }
}
