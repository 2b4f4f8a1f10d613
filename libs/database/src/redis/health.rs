use redis::aio::ConnectionManager;
use tracing::debug;

use crate::common::DatabaseError;

/// `PING` round trip, used by the readiness probe
pub async fn check_health(conn: &mut ConnectionManager) -> Result<(), DatabaseError> {
    let response: String = redis::cmd("PING")
        .query_async(conn)
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(format!("Redis: {e}")))?;

    if response != "PONG" {
        return Err(DatabaseError::HealthCheckFailed(format!(
            "Redis PING returned {response}"
        )));
    }

    debug!("Redis health check passed");
    Ok(())
}
