use anyhow::Result;
use redis::{AsyncCommands, Client};
use serde::Serialize;

/// Channel carrying one audit event per committed movement.
pub const MOVEMENTS_CHANNEL: &str = "audit.movements";

/// Append-only audit publisher. Fire-and-forget: callers log a publish
/// failure and move on, the committed movement stands either way.
#[derive(Clone)]
pub struct AuditBus {
    client: Client,
}

impl AuditBus {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub async fn publish_json<T: Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(payload)?;
        let _: i64 = connection.publish(channel, serialized).await?;
        Ok(())
    }
}
