use std::time::Duration;

use mqtt_bridge_common::{discovery_set, Payload, CONFIG_KEY};
use tracing::{info, warn};

use crate::connection::{ConnectionManager, MqttSink};

pub const DISCOVERY_SPACING: Duration = Duration::from_secs(2);

/// Publishes the three sensor descriptors, pausing after each one.
/// Returns the result of the last publish; failures are not retried.
pub async fn publish_discovery<S: MqttSink>(mgr: &ConnectionManager<S>) -> bool {
    let mut published = false;

    for entry in discovery_set() {
        published = match Payload::json(&entry.config) {
            Ok(payload) => mgr.publish(&entry.prefix, CONFIG_KEY, &payload).await,
            Err(err) => {
                warn!("discovery serialization failed for {}: {err}", entry.prefix);
                false
            }
        };
        tokio::time::sleep(DISCOVERY_SPACING).await;
    }

    info!("discovery published: {published}");
    published
}
