pub mod config;
pub mod discovery;
pub mod router;
pub mod topics;
pub mod types;

pub use config::{config_file_name, BridgeConfig, ConfigError, MqttSection, RedisSection, PROJECT};
pub use discovery::{discovery_set, DiscoveryEntry, HaDevice, HaSensorConfig};
pub use router::{classify, DispatchGuard, DispatchPermit, InboundCommand};
pub use topics::*;
pub use types::{Credentials, Payload, TelemetryState};
