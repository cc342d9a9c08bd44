pub const TOPIC_SENSOR_BASE: &str = "homeassistant/sensor/m5stick";
pub const STATE_KEY: &str = "state";
pub const CONFIG_KEY: &str = "config";

pub const TOPIC_SENSOR_STATE: &str = "homeassistant/sensor/m5stick/state";

pub const STATUS_SUFFIX: &str = "getStatus";
pub const VERBOSE_MARKER: &str = "verbose";

pub fn join_topic(prefix: &str, key: &str) -> String {
    format!("{prefix}/{key}")
}

/// Wildcard covering every control topic addressed to `device`.
pub fn control_filter(device: &str) -> String {
    join_topic(device, "#")
}
