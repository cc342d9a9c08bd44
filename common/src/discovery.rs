use serde::Serialize;

use crate::topics::{join_topic, CONFIG_KEY, TOPIC_SENSOR_BASE, TOPIC_SENSOR_STATE};

const DEVICE_IDENTIFIER: &str = "m5stick01ae";
const DEVICE_NAME: &str = "m5stick";

/// Home Assistant MQTT discovery config for one sensor entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HaSensorConfig {
    pub device_class: &'static str,
    pub name: &'static str,
    pub state_topic: &'static str,
    pub unit_of_measurement: &'static str,
    pub value_template: &'static str,
    pub unique_id: &'static str,
    pub device: HaDevice,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HaDevice {
    pub identifiers: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryEntry {
    /// Topic prefix the `config` key is appended to.
    pub prefix: String,
    pub config: HaSensorConfig,
}

impl DiscoveryEntry {
    pub fn topic(&self) -> String {
        join_topic(&self.prefix, CONFIG_KEY)
    }
}

fn device() -> HaDevice {
    HaDevice {
        identifiers: DEVICE_IDENTIFIER,
        name: DEVICE_NAME,
    }
}

fn entry(suffix: char, config: HaSensorConfig) -> DiscoveryEntry {
    DiscoveryEntry {
        prefix: format!("{TOPIC_SENSOR_BASE}{suffix}"),
        config,
    }
}

/// Temperature, humidity and pressure descriptors, in publish order.
pub fn discovery_set() -> [DiscoveryEntry; 3] {
    [
        entry(
            'T',
            HaSensorConfig {
                device_class: "temperature",
                name: "m5stick_temp",
                state_topic: TOPIC_SENSOR_STATE,
                unit_of_measurement: "°C",
                value_template: "{{ value_json.temperature}}",
                unique_id: "temp01ae",
                device: device(),
            },
        ),
        entry(
            'H',
            HaSensorConfig {
                device_class: "humidity",
                name: "m5stick_hum",
                state_topic: TOPIC_SENSOR_STATE,
                unit_of_measurement: "%",
                value_template: "{{ value_json.humidity}}",
                unique_id: "hum01ae",
                device: device(),
            },
        ),
        entry(
            'P',
            HaSensorConfig {
                device_class: "pressure",
                name: "m5stick_pres",
                state_topic: TOPIC_SENSOR_STATE,
                unit_of_measurement: "hPa",
                value_template: "{{ value_json.pressure}}",
                unique_id: "press01ae",
                device: device(),
            },
        ),
    ]
}
