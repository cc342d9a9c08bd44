use std::{io::Write, sync::Arc, time::Duration};

use anyhow::Context;
use mqtt_bridge_common::{BridgeConfig, Payload, TelemetryState, STATE_KEY, TOPIC_SENSOR_BASE};
use rumqttc::AsyncClient;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    connection::{
        mqtt_options, spawn_event_loop, ConnectOutcome, ConnectionManager, MqttSink, RetryPolicy,
    },
    discovery::publish_discovery,
    router::MessageRouter,
    state::BridgeState,
    vault::{resolve_credentials, RedisVault},
};

const REQUEST_CAPACITY: usize = 32;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Zero poll duration: a single cycle ran.
    RanOnce,
    Cancelled,
}

pub async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    let options = {
        let vault = RedisVault::new(&config.redis);
        let credentials = resolve_credentials(&vault, &config.mqtt.uid).await;
        mqtt_options(&config.mqtt, &credentials)
    };

    let state = Arc::new(BridgeState::new(
        config.mqtt.verbose,
        config.mqtt.single_shot_dispatch,
    ));
    let router = MessageRouter::new(config.mqtt.client_id.clone(), Arc::clone(&state));
    let retry = RetryPolicy::from_section(&config.mqtt);
    let (mqtt, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

    let duration = config.mqtt.duration;
    println!("Duration: {duration}");

    let drain = CancellationToken::new();
    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());
    let events = spawn_event_loop(
        mqtt.clone(),
        eventloop,
        Arc::clone(&state),
        router,
        retry.interval,
        drain.clone(),
        cancel.clone(),
    );

    info!(
        "bridge starting for {} at {}:{}",
        config.mqtt.uid, config.mqtt.host, config.mqtt.port
    );
    let mgr = ConnectionManager::new(mqtt.clone(), state, retry);

    let exit = if mgr.connect_blocking(&cancel).await == ConnectOutcome::Cancelled {
        LoopExit::Cancelled
    } else {
        publish_discovery(&mgr).await;
        publish_loop(&mgr, duration, &cancel).await?
    };

    info!("bridge stopping: {exit:?}");
    stop_transport(&mqtt, exit, &drain, &cancel, events).await;
    Ok(())
}

/// After a single cycle the queued telemetry is flushed by disconnecting
/// and letting the event task run until the disconnect is written.
async fn stop_transport(
    client: &AsyncClient,
    exit: LoopExit,
    drain: &CancellationToken,
    cancel: &CancellationToken,
    mut events: JoinHandle<()>,
) {
    if exit == LoopExit::RanOnce {
        drain.cancel();
        match client.try_disconnect() {
            Ok(()) => match tokio::time::timeout(DRAIN_TIMEOUT, &mut events).await {
                Ok(Ok(())) => return,
                Ok(Err(err)) => {
                    warn!("mqtt event task ended abnormally: {err}");
                    return;
                }
                Err(_) => warn!("mqtt event task did not drain within {DRAIN_TIMEOUT:?}"),
            },
            Err(err) => warn!("failed to request mqtt disconnect: {err}"),
        }
    }

    cancel.cancel();
    if let Err(err) = events.await {
        warn!("mqtt event task ended abnormally: {err}");
    }
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                cancel.cancel();
            }
            Err(err) => warn!("failed to listen for ctrl-c: {err}"),
        }
    });
}

/// Publishes telemetry every `duration` seconds. A failed publish
/// triggers one reconnect and exactly one retry.
pub async fn publish_loop<S: MqttSink>(
    mgr: &ConnectionManager<S>,
    duration: u64,
    cancel: &CancellationToken,
) -> anyhow::Result<LoopExit> {
    let payload =
        Payload::json(&TelemetryState::default()).context("failed to serialize telemetry")?;

    loop {
        if !mgr.publish(TOPIC_SENSOR_BASE, STATE_KEY, &payload).await {
            println!("reconnecting");
            if mgr.connect_blocking(cancel).await == ConnectOutcome::Cancelled {
                return Ok(LoopExit::Cancelled);
            }
            mgr.publish(TOPIC_SENSOR_BASE, STATE_KEY, &payload).await;
        }

        print!(".");
        let _ = std::io::stdout().flush();

        if duration == 0 {
            return Ok(LoopExit::RanOnce);
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(LoopExit::Cancelled),
            _ = tokio::time::sleep(Duration::from_secs(duration)) => {}
        }
    }
}
