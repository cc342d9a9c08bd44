use std::{future::Future, io::Write, sync::Arc, time::Duration};

use mqtt_bridge_common::{control_filter, join_topic, Credentials, MqttSection, Payload};
use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, ConnectionError, Event, EventLoop, Incoming,
    MqttOptions, Outgoing, QoS,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{router::MessageRouter, state::BridgeState};

/// Outbound half of the broker client. Sends must not wait on a full
/// request queue.
pub trait MqttSink {
    fn send(
        &self,
        topic: String,
        qos: QoS,
        retain: bool,
        body: String,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}

impl MqttSink for AsyncClient {
    async fn send(
        &self,
        topic: String,
        qos: QoS,
        retain: bool,
        body: String,
    ) -> Result<(), ClientError> {
        self.try_publish(topic, qos, retain, body)
    }
}

/// Fixed-interval connect retry. Unbounded unless `max_attempts` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn from_section(section: &MqttSection) -> Self {
        Self {
            interval: Duration::from_millis(section.retry_interval_ms),
            max_attempts: section.max_connect_attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    GaveUp,
    Cancelled,
}

pub fn mqtt_options(section: &MqttSection, credentials: &Credentials) -> MqttOptions {
    let mut options = MqttOptions::new(
        section.client_id.clone(),
        section.host.clone(),
        section.port,
    );
    options.set_keep_alive(Duration::from_secs(section.keep_alive_secs));
    if !credentials.is_empty() {
        options.set_credentials(credentials.username.clone(), credentials.password.clone());
    }
    options
}

pub struct ConnectionManager<S> {
    sink: S,
    state: Arc<BridgeState>,
    retry: RetryPolicy,
}

impl<S: MqttSink> ConnectionManager<S> {
    pub fn new(sink: S, state: Arc<BridgeState>, retry: RetryPolicy) -> Self {
        Self { sink, state, retry }
    }

    #[cfg(test)]
    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Waits for the event task to see a successful acknowledgement,
    /// printing `+` on every poll.
    pub async fn connect_blocking(&self, cancel: &CancellationToken) -> ConnectOutcome {
        let mut attempts: u32 = 0;

        while !self.state.is_connected() {
            if let Some(max) = self.retry.max_attempts {
                if attempts >= max {
                    error!("cannot connect to mqtt broker after {attempts} attempts");
                    return ConnectOutcome::GaveUp;
                }
            }
            attempts = attempts.saturating_add(1);

            print!("+");
            let _ = std::io::stdout().flush();

            tokio::select! {
                _ = cancel.cancelled() => return ConnectOutcome::Cancelled,
                _ = tokio::time::sleep(self.retry.interval) => {}
            }
        }

        ConnectOutcome::Connected
    }

    pub async fn publish(&self, prefix: &str, key: &str, value: &Payload) -> bool {
        self.publish_with(prefix, key, value, QoS::AtMostOnce, false)
            .await
    }

    /// Best-effort publish to `prefix/key`; a `false` return is the only
    /// failure signal. Nothing is queued while disconnected.
    pub async fn publish_with(
        &self,
        prefix: &str,
        key: &str,
        value: &Payload,
        qos: QoS,
        retain: bool,
    ) -> bool {
        let topic = join_topic(prefix, key);
        if !self.state.is_connected() {
            error!("cannot publish to mqtt broker on {topic} - not connected");
            return false;
        }

        match self.sink.send(topic.clone(), qos, retain, value.render()).await {
            Ok(()) => {
                if self.state.is_verbose() {
                    debug!("published to {topic}");
                }
                true
            }
            Err(err) => {
                error!("cannot publish to mqtt broker on {topic} - retrying: {err}");
                self.state.set_connected(false);
                false
            }
        }
    }
}

/// Returns whether the subscription step should run.
pub fn on_connect_ack(state: &BridgeState, code: ConnectReturnCode) -> bool {
    if code == ConnectReturnCode::Success {
        if state.is_verbose() {
            info!("connected ok");
        }
        state.set_connected(true);
        true
    } else {
        info!("mqtt connect acknowledgement return code is: {code:?}");
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Continue,
    Subscribe,
    Backoff,
    /// The disconnect request went out on the wire.
    Stop,
}

pub fn handle_event(
    state: &BridgeState,
    router: &MessageRouter,
    event: Result<Event, ConnectionError>,
) -> EventAction {
    match event {
        Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
            if on_connect_ack(state, ack.code) {
                EventAction::Subscribe
            } else {
                EventAction::Continue
            }
        }
        Ok(Event::Incoming(Incoming::Publish(message))) => {
            let dispatch = router.dispatch(&message.topic, &message.payload);
            debug!("inbound {} handled as {dispatch:?}", message.topic);
            EventAction::Continue
        }
        Ok(Event::Outgoing(Outgoing::Disconnect)) => EventAction::Stop,
        Ok(_) => EventAction::Continue,
        Err(ConnectionError::ConnectionRefused(code)) => {
            on_connect_ack(state, code);
            EventAction::Backoff
        }
        Err(err) => {
            error!("cannot connect to mqtt broker - retrying: {err}");
            state.set_connected(false);
            EventAction::Backoff
        }
    }
}

fn subscribe_controls(client: &AsyncClient, device: &str) {
    let filter = control_filter(device);
    // try_ variant: a blocking subscribe from inside the poll task can deadlock.
    if let Err(err) = client.try_subscribe(filter.clone(), QoS::AtMostOnce) {
        warn!("failed to subscribe to {filter}: {err}");
    }
}

/// Polls the transport until `cancel` fires, the disconnect request is
/// written, or a transport error occurs after `drain` fired.
pub fn spawn_event_loop(
    client: AsyncClient,
    mut eventloop: EventLoop,
    state: Arc<BridgeState>,
    router: MessageRouter,
    retry_interval: Duration,
    drain: CancellationToken,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = eventloop.poll() => event,
            };

            match handle_event(&state, &router, event) {
                EventAction::Continue => {}
                EventAction::Subscribe => subscribe_controls(&client, router.device()),
                EventAction::Stop => break,
                EventAction::Backoff if drain.is_cancelled() => break,
                EventAction::Backoff => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(retry_interval) => {}
                    }
                }
            }
        }
        debug!("mqtt event loop stopped");
    })
}
