use std::sync::Arc;

use mqtt_bridge_common::{classify, InboundCommand};
use tracing::{debug, info};

use crate::state::BridgeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Another dispatch holds the guard (or the guard is latched).
    Blocked,
    StatusQuery,
    Verbosity(bool),
    Ignored,
}

/// Inbound message handler, invoked from the transport event task.
#[derive(Clone)]
pub struct MessageRouter {
    device: String,
    state: Arc<BridgeState>,
}

impl MessageRouter {
    pub fn new(device: impl Into<String>, state: Arc<BridgeState>) -> Self {
        Self {
            device: device.into(),
            state,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> Dispatch {
        let Some(_permit) = self.state.guard.try_enter() else {
            return Dispatch::Blocked;
        };

        let message = String::from_utf8_lossy(payload);
        if self.state.is_verbose() {
            info!("received message: {topic}/{message}");
        } else {
            debug!("received message on {topic}");
        }

        match classify(&self.device, topic, &message) {
            // Status replies are not published yet.
            InboundCommand::StatusQuery => Dispatch::StatusQuery,
            InboundCommand::SetVerbose(verbose) => {
                self.state.set_verbose(verbose);
                Dispatch::Verbosity(verbose)
            }
            InboundCommand::Unknown => Dispatch::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(verbose: bool, single_shot: bool) -> MessageRouter {
        MessageRouter::new("mqtt", Arc::new(BridgeState::new(verbose, single_shot)))
    }

    #[test]
    fn set_verbose_toggles_flag() {
        let router = router(false, false);

        assert_eq!(router.dispatch("mqtt/setVerbose", b"1"), Dispatch::Verbosity(true));
        assert!(router.state.is_verbose());

        assert_eq!(router.dispatch("mqtt/setVerbose", b"0"), Dispatch::Verbosity(false));
        assert!(!router.state.is_verbose());
    }

    #[test]
    fn status_query_changes_nothing() {
        let router = router(true, false);
        assert_eq!(router.dispatch("mqtt/getStatus", b""), Dispatch::StatusQuery);
        assert!(router.state.is_verbose());
        assert!(!router.state.is_connected());
    }

    #[test]
    fn unrelated_topic_is_ignored() {
        let router = router(true, false);
        assert_eq!(router.dispatch("mqtt/setValue", b"1"), Dispatch::Ignored);
        assert!(router.state.is_verbose());
    }

    #[test]
    fn message_during_inflight_dispatch_is_blocked() {
        let router = router(false, false);
        let permit = router.state.guard.try_enter().unwrap();

        assert_eq!(router.dispatch("mqtt/setVerbose", b"1"), Dispatch::Blocked);
        assert!(!router.state.is_verbose());

        drop(permit);
        assert_eq!(router.dispatch("mqtt/setVerbose", b"1"), Dispatch::Verbosity(true));
    }

    #[test]
    fn single_shot_mode_handles_only_first_message() {
        let router = router(false, true);

        assert_eq!(router.dispatch("mqtt/setVerbose", b"1"), Dispatch::Verbosity(true));
        assert_eq!(router.dispatch("mqtt/setVerbose", b"0"), Dispatch::Blocked);
        assert!(router.state.is_verbose());
    }
}
