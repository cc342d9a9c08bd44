use std::sync::atomic::{AtomicBool, Ordering};

use crate::topics::{join_topic, STATUS_SUFFIX, VERBOSE_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundCommand {
    StatusQuery,
    SetVerbose(bool),
    Unknown,
}

/// Maps an inbound control topic to a command. The `verbose` marker is
/// matched case-insensitively so `<device>/setVerbose` is recognised.
pub fn classify(device: &str, topic: &str, payload: &str) -> InboundCommand {
    if topic == join_topic(device, STATUS_SUFFIX) {
        InboundCommand::StatusQuery
    } else if topic.to_ascii_lowercase().contains(VERBOSE_MARKER) {
        InboundCommand::SetVerbose(payload == "1")
    } else {
        InboundCommand::Unknown
    }
}

/// Reentrancy guard around inbound dispatch.
///
/// A permit clears the guard when dropped. In latched mode the guard is
/// never cleared, so only the first inbound message is ever handled.
#[derive(Debug)]
pub struct DispatchGuard {
    busy: AtomicBool,
    latched: bool,
}

#[derive(Debug)]
pub struct DispatchPermit<'a> {
    guard: &'a DispatchGuard,
}

impl DispatchGuard {
    pub fn new(latched: bool) -> Self {
        Self {
            busy: AtomicBool::new(false),
            latched,
        }
    }

    pub fn try_enter(&self) -> Option<DispatchPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DispatchPermit { guard: self })
    }

    #[cfg(test)]
    pub fn is_set(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for DispatchPermit<'_> {
    fn drop(&mut self) {
        if !self.guard.latched {
            self.guard.busy.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn classifies_status_query_for_own_device_only() {
        assert_eq!(
            classify("mqtt", "mqtt/getStatus", ""),
            InboundCommand::StatusQuery
        );
        assert_eq!(
            classify("mqtt", "other/getStatus", ""),
            InboundCommand::Unknown
        );
    }

    #[test]
    fn verbose_payload_one_enables_anything_else_disables() {
        assert_eq!(
            classify("mqtt", "mqtt/setVerbose", "1"),
            InboundCommand::SetVerbose(true)
        );
        assert_eq!(
            classify("mqtt", "mqtt/setVerbose", "0"),
            InboundCommand::SetVerbose(false)
        );
        assert_eq!(
            classify("mqtt", "anything/verbose/x", "yes"),
            InboundCommand::SetVerbose(false)
        );
    }

    #[test]
    fn other_topics_are_unknown() {
        assert_eq!(classify("mqtt", "mqtt/setValue", "1"), InboundCommand::Unknown);
    }

    #[test]
    fn permit_blocks_reentry_until_dropped() {
        let guard = DispatchGuard::new(false);
        let permit = guard.try_enter().unwrap();
        assert!(guard.try_enter().is_none());
        drop(permit);
        assert!(!guard.is_set());
        assert!(guard.try_enter().is_some());
    }

    #[test]
    fn latched_guard_stays_set() {
        let guard = DispatchGuard::new(true);
        drop(guard.try_enter().unwrap());
        assert!(guard.is_set());
        assert!(guard.try_enter().is_none());
    }
}
