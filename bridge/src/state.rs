use std::sync::atomic::{AtomicBool, Ordering};

use mqtt_bridge_common::DispatchGuard;

/// Flags shared between the transport event task and the main loop.
#[derive(Debug)]
pub struct BridgeState {
    connected: AtomicBool,
    verbose: AtomicBool,
    pub guard: DispatchGuard,
}

impl BridgeState {
    pub fn new(verbose: bool, single_shot_dispatch: bool) -> Self {
        Self {
            connected: AtomicBool::new(false),
            verbose: AtomicBool::new(verbose),
            guard: DispatchGuard::new(single_shot_dispatch),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }
}
