//! Connectivity and focus signals
//!
//! The platform layer owns the actual online/offline and window-focus
//! detection; the engine consumes them through these watch-channel wrappers.
//! The orchestrator subscribes for transitions, the platform side calls
//! `set_online` / `notify`.

use std::sync::Arc;
use tokio::sync::watch;

/// Current online/offline state plus transition notifications.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record a connectivity change. Subscribers are only woken on actual
    /// transitions, not on repeated reports of the same state.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Window-focus events, delivered as a bumped counter.
#[derive(Debug, Clone)]
pub struct FocusSignal {
    tx: Arc<watch::Sender<u64>>,
}

impl FocusSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Report that the window came back into focus.
    pub fn notify(&self) {
        self.tx.send_modify(|n| *n = n.wrapping_add(1));
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for FocusSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_only_transitions_wake_subscribers() {
        let monitor = ConnectivityMonitor::new(true);
        let rx = monitor.subscribe();

        monitor.set_online(true);
        assert!(!rx.has_changed().unwrap());

        monitor.set_online(false);
        assert!(rx.has_changed().unwrap());
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_focus_bumps_counter() {
        let focus = FocusSignal::new();
        let rx = focus.subscribe();

        focus.notify();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow(), 1);
    }
}
