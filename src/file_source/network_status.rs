//! Network reachability signal.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Shared online/offline flag.
///
/// Loaders waiting to retry a connection failure subscribe to it and retry
/// as soon as the network becomes reachable again.
#[derive(Clone, Debug)]
pub struct NetworkStatus {
    online: Arc<watch::Sender<bool>>,
}

impl NetworkStatus {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(watch::Sender::new(online)),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Publishes a reachability change. Subscribers are only woken when the
    /// value actually changes.
    pub fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if changed {
            info!(online, "Network status changed");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_reachability_changes() {
        let status = NetworkStatus::new(false);
        let mut receiver = status.subscribe();

        status.set_online(false);
        assert!(!receiver.has_changed().unwrap());

        status.set_online(true);
        receiver.changed().await.unwrap();
        assert!(*receiver.borrow_and_update());
        assert!(status.is_online());
    }
}
