use tokio::sync::broadcast;

/// A process-wide stop signal. Every clone hears a single
/// [`Shutdown::broadcast_shutdown`], and once heard the flag stays set.
pub struct Shutdown {
    received: bool,
    sender: broadcast::Sender<()>,
    receiver: broadcast::Receiver<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        let (sender, receiver) = broadcast::channel(1);
        Self {
            received: false,
            sender,
            receiver,
        }
    }
}

impl Clone for Shutdown {
    fn clone(&self) -> Self {
        Self {
            received: self.received,
            sender: self.sender.clone(),
            receiver: self.sender.subscribe(),
        }
    }
}

impl Shutdown {
    pub fn is_shutdown(&self) -> bool {
        self.received
    }

    /// Waits for the signal. Returns at once if it was already seen.
    pub async fn recv(&mut self) {
        if !self.received {
            // Only one value is ever sent, so lagging is impossible.
            let _ = self.receiver.recv().await;
            self.received = true;
        }
    }

    /// Sending fails only when no receiver is left.
    pub fn broadcast_shutdown(&mut self) {
        let _ = self.sender.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recv_is_sticky() {
        let mut shutdown = Shutdown::default();
        let mut listener = shutdown.clone();
        assert!(!listener.is_shutdown());

        shutdown.broadcast_shutdown();
        listener.recv().await;
        assert!(listener.is_shutdown());
        // Already flagged, returns immediately.
        listener.recv().await;
    }

    #[tokio::test]
    async fn clones_taken_after_the_signal_stay_stopped() {
        let mut shutdown = Shutdown::default();
        let mut listener = shutdown.clone();
        shutdown.broadcast_shutdown();
        listener.recv().await;

        assert!(listener.clone().is_shutdown());
    }
}
