use std::sync::Arc;

use crate::config::{Config, ConfigError, ConfigLoader};
use crate::shutdown::Shutdown;

#[derive(Clone)]
pub struct ServiceContext {
    name: String,
    config_loader: Arc<ConfigLoader>,
    shutdown: Shutdown,
}

impl ServiceContext {
    pub fn new(
        name: String,
        config_loader: Arc<ConfigLoader>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            name,
            config_loader,
            shutdown,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.name
    }

    pub fn config_loader(&self) -> Arc<ConfigLoader> {
        self.config_loader.clone()
    }

    pub fn load_config(&self) -> Result<Config, ConfigError> {
        self.config_loader.load()
    }

    /// Awaits the shutdown signal
    pub async fn recv_shutdown_signal(&mut self) {
        self.shutdown.recv().await
    }

    /// Causes all listeners to start the shutdown sequence.
    pub fn broadcast_shutdown(&mut self) {
        self.shutdown.broadcast_shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_reaches_clones() -> anyhow::Result<()> {
        let context = ServiceContext::new(
            "test".to_owned(),
            Arc::new(ConfigLoader::from_path(&None)),
            Shutdown::default(),
        );
        let mut waiter = context.clone();
        let mut trigger = context.clone();

        let handle =
            tokio::spawn(async move { waiter.recv_shutdown_signal().await });
        trigger.broadcast_shutdown();
        handle.await?;

        assert_eq!(context.service_name(), "test");
        assert_eq!(context.load_config()?.api.access_token_ttl_s, 300);
        Ok(())
    }
}
