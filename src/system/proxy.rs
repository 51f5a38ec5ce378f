//! Reverse-proxy control.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ProxyControlConfig;
use crate::system::command::{self, CommandError};

/// Failure of a proxy control call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// The proxy ran the command and reported an error.
    #[error("{0}")]
    Failed(String),

    /// The control command could not be invoked at all.
    #[error("proxy control unavailable: {0}")]
    Unavailable(String),
}

impl From<CommandError> for ControlError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Empty | CommandError::Unavailable { .. } => {
                ControlError::Unavailable(err.to_string())
            }
            CommandError::Failed { .. } | CommandError::Io { .. } => {
                ControlError::Failed(err.to_string())
            }
        }
    }
}

/// Control surface of the running reverse proxy.
///
/// Implementations do not enforce timeouts; the activator bounds every call.
#[async_trait]
pub trait ProxyControl: Send + Sync {
    /// Validate the syntax of the full configuration set.
    async fn check_config(&self) -> Result<(), ControlError>;

    /// Re-read configuration without dropping connections.
    async fn reload(&self) -> Result<(), ControlError>;
}

/// Proxy control through configured commands (`nginx -t`, `nginx -s reload`).
#[derive(Debug, Clone)]
pub struct CommandProxyControl {
    check_command: Vec<String>,
    reload_command: Vec<String>,
}

impl CommandProxyControl {
    pub fn new(config: &ProxyControlConfig) -> Self {
        Self {
            check_command: config.check_command.clone(),
            reload_command: config.reload_command.clone(),
        }
    }
}

#[async_trait]
impl ProxyControl for CommandProxyControl {
    async fn check_config(&self) -> Result<(), ControlError> {
        command::run(&self.check_command).await?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), ControlError> {
        command::run(&self.reload_command).await?;
        tracing::info!("Proxy configuration reloaded");
        Ok(())
    }
}
