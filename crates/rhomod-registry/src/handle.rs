//! Published module handles and the publish seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// What the ledger hands back for a registered module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleHandle {
    /// Ledger-assigned URI (or printable identifier) of the exported name.
    pub uri: String,

    /// Module name taken from the source header, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ModuleHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A deploy or publish call against the ledger failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("deployment failed: {message}")]
pub struct DeploymentError {
    pub message: String,
}

impl DeploymentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Publishes one module source to the ledger.
///
/// Implementations may be slow and fallible. The registry never retries a
/// failed publish.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, source: &str) -> Result<ModuleHandle, DeploymentError>;
}

/// Adapter turning an async closure into a [`Publisher`].
pub struct FnPublisher<F>(F);

/// Wrap `f(source)` as a [`Publisher`].
pub fn publisher_fn<F, Fut>(f: F) -> FnPublisher<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ModuleHandle, DeploymentError>> + Send,
{
    FnPublisher(f)
}

#[async_trait]
impl<F, Fut> Publisher for FnPublisher<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ModuleHandle, DeploymentError>> + Send,
{
    async fn publish(&self, source: &str) -> Result<ModuleHandle, DeploymentError> {
        (self.0)(source.to_string()).await
    }
}
