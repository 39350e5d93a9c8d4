//! Deploying modules and reading back their registry URI.
//!
//! ```text
//! parse_module(source) ─▶ preview return channel ─▶ deploy loader term
//!                                                        │
//!      ModuleHandle ◀── first block data on return ◀─────┘
//! ```

use crate::ledger::{
    BlockData, DeployRequest, DeployerId, Ledger, PaymentInfo, first_block_data,
};
use crate::module::{ModuleSyntaxError, ParsedModule, parse_module};
use async_trait::async_trait;
use rhomod_registry::{
    DeploymentError, ModuleHandle, Publisher, Registry, RegistryError, RegistryStore,
};
use rhomod_term::{CodecError, Par, Value, decode, text::unforgeable_text, to_text};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_DEPLOYER: &str =
    "d72d0a7c0c9378b4874efbf871ae8089dd81f2ed3c54159fffeaba6e6fca4236";

/// Who deploys modules, and on what terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderConfig {
    /// Hex public key of the deploying account.
    pub deployer: String,
    pub payment: PaymentInfo,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            deployer: DEFAULT_DEPLOYER.to_string(),
            payment: PaymentInfo::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error(transparent)]
    Syntax(#[from] ModuleSyntaxError),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error("cannot read data from the ledger: {0}")]
    Codec(#[from] CodecError),

    #[error("invalid deployer key: {0}")]
    Deployer(String),

    #[error("no data on return channel {channel}")]
    NoData { channel: String },

    #[error("expected an unforgeable name, got {got}")]
    NotPrivate { got: String },
}

impl From<LoaderError> for DeploymentError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::Deployment(err) => err,
            other => DeploymentError::new(other.to_string()),
        }
    }
}

/// Loads module sources onto a [`Ledger`].
pub struct ModuleLoader<L> {
    ledger: Arc<L>,
    deployer: DeployerId,
    payment: PaymentInfo,
    clock: fn() -> i64,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl<L: Ledger> ModuleLoader<L> {
    pub fn new(ledger: Arc<L>, config: &LoaderConfig) -> Result<Self, LoaderError> {
        let deployer = DeployerId::from_hex(&config.deployer).map_err(LoaderError::Deployer)?;
        Ok(Self {
            ledger,
            deployer,
            payment: config.payment.clone(),
            clock: now_millis,
        })
    }

    /// Replace the deploy timestamp source.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn deployer(&self) -> &DeployerId {
        &self.deployer
    }

    /// Parse, deploy and resolve one module.
    pub async fn load_module(&self, source: &str) -> Result<ModuleHandle, LoaderError> {
        let module = parse_module(source)?;
        self.load_parsed(&module).await
    }

    pub async fn load_parsed(&self, module: &ParsedModule) -> Result<ModuleHandle, LoaderError> {
        tracing::info!(module = %module.name, title = %module.title, "loading module");
        let timestamp = (self.clock)();

        let channel = self
            .ledger
            .preview_private_channel(&self.deployer, timestamp)
            .await?;
        let channel_text = private_text(&channel)?;
        tracing::debug!(module = %module.name, channel = %channel_text, "return channel");

        let request = DeployRequest {
            deployer: self.deployer.clone(),
            term: module.term.clone(),
            timestamp,
            payment: self.payment.clone(),
        };
        let result = self.ledger.deploy(&request).await?;
        tracing::debug!(module = %module.name, message = %result.message, "deployed");

        let blocks = self.ledger.listen_for_data(&channel).await?;
        let handle = handle_from_blocks(&blocks)?
            .ok_or(LoaderError::NoData {
                channel: channel_text,
            })?
            .with_name(module.name.clone());
        tracing::info!(module = %module.name, uri = %handle.uri, "module registered");
        Ok(handle)
    }
}

#[async_trait]
impl<L: Ledger> Publisher for ModuleLoader<L> {
    async fn publish(&self, source: &str) -> Result<ModuleHandle, DeploymentError> {
        self.load_module(source).await.map_err(DeploymentError::from)
    }
}

fn private_text(par: &Par) -> Result<String, LoaderError> {
    match par.first_private() {
        Some(private) => Ok(unforgeable_text(&private.id)),
        None => Err(LoaderError::NotPrivate {
            got: to_text(par).unwrap_or_else(|_| format!("{par:?}")),
        }),
    }
}

/// Build a handle from the first populated process in `blocks`.
///
/// A string expression is the registry URI. Anything else, typically an
/// unforgeable name or a bundle, is kept in its Rholang rendering.
fn handle_from_blocks(blocks: &[BlockData]) -> Result<Option<ModuleHandle>, LoaderError> {
    let Some(par) = first_block_data(blocks) else {
        return Ok(None);
    };
    let uri = match decode(par) {
        Ok(Value::Str(uri)) => uri,
        _ => to_text(par)?,
    };
    Ok(Some(ModuleHandle::new(uri)))
}

/// Per-source failure from [`register_modules`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    #[error(transparent)]
    Syntax(#[from] ModuleSyntaxError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Register every source through `registry`, publishing with `loader`.
///
/// Sources that fail to parse are reported without touching the ledger; the
/// rest are published concurrently, each at most once per content.
pub async fn register_modules<S, L>(
    registry: &Arc<Registry<S>>,
    loader: Arc<ModuleLoader<L>>,
    sources: Vec<String>,
) -> Vec<Result<ModuleHandle, RegisterError>>
where
    S: RegistryStore + 'static,
    L: Ledger + 'static,
{
    let mut results: Vec<Option<Result<ModuleHandle, RegisterError>>> = Vec::new();
    let mut pending = Vec::new();
    let mut valid = Vec::new();
    for (idx, source) in sources.into_iter().enumerate() {
        match parse_module(&source) {
            Ok(_) => {
                results.push(None);
                pending.push(idx);
                valid.push(source);
            }
            Err(err) => {
                tracing::warn!(index = idx, error = %err, "skipping unparsable module");
                results.push(Some(Err(err.into())));
            }
        }
    }

    let outcomes = registry.ensure_published_batch(valid, loader).await;
    for (idx, outcome) in pending.into_iter().zip(outcomes) {
        results[idx] = Some(outcome.map_err(RegisterError::from));
    }

    results
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(RegistryError::Aborted("no outcome recorded".to_string()).into())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhomod_term::{Bundle, Expr};

    #[test]
    fn string_data_is_the_uri() {
        let blocks = vec![BlockData {
            post_block_data: vec![Par::from_expr(Expr::GString("rho:id:xyz".to_string()))],
        }];
        let handle = handle_from_blocks(&blocks)
            .expect("handle should build")
            .expect("data should be found");
        assert_eq!(handle, ModuleHandle::new("rho:id:xyz"));
    }

    #[test]
    fn bundles_fall_back_to_their_rendering() {
        let bundle = Par {
            bundles: vec![Bundle {
                body: Par::from_private(vec![0xab]),
                write_flag: true,
                read_flag: false,
            }],
            ..Par::default()
        };
        let blocks = vec![BlockData {
            post_block_data: vec![bundle],
        }];
        let handle = handle_from_blocks(&blocks)
            .expect("handle should build")
            .expect("data should be found");
        assert_eq!(handle.uri, "bundle+ { Unforgeable(0xab) }");
    }

    #[test]
    fn empty_blocks_yield_nothing() {
        assert_eq!(handle_from_blocks(&[]).expect("no error"), None);
    }

    #[test]
    fn return_channel_must_be_private() {
        let err = private_text(&Par::from_expr(Expr::GInt(1))).unwrap_err();
        assert!(matches!(err, LoaderError::NotPrivate { got } if got == "1"));
        assert_eq!(
            private_text(&Par::from_private(vec![0x01, 0xff])).expect("private"),
            "Unforgeable(0x01ff)"
        );
    }

    #[test]
    fn loader_config_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.deployer, DEFAULT_DEPLOYER);
        assert_eq!(config.payment, PaymentInfo::default());
    }
}
