//! # rhomod-ledger
//!
//! The ledger-facing half of module publication.
//!
//! - [`module`]: split module source and splice it into the loader term
//! - [`ledger`]: the node seam ([`Ledger`]) and deploy data types
//! - [`loader`]: [`ModuleLoader`], the [`rhomod_registry::Publisher`] that
//!   deploys a module and reads its URI back
//! - [`signing`]: canonical signing payloads and the [`Signer`] seam

pub mod ledger;
pub mod loader;
pub mod module;
pub mod signing;

pub use ledger::{
    BlockData, DEFAULT_PAYMENT_FROM, DEFAULT_PHLO_LIMIT, DEFAULT_PHLO_PRICE, DeployRequest,
    DeployResult, DeployerId, Ledger, PaymentInfo, first_block_data,
};
pub use loader::{
    DEFAULT_DEPLOYER, LoaderConfig, LoaderError, ModuleLoader, RegisterError, register_modules,
};
pub use module::{LOADER_TEMPLATE, ModuleSyntaxError, ParsedModule, parse_module};
pub use signing::{SignError, Signature, Signer, sign_value, signing_payload};
