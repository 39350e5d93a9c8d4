//! The ledger node seam.
//!
//! Transport (gRPC, HTTP) lives outside this crate. A [`Ledger`] is whatever
//! can preview a private name, accept a deploy, and report data later sent
//! on a name.

use async_trait::async_trait;
use rhomod_registry::DeploymentError;
use rhomod_term::{HexError, Par, hex_lower, parse_hex};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PHLO_PRICE: i64 = 1;
pub const DEFAULT_PHLO_LIMIT: i64 = 100_000;
pub const DEFAULT_PAYMENT_FROM: &str = "0x1";

/// Public key bytes of the account submitting deploys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeployerId(Vec<u8>);

impl DeployerId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a hex-encoded public key.
    pub fn from_hex(value: &str) -> Result<Self, String> {
        let digits = value.trim();
        let digits = digits.strip_prefix("0x").unwrap_or(digits);
        if digits.is_empty() {
            return Err("deployer must not be empty".to_string());
        }
        parse_hex(digits).map(Self).map_err(|e| match e {
            HexError::OddLength(_) => "deployer must be even-length hex".to_string(),
            HexError::Digit(_) => "deployer must be valid hex".to_string(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex_lower(&self.0)
    }
}

/// Who pays for a deploy, and how much.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaymentInfo {
    pub from: String,
    pub nonce: i64,
    pub phlo_price: i64,
    pub phlo_limit: i64,
}

impl Default for PaymentInfo {
    fn default() -> Self {
        Self {
            from: DEFAULT_PAYMENT_FROM.to_string(),
            nonce: 0,
            phlo_price: DEFAULT_PHLO_PRICE,
            phlo_limit: DEFAULT_PHLO_LIMIT,
        }
    }
}

/// A term submitted for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub deployer: DeployerId,
    pub term: String,
    /// Milliseconds since the unix epoch. The node derives private names
    /// from `(deployer, timestamp)`, so previews must use the same value.
    pub timestamp: i64,
    pub payment: PaymentInfo,
}

/// The node's acknowledgement of a deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    pub message: String,
}

/// Data observed on a name in one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockData {
    pub post_block_data: Vec<Par>,
}

/// A ledger node.
///
/// A registered module's URI comes back as a string expression, which
/// decodes to [`rhomod_term::Value::Str`].
#[async_trait]
pub trait Ledger: Send + Sync {
    /// The unforgeable name the next deploy from `deployer` at `timestamp`
    /// will bind to its first `new`.
    async fn preview_private_channel(
        &self,
        deployer: &DeployerId,
        timestamp: i64,
    ) -> Result<Par, DeploymentError>;

    async fn deploy(&self, request: &DeployRequest) -> Result<DeployResult, DeploymentError>;

    /// Blocks that carry data sent on `name`, newest first.
    async fn listen_for_data(&self, name: &Par) -> Result<Vec<BlockData>, DeploymentError>;
}

/// The first process in `blocks` that carries an expression, a bundle or an
/// unforgeable name.
pub fn first_block_data(blocks: &[BlockData]) -> Option<&Par> {
    blocks
        .iter()
        .flat_map(|block| block.post_block_data.iter())
        .find(|par| !(par.exprs.is_empty() && par.bundles.is_empty() && par.ids.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhomod_term::Expr;

    #[test]
    fn deployer_hex_round_trips() {
        let id = DeployerId::from_hex("0xD72d0a").expect("hex should parse");
        assert_eq!(id.as_bytes(), &[0xd7, 0x2d, 0x0a]);
        assert_eq!(id.to_hex(), "d72d0a");
    }

    #[test]
    fn deployer_hex_rejects_bad_input() {
        assert_eq!(
            DeployerId::from_hex("abc"),
            Err("deployer must be even-length hex".to_string())
        );
        assert_eq!(
            DeployerId::from_hex("zz"),
            Err("deployer must be valid hex".to_string())
        );
        assert!(DeployerId::from_hex("  ").is_err());
    }

    #[test]
    fn payment_defaults_fill_missing_fields() {
        let payment: PaymentInfo =
            serde_json::from_str(r#"{"phloLimit": 5}"#).expect("payment should parse");
        assert_eq!(payment.phlo_limit, 5);
        assert_eq!(payment.phlo_price, 1);
        assert_eq!(payment.from, "0x1");
        assert_eq!(payment.nonce, 0);
    }

    #[test]
    fn first_block_data_skips_sends_only_processes() {
        let sends_only = Par::from_sends(vec![rhomod_term::Send::on_quoted_string(
            "k",
            vec![Par::nil()],
        )]);
        let uri = Par::from_expr(Expr::GString("rho:id:abc".to_string()));
        let blocks = vec![
            BlockData {
                post_block_data: vec![Par::nil(), sends_only],
            },
            BlockData {
                post_block_data: vec![uri.clone()],
            },
        ];
        assert_eq!(first_block_data(&blocks), Some(&uri));
        assert_eq!(first_block_data(&[]), None);
    }
}
