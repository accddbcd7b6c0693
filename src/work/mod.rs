//! Works - the publishable items whose status reflects the mint outcome.
//!
//! A work moves `draft -> publishing` through the publish transaction and
//! `publishing -> minted | failed` through the minting saga. No other
//! transition is written by this crate.

mod store;

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chain::{TokenId, TxHash};
use crate::error::Error;
use crate::model::Model;

pub use store::WorkStore;

/// Identity of a work (a hyphenated, lowercase UUID).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkId(String);

impl WorkId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse caller input. Missing or malformed ids are validation errors.
    pub fn parse(value: &str) -> Result<Self, Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::Validation("missing work id".into()));
        }
        let id = Uuid::parse_str(value)
            .map_err(|_| Error::Validation(format!("invalid work id '{}'", value)))?;
        Ok(Self(id.hyphenated().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wallet address, compared case-insensitively (stored lowercase).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(address.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    #[default]
    Draft,
    Publishing,
    Minted,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub id: WorkId,
    pub owner_wallet: WalletAddress,
    pub title: String,
    pub status: WorkStatus,
    /// Content-address handle of the token metadata (e.g. an IPFS URI).
    pub metadata_uri: Option<String>,
    pub nft_token_id: Option<TokenId>,
    pub nft_tx_hash: Option<TxHash>,
    pub created_at: SystemTime,
}

impl Model for Work {
    const COLLECTION: &'static str = "works";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Work {
    /// A new draft owned by `owner`.
    pub fn draft(owner: WalletAddress, title: impl Into<String>, created_at: SystemTime) -> Self {
        Self {
            id: WorkId::generate(),
            owner_wallet: owner,
            title: title.into(),
            status: WorkStatus::Draft,
            metadata_uri: None,
            nft_token_id: None,
            nft_tx_hash: None,
            created_at,
        }
    }

    pub fn with_metadata_uri(mut self, uri: impl Into<String>) -> Self {
        self.metadata_uri = Some(uri.into());
        self
    }

    pub fn is_owned_by(&self, wallet: &WalletAddress) -> bool {
        &self.owner_wallet == wallet
    }

    /// The metadata URI, if present and non-blank.
    pub fn metadata(&self) -> Option<&str> {
        self.metadata_uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
    }
}
