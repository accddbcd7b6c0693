//! JSON-RPC adapter for an ERC-721 contract exposing `safeMint(address,string)`.

use std::sync::Arc;

use ethers::contract::abigen;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Log, H256};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use super::{AdapterError, BlockchainAdapter, ReceiptLog, TxHash, TxStatus};
use crate::settings::ChainConfig;

abigen!(
    StoryToken,
    r#"[
        function safeMint(address to, string uri) public returns (uint256)
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId)
    ]"#
);

type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Ledger adapter backed by an `ethers` HTTP provider and a local signer.
///
/// The adapter trait is synchronous, so calls are driven to completion on a
/// private current-thread runtime.
pub struct EthersAdapter {
    runtime: Runtime,
    client: Arc<Client>,
    contract: StoryToken<Client>,
}

impl EthersAdapter {
    /// Validate `config` and build the signer and contract bindings.
    ///
    /// Fails fast with `AdapterError::Misconfigured` on bad configuration.
    /// When no chain id is configured it is fetched from the endpoint.
    pub fn connect(config: &ChainConfig) -> Result<Self, AdapterError> {
        config.validate()?;

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AdapterError::Misconfigured(format!("adapter runtime: {}", e)))?;

        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| AdapterError::Misconfigured(format!("invalid rpc_url: {}", e)))?;

        let chain_id = match config.chain_id {
            Some(id) => id,
            None => runtime
                .block_on(provider.get_chainid())
                .map_err(|e| AdapterError::Network(e.to_string()))?
                .as_u64(),
        };

        let wallet = config
            .signer_key
            .parse::<LocalWallet>()
            .map_err(|e| AdapterError::Misconfigured(format!("invalid signer_key: {}", e)))?
            .with_chain_id(chain_id);

        let contract_address = config
            .contract_address
            .parse::<Address>()
            .map_err(|e| AdapterError::Misconfigured(format!("invalid contract_address: {}", e)))?;

        info!(
            chain_id,
            contract = %config.contract_address,
            signer = ?wallet.address(),
            "blockchain adapter connected"
        );

        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        let contract = StoryToken::new(contract_address, client.clone());

        Ok(Self {
            runtime,
            client,
            contract,
        })
    }
}

impl BlockchainAdapter for EthersAdapter {
    fn submit_mint(&self, to: &str, token_uri: &str) -> Result<TxHash, AdapterError> {
        let recipient = to
            .parse::<Address>()
            .map_err(|_| AdapterError::InvalidAddress(to.to_string()))?;

        let call = self.contract.safe_mint(recipient, token_uri.to_string());
        let hash = self.runtime.block_on(async {
            let pending = call
                .send()
                .await
                .map_err(|e| AdapterError::Rejected(e.to_string()))?;
            Ok::<H256, AdapterError>(pending.tx_hash())
        })?;

        let tx_hash = TxHash::new(format!("{:#x}", hash));
        debug!(%tx_hash, to, "mint transaction submitted");
        Ok(tx_hash)
    }

    fn transaction_status(&self, tx_hash: &TxHash) -> Result<TxStatus, AdapterError> {
        let hash = tx_hash
            .as_str()
            .parse::<H256>()
            .map_err(|_| AdapterError::Rejected(format!("malformed transaction hash {}", tx_hash)))?;

        let receipt = self
            .runtime
            .block_on(self.client.get_transaction_receipt(hash))
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        let Some(receipt) = receipt else {
            return Ok(TxStatus::Pending { block_number: None });
        };

        let block_number = receipt.block_number.map(|n| n.as_u64());
        if receipt.status.map(|s| s.as_u64()) == Some(1) {
            Ok(TxStatus::Confirmed {
                block_number: block_number.unwrap_or_default(),
                logs: receipt.logs.iter().map(receipt_log).collect(),
            })
        } else {
            Ok(TxStatus::Reverted { block_number })
        }
    }
}

fn receipt_log(log: &Log) -> ReceiptLog {
    ReceiptLog {
        address: format!("{:#x}", log.address),
        topics: log.topics.iter().map(|t| format!("{:#x}", t)).collect(),
        data: format!("0x{}", hex::encode(&log.data)),
    }
}
