pub mod avs_registry;
pub mod crypto;
pub mod el_contracts;
pub mod retry;
pub mod types;

use async_trait::async_trait;
use types::AvsError;

/// Plain chain queries that are not tied to a contract.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn get_block_number(&self) -> Result<u64, AvsError>;

    async fn get_chain_id(&self) -> Result<u64, AvsError>;
}
