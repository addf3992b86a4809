use super::AvsRegistryContractManager;
use crate::retry::retry_transient;
use crate::types::AvsError;
use crate::ChainReader;
use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_transport::BoxTransport;
use async_trait::async_trait;
use eigen_contracts::ECDSAStakeRegistry;

#[async_trait]
pub trait AvsRegistryChainReaderTrait: Send + Sync {
    async fn is_operator_registered(&self, operator: Address) -> Result<bool, AvsError>;
}

#[async_trait]
impl<P> AvsRegistryChainReaderTrait for AvsRegistryContractManager<P>
where
    P: Provider<BoxTransport> + Clone + 'static,
{
    async fn is_operator_registered(&self, operator: Address) -> Result<bool, AvsError> {
        retry_transient(&self.retry_policy, "operatorRegistered", || {
            let stake_registry =
                ECDSAStakeRegistry::new(self.stake_registry_addr, self.eth_client_http.clone());
            async move {
                stake_registry
                    .operatorRegistered(operator)
                    .call()
                    .await
                    .map(|x| x._0)
                    .map_err(AvsError::from)
            }
        })
        .await
    }
}

#[async_trait]
impl<P> ChainReader for AvsRegistryContractManager<P>
where
    P: Provider<BoxTransport> + Clone + 'static,
{
    async fn get_block_number(&self) -> Result<u64, AvsError> {
        let provider = &self.eth_client_http;
        retry_transient(&self.retry_policy, "eth_blockNumber", || async move {
            provider
                .get_block_number()
                .await
                .map_err(AvsError::from)
        })
        .await
    }

    async fn get_chain_id(&self) -> Result<u64, AvsError> {
        let provider = &self.eth_client_http;
        retry_transient(&self.retry_policy, "eth_chainId", || async move {
            provider
                .get_chain_id()
                .await
                .map_err(AvsError::from)
        })
        .await
    }
}
