use super::ElChainContractManager;
use crate::retry::retry_transient;
use crate::types::AvsError;
use alloy_primitives::{Address, B256, U256};
use alloy_provider::Provider;
use alloy_transport::BoxTransport;
use async_trait::async_trait;
use eigen_contracts::{IAVSDirectory, IDelegationManager};

#[async_trait]
pub trait ElReader: Send + Sync {
    async fn is_operator(&self, operator: Address) -> Result<bool, AvsError>;

    async fn calculate_operator_avs_registration_digest_hash(
        &self,
        operator: Address,
        avs: Address,
        salt: B256,
        expiry: U256,
    ) -> Result<B256, AvsError>;

    async fn operator_salt_is_spent(&self, operator: Address, salt: B256)
        -> Result<bool, AvsError>;
}

#[async_trait]
impl<P> ElReader for ElChainContractManager<P>
where
    P: Provider<BoxTransport> + Clone + 'static,
{
    async fn is_operator(&self, operator: Address) -> Result<bool, AvsError> {
        retry_transient(&self.retry_policy, "isOperator", || {
            let delegation_manager =
                IDelegationManager::new(self.delegation_manager_addr, self.eth_client_http.clone());
            async move {
                delegation_manager
                    .isOperator(operator)
                    .call()
                    .await
                    .map(|x| x._0)
                    .map_err(AvsError::from)
            }
        })
        .await
    }

    async fn calculate_operator_avs_registration_digest_hash(
        &self,
        operator: Address,
        avs: Address,
        salt: B256,
        expiry: U256,
    ) -> Result<B256, AvsError> {
        retry_transient(
            &self.retry_policy,
            "calculateOperatorAVSRegistrationDigestHash",
            || {
                let avs_directory =
                    IAVSDirectory::new(self.avs_directory_addr, self.eth_client_http.clone());
                async move {
                    avs_directory
                        .calculateOperatorAVSRegistrationDigestHash(operator, avs, salt, expiry)
                        .call()
                        .await
                        .map(|x| x._0)
                        .map_err(AvsError::from)
                }
            },
        )
        .await
    }

    async fn operator_salt_is_spent(
        &self,
        operator: Address,
        salt: B256,
    ) -> Result<bool, AvsError> {
        retry_transient(&self.retry_policy, "operatorSaltIsSpent", || {
            let avs_directory =
                IAVSDirectory::new(self.avs_directory_addr, self.eth_client_http.clone());
            async move {
                avs_directory
                    .operatorSaltIsSpent(operator, salt)
                    .call()
                    .await
                    .map(|x| x._0)
                    .map_err(AvsError::from)
            }
        })
        .await
    }
}
