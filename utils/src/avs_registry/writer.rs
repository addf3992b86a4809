use super::AvsRegistryContractManager;
use crate::retry::with_timeout;
use crate::types::{AvsError, SignatureWithSaltAndExpiry, TxReceipt};
use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::Provider;
use alloy_transport::BoxTransport;
use async_trait::async_trait;
use eigen_contracts::ECDSAStakeRegistry;

#[async_trait]
pub trait AvsRegistryChainWriterTrait: Send + Sync {
    /// Registers `operator` with the stake registry using a signed AVS
    /// registration digest.
    async fn register_operator_with_signature(
        &self,
        operator_signature: SignatureWithSaltAndExpiry,
        operator: Address,
    ) -> Result<TxReceipt, AvsError>;

    /// Sends `isValidSignature(message_hash, signature_data)` to the stake
    /// registry as a transaction and waits for it to be mined.
    async fn submit_signature_data(
        &self,
        message_hash: B256,
        signature_data: Bytes,
    ) -> Result<TxReceipt, AvsError>;
}

#[async_trait]
impl<P> AvsRegistryChainWriterTrait for AvsRegistryContractManager<P>
where
    P: Provider<BoxTransport> + Clone + 'static,
{
    async fn register_operator_with_signature(
        &self,
        operator_signature: SignatureWithSaltAndExpiry,
        operator: Address,
    ) -> Result<TxReceipt, AvsError> {
        log::info!("Registering operator {} with the AVS stake registry", operator);
        log::debug!(
            "Operator signature: {}, salt: {}, expiry: {}",
            operator_signature.signature,
            operator_signature.salt,
            operator_signature.expiry
        );

        let signature_with_salt_and_expiry = eigen_contracts::SignatureWithSaltAndExpiry {
            signature: operator_signature.signature,
            salt: operator_signature.salt,
            expiry: operator_signature.expiry,
        };

        let stake_registry =
            ECDSAStakeRegistry::new(self.stake_registry_addr, self.eth_client_http.clone());
        let call =
            stake_registry.registerOperatorWithSignature(signature_with_salt_and_expiry, operator);
        let pending = call.send().await?;
        log::debug!("registerOperatorWithSignature sent: {}", pending.tx_hash());

        let receipt = with_timeout(
            self.confirmation_timeout,
            "registerOperatorWithSignature confirmation",
            pending.get_receipt(),
        )
        .await?
        .map_err(|e| AvsError::TransportError(e.to_string()))?;

        let receipt = TxReceipt::from(&receipt).ensure_success()?;
        log::info!("Registration Receipt: {:?}", receipt);
        Ok(receipt)
    }

    async fn submit_signature_data(
        &self,
        message_hash: B256,
        signature_data: Bytes,
    ) -> Result<TxReceipt, AvsError> {
        let stake_registry =
            ECDSAStakeRegistry::new(self.stake_registry_addr, self.eth_client_http.clone());
        let call = stake_registry.isValidSignature(message_hash, signature_data);
        let pending = call.send().await?;
        log::debug!("isValidSignature sent: {}", pending.tx_hash());

        let receipt = with_timeout(
            self.confirmation_timeout,
            "isValidSignature confirmation",
            pending.get_receipt(),
        )
        .await?
        .map_err(|e| AvsError::TransportError(e.to_string()))?;

        TxReceipt::from(&receipt).ensure_success()
    }
}
