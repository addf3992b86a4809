use super::ElChainContractManager;
use crate::retry::with_timeout;
use crate::types::{AvsError, Operator, TxReceipt};
use alloy_provider::Provider;
use alloy_transport::BoxTransport;
use async_trait::async_trait;
use eigen_contracts::{IDelegationManager, OperatorDetails};

#[async_trait]
pub trait ElWriter: Send + Sync {
    async fn register_as_operator(&self, operator: Operator) -> Result<TxReceipt, AvsError>;
}

#[async_trait]
impl<P> ElWriter for ElChainContractManager<P>
where
    P: Provider<BoxTransport> + Clone + 'static,
{
    async fn register_as_operator(&self, operator: Operator) -> Result<TxReceipt, AvsError> {
        log::info!("Registering operator {} with EigenLayer", operator.address);

        let operator_details = OperatorDetails {
            earningsReceiver: operator.earnings_receiver_address,
            delegationApprover: operator.delegation_approver_address,
            stakerOptOutWindowBlocks: operator.staker_opt_out_window_blocks,
        };

        let delegation_manager =
            IDelegationManager::new(self.delegation_manager_addr, self.eth_client_http.clone());
        let call = delegation_manager.registerAsOperator(operator_details, operator.metadata_url);
        let pending = call.send().await?;
        log::debug!("registerAsOperator sent: {}", pending.tx_hash());

        let receipt = with_timeout(
            self.confirmation_timeout,
            "registerAsOperator confirmation",
            pending.get_receipt(),
        )
        .await?
        .map_err(|e| AvsError::TransportError(e.to_string()))?;

        TxReceipt::from(&receipt).ensure_success()
    }
}
