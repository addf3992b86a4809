pub mod reader;
pub mod writer;

use crate::retry::RetryPolicy;
use alloy_primitives::Address;
use std::time::Duration;

/// Handles to the AVS side contracts: the service manager the operator
/// registers for, and the ECDSA stake registry that verifies its signatures.
#[derive(Debug, Clone)]
pub struct AvsRegistryContractManager<P> {
    pub service_manager_addr: Address,
    pub stake_registry_addr: Address,
    pub eth_client_http: P,
    pub retry_policy: RetryPolicy,
    pub confirmation_timeout: Duration,
}

impl<P> AvsRegistryContractManager<P> {
    pub fn build(
        service_manager_addr: Address,
        stake_registry_addr: Address,
        eth_client_http: P,
        retry_policy: RetryPolicy,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            service_manager_addr,
            stake_registry_addr,
            eth_client_http,
            retry_policy,
            confirmation_timeout,
        }
    }
}
