pub mod reader;
pub mod writer;

use crate::retry::RetryPolicy;
use alloy_primitives::Address;
use std::time::Duration;

/// Handles to the EigenLayer core contracts the operator talks to.
#[derive(Debug, Clone)]
pub struct ElChainContractManager<P> {
    pub delegation_manager_addr: Address,
    pub avs_directory_addr: Address,
    pub eth_client_http: P,
    pub retry_policy: RetryPolicy,
    pub confirmation_timeout: Duration,
}

impl<P> ElChainContractManager<P> {
    pub fn build(
        delegation_manager_addr: Address,
        avs_directory_addr: Address,
        eth_client_http: P,
        retry_policy: RetryPolicy,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            delegation_manager_addr,
            avs_directory_addr,
            eth_client_http,
            retry_policy,
            confirmation_timeout,
        }
    }
}
