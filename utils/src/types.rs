use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rpc_types::TransactionReceipt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AvsError {
    #[error("Contract error: {0}")]
    ContractError(String),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("Signer error: {0}")]
    SignerError(String),
    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(Duration, &'static str),
    #[error("Transaction {0} reverted")]
    TransactionReverted(B256),
    #[error("Subscription error: {0}")]
    SubscriptionError(String),
    #[error("Cannot decode event log: {0}")]
    EventDecodeError(String),
}

impl AvsError {
    /// Errors that may go away on their own and are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, AvsError::TransportError(_) | AvsError::Timeout(..))
    }
}

impl From<alloy_contract::Error> for AvsError {
    fn from(err: alloy_contract::Error) -> Self {
        match err {
            alloy_contract::Error::TransportError(e) => AvsError::TransportError(e.to_string()),
            other => AvsError::ContractError(other.to_string()),
        }
    }
}

impl From<alloy_transport::TransportError> for AvsError {
    fn from(err: alloy_transport::TransportError) -> Self {
        AvsError::TransportError(err.to_string())
    }
}

impl From<alloy_signer::Error> for AvsError {
    fn from(err: alloy_signer::Error) -> Self {
        AvsError::SignerError(err.to_string())
    }
}

/// Parameters for registering with the core delegation manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub address: Address,
    pub earnings_receiver_address: Address,
    pub delegation_approver_address: Address,
    pub staker_opt_out_window_blocks: u32,
    pub metadata_url: String,
}

impl Operator {
    /// No delegation approver and a zero opt-out window.
    pub fn with_defaults(address: Address, metadata_url: impl Into<String>) -> Self {
        Self {
            address,
            earnings_receiver_address: address,
            delegation_approver_address: Address::ZERO,
            staker_opt_out_window_blocks: 0,
            metadata_url: metadata_url.into(),
        }
    }
}

/// The operator's signed proof for joining an AVS, as the stake registry expects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureWithSaltAndExpiry {
    pub signature: Bytes,
    pub salt: B256,
    pub expiry: U256,
}

/// The parts of a transaction receipt the operator cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub success: bool,
}

impl TxReceipt {
    pub fn ensure_success(self) -> Result<Self, AvsError> {
        if self.success {
            Ok(self)
        } else {
            Err(AvsError::TransactionReverted(self.transaction_hash))
        }
    }
}

impl From<&TransactionReceipt> for TxReceipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            success: receipt.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(AvsError::TransportError("connection reset".into()).is_transient());
        assert!(AvsError::Timeout(Duration::from_secs(1), "block number").is_transient());
        assert!(!AvsError::ContractError("execution reverted".into()).is_transient());
        assert!(!AvsError::TransactionReverted(B256::ZERO).is_transient());
    }

    #[test]
    fn reverted_receipt_is_an_error() {
        let receipt = TxReceipt {
            transaction_hash: B256::repeat_byte(0xab),
            block_number: Some(7),
            success: false,
        };
        assert!(matches!(
            receipt.ensure_success(),
            Err(AvsError::TransactionReverted(hash)) if hash == B256::repeat_byte(0xab)
        ));
        let ok = TxReceipt {
            success: true,
            ..receipt
        };
        assert_eq!(ok.ensure_success().unwrap(), ok);
    }

    #[test]
    fn default_operator_details() {
        let addr = Address::repeat_byte(0x11);
        let operator = Operator::with_defaults(addr, "");
        assert_eq!(operator.earnings_receiver_address, addr);
        assert_eq!(operator.delegation_approver_address, Address::ZERO);
        assert_eq!(operator.staker_opt_out_window_blocks, 0);
    }
}
