//! Byte layouts shared with the on-chain verifier.
//!
//! A task message is canonicalized exactly one way:
//!
//! 1. `message_hash = keccak256(bytes(message))`
//! 2. `eth_signed_hash = keccak256("\x19Ethereum Signed Message:\n32" || message_hash)`
//!
//! The operator signs `eth_signed_hash` (a personal-message signature over the
//! 32 bytes of `message_hash`) and hands `eth_signed_hash` to
//! `isValidSignature`, which `ecrecover`s it against the signature data.

use alloy_primitives::{eip191_hash_message, keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid block reference: current block {0} has no usable predecessor")]
    InvalidBlockReference(u64),
    #[error("{operators} operators but {signatures} signatures")]
    LengthMismatch { operators: usize, signatures: usize },
    #[error("Cannot decode signature data: {0}")]
    Decode(String),
}

/// Hashes the operator commits to for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDigest {
    pub message_hash: B256,
    pub eth_signed_hash: B256,
}

pub fn task_digest(message: &str) -> TaskDigest {
    let message_hash = keccak256(message.as_bytes());
    TaskDigest {
        message_hash,
        eth_signed_hash: eip191_hash_message(message_hash),
    }
}

/// The verifier checks signatures against the stake table at this block. One
/// behind the tip, because the tip may not be visible to the verifier yet.
pub fn reference_block(current_block: u64) -> Result<u32, CodecError> {
    current_block
        .checked_sub(1)
        .and_then(|block| u32::try_from(block).ok())
        .ok_or(CodecError::InvalidBlockReference(current_block))
}

/// `(address[] operators, bytes[] signatures, uint32 referenceBlock)` as
/// decoded by the stake registry's `isValidSignature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResponse {
    operators: Vec<Address>,
    signatures: Vec<Bytes>,
    reference_block: u32,
}

impl EncodedResponse {
    pub fn new(
        operators: Vec<Address>,
        signatures: Vec<Bytes>,
        reference_block: u32,
    ) -> Result<Self, CodecError> {
        if operators.len() != signatures.len() {
            return Err(CodecError::LengthMismatch {
                operators: operators.len(),
                signatures: signatures.len(),
            });
        }
        Ok(Self {
            operators,
            signatures,
            reference_block,
        })
    }

    pub fn single(operator: Address, signature: Bytes, reference_block: u32) -> Self {
        Self {
            operators: vec![operator],
            signatures: vec![signature],
            reference_block,
        }
    }

    pub fn operators(&self) -> &[Address] {
        &self.operators
    }

    pub fn signatures(&self) -> &[Bytes] {
        &self.signatures
    }

    pub fn reference_block(&self) -> u32 {
        self.reference_block
    }

    pub fn abi_encode(&self) -> Bytes {
        (
            self.operators.clone(),
            self.signatures.clone(),
            self.reference_block,
        )
            .abi_encode_params()
            .into()
    }

    pub fn abi_decode(data: &[u8]) -> Result<Self, CodecError> {
        let (operators, signatures, reference_block) =
            <(Vec<Address>, Vec<Bytes>, u32)>::abi_decode_params(data, true)
                .map_err(|e| CodecError::Decode(e.to_string()))?;
        Self::new(operators, signatures, reference_block)
    }
}

/// Arguments for the AVS directory's `calculateOperatorAVSRegistrationDigestHash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationDigestParams {
    pub operator: Address,
    pub avs: Address,
    pub salt: B256,
    pub expiry: U256,
}

impl RegistrationDigestParams {
    /// Draws a fresh random salt; `expiry` is `now + valid_for_secs` in unix seconds.
    pub fn fresh(operator: Address, avs: Address, now: u64, valid_for_secs: u64) -> Self {
        Self {
            operator,
            avs,
            salt: B256::from(rand::random::<[u8; 32]>()),
            expiry: U256::from(now.saturating_add(valid_for_secs)),
        }
    }

    pub fn with_new_salt(self) -> Self {
        Self {
            salt: B256::from(rand::random::<[u8; 32]>()),
            ..self
        }
    }
}
