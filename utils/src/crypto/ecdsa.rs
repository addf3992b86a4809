use crate::types::AvsError;
use alloy_network::EthereumWallet;
use alloy_primitives::{keccak256, Address, Bytes, Signature, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use k256::ecdsa::{SigningKey, VerifyingKey};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EcdsaKeyError {
    #[error("ECDSA private key is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("ECDSA private key is not a valid secp256k1 scalar")]
    InvalidScalar,
}

pub trait ToAddress {
    fn to_address(&self) -> Address;
}

impl ToAddress for VerifyingKey {
    fn to_address(&self) -> Address {
        let public_key = self.to_encoded_point(false);
        // Drop the 0x04 tag; the address is the low 20 bytes of the hash.
        let hash = keccak256(&public_key.as_bytes()[1..]);
        Address::from_slice(&hash[12..])
    }
}

/// Parses a hex encoded secp256k1 secret, with or without the `0x` prefix.
pub fn parse_private_key(hex_key: &str) -> Result<SigningKey, EcdsaKeyError> {
    let trimmed = hex_key.trim();
    let raw = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(raw)?;
    SigningKey::from_slice(&bytes).map_err(|_| EcdsaKeyError::InvalidScalar)
}

/// Serializes a signature as the 65 byte `r || s || v` form with `v` in {27, 28},
/// which is what `ecrecover`-based verifiers on chain accept.
pub fn signature_to_bytes(signature: &Signature) -> Bytes {
    let mut bytes = [0u8; 65];
    bytes[..32].copy_from_slice(&signature.r().to_be_bytes::<32>());
    bytes[32..64].copy_from_slice(&signature.s().to_be_bytes::<32>());
    bytes[64] = 27 + u8::from(signature.v().y_parity());
    Bytes::copy_from_slice(&bytes)
}

/// Checks that `signature` over the prehashed `hash` recovers to `expected`.
pub fn verify_prehash(signature: &[u8], hash: &B256, expected: Address) -> bool {
    Signature::try_from(signature)
        .and_then(|sig| sig.recover_address_from_prehash(hash))
        .map(|recovered| recovered == expected)
        .unwrap_or(false)
}

/// The operator's signing identity. The secret never leaves this type; callers
/// only ever get signatures and the derived address.
#[derive(Clone)]
pub struct OperatorSigner {
    signer: PrivateKeySigner,
}

impl OperatorSigner {
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self {
            signer: PrivateKeySigner::from_signing_key(signing_key),
        }
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, EcdsaKeyError> {
        parse_private_key(hex_key).map(Self::from_signing_key)
    }

    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// EIP-191 personal-message signature over `message`.
    pub fn sign_message(&self, message: &[u8]) -> Result<Signature, AvsError> {
        self.signer.sign_message_sync(message).map_err(AvsError::from)
    }

    /// Signature over an already hashed 32 byte digest, no prefix applied.
    pub fn sign_hash(&self, hash: &B256) -> Result<Signature, AvsError> {
        self.signer.sign_hash_sync(hash).map_err(AvsError::from)
    }

    /// Wallet used by the transaction-sending provider.
    pub fn wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl fmt::Debug for OperatorSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
