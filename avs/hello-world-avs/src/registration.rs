//! One-time registration of the operator with EigenLayer and the AVS.
//!
//! `CheckRegistered -> RegisterCore -> ComputeDigest -> Sign -> SubmitToAVSRegistry`
//!
//! A failed core registration is logged and ends the flow as
//! [`RegistrationOutcome::Aborted`]; everything after it is skipped. A failed
//! AVS submission is returned as an error. Running the flow again once the
//! operator sits in the stake registry submits nothing.

use crate::codec::RegistrationDigestParams;
use crate::operator::OperatorError;
use alloy_primitives::{Address, U256};
use eigen_utils::avs_registry::reader::AvsRegistryChainReaderTrait;
use eigen_utils::avs_registry::writer::AvsRegistryChainWriterTrait;
use eigen_utils::crypto::ecdsa::{signature_to_bytes, OperatorSigner};
use eigen_utils::el_contracts::reader::ElReader;
use eigen_utils::el_contracts::writer::ElWriter;
use eigen_utils::types::{Operator, SignatureWithSaltAndExpiry, TxReceipt};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MAX_SALT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Already in the AVS stake registry. Nothing was submitted.
    AlreadyRegistered,
    /// Newly registered with the AVS stake registry.
    Registered(TxReceipt),
    /// Core registration failed and the AVS steps were skipped.
    Aborted(String),
}

pub struct RegistrationFlow<'a, E, R> {
    pub signer: &'a OperatorSigner,
    pub el_contract_manager: &'a E,
    pub avs_registry_contract_manager: &'a R,
    pub service_manager_addr: Address,
    pub metadata_uri: &'a str,
    pub sig_validity: Duration,
}

impl<'a, E, R> RegistrationFlow<'a, E, R>
where
    E: ElReader + ElWriter,
    R: AvsRegistryChainReaderTrait + AvsRegistryChainWriterTrait,
{
    pub async fn run(&self) -> Result<RegistrationOutcome, OperatorError> {
        let operator_addr = self.signer.address();

        // CheckRegistered
        let is_operator = self.el_contract_manager.is_operator(operator_addr).await?;
        if is_operator {
            log::info!("Operator already registered with EigenLayer, skipping core registration");
        } else {
            // RegisterCore
            let operator = Operator::with_defaults(operator_addr, self.metadata_uri);
            match self.el_contract_manager.register_as_operator(operator).await {
                Ok(receipt) => log::info!(
                    "Operator registered to core EigenLayer contracts: tx={}",
                    receipt.transaction_hash
                ),
                Err(e) => {
                    log::error!("Error in registering as operator: {}", e);
                    return Ok(RegistrationOutcome::Aborted(e.to_string()));
                }
            }
        }

        if self
            .avs_registry_contract_manager
            .is_operator_registered(operator_addr)
            .await?
        {
            log::info!("Operator already registered with the AVS, nothing to submit");
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        // ComputeDigest
        let params = self.fresh_digest_params(operator_addr).await?;
        let digest = self
            .el_contract_manager
            .calculate_operator_avs_registration_digest_hash(
                params.operator,
                params.avs,
                params.salt,
                params.expiry,
            )
            .await?;
        log::debug!("Operator AVS registration digest: {}", digest);

        // Sign
        log::info!("Signing digest hash with operator's private key");
        let signature = self.signer.sign_hash(&digest)?;
        let proof = SignatureWithSaltAndExpiry {
            signature: signature_to_bytes(&signature),
            salt: params.salt,
            expiry: params.expiry,
        };

        // SubmitToAVSRegistry
        if U256::from(unix_now()?) >= proof.expiry {
            return Err(OperatorError::Registration(
                "registration signature expired before submission".to_string(),
            ));
        }
        log::info!("Registering operator to AVS registry contract");
        let receipt = self
            .avs_registry_contract_manager
            .register_operator_with_signature(proof, operator_addr)
            .await?;
        log::info!(
            "Operator registered on AVS successfully: tx={}",
            receipt.transaction_hash
        );
        Ok(RegistrationOutcome::Registered(receipt))
    }

    /// Draws salts until the AVS directory reports one as unspent.
    async fn fresh_digest_params(
        &self,
        operator_addr: Address,
    ) -> Result<RegistrationDigestParams, OperatorError> {
        let mut params = RegistrationDigestParams::fresh(
            operator_addr,
            self.service_manager_addr,
            unix_now()?,
            self.sig_validity.as_secs(),
        );
        for _ in 0..MAX_SALT_ATTEMPTS {
            if !self
                .el_contract_manager
                .operator_salt_is_spent(operator_addr, params.salt)
                .await?
            {
                return Ok(params);
            }
            log::warn!("Salt {} already spent, drawing a new one", params.salt);
            params = params.with_new_salt();
        }
        Err(OperatorError::Registration(format!(
            "no unspent salt after {MAX_SALT_ATTEMPTS} attempts"
        )))
    }
}

fn unix_now() -> Result<u64, OperatorError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| OperatorError::Registration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeChain, ANVIL_KEY_0};
    use eigen_utils::crypto::ecdsa::verify_prehash;
    use eigen_utils::types::AvsError;

    fn flow<'a>(
        signer: &'a OperatorSigner,
        chain: &'a FakeChain,
    ) -> RegistrationFlow<'a, FakeChain, FakeChain> {
        RegistrationFlow {
            signer,
            el_contract_manager: chain,
            avs_registry_contract_manager: chain,
            service_manager_addr: Address::repeat_byte(0x5e),
            metadata_uri: "",
            sig_validity: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn fresh_operator_registers_everywhere() {
        let _ = env_logger::try_init();
        let signer = OperatorSigner::from_hex(ANVIL_KEY_0).unwrap();
        let chain = FakeChain::new(101);

        let outcome = flow(&signer, &chain).run().await.unwrap();
        assert!(matches!(outcome, RegistrationOutcome::Registered(_)));

        let state = chain.state();
        assert_eq!(state.core_registrations.len(), 1);
        let core = &state.core_registrations[0];
        assert_eq!(core.address, signer.address());
        assert_eq!(core.delegation_approver_address, Address::ZERO);
        assert_eq!(core.staker_opt_out_window_blocks, 0);

        assert_eq!(state.avs_registrations.len(), 1);
        let (proof, operator) = &state.avs_registrations[0];
        assert_eq!(*operator, signer.address());
        let digest = FakeChain::digest_for(
            signer.address(),
            Address::repeat_byte(0x5e),
            proof.salt,
            proof.expiry,
        );
        assert!(verify_prehash(&proof.signature, &digest, signer.address()));
        assert!(proof.expiry > U256::from(unix_now().unwrap()));
    }

    #[tokio::test]
    async fn core_operator_skips_core_registration() {
        let signer = OperatorSigner::random();
        let chain = FakeChain::new(101);
        chain.state().core_operators.insert(signer.address());

        let outcome = flow(&signer, &chain).run().await.unwrap();
        assert!(matches!(outcome, RegistrationOutcome::Registered(_)));

        let state = chain.state();
        assert!(state.core_registrations.is_empty());
        assert_eq!(state.digest_requests, 1);
        assert_eq!(state.avs_registrations.len(), 1);
    }

    #[tokio::test]
    async fn second_run_submits_nothing() {
        let signer = OperatorSigner::random();
        let chain = FakeChain::new(101);

        let first = flow(&signer, &chain).run().await.unwrap();
        assert!(matches!(first, RegistrationOutcome::Registered(_)));
        let submissions = chain.state().submissions();

        let second = flow(&signer, &chain).run().await.unwrap();
        assert_eq!(second, RegistrationOutcome::AlreadyRegistered);
        assert_eq!(chain.state().submissions(), submissions);
    }

    #[tokio::test]
    async fn failed_core_registration_aborts() {
        let signer = OperatorSigner::random();
        let chain = FakeChain::new(101);
        chain.state().fail_core_registration = true;

        let outcome = flow(&signer, &chain).run().await.unwrap();
        assert!(matches!(outcome, RegistrationOutcome::Aborted(_)));

        let state = chain.state();
        assert_eq!(state.digest_requests, 0);
        assert!(state.avs_registrations.is_empty());
    }

    #[tokio::test]
    async fn failed_avs_submission_is_an_error() {
        let signer = OperatorSigner::random();
        let chain = FakeChain::new(101);
        chain.state().fail_avs_registration = true;

        let err = flow(&signer, &chain).run().await.unwrap_err();
        assert!(matches!(err, OperatorError::AvsSdkError(AvsError::ContractError(_))));
    }

    #[tokio::test]
    async fn expired_signature_is_not_submitted() {
        let signer = OperatorSigner::random();
        let chain = FakeChain::new(101);
        let mut flow = flow(&signer, &chain);
        flow.sig_validity = Duration::ZERO;

        let err = flow.run().await.unwrap_err();
        assert!(matches!(err, OperatorError::Registration(reason) if reason.contains("expired")));

        let state = chain.state();
        assert_eq!(state.digest_requests, 1);
        assert!(state.avs_registrations.is_empty());
    }

    #[tokio::test]
    async fn spent_salts_are_redrawn() {
        let signer = OperatorSigner::random();
        let chain = FakeChain::new(101);
        chain.state().spent_salt_checks_remaining = 2;

        flow(&signer, &chain).run().await.unwrap();

        let state = chain.state();
        assert_eq!(state.salt_checks.len(), 3);
        let (proof, _) = &state.avs_registrations[0];
        assert_eq!(proof.salt, *state.salt_checks.last().unwrap());
    }

    #[tokio::test]
    async fn gives_up_when_every_salt_is_spent() {
        let signer = OperatorSigner::random();
        let chain = FakeChain::new(101);
        chain.state().spent_salt_checks_remaining = usize::MAX;

        let err = flow(&signer, &chain).run().await.unwrap_err();
        assert!(matches!(err, OperatorError::Registration(_)));
        assert!(chain.state().avs_registrations.is_empty());
    }

    #[tokio::test]
    async fn salts_differ_between_runs() {
        let chain_a = FakeChain::new(101);
        let chain_b = FakeChain::new(101);
        let signer = OperatorSigner::random();

        flow(&signer, &chain_a).run().await.unwrap();
        flow(&signer, &chain_b).run().await.unwrap();

        let salt_a = chain_a.state().avs_registrations[0].0.salt;
        let salt_b = chain_b.state().avs_registrations[0].0.salt;
        assert_ne!(salt_a, salt_b);
    }
}
