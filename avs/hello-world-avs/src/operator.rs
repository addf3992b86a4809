use crate::avs::subscriber::TaskSubscriber;
use crate::avs::{HelloWorldContractManager, Task};
use crate::codec::{reference_block, task_digest, CodecError, EncodedResponse};
use crate::config::{ConfigError, KeyUnavailable, NodeConfig, TaskMessage};
use crate::dispatcher::{DispatchSummary, TaskDispatcher, TaskHandler};
use crate::registration::{RegistrationFlow, RegistrationOutcome};
use alloy_provider::Provider;
use alloy_transport::BoxTransport;
use async_trait::async_trait;
use eigen_utils::avs_registry::reader::AvsRegistryChainReaderTrait;
use eigen_utils::avs_registry::writer::AvsRegistryChainWriterTrait;
use eigen_utils::avs_registry::AvsRegistryContractManager;
use eigen_utils::crypto::ecdsa::{signature_to_bytes, OperatorSigner};
use eigen_utils::el_contracts::reader::ElReader;
use eigen_utils::el_contracts::writer::ElWriter;
use eigen_utils::el_contracts::ElChainContractManager;
use eigen_utils::types::{AvsError, TxReceipt};
use eigen_utils::ChainReader;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Error type specific to the Hello World AVS operator
#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("Operator key unavailable: {0}")]
    KeyUnavailable(#[from] KeyUnavailable),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Cannot create HTTP ethclient: {0}")]
    HttpEthClientError(String),
    #[error("Cannot create WS ethclient: {0}")]
    WsEthClientError(String),
    #[error("Connected to chain {actual} but configured for chain {expected}")]
    ChainIdMismatch { expected: u64, actual: u64 },
    #[error("Cannot encode task response: {0}")]
    Codec(#[from] CodecError),
    #[error("Registration failed: {0}")]
    Registration(String),
    #[error("Error in Task Handling Process: {0}")]
    TaskError(String),
    #[error("AVS SDK error: {0}")]
    AvsSdkError(#[from] AvsError),
}

/// Signs task messages and submits them to the stake registry for verification.
#[derive(Debug, Clone)]
pub struct TaskResponder<R> {
    signer: OperatorSigner,
    avs_registry_contract_manager: R,
    task_message: TaskMessage,
}

impl<R> TaskResponder<R>
where
    R: ChainReader + AvsRegistryChainWriterTrait,
{
    pub fn new(
        signer: OperatorSigner,
        avs_registry_contract_manager: R,
        task_message: TaskMessage,
    ) -> Self {
        Self {
            signer,
            avs_registry_contract_manager,
            task_message,
        }
    }

    pub async fn respond_to_task(&self, task: &Task) -> Result<TxReceipt, OperatorError> {
        log::info!(
            "Responding to task: taskIndex={}, taskCreatedBlock={}, name={:?}",
            task.index,
            task.created_block,
            task.name
        );
        let receipt = self
            .submit_signature(self.task_message.message_for(task))
            .await?;
        log::info!(
            "Responded to task {}: tx={}",
            task.index,
            receipt.transaction_hash
        );
        Ok(receipt)
    }

    /// Signs `message` and asks the stake registry to verify the signature
    /// on chain at the block before the current one.
    /// Signs and submits an arbitrary message, outside of any task.
    pub async fn submit_signature(&self, message: &str) -> Result<TxReceipt, OperatorError> {
        let digest = task_digest(message);
        let signature = self.signer.sign_message(digest.message_hash.as_slice())?;
        let signature = signature_to_bytes(&signature);
        log::debug!("Signed {:?}: signature={}", message, signature);

        let current_block = self.avs_registry_contract_manager.get_block_number().await?;
        let reference_block = reference_block(current_block)?;
        let signature_data =
            EncodedResponse::single(self.signer.address(), signature, reference_block)
                .abi_encode();
        log::debug!(
            "Encoded signature data at reference block {}: {}",
            reference_block,
            signature_data
        );

        let receipt = self
            .avs_registry_contract_manager
            .submit_signature_data(digest.eth_signed_hash, signature_data)
            .await?;
        Ok(receipt)
    }
}

#[async_trait]
impl<R> TaskHandler for TaskResponder<R>
where
    R: ChainReader + AvsRegistryChainWriterTrait + 'static,
{
    async fn handle_task(&self, task: &Task) -> Result<(), OperatorError> {
        self.respond_to_task(task).await.map(|_| ())
    }
}

/// Hello World AVS Operator Struct
pub struct Operator<E, R, S> {
    config: NodeConfig,
    signer: OperatorSigner,
    eigenlayer_contract_manager: E,
    avs_registry_contract_manager: R,
    task_subscriber: S,
}

impl<P>
    Operator<ElChainContractManager<P>, AvsRegistryContractManager<P>, HelloWorldContractManager<P>>
where
    P: Provider<BoxTransport> + Clone + 'static,
{
    /// Creates a new Operator from the given config, providers, and signer
    pub async fn new_from_config(
        config: NodeConfig,
        eth_client_http: P,
        eth_client_ws: P,
        signer: OperatorSigner,
    ) -> Result<Self, OperatorError> {
        let retry_policy = config.retry_policy();

        log::info!("Building Eigenlayer Contract Manager...");
        let eigenlayer_contract_manager = ElChainContractManager::build(
            config.contracts.delegation_manager,
            config.contracts.avs_directory,
            eth_client_http.clone(),
            retry_policy,
            config.confirmation_timeout,
        );

        log::info!("Building AVS Registry Contract Manager...");
        let avs_registry_contract_manager = AvsRegistryContractManager::build(
            config.contracts.service_manager,
            config.contracts.stake_registry,
            eth_client_http.clone(),
            retry_policy,
            config.confirmation_timeout,
        );
        check_chain_id(&avs_registry_contract_manager, config.chain_id).await?;

        let hello_world_contract_manager = HelloWorldContractManager::build(
            config.contracts.service_manager,
            eth_client_http,
            eth_client_ws,
            config.task_feed,
        );
        let latest_task_num = hello_world_contract_manager.latest_task_num().await?;
        log::info!(
            "Service manager {} has created {} tasks so far",
            config.contracts.service_manager,
            latest_task_num
        );

        Ok(Self::new(
            config,
            signer,
            eigenlayer_contract_manager,
            avs_registry_contract_manager,
            hello_world_contract_manager,
        ))
    }
}

impl<E, R, S> Operator<E, R, S>
where
    E: ElReader + ElWriter,
    R: ChainReader + AvsRegistryChainReaderTrait + AvsRegistryChainWriterTrait + Clone + 'static,
    S: TaskSubscriber,
{
    pub fn new(
        config: NodeConfig,
        signer: OperatorSigner,
        eigenlayer_contract_manager: E,
        avs_registry_contract_manager: R,
        task_subscriber: S,
    ) -> Self {
        log::info!("Operator address: {}", signer.address());
        Self {
            config,
            signer,
            eigenlayer_contract_manager,
            avs_registry_contract_manager,
            task_subscriber,
        }
    }

    pub async fn register(&self) -> Result<RegistrationOutcome, OperatorError> {
        RegistrationFlow {
            signer: &self.signer,
            el_contract_manager: &self.eigenlayer_contract_manager,
            avs_registry_contract_manager: &self.avs_registry_contract_manager,
            service_manager_addr: self.config.contracts.service_manager,
            metadata_uri: &self.config.metadata_uri,
            sig_validity: self.config.registration_sig_validity,
        }
        .run()
        .await
    }

    pub fn task_responder(&self) -> TaskResponder<R> {
        TaskResponder::new(
            self.signer.clone(),
            self.avs_registry_contract_manager.clone(),
            self.config.task_message.clone(),
        )
    }

    /// Signs and submits an arbitrary message, outside of any task.
    pub async fn submit_signature(&self, message: &str) -> Result<TxReceipt, OperatorError> {
        self.task_responder().submit_signature(message).await
    }

    /// Registers (when configured to), then answers new tasks until
    /// `shutdown` resolves. Returns an error when the subscription closes or
    /// a task fails under
    /// [`TaskFailurePolicy::Halt`](crate::config::TaskFailurePolicy::Halt).
    pub async fn start<F>(self, shutdown: F) -> Result<DispatchSummary, OperatorError>
    where
        F: Future<Output = ()> + Send,
    {
        log::info!("Starting operator.");
        if self.config.register_operator {
            match self.register().await? {
                RegistrationOutcome::Aborted(reason) => log::warn!(
                    "Registration aborted ({}), monitoring tasks anyway",
                    reason
                ),
                outcome => log::info!("Registration outcome: {:?}", outcome),
            }
        }

        let tasks = self.task_subscriber.subscribe_to_new_tasks().await?;
        log::info!("Monitoring for new tasks...");

        TaskDispatcher::new(
            self.config.task_workers,
            self.config.task_queue_capacity,
            self.config.task_failure_policy,
        )
        .run(tasks, Arc::new(self.task_responder()), shutdown)
        .await
    }
}

/// Fails when the endpoint serves a different chain than the one configured.
pub async fn check_chain_id<C: ChainReader>(chain: &C, expected: u64) -> Result<(), OperatorError> {
    let actual = chain.get_chain_id().await?;
    if actual != expected {
        return Err(OperatorError::ChainIdMismatch { expected, actual });
    }
    log::info!("Connected to chain {}", actual);
    Ok(())
}
