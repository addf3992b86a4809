//! In-memory stand-ins for the chain, recording every call they receive.

use crate::avs::subscriber::{TaskStream, TaskSubscriber};
use crate::avs::Task;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;
use eigen_utils::avs_registry::reader::AvsRegistryChainReaderTrait;
use eigen_utils::avs_registry::writer::AvsRegistryChainWriterTrait;
use eigen_utils::el_contracts::reader::ElReader;
use eigen_utils::el_contracts::writer::ElWriter;
use eigen_utils::types::{AvsError, Operator, SignatureWithSaltAndExpiry, TxReceipt};
use eigen_utils::ChainReader;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;

pub const ANVIL_KEY_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[derive(Debug, Default)]
pub struct FakeChainState {
    pub block_number: u64,
    pub chain_id: u64,
    pub core_operators: HashSet<Address>,
    pub avs_operators: HashSet<Address>,
    pub core_registrations: Vec<Operator>,
    pub avs_registrations: Vec<(SignatureWithSaltAndExpiry, Address)>,
    pub digest_requests: usize,
    pub salt_checks: Vec<B256>,
    /// The next this many salt checks report the salt as spent.
    pub spent_salt_checks_remaining: usize,
    pub fail_core_registration: bool,
    pub fail_avs_registration: bool,
    pub signature_submissions: Vec<(B256, Bytes)>,
    pub fail_signature_submissions: bool,
    pub submission_delay: Duration,
    pub in_flight: usize,
    pub max_in_flight: usize,
}

impl FakeChainState {
    /// Registration transactions sent so far.
    pub fn submissions(&self) -> usize {
        self.core_registrations.len() + self.avs_registrations.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeChain {
    state: Arc<Mutex<FakeChainState>>,
}

impl FakeChain {
    pub fn new(block_number: u64) -> Self {
        let chain = Self::default();
        {
            let mut state = chain.state();
            state.block_number = block_number;
            state.chain_id = 31337;
        }
        chain
    }

    pub fn state(&self) -> MutexGuard<'_, FakeChainState> {
        self.state.lock().unwrap()
    }

    pub fn digest_for(operator: Address, avs: Address, salt: B256, expiry: U256) -> B256 {
        keccak256((operator, avs, salt, expiry).abi_encode())
    }

    fn receipt(tx_hash: B256, block_number: u64) -> TxReceipt {
        TxReceipt {
            transaction_hash: tx_hash,
            block_number: Some(block_number),
            success: true,
        }
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn get_block_number(&self) -> Result<u64, AvsError> {
        Ok(self.state().block_number)
    }

    async fn get_chain_id(&self) -> Result<u64, AvsError> {
        Ok(self.state().chain_id)
    }
}

#[async_trait]
impl ElReader for FakeChain {
    async fn is_operator(&self, operator: Address) -> Result<bool, AvsError> {
        Ok(self.state().core_operators.contains(&operator))
    }

    async fn calculate_operator_avs_registration_digest_hash(
        &self,
        operator: Address,
        avs: Address,
        salt: B256,
        expiry: U256,
    ) -> Result<B256, AvsError> {
        self.state().digest_requests += 1;
        Ok(Self::digest_for(operator, avs, salt, expiry))
    }

    async fn operator_salt_is_spent(&self, _operator: Address, salt: B256) -> Result<bool, AvsError> {
        let mut state = self.state();
        state.salt_checks.push(salt);
        if state.spent_salt_checks_remaining > 0 {
            state.spent_salt_checks_remaining -= 1;
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl ElWriter for FakeChain {
    async fn register_as_operator(&self, operator: Operator) -> Result<TxReceipt, AvsError> {
        let mut state = self.state();
        if state.fail_core_registration {
            return Err(AvsError::ContractError("execution reverted".to_string()));
        }
        state.core_operators.insert(operator.address);
        state.core_registrations.push(operator);
        Ok(Self::receipt(B256::repeat_byte(0xc0), state.block_number))
    }
}

#[async_trait]
impl AvsRegistryChainReaderTrait for FakeChain {
    async fn is_operator_registered(&self, operator: Address) -> Result<bool, AvsError> {
        Ok(self.state().avs_operators.contains(&operator))
    }
}

#[async_trait]
impl AvsRegistryChainWriterTrait for FakeChain {
    async fn register_operator_with_signature(
        &self,
        operator_signature: SignatureWithSaltAndExpiry,
        operator: Address,
    ) -> Result<TxReceipt, AvsError> {
        let mut state = self.state();
        if state.fail_avs_registration {
            return Err(AvsError::ContractError("execution reverted".to_string()));
        }
        state.avs_operators.insert(operator);
        state.avs_registrations.push((operator_signature, operator));
        Ok(Self::receipt(B256::repeat_byte(0xa5), state.block_number))
    }

    async fn submit_signature_data(
        &self,
        message_hash: B256,
        signature_data: Bytes,
    ) -> Result<TxReceipt, AvsError> {
        let delay = {
            let mut state = self.state();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.submission_delay
        };
        tokio::time::sleep(delay).await;

        let mut state = self.state();
        state.in_flight -= 1;
        if state.fail_signature_submissions {
            return Err(AvsError::ContractError("execution reverted".to_string()));
        }
        state.signature_submissions.push((message_hash, signature_data));
        Ok(Self::receipt(keccak256(message_hash), state.block_number))
    }
}

/// Replays a fixed list of subscription items.
pub struct FakeTaskSource {
    tasks: Mutex<Option<TaskStream>>,
}

impl FakeTaskSource {
    /// A live subscription. The future resolves once every item has been read.
    pub fn live(
        items: Vec<Result<Task, AvsError>>,
    ) -> (Self, impl Future<Output = ()> + Send + 'static) {
        let (tasks, drained) = live_stream(items);
        (Self::from_stream(tasks), drained)
    }

    /// A subscription the node closes after the last item.
    pub fn closing(items: Vec<Result<Task, AvsError>>) -> Self {
        Self::from_stream(stream::iter(items).boxed())
    }

    fn from_stream(tasks: TaskStream) -> Self {
        Self {
            tasks: Mutex::new(Some(tasks)),
        }
    }
}

#[async_trait]
impl TaskSubscriber for FakeTaskSource {
    async fn subscribe_to_new_tasks(&self) -> Result<TaskStream, AvsError> {
        self.tasks
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| AvsError::SubscriptionError("already subscribed".to_string()))
    }
}

/// Replays `items`, then stays open like a live subscription. The returned
/// future resolves once every item has been read.
pub fn live_stream(
    items: Vec<Result<Task, AvsError>>,
) -> (TaskStream, impl Future<Output = ()> + Send + 'static) {
    let (drained_tx, drained_rx) = oneshot::channel::<()>();
    let drained_marker = stream::once(async move {
        let _ = drained_tx.send(());
    })
    .filter_map(|()| async { None::<Result<Task, AvsError>> });
    let tasks = stream::iter(items)
        .chain(drained_marker)
        .chain(stream::pending())
        .boxed();
    (tasks, async move {
        let _ = drained_rx.await;
    })
}

pub fn task(index: u32, created_block: u32, name: &str) -> Task {
    Task {
        index,
        created_block,
        name: name.to_string(),
    }
}
