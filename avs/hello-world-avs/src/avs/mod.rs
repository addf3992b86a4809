pub mod subscriber;

use subscriber::TaskFeed;

use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_rpc_types::Log;
use alloy_transport::BoxTransport;
use eigen_utils::types::AvsError;

pub use eigen_contracts::HelloWorldServiceManager;
pub use eigen_contracts::HelloWorldServiceManager::NewTaskCreated;

/// A task announced by the service manager. Read once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub index: u32,
    pub created_block: u32,
    pub name: String,
}

impl From<NewTaskCreated> for Task {
    fn from(event: NewTaskCreated) -> Self {
        Self {
            index: event.taskIndex,
            created_block: event.task.taskCreatedBlock,
            name: event.task.name,
        }
    }
}

impl TryFrom<&Log> for Task {
    type Error = AvsError;

    fn try_from(log: &Log) -> Result<Self, Self::Error> {
        let decoded = log
            .log_decode::<NewTaskCreated>()
            .map_err(|e| AvsError::EventDecodeError(e.to_string()))?;
        Ok(Task::from(decoded.inner.data))
    }
}

#[derive(Debug, Clone)]
pub struct HelloWorldContractManager<P> {
    pub service_manager_addr: Address,
    pub eth_client_http: P,
    pub eth_client_ws: P,
    pub task_feed: TaskFeed,
}

impl<P> HelloWorldContractManager<P>
where
    P: Provider<BoxTransport> + Clone + 'static,
{
    pub fn build(
        service_manager_addr: Address,
        eth_client_http: P,
        eth_client_ws: P,
        task_feed: TaskFeed,
    ) -> Self {
        Self {
            service_manager_addr,
            eth_client_http,
            eth_client_ws,
            task_feed,
        }
    }

    /// Number of tasks created so far.
    pub async fn latest_task_num(&self) -> Result<u32, AvsError> {
        let service_manager =
            HelloWorldServiceManager::new(self.service_manager_addr, self.eth_client_http.clone());
        service_manager
            .latestTaskNum()
            .call()
            .await
            .map(|x| x._0)
            .map_err(AvsError::from)
    }
}
