use super::{HelloWorldContractManager, NewTaskCreated, Task};
use alloy_provider::Provider;
use alloy_pubsub::Subscription;
use alloy_rpc_types::{Filter, Log};
use alloy_sol_types::SolEvent;
use alloy_transport::BoxTransport;
use async_trait::async_trait;
use eigen_utils::types::AvsError;
use futures::stream::{self, BoxStream, StreamExt};
use std::time::Duration;

pub type TaskStream = BoxStream<'static, Result<Task, AvsError>>;

/// How new task logs reach the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFeed {
    /// `eth_subscribe` over a pubsub (WebSocket) connection.
    Subscribe,
    /// `eth_newFilter` + `eth_getFilterChanges` at this interval, for plain HTTP endpoints.
    Poll(Duration),
}

impl TaskFeed {
    /// Subscribes on `ws://` and `wss://` endpoints, polls on anything else.
    pub fn for_url(url: &url::Url, poll_interval: Duration) -> Self {
        match url.scheme() {
            "ws" | "wss" => TaskFeed::Subscribe,
            _ => TaskFeed::Poll(poll_interval),
        }
    }
}

#[async_trait]
pub trait TaskSubscriber: Send + Sync {
    /// Stream of tasks announced from now on. A log that cannot be decoded
    /// shows up as an `Err` item; the stream ends when the connection closes.
    async fn subscribe_to_new_tasks(&self) -> Result<TaskStream, AvsError>;
}

#[async_trait]
impl<P> TaskSubscriber for HelloWorldContractManager<P>
where
    P: Provider<BoxTransport> + Clone + 'static,
{
    async fn subscribe_to_new_tasks(&self) -> Result<TaskStream, AvsError> {
        let filter = Filter::new()
            .address(self.service_manager_addr)
            .event_signature(NewTaskCreated::SIGNATURE_HASH);

        match self.task_feed {
            TaskFeed::Subscribe => {
                let sub: Subscription<Log> = self
                    .eth_client_ws
                    .subscribe_logs(&filter)
                    .await
                    .map_err(|e| AvsError::SubscriptionError(e.to_string()))?;
                log::info!(
                    "Subscribed to NewTaskCreated on {}",
                    self.service_manager_addr
                );
                Ok(sub
                    .into_stream()
                    .map(|log| Task::try_from(&log))
                    .boxed())
            }
            TaskFeed::Poll(interval) => {
                let poller = self
                    .eth_client_ws
                    .watch_logs(&filter)
                    .await
                    .map_err(|e| AvsError::SubscriptionError(e.to_string()))?;
                log::info!(
                    "Polling NewTaskCreated on {} every {:?}",
                    self.service_manager_addr,
                    interval
                );
                Ok(poller
                    .with_poll_interval(interval)
                    .into_stream()
                    .flat_map(stream::iter)
                    .map(|log| Task::try_from(&log))
                    .boxed())
            }
        }
    }
}
