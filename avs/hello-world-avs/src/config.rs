use crate::avs::subscriber::TaskFeed;
use crate::avs::Task;
use alloy_primitives::Address;
use eigen_utils::crypto::ecdsa::{EcdsaKeyError, OperatorSigner};
use eigen_utils::retry::RetryPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DEPLOYMENTS_DIR: &str = "contracts/deployments";
const DEFAULT_TASK_MESSAGE: &str = "Hello World";
const DEFAULT_TASK_WORKERS: usize = 4;
const DEFAULT_TASK_QUEUE_CAPACITY: usize = 64;
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RPC_MAX_RETRIES: u32 = 3;
const DEFAULT_REGISTRATION_SIG_VALIDITY_SECS: u64 = 60 * 60; // 1 hour
const DEFAULT_TASK_POLL_INTERVAL_SECS: u64 = 4;
const URL_SCHEMES: [&str; 4] = ["http", "https", "ws", "wss"];

pub const PRIVATE_KEY_VAR: &str = "PRIVATE_KEY";
pub const ENV_FILE_VAR: &str = "ENV_FILE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
    #[error("Cannot read deployment file {path}: {reason}")]
    Deployment { path: PathBuf, reason: String },
}

/// Which string the operator hashes and signs for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskMessage {
    /// The same message for every task.
    Fixed(String),
    /// The task's own name.
    TaskName,
}

impl TaskMessage {
    pub fn message_for<'a>(&'a self, task: &'a Task) -> &'a str {
        match self {
            TaskMessage::Fixed(message) => message,
            TaskMessage::TaskName => &task.name,
        }
    }
}

impl Default for TaskMessage {
    fn default() -> Self {
        TaskMessage::Fixed(DEFAULT_TASK_MESSAGE.to_string())
    }
}

impl FromStr for TaskMessage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "name" {
            Ok(TaskMessage::TaskName)
        } else if let Some(message) = s.strip_prefix("fixed:") {
            Ok(TaskMessage::Fixed(message.to_string()))
        } else {
            Err(format!("expected `name` or `fixed:<message>`, got `{s}`"))
        }
    }
}

/// What happens to the operator when responding to one task fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskFailurePolicy {
    /// Stop monitoring and surface the error.
    #[default]
    Halt,
    /// Log the error and keep serving other tasks.
    LogAndContinue,
}

impl FromStr for TaskFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "halt" => Ok(TaskFailurePolicy::Halt),
            "continue" => Ok(TaskFailurePolicy::LogAndContinue),
            other => Err(format!("expected `halt` or `continue`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub delegation_manager: Address,
    pub avs_directory: Address,
    pub service_manager: Address,
    pub stake_registry: Address,
}

#[derive(Deserialize)]
struct CoreDeployment {
    addresses: CoreAddresses,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreAddresses {
    delegation: Address,
    avs_directory: Address,
}

#[derive(Deserialize)]
struct HelloWorldDeployment {
    addresses: HelloWorldAddresses,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HelloWorldAddresses {
    hello_world_service_manager: Address,
    stake_registry: Address,
}

impl ContractAddresses {
    /// Reads `<dir>/core/<chain_id>.json` and `<dir>/hello-world/<chain_id>.json`.
    pub fn from_deployments(dir: &Path, chain_id: u64) -> Result<Self, ConfigError> {
        let core: CoreDeployment =
            read_deployment(&dir.join("core").join(format!("{chain_id}.json")))?;
        let avs: HelloWorldDeployment =
            read_deployment(&dir.join("hello-world").join(format!("{chain_id}.json")))?;
        Ok(Self {
            delegation_manager: core.addresses.delegation,
            avs_directory: core.addresses.avs_directory,
            service_manager: avs.addresses.hello_world_service_manager,
            stake_registry: avs.addresses.stake_registry,
        })
    }
}

fn read_deployment<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Deployment {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| ConfigError::Deployment {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Everything the operator needs, resolved once at startup. The private key
/// is deliberately not part of it; see [`load_operator_signer`].
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub eth_rpc_url: String,
    pub eth_ws_url: String,
    /// Subscription on `ws(s)://` endpoints, log polling otherwise.
    pub task_feed: TaskFeed,
    pub chain_id: u64,
    pub contracts: ContractAddresses,
    pub metadata_uri: String,
    pub register_operator: bool,
    pub task_message: TaskMessage,
    pub task_workers: usize,
    pub task_queue_capacity: usize,
    pub task_failure_policy: TaskFailurePolicy,
    pub rpc_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub rpc_max_retries: u32,
    pub registration_sig_validity: Duration,
}

impl NodeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());
        let require = |var: &'static str| get(var).ok_or(ConfigError::MissingVar(var));

        let eth_rpc_url = require("RPC_URL")?;
        check_url("RPC_URL", &eth_rpc_url)?;
        let eth_ws_url = get("WS_URL").unwrap_or_else(|| eth_rpc_url.clone());
        let task_feed = TaskFeed::for_url(
            &check_url("WS_URL", &eth_ws_url)?,
            secs_or(
                "TASK_POLL_INTERVAL_SECS",
                get("TASK_POLL_INTERVAL_SECS"),
                DEFAULT_TASK_POLL_INTERVAL_SECS,
            )?,
        );

        let chain_id = parse_var("CHAIN_ID", &require("CHAIN_ID")?)?;

        let overrides = [
            get("DELEGATION_MANAGER_ADDRESS"),
            get("AVS_DIRECTORY_ADDRESS"),
            get("SERVICE_MANAGER_ADDRESS"),
            get("STAKE_REGISTRY_ADDRESS"),
        ];
        let contracts = match overrides {
            [Some(delegation), Some(directory), Some(service), Some(stake)] => ContractAddresses {
                delegation_manager: parse_var("DELEGATION_MANAGER_ADDRESS", &delegation)?,
                avs_directory: parse_var("AVS_DIRECTORY_ADDRESS", &directory)?,
                service_manager: parse_var("SERVICE_MANAGER_ADDRESS", &service)?,
                stake_registry: parse_var("STAKE_REGISTRY_ADDRESS", &stake)?,
            },
            _ => {
                let dir = get("DEPLOYMENTS_DIR").unwrap_or_else(|| DEFAULT_DEPLOYMENTS_DIR.into());
                ContractAddresses::from_deployments(Path::new(&dir), chain_id)?
            }
        };

        Ok(Self {
            eth_rpc_url,
            eth_ws_url,
            task_feed,
            chain_id,
            contracts,
            metadata_uri: get("OPERATOR_METADATA_URI").unwrap_or_default(),
            register_operator: parse_or("REGISTER_OPERATOR", get("REGISTER_OPERATOR"), true)?,
            task_message: parse_or("TASK_MESSAGE", get("TASK_MESSAGE"), TaskMessage::default())?,
            task_workers: parse_or("TASK_WORKERS", get("TASK_WORKERS"), DEFAULT_TASK_WORKERS)?
                .max(1),
            task_queue_capacity: parse_or(
                "TASK_QUEUE_CAPACITY",
                get("TASK_QUEUE_CAPACITY"),
                DEFAULT_TASK_QUEUE_CAPACITY,
            )?
            .max(1),
            task_failure_policy: parse_or(
                "TASK_FAILURE_POLICY",
                get("TASK_FAILURE_POLICY"),
                TaskFailurePolicy::default(),
            )?,
            rpc_timeout: secs_or(
                "RPC_TIMEOUT_SECS",
                get("RPC_TIMEOUT_SECS"),
                DEFAULT_RPC_TIMEOUT_SECS,
            )?,
            confirmation_timeout: secs_or(
                "CONFIRMATION_TIMEOUT_SECS",
                get("CONFIRMATION_TIMEOUT_SECS"),
                DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            )?,
            rpc_max_retries: parse_or(
                "RPC_MAX_RETRIES",
                get("RPC_MAX_RETRIES"),
                DEFAULT_RPC_MAX_RETRIES,
            )?,
            registration_sig_validity: secs_or(
                "REGISTRATION_SIG_VALIDITY_SECS",
                get("REGISTRATION_SIG_VALIDITY_SECS"),
                DEFAULT_REGISTRATION_SIG_VALIDITY_SECS,
            )?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.rpc_max_retries, self.rpc_timeout)
    }
}

/// Fills the process environment from `path`, or from the first `.env` found
/// in the working directory and its parents. Variables that are already set
/// keep their value. Returns the file that was read.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => {
            log::info!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) if e.not_found() && path.is_none() => None,
        Err(e) => {
            log::warn!("Ignoring env file: {}", e);
            None
        }
    }
}

/// Loads the operator key from `PRIVATE_KEY`.
pub fn load_operator_signer() -> Result<OperatorSigner, KeyUnavailable> {
    let key = std::env::var(PRIVATE_KEY_VAR).map_err(|_| KeyUnavailable::Missing)?;
    OperatorSigner::from_hex(&key).map_err(KeyUnavailable::Invalid)
}

#[derive(Debug, Error)]
pub enum KeyUnavailable {
    #[error("PRIVATE_KEY is not set")]
    Missing,
    #[error(transparent)]
    Invalid(EcdsaKeyError),
}

fn check_url(var: &'static str, value: &str) -> Result<url::Url, ConfigError> {
    let url = url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        var,
        reason: e.to_string(),
    })?;
    if !URL_SCHEMES.contains(&url.scheme()) {
        return Err(ConfigError::InvalidValue {
            var,
            reason: format!("unsupported scheme `{}`", url.scheme()),
        });
    }
    Ok(url)
}

/// A whole number of seconds, greater than zero.
fn secs_or(var: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    match parse_or(var, value, default)? {
        0 => Err(ConfigError::InvalidValue {
            var,
            reason: "must be greater than zero".to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        reason: e.to_string(),
    })
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    value.map_or(Ok(default), |v| parse_var(var, &v))
}
