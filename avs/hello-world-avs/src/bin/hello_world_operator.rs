use alloy_provider::ProviderBuilder;
use hello_world_avs::config::{load_env_file, load_operator_signer, NodeConfig, ENV_FILE_VAR};
use std::path::PathBuf;
use hello_world_avs::operator::{Operator, OperatorError};

#[tokio::main]
async fn main() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    if let Err(e) = run().await {
        log::error!("Operator stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), OperatorError> {
    let env_file = std::env::var_os(ENV_FILE_VAR).map(PathBuf::from);
    load_env_file(env_file.as_deref());
    let config = NodeConfig::from_env()?;
    let signer = load_operator_signer()?;
    log::info!("Loaded operator key for {}", signer.address());

    log::info!("Creating HTTP Provider...");
    let http_provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(signer.wallet())
        .on_builtin(&config.eth_rpc_url)
        .await
        .map_err(|e| OperatorError::HttpEthClientError(e.to_string()))?;

    log::info!("Creating WS Provider...");
    let ws_provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(signer.wallet())
        .on_builtin(&config.eth_ws_url)
        .await
        .map_err(|e| OperatorError::WsEthClientError(e.to_string()))?;

    let operator = Operator::new_from_config(config, http_provider, ws_provider, signer).await?;

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl-C"),
            Err(e) => {
                log::error!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let summary = operator.start(shutdown).await?;
    log::info!(
        "Operator finished: {} tasks answered, {} failed",
        summary.succeeded,
        summary.failed
    );
    Ok(())
}
