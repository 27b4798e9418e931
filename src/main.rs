use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use meldekern::api;
use meldekern::api::types::ApiContext;
use meldekern::config::{self, AppConfig};
use meldekern::core_state::CoreState;
use meldekern::gate::plausibility::PlausibilityCheck;
use meldekern::gate::remote::RemoteExtractor;
use meldekern::gate::{ExtractionGate, GateConfig};
use meldekern::orchestrator::CaseOrchestrator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        version = config::APP_VERSION,
        data_dir = %config.data_dir.display(),
        bind = %config.bind_addr,
        model = %config.model_name,
        "starting {}",
        config::APP_NAME
    );

    let extractor = RemoteExtractor::new(
        &config.inference_url,
        &config.model_name,
        config.extraction_timeout_secs,
    )?;
    let gate = ExtractionGate::new(
        Arc::new(extractor),
        GateConfig {
            confidence_threshold: config.confidence_threshold,
            timeout_secs: config.extraction_timeout_secs,
            checks: PlausibilityCheck::standard(),
        },
    );

    let bind_addr = config.bind_addr;
    let core = Arc::new(CoreState::new(config)?);
    let orchestrator = Arc::new(CaseOrchestrator::new(core, gate));
    let ctx = ApiContext::new(orchestrator);

    let mut server = api::start_api_server(ctx, bind_addr).await?;
    tracing::info!(addr = %server.addr, "listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.shutdown();
    Ok(())
}
