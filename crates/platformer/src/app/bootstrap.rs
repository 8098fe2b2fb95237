use std::env;
use std::path::Path;

use jumpcore::{
    load_pipeline_config, EnvironmentSignals, GovernorHandle, PerformanceGovernor, PipelineConfig,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::loop_runner::{AppError, LoopConfig};

pub(crate) const CONFIG_ENV_VAR: &str = "JUMPLAB_CONFIG";

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) pipeline_config: PipelineConfig,
    pub(crate) governor: GovernorHandle,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Jump Lab Startup ===");

    let pipeline_config = resolve_pipeline_config()?;
    let signals = EnvironmentSignals::from_env();
    let classification = signals.classify(pipeline_config.governor.signal_weights);
    info!(
        environment = %classification.kind,
        production_weight = classification.production_weight,
        checked_weight = classification.checked_weight,
        hostname = signals.hostname.as_deref().unwrap_or("-"),
        "environment_classified"
    );
    let governor = GovernorHandle::new(PerformanceGovernor::new(
        pipeline_config.governor.clone(),
        classification.kind,
    ));

    Ok(AppWiring {
        loop_config: LoopConfig::default(),
        pipeline_config,
        governor,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// A config path that is set but unreadable or invalid aborts startup; an
/// unset variable means built-in defaults.
fn resolve_pipeline_config() -> Result<PipelineConfig, AppError> {
    match env::var(CONFIG_ENV_VAR) {
        Ok(path) => {
            let config = load_pipeline_config(Path::new(&path))?;
            info!(path = path.as_str(), "pipeline_config_loaded");
            Ok(config)
        }
        Err(env::VarError::NotPresent) => Ok(PipelineConfig::default()),
        Err(err) => {
            warn!(
                env_var = CONFIG_ENV_VAR,
                error = %err,
                "unable to read config env var; falling back to defaults"
            );
            Ok(PipelineConfig::default())
        }
    }
}
