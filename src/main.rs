use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

use thermal_scout::{AppContext, load_settings};

/// Time given to blocking work after the runtime stops.
const RUNTIME_SHUTDOWN: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Thermal scout starting.");
    let settings = load_settings()?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = runtime.block_on(async move {
        let app = AppContext::start(settings)?;
        tokio::signal::ctrl_c().await?;
        info!("Interrupt received.");
        app.shutdown().await
    });
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN);

    if let Err(e) = &result {
        error!("Thermal scout exited with error: {:?}", e);
    }
    result
}
