use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stafacade::config::Settings;
use stafacade::identity::IdentityStore;
use stafacade::resolver::Resolver;
use stafacade::server;
use stafacade::translate::Translator;
use stafacade::upstream::HttpUpstream;

#[tokio::main]
async fn main() {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level)))
        .init();

    info!("Configuration: {:?}", settings);

    if let Err(e) = run(settings).await {
        tracing::error!(error = %e, "service stopped");
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> stafacade::Result<()> {
    let mode = settings.persistence_mode()?;
    let store = Arc::new(IdentityStore::open(&mode)?);
    info!(?mode, references = store.len()?, "identity store opened");

    let upstream = Arc::new(HttpUpstream::new(&settings.upstream_url, settings.upstream_timeout())?);
    let translator = Translator::new(&settings.service_root, store);
    let resolver = Arc::new(Resolver::new(upstream, translator));

    let listener = tokio::net::TcpListener::bind(&settings.listen_addr).await?;
    info!(addr = %settings.listen_addr, root = %settings.service_root, "serving SensorThings API");
    axum::serve(listener, server::router(resolver)).await?;
    Ok(())
}
