use std::{path::PathBuf, sync::Arc};

use channelserve::{
    api::{AppState, router},
    catalog::ProgramCatalog,
    config::Config,
    enrich::SlotEnricher,
    library::MediaLibrary,
    schedule::ScheduleEngine,
    store::ChannelStore,
};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
struct Args {
    /// Config file; defaults to ./cserve.toml
    #[clap(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "channelserve=info,server=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config)?;

    let library = Arc::new(MediaLibrary::open(&config.library_dir)?);
    let engine = ScheduleEngine::new(
        ProgramCatalog::new(library.clone()),
        SlotEnricher::new(library, config.enrichment_timeout()),
    );
    let store = ChannelStore::open(&config.channels_file)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "listening");

    let state = Arc::new(AppState {
        config,
        store,
        engine,
    });
    axum::serve(listener, router(state)).await?;
    Ok(())
}
