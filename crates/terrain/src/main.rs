use std::{env, sync::Arc};

use terrain::{
    config::{TerrainConfig, env_or},
    elevation::{NoiseElevation, NoisePreset},
    run_server,
    store::TileStore,
    walker::GridWalker,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = TerrainConfig::from_env()?;

    let store_path = env::var("TILE_STORE_PATH").unwrap_or_else(|_| "./tiles".to_string());
    let port: u16 = env_or("PORT", 3002)?;
    let seed: u32 = env_or("NOISE_SEED", 0)?;
    let preset: NoisePreset = env_or("NOISE_PRESET", NoisePreset::default())?;

    tracing::info!(
        store = %store_path,
        tile_size = config.tile_size,
        segments = config.segments,
        falloff_depth = config.falloff_depth,
        ?preset,
        seed,
        "Starting terrain server"
    );

    let store = TileStore::new_local(&store_path)?;
    let source = Arc::new(NoiseElevation::from_preset(preset, seed));
    let walker = GridWalker::new(&config, store, source)?;

    run_server(walker, port).await
}
