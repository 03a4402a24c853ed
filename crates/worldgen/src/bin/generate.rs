//! Pre-generates a region of blended tiles into a local tile store.
//!
//! Run with:
//! ```
//! REGION_RADIUS=7 SOURCE_MODE=detached cargo run -p worldgen --bin generate
//! ```

use terrain::{store::TileStore, walker::GridWalker};
use tracing_subscriber::EnvFilter;
use worldgen::{audit::audit_region, config::GenerateConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GenerateConfig::from_env()?;

    tracing::info!(
        store = %config.store_path,
        radius = config.radius,
        source = ?config.source,
        preset = ?config.preset,
        seed = config.seed,
        "Generating region"
    );

    let store = TileStore::new_local(&config.store_path)?;
    let walker = GridWalker::new(&config.terrain, store, config.elevation_source())?;

    let summary = walker.walk(config.radius).await?;
    let report = audit_region(walker.store(), config.radius).await?;

    tracing::info!(
        visited = summary.visited,
        generated = summary.generated,
        skipped = summary.skipped,
        seams = summary.seams_blended,
        corners = summary.corners_reconciled,
        written = summary.tiles_written,
        max_gap = report.max_disagreement(),
        "Generation completed"
    );

    if !report.is_converged(config.terrain.merge_tolerance) {
        if let Some(worst) = report.worst() {
            tracing::warn!(
                tile = %worst.tile,
                edge = %worst.edge,
                gap = worst.disagreement,
                "Region has unconverged seams"
            );
        }
        anyhow::bail!("region did not converge");
    }

    Ok(())
}
