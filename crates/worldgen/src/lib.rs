//! Region generation tooling for the terrain engine.
//!
//! Deterministic elevation fixtures, a seam audit over stored regions, and
//! the configuration behind the `generate` binary.
//!
//! ```rust,ignore
//! use worldgen::prelude::*;
//!
//! let walker = GridWalker::new(&config, TileStore::new_in_memory(), Arc::new(DetachedNoise::new(7)))?;
//! walker.walk(5).await?;
//! let report = audit_region(walker.store(), 5).await?;
//! assert!(report.is_converged(1e-4));
//! ```

pub mod audit;
pub mod config;
pub mod fixtures;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::audit::{AuditReport, SeamReport, audit_region};
    pub use crate::config::{GenerateConfig, SourceMode};
    pub use crate::fixtures::{DetachedNoise, PlateauElevation};
    pub use terrain::{
        config::TerrainConfig, coord::TileCoord, edges::Edge, store::TileStore,
        walker::GridWalker,
    };
}
