//! Tile persistence keyed by grid coordinate.

use std::sync::Arc;

use bytes::Bytes;
use object_store::{
    ObjectStore, PutPayload, local::LocalFileSystem, memory::InMemory, path::Path,
};

use crate::{
    coord::TileCoord, errors::TerrainError, locks::TileLocks, mesh::TileMesh,
    models::TilePayload,
};

const TILE_PREFIX: &str = "tiles";
const TILE_EXTENSION: &str = ".json";

/// Added to each coordinate so names stay fixed-width and sort numerically.
const COORD_BIAS: i64 = 50_000_000;
const COORD_DIGITS: usize = 8;
const COORD_LIMIT: i64 = 100_000_000;

/// File name of the tile at `coord`, e.g. `50000000-49999999.json` for `(0, -1)`.
pub fn tile_file_name(coord: TileCoord) -> Result<String, TerrainError> {
    let encode = |value: i32| {
        let biased = i64::from(value) + COORD_BIAS;
        (0..COORD_LIMIT)
            .contains(&biased)
            .then(|| format!("{biased:0width$}", width = COORD_DIGITS))
    };

    match (encode(coord.x), encode(coord.z)) {
        (Some(x), Some(z)) => Ok(format!("{x}-{z}{TILE_EXTENSION}")),
        _ => Err(TerrainError::InvalidCoordinate(coord)),
    }
}

/// Inverse of [`tile_file_name`]; `None` for anything that is not a tile name.
pub fn parse_tile_file_name(name: &str) -> Option<TileCoord> {
    let decode = |token: &str| -> Option<i32> {
        if token.len() != COORD_DIGITS || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let biased: i64 = token.parse().ok()?;
        i32::try_from(biased - COORD_BIAS).ok()
    };

    let (x, z) = name.strip_suffix(TILE_EXTENSION)?.split_once('-')?;
    Some(TileCoord::new(decode(x)?, decode(z)?))
}

/// Stores one JSON payload per tile under `tiles/`.
///
/// A `save` that returns `Ok` is visible to every later `load`; the local
/// backend stages writes in a temporary file and renames it into place.
///
/// Clones share the backend and one set of [`TileLocks`], which every
/// read-modify-write of stored tiles goes through.
#[derive(Clone, Debug)]
pub struct TileStore {
    store: Arc<dyn ObjectStore>,
    locks: TileLocks,
}

impl TileStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            locks: TileLocks::new(),
        }
    }

    /// Per-tile write locks for this store.
    pub fn locks(&self) -> &TileLocks {
        &self.locks
    }

    /// Tiles stored as files under `base_path`, which is created if missing.
    pub fn new_local(base_path: impl AsRef<std::path::Path>) -> Result<Self, TerrainError> {
        let base_path = base_path.as_ref();
        std::fs::create_dir_all(base_path.join(TILE_PREFIX))?;
        let store = LocalFileSystem::new_with_prefix(base_path)?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn new_in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    fn object_path(coord: TileCoord) -> Result<Path, TerrainError> {
        Ok(Path::from(format!("{TILE_PREFIX}/{}", tile_file_name(coord)?)))
    }

    pub async fn exists(&self, coord: TileCoord) -> Result<bool, TerrainError> {
        let path = Self::object_path(coord)?;
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn load(&self, coord: TileCoord) -> Result<TileMesh, TerrainError> {
        let path = Self::object_path(coord)?;

        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(TerrainError::TileNotFound(coord));
            }
            Err(e) => return Err(e.into()),
        };
        let bytes = result.bytes().await?;

        let payload: TilePayload =
            serde_json::from_slice(&bytes).map_err(|e| TerrainError::CorruptTile {
                tile: coord,
                reason: e.to_string(),
            })?;

        TileMesh::from_payload(coord, payload)
    }

    /// Like [`TileStore::load`], but an absent tile is `None` rather than an error.
    pub async fn try_load(&self, coord: TileCoord) -> Result<Option<TileMesh>, TerrainError> {
        match self.load(coord).await {
            Ok(tile) => Ok(Some(tile)),
            Err(TerrainError::TileNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes `tile` at its own coordinate, replacing any stored version.
    pub async fn save(&self, tile: &TileMesh) -> Result<(), TerrainError> {
        let coord = tile.coord();
        let path = Self::object_path(coord)?;

        let body = serde_json::to_vec(&tile.to_payload()).map_err(|e| {
            TerrainError::CorruptTile {
                tile: coord,
                reason: format!("failed to serialize: {e}"),
            }
        })?;

        self.store
            .put(&path, PutPayload::from(Bytes::from(body)))
            .await?;

        tracing::debug!(tile = %coord, %path, "Saved tile");
        Ok(())
    }

    /// Coordinates of every stored tile, sorted.
    pub async fn list(&self) -> Result<Vec<TileCoord>, TerrainError> {
        let prefix = Path::from(TILE_PREFIX);
        let listing = self.store.list_with_delimiter(Some(&prefix)).await?;

        let mut coords: Vec<TileCoord> = listing
            .objects
            .iter()
            .filter_map(|meta| meta.location.filename())
            .filter_map(parse_tile_file_name)
            .collect();
        coords.sort();
        Ok(coords)
    }
}
