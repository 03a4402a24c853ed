use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::OwnedMutexGuard;

use crate::coord::TileCoord;

/// Exclusive per-tile locks shared by every walk touching one store.
#[derive(Clone, Default)]
pub struct TileLocks {
    locks: Arc<Mutex<HashMap<TileCoord, Arc<tokio::sync::Mutex<()>>>>>,
}

impl TileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks every coordinate in `coords`, waiting for each in turn.
    ///
    /// Coordinates are taken in sorted order with duplicates removed, so two
    /// callers with overlapping sets cannot deadlock. Dropping the returned
    /// guards releases the tiles.
    pub async fn lock_many(
        &self,
        coords: impl IntoIterator<Item = TileCoord>,
    ) -> Vec<OwnedMutexGuard<()>> {
        let mut coords: Vec<TileCoord> = coords.into_iter().collect();
        coords.sort();
        coords.dedup();

        let mutexes: Vec<_> = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only the map still references are neither held nor awaited.
            locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            coords
                .iter()
                .map(|coord| locks.entry(*coord).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }
        guards
    }

    /// Number of coordinates currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for TileLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLocks")
            .field("tracked", &self.tracked())
            .finish()
    }
}
