// =============================================================================
// Persistence — repository traits per entity family, flat-file JSON backing
// =============================================================================
//
// The real persistence layer is an external collaborator specified only at
// its boundary. `Repository<T>` names that boundary; `FileRepository<T>`
// is the one concrete implementation wired up by default, storing each
// entity family as a JSON array in its own file with the same
// tmp-then-rename atomic write used by `EngineConfig`.
//
// =============================================================================

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::genetic::EvolutionCycle;
use crate::genome::StrategyGenome;
use crate::trade::Trade;
use crate::treasury::TreasurySnapshot;

/// CRUD boundary one entity family is read and written through.
#[async_trait]
pub trait Repository<T>: Send + Sync
where
    T: Send + Sync,
{
    async fn create(&self, entity: &T) -> Result<()>;
    async fn update(&self, entity: &T) -> Result<()>;
    async fn find(&self, id: Uuid) -> Result<Option<T>>;
    async fn find_all(&self) -> Result<Vec<T>>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Keys an entity by a `Uuid` so `FileRepository` can implement find/update
/// generically.
pub trait Identified {
    fn id(&self) -> Uuid;
}

impl Identified for StrategyGenome {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Identified for Trade {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// One JSON-array-backed file, one entity family. Deserialization
/// failures mark the row invalid and skip it rather than crashing
/// startup.
pub struct FileRepository<T> {
    path: PathBuf,
    cache: RwLock<Vec<T>>,
    _marker: PhantomData<T>,
}

impl<T> FileRepository<T>
where
    T: Clone + Serialize + DeserializeOwned + Identified + Send + Sync,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = Self::load_from_disk(&path);
        Self {
            path,
            cache: RwLock::new(cache),
            _marker: PhantomData,
        }
    }

    fn load_from_disk(path: &Path) -> Vec<T> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<serde_json::Value>>(&content) {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|row| match serde_json::from_value::<T>(row) {
                    Ok(entity) => Some(entity),
                    Err(e) => {
                        warn!(error = %e, path = %path.display(), "skipping invalid persisted row");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "failed to parse persisted file, starting empty");
                Vec::new()
            }
        }
    }

    fn flush(&self) -> Result<()> {
        let rows = self.cache.read();
        let content = serde_json::to_string_pretty(&*rows).context("failed to serialise entities")?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp file {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename tmp file to {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl<T> Repository<T> for FileRepository<T>
where
    T: Clone + Serialize + DeserializeOwned + Identified + Send + Sync,
{
    async fn create(&self, entity: &T) -> Result<()> {
        self.cache.write().push(entity.clone());
        self.flush()
    }

    async fn update(&self, entity: &T) -> Result<()> {
        let mut rows = self.cache.write();
        match rows.iter_mut().find(|e| e.id() == entity.id()) {
            Some(slot) => *slot = entity.clone(),
            None => rows.push(entity.clone()),
        }
        drop(rows);
        self.flush()
    }

    async fn find(&self, id: Uuid) -> Result<Option<T>> {
        Ok(self.cache.read().iter().find(|e| e.id() == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<T>> {
        Ok(self.cache.read().clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.cache.write().retain(|e| e.id() != id);
        self.flush()
    }
}

impl<T> FileRepository<T>
where
    T: Clone + Serialize + DeserializeOwned + Identified + Send + Sync,
{
    /// Drop every row and flush. Used by the reset CLI, not by the running
    /// engine.
    pub fn clear(&self) -> Result<()> {
        self.cache.write().clear();
        self.flush()
    }

    /// Keep only rows matching `keep`, discarding the rest. Used to strip
    /// dead strategies (the graveyard) from the roster on reset.
    pub fn retain(&self, keep: impl Fn(&T) -> bool) -> Result<()> {
        self.cache.write().retain(keep);
        self.flush()
    }
}

/// Evolution cycles are append-only and keyed by generation, not id; they
/// get their own thin repository rather than implementing `Identified`.
pub struct CycleRepository {
    path: PathBuf,
    cache: RwLock<Vec<EvolutionCycle>>,
}

impl CycleRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self {
            path,
            cache: RwLock::new(cache),
        }
    }

    pub fn append(&self, cycle: EvolutionCycle) -> Result<()> {
        self.cache.write().push(cycle);
        self.flush()
    }

    pub fn find_by_generation(&self, generation: u32) -> Option<EvolutionCycle> {
        self.cache
            .read()
            .iter()
            .find(|c| c.generation == generation)
            .cloned()
    }

    pub fn all(&self) -> Vec<EvolutionCycle> {
        self.cache.read().clone()
    }

    pub fn clear(&self) -> Result<()> {
        self.cache.write().clear();
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        let rows = self.cache.read();
        let content = serde_json::to_string_pretty(&*rows)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Single-file treasury snapshot persistence (not a `Repository<T>` since
/// there is exactly one treasury, not a family keyed by id).
pub struct TreasuryRepository {
    path: PathBuf,
}

impl TreasuryRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Option<TreasurySnapshot> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn save(&self, snapshot: &TreasurySnapshot) -> Result<()> {
        let content = serde_json::to_string_pretty(snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
