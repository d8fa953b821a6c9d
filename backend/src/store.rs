use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::StoreError,
    models::{Coordinate, Walk},
};

/// Bump whenever the persisted walk shape changes; older snapshots are then
/// discarded and the bundled library is loaded again.
pub const SCHEMA_VERSION: &str = "walkbook-v1";

/// Library shipped with the binary.
pub const BUNDLED_WALKS: &str = include_str!("../data/walks.json");

/// Routed fields of a walk; everything else stays as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteUpdate {
    pub waypoints: Vec<Coordinate>,
    pub distance: String,
    pub time: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    version: String,
    saved_at: DateTime<Utc>,
    walks: Vec<Walk>,
}

/// Working set of walks, written through to a JSON snapshot on every change.
///
/// Each mutation rewrites the whole snapshot. A failed write leaves the
/// in-memory set untouched.
#[derive(Debug)]
pub struct WalkStore {
    path: PathBuf,
    walks: Vec<Walk>,
}

impl WalkStore {
    /// Open the snapshot at `path`, or seed it from `default_dataset` (a JSON
    /// array of walks) when it is missing, unreadable or from another schema
    /// version.
    pub fn load(path: impl Into<PathBuf>, default_dataset: &str) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(walks) = read_snapshot(&path) {
            tracing::info!("loaded {} walks from {}", walks.len(), path.display());
            return Ok(Self { path, walks });
        }

        let walks: Vec<Walk> = serde_json::from_str(default_dataset)?;
        tracing::info!("seeding walk store with {} bundled walks", walks.len());
        write_snapshot(&path, &walks)?;
        Ok(Self { path, walks })
    }

    /// Open the configured store, seeding from `WALKS_DATASET` when set and
    /// from the bundled library otherwise.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        match &config.dataset_path {
            Some(dataset) => {
                let defaults = fs::read_to_string(dataset)?;
                Self::load(&config.store_path, &defaults)
            }
            None => Self::load(&config.store_path, BUNDLED_WALKS),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn walks(&self) -> &[Walk] {
        &self.walks
    }

    pub fn find(&self, name: &str) -> Option<&Walk> {
        self.walks.iter().find(|walk| walk.name == name)
    }

    pub fn add(&mut self, walk: Walk) -> Result<(), StoreError> {
        let mut next = self.walks.clone();
        tracing::debug!("adding walk '{}'", walk.name);
        next.push(walk);
        self.commit(next)
    }

    /// Swap in `walk` for the stored walk with the same name.
    pub fn replace(&mut self, walk: Walk) -> Result<(), StoreError> {
        let idx = self
            .walks
            .iter()
            .position(|existing| existing.name == walk.name)
            .ok_or_else(|| StoreError::NotFound(walk.name.clone()))?;
        let mut next = self.walks.clone();
        next[idx] = walk;
        self.commit(next)
    }

    /// Overwrite path, distance and time of the walk currently stored as `name`.
    pub fn update_route(&mut self, name: &str, route: RouteUpdate) -> Result<(), StoreError> {
        let idx = self
            .walks
            .iter()
            .position(|existing| existing.name == name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let mut next = self.walks.clone();
        let walk = &mut next[idx];
        walk.waypoints = route.waypoints;
        walk.distance = route.distance;
        walk.time = route.time;
        self.commit(next)
    }

    pub fn replace_all(&mut self, walks: Vec<Walk>) -> Result<(), StoreError> {
        tracing::debug!("replacing walk library with {} walks", walks.len());
        self.commit(walks)
    }

    /// Apply `update` to every walk and persist once.
    pub fn update_all(&mut self, update: impl FnMut(&mut Walk)) -> Result<(), StoreError> {
        let mut next = self.walks.clone();
        next.iter_mut().for_each(update);
        self.commit(next)
    }

    fn commit(&mut self, walks: Vec<Walk>) -> Result<(), StoreError> {
        write_snapshot(&self.path, &walks)?;
        self.walks = walks;
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Option<Vec<Walk>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!("ignoring unreadable walk store {}: {}", path.display(), err);
            return None;
        }
    };

    match serde_json::from_str::<Snapshot>(&content) {
        Ok(snapshot) if snapshot.version == SCHEMA_VERSION => Some(snapshot.walks),
        Ok(snapshot) => {
            tracing::info!(
                "discarding walk store with schema {} (current {})",
                snapshot.version,
                SCHEMA_VERSION
            );
            None
        }
        Err(err) => {
            tracing::warn!("ignoring corrupt walk store {}: {}", path.display(), err);
            None
        }
    }
}

fn write_snapshot(path: &Path, walks: &[Walk]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let snapshot = Snapshot {
        version: SCHEMA_VERSION.to_string(),
        saved_at: Utc::now(),
        walks: walks.to_vec(),
    };
    let data = serde_json::to_string_pretty(&snapshot)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
