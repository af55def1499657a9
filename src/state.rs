//! Pipeline state persistence.
//!
//! A small JSON document tracks per-stage status and caches stage results
//! keyed by a content digest, so re-running a pipeline on unchanged input
//! can skip completed GUI round-trips (which are expensive — minutes each).

use log::warn;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// Status of one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub status: StageStatus,
    pub updated_at: u64,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResult {
    pub result: String,
    pub cached_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StateDocument {
    #[serde(default)]
    stages: BTreeMap<String, StageRecord>,
    #[serde(default)]
    cache: BTreeMap<String, CachedResult>,
}

/// JSON-backed pipeline state. Tolerates a missing or corrupt file by
/// starting fresh.
pub struct StateManager {
    path: PathBuf,
    state: StateDocument,
}

impl StateManager {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("state file {} unreadable ({}), starting fresh", path.display(), e);
                StateDocument::default()
            }),
            Err(_) => StateDocument::default(),
        };
        Self { path, state }
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.state)
            .map_err(|e| crate::error::S2tsError::Other(e.to_string()))?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Digest used as the cache key for a stage input.
    pub fn cache_key(input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Cached result for a stage input, if present.
    pub fn cached_result(&self, stage: &str, key: &str) -> Option<&str> {
        self.state
            .cache
            .get(&format!("{}_{}", stage, key))
            .map(|c| c.result.as_str())
    }

    /// Cache a stage result and persist.
    pub fn cache_result(&mut self, stage: &str, key: &str, result: &str) -> Result<()> {
        self.state.cache.insert(
            format!("{}_{}", stage, key),
            CachedResult {
                result: result.to_string(),
                cached_at: now_secs(),
            },
        );
        self.save()
    }

    /// Record a stage status transition and persist.
    pub fn update_stage(
        &mut self,
        stage: &str,
        status: StageStatus,
        detail: Option<String>,
    ) -> Result<()> {
        self.state.stages.insert(
            stage.to_string(),
            StageRecord {
                status,
                updated_at: now_secs(),
                detail,
            },
        );
        self.save()
    }

    /// Current status of a stage; `Pending` when never recorded.
    pub fn stage_status(&self, stage: &str) -> StageStatus {
        self.state
            .stages
            .get(stage)
            .map(|r| r.status.clone())
            .unwrap_or(StageStatus::Pending)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
