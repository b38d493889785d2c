// @file: src/utils/snapshot.rs
// @description: Single-file JSON snapshots of fetched OI tables, used to diff consecutive scans.
// @author: LAS.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use log::info;
use serde::{Deserialize, Serialize};

use crate::core::errors::FetchResult;
use crate::core::models::ResultTable;

//
// TYPE DEFINITIONS
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub key: String,
    pub captured_at: u64, // Unix seconds
    pub table: ResultTable,
}

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl AsRef<Path>) -> FetchResult<Self> {
        let dir: PathBuf = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    //
    // PUBLIC INTERFACE
    //

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}_oi.json", key.to_uppercase()))
    }

    pub fn save(&self, key: &str, table: &ResultTable) -> FetchResult<Snapshot> {
        let snapshot: Snapshot = Snapshot {
            key: key.to_uppercase(),
            captured_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            table: table.clone(),
        };

        let path: PathBuf = self.path_for(key);
        fs::write(&path, serde_json::to_string_pretty(&snapshot)?)?;

        info!("Saved {} rows for {} at {:?}", table.len(), snapshot.key, path);
        Ok(snapshot)
    }

    pub fn load(&self, key: &str) -> FetchResult<Option<Snapshot>> {
        let path: PathBuf = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let json: String = fs::read_to_string(&path)?;
        let snapshot: Snapshot = serde_json::from_str(&json)?;
        Ok(Some(snapshot))
    }

    pub fn list(&self) -> FetchResult<Vec<String>> {
        let mut keys: Vec<String> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name: String = entry?.file_name().to_string_lossy().to_string();
            if let Some(key) = name.strip_suffix("_oi.json") {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    pub fn clear(&self, key: &str) -> FetchResult<bool> {
        let path: PathBuf = self.path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}


//
// UNIT TESTS
//
