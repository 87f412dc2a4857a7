use std::collections::HashMap;
use std::path::Path;

use crate::error::{LoadError, SaveError};
use crate::store::StoreRecord;

/// Outcome of merging one batch of candidates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InsertReport {
    pub inserted: usize,
    pub duplicates: usize,
    /// Candidates with no usable identity key.
    pub discarded: usize,
}

/// Unique stores keyed by identity, in the order they were first seen.
///
/// The first record observed for an identity is kept; later sightings are
/// dropped even when their fields differ. Not synchronized: one writer only.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    stores: Vec<StoreRecord>,
    index: HashMap<String, usize>,
    discarded: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I>(&mut self, candidates: I) -> InsertReport
    where
        I: IntoIterator<Item = StoreRecord>,
    {
        let mut report = InsertReport::default();
        for candidate in candidates {
            let key = match candidate.identity() {
                Ok(key) => key,
                Err(err) => {
                    tracing::warn!(error = %err, "discarding store without identity");
                    report.discarded += 1;
                    continue;
                }
            };
            if self.index.contains_key(&key) {
                report.duplicates += 1;
                continue;
            }
            self.index.insert(key, self.stores.len());
            self.stores.push(candidate);
            report.inserted += 1;
        }
        self.discarded += report.discarded;
        report
    }

    pub fn snapshot(&self) -> &[StoreRecord] {
        &self.stores
    }

    pub fn size(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub fn get(&self, identity: &str) -> Option<&StoreRecord> {
        self.index.get(identity).map(|&i| &self.stores[i])
    }

    /// Total candidates discarded for a missing identity since creation.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Rebuild a registry from a snapshot file, re-applying first-write-wins.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let file_contents = tokio::fs::read_to_string(path).await?;
        let stores: Vec<StoreRecord> = serde_json::from_str(file_contents.as_str())?;
        let mut registry = Self::new();
        registry.insert(stores);
        Ok(registry)
    }

    /// Write the current contents as a JSON array, replacing the file whole.
    ///
    /// Goes through a sibling temporary file and a rename so readers never see
    /// a half-written snapshot.
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveError> {
        let path = path.as_ref();
        let serialized = serde_json::to_string_pretty(&self.stores)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        tokio::fs::write(&temp_name, serialized).await?;
        tokio::fs::rename(&temp_name, path).await?;
        Ok(())
    }
}
