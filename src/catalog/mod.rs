pub mod query;

pub use query::{ListingFilters, LocationFacets};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::models::Property;

/// JSON-file backed store for every listing.
///
/// Readers get the in-memory snapshot. Writers go through [`CatalogStore::begin`],
/// which serialises them, re-reads the file, and replaces the snapshot on
/// commit, so reads observe every committed write.
pub struct CatalogStore {
    path: PathBuf,
    snapshot: RwLock<Arc<Vec<Property>>>,
    writer: Mutex<()>,
}

impl CatalogStore {
    /// Load the catalog at startup. A missing or unreadable file yields an
    /// empty catalog so the public pages can still be served.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let properties = match read_file(&path).await {
            Ok(properties) => properties,
            Err(e) => {
                error!(path = %path.display(), error = %e, "could not load catalog");
                Vec::new()
            }
        };
        info!("Loaded {} properties into memory", properties.len());

        Self {
            path,
            snapshot: RwLock::new(Arc::new(properties)),
            writer: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> Arc<Vec<Property>> {
        self.snapshot.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Property> {
        self.snapshot().await.iter().find(|p| p.id == id).cloned()
    }

    /// Start a read-modify-write cycle. Other writers wait until the
    /// returned transaction is committed or dropped.
    pub async fn begin(&self) -> Result<CatalogTransaction<'_>> {
        let guard = self.writer.lock().await;
        let records = read_file(&self.path).await?;
        Ok(CatalogTransaction {
            store: self,
            records,
            _guard: guard,
        })
    }
}

pub struct CatalogTransaction<'a> {
    store: &'a CatalogStore,
    records: Vec<Property>,
    _guard: MutexGuard<'a, ()>,
}

impl CatalogTransaction<'_> {
    pub fn find(&self, id: &str) -> Option<&Property> {
        self.records.iter().find(|p| p.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Property> {
        self.records.iter_mut().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Whether any record already points its title or description at `key`
    pub fn uses_text_key(&self, key: &str) -> bool {
        self.records
            .iter()
            .any(|p| p.title_key == key || p.description_key == key)
    }

    pub fn push(&mut self, property: Property) {
        self.records.push(property);
    }

    /// Rewrite the whole file and publish the new snapshot.
    pub async fn commit(self) -> Result<()> {
        write_file(&self.store.path, &self.records).await?;
        info!(count = self.records.len(), "catalog written");
        *self.store.snapshot.write().await = Arc::new(self.records);
        Ok(())
    }
}

async fn read_file(path: &Path) -> Result<Vec<Property>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "catalog file missing, starting empty");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_file(path: &Path, records: &[Property]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(records)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
