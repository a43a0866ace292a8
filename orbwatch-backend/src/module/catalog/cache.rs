///! Age-bounded on-disk cache of fetched payloads
///!
///! Layout: `<root>/<group>/<YYYYmmdd_HHMMSS_ffffff>.<ext>`, one immutable
///! file per successful network fetch, plus an optional best-effort pointer
///! file holding the path of the newest entry.
use chrono::{DateTime, Utc};
use orbwatch_common::FetchOrigin;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::source::FeedSource;
use super::validator::{validate_elements, validate_json};
use crate::error::{CatalogError, ValidationError};

/// Structural check run on a network payload before it is persisted
pub type PayloadValidator = fn(&str) -> Result<(), ValidationError>;

const CREATE_ATTEMPTS: u32 = 3;

/// Storage and freshness parameters for one logical feed
#[derive(Clone)]
pub struct CachePolicy {
    /// Short label used in logs
    pub name: &'static str,
    /// Directory holding one subdirectory per group
    pub root: PathBuf,
    pub extension: &'static str,
    /// Default freshness window
    pub max_age: Duration,
    pub pointer_file: Option<PathBuf>,
    pub validator: PayloadValidator,
}

impl CachePolicy {
    /// Element sets: `<data>/tle/<group>/*.tle`, pointer `<data>/latest_tle.txt`.
    pub fn elements(data_root: impl AsRef<Path>, max_age: Duration) -> Self {
        let data_root = data_root.as_ref();
        Self {
            name: "elements",
            root: data_root.join("tle"),
            extension: "tle",
            max_age,
            pointer_file: Some(data_root.join("latest_tle.txt")),
            validator: |text| validate_elements(text).map(|_| ()),
        }
    }

    /// Element sets resolved by object name: `<data>/famous_tles/<group>/*.tle`.
    pub fn named(data_root: impl AsRef<Path>, max_age: Duration) -> Self {
        Self {
            name: "famous",
            root: data_root.as_ref().join("famous_tles"),
            extension: "tle",
            max_age,
            pointer_file: None,
            validator: |text| validate_elements(text).map(|_| ()),
        }
    }

    /// Auxiliary JSON feeds: `<data>/cache/<group>/*.json`.
    pub fn feed(data_root: impl AsRef<Path>, max_age: Duration) -> Self {
        let cache_root = data_root.as_ref().join("cache");
        Self {
            name: "feed",
            pointer_file: Some(cache_root.join("latest_feed.txt")),
            root: cache_root,
            extension: "json",
            max_age,
            validator: validate_json,
        }
    }
}

/// One immutable cached payload
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub group: String,
    pub file_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub raw_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub entry: CacheEntry,
    pub origin: FetchOrigin,
}

/// Cache manager for one policy, backed by a network source
pub struct FreshnessCache {
    policy: CachePolicy,
    source: Arc<dyn FeedSource>,
}

fn check_group(group: &str) -> Result<(), CatalogError> {
    let bad = group.trim().is_empty()
        || group.contains('/')
        || group.contains('\\')
        || group.contains("..");
    if bad {
        return Err(CatalogError::Validation {
            group: group.to_string(),
            source: ValidationError::InvalidGroup(group.to_string()),
        });
    }
    Ok(())
}

impl FreshnessCache {
    pub fn new(policy: CachePolicy, source: Arc<dyn FeedSource>) -> Self {
        Self { policy, source }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    fn group_dir(&self, group: &str) -> PathBuf {
        self.policy.root.join(group)
    }

    /// Cached files for `group`, oldest first.
    pub async fn entries(&self, group: &str) -> Result<Vec<PathBuf>, CatalogError> {
        check_group(group)?;
        let dir = self.group_dir(group);

        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CatalogError::io(&dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| CatalogError::io(&dir, e))? {
            let path = entry.path();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let matches_ext = path.extension().is_some_and(|ext| ext == self.policy.extension);
            if is_file && matches_ext {
                files.push(path);
            }
        }

        // Names are timestamps, so lexicographic order is chronological
        files.sort();
        Ok(files)
    }

    async fn read_entry(&self, group: &str, path: &Path) -> Result<CacheEntry, CatalogError> {
        let bytes = fs::read(path).await.map_err(|e| CatalogError::io(path, e))?;
        let metadata = fs::metadata(path).await.map_err(|e| CatalogError::io(path, e))?;
        let created_at: DateTime<Utc> = metadata.modified().map(Into::into).unwrap_or_else(|_| Utc::now());

        Ok(CacheEntry {
            group: group.to_string(),
            file_path: path.to_path_buf(),
            created_at,
            raw_text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Age of a cache file by its modification time.
    ///
    /// A modification time in the future counts as age zero.
    async fn file_age(path: &Path) -> Result<Duration, CatalogError> {
        let metadata = fs::metadata(path).await.map_err(|e| CatalogError::io(path, e))?;
        let modified = metadata.modified().map_err(|e| CatalogError::io(path, e))?;
        Ok(SystemTime::now().duration_since(modified).unwrap_or_default())
    }

    /// Return the newest entry if it is within `max_age`, otherwise fetch,
    /// validate and persist a new one.
    ///
    /// Network and validation failures are returned as-is; a stale entry
    /// is never served in their place.
    pub async fn fetch(&self, group: &str, max_age: Option<Duration>) -> Result<FetchOutcome, CatalogError> {
        check_group(group)?;
        let max_age = max_age.unwrap_or(self.policy.max_age);

        if let Some(latest) = self.entries(group).await?.pop() {
            let age = Self::file_age(&latest).await?;
            if age <= max_age {
                debug!(
                    "[{}] cache hit for '{}': {:?} (age {}s)",
                    self.policy.name,
                    group,
                    latest,
                    age.as_secs()
                );
                let entry = self.read_entry(group, &latest).await?;
                return Ok(FetchOutcome {
                    entry,
                    origin: FetchOrigin::Cache,
                });
            }
            debug!(
                "[{}] cache for '{}' is stale (age {}s > {}s)",
                self.policy.name,
                group,
                age.as_secs(),
                max_age.as_secs()
            );
        }

        info!("[{}] fetching '{}' from network", self.policy.name, group);
        let text = self
            .source
            .fetch(group)
            .await
            .map_err(|source| CatalogError::Transient {
                group: group.to_string(),
                source,
            })?;

        (self.policy.validator)(&text).map_err(|source| CatalogError::Validation {
            group: group.to_string(),
            source,
        })?;

        let entry = self.persist(group, text).await?;
        self.write_pointer(&entry.file_path).await;

        info!(
            "[{}] saved '{}' to {:?} ({} bytes)",
            self.policy.name,
            group,
            entry.file_path,
            entry.raw_text.len()
        );

        Ok(FetchOutcome {
            entry,
            origin: FetchOrigin::Network,
        })
    }

    /// Write a new immutable entry; existing files are never overwritten.
    async fn persist(&self, group: &str, text: String) -> Result<CacheEntry, CatalogError> {
        let dir = self.group_dir(group);
        fs::create_dir_all(&dir).await.map_err(|e| CatalogError::io(&dir, e))?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let created_at = Utc::now();
            let file_name = format!("{}.{}", created_at.format("%Y%m%d_%H%M%S_%6f"), self.policy.extension);
            let path = dir.join(file_name);

            let open = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            let mut file = match open {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < CREATE_ATTEMPTS => {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    continue;
                }
                Err(e) => return Err(CatalogError::io(&path, e)),
            };

            file.write_all(text.as_bytes())
                .await
                .map_err(|e| CatalogError::io(&path, e))?;
            file.flush().await.map_err(|e| CatalogError::io(&path, e))?;

            return Ok(CacheEntry {
                group: group.to_string(),
                file_path: path,
                created_at,
                raw_text: text,
            });
        }
    }

    /// Best effort: a failure here is logged and otherwise ignored.
    async fn write_pointer(&self, target: &Path) {
        let Some(pointer) = &self.policy.pointer_file else {
            return;
        };

        let resolved = fs::canonicalize(target).await.unwrap_or_else(|_| target.to_path_buf());
        if let Some(parent) = pointer.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                warn!("Failed to create pointer directory {:?}: {}", parent, e);
                return;
            }
        }
        if let Err(e) = fs::write(pointer, resolved.to_string_lossy().as_bytes()).await {
            warn!("Failed to update latest pointer {:?}: {}", pointer, e);
        }
    }

    /// Newest entry for `group` regardless of age.
    ///
    /// For explicit offline use only; `fetch` never falls back to this.
    pub async fn latest_entry(&self, group: &str) -> Result<Option<CacheEntry>, CatalogError> {
        match self.entries(group).await?.pop() {
            Some(path) => Ok(Some(self.read_entry(group, &path).await?)),
            None => Ok(None),
        }
    }

    pub async fn read_latest(&self, group: &str) -> Result<Option<String>, CatalogError> {
        Ok(self.latest_entry(group).await?.map(|e| e.raw_text))
    }
}
