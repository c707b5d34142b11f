//! Process wide store of reference numbering records.
//!
//! Registry responses are fetched at most once per accession: the raw JSON
//! body is persisted under the cache folder and parsed records are kept in
//! memory for the lifetime of the [`ReferenceNumberingCache`]. Failed lookups
//! are never stored, so they are retried on the next request.
//!
//! On disk, a response for accession `P41143` lives at
//! `<cache_folder>/residues/P/4/P41143.json`.

use std::collections::HashMap;
use std::fs::{self, create_dir_all, read_dir, remove_dir, remove_file};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, anyhow};
use dynacon_core::Config;
use dynacon_core::config::get_default_cache_folder;
use dynacon_core::consts::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_REGISTRY_API, RESIDUES_EXT, RESIDUES_SUBFOLDER};
use dynacon_core::models::{ReferenceResidueRecord, parse_reference_records};
use log::{debug, info, warn};

use crate::errors::{NumberingError, Result};

/// Source of reference residue records, keyed by accession.
pub trait ResidueRegistry: Send + Sync {
    ///
    /// Fetch the raw JSON body describing every residue of `accession`.
    ///
    /// Transport failures and non-success responses are
    /// [`NumberingError::ReferenceLookupFailed`].
    ///
    fn fetch(&self, accession: &str) -> Result<Vec<u8>>;
}

/// Registry served over HTTP: `POST <api><accession>`.
pub struct HttpResidueRegistry {
    api: String,
    client: reqwest::blocking::Client,
}

impl HttpResidueRegistry {
    pub fn new(api: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpResidueRegistry {
            api: api.to_string(),
            client,
        })
    }
}

impl ResidueRegistry for HttpResidueRegistry {
    fn fetch(&self, accession: &str) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.api, accession);
        debug!("Fetching reference residues from {}", url);

        let lookup_failed = |reason: String| NumberingError::ReferenceLookupFailed {
            accession: accession.to_string(),
            reason,
        };

        let response = self
            .client
            .post(&url)
            .send()
            .map_err(|e| lookup_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(lookup_failed(format!("HTTP {}", status)));
        }

        let body = response.bytes().map_err(|e| lookup_failed(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Use this builder to configure the cache location and the registry before
/// creating a [`ReferenceNumberingCache`].
///
/// # Examples
///
/// ```rust,no_run
/// use dynacon_numbering::cache::ReferenceNumberingCache;
/// use std::path::PathBuf;
///
/// # fn main() -> anyhow::Result<()> {
/// let cache = ReferenceNumberingCache::builder()
///     .with_cache_folder(PathBuf::from("/tmp/dynacon"))
///     .with_registry_api("https://gpcrdb.org/services/residues/extended/".to_string())
///     .finish()?;
/// let records = cache.get("P41143")?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ReferenceNumberingCacheBuilder {
    cache_folder: Option<PathBuf>,
    registry_api: Option<String>,
    http_timeout: Option<Duration>,
    registry: Option<Box<dyn ResidueRegistry>>,
}

impl ReferenceNumberingCacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the cache folder, registry endpoint and timeout of a [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self::default()
            .with_cache_folder(config.cache_folder.clone())
            .with_registry_api(config.registry_api.clone())
            .with_http_timeout(config.http_timeout())
    }

    pub fn with_cache_folder(mut self, path: PathBuf) -> Self {
        self.cache_folder = Some(path);
        self
    }

    pub fn with_registry_api(mut self, api: String) -> Self {
        self.registry_api = Some(api);
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Use a custom registry instead of the HTTP one.
    pub fn with_registry(mut self, registry: Box<dyn ResidueRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Consumes the builder and creates the cache, creating its folder if needed.
    pub fn finish(self) -> anyhow::Result<ReferenceNumberingCache> {
        let raw_path = self.cache_folder.unwrap_or_else(get_default_cache_folder);
        let raw_str = raw_path.to_string_lossy().into_owned();
        let expanded = shellexpand::env(&raw_str)
            .unwrap_or_else(|_| raw_str.clone().into())
            .into_owned();
        let cache_folder = PathBuf::from(expanded);
        create_dir_all(cache_folder.join(RESIDUES_SUBFOLDER)).with_context(|| {
            format!("Failed to create cache folder {}", cache_folder.display())
        })?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => {
                let api = self
                    .registry_api
                    .unwrap_or_else(|| DEFAULT_REGISTRY_API.to_string());
                let timeout = self
                    .http_timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
                Box::new(HttpResidueRegistry::new(&api, timeout)?)
            }
        };

        Ok(ReferenceNumberingCache {
            cache_folder,
            registry,
            records: RwLock::new(HashMap::new()),
        })
    }
}

/// Cache of reference residue records, safe to share between threads.
///
/// Concurrent misses on the same accession may each fetch; the last write
/// of the persisted file wins and both callers get equal records.
pub struct ReferenceNumberingCache {
    /// Path to the root cache directory
    pub cache_folder: PathBuf,
    registry: Box<dyn ResidueRegistry>,
    records: RwLock<HashMap<String, Arc<Vec<ReferenceResidueRecord>>>>,
}

impl ReferenceNumberingCache {
    pub fn builder() -> ReferenceNumberingCacheBuilder {
        ReferenceNumberingCacheBuilder::default()
    }

    ///
    /// Reference records of `accession`, fetched from the registry on a miss.
    ///
    /// # Returns
    /// - records ordered as served by the registry
    ///
    pub fn get(&self, accession: &str) -> Result<Arc<Vec<ReferenceResidueRecord>>> {
        validate_accession(accession)?;

        if let Some(records) = self.memory_lookup(accession) {
            return Ok(records);
        }

        let path = self.residues_path(accession);
        if path.exists() {
            match fs::read(&path).map(|body| parse_reference_records(&body)) {
                Ok(Ok(records)) => {
                    debug!("Loaded cached reference residues from {}", path.display());
                    return Ok(self.remember(accession, records));
                }
                Ok(Err(e)) => warn!("Discarding corrupted cache entry {}: {}", path.display(), e),
                Err(e) => warn!("Can't read cache entry {}: {}", path.display(), e),
            }
        }

        let body = self.registry.fetch(accession)?;
        let records = parse_reference_records(&body).map_err(|source| {
            NumberingError::InvalidRegistryPayload {
                accession: accession.to_string(),
                source,
            }
        })?;
        self.persist(accession, &body)?;
        info!(
            "Cached {} reference residues for {}",
            records.len(),
            accession
        );
        Ok(self.remember(accession, records))
    }

    /// Fetch `accession` into the cache unless it is already there.
    pub fn prefetch(&self, accession: &str) -> Result<usize> {
        Ok(self.get(accession)?.len())
    }

    /// Local path of a cached accession.
    pub fn seek(&self, accession: &str) -> anyhow::Result<PathBuf> {
        validate_accession(accession)?;
        let path = self.residues_path(accession);
        if path.exists() {
            Ok(path)
        } else {
            Err(anyhow!("{} does not exist in cache.", accession))
        }
    }

    /// Accessions with a persisted entry, sorted.
    pub fn list(&self) -> anyhow::Result<Vec<String>> {
        let mut accessions = Vec::new();
        let root = self.cache_folder.join(RESIDUES_SUBFOLDER);
        for first in read_dir(&root)? {
            let first = first?.path();
            if !first.is_dir() {
                continue;
            }
            for second in read_dir(&first)? {
                let second = second?.path();
                if !second.is_dir() {
                    continue;
                }
                for entry in read_dir(&second)? {
                    let name = entry?.file_name().to_string_lossy().into_owned();
                    if let Some(accession) = name.strip_suffix(RESIDUES_EXT) {
                        accessions.push(accession.to_string());
                    }
                }
            }
        }
        accessions.sort();
        Ok(accessions)
    }

    /// Drop an accession from memory and disk, pruning empty shard folders.
    pub fn remove(&self, accession: &str) -> anyhow::Result<()> {
        let path = self.seek(accession)?;
        if let Ok(mut records) = self.records.write() {
            records.remove(accession);
        }

        remove_file(&path)?;
        let shard_2 = path.parent().map(PathBuf::from);
        let shard_1 = shard_2.as_ref().and_then(|p| p.parent().map(PathBuf::from));
        if let Some(sub2) = shard_2
            && read_dir(&sub2)?.next().is_none()
        {
            remove_dir(&sub2)?;
            if let Some(sub1) = shard_1
                && read_dir(&sub1)?.next().is_none()
            {
                remove_dir(&sub1)?;
            }
        }
        info!("{} is removed.", path.display());
        Ok(())
    }

    fn memory_lookup(&self, accession: &str) -> Option<Arc<Vec<ReferenceResidueRecord>>> {
        self.records
            .read()
            .ok()
            .and_then(|records| records.get(accession).cloned())
    }

    fn remember(
        &self,
        accession: &str,
        records: Vec<ReferenceResidueRecord>,
    ) -> Arc<Vec<ReferenceResidueRecord>> {
        let records = Arc::new(records);
        if let Ok(mut map) = self.records.write() {
            map.insert(accession.to_string(), Arc::clone(&records));
        }
        records
    }

    // write to a sibling temp file, then rename over the final path
    fn persist(&self, accession: &str, body: &[u8]) -> Result<()> {
        let path = self.residues_path(accession);
        let folder = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cache_folder.clone());
        create_dir_all(&folder)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&folder)?;
        tmp.write_all(body)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| NumberingError::Io(e.error))?;
        Ok(())
    }

    fn residues_path(&self, accession: &str) -> PathBuf {
        let mut chars = accession.chars();
        let first = chars.next().map(String::from).unwrap_or_default();
        let second = chars.next().map(String::from).unwrap_or_else(|| "_".to_string());
        self.cache_folder
            .join(RESIDUES_SUBFOLDER)
            .join(first)
            .join(second)
            .join(format!("{}{}", accession, RESIDUES_EXT))
    }
}

// accessions become file names and URL path segments
fn validate_accession(accession: &str) -> Result<()> {
    let valid = !accession.is_empty()
        && accession
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(NumberingError::InvalidAccession(accession.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BODY: &str = r#"[
        {"sequence_number": 1, "amino_acid": "M", "display_generic_number": null, "protein_segment": "N-term"},
        {"sequence_number": 2, "amino_acid": "V", "display_generic_number": "1.50x50", "protein_segment": "TM1"}
    ]"#;

    struct CountingRegistry {
        calls: Arc<AtomicUsize>,
        body: Option<&'static str>,
    }

    impl ResidueRegistry for CountingRegistry {
        fn fetch(&self, accession: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Some(body) => Ok(body.as_bytes().to_vec()),
                None => Err(NumberingError::ReferenceLookupFailed {
                    accession: accession.to_string(),
                    reason: "HTTP 404 Not Found".to_string(),
                }),
            }
        }
    }

    fn cache_with(folder: &Path, body: Option<&'static str>) -> (ReferenceNumberingCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ReferenceNumberingCache::builder()
            .with_cache_folder(folder.to_path_buf())
            .with_registry(Box::new(CountingRegistry {
                calls: Arc::clone(&calls),
                body,
            }))
            .finish()
            .unwrap();
        (cache, calls)
    }

    #[rstest]
    fn test_miss_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, calls) = cache_with(dir.path(), Some(BODY));

        let first = cache.get("P41143").unwrap();
        let second = cache.get("P41143").unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first[1].generic_number.as_deref(), Some("1.50x50"));
    }

    #[rstest]
    fn test_persisted_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (cache, _) = cache_with(dir.path(), Some(BODY));
            cache.get("P41143").unwrap();
        }
        let (cache, calls) = cache_with(dir.path(), None);
        assert_eq!(cache.get("P41143").unwrap().len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let stored = fs::read_to_string(cache.seek("P41143").unwrap()).unwrap();
        assert_eq!(stored, BODY);
    }

    #[rstest]
    fn test_failure_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, calls) = cache_with(dir.path(), None);

        assert!(matches!(
            cache.get("P41143"),
            Err(NumberingError::ReferenceLookupFailed { .. })
        ));
        assert!(cache.get("P41143").is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.seek("P41143").is_err());
    }

    #[rstest]
    fn test_invalid_payload_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache_with(dir.path(), Some(r#"{"detail": "Not found."}"#));

        assert!(matches!(
            cache.get("P41143"),
            Err(NumberingError::InvalidRegistryPayload { .. })
        ));
        assert!(cache.list().unwrap().is_empty());
    }

    #[rstest]
    fn test_corrupted_entry_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, calls) = cache_with(dir.path(), Some(BODY));
        let path = cache.residues_path("P41143");
        create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[{").unwrap();

        assert_eq!(cache.get("P41143").unwrap().len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[case("")]
    #[case("../etc/passwd")]
    #[case("P41 143")]
    fn test_invalid_accession(#[case] accession: &str) {
        let dir = tempfile::tempdir().unwrap();
        let (cache, calls) = cache_with(dir.path(), Some(BODY));
        assert!(matches!(
            cache.get(accession),
            Err(NumberingError::InvalidAccession(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn test_list_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, calls) = cache_with(dir.path(), Some(BODY));
        cache.get("P41143").unwrap();
        cache.get("Q9Y5N1").unwrap();

        assert_eq!(cache.list().unwrap(), vec!["P41143", "Q9Y5N1"]);

        cache.remove("P41143").unwrap();
        assert_eq!(cache.list().unwrap(), vec!["Q9Y5N1"]);
        assert!(!dir.path().join("residues/P").exists());

        // removed entries are fetched again
        cache.get("P41143").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[rstest]
    fn test_concurrent_misses_agree() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache_with(dir.path(), Some(BODY));
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get("P41143").unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.list().unwrap(), vec!["P41143"]);
    }
}
