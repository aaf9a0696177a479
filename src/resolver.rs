//! Media URI resolution
//!
//! The resolver turns batches of media URIs into memoized domain
//! objects. A batch runs as an explicit work-queue loop: seed
//! identifiers are deduplicated and canonicalized; each round fetches
//! every unresolved identifier in parallel, constructs and registers
//! the assets, then scans their metadata for embedded identifiers,
//! which feed the next round. The loop terminates when a round
//! discovers nothing new.
//!
//! All memoization state lives inside the `Resolver` value; construct
//! one per session and pass it by reference to consumers. Concurrent
//! resolutions of the same not-yet-resolved identifier share one
//! catalog request through the in-flight map.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::{Arc, Mutex, RwLock};

use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::asset::Asset;
use crate::cache::MediaCache;
use crate::client::{MetadataFetcher, RawAssetMetadata, RestMetadataClient};
use crate::config::MediaServerConfig;
use crate::multipart::PartialSelection;
use crate::sample::{Sample, COMPLETE_ID};
use crate::uri::{is_media_uri, MediaUri};
use crate::{Error, Result};

type SharedFetch = Shared<BoxFuture<'static, Result<RawAssetMetadata>>>;

/// Resolves media URIs against the catalog and memoizes the results.
pub struct Resolver {
    config: MediaServerConfig,
    fetcher: Arc<dyn MetadataFetcher>,
    cache: RwLock<MediaCache>,
    /// Completed fetches by canonical identifier; lives until `reset`
    fetch_cache: Mutex<HashMap<String, Result<RawAssetMetadata>>>,
    /// Pending fetches, shared between concurrent resolve calls
    in_flight: Mutex<HashMap<String, SharedFetch>>,
}

impl Resolver {
    pub fn new(config: MediaServerConfig, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        Self {
            config,
            fetcher,
            cache: RwLock::new(MediaCache::new()),
            fetch_cache: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolver backed by the production REST client.
    pub fn from_config(config: MediaServerConfig) -> Result<Self> {
        let client = RestMetadataClient::new(&config)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &MediaServerConfig {
        &self.config
    }

    /// Resolve a batch of URIs, failing on the first identifier the
    /// catalog does not know.
    ///
    /// Returns every asset touched by the batch, including assets pulled
    /// in transitively through embedded identifiers and assets already
    /// cached by earlier calls.
    pub async fn resolve<I, S>(&self, uris: I) -> Result<Vec<Arc<Asset>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.resolve_batch(collect_uris(uris), true).await
    }

    /// Like [`resolve`](Self::resolve), but identifiers missing from the
    /// catalog are skipped with a warning instead of failing the batch.
    pub async fn resolve_lenient<I, S>(&self, uris: I) -> Result<Vec<Arc<Asset>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.resolve_batch(collect_uris(uris), false).await
    }

    /// Resolve one URI and return its asset, from cache when possible.
    pub async fn resolve_asset(&self, uri: &str) -> Result<Arc<Asset>> {
        let canonical = MediaUri::parse(uri)?.canonicalize();
        if let Some(asset) = self.cache.read().unwrap().get_asset(canonical.raw()) {
            return Ok(asset);
        }
        self.resolve_batch(vec![canonical.raw().to_string()], true)
            .await?;
        self.cache
            .read()
            .unwrap()
            .get_asset(canonical.raw())
            .ok_or_else(|| Error::UnresolvedAsset(canonical.raw().to_string()))
    }

    /// Pure cache read; fails when the asset has not been resolved.
    pub fn get_asset(&self, uri: &str) -> Result<Arc<Asset>> {
        let canonical = MediaUri::parse(uri)?.without_fragment();
        self.cache
            .read()
            .unwrap()
            .get_asset(&canonical)
            .ok_or(Error::UnresolvedAsset(canonical))
    }

    /// Resolve the owning asset if needed, then return the sample the
    /// URI's fragment names. A fragment-less URI means the `complete`
    /// sample.
    pub async fn resolve_sample(&self, uri: &str) -> Result<Arc<Sample>> {
        let parsed = MediaUri::parse(uri)?;
        self.resolve_asset(&parsed.without_fragment()).await?;
        self.get_sample(uri)
    }

    /// Pure cache read of a sample; the fragment defaults to `complete`.
    pub fn get_sample(&self, uri: &str) -> Result<Arc<Sample>> {
        let parsed = MediaUri::parse(uri)?;
        let key = format!(
            "{}#{}",
            parsed.without_fragment(),
            parsed.fragment().unwrap_or(COMPLETE_ID)
        );
        self.cache
            .read()
            .unwrap()
            .get_sample(&key)
            .ok_or(Error::UnresolvedSample(key))
    }

    /// Resolve the asset if needed and build (or reuse) the multipart
    /// selection named by the URI's fragment. The fragment is mandatory.
    pub async fn resolve_selection(&self, uri: &str) -> Result<Arc<PartialSelection>> {
        let parsed = MediaUri::parse(uri)?;
        let fragment = parsed
            .fragment()
            .ok_or_else(|| Error::InvalidSelection(uri.to_string()))?
            .to_string();
        let asset = self.resolve_asset(&parsed.without_fragment()).await?;
        self.selection_for(asset, &fragment)
    }

    /// Selection from cache, lazily built when the underlying asset is
    /// already resolved.
    pub fn get_selection(&self, uri: &str) -> Result<Arc<PartialSelection>> {
        let parsed = MediaUri::parse(uri)?;
        let fragment = parsed
            .fragment()
            .ok_or_else(|| Error::InvalidSelection(uri.to_string()))?;
        let canonical = parsed.without_fragment();
        let key = format!("{}#{}", canonical, fragment);

        let asset = {
            let cache = self.cache.read().unwrap();
            if let Some(selection) = cache.get_selection(&key) {
                return Ok(selection);
            }
            cache
                .get_asset(&canonical)
                .ok_or(Error::UnresolvedSelection(key))?
        };
        self.selection_for(asset, fragment)
    }

    fn selection_for(&self, asset: Arc<Asset>, fragment: &str) -> Result<Arc<PartialSelection>> {
        let key = format!("{}#{}", asset.ref_key(), fragment);
        {
            let cache = self.cache.read().unwrap();
            if let Some(selection) = cache.get_selection(&key) {
                return Ok(selection);
            }
        }
        let selection = PartialSelection::new(asset, fragment)?;
        Ok(self.cache.write().unwrap().insert_selection(selection))
    }

    /// Canonical `ref:` key for a caller holding either scheme.
    pub fn translate_to_asset_ref(&self, key: &str) -> Option<String> {
        let canonical = MediaUri::parse(key).ok()?.canonicalize();
        self.cache
            .read()
            .unwrap()
            .translator
            .resolve_key(canonical.raw())
    }

    /// All resolved assets in resolution order.
    pub fn assets(&self) -> Vec<Arc<Asset>> {
        self.cache.read().unwrap().assets.get_all()
    }

    /// Cached assets for the given keys (either scheme), skipping
    /// unresolved ones.
    pub fn get_assets<I, S>(&self, keys: I) -> Vec<Arc<Asset>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cache = self.cache.read().unwrap();
        cache.assets.get_multiple(&cache.translator, keys)
    }

    /// Clear every store, the translator, the shortcut counters and the
    /// fetch caches. Used between independent presentations.
    pub fn reset(&self) {
        info!("Resetting media resolver state");
        self.cache.write().unwrap().reset();
        self.fetch_cache.lock().unwrap().clear();
        self.in_flight.lock().unwrap().clear();
    }

    async fn resolve_batch(
        &self,
        raw_uris: Vec<String>,
        strict_missing: bool,
    ) -> Result<Vec<Arc<Asset>>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: Vec<MediaUri> = Vec::new();
        for raw in &raw_uris {
            let canonical = MediaUri::parse(raw)?.canonicalize();
            if seen.insert(canonical.raw().to_string()) {
                queue.push(canonical);
            }
        }

        // A construction failure aborts the batch only when the caller
        // asked for exactly this one identifier
        let sole_seed = match queue.as_slice() {
            [only] => Some(only.raw().to_string()),
            _ => None,
        };

        let mut resolved: Vec<Arc<Asset>> = Vec::new();
        let mut resolved_keys: HashSet<String> = HashSet::new();

        while !queue.is_empty() {
            let round = mem::take(&mut queue);
            let mut to_fetch: Vec<MediaUri> = Vec::new();

            {
                let cache = self.cache.read().unwrap();
                for uri in round {
                    match cache.get_asset(uri.raw()) {
                        Some(asset) => {
                            expand(&asset, &mut seen, &mut queue);
                            collect(&mut resolved, &mut resolved_keys, asset);
                        }
                        None => to_fetch.push(uri),
                    }
                }
            }

            if to_fetch.is_empty() {
                continue;
            }
            debug!(count = to_fetch.len(), "Starting catalog fetch round");

            let fetches = to_fetch.into_iter().map(|uri| async move {
                let result = self.fetch_once(&uri).await;
                (uri, result)
            });

            for (uri, result) in join_all(fetches).await {
                match result {
                    Ok(raw) => match Asset::from_metadata(raw, &self.config) {
                        Ok(asset) => {
                            let inserted = self.cache.write().unwrap().insert_asset(asset);
                            match inserted {
                                Ok(asset) => {
                                    info!(
                                        ref_key = asset.ref_key(),
                                        mime = asset.mime().as_str(),
                                        "Resolved media asset"
                                    );
                                    expand(&asset, &mut seen, &mut queue);
                                    collect(&mut resolved, &mut resolved_keys, asset);
                                }
                                // The store already logged the conflict;
                                // drop the asset and keep the batch going
                                Err(Error::IdentityConflict { .. }) => {}
                                Err(e) => return Err(e),
                            }
                        }
                        Err(e) if sole_seed.as_deref() == Some(uri.raw()) => return Err(e),
                        Err(e) => {
                            warn!(uri = %uri, error = %e, "Asset construction failed, skipping");
                        }
                    },
                    Err(Error::NotFound(id)) if !strict_missing => {
                        warn!(uri = %id, "Identifier not found in catalog, skipping");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(resolved)
    }

    /// Fetch one canonical identifier, deduplicating across calls.
    ///
    /// Completed fetches (successes and not-found answers) are served
    /// from the fetch cache; pending ones are joined through the
    /// in-flight map so the catalog sees a single request.
    async fn fetch_once(&self, uri: &MediaUri) -> Result<RawAssetMetadata> {
        let key = uri.raw().to_string();

        if let Some(cached) = self.fetch_cache.lock().unwrap().get(&key) {
            debug!(uri = %uri, "Fetch cache hit");
            return cached.clone();
        }

        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap();
            match in_flight.get(&key) {
                Some(pending) => {
                    debug!(uri = %uri, "Joining in-flight fetch");
                    pending.clone()
                }
                None => {
                    // The fetch may have completed between the cache
                    // check above and taking this lock
                    if let Some(cached) = self.fetch_cache.lock().unwrap().get(&key) {
                        return cached.clone();
                    }
                    let fetcher = Arc::clone(&self.fetcher);
                    let target = uri.clone();
                    let pending: SharedFetch =
                        async move { fetcher.fetch_metadata(&target).await }
                            .boxed()
                            .shared();
                    in_flight.insert(key.clone(), pending.clone());
                    pending
                }
            }
        };

        let result = shared.await;

        let mut in_flight = self.in_flight.lock().unwrap();
        if in_flight.remove(&key).is_some() {
            // First waiter to complete records the outcome; transient
            // transport errors stay uncached so they can be retried
            if matches!(result, Ok(_) | Err(Error::NotFound(_))) {
                self.fetch_cache
                    .lock()
                    .unwrap()
                    .insert(key, result.clone());
            }
        }

        result
    }
}

fn collect_uris<I, S>(uris: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    uris.into_iter().map(|u| u.as_ref().to_string()).collect()
}

fn collect(resolved: &mut Vec<Arc<Asset>>, keys: &mut HashSet<String>, asset: Arc<Asset>) {
    if keys.insert(asset.ref_key().to_string()) {
        resolved.push(asset);
    }
}

/// Scan an asset's metadata for embedded identifiers and enqueue the
/// unseen ones.
fn expand(asset: &Arc<Asset>, seen: &mut HashSet<String>, queue: &mut Vec<MediaUri>) {
    let mut found: Vec<String> = Vec::new();
    scan_value(asset.meta(), &mut found);

    for candidate in found {
        let parsed = match MediaUri::parse(&candidate) {
            Ok(parsed) if parsed.is_resolvable() => parsed,
            _ => continue,
        };
        let canonical = parsed.canonicalize();
        if seen.insert(canonical.raw().to_string()) {
            debug!(
                from = asset.ref_key(),
                to = canonical.raw(),
                "Discovered embedded identifier"
            );
            queue.push(canonical);
        }
    }
}

fn scan_value(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::String(s) if is_media_uri(s) => found.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                scan_value(item, found);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                scan_value(item, found);
            }
        }
        _ => {}
    }
}
