//! Memoization stores for resolved media objects
//!
//! One `MediaCache` per resolver holds the asset, sample and selection
//! stores, the ref/uuid identity translator and the shortcut allocator.
//! Lookups accept either aliasing scheme; values are published as shared
//! references and never overwritten (first write wins).

pub mod keyed_store;
pub mod shortcut;
pub mod translator;

use std::sync::Arc;

use tracing::warn;

use crate::asset::{Asset, MimeKind};
use crate::multipart::PartialSelection;
use crate::sample::Sample;
use crate::{Error, Result};

pub use keyed_store::KeyedStore;
pub use shortcut::ShortcutAllocator;
pub use translator::IdentityTranslator;

/// Asset store keyed by the canonical `ref:` key.
#[derive(Debug, Default)]
pub struct AssetStore {
    entries: KeyedStore<Arc<Asset>>,
}

impl AssetStore {
    /// Register the asset's identity pair and store it.
    ///
    /// Returns whether the asset was newly inserted. A conflicting
    /// ref/uuid pair rejects the asset: two independently issued
    /// identifiers must never silently collapse into one identity.
    pub fn add(&mut self, translator: &mut IdentityTranslator, asset: Arc<Asset>) -> Result<bool> {
        if !translator.add_pair(asset.ref_key(), asset.uuid_key()) {
            warn!(
                ref_key = asset.ref_key(),
                uuid_key = asset.uuid_key(),
                "Identity pair conflicts with an existing mapping, dropping asset"
            );
            return Err(Error::IdentityConflict {
                ref_key: asset.ref_key().to_string(),
                uuid_key: asset.uuid_key().to_string(),
            });
        }
        let key = asset.ref_key().to_string();
        Ok(self.entries.add(&key, asset))
    }

    /// Look up under either aliasing scheme.
    pub fn get(&self, translator: &IdentityTranslator, key: &str) -> Option<Arc<Asset>> {
        let canonical = translator.resolve_key(key)?;
        self.entries.get(&canonical).cloned()
    }

    pub fn get_all(&self) -> Vec<Arc<Asset>> {
        self.entries.get_all()
    }

    /// Values for the given keys (either scheme), skipping unknown keys.
    pub fn get_multiple<I, S>(&self, translator: &IdentityTranslator, keys: I) -> Vec<Arc<Asset>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let canonical: Vec<String> = keys
            .into_iter()
            .filter_map(|key| translator.resolve_key(key.as_ref()))
            .collect();
        self.entries.get_multiple(canonical)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.reset();
    }
}

/// Translate the asset part of a `<canonical>#<fragment>` key.
fn resolve_fragment_key(translator: &IdentityTranslator, key: &str) -> Option<String> {
    let (head, fragment) = key.split_once('#')?;
    let canonical = translator.resolve_key(head)?;
    Some(format!("{}#{}", canonical, fragment))
}

/// Sample store keyed by `<asset ref>#<sample id>`.
#[derive(Debug, Default)]
pub struct SampleStore {
    entries: KeyedStore<Arc<Sample>>,
}

impl SampleStore {
    pub fn add(&mut self, sample: Arc<Sample>) -> bool {
        let key = sample.ref_key().to_string();
        self.entries.add(&key, sample)
    }

    pub fn get(&self, translator: &IdentityTranslator, key: &str) -> Option<Arc<Sample>> {
        let canonical = resolve_fragment_key(translator, key)?;
        self.entries.get(&canonical).cloned()
    }

    pub fn get_all(&self) -> Vec<Arc<Sample>> {
        self.entries.get_all()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn reset(&mut self) {
        self.entries.reset();
    }
}

/// Selection store keyed by `<asset ref>#<selection spec>`.
#[derive(Debug, Default)]
pub struct SelectionStore {
    entries: KeyedStore<Arc<PartialSelection>>,
}

impl SelectionStore {
    /// Insert unless the key is already taken; returns the stored value
    /// either way.
    pub fn add(&mut self, selection: PartialSelection) -> Arc<PartialSelection> {
        let key = selection.ref_key();
        if let Some(existing) = self.entries.get(&key) {
            return existing.clone();
        }
        let shared = Arc::new(selection);
        self.entries.add(&key, shared.clone());
        shared
    }

    pub fn get(&self, translator: &IdentityTranslator, key: &str) -> Option<Arc<PartialSelection>> {
        let canonical = resolve_fragment_key(translator, key)?;
        self.entries.get(&canonical).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn reset(&mut self) {
        self.entries.reset();
    }
}

/// All memoization state of one resolver.
#[derive(Debug, Default)]
pub struct MediaCache {
    pub translator: IdentityTranslator,
    pub assets: AssetStore,
    pub samples: SampleStore,
    pub selections: SelectionStore,
    pub shortcuts: ShortcutAllocator,
}

impl MediaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly constructed asset.
    ///
    /// Registers the identity pair, stores the asset and its samples and
    /// allocates shortcuts exactly once, on first insertion. Returns the
    /// shared asset; when another resolve call stored the same identity
    /// first, that earlier object is returned unchanged.
    pub fn insert_asset(&mut self, asset: Asset) -> Result<Arc<Asset>> {
        let shared = Arc::new(asset);
        let newly_inserted = self.assets.add(&mut self.translator, shared.clone())?;
        if !newly_inserted {
            return Ok(self
                .assets
                .get(&self.translator, shared.ref_key())
                .unwrap_or(shared));
        }

        match shared.mime() {
            MimeKind::Image => {
                if let Some(token) = self.shortcuts.next(MimeKind::Image) {
                    shared.assign_shortcut(token);
                }
            }
            kind @ (MimeKind::Audio | MimeKind::Video) => {
                if let Some(collection) = shared.samples() {
                    for sample in collection.iter() {
                        if let Some(token) = self.shortcuts.next(kind) {
                            sample.assign_shortcut(token);
                        }
                        self.samples.add(sample.clone());
                    }
                }
            }
            MimeKind::Other => {}
        }

        Ok(shared)
    }

    pub fn get_asset(&self, key: &str) -> Option<Arc<Asset>> {
        self.assets.get(&self.translator, key)
    }

    pub fn get_sample(&self, key: &str) -> Option<Arc<Sample>> {
        self.samples.get(&self.translator, key)
    }

    pub fn get_selection(&self, key: &str) -> Option<Arc<PartialSelection>> {
        self.selections.get(&self.translator, key)
    }

    pub fn insert_selection(&mut self, selection: PartialSelection) -> Arc<PartialSelection> {
        self.selections.add(selection)
    }

    /// Clear every store, the translator and the shortcut counters.
    pub fn reset(&mut self) {
        self.translator.reset();
        self.assets.reset();
        self.samples.reset();
        self.selections.reset();
        self.shortcuts.reset();
    }
}
