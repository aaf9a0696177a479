//! Integration tests for batch resolution against a mock catalog
//!
//! Exercises the full resolve pipeline: seeding, parallel fetch rounds,
//! transitive expansion of embedded identifiers, memoization under both
//! aliasing schemes, shortcut allocation and multipart selections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lectern_media::{
    Error, MediaServerConfig, MediaUri, MetadataFetcher, RawAssetMetadata, RawSampleMetadata,
    Resolver, Result, TimeValue,
};

const SONG_1_UUID: &str = "0d8bc4a9-c2a4-4b10-b194-6b66fb4c8917";
const SONG_2_UUID: &str = "7c7f6b12-3a7e-4b7a-8f5d-0a42b6dd2c4e";
const SONG_3_UUID: &str = "ab11c0de-44f2-4f6e-9a33-2b1c0d9e8f70";
const COVER_UUID: &str = "3f9d1c2b-8e47-4a60-b5d2-91c3e7a8f604";
const SCORE_UUID: &str = "6e5a4d3c-2b1a-4908-8776-655443322110";

struct MockCatalog {
    entries: HashMap<String, RawAssetMetadata>,
    calls: AtomicUsize,
}

impl MockCatalog {
    fn new(assets: Vec<RawAssetMetadata>) -> Self {
        let mut entries = HashMap::new();
        for metadata in assets {
            entries.insert(format!("ref:{}", metadata.reference), metadata.clone());
            entries.insert(format!("uuid:{}", metadata.uuid), metadata);
        }
        Self {
            entries,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataFetcher for MockCatalog {
    async fn fetch_metadata(&self, uri: &MediaUri) -> Result<RawAssetMetadata> {
        if !uri.is_resolvable() {
            return Err(Error::UnsupportedScheme {
                uri: uri.raw().to_string(),
                scheme: uri.scheme().as_str().to_string(),
            });
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .get(&uri.without_fragment())
            .cloned()
            .ok_or_else(|| Error::NotFound(uri.without_fragment()))
    }
}

fn audio(reference: &str, uuid: &str) -> RawAssetMetadata {
    RawAssetMetadata {
        reference: reference.to_string(),
        uuid: uuid.to_string(),
        path: Some(format!("audio/{}.mp3", reference.to_lowercase())),
        ..Default::default()
    }
}

fn image(reference: &str, uuid: &str) -> RawAssetMetadata {
    RawAssetMetadata {
        reference: reference.to_string(),
        uuid: uuid.to_string(),
        path: Some(format!("images/{}.jpg", reference.to_lowercase())),
        ..Default::default()
    }
}

fn sample(id: &str, start: f64, duration: Option<f64>) -> RawSampleMetadata {
    RawSampleMetadata {
        id: Some(id.to_string()),
        title: None,
        start_time: Some(TimeValue::Seconds(start)),
        duration: duration.map(TimeValue::Seconds),
        end_time: None,
    }
}

fn setup(assets: Vec<RawAssetMetadata>) -> (Resolver, Arc<MockCatalog>) {
    let catalog = Arc::new(MockCatalog::new(assets));
    let config = MediaServerConfig::new("http://catalog:8620", "media");
    (Resolver::new(config, catalog.clone()), catalog)
}

#[tokio::test]
async fn test_resolving_twice_returns_identical_instance() {
    let (resolver, catalog) = setup(vec![audio("Song-1", SONG_1_UUID)]);

    let first = resolver.resolve(["ref:Song-1"]).await.unwrap();
    let second = resolver.resolve(["ref:Song-1"]).await.unwrap();

    assert_eq!(first.len(), 1);
    assert!(Arc::ptr_eq(&first[0], &second[0]));
    assert_eq!(catalog.calls(), 1, "second resolve must be a cache hit");
}

#[tokio::test]
async fn test_both_schemes_reach_the_same_object() {
    let (resolver, _) = setup(vec![audio("Song-1", SONG_1_UUID)]);

    let resolved = resolver.resolve(["ref:Song-1"]).await.unwrap();
    let asset = &resolved[0];

    let by_ref = resolver.get_asset(asset.ref_key()).unwrap();
    let by_uuid = resolver.get_asset(asset.uuid_key()).unwrap();
    assert!(Arc::ptr_eq(&by_ref, &by_uuid));
    assert!(Arc::ptr_eq(asset, &by_uuid));
}

#[tokio::test]
async fn test_resolving_by_uuid_populates_ref_alias() {
    let (resolver, _) = setup(vec![audio("Song-1", SONG_1_UUID)]);

    let uri = format!("uuid:{}", SONG_1_UUID);
    let resolved = resolver.resolve([uri.as_str()]).await.unwrap();

    assert_eq!(resolved[0].ref_key(), "ref:Song-1");
    assert!(resolver.get_asset("ref:Song-1").is_ok());
    assert_eq!(
        resolver.translate_to_asset_ref(&uri),
        Some("ref:Song-1".to_string())
    );
}

#[tokio::test]
async fn test_cover_reference_is_resolved_transitively() {
    let mut song = audio("Song-1", SONG_1_UUID);
    song.cover = Some("ref:Cover-Image".to_string());
    let (resolver, catalog) = setup(vec![song, image("Cover-Image", COVER_UUID)]);

    let resolved = resolver.resolve(["ref:Song-1"]).await.unwrap();

    let refs: Vec<&str> = resolved.iter().map(|a| a.ref_key()).collect();
    assert_eq!(refs, vec!["ref:Song-1", "ref:Cover-Image"]);
    assert_eq!(catalog.calls(), 2);
}

#[tokio::test]
async fn test_identifiers_in_extra_metadata_are_followed() {
    let mut song = audio("Song-1", SONG_1_UUID);
    song.extra.insert(
        "composerPortrait".to_string(),
        serde_json::Value::String("ref:Cover-Image".to_string()),
    );
    let (resolver, _) = setup(vec![song, image("Cover-Image", COVER_UUID)]);

    let resolved = resolver.resolve(["ref:Song-1"]).await.unwrap();
    assert_eq!(resolved.len(), 2);
}

#[tokio::test]
async fn test_strict_resolve_fails_on_missing_identifier() {
    let (resolver, _) = setup(vec![]);

    let result = resolver.resolve(["ref:Nope"]).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_lenient_resolve_skips_missing_identifier() {
    let (resolver, _) = setup(vec![audio("Song-1", SONG_1_UUID)]);

    let resolved = resolver
        .resolve_lenient(["ref:Nope", "ref:Song-1"])
        .await
        .unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].ref_key(), "ref:Song-1");
}

#[tokio::test]
async fn test_shortcut_allocation_order_and_reset() {
    let (resolver, _) = setup(vec![
        audio("Song-1", SONG_1_UUID),
        audio("Song-2", SONG_2_UUID),
        image("Pic", COVER_UUID),
        audio("Song-3", SONG_3_UUID),
    ]);

    resolver
        .resolve(["ref:Song-1", "ref:Song-2", "ref:Pic"])
        .await
        .unwrap();

    let first = resolver.get_sample("ref:Song-1").unwrap();
    let second = resolver.get_sample("ref:Song-2").unwrap();
    let pic = resolver.get_asset("ref:Pic").unwrap();
    assert_eq!(first.shortcut(), Some("a1"));
    assert_eq!(second.shortcut(), Some("a2"));
    assert_eq!(pic.shortcut(), Some("i1"));

    resolver.reset();
    resolver.resolve(["ref:Song-3"]).await.unwrap();
    let after_reset = resolver.get_sample("ref:Song-3").unwrap();
    assert_eq!(after_reset.shortcut(), Some("a1"));
}

#[tokio::test]
async fn test_declared_samples_join_the_complete_sample() {
    let mut song = audio("Song-1", SONG_1_UUID);
    song.samples = Some(vec![sample("intro", 0.0, Some(5.0))]);
    let (resolver, _) = setup(vec![song]);

    let resolved = resolver.resolve(["ref:Song-1"]).await.unwrap();
    let collection = resolved[0].samples().unwrap();

    assert_eq!(collection.len(), 2);
    assert!(collection.get("complete").is_some());
    let intro = resolver.resolve_sample("ref:Song-1#intro").await.unwrap();
    assert_eq!(intro.start_sec(), 0.0);
    assert_eq!(intro.end(), Some(5.0));

    // A fragment-less sample URI means the whole file
    let complete = resolver.get_sample("ref:Song-1").unwrap();
    assert_eq!(complete.ref_key(), "ref:Song-1#complete");
}

#[tokio::test]
async fn test_duplicate_complete_declaration_fails_the_asset() {
    let mut song = audio("Song-1", SONG_1_UUID);
    song.start_time = Some(TimeValue::Seconds(0.0));
    song.samples = Some(vec![sample("complete", 0.0, Some(30.0))]);
    let (resolver, _) = setup(vec![song]);

    let result = resolver.resolve(["ref:Song-1"]).await;
    assert!(matches!(result, Err(Error::DuplicateComplete(_))));
}

#[tokio::test]
async fn test_construction_failure_skips_asset_in_larger_batch() {
    let mut broken = audio("Broken", SONG_2_UUID);
    broken.path = Some("audio/no-extension".to_string());
    let (resolver, _) = setup(vec![audio("Song-1", SONG_1_UUID), broken]);

    let resolved = resolver
        .resolve(["ref:Song-1", "ref:Broken"])
        .await
        .unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].ref_key(), "ref:Song-1");
    assert!(resolver.get_asset("ref:Broken").is_err());
}

#[tokio::test]
async fn test_multipart_selection_grammar() {
    let mut score = image("Score", SCORE_UUID);
    score.multi_part_count = Some(8);
    let (resolver, _) = setup(vec![score]);

    let selection = resolver.resolve_selection("ref:Score#2,3,5-7").await.unwrap();
    assert_eq!(selection.part_nos(), &[2, 3, 5, 6, 7]);

    let tail = resolver.resolve_selection("ref:Score#-3").await.unwrap();
    assert_eq!(tail.part_nos(), &[6, 7, 8]);

    let out_of_range = resolver.resolve_selection("ref:Score#9").await;
    assert!(matches!(out_of_range, Err(Error::OutOfRange { .. })));
}

#[tokio::test]
async fn test_selection_is_cached_and_reuses_the_asset() {
    let mut score = image("Score", SCORE_UUID);
    score.multi_part_count = Some(4);
    let (resolver, catalog) = setup(vec![score]);

    let first = resolver.resolve_selection("ref:Score#1-2").await.unwrap();
    let second = resolver.resolve_selection("ref:Score#1-2").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(catalog.calls(), 1);

    let asset = resolver.get_asset("ref:Score").unwrap();
    assert!(Arc::ptr_eq(first.asset(), &asset));

    // Once the asset is resolved, the synchronous getter builds lazily
    let other = resolver.get_selection("ref:Score#3").unwrap();
    assert_eq!(other.part_nos(), &[3]);
}

#[tokio::test]
async fn test_selection_requires_a_fragment() {
    let mut score = image("Score", SCORE_UUID);
    score.multi_part_count = Some(4);
    let (resolver, _) = setup(vec![score]);

    let result = resolver.resolve_selection("ref:Score").await;
    assert!(matches!(result, Err(Error::InvalidSelection(_))));
}

#[tokio::test]
async fn test_getters_fail_before_resolution() {
    let (resolver, _) = setup(vec![]);

    assert!(matches!(
        resolver.get_asset("ref:Song-1"),
        Err(Error::UnresolvedAsset(_))
    ));
    assert!(matches!(
        resolver.get_sample("ref:Song-1#intro"),
        Err(Error::UnresolvedSample(_))
    ));
    assert!(matches!(
        resolver.get_selection("ref:Score#1"),
        Err(Error::UnresolvedSelection(_))
    ));
}

#[tokio::test]
async fn test_unsupported_scheme_is_rejected_at_fetch() {
    let (resolver, _) = setup(vec![]);

    let result = resolver.resolve(["http://example.com/song.mp3"]).await;
    assert!(matches!(result, Err(Error::UnsupportedScheme { .. })));
}

#[tokio::test]
async fn test_malformed_uri_is_always_fatal() {
    let (resolver, _) = setup(vec![audio("Song-1", SONG_1_UUID)]);

    let result = resolver.resolve_lenient(["Song-1"]).await;
    assert!(matches!(result, Err(Error::MalformedUri { .. })));
}

#[tokio::test]
async fn test_conflicting_identity_pair_drops_second_asset() {
    // Two refs claiming the same uuid: the catalog issued them
    // independently, so they must not collapse into one identity
    let first = audio("Song-A", SONG_1_UUID);
    let second = audio("Song-B", SONG_1_UUID);
    let (resolver, _) = setup(vec![first, second]);

    let resolved = resolver
        .resolve(["ref:Song-A", "ref:Song-B"])
        .await
        .unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].ref_key(), "ref:Song-A");
    assert!(resolver.get_asset("ref:Song-B").is_err());
}

#[tokio::test]
async fn test_assets_listed_in_resolution_order() {
    let (resolver, _) = setup(vec![
        audio("Song-1", SONG_1_UUID),
        audio("Song-2", SONG_2_UUID),
    ]);

    resolver.resolve(["ref:Song-2"]).await.unwrap();
    resolver.resolve(["ref:Song-1"]).await.unwrap();

    let refs: Vec<String> = resolver
        .assets()
        .iter()
        .map(|a| a.ref_key().to_string())
        .collect();
    assert_eq!(refs, vec!["ref:Song-2", "ref:Song-1"]);
}

#[tokio::test]
async fn test_http_url_composition() {
    let (resolver, _) = setup(vec![audio("Song-1", SONG_1_UUID)]);

    let asset = resolver.resolve_asset("ref:Song-1").await.unwrap();
    assert_eq!(
        asset.http_url(),
        "http://catalog:8620/media/audio/song-1.mp3"
    );
}
