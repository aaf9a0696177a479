//! Playable samples and per-asset sample collections
//!
//! A sample is a named, timed sub-region of a playable asset. Every
//! collection carries a `complete` sample standing for the whole file;
//! explicit samples come from the catalog's `samples` list.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::asset::serialize_shortcut;
use crate::client::{RawAssetMetadata, RawSampleMetadata};
use crate::timecode::TimeValue;
use crate::{Error, Result};

/// Sample id of the synthetic whole-file sample.
pub const COMPLETE_ID: &str = "complete";

/// A named, timed sub-region of one playable asset.
///
/// The back-reference to the owning asset is the asset's canonical
/// `ref:` key, not ownership.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    #[serde(rename = "ref")]
    ref_key: String,
    asset_ref: String,
    id: String,
    title: String,
    start_sec: f64,
    duration_sec: Option<f64>,
    end_sec: Option<f64>,
    #[serde(serialize_with = "serialize_shortcut")]
    shortcut: OnceCell<String>,
}

impl Sample {
    fn new(
        asset_ref: &str,
        id: String,
        title: Option<String>,
        start_time: Option<&TimeValue>,
        duration: Option<&TimeValue>,
        end_time: Option<&TimeValue>,
    ) -> Result<Self> {
        let ref_key = format!("{}#{}", asset_ref, id);

        let start_sec = start_time.map(TimeValue::to_seconds).transpose()?.unwrap_or(0.0);
        let duration_sec = duration.map(TimeValue::to_seconds).transpose()?;
        let end_sec = end_time.map(TimeValue::to_seconds).transpose()?;

        if let Some(d) = duration_sec {
            if d <= 0.0 {
                return Err(Error::InvalidMetadata {
                    uri: ref_key,
                    reason: "duration must be positive".to_string(),
                });
            }
        }
        if let Some(e) = end_sec {
            if e <= start_sec {
                return Err(Error::InvalidMetadata {
                    uri: ref_key,
                    reason: "endTime must lie after startTime".to_string(),
                });
            }
        }

        let title = title.filter(|t| !t.is_empty()).unwrap_or_else(|| id.clone());

        Ok(Self {
            ref_key,
            asset_ref: asset_ref.to_string(),
            id,
            title,
            start_sec,
            duration_sec,
            end_sec,
            shortcut: OnceCell::new(),
        })
    }

    /// Full sample key: `<asset ref>#<sample id>`.
    pub fn ref_key(&self) -> &str {
        &self.ref_key
    }

    /// Canonical `ref:` key of the owning asset.
    pub fn asset_ref(&self) -> &str {
        &self.asset_ref
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Playback start in seconds; 0 when the catalog gives none.
    pub fn start_sec(&self) -> f64 {
        self.start_sec
    }

    pub fn duration_sec(&self) -> Option<f64> {
        self.duration_sec
    }

    /// Playback end in seconds: the explicit end time, or start plus
    /// duration, or `None` for "play to the end of the file".
    pub fn end(&self) -> Option<f64> {
        self.end_sec
            .or_else(|| self.duration_sec.map(|d| self.start_sec + d))
    }

    /// Whether this is the whole-file sample.
    pub fn is_complete(&self) -> bool {
        self.id == COMPLETE_ID
    }

    /// Keyboard shortcut, assigned on first store insertion for samples
    /// of audio and video assets.
    pub fn shortcut(&self) -> Option<&str> {
        self.shortcut.get().map(String::as_str)
    }

    pub(crate) fn assign_shortcut(&self, token: String) {
        let _ = self.shortcut.set(token);
    }
}

/// The samples of one playable asset, complete sample first.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct SampleCollection {
    entries: Vec<Arc<Sample>>,
}

impl SampleCollection {
    /// Build the collection for one asset.
    ///
    /// Explicit entries keep their declaration order after the leading
    /// `complete` sample; entries without an id get synthetic ids
    /// `sample1`, `sample2`, … in declaration order. Declaring `complete`
    /// both via root timing fields and in the sample list is a fatal
    /// configuration error; an explicit `complete` entry alone replaces
    /// the synthetic one.
    pub(crate) fn from_metadata(asset_ref: &str, raw: &RawAssetMetadata) -> Result<Self> {
        let mut entries: Vec<Arc<Sample>> = Vec::new();
        let mut complete_index: Option<usize> = None;
        let mut unnamed = 0;

        for declared in raw.samples.iter().flatten() {
            let id = match declared.id.as_deref().filter(|id| !id.is_empty()) {
                Some(id) => id.to_string(),
                None => {
                    unnamed += 1;
                    format!("sample{}", unnamed)
                }
            };

            if id == COMPLETE_ID {
                if raw.has_root_timing() {
                    return Err(Error::DuplicateComplete(asset_ref.to_string()));
                }
                complete_index = Some(entries.len());
            }

            entries.push(Arc::new(Self::build(asset_ref, id, declared)?));
        }

        match complete_index {
            // An explicit complete sample serves as the whole-file sample;
            // move it to the front.
            Some(index) => {
                let complete = entries.remove(index);
                entries.insert(0, complete);
            }
            None => {
                let complete = Sample::new(
                    asset_ref,
                    COMPLETE_ID.to_string(),
                    None,
                    raw.start_time.as_ref(),
                    raw.duration.as_ref(),
                    raw.end_time.as_ref(),
                )?;
                entries.insert(0, Arc::new(complete));
            }
        }

        Ok(Self { entries })
    }

    fn build(asset_ref: &str, id: String, declared: &RawSampleMetadata) -> Result<Sample> {
        Sample::new(
            asset_ref,
            id,
            declared.title.clone(),
            declared.start_time.as_ref(),
            declared.duration.as_ref(),
            declared.end_time.as_ref(),
        )
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Sample>> {
        self.entries.iter().find(|s| s.id() == id)
    }

    /// The whole-file sample. The collection always holds it at index 0.
    pub fn complete(&self) -> &Arc<Sample> {
        &self.entries[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Sample>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with_samples(samples: Vec<RawSampleMetadata>) -> RawAssetMetadata {
        RawAssetMetadata {
            reference: "Song-1".to_string(),
            samples: Some(samples),
            ..Default::default()
        }
    }

    fn declared(id: Option<&str>, start: Option<f64>, duration: Option<f64>) -> RawSampleMetadata {
        RawSampleMetadata {
            id: id.map(str::to_string),
            title: None,
            start_time: start.map(TimeValue::Seconds),
            duration: duration.map(TimeValue::Seconds),
            end_time: None,
        }
    }

    #[test]
    fn test_complete_plus_declared_samples() {
        let raw = raw_with_samples(vec![declared(Some("intro"), Some(0.0), Some(5.0))]);
        let collection = SampleCollection::from_metadata("ref:Song-1", &raw).unwrap();

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.complete().ref_key(), "ref:Song-1#complete");
        let intro = collection.get("intro").unwrap();
        assert_eq!(intro.ref_key(), "ref:Song-1#intro");
        assert_eq!(intro.start_sec(), 0.0);
        assert_eq!(intro.end(), Some(5.0));
    }

    #[test]
    fn test_root_timing_flows_into_complete() {
        let raw = RawAssetMetadata {
            reference: "Song-1".to_string(),
            start_time: Some(TimeValue::Seconds(2.0)),
            duration: Some(TimeValue::Seconds(10.0)),
            ..Default::default()
        };
        let collection = SampleCollection::from_metadata("ref:Song-1", &raw).unwrap();

        assert_eq!(collection.len(), 1);
        let complete = collection.complete();
        assert_eq!(complete.start_sec(), 2.0);
        assert_eq!(complete.end(), Some(12.0));
    }

    #[test]
    fn test_duplicate_complete_definition_is_fatal() {
        let mut raw = raw_with_samples(vec![declared(Some("complete"), Some(0.0), Some(5.0))]);
        raw.start_time = Some(TimeValue::Seconds(0.0));

        let result = SampleCollection::from_metadata("ref:Song-1", &raw);
        assert!(matches!(result, Err(Error::DuplicateComplete(_))));
    }

    #[test]
    fn test_explicit_complete_replaces_synthetic() {
        let raw = raw_with_samples(vec![
            declared(Some("intro"), Some(0.0), Some(5.0)),
            declared(Some("complete"), Some(1.0), Some(30.0)),
        ]);
        let collection = SampleCollection::from_metadata("ref:Song-1", &raw).unwrap();

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.complete().start_sec(), 1.0);
    }

    #[test]
    fn test_unnamed_samples_get_synthetic_ids() {
        let raw = raw_with_samples(vec![
            declared(None, Some(0.0), Some(5.0)),
            declared(Some("refrain"), Some(10.0), None),
            declared(None, Some(20.0), Some(5.0)),
        ]);
        let collection = SampleCollection::from_metadata("ref:Song-1", &raw).unwrap();

        assert!(collection.get("sample1").is_some());
        assert!(collection.get("sample2").is_some());
        assert!(collection.get("refrain").is_some());
    }

    #[test]
    fn test_timecode_strings_accepted() {
        let raw = raw_with_samples(vec![RawSampleMetadata {
            id: Some("solo".to_string()),
            title: Some("Guitar solo".to_string()),
            start_time: Some(TimeValue::Timecode("1:30".to_string())),
            duration: None,
            end_time: Some(TimeValue::Timecode("2:15.5".to_string())),
        }]);
        let collection = SampleCollection::from_metadata("ref:Song-1", &raw).unwrap();

        let solo = collection.get("solo").unwrap();
        assert_eq!(solo.start_sec(), 90.0);
        assert_eq!(solo.end(), Some(135.5));
        assert_eq!(solo.title(), "Guitar solo");
    }

    #[test]
    fn test_negative_duration_rejected() {
        let raw = raw_with_samples(vec![declared(Some("bad"), Some(0.0), Some(-3.0))]);
        assert!(SampleCollection::from_metadata("ref:Song-1", &raw).is_err());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let raw = raw_with_samples(vec![RawSampleMetadata {
            id: Some("bad".to_string()),
            title: None,
            start_time: Some(TimeValue::Seconds(10.0)),
            duration: None,
            end_time: Some(TimeValue::Seconds(5.0)),
        }]);
        assert!(SampleCollection::from_metadata("ref:Song-1", &raw).is_err());
    }
}
