//! Resolved media assets
//!
//! An `Asset` is one media file's hydrated catalog metadata plus its
//! derived HTTP location. Assets are created once per canonical
//! identifier during resolution and published immutably; the only
//! later write is the lazily allocated keyboard shortcut.

use once_cell::sync::OnceCell;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::client::RawAssetMetadata;
use crate::config::MediaServerConfig;
use crate::sample::SampleCollection;
use crate::{Error, Result};

/// Coarse media kind, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeKind {
    Audio,
    Video,
    Image,
    Other,
}

impl MimeKind {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "mp3" | "m4a" | "aac" | "flac" | "ogg" | "opus" | "wav" => MimeKind::Audio,
            "mp4" | "webm" | "mov" | "mkv" | "avi" => MimeKind::Video,
            "jpg" | "jpeg" | "png" | "svg" | "gif" | "webp" | "tiff" => MimeKind::Image,
            _ => MimeKind::Other,
        }
    }

    /// Playable kinds own a sample collection.
    pub fn is_playable(&self) -> bool {
        matches!(self, MimeKind::Audio | MimeKind::Video)
    }

    /// Shortcut counter prefix for this kind. Audio and video shortcuts
    /// go to samples, image shortcuts to the asset itself; `Other` media
    /// get no shortcut.
    pub fn shortcut_prefix(&self) -> Option<&'static str> {
        match self {
            MimeKind::Audio => Some("a"),
            MimeKind::Video => Some("v"),
            MimeKind::Image => Some("i"),
            MimeKind::Other => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MimeKind::Audio => "audio",
            MimeKind::Video => "video",
            MimeKind::Image => "image",
            MimeKind::Other => "other",
        }
    }
}

/// Serialize a write-once shortcut cell as an optional string.
pub(crate) fn serialize_shortcut<S: Serializer>(
    cell: &OnceCell<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    cell.get().serialize(serializer)
}

/// One media file's resolved metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    uri: String,
    #[serde(rename = "ref")]
    ref_key: String,
    #[serde(rename = "uuid")]
    uuid_key: String,
    http_url: String,
    mime: MimeKind,
    extension: String,
    title: String,
    multi_part_count: u32,
    has_preview: bool,
    has_waveform: bool,
    cover: Option<String>,
    meta: Value,
    samples: Option<SampleCollection>,
    #[serde(serialize_with = "serialize_shortcut")]
    shortcut: OnceCell<String>,
}

impl Asset {
    /// Build an asset from raw catalog metadata.
    ///
    /// Fails when the metadata carries no usable `path`, when no file
    /// extension is declared or derivable, or when the sample collection
    /// violates its invariants.
    pub fn from_metadata(raw: RawAssetMetadata, config: &MediaServerConfig) -> Result<Self> {
        let ref_key = format!("ref:{}", raw.reference);
        let uuid_key = format!("uuid:{}", raw.uuid);

        let path = raw
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::InvalidMetadata {
                uri: ref_key.clone(),
                reason: "metadata carries no path".to_string(),
            })?;

        let extension = raw
            .extension
            .clone()
            .or_else(|| extension_from_path(path))
            .ok_or_else(|| Error::MissingExtension(ref_key.clone()))?;

        let mime = MimeKind::from_extension(&extension);
        let http_url = format!("{}/{}", config.media_base(), path.trim_start_matches('/'));

        let multi_part_count = raw.multi_part_count.unwrap_or(1);
        if multi_part_count == 0 {
            return Err(Error::InvalidMetadata {
                uri: ref_key,
                reason: "multiPartCount must be at least 1".to_string(),
            });
        }

        let title = raw
            .title
            .clone()
            .unwrap_or_else(|| raw.reference.clone());

        let samples = if mime.is_playable() {
            Some(SampleCollection::from_metadata(&ref_key, &raw)?)
        } else {
            None
        };

        let cover = raw.cover.clone();
        let has_preview = raw.has_preview;
        let has_waveform = raw.has_waveform;
        let meta = serde_json::to_value(&raw).map_err(|e| Error::Parse {
            uri: ref_key.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            uri: ref_key.clone(),
            ref_key,
            uuid_key,
            http_url,
            mime,
            extension,
            title,
            multi_part_count,
            has_preview,
            has_waveform,
            cover,
            meta,
            samples,
            shortcut: OnceCell::new(),
        })
    }

    /// Canonical identifier (no fragment).
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Canonical `ref:` key.
    pub fn ref_key(&self) -> &str {
        &self.ref_key
    }

    /// Canonical `uuid:` key.
    pub fn uuid_key(&self) -> &str {
        &self.uuid_key
    }

    pub fn http_url(&self) -> &str {
        &self.http_url
    }

    pub fn mime(&self) -> MimeKind {
        self.mime
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of parts; 1 for single-part assets.
    pub fn multi_part_count(&self) -> u32 {
        self.multi_part_count
    }

    pub fn has_preview(&self) -> bool {
        self.has_preview
    }

    pub fn has_waveform(&self) -> bool {
        self.has_waveform
    }

    /// URI of the cover asset, if the catalog declares one.
    pub fn cover(&self) -> Option<&str> {
        self.cover.as_deref()
    }

    /// Raw catalog metadata.
    pub fn meta(&self) -> &Value {
        &self.meta
    }

    /// Sample collection; present only for audio and video assets.
    pub fn samples(&self) -> Option<&SampleCollection> {
        self.samples.as_ref()
    }

    /// Keyboard shortcut, assigned on first store insertion for image
    /// assets only.
    pub fn shortcut(&self) -> Option<&str> {
        self.shortcut.get().map(String::as_str)
    }

    pub(crate) fn assign_shortcut(&self, token: String) {
        // Write-once; a second assignment would be a store bookkeeping bug
        let _ = self.shortcut.set(token);
    }

    /// Preview image URL. Only derived from the asset's own preview file;
    /// callers fall back to `cover` when this is `None`.
    pub fn preview_http_url(&self) -> Option<String> {
        self.has_preview
            .then(|| format!("{}_preview.jpg", self.http_url))
    }

    /// Waveform image URL for playable assets that ship one.
    pub fn waveform_http_url(&self) -> Option<String> {
        self.has_waveform
            .then(|| format!("{}_waveform.png", self.http_url))
    }

    /// Download URL for one part of a multipart asset. Part 1 is the
    /// plain file; later parts insert a `_noNNN` suffix before the
    /// extension.
    pub fn part_http_url(&self, part_no: u32) -> Result<String> {
        if part_no == 0 || part_no > self.multi_part_count {
            return Err(Error::OutOfRange {
                token: part_no.to_string(),
                part_count: self.multi_part_count,
            });
        }
        if part_no == 1 {
            return Ok(self.http_url.clone());
        }
        let suffix = format!(".{}", self.extension);
        match self.http_url.strip_suffix(&suffix) {
            Some(stem) => Ok(format!("{}_no{:03}{}", stem, part_no, suffix)),
            None => Ok(format!("{}_no{:03}", self.http_url, part_no)),
        }
    }
}

fn extension_from_path(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next()?;
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_string()),
        _ => None,
    }
}
