//! # Lectern Media Resolver
//!
//! Resolves opaque media identifiers (`ref:` and `uuid:` URIs,
//! optionally carrying a fragment) into hydrated, memoized domain
//! objects backed by a remote media catalog:
//! - `Asset`: one media file's metadata and derived HTTP location
//! - `Sample`: a named, timed sub-region of a playable asset
//! - `PartialSelection`: a subset of a multipart asset's parts
//!
//! The [`Resolver`] is the public entry point. It deduplicates and
//! canonicalizes identifiers, fetches metadata in parallel rounds,
//! follows identifiers embedded in metadata transitively, and assigns
//! keyboard shortcuts for presenter hotkeys. Either aliasing scheme
//! reaches the same cached object.

pub mod asset;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod multipart;
pub mod resolver;
pub mod sample;
pub mod timecode;
pub mod uri;

pub use asset::{Asset, MimeKind};
pub use client::{MetadataFetcher, RawAssetMetadata, RawSampleMetadata, RestMetadataClient};
pub use config::MediaServerConfig;
pub use error::{Error, Result};
pub use multipart::PartialSelection;
pub use resolver::Resolver;
pub use sample::{Sample, SampleCollection};
pub use timecode::TimeValue;
pub use uri::{MediaUri, UriScheme};
