//! Multipart fragment grammar and selections
//!
//! A multipart asset is composed of numbered parts (1-based). A URI
//! fragment restricts it to a subset: a comma-separated list of tokens,
//! each a part number `N`, an inclusive range `N-M`, or `-K` for the
//! last `K` parts. The resulting part list is the deduplicated,
//! ascending union of all tokens.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::asset::Asset;
use crate::sample::COMPLETE_ID;
use crate::{Error, Result};

/// Parse a selection fragment against an asset's part count.
///
/// An empty fragment or the literal `complete` denotes "all parts" and
/// routes through the sample path, so both are rejected here. Tokens
/// referencing parts outside `[1, part_count]` fail with the offending
/// token attached.
pub fn parse_selection_spec(spec: &str, part_count: u32) -> Result<Vec<u32>> {
    let trimmed = spec.trim();
    if trimmed.is_empty() || trimmed == COMPLETE_ID {
        return Err(Error::InvalidSelection(spec.to_string()));
    }

    let mut parts: BTreeSet<u32> = BTreeSet::new();

    for token in trimmed.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::InvalidSelection(spec.to_string()));
        }

        if let Some(count_str) = token.strip_prefix('-') {
            // `-K`: the last K parts
            let k: u32 = count_str
                .parse()
                .map_err(|_| Error::InvalidSelection(token.to_string()))?;
            if k == 0 || k > part_count {
                return Err(Error::OutOfRange {
                    token: token.to_string(),
                    part_count,
                });
            }
            parts.extend(part_count - k + 1..=part_count);
        } else if let Some((low_str, high_str)) = token.split_once('-') {
            // `N-M`: inclusive range
            let low: u32 = low_str
                .trim()
                .parse()
                .map_err(|_| Error::InvalidSelection(token.to_string()))?;
            let high: u32 = high_str
                .trim()
                .parse()
                .map_err(|_| Error::InvalidSelection(token.to_string()))?;
            if high < low {
                return Err(Error::InvalidSelection(token.to_string()));
            }
            if low == 0 || high > part_count {
                return Err(Error::OutOfRange {
                    token: token.to_string(),
                    part_count,
                });
            }
            parts.extend(low..=high);
        } else {
            // bare part number
            let no: u32 = token
                .parse()
                .map_err(|_| Error::InvalidSelection(token.to_string()))?;
            if no == 0 || no > part_count {
                return Err(Error::OutOfRange {
                    token: token.to_string(),
                    part_count,
                });
            }
            parts.insert(no);
        }
    }

    Ok(parts.into_iter().collect())
}

fn serialize_asset_ref<S: Serializer>(
    asset: &Arc<Asset>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(asset.ref_key())
}

/// A restriction of a multipart asset to an ordered set of parts.
///
/// Holds a shared reference to the resolved asset, not ownership.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSelection {
    #[serde(rename = "asset", serialize_with = "serialize_asset_ref")]
    asset: Arc<Asset>,
    selection_spec: String,
    part_nos: Vec<u32>,
}

impl PartialSelection {
    /// Build a selection from a raw fragment string.
    pub fn new(asset: Arc<Asset>, selection_spec: &str) -> Result<Self> {
        let part_nos = parse_selection_spec(selection_spec, asset.multi_part_count())?;
        Ok(Self {
            asset,
            selection_spec: selection_spec.to_string(),
            part_nos,
        })
    }

    pub fn asset(&self) -> &Arc<Asset> {
        &self.asset
    }

    /// The raw fragment this selection was parsed from.
    pub fn selection_spec(&self) -> &str {
        &self.selection_spec
    }

    /// Selected part numbers, deduplicated and ascending.
    pub fn part_nos(&self) -> &[u32] {
        &self.part_nos
    }

    /// Store key: `<asset ref>#<fragment>`.
    pub fn ref_key(&self) -> String {
        format!("{}#{}", self.asset.ref_key(), self.selection_spec)
    }

    /// Download URLs of the selected parts, in part order.
    pub fn part_http_urls(&self) -> Result<Vec<String>> {
        self.part_nos
            .iter()
            .map(|&no| self.asset.part_http_url(no))
            .collect()
    }
}
