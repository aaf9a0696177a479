//! Media URI parsing
//!
//! Catalog entries are addressed as `<scheme>:<authority>[#<fragment>]`.
//! Two schemes resolve against the catalog: `ref:` carries the
//! human-chosen reference key of an asset, `uuid:` the catalog-issued
//! v4 UUID of the same asset. The optional fragment selects a sample or
//! a multipart subset and never takes part in identity: two URIs with
//! equal scheme and authority address the same logical entity.

use std::fmt;

use uuid::Uuid;

use crate::{Error, Result};

/// URI scheme tag.
///
/// Schemes other than `ref` and `uuid` survive parsing (the grammar does
/// not restrict them) but are rejected when handed to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UriScheme {
    Ref,
    Uuid,
    Other(String),
}

impl UriScheme {
    fn from_str(s: &str) -> Self {
        match s {
            "ref" => UriScheme::Ref,
            "uuid" => UriScheme::Uuid,
            other => UriScheme::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            UriScheme::Ref => "ref",
            UriScheme::Uuid => "uuid",
            UriScheme::Other(s) => s,
        }
    }
}

impl fmt::Display for UriScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed media URI. Immutable value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUri {
    raw: String,
    scheme: UriScheme,
    authority: String,
    fragment: Option<String>,
}

impl MediaUri {
    /// Parse a raw identifier string.
    ///
    /// Splits on the first `#` into head and fragment, then on the first
    /// `:` into scheme and authority. An empty fragment (`ref:X#`) is
    /// treated as no fragment. `uuid:` authorities must be valid UUIDs.
    pub fn parse(raw: &str) -> Result<Self> {
        let (head, fragment) = match raw.split_once('#') {
            Some((head, "")) => (head, None),
            Some((head, frag)) => (head, Some(frag.to_string())),
            None => (raw, None),
        };

        let (scheme_str, authority) = head.split_once(':').ok_or_else(|| Error::MalformedUri {
            uri: raw.to_string(),
            reason: "missing ':' between scheme and authority".to_string(),
        })?;

        if scheme_str.is_empty() {
            return Err(Error::MalformedUri {
                uri: raw.to_string(),
                reason: "empty scheme".to_string(),
            });
        }
        if authority.is_empty() {
            return Err(Error::MalformedUri {
                uri: raw.to_string(),
                reason: "empty authority".to_string(),
            });
        }
        if authority.contains(char::is_whitespace) {
            return Err(Error::MalformedUri {
                uri: raw.to_string(),
                reason: "authority contains whitespace".to_string(),
            });
        }

        let scheme = UriScheme::from_str(scheme_str);

        if scheme == UriScheme::Uuid {
            Uuid::parse_str(authority).map_err(|e| Error::MalformedUri {
                uri: raw.to_string(),
                reason: format!("invalid UUID authority: {}", e),
            })?;
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme,
            authority: authority.to_string(),
            fragment,
        })
    }

    /// Pure helper: parse and return the canonical form in one step.
    pub fn strip_fragment(raw: &str) -> Result<String> {
        Ok(Self::parse(raw)?.without_fragment())
    }

    /// The original string this URI was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &UriScheme {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Canonical identifier: `<scheme>:<authority>`, never contains `#`.
    pub fn without_fragment(&self) -> String {
        format!("{}:{}", self.scheme, self.authority)
    }

    /// Drop the fragment, yielding the canonical identity of this URI.
    pub fn canonicalize(self) -> Self {
        let raw = self.without_fragment();
        Self {
            raw,
            scheme: self.scheme,
            authority: self.authority,
            fragment: None,
        }
    }

    /// Whether the catalog can resolve this scheme.
    pub fn is_resolvable(&self) -> bool {
        matches!(self.scheme, UriScheme::Ref | UriScheme::Uuid)
    }
}

impl fmt::Display for MediaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Quick test used when scanning metadata values for embedded identifiers.
pub fn is_media_uri(s: &str) -> bool {
    (s.starts_with("ref:") || s.starts_with("uuid:")) && MediaUri::parse(s).is_ok()
}
