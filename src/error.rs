//! Common error types for the media resolver

use thiserror::Error;

/// Common result type for resolver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for media resolution.
///
/// Payloads are owned strings and numbers so the enum is `Clone`; results
/// of in-flight catalog fetches are shared between concurrent resolve
/// calls and every waiter receives its own copy.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Identifier does not follow the `<scheme>:<authority>[#fragment]` grammar
    #[error("malformed media URI '{uri}': {reason}")]
    MalformedUri { uri: String, reason: String },

    /// Identifier parsed but its scheme cannot be resolved by the catalog
    #[error("unsupported URI scheme '{scheme}' in '{uri}'")]
    UnsupportedScheme { uri: String, scheme: String },

    /// The catalog has no entry for this identifier
    #[error("media not found: {0}")]
    NotFound(String),

    /// Transport-level failure talking to the catalog
    #[error("network error while fetching '{uri}': {message}")]
    Network { uri: String, message: String },

    /// Catalog answered with a non-success HTTP status
    #[error("catalog API error {status} for '{uri}': {message}")]
    Api {
        uri: String,
        status: u16,
        message: String,
    },

    /// Catalog answered with a body that does not deserialize
    #[error("metadata parse error for '{uri}': {message}")]
    Parse { uri: String, message: String },

    /// A ref/uuid pair disagrees with an already registered mapping
    #[error("identity conflict: {ref_key} <-> {uuid_key} disagrees with an existing mapping")]
    IdentityConflict { ref_key: String, uuid_key: String },

    /// A part-selection token references a part outside the asset
    #[error("part selection token '{token}' is outside 1..={part_count}")]
    OutOfRange { token: String, part_count: u32 },

    /// A fragment that cannot denote a part selection (empty, `complete`,
    /// or not part-number syntax)
    #[error("'{0}' does not denote a part selection")]
    InvalidSelection(String),

    /// Synchronous asset getter called before the asset was resolved
    #[error("asset not resolved yet: {0}")]
    UnresolvedAsset(String),

    /// Synchronous sample getter called before the owning asset was resolved
    #[error("sample not resolved yet: {0}")]
    UnresolvedSample(String),

    /// Synchronous selection getter called before resolution
    #[error("multipart selection not resolved yet: {0}")]
    UnresolvedSelection(String),

    /// Asset metadata carries no extension and none can be derived from its path
    #[error("asset '{0}' has no extension and none can be derived from its path")]
    MissingExtension(String),

    /// The `complete` sample is declared both at the asset root and in the sample list
    #[error("asset '{0}' declares the complete sample both at the root and in its sample list")]
    DuplicateComplete(String),

    /// Catalog metadata violates a construction invariant
    #[error("invalid metadata for '{uri}': {reason}")]
    InvalidMetadata { uri: String, reason: String },

    /// Timing field that is neither a number of seconds nor a timecode
    #[error("invalid timecode '{0}'")]
    InvalidTimecode(String),

    /// Configuration loading or validation error
    #[error("configuration error: {0}")]
    Config(String),
}
