use thiserror::Error;

/// Failure to interpret a compressed entry payload.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is not a valid zlib stream")]
    Malformed,
}

/// Failure in the plugin-mediated decryption path.
///
/// These are recoverable at the batch level: the orchestrator preserves the
/// raw entry bytes under a qualified filename instead of discarding them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    #[error("no decryption plugin registered for algorithm {0}")]
    NoPlugin(u8),

    #[error("unknown entry algorithm {0}")]
    UnknownAlgorithm(u8),

    #[error("decryption plugin failed: {0}")]
    Plugin(String),
}

/// Failure to parse, convert, or reconcile a crc.xml manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("manifest is not well-formed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("manifest attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("version {version} manifests cannot be reconciled against a directory")]
    UnsupportedReconcile { version: u8 },

    #[error("no manifest converter registered for version {0}")]
    NoConverter(u8),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error type for KOM codec operations.
#[derive(Error, Debug)]
pub enum KomError {
    /// Terminal, entry-level failure with no further recovery path.
    #[error("unpacking failed: {0}")]
    Unpacking(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KomError>;
