//! KOM Archive Codec
//!
//! Codec for the KOM game archive container format across its three
//! incompatible on-disk schema versions (V2, V3, V4).
//!
//! ## Features
//!
//! - **Versioned entry metadata** as a closed variant type: a record can
//!   only carry the fields its schema version defines
//! - **Zlib payload codec** shared by every format version
//! - **XOR recovery** for legacy V2 archives obfuscated with the
//!   historical 10-byte key
//! - **Pluggable decryption**: V3/V4 algorithm ids 2 and 3 route through
//!   host-supplied plugins, in the stage order the format fixes per id
//! - **crc.xml maintenance**: version inference from document shape,
//!   per-version conversion, and reconciliation against an extraction
//!   directory
//!
//! ## Decode flow
//!
//! ```text
//! reader (positioned at entry) ──▶ read compressed_size bytes
//!        │
//!        ├─ V2 ──▶ inflate ──▶ (on failure) xor + inflate ──▶ write
//!        │
//!        ├─ V3/V4 alg 0 ──▶ inflate ──▶ write
//!        ├─ V3/V4 alg 2 ──▶ decrypt ──▶ inflate ──▶ write
//!        ├─ V3/V4 alg 3 ──▶ inflate ──▶ decrypt ──▶ write
//!        └─ V3/V4 failure ──▶ raw dump as {name}.{size}.{alg}
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use komkit::{ArchiveCodec, EntryRecord, KomContext};
//! use std::fs::File;
//! use std::path::Path;
//!
//! fn main() -> komkit::Result<()> {
//!     let context = KomContext::with_default_converters();
//!     let codec = ArchiveCodec::new(&context);
//!
//!     let mut reader = File::open("data.kom")?;
//!     let entry = EntryRecord::v3("scripts.lua", 340, 120, 0xDEADBEEF, 0, 0);
//!     let outcome = codec.extract_entry(
//!         &mut reader,
//!         &entry,
//!         Path::new("out"),
//!         b"<Files></Files>",
//!         "data",
//!     )?;
//!     println!("wrote {}", outcome.path().display());
//!
//!     codec.update_manifest(3, Path::new("out/crc.xml"), Path::new("out"))?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod compression;
pub mod convert;
pub mod entry;
pub mod error;
pub mod manifest;
pub mod plugin;
pub mod recovery;

// Re-export commonly used types
pub use codec::{ArchiveCodec, EntryOutcome, XOR_MARKER_FILE};
pub use convert::{ManifestConverter, V2Converter, V3Converter, V4Converter};
pub use entry::EntryRecord;
pub use error::{DecodeError, DecryptError, KomError, ManifestError, Result};
pub use manifest::{Manifest, ManifestEntry, ManifestVersion, MANIFEST_FILE_NAME};
pub use plugin::{DecryptionPlugin, KomContext};
pub use recovery::XOR_KEY;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
