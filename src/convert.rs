//! Manifest version conversion and directory reconciliation
//!
//! One [`ManifestConverter`] per supported format version, selected by
//! matching its declared version against the caller's target. `convert`
//! re-expresses every descriptor under the target schema; `reconcile`
//! brings the manifest back in sync with an extraction directory.
//!
//! Version-2 reconciliation is a recognized gap carried over from the
//! original format: the legacy schema has no authoritative per-file record
//! to reconcile against, so [`V2Converter::reconcile`] reports
//! [`ManifestError::UnsupportedReconcile`] instead of pretending success.

use crate::error::ManifestError;
use crate::manifest::{Manifest, ManifestEntry, ManifestVersion, MANIFEST_FILE_NAME};
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Converts a manifest between format versions and reconciles it against a
/// directory listing. One implementation per supported version.
pub trait ManifestConverter {
    /// The format version this converter produces.
    fn supported_version(&self) -> u8;

    /// Re-express every descriptor under this converter's schema.
    ///
    /// Idempotent: a document already at the target version is returned
    /// byte-for-byte unchanged.
    fn convert(&self, from_version: u8, document: &[u8]) -> Result<Vec<u8>, ManifestError>;

    /// Sync the manifest with `directory`: append descriptors for files the
    /// manifest is missing, drop descriptors whose file is gone. The
    /// manifest sidecar itself is never listed.
    fn reconcile(&self, document: &[u8], directory: &Path) -> Result<Vec<u8>, ManifestError>;
}

/// Converter for legacy version-2 manifests.
pub struct V2Converter;

impl ManifestConverter for V2Converter {
    fn supported_version(&self) -> u8 {
        2
    }

    fn convert(&self, from_version: u8, document: &[u8]) -> Result<Vec<u8>, ManifestError> {
        convert_document(ManifestVersion::V2, from_version, document)
    }

    fn reconcile(&self, _document: &[u8], _directory: &Path) -> Result<Vec<u8>, ManifestError> {
        Err(ManifestError::UnsupportedReconcile { version: 2 })
    }
}

/// Converter for version-3 manifests.
pub struct V3Converter;

impl ManifestConverter for V3Converter {
    fn supported_version(&self) -> u8 {
        3
    }

    fn convert(&self, from_version: u8, document: &[u8]) -> Result<Vec<u8>, ManifestError> {
        convert_document(ManifestVersion::V3, from_version, document)
    }

    fn reconcile(&self, document: &[u8], directory: &Path) -> Result<Vec<u8>, ManifestError> {
        reconcile_document(ManifestVersion::V3, document, directory)
    }
}

/// Converter for version-4 manifests.
pub struct V4Converter;

impl ManifestConverter for V4Converter {
    fn supported_version(&self) -> u8 {
        4
    }

    fn convert(&self, from_version: u8, document: &[u8]) -> Result<Vec<u8>, ManifestError> {
        convert_document(ManifestVersion::V4, from_version, document)
    }

    fn reconcile(&self, document: &[u8], directory: &Path) -> Result<Vec<u8>, ManifestError> {
        reconcile_document(ManifestVersion::V4, document, directory)
    }
}

fn convert_document(
    target: ManifestVersion,
    from_version: u8,
    document: &[u8],
) -> Result<Vec<u8>, ManifestError> {
    // Same-version conversion is a no-op, detected before any re-derivation.
    if from_version == target.as_u8() {
        return Ok(document.to_vec());
    }
    let manifest = Manifest::parse(document)?;
    if manifest.version == target {
        return Ok(document.to_vec());
    }

    let entries = manifest
        .entries
        .into_iter()
        .map(|entry| adapt_entry(entry, target))
        .collect();
    Ok(Manifest {
        version: target,
        entries,
    }
    .to_bytes())
}

/// Re-express one descriptor under the target schema.
///
/// Upgrading from version 2 synthesizes zeroed checksum/time/algorithm
/// fields (the legacy schema records none); upgrading to version 4 defaults
/// the mapped id to the entry name; downgrading drops whatever the target
/// schema cannot carry.
fn adapt_entry(entry: ManifestEntry, target: ManifestVersion) -> ManifestEntry {
    match target {
        ManifestVersion::V2 => ManifestEntry::named(entry.name),
        ManifestVersion::V3 => ManifestEntry {
            mapped_id: None,
            ..entry
        },
        ManifestVersion::V4 => {
            let mapped_id = entry.mapped_id.clone().unwrap_or_else(|| entry.name.clone());
            ManifestEntry {
                mapped_id: Some(mapped_id),
                ..entry
            }
        }
    }
}

fn reconcile_document(
    target: ManifestVersion,
    document: &[u8],
    directory: &Path,
) -> Result<Vec<u8>, ManifestError> {
    let manifest = Manifest::parse(document)?;
    let listing = directory_files(directory)?;

    // Drop descriptors whose file is gone, keeping manifest order.
    let mut entries: Vec<ManifestEntry> = manifest
        .entries
        .into_iter()
        .filter(|entry| listing.iter().any(|name| *name == entry.name))
        .map(|entry| adapt_entry(entry, target))
        .collect();

    // Append descriptors for files the manifest does not know about.
    for name in &listing {
        if !entries.iter().any(|entry| entry.name == *name) {
            entries.push(describe_file(directory, name, target)?);
        }
    }

    Ok(Manifest {
        version: target,
        entries,
    }
    .to_bytes())
}

/// Build a fresh descriptor for a file found in the extraction directory.
fn describe_file(
    directory: &Path,
    name: &str,
    target: ManifestVersion,
) -> Result<ManifestEntry, ManifestError> {
    let path = directory.join(name);
    let content = fs::read(&path)?;
    let time = fs::metadata(&path)?
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as u32)
        .unwrap_or(0);

    Ok(ManifestEntry {
        name: name.to_string(),
        checksum: crc32fast::hash(&content),
        time,
        algorithm: 0,
        mapped_id: (target == ManifestVersion::V4).then(|| name.to_string()),
    })
}

/// Top-level files in `directory`, sorted, with the manifest sidecar
/// excluded from its own listing.
pub(crate) fn directory_files(directory: &Path) -> Result<Vec<String>, ManifestError> {
    let mut names = Vec::new();
    for dir_entry in fs::read_dir(directory)? {
        let dir_entry = dir_entry?;
        if dir_entry.file_type()?.is_file() {
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            if name != MANIFEST_FILE_NAME {
                names.push(name);
            }
        }
    }
    names.sort();
    Ok(names)
}
