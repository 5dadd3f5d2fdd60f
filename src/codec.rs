//! Extraction orchestrator
//!
//! [`ArchiveCodec`] is the only module that touches the filesystem: it reads
//! an entry's compressed region, routes the bytes through the decode path
//! selected by `(version, algorithm)`, and writes the result into the
//! output tree. Manifest conversion and reconciliation run through the
//! converters registered in the [`KomContext`].
//!
//! Decode paths:
//! - V3/V4, algorithm 0: inflate directly; failure is fatal for the entry
//! - V3/V4, algorithm 2: decrypt (plugin) then inflate
//! - V3/V4, algorithm 3: inflate then decrypt (plugin)
//! - V3/V4, any plugin-path failure: the raw bytes are preserved under
//!   `{name}.{uncompressed_size}.{algorithm}` and the failure is reported
//!   in the per-entry outcome, never thrown past the batch
//! - V2: inflate, retrying once through XOR de-obfuscation; recovery drops
//!   a zero-byte marker file in the output tree
//!
//! The codec is synchronous and single-threaded per archive. Callers may
//! parallelize across entries with independent readers, but reconciliation
//! is a read-then-write over the directory listing and must run after all
//! entries complete.

use crate::compression::inflate;
use crate::entry::EntryRecord;
use crate::error::{DecryptError, KomError, ManifestError, Result};
use crate::manifest::{Manifest, MANIFEST_FILE_NAME};
use crate::plugin::KomContext;
use crate::recovery::inflate_with_recovery;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Zero-byte marker dropped next to V2 output when XOR recovery was needed.
/// Name preserved from the original tool.
pub const XOR_MARKER_FILE: &str = "XoRNeeded.dummy";

/// Outcome of extracting a single entry.
///
/// Entry-level failures on the plugin path never abort a batch: the raw
/// bytes are written out and the error travels in the outcome instead.
#[derive(Debug)]
pub enum EntryOutcome {
    /// Decoded payload written under the entry's own name.
    Written { path: PathBuf },
    /// Decoding failed; the raw compressed bytes were preserved under a
    /// qualified filename so they are not lost.
    WrittenRaw { path: PathBuf, error: KomError },
    /// V2 entry decoded successfully, but only after XOR de-obfuscation.
    RecoveredWithXor { path: PathBuf },
}

impl EntryOutcome {
    /// Path of whatever file this entry produced.
    pub fn path(&self) -> &Path {
        match self {
            EntryOutcome::Written { path }
            | EntryOutcome::WrittenRaw { path, .. }
            | EntryOutcome::RecoveredWithXor { path } => path,
        }
    }
}

/// Orchestrates entry extraction and manifest maintenance.
pub struct ArchiveCodec<'ctx> {
    context: &'ctx KomContext,
}

impl<'ctx> ArchiveCodec<'ctx> {
    pub fn new(context: &'ctx KomContext) -> Self {
        ArchiveCodec { context }
    }

    /// Extract one entry.
    ///
    /// `reader` must be positioned at the start of the entry's compressed
    /// region; exactly `compressed_size` bytes are consumed and the cursor
    /// advances no further. `manifest_document` is written verbatim as the
    /// `crc.xml` sidecar if the output directory does not have one yet
    /// (V3/V4 only). `archive_base_name` is the archive's base filename,
    /// forwarded to decryption plugins as a key-derivation input.
    pub fn extract_entry(
        &self,
        reader: &mut dyn Read,
        entry: &EntryRecord,
        output_dir: &Path,
        manifest_document: &[u8],
        archive_base_name: &str,
    ) -> Result<EntryOutcome> {
        fs::create_dir_all(output_dir)?;
        // The sidecar is the only cross-entry shared resource; it is
        // created once, before any entry-specific write.
        if entry.algorithm().is_some() {
            self.seed_manifest(output_dir, manifest_document)?;
        }

        let mut compressed = vec![0u8; entry.compressed_size() as usize];
        reader.read_exact(&mut compressed)?;

        match entry.algorithm() {
            // V3/V4: explicit algorithm id selects the decode path.
            Some(algorithm) => {
                if algorithm == 0 {
                    debug!(name = entry.name(), "decoding stored entry");
                    let decoded = inflate(&compressed).map_err(|_| {
                        KomError::Unpacking(format!(
                            "zlib decompression failed for entry {}",
                            entry.name()
                        ))
                    })?;
                    let path = output_dir.join(entry.name());
                    write_sized(&path, &decoded, entry.uncompressed_size())?;
                    Ok(EntryOutcome::Written { path })
                } else {
                    debug!(
                        name = entry.name(),
                        algorithm, "decoding entry via decryption plugin"
                    );
                    match self.decode_with_plugin(&compressed, algorithm, archive_base_name) {
                        Ok(decoded) => {
                            let path = output_dir.join(entry.name());
                            write_sized(&path, &decoded, entry.uncompressed_size())?;
                            Ok(EntryOutcome::Written { path })
                        }
                        Err(error) => {
                            // Do not discard the entry: dump the raw bytes
                            // under a name that records how to revisit them.
                            let path = output_dir.join(format!(
                                "{}.{}.{}",
                                entry.name(),
                                entry.uncompressed_size(),
                                algorithm
                            ));
                            fs::write(&path, &compressed)?;
                            warn!(
                                name = entry.name(),
                                algorithm,
                                %error,
                                "entry preserved raw after decode failure"
                            );
                            Ok(EntryOutcome::WrittenRaw { path, error })
                        }
                    }
                }
            }
            // V2: no algorithm field; inflate with the XOR fallback.
            None => {
                let (decoded, xor_needed) = inflate_with_recovery(&compressed).map_err(|_| {
                    KomError::Unpacking(format!(
                        "zlib decompression failed for entry {} even after xor recovery",
                        entry.name()
                    ))
                })?;
                let path = output_dir.join(entry.name());
                write_sized(&path, &decoded, entry.uncompressed_size())?;
                if xor_needed {
                    warn!(name = entry.name(), "entry required xor de-obfuscation");
                    fs::File::create(output_dir.join(XOR_MARKER_FILE))?;
                    Ok(EntryOutcome::RecoveredWithXor { path })
                } else {
                    Ok(EntryOutcome::Written { path })
                }
            }
        }
    }

    /// Convert the crc.xml at `manifest_path` to `target_version`, if it is
    /// not already at that version. Missing file is a no-op.
    pub fn convert_manifest(&self, target_version: u8, manifest_path: &Path) -> Result<()> {
        if !manifest_path.exists() {
            return Ok(());
        }
        let document = fs::read(manifest_path)?;
        let current = Manifest::infer_version(&document)?;
        if current.as_u8() == target_version {
            return Ok(());
        }

        let converter = self
            .context
            .converter(target_version)
            .ok_or(ManifestError::NoConverter(target_version))?;
        let converted = converter.convert(current.as_u8(), &document)?;
        fs::write(manifest_path, converted)?;
        Ok(())
    }

    /// Reconcile the crc.xml at `manifest_path` with the files in
    /// `directory`: descriptors are appended for unknown files and removed
    /// for files that are gone. The sidecar is rewritten only when
    /// something is out of sync, so the operation is a fixed point.
    pub fn update_manifest(
        &self,
        version: u8,
        manifest_path: &Path,
        directory: &Path,
    ) -> Result<()> {
        let document = fs::read(manifest_path)?;
        let manifest = Manifest::parse(&document)?;
        let listing = crate::convert::directory_files(directory)?;

        let out_of_sync = if version > 2 {
            listing.iter().any(|name| !manifest.contains(name))
                || manifest
                    .entries
                    .iter()
                    .any(|entry| !listing.iter().any(|name| *name == entry.name))
        } else {
            // The legacy schema has no authoritative per-file record, so
            // any file at all counts as unaccounted for.
            !listing.is_empty()
        };
        if !out_of_sync {
            return Ok(());
        }

        let converter = self
            .context
            .converter(version)
            .ok_or(ManifestError::NoConverter(version))?;
        let reconciled = converter.reconcile(&document, directory)?;
        fs::write(manifest_path, reconciled)?;
        Ok(())
    }

    /// Write the passed-in manifest document verbatim if the output
    /// directory has no sidecar yet. Runs before any V3/V4 entry write.
    fn seed_manifest(&self, output_dir: &Path, manifest_document: &[u8]) -> Result<()> {
        let sidecar = output_dir.join(MANIFEST_FILE_NAME);
        if !sidecar.exists() {
            fs::write(&sidecar, manifest_document)?;
        }
        Ok(())
    }

    /// Run the plugin-mediated decode path. Stage order is fixed by the
    /// format: algorithm 2 decrypts the still-compressed bytes first,
    /// algorithm 3 inflates first and decrypts the result.
    fn decode_with_plugin(
        &self,
        compressed: &[u8],
        algorithm: u8,
        archive_base_name: &str,
    ) -> Result<Vec<u8>> {
        match algorithm {
            2 => {
                let plugin = self
                    .context
                    .plugin(algorithm)
                    .ok_or(DecryptError::NoPlugin(algorithm))?;
                let decrypted = plugin.decrypt(compressed, archive_base_name, algorithm)?;
                Ok(inflate(&decrypted)?)
            }
            3 => {
                let inflated = inflate(compressed)?;
                let plugin = self
                    .context
                    .plugin(algorithm)
                    .ok_or(DecryptError::NoPlugin(algorithm))?;
                Ok(plugin.decrypt(&inflated, archive_base_name, algorithm)?)
            }
            other => Err(DecryptError::UnknownAlgorithm(other).into()),
        }
    }
}

/// Write `data` to `path`, truncated or zero-padded to exactly `size`
/// bytes. The write replaces any existing file.
fn write_sized(path: &Path, data: &[u8], size: u32) -> std::io::Result<()> {
    let size = size as usize;
    if data.len() == size {
        fs::write(path, data)
    } else if data.len() > size {
        fs::write(path, &data[..size])
    } else {
        let mut padded = data.to_vec();
        padded.resize(size, 0);
        fs::write(path, &padded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::deflate;

    #[test]
    fn test_write_sized_truncates_and_pads() {
        let dir = tempfile::tempdir().unwrap();

        let exact = dir.path().join("exact");
        write_sized(&exact, b"abcd", 4).unwrap();
        assert_eq!(fs::read(&exact).unwrap(), b"abcd");

        let truncated = dir.path().join("truncated");
        write_sized(&truncated, b"abcdef", 4).unwrap();
        assert_eq!(fs::read(&truncated).unwrap(), b"abcd");

        let padded = dir.path().join("padded");
        write_sized(&padded, b"ab", 4).unwrap();
        assert_eq!(fs::read(&padded).unwrap(), b"ab\0\0");
    }

    #[test]
    fn test_reader_cursor_stops_after_compressed_region() {
        let context = KomContext::with_default_converters();
        let codec = ArchiveCodec::new(&context);
        let dir = tempfile::tempdir().unwrap();

        let compressed = deflate(b"payload");
        let mut stream = compressed.clone();
        stream.extend_from_slice(b"NEXT ENTRY");

        let entry = EntryRecord::v2("a.bin", 7, compressed.len() as u32, 0);
        let mut reader = stream.as_slice();
        codec
            .extract_entry(&mut reader, &entry, dir.path(), b"", "archive")
            .unwrap();

        // Exactly compressed_size bytes consumed.
        assert_eq!(reader, b"NEXT ENTRY");
    }
}
