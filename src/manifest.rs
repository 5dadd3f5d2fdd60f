//! crc.xml manifest document model
//!
//! Each extraction directory carries a sidecar document ("crc.xml") that
//! tracks per-entry checksum/time/algorithm metadata, versioned in lockstep
//! with the archive format.
//!
//! **Version inference** (from document shape, never from an explicit tag):
//! - no `<File>` element under the root ⇒ version 2
//! - `<File>` elements without a `MappedID` attribute ⇒ version 3
//! - `<File>` elements with a `MappedID` attribute ⇒ version 4
//!
//! Version 2 predates per-file records; its document carries entry names as
//! plain text lines inside the root element. This module is pure: it parses
//! and serializes documents but never touches the filesystem.

use crate::error::ManifestError;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// File name of the manifest sidecar next to an extracted tree.
pub const MANIFEST_FILE_NAME: &str = "crc.xml";

/// Manifest format version, matching the archive format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestVersion {
    V2,
    V3,
    V4,
}

impl ManifestVersion {
    /// Numeric version (2, 3, or 4).
    pub fn as_u8(self) -> u8 {
        match self {
            ManifestVersion::V2 => 2,
            ManifestVersion::V3 => 3,
            ManifestVersion::V4 => 4,
        }
    }

    /// Parse a numeric version.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            2 => Some(ManifestVersion::V2),
            3 => Some(ManifestVersion::V3),
            4 => Some(ManifestVersion::V4),
            _ => None,
        }
    }
}

/// One per-file descriptor in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    /// CRC-32 of the file content. Zero for descriptors carried over from
    /// a version-2 document, which records none.
    pub checksum: u32,
    /// File time as seconds since the Unix epoch.
    pub time: u32,
    pub algorithm: u8,
    /// Present only in version-4 documents.
    pub mapped_id: Option<String>,
}

impl ManifestEntry {
    /// Descriptor with only a name, all metadata fields zeroed.
    pub fn named(name: impl Into<String>) -> Self {
        ManifestEntry {
            name: name.into(),
            checksum: 0,
            time: 0,
            algorithm: 0,
            mapped_id: None,
        }
    }
}

/// Parsed crc.xml document: an ordered sequence of entry descriptors
/// tagged with the inferred format version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub version: ManifestVersion,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Empty manifest at the given version.
    pub fn empty(version: ManifestVersion) -> Self {
        Manifest {
            version,
            entries: Vec::new(),
        }
    }

    /// Parse a crc.xml document and infer its version from the shape.
    pub fn parse(document: &[u8]) -> Result<Self, ManifestError> {
        let mut reader = Reader::from_reader(document);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut entries = Vec::new();
        let mut version = None;
        let mut legacy_lines = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(element) | Event::Empty(element)
                    if element.name().as_ref() == b"File" =>
                {
                    let entry = parse_file_element(&element)?;
                    // The first File element decides between 3 and 4.
                    if version.is_none() {
                        version = Some(if entry.mapped_id.is_some() {
                            ManifestVersion::V4
                        } else {
                            ManifestVersion::V3
                        });
                    }
                    entries.push(entry);
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    for line in text.lines() {
                        let line = line.trim();
                        if !line.is_empty() {
                            legacy_lines.push(ManifestEntry::named(line));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        match version {
            Some(version) => Ok(Manifest { version, entries }),
            None => Ok(Manifest {
                version: ManifestVersion::V2,
                entries: legacy_lines,
            }),
        }
    }

    /// Infer the version of a document without keeping the parse result.
    pub fn infer_version(document: &[u8]) -> Result<ManifestVersion, ManifestError> {
        Ok(Manifest::parse(document)?.version)
    }

    /// Whether the manifest has a descriptor for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    /// Serialize back to a crc.xml document.
    ///
    /// Version 3/4 entries become `<File>` elements; version 2 entries are
    /// emitted as text lines under the root.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::from("<Files>\n");
        match self.version {
            ManifestVersion::V2 => {
                for entry in &self.entries {
                    out.push_str(&escape(&entry.name));
                    out.push('\n');
                }
            }
            ManifestVersion::V3 | ManifestVersion::V4 => {
                for entry in &self.entries {
                    out.push_str(&format!(
                        "  <File Name=\"{}\" Checksum=\"{}\" Time=\"{}\" Algorithm=\"{}\"",
                        escape(&entry.name),
                        entry.checksum,
                        entry.time,
                        entry.algorithm,
                    ));
                    if self.version == ManifestVersion::V4 {
                        let mapped = entry.mapped_id.as_deref().unwrap_or(&entry.name);
                        out.push_str(&format!(" MappedID=\"{}\"", escape(mapped)));
                    }
                    out.push_str("/>\n");
                }
            }
        }
        out.push_str("</Files>\n");
        out.into_bytes()
    }
}

fn parse_file_element(element: &BytesStart<'_>) -> Result<ManifestEntry, ManifestError> {
    let mut entry = ManifestEntry::named("");
    for attribute in element.attributes() {
        let attribute = attribute?;
        let value = attribute.unescape_value()?;
        match attribute.key.as_ref() {
            b"Name" => entry.name = value.into_owned(),
            // Numeric attributes are parsed leniently; a mangled value
            // degrades to zero rather than rejecting the whole document.
            b"Checksum" => entry.checksum = value.trim().parse().unwrap_or(0),
            b"Time" => entry.time = value.trim().parse().unwrap_or(0),
            b"Algorithm" => entry.algorithm = value.trim().parse().unwrap_or(0),
            b"MappedID" => entry.mapped_id = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v2_document_has_no_file_elements() {
        let document = b"<Files>\nfirst.lua\nsecond.dds\n</Files>";
        let manifest = Manifest::parse(document).unwrap();

        assert_eq!(manifest.version, ManifestVersion::V2);
        assert_eq!(manifest.entries.len(), 2);
        assert_eq!(manifest.entries[0].name, "first.lua");
        assert_eq!(manifest.entries[1].name, "second.dds");
        assert_eq!(manifest.entries[0].checksum, 0);
    }

    #[test]
    fn test_empty_root_is_version_2() {
        let manifest = Manifest::parse(b"<Files></Files>").unwrap();
        assert_eq!(manifest.version, ManifestVersion::V2);
        assert!(manifest.entries.is_empty());
    }

    #[test]
    fn test_v3_document() {
        let document =
            b"<Files><File Name=\"a.lua\" Checksum=\"123\" Time=\"456\" Algorithm=\"2\"/></Files>";
        let manifest = Manifest::parse(document).unwrap();

        assert_eq!(manifest.version, ManifestVersion::V3);
        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(manifest.entries[0].checksum, 123);
        assert_eq!(manifest.entries[0].time, 456);
        assert_eq!(manifest.entries[0].algorithm, 2);
        assert_eq!(manifest.entries[0].mapped_id, None);
    }

    #[test]
    fn test_v4_document() {
        let document = b"<Files><File Name=\"a.lua\" Checksum=\"1\" Time=\"2\" Algorithm=\"0\" MappedID=\"0a1b\"/></Files>";
        let manifest = Manifest::parse(document).unwrap();

        assert_eq!(manifest.version, ManifestVersion::V4);
        assert_eq!(manifest.entries[0].mapped_id.as_deref(), Some("0a1b"));
    }

    #[test]
    fn test_serialize_parse_round_trip_v3() {
        let manifest = Manifest {
            version: ManifestVersion::V3,
            entries: vec![
                ManifestEntry {
                    name: "a.lua".into(),
                    checksum: 0xDEADBEEF,
                    time: 1_600_000_000,
                    algorithm: 0,
                    mapped_id: None,
                },
                ManifestEntry::named("b.dds"),
            ],
        };

        let reparsed = Manifest::parse(&manifest.to_bytes()).unwrap();
        assert_eq!(reparsed, manifest);
    }

    #[test]
    fn test_serialize_v4_defaults_mapped_id_to_name() {
        let manifest = Manifest {
            version: ManifestVersion::V4,
            entries: vec![ManifestEntry::named("a.lua")],
        };

        let reparsed = Manifest::parse(&manifest.to_bytes()).unwrap();
        assert_eq!(reparsed.version, ManifestVersion::V4);
        assert_eq!(reparsed.entries[0].mapped_id.as_deref(), Some("a.lua"));
    }

    #[test]
    fn test_serialize_v2_emits_name_lines() {
        let manifest = Manifest {
            version: ManifestVersion::V2,
            entries: vec![ManifestEntry::named("a.lua"), ManifestEntry::named("b.dds")],
        };

        let bytes = manifest.to_bytes();
        let reparsed = Manifest::parse(&bytes).unwrap();
        assert_eq!(reparsed.version, ManifestVersion::V2);
        assert_eq!(reparsed, manifest);
    }

    #[test]
    fn test_names_with_xml_metacharacters_survive() {
        let manifest = Manifest {
            version: ManifestVersion::V3,
            entries: vec![ManifestEntry::named("a&b<c>.lua")],
        };

        let reparsed = Manifest::parse(&manifest.to_bytes()).unwrap();
        assert_eq!(reparsed.entries[0].name, "a&b<c>.lua");
    }

    #[test]
    fn test_contains() {
        let manifest = Manifest {
            version: ManifestVersion::V3,
            entries: vec![ManifestEntry::named("present.lua")],
        };

        assert!(manifest.contains("present.lua"));
        assert!(!manifest.contains("absent.lua"));
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        assert!(Manifest::parse(b"<Files><File Name=\"a\"></Files>").is_err());
    }

    #[test]
    fn test_version_helpers() {
        assert_eq!(ManifestVersion::from_u8(2), Some(ManifestVersion::V2));
        assert_eq!(ManifestVersion::from_u8(3), Some(ManifestVersion::V3));
        assert_eq!(ManifestVersion::from_u8(4), Some(ManifestVersion::V4));
        assert_eq!(ManifestVersion::from_u8(5), None);
        assert_eq!(ManifestVersion::V4.as_u8(), 4);
    }
}
