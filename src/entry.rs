//! Per-entry metadata for the three KOM schema versions
//!
//! A KOM archive stores one metadata record per member. The record shape
//! changed twice over the format's lifetime:
//!
//! - **V2**: name + sizes + relative offset inside the data region
//! - **V3**: name + sizes + CRC-32 checksum, file time, and algorithm id
//! - **V4**: everything V3 has plus a mapped id string
//!
//! The variants are a closed enum so that a field foreign to the active
//! version is unrepresentable: a V2 record has no checksum to read, rather
//! than a checksum that happens to be zero.

/// Metadata for one archive member, tagged by schema version.
///
/// Records are constructed once per entry, either from parsed archive
/// header bytes (unpack path) or from caller-supplied file content plus
/// precomputed sizes (pack path), and are immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRecord {
    /// KOM V2 entry.
    V2 {
        name: String,
        uncompressed_size: u32,
        compressed_size: u32,
        relative_offset: u32,
        /// File content staged for packing. Absent on the unpack path.
        raw_payload: Option<Vec<u8>>,
    },
    /// KOM V3 entry.
    V3 {
        name: String,
        uncompressed_size: u32,
        compressed_size: u32,
        /// CRC-32 of the original (uncompressed) file.
        checksum: u32,
        file_time: u32,
        /// 0 = store, 2/3 = plugin-mediated encrypted variants.
        algorithm: u8,
    },
    /// KOM V4 entry.
    V4 {
        name: String,
        uncompressed_size: u32,
        compressed_size: u32,
        checksum: u32,
        file_time: u32,
        algorithm: u8,
        mapped_id: String,
    },
}

impl EntryRecord {
    /// V2 record for unpacking.
    pub fn v2(
        name: impl Into<String>,
        uncompressed_size: u32,
        compressed_size: u32,
        relative_offset: u32,
    ) -> Self {
        EntryRecord::V2 {
            name: name.into(),
            uncompressed_size,
            compressed_size,
            relative_offset,
            raw_payload: None,
        }
    }

    /// V2 record carrying the file content to be packed.
    pub fn v2_for_packing(
        raw_payload: Vec<u8>,
        name: impl Into<String>,
        uncompressed_size: u32,
        compressed_size: u32,
        relative_offset: u32,
    ) -> Self {
        EntryRecord::V2 {
            name: name.into(),
            uncompressed_size,
            compressed_size,
            relative_offset,
            raw_payload: Some(raw_payload),
        }
    }

    /// V3 record for unpacking.
    pub fn v3(
        name: impl Into<String>,
        uncompressed_size: u32,
        compressed_size: u32,
        checksum: u32,
        file_time: u32,
        algorithm: u8,
    ) -> Self {
        EntryRecord::V3 {
            name: name.into(),
            uncompressed_size,
            compressed_size,
            checksum,
            file_time,
            algorithm,
        }
    }

    /// V4 record for unpacking.
    pub fn v4(
        name: impl Into<String>,
        uncompressed_size: u32,
        compressed_size: u32,
        checksum: u32,
        file_time: u32,
        algorithm: u8,
        mapped_id: impl Into<String>,
    ) -> Self {
        EntryRecord::V4 {
            name: name.into(),
            uncompressed_size,
            compressed_size,
            checksum,
            file_time,
            algorithm,
            mapped_id: mapped_id.into(),
        }
    }

    /// Schema version of this record (2, 3, or 4).
    pub fn version(&self) -> u8 {
        match self {
            EntryRecord::V2 { .. } => 2,
            EntryRecord::V3 { .. } => 3,
            EntryRecord::V4 { .. } => 4,
        }
    }

    /// Entry file name.
    pub fn name(&self) -> &str {
        match self {
            EntryRecord::V2 { name, .. }
            | EntryRecord::V3 { name, .. }
            | EntryRecord::V4 { name, .. } => name,
        }
    }

    /// Original (decoded) file size in bytes.
    pub fn uncompressed_size(&self) -> u32 {
        match self {
            EntryRecord::V2 {
                uncompressed_size, ..
            }
            | EntryRecord::V3 {
                uncompressed_size, ..
            }
            | EntryRecord::V4 {
                uncompressed_size, ..
            } => *uncompressed_size,
        }
    }

    /// On-disk (compressed) payload size in bytes.
    pub fn compressed_size(&self) -> u32 {
        match self {
            EntryRecord::V2 {
                compressed_size, ..
            }
            | EntryRecord::V3 {
                compressed_size, ..
            }
            | EntryRecord::V4 {
                compressed_size, ..
            } => *compressed_size,
        }
    }

    /// Algorithm id. `None` for V2 records, which predate the field.
    pub fn algorithm(&self) -> Option<u8> {
        match self {
            EntryRecord::V2 { .. } => None,
            EntryRecord::V3 { algorithm, .. } | EntryRecord::V4 { algorithm, .. } => {
                Some(*algorithm)
            }
        }
    }

    /// CRC-32 checksum. `None` for V2 records.
    pub fn checksum(&self) -> Option<u32> {
        match self {
            EntryRecord::V2 { .. } => None,
            EntryRecord::V3 { checksum, .. } | EntryRecord::V4 { checksum, .. } => Some(*checksum),
        }
    }

    /// File time. `None` for V2 records.
    pub fn file_time(&self) -> Option<u32> {
        match self {
            EntryRecord::V2 { .. } => None,
            EntryRecord::V3 { file_time, .. } | EntryRecord::V4 { file_time, .. } => {
                Some(*file_time)
            }
        }
    }

    /// Mapped id. `None` for anything older than V4.
    pub fn mapped_id(&self) -> Option<&str> {
        match self {
            EntryRecord::V4 { mapped_id, .. } => Some(mapped_id),
            _ => None,
        }
    }

    /// Relative offset inside the data region. `None` for V3/V4 records.
    pub fn relative_offset(&self) -> Option<u32> {
        match self {
            EntryRecord::V2 {
                relative_offset, ..
            } => Some(*relative_offset),
            _ => None,
        }
    }

    /// Staged pack-path payload, if this record was built for packing.
    pub fn raw_payload(&self) -> Option<&[u8]> {
        match self {
            EntryRecord::V2 { raw_payload, .. } => raw_payload.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v2_record() {
        let entry = EntryRecord::v2("data.lua", 340, 120, 64);

        assert_eq!(entry.version(), 2);
        assert_eq!(entry.name(), "data.lua");
        assert_eq!(entry.uncompressed_size(), 340);
        assert_eq!(entry.compressed_size(), 120);
        assert_eq!(entry.relative_offset(), Some(64));

        // V3/V4 fields do not exist on a V2 record
        assert_eq!(entry.checksum(), None);
        assert_eq!(entry.file_time(), None);
        assert_eq!(entry.algorithm(), None);
        assert_eq!(entry.mapped_id(), None);
        assert_eq!(entry.raw_payload(), None);
    }

    #[test]
    fn test_v2_packing_record_carries_payload() {
        let entry = EntryRecord::v2_for_packing(b"payload".to_vec(), "data.lua", 7, 15, 0);

        assert_eq!(entry.version(), 2);
        assert_eq!(entry.raw_payload(), Some(b"payload".as_slice()));
    }

    #[test]
    fn test_v3_record() {
        let entry = EntryRecord::v3("model.x", 1024, 512, 0xDEADBEEF, 1_234_567, 2);

        assert_eq!(entry.version(), 3);
        assert_eq!(entry.checksum(), Some(0xDEADBEEF));
        assert_eq!(entry.file_time(), Some(1_234_567));
        assert_eq!(entry.algorithm(), Some(2));
        assert_eq!(entry.relative_offset(), None);
        assert_eq!(entry.mapped_id(), None);
    }

    #[test]
    fn test_v4_record() {
        let entry = EntryRecord::v4("tex.dds", 2048, 900, 42, 7, 0, "0a1b2c");

        assert_eq!(entry.version(), 4);
        assert_eq!(entry.mapped_id(), Some("0a1b2c"));
        assert_eq!(entry.algorithm(), Some(0));
    }
}
