//! Zlib compression for KOM entry payloads
//!
//! Every KOM version stores entry payloads as zlib streams; the codec is
//! stateless and shared by all format versions.
//!
//! **Design**:
//! - `deflate` is deterministic and infallible for in-memory input
//! - `inflate` fails with [`DecodeError::Malformed`] when the byte stream is
//!   not valid zlib; a short-but-valid stream is not a codec error, the
//!   caller compares decoded length against the declared size
//! - Payload sizes are bounded by the archive's declared
//!   `compressed_size`/`uncompressed_size`; enforcing those caps on
//!   untrusted input is the caller's responsibility

use crate::error::DecodeError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compress `raw` into a zlib stream at the default compression level.
pub fn deflate(raw: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    // The sink is a Vec, so the only possible I/O error source is unreachable.
    encoder
        .write_all(raw)
        .expect("writing to an in-memory buffer cannot fail");
    encoder
        .finish()
        .expect("writing to an in-memory buffer cannot fail")
}

/// Decompress a zlib stream.
///
/// Returns [`DecodeError::Malformed`] when `compressed` is not a valid zlib
/// stream.
pub fn inflate(compressed: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|_| DecodeError::Malformed)?;
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_round_trip() {
        let data = b"KOM entry payload ".repeat(64);
        let compressed = deflate(&data);
        let decoded = inflate(&compressed).unwrap();

        assert_eq!(decoded, data);
        assert!(compressed.len() < data.len());
    }

    #[test]
    fn test_empty_round_trip() {
        let compressed = deflate(b"");
        assert_eq!(inflate(&compressed).unwrap(), b"");
    }

    #[test]
    fn test_inflate_rejects_garbage() {
        let err = inflate(b"not a zlib stream").unwrap_err();
        assert_eq!(err, DecodeError::Malformed);
    }

    #[test]
    fn test_inflate_rejects_truncated_stream() {
        let compressed = deflate(&b"some payload".repeat(32));
        let err = inflate(&compressed[..4]).unwrap_err();
        assert_eq!(err, DecodeError::Malformed);
    }

    proptest! {
        #[test]
        fn prop_inflate_inverts_deflate(data in prop::collection::vec(any::<u8>(), 0..4096)) {
            let compressed = deflate(&data);
            let decoded = inflate(&compressed).unwrap();
            prop_assert_eq!(decoded, data);
        }
    }
}
