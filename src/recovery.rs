//! XOR de-obfuscation fallback for legacy V2 archives
//!
//! Some legacy V2 archives store entries XORed with a fixed 10-byte
//! repeating key on top of the zlib compression, as an undocumented
//! obfuscation layer. The recovery path is intentionally narrow: direct
//! inflate first, then exactly one XOR-and-retry. V3/V4 entries carry an
//! explicit algorithm id and never take this path.

use crate::compression::inflate;
use crate::error::DecodeError;

/// The historical obfuscation key: the byte `0xA9` repeated ten times.
pub const XOR_KEY: [u8; 10] = [0xA9; 10];

/// XOR `data` in place against [`XOR_KEY`], cycling byte-for-byte.
pub fn xor_with_key(data: &mut [u8]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= XOR_KEY[i % XOR_KEY.len()];
    }
}

/// Inflate `compressed`, retrying once through XOR de-obfuscation.
///
/// The boolean is `true` when the retry was needed, so the caller can drop
/// a recovery marker in the output tree. The decoded payload itself is
/// identical either way. A second inflate failure means the entry is
/// unrecoverable.
pub fn inflate_with_recovery(compressed: &[u8]) -> Result<(Vec<u8>, bool), DecodeError> {
    match inflate(compressed) {
        Ok(decoded) => Ok((decoded, false)),
        Err(DecodeError::Malformed) => {
            let mut deobfuscated = compressed.to_vec();
            xor_with_key(&mut deobfuscated);
            let decoded = inflate(&deobfuscated)?;
            Ok((decoded, true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::deflate;

    #[test]
    fn test_plain_payload_needs_no_recovery() {
        let compressed = deflate(b"plain v2 payload");
        let (decoded, xor_needed) = inflate_with_recovery(&compressed).unwrap();

        assert_eq!(decoded, b"plain v2 payload");
        assert!(!xor_needed);
    }

    #[test]
    fn test_obfuscated_payload_is_recovered() {
        let mut compressed = deflate(b"obfuscated v2 payload");
        xor_with_key(&mut compressed);

        let (decoded, xor_needed) = inflate_with_recovery(&compressed).unwrap();

        assert_eq!(decoded, b"obfuscated v2 payload");
        assert!(xor_needed);
    }

    #[test]
    fn test_unrecoverable_payload_fails() {
        let err = inflate_with_recovery(b"neither zlib nor xored zlib").unwrap_err();
        assert_eq!(err, DecodeError::Malformed);
    }

    #[test]
    fn test_xor_is_an_involution() {
        let mut data = b"abcdefghijklmnopqrstuvwxyz".to_vec();
        xor_with_key(&mut data);
        assert_ne!(data.as_slice(), b"abcdefghijklmnopqrstuvwxyz");
        xor_with_key(&mut data);
        assert_eq!(data.as_slice(), b"abcdefghijklmnopqrstuvwxyz");
    }
}
