//! Secret-field codec for the persisted config document.
//!
//! Password-bearing fields are stored on disk as an encrypted, hex-encoded
//! blob; in memory they are always plaintext.  The cipher is a SHA-256
//! keystream XOR with a fixed symmetric key compiled into the firmware —
//! this obscures stored secrets from casual inspection of the config file
//! and makes no stronger claim than that.
//!
//! Round-trip invariant: `decrypt(encrypt(p)) == p` for any `p` up to the
//! field capacity ([`STR_LONG`] bytes).

use heapless::{String, Vec};
use hmac_sha256::Hash;

use crate::config::STR_LONG;
use crate::error::SecretError;

/// Fixed symmetric key compiled into the firmware.
pub const SECRET_KEY: [u8; 16] = *b"my_secure_key123";

/// Maximum length of an encoded blob: two hex digits per plaintext byte.
pub const BLOB_LEN: usize = STR_LONG * 2;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Keystream byte `i`: SHA-256(key ‖ block_index) indexed within the block.
fn keystream_byte(key: &[u8; 16], i: usize) -> u8 {
    let mut h = Hash::new();
    h.update(key);
    h.update(((i / 32) as u32).to_le_bytes());
    h.finalize()[i % 32]
}

/// Encrypt a plaintext secret into a printable hex blob.
pub fn encrypt(plain: &str, key: &[u8; 16]) -> Result<String<BLOB_LEN>, SecretError> {
    if plain.len() > STR_LONG {
        return Err(SecretError::TooLong);
    }
    let mut out: String<BLOB_LEN> = String::new();
    for (i, b) in plain.bytes().enumerate() {
        let c = b ^ keystream_byte(key, i);
        // Capacity is two hex digits per input byte; cannot overflow.
        let _ = out.push(HEX[(c >> 4) as usize] as char);
        let _ = out.push(HEX[(c & 0x0f) as usize] as char);
    }
    Ok(out)
}

/// Decrypt a hex blob back to the plaintext secret.
///
/// An empty blob decodes to an empty secret.  A malformed blob (odd length,
/// non-hex digit) or non-UTF-8 plaintext is an error; callers treat it as a
/// non-fatal empty-field outcome.
pub fn decrypt(blob: &str, key: &[u8; 16]) -> Result<String<STR_LONG>, SecretError> {
    if blob.len() % 2 != 0 || blob.len() > BLOB_LEN {
        return Err(SecretError::Malformed);
    }
    let mut bytes: Vec<u8, STR_LONG> = Vec::new();
    let raw = blob.as_bytes();
    for (i, pair) in raw.chunks_exact(2).enumerate() {
        let hi = hex_val(pair[0]).ok_or(SecretError::Malformed)?;
        let lo = hex_val(pair[1]).ok_or(SecretError::Malformed)?;
        let c = (hi << 4) | lo;
        bytes
            .push(c ^ keystream_byte(key, i))
            .map_err(|_| SecretError::Malformed)?;
    }
    let s = core::str::from_utf8(&bytes).map_err(|_| SecretError::NotUtf8)?;
    let mut out: String<STR_LONG> = String::new();
    out.push_str(s).map_err(|_| SecretError::TooLong)?;
    Ok(out)
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_simple() {
        let blob = encrypt("hunter2", &SECRET_KEY).unwrap();
        assert_eq!(decrypt(&blob, &SECRET_KEY).unwrap().as_str(), "hunter2");
    }

    #[test]
    fn roundtrip_empty() {
        let blob = encrypt("", &SECRET_KEY).unwrap();
        assert!(blob.is_empty());
        assert!(decrypt(&blob, &SECRET_KEY).unwrap().is_empty());
    }

    #[test]
    fn roundtrip_max_length() {
        let plain: std::string::String = core::iter::repeat('p').take(STR_LONG).collect();
        let blob = encrypt(&plain, &SECRET_KEY).unwrap();
        assert_eq!(blob.len(), BLOB_LEN);
        assert_eq!(decrypt(&blob, &SECRET_KEY).unwrap().as_str(), plain);
    }

    #[test]
    fn blob_is_printable_hex() {
        let blob = encrypt("p@ss wörd!", &SECRET_KEY).unwrap();
        assert!(blob.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn rejects_overlong_plaintext() {
        let plain: std::string::String = core::iter::repeat('x').take(STR_LONG + 1).collect();
        assert_eq!(encrypt(&plain, &SECRET_KEY), Err(SecretError::TooLong));
    }

    #[test]
    fn rejects_odd_length_blob() {
        assert_eq!(decrypt("abc", &SECRET_KEY), Err(SecretError::Malformed));
    }

    #[test]
    fn rejects_non_hex_blob() {
        assert_eq!(decrypt("zz", &SECRET_KEY), Err(SecretError::Malformed));
    }

    #[test]
    fn wrong_key_does_not_roundtrip() {
        let blob = encrypt("correct horse", &SECRET_KEY).unwrap();
        let other = [0u8; 16];
        let out = decrypt(&blob, &other);
        // Either garbage UTF-8 (error) or a different string — never the input.
        if let Ok(s) = out {
            assert_ne!(s.as_str(), "correct horse");
        }
    }
}
