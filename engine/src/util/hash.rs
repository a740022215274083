//! SHA-256 hashing and RFC 4648 lowercase base32 encoding.
//!
//! SHA-256 is delegated to the `sha2` crate; base32 has no corpus-grounded
//! crate (none of the retrieved example manifests depend on `base32` or
//! `data-encoding`), so it is hand-rolled directly from the bit-packing
//! algorithm in `utility/base32.cpp`.

use sha2::{Digest, Sha256};

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Encodes `value`'s 5-bit groups across byte boundaries using a 16-bit
/// sliding window, exactly as `base32_encode` does in the original source.
pub fn base32_encode(value: &[u8]) -> String {
    if value.is_empty() {
        return String::new();
    }
    let n = value.len();
    let out_len = (n * 8 + 4) / 5;
    let mut out = String::with_capacity(out_len);
    let mut bit_nr: u32 = 0;
    let mut byte_nr: usize = 0;
    for _ in 0..out_len {
        let lo = value[byte_nr] as u16;
        let hi = if byte_nr + 1 < n {
            value[byte_nr + 1] as u16
        } else {
            0
        };
        let bits = (hi << 8) | lo;
        let five = ((bits >> bit_nr) & 0x1f) as usize;
        out.push(ALPHABET[five] as char);
        bit_nr += 5;
        if bit_nr >= 8 {
            bit_nr -= 8;
            byte_nr += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        let digest = sha256(b"");
        assert_eq!(
            hex(&digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn base32_roundtrip_length() {
        let encoded = base32_encode(&sha256(b"hello"));
        assert_eq!(encoded.len(), 52);
        assert!(encoded.chars().all(|c| ALPHABET.contains(&(c as u8))));
    }

    #[test]
    fn base32_empty() {
        assert_eq!(base32_encode(&[]), "");
    }
}
