//! Public entry hashes
//!
//! Entries are addressed in URLs by an opaque hash derived from their numeric id.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

/// Minimum length of the plain text before encoding
const HASH_PAD_LEN: usize = 10;

/// Filler used to reach `HASH_PAD_LEN`
const HASH_PAD: &str = "padding";

/// Encode an entry id into its public hash
pub fn encode_hash(id: u64) -> String {
    let mut plain = format!("{}|", id);
    let mut filler = HASH_PAD.chars().cycle();
    while plain.len() < HASH_PAD_LEN {
        if let Some(c) = filler.next() {
            plain.push(c);
        }
    }
    STANDARD_NO_PAD.encode(plain)
}

/// Decode a public hash back into an entry id
pub fn decode_hash(hash: &str) -> Option<u64> {
    let bytes = STANDARD_NO_PAD.decode(hash.trim_end_matches('=')).ok()?;
    let plain = String::from_utf8(bytes).ok()?;
    let (id, _) = plain.split_once('|')?;
    id.parse().ok()
}

/// Resolve either a numeric id or a hash to an entry id
pub fn id_or_hash(value: &str) -> Option<u64> {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return value.parse().ok();
    }
    decode_hash(value)
}
