use crate::error::{IssueError, Result};
use sha2::{Digest, Sha256};

/// Base36 alphabet for encoding (0-9, a-z)
const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

const MIN_SUFFIX_LENGTH: usize = 4;
const MAX_SUFFIX_LENGTH: usize = 8;
const NONCES_PER_LENGTH: u32 = 10;

/// Encode bytes to a base36 string of exactly `length` characters
///
/// Pads with leading zeros, or keeps the least significant digits when the
/// value needs more than `length` characters.
fn encode_base36(data: &[u8], length: usize) -> String {
    use num_bigint::BigUint;
    use num_traits::Zero;

    let mut num = BigUint::from_bytes_be(data);
    let zero = BigUint::zero();
    if num == zero {
        return "0".repeat(length);
    }

    let base = BigUint::from(36u32);
    let mut chars = Vec::new();
    while num > zero {
        let remainder = &num % &base;
        num /= &base;
        let digit_idx = remainder.to_u32_digits().first().copied().unwrap_or(0) as usize;
        chars.push(BASE36_ALPHABET[digit_idx] as char);
    }
    chars.reverse();

    let mut result: String = chars.into_iter().collect();
    if result.len() < length {
        result = "0".repeat(length - result.len()) + &result;
    }
    if result.len() > length {
        result = result[result.len() - length..].to_string();
    }

    result
}

/// Hash the creation inputs into a base36 suffix
fn hash_suffix(name: &str, info: &str, nanos: i64, nonce: u32, length: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(info.as_bytes());
    hasher.update([0u8]);
    hasher.update(nanos.to_be_bytes());
    hasher.update(nonce.to_be_bytes());
    let digest = hasher.finalize();

    encode_base36(&digest[..8], length)
}

/// Generate an identifier for a new issue
///
/// The plain creation date is used when `is_taken` reports it free. Otherwise a
/// `-<hash>` suffix is appended, trying several nonces per length before
/// growing the suffix.
pub fn generate_issue_id<F>(
    date: &str,
    name: &str,
    info: &str,
    nanos: i64,
    mut is_taken: F,
) -> Result<String>
where
    F: FnMut(&str) -> bool,
{
    if !is_taken(date) {
        return Ok(date.to_string());
    }

    for length in MIN_SUFFIX_LENGTH..=MAX_SUFFIX_LENGTH {
        for nonce in 0..NONCES_PER_LENGTH {
            let candidate = format!("{}-{}", date, hash_suffix(name, info, nanos, nonce, length));
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
        }
    }

    Err(IssueError::IdExhausted {
        date: date.to_string(),
        attempts: (MAX_SUFFIX_LENGTH - MIN_SUFFIX_LENGTH + 1) * NONCES_PER_LENGTH as usize,
    })
}
