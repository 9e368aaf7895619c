// ebuild: a build orchestrator for C and C++ projects.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! The canonicalization and hashing rule behind `variant_id`: sort keys
//! with ASCII case-insensitive order, serialize as UTF-8 `key=value` lines
//! joined by `\n` with no trailing newline, then take the low 32 bits of
//! the big-endian SHA-256 digest.

use sha2::{Digest, Sha256};

/// Canonicalize an option map: keys are folded to ASCII lowercase (so
/// `variant_id` is stable regardless of the declared case of a key), then
/// sorted, then joined as `key=value` separated by `\n` with no trailing
/// newline.
pub fn canonicalize_options<'a>(options: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut pairs: Vec<(String, &str)> = options
        .into_iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v))
        .collect();
    pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `lowest32bits(SHA256(bytes))`, big-endian.
pub fn sha256_low32(bytes: &[u8]) -> u32 {
    let digest = Sha256::digest(bytes);
    let len = digest.len();
    u32::from_be_bytes([
        digest[len - 4],
        digest[len - 3],
        digest[len - 2],
        digest[len - 1],
    ])
}

/// Hex-encode a 32-bit variant id the way it appears in artifact paths.
pub fn variant_id_to_string(id: u32) -> String {
    format!("{id:08x}")
}

/// A stable hex digest of an argument vector, used as the `argument_hash`
/// incremental bookkeeping compares between runs.
pub fn hash_argv<S: AsRef<str>>(argv: impl IntoIterator<Item = S>) -> String {
    let mut hasher = Sha256::new();
    for arg in argv {
        hasher.update(arg.as_ref().as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_is_order_and_case_insensitive() {
        let a = canonicalize_options([("EnableDebug", "true"), ("OptimizeForSize", "true")]);
        let b = canonicalize_options([("optimizeforsize", "true"), ("enabledebug", "true")]);
        assert_eq!(a, b);
        assert_eq!(sha256_low32(a.as_bytes()), sha256_low32(b.as_bytes()));
    }

    #[test]
    fn hash_is_deterministic() {
        let bytes = canonicalize_options([("a", "1"), ("b", "2")]);
        let h1 = sha256_low32(bytes.as_bytes());
        let h2 = sha256_low32(bytes.as_bytes());
        assert_eq!(h1, h2);
    }
}
