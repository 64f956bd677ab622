//! Canonicalizes raw pack-size lists and derives their content identifier.

use sha2::{Digest, Sha256};

use crate::errors::AppError;

/// Number of hex characters kept from the SHA-256 digest.
const VERSION_HASH_LEN: usize = 16;

/// A canonical pack-size sequence: non-empty, strictly ascending, all positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPackSizes {
    sizes: Vec<i64>,
    version_hash: String,
}

impl NormalizedPackSizes {
    pub fn sizes(&self) -> &[i64] {
        &self.sizes
    }

    pub fn version_hash(&self) -> &str {
        &self.version_hash
    }

    pub fn largest(&self) -> i64 {
        // Non-empty by construction.
        self.sizes.last().copied().unwrap_or_default()
    }
}

/// Drops non-positive and duplicate sizes and sorts the rest ascending.
///
/// Fails with `EmptyPackSet` when nothing positive remains.
pub fn normalize_pack_sizes(raw: &[i64]) -> Result<NormalizedPackSizes, AppError> {
    let mut sizes: Vec<i64> = raw.iter().copied().filter(|&size| size > 0).collect();
    if sizes.is_empty() {
        return Err(AppError::EmptyPackSet);
    }
    sizes.sort_unstable();
    sizes.dedup();

    let version_hash = version_hash(&sizes);
    Ok(NormalizedPackSizes {
        sizes,
        version_hash,
    })
}

/// SHA-256 over `"<size>,"` for each size in ascending order, hex, first 16 chars.
///
/// Callers pass an already-canonical sequence; the hash is a pure function of it.
pub fn version_hash(canonical: &[i64]) -> String {
    let mut hasher = Sha256::new();
    for size in canonical {
        hasher.update(format!("{size},").as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    digest[..VERSION_HASH_LEN].to_string()
}
