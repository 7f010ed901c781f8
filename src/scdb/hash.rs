//! State Merkle hashing
//!
//! The database state is summarized as a Bitcoin-style Merkle root over the
//! canonical serialization of every tracked bundle record. Block producers
//! commit this root in their coinbase to signal a score update without
//! transmitting the votes themselves, so the serialization below is
//! consensus-critical.

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::merkle_tree;

use crate::bundle::{BundleIndex, BundleVote};
use crate::types::SIDECHAIN_COUNT;

/// Canonical leaf length: sidechain id, bundle hash, blocks left, work score
const LEAF_LEN: usize = 1 + 32 + 2 + 2;

/// Hashes one bundle record into a Merkle leaf
///
/// Serialization is `sidechain(1) || bundle_id(32) || blocks_left(LE16) ||
/// work_score(LE16)`, double-SHA256.
pub(crate) fn bundle_leaf_hash(vote: &BundleVote) -> sha256d::Hash {
    let mut data = [0u8; LEAF_LEN];
    data[0] = vote.sidechain as u8;
    data[1..33].copy_from_slice(vote.bundle_id.as_byte_array());
    data[33..35].copy_from_slice(&vote.blocks_left.to_le_bytes());
    data[35..37].copy_from_slice(&vote.work_score.to_le_bytes());
    sha256d::Hash::hash(&data)
}

/// Computes the Merkle root over every tracked bundle record
///
/// Leaves are taken per sidechain in enumeration order, per slot in slot
/// order, and combined with the standard Bitcoin Merkle tree (odd last leaf
/// paired with itself). An empty state hashes to the all-zero root.
pub(crate) fn compute_root(indexes: &[BundleIndex; SIDECHAIN_COUNT]) -> sha256d::Hash {
    let leaves = indexes.iter().flat_map(BundleIndex::iter).map(bundle_leaf_hash);
    merkle_tree::calculate_root(leaves).unwrap_or_else(sha256d::Hash::all_zeros)
}
