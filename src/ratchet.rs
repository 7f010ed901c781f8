//! Blind-merged-mining linking ratchet
//!
//! The ratchet keeps the most recent critical hashes anchored into mainchain
//! coinbases, in insertion order, together with a multimap from hash to
//! sidechain block number for O(log n) lookup. Appends are only accepted
//! when the new block number is at most one ahead of the previous append;
//! this pairwise rule is what makes the structure a ratchet. Numbers are not
//! required to be globally monotonic, so the ratchet survives sidechain
//! reorganizations.
//!
//! # Invariants
//!
//! - FIFO order equals insertion order
//! - The multimap holds exactly the entries currently in the FIFO, with
//!   heights for a repeated hash kept in insertion order
//! - The FIFO never exceeds [`MAX_LINKING_DATA`] entries

use std::collections::{BTreeMap, VecDeque};

use bitcoin::BlockHash;

use crate::types::MAX_LINKING_DATA;

/// A critical hash together with the sidechain block number it commits to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CriticalHash {
    /// The committed hash
    pub hash: BlockHash,
    /// Sidechain block number carried by the commitment
    pub block_number: i32,
}

/// Bounded FIFO of critical hashes with a companion lookup multimap
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ratchet {
    queue: VecDeque<CriticalHash>,
    by_hash: BTreeMap<BlockHash, Vec<i32>>,
}

impl Ratchet {
    /// Creates an empty ratchet
    pub fn new() -> Self { Self::default() }

    /// Attempts to append a critical hash
    ///
    /// An empty ratchet accepts anything. Otherwise the entry is accepted
    /// iff its block number is at most one ahead of the most recently
    /// appended number. On rejection the ratchet is unchanged.
    ///
    /// After an accepted append the oldest entry is evicted if the FIFO has
    /// grown past [`MAX_LINKING_DATA`]; eviction erases exactly one multimap
    /// entry, preserving other entries that share the same hash.
    pub fn try_append(&mut self, hash: BlockHash, block_number: i32) -> bool {
        if let Some(last) = self.queue.back() {
            // i64 arithmetic: the numbers are untrusted wire values
            if i64::from(block_number) - i64::from(last.block_number) > 1 {
                return false;
            }
        }

        self.queue.push_back(CriticalHash { hash, block_number });
        self.by_hash.entry(hash).or_default().push(block_number);

        if self.queue.len() > MAX_LINKING_DATA {
            if let Some(evicted) = self.queue.pop_front() {
                if let Some(numbers) = self.by_hash.get_mut(&evicted.hash) {
                    // Heights are stored in insertion order, so the first
                    // entry belongs to the FIFO front being evicted.
                    numbers.remove(0);
                    if numbers.is_empty() {
                        self.by_hash.remove(&evicted.hash);
                    }
                }
            }
        }
        true
    }

    /// Returns a snapshot of the hash-to-block-number multimap
    pub fn linking_data(&self) -> BTreeMap<BlockHash, Vec<i32>> { self.by_hash.clone() }

    /// Returns true if a hash is currently linked
    pub fn contains(&self, hash: &BlockHash) -> bool { self.by_hash.contains_key(hash) }

    /// The most recently appended entry
    pub fn last(&self) -> Option<&CriticalHash> { self.queue.back() }

    /// Number of entries currently held
    pub fn len(&self) -> usize { self.queue.len() }

    /// Returns true if nothing is linked yet
    pub fn is_empty(&self) -> bool { self.queue.is_empty() }

    /// Drops all entries
    pub fn clear(&mut self) {
        self.queue.clear();
        self.by_hash.clear();
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::hashes::Hash;

    use super::*;

    fn hash(n: u8) -> BlockHash { BlockHash::from_byte_array([n; 32]) }

    #[test]
    fn test_first_append_always_accepted() {
        let mut ratchet = Ratchet::new();

        assert!(ratchet.try_append(hash(1), 21_000));
        assert_eq!(ratchet.len(), 1);
        assert!(ratchet.contains(&hash(1)));
    }

    #[test]
    fn test_pairwise_rule() {
        let mut ratchet = Ratchet::new();
        assert!(ratchet.try_append(hash(1), 10));

        // One ahead, equal, and behind are all fine
        assert!(ratchet.try_append(hash(2), 11));
        assert!(ratchet.try_append(hash(3), 11));
        assert!(ratchet.try_append(hash(4), 5));

        // A gap of more than one is not
        assert!(!ratchet.try_append(hash(5), 100));
        assert_eq!(ratchet.len(), 4);
        assert!(!ratchet.contains(&hash(5)));

        // The rule compares against the last accepted entry
        assert!(ratchet.try_append(hash(6), 6));
    }

    #[test]
    fn test_rejection_leaves_state_unchanged() {
        let mut ratchet = Ratchet::new();
        ratchet.try_append(hash(1), 10);
        let before = ratchet.clone();

        assert!(!ratchet.try_append(hash(2), 100));

        assert_eq!(ratchet, before);
    }

    #[test]
    fn test_eviction_keeps_fifo_and_map_in_lockstep() {
        let mut ratchet = Ratchet::new();
        for i in 0..=MAX_LINKING_DATA {
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&(i as u64).to_le_bytes());
            assert!(ratchet.try_append(BlockHash::from_byte_array(bytes), 7));
        }

        assert_eq!(ratchet.len(), MAX_LINKING_DATA);

        // The very first hash was evicted, the second survives
        let mut first = [0u8; 32];
        first[..8].copy_from_slice(&0u64.to_le_bytes());
        assert!(!ratchet.contains(&BlockHash::from_byte_array(first)));
        let mut second = [0u8; 32];
        second[..8].copy_from_slice(&1u64.to_le_bytes());
        assert!(ratchet.contains(&BlockHash::from_byte_array(second)));
        assert_eq!(ratchet.linking_data().values().map(Vec::len).sum::<usize>(), MAX_LINKING_DATA);
    }

    #[test]
    fn test_eviction_preserves_duplicate_hash_entries() {
        let mut ratchet = Ratchet::new();
        // The duplicated hash goes in first and last, so eviction of the
        // FIFO front must leave the newer occurrence linked.
        assert!(ratchet.try_append(hash(0xaa), 3));
        for i in 1..MAX_LINKING_DATA {
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&(i as u64).to_le_bytes());
            assert!(ratchet.try_append(BlockHash::from_byte_array(bytes), 3));
        }
        assert!(ratchet.try_append(hash(0xaa), 4));

        assert_eq!(ratchet.len(), MAX_LINKING_DATA);
        assert_eq!(ratchet.linking_data().get(&hash(0xaa)), Some(&vec![4]));
    }

    #[test]
    fn test_clear() {
        let mut ratchet = Ratchet::new();
        ratchet.try_append(hash(1), 1);

        ratchet.clear();

        assert!(ratchet.is_empty());
        assert!(ratchet.linking_data().is_empty());
    }
}
