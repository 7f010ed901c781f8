//! Withdrawal-bundle vote records and the per-sidechain slot table
//!
//! Each sidechain tracks at most [`MAX_BUNDLES_PER_SIDECHAIN`] candidate
//! withdrawal bundles per verification period. A bundle's record carries the
//! number of blocks remaining in the period and the work score accumulated
//! from block-producer votes.
//!
//! # Invariants
//!
//! - A slot table never holds two records with the same bundle id
//! - Slots fill front-to-back; iteration order is slot order
//! - `work_score` and `blocks_left` never exceed the sidechain's tau

use bitcoin::hashes::Hash;
use bitcoin::Txid;

use crate::types::{SidechainId, MAX_BUNDLES_PER_SIDECHAIN};

/// Vote record of a single withdrawal bundle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleVote {
    /// Sidechain the bundle withdraws from
    pub sidechain: SidechainId,
    /// Hash of the withdrawal-bundle transaction
    pub bundle_id: Txid,
    /// Blocks remaining in the verification period
    pub blocks_left: u16,
    /// Accumulated work score
    pub work_score: u16,
}

impl BundleVote {
    /// Creates a fresh record for a newly proposed bundle
    ///
    /// New bundles start at score zero with the full verification period
    /// ahead of them.
    pub fn new(sidechain: SidechainId, bundle_id: Txid) -> Self {
        Self { sidechain, bundle_id, blocks_left: sidechain.tau(), work_score: 0 }
    }

    /// Returns true if this record has an all-zero bundle id
    pub fn is_null(&self) -> bool { self.bundle_id == Txid::all_zeros() }
}

/// Fixed-capacity slot table of bundle vote records for one sidechain
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BundleIndex {
    slots: [Option<BundleVote>; MAX_BUNDLES_PER_SIDECHAIN],
}

impl BundleIndex {
    /// Creates an empty slot table
    pub fn new() -> Self { Self::default() }

    /// Looks up the record for a bundle id
    pub fn get(&self, bundle_id: &Txid) -> Option<&BundleVote> {
        self.slots.iter().flatten().find(|v| v.bundle_id == *bundle_id)
    }

    /// Returns true if a record for the bundle id is present
    pub fn contains(&self, bundle_id: &Txid) -> bool { self.get(bundle_id).is_some() }

    /// Inserts or overwrites a vote record
    ///
    /// A record with the same bundle id is overwritten in place; otherwise
    /// the first free slot is taken. Returns false if the vote is null or
    /// every slot is occupied by a different bundle.
    pub fn insert(&mut self, vote: BundleVote) -> bool {
        if vote.is_null() {
            return false;
        }
        for slot in self.slots.iter_mut() {
            match slot {
                Some(v) if v.bundle_id == vote.bundle_id => {
                    *slot = Some(vote);
                    return true;
                }
                None => {
                    *slot = Some(vote);
                    return true;
                }
                Some(_) => continue,
            }
        }
        false
    }

    /// Empties every slot
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }

    /// Returns true if every slot is occupied
    pub fn is_full(&self) -> bool { self.slots.iter().all(|s| s.is_some()) }

    /// Returns true if at least one slot is occupied
    pub fn is_populated(&self) -> bool { self.slots.iter().any(|s| s.is_some()) }

    /// Number of occupied slots
    pub fn count(&self) -> usize { self.slots.iter().flatten().count() }

    /// Iterates the occupied slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = &BundleVote> { self.slots.iter().flatten() }

    /// Iterates the occupied slots mutably in slot order
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut BundleVote> {
        self.slots.iter_mut().flatten()
    }
}
