//! The sidechain database
//!
//! A deterministic, consensus-critical state machine. For every recognized
//! sidechain it tracks the voting progress of candidate withdrawal bundles
//! toward acceptance, and it maintains the bounded blind-merged-mining
//! linking ratchet of critical hashes anchored into coinbase outputs.
//!
//! The enclosing node drives the database by delivering each connected
//! block's `(height, block hash, coinbase outputs)` and reads state back
//! out; nothing here performs I/O, spawns work, or persists anything. State
//! is rebuilt from blocks after a restart.
//!
//! All mutating calls are serialized by the caller; the database itself is
//! single-writer and never blocks.

mod hash;
mod sync;
mod transition;

use std::collections::BTreeMap;

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{BlockHash, Transaction, TxOut, Txid};
use tracing::{debug, warn};

use crate::bundle::{BundleIndex, BundleVote};
use crate::errors::{Result, UpdateError, Warning};
use crate::ratchet::Ratchet;
use crate::script;
use crate::types::{Deposit, SidechainId, BUNDLE_TX_CACHE_MAX, SIDECHAIN_COUNT};

/// Outcome of a block update
///
/// A successful update may still carry warnings: per-output soft failures
/// never reject the block, they are only reported here (and via `tracing`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Soft failures observed while processing the block's outputs
    pub warnings: Vec<Warning>,
}

impl UpdateReport {
    /// Returns true if the block was processed without warnings
    pub fn is_clean(&self) -> bool { self.warnings.is_empty() }
}

/// Sidechain database tracking withdrawal-bundle votes and BMM linking data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidechainDb {
    /// Per-sidechain bundle vote records, indexed by discriminant
    indexes: [BundleIndex; SIDECHAIN_COUNT],
    /// BMM linking ratchet
    ratchet: Ratchet,
    /// Deposits seen during the current verification period
    deposit_cache: Vec<Deposit>,
    /// Full withdrawal-bundle transactions admitted via [`Self::add_bundle`]
    bundle_tx_cache: Vec<Transaction>,
    /// Hash of the most recent block processed
    last_seen_block: BlockHash,
    /// Bundles touched by the most recent accepted transition
    last_changed: Vec<(SidechainId, Txid)>,
}

impl Default for SidechainDb {
    fn default() -> Self { Self::new() }
}

impl SidechainDb {
    /// Creates an empty database
    pub fn new() -> Self {
        Self {
            indexes: Default::default(),
            ratchet: Ratchet::new(),
            deposit_cache: Vec::new(),
            bundle_tx_cache: Vec::new(),
            last_seen_block: BlockHash::all_zeros(),
            last_changed: Vec::new(),
        }
    }

    /// Returns the database to its initial empty state
    pub fn reset(&mut self) { *self = Self::new(); }

    /// Processes one connected block's coinbase outputs
    ///
    /// The only hard failures are a null block hash and an empty output
    /// list; in both cases the block is not consumed and nothing changes.
    /// Per-output failures are collected as warnings on the report.
    ///
    /// Order of operations: tau-boundary reset, ratchet pass, new-bundle
    /// pass, Merkle-root synchronization, then `last_seen_block` commit.
    pub fn update(
        &mut self,
        height: i32,
        block_hash: BlockHash,
        outputs: &[TxOut],
    ) -> Result<UpdateReport> {
        if block_hash == BlockHash::all_zeros() {
            return Err(UpdateError::NullBlockHash.into());
        }
        if outputs.is_empty() {
            return Err(UpdateError::NoOutputs.into());
        }

        let mut report = UpdateReport::default();

        // A sidechain whose verification period ended starts the next one
        // with a clean slate, before this block's outputs are considered.
        for sidechain in SidechainId::ALL {
            if height > 0 && height % i32::from(sidechain.tau()) == 0 {
                self.clear_sidechain(sidechain);
            }
        }

        for out in outputs {
            if let Some(commit) = script::read_critical_hash(&out.script_pubkey) {
                if !self.ratchet.try_append(commit.hash, commit.block_number) {
                    debug!(
                        hash = %commit.hash,
                        number = commit.block_number,
                        "h* rejected by ratchet"
                    );
                    report.warnings.push(Warning::InvalidCriticalHash(commit.hash));
                }
            }
        }

        for out in outputs {
            if let Some((bundle_id, sidechain)) = script::read_bundle_commit(&out.script_pubkey) {
                self.apply_transition(&[BundleVote::new(sidechain, bundle_id)]);
            }
        }

        // Only an unambiguous root commitment is honored.
        let roots: Vec<sha256d::Hash> =
            outputs.iter().filter_map(|out| script::read_root_commit(&out.script_pubkey)).collect();
        match roots.as_slice() {
            [] => {}
            [root] => {
                if !self.update_to_root(*root) {
                    warn!(%root, "root commitment matched no vote transition");
                    report.warnings.push(Warning::RootNotMatched(*root));
                }
            }
            _ => report.warnings.push(Warning::ConflictingRootCommits),
        }

        self.last_seen_block = block_hash;
        Ok(report)
    }

    /// Applies a vote transition directly
    ///
    /// This is the raw transition entry point used by tests and by the
    /// update driver internally; see the transition rules on
    /// [`BundleVote`]. The sidechain enumeration makes unknown sidechains
    /// unrepresentable, so the call itself always succeeds even when
    /// individual votes are skipped.
    pub fn apply_transition(&mut self, votes: &[BundleVote]) -> bool {
        let accepted = transition::apply_votes(&mut self.indexes, votes);
        if !accepted.is_empty() {
            self.last_changed = accepted;
        }
        true
    }

    /// Caches the deposits found in the given transactions' outputs
    ///
    /// Outputs are scanned with the deposit reader; deposits already cached
    /// (structural equality) are skipped.
    pub fn add_deposits(&mut self, txs: &[Transaction]) {
        let mut found = Vec::new();
        for tx in txs {
            for out in &tx.output {
                if let Some((sidechain, key_id)) = script::read_deposit(&out.script_pubkey) {
                    found.push(Deposit { sidechain, key_id, tx: tx.clone() });
                }
            }
        }
        for deposit in found {
            if !self.have_deposit_cached(&deposit) {
                self.deposit_cache.push(deposit);
            }
        }
    }

    /// Returns true if an identical deposit is already cached
    pub fn have_deposit_cached(&self, deposit: &Deposit) -> bool {
        self.deposit_cache.contains(deposit)
    }

    /// Admits a new withdrawal bundle and caches its transaction
    ///
    /// Fails (returning false, changing nothing) when the transaction cache
    /// is at capacity, the bundle is already cached, or the sidechain's
    /// index has no free slot.
    ///
    /// Admission is not a vote transition: the record is inserted directly
    /// at score zero with the full verification period, and no other
    /// bundle's timer moves. Time only advances with connected blocks.
    pub fn add_bundle(&mut self, sidechain: SidechainId, tx: &Transaction) -> bool {
        if self.bundle_tx_cache.len() >= BUNDLE_TX_CACHE_MAX {
            return false;
        }
        let wtxid = tx.compute_txid();
        if self.have_bundle_cached(&wtxid) {
            return false;
        }
        if self.indexes[sidechain as usize].is_full() {
            return false;
        }

        if !self.indexes[sidechain as usize].insert(BundleVote::new(sidechain, wtxid)) {
            return false;
        }
        self.bundle_tx_cache.push(tx.clone());
        true
    }

    /// Returns true if the full transaction for a bundle id is cached
    pub fn have_bundle_cached(&self, wtxid: &Txid) -> bool {
        self.bundle_tx_cache.iter().any(|tx| tx.compute_txid() == *wtxid)
    }

    /// Looks up the cached transaction for a bundle id
    pub fn bundle_tx(&self, wtxid: &Txid) -> Option<&Transaction> {
        self.bundle_tx_cache.iter().find(|tx| tx.compute_txid() == *wtxid)
    }

    /// Returns true iff the bundle has reached its sidechain's minimum score
    pub fn check_work_score(&self, sidechain: SidechainId, bundle_id: &Txid) -> bool {
        match self.indexes[sidechain as usize].get(bundle_id) {
            Some(record) => record.work_score >= sidechain.min_work_score(),
            None => false,
        }
    }

    /// Snapshot of a sidechain's tracked bundle records, in slot order
    pub fn get_state(&self, sidechain: SidechainId) -> Vec<BundleVote> {
        self.indexes[sidechain as usize].iter().cloned().collect()
    }

    /// Snapshot of the cached deposits for a sidechain
    pub fn get_deposits(&self, sidechain: SidechainId) -> Vec<Deposit> {
        self.deposit_cache.iter().filter(|d| d.sidechain == sidechain).cloned().collect()
    }

    /// Returns true if any sidechain currently tracks a bundle
    pub fn has_state(&self) -> bool { self.indexes.iter().any(BundleIndex::is_populated) }

    /// Merkle root summarizing every tracked bundle record
    pub fn root(&self) -> sha256d::Hash { hash::compute_root(&self.indexes) }

    /// Root the database would have after applying a vote transition
    ///
    /// Evaluated on a scratch copy of the indexes; live state is untouched.
    pub fn root_if_applied(&self, votes: &[BundleVote]) -> sha256d::Hash {
        let mut scratch = self.indexes.clone();
        transition::apply_votes(&mut scratch, votes);
        hash::compute_root(&scratch)
    }

    /// Snapshot of the BMM linking data, hash to sidechain block numbers
    pub fn linking_data(&self) -> BTreeMap<BlockHash, Vec<i32>> { self.ratchet.linking_data() }

    /// Hash of the most recent block processed by [`Self::update`]
    pub fn last_seen_block(&self) -> BlockHash { self.last_seen_block }

    pub(crate) fn index(&self, sidechain: SidechainId) -> &BundleIndex {
        &self.indexes[sidechain as usize]
    }

    pub(crate) fn states(&self) -> impl Iterator<Item = BundleVote> + '_ {
        self.indexes.iter().flat_map(BundleIndex::iter).cloned()
    }

    pub(crate) fn last_changed(&self) -> &[(SidechainId, Txid)] { &self.last_changed }

    /// Clears one sidechain's index and drops the cache entries tied to it
    fn clear_sidechain(&mut self, sidechain: SidechainId) {
        let tracked: Vec<Txid> =
            self.indexes[sidechain as usize].iter().map(|v| v.bundle_id).collect();
        self.indexes[sidechain as usize].clear();
        self.bundle_tx_cache.retain(|tx| !tracked.contains(&tx.compute_txid()));
        self.deposit_cache.retain(|d| d.sidechain != sidechain);
        self.last_changed.retain(|(s, _)| *s != sidechain);
    }
}
