//! Merkle-root synchronization
//!
//! A block producer that changed bundle scores commits only the resulting
//! state root. To follow along, every node searches the space of vote
//! transitions it considers possible, computes each candidate's root on a
//! scratch copy, and commits the first one that reproduces the target.
//!
//! The search is exponential in the number of active bundles, so three
//! cheap checks run first: the state may already match, the producer may
//! have upvoted everything, or it may have upvoted the same bundles as last
//! tick. Only then does the full per-slot {abstain, upvote, downvote}
//! Cartesian product run.

use bitcoin::hashes::sha256d;
use tracing::debug;

use crate::bundle::{BundleIndex, BundleVote};
use crate::scdb::SidechainDb;
use crate::types::SidechainId;

/// A copy of a tracked record with one block of verification time consumed
fn abstain(record: &BundleVote) -> BundleVote {
    BundleVote { blocks_left: record.blocks_left.saturating_sub(1), ..record.clone() }
}

fn upvote(record: &BundleVote) -> BundleVote {
    BundleVote { work_score: record.work_score + 1, ..abstain(record) }
}

fn downvote(record: &BundleVote) -> BundleVote {
    BundleVote { work_score: record.work_score - 1, ..abstain(record) }
}

impl SidechainDb {
    /// Searches for a vote transition that reproduces `target` and commits it
    ///
    /// Returns true iff the database root equals `target` afterwards. When
    /// no candidate transition matches, the state is left untouched and the
    /// search itself never mutates live state: every candidate is evaluated
    /// on a scratch copy of the indexes.
    pub fn update_to_root(&mut self, target: sha256d::Hash) -> bool {
        if self.root() == target {
            return true;
        }
        if !self.has_state() {
            return false;
        }

        // Producers usually upvote every bundle they track.
        let upvote_all: Vec<BundleVote> = self
            .states()
            .filter(|record| record.work_score < record.sidechain.tau())
            .map(|record| upvote(&record))
            .collect();
        if self.root_if_applied(&upvote_all) == target {
            debug!(%target, "root matched by upvote-all transition");
            return self.commit_votes(&upvote_all, target);
        }

        // Or they keep voting for the bundles they touched last tick.
        let replay: Vec<BundleVote> = self
            .last_changed()
            .iter()
            .filter_map(|(sidechain, bundle_id)| {
                self.index(*sidechain).get(bundle_id).cloned()
            })
            .filter(|record| record.work_score < record.sidechain.tau())
            .map(|record| upvote(&record))
            .collect();
        if !replay.is_empty() && self.root_if_applied(&replay) == target {
            debug!(%target, "root matched by replaying last tick");
            return self.commit_votes(&replay, target);
        }

        // Full search: one {abstain, upvote, downvote} slot variant per
        // populated sidechain, Cartesian product across sidechains.
        let alternatives: Vec<Vec<BundleVote>> = SidechainId::ALL
            .iter()
            .map(|sidechain| self.index(*sidechain))
            .filter(|index| index.is_populated())
            .map(slot_variants)
            .collect();

        let mut chosen = vec![0usize; alternatives.len()];
        loop {
            let candidate: Vec<BundleVote> = chosen
                .iter()
                .zip(&alternatives)
                .map(|(&pick, variants)| variants[pick].clone())
                .collect();
            if self.root_if_applied(&candidate) == target {
                debug!(%target, "root matched by exhaustive search");
                return self.commit_votes(&candidate, target);
            }

            // Advance the mixed-radix counter over the candidate space
            let mut position = 0;
            loop {
                chosen[position] += 1;
                if chosen[position] < alternatives[position].len() {
                    break;
                }
                chosen[position] = 0;
                position += 1;
                if position == alternatives.len() {
                    debug!(%target, "no vote transition reproduces root");
                    return false;
                }
            }
        }
    }

    fn commit_votes(&mut self, votes: &[BundleVote], target: sha256d::Hash) -> bool {
        self.apply_transition(votes);
        self.root() == target
    }
}

/// All single-slot vote variants for one sidechain's index
///
/// Downvotes are omitted at score zero and upvotes at score tau, so every
/// variant respects the score bounds.
fn slot_variants(index: &BundleIndex) -> Vec<BundleVote> {
    let mut variants = Vec::new();
    for record in index.iter() {
        variants.push(abstain(record));
        if record.work_score < record.sidechain.tau() {
            variants.push(upvote(record));
        }
        if record.work_score > 0 {
            variants.push(downvote(record));
        }
    }
    variants
}
