//! Vote transition engine
//!
//! A transition is one tick of verification time plus a set of proposed
//! vote records. The engine first decrements `blocks_left` on every tracked
//! bundle, exactly once per transition, then applies the proposed records
//! under the delta rules. Letting the decrement stand is therefore an
//! abstain, and a score change rides on the same tick that time advances.
//!
//! The engine works on a bare index array so the Merkle-root synchronizer
//! can run it on scratch copies without touching live state.

use bitcoin::Txid;

use crate::bundle::{BundleIndex, BundleVote};
use crate::types::{SidechainId, SIDECHAIN_COUNT};

/// Applies a vote transition to a set of bundle indexes
///
/// Acceptance per vote:
/// - an existing bundle is overwritten iff the proposed score is within one
///   of the current score;
/// - an unknown bundle is admitted iff its index has a free slot, its score
///   is zero, and its `blocks_left` equals the sidechain's full tau.
///
/// Rejected votes are skipped silently. Returns the ids of the accepted
/// votes in input order.
pub(crate) fn apply_votes(
    indexes: &mut [BundleIndex; SIDECHAIN_COUNT],
    votes: &[BundleVote],
) -> Vec<(SidechainId, Txid)> {
    // Global tick: every tracked bundle ages by one block.
    for index in indexes.iter_mut() {
        for record in index.iter_mut() {
            record.blocks_left = record.blocks_left.saturating_sub(1);
        }
    }

    let mut accepted = Vec::new();
    for vote in votes {
        let tau = vote.sidechain.tau();
        if vote.is_null() || vote.work_score > tau || vote.blocks_left > tau {
            continue;
        }

        let index = &mut indexes[vote.sidechain as usize];
        let current_score = index.get(&vote.bundle_id).map(|record| record.work_score);
        let accept = match current_score {
            Some(score) => {
                (i32::from(vote.work_score) - i32::from(score)).abs() <= 1
            }
            None => !index.is_full() && vote.work_score == 0 && vote.blocks_left == tau,
        };
        if accept && index.insert(vote.clone()) {
            accepted.push((vote.sidechain, vote.bundle_id));
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use bitcoin::hashes::Hash;

    use super::*;

    fn txid(n: u8) -> Txid { Txid::from_byte_array([n; 32]) }

    fn empty_indexes() -> [BundleIndex; SIDECHAIN_COUNT] { Default::default() }

    fn vote(n: u8, blocks_left: u16, work_score: u16) -> BundleVote {
        BundleVote { sidechain: SidechainId::Test, bundle_id: txid(n), blocks_left, work_score }
    }

    #[test]
    fn test_admits_fresh_bundle() {
        let mut indexes = empty_indexes();
        let tau = SidechainId::Test.tau();

        let accepted = apply_votes(&mut indexes, &[vote(1, tau, 0)]);

        assert_eq!(accepted, vec![(SidechainId::Test, txid(1))]);
        assert_eq!(indexes[0].get(&txid(1)).map(|v| v.blocks_left), Some(tau));
    }

    #[test]
    fn test_rejects_fresh_bundle_with_nonzero_score() {
        let mut indexes = empty_indexes();
        let tau = SidechainId::Test.tau();

        let accepted = apply_votes(&mut indexes, &[vote(1, tau, 1)]);

        assert!(accepted.is_empty());
        assert!(!indexes[0].is_populated());
    }

    #[test]
    fn test_rejects_fresh_bundle_with_partial_period() {
        let mut indexes = empty_indexes();
        let tau = SidechainId::Test.tau();

        let accepted = apply_votes(&mut indexes, &[vote(1, tau - 1, 0)]);

        assert!(accepted.is_empty());
    }

    #[test]
    fn test_decrement_runs_once_for_all_bundles() {
        let mut indexes = empty_indexes();
        let tau = SidechainId::Test.tau();
        apply_votes(&mut indexes, &[vote(1, tau, 0)]);
        let hivemind = BundleVote {
            sidechain: SidechainId::Hivemind,
            bundle_id: txid(2),
            blocks_left: SidechainId::Hivemind.tau(),
            work_score: 0,
        };
        apply_votes(&mut indexes, &[hivemind]);

        // An empty transition is a pure tick
        let accepted = apply_votes(&mut indexes, &[]);

        assert!(accepted.is_empty());
        assert_eq!(indexes[0].get(&txid(1)).map(|v| v.blocks_left), Some(tau - 2));
        assert_eq!(
            indexes[1].get(&txid(2)).map(|v| v.blocks_left),
            Some(SidechainId::Hivemind.tau() - 1)
        );
    }

    #[test]
    fn test_score_delta_bound() {
        let mut indexes = empty_indexes();
        let tau = SidechainId::Test.tau();
        apply_votes(&mut indexes, &[vote(1, tau, 0)]);

        // +1 is fine
        assert!(!apply_votes(&mut indexes, &[vote(1, tau - 1, 1)]).is_empty());
        // same score (abstain-shaped) is fine
        assert!(!apply_votes(&mut indexes, &[vote(1, tau - 2, 1)]).is_empty());
        // -1 is fine
        assert!(!apply_votes(&mut indexes, &[vote(1, tau - 3, 0)]).is_empty());
        // +2 is not, and the record keeps its old score
        assert!(apply_votes(&mut indexes, &[vote(1, tau - 4, 2)]).is_empty());
        assert_eq!(indexes[0].get(&txid(1)).map(|v| v.work_score), Some(0));
    }

    #[test]
    fn test_rejected_vote_still_ticks_time() {
        let mut indexes = empty_indexes();
        let tau = SidechainId::Test.tau();
        apply_votes(&mut indexes, &[vote(1, tau, 0)]);

        apply_votes(&mut indexes, &[vote(1, tau - 1, 5)]);

        let record = indexes[0].get(&txid(1)).expect("tracked").clone();
        assert_eq!(record.work_score, 0);
        assert_eq!(record.blocks_left, tau - 1);
    }

    #[test]
    fn test_blocks_left_saturates_at_zero() {
        let mut indexes = empty_indexes();
        let tau = SidechainId::Test.tau();
        apply_votes(&mut indexes, &[vote(1, tau, 0)]);
        for _ in 0..tau + 5 {
            apply_votes(&mut indexes, &[]);
        }

        assert_eq!(indexes[0].get(&txid(1)).map(|v| v.blocks_left), Some(0));
    }

    #[test]
    fn test_skips_votes_breaking_tau_bounds() {
        let mut indexes = empty_indexes();
        let tau = SidechainId::Test.tau();

        assert!(apply_votes(&mut indexes, &[vote(1, tau + 1, 0)]).is_empty());
        assert!(apply_votes(&mut indexes, &[vote(1, tau, tau + 1)]).is_empty());
    }

    #[test]
    fn test_skips_null_votes() {
        let mut indexes = empty_indexes();
        let tau = SidechainId::Test.tau();

        let accepted = apply_votes(&mut indexes, &[vote(0, tau, 0)]);

        assert!(accepted.is_empty());
        assert!(!indexes[0].is_populated());
    }
}
