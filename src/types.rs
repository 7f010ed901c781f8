//! Core type definitions for the sidechain database
//!
//! This module defines the compiled-in sidechain enumeration, capacity
//! constants, and the byte layouts of the coinbase commitment scripts.
//! The enumeration and the script layouts are consensus-critical: every
//! node on a network must compile the same values.

use bitcoin::{PubkeyHash, Transaction};

// ============================================================================
// Sidechain Enumeration
// ============================================================================

/// Number of recognized sidechains
pub const SIDECHAIN_COUNT: usize = 3;

/// Identifier of a recognized sidechain
///
/// The discriminant is the wire value used in deposit scripts and
/// bundle-hash commitments. Adding, removing, or renumbering a variant is a
/// consensus change.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SidechainId {
    /// Test sidechain
    Test = 0,
    /// Hivemind prediction-market sidechain
    Hivemind = 1,
    /// Wimble MimbleWimble sidechain
    Wimble = 2,
}

impl SidechainId {
    /// All recognized sidechains, in enumeration order
    pub const ALL: [SidechainId; SIDECHAIN_COUNT] =
        [SidechainId::Test, SidechainId::Hivemind, SidechainId::Wimble];

    /// Decodes a wire byte into a sidechain id
    ///
    /// Returns `None` for bytes outside the enumeration.
    pub fn from_byte(n: u8) -> Option<SidechainId> {
        match n {
            0 => Some(SidechainId::Test),
            1 => Some(SidechainId::Hivemind),
            2 => Some(SidechainId::Wimble),
            _ => None,
        }
    }

    /// Returns the consensus parameters of this sidechain
    pub fn params(&self) -> &'static Sidechain { &VALID_SIDECHAINS[*self as usize] }

    /// Verification-period length in mainchain blocks
    pub fn tau(&self) -> u16 { self.params().tau }

    /// Minimum work score required for a bundle to pay out
    pub fn min_work_score(&self) -> u16 { self.params().min_work_score }

    /// Human-readable sidechain name
    pub fn name(&self) -> &'static str { self.params().name }
}

/// Consensus parameters of a single sidechain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sidechain {
    /// Sidechain identifier
    pub id: SidechainId,
    /// Verification-period length in mainchain blocks
    pub tau: u16,
    /// Minimum work score for bundle payout
    pub min_work_score: u16,
    /// Human-readable name
    pub name: &'static str,
}

/// The compiled-in sidechain table, indexed by `SidechainId` discriminant
pub static VALID_SIDECHAINS: [Sidechain; SIDECHAIN_COUNT] = [
    Sidechain { id: SidechainId::Test, tau: 300, min_work_score: 100, name: "Test" },
    Sidechain { id: SidechainId::Hivemind, tau: 300, min_work_score: 100, name: "Hivemind" },
    Sidechain { id: SidechainId::Wimble, tau: 300, min_work_score: 100, name: "Wimble" },
];

// ============================================================================
// Capacity Constants
// ============================================================================

/// Maximum number of withdrawal bundles tracked per sidechain per tau period
pub const MAX_BUNDLES_PER_SIDECHAIN: usize = 3;

/// Maximum number of critical-hash entries kept in the linking ratchet
pub const MAX_LINKING_DATA: usize = 2600;

/// Global cap on cached withdrawal-bundle transactions
///
/// The smallest cap that still lets every sidechain's bundle index fill.
pub const BUNDLE_TX_CACHE_MAX: usize = MAX_BUNDLES_PER_SIDECHAIN * SIDECHAIN_COUNT;

// ============================================================================
// SCDB Merkle-Root Commitment Format
// ============================================================================

/// Header bytes identifying an SCDB Merkle-root commitment
///
/// The commitment script is `OP_RETURN OP_PUSHBYTES_36 <header(4)> <root(32)>`.
pub const ROOT_COMMIT_HEADER: [u8; 4] = [0xd1, 0x5c, 0xdb, 0x4d];

/// Offset of the 32-byte root within a root commitment script
pub const ROOT_COMMIT_OFFSET_ROOT: usize = 6;

/// Total length of a root commitment script
pub const ROOT_COMMIT_LEN: usize = 38;

// ============================================================================
// Bundle-Hash (WT^) Commitment Format
// ============================================================================

/// Header bytes identifying a bundle-hash commitment
///
/// The commitment script is
/// `OP_RETURN OP_PUSHBYTES_37 <header(5)> <bundle_hash(32)> OP_PUSHBYTES_1 <sidechain(1)>`.
pub const BUNDLE_COMMIT_HEADER: [u8; 5] = [0xd4, 0x5a, 0xa9, 0x43, 0x21];

/// Offset of the 32-byte bundle hash within a bundle-hash commitment script
pub const BUNDLE_COMMIT_OFFSET_HASH: usize = 7;

/// Offset of the sidechain-number push within a bundle-hash commitment script
pub const BUNDLE_COMMIT_OFFSET_SIDECHAIN: usize = 39;

/// Total length of a bundle-hash commitment script
pub const BUNDLE_COMMIT_LEN: usize = 41;

// ============================================================================
// Withdrawal Script Format
// ============================================================================

/// Opcode byte opening a sidechain withdrawal script
pub const OP_WT: u8 = 0xc1;

/// Length of the hex-encoded key id pushed by a withdrawal script
pub const WITHDRAWAL_KEY_HEX_LEN: usize = 40;

// ============================================================================
// Deposits
// ============================================================================

/// A deposit into a sidechain, derived from a mainchain transaction output
///
/// Equality is structural: two deposits are the same iff sidechain, key id,
/// and the full transaction match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deposit {
    /// Destination sidechain
    pub sidechain: SidechainId,
    /// Key id the depositor can claim with on the sidechain
    pub key_id: PubkeyHash,
    /// The full deposit transaction
    pub tx: Transaction,
}
