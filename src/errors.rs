//! Error types for the sidechain database
//!
//! Hard failures are typed errors; per-output soft failures never abort a
//! block update and are reported as [`Warning`]s on the update report
//! instead.

use bitcoin::hashes::sha256d;
use bitcoin::BlockHash;
use thiserror::Error;

/// The main error type for the sidechain database
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Block update precondition failures
    #[error(transparent)]
    Update(#[from] UpdateError),
}

/// Preconditions of a block update
///
/// When one of these is returned the block was not consumed and the database
/// is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UpdateError {
    /// The block hash handed to the update driver was all-zero
    #[error("block hash is null")]
    NullBlockHash,

    /// The coinbase output list handed to the update driver was empty
    #[error("block has no coinbase outputs")]
    NoOutputs,
}

/// A per-output soft failure observed while processing a block
///
/// Warnings never abort the update; they are collected on the
/// [`UpdateReport`](crate::scdb::UpdateReport) so callers can log granularly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Warning {
    /// An h* commitment carried a block number the ratchet rejected
    #[error("h* with invalid block number ignored: {0}")]
    InvalidCriticalHash(BlockHash),

    /// More than one SCDB root commitment in a single coinbase
    #[error("multiple SCDB root commitments in one coinbase, all ignored")]
    ConflictingRootCommits,

    /// A root commitment did not correspond to any reachable vote transition
    #[error("SCDB root commitment matched no vote transition: {0}")]
    RootNotMatched(sha256d::Hash),
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
