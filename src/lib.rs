#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Sidechain DB
//!
//! A deterministic, consensus-critical database tracking the voting
//! progress of sidechain withdrawal bundles (WT^) and the blind-merged-
//! mining linking ratchet of critical hashes, driven block by block from
//! mainchain coinbase outputs.

pub mod bundle;
pub mod errors;
pub mod ratchet;
pub mod scdb;
pub mod script;
pub mod types;

// Re-export commonly used types
pub use bundle::{BundleIndex, BundleVote};
pub use errors::{Error, Result, UpdateError, Warning};
pub use ratchet::{CriticalHash, Ratchet};
pub use scdb::{SidechainDb, UpdateReport};
pub use types::{Deposit, Sidechain, SidechainId};
