//! Coinbase commitment script shapes
//!
//! Five script shapes carry sidechain data through mainchain coinbase
//! outputs: the h* critical-hash commitment, the deposit script, the
//! withdrawal script, the bundle-hash (WT^) commitment, and the SCDB
//! Merkle-root commitment. [`reader`] decodes them, [`builder`] produces
//! them; the byte layouts are the wire-level contract and live in
//! [`crate::types`].

pub mod builder;
pub mod reader;

pub use builder::{
    build_bundle_commit_script, build_critical_hash_script, build_deposit_script,
    build_root_commit_script, build_withdrawal_script,
};
pub use reader::{
    read_bundle_commit, read_critical_hash, read_deposit, read_root_commit, read_withdrawal_key,
    CriticalHashCommit,
};
