//! Decoders for the coinbase commitment script shapes
//!
//! Every reader takes a script and returns a typed value or `None`. Size and
//! opcode mismatches are silent misses; readers never fail loudly, because a
//! coinbase is free to carry unrelated OP_RETURN data.

use std::str::FromStr;

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::opcodes::all::{
    OP_PUSHBYTES_1, OP_PUSHBYTES_20, OP_PUSHBYTES_36, OP_PUSHBYTES_37, OP_RETURN,
};
use bitcoin::script::{read_scriptint, Instruction};
use bitcoin::{BlockHash, PubkeyHash, Script, Txid};

use crate::types::{
    SidechainId, BUNDLE_COMMIT_HEADER, BUNDLE_COMMIT_LEN, BUNDLE_COMMIT_OFFSET_HASH,
    BUNDLE_COMMIT_OFFSET_SIDECHAIN, OP_WT, ROOT_COMMIT_HEADER, ROOT_COMMIT_LEN,
    ROOT_COMMIT_OFFSET_ROOT, WITHDRAWAL_KEY_HEX_LEN,
};

/// Decoded h* critical-hash commitment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CriticalHashCommit {
    /// Sidechain block number carried by the commitment
    pub block_number: i32,
    /// The critical hash itself
    pub hash: BlockHash,
}

/// Reads an h* critical-hash commitment
///
/// Shape: `OP_RETURN <block number, 1-4 script-number bytes> <hash, 32 bytes>`.
/// The script must be unspendable and at least 32 bytes long.
pub fn read_critical_hash(script: &Script) -> Option<CriticalHashCommit> {
    if script.len() < 32 || !script.is_op_return() {
        return None;
    }

    let mut instructions = script.instructions();
    match instructions.next() {
        Some(Ok(Instruction::Op(op))) if op == OP_RETURN => {}
        _ => return None,
    }

    let number = match instructions.next() {
        Some(Ok(Instruction::PushBytes(push))) if (1..=4).contains(&push.len()) =>
            read_scriptint(push.as_bytes()).ok()?,
        _ => return None,
    };

    let hash = match instructions.next() {
        Some(Ok(Instruction::PushBytes(push))) if push.len() == 32 =>
            BlockHash::from_slice(push.as_bytes()).ok()?,
        _ => return None,
    };

    Some(CriticalHashCommit { block_number: i32::try_from(number).ok()?, hash })
}

/// Reads a deposit script
///
/// Shape: `OP_RETURN <sidechain id, raw byte> OP_PUSHBYTES_20 <key id>`.
/// All-zero key ids are rejected.
pub fn read_deposit(script: &Script) -> Option<(SidechainId, PubkeyHash)> {
    let bytes = script.as_bytes();
    if bytes.len() < 23 {
        return None;
    }
    if bytes[0] != OP_RETURN.to_u8() {
        return None;
    }
    let sidechain = SidechainId::from_byte(bytes[1])?;
    if bytes[2] != OP_PUSHBYTES_20.to_u8() {
        return None;
    }
    let key_id = PubkeyHash::from_slice(&bytes[3..23]).ok()?;
    if key_id == PubkeyHash::from_byte_array([0u8; 20]) {
        return None;
    }
    Some((sidechain, key_id))
}

/// Reads a withdrawal script
///
/// Shape: `OP_WT <key id as 40 ASCII-hex characters>`.
pub fn read_withdrawal_key(script: &Script) -> Option<PubkeyHash> {
    let bytes = script.as_bytes();
    if bytes.len() < 2 + WITHDRAWAL_KEY_HEX_LEN {
        return None;
    }
    if bytes[0] != OP_WT || bytes[1] as usize != WITHDRAWAL_KEY_HEX_LEN {
        return None;
    }
    let hex = core::str::from_utf8(&bytes[2..2 + WITHDRAWAL_KEY_HEX_LEN]).ok()?;
    PubkeyHash::from_str(hex).ok()
}

/// Reads a bundle-hash (WT^) commitment
///
/// Shape: `OP_RETURN OP_PUSHBYTES_37 <header(5)> <bundle hash(32)>
/// OP_PUSHBYTES_1 <sidechain id>` with the hash at byte offset
/// [`BUNDLE_COMMIT_OFFSET_HASH`] and the sidechain-number push at
/// [`BUNDLE_COMMIT_OFFSET_SIDECHAIN`].
pub fn read_bundle_commit(script: &Script) -> Option<(Txid, SidechainId)> {
    let bytes = script.as_bytes();
    if bytes.len() < BUNDLE_COMMIT_LEN {
        return None;
    }
    if bytes[0] != OP_RETURN.to_u8() || bytes[1] != OP_PUSHBYTES_37.to_u8() {
        return None;
    }
    if bytes[2..BUNDLE_COMMIT_OFFSET_HASH] != BUNDLE_COMMIT_HEADER {
        return None;
    }
    let bundle_id =
        Txid::from_slice(&bytes[BUNDLE_COMMIT_OFFSET_HASH..BUNDLE_COMMIT_OFFSET_HASH + 32]).ok()?;
    if bytes[BUNDLE_COMMIT_OFFSET_SIDECHAIN] != OP_PUSHBYTES_1.to_u8() {
        return None;
    }
    let sidechain = SidechainId::from_byte(bytes[BUNDLE_COMMIT_OFFSET_SIDECHAIN + 1])?;
    Some((bundle_id, sidechain))
}

/// Reads an SCDB Merkle-root commitment
///
/// Shape: `OP_RETURN OP_PUSHBYTES_36 <header(4)> <root(32)>` with the root
/// at byte offset [`ROOT_COMMIT_OFFSET_ROOT`].
pub fn read_root_commit(script: &Script) -> Option<sha256d::Hash> {
    let bytes = script.as_bytes();
    if bytes.len() < ROOT_COMMIT_LEN {
        return None;
    }
    if bytes[0] != OP_RETURN.to_u8() || bytes[1] != OP_PUSHBYTES_36.to_u8() {
        return None;
    }
    if bytes[2..ROOT_COMMIT_OFFSET_ROOT] != ROOT_COMMIT_HEADER {
        return None;
    }
    sha256d::Hash::from_slice(&bytes[ROOT_COMMIT_OFFSET_ROOT..ROOT_COMMIT_OFFSET_ROOT + 32]).ok()
}
