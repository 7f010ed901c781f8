//! Producers for the coinbase commitment script shapes
//!
//! Block producers and wallets use these to emit exactly the byte layouts
//! the readers accept.

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::opcodes::all::{OP_PUSHBYTES_32, OP_RETURN};
use bitcoin::opcodes::Opcode;
use bitcoin::script::{write_scriptint, Builder};
use bitcoin::{BlockHash, PubkeyHash, ScriptBuf, Txid};

use crate::types::{
    SidechainId, BUNDLE_COMMIT_HEADER, OP_WT, ROOT_COMMIT_HEADER, WITHDRAWAL_KEY_HEX_LEN,
};

/// Builds an h* critical-hash commitment script
///
/// The block number is pushed with the script-number encoding (1-4 bytes,
/// little-endian signed-magnitude, minimal), followed by the 32-byte hash.
pub fn build_critical_hash_script(block_number: i32, hash: &BlockHash) -> ScriptBuf {
    let mut number = [0u8; 8];
    let len = write_scriptint(&mut number, i64::from(block_number));

    let mut bytes = Vec::with_capacity(3 + len + 32);
    bytes.push(OP_RETURN.to_u8());
    bytes.push(len as u8);
    bytes.extend_from_slice(&number[..len]);
    bytes.push(OP_PUSHBYTES_32.to_u8());
    bytes.extend_from_slice(hash.as_byte_array());
    ScriptBuf::from_bytes(bytes)
}

/// Builds a deposit script for a sidechain and destination key id
pub fn build_deposit_script(sidechain: SidechainId, key_id: &PubkeyHash) -> ScriptBuf {
    Builder::new()
        .push_opcode(OP_RETURN)
        .push_opcode(Opcode::from(sidechain as u8))
        .push_slice(key_id.to_byte_array())
        .into_script()
}

/// Builds a withdrawal script carrying a hex-encoded key id
pub fn build_withdrawal_script(key_id: &PubkeyHash) -> ScriptBuf {
    let hex = key_id.to_string();
    let mut push = [0u8; WITHDRAWAL_KEY_HEX_LEN];
    push.copy_from_slice(hex.as_bytes());
    Builder::new().push_opcode(Opcode::from(OP_WT)).push_slice(push).into_script()
}

/// Builds a bundle-hash (WT^) commitment script
pub fn build_bundle_commit_script(bundle_id: &Txid, sidechain: SidechainId) -> ScriptBuf {
    let mut data = [0u8; 37];
    data[..5].copy_from_slice(&BUNDLE_COMMIT_HEADER);
    data[5..].copy_from_slice(bundle_id.as_byte_array());
    Builder::new()
        .push_opcode(OP_RETURN)
        .push_slice(data)
        .push_slice([sidechain as u8])
        .into_script()
}

/// Builds an SCDB Merkle-root commitment script
pub fn build_root_commit_script(root: &sha256d::Hash) -> ScriptBuf {
    let mut data = [0u8; 36];
    data[..4].copy_from_slice(&ROOT_COMMIT_HEADER);
    data[4..].copy_from_slice(root.as_byte_array());
    Builder::new().push_opcode(OP_RETURN).push_slice(data).into_script()
}
