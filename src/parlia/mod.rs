//! Native Parlia block-proof verification.
//!
//! Two entry points share the decoding and recovery steps:
//! [`measure_block`] mirrors the contract's measured path and never counts
//! signers, while [`verify_parlia_block`] additionally enforces epoch
//! membership and the validator quorum.

mod header;
mod proof;
mod seal;
mod validators;

pub use header::{EncodingError, ParliaHeader, ParsedBlock, HEADER_FIELD_COUNT, MAX_HEADER_SIZE};
pub use proof::{check_link, header_signer, BlockProof};
pub use seal::{
    recover_signer, recovery_parity, seal_hash, signature_to_bytes, SignatureFault,
    EXTRA_SEAL_LENGTH, EXTRA_VANITY_LENGTH, SECP256K1N_HALF,
};
pub use validators::{QuorumTracker, ValidatorSet, VALIDATOR_ADDRESS_LENGTH};

use validators::ensure_genesis;

use alloy_primitives::{Address, B256, U256};
use thiserror::Error;
use tracing::debug;

/// Epoch length the contract is built with.
pub const DEFAULT_EPOCH_INTERVAL: u64 = 200;

/// Why a block proof was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    #[error("malformed encoding: {0}")]
    MalformedEncoding(#[from] EncodingError),

    #[error("invalid signature on block {number}: {fault}")]
    InvalidSignature { number: u64, fault: SignatureFault },

    #[error("block {0} is not a genesis block")]
    NotGenesisBlock(u64),

    #[error("block {0} is not a checkpoint block")]
    NotCheckpointBlock(u64),

    #[error("bad parent hash for block {number}: expected {expected}, found {found}")]
    ParentHashMismatch { number: u64, expected: B256, found: B256 },

    #[error("block {number} does not follow block {parent}")]
    NonConsecutiveBlock { parent: u64, number: u64 },

    #[error("block {number} sealed by unknown signer {signer}")]
    UnknownSigner { number: u64, signer: Address },

    #[error("quorum not reached: {signed} of {required} signers")]
    QuorumNotMet { signed: usize, required: usize },

    #[error("block {number} lies outside epoch {epoch}")]
    EpochMismatch { number: u64, epoch: u64 },

    #[error("epoch interval must be non-zero")]
    InvalidEpochInterval,
}

/// Decode a proof and recover every seal, returning the last header's fields.
///
/// A multi-header proof must start at a checkpoint of
/// [`DEFAULT_EPOCH_INTERVAL`]. No quorum is required.
pub fn measure_block(proof: &[u8], chain_id: U256) -> Result<ParsedBlock, ProofError> {
    let proof = BlockProof::decode(proof)?;
    let first = proof.checkpoint();

    if proof.len() > 1 && first.number() % DEFAULT_EPOCH_INTERVAL != 0 {
        return Err(ProofError::NotCheckpointBlock(first.number()));
    }
    if first.is_genesis() {
        ensure_genesis(first)?;
    }
    proof.check_linkage()?;

    for header in proof.headers().iter().filter(|h| !h.is_genesis()) {
        header_signer(header, chain_id)?;
    }

    Ok(proof.terminal().to_parsed())
}

/// Verify a proof against the validator set of its first (checkpoint) header.
///
/// Every later header must follow its parent, stay in the checkpoint's epoch
/// and be sealed by a member of the set. Distinct signers must reach
/// [`ValidatorSet::quorum`] unless the proof is the genesis header alone.
pub fn verify_parlia_block(
    chain_id: U256,
    proof: &[u8],
    epoch_interval: u32,
) -> Result<ParsedBlock, ProofError> {
    if epoch_interval == 0 {
        return Err(ProofError::InvalidEpochInterval);
    }
    let epoch_interval = u64::from(epoch_interval);

    let proof = BlockProof::decode(proof)?;
    let checkpoint = proof.checkpoint();
    let set = ValidatorSet::from_checkpoint(checkpoint, epoch_interval)?;

    // The checkpoint seal belongs to the previous epoch's set
    if checkpoint.is_genesis() {
        ensure_genesis(checkpoint)?;
    } else {
        header_signer(checkpoint, chain_id)?;
    }

    let mut tracker = QuorumTracker::new(&set);
    for pair in proof.headers().windows(2) {
        let (parent, header) = (&pair[0], &pair[1]);
        check_link(parent, header)?;
        if header.number() / epoch_interval != set.epoch() {
            return Err(ProofError::EpochMismatch { number: header.number(), epoch: set.epoch() });
        }
        let signer = header_signer(header, chain_id)?;
        tracker.record(header.number(), signer)?;
    }

    if !proof.is_genesis_only() {
        let signed = tracker.finish()?;
        debug!(target: "parlia", signed, required = set.quorum(), "quorum reached");
    }

    let terminal = proof.terminal();
    debug!(target: "parlia", number = terminal.number(), headers = proof.len(), "verified block proof");
    Ok(terminal.to_parsed())
}
