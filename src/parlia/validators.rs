//! Validator sets and quorum counting.

use alloy_primitives::Address;
use std::collections::HashSet;

use super::{
    header::EncodingError,
    seal::{EXTRA_SEAL_LENGTH, EXTRA_VANITY_LENGTH},
    ParliaHeader, ProofError,
};

/// Width of one validator entry in checkpoint `extraData`.
pub const VALIDATOR_ADDRESS_LENGTH: usize = 20;

/// Validators that sign blocks for one epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSet {
    /// `checkpoint.number / epoch_interval`
    epoch: u64,
    validators: Vec<Address>,
}

impl ValidatorSet {
    /// Split a validator region into addresses.
    pub fn parse_addresses(region: &[u8]) -> Result<Vec<Address>, EncodingError> {
        if region.len() % VALIDATOR_ADDRESS_LENGTH != 0 {
            return Err(EncodingError::ValidatorRegion(region.len()));
        }
        Ok(region.chunks_exact(VALIDATOR_ADDRESS_LENGTH).map(Address::from_slice).collect())
    }

    /// Read the set from checkpoint `extraData` (vanity, addresses, seal).
    pub fn from_extra_data(extra: &[u8], epoch: u64) -> Result<Self, EncodingError> {
        if extra.len() < EXTRA_VANITY_LENGTH + EXTRA_SEAL_LENGTH {
            return Err(EncodingError::ExtraDataTooShort(extra.len()));
        }
        let region = &extra[EXTRA_VANITY_LENGTH..extra.len() - EXTRA_SEAL_LENGTH];
        Ok(Self { epoch, validators: Self::parse_addresses(region)? })
    }

    /// Read the set carried by a checkpoint header.
    pub fn from_checkpoint(header: &ParliaHeader, epoch_interval: u64) -> Result<Self, ProofError> {
        if epoch_interval == 0 {
            return Err(ProofError::InvalidEpochInterval);
        }
        if header.number() % epoch_interval != 0 {
            return Err(ProofError::NotCheckpointBlock(header.number()));
        }
        Ok(Self::from_extra_data(header.extra_data(), header.number() / epoch_interval)?)
    }

    /// Read the initial set from the genesis header, which carries no signature.
    pub fn from_genesis(header: &ParliaHeader) -> Result<Self, ProofError> {
        ensure_genesis(header)?;
        Ok(Self::from_extra_data(header.extra_data(), 0)?)
    }

    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn validators(&self) -> &[Address] {
        &self.validators
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.validators.contains(address)
    }

    /// Distinct signatures needed to finalize: `floor(2N/3) + 1`.
    pub fn quorum(&self) -> usize {
        self.validators.len() * 2 / 3 + 1
    }
}

/// Genesis must be block 0 with an all-zero seal.
pub(crate) fn ensure_genesis(header: &ParliaHeader) -> Result<(), ProofError> {
    if !header.is_genesis() || header.seal()?.iter().any(|b| *b != 0) {
        return Err(ProofError::NotGenesisBlock(header.number()));
    }
    Ok(())
}

/// Counts distinct validator signatures across a proof.
#[derive(Debug)]
pub struct QuorumTracker<'a> {
    set: &'a ValidatorSet,
    signed: HashSet<Address>,
}

impl<'a> QuorumTracker<'a> {
    pub fn new(set: &'a ValidatorSet) -> Self {
        Self { set, signed: HashSet::with_capacity(set.len()) }
    }

    /// Record the signer of block `number`. Returns `false` for a repeat signer.
    pub fn record(&mut self, number: u64, signer: Address) -> Result<bool, ProofError> {
        if !self.set.contains(&signer) {
            return Err(ProofError::UnknownSigner { number, signer });
        }
        Ok(self.signed.insert(signer))
    }

    pub fn signed(&self) -> usize {
        self.signed.len()
    }

    /// Consume the tracker, failing unless quorum was reached.
    pub fn finish(self) -> Result<usize, ProofError> {
        let required = self.set.quorum();
        if self.signed.len() < required {
            return Err(ProofError::QuorumNotMet { signed: self.signed.len(), required });
        }
        Ok(self.signed.len())
    }
}
