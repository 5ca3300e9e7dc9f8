//! Proof fixtures.
//!
//! The BSC mainnet genesis proof, and a builder for sealed synthetic chains
//! whose signatures are actually recovered.

use alloy_consensus::Header;
use alloy_primitives::{Address, Bytes, U256};
use alloy_rlp::Encodable;

use crate::{
    parlia::{EXTRA_SEAL_LENGTH, EXTRA_VANITY_LENGTH},
    signer::{dev, BlockSealer, SignerError},
};

const BSC_GENESIS_PROOF_HEX: &str = include_str!("../fixtures/bsc-genesis-proof.hex");

/// BSC mainnet chain id
pub const BSC_CHAIN_ID: u64 = 56;

/// Decode a hex string, with or without a `0x` prefix.
pub fn decode_hex(input: &str) -> Result<Bytes, hex::FromHexError> {
    let input = input.trim();
    hex::decode(input.strip_prefix("0x").unwrap_or(input)).map(Bytes::from)
}

/// The BSC mainnet genesis header (block 0, 21 validators).
pub fn bsc_genesis_proof() -> Result<Bytes, hex::FromHexError> {
    decode_hex(BSC_GENESIS_PROOF_HEX)
}

/// Encode headers as an RLP list, the multi-header proof shape.
pub fn encode_proof(headers: &[Header]) -> Bytes {
    let payload_length = headers.iter().map(Encodable::length).sum();
    let mut out = Vec::with_capacity(payload_length + 4);
    alloy_rlp::Header { list: true, payload_length }.encode(&mut out);
    for header in headers {
        header.encode(&mut out);
    }
    out.into()
}

/// A genesis header plus dev-key validators that seal blocks on top of it.
#[derive(Debug)]
pub struct SyntheticChain {
    sealer: BlockSealer,
    genesis: Header,
}

impl SyntheticChain {
    /// A chain with `validators` dev validators on the BSC chain id.
    pub fn new(validators: usize) -> Result<Self, SignerError> {
        Self::with_chain_id(validators, U256::from(BSC_CHAIN_ID))
    }

    pub fn with_chain_id(validators: usize, chain_id: U256) -> Result<Self, SignerError> {
        if validators == 0 {
            return Err(SignerError::SigningFailed("a chain needs at least one validator".into()));
        }
        let manager = dev::setup_dev_signers(validators)?;

        let mut extra = vec![0u8; EXTRA_VANITY_LENGTH];
        for validator in manager.signer_addresses() {
            extra.extend_from_slice(validator.as_slice());
        }
        extra.extend_from_slice(&[0u8; EXTRA_SEAL_LENGTH]);

        let genesis = Header {
            beneficiary: Address::repeat_byte(0xff),
            difficulty: U256::from(1),
            gas_limit: 40_000_000,
            timestamp: 1_587_390_414,
            extra_data: extra.into(),
            ..Default::default()
        };

        Ok(Self { sealer: BlockSealer::new(manager, chain_id), genesis })
    }

    pub const fn chain_id(&self) -> U256 {
        self.sealer.chain_id()
    }

    /// Validators in genesis order
    pub fn validators(&self) -> &[Address] {
        self.sealer.signer_manager().signer_addresses()
    }

    pub const fn genesis(&self) -> &Header {
        &self.genesis
    }

    /// Seal `header` with validator `index`.
    pub fn seal(&self, header: Header, index: usize) -> Result<Header, SignerError> {
        let validator = self.validators().get(index).copied().ok_or_else(|| {
            SignerError::SigningFailed(format!("no validator at index {index}"))
        })?;
        self.sealer.seal_header(header, &validator)
    }

    /// The next block after `parent`, sealed by validator `index`.
    pub fn child(&self, parent: &Header, index: usize) -> Result<Header, SignerError> {
        let header = Header {
            parent_hash: parent.hash_slow(),
            beneficiary: self.validators().get(index).copied().unwrap_or_default(),
            difficulty: U256::from(2),
            number: parent.number + 1,
            gas_limit: parent.gas_limit,
            timestamp: parent.timestamp + 3,
            extra_data: vec![0u8; EXTRA_VANITY_LENGTH + EXTRA_SEAL_LENGTH].into(),
            ..Default::default()
        };
        self.seal(header, index)
    }

    /// Genesis followed by one block per entry of `signers`.
    pub fn sealed_headers_by(&self, signers: &[usize]) -> Result<Vec<Header>, SignerError> {
        let mut headers = Vec::with_capacity(signers.len() + 1);
        headers.push(self.genesis.clone());
        for &index in signers {
            let next = self.child(&headers[headers.len() - 1], index)?;
            headers.push(next);
        }
        Ok(headers)
    }

    /// Genesis followed by `count` blocks; block `i` is sealed by validator
    /// `(i - 1) % validators`.
    pub fn sealed_headers(&self, count: usize) -> Result<Vec<Header>, SignerError> {
        let order: Vec<usize> = (0..count).map(|i| i % self.validators().len()).collect();
        self.sealed_headers_by(&order)
    }

    pub fn proof(&self, count: usize) -> Result<Bytes, SignerError> {
        Ok(encode_proof(&self.sealed_headers(count)?))
    }

    pub fn proof_by(&self, signers: &[usize]) -> Result<Bytes, SignerError> {
        Ok(encode_proof(&self.sealed_headers_by(signers)?))
    }
}
