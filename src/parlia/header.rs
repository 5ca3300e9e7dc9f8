//! Parlia header decoding.
//!
//! A Parlia header is the 15-field pre-London Ethereum header. Decoding is
//! strict: canonical RLP only, exactly 15 fields, and a list envelope that
//! covers the input to the last byte.

use alloy_consensus::Header;
use alloy_primitives::{keccak256, B256};
use alloy_rlp::{Decodable, Header as RlpHeader};
use alloy_sol_types::sol;
use thiserror::Error;

use super::seal::EXTRA_SEAL_LENGTH;

/// Number of top-level fields in a Parlia header list.
pub const HEADER_FIELD_COUNT: usize = 15;

/// Largest header encoding the verifier accepts, matching the contract.
pub const MAX_HEADER_SIZE: usize = 0xffff;

sol! {
    /// Header fields returned by the verifier, in the contract's ABI order.
    #[derive(Debug, PartialEq, Eq)]
    struct ParsedBlock {
        bytes32 parentHash;
        bytes32 sha3Uncles;
        address coinbase;
        bytes32 stateRoot;
        bytes32 transactionsRoot;
        bytes32 receiptsRoot;
        uint64 number;
        uint64 gasLimit;
        uint64 gasUsed;
        uint64 timestamp;
        bytes32 mixHash;
        uint64 nonce;
        bytes32 blockHash;
    }
}

/// Structural decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Non-canonical or truncated RLP
    #[error(transparent)]
    Rlp(#[from] alloy_rlp::Error),

    #[error("header of {0} bytes exceeds the {max} byte limit", max = MAX_HEADER_SIZE)]
    HeaderTooLarge(usize),

    #[error("expected an RLP list")]
    ExpectedList,

    #[error("{0} trailing bytes after the list envelope")]
    TrailingBytes(usize),

    #[error("expected {expected} header fields, found {0}", expected = HEADER_FIELD_COUNT)]
    FieldCount(usize),

    #[error("extra data of {0} bytes cannot hold a vanity and a seal")]
    ExtraDataTooShort(usize),

    #[error("validator region of {0} bytes is not a multiple of 20")]
    ValidatorRegion(usize),

    #[error("block proof contains no headers")]
    EmptyProof,
}

/// One top-level item of an RLP list payload.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RlpItem<'a> {
    pub(crate) list: bool,
    /// Full encoding of the item, prefix included.
    pub(crate) raw: &'a [u8],
}

/// Splits an RLP list payload into its top-level items.
pub(crate) fn rlp_items(mut payload: &[u8]) -> Result<Vec<RlpItem<'_>>, EncodingError> {
    let mut items = Vec::new();
    while !payload.is_empty() {
        let start = payload;
        let head = RlpHeader::decode(&mut payload)?;
        let consumed = start.len() - payload.len() + head.payload_length;
        items.push(RlpItem { list: head.list, raw: &start[..consumed] });
        payload = &start[consumed..];
    }
    Ok(items)
}

/// Decodes a list envelope that must span `raw` exactly, returning its payload.
pub(crate) fn list_payload(raw: &[u8]) -> Result<&[u8], EncodingError> {
    let mut buf = raw;
    let envelope = RlpHeader::decode(&mut buf)?;
    if !envelope.list {
        return Err(EncodingError::ExpectedList);
    }
    if buf.len() != envelope.payload_length {
        return Err(EncodingError::TrailingBytes(buf.len() - envelope.payload_length));
    }
    Ok(buf)
}

/// A decoded Parlia header together with its block hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParliaHeader {
    header: Header,
    hash: B256,
}

impl ParliaHeader {
    /// Decode a single header encoding.
    pub fn decode(raw: &[u8]) -> Result<Self, EncodingError> {
        if raw.len() > MAX_HEADER_SIZE {
            return Err(EncodingError::HeaderTooLarge(raw.len()));
        }

        let fields = rlp_items(list_payload(raw)?)?.len();
        if fields != HEADER_FIELD_COUNT {
            return Err(EncodingError::FieldCount(fields));
        }

        let mut buf = raw;
        let header = Header::decode(&mut buf)?;

        Ok(Self { header, hash: keccak256(raw) })
    }

    /// The decoded header fields
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// `keccak256` of the header encoding
    pub const fn hash(&self) -> B256 {
        self.hash
    }

    pub const fn number(&self) -> u64 {
        self.header.number
    }

    pub const fn parent_hash(&self) -> B256 {
        self.header.parent_hash
    }

    pub const fn is_genesis(&self) -> bool {
        self.header.number == 0
    }

    pub fn extra_data(&self) -> &[u8] {
        &self.header.extra_data
    }

    /// The trailing 65-byte seal of `extraData`.
    pub fn seal(&self) -> Result<&[u8], EncodingError> {
        let extra = self.extra_data();
        if extra.len() < EXTRA_SEAL_LENGTH {
            return Err(EncodingError::ExtraDataTooShort(extra.len()));
        }
        Ok(&extra[extra.len() - EXTRA_SEAL_LENGTH..])
    }

    /// The ABI tuple the verifier returns for this header.
    pub fn to_parsed(&self) -> ParsedBlock {
        let h = &self.header;
        ParsedBlock {
            parentHash: h.parent_hash,
            sha3Uncles: h.ommers_hash,
            coinbase: h.beneficiary,
            stateRoot: h.state_root,
            transactionsRoot: h.transactions_root,
            receiptsRoot: h.receipts_root,
            number: h.number,
            gasLimit: h.gas_limit,
            gasUsed: h.gas_used,
            timestamp: h.timestamp,
            mixHash: h.mix_hash,
            nonce: u64::from_be_bytes(h.nonce.0),
            blockHash: self.hash,
        }
    }
}
