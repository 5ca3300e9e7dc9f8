//! Seal hashing and signer recovery.
//!
//! A Parlia seal is a recoverable secp256k1 signature over the header with
//! the seal stripped from `extraData` and the chain id prepended to the field
//! list.

use alloy_consensus::Header;
use alloy_primitives::{keccak256, Address, Signature, B256, U256};
use alloy_rlp::{BufMut, Encodable, Header as RlpHeader};
use std::fmt;

/// Bytes of free-form vanity at the start of `extraData`.
pub const EXTRA_VANITY_LENGTH: usize = 32;

/// Bytes of signature at the end of `extraData`.
pub const EXTRA_SEAL_LENGTH: usize = 65;

/// `secp256k1n / 2`, the upper bound for a canonical `s`.
pub const SECP256K1N_HALF: U256 = U256::from_limbs([
    0xdfe9_2f46_681b_20a0,
    0x5d57_6e73_57a4_501d,
    0xffff_ffff_ffff_ffff,
    0x7fff_ffff_ffff_ffff,
]);

/// Why a seal failed to produce a signer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFault {
    /// Signature is not 65 bytes long
    Length(usize),
    /// `s` is above half the curve order
    HighS,
    /// Recovery byte outside every accepted family
    RecoveryId(u8),
    /// No public key recovers from `(r, s, v)`
    Unrecoverable,
}

impl fmt::Display for SignatureFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(len) => write!(f, "expected 65 signature bytes, got {len}"),
            Self::HighS => f.write_str("non-canonical 's' value"),
            Self::RecoveryId(v) => write!(f, "invalid recovery id {v}"),
            Self::Unrecoverable => f.write_str("public key recovery failed"),
        }
    }
}

/// The seal-hash preimage: `[chainId, ...header fields with trimmed extra...]`.
struct SealPayload<'a> {
    chain_id: U256,
    header: &'a Header,
    extra: &'a [u8],
}

impl SealPayload<'_> {
    fn fields_length(&self) -> usize {
        let h = self.header;
        self.chain_id.length()
            + h.parent_hash.length()
            + h.ommers_hash.length()
            + h.beneficiary.length()
            + h.state_root.length()
            + h.transactions_root.length()
            + h.receipts_root.length()
            + h.logs_bloom.length()
            + h.difficulty.length()
            + h.number.length()
            + h.gas_limit.length()
            + h.gas_used.length()
            + h.timestamp.length()
            + self.extra.length()
            + h.mix_hash.length()
            + h.nonce.length()
    }
}

impl Encodable for SealPayload<'_> {
    fn encode(&self, out: &mut dyn BufMut) {
        let h = self.header;
        RlpHeader { list: true, payload_length: self.fields_length() }.encode(out);
        self.chain_id.encode(out);
        h.parent_hash.encode(out);
        h.ommers_hash.encode(out);
        h.beneficiary.encode(out);
        h.state_root.encode(out);
        h.transactions_root.encode(out);
        h.receipts_root.encode(out);
        h.logs_bloom.encode(out);
        h.difficulty.encode(out);
        h.number.encode(out);
        h.gas_limit.encode(out);
        h.gas_used.encode(out);
        h.timestamp.encode(out);
        self.extra.encode(out);
        h.mix_hash.encode(out);
        h.nonce.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.fields_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

/// Calculate the seal hash for a header (chain id prefixed, seal stripped).
///
/// `extraData` shorter than a seal is hashed as-is; callers that need a seal
/// reject such headers before recovering.
pub fn seal_hash(header: &Header, chain_id: U256) -> B256 {
    let extra = &header.extra_data[..];
    let extra = if extra.len() >= EXTRA_SEAL_LENGTH {
        &extra[..extra.len() - EXTRA_SEAL_LENGTH]
    } else {
        extra
    };
    keccak256(alloy_rlp::encode(SealPayload { chain_id, header, extra }))
}

/// Map a recovery byte to the y-parity it encodes.
///
/// Accepts raw parity (`0`/`1`), legacy (`27`/`28`) and EIP-155
/// (`chain_id * 2 + 35`/`36`).
pub fn recovery_parity(v: u8, chain_id: U256) -> Result<bool, SignatureFault> {
    match v {
        0 | 1 => Ok(v == 1),
        27 | 28 => Ok(v == 28),
        _ => {
            let offset = chain_id.saturating_mul(U256::from(2)).saturating_add(U256::from(35));
            match U256::from(v).checked_sub(offset) {
                Some(parity) if parity <= U256::from(1) => Ok(parity == U256::from(1)),
                _ => Err(SignatureFault::RecoveryId(v)),
            }
        }
    }
}

/// Recover the address that produced `sig` over `digest`.
pub fn recover_signer(digest: B256, sig: &[u8], chain_id: U256) -> Result<Address, SignatureFault> {
    if sig.len() != EXTRA_SEAL_LENGTH {
        return Err(SignatureFault::Length(sig.len()));
    }

    let r = U256::from_be_slice(&sig[..32]);
    let s = U256::from_be_slice(&sig[32..64]);
    if s > SECP256K1N_HALF {
        return Err(SignatureFault::HighS);
    }
    let parity = recovery_parity(sig[64], chain_id)?;

    Signature::new(r, s, parity)
        .recover_address_from_prehash(&digest)
        .map_err(|_| SignatureFault::Unrecoverable)
}

/// Convert a signature to seal bytes (r || s || parity)
pub fn signature_to_bytes(sig: &Signature) -> [u8; EXTRA_SEAL_LENGTH] {
    let mut bytes = [0u8; EXTRA_SEAL_LENGTH];
    bytes[..32].copy_from_slice(&sig.r().to_be_bytes::<32>());
    bytes[32..64].copy_from_slice(&sig.s().to_be_bytes::<32>());
    bytes[64] = sig.v() as u8;
    bytes
}
