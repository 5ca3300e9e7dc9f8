//! Block proofs: one header, or a list of consecutive headers.

use alloy_primitives::{Address, U256};
use tracing::trace;

use super::{
    header::{list_payload, rlp_items, EncodingError},
    seal::{recover_signer, seal_hash},
    ParliaHeader, ProofError,
};

/// Decoded headers of a proof, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockProof {
    headers: Vec<ParliaHeader>,
}

impl BlockProof {
    /// Decode either a bare header or an RLP list of headers.
    ///
    /// The two shapes are told apart by the first item of the outer list: a
    /// header starts with its 32-byte parent hash, a header list with a list.
    pub fn decode(raw: &[u8]) -> Result<Self, EncodingError> {
        let items = rlp_items(list_payload(raw)?)?;
        let headers = match items.first() {
            None => return Err(EncodingError::EmptyProof),
            Some(first) if first.list => items
                .iter()
                .map(|item| ParliaHeader::decode(item.raw))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => vec![ParliaHeader::decode(raw)?],
        };
        Ok(Self { headers })
    }

    pub fn headers(&self) -> &[ParliaHeader] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// The first header of the proof.
    pub fn checkpoint(&self) -> &ParliaHeader {
        &self.headers[0]
    }

    /// The header whose fields the verifier returns.
    pub fn terminal(&self) -> &ParliaHeader {
        &self.headers[self.headers.len() - 1]
    }

    /// A proof made of the genesis header alone.
    pub fn is_genesis_only(&self) -> bool {
        self.headers.len() == 1 && self.headers[0].is_genesis()
    }

    /// Check that every header builds on the one before it.
    pub fn check_linkage(&self) -> Result<(), ProofError> {
        self.headers.windows(2).try_for_each(|pair| check_link(&pair[0], &pair[1]))
    }
}

/// `child` must directly follow `parent`.
pub fn check_link(parent: &ParliaHeader, child: &ParliaHeader) -> Result<(), ProofError> {
    if parent.number().checked_add(1) != Some(child.number()) {
        return Err(ProofError::NonConsecutiveBlock {
            parent: parent.number(),
            number: child.number(),
        });
    }
    if child.parent_hash() != parent.hash() {
        return Err(ProofError::ParentHashMismatch {
            number: child.number(),
            expected: parent.hash(),
            found: child.parent_hash(),
        });
    }
    Ok(())
}

/// Recover the sealer of a non-genesis header.
pub fn header_signer(header: &ParliaHeader, chain_id: U256) -> Result<Address, ProofError> {
    let seal = header.seal()?;
    let digest = seal_hash(header.header(), chain_id);
    let signer = recover_signer(digest, seal, chain_id)
        .map_err(|fault| ProofError::InvalidSignature { number: header.number(), fault })?;
    trace!(target: "parlia::proof", number = header.number(), %signer, "recovered signer");
    Ok(signer)
}
