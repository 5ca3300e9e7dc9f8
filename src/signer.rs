//! Block Signer Implementation
//!
//! This module provides utilities for sealing Parlia headers, including:
//! - Key management for validators
//! - Header sealing (signing the chain-id-prefixed seal hash)

use crate::parlia::{seal_hash, signature_to_bytes, EXTRA_SEAL_LENGTH};
use alloy_consensus::Header;
use alloy_primitives::{Address, Signature, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during signing operations
#[derive(Debug, Error)]
pub enum SignerError {
    /// No signing key available for the specified address
    #[error("No signer available for address {0}")]
    NoSignerForAddress(Address),

    /// Signing operation failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Invalid private key format
    #[error("Invalid private key")]
    InvalidPrivateKey,
}

/// Holds validator signing keys, in the order they were added.
#[derive(Debug, Default)]
pub struct SignerManager {
    /// Map of address to signer
    signers: HashMap<Address, PrivateKeySigner>,
    order: Vec<Address>,
}

impl SignerManager {
    /// Create a new signer manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signer directly
    pub fn add_signer(&mut self, signer: PrivateKeySigner) -> Address {
        let address = signer.address();
        if self.signers.insert(address, signer).is_none() {
            self.order.push(address);
        }
        address
    }

    /// Registered signer addresses, oldest first
    pub fn signer_addresses(&self) -> &[Address] {
        &self.order
    }

    /// Sign a message hash with the specified signer
    pub fn sign_hash(&self, address: &Address, hash: B256) -> Result<Signature, SignerError> {
        let signer =
            self.signers.get(address).ok_or(SignerError::NoSignerForAddress(*address))?;

        signer.sign_hash_sync(&hash).map_err(|e| SignerError::SigningFailed(e.to_string()))
    }
}

/// Seals Parlia headers for one chain id.
#[derive(Debug)]
pub struct BlockSealer {
    signer_manager: SignerManager,
    chain_id: U256,
}

impl BlockSealer {
    /// Create a new block sealer
    pub fn new(signer_manager: SignerManager, chain_id: U256) -> Self {
        Self { signer_manager, chain_id }
    }

    pub const fn chain_id(&self) -> U256 {
        self.chain_id
    }

    pub fn signer_manager(&self) -> &SignerManager {
        &self.signer_manager
    }

    /// Seal a block header with a signature
    pub fn seal_header(
        &self,
        mut header: Header,
        signer_address: &Address,
    ) -> Result<Header, SignerError> {
        let mut extra_data = header.extra_data.to_vec();
        if extra_data.len() < EXTRA_SEAL_LENGTH {
            return Err(SignerError::SigningFailed("Extra data too short".into()));
        }

        let seal_hash = seal_hash(&header, self.chain_id);
        let signature = self.signer_manager.sign_hash(signer_address, seal_hash)?;

        // Replace the seal slot with (r, s, parity)
        extra_data.truncate(extra_data.len() - EXTRA_SEAL_LENGTH);
        extra_data.extend_from_slice(&signature_to_bytes(&signature));
        header.extra_data = extra_data.into();

        Ok(header)
    }
}

/// Development signer setup with known test keys
pub mod dev {
    use super::*;
    use alloy_primitives::keccak256;

    /// Private keys for the dev accounts (from "test test..." mnemonic)
    pub const DEV_PRIVATE_KEYS: &[&str] = &[
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
        "7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
        "47e179ec197488593b187f80a00eb0da91f1b9d0b13f8733639f19c30a34926a",
        "8b3a350cf5c34c9194ca85829a2df0ec3153be0318b5e2d3348e872092edffba",
        "92db14e403b83dfe3df233f83dfa3a0d7096f21ca9b0d6d6b8d88b2b4ec1564e",
        "4bbbf85ce3377467afe5d46f804f221813b2bb87f24d81f60f1fcdbf7cbf4356",
        "dbda1821b80551c9d65939329250298aa3472ba22feea921c0cf5d620ea67b97",
        "2a871d0798f97d79848a013d4936a73bf4cc922c825d33c1cf7073dff6d409c6",
    ];

    /// Dev key `index`. Past the mnemonic keys, keys are derived from
    /// `keccak256("parlia-dev-validator" || index)`.
    pub fn signer(index: usize) -> Result<PrivateKeySigner, SignerError> {
        match DEV_PRIVATE_KEYS.get(index) {
            Some(key) => key.parse().map_err(|_| SignerError::InvalidPrivateKey),
            None => {
                let seed = [&b"parlia-dev-validator"[..], &(index as u64).to_be_bytes()[..]].concat();
                PrivateKeySigner::from_bytes(&keccak256(seed))
                    .map_err(|_| SignerError::InvalidPrivateKey)
            }
        }
    }

    /// Set up the signer manager with the first `count` dev keys
    pub fn setup_dev_signers(count: usize) -> Result<SignerManager, SignerError> {
        let mut manager = SignerManager::new();
        for index in 0..count {
            manager.add_signer(signer(index)?);
        }
        Ok(manager)
    }
}
