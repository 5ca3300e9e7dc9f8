//! `verifyParliaBlock` exposed as a precompiled contract.
//!
//! Input is `abi.encode(uint256 chainId, bytes blockProof, uint32 epochInterval)`,
//! output is the ABI-encoded [`ParsedBlock`] tuple, byte for byte what the
//! Solidity verifier's `parseBlock` returns for the same header.

use alloy_evm::revm::precompile::PrecompileOutput;
use alloy_primitives::{Bytes, U256};
use alloy_sol_types::SolValue;
use thiserror::Error;

use crate::parlia::{verify_parlia_block, ParsedBlock, ProofError};

/// Flat gas charged when no measured cost is configured.
pub const VERIFY_PARLIA_BLOCK_BASE: u64 = 3_000;

/// Native wrapper failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    #[error("invalid precompile input: {0}")]
    InvalidInput(String),

    #[error("out of gas: required {required}, limit {limit}")]
    OutOfGas { required: u64, limit: u64 },

    #[error(transparent)]
    Proof(#[from] ProofError),
}

/// The native Parlia verifier with a fixed gas cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyParliaBlock {
    gas_cost: u64,
}

impl Default for VerifyParliaBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifyParliaBlock {
    pub const fn new() -> Self {
        Self { gas_cost: VERIFY_PARLIA_BLOCK_BASE }
    }

    /// Charge `gas_cost` per call, e.g. the estimator's suggestion.
    pub const fn with_gas_cost(mut self, gas_cost: u64) -> Self {
        self.gas_cost = gas_cost;
        self
    }

    pub const fn required_gas(&self, _input: &[u8]) -> u64 {
        self.gas_cost
    }

    /// ABI-encode a call.
    pub fn encode_input(chain_id: U256, proof: &[u8], epoch_interval: u32) -> Bytes {
        (chain_id, Bytes::copy_from_slice(proof), epoch_interval).abi_encode_params().into()
    }

    /// Decode, verify and encode the result, without gas accounting.
    pub fn run(&self, input: &[u8]) -> Result<Bytes, NativeError> {
        let (chain_id, proof, epoch_interval) =
            <(U256, Bytes, u32)>::abi_decode_params(input)
                .map_err(|e| NativeError::InvalidInput(e.to_string()))?;
        let parsed: ParsedBlock = verify_parlia_block(chain_id, &proof, epoch_interval)?;
        Ok(parsed.abi_encode().into())
    }

    /// Run under a gas limit, as the EVM would invoke a precompile.
    pub fn call(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, NativeError> {
        let required = self.required_gas(input);
        if required > gas_limit {
            return Err(NativeError::OutOfGas { required, limit: gas_limit });
        }
        Ok(PrecompileOutput::new(required, self.run(input)?))
    }
}
