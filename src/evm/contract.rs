//! Bindings for the `VerifierGasMeasurer` Solidity contract.
//!
//! The contract ships as creation bytecode only (solc 0.8.14, quorum 15 and
//! epoch 200 baked in as immutables), so its selectors are fixed here rather
//! than derived from signatures.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolValue;
use std::sync::LazyLock;

use super::{Sandbox, SandboxError};
use crate::{fixtures::decode_hex, parlia::ParsedBlock};

const CREATION_CODE_HEX: &str = include_str!("../../contracts/VerifierGasMeasurer.hex");

static CREATION_CODE: LazyLock<Result<Bytes, hex::FromHexError>> =
    LazyLock::new(|| decode_hex(CREATION_CODE_HEX));

/// `measureBlock(bytes blockProof, uint256 chainId) returns (uint64)`
pub const MEASURE_BLOCK_SELECTOR: [u8; 4] = [0x2a, 0x36, 0xf0, 0xad];

/// `parseBlock(bytes) returns (BlockHeader)`
pub const PARSE_BLOCK_SELECTOR: [u8; 4] = [0x2b, 0x15, 0x0b, 0x3c];

/// `genesisValidators(bytes, uint256 chainId) returns (address[])`
pub const GENESIS_VALIDATORS_SELECTOR: [u8; 4] = [0x78, 0x3d, 0x09, 0x62];

/// Creation bytecode, decoded once.
pub fn creation_code() -> Result<Bytes, SandboxError> {
    CREATION_CODE.clone().map_err(SandboxError::from)
}

fn calldata(selector: [u8; 4], args: Vec<u8>) -> Bytes {
    [&selector[..], &args[..]].concat().into()
}

/// Calldata for `measureBlock`.
pub fn measure_block_calldata(proof: &[u8], chain_id: U256) -> Bytes {
    calldata(MEASURE_BLOCK_SELECTOR, (Bytes::copy_from_slice(proof), chain_id).abi_encode_params())
}

/// A deployed `VerifierGasMeasurer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierGasMeasurer {
    address: Address,
}

impl VerifierGasMeasurer {
    /// Deploy the embedded creation code into `sandbox`.
    pub fn deploy(sandbox: &mut Sandbox) -> Result<Self, SandboxError> {
        Ok(Self { address: sandbox.deploy_contract(creation_code()?)? })
    }

    pub const fn address(&self) -> Address {
        self.address
    }

    /// Gas the contract measures for itself with `gasleft()`.
    pub fn measure_block_gas(
        &self,
        sandbox: &mut Sandbox,
        proof: &[u8],
        chain_id: U256,
    ) -> Result<u64, SandboxError> {
        let output = sandbox.call(self.address, measure_block_calldata(proof, chain_id))?;
        decode_output(&output)
    }

    /// Gas of a whole `measureBlock` transaction.
    pub fn estimate_measure_block(
        &self,
        sandbox: &mut Sandbox,
        proof: &[u8],
        chain_id: U256,
    ) -> Result<u64, SandboxError> {
        sandbox.estimate_gas(self.address, measure_block_calldata(proof, chain_id))
    }

    /// Raw ABI output of `parseBlock`.
    pub fn parse_block_raw(&self, sandbox: &mut Sandbox, header: &[u8]) -> Result<Bytes, SandboxError> {
        let input = calldata(PARSE_BLOCK_SELECTOR, (Bytes::copy_from_slice(header),).abi_encode_params());
        sandbox.call(self.address, input)
    }

    pub fn parse_block(&self, sandbox: &mut Sandbox, header: &[u8]) -> Result<ParsedBlock, SandboxError> {
        decode_output(&self.parse_block_raw(sandbox, header)?)
    }

    /// Validators of a genesis header; reverts with "not a genesis block" otherwise.
    pub fn genesis_validators(
        &self,
        sandbox: &mut Sandbox,
        header: &[u8],
        chain_id: U256,
    ) -> Result<Vec<Address>, SandboxError> {
        let input = calldata(
            GENESIS_VALIDATORS_SELECTOR,
            (Bytes::copy_from_slice(header), chain_id).abi_encode_params(),
        );
        decode_output(&sandbox.call(self.address, input)?)
    }
}

fn decode_output<T: SolValue + From<<T::SolType as alloy_sol_types::SolType>::RustType>>(
    output: &[u8],
) -> Result<T, SandboxError> {
    T::abi_decode(output).map_err(|e| SandboxError::Evm(format!("bad contract output: {e}")))
}
