//! Parlia block-proof gas estimator.
//!
//! Times the `VerifierGasMeasurer` Solidity contract in an in-memory EVM
//! against a native verifier shaped like a precompile, and derives the gas a
//! native `verifyParliaBlock` precompile should charge.

pub mod cli;
pub mod estimator;
pub mod evm;
pub mod fixtures;
pub mod parlia;
pub mod precompile;
pub mod signer;
