use alloy_primitives::U256;
use clap::Parser;
use std::path::PathBuf;

use crate::{
    estimator::{
        EstimatorConfig, ProofSource, DEFAULT_NATIVE_CHAIN_ID, DEFAULT_ROUNDS,
        DEFAULT_SOLIDITY_CHAIN_ID,
    },
    evm::DEFAULT_GAS_LIMIT,
    parlia::DEFAULT_EPOCH_INTERVAL,
    precompile::VERIFY_PARLIA_BLOCK_BASE,
};

/// CLI arguments for the gas estimator
#[derive(Parser, Debug)]
#[command(
    name = "parlia-gas-estimator",
    about = "Estimate native precompile gas for Parlia block-proof verification"
)]
pub struct Cli {
    /// Iterations of each verification path
    #[arg(long, default_value_t = DEFAULT_ROUNDS)]
    pub rounds: u64,

    /// Chain ID passed to the Solidity verifier's measureBlock
    #[arg(long, default_value_t = DEFAULT_SOLIDITY_CHAIN_ID)]
    pub solidity_chain_id: u64,

    /// Chain ID passed to the native verifier
    #[arg(long, default_value_t = DEFAULT_NATIVE_CHAIN_ID)]
    pub native_chain_id: u64,

    /// Epoch interval passed to the native verifier
    #[arg(long, default_value_t = DEFAULT_EPOCH_INTERVAL as u32)]
    pub epoch_interval: u32,

    /// Hex-encoded block proof to measure (default: BSC mainnet genesis).
    #[arg(long, conflicts_with = "synthetic_validators")]
    pub proof_file: Option<PathBuf>,

    /// Measure a freshly sealed chain with this many validators instead.
    /// The chain is long enough for its signers to reach quorum, so the
    /// native path recovers every seal.
    #[arg(long)]
    pub synthetic_validators: Option<usize>,

    /// Gas limit of sandbox transactions
    #[arg(long, default_value_t = DEFAULT_GAS_LIMIT)]
    pub gas_limit: u64,

    /// Flat gas charged by the native precompile, checked against the gas limit
    #[arg(long, default_value_t = VERIFY_PARLIA_BLOCK_BASE)]
    pub precompile_gas: u64,

    /// Skip comparing the Solidity and native block headers before timing
    #[arg(long)]
    pub skip_parity_check: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn estimator_config(&self) -> EstimatorConfig {
        let proof = match (&self.proof_file, self.synthetic_validators) {
            (Some(path), _) => ProofSource::File(path.clone()),
            (None, Some(validators)) => ProofSource::Synthetic { validators },
            (None, None) => ProofSource::Embedded,
        };

        EstimatorConfig {
            rounds: self.rounds,
            solidity_chain_id: U256::from(self.solidity_chain_id),
            native_chain_id: U256::from(self.native_chain_id),
            epoch_interval: self.epoch_interval,
            gas_limit: self.gas_limit,
            precompile_gas: self.precompile_gas,
            proof,
            parity_check: !self.skip_parity_check,
        }
    }
}
