//! Gas and timing harness.
//!
//! Runs the same proof through the Solidity verifier (inside the sandbox) and
//! the native precompile, then scales the Solidity gas by the time ratio:
//! `optimal_gas = solidity_gas * native_ns / solidity_ns`.

use alloy_primitives::{Bytes, U256};
use serde::Serialize;
use std::{fmt, hint::black_box, path::PathBuf, time::Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    evm::{
        contract::{measure_block_calldata, VerifierGasMeasurer},
        Sandbox, SandboxError, DEFAULT_GAS_LIMIT,
    },
    fixtures::{self, encode_proof, SyntheticChain},
    parlia::{BlockProof, ProofError, DEFAULT_EPOCH_INTERVAL},
    precompile::{NativeError, VerifyParliaBlock, VERIFY_PARLIA_BLOCK_BASE},
    signer::SignerError,
};

/// Rounds per verification path.
pub const DEFAULT_ROUNDS: u64 = 100_000;

/// Chain id the Solidity path measures with.
pub const DEFAULT_SOLIDITY_CHAIN_ID: u64 = 65;

/// Chain id the native path verifies with.
pub const DEFAULT_NATIVE_CHAIN_ID: u64 = 56;

/// Harness failures
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Native(#[from] NativeError),

    #[error("invalid block proof: {0}")]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("failed to read proof file {path}: {source}")]
    ProofFile { path: PathBuf, source: std::io::Error },

    #[error("invalid proof hex: {0}")]
    ProofHex(#[from] hex::FromHexError),

    #[error("solidity and native results differ:\n  solidity: {solidity}\n  native:   {native}")]
    ParityMismatch { solidity: Bytes, native: Bytes },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Where the measured proof comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofSource {
    /// BSC mainnet genesis
    Embedded,
    /// Hex-encoded proof on disk
    File(PathBuf),
    /// A freshly sealed chain with this many validators, long enough to reach quorum
    Synthetic { validators: usize },
}

#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub rounds: u64,
    pub solidity_chain_id: U256,
    pub native_chain_id: U256,
    pub epoch_interval: u32,
    pub gas_limit: u64,
    /// Flat gas the native precompile charges per call
    pub precompile_gas: u64,
    pub proof: ProofSource,
    pub parity_check: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            solidity_chain_id: U256::from(DEFAULT_SOLIDITY_CHAIN_ID),
            native_chain_id: U256::from(DEFAULT_NATIVE_CHAIN_ID),
            epoch_interval: DEFAULT_EPOCH_INTERVAL as u32,
            gas_limit: DEFAULT_GAS_LIMIT,
            precompile_gas: VERIFY_PARLIA_BLOCK_BASE,
            proof: ProofSource::Embedded,
            parity_check: true,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), EstimatorError> {
        if self.rounds == 0 {
            return Err(EstimatorError::InvalidConfig("rounds must be at least 1".into()));
        }
        if self.epoch_interval == 0 {
            return Err(EstimatorError::InvalidConfig("epoch interval must be non-zero".into()));
        }
        if let ProofSource::Synthetic { validators: 0 } = self.proof {
            return Err(EstimatorError::InvalidConfig("synthetic chain needs validators".into()));
        }
        Ok(())
    }
}

/// Inputs for both paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    /// Single header handed to the contract
    pub solidity_header: Bytes,
    /// Full proof handed to the native verifier
    pub native_proof: Bytes,
}

impl Workload {
    pub fn prepare(config: &EstimatorConfig) -> Result<Self, EstimatorError> {
        let native_proof = match &config.proof {
            ProofSource::Embedded => fixtures::bsc_genesis_proof()?,
            ProofSource::File(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|source| EstimatorError::ProofFile { path: path.clone(), source })?;
                fixtures::decode_hex(&text)?
            }
            ProofSource::Synthetic { validators } => {
                let chain = SyntheticChain::with_chain_id(*validators, config.native_chain_id)?;
                let quorum = validators * 2 / 3 + 1;
                let signers: Vec<usize> = (0..quorum).collect();
                encode_proof(&chain.sealed_headers_by(&signers)?)
            }
        };

        // The contract measures one header: the one the proof finalizes
        let proof = BlockProof::decode(&native_proof).map_err(ProofError::from)?;
        let solidity_header = if proof.len() == 1 {
            native_proof.clone()
        } else {
            alloy_rlp::encode(proof.terminal().header()).into()
        };
        debug!(
            target: "estimator",
            headers = proof.len(),
            proof_size = native_proof.len(),
            terminal = proof.terminal().number(),
            "prepared workload"
        );

        Ok(Self { solidity_header, native_proof })
    }
}

/// Measurements of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasReport {
    pub rounds: u64,
    pub solidity_ns: u64,
    pub solidity_gas: u64,
    pub native_ns: u64,
    pub optimal_gas: f64,
}

impl GasReport {
    pub fn new(rounds: u64, solidity_ns: u64, solidity_gas: u64, native_ns: u64) -> Self {
        let optimal_gas = if solidity_ns == 0 {
            0.0
        } else {
            solidity_gas as f64 * native_ns as f64 / solidity_ns as f64
        };
        Self { rounds, solidity_ns, solidity_gas, native_ns, optimal_gas }
    }
}

impl fmt::Display for GasReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "elapsed time (solidity): {} ns", self.solidity_ns)?;
        writeln!(f, "gas used (solidity): {}", self.solidity_gas)?;
        writeln!(f, "elapsed time (native): {} ns", self.native_ns)?;
        write!(f, "optimal gas (native): ~{:.6}", self.optimal_gas)
    }
}

fn elapsed_ns(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

/// Deploy, cross-check, and time both paths.
pub fn run(config: &EstimatorConfig) -> Result<GasReport, EstimatorError> {
    config.validate()?;
    let workload = Workload::prepare(config)?;

    let mut sandbox = Sandbox::new(config.gas_limit);
    let contract = VerifierGasMeasurer::deploy(&mut sandbox)?;
    info!(target: "estimator", address = %contract.address(), "deployed VerifierGasMeasurer");

    // Both paths get the same gas budget
    let precompile = VerifyParliaBlock::new().with_gas_cost(config.precompile_gas);
    let native_input = VerifyParliaBlock::encode_input(
        config.native_chain_id,
        &workload.native_proof,
        config.epoch_interval,
    );

    if config.parity_check {
        let solidity = contract.parse_block_raw(&mut sandbox, &workload.solidity_header)?;
        let native = precompile.call(&native_input, config.gas_limit)?.bytes;
        if solidity != native {
            return Err(EstimatorError::ParityMismatch { solidity, native });
        }
        info!(target: "estimator", "solidity and native block headers match");
    } else {
        warn!(target: "estimator", "skipping parity check");
    }

    let solidity_input = measure_block_calldata(&workload.solidity_header, config.solidity_chain_id);
    info!(target: "estimator", rounds = config.rounds, "timing solidity verifier");
    let start = Instant::now();
    let mut solidity_gas = 0;
    for _ in 0..config.rounds {
        solidity_gas = sandbox.estimate_gas(contract.address(), solidity_input.clone())?;
    }
    let solidity_ns = elapsed_ns(start);

    info!(target: "estimator", rounds = config.rounds, "timing native verifier");
    let start = Instant::now();
    for _ in 0..config.rounds {
        black_box(precompile.call(black_box(&native_input), config.gas_limit)?);
    }
    let native_ns = elapsed_ns(start);

    let report = GasReport::new(config.rounds, solidity_ns, solidity_gas, native_ns);
    info!(
        target: "estimator",
        solidity_ns,
        native_ns,
        solidity_gas,
        optimal_gas = report.optimal_gas,
        "benchmark finished"
    );
    Ok(report)
}
