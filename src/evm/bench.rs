//! Benchmark-style tests for the two verification paths.
//!
//! These are `#[test]` functions timed with `std::time::Instant` rather than
//! a `criterion` harness, so they run with the rest of the suite via
//! `cargo test`. Round counts are kept small; the full 100k-round run is the
//! binary's job.
//!
//! # Categories
//!
//! | Test | What it measures |
//! |------|------------------|
//! | `test_native_genesis_proof` | Native verification of the BSC genesis header |
//! | `test_native_synthetic_chain` | Native verification with seal recovery and quorum |
//! | `test_solidity_measure_block` | Sandbox `measureBlock` gas estimation |
//! | `test_seal_recovery` | A single secp256k1 seal recovery |
//! | `test_native_vs_solidity_comparison` | Print comparison table |

#[cfg(test)]
mod tests {
    use crate::estimator::GasReport;
    use crate::evm::contract::{measure_block_calldata, VerifierGasMeasurer};
    use crate::evm::Sandbox;
    use crate::fixtures::{bsc_genesis_proof, SyntheticChain};
    use crate::parlia::{header_signer, ParliaHeader};
    use crate::precompile::VerifyParliaBlock;
    use alloy_primitives::U256;
    use std::hint::black_box;
    use std::time::Instant;

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn per_iter_us(elapsed: std::time::Duration, iterations: u32) -> f64 {
        elapsed.as_nanos() as f64 / 1_000.0 / iterations as f64
    }

    fn time_native(input: &[u8], iterations: u32) -> std::time::Duration {
        let precompile = VerifyParliaBlock::new();
        let start = Instant::now();
        for _ in 0..iterations {
            black_box(precompile.run(black_box(input)).unwrap());
        }
        start.elapsed()
    }

    // =====================================================================
    //  Benchmark Tests
    // =====================================================================

    // -- 1. Native genesis proof ------------------------------------------

    #[test]
    fn test_native_genesis_proof() {
        // Decoding plus validator extraction, no signature recovery.
        let proof = bsc_genesis_proof().unwrap();
        let input = VerifyParliaBlock::encode_input(U256::from(56), &proof, 200);

        const ITERATIONS: u32 = 2_000;
        let elapsed = time_native(&input, ITERATIONS);
        let per_call_us = per_iter_us(elapsed, ITERATIONS);

        println!("=== Native Genesis Proof Benchmark ===");
        println!("  Proof size:  {} bytes", proof.len());
        println!("  Iterations:  {ITERATIONS}");
        println!("  Total time:  {elapsed:?}");
        println!("  Per call:    {per_call_us:.2} us");
        println!();

        assert!(per_call_us < 10_000.0, "genesis verification took too long: {per_call_us} us");
    }

    // -- 2. Native synthetic chain ----------------------------------------

    #[test]
    fn test_native_synthetic_chain() {
        // 21 validators like BSC mainnet; 15 sealed headers reach quorum.
        let chain = SyntheticChain::new(21).unwrap();
        let signers: Vec<usize> = (0..15).collect();
        let proof = chain.proof_by(&signers).unwrap();
        let input = VerifyParliaBlock::encode_input(chain.chain_id(), &proof, 200);

        const ITERATIONS: u32 = 50;
        let elapsed = time_native(&input, ITERATIONS);
        let per_call_us = per_iter_us(elapsed, ITERATIONS);

        println!("=== Native Synthetic Chain Benchmark ===");
        println!("  Headers:     16 (genesis + 15 sealed)");
        println!("  Proof size:  {} bytes", proof.len());
        println!("  Iterations:  {ITERATIONS}");
        println!("  Total time:  {elapsed:?}");
        println!("  Per call:    {per_call_us:.2} us");
        println!("  Per seal:    {:.2} us", per_call_us / 15.0);
        println!();

        assert!(per_call_us < 1_000_000.0, "synthetic verification took too long: {per_call_us} us");
    }

    // -- 3. Solidity measureBlock -----------------------------------------

    #[test]
    fn test_solidity_measure_block() {
        let mut sandbox = Sandbox::default();
        let contract = VerifierGasMeasurer::deploy(&mut sandbox).unwrap();
        let proof = bsc_genesis_proof().unwrap();
        let input = measure_block_calldata(&proof, U256::from(65));

        const ITERATIONS: u32 = 200;
        let mut gas_used = 0;
        let start = Instant::now();
        for _ in 0..ITERATIONS {
            gas_used = sandbox.estimate_gas(contract.address(), input.clone()).unwrap();
        }
        let elapsed = start.elapsed();
        let per_call_us = per_iter_us(elapsed, ITERATIONS);

        println!("=== Solidity measureBlock Benchmark ===");
        println!("  Calldata:    {} bytes", input.len());
        println!("  Iterations:  {ITERATIONS}");
        println!("  Total time:  {elapsed:?}");
        println!("  Per call:    {per_call_us:.2} us");
        println!("  Gas used:    {gas_used}");
        println!();

        assert!(gas_used > 21_000, "gas must include the intrinsic cost");
        assert!(per_call_us < 100_000.0, "measureBlock took too long: {per_call_us} us");
    }

    // -- 4. Seal recovery -------------------------------------------------

    #[test]
    fn test_seal_recovery() {
        let chain = SyntheticChain::new(3).unwrap();
        let headers = chain.sealed_headers(1).unwrap();
        let header = ParliaHeader::decode(&alloy_rlp::encode(&headers[1])).unwrap();

        const ITERATIONS: u32 = 500;
        let start = Instant::now();
        for _ in 0..ITERATIONS {
            black_box(header_signer(black_box(&header), chain.chain_id()).unwrap());
        }
        let elapsed = start.elapsed();
        let per_call_us = per_iter_us(elapsed, ITERATIONS);

        println!("=== Seal Recovery Benchmark ===");
        println!("  Iterations:  {ITERATIONS}");
        println!("  Total time:  {elapsed:?}");
        println!("  Per recover: {per_call_us:.2} us");
        println!();

        assert_eq!(header_signer(&header, chain.chain_id()).unwrap(), chain.validators()[0]);
    }

    // -- 5. Comparison ----------------------------------------------------

    #[test]
    fn test_native_vs_solidity_comparison() {
        let proof = bsc_genesis_proof().unwrap();
        let mut sandbox = Sandbox::default();
        let contract = VerifierGasMeasurer::deploy(&mut sandbox).unwrap();
        let solidity_input = measure_block_calldata(&proof, U256::from(65));
        let native_input = VerifyParliaBlock::encode_input(U256::from(56), &proof, 200);

        const ROUNDS: u32 = 100;
        let mut gas_used = 0;
        let start = Instant::now();
        for _ in 0..ROUNDS {
            gas_used = sandbox.estimate_gas(contract.address(), solidity_input.clone()).unwrap();
        }
        let solidity = start.elapsed();
        let native = time_native(&native_input, ROUNDS);

        let report = GasReport::new(
            u64::from(ROUNDS),
            solidity.as_nanos() as u64,
            gas_used,
            native.as_nanos() as u64,
        );
        print_benchmark_comparison(&report);

        assert!(report.optimal_gas > 0.0);
    }

    fn print_benchmark_comparison(report: &GasReport) {
        let ratio = report.solidity_ns as f64 / report.native_ns.max(1) as f64;
        println!("=== Native vs Solidity ({} rounds) ===", report.rounds);
        println!("  {:<24} {:>16}", "Path", "Total (ns)");
        println!("  {:<24} {:>16}", "solidity (sandbox)", report.solidity_ns);
        println!("  {:<24} {:>16}", "native (precompile)", report.native_ns);
        println!("  ---");
        println!("  Speedup:        {ratio:.1}x");
        println!("  Solidity gas:   {}", report.solidity_gas);
        println!("  Optimal gas:    ~{:.0}", report.optimal_gas);
        println!();
    }
}
