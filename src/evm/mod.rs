//! In-memory EVM sandbox.
//!
//! A single-account ledger backed by [`EthEvmFactory`]: contracts are
//! deployed by running their creation code and installing the returned
//! runtime code, and every call runs in a fresh EVM without committing state.
//! Only a deploy advances the caller nonce.

pub mod bench;
pub mod contract;

use alloy_evm::revm::bytecode::Bytecode;
use alloy_evm::revm::context::result::{ExecutionResult, Output};
use alloy_evm::revm::context::{BlockEnv, TxEnv};
use alloy_evm::revm::database_interface::DBErrorMarker;
use alloy_evm::revm::primitives::hardfork::SpecId;
use alloy_evm::revm::primitives::TxKind;
use alloy_evm::revm::state::AccountInfo;
use alloy_evm::{EthEvmFactory, Evm, EvmEnv, EvmFactory};
use alloy_primitives::{Address, Bytes, B256, U256};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// Gas cap for sandbox transactions.
pub const DEFAULT_GAS_LIMIT: u64 = 8_000_000;

/// Block gas limit of the sandbox environment.
pub const BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// Sender of every sandbox transaction.
pub const SANDBOX_CALLER: Address = Address::new([0xAA; 20]);

/// Sandbox failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SandboxError {
    /// Execution reverted; carries the decoded revert reason when there is one
    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("execution halted: {0}")]
    Halted(String),

    #[error("evm error: {0}")]
    Evm(String),

    #[error("contract creation returned no address")]
    NoContractAddress,

    #[error("invalid bytecode constant: {0}")]
    InvalidBytecode(#[from] hex::FromHexError),
}

/// Minimal error type for the sandbox DB.
#[derive(Debug, Clone, Error)]
#[error("sandbox db error")]
pub struct SandboxDbError;

// Mark as a DB error so alloy_evm::Database blanket impl applies.
impl DBErrorMarker for SandboxDbError {}

/// Accounts keyed by address; storage is always empty.
#[derive(Debug, Clone, Default)]
pub struct SandboxDb {
    accounts: HashMap<Address, AccountInfo>,
}

impl SandboxDb {
    pub fn insert_account(&mut self, address: Address, info: AccountInfo) {
        self.accounts.insert(address, info);
    }

    /// Install runtime code at `address`.
    pub fn insert_code(&mut self, address: Address, runtime: Bytes) {
        let code = Bytecode::new_raw(runtime);
        let info = AccountInfo {
            nonce: 1,
            code_hash: code.hash_slow(),
            code: Some(code),
            ..Default::default()
        };
        self.insert_account(address, info);
    }

    /// Nonce of `address`, zero for unknown accounts.
    pub fn nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |info| info.nonce)
    }

    fn increment_nonce(&mut self, address: Address) {
        self.accounts.entry(address).or_default().nonce += 1;
    }

    pub fn account(&self, address: &Address) -> Option<&AccountInfo> {
        self.accounts.get(address)
    }
}

impl alloy_evm::revm::Database for SandboxDb {
    type Error = SandboxDbError;

    fn basic(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        Ok(self.accounts.get(&address).cloned())
    }

    fn code_by_hash(&mut self, code_hash: B256) -> Result<Bytecode, Self::Error> {
        Ok(self
            .accounts
            .values()
            .find(|info| info.code_hash == code_hash)
            .and_then(|info| info.code.clone())
            .unwrap_or_default())
    }

    fn storage(&mut self, _address: Address, _index: U256) -> Result<U256, Self::Error> {
        Ok(U256::ZERO)
    }

    fn block_hash(&mut self, _number: u64) -> Result<B256, Self::Error> {
        Ok(B256::ZERO)
    }
}

/// A funded caller and the contracts deployed so far.
#[derive(Debug, Clone)]
pub struct Sandbox {
    factory: EthEvmFactory,
    db: SandboxDb,
    env: EvmEnv<SpecId, BlockEnv>,
    gas_limit: u64,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(DEFAULT_GAS_LIMIT)
    }
}

impl Sandbox {
    /// A sandbox whose transactions run with `gas_limit`.
    pub fn new(gas_limit: u64) -> Self {
        let mut db = SandboxDb::default();
        db.insert_account(
            SANDBOX_CALLER,
            AccountInfo {
                balance: U256::from(1_000_000u64) * U256::from(10u64).pow(U256::from(18u64)),
                ..Default::default()
            },
        );

        let mut env = EvmEnv::<SpecId, BlockEnv>::default();
        env.block_env.gas_limit = BLOCK_GAS_LIMIT.max(gas_limit);

        Self { factory: EthEvmFactory::default(), db, env, gas_limit }
    }

    pub fn db(&self) -> &SandboxDb {
        &self.db
    }

    fn tx(&self, kind: TxKind, data: Bytes) -> TxEnv {
        let mut tx = TxEnv::default();
        tx.caller = SANDBOX_CALLER;
        tx.nonce = self.db.nonce(&SANDBOX_CALLER);
        tx.kind = kind;
        tx.data = data;
        tx.gas_limit = self.gas_limit;
        tx.gas_price = 1;
        tx
    }

    fn execute(&mut self, tx: TxEnv) -> Result<ExecutionResult, SandboxError> {
        let mut evm = self.factory.create_evm(&mut self.db, self.env.clone());
        let outcome = evm.transact(tx).map_err(|e| SandboxError::Evm(e.to_string()))?;
        match outcome.result {
            ExecutionResult::Revert { output, .. } => {
                let reason = alloy_sol_types::decode_revert_reason(&output)
                    .unwrap_or_else(|| format!("0x{}", hex::encode(&output)));
                Err(SandboxError::Reverted(reason))
            }
            ExecutionResult::Halt { reason, .. } => Err(SandboxError::Halted(format!("{reason:?}"))),
            success => Ok(success),
        }
    }

    /// Run creation code and install the runtime code it returns.
    pub fn deploy_contract(&mut self, initcode: Bytes) -> Result<Address, SandboxError> {
        let result = self.execute(self.tx(TxKind::Create, initcode))?;
        let gas_used = result.gas_used();
        let ExecutionResult::Success { output: Output::Create(runtime, address), .. } = result
        else {
            return Err(SandboxError::NoContractAddress);
        };
        let address = address.ok_or(SandboxError::NoContractAddress)?;

        info!(target: "sandbox", %address, code_size = runtime.len(), gas_used, "deployed contract");
        self.db.insert_code(address, runtime);
        self.db.increment_nonce(SANDBOX_CALLER);
        Ok(address)
    }

    /// Call `to` and return its output.
    pub fn call(&mut self, to: Address, input: Bytes) -> Result<Bytes, SandboxError> {
        let result = self.execute(self.tx(TxKind::Call(to), input))?;
        Ok(result.output().cloned().unwrap_or_default())
    }

    /// Gas used by a call at the sandbox gas cap, intrinsic cost included.
    pub fn estimate_gas(&mut self, to: Address, input: Bytes) -> Result<u64, SandboxError> {
        let gas_used = self.execute(self.tx(TxKind::Call(to), input))?.gas_used();
        debug!(target: "sandbox", %to, gas_used, "estimated gas");
        Ok(gas_used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Initcode that returns `runtime` as the deployed code.
    fn make_initcode(runtime: &[u8]) -> Bytes {
        let len = runtime.len() as u8;
        // PUSH1 len, PUSH1 12, PUSH1 0, CODECOPY, PUSH1 len, PUSH1 0, RETURN
        let mut code = vec![0x60, len, 0x60, 0x0c, 0x60, 0x00, 0x39, 0x60, len, 0x60, 0x00, 0xf3];
        code.extend_from_slice(runtime);
        code.into()
    }

    // PUSH1 0x2a, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    const RETURN_42: [u8; 10] = [0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];

    #[test]
    fn test_deploy_and_call() {
        let mut sandbox = Sandbox::default();
        let address = sandbox.deploy_contract(make_initcode(&RETURN_42)).unwrap();

        assert_eq!(address, SANDBOX_CALLER.create(0));
        assert_eq!(sandbox.db().account(&address).unwrap().nonce, 1);

        let output = sandbox.call(address, Bytes::new()).unwrap();
        assert_eq!(U256::from_be_slice(&output), U256::from(42));
    }

    #[test]
    fn test_deploys_use_consecutive_nonces() {
        // PUSH1 0x07, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
        const RETURN_7: [u8; 10] = [0x60, 0x07, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];

        let mut sandbox = Sandbox::default();
        let first = sandbox.deploy_contract(make_initcode(&RETURN_42)).unwrap();
        let second = sandbox.deploy_contract(make_initcode(&RETURN_7)).unwrap();

        assert_eq!(first, SANDBOX_CALLER.create(0));
        assert_eq!(second, SANDBOX_CALLER.create(1));
        assert_eq!(sandbox.db().nonce(&SANDBOX_CALLER), 2);

        let output = sandbox.call(first, Bytes::new()).unwrap();
        assert_eq!(U256::from_be_slice(&output), U256::from(42));
        let output = sandbox.call(second, Bytes::new()).unwrap();
        assert_eq!(U256::from_be_slice(&output), U256::from(7));

        // Calls leave the nonce alone
        assert_eq!(sandbox.db().nonce(&SANDBOX_CALLER), 2);
    }

    #[test]
    fn test_estimate_gas_includes_intrinsic_cost() {
        let mut sandbox = Sandbox::default();
        let address = sandbox.deploy_contract(make_initcode(&RETURN_42)).unwrap();

        let gas = sandbox.estimate_gas(address, Bytes::new()).unwrap();
        assert!(gas > 21_000, "gas = {gas}");
        // Nothing is committed, so repeated calls cost the same
        assert_eq!(sandbox.estimate_gas(address, Bytes::new()).unwrap(), gas);
    }

    #[test]
    fn test_revert_reason_is_decoded() {
        // Error("bad proof"): selector, offset, length, data
        let mut revert_data = vec![0x08, 0xc3, 0x79, 0xa0];
        revert_data.extend_from_slice(&U256::from(32).to_be_bytes::<32>());
        revert_data.extend_from_slice(&U256::from(9).to_be_bytes::<32>());
        let mut word = [0u8; 32];
        word[..9].copy_from_slice(b"bad proof");
        revert_data.extend_from_slice(&word);
        assert_eq!(revert_data.len(), 100);

        // CODECOPY the payload appended after the 12-byte prologue, then REVERT
        let mut runtime = vec![0x60, 100, 0x60, 0x0c, 0x60, 0x00, 0x39, 0x60, 100, 0x60, 0x00, 0xfd];
        runtime.extend_from_slice(&revert_data);
        let mut sandbox = Sandbox::default();
        let address = sandbox.deploy_contract(make_initcode(&runtime)).unwrap();

        match sandbox.call(address, Bytes::new()).unwrap_err() {
            SandboxError::Reverted(reason) => assert!(reason.contains("bad proof"), "{reason}"),
            other => panic!("Expected Reverted, got {:?}", other),
        }
    }

    #[test]
    fn test_halt_surfaces_as_error() {
        let mut sandbox = Sandbox::default();
        // INVALID
        let address = sandbox.deploy_contract(make_initcode(&[0xfe])).unwrap();
        let err = sandbox.call(address, Bytes::new()).unwrap_err();
        assert!(matches!(err, SandboxError::Halted(_)), "{err}");
    }

    #[test]
    fn test_failed_deploy() {
        let mut sandbox = Sandbox::default();
        // PUSH1 0, PUSH1 0, REVERT
        let err = sandbox.deploy_contract(Bytes::from(vec![0x60, 0x00, 0x60, 0x00, 0xfd])).unwrap_err();
        assert!(matches!(err, SandboxError::Reverted(_)), "{err}");
        assert_eq!(sandbox.db().nonce(&SANDBOX_CALLER), 0);
    }

    #[test]
    fn test_call_without_code_returns_empty() {
        let mut sandbox = Sandbox::default();
        let output = sandbox.call(Address::repeat_byte(0xcc), Bytes::new()).unwrap();
        assert!(output.is_empty());
    }
}
