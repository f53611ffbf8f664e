use crate::error::ChainError;
use crate::transaction::{verify_credentials, Transaction};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Name and nonce tables. Only reachable through [`RegistryState`]'s lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RegistryTables {
    pub names: HashMap<String, String>,
    pub nonces: HashMap<String, u64>,
    pub known_addresses: HashSet<String>,
}

impl RegistryTables {
    fn validate(&self, tx: &Transaction) -> Result<(), ChainError> {
        verify_credentials(tx)?;

        if self.known_addresses.contains(&tx.address) {
            let expected = self.nonces.get(&tx.address).copied().unwrap_or(0);
            if tx.nonce != expected {
                return Err(ChainError::InvalidNonce {
                    expected,
                    got: tx.nonce,
                });
            }
        }

        if self.names.contains_key(&tx.name) {
            return Err(ChainError::NameAlreadyRegistered(tx.name.clone()));
        }

        Ok(())
    }
}

/// The live name registry: `name -> address` bindings and per-address nonces.
///
/// Every operation takes the instance's lock: reads share it, `apply` holds
/// it exclusively for the whole validate-then-mutate sequence.
#[derive(Debug, Default)]
pub struct RegistryState {
    tables: RwLock<RegistryTables>,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: RegistryTables) -> Self {
        RegistryState {
            tables: RwLock::new(tables),
        }
    }

    /// Validates `tx` and, on success, binds the name and advances the nonce.
    /// On failure only the first-seen registration of the address remains.
    pub fn apply(&self, tx: &Transaction) -> Result<(), ChainError> {
        let mut tables = self.tables.write();

        // First sight of an address registers it at nonce 0, even if the
        // transaction is rejected below.
        if tables.known_addresses.insert(tx.address.clone()) {
            tables.nonces.insert(tx.address.clone(), 0);
        }

        tables.validate(tx)?;

        tables.names.insert(tx.name.clone(), tx.address.clone());
        *tables.nonces.entry(tx.address.clone()).or_insert(0) += 1;
        Ok(())
    }

    /// Read-only pre-check with the same rules as [`RegistryState::apply`].
    pub fn validate(&self, tx: &Transaction) -> Result<(), ChainError> {
        self.tables.read().validate(tx)
    }

    pub fn lookup(&self, name: &str) -> Result<String, ChainError> {
        self.tables
            .read()
            .names
            .get(name)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("name '{}' is not registered", name)))
    }

    /// Next nonce `address` must use; 0 for addresses never seen.
    pub fn nonce_of(&self, address: &str) -> u64 {
        self.tables.read().nonces.get(address).copied().unwrap_or(0)
    }

    pub fn is_known(&self, address: &str) -> bool {
        self.tables.read().known_addresses.contains(address)
    }

    pub fn name_count(&self) -> usize {
        self.tables.read().names.len()
    }

    /// Independent deep copy for speculative application.
    pub fn snapshot(&self) -> RegistryState {
        RegistryState::from_tables(self.tables.read().clone())
    }

    pub fn tables(&self) -> RegistryTables {
        self.tables.read().clone()
    }
}

impl Clone for RegistryState {
    fn clone(&self) -> Self {
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::error::AuthError;

    #[test]
    fn test_unseen_address_has_nonce_zero() {
        let state = RegistryState::new();
        assert_eq!(state.nonce_of("never-seen"), 0);
        assert!(!state.is_known("never-seen"));
    }

    #[test]
    fn test_valid_name_registration() {
        let state = RegistryState::new();
        let keypair = KeyPair::generate();
        let tx = Transaction::signed(&keypair, "alice", 0).unwrap();

        state.apply(&tx).unwrap();

        assert_eq!(state.lookup("alice").unwrap(), keypair.address());
        assert_eq!(state.nonce_of(&keypair.address()), 1);
    }

    #[test]
    fn test_duplicate_name() {
        let state = RegistryState::new();
        let keypair = KeyPair::generate();
        state.apply(&Transaction::signed(&keypair, "bob", 0).unwrap()).unwrap();
        let before = state.tables();

        let err = state
            .apply(&Transaction::signed(&keypair, "bob", 1).unwrap())
            .unwrap_err();

        assert_eq!(err, ChainError::NameAlreadyRegistered("bob".to_string()));
        assert_eq!(state.tables(), before);
    }

    #[test]
    fn test_duplicate_name_from_other_address() {
        let state = RegistryState::new();
        let first = KeyPair::generate();
        let second = KeyPair::generate();
        state.apply(&Transaction::signed(&first, "bob", 0).unwrap()).unwrap();

        let err = state
            .apply(&Transaction::signed(&second, "bob", 0).unwrap())
            .unwrap_err();
        assert_eq!(err, ChainError::NameAlreadyRegistered("bob".to_string()));
        assert_eq!(state.lookup("bob").unwrap(), first.address());
        assert_eq!(state.nonce_of(&second.address()), 0);
    }

    #[test]
    fn test_reused_or_future_nonce() {
        let state = RegistryState::new();
        let keypair = KeyPair::generate();
        state.apply(&Transaction::signed(&keypair, "charlie", 0).unwrap()).unwrap();

        let reused = state.apply(&Transaction::signed(&keypair, "delta", 0).unwrap());
        assert_eq!(reused, Err(ChainError::InvalidNonce { expected: 1, got: 0 }));

        let future = state.apply(&Transaction::signed(&keypair, "echo", 5).unwrap());
        assert_eq!(future, Err(ChainError::InvalidNonce { expected: 1, got: 5 }));

        assert_eq!(state.nonce_of(&keypair.address()), 1);
        assert!(state.lookup("delta").is_err());
        assert!(state.lookup("echo").is_err());
    }

    #[test]
    fn test_first_transaction_must_use_nonce_zero() {
        let state = RegistryState::new();
        let keypair = KeyPair::generate();

        let err = state
            .apply(&Transaction::signed(&keypair, "early", 3).unwrap())
            .unwrap_err();
        assert_eq!(err, ChainError::InvalidNonce { expected: 0, got: 3 });
        assert_eq!(state.nonce_of(&keypair.address()), 0);
        assert!(state.is_known(&keypair.address()));
    }

    #[test]
    fn test_unauthenticated_address() {
        let state = RegistryState::new();
        let owner = KeyPair::generate();
        let intruder = KeyPair::generate();
        state.apply(&Transaction::signed(&owner, "alice", 0).unwrap()).unwrap();

        let mut tx = Transaction::new("alice2", owner.address(), 1);
        tx.sign_with(&intruder).unwrap();

        assert_eq!(
            state.apply(&tx),
            Err(ChainError::Auth(AuthError::AddressMismatch))
        );
        assert!(state.lookup("alice2").is_err());
    }

    #[test]
    fn test_validate_does_not_mutate() {
        let state = RegistryState::new();
        let keypair = KeyPair::generate();
        let tx = Transaction::signed(&keypair, "alice", 0).unwrap();

        state.validate(&tx).unwrap();
        state.validate(&tx).unwrap();

        assert!(state.lookup("alice").is_err());
        assert!(!state.is_known(&keypair.address()));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let state = RegistryState::new();
        let keypair = KeyPair::generate();
        state.apply(&Transaction::signed(&keypair, "alice", 0).unwrap()).unwrap();

        let scratch = state.snapshot();
        scratch
            .apply(&Transaction::signed(&keypair, "bob", 1).unwrap())
            .unwrap();

        assert_eq!(scratch.nonce_of(&keypair.address()), 2);
        assert_eq!(state.nonce_of(&keypair.address()), 1);
        assert!(state.lookup("bob").is_err());
        assert_eq!(scratch.name_count(), 2);
    }
}
