/// Stateless credential checks for transactions
use crate::crypto::{address_from_public_key, verify_digest};
use crate::error::AuthError;
use crate::transaction::types::Transaction;

/// Confirms `tx` is authorized by the address it claims to act for.
///
/// Checks run in a fixed order so every node reports the same failure for the
/// same input: presence of credentials, public key decoding, signature length,
/// the ECDSA check over the signing digest, and finally that the address is
/// the hash of the supplied public key.
pub fn verify_credentials(tx: &Transaction) -> Result<(), AuthError> {
    let (signature, public_key) = match (&tx.signature, &tx.public_key) {
        (Some(sig), Some(pk)) => (sig, pk),
        _ => return Err(AuthError::MissingCredentials),
    };

    verify_digest(public_key, &tx.signing_digest(), signature)?;

    if address_from_public_key(public_key) != tx.address {
        return Err(AuthError::AddressMismatch);
    }

    Ok(())
}

impl Transaction {
    /// Validates just the signature and address binding, without any ledger state.
    pub fn verify(&self) -> Result<(), AuthError> {
        verify_credentials(self)
    }
}
