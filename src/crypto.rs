//! Cryptographic primitives for the name registry (NIST P-256 / SHA-256)

use crate::error::{AuthError, ChainError};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use sha2::{Digest, Sha256};

/// Length of a SEC1 compressed P-256 point.
pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 33;
/// Two 32-byte big-endian scalars, `r` then `s`.
pub const SIGNATURE_SIZE: usize = 64;
pub const SECRET_KEY_SIZE: usize = 32;

/// Derives the account address: lowercase hex of SHA-256 over the public key bytes.
pub fn address_from_public_key(public_key: &[u8]) -> String {
    hex::encode(Sha256::digest(public_key))
}

/// Decodes a compressed SEC1 point. Uncompressed and hybrid encodings are refused.
pub fn decode_public_key(bytes: &[u8]) -> Result<VerifyingKey, AuthError> {
    if bytes.len() != COMPRESSED_PUBLIC_KEY_SIZE || !matches!(bytes[0], 0x02 | 0x03) {
        return Err(AuthError::InvalidPublicKey);
    }
    VerifyingKey::from_sec1_bytes(bytes).map_err(|_| AuthError::InvalidPublicKey)
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub signing_key: SigningKey,
    pub verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        KeyPair {
            signing_key,
            verifying_key,
        }
    }

    /// Creates a KeyPair from a raw 32-byte big-endian secret scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(ChainError::DecodeError(format!(
                "Secret key must be {} bytes, got {}",
                SECRET_KEY_SIZE,
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| ChainError::DecodeError(format!("Invalid secret key bytes: {}", e)))?;
        Ok(Self::from_signing_key(signing_key))
    }

    pub fn from_secret_hex(hex_str: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| ChainError::DecodeError(format!("Invalid hex secret key: {}", e)))?;
        Self::from_secret_bytes(&bytes)
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Returns the compressed SEC1 encoding of the public key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.verifying_key.to_encoded_point(true).as_bytes().to_vec()
    }

    /// Computes the registry address (SHA-256 hash of the compressed public key).
    pub fn address(&self) -> String {
        address_from_public_key(&self.public_key_bytes())
    }

    /// Signs an already-computed 32-byte digest; returns `r || s`.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; SIGNATURE_SIZE], ChainError> {
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest)
            .map_err(|e| ChainError::DecodeError(format!("Failed to sign digest: {}", e)))?;

        let mut out = [0u8; SIGNATURE_SIZE];
        out.copy_from_slice(&signature.to_bytes());
        Ok(out)
    }
}

/// Verifies an `r || s` signature over a digest with a compressed public key.
pub fn verify_digest(
    public_key_bytes: &[u8],
    digest: &[u8; 32],
    signature_bytes: &[u8],
) -> Result<(), AuthError> {
    let public_key = decode_public_key(public_key_bytes)?;

    if signature_bytes.len() != SIGNATURE_SIZE {
        return Err(AuthError::InvalidSignatureLength(signature_bytes.len()));
    }

    // Zero or out-of-range scalars cannot be a valid signature.
    let signature =
        Signature::from_slice(signature_bytes).map_err(|_| AuthError::InvalidSignature)?;

    public_key
        .verify_prehash(digest, &signature)
        .map_err(|_| AuthError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let keypair = KeyPair::generate();
        let public_key = keypair.public_key_bytes();
        assert_eq!(public_key.len(), COMPRESSED_PUBLIC_KEY_SIZE);
        assert!(matches!(public_key[0], 0x02 | 0x03));
        assert_eq!(keypair.secret_hex().len(), SECRET_KEY_SIZE * 2);
    }

    #[test]
    fn test_address_generation() {
        let keypair = KeyPair::generate();
        let address = keypair.address();
        assert_eq!(address.len(), 64);
        assert!(address.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_secret_hex_round_trip() {
        let keypair = KeyPair::generate();
        let restored = KeyPair::from_secret_hex(&keypair.secret_hex()).unwrap();
        assert_eq!(keypair.address(), restored.address());
    }

    #[test]
    fn test_signing_and_verification() {
        let keypair = KeyPair::generate();
        let digest: [u8; 32] = Sha256::digest(b"register alice").into();

        let signature = keypair.sign_digest(&digest).unwrap();
        assert!(verify_digest(&keypair.public_key_bytes(), &digest, &signature).is_ok());
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair1 = KeyPair::generate();
        let keypair2 = KeyPair::generate();
        let digest: [u8; 32] = Sha256::digest(b"register alice").into();

        let signature = keypair1.sign_digest(&digest).unwrap();
        assert_eq!(
            verify_digest(&keypair2.public_key_bytes(), &digest, &signature),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_digest_fails() {
        let keypair = KeyPair::generate();
        let digest: [u8; 32] = Sha256::digest(b"original").into();
        let tampered: [u8; 32] = Sha256::digest(b"tampered").into();

        let signature = keypair.sign_digest(&digest).unwrap();
        assert_eq!(
            verify_digest(&keypair.public_key_bytes(), &tampered, &signature),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_invalid_key_or_sig_length_check() {
        let keypair = KeyPair::generate();
        let digest = [7u8; 32];
        let signature = keypair.sign_digest(&digest).unwrap();
        let public_key = keypair.public_key_bytes();

        assert_eq!(
            verify_digest(&public_key[1..], &digest, &signature),
            Err(AuthError::InvalidPublicKey)
        );
        assert_eq!(
            verify_digest(&public_key, &digest, &signature[1..]),
            Err(AuthError::InvalidSignatureLength(63))
        );
    }

    #[test]
    fn test_uncompressed_key_is_refused() {
        let keypair = KeyPair::generate();
        let uncompressed = keypair.verifying_key.to_encoded_point(false);
        assert_eq!(
            decode_public_key(uncompressed.as_bytes()).err(),
            Some(AuthError::InvalidPublicKey)
        );
    }

    #[test]
    fn test_off_curve_compressed_key_is_refused() {
        let mut x_too_large = vec![0x03];
        x_too_large.extend([0xff; 32]);
        assert_eq!(
            decode_public_key(&x_too_large).err(),
            Some(AuthError::InvalidPublicKey)
        );

        let keypair = KeyPair::generate();
        let digest = [7u8; 32];
        let signature = keypair.sign_digest(&digest).unwrap();
        assert_eq!(
            verify_digest(&x_too_large, &digest, &signature),
            Err(AuthError::InvalidPublicKey)
        );
    }

    #[test]
    fn test_zero_signature_is_invalid() {
        let keypair = KeyPair::generate();
        assert_eq!(
            verify_digest(&keypair.public_key_bytes(), &[1u8; 32], &[0u8; SIGNATURE_SIZE]),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_from_secret_bytes_invalid_length() {
        let result = KeyPair::from_secret_bytes(&[1u8; SECRET_KEY_SIZE - 1]);
        assert!(result.unwrap_err().to_string().contains("Secret key must be"));
    }
}
