/// Transaction types for the name registry
use crate::crypto::KeyPair;
use crate::encoding::base64_bytes;
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A claim binding `name` to `address`, authorized by the holder of `public_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub name: String,
    /// Lowercase hex SHA-256 of the compressed public key.
    pub address: String,
    pub nonce: u64,
    #[serde(with = "base64_bytes", default)]
    pub signature: Option<Vec<u8>>,
    #[serde(rename = "pubKey", with = "base64_bytes", default)]
    pub public_key: Option<Vec<u8>>,
}

impl Transaction {
    pub fn new(name: impl Into<String>, address: impl Into<String>, nonce: u64) -> Self {
        Transaction {
            name: name.into(),
            address: address.into(),
            nonce,
            signature: None,
            public_key: None,
        }
    }

    /// Builds and signs a registration of `name` for the key pair's own address.
    pub fn signed(keypair: &KeyPair, name: impl Into<String>, nonce: u64) -> Result<Self, ChainError> {
        let mut tx = Transaction::new(name, keypair.address(), nonce);
        tx.sign_with(keypair)?;
        Ok(tx)
    }

    /// The bytes covered by the signature: `name || address || nonce`, no delimiters.
    pub fn signable_message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(self.name.len() + self.address.len() + 4);
        message.extend_from_slice(self.name.as_bytes());
        message.extend_from_slice(self.address.as_bytes());
        let mut buf = [0u8; 4];
        message.extend_from_slice(nonce_scalar(self.nonce).encode_utf8(&mut buf).as_bytes());
        message
    }

    /// SHA-256 of [`Transaction::signable_message`]; this is what gets signed.
    pub fn signing_digest(&self) -> [u8; 32] {
        Sha256::digest(self.signable_message()).into()
    }

    pub fn sign(&mut self, signature: Vec<u8>, public_key: Vec<u8>) {
        self.signature = Some(signature);
        self.public_key = Some(public_key);
    }

    pub fn sign_with(&mut self, keypair: &KeyPair) -> Result<(), ChainError> {
        let signature = keypair.sign_digest(&self.signing_digest())?;
        self.sign(signature.to_vec(), keypair.public_key_bytes());
        Ok(())
    }
}

/// The nonce enters the signed message as one UTF-8 encoded scalar whose code
/// point is the nonce value; values that are not scalars become U+FFFD.
fn nonce_scalar(nonce: u64) -> char {
    u32::try_from(nonce)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}
