//! namereg - a minimal decentralized name registry
//!
//! Participants claim a unique name by submitting a transaction signed with
//! a P-256 key; the name is bound to the address derived from that key.
//! Nodes keep an append-only, hash-chained ledger of accepted transactions
//! and forward new blocks to their peers.
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`blockchain`] - Registry state, blocks, chain and block acceptance
//! - [`transaction`] - Transaction type, signing digest, credential checks
//!
//! ## Cryptography & Encoding
//! - [`crypto`] - P-256 key pairs, address derivation, signatures
//! - [`encoding`] - Wire helpers (base64 byte fields, canonical JSON)
//!
//! ## Networking & Integration
//! - [`network`] - Best-effort block propagation to peers
//! - [`node`] - Node service owning the chain
//! - [`api`] - HTTP API
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Cryptography & Encoding
// ============================================================================
pub mod crypto;
pub mod encoding;

// ============================================================================
// Networking
// ============================================================================
pub mod network;
pub mod node;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
