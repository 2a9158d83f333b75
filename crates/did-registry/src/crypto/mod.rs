//! Cryptographic primitives used around the registry.
//!
//! - Ed25519 key pairs and identity derivation
//! - Ed25519 signing and verification of authorization digests
//! - Argon2id + HKDF-SHA256 + ChaCha20-Poly1305 sealing of keys at rest

pub mod keys;
pub mod sealing;
pub mod signing;
