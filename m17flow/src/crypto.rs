//! The cryptographic capability set the pipelines are written against.
//!
//! The codec never sees key material: it hands the provider an IV and a
//! payload block, or a finished digest, and uses whatever comes back. Which
//! cipher suite or signature scheme sits behind the trait is the host's
//! decision.

use crate::error::CryptoError;

pub trait CryptoProvider {
    /// Run the stream cipher over one payload block in place, keyed by the
    /// provider and parameterised by the 16-byte frame IV. Counter-mode
    /// ciphers make this its own inverse, which the decoder relies on.
    fn stream_crypt(&mut self, iv: &[u8; 16], payload: &mut [u8; 16]);

    /// Sign the finished 32-byte stream digest.
    fn sign(&mut self, digest: &[u8; 32]) -> Result<[u8; 64], CryptoError>;

    /// Check a 64-byte signature over the 32-byte stream digest against the
    /// provider's public key.
    fn verify(&mut self, digest: &[u8; 32], signature: &[u8; 64]) -> bool;

    /// Derive a fresh session key from the provider's shared secret. Driven
    /// by the host when a transmission negotiates session keying; the
    /// pipelines themselves never call it.
    fn derive(&mut self, salt: &[u8], info: &[u8]) -> Result<(), CryptoError> {
        let _ = (salt, info);
        Ok(())
    }
}

/// Provider for unencrypted, unsigned operation.
pub struct NullCrypto;

impl CryptoProvider for NullCrypto {
    fn stream_crypt(&mut self, _iv: &[u8; 16], _payload: &mut [u8; 16]) {}

    fn sign(&mut self, _digest: &[u8; 32]) -> Result<[u8; 64], CryptoError> {
        Err(CryptoError::NoSigningKey)
    }

    fn verify(&mut self, _digest: &[u8; 32], _signature: &[u8; 64]) -> bool {
        false
    }
}
