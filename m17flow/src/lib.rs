//! TX and RX pipelines for the M17 baseband codec.
//!
//! [`coder::Coder`] turns payload bytes into 4800 Sym/s baseband symbols;
//! [`decoder::Decoder`] recovers payload bytes and link metadata from a
//! received symbol stream. Cryptographic primitives stay behind the
//! [`crypto::CryptoProvider`] capability trait supplied by the host.

pub mod coder;
pub mod config;
pub mod crypto;
pub mod decoder;
pub mod error;
pub mod scrambler;

pub use m17phy::address::Address;
pub use m17phy::lsf::Lsf;
