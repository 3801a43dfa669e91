use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("given callsign contains at least one character invalid in M17: {0}")]
    InvalidCallsignCharacters(char),

    #[error("given callsign is {0} characters long; maximum is 9")]
    CallsignTooLong(usize),

    #[error("channel access number {0} is out of range 0..=15")]
    CanOutOfRange(u8),

    #[error("provided META payload is {0} bytes long; the field holds 14")]
    MetaTooLong(usize),

    #[error("AES encryption selected but no IV was provided")]
    MissingIv,

    #[error("scrambler encryption selected but no seed was provided")]
    MissingSeed,

    #[error("scrambler seed 0x{0:06X} does not fit the selected LFSR width")]
    SeedTooWide(u32),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CryptoError {
    #[error("no signing key is available")]
    NoSigningKey,

    #[error("the crypto backend failed to produce a signature")]
    SigningFailed,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TxError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(
        "provided packet payload is too large: provided {provided} bytes, capacity {capacity}"
    )]
    PacketTooLarge { provided: usize, capacity: usize },
}
