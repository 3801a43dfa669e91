//! Construction-time configuration for the coder and decoder.

use m17phy::address::{Address, Callsign, ALPHABET};
use m17phy::lsf::{
    self, DataType, EncryptionType, Lsf, Mode, TYPE_ENCR_AES, TYPE_ENCR_SCRAM, TYPE_SIGNED,
};

use crate::error::ConfigError;
use crate::scrambler::ScramblerWidth;

/// Parse a callsign string into an address.
///
/// Accepts up to 9 characters from the M17 alphabet, the `@ALL` broadcast
/// address and `#`-prefixed hash addresses. Rejects anything longer or
/// containing characters outside the alphabet.
pub fn address_from_callsign(callsign: &str) -> Result<Address, ConfigError> {
    let trimmed = callsign.trim().to_uppercase();
    if trimmed == "@ALL" {
        return Ok(Address::Broadcast);
    }
    let (hashed, body) = match trimmed.strip_prefix('#') {
        Some(rest) => (true, rest),
        None => (false, trimmed.as_str()),
    };
    if body.len() > 9 {
        return Err(ConfigError::CallsignTooLong(body.len()));
    }
    let mut address = [b' '; 9];
    for (i, c) in body.chars().enumerate() {
        if !c.is_ascii() || !ALPHABET.contains(&(c as u8)) {
            return Err(ConfigError::InvalidCallsignCharacters(c));
        }
        address[i] = c as u8;
    }
    let callsign = Callsign(address);
    Ok(if hashed {
        Address::Hashed(callsign)
    } else {
        Address::Callsign(callsign)
    })
}

#[derive(Clone)]
pub struct CoderConfig {
    pub(crate) destination: Address,
    pub(crate) source: Address,
    pub(crate) mode: Mode,
    pub(crate) data_type: DataType,
    pub(crate) encryption: EncryptionType,
    /// META layout when unencrypted, key size when AES, LFSR width when
    /// scrambler.
    pub(crate) encryption_subtype: u8,
    pub(crate) can: u8,
    pub(crate) meta: [u8; 14],
    pub(crate) aes_iv: Option<[u8; 14]>,
    pub(crate) scrambler_seed: Option<u32>,
    pub(crate) signed_stream: bool,
}

impl CoderConfig {
    /// A voice stream with no encryption on channel access number 0.
    pub fn new(src_id: &str, dst_id: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            destination: address_from_callsign(dst_id)?,
            source: address_from_callsign(src_id)?,
            mode: Mode::Stream,
            data_type: DataType::Voice,
            encryption: EncryptionType::None,
            encryption_subtype: 0,
            can: 0,
            meta: [0u8; 14],
            aes_iv: None,
            scrambler_seed: None,
            signed_stream: false,
        })
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
    }

    pub fn set_can(&mut self, can: u8) -> Result<(), ConfigError> {
        if can > 15 {
            return Err(ConfigError::CanOutOfRange(can));
        }
        self.can = can;
        Ok(())
    }

    /// Free-form META text, left aligned and zero padded.
    pub fn set_meta_text(&mut self, meta: &str) -> Result<(), ConfigError> {
        if meta.len() > 14 {
            return Err(ConfigError::MetaTooLong(meta.len()));
        }
        self.meta = [0u8; 14];
        self.meta[..meta.len()].copy_from_slice(meta.as_bytes());
        Ok(())
    }

    pub fn set_meta_raw(&mut self, meta: [u8; 14]) {
        self.meta = meta;
    }

    /// Select AES payload encryption. The subtype picks the key size; the IV
    /// is supplied by the host's entropy source and its first 14 bytes ride
    /// in the LSF META field.
    pub fn set_aes(&mut self, subtype: u8, iv: [u8; 14]) {
        self.encryption = EncryptionType::Aes;
        self.encryption_subtype = subtype & 0x03;
        self.aes_iv = Some(iv);
    }

    /// Select scrambler payload encryption with the given LFSR width subtype.
    pub fn set_scrambler(&mut self, subtype: u8, seed: u32) -> Result<(), ConfigError> {
        let width = ScramblerWidth::from_subtype(subtype);
        if seed > width.mask() {
            return Err(ConfigError::SeedTooWide(seed));
        }
        self.encryption = EncryptionType::Scrambler;
        self.encryption_subtype = subtype & 0x03;
        self.scrambler_seed = Some(seed);
        Ok(())
    }

    pub fn set_signed(&mut self, signed_stream: bool) {
        self.signed_stream = signed_stream;
    }

    pub(crate) fn type_field(&self) -> u16 {
        let mode = match self.mode {
            Mode::Stream => lsf::TYPE_STREAM,
            Mode::Packet => lsf::TYPE_PACKET,
        };
        let data = match self.data_type {
            DataType::Reserved => 0,
            DataType::Data => lsf::TYPE_DATA,
            DataType::Voice => lsf::TYPE_VOICE,
            DataType::VoiceAndData => lsf::TYPE_VOICE_DATA,
        };
        let encr = match self.encryption {
            EncryptionType::None => lsf::TYPE_ENCR_NONE,
            EncryptionType::Scrambler => TYPE_ENCR_SCRAM,
            EncryptionType::Aes => TYPE_ENCR_AES,
            EncryptionType::Other => lsf::TYPE_ENCR_OTHER,
        };
        let signed = if self.signed_stream { TYPE_SIGNED } else { 0 };
        mode | data
            | encr
            | ((self.encryption_subtype & 0x03) as u16) << 5
            | lsf::type_can(self.can)
            | signed
    }

    pub(crate) fn build_lsf(&self) -> Lsf {
        let meta = match (self.encryption, self.aes_iv.as_ref()) {
            (EncryptionType::Aes, Some(iv)) => *iv,
            _ => self.meta,
        };
        Lsf::new(&self.destination, &self.source, self.type_field(), &meta)
    }
}

pub const DEFAULT_SYNCWORD_THRESHOLD: f32 = 0.9;
/// Permissive by default: a stream frame is only blanked once its error
/// metric says a large share of its bits were received wrong.
pub const DEFAULT_VITERBI_THRESHOLD: f32 = 100.0;

#[derive(Clone)]
pub struct DecoderConfig {
    /// Maximum squared Euclidean distance over the 8-symbol window to
    /// declare syncword lock.
    pub syncword_threshold: f32,
    /// Maximum Viterbi error metric, as a multiple of 0xFFFF, before a
    /// stream payload is blanked to suppress codec artifacts.
    pub viterbi_threshold: f32,
    /// Log decoded callsigns as ASCII rather than raw hex.
    pub callsign_display: bool,
    pub debug_data: bool,
    pub debug_ctrl: bool,
    pub encryption: EncryptionType,
    pub encryption_subtype: u8,
    pub scrambler_seed: Option<u32>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            syncword_threshold: DEFAULT_SYNCWORD_THRESHOLD,
            viterbi_threshold: DEFAULT_VITERBI_THRESHOLD,
            callsign_display: true,
            debug_data: false,
            debug_ctrl: false,
            encryption: EncryptionType::None,
            encryption_subtype: 0,
            scrambler_seed: None,
        }
    }
}

impl DecoderConfig {
    pub fn set_scrambler(&mut self, subtype: u8, seed: u32) -> Result<(), ConfigError> {
        let width = ScramblerWidth::from_subtype(subtype);
        if seed > width.mask() {
            return Err(ConfigError::SeedTooWide(seed));
        }
        self.encryption = EncryptionType::Scrambler;
        self.encryption_subtype = subtype & 0x03;
        self.scrambler_seed = Some(seed);
        Ok(())
    }

    pub fn set_aes(&mut self, subtype: u8) {
        self.encryption = EncryptionType::Aes;
        self.encryption_subtype = subtype & 0x03;
    }
}
