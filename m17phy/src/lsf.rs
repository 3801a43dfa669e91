//! The Link Setup Frame: a 30-byte value type opening every transmission.
//!
//! Layout: DST (6), SRC (6), TYPE (2, big-endian), META (14), CRC (2).
//! Every setter refreshes the CRC so a frame is always consistent.

use crate::address::{decode_address, encode_address, Address};
use crate::crc::m17_crc;

pub const TYPE_PACKET: u16 = 0x0000;
pub const TYPE_STREAM: u16 = 0x0001;
pub const TYPE_DATA: u16 = 1 << 1;
pub const TYPE_VOICE: u16 = 2 << 1;
pub const TYPE_VOICE_DATA: u16 = 3 << 1;
pub const TYPE_ENCR_NONE: u16 = 0 << 3;
pub const TYPE_ENCR_SCRAM: u16 = 1 << 3;
pub const TYPE_ENCR_AES: u16 = 2 << 3;
pub const TYPE_ENCR_OTHER: u16 = 3 << 3;
// the subtype field selects the META layout when encryption is off
pub const TYPE_META_TEXT: u16 = 0 << 5;
pub const TYPE_META_POSITION: u16 = 1 << 5;
pub const TYPE_META_EXT_CALL: u16 = 2 << 5;
pub const TYPE_SCRAM_8: u16 = 0 << 5;
pub const TYPE_SCRAM_16: u16 = 1 << 5;
pub const TYPE_SCRAM_24: u16 = 2 << 5;
pub const TYPE_AES128: u16 = 0 << 5;
pub const TYPE_AES192: u16 = 1 << 5;
pub const TYPE_AES256: u16 = 2 << 5;
pub const TYPE_SIGNED: u16 = 1 << 11;

/// Shift a Channel Access Number into its TYPE field position.
pub const fn type_can(can: u8) -> u16 {
    ((can & 0x0F) as u16) << 7
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Packet,
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Reserved,
    Data,
    Voice,
    VoiceAndData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    None,
    Scrambler,
    Aes,
    Other,
}

/// GNSS position META payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub data_source: u8,
    pub station_type: u8,
    /// Degrees, south negative.
    pub latitude: f32,
    /// Degrees, west negative.
    pub longitude: f32,
    /// Altitude-valid and speed/bearing-valid flags; hemisphere bits are
    /// derived from the coordinate signs.
    pub flags: u8,
    /// Feet, stored with a +1500 offset.
    pub altitude: i32,
    /// Degrees.
    pub bearing: u16,
    /// Miles per hour.
    pub speed: u8,
}

pub const META_LAT_SOUTH: u8 = 1 << 0;
pub const META_LON_WEST: u8 = 1 << 1;
pub const META_ALT_VALID: u8 = 1 << 2;
pub const META_SPD_BEARING_VALID: u8 = 1 << 3;

/// Seconds between the Unix epoch and the 2020 epoch used by META nonces.
pub const NONCE_EPOCH_OFFSET: u64 = 1_577_836_800;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lsf(pub [u8; 30]);

impl Lsf {
    pub fn new(destination: &Address, source: &Address, type_field: u16, meta: &[u8; 14]) -> Self {
        let mut lsf = Lsf([0u8; 30]);
        lsf.0[0..6].copy_from_slice(&encode_address(destination));
        lsf.0[6..12].copy_from_slice(&encode_address(source));
        lsf.set_type_field(type_field);
        lsf.0[14..28].copy_from_slice(meta);
        lsf.update_crc();
        lsf
    }

    pub fn destination(&self) -> Address {
        decode_address(self.0[0..6].try_into().unwrap())
    }

    pub fn source(&self) -> Address {
        decode_address(self.0[6..12].try_into().unwrap())
    }

    pub fn raw_destination(&self) -> [u8; 6] {
        self.0[0..6].try_into().unwrap()
    }

    pub fn raw_source(&self) -> [u8; 6] {
        self.0[6..12].try_into().unwrap()
    }

    pub fn type_field(&self) -> u16 {
        u16::from_be_bytes([self.0[12], self.0[13]])
    }

    pub fn set_type_field(&mut self, value: u16) {
        self.0[12..14].copy_from_slice(&value.to_be_bytes());
        self.update_crc();
    }

    pub fn mode(&self) -> Mode {
        if self.type_field() & TYPE_STREAM != 0 {
            Mode::Stream
        } else {
            Mode::Packet
        }
    }

    pub fn data_type(&self) -> DataType {
        match (self.type_field() >> 1) & 0x03 {
            0b01 => DataType::Data,
            0b10 => DataType::Voice,
            0b11 => DataType::VoiceAndData,
            _ => DataType::Reserved,
        }
    }

    pub fn encryption_type(&self) -> EncryptionType {
        match (self.type_field() >> 3) & 0x03 {
            0b00 => EncryptionType::None,
            0b01 => EncryptionType::Scrambler,
            0b10 => EncryptionType::Aes,
            _ => EncryptionType::Other,
        }
    }

    /// AES key size, scrambler width or META layout depending on the family.
    pub fn encryption_subtype(&self) -> u8 {
        ((self.type_field() >> 5) & 0x03) as u8
    }

    pub fn channel_access_number(&self) -> u8 {
        ((self.type_field() >> 7) & 0x0F) as u8
    }

    pub fn signed_stream(&self) -> bool {
        self.type_field() & TYPE_SIGNED != 0
    }

    /// True when the TYPE bits decode to a defined combination: a receiver
    /// only treats such an LSF as valid.
    pub fn type_is_defined(&self) -> bool {
        self.data_type() != DataType::Reserved && self.encryption_type() != EncryptionType::Other
    }

    pub fn meta(&self) -> [u8; 14] {
        self.0[14..28].try_into().unwrap()
    }

    pub fn set_meta(&mut self, meta: &[u8; 14]) {
        self.0[14..28].copy_from_slice(meta);
        self.update_crc();
    }

    /// Raw bytes, left aligned and zero padded. Panics if longer than 14.
    pub fn set_meta_text(&mut self, text: &[u8]) {
        let mut meta = [0u8; 14];
        meta[..text.len()].copy_from_slice(text);
        self.set_meta(&meta);
    }

    pub fn set_meta_position(&mut self, position: &Position) {
        let mut meta = [0u8; 14];
        meta[0] = position.data_source;
        meta[1] = position.station_type;

        let alat = if position.latitude < 0.0 {
            -position.latitude
        } else {
            position.latitude
        };
        meta[2] = alat as u8;
        let frac = ((alat - meta[2] as f32) * 65536.0) as u16;
        meta[3..5].copy_from_slice(&frac.to_be_bytes());

        let alon = if position.longitude < 0.0 {
            -position.longitude
        } else {
            position.longitude
        };
        meta[5] = alon as u8;
        let frac = ((alon - meta[5] as f32) * 65536.0) as u16;
        meta[6..8].copy_from_slice(&frac.to_be_bytes());

        meta[8] = position.flags;
        if position.latitude < 0.0 {
            meta[8] |= META_LAT_SOUTH;
        }
        if position.longitude < 0.0 {
            meta[8] |= META_LON_WEST;
        }

        let alt = if position.altitude <= -1500 {
            0
        } else if position.altitude >= 0x10000 - 1500 {
            0xFFFF
        } else {
            (position.altitude + 1500) as u16
        };
        meta[9..11].copy_from_slice(&alt.to_be_bytes());
        meta[11..13].copy_from_slice(&position.bearing.to_be_bytes());
        meta[13] = position.speed;

        self.set_meta(&meta);
    }

    pub fn set_meta_extended_callsign(&mut self, cf1: &Address, cf2: &Address) {
        let mut meta = [0u8; 14];
        meta[0..6].copy_from_slice(&encode_address(cf1));
        meta[6..12].copy_from_slice(&encode_address(cf2));
        self.set_meta(&meta);
    }

    /// Nonce layout: 4-byte big-endian timestamp on the 2020 epoch, then 10
    /// random bytes supplied by the caller.
    pub fn set_meta_nonce(&mut self, unix_timestamp: u64, random: &[u8; 10]) {
        let mut meta = [0u8; 14];
        let ts = unix_timestamp.saturating_sub(NONCE_EPOCH_OFFSET) as u32;
        meta[0..4].copy_from_slice(&ts.to_be_bytes());
        meta[4..14].copy_from_slice(random);
        self.set_meta(&meta);
    }

    /// Decode the position META payload; requires a valid CRC.
    pub fn meta_position(&self) -> Option<Position> {
        if !self.check_crc() {
            return None;
        }
        let meta = self.meta();
        let flags = meta[8];

        let mut latitude =
            meta[2] as f32 + u16::from_be_bytes([meta[3], meta[4]]) as f32 / 65536.0;
        if flags & META_LAT_SOUTH != 0 {
            latitude = -latitude;
        }
        let mut longitude =
            meta[5] as f32 + u16::from_be_bytes([meta[6], meta[7]]) as f32 / 65536.0;
        if flags & META_LON_WEST != 0 {
            longitude = -longitude;
        }

        Some(Position {
            data_source: meta[0],
            station_type: meta[1],
            latitude,
            longitude,
            flags,
            altitude: u16::from_be_bytes([meta[9], meta[10]]) as i32 - 1500,
            bearing: u16::from_be_bytes([meta[11], meta[12]]),
            speed: meta[13],
        })
    }

    /// The CRC as stored in the frame.
    pub fn crc(&self) -> u16 {
        u16::from_be_bytes([self.0[28], self.0[29]])
    }

    /// True when the stored CRC matches the first 28 bytes.
    pub fn check_crc(&self) -> bool {
        m17_crc(&self.0) == 0
    }

    pub fn update_crc(&mut self) {
        let crc = m17_crc(&self.0[0..28]);
        self.0[28..30].copy_from_slice(&crc.to_be_bytes());
    }
}
