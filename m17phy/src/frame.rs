//! Frame assembly and the inverse payload decoders.
//!
//! A frame is 192 symbols: an 8-symbol syncword and 184 payload symbols.
//! Assembly is channel code -> interleave -> randomize -> symbol map; the
//! decoders run slice -> derandomize -> de-interleave -> Viterbi and report
//! the error metric alongside the recovered fields.

use log::debug;

use crate::bits::unpack_bits;
use crate::convol;
use crate::interleave::{reorder_bits, reorder_soft_bits};
use crate::lich;
use crate::lsf::Lsf;
use crate::randomize::{randomize_bits, randomize_soft_bits};
use crate::symbols::{
    slice_symbols, SYMBOL_MAP, SYM_PER_FRA, SYM_PER_PLD, EOT_SYMBOLS, SYNC_BER, SYNC_LSF,
    SYNC_PKT, SYNC_STR,
};
use crate::viterbi::Viterbi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreambleKind {
    /// Precedes an LSF: +3, -3, repeating.
    Lsf,
    /// Precedes a BERT transmission: -3, +3, repeating.
    Bert,
}

/// One whole frame of alternating outermost symbols to charge the receiver's
/// timing recovery.
pub fn gen_preamble(kind: PreambleKind) -> [f32; SYM_PER_FRA] {
    let (first, second) = match kind {
        PreambleKind::Lsf => (3.0, -3.0),
        PreambleKind::Bert => (-3.0, 3.0),
    };
    let mut out = [first; SYM_PER_FRA];
    for s in out.iter_mut().skip(1).step_by(2) {
        *s = second;
    }
    out
}

/// Map a 16-bit syncword to its 8 symbols, dibits MSB first.
pub fn gen_syncword(syncword: u16) -> [f32; 8] {
    let mut out = [0f32; 8];
    for (i, s) in out.iter_mut().enumerate() {
        *s = SYMBOL_MAP[((syncword >> (14 - i * 2)) & 3) as usize] as f32;
    }
    out
}

/// The End Of Transmission marker: the EOT syncword repeated for a whole frame.
pub fn gen_eot() -> [f32; SYM_PER_FRA] {
    let mut out = [0f32; SYM_PER_FRA];
    for (i, s) in out.iter_mut().enumerate() {
        *s = EOT_SYMBOLS[i % 8] as f32;
    }
    out
}

fn assemble(syncword: u16, enc_bits: &[u8; SYM_PER_PLD * 2]) -> [f32; SYM_PER_FRA] {
    let mut rf_bits = reorder_bits(enc_bits);
    randomize_bits(&mut rf_bits);

    let mut out = [0f32; SYM_PER_FRA];
    out[0..8].copy_from_slice(&gen_syncword(syncword));
    for i in 0..SYM_PER_PLD {
        out[8 + i] = SYMBOL_MAP[(rf_bits[2 * i] * 2 + rf_bits[2 * i + 1]) as usize] as f32;
    }
    out
}

pub fn gen_lsf_frame(lsf: &Lsf) -> [f32; SYM_PER_FRA] {
    assemble(SYNC_LSF, &convol::encode_lsf(lsf))
}

/// A stream frame: Golay-coded LICH prefix, then the punctured convolutional
/// coding of frame number and payload. The frame number's MSB is the EOT bit.
pub fn gen_stream_frame(
    lsf: &Lsf,
    data: &[u8; 16],
    lich_cnt: u8,
    frame_number: u16,
) -> [f32; SYM_PER_FRA] {
    let lich_encoded = lich::encode(&lich::extract(lsf, lich_cnt));

    let mut enc_bits = [0u8; SYM_PER_PLD * 2];
    unpack_bits(&lich_encoded, &mut enc_bits[0..96]);
    enc_bits[96..368].copy_from_slice(&convol::encode_stream(data, frame_number));
    assemble(SYNC_STR, &enc_bits)
}

/// A packet frame: 25 payload bytes and the EOF/counter control byte.
pub fn gen_packet_frame(data: &[u8; 26]) -> [f32; SYM_PER_FRA] {
    assemble(SYNC_PKT, &convol::encode_packet(data))
}

/// A BERT frame: 197 reference bits.
pub fn gen_bert_frame(data: &[u8; 25]) -> [f32; SYM_PER_FRA] {
    assemble(SYNC_BER, &convol::encode_bert(data))
}

/// Slice, derandomize and de-interleave one captured payload.
fn payload_soft_bits(pld: &[f32; SYM_PER_PLD]) -> [u16; SYM_PER_PLD * 2] {
    let mut soft_bits = [0u16; SYM_PER_PLD * 2];
    slice_symbols(&mut soft_bits, pld);
    randomize_soft_bits(&mut soft_bits);
    reorder_soft_bits(&soft_bits)
}

/// Decode a captured LSF payload. Acting on a failed CRC is the caller's
/// concern.
pub fn decode_lsf_frame(viterbi: &mut Viterbi, pld: &[f32; SYM_PER_PLD]) -> (Lsf, u32) {
    let soft_bits = payload_soft_bits(pld);
    let mut raw = [0u8; 31];
    let metric = viterbi.decode_punctured(&mut raw, &soft_bits, &convol::PUNCTURE_LSF);
    let lsf = Lsf(raw[1..31].try_into().unwrap());
    debug!(
        "lsf type {:04X}, crc {}, metric {metric}",
        lsf.type_field(),
        if lsf.check_crc() { "ok" } else { "bad" }
    );
    (lsf, metric)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPayload {
    /// Frame number as transmitted; the MSB is the EOT bit.
    pub raw_frame_number: u16,
    pub data: [u8; 16],
    /// Decoded LICH counter and LSF slice; `None` when Golay gave up.
    pub lich: Option<(u8, [u8; 5])>,
}

impl StreamPayload {
    pub fn frame_number(&self) -> u16 {
        self.raw_frame_number & 0x7FFF
    }

    pub fn end_of_stream(&self) -> bool {
        self.raw_frame_number & 0x8000 != 0
    }
}

pub fn decode_stream_frame(viterbi: &mut Viterbi, pld: &[f32; SYM_PER_PLD]) -> (StreamPayload, u32) {
    let soft_bits = payload_soft_bits(pld);

    let lich = lich::soft_decode(&soft_bits[0..96]);

    let mut raw = [0u8; 19];
    let metric = viterbi.decode_punctured(&mut raw, &soft_bits[96..368], &convol::PUNCTURE_STREAM);
    let raw_frame_number = u16::from_be_bytes([raw[1], raw[2]]);
    debug!("stream frame number {raw_frame_number:04X}, metric {metric}");
    (
        StreamPayload {
            raw_frame_number,
            data: raw[3..19].try_into().unwrap(),
            lich,
        },
        metric,
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketPayload {
    pub data: [u8; 25],
    /// End-of-packet flag from the control byte.
    pub final_frame: bool,
    /// Frame index, or the byte count of the final frame.
    pub counter: u8,
}

pub fn decode_packet_frame(viterbi: &mut Viterbi, pld: &[f32; SYM_PER_PLD]) -> (PacketPayload, u32) {
    let soft_bits = payload_soft_bits(pld);
    let mut raw = [0u8; 27];
    let metric = viterbi.decode_punctured(&mut raw, &soft_bits, &convol::PUNCTURE_PACKET);
    (
        PacketPayload {
            data: raw[1..26].try_into().unwrap(),
            final_frame: raw[26] & 0x80 != 0,
            counter: (raw[26] >> 2) & 0x1F,
        },
        metric,
    )
}
