//! Rate-1/2, K=5 convolutional encoders with puncturing.
//!
//! Generators G1 = x^4 + x + 1 and G2 = x^4 + x^3 + x^2 + 1. The input is
//! zero-prepended and zero-flushed with four bits, forcing the encoder
//! through state 0 at both ends. The puncture pattern index runs round-robin
//! over the serialized G1/G2 output stream.

use crate::bits::unpack_bits;
use crate::lsf::Lsf;
use crate::symbols::SYM_PER_PLD;

/// P1, density 46/61, for the LSF.
pub static PUNCTURE_LSF: [u8; 61] = [
    1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, //
    1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, //
    1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, //
    1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1,
];

/// P2, density 11/12, for stream and BERT frames.
pub static PUNCTURE_STREAM: [u8; 12] = [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0];

/// P3, density 7/8, for packet frames.
pub static PUNCTURE_PACKET: [u8; 8] = [1, 1, 1, 1, 1, 1, 1, 0];

/// Run the encoder over `steps` input bits of `ud` (which carries the 4-bit
/// zero prefix and flush tail) and write punctured output bits. Output beyond
/// `out.len()` is dropped, which only the BERT frame relies on.
fn encode_punctured(out: &mut [u8], ud: &[u8], steps: usize, pattern: &[u8]) -> usize {
    let mut p = 0;
    let mut pb = 0;
    for i in 0..steps {
        let g1 = (ud[i + 4] + ud[i + 1] + ud[i]) % 2;
        let g2 = (ud[i + 4] + ud[i + 3] + ud[i + 2] + ud[i]) % 2;

        if pattern[p] != 0 {
            if pb < out.len() {
                out[pb] = g1;
            }
            pb += 1;
        }
        p = (p + 1) % pattern.len();

        if pattern[p] != 0 {
            if pb < out.len() {
                out[pb] = g2;
            }
            pb += 1;
        }
        p = (p + 1) % pattern.len();
    }
    pb
}

/// Encode a whole LSF into 368 unpacked type-3 bits.
pub fn encode_lsf(lsf: &Lsf) -> [u8; SYM_PER_PLD * 2] {
    let mut ud = [0u8; 4 + 240 + 4];
    unpack_bits(&lsf.0, &mut ud[4..244]);

    let mut out = [0u8; SYM_PER_PLD * 2];
    let pushed = encode_punctured(&mut out, &ud, 244, &PUNCTURE_LSF);
    debug_assert_eq!(pushed, 368);
    out
}

/// Encode a 16-byte stream payload plus frame number into 272 type-3 bits.
///
/// The remaining 96 bits of the frame are the Golay-coded LICH, which is not
/// convolutionally coded.
pub fn encode_stream(data: &[u8; 16], frame_number: u16) -> [u8; 272] {
    let mut ud = [0u8; 4 + 144 + 4];
    unpack_bits(&frame_number.to_be_bytes(), &mut ud[4..20]);
    unpack_bits(data, &mut ud[20..148]);

    let mut out = [0u8; 272];
    let pushed = encode_punctured(&mut out, &ud, 148, &PUNCTURE_STREAM);
    debug_assert_eq!(pushed, 272);
    out
}

/// Encode a packet frame: 25 payload bytes and the control byte, 206 type-1
/// bits in total (the control byte's two lowest bits are never sent).
pub fn encode_packet(data: &[u8; 26]) -> [u8; SYM_PER_PLD * 2] {
    let mut ud = [0u8; 4 + 206 + 4];
    unpack_bits(data, &mut ud[4..210]);

    let mut out = [0u8; SYM_PER_PLD * 2];
    let pushed = encode_punctured(&mut out, &ud, 210, &PUNCTURE_PACKET);
    debug_assert_eq!(pushed, 368);
    out
}

/// Encode a BERT frame of 197 reference bits packed into 25 bytes.
///
/// Puncturing 201 steps with P2 yields 369 bits; the last one does not fit
/// the frame and is dropped, and the receiver treats it as an erasure.
pub fn encode_bert(data: &[u8; 25]) -> [u8; SYM_PER_PLD * 2] {
    let mut ud = [0u8; 4 + 197 + 4];
    unpack_bits(data, &mut ud[4..201]);

    let mut out = [0u8; SYM_PER_PLD * 2];
    let pushed = encode_punctured(&mut out, &ud, 201, &PUNCTURE_STREAM);
    debug_assert_eq!(pushed, 369);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::lsf::{type_can, Lsf, TYPE_STREAM, TYPE_VOICE};

    #[test]
    fn pattern_densities() {
        assert_eq!(PUNCTURE_LSF.iter().filter(|b| **b != 0).count(), 46);
        assert_eq!(PUNCTURE_STREAM.iter().filter(|b| **b != 0).count(), 11);
        assert_eq!(PUNCTURE_PACKET.iter().filter(|b| **b != 0).count(), 7);
    }

    #[test]
    fn zero_input_encodes_to_zero() {
        // with all-zero input the encoder never leaves state 0
        let out = encode_stream(&[0u8; 16], 0);
        assert!(out.iter().all(|b| *b == 0));
    }

    #[test]
    fn output_lengths() {
        let lsf = Lsf::new(
            &Address::Broadcast,
            &Address::Broadcast,
            TYPE_STREAM | TYPE_VOICE | type_can(0),
            &[0u8; 14],
        );
        // the debug asserts inside each encoder check the pushed-bit counts
        let _ = encode_lsf(&lsf);
        let _ = encode_stream(&[0xFFu8; 16], 0x1234);
        let _ = encode_packet(&[0xA5u8; 26]);
        let _ = encode_bert(&[0x5Au8; 25]);
    }
}
