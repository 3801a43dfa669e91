//! Link Information Channel: the per-stream-frame carrier of LSF fragments.
//!
//! Each stream frame carries five bytes of the LSF plus a counter byte,
//! Golay(24,12)-protected as four codewords making up the 96-bit frame prefix.

use log::debug;

use crate::golay;
use crate::lsf::Lsf;

/// Pull the 40-bit LSF slice for `counter` (0..5) plus the counter trailer.
pub fn extract(lsf: &Lsf, counter: u8) -> [u8; 6] {
    let idx = counter as usize * 5;
    let mut out = [0u8; 6];
    out[0..5].copy_from_slice(&lsf.0[idx..idx + 5]);
    out[5] = counter << 5;
    out
}

/// Golay-encode a 48-bit LICH chunk into 96 bits, packed.
pub fn encode(lich: &[u8; 6]) -> [u8; 12] {
    let to_encode = [
        ((lich[0] as u16) << 4) | ((lich[1] as u16) >> 4),
        ((lich[1] as u16 & 0x000F) << 8) | lich[2] as u16,
        ((lich[3] as u16) << 4) | ((lich[4] as u16) >> 4),
        ((lich[4] as u16 & 0x000F) << 8) | lich[5] as u16,
    ];
    let mut out = [0u8; 12];
    for (value, chunk) in to_encode.into_iter().zip(out.chunks_mut(3)) {
        let encoded = golay::encode(value).to_be_bytes();
        chunk.copy_from_slice(&encoded[1..4]);
    }
    out
}

/// Soft decode 96 soft bits back into the LICH counter and LSF slice.
///
/// Any unrecoverable codeword invalidates the whole slice, so the caller's
/// reassembly bitmap is only advanced by clean chunks.
pub fn soft_decode(soft_bits: &[u16]) -> Option<(u8, [u8; 5])> {
    debug_assert!(soft_bits.len() >= 96);
    let mut decoded = 0u64;
    for i in 0..4 {
        let codeword: &[u16; 24] = soft_bits[i * 24..(i + 1) * 24].try_into().unwrap();
        let Some(value) = golay::soft_decode(codeword) else {
            debug!("LICH codeword {i} is beyond repair, dropping the slice");
            return None;
        };
        decoded |= (value as u64) << ((3 - i) * 12);
    }
    let b = decoded.to_be_bytes();
    Some((b[7] >> 5, [b[2], b[3], b[4], b[5], b[6]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soft;

    #[test]
    fn encode_reference_vector() {
        let input = [221, 81, 5, 5, 0, 2 << 5];
        let expected = [221, 82, 162, 16, 85, 200, 5, 14, 254, 4, 13, 153];
        assert_eq!(encode(&input), expected);
    }

    fn to_soft(encoded: &[u8; 12]) -> [u16; 96] {
        let mut out = [0u16; 96];
        for i in 0..96 {
            out[i] = if (encoded[i / 8] >> (7 - (i % 8))) & 1 != 0 {
                0xFFFF
            } else {
                0x0000
            };
        }
        out
    }

    #[test]
    fn decode_reference_vector() {
        let encoded = [221, 82, 162, 16, 85, 200, 5, 14, 254, 4, 13, 153];
        assert_eq!(soft_decode(&to_soft(&encoded)), Some((2, [221, 81, 5, 5, 0])));
    }

    #[test]
    fn round_trip_all_counters() {
        let part = [1, 255, 0, 90, 10];
        for counter in 0..6u8 {
            let mut chunk = [0u8; 6];
            chunk[0..5].copy_from_slice(&part);
            chunk[5] = counter << 5;
            let encoded = encode(&chunk);
            assert_eq!(soft_decode(&to_soft(&encoded)), Some((counter, part)));
        }
    }

    #[test]
    fn bit_errors_within_golay_budget() {
        let chunk = [0xAB, 0xCD, 0xEF, 0x12, 0x34, 3 << 5];
        let encoded = encode(&chunk);
        let mut soft_bits = to_soft(&encoded);
        // two errors in the first codeword, three in the last
        soft_bits[0] = soft::invert(soft_bits[0]);
        soft_bits[13] = soft::invert(soft_bits[13]);
        soft_bits[72] = soft::invert(soft_bits[72]);
        soft_bits[80] = soft::invert(soft_bits[80]);
        soft_bits[95] = soft::invert(soft_bits[95]);
        assert_eq!(
            soft_decode(&soft_bits),
            Some((3, [0xAB, 0xCD, 0xEF, 0x12, 0x34]))
        );
    }

    #[test]
    fn extract_covers_the_whole_lsf() {
        use crate::address::Address;
        use crate::lsf::{type_can, TYPE_STREAM, TYPE_VOICE};
        let lsf = Lsf::new(
            &Address::Broadcast,
            &Address::Broadcast,
            TYPE_STREAM | TYPE_VOICE | type_can(0),
            &[7u8; 14],
        );
        let mut rebuilt = [0u8; 30];
        for counter in 0..6u8 {
            let chunk = extract(&lsf, counter);
            assert_eq!(chunk[5] >> 5, counter);
            rebuilt[counter as usize * 5..counter as usize * 5 + 5].copy_from_slice(&chunk[0..5]);
        }
        assert_eq!(rebuilt, lsf.0);
    }
}
