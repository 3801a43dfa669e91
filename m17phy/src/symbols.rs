//! The 4-ary symbol alphabet, syncwords and the soft symbol slicer.

/// Symbols per syncword.
pub const SYM_PER_SWD: usize = 8;
/// Symbols per frame payload, after the syncword.
pub const SYM_PER_PLD: usize = 184;
/// Symbols per whole 40 ms frame.
pub const SYM_PER_FRA: usize = 192;

pub const SYNC_LSF: u16 = 0x55F7;
pub const SYNC_STR: u16 = 0xFF5D;
pub const SYNC_PKT: u16 = 0x75FF;
pub const SYNC_BER: u16 = 0xDF55;
/// The EOT marker is this syncword repeated for a whole frame.
pub const EOT_MRKR: u16 = 0x555D;

/// Transmit map, indexed by dibit value: 00 -> +1, 01 -> +3, 10 -> -1, 11 -> -3.
pub const SYMBOL_MAP: [i8; 4] = [1, 3, -1, -3];
/// The alphabet in ascending order.
pub const SYMBOL_LIST: [i8; 4] = [-3, -1, 1, 3];

/// Hard symbol patterns the receiver correlates against.
pub const LSF_SYNC_SYMBOLS: [i8; 8] = [3, 3, 3, 3, -3, -3, 3, -3];
pub const STR_SYNC_SYMBOLS: [i8; 8] = [-3, -3, -3, -3, 3, 3, -3, 3];
pub const PKT_SYNC_SYMBOLS: [i8; 8] = [3, -3, 3, 3, -3, -3, -3, -3];
pub const EOT_SYMBOLS: [i8; 8] = [3, 3, 3, 3, 3, 3, -3, 3];

/// Squared Euclidean distance between a received window and a hard symbol pattern.
pub fn sym_distance(window: &[f32], target: &[i8]) -> f32 {
    let mut sum = 0.0f32;
    for (w, t) in window.iter().zip(target.iter()) {
        let diff = w - *t as f32;
        sum += diff * diff;
    }
    sum
}

/// Slice soft symbols into soft dibits, two soft bits per symbol, MSB first.
///
/// Piecewise linear with breakpoints at the decision thresholds -2, 0, +2:
/// a clean +3 slices to (0x0000, 0xFFFF), +1 to (0x0000, 0x0000), -1 to
/// (0xFFFF, 0x0000) and -3 to (0xFFFF, 0xFFFF). A symbol landing exactly on
/// a threshold produces an erasure in the affected bit.
pub fn slice_symbols(out: &mut [u16], symbols: &[f32]) {
    for (i, s) in symbols.iter().enumerate() {
        let s = *s;

        // MSB: sign of the symbol, transition across 0
        out[i * 2] = if s >= 1.0 {
            0x0000
        } else if s >= -1.0 {
            ((1.0 - s) / 2.0 * 65535.0) as u16
        } else {
            0xFFFF
        };

        // LSB: magnitude, transitions across -2 and +2
        out[i * 2 + 1] = if s >= 3.0 {
            0xFFFF
        } else if s >= 1.0 {
            ((s - 1.0) / 2.0 * 65535.0) as u16
        } else if s >= -1.0 {
            0x0000
        } else if s >= -3.0 {
            ((-s - 1.0) / 2.0 * 65535.0) as u16
        } else {
            0xFFFF
        };
    }
}

/// Convert a symbol frame to the compact signed-8-bit transport representation.
///
/// All generated symbols are integral so the conversion is lossless; both
/// representations recover identical payloads.
pub fn to_i8(symbols: &[f32], out: &mut [i8]) {
    for (s, o) in symbols.iter().zip(out.iter_mut()) {
        *o = *s as i8;
    }
}

/// Widen signed-8-bit symbols back to the real-valued representation.
pub fn from_i8(symbols: &[i8], out: &mut [f32]) {
    for (s, o) in symbols.iter().zip(out.iter_mut()) {
        *o = *s as f32;
    }
}
