/// The M17 CRC-16: polynomial 0x5935, initial value 0xFFFF, no reflection,
/// no final XOR. Distinct from any of the CRC-16 catalogue entries.
pub const M17_ALG: crc::Algorithm<u16> = crc::Algorithm {
    width: 16,
    poly: 0x5935,
    init: 0xFFFF,
    refin: false,
    refout: false,
    xorout: 0x0000,
    check: 0x772B,
    residue: 0x0000,
};

pub fn m17_crc(input: &[u8]) -> u16 {
    let crc = crc::Crc::<u16>::new(&M17_ALG);
    let mut digest = crc.digest();
    digest.update(input);
    digest.finalize()
}

/// True when `input` ends in its own CRC: the CRC over data-plus-checksum is 0.
pub fn m17_crc_ok(input: &[u8]) -> bool {
    m17_crc(input) == 0
}
