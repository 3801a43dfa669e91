//! The receive pipeline: baseband symbols in, payload bytes and link
//! metadata out.
//!
//! The decoder hunts for a syncword over a sliding 8-symbol window, captures
//! the 184 payload symbols that follow, and dispatches on the frame kind.
//! Stream payloads are published to the byte output; link fields, SMS
//! packets and signature verdicts are queued as [`DecoderEvent`]s.

use std::collections::VecDeque;

use log::debug;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use m17phy::address::Address;
use m17phy::crc::m17_crc_ok;
use m17phy::frame::{decode_lsf_frame, decode_packet_frame, decode_stream_frame};
use m17phy::lsf::{EncryptionType, Lsf};
use m17phy::symbols::{
    from_i8, sym_distance, LSF_SYNC_SYMBOLS, PKT_SYNC_SYMBOLS, STR_SYNC_SYMBOLS, SYM_PER_PLD,
};
use m17phy::viterbi::Viterbi;

use crate::config::DecoderConfig;
use crate::crypto::CryptoProvider;
use crate::scrambler::{Scrambler, ScramblerWidth};

const SIGNATURE_START_FN: u16 = 0x7FFC;
/// Maximum reassembled packet: 33 frames of 25 bytes.
const PACKET_MAX: usize = 825;

/// Decoded link setup fields, published once per completed LSF.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkFields {
    pub destination: Address,
    pub source: Address,
    pub raw_destination: [u8; 6],
    pub raw_source: [u8; 6],
    pub type_field: [u8; 2],
    pub meta: [u8; 14],
    pub crc_ok: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecoderEvent {
    /// A complete LSF was received, directly or reassembled from LICH.
    Fields(LinkFields),
    /// A packet with the SMS type byte completed with a valid CRC.
    Sms { fields: LinkFields, text: Vec<u8> },
    /// A signed stream completed and its signature was checked.
    SignatureVerified(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Lsf,
    Stream,
    Packet,
}

pub struct Decoder<C: CryptoProvider> {
    config: DecoderConfig,
    crypto: C,

    // syncword hunt
    last: [f32; 8],
    synced: Option<FrameKind>,
    pld: [f32; SYM_PER_PLD],
    pushed: usize,
    viterbi: Viterbi,

    // link state
    lsf: Lsf,
    lich_received: u8,
    expected_next_fn: u16,
    digest: Option<Sha256>,
    signature: [u8; 64],

    // packet reassembly
    packet: [u8; PACKET_MAX],
    packet_count: usize,

    iv: [u8; 16],
    scrambler: Option<Scrambler>,

    events: VecDeque<DecoderEvent>,
}

impl<C: CryptoProvider> Decoder<C> {
    pub fn new(config: DecoderConfig, crypto: C) -> Self {
        let scrambler = config.scrambler_seed.map(|seed| {
            Scrambler::new(seed, ScramblerWidth::from_subtype(config.encryption_subtype))
        });
        Self {
            config,
            crypto,
            last: [0f32; 8],
            synced: None,
            pld: [0f32; SYM_PER_PLD],
            pushed: 0,
            viterbi: Viterbi::new(),
            lsf: Lsf([0u8; 30]),
            lich_received: 0,
            expected_next_fn: 0,
            digest: None,
            signature: [0u8; 64],
            packet: [0u8; PACKET_MAX],
            packet_count: 0,
            iv: [0u8; 16],
            scrambler,
            events: VecDeque::new(),
        }
    }

    /// Feed received soft symbols; recovered stream payloads are appended to
    /// `out` in 16-byte blocks.
    pub fn work(&mut self, input: &[f32], out: &mut Vec<u8>) {
        for sample in input {
            self.handle_symbol(*sample, out);
        }
    }

    /// The signed-8-bit transport representation, widened losslessly.
    pub fn work_i8(&mut self, input: &[i8], out: &mut Vec<u8>) {
        let mut widened = [0f32; 64];
        for chunk in input.chunks(widened.len()) {
            from_i8(chunk, &mut widened[..chunk.len()]);
            self.work(&widened[..chunk.len()], out);
        }
    }

    /// Next queued event, if any. Poll after each `work` call.
    pub fn next_event(&mut self) -> Option<DecoderEvent> {
        self.events.pop_front()
    }

    /// Host-initiated state reset: back to hunting with no link state.
    pub fn reset(&mut self) {
        self.last = [0f32; 8];
        self.synced = None;
        self.pushed = 0;
        self.lsf = Lsf([0u8; 30]);
        self.lich_received = 0;
        self.expected_next_fn = 0;
        self.digest = None;
        self.packet_count = 0;
        if let Some(scrambler) = self.scrambler.as_mut() {
            scrambler.reset();
        }
        self.events.clear();
    }

    fn handle_symbol(&mut self, sample: f32, out: &mut Vec<u8>) {
        if self.synced.is_none() {
            self.last.rotate_left(1);
            self.last[7] = sample;

            for (kind, target) in [
                (FrameKind::Stream, &STR_SYNC_SYMBOLS),
                (FrameKind::Lsf, &LSF_SYNC_SYMBOLS),
                (FrameKind::Packet, &PKT_SYNC_SYMBOLS),
            ] {
                if sym_distance(&self.last, target) < self.config.syncword_threshold {
                    self.synced = Some(kind);
                    self.pushed = 0;
                    break;
                }
            }
            return;
        }

        self.pld[self.pushed] = sample;
        self.pushed += 1;
        if self.pushed < SYM_PER_PLD {
            return;
        }

        let pld = self.pld;
        match self.synced.unwrap() {
            FrameKind::Stream => self.handle_stream(&pld, out),
            FrameKind::Lsf => self.handle_lsf(&pld),
            FrameKind::Packet => self.handle_packet(&pld),
        }

        // back to hunting with a clean correlation window
        self.synced = None;
        self.pushed = 0;
        self.last = [0f32; 8];
    }

    fn handle_stream(&mut self, pld: &[f32; SYM_PER_PLD], out: &mut Vec<u8>) {
        let (payload, e) = decode_stream_frame(&mut self.viterbi, pld);
        let raw_fn = payload.raw_frame_number;
        let frame_number = payload.frame_number();
        let signed_stream = self.lsf.signed_stream();
        let signature_frame = signed_stream && frame_number >= SIGNATURE_START_FN;
        let mut data = payload.data;

        if self.config.debug_data {
            debug!("rx stream fn={raw_fn:04X} e={:.1}", e as f32 / 65535.0);
        }

        // the signature itself is sent in the clear
        if !signature_frame {
            match self.config.encryption {
                EncryptionType::Aes => {
                    self.iv[0..14].copy_from_slice(&self.lsf.meta());
                    self.iv[14] = ((raw_fn >> 8) & 0x7F) as u8;
                    self.iv[15] = (raw_fn & 0xFF) as u8;
                    self.crypto.stream_crypt(&self.iv, &mut data);
                }
                EncryptionType::Scrambler => {
                    if let Some(scrambler) = self.scrambler.as_mut() {
                        if frame_number == 0 {
                            scrambler.reset();
                        } else if frame_number != self.expected_next_fn {
                            scrambler.resync(frame_number);
                        }
                        let keystream = scrambler.next_frame();
                        for (d, k) in data.iter_mut().zip(keystream.iter()) {
                            *d ^= k;
                        }
                    }
                }
                _ => {}
            }
        }

        // digest over the plaintext payload, matching the coder
        if signed_stream && frame_number < SIGNATURE_START_FN {
            if frame_number == 0 {
                self.digest = Some(Sha256::new());
            }
            self.digest.get_or_insert_with(Sha256::new).update(data);
        }

        if !signature_frame {
            // blank frames whose error metric says they are mostly noise
            if e as f32 / 65535.0 <= self.config.viterbi_threshold {
                out.extend_from_slice(&data);
            } else {
                out.extend_from_slice(&[0u8; 16]);
            }
        }

        // LICH reassembly; a frame skip or a new superframe restarts it
        let discontinuous =
            frame_number != self.expected_next_fn && frame_number < SIGNATURE_START_FN;
        if discontinuous {
            self.lich_received = 0;
        }
        if let Some((lich_cnt, lich_part)) = payload.lich {
            if lich_cnt == 0 {
                self.lich_received = 0;
            }
            if lich_cnt < 6 {
                let was_complete = self.lich_received == 0x3F;
                self.lich_received |= 1 << lich_cnt;
                let idx = lich_cnt as usize * 5;
                self.lsf.0[idx..idx + 5].copy_from_slice(&lich_part);
                if self.lich_received == 0x3F
                    && !was_complete
                    && self.lsf.check_crc()
                    && self.lsf.type_is_defined()
                {
                    self.publish_fields();
                }
            }
        }

        if signature_frame {
            let idx = (frame_number - SIGNATURE_START_FN) as usize * 16;
            self.signature[idx..idx + 16].copy_from_slice(&data);
            if raw_fn == 0xFFFF {
                let digest: [u8; 32] = self.digest.take().unwrap_or_default().finalize().into();
                let ok = self.crypto.verify(&digest, &self.signature);
                debug!("signature {}", if ok { "ok" } else { "invalid" });
                self.events.push_back(DecoderEvent::SignatureVerified(ok));
            }
        }

        self.expected_next_fn = (frame_number + 1) % 0x8000;
    }

    fn handle_lsf(&mut self, pld: &[f32; SYM_PER_PLD]) {
        let (lsf, e) = decode_lsf_frame(&mut self.viterbi, pld);
        if e as f32 / 65535.0 > self.config.viterbi_threshold {
            debug!("dropping LSF with metric {e}");
            return;
        }
        if !lsf.check_crc() || !lsf.type_is_defined() {
            debug!("dropping LSF with bad CRC or undefined TYPE");
            return;
        }
        if self.config.debug_ctrl {
            if self.config.callsign_display {
                debug!("LSF dst={} src={}", lsf.destination(), lsf.source());
            } else {
                debug!("LSF dst={:02X?} src={:02X?}", lsf.raw_destination(), lsf.raw_source());
            }
            debug!("type={:04X} e={:.1}", lsf.type_field(), e as f32 / 65535.0);
        }

        // a new LSF opens a new transmission
        self.lsf = lsf;
        self.lich_received = 0x3F;
        self.expected_next_fn = 0;
        self.digest = None;
        self.packet_count = 0;
        if let Some(scrambler) = self.scrambler.as_mut() {
            scrambler.reset();
        }
        self.publish_fields();
    }

    fn handle_packet(&mut self, pld: &[f32; SYM_PER_PLD]) {
        let (payload, e) = decode_packet_frame(&mut self.viterbi, pld);
        if e as f32 / 65535.0 > self.config.viterbi_threshold {
            debug!("dropping packet frame with metric {e}");
            return;
        }

        if !payload.final_frame {
            let index = payload.counter as usize;
            if index == self.packet_count && index < 32 {
                let start = index * 25;
                self.packet[start..start + 25].copy_from_slice(&payload.data);
                self.packet_count += 1;
            } else {
                // out of order, restart reassembly
                debug!("packet frame {} out of order", payload.counter);
                self.packet_count = 0;
            }
            return;
        }

        let len = (payload.counter as usize).min(25);
        let start = self.packet_count * 25;
        let end = start + len;
        self.packet_count = 0;
        if end > PACKET_MAX || len < 2 {
            return;
        }
        self.packet[start..end].copy_from_slice(&payload.data[0..len]);

        if !m17_crc_ok(&self.packet[0..end]) {
            debug!("discarding packet with bad CRC");
            return;
        }
        debug!("packet of {} bytes received", end);

        // SMS packets carry a NUL-terminated text after the type byte
        if self.packet[0] == 0x05 {
            let body = &self.packet[1..end - 2];
            let text = body.split(|b| *b == 0).next().unwrap_or(body).to_vec();
            let fields = self.link_fields();
            self.events.push_back(DecoderEvent::Sms { fields, text });
        }
    }

    fn link_fields(&self) -> LinkFields {
        LinkFields {
            destination: self.lsf.destination(),
            source: self.lsf.source(),
            raw_destination: self.lsf.raw_destination(),
            raw_source: self.lsf.raw_source(),
            type_field: [self.lsf.0[12], self.lsf.0[13]],
            meta: self.lsf.meta(),
            crc_ok: self.lsf.check_crc(),
        }
    }

    fn publish_fields(&mut self) {
        let fields = self.link_fields();
        if self.config.debug_ctrl && self.config.callsign_display {
            debug!("fields dst={} src={}", fields.destination, fields.source);
        }
        self.events.push_back(DecoderEvent::Fields(fields));
    }
}

impl<C: CryptoProvider> Drop for Decoder<C> {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}
