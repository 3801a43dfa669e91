//! The transmit pipeline: payload bytes in, baseband symbols out.
//!
//! Stream mode consumes 16-byte blocks, holding one block of lookahead so
//! the final block can carry the end-of-stream bit (or, when signing, so the
//! signature frames can follow it). Packet mode buffers the whole packet and
//! emits it on end of transmission.

use std::collections::VecDeque;

use log::debug;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use m17phy::frame::{
    gen_eot, gen_lsf_frame, gen_packet_frame, gen_preamble, gen_stream_frame, PreambleKind,
};
use m17phy::lsf::{EncryptionType, Lsf, Mode};

use crate::config::CoderConfig;
use crate::crypto::CryptoProvider;
use crate::error::TxError;
use crate::scrambler::{Scrambler, ScramblerWidth};

/// Payload capacity of one packet: 33 frames of 25 bytes, less the CRC.
pub const PACKET_CAPACITY: usize = 823;

/// Frame number of the first signature frame; the fourth ends at 0x7FFF with
/// the EOT bit set.
const SIGNATURE_START_FN: u16 = 0x7FFC;
const EOT_BIT: u16 = 0x8000;

/// Where the transmitter is within a transmission's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    SendingPayload,
    /// Emitting signature frame 0..=3.
    SendingSignature(u8),
    SentEot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    Running,
    /// The EOT marker has been emitted (or the transmission aborted); no
    /// further output will be produced.
    Finished,
}

pub struct Coder<C: CryptoProvider> {
    lsf: Lsf,
    next_lsf: Option<Lsf>,
    mode: Mode,
    encryption: EncryptionType,
    signed_stream: bool,

    frame_number: u16,
    lich_cnt: u8,
    got_lsf: bool,
    send_preamble: bool,
    finished: bool,
    state: TxState,

    buffer: VecDeque<u8>,
    pending: Option<[u8; 16]>,

    digest: Option<Sha256>,
    scrambler: Option<Scrambler>,
    iv: [u8; 16],
    crypto: C,
}

impl<C: CryptoProvider> Coder<C> {
    pub fn new(config: CoderConfig, crypto: C) -> Result<Self, crate::error::ConfigError> {
        let mut iv = [0u8; 16];
        match config.encryption {
            EncryptionType::Aes => {
                let head = config.aes_iv.ok_or(crate::error::ConfigError::MissingIv)?;
                iv[0..14].copy_from_slice(&head);
            }
            EncryptionType::Scrambler if config.scrambler_seed.is_none() => {
                return Err(crate::error::ConfigError::MissingSeed);
            }
            _ => {}
        }
        let scrambler = config.scrambler_seed.map(|seed| {
            Scrambler::new(seed, ScramblerWidth::from_subtype(config.encryption_subtype))
        });

        let lsf = config.build_lsf();
        Ok(Self {
            mode: config.mode.clone(),
            encryption: config.encryption,
            signed_stream: config.signed_stream && lsf.signed_stream(),
            digest: config.signed_stream.then(Sha256::new),
            lsf,
            next_lsf: None,
            frame_number: 0,
            lich_cnt: 0,
            got_lsf: false,
            send_preamble: true,
            finished: false,
            state: TxState::SendingPayload,
            buffer: VecDeque::new(),
            pending: None,
            scrambler,
            iv,
            crypto,
        })
    }

    /// Signal end of input; the next `work` call drains buffered payload and
    /// closes the transmission.
    pub fn end_of_transmission(&mut self) {
        self.finished = true;
    }

    /// Queue an updated LSF; it takes effect at the next superframe boundary.
    pub fn queue_lsf_update(&mut self, mut lsf: Lsf) {
        lsf.update_crc();
        self.next_lsf = Some(lsf);
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Feed input bytes and collect output symbols.
    ///
    /// Returns [`WorkStatus::Finished`] once the EOT marker has been written.
    pub fn work(&mut self, input: &[u8], out: &mut Vec<f32>) -> Result<WorkStatus, TxError> {
        if self.state == TxState::SentEot {
            return Ok(WorkStatus::Finished);
        }

        if self.mode == Mode::Packet && self.buffer.len() + input.len() > PACKET_CAPACITY {
            return Err(TxError::PacketTooLarge {
                provided: self.buffer.len() + input.len(),
                capacity: PACKET_CAPACITY,
            });
        }
        self.buffer.extend(input);

        if self.send_preamble {
            out.extend_from_slice(&gen_preamble(PreambleKind::Lsf));
            self.send_preamble = false;
        }

        match self.mode {
            Mode::Stream => self.work_stream(out),
            Mode::Packet => self.work_packet(out),
        }
    }

    fn work_stream(&mut self, out: &mut Vec<f32>) -> Result<WorkStatus, TxError> {
        while self.buffer.len() >= 16 {
            let mut block = [0u8; 16];
            for b in block.iter_mut() {
                *b = self.buffer.pop_front().unwrap();
            }
            if let Some(previous) = self.pending.replace(block) {
                self.emit_stream_frame(&previous, false, out);
            }
        }

        if !self.finished {
            return Ok(WorkStatus::Running);
        }

        if let Some(last) = self.pending.take() {
            // the EOT bit rides on the last payload frame only when the
            // stream is unsigned; a signed stream ends on its signature
            self.emit_stream_frame(&last, !self.signed_stream, out);
        }
        if self.signed_stream {
            if let Err(e) = self.emit_signature_frames(out) {
                // never send an EOT pretending an unsigned-but-flagged-signed
                // stream completed
                self.state = TxState::SentEot;
                return Err(e.into());
            }
        }
        out.extend_from_slice(&gen_eot());
        self.state = TxState::SentEot;
        Ok(WorkStatus::Finished)
    }

    fn emit_lsf_if_needed(&mut self, out: &mut Vec<f32>) {
        if !self.got_lsf {
            out.extend_from_slice(&gen_lsf_frame(&self.lsf));
            self.got_lsf = true;
        }
    }

    fn emit_stream_frame(&mut self, block: &[u8; 16], last: bool, out: &mut Vec<f32>) {
        self.emit_lsf_if_needed(out);

        // the digest covers the plaintext payload, mirrored by the decoder
        if let Some(digest) = self.digest.as_mut() {
            digest.update(block);
        }

        let mut data = *block;
        match self.encryption {
            EncryptionType::Aes => {
                self.iv[14] = ((self.frame_number >> 8) & 0x7F) as u8;
                self.iv[15] = (self.frame_number & 0xFF) as u8;
                self.crypto.stream_crypt(&self.iv, &mut data);
            }
            EncryptionType::Scrambler => {
                let keystream = self.scrambler.as_mut().unwrap().next_frame();
                for (d, k) in data.iter_mut().zip(keystream.iter()) {
                    *d ^= k;
                }
            }
            _ => {}
        }

        let fn_field = self.frame_number | if last { EOT_BIT } else { 0 };
        out.extend_from_slice(&gen_stream_frame(&self.lsf, &data, self.lich_cnt, fn_field));
        debug!("sent stream frame fn={:04X} lich_cnt={}", fn_field, self.lich_cnt);

        self.frame_number = (self.frame_number + 1) % 0x8000;
        self.lich_cnt = (self.lich_cnt + 1) % 6;
        if self.lich_cnt == 0 {
            if let Some(next) = self.next_lsf.take() {
                self.lsf = next;
            }
        }
    }

    fn emit_signature_frames(&mut self, out: &mut Vec<f32>) -> Result<(), crate::error::CryptoError> {
        self.emit_lsf_if_needed(out);

        let digest: [u8; 32] = self
            .digest
            .take()
            .unwrap_or_default()
            .finalize()
            .into();
        let signature = self.crypto.sign(&digest)?;

        self.frame_number = SIGNATURE_START_FN;
        for i in 0..4u8 {
            self.state = TxState::SendingSignature(i);
            let block: [u8; 16] = signature[i as usize * 16..(i as usize + 1) * 16]
                .try_into()
                .unwrap();
            let fn_field = if i == 3 {
                0x7FFF | EOT_BIT
            } else {
                self.frame_number
            };
            out.extend_from_slice(&gen_stream_frame(&self.lsf, &block, self.lich_cnt, fn_field));
            self.frame_number += 1;
            self.lich_cnt = (self.lich_cnt + 1) % 6;
        }
        debug!("sent signature frames");
        Ok(())
    }

    fn work_packet(&mut self, out: &mut Vec<f32>) -> Result<WorkStatus, TxError> {
        if !self.finished {
            return Ok(WorkStatus::Running);
        }

        let mut packet: Vec<u8> = self.buffer.drain(..).collect();
        let crc = m17phy::crc::m17_crc(&packet);
        packet.extend_from_slice(&crc.to_be_bytes());

        self.emit_lsf_if_needed(out);

        let full_frames = (packet.len() - 1) / 25;
        for (index, chunk) in packet.chunks(25).enumerate() {
            let mut data = [0u8; 26];
            data[..chunk.len()].copy_from_slice(chunk);
            data[25] = if index == full_frames {
                0x80 | ((chunk.len() as u8) << 2)
            } else {
                (index as u8) << 2
            };
            out.extend_from_slice(&gen_packet_frame(&data));
        }
        debug!("sent packet of {} bytes in {} frames", packet.len(), full_frames + 1);

        out.extend_from_slice(&gen_eot());
        self.state = TxState::SentEot;
        Ok(WorkStatus::Finished)
    }
}

impl<C: CryptoProvider> Drop for Coder<C> {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}
