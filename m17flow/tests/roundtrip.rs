//! End-to-end transmit/receive round trips through the full symbol path.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use m17flow::coder::{Coder, WorkStatus};
use m17flow::config::{CoderConfig, DecoderConfig};
use m17flow::crypto::{CryptoProvider, NullCrypto};
use m17flow::decoder::{Decoder, DecoderEvent};
use m17flow::error::CryptoError;
use m17flow::Address;
use m17phy::lsf::Mode;
use m17phy::symbols::{to_i8, SYM_PER_FRA};

fn block(n: u8) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, b) in out.iter_mut().enumerate() {
        *b = n.wrapping_mul(31).wrapping_add(i as u8);
    }
    out
}

fn run_stream<C1: CryptoProvider, C2: CryptoProvider>(
    mut coder: Coder<C1>,
    decoder: &mut Decoder<C2>,
    frames: usize,
) -> Vec<u8> {
    let mut symbols = Vec::new();
    for n in 0..frames {
        let status = coder.work(&block(n as u8), &mut symbols).unwrap();
        assert_eq!(status, WorkStatus::Running);
    }
    coder.end_of_transmission();
    assert_eq!(coder.work(&[], &mut symbols).unwrap(), WorkStatus::Finished);

    let mut out = Vec::new();
    decoder.work(&symbols, &mut out);
    out
}

#[test]
fn unsigned_unencrypted_stream_round_trip() {
    let config = CoderConfig::new("N0CALL", "@ALL").unwrap();
    let coder = Coder::new(config, NullCrypto).unwrap();
    let mut decoder = Decoder::new(DecoderConfig::default(), NullCrypto);

    let out = run_stream(coder, &mut decoder, 20);

    assert_eq!(out.len(), 20 * 16);
    for n in 0..20 {
        assert_eq!(&out[n * 16..(n + 1) * 16], &block(n as u8), "frame {n}");
    }

    match decoder.next_event() {
        Some(DecoderEvent::Fields(fields)) => {
            assert_eq!(fields.destination, Address::Broadcast);
            assert_eq!(format!("{}", fields.source), "N0CALL");
            assert!(fields.crc_ok);
        }
        other => panic!("expected link fields, got {other:?}"),
    }
}

#[test]
fn single_frame_transmission_scenario() {
    // DST @ALL, SRC N0CALL, voice stream, CAN 0, zero META, one zero payload
    let config = CoderConfig::new("N0CALL", "@ALL").unwrap();
    let mut coder = Coder::new(config, NullCrypto).unwrap();

    let mut symbols = Vec::new();
    coder.work(&[0u8; 16], &mut symbols).unwrap();
    coder.end_of_transmission();
    coder.work(&[], &mut symbols).unwrap();

    // preamble, LSF frame, stream frame, EOT marker
    assert_eq!(symbols.len(), 4 * SYM_PER_FRA);

    let mut decoder = Decoder::new(DecoderConfig::default(), NullCrypto);
    let mut out = Vec::new();
    decoder.work(&symbols, &mut out);
    assert_eq!(out, vec![0u8; 16]);
    assert!(matches!(decoder.next_event(), Some(DecoderEvent::Fields(_))));
}

#[test]
fn i8_transport_recovers_identical_payload() {
    let config = CoderConfig::new("N0CALL", "@ALL").unwrap();
    let mut coder = Coder::new(config, NullCrypto).unwrap();

    let mut symbols = Vec::new();
    for n in 0..4 {
        coder.work(&block(n), &mut symbols).unwrap();
    }
    coder.end_of_transmission();
    coder.work(&[], &mut symbols).unwrap();

    let mut compact = vec![0i8; symbols.len()];
    to_i8(&symbols, &mut compact);

    let mut decoder = Decoder::new(DecoderConfig::default(), NullCrypto);
    let mut out = Vec::new();
    decoder.work_i8(&compact, &mut out);

    assert_eq!(out.len(), 4 * 16);
    for n in 0..4 {
        assert_eq!(&out[n * 16..(n + 1) * 16], &block(n as u8));
    }
}

#[test]
fn scrambler_stream_round_trip() {
    let mut config = CoderConfig::new("N0CALL", "@ALL").unwrap();
    config.set_scrambler(2, 0xDEADBE).unwrap();
    let coder = Coder::new(config, NullCrypto).unwrap();

    let mut decoder_config = DecoderConfig::default();
    decoder_config.set_scrambler(2, 0xDEADBE).unwrap();
    let mut decoder = Decoder::new(decoder_config, NullCrypto);

    // crosses a superframe boundary so the carried LFSR state is exercised
    let out = run_stream(coder, &mut decoder, 8);

    assert_eq!(out.len(), 8 * 16);
    for n in 0..8 {
        assert_eq!(&out[n * 16..(n + 1) * 16], &block(n as u8), "frame {n}");
    }
}

/// Deterministic stand-in for the collaborator's AES-CTR: a keystream block
/// derived from (key, frame IV), self-inverse like any counter mode.
struct XorCtr {
    key: [u8; 32],
}

impl CryptoProvider for XorCtr {
    fn stream_crypt(&mut self, iv: &[u8; 16], payload: &mut [u8; 16]) {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update(iv);
        let keystream = hasher.finalize();
        for (p, k) in payload.iter_mut().zip(keystream.iter()) {
            *p ^= k;
        }
    }

    fn sign(&mut self, _digest: &[u8; 32]) -> Result<[u8; 64], CryptoError> {
        Err(CryptoError::NoSigningKey)
    }

    fn verify(&mut self, _digest: &[u8; 32], _signature: &[u8; 64]) -> bool {
        false
    }
}

#[test]
fn aes_stream_round_trip() {
    let iv = [0x42u8; 14];
    let mut config = CoderConfig::new("N0CALL", "@ALL").unwrap();
    config.set_aes(0, iv);
    let coder = Coder::new(config, XorCtr { key: [7u8; 32] }).unwrap();

    let mut decoder_config = DecoderConfig::default();
    decoder_config.set_aes(0);
    let mut decoder = Decoder::new(decoder_config, XorCtr { key: [7u8; 32] });

    let out = run_stream(coder, &mut decoder, 5);

    assert_eq!(out.len(), 5 * 16);
    for n in 0..5 {
        assert_eq!(&out[n * 16..(n + 1) * 16], &block(n as u8), "frame {n}");
    }

    // the LSF META carries the IV head to the receiver
    match decoder.next_event() {
        Some(DecoderEvent::Fields(fields)) => assert_eq!(fields.meta, iv),
        other => panic!("expected link fields, got {other:?}"),
    }
}

#[test]
fn aes_with_wrong_key_garbles_the_payload() {
    let mut config = CoderConfig::new("N0CALL", "@ALL").unwrap();
    config.set_aes(0, [0x42u8; 14]);
    let coder = Coder::new(config, XorCtr { key: [7u8; 32] }).unwrap();

    let mut decoder_config = DecoderConfig::default();
    decoder_config.set_aes(0);
    let mut decoder = Decoder::new(decoder_config, XorCtr { key: [8u8; 32] });

    let out = run_stream(coder, &mut decoder, 1);
    assert_eq!(out.len(), 16);
    assert_ne!(&out[0..16], &block(0));
}

struct Ed25519Provider {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl Ed25519Provider {
    fn from_seed(seed: [u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(&seed);
        let verifying = signing.verifying_key();
        Self { signing, verifying }
    }
}

impl CryptoProvider for Ed25519Provider {
    fn stream_crypt(&mut self, _iv: &[u8; 16], _payload: &mut [u8; 16]) {}

    fn sign(&mut self, digest: &[u8; 32]) -> Result<[u8; 64], CryptoError> {
        Ok(self.signing.sign(digest).to_bytes())
    }

    fn verify(&mut self, digest: &[u8; 32], signature: &[u8; 64]) -> bool {
        self.verifying
            .verify(digest, &Signature::from_bytes(signature))
            .is_ok()
    }
}

#[test]
fn signed_stream_verifies_end_to_end() {
    let mut config = CoderConfig::new("N0CALL", "@ALL").unwrap();
    config.set_signed(true);
    let coder = Coder::new(config, Ed25519Provider::from_seed([3u8; 32])).unwrap();
    let mut decoder = Decoder::new(
        DecoderConfig::default(),
        Ed25519Provider::from_seed([3u8; 32]),
    );

    let out = run_stream(coder, &mut decoder, 4);

    // payload frames decode normally; signature frames are not payload
    assert_eq!(out.len(), 4 * 16);
    for n in 0..4 {
        assert_eq!(&out[n * 16..(n + 1) * 16], &block(n as u8), "frame {n}");
    }

    let mut verified = None;
    while let Some(event) = decoder.next_event() {
        if let DecoderEvent::SignatureVerified(ok) = event {
            verified = Some(ok);
        }
    }
    assert_eq!(verified, Some(true));
}

#[test]
fn signed_stream_with_wrong_public_key_fails_verification() {
    let mut config = CoderConfig::new("N0CALL", "@ALL").unwrap();
    config.set_signed(true);
    let coder = Coder::new(config, Ed25519Provider::from_seed([3u8; 32])).unwrap();
    let mut decoder = Decoder::new(
        DecoderConfig::default(),
        Ed25519Provider::from_seed([4u8; 32]),
    );

    let _ = run_stream(coder, &mut decoder, 4);

    let mut verified = None;
    while let Some(event) = decoder.next_event() {
        if let DecoderEvent::SignatureVerified(ok) = event {
            verified = Some(ok);
        }
    }
    assert_eq!(verified, Some(false));
}

#[test]
fn packet_sms_round_trip() {
    let mut config = CoderConfig::new("N0CALL", "@ALL").unwrap();
    config.set_mode(Mode::Packet);
    let mut coder = Coder::new(config, NullCrypto).unwrap();

    let mut payload = vec![0x05u8];
    payload.extend_from_slice(b"Greetings from the M17 baseband\0");

    let mut symbols = Vec::new();
    coder.work(&payload, &mut symbols).unwrap();
    coder.end_of_transmission();
    assert_eq!(coder.work(&[], &mut symbols).unwrap(), WorkStatus::Finished);

    let mut decoder = Decoder::new(DecoderConfig::default(), NullCrypto);
    let mut out = Vec::new();
    decoder.work(&symbols, &mut out);

    // packet data is published through events, not the stream output
    assert!(out.is_empty());
    let mut sms = None;
    while let Some(event) = decoder.next_event() {
        if let DecoderEvent::Sms { text, fields } = event {
            assert_eq!(format!("{}", fields.source), "N0CALL");
            sms = Some(text);
        }
    }
    assert_eq!(sms.as_deref(), Some(&b"Greetings from the M17 baseband"[..]));
}
