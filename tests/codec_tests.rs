// Integration tests for the μ-law codec
//
// The codec is total over its byte domain: every byte decodes to exactly one
// sample, deterministically, with no state carried between frames.

use voice_bridge::audio::codec;
use voice_bridge::CodecError;

#[test]
fn test_decode_is_total_and_deterministic() {
    for byte in 0..=255u8 {
        let first = codec::decode(&[byte]).expect("single byte frame");
        let second = codec::decode(&[byte]).expect("single byte frame");

        assert_eq!(first.len(), 1, "one sample per byte (byte {:#04x})", byte);
        assert_eq!(first, second, "decode must be deterministic (byte {:#04x})", byte);
    }
}

#[test]
fn test_decode_frame_yields_one_sample_per_byte() {
    let frame: Vec<u8> = (0..160).map(|i| i as u8).collect();
    let samples = codec::decode(&frame).expect("decode frame");

    assert_eq!(samples.len(), frame.len());
    for (byte, sample) in frame.iter().zip(&samples) {
        assert_eq!(*sample, codec::decode_sample(*byte));
    }
}

#[test]
fn test_decode_does_not_depend_on_previous_frames() {
    let a = codec::decode(&[0x00, 0x10, 0x20]).unwrap();
    let _ = codec::decode(&[0xFF; 64]).unwrap();
    let b = codec::decode(&[0x00, 0x10, 0x20]).unwrap();

    assert_eq!(a, b);
}

#[test]
fn test_empty_frame_is_rejected() {
    assert_eq!(codec::decode(&[]), Err(CodecError::EmptyFrame));
}

#[test]
fn test_sign_bit_mirrors_magnitude() {
    for byte in 0..=127u8 {
        let negative = codec::decode_sample(byte);
        let positive = codec::decode_sample(byte | 0x80);
        assert_eq!(negative, -positive, "byte {:#04x}", byte);
    }
}

#[test]
fn test_encode_then_decode_is_stable_on_decoded_values() {
    // Every decoded sample sits exactly on a quantization level
    for byte in 0..=255u8 {
        let sample = codec::decode_sample(byte);
        let reencoded = codec::encode_sample(sample);
        assert_eq!(codec::decode_sample(reencoded), sample, "byte {:#04x}", byte);
    }
}

#[test]
fn test_encode_frame() {
    let encoded = codec::encode(&[0, 32124, -32124]);
    assert_eq!(encoded, vec![0xFF, 0x80, 0x00]);
}

#[test]
fn test_pcm_bytes_are_little_endian() {
    let bytes = codec::pcm_to_le_bytes(&[1, -2]);
    assert_eq!(bytes, vec![0x01, 0x00, 0xFE, 0xFF]);
}
