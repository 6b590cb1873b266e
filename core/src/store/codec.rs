//! Base64 codec for sample arrays: little-endian IEEE-754 f32, no header.

use super::{StoreError, StoreResult};
use crate::prelude::{AnalysisError, AnalysisResult};
use base64::prelude::*;
use byteorder::{ByteOrder, LittleEndian};

/// Encodings accepted on `hasEncoding`, compared by IRI local name.
pub const ACCEPTED_ENCODINGS: &[&str] = &["base64Binary", "base64"];

const SAMPLE_BYTES: usize = 4;

pub fn encode_f32(samples: &[f32]) -> String {
    let mut bytes = vec![0u8; samples.len() * SAMPLE_BYTES];
    LittleEndian::write_f32_into(samples, &mut bytes);
    BASE64_STANDARD.encode(bytes)
}

pub fn decode_f32(payload: &str) -> StoreResult<Vec<f32>> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let bytes = BASE64_STANDARD.decode(trimmed)?;
    if bytes.len() % SAMPLE_BYTES != 0 {
        return Err(StoreError::RaggedPayload(bytes.len()));
    }
    let mut samples = vec![0f32; bytes.len() / SAMPLE_BYTES];
    LittleEndian::read_f32_into(&bytes, &mut samples);
    Ok(samples)
}

/// Decodes and checks the sample count against the declared size.
pub fn decode_checked(instance: &str, payload: &str, declared: usize) -> AnalysisResult<Vec<f32>> {
    let samples = decode_f32(payload)?;
    if samples.len() != declared {
        return Err(AnalysisError::SizeMismatch {
            instance: instance.to_string(),
            expected: declared,
            actual: samples.len(),
        });
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_little_endian_bytes() {
        // 1.0f32 is 0x3F800000.
        assert_eq!(encode_f32(&[1.0]), BASE64_STANDARD.encode([0x00, 0x00, 0x80, 0x3F]));
        assert_eq!(decode_f32(&encode_f32(&[-0.5, 2.25])).unwrap(), vec![-0.5, 2.25]);
    }

    #[test]
    fn declared_size_mismatch_is_rejected() {
        let payload = encode_f32(&[0.0; 9]);
        let err = decode_checked("dynamat:TimeSensorSignal_0", &payload, 10).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::SizeMismatch { expected: 10, actual: 9, .. }
        ));
    }

    #[test]
    fn ragged_payload_is_a_store_error() {
        let payload = BASE64_STANDARD.encode([1u8, 2, 3]);
        assert!(matches!(decode_f32(&payload), Err(StoreError::RaggedPayload(3))));
    }

    #[test]
    fn empty_payload_decodes_to_nothing() {
        assert!(decode_f32("  ").unwrap().is_empty());
        assert!(decode_checked("x", "", 0).unwrap().is_empty());
    }
}
