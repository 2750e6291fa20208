use crate::backend::PictureDecoder;
use crate::EssenceError;

/// Reads a picture buffer as little-endian 16-bit samples.
///
/// Stands in for a JPEG2000 codec when frames carry uncompressed data. An odd
/// trailing byte becomes a final sample on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSampleDecoder;

impl PictureDecoder for RawSampleDecoder {
    fn decode(&self, data: &[u8]) -> Result<Vec<i32>, EssenceError> {
        Ok(data
            .chunks(2)
            .map(|c| match *c {
                [lo, hi] => i32::from(u16::from_le_bytes([lo, hi])),
                [lo] => i32::from(lo),
                _ => 0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_pairs() {
        let samples = RawSampleDecoder.decode(&[0x01, 0x00, 0xff, 0xff, 0x34, 0x12]).unwrap();
        assert_eq!(samples, vec![1, 65535, 0x1234]);
    }

    #[test]
    fn odd_trailing_byte_is_kept() {
        let samples = RawSampleDecoder.decode(&[0x00, 0x01, 0x07]).unwrap();
        assert_eq!(samples, vec![256, 7]);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        assert!(RawSampleDecoder.decode(&[]).unwrap().is_empty());
    }
}
