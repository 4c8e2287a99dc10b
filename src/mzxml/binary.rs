//! Peak list decoding for mzXML
//!
//! mzXML stores each scan's peaks as a single Base64 string of interleaved
//! m/z and intensity values, optionally zlib-compressed. The decoding pipeline:
//!
//! 1. Base64 decode the text
//! 2. Decompress if needed (zlib)
//! 3. Interpret bytes as float32 or float64 in the declared byte order
//! 4. De-interleave into m/z and intensity arrays

use std::io::Read;

use base64::prelude::*;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;

/// Compression applied to a `<peaks>` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// No compression (raw binary)
    #[default]
    None,
    /// zlib compression
    Zlib,
}

impl Compression {
    /// Parse the `compressionType` attribute
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value {
            "none" | "" => Some(Compression::None),
            "zlib" => Some(Compression::Zlib),
            _ => None,
        }
    }
}

/// Numerical precision of a `<peaks>` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// 32-bit floating point (mzXML default)
    #[default]
    Float32,
    /// 64-bit floating point
    Float64,
}

impl Precision {
    /// Parse the `precision` attribute
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value {
            "32" => Some(Precision::Float32),
            "64" => Some(Precision::Float64),
            _ => None,
        }
    }

    /// Get the byte size per value
    pub fn byte_size(&self) -> usize {
        match self {
            Precision::Float32 => 4,
            Precision::Float64 => 8,
        }
    }
}

/// Byte order of a `<peaks>` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Big-endian ("network"), the mzXML default
    #[default]
    Network,
    /// Little-endian
    Little,
}

impl ByteOrder {
    /// Parse the `byteOrder` attribute
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value {
            "network" | "big" => Some(ByteOrder::Network),
            "little" => Some(ByteOrder::Little),
            _ => None,
        }
    }
}

/// Errors that can occur during peak decoding
#[derive(Debug, thiserror::Error)]
pub enum BinaryDecodeError {
    /// Payload is not valid Base64
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// zlib stream could not be inflated
    #[error("Decompression error: {0}")]
    DecompressionError(#[from] std::io::Error),

    /// Payload does not hold the expected number of values
    #[error("Invalid data length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected count
        expected: usize,
        /// Actual count
        actual: usize,
    },
}

/// Decoder for mzXML `<peaks>` payloads
pub struct PeaksDecoder;

impl PeaksDecoder {
    /// Decode an interleaved m/z-intensity payload
    ///
    /// # Arguments
    /// * `base64_data` - The Base64 text of the `<peaks>` element
    /// * `precision` - 32 or 64 bit floats
    /// * `byte_order` - network (big-endian) or little-endian
    /// * `compression` - none or zlib
    /// * `expected_pairs` - Expected number of peaks (from `peaksCount`)
    ///
    /// # Returns
    /// Parallel `(mz, intensity)` arrays
    pub fn decode(
        base64_data: &str,
        precision: Precision,
        byte_order: ByteOrder,
        compression: Compression,
        expected_pairs: Option<usize>,
    ) -> Result<(Vec<f64>, Vec<f64>), BinaryDecodeError> {
        let trimmed: String = base64_data.split_whitespace().collect();
        if trimmed.is_empty() {
            return match expected_pairs {
                Some(expected) if expected > 0 => Err(BinaryDecodeError::InvalidLength {
                    expected,
                    actual: 0,
                }),
                _ => Ok((Vec::new(), Vec::new())),
            };
        }

        // Step 1: Base64 decode
        let decoded_bytes = BASE64_STANDARD.decode(trimmed.as_bytes())?;

        // Step 2: Decompress if needed
        let uncompressed = match compression {
            Compression::None => decoded_bytes,
            Compression::Zlib => {
                let mut decoder = ZlibDecoder::new(&decoded_bytes[..]);
                let mut uncompressed = Vec::new();
                decoder.read_to_end(&mut uncompressed)?;
                uncompressed
            }
        };

        // Step 3: Convert bytes to floats
        let values = Self::bytes_to_floats(&uncompressed, precision, byte_order)?;

        if values.len() % 2 != 0 {
            return Err(BinaryDecodeError::InvalidLength {
                expected: values.len() + 1,
                actual: values.len(),
            });
        }

        // Step 4: De-interleave
        let pairs = values.len() / 2;
        if let Some(expected) = expected_pairs {
            if pairs != expected {
                return Err(BinaryDecodeError::InvalidLength {
                    expected,
                    actual: pairs,
                });
            }
        }

        let mut mz = Vec::with_capacity(pairs);
        let mut intensity = Vec::with_capacity(pairs);
        for pair in values.chunks_exact(2) {
            mz.push(pair[0]);
            intensity.push(pair[1]);
        }

        Ok((mz, intensity))
    }

    /// Convert raw bytes to f64 values
    fn bytes_to_floats(
        bytes: &[u8],
        precision: Precision,
        byte_order: ByteOrder,
    ) -> Result<Vec<f64>, BinaryDecodeError> {
        let byte_size = precision.byte_size();

        if bytes.len() % byte_size != 0 {
            return Err(BinaryDecodeError::InvalidLength {
                expected: bytes.len() / byte_size * byte_size,
                actual: bytes.len(),
            });
        }

        let count = bytes.len() / byte_size;
        let mut values = Vec::with_capacity(count);
        let mut cursor = std::io::Cursor::new(bytes);

        match (precision, byte_order) {
            (Precision::Float32, ByteOrder::Network) => {
                for _ in 0..count {
                    values.push(cursor.read_f32::<BigEndian>()? as f64);
                }
            }
            (Precision::Float32, ByteOrder::Little) => {
                for _ in 0..count {
                    values.push(cursor.read_f32::<LittleEndian>()? as f64);
                }
            }
            (Precision::Float64, ByteOrder::Network) => {
                for _ in 0..count {
                    values.push(cursor.read_f64::<BigEndian>()?);
                }
            }
            (Precision::Float64, ByteOrder::Little) => {
                for _ in 0..count {
                    values.push(cursor.read_f64::<LittleEndian>()?);
                }
            }
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_f32_be(values: &[f32]) -> String {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        BASE64_STANDARD.encode(bytes)
    }

    #[test]
    fn test_decode_float32_network() {
        let data = encode_f32_be(&[100.0, 10.0, 200.0, 20.0]);

        let (mz, intensity) = PeaksDecoder::decode(
            &data,
            Precision::Float32,
            ByteOrder::Network,
            Compression::None,
            Some(2),
        )
        .unwrap();

        assert_eq!(mz, vec![100.0, 200.0]);
        assert_eq!(intensity, vec![10.0, 20.0]);
    }

    #[test]
    fn test_decode_float64_little() {
        let bytes: Vec<u8> = [324.5f64, 1500.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let data = BASE64_STANDARD.encode(bytes);

        let (mz, intensity) = PeaksDecoder::decode(
            &data,
            Precision::Float64,
            ByteOrder::Little,
            Compression::None,
            None,
        )
        .unwrap();

        assert!((mz[0] - 324.5).abs() < 1e-12);
        assert!((intensity[0] - 1500.0).abs() < 1e-12);
    }

    #[test]
    fn test_decode_zlib_compressed() {
        use flate2::write::ZlibEncoder;
        use std::io::Write;

        let values: Vec<f32> = vec![50.0, 1.0, 60.0, 2.0, 70.0, 3.0];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();

        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&bytes).unwrap();
        let compressed = encoder.finish().unwrap();
        let data = BASE64_STANDARD.encode(&compressed);

        let (mz, intensity) = PeaksDecoder::decode(
            &data,
            Precision::Float32,
            ByteOrder::Network,
            Compression::Zlib,
            Some(3),
        )
        .unwrap();

        assert_eq!(mz, vec![50.0, 60.0, 70.0]);
        assert_eq!(intensity, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_decode_empty() {
        let (mz, intensity) = PeaksDecoder::decode(
            "",
            Precision::Float32,
            ByteOrder::Network,
            Compression::None,
            Some(0),
        )
        .unwrap();
        assert!(mz.is_empty());
        assert!(intensity.is_empty());
    }

    #[test]
    fn test_peaks_count_mismatch() {
        let data = encode_f32_be(&[100.0, 10.0]);
        let result = PeaksDecoder::decode(
            &data,
            Precision::Float32,
            ByteOrder::Network,
            Compression::None,
            Some(3),
        );
        assert!(matches!(
            result,
            Err(BinaryDecodeError::InvalidLength {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_odd_value_count_rejected() {
        let data = encode_f32_be(&[100.0, 10.0, 200.0]);
        let result = PeaksDecoder::decode(
            &data,
            Precision::Float32,
            ByteOrder::Network,
            Compression::None,
            None,
        );
        assert!(result.is_err());
    }
}
