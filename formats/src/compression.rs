//! The compressor an `.INT` chunk hands its data blob to.

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("declared {declared} bytes uncompressed, got {actual}")]
    SizeMismatch {
        declared: usize,
        actual: usize,
    },

    #[error("{declared} bytes cannot come from {input} compressed bytes")]
    Implausible {
        declared: usize,
        input: usize,
    },
}

/// A block compressor with the call contract the game's tools use.
///
/// `compressed_size` is the number of input bytes the decompressor may consume; it
/// is clamped to `data.len()`. The output must be exactly `uncompressed_size` bytes.
pub trait Compression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;

    fn decompress(&self, data: &[u8], compressed_size: u32, uncompressed_size: u32)
        -> Result<Vec<u8>, CompressionError>;
}

impl<C: Compression + ?Sized> Compression for &C {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        (**self).compress(data)
    }

    fn decompress(&self, data: &[u8], compressed_size: u32, uncompressed_size: u32)
        -> Result<Vec<u8>, CompressionError>
    {
        (**self).decompress(data, compressed_size, uncompressed_size)
    }
}

/// Stores data as-is. Handy for exercising container layout without a real codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Compression for Passthrough {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8], compressed_size: u32, uncompressed_size: u32)
        -> Result<Vec<u8>, CompressionError>
    {
        let data = &data[..data.len().min(compressed_size as usize)];
        if data.len() != uncompressed_size as usize {
            return Err(CompressionError::SizeMismatch {
                declared: uncompressed_size as usize,
                actual: data.len(),
            });
        }
        Ok(data.to_vec())
    }
}

#[cfg(test)]
#[test]
fn passthrough_checks_declared_size() {
    assert_eq!(Passthrough.decompress(b"abc", 11, 3).unwrap(), b"abc");
    assert!(matches!(
        Passthrough.decompress(b"abc", 11, 4),
        Err(CompressionError::SizeMismatch{declared: 4, actual: 3})
    ));
}
