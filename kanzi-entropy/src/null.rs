//! The null entropy coder: a raw passthrough, used when a block's payload
//! is already judged incompressible (spec.md §4.5).

use kanzi_core::bitstream::{BitReader, BitWriter};
use kanzi_core::error::Result;
use std::io::{Read, Write};

/// Writes each byte of the block directly as 8 bits.
#[derive(Debug, Default)]
pub struct NullEncoder;

impl NullEncoder {
    /// Encode `block` verbatim.
    pub fn encode<W: Write>(&mut self, out: &mut BitWriter<W>, block: &[u8]) -> Result<usize> {
        out.write_bits_from_bytes(block, block.len() * 8)?;
        Ok(block.len())
    }
}

/// Reads back bytes written by [`NullEncoder`].
#[derive(Debug, Default)]
pub struct NullDecoder;

impl NullDecoder {
    /// Decode `block.len()` bytes verbatim.
    pub fn decode<R: Read>(&mut self, input: &mut BitReader<R>, block: &mut [u8]) -> Result<usize> {
        input.read_bits_into_bytes(block, block.len() * 8)?;
        Ok(block.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let data = b"the quick brown fox".to_vec();
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf, 1024).unwrap();
            NullEncoder.encode(&mut w, &data).unwrap();
            w.close().unwrap();
        }

        let mut out = vec![0u8; data.len()];
        let mut r = BitReader::new(&buf[..]);
        NullDecoder.decode(&mut r, &mut out).unwrap();
        assert_eq!(out, data);
    }
}
