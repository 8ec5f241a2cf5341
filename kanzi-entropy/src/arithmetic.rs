//! 56-bit binary range coder generic over a [`Predictor`] (spec.md §4.5),
//! grounded on the `BinaryEntropyEncoder`/`BinaryEntropyDecoder`/FPAQ
//! chunked-flush design: encoding proceeds in chunks with a varint byte
//! count header, periodically flushing the top 32 bits of range state so
//! the decoder can resynchronize without buffering the whole block.

use crate::alphabet::{read_varint, write_varint};
use crate::predictor::Predictor;
use kanzi_core::bitstream::{BitReader, BitWriter};
use kanzi_core::error::Result;
use std::io::{Read, Write};

const TOP: u64 = 0x00FF_FFFF_FFFF_FFFF;
const MASK_24_56: u64 = 0x00FF_FFFF_FF00_0000;
const PSCALE_BITS: u32 = 12;
const MAX_CHUNK_SIZE: usize = 1 << 24;
const MIN_CHUNK_SIZE: usize = 1024;

/// Binary range encoder driven by a caller-supplied [`Predictor`].
pub struct BinaryEncoder<P: Predictor> {
    predictor: P,
    low: u64,
    high: u64,
    chunk_size: usize,
}

impl<P: Predictor> BinaryEncoder<P> {
    /// Create an encoder with the given predictor and chunk size.
    pub fn new(predictor: P, chunk_size: usize) -> Result<Self> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(kanzi_core::error::KanziError::invalid_param(
                "chunk_size",
                "must be in [1024, 1 << 24]",
            ));
        }
        Ok(Self {
            predictor,
            low: 0,
            high: TOP,
            chunk_size,
        })
    }

    fn encode_bit<W: Write>(&mut self, out: &mut BitWriter<W>, bit: i32) -> Result<()> {
        let p = self.predictor.get().clamp(1, (1 << PSCALE_BITS) - 1) as u64;
        let range = self.high - self.low;
        let split = self.low + ((range >> PSCALE_BITS) * p);

        if bit != 0 {
            self.high = split;
        } else {
            self.low = split + 1;
        }
        self.predictor.update(bit);

        while (self.low ^ self.high) & MASK_24_56 == 0 {
            out.write_bits((self.low >> 24) & 0xFFFF_FFFF, 32)?;
            self.low = (self.low << 32) & TOP;
            self.high = ((self.high << 32) & TOP) | 0xFFFF_FFFF;
        }
        Ok(())
    }

    fn flush<W: Write>(&mut self, out: &mut BitWriter<W>) -> Result<()> {
        out.write_bits((self.low >> 24) & 0xFFFF_FFFF, 32)?;
        self.low = 0;
        self.high = TOP;
        Ok(())
    }

    /// Encode `block`, flushing chunk state periodically.
    pub fn encode<W: Write>(&mut self, out: &mut BitWriter<W>, block: &[u8]) -> Result<usize> {
        let mut start = 0;
        while start < block.len() {
            let end = (start + self.chunk_size).min(block.len());
            write_varint(out, (end - start) as u32)?;
            for &byte in &block[start..end] {
                for i in (0..8).rev() {
                    let bit = ((byte >> i) & 1) as i32;
                    self.encode_bit(out, bit)?;
                }
                self.predictor.end_of_byte(byte);
            }
            self.flush(out)?;
            start = end;
        }
        Ok(block.len())
    }
}

/// Binary range decoder matching [`BinaryEncoder`].
pub struct BinaryDecoder<P: Predictor> {
    predictor: P,
    low: u64,
    high: u64,
    current: u64,
    chunk_size: usize,
}

impl<P: Predictor> BinaryDecoder<P> {
    /// Create a decoder with the given predictor and chunk size.
    pub fn new(predictor: P, chunk_size: usize) -> Result<Self> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(kanzi_core::error::KanziError::invalid_param(
                "chunk_size",
                "must be in [1024, 1 << 24]",
            ));
        }
        Ok(Self {
            predictor,
            low: 0,
            high: TOP,
            current: 0,
            chunk_size,
        })
    }

    fn init_chunk<R: Read>(&mut self, input: &mut BitReader<R>) -> Result<()> {
        self.low = 0;
        self.high = TOP;
        self.current = input.read_bits(32)?;
        Ok(())
    }

    fn decode_bit<R: Read>(&mut self, input: &mut BitReader<R>) -> Result<i32> {
        let p = self.predictor.get().clamp(1, (1 << PSCALE_BITS) - 1) as u64;
        let range = self.high - self.low;
        let split = self.low + ((range >> PSCALE_BITS) * p);

        let bit = if self.current <= split { 1 } else { 0 };
        if bit != 0 {
            self.high = split;
        } else {
            self.low = split + 1;
        }
        self.predictor.update(bit);

        while (self.low ^ self.high) & MASK_24_56 == 0 {
            self.low = (self.low << 32) & TOP;
            self.high = ((self.high << 32) & TOP) | 0xFFFF_FFFF;
            self.current = ((self.current << 32) & TOP) | input.read_bits(32)?;
        }
        Ok(bit)
    }

    /// Decode `block.len()` bytes.
    pub fn decode<R: Read>(&mut self, input: &mut BitReader<R>, block: &mut [u8]) -> Result<usize> {
        let mut start = 0;
        while start < block.len() {
            let n = read_varint(input)? as usize;
            let end = (start + n).min(block.len());
            self.init_chunk(input)?;
            for slot in &mut block[start..end] {
                let mut byte = 0u8;
                for _ in 0..8 {
                    let bit = self.decode_bit(input)?;
                    byte = (byte << 1) | bit as u8;
                }
                self.predictor.end_of_byte(byte);
                *slot = byte;
            }
            start = end;
        }
        Ok(block.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::fpaq::FpaqPredictor;

    #[test]
    fn fpaq_roundtrip_text() {
        let data = b"mississippi river mississippi river mississippi".to_vec();
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf, 1024).unwrap();
            let mut enc = BinaryEncoder::new(FpaqPredictor::new(), 4096).unwrap();
            enc.encode(&mut w, &data).unwrap();
            w.close().unwrap();
        }
        let mut out = vec![0u8; data.len()];
        let mut r = BitReader::new(&buf[..]);
        let mut dec = BinaryDecoder::new(FpaqPredictor::new(), 4096).unwrap();
        dec.decode(&mut r, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn fpaq_roundtrip_constant() {
        let data = vec![0u8; 3000];
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf, 1024).unwrap();
            let mut enc = BinaryEncoder::new(FpaqPredictor::new(), 1024).unwrap();
            enc.encode(&mut w, &data).unwrap();
            w.close().unwrap();
        }
        let mut out = vec![0u8; data.len()];
        let mut r = BitReader::new(&buf[..]);
        let mut dec = BinaryDecoder::new(FpaqPredictor::new(), 1024).unwrap();
        dec.decode(&mut r, &mut out).unwrap();
        assert_eq!(out, data);
    }
}
