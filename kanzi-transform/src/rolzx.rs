//! ROLZX (spec.md §4.6): the [`crate::rolz`] token stream (literal runs,
//! reduced-offset match slots, match lengths) entropy-coded with an
//! adaptive binary range coder instead of written as raw bytes, exactly
//! as `ROLZCodec2`/`ROLZEncoder` layer a context-mixing coder on top of
//! the reduced-offset tokens in `ROLZCodec.hpp`.

use crate::lz_common::{read_varint, write_varint};
use crate::rolz::Rolz;
use crate::traits::ByteTransform;
use kanzi_core::bitstream::{BitReader, BitWriter};
use kanzi_entropy::predictor::cm::CmPredictor;
use kanzi_entropy::prelude::{BinaryDecoder, BinaryEncoder};

const CHUNK_SIZE: usize = 1 << 16;
const WRITER_BUFFER: usize = 4096;

#[derive(Debug, Default)]
pub struct Rolzx;

impl Rolzx {
    pub fn new() -> Self {
        Self
    }
}

impl ByteTransform for Rolzx {
    fn forward(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Option<()> {
        let mut rolz = Rolz::new();
        let mut tokens = Vec::new();
        rolz.forward(src, &mut tokens)?;

        let mut coded = Vec::new();
        {
            let mut writer = BitWriter::new(&mut coded, WRITER_BUFFER).ok()?;
            let mut encoder = BinaryEncoder::new(CmPredictor::new(), CHUNK_SIZE.max(1024)).ok()?;
            encoder.encode(&mut writer, &tokens).ok()?;
            writer.close().ok()?;
        }

        write_varint(dst, tokens.len() as u64);
        dst.extend_from_slice(&coded);
        Some(())
    }

    fn inverse(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Option<()> {
        let mut pos = 0usize;
        let token_len = read_varint(src, &mut pos)? as usize;

        let mut tokens = vec![0u8; token_len];
        let mut reader = BitReader::new(&src[pos..]);
        let mut decoder = BinaryDecoder::new(CmPredictor::new(), CHUNK_SIZE.max(1024)).ok()?;
        decoder.decode(&mut reader, &mut tokens).ok()?;

        let mut rolz = Rolz::new();
        rolz.inverse(&tokens, dst)
    }

    fn max_encoded_length(&self, n: usize) -> usize {
        n + n / 2 + 128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let mut rolzx = Rolzx::new();
        let mut encoded = Vec::new();
        rolzx.forward(data, &mut encoded).unwrap();
        let mut decoded = Vec::new();
        rolzx.inverse(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn roundtrip_repetitive() {
        roundtrip(b"the rolzx codec mixes contexts, the rolzx codec mixes contexts");
    }

    #[test]
    fn roundtrip_empty() {
        roundtrip(b"");
    }
}
