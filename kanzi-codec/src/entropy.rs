//! Dispatches a configured [`EntropyType`] to the concrete coder in
//! `kanzi-entropy` it names, so the block pipeline can drive any of them
//! through one call site (spec.md §4.5).

use kanzi_core::bitstream::{BitReader, BitWriter};
use kanzi_core::error::Result;
use kanzi_core::registry::EntropyType;
use kanzi_entropy::prelude::*;
use std::io::{Read, Write};

/// Bytes between frequency-table/predictor-chunk resyncs for the chunked
/// coders. Fixed rather than derived from block size: the chunked coders
/// resynchronize internally regardless of how this lines up with block
/// boundaries.
const CHUNK_SIZE: usize = 1 << 16;

/// Owns whichever concrete encoder a block's [`EntropyType`] selects.
pub enum BlockEncoder {
    Null(NullEncoder),
    Huffman(HuffmanEncoder),
    Ans0(AnsEncoder),
    Ans1(AnsEncoder),
    Fpaq(BinaryEncoder<FpaqPredictor>),
    Cm(BinaryEncoder<CmPredictor>),
    Tpaq(BinaryEncoder<TpaqPredictor>),
}

impl BlockEncoder {
    /// Build the encoder named by `entropy`. `Range` and `TpaqExtra` are
    /// not distinct coders in this implementation: `Range` is served by
    /// the same generic binary range coder as `Cm`, and `TpaqExtra` by
    /// plain `Tpaq` (see DESIGN.md).
    pub fn new(entropy: EntropyType) -> Result<Self> {
        Ok(match entropy {
            EntropyType::None => BlockEncoder::Null(NullEncoder),
            EntropyType::Huffman => BlockEncoder::Huffman(HuffmanEncoder::new(CHUNK_SIZE)?),
            EntropyType::Ans0 => BlockEncoder::Ans0(AnsEncoder::new(0, CHUNK_SIZE)?),
            EntropyType::Ans1 => BlockEncoder::Ans1(AnsEncoder::new(1, CHUNK_SIZE)?),
            EntropyType::Fpaq => {
                BlockEncoder::Fpaq(BinaryEncoder::new(FpaqPredictor::new(), CHUNK_SIZE)?)
            }
            EntropyType::Cm | EntropyType::Range => {
                BlockEncoder::Cm(BinaryEncoder::new(CmPredictor::new(), CHUNK_SIZE)?)
            }
            EntropyType::Tpaq | EntropyType::TpaqExtra => {
                BlockEncoder::Tpaq(BinaryEncoder::new(TpaqPredictor::new(), CHUNK_SIZE)?)
            }
        })
    }

    pub fn encode<W: Write>(&mut self, out: &mut BitWriter<W>, block: &[u8]) -> Result<usize> {
        match self {
            BlockEncoder::Null(e) => e.encode(out, block),
            BlockEncoder::Huffman(e) => e.encode(out, block),
            BlockEncoder::Ans0(e) | BlockEncoder::Ans1(e) => e.encode(out, block),
            BlockEncoder::Fpaq(e) => e.encode(out, block),
            BlockEncoder::Cm(e) => e.encode(out, block),
            BlockEncoder::Tpaq(e) => e.encode(out, block),
        }
    }
}

/// Owns whichever concrete decoder a block's [`EntropyType`] selects.
pub enum BlockDecoder {
    Null(NullDecoder),
    Huffman(HuffmanDecoder),
    Ans0(AnsDecoder),
    Ans1(AnsDecoder),
    Fpaq(BinaryDecoder<FpaqPredictor>),
    Cm(BinaryDecoder<CmPredictor>),
    Tpaq(BinaryDecoder<TpaqPredictor>),
}

impl BlockDecoder {
    pub fn new(entropy: EntropyType) -> Result<Self> {
        Ok(match entropy {
            EntropyType::None => BlockDecoder::Null(NullDecoder),
            EntropyType::Huffman => BlockDecoder::Huffman(HuffmanDecoder::new(CHUNK_SIZE)?),
            EntropyType::Ans0 => BlockDecoder::Ans0(AnsDecoder::new(0, CHUNK_SIZE)?),
            EntropyType::Ans1 => BlockDecoder::Ans1(AnsDecoder::new(1, CHUNK_SIZE)?),
            EntropyType::Fpaq => {
                BlockDecoder::Fpaq(BinaryDecoder::new(FpaqPredictor::new(), CHUNK_SIZE)?)
            }
            EntropyType::Cm | EntropyType::Range => {
                BlockDecoder::Cm(BinaryDecoder::new(CmPredictor::new(), CHUNK_SIZE)?)
            }
            EntropyType::Tpaq | EntropyType::TpaqExtra => {
                BlockDecoder::Tpaq(BinaryDecoder::new(TpaqPredictor::new(), CHUNK_SIZE)?)
            }
        })
    }

    pub fn decode<R: Read>(&mut self, input: &mut BitReader<R>, block: &mut [u8]) -> Result<usize> {
        match self {
            BlockDecoder::Null(d) => d.decode(input, block),
            BlockDecoder::Huffman(d) => d.decode(input, block),
            BlockDecoder::Ans0(d) | BlockDecoder::Ans1(d) => d.decode(input, block),
            BlockDecoder::Fpaq(d) => d.decode(input, block),
            BlockDecoder::Cm(d) => d.decode(input, block),
            BlockDecoder::Tpaq(d) => d.decode(input, block),
        }
    }
}

/// Builds the transform chain's boxed stages for a given ordered list of
/// [`kanzi_core::registry::TransformType`]s.
pub fn build_chain(
    chain: &[kanzi_core::registry::TransformType],
) -> Vec<Box<dyn kanzi_transform::traits::ByteTransform>> {
    use kanzi_core::registry::TransformType as T;
    use kanzi_transform::prelude::*;

    chain
        .iter()
        .map(|t| -> Box<dyn kanzi_transform::traits::ByteTransform> {
            match t {
                T::None => unreachable!("NONE never appears as a chain stage"),
                T::Pack => Box::new(Pack::new()),
                T::Bwt => Box::new(Bwt::new()),
                T::Bwts => Box::new(Bwts::new()),
                T::Lz => Box::new(Lz::new()),
                T::LzX => Box::new(Lzx::new()),
                T::LzP => Box::new(Lzp::new()),
                T::Rolz => Box::new(Rolz::new()),
                T::RolzX => Box::new(Rolzx::new()),
                T::Rlt => Box::new(Rlt::new()),
                T::ZRlt => Box::new(Zrlt::new()),
                T::Mtft => Box::new(Mtft::new()),
                T::Rank => Box::new(RankTransform::new()),
                T::Srt => Box::new(Srt::new()),
                T::Text => Box::new(Text::new()),
                T::Fsd => Box::new(Fsd::new()),
                T::Exe => Box::new(Exe::default()),
                T::Utf => Box::new(Utf::new()),
                T::Dna => Box::new(Dna::default()),
            }
        })
        .collect()
}
