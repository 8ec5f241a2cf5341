//! Bitstream container: stream header, header CRC, and per-block framing
//! (spec.md §4.2), grounded on `CompressedOutputStream::writeHeader` /
//! `CompressedInputStream::readHeader` for the exact header-CRC recipe and
//! on the per-block write/read halves of those same files for the frame
//! layout.

use kanzi_core::bitstream::{BitReader, BitWriter};
use kanzi_core::error::{KanziError, Result};
use kanzi_core::registry::TransformType;
use std::io::{Read, Write};

use crate::params::ChecksumSize;

/// `"KANZ"` as a big-endian `u32`.
pub const MAGIC: u32 = 0x4B41_4E5A;
/// Bitstream format version implemented here.
pub const VERSION: u8 = 6;

const HEADER_HASH: u32 = 0x1E35_A7BD;

/// Pack an ordered transform chain (at most 8 stages) into the 48-bit
/// field stored in the header: each stage's 6-bit id, MSB first, the
/// unused tail right-padded with `NONE` (id 0).
pub fn pack_chain(chain: &[TransformType]) -> u64 {
    let mut packed: u64 = 0;
    for slot in 0..8 {
        let id = chain.get(slot).map(|t| t.id()).unwrap_or(0) as u64;
        packed |= id << (6 * (7 - slot));
    }
    packed
}

/// Inverse of [`pack_chain`]: recover the ordered, non-`NONE`-trimmed chain.
pub fn unpack_chain(packed: u64) -> Result<Vec<TransformType>> {
    let mut chain = Vec::new();
    for slot in 0..8 {
        let id = ((packed >> (6 * (7 - slot))) & 0x3F) as u8;
        if id == 0 {
            continue;
        }
        chain.push(TransformType::from_id(id)?);
    }
    Ok(chain)
}

fn header_crc(
    version: u8,
    checksum: ChecksumSize,
    entropy_id: u8,
    chain_packed: u64,
    block_size: u32,
    original_size: Option<u64>,
) -> u32 {
    let seed = 0x0103_0507u32.wrapping_mul(version as u32);
    let mut cksum = HEADER_HASH.wrapping_mul(seed);
    cksum ^= HEADER_HASH.wrapping_mul(!(checksum.tag()));
    cksum ^= HEADER_HASH.wrapping_mul(!(entropy_id as u32));
    cksum ^= HEADER_HASH.wrapping_mul(!((chain_packed >> 32) as u32));
    cksum ^= HEADER_HASH.wrapping_mul(!(chain_packed as u32));
    cksum ^= HEADER_HASH.wrapping_mul(!block_size);
    if let Some(sz) = original_size {
        cksum ^= HEADER_HASH.wrapping_mul(!((sz >> 32) as u32));
        cksum ^= HEADER_HASH.wrapping_mul(!(sz as u32));
    }
    (cksum >> 23) ^ (cksum >> 3)
}

/// Tag for the `original size` header field: `0` = not provided, else the
/// field occupies `16 * tag` bits.
fn original_size_tag(size: Option<u64>) -> u32 {
    match size {
        None => 0,
        Some(sz) if sz < (1 << 16) => 1,
        Some(sz) if sz < (1 << 32) => 2,
        Some(sz) if sz < (1 << 48) => 3,
        Some(_) => 0,
    }
}

/// Write the stream header (magic, version, params, header CRC).
#[allow(clippy::too_many_arguments)]
pub fn write_header<W: Write>(
    bw: &mut BitWriter<W>,
    entropy_id: u8,
    chain: &[TransformType],
    block_size: usize,
    checksum: ChecksumSize,
    original_size: Option<u64>,
) -> Result<()> {
    bw.write_bits(MAGIC as u64, 32)?;
    bw.write_bits(VERSION as u64, 4)?;
    bw.write_bits(checksum.tag() as u64, 2)?;
    bw.write_bits(entropy_id as u64, 5)?;

    let chain_packed = pack_chain(chain);
    bw.write_bits(chain_packed, 48)?;
    bw.write_bits((block_size >> 4) as u64, 28)?;

    let tag = original_size_tag(original_size);
    bw.write_bits(tag as u64, 2)?;
    if tag != 0 {
        bw.write_bits(original_size.unwrap(), 16 * tag)?;
    }
    bw.write_bits(0, 15)?;

    let crc = header_crc(
        VERSION,
        checksum,
        entropy_id,
        chain_packed,
        block_size as u32,
        if tag != 0 { original_size } else { None },
    );
    bw.write_bits(crc as u64, 24)?;
    Ok(())
}

/// Parsed stream header.
pub struct StreamHeader {
    pub entropy_id: u8,
    pub transform_chain: Vec<TransformType>,
    pub block_size: usize,
    pub checksum: ChecksumSize,
    pub original_size: Option<u64>,
}

/// Read and validate the stream header, including the header CRC.
pub fn read_header<R: Read>(br: &mut BitReader<R>) -> Result<StreamHeader> {
    let magic = br.read_bits(32)? as u32;
    if magic != MAGIC {
        return Err(KanziError::InvalidMagic {
            expected: MAGIC,
            found: magic,
        });
    }
    let version = br.read_bits(4)? as u8;
    if version != VERSION {
        return Err(KanziError::UnsupportedVersion { version });
    }
    let checksum = ChecksumSize::from_tag(br.read_bits(2)? as u32)?;
    let entropy_id = br.read_bits(5)? as u8;
    let chain_packed = br.read_bits(48)?;
    let transform_chain = unpack_chain(chain_packed)?;
    let block_size = (br.read_bits(28)? as usize) << 4;

    let tag = br.read_bits(2)? as u32;
    let original_size = if tag != 0 {
        Some(br.read_bits(16 * tag)?)
    } else {
        None
    };
    br.read_bits(15)?;

    let expected_crc = br.read_bits(24)? as u32;
    let computed_crc = header_crc(
        version,
        checksum,
        entropy_id,
        chain_packed,
        block_size as u32,
        original_size,
    ) & 0x00FF_FFFF;

    if expected_crc != computed_crc {
        return Err(KanziError::HeaderCrcMismatch {
            expected: expected_crc,
            computed: computed_crc,
        });
    }

    Ok(StreamHeader {
        entropy_id,
        transform_chain,
        block_size,
        checksum,
        original_size,
    })
}

/// Mode byte bit layout (spec.md §4.2).
pub const COPY_BLOCK_MASK: u8 = 0x80;
const SKIP_IN_NEXT_BYTE_MASK: u8 = 0x10;

/// Everything needed to reconstruct one block's frame header once its
/// transformed bytes and entropy payload are known.
pub struct FrameFields {
    pub copy_block: bool,
    pub skip_mask: u8,
    pub num_stages: usize,
    /// Transform side data (e.g. a BWT primary index), concatenated across
    /// active stages by [`kanzi_transform::sequence::TransformSequence::side_data`].
    /// Empty for copy blocks.
    pub side_data: Vec<u8>,
    pub transformed_length: usize,
    pub checksum: Option<u64>,
    pub checksum_size: ChecksumSize,
}

fn data_size_for(transformed_length: usize) -> Result<u32> {
    let size = if transformed_length < 256 {
        1
    } else {
        (32 - (transformed_length as u32).leading_zeros()) / 8 + 1
    };
    if size > 4 {
        return Err(KanziError::Other("block data length exceeds 4 bytes".into()));
    }
    Ok(size)
}

/// Build the header bytes (mode [+ skip byte] + length + checksum) that
/// precede the entropy-coded payload inside a block's mini-bitstream.
pub fn build_frame_header(fields: &FrameFields) -> Result<Vec<u8>> {
    let data_size = data_size_for(fields.transformed_length)?;
    let mut mode = ((data_size - 1) << 5) as u8;
    if fields.copy_block {
        mode |= COPY_BLOCK_MASK;
    }

    let mut out = Vec::with_capacity(3 + fields.side_data.len() + data_size as usize + 8);
    if fields.num_stages <= 4 {
        mode |= fields.skip_mask & 0x0F;
        out.push(mode);
    } else {
        mode |= SKIP_IN_NEXT_BYTE_MASK;
        out.push(mode);
        out.push(fields.skip_mask);
    }

    if fields.side_data.len() > u8::MAX as usize {
        return Err(KanziError::Other("transform side data exceeds 255 bytes".into()));
    }
    out.push(fields.side_data.len() as u8);
    out.extend_from_slice(&fields.side_data);

    let len_bytes = (fields.transformed_length as u64).to_be_bytes();
    out.extend_from_slice(&len_bytes[8 - data_size as usize..]);

    match (fields.checksum_size, fields.checksum) {
        (ChecksumSize::None, _) => {}
        (ChecksumSize::Bits32, Some(cksum)) => out.extend_from_slice(&(cksum as u32).to_be_bytes()),
        (ChecksumSize::Bits64, Some(cksum)) => out.extend_from_slice(&cksum.to_be_bytes()),
        (_, None) => {
            return Err(KanziError::Other(
                "checksum enabled but no value provided".into(),
            ))
        }
    }
    Ok(out)
}

/// Parsed frame header plus the byte offset where entropy-coded bytes begin.
pub struct ParsedFrameHeader {
    pub copy_block: bool,
    pub skip_mask: u8,
    pub side_data: Vec<u8>,
    pub transformed_length: usize,
    pub checksum: Option<u64>,
    pub header_len: usize,
}

/// Parse the header bytes at the front of a block's mini-bitstream payload.
pub fn parse_frame_header(
    payload: &[u8],
    checksum_size: ChecksumSize,
) -> Result<ParsedFrameHeader> {
    let mode = *payload
        .first()
        .ok_or_else(|| KanziError::Other("empty block payload".into()))?;
    let copy_block = mode & COPY_BLOCK_MASK != 0;
    let data_size = ((mode >> 5) & 0x03) as usize + 1;
    let mut pos = 1usize;

    let skip_mask = if mode & SKIP_IN_NEXT_BYTE_MASK != 0 {
        let b = *payload
            .get(pos)
            .ok_or_else(|| KanziError::Other("truncated skip-flags byte".into()))?;
        pos += 1;
        b
    } else {
        mode & 0x0F
    };

    let side_len = *payload
        .get(pos)
        .ok_or_else(|| KanziError::Other("truncated side-data length byte".into()))? as usize;
    pos += 1;
    let side_data = payload
        .get(pos..pos + side_len)
        .ok_or_else(|| KanziError::Other("truncated side-data bytes".into()))?
        .to_vec();
    pos += side_len;

    let len_bytes = payload
        .get(pos..pos + data_size)
        .ok_or_else(|| KanziError::Other("truncated block length field".into()))?;
    let mut buf = [0u8; 8];
    buf[8 - data_size..].copy_from_slice(len_bytes);
    let transformed_length = u64::from_be_bytes(buf) as usize;
    pos += data_size;

    let checksum = match checksum_size {
        ChecksumSize::None => None,
        ChecksumSize::Bits32 => {
            let b = payload
                .get(pos..pos + 4)
                .ok_or_else(|| KanziError::Other("truncated checksum field".into()))?;
            pos += 4;
            Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64)
        }
        ChecksumSize::Bits64 => {
            let b = payload
                .get(pos..pos + 8)
                .ok_or_else(|| KanziError::Other("truncated checksum field".into()))?;
            pos += 8;
            Some(u64::from_be_bytes(b.try_into().unwrap()))
        }
    };

    Ok(ParsedFrameHeader {
        copy_block,
        skip_mask,
        side_data,
        transformed_length,
        checksum,
        header_len: pos,
    })
}

fn ceil_log2(x: u64) -> u32 {
    if x <= 1 {
        0
    } else {
        64 - (x - 1).leading_zeros()
    }
}

/// `Lw`, the bit width of the length-prefix field that precedes a block's
/// payload on the shared stream (spec.md §4.2): `max(3, ceil(log2(data_bits))+1)`.
pub fn length_prefix_width(data_bits: u64) -> u32 {
    (ceil_log2(data_bits) + 1).max(3)
}

/// Write one block's framed payload (length prefix + payload bytes) onto
/// the shared stream.
pub fn write_frame<W: Write>(bw: &mut BitWriter<W>, payload: &[u8]) -> Result<()> {
    let data_bits = (payload.len() as u64) * 8;
    let lw = length_prefix_width(data_bits);
    bw.write_bits((lw - 3) as u64, 5)?;
    bw.write_bits(data_bits, lw)?;
    bw.write_bits_from_bytes(payload, data_bits as usize)?;
    Ok(())
}

/// Write the zero-length end-of-stream terminator frame.
pub fn write_eos_frame<W: Write>(bw: &mut BitWriter<W>) -> Result<()> {
    bw.write_bits(0, 5)?;
    bw.write_bits(0, 3)?;
    Ok(())
}

/// Read one block's framed payload, or `None` at the end-of-stream frame.
pub fn read_frame<R: Read>(br: &mut BitReader<R>) -> Result<Option<Vec<u8>>> {
    let lw3 = br.read_bits(5)? as u32;
    let lw = lw3 + 3;
    let data_bits = br.read_bits(lw)?;
    if data_bits == 0 {
        return Ok(None);
    }
    let nbytes = ((data_bits + 7) / 8) as usize;
    let mut buf = vec![0u8; nbytes];
    br.read_bits_into_bytes(&mut buf, data_bits as usize)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_packing_roundtrip() {
        let chain = vec![TransformType::Bwt, TransformType::Rank, TransformType::ZRlt];
        let packed = pack_chain(&chain);
        assert_eq!(unpack_chain(packed).unwrap(), chain);
    }

    #[test]
    fn empty_chain_packs_to_zero() {
        assert_eq!(pack_chain(&[]), 0);
        assert!(unpack_chain(0).unwrap().is_empty());
    }

    #[test]
    fn header_roundtrip() {
        let mut buf = Vec::new();
        {
            let mut bw = BitWriter::new(&mut buf, 1024).unwrap();
            write_header(
                &mut bw,
                kanzi_core::registry::EntropyType::Ans0.id(),
                &[TransformType::Bwt, TransformType::Rank],
                65536,
                ChecksumSize::Bits32,
                Some(123_456),
            )
            .unwrap();
            bw.close().unwrap();
        }

        let mut br = BitReader::new(&buf[..]);
        let header = read_header(&mut br).unwrap();
        assert_eq!(header.block_size, 65536);
        assert_eq!(header.checksum, ChecksumSize::Bits32);
        assert_eq!(header.original_size, Some(123_456));
        assert_eq!(
            header.transform_chain,
            vec![TransformType::Bwt, TransformType::Rank]
        );
    }

    #[test]
    fn header_crc_detects_corruption() {
        let mut buf = Vec::new();
        {
            let mut bw = BitWriter::new(&mut buf, 1024).unwrap();
            write_header(
                &mut bw,
                kanzi_core::registry::EntropyType::None.id(),
                &[],
                65536,
                ChecksumSize::None,
                None,
            )
            .unwrap();
            bw.close().unwrap();
        }
        buf[10] ^= 0xFF;
        let mut br = BitReader::new(&buf[..]);
        assert!(matches!(
            read_header(&mut br),
            Err(KanziError::HeaderCrcMismatch { .. })
        ));
    }

    #[test]
    fn frame_header_small_chain_fits_in_mode_byte() {
        let fields = FrameFields {
            copy_block: false,
            skip_mask: 0b1010,
            num_stages: 2,
            side_data: Vec::new(),
            transformed_length: 42,
            checksum: None,
            checksum_size: ChecksumSize::None,
        };
        let header = build_frame_header(&fields).unwrap();
        assert_eq!(header.len(), 3); // mode byte + side-data-len byte + 1 length byte
        let parsed = parse_frame_header(&header, ChecksumSize::None).unwrap();
        assert_eq!(parsed.skip_mask, 0b1010);
        assert_eq!(parsed.transformed_length, 42);
        assert!(!parsed.copy_block);
    }

    #[test]
    fn frame_header_wide_chain_uses_extra_byte() {
        let fields = FrameFields {
            copy_block: false,
            skip_mask: 0b1010_0101,
            num_stages: 6,
            side_data: vec![0x00, 0x00, 0x00, 0x07],
            transformed_length: 70_000,
            checksum: Some(0xDEAD_BEEF),
            checksum_size: ChecksumSize::Bits32,
        };
        let header = build_frame_header(&fields).unwrap();
        let parsed = parse_frame_header(&header, ChecksumSize::Bits32).unwrap();
        assert_eq!(parsed.skip_mask, 0b1010_0101);
        assert_eq!(parsed.side_data, vec![0x00, 0x00, 0x00, 0x07]);
        assert_eq!(parsed.transformed_length, 70_000);
        assert_eq!(parsed.checksum, Some(0xDEAD_BEEF));
    }

    #[test]
    fn frame_roundtrip_and_eos() {
        let mut buf = Vec::new();
        {
            let mut bw = BitWriter::new(&mut buf, 1024).unwrap();
            write_frame(&mut bw, b"hello").unwrap();
            write_eos_frame(&mut bw).unwrap();
            bw.close().unwrap();
        }

        let mut br = BitReader::new(&buf[..]);
        assert_eq!(read_frame(&mut br).unwrap(), Some(b"hello".to_vec()));
        assert_eq!(read_frame(&mut br).unwrap(), None);
    }
}
