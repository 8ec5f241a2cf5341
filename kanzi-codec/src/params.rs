//! Encoder/decoder parameter validation (spec.md §4.3, §4.4, §6).

use kanzi_core::error::{KanziError, Result};
use kanzi_core::registry::{EntropyType, TransformType};

/// Per-block checksum width, stored as the 2-bit `checksum size` header
/// field (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumSize {
    /// No checksum.
    None,
    /// XXHash32.
    Bits32,
    /// XXHash64.
    Bits64,
}

impl ChecksumSize {
    /// The 2-bit tag stored in the header.
    pub fn tag(self) -> u32 {
        match self {
            ChecksumSize::None => 0,
            ChecksumSize::Bits32 => 1,
            ChecksumSize::Bits64 => 2,
        }
    }

    /// Resolve a 2-bit tag back to a [`ChecksumSize`].
    pub fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(ChecksumSize::None),
            1 => Ok(ChecksumSize::Bits32),
            2 => Ok(ChecksumSize::Bits64),
            _ => Err(KanziError::invalid_param(
                "checksum size",
                "tag 3 is reserved",
            )),
        }
    }

    /// Bit width of the checksum field itself (0, 32 or 64).
    pub fn bits(self) -> u32 {
        match self {
            ChecksumSize::None => 0,
            ChecksumSize::Bits32 => 32,
            ChecksumSize::Bits64 => 64,
        }
    }
}

pub const MIN_BLOCK_SIZE: usize = 1024;
pub const MAX_BLOCK_SIZE: usize = 1 << 30;
pub const MIN_JOBS: usize = 1;
pub const MAX_JOBS: usize = 64;
pub const MAX_CHAIN_LEN: usize = 8;

fn validate_common(
    transform_chain: &[TransformType],
    block_size: usize,
    jobs: usize,
) -> Result<()> {
    if transform_chain.len() > MAX_CHAIN_LEN {
        return Err(KanziError::invalid_param(
            "transform_chain",
            "at most 8 stages are supported",
        ));
    }
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) || block_size % 16 != 0 {
        return Err(KanziError::invalid_param(
            "block_size",
            "must be in [1024, 2^30] and a multiple of 16",
        ));
    }
    if !(MIN_JOBS..=MAX_JOBS).contains(&jobs) {
        return Err(KanziError::invalid_param("jobs", "must be in [1, 64]"));
    }
    Ok(())
}

/// Parameters accepted by the block-pipeline encoder.
#[derive(Debug, Clone)]
pub struct EncoderParams {
    pub entropy: EntropyType,
    pub transform_chain: Vec<TransformType>,
    pub block_size: usize,
    pub checksum: ChecksumSize,
    pub jobs: usize,
    pub original_size: Option<u64>,
    pub skip_blocks: bool,
    pub headerless: bool,
}

impl EncoderParams {
    /// Reasonable interactive defaults: no entropy-coding chain, 1 MiB
    /// blocks, no checksum, single-threaded.
    pub fn new() -> Self {
        Self {
            entropy: EntropyType::None,
            transform_chain: Vec::new(),
            block_size: 1024 * 1024,
            checksum: ChecksumSize::None,
            jobs: 1,
            original_size: None,
            skip_blocks: false,
            headerless: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_common(&self.transform_chain, self.block_size, self.jobs)
    }
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters accepted by the block-pipeline decoder. In headerless mode
/// the caller must assert the same `entropy`/`transform_chain`/`block_size`
/// the encoder used; otherwise these are overwritten by the stream header.
#[derive(Debug, Clone)]
pub struct DecoderParams {
    pub jobs: usize,
    pub headerless: bool,
    pub entropy: EntropyType,
    pub transform_chain: Vec<TransformType>,
    pub block_size: usize,
    pub checksum: ChecksumSize,
    /// Restrict decoding to block ids in `[from, to)`, 1-based. `None`
    /// decodes every block.
    pub block_range: Option<(u64, u64)>,
}

impl DecoderParams {
    pub fn new() -> Self {
        Self {
            jobs: 1,
            headerless: false,
            entropy: EntropyType::None,
            transform_chain: Vec::new(),
            block_size: 1024 * 1024,
            checksum: ChecksumSize::None,
            block_range: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_JOBS..=MAX_JOBS).contains(&self.jobs) {
            return Err(KanziError::invalid_param("jobs", "must be in [1, 64]"));
        }
        if self.headerless {
            validate_common(&self.transform_chain, self.block_size, self.jobs)?;
        }
        Ok(())
    }
}

impl Default for DecoderParams {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_block_size() {
        let mut p = EncoderParams::new();
        p.block_size = 1000;
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_too_many_jobs() {
        let mut p = EncoderParams::new();
        p.jobs = 65;
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_oversized_chain() {
        let mut p = EncoderParams::new();
        p.transform_chain = vec![TransformType::Bwt; 9];
        assert!(p.validate().is_err());
    }

    #[test]
    fn checksum_tag_roundtrip() {
        for cs in [ChecksumSize::None, ChecksumSize::Bits32, ChecksumSize::Bits64] {
            assert_eq!(ChecksumSize::from_tag(cs.tag()).unwrap(), cs);
        }
        assert!(ChecksumSize::from_tag(3).is_err());
    }
}
