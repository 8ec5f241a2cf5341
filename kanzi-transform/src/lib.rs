//! Reversible byte transforms for the Kanzi block compressor: BWT/BWTS,
//! rank-reordering transforms (MTF/RANK/SRT), run-length codecs, the
//! LZ family (LZ/LZX/LZP/ROLZ/ROLZX), and the data-type-aware codecs
//! (TEXT/UTF/FSD/PACK/EXE/DNA), composed via a skip-bit-aware sequence.

pub mod traits;

pub mod lz_common;

pub mod bwt;
pub mod bwts;
pub mod dna;
pub mod exe;
pub mod fsd;
pub mod lz;
pub mod lzp;
pub mod lzx;
pub mod mtft;
pub mod pack;
pub mod rank;
pub mod rlt;
pub mod rolz;
pub mod rolzx;
pub mod sequence;
pub mod srt;
pub mod text;
pub mod utf;
pub mod zrlt;

pub mod prelude {
    pub use crate::bwt::Bwt;
    pub use crate::bwts::Bwts;
    pub use crate::dna::Dna;
    pub use crate::exe::Exe;
    pub use crate::fsd::Fsd;
    pub use crate::lz::Lz;
    pub use crate::lzp::Lzp;
    pub use crate::lzx::Lzx;
    pub use crate::mtft::Mtft;
    pub use crate::pack::Pack;
    pub use crate::rank::RankTransform;
    pub use crate::rlt::Rlt;
    pub use crate::rolz::Rolz;
    pub use crate::rolzx::Rolzx;
    pub use crate::sequence::TransformSequence;
    pub use crate::srt::Srt;
    pub use crate::text::Text;
    pub use crate::traits::ByteTransform;
    pub use crate::utf::Utf;
    pub use crate::zrlt::Zrlt;
}
