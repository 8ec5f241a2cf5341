//! Bitstream container and parallel block pipeline for the Kanzi block
//! compressor: stream header/CRC and per-block framing (`container`),
//! entropy-coder/transform-chain dispatch (`entropy`), parameter validation
//! (`params`), a bounded worker pool (`pool`), and the encoder/decoder
//! pipelines themselves (`encoder`, `decoder`).

pub mod container;
pub mod decoder;
pub mod encoder;
pub mod entropy;
pub mod params;
pub mod pool;

pub mod prelude {
    pub use crate::decoder::Decoder;
    pub use crate::encoder::Encoder;
    pub use crate::params::{ChecksumSize, DecoderParams, EncoderParams};
}
