//! Entropy coders for the Kanzi block compressor: a raw passthrough, static
//! canonical Huffman, range-variant ANS (order 0/1), and a generic binary
//! range coder driven by pluggable bit predictors.

pub mod alphabet;
pub mod ans;
pub mod arithmetic;
pub mod exp_golomb;
pub mod huffman;
pub mod null;
pub mod predictor;

pub mod prelude {
    pub use crate::ans::{AnsDecoder, AnsEncoder};
    pub use crate::arithmetic::{BinaryDecoder, BinaryEncoder};
    pub use crate::huffman::{HuffmanDecoder, HuffmanEncoder};
    pub use crate::null::{NullDecoder, NullEncoder};
    pub use crate::predictor::cm::CmPredictor;
    pub use crate::predictor::fpaq::FpaqPredictor;
    pub use crate::predictor::tpaq::TpaqPredictor;
    pub use crate::predictor::Predictor;
}
