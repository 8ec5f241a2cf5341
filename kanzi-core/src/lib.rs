//! Shared primitives for the Kanzi compressor: bitstream I/O, error types,
//! checksums, the container magic-number table, and the codec/transform
//! name registry.
//!
//! [`kanzi-entropy`](../kanzi_entropy/index.html),
//! [`kanzi-transform`](../kanzi_transform/index.html) and
//! [`kanzi-codec`](../kanzi_codec/index.html) all depend on this crate and
//! nothing else in the workspace depends on them; this keeps the wire
//! format, error type, and bit-level I/O in exactly one place.

pub mod bitstream;
pub mod checksum;
pub mod endian;
pub mod error;
pub mod gate;
pub mod histogram;
pub mod magic;
pub mod registry;

/// Re-exports of the types most callers need, for a single `use
/// kanzi_core::prelude::*`.
pub mod prelude {
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::error::{ErrorCode, KanziError, Result};
    pub use crate::gate::SequentialGate;
    pub use crate::registry::{EntropyType, TransformType};
}
